//! podbase-ingest
//!
//! The ingestion runner: pulls transcript documents collection by
//! collection, runs them through chunking, tagging, embedding and the
//! vector store writer, keeps the stage3/stage4 artifacts and the
//! episode-title table in step, and checkpoints completed collections so
//! an interrupted run resumes without redoing work.

pub mod runner;

pub use runner::{IngestionRunner, RunSummary};
