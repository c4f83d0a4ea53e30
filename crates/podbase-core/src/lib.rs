pub mod checkpoint;
pub mod config;
pub mod doc_store;
pub mod error;
pub mod error_log;
pub mod traits;
pub mod types;
