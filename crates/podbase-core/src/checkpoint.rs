//! Run checkpoint: the set of collections already ingested end-to-end.
//!
//! Stored as a sorted JSON array of collection ids. The file is rewritten
//! after every completed collection so an interrupted run resumes where it
//! stopped instead of redoing finished work.

use anyhow::Context;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct ProgressCheckpoint {
    path: PathBuf,
    done: BTreeSet<String>,
}

impl ProgressCheckpoint {
    /// Load the checkpoint at `path`. A missing file yields an empty
    /// checkpoint; a present-but-unparseable file is an error, so a corrupt
    /// checkpoint never silently restarts a long run from scratch.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let done = if path.exists() {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read checkpoint {}", path.display()))?;
            let names: Vec<String> = serde_json::from_str(&raw)
                .with_context(|| format!("invalid checkpoint file {}", path.display()))?;
            names.into_iter().collect()
        } else {
            BTreeSet::new()
        };
        Ok(Self {
            path: path.to_path_buf(),
            done,
        })
    }

    pub fn is_done(&self, collection: &str) -> bool {
        self.done.contains(collection)
    }

    /// Mark a collection complete and persist immediately.
    pub fn mark_done(&mut self, collection: &str) -> anyhow::Result<()> {
        self.done.insert(collection.to_string());
        self.save()
    }

    pub fn save(&self) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create checkpoint dir {}", parent.display())
                })?;
            }
        }
        let names: Vec<&String> = self.done.iter().collect();
        let raw = serde_json::to_string_pretty(&names)?;
        std::fs::write(&self.path, raw)
            .with_context(|| format!("failed to write checkpoint {}", self.path.display()))?;
        Ok(())
    }

    pub fn completed(&self) -> impl Iterator<Item = &str> {
        self.done.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.done.len()
    }

    pub fn is_empty(&self) -> bool {
        self.done.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
