//! Filesystem-backed document store.
//!
//! Layout: `<root>/<collection>/*.json`, where each file holds either one
//! document object or an array of them. Unreadable or unparseable files are
//! logged and skipped so one bad export never blocks a collection.

use crate::traits::DocumentStore;
use crate::types::SourceDocument;
use anyhow::Context;
use serde_json::Value;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct JsonDocumentStore {
    root: PathBuf,
}

impl JsonDocumentStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn collection_dir(&self, collection: &str) -> PathBuf {
        self.root.join(collection)
    }

    /// Parse one file into documents. Accepts a single object or an array;
    /// documents without an `id` get one derived from the file stem.
    fn parse_file(path: &Path) -> anyhow::Result<Vec<SourceDocument>> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let value: Value = serde_json::from_str(&raw)
            .with_context(|| format!("invalid JSON in {}", path.display()))?;

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "document".to_string());

        let mut docs = Vec::new();
        match value {
            Value::Array(items) => {
                for (i, item) in items.into_iter().enumerate() {
                    let mut doc: SourceDocument = serde_json::from_value(item)
                        .with_context(|| format!("invalid document in {}", path.display()))?;
                    if doc.id.is_empty() {
                        doc.id = format!("{}-{}", stem, i);
                    }
                    docs.push(doc);
                }
            }
            other => {
                let mut doc: SourceDocument = serde_json::from_value(other)
                    .with_context(|| format!("invalid document in {}", path.display()))?;
                if doc.id.is_empty() {
                    doc.id = stem;
                }
                docs.push(doc);
            }
        }
        Ok(docs)
    }
}

impl DocumentStore for JsonDocumentStore {
    fn list_collections(&self) -> anyhow::Result<Vec<String>> {
        if !self.root.exists() {
            anyhow::bail!("document root {} does not exist", self.root.display());
        }
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.root)
            .with_context(|| format!("failed to list {}", self.root.display()))?
        {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                names.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn get_documents(
        &self,
        collection: &str,
        limit: Option<usize>,
    ) -> anyhow::Result<Vec<SourceDocument>> {
        let dir = self.collection_dir(collection);
        if !dir.exists() {
            anyhow::bail!("collection directory {} does not exist", dir.display());
        }

        let mut files: Vec<PathBuf> = WalkDir::new(&dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.path().to_path_buf())
            .filter(|p| p.extension().and_then(|ext| ext.to_str()) == Some("json"))
            .collect();
        files.sort();

        let mut docs = Vec::new();
        for path in files {
            match Self::parse_file(&path) {
                Ok(parsed) => docs.extend(parsed),
                Err(e) => {
                    tracing::warn!(file = %path.display(), "skipping unreadable document file: {e:#}");
                }
            }
            if let Some(cap) = limit {
                if docs.len() >= cap {
                    docs.truncate(cap);
                    break;
                }
            }
        }
        Ok(docs)
    }
}
