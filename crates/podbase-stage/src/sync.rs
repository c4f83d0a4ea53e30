//! Reconciles stage3 (tagged) and stage4 (embedded) artifact directories.
//!
//! Stage3 is ground truth. The synchronizer reports four kinds of drift:
//! stage3 files with no stage4 counterpart, stage4 files with no stage3
//! source, stage4 files that exist but no longer parse as chunk artifacts,
//! and extras that also fail to parse. Repair only ever copies stage3
//! content forward; it never deletes anything in either stage, and it has
//! nothing to copy for an unparseable extra.

use crate::artifact::{stage3_file_name, stage4_file_name, STAGE3_SUFFIX, STAGE4_SUFFIX};
use anyhow::Context;
use podbase_core::error::PipelineError;
use podbase_core::error_log::{ErrorLog, Severity};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncDiff {
    /// Stage3 file names whose derived stage4 file does not exist.
    pub missing_in_stage4: Vec<String>,
    /// Parseable stage4 file names with no stage3 source. Reported, never
    /// removed.
    pub extra_in_stage4: Vec<String>,
    /// Stage4 file names that exist but are not valid chunk artifacts.
    pub corrupted: Vec<String>,
    /// Extras that are also unparseable. There is no stage3 source to
    /// repair from, so these only ever appear in reports.
    pub corrupted_extras: Vec<String>,
}

impl SyncDiff {
    pub fn is_clean(&self) -> bool {
        self.missing_in_stage4.is_empty()
            && self.extra_in_stage4.is_empty()
            && self.corrupted.is_empty()
            && self.corrupted_extras.is_empty()
    }

    /// Stage3 file names that need to be copied forward: the missing ones
    /// plus the sources of corrupted stage4 files.
    pub fn repair_targets(&self) -> Vec<String> {
        let mut targets: Vec<String> = self.missing_in_stage4.clone();
        targets.extend(
            self.corrupted
                .iter()
                .filter_map(|name| stage3_file_name(name)),
        );
        targets
    }
}

pub struct StageSynchronizer {
    stage3_dir: PathBuf,
    stage4_dir: PathBuf,
}

impl StageSynchronizer {
    pub fn new(stage3_dir: impl Into<PathBuf>, stage4_dir: impl Into<PathBuf>) -> Self {
        Self {
            stage3_dir: stage3_dir.into(),
            stage4_dir: stage4_dir.into(),
        }
    }

    /// Compares the two stage directories without touching either.
    pub fn diff(&self) -> anyhow::Result<SyncDiff> {
        let stage3_names = list_stage_files(&self.stage3_dir, STAGE3_SUFFIX)?;
        let stage4_names = list_stage_files(&self.stage4_dir, STAGE4_SUFFIX)?;

        let mut diff = SyncDiff::default();
        for name in &stage3_names {
            let Some(derived) = stage4_file_name(name) else {
                continue;
            };
            if !stage4_names.contains(&derived) {
                diff.missing_in_stage4.push(name.clone());
            } else if !is_valid_chunk_artifact(&self.stage4_dir.join(&derived)) {
                diff.corrupted.push(derived);
            }
        }
        for name in &stage4_names {
            let source = stage3_file_name(name);
            if source.map_or(true, |src| !stage3_names.contains(&src)) {
                if is_valid_chunk_artifact(&self.stage4_dir.join(name)) {
                    diff.extra_in_stage4.push(name.clone());
                } else {
                    diff.corrupted_extras.push(name.clone());
                }
            }
        }
        Ok(diff)
    }

    /// Copies the named stage3 files forward to their derived stage4 names.
    /// An existing stage4 file is preserved as `<name>.backup` before being
    /// overwritten. Per-file failures are logged and do not stop the pass.
    /// Returns the number of files repaired.
    pub fn repair(&self, stage3_names: &[String], errors: &mut ErrorLog) -> anyhow::Result<usize> {
        std::fs::create_dir_all(&self.stage4_dir).with_context(|| {
            format!("failed to create stage4 dir {}", self.stage4_dir.display())
        })?;

        let mut repaired = 0usize;
        for name in stage3_names {
            match self.repair_one(name) {
                Ok(target) => {
                    tracing::info!(source = %name, target = %target, "repaired stage4 artifact");
                    repaired += 1;
                }
                Err(e) => {
                    errors.log(
                        &PipelineError::Sync(format!("{e:#}")),
                        Severity::Error,
                        "stage_sync",
                        Some(name),
                    );
                }
            }
        }
        Ok(repaired)
    }

    fn repair_one(&self, stage3_name: &str) -> anyhow::Result<String> {
        let stage4_name = stage4_file_name(stage3_name)
            .with_context(|| format!("{stage3_name} is not a stage3 artifact name"))?;
        let source = self.stage3_dir.join(stage3_name);
        let target = self.stage4_dir.join(&stage4_name);

        let content = std::fs::read(&source)
            .with_context(|| format!("failed to read {}", source.display()))?;
        if target.exists() {
            let backup = self.stage4_dir.join(format!("{stage4_name}.backup"));
            std::fs::copy(&target, &backup)
                .with_context(|| format!("failed to back up {}", target.display()))?;
        }
        std::fs::write(&target, content)
            .with_context(|| format!("failed to write {}", target.display()))?;
        Ok(stage4_name)
    }

    /// Human-readable summary of a diff.
    pub fn report(&self, diff: &SyncDiff) -> String {
        let mut out = String::new();
        out.push_str("STAGE SYNC REPORT\n");
        out.push_str("=================\n");
        out.push_str(&format!("Stage3 dir: {}\n", self.stage3_dir.display()));
        out.push_str(&format!("Stage4 dir: {}\n", self.stage4_dir.display()));
        out.push_str(&format!(
            "Missing in stage4: {}\n",
            diff.missing_in_stage4.len()
        ));
        out.push_str(&format!("Extra in stage4:   {}\n", diff.extra_in_stage4.len()));
        out.push_str(&format!("Corrupted:         {}\n", diff.corrupted.len()));
        out.push_str(&format!("Corrupted extras:  {}\n", diff.corrupted_extras.len()));

        if diff.is_clean() {
            out.push_str("\nStages are in sync.\n");
            return out;
        }
        if !diff.missing_in_stage4.is_empty() {
            out.push_str("\nMissing in stage4 (stage3 source listed):\n");
            for name in &diff.missing_in_stage4 {
                out.push_str(&format!("  - {name}\n"));
            }
        }
        if !diff.extra_in_stage4.is_empty() {
            out.push_str("\nExtra in stage4 (no stage3 source, left in place):\n");
            for name in &diff.extra_in_stage4 {
                out.push_str(&format!("  - {name}\n"));
            }
        }
        if !diff.corrupted.is_empty() {
            out.push_str("\nCorrupted stage4 artifacts:\n");
            for name in &diff.corrupted {
                out.push_str(&format!("  - {name}\n"));
            }
        }
        if !diff.corrupted_extras.is_empty() {
            out.push_str("\nCorrupted extras (no stage3 source to repair from):\n");
            for name in &diff.corrupted_extras {
                out.push_str(&format!("  - {name}\n"));
            }
        }
        out
    }

    /// Writes the text and JSON renditions of a diff into `reports_dir`.
    pub fn write_reports(&self, diff: &SyncDiff, reports_dir: &Path) -> anyhow::Result<()> {
        std::fs::create_dir_all(reports_dir)
            .with_context(|| format!("failed to create {}", reports_dir.display()))?;
        std::fs::write(reports_dir.join("sync_report.txt"), self.report(diff))?;
        std::fs::write(
            reports_dir.join("sync_report.json"),
            serde_json::to_string_pretty(diff)?,
        )?;
        Ok(())
    }
}

/// A stage4 artifact is usable when it parses as JSON and carries a
/// top-level `chunks` array. Anything else is treated as corrupted.
fn is_valid_chunk_artifact(path: &Path) -> bool {
    let Ok(raw) = std::fs::read_to_string(path) else {
        return false;
    };
    let Ok(value) = serde_json::from_str::<Value>(&raw) else {
        return false;
    };
    value.get("chunks").map_or(false, Value::is_array)
}

fn list_stage_files(dir: &Path, suffix: &str) -> anyhow::Result<BTreeSet<String>> {
    let mut names = BTreeSet::new();
    if !dir.exists() {
        return Ok(names);
    }
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if name.ends_with(suffix) {
            names.insert(name);
        }
    }
    Ok(names)
}
