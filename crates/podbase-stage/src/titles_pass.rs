//! Coordinated title normalization across every place a title lives:
//! the relational table, stage3 artifacts, and stage4 artifacts.
//!
//! The pass is convergent: running it twice leaves everything unchanged,
//! because [`normalize_title`] is idempotent and artifact stems are built
//! from normalized titles in the first place. A failure on one
//! representation is logged and the pass moves on, so the three stores can
//! drift for one episode without blocking cleanup of the rest.

use crate::artifact::{STAGE3_SUFFIX, STAGE4_SUFFIX};
use anyhow::Context;
use podbase_core::error::PipelineError;
use podbase_core::error_log::{ErrorLog, Severity};
use podbase_core::traits::TitleStore;
use podbase_text::normalize_title;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct TitlesPassReport {
    /// Relational rows whose stored title was rewritten.
    pub db_updated: usize,
    /// Stage3 files renamed to their canonical stem.
    pub stage3_renamed: usize,
    /// Stage4 files renamed to their canonical stem.
    pub stage4_renamed: usize,
    /// Artifacts whose embedded episode_title fields were rewritten.
    pub rewritten_files: usize,
    /// Failures logged along the way; the pass continued past each.
    pub failures: usize,
}

impl TitlesPassReport {
    pub fn changed_anything(&self) -> bool {
        self.db_updated + self.stage3_renamed + self.stage4_renamed + self.rewritten_files > 0
    }
}

/// Normalizes titles everywhere they are stored. Each representation is
/// handled independently; errors are logged under the
/// `title_normalization` stage and never abort the pass.
pub fn run_titles_pass(
    store: &dyn TitleStore,
    stage3_dir: &Path,
    stage4_dir: &Path,
    errors: &mut ErrorLog,
) -> anyhow::Result<TitlesPassReport> {
    let mut report = TitlesPassReport::default();

    normalize_db_titles(store, &mut report, errors);

    let stage3 = normalize_stage_dir(stage3_dir, STAGE3_SUFFIX, errors);
    report.stage3_renamed = stage3.renamed;
    report.rewritten_files += stage3.rewritten;
    report.failures += stage3.failures;

    let stage4 = normalize_stage_dir(stage4_dir, STAGE4_SUFFIX, errors);
    report.stage4_renamed = stage4.renamed;
    report.rewritten_files += stage4.rewritten;
    report.failures += stage4.failures;

    tracing::info!(
        db_updated = report.db_updated,
        stage3_renamed = report.stage3_renamed,
        stage4_renamed = report.stage4_renamed,
        rewritten_files = report.rewritten_files,
        failures = report.failures,
        "titles pass finished"
    );
    Ok(report)
}

fn normalize_db_titles(store: &dyn TitleStore, report: &mut TitlesPassReport, errors: &mut ErrorLog) {
    let rows = match store.list_episodes() {
        Ok(rows) => rows,
        Err(e) => {
            report.failures += 1;
            errors.log(
                &PipelineError::General(format!("failed to list episode titles: {e:#}")),
                Severity::Error,
                "title_normalization",
                None,
            );
            return;
        }
    };
    for row in rows {
        let normalized = normalize_title(&row.episode_title);
        if normalized == row.episode_title {
            continue;
        }
        match store.update_title(row.podcast_id, row.episode_id, &normalized) {
            Ok(()) => report.db_updated += 1,
            Err(e) => {
                report.failures += 1;
                errors.log(
                    &PipelineError::General(format!("failed to update title: {e:#}")),
                    Severity::Error,
                    "title_normalization",
                    Some(&format!("episode {}/{}", row.podcast_id, row.episode_id)),
                );
            }
        }
    }
}

#[derive(Default)]
struct DirOutcome {
    renamed: usize,
    rewritten: usize,
    failures: usize,
}

fn normalize_stage_dir(dir: &Path, suffix: &str, errors: &mut ErrorLog) -> DirOutcome {
    let mut outcome = DirOutcome::default();
    if !dir.exists() {
        return outcome;
    }

    // Snapshot the names first so renames do not confuse the walk.
    let mut names = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let Ok(entry) = entry else {
            outcome.failures += 1;
            continue;
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if name.ends_with(suffix) {
            names.push(name);
        }
    }
    names.sort();

    for name in names {
        match normalize_artifact(dir, &name, suffix) {
            Ok(changes) => {
                if changes.renamed {
                    outcome.renamed += 1;
                }
                if changes.rewritten {
                    outcome.rewritten += 1;
                }
            }
            Err(e) => {
                outcome.failures += 1;
                errors.log(
                    &PipelineError::General(format!("{e:#}")),
                    Severity::Error,
                    "title_normalization",
                    Some(&name),
                );
            }
        }
    }
    outcome
}

struct ArtifactChanges {
    renamed: bool,
    rewritten: bool,
}

/// Fixes one artifact: episode_title fields inside the file first, then
/// the file name itself. The content write happens at the original path so
/// a failed rename still leaves corrected content behind.
fn normalize_artifact(dir: &Path, name: &str, suffix: &str) -> anyhow::Result<ArtifactChanges> {
    let path = dir.join(name);
    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let mut value: Value = serde_json::from_str(&raw)
        .with_context(|| format!("{name} is not a valid chunk artifact"))?;

    let rewritten = normalize_chunk_titles(&mut value);
    if rewritten {
        std::fs::write(&path, serde_json::to_string_pretty(&value)?)
            .with_context(|| format!("failed to rewrite {}", path.display()))?;
    }

    let Some(stem) = name.strip_suffix(suffix) else {
        return Ok(ArtifactChanges {
            renamed: false,
            rewritten,
        });
    };
    let canonical_stem = normalize_title(stem);
    let canonical_name = format!("{canonical_stem}{suffix}");
    if canonical_stem.is_empty() || canonical_name == name {
        return Ok(ArtifactChanges {
            renamed: false,
            rewritten,
        });
    }

    let target = dir.join(&canonical_name);
    if target.exists() {
        let backup = dir.join(format!("{canonical_name}.backup"));
        std::fs::copy(&target, &backup)
            .with_context(|| format!("failed to back up {}", target.display()))?;
    }
    std::fs::rename(&path, &target)
        .with_context(|| format!("failed to rename {name} to {canonical_name}"))?;
    Ok(ArtifactChanges {
        renamed: true,
        rewritten,
    })
}

fn normalize_chunk_titles(value: &mut Value) -> bool {
    let mut changed = false;
    let Some(chunks) = value.get_mut("chunks").and_then(Value::as_array_mut) else {
        return false;
    };
    for chunk in chunks {
        let Some(obj) = chunk.as_object_mut() else {
            continue;
        };
        let normalized = match obj.get("episode_title").and_then(Value::as_str) {
            Some(title) => {
                let n = normalize_title(title);
                if n == title {
                    continue;
                }
                n
            }
            None => continue,
        };
        obj.insert("episode_title".to_string(), Value::String(normalized));
        changed = true;
    }
    changed
}
