//! Error collection and reporting.
//!
//! Batch stages never abort on a single bad item: they classify the failure,
//! record it here, and move on. At the end of a run the collected records are
//! summarised and exported as JSON, CSV, or plain text for operators.

use crate::error::{ErrorKind, PipelineError};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Severity of a recorded failure. `Critical` means the run's output is
/// incomplete in a way that needs operator attention; `Warning` covers
/// degraded-but-successful outcomes such as fallback embeddings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One classified failure, with enough context to find the offending item
/// after the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// RFC 3339 UTC timestamp taken when the record was created.
    pub timestamp: String,
    pub error_type: ErrorKind,
    pub message: String,
    pub severity: Severity,
    /// Pipeline stage that produced the failure, e.g. "embedding" or
    /// "vector_store_write".
    pub stage: String,
    /// Item identifier (chunk id, document id, file name) when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    /// Longer diagnostic text, typically the source error chain.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Aggregated view of a run's failures.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorSummary {
    pub total: usize,
    pub by_type: BTreeMap<String, usize>,
    pub by_severity: BTreeMap<String, usize>,
    /// Up to three sample messages per error type, in arrival order.
    pub samples: BTreeMap<String, Vec<String>>,
}

/// Output format for exported reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Json,
    Csv,
    Text,
}

/// In-memory collector for a single run.
#[derive(Debug, Default)]
pub struct ErrorLog {
    records: Vec<ErrorRecord>,
}

impl ErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a pipeline error, classifying it from its variant.
    pub fn log(&mut self, err: &PipelineError, severity: Severity, stage: &str, context: Option<&str>) {
        self.push(ErrorRecord {
            timestamp: Utc::now().to_rfc3339(),
            error_type: err.kind(),
            message: err.to_string(),
            severity,
            stage: stage.to_string(),
            context: context.map(str::to_string),
            detail: None,
        });
    }

    /// Like [`log`](Self::log) with an extra free-form diagnostic string,
    /// typically the full source error chain.
    pub fn log_detailed(
        &mut self,
        err: &PipelineError,
        severity: Severity,
        stage: &str,
        context: Option<&str>,
        detail: String,
    ) {
        self.push(ErrorRecord {
            timestamp: Utc::now().to_rfc3339(),
            error_type: err.kind(),
            message: err.to_string(),
            severity,
            stage: stage.to_string(),
            context: context.map(str::to_string),
            detail: Some(detail),
        });
    }

    /// Append a pre-built record and mirror it to tracing at the matching
    /// level.
    pub fn push(&mut self, record: ErrorRecord) {
        match record.severity {
            Severity::Critical | Severity::Error => tracing::error!(
                stage = %record.stage,
                error_type = %record.error_type,
                context = record.context.as_deref().unwrap_or("-"),
                "{}",
                record.message
            ),
            Severity::Warning => tracing::warn!(
                stage = %record.stage,
                error_type = %record.error_type,
                context = record.context.as_deref().unwrap_or("-"),
                "{}",
                record.message
            ),
            Severity::Info => tracing::info!(
                stage = %record.stage,
                error_type = %record.error_type,
                context = record.context.as_deref().unwrap_or("-"),
                "{}",
                record.message
            ),
        }
        self.records.push(record);
    }

    pub fn records(&self) -> &[ErrorRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn count_by_severity(&self, severity: Severity) -> usize {
        self.records.iter().filter(|r| r.severity == severity).count()
    }

    pub fn summary(&self) -> ErrorSummary {
        let mut by_type: BTreeMap<String, usize> = BTreeMap::new();
        let mut by_severity: BTreeMap<String, usize> = BTreeMap::new();
        let mut samples: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for record in &self.records {
            let type_key = record.error_type.as_str().to_string();
            *by_type.entry(type_key.clone()).or_insert(0) += 1;
            *by_severity.entry(record.severity.as_str().to_string()).or_insert(0) += 1;
            let bucket = samples.entry(type_key).or_default();
            if bucket.len() < 3 {
                bucket.push(record.message.clone());
            }
        }

        ErrorSummary {
            total: self.records.len(),
            by_type,
            by_severity,
            samples,
        }
    }

    /// Render all records in the requested format.
    pub fn export(&self, format: ReportFormat) -> String {
        match format {
            ReportFormat::Json => self.export_json(),
            ReportFormat::Csv => self.export_csv(),
            ReportFormat::Text => self.export_text(),
        }
    }

    fn export_json(&self) -> String {
        #[derive(Serialize)]
        struct JsonReport<'a> {
            summary: ErrorSummary,
            records: &'a [ErrorRecord],
        }
        let report = JsonReport {
            summary: self.summary(),
            records: &self.records,
        };
        serde_json::to_string_pretty(&report).unwrap_or_else(|_| "{}".to_string())
    }

    fn export_csv(&self) -> String {
        let mut out = String::from("timestamp,error_type,severity,stage,context,message\n");
        for record in &self.records {
            let row = [
                record.timestamp.as_str(),
                record.error_type.as_str(),
                record.severity.as_str(),
                record.stage.as_str(),
                record.context.as_deref().unwrap_or(""),
                record.message.as_str(),
            ];
            let mut first = true;
            for field in row {
                if !first {
                    out.push(',');
                }
                first = false;
                out.push_str(&csv_escape(field));
            }
            out.push('\n');
        }
        out
    }

    fn export_text(&self) -> String {
        let summary = self.summary();
        let mut out = String::new();
        out.push_str("ERROR REPORT\n");
        out.push_str("============\n\n");
        out.push_str(&format!("Total errors: {}\n\n", summary.total));

        out.push_str("By type:\n");
        for (kind, count) in &summary.by_type {
            out.push_str(&format!("  {:<24} {}\n", kind, count));
        }
        out.push_str("\nBy severity:\n");
        for (severity, count) in &summary.by_severity {
            out.push_str(&format!("  {:<24} {}\n", severity, count));
        }

        if !self.records.is_empty() {
            out.push_str("\nRecords:\n");
            for record in &self.records {
                out.push_str(&format!(
                    "  [{}] {} {} stage={}{} {}\n",
                    record.timestamp,
                    record.severity,
                    record.error_type,
                    record.stage,
                    record
                        .context
                        .as_deref()
                        .map(|c| format!(" context={}", c))
                        .unwrap_or_default(),
                    record.message
                ));
            }
        }
        out
    }

    /// Write `errors.json`, `errors.csv`, and `errors.txt` under `dir`,
    /// creating it if needed. Returns the written paths.
    pub fn write_reports(&self, dir: &Path) -> std::io::Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)?;
        let targets = [
            ("errors.json", ReportFormat::Json),
            ("errors.csv", ReportFormat::Csv),
            ("errors.txt", ReportFormat::Text),
        ];
        let mut written = Vec::with_capacity(targets.len());
        for (name, format) in targets {
            let path = dir.join(name);
            std::fs::write(&path, self.export(format))?;
            written.push(path);
        }
        Ok(written)
    }
}

/// Quote a CSV field when it contains a comma, quote, or newline.
fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
