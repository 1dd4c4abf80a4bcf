//! Report persistence.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Local;
use log::{error, info};
use serde::Serialize;

use super::BatchReport;
use crate::error::ReportError;
use crate::operation::OperationKind;

/// Destination for finished batch reports.
pub trait ReportSink: Send + Sync {
    /// Store one report document; returns where it went, if anywhere on disk.
    fn persist(
        &self,
        kind: OperationKind,
        group: &str,
        document: &serde_json::Value,
    ) -> Result<Option<PathBuf>, ReportError>;
}

/// Serialize `report` and hand it to `sink`. Failures are logged, not returned.
pub fn publish<T: Serialize>(sink: &dyn ReportSink, kind: OperationKind, report: &BatchReport<T>) {
    let result = serde_json::to_value(report)
        .map_err(ReportError::from)
        .and_then(|document| sink.persist(kind, &report.group_name, &document));

    match result {
        Ok(Some(path)) => info!("{} report for '{}' saved to {}", kind, report.group_name, path.display()),
        Ok(None) => {}
        Err(e) => error!("{} report for '{}' not saved: {}", kind, report.group_name, e),
    }
}

/// Writes `<dir>/<group>_<kind>_<YYYYmmddHHMMSSmmm>.json`.
///
/// Existing files are never overwritten; a clashing name gets a `_<n>` suffix.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    dir: PathBuf,
}

impl JsonFileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_stem(kind: OperationKind, group: &str) -> String {
        let group: String = group
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        format!("{group}_{kind}_{}", Local::now().format("%Y%m%d%H%M%S%3f"))
    }

    /// Create `<stem>.json`, or the first free `<stem>_<n>.json`, holding `text`.
    fn write_new(&self, stem: &str, text: &str) -> Result<PathBuf, ReportError> {
        let mut attempt = 0u32;
        loop {
            let name = match attempt {
                0 => format!("{stem}.json"),
                n => format!("{stem}_{n}.json"),
            };
            let path = self.dir.join(name);

            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    return match file.write_all(text.as_bytes()) {
                        Ok(()) => Ok(path),
                        Err(source) => Err(ReportError::Write { path, source }),
                    };
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
                Err(source) => return Err(ReportError::Write { path, source }),
            }
        }
    }
}

impl ReportSink for JsonFileSink {
    fn persist(
        &self,
        kind: OperationKind,
        group: &str,
        document: &serde_json::Value,
    ) -> Result<Option<PathBuf>, ReportError> {
        std::fs::create_dir_all(&self.dir).map_err(|source| ReportError::Write {
            path: self.dir.clone(),
            source,
        })?;

        let text = serde_json::to_string_pretty(document)?;
        self.write_new(&Self::file_stem(kind, group), &text).map(Some)
    }
}

/// Keeps reports in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    documents: Mutex<Vec<(OperationKind, String, serde_json::Value)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything persisted so far, oldest first.
    pub fn documents(&self) -> Vec<(OperationKind, String, serde_json::Value)> {
        self.documents
            .lock()
            .map(|docs| docs.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

impl ReportSink for MemorySink {
    fn persist(
        &self,
        kind: OperationKind,
        group: &str,
        document: &serde_json::Value,
    ) -> Result<Option<PathBuf>, ReportError> {
        let mut docs = self
            .documents
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        docs.push((kind, group.to_string(), document.clone()));
        Ok(None)
    }
}
