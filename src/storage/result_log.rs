// Result log - append-only CSV of successful analyses
use anyhow::{Context, Result};
use chrono::Local;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::analysis::AnalysisResult;

pub const RESULT_LOG_HEADER: [&str; 4] = ["timestamp", "transcript", "summary", "sentiment"];

/// One writer at a time; every append is a whole CSV record.
pub struct ResultLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl ResultLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one row, creating the file with its header first if needed.
    pub fn append(&self, transcript: &str, result: &AnalysisResult) -> Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| anyhow::anyhow!("Result log lock poisoned: {}", e))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }

        let needs_header = std::fs::metadata(&self.path)
            .map(|m| m.len() == 0)
            .unwrap_or(true);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open {}", self.path.display()))?;

        let timestamp = Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string();

        // Build the whole record in memory so the file sees a single write.
        let mut writer = csv::Writer::from_writer(Vec::new());
        if needs_header {
            writer.write_record(RESULT_LOG_HEADER)?;
        }
        writer.write_record([
            timestamp.as_str(),
            transcript,
            result.summary.as_str(),
            result.sentiment.as_str(),
        ])?;
        let bytes = writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Failed to encode CSV row: {}", e))?;

        file.write_all(&bytes)
            .with_context(|| format!("Failed to append to {}", self.path.display()))?;

        if needs_header {
            log::info!("Created new result log: {}", self.path.display());
        }
        log::info!("Saved analysis to {}", self.path.display());
        Ok(())
    }
}
