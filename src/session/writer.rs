//! Persistence for finished sessions
//!
//! Writes a [`RecordSeries`] to CSV or JSON Lines, and optionally the
//! session's [`SessionMetadata`] to a `.meta.json` sidecar.

use crate::config::PersistenceFormat;
use crate::error::{MotionLogError, Result, ResultExt};
use crate::types::Record;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::sink::RecordSeries;
use super::types::SessionMetadata;

/// CSV header, one column per record field
pub const CSV_HEADER: &str = "Timestamp_ms,AccX,AccY,AccZ,Timestamp_sec";

/// Writes record series to disk
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordWriter {
    format: PersistenceFormat,
}

impl RecordWriter {
    /// Create a writer for the given format
    pub fn new(format: PersistenceFormat) -> Self {
        Self { format }
    }

    /// Write every record in `series` to `path`
    ///
    /// An empty series yields `EmptySession` and no file is created.
    /// Returns the number of rows written.
    pub fn write(&self, series: &RecordSeries, path: &Path) -> Result<usize> {
        if series.is_empty() {
            return Err(MotionLogError::EmptySession);
        }
        ensure_parent(path)?;

        let file = File::create(path)
            .map_err(MotionLogError::from)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        let mut writer = BufWriter::new(file);

        match self.format {
            PersistenceFormat::Csv => {
                writeln!(writer, "{}", CSV_HEADER)?;
                for record in series {
                    writeln!(writer, "{}", csv_row(record))?;
                }
            }
            PersistenceFormat::JsonLines => {
                for record in series {
                    let line = serde_json::to_string(record).context("Failed to encode record")?;
                    writeln!(writer, "{}", line)?;
                }
            }
        }

        writer.flush()?;
        tracing::info!(
            "Wrote {} records to {} ({})",
            series.len(),
            path.display(),
            self.format
        );
        Ok(series.len())
    }

    /// Write session metadata next to `output`
    pub fn write_metadata(&self, metadata: &SessionMetadata, output: &Path) -> Result<PathBuf> {
        let path = metadata_path(output);
        ensure_parent(&path)?;
        let json = serde_json::to_string_pretty(metadata).context("Failed to encode metadata")?;
        std::fs::write(&path, json)?;
        tracing::debug!("Wrote session metadata to {}", path.display());
        Ok(path)
    }
}

/// One CSV row for a record
pub fn csv_row(record: &Record) -> String {
    format!(
        "{},{:?},{:?},{:?},{:?}",
        record.raw_timestamp, record.x, record.y, record.z, record.elapsed_seconds
    )
}

/// Sidecar path for an output file: `<output>.meta.json`
pub fn metadata_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_os_string();
    name.push(".meta.json");
    PathBuf::from(name)
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
