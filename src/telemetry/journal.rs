//! # Delivery Journal
//!
//! Appends one JSON line per transmission attempt so lost samples can be
//! audited after the fact. Files are named
//! `deliveries_<UTC timestamp>_<seq>.jsonl`, which sorts oldest first.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::config::TelemetryConfig;
use crate::error::Result;
use crate::gps::LocationSample;

const FILE_PREFIX: &str = "deliveries_";
const FILE_SUFFIX: &str = ".jsonl";

/// One line of the journal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalRecord {
    pub timestamp: DateTime<Utc>,
    /// `delivered`, `rejected` or `failed`
    pub outcome: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub sample: LocationSample,
}

/// Rotating JSONL writer
pub struct DeliveryJournal {
    dir: PathBuf,
    max_records_per_file: usize,
    max_files_to_keep: usize,
    writer: Option<BufWriter<File>>,
    records_in_file: usize,
    file_seq: u64,
}

impl std::fmt::Debug for DeliveryJournal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveryJournal")
            .field("dir", &self.dir)
            .field("records_in_file", &self.records_in_file)
            .finish_non_exhaustive()
    }
}

impl DeliveryJournal {
    /// Open a journal in `config.log_dir`, creating the directory if needed
    pub fn open(config: &TelemetryConfig) -> Result<Self> {
        let dir = PathBuf::from(&config.log_dir);
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            max_records_per_file: config.max_records_per_file.max(1),
            max_files_to_keep: config.max_files_to_keep.max(1),
            writer: None,
            records_in_file: 0,
            file_seq: 0,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Append a record, rotating first if the current file is full
    pub fn append(&mut self, record: &JournalRecord) -> Result<()> {
        if self.writer.is_none() || self.records_in_file >= self.max_records_per_file {
            self.rotate()?;
        }

        if let Some(writer) = self.writer.as_mut() {
            serde_json::to_writer(&mut *writer, record)?;
            writer.write_all(b"\n")?;
            writer.flush()?;
            self.records_in_file += 1;
        }
        Ok(())
    }

    fn rotate(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }

        let name = format!(
            "{}{}_{:04}{}",
            FILE_PREFIX,
            Utc::now().format("%Y%m%dT%H%M%S"),
            self.file_seq,
            FILE_SUFFIX
        );
        self.file_seq += 1;

        let path = self.dir.join(&name);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        debug!("Opened delivery journal {}", path.display());

        self.writer = Some(BufWriter::new(file));
        self.records_in_file = 0;
        self.prune()
    }

    /// Journal files currently on disk, oldest first
    pub fn files(&self) -> Result<Vec<PathBuf>> {
        let mut files: Vec<PathBuf> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(FILE_PREFIX) && n.ends_with(FILE_SUFFIX))
            })
            .collect();
        files.sort();
        Ok(files)
    }

    fn prune(&self) -> Result<()> {
        let files = self.files()?;
        if files.len() <= self.max_files_to_keep {
            return Ok(());
        }
        let excess = files.len() - self.max_files_to_keep;
        for path in &files[..excess] {
            if let Err(e) = fs::remove_file(path) {
                warn!("Failed to remove old journal {}: {}", path.display(), e);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gps::LocationSample;

    fn config(dir: &Path, per_file: usize, keep: usize) -> TelemetryConfig {
        TelemetryConfig {
            enabled: true,
            log_dir: dir.to_string_lossy().into_owned(),
            max_records_per_file: per_file,
            max_files_to_keep: keep,
        }
    }

    fn record(outcome: &str, status: Option<u16>) -> JournalRecord {
        JournalRecord {
            timestamp: Utc::now(),
            outcome: outcome.to_string(),
            status,
            error: None,
            sample: LocationSample::placeholder("ESP32-001"),
        }
    }

    #[test]
    fn test_append_writes_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let mut journal = DeliveryJournal::open(&config(dir.path(), 100, 5)).unwrap();

        journal.append(&record("delivered", Some(201))).unwrap();
        journal.append(&record("rejected", Some(500))).unwrap();

        let files = journal.files().unwrap();
        assert_eq!(files.len(), 1);

        let contents = fs::read_to_string(&files[0]).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: JournalRecord = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.outcome, "delivered");
        assert_eq!(first.status, Some(201));
        assert_eq!(first.sample.hardware_id, "ESP32-001");
    }

    #[test]
    fn test_failed_record_omits_status() {
        let mut failed = record("failed", None);
        failed.error = Some("connection refused".to_string());

        let line = serde_json::to_string(&failed).unwrap();
        assert!(!line.contains("\"status\""));
        assert!(line.contains("connection refused"));
    }

    #[test]
    fn test_rotation_by_record_count() {
        let dir = tempfile::tempdir().unwrap();
        let mut journal = DeliveryJournal::open(&config(dir.path(), 2, 10)).unwrap();

        for _ in 0..5 {
            journal.append(&record("delivered", Some(200))).unwrap();
        }

        let files = journal.files().unwrap();
        assert_eq!(files.len(), 3);
        let total: usize = files
            .iter()
            .map(|f| fs::read_to_string(f).unwrap().lines().count())
            .sum();
        assert_eq!(total, 5);
    }

    #[test]
    fn test_old_files_pruned() {
        let dir = tempfile::tempdir().unwrap();
        let mut journal = DeliveryJournal::open(&config(dir.path(), 1, 2)).unwrap();

        for _ in 0..6 {
            journal.append(&record("delivered", Some(200))).unwrap();
        }

        assert_eq!(journal.files().unwrap().len(), 2);
    }

    #[test]
    fn test_unrelated_files_ignored() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), "keep me").unwrap();

        let mut journal = DeliveryJournal::open(&config(dir.path(), 1, 1)).unwrap();
        journal.append(&record("delivered", Some(200))).unwrap();
        journal.append(&record("delivered", Some(200))).unwrap();

        assert!(dir.path().join("notes.txt").exists());
        assert_eq!(journal.files().unwrap().len(), 1);
    }

    #[test]
    fn test_open_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let journal = DeliveryJournal::open(&config(&nested, 10, 10)).unwrap();
        assert!(journal.dir().is_dir());
    }
}
