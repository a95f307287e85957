//! Local JSONL consultation store.
//!
//! Demo-mode stand-in for the hosted database: one append-only JSONL file
//! per field under the data directory, so consultations remain auditable
//! without mutating earlier entries.
use super::{ConsultationRecord, ConsultationStore};
use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// One line of the JSONL history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredConsultation {
    pub id: String,
    #[serde(flatten)]
    pub record: ConsultationRecord,
}

pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn history_path(&self, farmer_id: &str, field_id: &str) -> PathBuf {
        self.root
            .join("consultations")
            .join(farmer_id)
            .join(format!("{field_id}.jsonl"))
    }

    /// Read back the full history for a field, oldest first.
    pub fn records(&self, farmer_id: &str, field_id: &str) -> Result<Vec<StoredConsultation>> {
        let path = self.history_path(farmer_id, field_id);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let text = fs::read_to_string(&path)
            .with_context(|| format!("read {}", path.display()))?;
        text.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                serde_json::from_str(line)
                    .with_context(|| format!("parse consultation line in {}", path.display()))
            })
            .collect()
    }
}

fn append_line(path: &Path, line: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create {}", parent.display()))?;
    }
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open {}", path.display()))?;
    file.write_all(line.as_bytes())
        .with_context(|| format!("write {}", path.display()))?;
    file.write_all(b"\n")
        .with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

impl ConsultationStore for FileStore {
    fn append(
        &self,
        farmer_id: &str,
        field_id: &str,
        record: &ConsultationRecord,
    ) -> Result<String> {
        let id = format!("c{}", Utc::now().timestamp_millis());
        let stored = StoredConsultation {
            id: id.clone(),
            record: record.clone(),
        };
        let line = serde_json::to_string(&stored).context("serialize consultation record")?;
        let path = self.history_path(farmer_id, field_id);
        append_line(&path, &line)?;
        Ok(id)
    }
}
