//! JSON progress-file mastery store.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use misstep_core::model::{MasteryRecord, MasteryStatus};
use misstep_core::traits::MasteryStore;

use crate::error::StoreError;
use crate::memory::InMemoryMasteryStore;

#[derive(Debug, Default, Serialize, Deserialize)]
struct ProgressFile {
    #[serde(default)]
    records: Vec<MasteryRecord>,
}

/// Mastery records backed by a `{"records": [...]}` JSON file.
///
/// Every mutation is written through immediately. A write that fails rolls
/// the record back. A missing file is an empty store and is created on the
/// first write.
#[derive(Debug)]
pub struct JsonFileMasteryStore {
    path: PathBuf,
    inner: InMemoryMasteryStore,
}

impl JsonFileMasteryStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let records = if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
            let parsed: ProgressFile =
                serde_json::from_str(&content).map_err(|source| StoreError::Corrupted {
                    path: path.clone(),
                    source,
                })?;
            tracing::debug!("loaded {} mastery records from {}", parsed.records.len(), path.display());
            parsed.records
        } else {
            Vec::new()
        };

        Ok(Self {
            path,
            inner: InMemoryMasteryStore::from_records(records),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> Result<Vec<MasteryRecord>, StoreError> {
        self.inner.records()
    }

    pub fn set_status(
        &self,
        student_id: &str,
        concept_id: &str,
        status: MasteryStatus,
    ) -> Result<(), StoreError> {
        let before = self.inner.record(student_id, concept_id)?;
        self.inner.set_status(student_id, concept_id, status)?;
        self.save_or_restore(student_id, concept_id, before)
    }

    pub fn record_attempt(
        &self,
        student_id: &str,
        concept_id: &str,
        score: f64,
        passed: bool,
    ) -> Result<MasteryRecord, StoreError> {
        let before = self.inner.record(student_id, concept_id)?;
        let record = self.inner.record_attempt(student_id, concept_id, score, passed)?;
        self.save_or_restore(student_id, concept_id, before)?;
        Ok(record)
    }

    /// Save, or roll the record back to `before` so memory never runs ahead
    /// of the file.
    fn save_or_restore(
        &self,
        student_id: &str,
        concept_id: &str,
        before: Option<MasteryRecord>,
    ) -> Result<(), StoreError> {
        if let Err(e) = self.save() {
            tracing::warn!("rolling back {concept_id} for {student_id}: {e}");
            self.inner.restore(student_id, concept_id, before)?;
            return Err(e);
        }
        Ok(())
    }

    /// Write all records to the progress file.
    pub fn save(&self) -> Result<(), StoreError> {
        let file = ProgressFile {
            records: self.inner.records()?,
        };
        let io_err = |source: std::io::Error| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(&file).map_err(|source| StoreError::Corrupted {
            path: self.path.clone(),
            source,
        })?;
        std::fs::write(&self.path, json).map_err(io_err)
    }
}

impl MasteryStore for JsonFileMasteryStore {
    fn get(&self, student_id: &str, concept_id: &str) -> anyhow::Result<Option<MasteryStatus>> {
        self.inner.get(student_id, concept_id)
    }

    fn request_downgrade(&self, student_id: &str, concept_id: &str) -> anyhow::Result<()> {
        let before = self.inner.record(student_id, concept_id)?;
        if self.inner.downgrade(student_id, concept_id)? {
            self.save_or_restore(student_id, concept_id, before)?;
        }
        Ok(())
    }
}
