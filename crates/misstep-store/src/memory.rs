//! In-memory mastery store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::RwLock;

use misstep_core::model::{MasteryRecord, MasteryStatus};
use misstep_core::traits::MasteryStore;

use crate::error::StoreError;

type RecordKey = (String, String);

fn key(student_id: &str, concept_id: &str) -> RecordKey {
    (student_id.to_string(), concept_id.to_string())
}

/// Mastery records keyed by (student, concept), held in memory.
///
/// Safe to share across threads; every update is a set-to-value on a single
/// record.
#[derive(Debug, Default)]
pub struct InMemoryMasteryStore {
    records: RwLock<HashMap<RecordKey, MasteryRecord>>,
    /// Number of downgrade requests received.
    downgrade_requests: AtomicU32,
}

impl InMemoryMasteryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from existing records. Later duplicates win.
    pub fn from_records(records: impl IntoIterator<Item = MasteryRecord>) -> Self {
        let map = records
            .into_iter()
            .map(|r| (key(&r.student_id, &r.concept_id), r))
            .collect();
        Self {
            records: RwLock::new(map),
            downgrade_requests: AtomicU32::new(0),
        }
    }

    /// Set a status, creating the record if needed.
    pub fn set_status(
        &self,
        student_id: &str,
        concept_id: &str,
        status: MasteryStatus,
    ) -> Result<(), StoreError> {
        let mut records = self.records.write().map_err(|_| StoreError::Poisoned)?;
        records
            .entry(key(student_id, concept_id))
            .or_insert_with(|| empty_record(student_id, concept_id))
            .status = status;
        Ok(())
    }

    /// Record a scored attempt on a concept.
    ///
    /// A pass marks the concept mastered. A fail moves it to in-progress unless
    /// it was already mastered.
    pub fn record_attempt(
        &self,
        student_id: &str,
        concept_id: &str,
        score: f64,
        passed: bool,
    ) -> Result<MasteryRecord, StoreError> {
        let mut records = self.records.write().map_err(|_| StoreError::Poisoned)?;
        let record = records
            .entry(key(student_id, concept_id))
            .or_insert_with(|| empty_record(student_id, concept_id));
        record.attempts += 1;
        record.last_score = score;
        if passed {
            record.status = MasteryStatus::Mastered;
        } else if record.status != MasteryStatus::Mastered {
            record.status = MasteryStatus::InProgress;
        }
        Ok(record.clone())
    }

    /// A copy of one record.
    pub fn record(&self, student_id: &str, concept_id: &str) -> Result<Option<MasteryRecord>, StoreError> {
        let records = self.records.read().map_err(|_| StoreError::Poisoned)?;
        Ok(records.get(&key(student_id, concept_id)).cloned())
    }

    /// All records, sorted by student then concept.
    pub fn records(&self) -> Result<Vec<MasteryRecord>, StoreError> {
        let records = self.records.read().map_err(|_| StoreError::Poisoned)?;
        let mut all: Vec<MasteryRecord> = records.values().cloned().collect();
        all.sort_by(|a, b| {
            (a.student_id.as_str(), a.concept_id.as_str())
                .cmp(&(b.student_id.as_str(), b.concept_id.as_str()))
        });
        Ok(all)
    }

    pub fn downgrade_requests(&self) -> u32 {
        self.downgrade_requests.load(Ordering::Relaxed)
    }

    /// Put a record back to an earlier snapshot; `None` removes it.
    pub(crate) fn restore(
        &self,
        student_id: &str,
        concept_id: &str,
        snapshot: Option<MasteryRecord>,
    ) -> Result<(), StoreError> {
        let mut records = self.records.write().map_err(|_| StoreError::Poisoned)?;
        let key = key(student_id, concept_id);
        match snapshot {
            Some(record) => records.insert(key, record),
            None => records.remove(&key),
        };
        Ok(())
    }

    /// Demote a mastered record. Returns `true` if the status changed.
    pub(crate) fn downgrade(&self, student_id: &str, concept_id: &str) -> Result<bool, StoreError> {
        self.downgrade_requests.fetch_add(1, Ordering::Relaxed);
        let mut records = self.records.write().map_err(|_| StoreError::Poisoned)?;
        match records.get_mut(&key(student_id, concept_id)) {
            Some(record) if record.status == MasteryStatus::Mastered => {
                record.status = MasteryStatus::NeedsReview;
                tracing::debug!("{concept_id} for {student_id}: mastered -> needs_review");
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

fn empty_record(student_id: &str, concept_id: &str) -> MasteryRecord {
    MasteryRecord {
        student_id: student_id.to_string(),
        concept_id: concept_id.to_string(),
        status: MasteryStatus::NotStarted,
        attempts: 0,
        last_score: 0.0,
    }
}

impl MasteryStore for InMemoryMasteryStore {
    fn get(&self, student_id: &str, concept_id: &str) -> anyhow::Result<Option<MasteryStatus>> {
        Ok(self.record(student_id, concept_id)?.map(|r| r.status))
    }

    fn request_downgrade(&self, student_id: &str, concept_id: &str) -> anyhow::Result<()> {
        self.downgrade(student_id, concept_id)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_record_is_none() {
        let store = InMemoryMasteryStore::new();
        assert_eq!(store.get("s1", "algebra").unwrap(), None);
    }

    #[test]
    fn downgrade_only_touches_mastered() {
        let store = InMemoryMasteryStore::new();
        store.set_status("s1", "algebra", MasteryStatus::Mastered).unwrap();
        store.set_status("s1", "trig", MasteryStatus::InProgress).unwrap();

        store.request_downgrade("s1", "algebra").unwrap();
        store.request_downgrade("s1", "trig").unwrap();
        store.request_downgrade("s1", "unknown").unwrap();

        assert_eq!(store.get("s1", "algebra").unwrap(), Some(MasteryStatus::NeedsReview));
        assert_eq!(store.get("s1", "trig").unwrap(), Some(MasteryStatus::InProgress));
        assert_eq!(store.get("s1", "unknown").unwrap(), None);
        assert_eq!(store.downgrade_requests(), 3);
    }

    #[test]
    fn downgrade_is_idempotent() {
        let store = InMemoryMasteryStore::new();
        store.set_status("s1", "algebra", MasteryStatus::Mastered).unwrap();
        assert!(store.downgrade("s1", "algebra").unwrap());
        assert!(!store.downgrade("s1", "algebra").unwrap());
        assert_eq!(store.get("s1", "algebra").unwrap(), Some(MasteryStatus::NeedsReview));
    }

    #[test]
    fn records_are_per_student() {
        let store = InMemoryMasteryStore::new();
        store.set_status("s1", "algebra", MasteryStatus::Mastered).unwrap();
        store.request_downgrade("s2", "algebra").unwrap();
        assert_eq!(store.get("s1", "algebra").unwrap(), Some(MasteryStatus::Mastered));
    }

    #[test]
    fn attempts_update_status() {
        let store = InMemoryMasteryStore::new();
        let first = store.record_attempt("s1", "algebra", 0.4, false).unwrap();
        assert_eq!(first.status, MasteryStatus::InProgress);
        assert_eq!(first.attempts, 1);

        let second = store.record_attempt("s1", "algebra", 0.9, true).unwrap();
        assert_eq!(second.status, MasteryStatus::Mastered);
        assert_eq!(second.attempts, 2);

        // a later fail does not undo mastery
        let third = store.record_attempt("s1", "algebra", 0.2, false).unwrap();
        assert_eq!(third.status, MasteryStatus::Mastered);
        assert_eq!(third.last_score, 0.2);
    }

    #[test]
    fn records_sorted_and_seeded() {
        let store = InMemoryMasteryStore::from_records(vec![
            empty_record("s2", "b"),
            empty_record("s1", "z"),
            empty_record("s1", "a"),
        ]);
        let keys: Vec<(String, String)> = store
            .records()
            .unwrap()
            .into_iter()
            .map(|r| (r.student_id, r.concept_id))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("s1".to_string(), "a".to_string()),
                ("s1".to_string(), "z".to_string()),
                ("s2".to_string(), "b".to_string()),
            ]
        );
    }

    #[test]
    fn concurrent_downgrades_agree() {
        let store = std::sync::Arc::new(InMemoryMasteryStore::new());
        store.set_status("s1", "algebra", MasteryStatus::Mastered).unwrap();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || store.request_downgrade("s1", "algebra").unwrap())
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(store.get("s1", "algebra").unwrap(), Some(MasteryStatus::NeedsReview));
        assert_eq!(store.downgrade_requests(), 8);
    }
}
