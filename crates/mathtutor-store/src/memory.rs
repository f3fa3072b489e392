//! In-memory mastery store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use mathtutor_core::error::StoreError;
use mathtutor_core::mastery::{merge, MasteryKey, MasteryRecord, MasteryUpdate};
use mathtutor_core::traits::MasteryStore;

/// A process-local store, used for tests and dry runs.
///
/// The map lock is held across read-merge-write, so concurrent updates to
/// the same key are serialized.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<MasteryKey, MasteryRecord>>,
    /// Number of upserts performed.
    upsert_count: AtomicU32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with records.
    pub fn with_records(records: impl IntoIterator<Item = MasteryRecord>) -> Self {
        let records = records.into_iter().map(|r| (r.key(), r)).collect();
        Self {
            records: Mutex::new(records),
            upsert_count: AtomicU32::new(0),
        }
    }

    /// Get the number of upserts made to this store.
    pub fn upsert_count(&self) -> u32 {
        self.upsert_count.load(Ordering::Relaxed)
    }

    /// Snapshot of every record, sorted by key.
    pub async fn snapshot(&self) -> Vec<MasteryRecord> {
        let mut records: Vec<MasteryRecord> = self.records.lock().await.values().cloned().collect();
        records.sort_by_key(MasteryRecord::key);
        records
    }
}

#[async_trait]
impl MasteryStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn fetch(&self, key: &MasteryKey) -> Result<Option<MasteryRecord>, StoreError> {
        Ok(self.records.lock().await.get(key).cloned())
    }

    async fn upsert_max(&self, update: &MasteryUpdate) -> Result<MasteryRecord, StoreError> {
        self.upsert_count.fetch_add(1, Ordering::Relaxed);
        let key = update.key();
        let mut records = self.records.lock().await;
        let merged = merge(records.get(&key), update, Utc::now());
        records.insert(key, merged.clone());
        Ok(merged)
    }

    async fn list_for_student(&self, student_id: &str) -> Result<Vec<MasteryRecord>, StoreError> {
        let mut records: Vec<MasteryRecord> = self
            .records
            .lock()
            .await
            .values()
            .filter(|r| r.student_id == student_id)
            .cloned()
            .collect();
        records.sort_by_key(MasteryRecord::key);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mathtutor_core::mastery::{apply_batch, mastery_status, update_mastery, MasteryStatus};
    use std::sync::Arc;

    fn key(student: &str) -> MasteryKey {
        MasteryKey {
            student_id: student.into(),
            topic_id: "fractions".into(),
            objective_id: "compare".into(),
        }
    }

    #[tokio::test]
    async fn first_update_inserts() {
        let store = MemoryStore::new();
        let record = update_mastery(&store, &MasteryUpdate::new("ana", "fractions", "compare", 60.0))
            .await
            .unwrap();
        assert_eq!(record.score, 60.0);
        assert_eq!(record.status, MasteryStatus::InProgress);
        assert_eq!(record.attempts, 1);
        assert_eq!(store.upsert_count(), 1);
    }

    #[tokio::test]
    async fn score_never_decreases() {
        let store = MemoryStore::new();
        for score in [85.0, 40.0] {
            update_mastery(&store, &MasteryUpdate::new("ana", "fractions", "compare", score))
                .await
                .unwrap();
        }
        let record = store.fetch(&key("ana")).await.unwrap().unwrap();
        assert_eq!(record.score, 85.0);
        assert_eq!(record.status, MasteryStatus::Mastered);
        assert_eq!(record.attempts, 2);
    }

    #[tokio::test]
    async fn unknown_key_is_not_started() {
        let store = MemoryStore::new();
        let status = mastery_status(&store, &key("nobody")).await.unwrap();
        assert_eq!(status, MasteryStatus::NotStarted);
    }

    #[tokio::test]
    async fn list_filters_by_student() {
        let store = MemoryStore::new();
        update_mastery(&store, &MasteryUpdate::new("ana", "fractions", "compare", 50.0))
            .await
            .unwrap();
        update_mastery(&store, &MasteryUpdate::new("ana", "angles", "measure", 90.0))
            .await
            .unwrap();
        update_mastery(&store, &MasteryUpdate::new("ben", "fractions", "compare", 70.0))
            .await
            .unwrap();

        let ana = store.list_for_student("ana").await.unwrap();
        assert_eq!(ana.len(), 2);
        assert_eq!(ana[0].topic_id, "angles");
        assert!(store.list_for_student("cleo").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn concurrent_updates_keep_every_attempt() {
        let store = Arc::new(MemoryStore::new());
        let updates: Vec<MasteryUpdate> = (0..50)
            .map(|i| MasteryUpdate::new("ana", "fractions", "compare", i as f64 * 2.0))
            .collect();

        let outcomes = apply_batch(store.clone(), updates, 8).await;
        assert!(outcomes.iter().all(|o| o.result.is_ok()));

        let record = store.fetch(&key("ana")).await.unwrap().unwrap();
        assert_eq!(record.attempts, 50);
        assert_eq!(record.score, 98.0);
        assert_eq!(record.status, MasteryStatus::Mastered);
    }

    #[tokio::test]
    async fn seeded_records_are_visible() {
        let seeded = merge(
            None,
            &MasteryUpdate::new("ana", "fractions", "compare", 90.0),
            Utc::now(),
        );
        let store = MemoryStore::with_records([seeded]);
        assert_eq!(store.snapshot().await.len(), 1);
        assert_eq!(
            mastery_status(&store, &key("ana")).await.unwrap(),
            MasteryStatus::Mastered
        );
    }
}
