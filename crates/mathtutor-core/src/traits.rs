//! Core trait definitions for mastery persistence.
//!
//! Implemented by the `mathtutor-store` crate for in-memory, file, and
//! PostgREST backends.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::mastery::{MasteryKey, MasteryRecord, MasteryUpdate};

/// Trait for backends that persist per-(student, topic, objective) mastery.
#[async_trait]
pub trait MasteryStore: Send + Sync {
    /// Human-readable backend name (e.g. "postgrest").
    fn name(&self) -> &str;

    /// Read the record for a key, if one exists.
    async fn fetch(&self, key: &MasteryKey) -> Result<Option<MasteryRecord>, StoreError>;

    /// Insert or max-merge a record for the update's key, atomically.
    ///
    /// Implementations must apply [`merge`](crate::mastery::merge) semantics
    /// without letting a concurrent update for the same key interleave
    /// between the read and the write. `update.score` is already clamped.
    async fn upsert_max(&self, update: &MasteryUpdate) -> Result<MasteryRecord, StoreError>;

    /// All records for a student, ordered by topic then objective.
    async fn list_for_student(&self, student_id: &str) -> Result<Vec<MasteryRecord>, StoreError>;
}
