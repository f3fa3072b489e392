//! Mastery scoring: clamping, status thresholds, max-merge, and updates.
//!
//! A mastery record tracks how well a student has demonstrated one
//! curriculum objective within a topic. Stored scores never go down.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use crate::error::StoreError;
use crate::traits::MasteryStore;

/// Scores at or above this are `mastered`.
pub const MASTERED_THRESHOLD: f64 = 80.0;

/// Three-state mastery status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MasteryStatus {
    /// No record exists yet. Never produced by an update.
    #[default]
    NotStarted,
    InProgress,
    Mastered,
}

impl fmt::Display for MasteryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MasteryStatus::NotStarted => write!(f, "not_started"),
            MasteryStatus::InProgress => write!(f, "in_progress"),
            MasteryStatus::Mastered => write!(f, "mastered"),
        }
    }
}

/// Clamp a raw percentage into `[0, 100]`. NaN counts as 0.
pub fn clamp_score(raw: f64) -> f64 {
    if raw.is_nan() {
        return 0.0;
    }
    raw.clamp(0.0, 100.0)
}

/// Status for a clamped score. Anything below the mastered threshold,
/// including scores under 30, is `in_progress`.
pub fn status_for_score(score: f64) -> MasteryStatus {
    if score >= MASTERED_THRESHOLD {
        MasteryStatus::Mastered
    } else {
        MasteryStatus::InProgress
    }
}

/// Composite key of a mastery record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MasteryKey {
    pub student_id: String,
    pub topic_id: String,
    pub objective_id: String,
}

impl fmt::Display for MasteryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.student_id, self.topic_id, self.objective_id
        )
    }
}

/// A stored mastery record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasteryRecord {
    pub student_id: String,
    pub topic_id: String,
    pub objective_id: String,
    pub score: f64,
    pub status: MasteryStatus,
    pub attempts: u32,
    #[serde(default)]
    pub curriculum_country: Option<String>,
    #[serde(default)]
    pub curriculum_level: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl MasteryRecord {
    pub fn key(&self) -> MasteryKey {
        MasteryKey {
            student_id: self.student_id.clone(),
            topic_id: self.topic_id.clone(),
            objective_id: self.objective_id.clone(),
        }
    }
}

/// A new score to fold into a student's mastery of an objective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasteryUpdate {
    pub student_id: String,
    pub topic_id: String,
    pub objective_id: String,
    /// Raw percentage; clamped before it is stored.
    pub score: f64,
    #[serde(default)]
    pub curriculum_country: Option<String>,
    #[serde(default)]
    pub curriculum_level: Option<String>,
}

impl MasteryUpdate {
    pub fn new(
        student_id: impl Into<String>,
        topic_id: impl Into<String>,
        objective_id: impl Into<String>,
        score: f64,
    ) -> Self {
        Self {
            student_id: student_id.into(),
            topic_id: topic_id.into(),
            objective_id: objective_id.into(),
            score,
            curriculum_country: None,
            curriculum_level: None,
        }
    }

    /// Attach curriculum country/level codes.
    pub fn with_curriculum(mut self, country: Option<String>, level: Option<String>) -> Self {
        self.curriculum_country = country;
        self.curriculum_level = level;
        self
    }

    pub fn key(&self) -> MasteryKey {
        MasteryKey {
            student_id: self.student_id.clone(),
            topic_id: self.topic_id.clone(),
            objective_id: self.objective_id.clone(),
        }
    }
}

/// Fold an update into the existing record for its key, or create one.
///
/// The stored score is `max(existing, clamped new)`, the status is
/// recomputed from it, and the attempt counter goes up by one.
pub fn merge(
    existing: Option<&MasteryRecord>,
    update: &MasteryUpdate,
    now: DateTime<Utc>,
) -> MasteryRecord {
    let incoming = clamp_score(update.score);

    match existing {
        Some(record) => {
            let score = record.score.max(incoming);
            MasteryRecord {
                student_id: record.student_id.clone(),
                topic_id: record.topic_id.clone(),
                objective_id: record.objective_id.clone(),
                score,
                status: status_for_score(score),
                attempts: record.attempts.saturating_add(1),
                curriculum_country: update
                    .curriculum_country
                    .clone()
                    .or_else(|| record.curriculum_country.clone()),
                curriculum_level: update
                    .curriculum_level
                    .clone()
                    .or_else(|| record.curriculum_level.clone()),
                updated_at: now,
            }
        }
        None => MasteryRecord {
            student_id: update.student_id.clone(),
            topic_id: update.topic_id.clone(),
            objective_id: update.objective_id.clone(),
            score: incoming,
            status: status_for_score(incoming),
            attempts: 1,
            curriculum_country: update.curriculum_country.clone(),
            curriculum_level: update.curriculum_level.clone(),
            updated_at: now,
        },
    }
}

/// Record a student's score for an objective.
///
/// The score is clamped, then the store performs an atomic max-merge.
/// Store errors are returned unchanged; there is no retry.
pub async fn update_mastery(
    store: &dyn MasteryStore,
    update: &MasteryUpdate,
) -> Result<MasteryRecord, StoreError> {
    let clamped = MasteryUpdate {
        score: clamp_score(update.score),
        ..update.clone()
    };

    let record = store.upsert_max(&clamped).await?;
    tracing::info!(
        key = %record.key(),
        store = store.name(),
        score = record.score,
        status = %record.status,
        attempts = record.attempts,
        "mastery updated"
    );
    Ok(record)
}

/// Current status for a key, `not_started` when no record exists.
pub async fn mastery_status(
    store: &dyn MasteryStore,
    key: &MasteryKey,
) -> Result<MasteryStatus, StoreError> {
    Ok(store
        .fetch(key)
        .await?
        .map(|record| record.status)
        .unwrap_or_default())
}

/// Outcome of one update within a batch.
#[derive(Debug)]
pub struct BatchOutcome {
    pub key: MasteryKey,
    pub result: Result<MasteryRecord, StoreError>,
}

/// Apply many updates concurrently, at most `parallelism` at a time.
///
/// Outcomes are returned in input order. A failed update does not stop the
/// others.
pub async fn apply_batch(
    store: Arc<dyn MasteryStore>,
    updates: Vec<MasteryUpdate>,
    parallelism: usize,
) -> Vec<BatchOutcome> {
    let semaphore = Arc::new(Semaphore::new(parallelism.max(1)));
    let mut futures = FuturesUnordered::new();

    for (index, update) in updates.into_iter().enumerate() {
        let store = Arc::clone(&store);
        let semaphore = Arc::clone(&semaphore);
        futures.push(async move {
            let key = update.key();
            let result = match semaphore.acquire_owned().await {
                Ok(_permit) => update_mastery(store.as_ref(), &update).await,
                Err(_) => Err(StoreError::Network("semaphore closed".into())),
            };
            (index, BatchOutcome { key, result })
        });
    }

    let mut outcomes = Vec::with_capacity(futures.len());
    while let Some((index, outcome)) = futures.next().await {
        if let Err(e) = &outcome.result {
            tracing::error!("mastery update failed for {}: {e}", outcome.key);
        }
        outcomes.push((index, outcome));
    }

    outcomes.sort_by_key(|(index, _)| *index);
    outcomes.into_iter().map(|(_, outcome)| outcome).collect()
}
