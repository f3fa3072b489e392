//! Mastery store backed by a single JSON file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use mathtutor_core::error::StoreError;
use mathtutor_core::mastery::{merge, MasteryKey, MasteryRecord, MasteryUpdate};
use mathtutor_core::traits::MasteryStore;

/// Stores every record as a JSON array in one file.
///
/// Writes go to a sibling temp file which is then renamed over the target.
/// Updates within one process are serialized by an async lock; the file is
/// not safe to share between processes.
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<Vec<MasteryRecord>, StoreError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    async fn write_all(&self, records: &[MasteryRecord]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let json = serde_json::to_string_pretty(records)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl MasteryStore for JsonFileStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn fetch(&self, key: &MasteryKey) -> Result<Option<MasteryRecord>, StoreError> {
        let _guard = self.lock.lock().await;
        let records = self.read_all().await?;
        Ok(records.into_iter().find(|r| r.key() == *key))
    }

    async fn upsert_max(&self, update: &MasteryUpdate) -> Result<MasteryRecord, StoreError> {
        let _guard = self.lock.lock().await;
        let mut records = self.read_all().await?;
        let key = update.key();

        let merged = match records.iter_mut().find(|r| r.key() == key) {
            Some(existing) => {
                let merged = merge(Some(&*existing), update, Utc::now());
                *existing = merged.clone();
                merged
            }
            None => {
                let merged = merge(None, update, Utc::now());
                records.push(merged.clone());
                merged
            }
        };

        records.sort_by_key(MasteryRecord::key);
        self.write_all(&records).await?;
        tracing::debug!(path = %self.path.display(), key = %key, "wrote mastery file");
        Ok(merged)
    }

    async fn list_for_student(&self, student_id: &str) -> Result<Vec<MasteryRecord>, StoreError> {
        let _guard = self.lock.lock().await;
        let records = self.read_all().await?;
        Ok(records
            .into_iter()
            .filter(|r| r.student_id == student_id)
            .collect())
    }
}
