use super::counter::UsageCounter;
use crate::error::QuotaStoreError;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, instrument};

/// Durable home of the usage counter. Owned by the host application.
#[async_trait]
pub trait QuotaStore: Send + Sync {
    async fn load(&self) -> Result<Option<UsageCounter>, QuotaStoreError>;
    async fn save(&self, counter: &UsageCounter) -> Result<(), QuotaStoreError>;
}

#[derive(Debug, Default)]
pub struct InMemoryQuotaStore {
    counter: Mutex<Option<UsageCounter>>,
}

impl InMemoryQuotaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_counter(counter: UsageCounter) -> Self {
        Self {
            counter: Mutex::new(Some(counter)),
        }
    }
}

#[async_trait]
impl QuotaStore for InMemoryQuotaStore {
    async fn load(&self) -> Result<Option<UsageCounter>, QuotaStoreError> {
        Ok(self.counter.lock().await.clone())
    }

    async fn save(&self, counter: &UsageCounter) -> Result<(), QuotaStoreError> {
        *self.counter.lock().await = Some(counter.clone());
        Ok(())
    }
}

/// Keeps the counter in a JSON file. Writes go to a sibling temp file that is
/// then renamed over the target, so a crash never leaves a torn counter.
#[derive(Debug, Clone)]
pub struct JsonFileQuotaStore {
    path: PathBuf,
}

impl JsonFileQuotaStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "usage.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl QuotaStore for JsonFileQuotaStore {
    #[instrument(skip(self), fields(path = ?self.path))]
    async fn load(&self) -> Result<Option<UsageCounter>, QuotaStoreError> {
        let json = match tokio::fs::read_to_string(&self.path).await {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No usage file yet");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        let counter = serde_json::from_str(&json)?;
        Ok(Some(counter))
    }

    #[instrument(skip(self, counter), fields(path = ?self.path, period = %counter.period, count = counter.count))]
    async fn save(&self, counter: &UsageCounter) -> Result<(), QuotaStoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(counter)?;
        let temp = self.temp_path();
        tokio::fs::write(&temp, json).await?;
        tokio::fs::rename(&temp, &self.path).await?;
        debug!("Usage counter saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_store_round_trips() {
        let store = InMemoryQuotaStore::new();
        assert_eq!(store.load().await.unwrap(), None);
        let counter = UsageCounter {
            period: "2024-06".to_string(),
            count: 3,
        };
        store.save(&counter).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(counter));
    }

    #[tokio::test]
    async fn json_store_survives_reopening() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("usage.json");
        let counter = UsageCounter {
            period: "2024-06".to_string(),
            count: 42,
        };

        assert_eq!(JsonFileQuotaStore::new(&path).load().await.unwrap(), None);
        JsonFileQuotaStore::new(&path).save(&counter).await.unwrap();

        let reopened = JsonFileQuotaStore::new(&path);
        assert_eq!(reopened.load().await.unwrap(), Some(counter));
        assert!(!reopened.temp_path().exists());
    }

    #[tokio::test]
    async fn corrupt_file_is_a_store_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("usage.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = JsonFileQuotaStore::new(&path).load().await.unwrap_err();
        assert!(matches!(err, QuotaStoreError::Serialization(_)));
    }
}
