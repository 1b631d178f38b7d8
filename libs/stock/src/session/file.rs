use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::KvBackend;

/// Session entries kept in a single JSON document on disk.
pub struct FileBackend {
    path: PathBuf,
    write_lock: Mutex<()>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Entry {
    value: String,
    expires_at: DateTime<Utc>,
}

type Entries = BTreeMap<String, Entry>;

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// `<data dir>/stock-checker/session.json`
    pub fn default_path() -> Result<PathBuf> {
        dirs::data_local_dir()
            .map(|dir| dir.join("stock-checker").join("session.json"))
            .ok_or_else(|| Error::msg("no local data directory on this platform"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling the document is written to before it replaces `path`.
    fn tmp_path(&self) -> PathBuf {
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        PathBuf::from(tmp)
    }

    async fn load(&self) -> Result<Entries> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Entries::new()),
            Err(e) => {
                return Err(Error::from(e)
                    .context(format!("reading session file {}", self.path.display())));
            }
        };

        match serde_json::from_str(&raw) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "session file unreadable, starting fresh");
                Ok(Entries::new())
            }
        }
    }
}

#[async_trait]
impl KvBackend for FileBackend {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.load().await?;
        Ok(entries
            .get(key)
            .filter(|e| e.expires_at > Utc::now())
            .map(|e| e.value.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let now = Utc::now();
        let mut entries = self.load().await?;
        entries.retain(|_, e| e.expires_at > now);
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: now + TimeDelta::from_std(ttl)?,
            },
        );

        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("creating {}", dir.display()))?;
        }

        let raw = serde_json::to_string_pretty(&entries)?;
        let tmp = self.tmp_path();
        tokio::fs::write(&tmp, raw)
            .await
            .with_context(|| format!("writing session file {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("replacing session file {}", self.path.display()))?;

        debug!(key, path = %self.path.display(), "session entry written");
        Ok(())
    }
}
