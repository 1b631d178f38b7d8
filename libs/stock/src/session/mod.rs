//! Persistence of the tracked symbols and the selected fields.
//!
//! A session is two small JSON-encoded text entries kept in a key/value
//! backend with a fixed expiry that is refreshed on every write. Quote data is
//! never persisted.

mod file;
mod memory;
mod redis;

use std::collections::HashSet;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::quote::normalize_symbol;

pub use file::FileBackend;
pub use memory::MemoryBackend;
pub use redis::RedisBackend;

pub const SYMBOLS_KEY: &str = "stockSymbols";
pub const SELECTED_KEYS_KEY: &str = "selectedKeys";

/// Seven days, counted from the latest write.
pub const SESSION_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Text storage with per-entry expiry. Expired entries read as absent.
#[async_trait]
pub trait KvBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub symbols: Vec<String>,
    pub selected_keys: Vec<String>,
}

pub struct SessionStore<B> {
    backend: B,
}

impl<B: KvBackend> SessionStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub async fn save(&self, symbols: &[String], selected_keys: &[String]) -> Result<()> {
        self.save_symbols(symbols).await?;
        self.save_selected_keys(selected_keys).await
    }

    pub async fn save_symbols(&self, symbols: &[String]) -> Result<()> {
        self.write(SYMBOLS_KEY, symbols).await
    }

    pub async fn save_selected_keys(&self, selected_keys: &[String]) -> Result<()> {
        self.write(SELECTED_KEYS_KEY, selected_keys).await
    }

    /// Load the last saved session.
    ///
    /// Missing or unreadable entries come back empty. Symbols are normalized
    /// and both lists are de-duplicated, first occurrence wins.
    pub async fn restore(&self) -> Result<Session> {
        let symbols = self
            .read(SYMBOLS_KEY)
            .await?
            .into_iter()
            .map(|s| normalize_symbol(&s))
            .filter(|s| !s.is_empty());
        let symbols = dedup(symbols);

        let selected_keys = dedup(self.read(SELECTED_KEYS_KEY).await?);

        debug!(
            symbols = symbols.len(),
            selected_keys = selected_keys.len(),
            "restored session"
        );

        Ok(Session {
            symbols,
            selected_keys,
        })
    }

    async fn write(&self, key: &str, values: &[String]) -> Result<()> {
        let raw = serde_json::to_string(values)?;
        self.backend.set(key, &raw, SESSION_TTL).await
    }

    async fn read(&self, key: &str) -> Result<Vec<String>> {
        let Some(raw) = self.backend.get(key).await? else {
            return Ok(Vec::new());
        };

        match serde_json::from_str(&raw) {
            Ok(values) => Ok(values),
            Err(e) => {
                warn!(key, error = %e, "ignoring corrupt session entry");
                Ok(Vec::new())
            }
        }
    }
}

fn dedup(values: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .into_iter()
        .filter(|v| seen.insert(v.clone()))
        .collect()
}
