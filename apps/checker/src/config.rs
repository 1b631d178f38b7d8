use std::env::var;
use std::path::PathBuf;

use anyhow::{Error, Result, bail};
use stock::session::FileBackend;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionBackendConfig {
    File(PathBuf),
    Redis { url: String, key_prefix: String },
    Memory,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub api_url: String,
    pub session: SessionBackendConfig,
    pub export_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_url = lookup("QUOTE_API_URL")
            .ok_or_else(|| Error::msg("QUOTE_API_URL environment variable not set"))?;

        let session = match lookup("SESSION_BACKEND").as_deref().unwrap_or("file") {
            "file" => SessionBackendConfig::File(match lookup("SESSION_FILE") {
                Some(path) => PathBuf::from(path),
                None => FileBackend::default_path()?,
            }),
            "redis" => SessionBackendConfig::Redis {
                url: lookup("REDIS_URL")
                    .ok_or_else(|| Error::msg("REDIS_URL environment variable not set"))?,
                key_prefix: lookup("REDIS_KEY_PREFIX")
                    .unwrap_or_else(|| "stock-checker".to_string()),
            },
            "memory" => SessionBackendConfig::Memory,
            other => bail!("unknown SESSION_BACKEND {other:?}, expected file, redis or memory"),
        };

        let export_dir = lookup("EXPORT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            api_url,
            session,
            export_dir,
        })
    }
}
