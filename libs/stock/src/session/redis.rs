use std::time::Duration;

use anyhow::{Error, Result};
use async_trait::async_trait;
use fred::prelude::*;
use fred::types::Expiration;
use tracing::error;

use super::KvBackend;

/// Session entries stored as Redis strings under `<prefix>:<key>`, expired by
/// Redis itself.
#[derive(Clone)]
pub struct RedisBackend {
    client: Client,
    key_prefix: String,
}

impl RedisBackend {
    pub async fn new(redis_url: &str, key: impl Into<String>) -> Result<Self, Error> {
        let config = Config::from_url(redis_url)?;

        let client = Builder::from_config(config)
            .with_connection_config(|config| {
                config.connection_timeout = Duration::from_secs(5);
                config.tcp = TcpConfig {
                    nodelay: Some(true),
                    ..Default::default()
                };
            })
            .build()?;

        client.on_error(|(error, server)| async move {
            error!(?server, ?error, "Redis connection error");
            Ok(())
        });

        client.connect();
        client.wait_for_connect().await?;

        Ok(Self {
            client,
            key_prefix: key.into(),
        })
    }

    fn entry_key(&self, key: &str) -> String {
        format!("{}:{}", self.key_prefix, key)
    }
}

#[async_trait]
impl KvBackend for RedisBackend {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.client
            .get(self.entry_key(key))
            .await
            .map_err(Error::from)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let ttl = i64::try_from(ttl.as_secs())?;
        let _: () = self
            .client
            .set(
                self.entry_key(key),
                value,
                Some(Expiration::EX(ttl)),
                None,
                false,
            )
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{SESSION_TTL, SYMBOLS_KEY};

    #[tokio::test]
    #[ignore] // Requires a Redis server at REDIS_URL
    async fn test_set_get_with_expiry() {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into());
        let backend = RedisBackend::new(&url, "stock-checker-test").await.unwrap();

        backend
            .set(SYMBOLS_KEY, r#"["AAPL"]"#, SESSION_TTL)
            .await
            .unwrap();
        assert_eq!(
            backend.get(SYMBOLS_KEY).await.unwrap().as_deref(),
            Some(r#"["AAPL"]"#)
        );

        let ttl: i64 = backend
            .client
            .ttl(backend.entry_key(SYMBOLS_KEY))
            .await
            .unwrap();
        assert!(ttl > 0 && ttl <= SESSION_TTL.as_secs() as i64);

        backend.set(SYMBOLS_KEY, "[]", Duration::from_secs(1)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(backend.get(SYMBOLS_KEY).await.unwrap(), None);
    }
}
