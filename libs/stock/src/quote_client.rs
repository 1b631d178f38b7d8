use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::Value;
use thiserror::Error as ThisError;
use tracing::{debug, warn};

use crate::quote::QuoteRecord;

/// The single failure kind of a quote fetch.
///
/// `Display` is the message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum FetchError {
    /// The API answered with a non-success status.
    #[error("Stock symbol not found")]
    NotFound,

    #[error("Request failed: {0}")]
    Transport(String),

    /// The body was not a JSON object.
    #[error("Invalid quote response: {0}")]
    Decode(String),
}

/// Anything that can produce a quote record for a symbol.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn fetch_quote(&self, symbol: &str) -> Result<QuoteRecord, FetchError>;
}

#[derive(Clone)]
pub struct QuoteClient {
    client: Client,
    base_api: String,
}

impl QuoteClient {
    pub fn new(base_api: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self::with_client(client, base_api))
    }

    pub fn with_client(client: Client, base_api: impl Into<String>) -> Self {
        Self {
            client,
            base_api: base_api.into(),
        }
    }

    pub fn base_api(&self) -> &str {
        &self.base_api
    }

    fn quote_url(&self, symbol: &str) -> Result<Url, FetchError> {
        let mut url = Url::parse(self.base_api.trim_end_matches('/'))
            .map_err(|e| FetchError::Transport(format!("invalid API URL {}: {}", self.base_api, e)))?;

        url.path_segments_mut()
            .map_err(|_| FetchError::Transport(format!("invalid API URL {}", self.base_api)))?
            .pop_if_empty()
            .push("quote")
            .push(symbol);

        Ok(url)
    }
}

#[async_trait]
impl QuoteSource for QuoteClient {
    async fn fetch_quote(&self, symbol: &str) -> Result<QuoteRecord, FetchError> {
        let url = self.quote_url(symbol)?;

        let res = self.client.get(url).send().await.map_err(|e| {
            warn!(symbol, error = %e, "quote request failed");
            FetchError::Transport(e.to_string())
        })?;

        let status = res.status();
        if !status.is_success() {
            warn!(symbol, %status, "quote API rejected symbol");
            return Err(FetchError::NotFound);
        }

        let body: Value = res
            .json()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))?;

        match body {
            Value::Object(record) => {
                debug!(symbol, fields = record.len(), "fetched quote");
                Ok(record)
            }
            other => Err(FetchError::Decode(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Minimal HTTP/1.1 server answering `(path, status, body)` routes, 404 otherwise.
    async fn serve(routes: Vec<(&'static str, u16, &'static str)>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let routes = routes.clone();
                tokio::spawn(async move {
                    let mut head = Vec::new();
                    let mut buf = [0u8; 1024];
                    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                        match socket.read(&mut buf).await {
                            Ok(0) | Err(_) => break,
                            Ok(n) => head.extend_from_slice(&buf[..n]),
                        }
                    }

                    let head = String::from_utf8_lossy(&head);
                    let path = head.split_whitespace().nth(1).unwrap_or("/").to_string();
                    let (status, body) = routes
                        .iter()
                        .find(|(p, _, _)| *p == path)
                        .map(|(_, s, b)| (*s, *b))
                        .unwrap_or((404, r#"{"error":"not found"}"#));

                    let response = format!(
                        "HTTP/1.1 {status} X\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        format!("http://{addr}")
    }

    fn local_client(base: impl Into<String>) -> QuoteClient {
        let client = Client::builder().no_proxy().build().unwrap();
        QuoteClient::with_client(client, base)
    }

    #[tokio::test]
    async fn test_fetch_quote_keeps_field_order() {
        let base = serve(vec![(
            "/quote/AAPL",
            200,
            r#"{"symbol":"AAPL","price":150,"volume":1000,"meta":{"a":1,"b":2}}"#,
        )])
        .await;

        let client = local_client(base);
        let record = client.fetch_quote("AAPL").await.unwrap();

        let keys: Vec<&str> = record.keys().map(String::as_str).collect();
        assert_eq!(keys, ["symbol", "price", "volume", "meta"]);
        assert_eq!(record["price"], 150);
    }

    #[tokio::test]
    async fn test_non_success_status_is_not_found() {
        let base = serve(vec![("/quote/BOOM", 500, r#"{"error":"boom"}"#)]).await;
        let client = local_client(base);

        let err = client.fetch_quote("ZZZZ").await.unwrap_err();
        assert_eq!(err, FetchError::NotFound);
        assert_eq!(err.to_string(), "Stock symbol not found");

        let err = client.fetch_quote("BOOM").await.unwrap_err();
        assert_eq!(err, FetchError::NotFound);
    }

    #[tokio::test]
    async fn test_non_object_body_is_decode_error() {
        let base = serve(vec![("/quote/LIST", 200, "[1,2,3]")]).await;
        let client = local_client(base);

        let err = client.fetch_quote("LIST").await.unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_base_url_with_prefix_and_trailing_slash() {
        let base = serve(vec![("/api/v1/quote/BRK%20B", 200, r#"{"price":1}"#)]).await;
        let client = local_client(format!("{base}/api/v1/"));

        let record = client.fetch_quote("BRK B").await.unwrap();
        assert_eq!(record["price"], 1);
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = local_client(format!("http://{addr}"));
        let err = client.fetch_quote("AAPL").await.unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_invalid_base_url_is_transport_error() {
        let client = local_client("not a url");
        let err = client.fetch_quote("AAPL").await.unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)), "got {err:?}");
    }
}
