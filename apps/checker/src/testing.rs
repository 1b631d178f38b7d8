use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use stock::{FetchError, QuoteRecord, QuoteSource};

type Scripted = (Duration, Result<QuoteRecord, FetchError>);

/// Answers each symbol from a queue of (delay, result); unknown symbols
/// are not found.
#[derive(Default)]
pub struct FakeSource {
    scripts: Mutex<HashMap<String, VecDeque<Scripted>>>,
    calls: Mutex<Vec<String>>,
}

impl FakeSource {
    pub fn respond(self, symbol: &str, delay_ms: u64, result: Result<Value, FetchError>) -> Self {
        let result = result.map(|value| match value {
            Value::Object(map) => map,
            _ => panic!("test record must be an object"),
        });
        self.scripts
            .lock()
            .unwrap()
            .entry(symbol.to_string())
            .or_default()
            .push_back((Duration::from_millis(delay_ms), result));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl QuoteSource for FakeSource {
    async fn fetch_quote(&self, symbol: &str) -> Result<QuoteRecord, FetchError> {
        self.calls.lock().unwrap().push(symbol.to_string());
        let next = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(symbol)
            .and_then(VecDeque::pop_front);

        match next {
            Some((delay, result)) => {
                tokio::time::sleep(delay).await;
                result
            }
            None => Err(FetchError::NotFound),
        }
    }
}
