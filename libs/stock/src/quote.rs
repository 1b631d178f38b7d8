use serde_json::{Map, Value};

/// One quote snapshot as returned by the quote API.
///
/// Field order follows the JSON document, so the first record's keys can be
/// offered as columns in the order the API sent them.
pub type QuoteRecord = Map<String, Value>;

/// Normalize user input into a ticker symbol.
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}
