use indexmap::IndexMap;

use crate::quote::QuoteRecord;
use crate::quote_client::FetchError;
use crate::session::Session;

/// In-memory model behind the quote table.
///
/// Every mutation is a plain method call made from a single controller, one
/// per user or network event.
#[derive(Debug, Clone, Default)]
pub struct StockState {
    quotes: IndexMap<String, QuoteRecord>,
    symbols: Vec<String>,
    selected: Vec<String>,
    loading: bool,
    error: Option<String>,
}

impl StockState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the symbol list and field selection with a restored session.
    ///
    /// Quote records are not part of a session and stay untouched.
    pub fn restore(&mut self, session: Session) {
        self.symbols = session.symbols;
        self.selected = session.selected_keys;
    }

    /// A fetch was issued. Clears the previous error.
    pub fn begin_fetch(&mut self) {
        self.loading = true;
        self.error = None;
    }

    /// Store `record` for `symbol`, replacing any earlier one, and track the
    /// symbol if it is new. Returns whether the symbol was newly tracked.
    pub fn fetch_succeeded(&mut self, symbol: &str, record: QuoteRecord) -> bool {
        self.quotes.insert(symbol.to_string(), record);
        self.loading = false;

        if self.symbols.iter().any(|s| s == symbol) {
            return false;
        }
        self.symbols.push(symbol.to_string());
        true
    }

    /// Record a failed fetch. Nothing else about the symbol changes.
    pub fn fetch_failed(&mut self, error: &FetchError) {
        self.error = Some(error.to_string());
        self.loading = false;
    }

    /// Flip membership of `key` in the selected fields.
    /// Returns whether the key is selected afterwards.
    pub fn toggle_field(&mut self, key: &str) -> bool {
        if let Some(pos) = self.selected.iter().position(|k| k == key) {
            self.selected.remove(pos);
            false
        } else {
            self.selected.push(key.to_string());
            true
        }
    }

    /// Field names offered for selection: the keys of the first stored
    /// record, in that record's order.
    pub fn candidate_fields(&self) -> impl Iterator<Item = &str> {
        self.quotes
            .values()
            .next()
            .into_iter()
            .flat_map(|record| record.keys().map(String::as_str))
    }

    pub fn quote(&self, symbol: &str) -> Option<&QuoteRecord> {
        self.quotes.get(symbol)
    }

    pub fn quotes(&self) -> &IndexMap<String, QuoteRecord> {
        &self.quotes
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn selected_fields(&self) -> &[String] {
        &self.selected
    }

    pub fn is_selected(&self, key: &str) -> bool {
        self.selected.iter().any(|k| k == key)
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}
