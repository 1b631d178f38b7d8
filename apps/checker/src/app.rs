use std::fmt::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Result, ensure};
use stock::{
    EXPORT_FILE_NAME, FetchError, KvBackend, QuoteRecord, QuoteSource, SYMBOL_HEADER, SessionStore,
    StockState, Table, normalize_symbol, write_workbook,
};
use tokio::sync::mpsc;
use tracing::{debug, info, info_span, warn};
use tracing_futures::Instrument;

/// Result of one quote request, delivered back to the controller.
#[derive(Debug)]
pub struct FetchOutcome {
    pub symbol: String,
    pub result: Result<QuoteRecord, FetchError>,
}

/// Owns the stock state and applies every event to it on one task.
///
/// Fetches run as independent tokio tasks and report back over a channel, so
/// outcomes are applied in completion order. Changes to the symbol list or the
/// field selection are written through to the session store immediately.
pub struct App<S, B> {
    state: StockState,
    session: SessionStore<B>,
    source: Arc<S>,
    export_dir: PathBuf,
    outcomes_tx: mpsc::UnboundedSender<FetchOutcome>,
    outcomes_rx: mpsc::UnboundedReceiver<FetchOutcome>,
    in_flight: usize,
}

impl<S, B> App<S, B>
where
    S: QuoteSource + 'static,
    B: KvBackend,
{
    pub fn new(source: Arc<S>, session: SessionStore<B>, export_dir: PathBuf) -> Self {
        let (outcomes_tx, outcomes_rx) = mpsc::unbounded_channel();

        Self {
            state: StockState::new(),
            session,
            source,
            export_dir,
            outcomes_tx,
            outcomes_rx,
            in_flight: 0,
        }
    }

    pub fn state(&self) -> &StockState {
        &self.state
    }

    pub fn session(&self) -> &SessionStore<B> {
        &self.session
    }

    /// Requests issued but not yet applied.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Load the saved session and fetch every restored symbol again.
    pub async fn restore(&mut self) -> Result<()> {
        let session = self.session.restore().await?;
        let symbols = session.symbols.clone();

        info!(
            symbols = symbols.len(),
            selected_keys = session.selected_keys.len(),
            "session restored"
        );

        self.state.restore(session);
        for symbol in &symbols {
            self.request_fetch(symbol);
        }

        Ok(())
    }

    /// Start fetching `input` without waiting for it.
    ///
    /// Blank input is ignored and returns false. There is no cancellation:
    /// a second request for the same symbol runs alongside the first and
    /// whichever finishes last wins.
    pub fn request_fetch(&mut self, input: &str) -> bool {
        let symbol = normalize_symbol(input);
        if symbol.is_empty() {
            return false;
        }

        self.state.begin_fetch();
        self.in_flight += 1;

        let source = Arc::clone(&self.source);
        let tx = self.outcomes_tx.clone();
        let span = info_span!("fetch_quote", symbol = %symbol);

        tokio::spawn(
            async move {
                debug!("requesting quote");
                let result = source.fetch_quote(&symbol).await;
                let _ = tx.send(FetchOutcome { symbol, result });
            }
            .instrument(span),
        );

        true
    }

    /// Wait for the next finished fetch.
    pub async fn next_outcome(&mut self) -> Option<FetchOutcome> {
        self.outcomes_rx.recv().await
    }

    pub async fn apply(&mut self, outcome: FetchOutcome) -> Result<()> {
        self.in_flight = self.in_flight.saturating_sub(1);

        match outcome.result {
            Ok(record) => {
                let added = self.state.fetch_succeeded(&outcome.symbol, record);
                info!(symbol = %outcome.symbol, added, "quote received");

                // rewritten on every success so the expiry keeps moving
                self.session.save_symbols(self.state.symbols()).await?;
            }
            Err(e) => {
                warn!(symbol = %outcome.symbol, error = %e, "quote fetch failed");
                self.state.fetch_failed(&e);
            }
        }

        Ok(())
    }

    /// Apply outcomes until nothing is in flight.
    pub async fn settle(&mut self) -> Result<()> {
        while self.in_flight > 0 {
            match self.next_outcome().await {
                Some(outcome) => self.apply(outcome).await?,
                None => break,
            }
        }
        Ok(())
    }

    /// Returns whether `key` is selected afterwards.
    ///
    /// `Symbol` names the leading column and cannot be selected.
    pub async fn toggle_field(&mut self, key: &str) -> Result<bool> {
        ensure!(
            key != SYMBOL_HEADER,
            "{SYMBOL_HEADER} is always the first column"
        );

        let selected = self.state.toggle_field(key);
        debug!(key, selected, "field toggled");

        self.session
            .save_selected_keys(self.state.selected_fields())
            .await?;
        Ok(selected)
    }

    pub fn table(&self) -> Table {
        Table::build(&self.state)
    }

    /// Write `StockData.xlsx` into the export directory.
    pub fn export(&self) -> Result<PathBuf> {
        let path = self.export_dir.join(EXPORT_FILE_NAME);
        write_workbook(&self.table(), &path)?;
        Ok(path)
    }

    /// Loading indicator, error line, then the table.
    pub fn render(&self) -> String {
        let mut out = String::new();
        if self.state.is_loading() {
            out.push_str("Loading...\n");
        }
        if let Some(error) = self.state.error() {
            let _ = writeln!(out, "Error: {error}");
        }
        out.push_str(&self.table().render());
        out
    }

    /// One checkbox line per field offered by the first quote.
    pub fn render_fields(&self) -> String {
        let mut out = String::new();
        for key in self.state.candidate_fields() {
            let mark = if self.state.is_selected(key) { 'x' } else { ' ' };
            let _ = writeln!(out, "[{mark}] {key}");
        }
        if out.is_empty() {
            out.push_str("No fields yet. Add a symbol first.\n");
        }
        out
    }
}
