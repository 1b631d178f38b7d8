mod export;
mod quote;
mod quote_client;
mod state;
mod view;

pub mod session;

pub use export::{EXPORT_FILE_NAME, SHEET_NAME, workbook_bytes, write_workbook};
pub use quote::{QuoteRecord, normalize_symbol};
pub use quote_client::{FetchError, QuoteClient, QuoteSource};
pub use session::{KvBackend, Session, SessionStore};
pub use state::StockState;
pub use view::{CellValue, NOT_AVAILABLE, SYMBOL_HEADER, Table};
