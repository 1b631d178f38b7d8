use std::fmt;

use serde_json::{Map, Number, Value};

use crate::quote::QuoteRecord;
use crate::state::StockState;

/// Shown for a missing or empty value.
pub const NOT_AVAILABLE: &str = "N/A";

pub const SYMBOL_HEADER: &str = "Symbol";

/// A quote value converted for display or export.
///
/// The same conversion feeds the terminal grid and the spreadsheet, so both
/// always agree on what a cell holds.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(Number),
    Bool(bool),
}

impl CellValue {
    /// Convert a raw quote value. `None` means the value counts as empty:
    /// `null`, `""`, `0`, `false`, `{}` and `[]`.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(Self::Text(s.clone())),
            Value::Number(n) if n.as_f64() == Some(0.0) => None,
            Value::Number(n) => Some(Self::Number(n.clone())),
            Value::Bool(false) => None,
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Object(map) if map.is_empty() => None,
            Value::Object(map) => Some(Self::Text(flatten_object(map))),
            Value::Array(items) if items.is_empty() => None,
            Value::Array(items) => Some(Self::Text(flatten_array(items))),
        }
    }

    /// The cell for `key` of `record`, or the placeholder.
    pub fn for_field(record: Option<&QuoteRecord>, key: &str) -> Self {
        record
            .and_then(|r| r.get(key))
            .and_then(Self::from_json)
            .unwrap_or_else(Self::not_available)
    }

    pub fn not_available() -> Self {
        Self::Text(NOT_AVAILABLE.to_string())
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// `{"a":1,"b":2}` becomes `a=1&b=2`, in the object's key order.
fn flatten_object(map: &Map<String, Value>) -> String {
    join_pairs(map.iter().map(|(k, v)| (k.clone(), v)))
}

/// Arrays flatten like objects keyed by position.
fn flatten_array(items: &[Value]) -> String {
    join_pairs(items.iter().enumerate().map(|(i, v)| (i.to_string(), v)))
}

fn join_pairs<'a>(pairs: impl Iterator<Item = (String, &'a Value)>) -> String {
    pairs
        .map(|(k, v)| format!("{}={}", k, inline_value(v)))
        .collect::<Vec<_>>()
        .join("&")
}

fn inline_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Rows are symbols in list order; columns are `Symbol` followed by the
/// selected fields in selection order.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl Table {
    pub fn build(state: &StockState) -> Self {
        let fields = state.selected_fields();

        let header = std::iter::once(SYMBOL_HEADER.to_string())
            .chain(fields.iter().cloned())
            .collect();

        let rows = state
            .symbols()
            .iter()
            .map(|symbol| {
                let record = state.quote(symbol);
                std::iter::once(CellValue::Text(symbol.clone()))
                    .chain(fields.iter().map(|key| CellValue::for_field(record, key)))
                    .collect()
            })
            .collect();

        Self { header, rows }
    }

    /// The cell in `row` under column `name`.
    pub fn cell(&self, row: usize, name: &str) -> Option<&CellValue> {
        let col = self.header.iter().position(|h| h == name)?;
        self.rows.get(row)?.get(col)
    }

    /// Plain-text grid with columns padded to their widest cell.
    pub fn render(&self) -> String {
        let texts: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| row.iter().map(ToString::to_string).collect())
            .collect();

        let mut widths: Vec<usize> = self.header.iter().map(|h| h.chars().count()).collect();
        for row in &texts {
            for (width, text) in widths.iter_mut().zip(row) {
                *width = (*width).max(text.chars().count());
            }
        }

        let mut out = String::new();
        push_line(&mut out, &self.header, &widths);
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        push_line(&mut out, &rule, &widths);
        for row in &texts {
            push_line(&mut out, row, &widths);
        }
        out
    }
}

fn push_line(out: &mut String, cells: &[String], widths: &[usize]) {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join(" | ");
    out.push_str(line.trim_end());
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> QuoteRecord {
        match value {
            Value::Object(map) => map,
            _ => panic!("test record must be an object"),
        }
    }

    #[test]
    fn test_nested_object_flattens_in_key_order() {
        let r = record(json!({ "price": 100, "meta": { "a": 1, "b": 2 } }));
        assert_eq!(CellValue::for_field(Some(&r), "meta").to_string(), "a=1&b=2");

        let r = record(json!({ "meta": { "z": "x", "a": true } }));
        assert_eq!(CellValue::for_field(Some(&r), "meta").to_string(), "z=x&a=true");
    }

    #[test]
    fn test_deeper_nesting_renders_inline_json() {
        let r = record(json!({ "meta": { "range": { "low": 1 }, "tags": ["x"] } }));
        assert_eq!(
            CellValue::for_field(Some(&r), "meta").to_string(),
            r#"range={"low":1}&tags=["x"]"#
        );
    }

    #[test]
    fn test_array_flattens_by_index() {
        let r = record(json!({ "exchanges": ["NASDAQ", "BATS"] }));
        assert_eq!(
            CellValue::for_field(Some(&r), "exchanges").to_string(),
            "0=NASDAQ&1=BATS"
        );
    }

    #[test]
    fn test_scalars_keep_their_type() {
        let r = record(json!({ "price": 150.25, "name": "Apple", "open": true, "volume": 1000 }));
        assert_eq!(
            CellValue::for_field(Some(&r), "price"),
            CellValue::Number(Number::from_f64(150.25).unwrap())
        );
        assert_eq!(
            CellValue::for_field(Some(&r), "name"),
            CellValue::Text("Apple".into())
        );
        assert_eq!(CellValue::for_field(Some(&r), "open"), CellValue::Bool(true));
        assert_eq!(CellValue::for_field(Some(&r), "volume").to_string(), "1000");
    }

    #[test]
    fn test_missing_or_empty_values_are_not_available() {
        let r = record(json!({ "a": null, "b": "", "c": {}, "d": [] }));
        for key in ["a", "b", "c", "d", "missing"] {
            assert_eq!(
                CellValue::for_field(Some(&r), key),
                CellValue::not_available(),
                "key {key}"
            );
        }
        assert_eq!(CellValue::for_field(None, "price").to_string(), NOT_AVAILABLE);
    }

    #[test]
    fn test_zero_and_false_are_not_available() {
        let r = record(json!({ "change": 0, "changePct": 0.0, "halted": false, "nested": { "x": 0 } }));
        for key in ["change", "changePct", "halted"] {
            assert_eq!(
                CellValue::for_field(Some(&r), key).to_string(),
                NOT_AVAILABLE,
                "key {key}"
            );
        }
        assert_eq!(CellValue::for_field(Some(&r), "nested").to_string(), "x=0");
    }

    #[test]
    fn test_table_rows_follow_symbols_and_selection() {
        let mut state = StockState::new();
        state.fetch_succeeded("AAPL", record(json!({ "price": 150, "volume": 1000 })));
        state.fetch_succeeded("MSFT", record(json!({ "volume": 7 })));
        state.toggle_field("volume");
        state.toggle_field("price");

        let table = Table::build(&state);
        assert_eq!(table.header, ["Symbol", "volume", "price"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.cell(0, "Symbol").unwrap().to_string(), "AAPL");
        assert_eq!(table.cell(0, "price").unwrap().to_string(), "150");
        assert_eq!(table.cell(1, "price").unwrap().to_string(), NOT_AVAILABLE);
        assert_eq!(table.cell(1, "volume").unwrap().to_string(), "7");
    }

    #[test]
    fn test_render_aligns_columns() {
        let mut state = StockState::new();
        state.fetch_succeeded("AAPL", record(json!({ "price": 150, "volume": 1000 })));
        state.toggle_field("price");

        let rendered = Table::build(&state).render();
        assert_eq!(rendered, "Symbol | price\n------ | -----\nAAPL   | 150\n");
    }

    #[test]
    fn test_symbol_without_record_renders_placeholders() {
        let mut state = StockState::new();
        state.restore(crate::session::Session {
            symbols: vec!["AAPL".into()],
            selected_keys: vec!["price".into(), "volume".into()],
        });

        let table = Table::build(&state);
        assert_eq!(
            table.rows[0],
            [
                CellValue::Text("AAPL".into()),
                CellValue::not_available(),
                CellValue::not_available()
            ]
        );
    }
}
