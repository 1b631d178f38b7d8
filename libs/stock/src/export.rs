use std::path::Path;

use anyhow::Result;
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use tracing::info;

use crate::view::{CellValue, Table};

pub const EXPORT_FILE_NAME: &str = "StockData.xlsx";
pub const SHEET_NAME: &str = "Stock Data";

/// Write `table` as a single-sheet workbook at `path`, replacing any
/// existing file.
pub fn write_workbook(table: &Table, path: &Path) -> Result<()> {
    let mut workbook = build_workbook(table)?;
    workbook.save(path)?;

    info!(path = %path.display(), rows = table.rows.len(), "exported workbook");
    Ok(())
}

/// The same workbook as `write_workbook`, kept in memory.
pub fn workbook_bytes(table: &Table) -> Result<Vec<u8>> {
    let mut workbook = build_workbook(table)?;
    Ok(workbook.save_to_buffer()?)
}

fn build_workbook(table: &Table) -> Result<Workbook, XlsxError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    let bold = Format::new().set_bold();
    for (col, name) in table.header.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, name, &bold)?;
    }

    for (i, row) in table.rows.iter().enumerate() {
        let r = i as u32 + 1;
        for (col, cell) in row.iter().enumerate() {
            write_cell(sheet, r, col as u16, cell)?;
        }
    }

    Ok(workbook)
}

fn write_cell(sheet: &mut Worksheet, row: u32, col: u16, cell: &CellValue) -> Result<(), XlsxError> {
    match cell {
        CellValue::Text(s) => sheet.write_string(row, col, s)?,
        CellValue::Number(n) => match n.as_f64() {
            Some(f) => sheet.write_number(row, col, f)?,
            None => sheet.write_string(row, col, n.to_string())?,
        },
        CellValue::Bool(b) => sheet.write_boolean(row, col, *b)?,
    };
    Ok(())
}
