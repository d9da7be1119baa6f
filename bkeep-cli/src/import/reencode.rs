//! Rebuild an upload file holding only the selected rows

use std::collections::HashSet;

use rust_xlsxwriter::{Workbook, Worksheet, XlsxError};

use super::cell::CellValue;
use super::error::ImportError;
use super::materialize::ParsedAccount;
use super::parser::XLSX_MIME;

pub const FILTERED_FILE_NAME: &str = "filtered_accounts.xlsx";

/// Binary file handed to the import endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

/// Only a strict, non-empty subset is re-encoded
pub fn needs_reencode(selected: usize, total: usize) -> bool {
    selected > 0 && selected < total
}

/// Header row (if any) followed by the selected data rows, in file order
pub fn select_rows(
    raw: &[Vec<CellValue>],
    accounts: &[ParsedAccount],
    selected: &HashSet<String>,
    has_header_row: bool,
) -> Vec<Vec<CellValue>> {
    let mut rows = Vec::with_capacity(selected.len() + 1);

    if has_header_row {
        if let Some(header) = raw.first() {
            rows.push(header.clone());
        }
    }

    let offset = usize::from(has_header_row);
    for (index, account) in accounts.iter().enumerate() {
        if !selected.contains(&account.id) {
            continue;
        }
        if let Some(row) = raw.get(index + offset) {
            rows.push(row.clone());
        }
    }

    rows
}

/// Encode rows as a single-sheet xlsx workbook
pub fn encode_workbook(rows: &[Vec<CellValue>]) -> Result<Vec<u8>, ImportError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    for (r, row) in rows.iter().enumerate() {
        let r = u32::try_from(r)
            .map_err(|_| ImportError::ReEncode(format!("row {} is out of range", r)))?;
        for (c, cell) in row.iter().enumerate() {
            let c = u16::try_from(c)
                .map_err(|_| ImportError::ReEncode(format!("column {} is out of range", c)))?;
            write_cell(worksheet, r, c, cell).map_err(reencode_error)?;
        }
    }

    workbook.save_to_buffer().map_err(reencode_error)
}

fn reencode_error(e: XlsxError) -> ImportError {
    ImportError::ReEncode(e.to_string())
}

fn write_cell(ws: &mut Worksheet, row: u32, col: u16, cell: &CellValue) -> Result<(), XlsxError> {
    match cell {
        CellValue::Empty => { /* Leave cell empty */ }
        CellValue::Number(n) => {
            ws.write_number(row, col, *n)?;
        }
        CellValue::Text(s) | CellValue::Date(s) => {
            ws.write_string(row, col, s)?;
        }
    }
    Ok(())
}

/// Build the filtered upload file for a partial selection
pub fn reencode_selection(
    raw: &[Vec<CellValue>],
    accounts: &[ParsedAccount],
    selected: &HashSet<String>,
    has_header_row: bool,
) -> Result<UploadFile, ImportError> {
    let rows = select_rows(raw, accounts, selected, has_header_row);
    let bytes = encode_workbook(&rows)?;

    log::info!(
        "Re-encoded {} of {} accounts into {}",
        selected.len(),
        accounts.len(),
        FILTERED_FILE_NAME
    );

    Ok(UploadFile {
        name: FILTERED_FILE_NAME.to_string(),
        media_type: XLSX_MIME.to_string(),
        bytes,
    })
}
