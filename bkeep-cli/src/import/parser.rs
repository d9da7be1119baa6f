//! Read uploaded spreadsheets and CSV files into raw rows
//!
//! Only the first sheet is read. Blank rows are dropped, everything else is
//! kept in order, including the header row (callers slice it off).

use std::io::Cursor;
use std::path::Path;

use calamine::{Data, Range, Reader, open_workbook_auto_from_rs};

use super::cell::{CellValue, is_blank_row};
use super::error::ImportError;
use super::state::SelectedFile;

pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const XLS_MIME: &str = "application/vnd.ms-excel";
pub const CSV_MIME: &str = "text/csv";

/// Spreadsheet flavours accepted for upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Xlsx,
    Xls,
    Csv,
}

impl FileKind {
    fn from_extension(name: &str) -> Option<Self> {
        let ext = Path::new(name).extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "xlsx" => Some(Self::Xlsx),
            "xls" => Some(Self::Xls),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }

    fn from_media_type(media_type: &str) -> Option<Self> {
        match media_type.trim().to_lowercase().as_str() {
            XLSX_MIME => Some(Self::Xlsx),
            XLS_MIME => Some(Self::Xls),
            CSV_MIME => Some(Self::Csv),
            _ => None,
        }
    }
}

/// Output of a successful parse
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFile {
    /// First surviving row, stringified
    pub headers: Vec<String>,
    /// All surviving rows, header row included
    pub data: Vec<Vec<CellValue>>,
}

/// Check the declared media type or the name's extension against the allow-list.
///
/// Runs before any read; rejected files are never opened.
pub fn validate_file(name: &str, media_type: Option<&str>) -> Result<FileKind, ImportError> {
    FileKind::from_extension(name)
        .or_else(|| media_type.and_then(FileKind::from_media_type))
        .ok_or_else(|| ImportError::FileValidation(name.to_string()))
}

/// Read a selected file from disk and parse it
pub async fn parse_file(file: &SelectedFile) -> Result<ParsedFile, ImportError> {
    let kind = validate_file(&file.name, file.media_type.as_deref())?;

    let bytes = tokio::fs::read(&file.path)
        .await
        .map_err(|e| ImportError::FileRead(format!("{}: {}", file.path.display(), e)))?;

    let parsed = parse_bytes(bytes, kind)?;
    log::info!(
        "Parsed {}: {} rows, {} columns",
        file.name,
        parsed.data.len(),
        parsed.headers.len()
    );
    Ok(parsed)
}

/// Parse an in-memory file of a known kind
pub fn parse_bytes(bytes: Vec<u8>, kind: FileKind) -> Result<ParsedFile, ImportError> {
    let rows = match kind {
        FileKind::Csv => read_csv_rows(&bytes)?,
        FileKind::Xlsx | FileKind::Xls => read_sheet_rows(bytes)?,
    };

    let data: Vec<Vec<CellValue>> = rows.into_iter().filter(|r| !is_blank_row(r)).collect();

    let Some(first) = data.first() else {
        return Err(ImportError::EmptyFile);
    };

    let headers = first.iter().map(|c| c.to_string()).collect();
    Ok(ParsedFile { headers, data })
}

fn read_csv_rows(bytes: &[u8]) -> Result<Vec<Vec<CellValue>>, ImportError> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record =
            record.map_err(|e| ImportError::FileParse(format!("CSV row {}: {}", idx + 1, e)))?;
        rows.push(record.iter().map(CellValue::from_text).collect());
    }

    Ok(rows)
}

fn read_sheet_rows(bytes: Vec<u8>) -> Result<Vec<Vec<CellValue>>, ImportError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| ImportError::FileParse(e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ImportError::FileParse("Workbook has no sheets".to_string()))?
        .map_err(|e| ImportError::FileParse(e.to_string()))?;

    Ok(range_rows(&range))
}

/// Rows of a sheet range, re-anchored at column A
fn range_rows(range: &Range<Data>) -> Vec<Vec<CellValue>> {
    let (start_row, start_col) = range.start().unwrap_or((0, 0));
    let lead = start_col as usize;

    let mut rows: Vec<Vec<CellValue>> = (0..start_row).map(|_| Vec::new()).collect();

    for row in range.rows() {
        let mut cells: Vec<CellValue> = std::iter::repeat_n(CellValue::Empty, lead)
            .chain(row.iter().map(CellValue::from))
            .collect();

        while cells.last().is_some_and(|c| *c == CellValue::Empty) {
            cells.pop();
        }
        rows.push(cells);
    }

    rows
}
