//! Raw spreadsheet cell values
//!
//! Cells read from an uploaded file are kept as a closed set of variants so
//! the materializer and re-encoder can stringify on read and write them back
//! without losing their numeric/text distinction.

use std::fmt;

use calamine::{Data, DataType};
use chrono::Timelike;
use serde::{Deserialize, Serialize};

/// A single untyped cell from an uploaded sheet
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Empty,
    Number(f64),
    Text(String),
    /// Date or datetime already rendered as text
    Date(String),
}

impl CellValue {
    /// Build a cell from CSV text. Zero-length text is an empty cell.
    pub fn from_text(s: &str) -> Self {
        if s.is_empty() {
            Self::Empty
        } else {
            Self::Text(s.to_string())
        }
    }

    /// Null, empty or whitespace-only
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) | Self::Date(s) => s.trim().is_empty(),
            Self::Number(_) => false,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Number(n) => {
                // Whole numbers print without a trailing ".0"
                if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Self::Text(s) | Self::Date(s) => f.write_str(s),
        }
    }
}

impl From<&Data> for CellValue {
    fn from(cell: &Data) -> Self {
        match cell {
            Data::Empty => Self::Empty,
            Data::String(s) => Self::from_text(s),
            Data::Int(i) => Self::Number(*i as f64),
            Data::Float(f) => Self::Number(*f),
            Data::Bool(b) => Self::Text(b.to_string()),
            Data::DateTime(_) => match cell.as_datetime() {
                Some(dt) if dt.num_seconds_from_midnight() == 0 => {
                    Self::Date(dt.format("%Y-%m-%d").to_string())
                }
                Some(dt) => Self::Date(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
                None => Self::Empty,
            },
            Data::DateTimeIso(s) | Data::DurationIso(s) => Self::Date(s.clone()),
            Data::Error(e) => Self::Text(e.to_string()),
        }
    }
}

/// True when a row has no cells or every cell is blank
pub fn is_blank_row(row: &[CellValue]) -> bool {
    row.iter().all(CellValue::is_blank)
}
