//! Turn mapped raw rows into structured account records

use std::collections::BTreeMap;

use serde::Serialize;

use super::cell::CellValue;
use super::mapping::FieldMappings;

/// One data row of the uploaded file, keyed by system field
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedAccount {
    /// `account-<i>`, stable within one parse pass
    pub id: String,
    /// Only fields that have a resolvable mapping
    pub fields: BTreeMap<String, CellValue>,
    /// The full original row as (header label, value) in column order
    pub raw_data: Vec<(String, CellValue)>,
}

impl ParsedAccount {
    pub fn field(&self, key: &str) -> Option<&CellValue> {
        self.fields.get(key)
    }
}

pub fn account_id(index: usize) -> String {
    format!("account-{}", index)
}

/// Data rows of `raw`, skipping the header row when there is one
pub fn data_rows(raw: &[Vec<CellValue>], has_header_row: bool) -> &[Vec<CellValue>] {
    if has_header_row {
        raw.get(1..).unwrap_or(&[])
    } else {
        raw
    }
}

/// Build parsed accounts from the raw file rows.
///
/// A mapping whose column label is not in the header row is skipped for
/// every row. Output order follows row order.
pub fn materialize_accounts(
    raw: &[Vec<CellValue>],
    mappings: &FieldMappings,
    has_header_row: bool,
) -> Vec<ParsedAccount> {
    if raw.is_empty() {
        return Vec::new();
    }

    let headers: Vec<String> = if has_header_row {
        raw[0].iter().map(|c| c.to_string()).collect()
    } else {
        Vec::new()
    };

    // field key -> column index
    let resolved: Vec<(&String, usize)> = mappings
        .iter()
        .filter(|(_, column)| !column.is_empty())
        .filter_map(|(field, column)| {
            let idx = headers.iter().position(|h| h == column);
            if idx.is_none() {
                log::debug!("Mapped column '{}' for '{}' not found in headers", column, field);
            }
            idx.map(|i| (field, i))
        })
        .collect();

    data_rows(raw, has_header_row)
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let cell = |idx: usize| row.get(idx).cloned().unwrap_or_default();

            let fields = resolved
                .iter()
                .map(|(field, idx)| ((*field).clone(), cell(*idx)))
                .collect();

            let raw_data = headers
                .iter()
                .enumerate()
                .map(|(idx, label)| (label.clone(), cell(idx)))
                .collect();

            ParsedAccount {
                id: account_id(i),
                fields,
                raw_data,
            }
        })
        .collect()
}
