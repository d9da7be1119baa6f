//! Field mapping between system account fields and file columns
//!
//! An explicit (manual) mapping always wins; auto-mapping only fills fields
//! that are unmapped, by exact case-insensitive match against the field
//! label or key. Fields with no match stay unmapped.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// system field key -> file column label
pub type FieldMappings = BTreeMap<String, String>;

/// Descriptor of a system field that can be filled from an uploaded file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportField {
    pub key: String,
    pub label: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format_hint: Option<String>,
}

impl ImportField {
    pub fn new(key: &str, label: &str, required: bool) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            required,
            format_hint: None,
        }
    }

    pub fn with_hint(mut self, hint: &str) -> Self {
        self.format_hint = Some(hint.to_string());
        self
    }

    /// Case-insensitive match of a header against label or key
    fn matches_header(&self, header: &str) -> bool {
        let header = header.trim().to_lowercase();
        !header.is_empty()
            && (header == self.label.to_lowercase() || header == self.key.to_lowercase())
    }
}

/// Built-in field set used when the server does not provide one
pub fn default_import_fields() -> Vec<ImportField> {
    vec![
        ImportField::new("accountName", "Account Name", true),
        ImportField::new("accountType", "Account Type", true)
            .with_hint("asset, liability, equity, income, expense"),
        ImportField::new("accountNumber", "Account Number", false),
        ImportField::new("parentAccount", "Parent Account", false),
        ImportField::new("description", "Description", false),
        ImportField::new("openingBalance", "Opening Balance", false).with_hint("number"),
    ]
}

/// Propose mappings for fields that are not mapped yet.
///
/// Returns only the staged additions; existing entries are never touched.
/// The first matching header wins.
pub fn auto_map(
    fields: &[ImportField],
    headers: &[String],
    existing: &FieldMappings,
) -> FieldMappings {
    let mut staged = FieldMappings::new();

    for field in fields {
        if existing.contains_key(&field.key) {
            continue;
        }

        if let Some(header) = headers.iter().find(|h| field.matches_header(h)) {
            staged.insert(field.key.clone(), header.clone());
        }
    }

    staged
}

/// Required fields that have no (non-empty) mapping
pub fn missing_required<'a>(
    fields: &'a [ImportField],
    mappings: &FieldMappings,
) -> Vec<&'a ImportField> {
    fields
        .iter()
        .filter(|f| f.required)
        .filter(|f| mappings.get(&f.key).is_none_or(|col| col.is_empty()))
        .collect()
}

/// Every required field is mapped
pub fn mapping_ready(fields: &[ImportField], mappings: &FieldMappings) -> bool {
    missing_required(fields, mappings).is_empty()
}

/// Flip field -> column into column -> field, the shape the import endpoint expects
pub fn invert_mappings(mappings: &FieldMappings) -> BTreeMap<String, String> {
    mappings
        .iter()
        .filter(|(_, column)| !column.is_empty())
        .map(|(field, column)| (column.clone(), field.clone()))
        .collect()
}
