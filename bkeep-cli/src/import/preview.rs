//! Rows for the review step
//!
//! File imports review their parsed accounts; template imports review the
//! backend's preview, read-only and never written into the wizard state.

use std::collections::BTreeMap;

use serde_json::Value;

use super::materialize::ParsedAccount;
use crate::api::models::TemplateAccount;

/// One row of the review table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewRow {
    pub id: String,
    /// field key -> display text
    pub values: BTreeMap<String, String>,
    /// Template rows cannot be deselected
    pub selectable: bool,
}

impl ReviewRow {
    pub fn value(&self, key: &str) -> &str {
        self.values.get(key).map(String::as_str).unwrap_or("")
    }
}

pub fn template_account_id(index: usize) -> String {
    format!("template-acc-{}", index)
}

pub fn rows_from_parsed(accounts: &[ParsedAccount]) -> Vec<ReviewRow> {
    accounts
        .iter()
        .map(|account| ReviewRow {
            id: account.id.clone(),
            values: account
                .fields
                .iter()
                .map(|(key, cell)| (key.clone(), cell.to_string()))
                .collect(),
            selectable: true,
        })
        .collect()
}

pub fn rows_from_template(accounts: &[TemplateAccount]) -> Vec<ReviewRow> {
    accounts
        .iter()
        .enumerate()
        .map(|(i, account)| ReviewRow {
            id: template_account_id(i),
            values: account
                .iter()
                .map(|(key, value)| (key.clone(), display_json(value)))
                .collect(),
            selectable: false,
        })
        .collect()
}

fn display_json(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_template_rows_are_read_only() {
        let accounts: Vec<TemplateAccount> = serde_json::from_value(json!([
            {"accountName": "Cash", "accountType": "asset", "openingBalance": 0, "parentAccount": null},
            {"accountName": "Rent", "accountType": "expense"}
        ]))
        .unwrap();

        let rows = rows_from_template(&accounts);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, "template-acc-0");
        assert_eq!(rows[1].id, "template-acc-1");
        assert_eq!(rows[0].value("accountName"), "Cash");
        assert_eq!(rows[0].value("openingBalance"), "0");
        assert_eq!(rows[0].value("parentAccount"), "");
        assert!(rows.iter().all(|r| !r.selectable));
    }
}
