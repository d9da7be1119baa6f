//! State for the chart-of-accounts import wizard
//!
//! `WizardStore` is the only owner of `WizardState`. Everything else reads
//! through its selectors and changes it through its named actions, so the
//! storage can change without touching the steps that use it.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::cell::CellValue;
use super::mapping::FieldMappings;
use super::materialize::ParsedAccount;

/// Wizard steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum ImportStep {
    #[default]
    Source,
    Mapping,
    Review,
    Complete,
}

impl ImportStep {
    pub fn number(&self) -> u8 {
        match self {
            Self::Source => 1,
            Self::Mapping => 2,
            Self::Review => 3,
            Self::Complete => 4,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Source => "Choose Source",
            Self::Mapping => "Map Columns",
            Self::Review => "Review Accounts",
            Self::Complete => "Import",
        }
    }

    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Source => Some(Self::Mapping),
            Self::Mapping => Some(Self::Review),
            Self::Review => Some(Self::Complete),
            Self::Complete => None,
        }
    }

    pub fn prev(&self) -> Option<Self> {
        match self {
            Self::Source => None,
            Self::Mapping => Some(Self::Source),
            Self::Review => Some(Self::Mapping),
            Self::Complete => Some(Self::Review),
        }
    }
}

/// How the chart of accounts gets populated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMethod {
    #[default]
    File,
    Template,
}

/// A user-supplied file waiting to be parsed or uploaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub path: PathBuf,
    pub name: String,
    pub media_type: Option<String>,
}

impl SelectedFile {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let name = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        Self {
            path,
            name,
            media_type: None,
        }
    }

    pub fn with_media_type(mut self, media_type: &str) -> Self {
        self.media_type = Some(media_type.to_string());
        self
    }
}

/// Final state of an import job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Completed,
    Failed,
}

/// Summary shown on the last step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResults {
    pub status: ResultStatus,
    pub total: u64,
    pub created: u64,
    pub skipped: u64,
    pub failed: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ImportResults {
    pub fn completed(total: u64, created: u64, skipped: u64, failed: u64) -> Self {
        Self {
            status: ResultStatus::Completed,
            total,
            created,
            skipped,
            failed,
            error_message: None,
        }
    }
}

/// Full mutable state of one wizard session
#[derive(Debug, Clone, Default)]
pub struct WizardState {
    pub current_step: ImportStep,
    pub import_method: ImportMethod,
    pub selected_template_id: Option<String>,
    pub selected_file: Option<SelectedFile>,
    pub file_headers: Vec<String>,
    pub raw_file_data: Vec<Vec<CellValue>>,
    pub has_header_row: bool,
    pub field_mappings: FieldMappings,
    pub parsed_accounts: Vec<ParsedAccount>,
    pub selected_account_ids: HashSet<String>,
    pub import_results: Option<ImportResults>,
    pub import_id: Option<String>,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl WizardState {
    pub fn new() -> Self {
        Self {
            has_header_row: true,
            ..Default::default()
        }
    }
}

/// Owner of the wizard state and the actions allowed on it
#[derive(Debug, Clone)]
pub struct WizardStore {
    state: WizardState,
}

impl Default for WizardStore {
    fn default() -> Self {
        Self::new()
    }
}

impl WizardStore {
    pub fn new() -> Self {
        Self {
            state: WizardState::new(),
        }
    }

    /// Read-only view of the whole aggregate
    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn current_step(&self) -> ImportStep {
        self.state.current_step
    }

    pub fn import_method(&self) -> ImportMethod {
        self.state.import_method
    }

    pub fn selected_template_id(&self) -> Option<&str> {
        self.state.selected_template_id.as_deref()
    }

    pub fn selected_file(&self) -> Option<&SelectedFile> {
        self.state.selected_file.as_ref()
    }

    pub fn file_headers(&self) -> &[String] {
        &self.state.file_headers
    }

    pub fn raw_file_data(&self) -> &[Vec<CellValue>] {
        &self.state.raw_file_data
    }

    pub fn has_header_row(&self) -> bool {
        self.state.has_header_row
    }

    pub fn field_mappings(&self) -> &FieldMappings {
        &self.state.field_mappings
    }

    pub fn parsed_accounts(&self) -> &[ParsedAccount] {
        &self.state.parsed_accounts
    }

    pub fn selected_account_ids(&self) -> &HashSet<String> {
        &self.state.selected_account_ids
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.state.selected_account_ids.contains(id)
    }

    pub fn import_results(&self) -> Option<&ImportResults> {
        self.state.import_results.as_ref()
    }

    pub fn import_id(&self) -> Option<&str> {
        self.state.import_id.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading
    }

    pub fn error(&self) -> Option<&str> {
        self.state.error.as_deref()
    }

    // === Navigation ===

    pub fn go_to_step(&mut self, step: ImportStep) {
        self.state.current_step = step;
    }

    /// No-op on the last step
    pub fn next_step(&mut self) {
        if let Some(next) = self.state.current_step.next() {
            self.state.current_step = next;
        }
    }

    /// No-op on the first step
    pub fn prev_step(&mut self) {
        if let Some(prev) = self.state.current_step.prev() {
            self.state.current_step = prev;
        }
    }

    // === Source ===

    pub fn set_import_method(&mut self, method: ImportMethod) {
        self.state.import_method = method;
    }

    pub fn set_selected_template_id(&mut self, id: Option<String>) {
        self.state.selected_template_id = id;
    }

    pub fn set_selected_file(&mut self, file: Option<SelectedFile>) {
        self.state.selected_file = file;
    }

    pub fn set_file_headers(&mut self, headers: Vec<String>) {
        self.state.file_headers = headers;
    }

    pub fn set_raw_file_data(&mut self, rows: Vec<Vec<CellValue>>) {
        self.state.raw_file_data = rows;
    }

    pub fn set_has_header_row(&mut self, has_header_row: bool) {
        self.state.has_header_row = has_header_row;
    }

    // === Mapping ===

    pub fn set_field_mappings(&mut self, mappings: FieldMappings) {
        self.state.field_mappings = mappings;
    }

    /// Manual mapping, replaces whatever was there
    pub fn update_field_mapping(&mut self, field_key: &str, column: &str) {
        self.state
            .field_mappings
            .insert(field_key.to_string(), column.to_string());
    }

    // === Review ===

    /// Replace the parsed accounts and select all of them
    pub fn set_parsed_accounts(&mut self, accounts: Vec<ParsedAccount>) {
        self.state.selected_account_ids = accounts.iter().map(|a| a.id.clone()).collect();
        self.state.parsed_accounts = accounts;
    }

    /// Flip one id. The id is not checked against the parsed accounts.
    pub fn toggle_account_selection(&mut self, id: &str) {
        if !self.state.selected_account_ids.remove(id) {
            self.state.selected_account_ids.insert(id.to_string());
        }
    }

    pub fn select_all_accounts(&mut self) {
        self.state.selected_account_ids = self
            .state
            .parsed_accounts
            .iter()
            .map(|a| a.id.clone())
            .collect();
    }

    pub fn deselect_all_accounts(&mut self) {
        self.state.selected_account_ids.clear();
    }

    // === Results ===

    pub fn set_import_results(&mut self, results: Option<ImportResults>) {
        self.state.import_results = results;
    }

    pub fn set_import_id(&mut self, id: Option<String>) {
        self.state.import_id = id;
    }

    pub fn set_is_loading(&mut self, loading: bool) {
        self.state.is_loading = loading;
    }

    pub fn set_error(&mut self, error: Option<String>) {
        self.state.error = error;
    }

    /// Back to a fresh session
    pub fn reset(&mut self) {
        self.state = WizardState::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn account(i: usize) -> ParsedAccount {
        ParsedAccount {
            id: format!("account-{}", i),
            fields: BTreeMap::new(),
            raw_data: Vec::new(),
        }
    }

    #[test]
    fn test_step_bounds() {
        let mut store = WizardStore::new();
        store.prev_step();
        assert_eq!(store.current_step(), ImportStep::Source);

        for _ in 0..10 {
            store.next_step();
        }
        assert_eq!(store.current_step(), ImportStep::Complete);
        assert_eq!(store.current_step().number(), 4);

        store.prev_step();
        assert_eq!(store.current_step(), ImportStep::Review);
    }

    #[test]
    fn test_set_parsed_accounts_selects_all() {
        let mut store = WizardStore::new();
        store.toggle_account_selection("stale");

        store.set_parsed_accounts((0..3).map(account).collect());

        let ids = store.selected_account_ids();
        assert_eq!(ids.len(), 3);
        assert!(ids.contains("account-0"));
        assert!(ids.contains("account-2"));
        assert!(!ids.contains("stale"));
    }

    #[test]
    fn test_toggle_and_bulk_selection() {
        let mut store = WizardStore::new();
        store.set_parsed_accounts((0..3).map(account).collect());

        store.toggle_account_selection("account-1");
        assert!(!store.is_selected("account-1"));
        store.toggle_account_selection("account-1");
        assert!(store.is_selected("account-1"));

        // permissive: unknown ids are accepted
        store.toggle_account_selection("account-99");
        assert!(store.is_selected("account-99"));

        store.deselect_all_accounts();
        assert!(store.selected_account_ids().is_empty());

        store.select_all_accounts();
        assert_eq!(store.selected_account_ids().len(), 3);
    }

    #[test]
    fn test_manual_mapping_overrides() {
        let mut store = WizardStore::new();
        store.update_field_mapping("accountName", "Name");
        store.update_field_mapping("accountName", "Account Name");
        assert_eq!(
            store.field_mappings().get("accountName").map(String::as_str),
            Some("Account Name")
        );
    }

    #[test]
    fn test_reset_restores_initial_state() {
        let mut store = WizardStore::new();
        store.set_import_method(ImportMethod::Template);
        store.set_selected_template_id(Some("tpl-1".into()));
        store.go_to_step(ImportStep::Complete);
        store.set_is_loading(true);
        store.set_import_id(Some("job-1".into()));
        store.set_has_header_row(false);
        store.set_parsed_accounts(vec![account(0)]);

        store.reset();

        let state = store.state();
        assert_eq!(state.current_step, ImportStep::Source);
        assert_eq!(state.import_method, ImportMethod::File);
        assert!(state.selected_template_id.is_none());
        assert!(state.parsed_accounts.is_empty());
        assert!(state.selected_account_ids.is_empty());
        assert!(state.import_id.is_none());
        assert!(state.has_header_row);
        assert!(!state.is_loading);
    }
}
