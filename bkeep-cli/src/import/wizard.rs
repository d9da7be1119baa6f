//! Step sequencer for the import wizard
//!
//! `ImportWizard` is what a host drives: it owns the session's
//! `WizardStore`, gates forward moves with `can_proceed`, runs the side
//! effects tied to each transition, and owns the polling task for a queued
//! import so closing the wizard always stops it.

use std::sync::Arc;

use super::error::ImportError;
use super::mapping::{FieldMappings, ImportField, auto_map, default_import_fields, mapping_ready};
use super::materialize::materialize_accounts;
use super::orchestrator::{ImportOrchestrator, Submission};
use super::parser::{parse_file, validate_file};
use super::preview::{ReviewRow, rows_from_parsed, rows_from_template};
use super::progress::PollHandle;
use super::state::{ImportMethod, ImportResults, ImportStep, SelectedFile, WizardStore};
use crate::api::ImportApi;
use crate::api::models::{PreviewSummary, TemplatePreview};
use crate::config::ImportConfig;
use crate::notify::Notifier;
use crate::resource::Resource;

pub struct ImportWizard {
    store: WizardStore,
    fields: Resource<Vec<ImportField>>,
    fallback_fields: Vec<ImportField>,
    preview: Resource<TemplatePreview>,
    api: Arc<dyn ImportApi>,
    notifier: Arc<dyn Notifier>,
    orchestrator: ImportOrchestrator,
    poll: Option<PollHandle>,
}

impl ImportWizard {
    pub fn new(api: Arc<dyn ImportApi>, notifier: Arc<dyn Notifier>, config: ImportConfig) -> Self {
        let orchestrator = ImportOrchestrator::new(api.clone(), notifier.clone(), config);
        Self {
            store: WizardStore::new(),
            fields: Resource::NotAsked,
            fallback_fields: default_import_fields(),
            preview: Resource::NotAsked,
            api,
            notifier,
            orchestrator,
            poll: None,
        }
    }

    pub fn store(&self) -> &WizardStore {
        &self.store
    }

    pub fn step(&self) -> ImportStep {
        self.store.current_step()
    }

    /// Fields to map against: the server's list, or the built-in set when
    /// that list is unavailable or empty
    pub fn fields(&self) -> &[ImportField] {
        match self.fields.value() {
            Some(fields) if !fields.is_empty() => fields,
            _ => &self.fallback_fields,
        }
    }

    pub async fn load_fields(&mut self) {
        self.fields = Resource::Loading;
        let result = self.api.fetch_import_fields().await;

        match &result {
            Ok(fields) if fields.is_empty() => {
                log::warn!("Server returned no import fields, using built-in set")
            }
            Ok(fields) => log::debug!("Loaded {} import fields", fields.len()),
            Err(e) => log::warn!("Failed to load import fields, using built-in set: {:#}", e),
        }
        self.fields = Resource::from_result(result.map_err(|e| format!("{:#}", e)));
    }

    // === Step 1 ===

    pub fn set_method(&mut self, method: ImportMethod) {
        self.store.set_import_method(method);
    }

    pub fn select_template(&mut self, template_id: Option<String>) {
        if self.store.selected_template_id() != template_id.as_deref() {
            self.preview = Resource::NotAsked;
        }
        self.store.set_selected_template_id(template_id);
    }

    /// Validate and parse a file, storing its headers and rows.
    ///
    /// A rejected type changes nothing. A read or parse failure clears the
    /// previous file and records the error.
    pub async fn select_file(&mut self, file: SelectedFile) -> Result<(), ImportError> {
        if let Err(err) = validate_file(&file.name, file.media_type.as_deref()) {
            log::warn!("{}", err);
            self.notifier.error(&err.to_string());
            return Err(err);
        }

        self.store.set_error(None);
        self.store.set_is_loading(true);

        let parsed = parse_file(&file).await;
        self.store.set_is_loading(false);

        match parsed {
            Ok(parsed) => {
                self.store.set_selected_file(Some(file));
                self.store.set_raw_file_data(parsed.data);
                self.refresh_headers();
                Ok(())
            }
            Err(err) => {
                log::error!("{}", err);
                self.store.set_selected_file(None);
                self.store.set_file_headers(Vec::new());
                self.store.set_raw_file_data(Vec::new());
                self.store.set_error(Some(err.to_string()));
                self.notifier.error(&err.to_string());
                Err(err)
            }
        }
    }

    /// Toggle whether row 0 holds column names; headers follow the flag
    pub fn set_has_header_row(&mut self, has_header_row: bool) {
        self.store.set_has_header_row(has_header_row);
        self.refresh_headers();
    }

    /// Column labels come from row 0 only when the file has a header row;
    /// without one there is nothing to map against
    fn refresh_headers(&mut self) {
        let headers = match self.store.raw_file_data().first() {
            Some(row) if self.store.has_header_row() => {
                row.iter().map(|cell| cell.to_string()).collect()
            }
            _ => Vec::new(),
        };
        self.store.set_file_headers(headers);

        if self.store.current_step() == ImportStep::Mapping {
            self.apply_auto_mapping();
        }
    }

    // === Step 2 ===

    /// Merge auto-detected mappings for unmapped fields; returns how many were added
    pub fn apply_auto_mapping(&mut self) -> usize {
        let staged = auto_map(
            self.fields(),
            self.store.file_headers(),
            self.store.field_mappings(),
        );
        if staged.is_empty() {
            return 0;
        }

        let added = staged.len();
        let mut merged: FieldMappings = self.store.field_mappings().clone();
        merged.extend(staged);
        self.store.set_field_mappings(merged);
        log::info!("Auto-mapped {} fields", added);
        added
    }

    pub fn map_field(&mut self, field_key: &str, column: &str) {
        self.store.update_field_mapping(field_key, column);
    }

    // === Step 3 ===

    /// Rebuild the parsed accounts from the raw rows and current mapping
    pub fn prepare_review(&mut self) {
        let accounts = materialize_accounts(
            self.store.raw_file_data(),
            self.store.field_mappings(),
            self.store.has_header_row(),
        );
        log::debug!("Prepared {} accounts for review", accounts.len());
        self.store.set_parsed_accounts(accounts);
    }

    pub async fn load_template_preview(&mut self) {
        let Some(template_id) = self.store.selected_template_id().map(str::to_string) else {
            self.preview = Resource::NotAsked;
            return;
        };

        self.preview = Resource::Loading;
        let result = self.api.template_preview(&template_id).await;
        if let Err(e) = &result {
            log::error!("Failed to load preview for template {}: {:#}", template_id, e);
            self.notifier.error("Failed to load template preview");
        }
        self.preview = Resource::from_result(result.map_err(|e| format!("{:#}", e)));
    }

    pub fn preview_summary(&self) -> Option<&PreviewSummary> {
        self.preview.value().map(|p| &p.summary)
    }

    /// Rows shown at review: parsed accounts, or the template preview
    pub fn review_rows(&self) -> Vec<ReviewRow> {
        match self.store.import_method() {
            ImportMethod::File => rows_from_parsed(self.store.parsed_accounts()),
            ImportMethod::Template => self
                .preview
                .value()
                .map(|p| rows_from_template(&p.accounts))
                .unwrap_or_default(),
        }
    }

    pub fn toggle_account(&mut self, id: &str) {
        self.store.toggle_account_selection(id);
    }

    pub fn deselect_all(&mut self) {
        self.store.deselect_all_accounts();
    }

    // === Navigation ===

    /// Whether the current step allows moving forward
    pub fn can_proceed(&self) -> bool {
        let method = self.store.import_method();
        match self.store.current_step() {
            ImportStep::Source => match method {
                ImportMethod::File => self.store.selected_file().is_some(),
                ImportMethod::Template => self.store.selected_template_id().is_some(),
            },
            ImportStep::Mapping => match method {
                ImportMethod::File => mapping_ready(self.fields(), self.store.field_mappings()),
                ImportMethod::Template => true,
            },
            ImportStep::Review => match method {
                ImportMethod::File => !self.store.parsed_accounts().is_empty(),
                ImportMethod::Template => true,
            },
            ImportStep::Complete => false,
        }
    }

    /// Move forward from the current step.
    ///
    /// At review this submits the import; the step only becomes `Complete`
    /// when submission succeeds. A queued import starts polling. Returns the
    /// step the wizard is on afterwards.
    pub async fn next(&mut self) -> Result<ImportStep, ImportError> {
        if !self.can_proceed() {
            return Ok(self.step());
        }

        match (self.step(), self.store.import_method()) {
            (ImportStep::Source, ImportMethod::Template) => {
                self.store.go_to_step(ImportStep::Review);
                self.load_template_preview().await;
            }
            (ImportStep::Source, ImportMethod::File) => {
                self.store.go_to_step(ImportStep::Mapping);
                self.apply_auto_mapping();
            }
            (ImportStep::Mapping, _) => {
                self.prepare_review();
                self.store.go_to_step(ImportStep::Review);
            }
            (ImportStep::Review, _) => {
                if let Submission::Queued(_) = self.orchestrator.submit(&mut self.store).await? {
                    self.poll = self.orchestrator.start_polling(&self.store);
                }
            }
            (ImportStep::Complete, _) => {}
        }

        Ok(self.step())
    }

    /// Move back one step; template imports jump from review to the start.
    /// Nothing leaves the last step except `close`.
    pub fn back(&mut self) -> ImportStep {
        match (self.step(), self.store.import_method()) {
            (ImportStep::Complete, _) => {}
            (ImportStep::Review, ImportMethod::Template) => {
                self.store.go_to_step(ImportStep::Source)
            }
            _ => self.store.prev_step(),
        }
        self.step()
    }

    // === Completion ===

    pub fn poll_handle(&self) -> Option<&PollHandle> {
        self.poll.as_ref()
    }

    /// Wait for the queued import (if any) to finish and record its results
    pub async fn wait_for_completion(&mut self) -> Result<Option<&ImportResults>, ImportError> {
        if self.poll.is_none() {
            self.poll = self.orchestrator.start_polling(&self.store);
        }

        if let Some(mut handle) = self.poll.take() {
            if let Some(outcome) = handle.outcome().await {
                self.orchestrator
                    .apply_poll_outcome(&mut self.store, outcome)
                    .await?;
            }
        }

        Ok(self.store.import_results())
    }

    /// Tear down the session: stop polling and start over
    pub fn close(&mut self) {
        if let Some(handle) = self.poll.take() {
            log::debug!("Stopping progress polling for import {}", handle.import_id());
            handle.cancel();
        }
        self.preview = Resource::NotAsked;
        self.store.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ACCOUNTS_KEY;
    use crate::api::models::{ImportFileResponse, ProgressStatus};
    use crate::import::parser::{FileKind, parse_bytes};
    use crate::import::state::ResultStatus;
    use crate::import::testing::{MockApi, apply_response, progress};
    use crate::notify::{NoticeLevel, RecordingNotifier};
    use serde_json::json;
    use std::io::Write;
    use std::time::Duration;

    const SAMPLE_CSV: &str = "Account Name,Account Type\nCash,asset\nRent,expense\nSales,income\n";

    fn wizard() -> (ImportWizard, Arc<MockApi>, Arc<RecordingNotifier>) {
        let api = Arc::new(MockApi::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let config = ImportConfig {
            poll_interval_ms: 1,
            ..Default::default()
        };
        let wizard = ImportWizard::new(api.clone(), notifier.clone(), config);
        (wizard, api, notifier)
    }

    fn csv_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    /// Drive a file import up to the review step
    async fn at_review(wizard: &mut ImportWizard, file: &tempfile::NamedTempFile) {
        wizard.load_fields().await;
        wizard.select_file(SelectedFile::new(file.path())).await.unwrap();
        assert_eq!(wizard.next().await.unwrap(), ImportStep::Mapping);
        assert_eq!(wizard.next().await.unwrap(), ImportStep::Review);
    }

    #[tokio::test]
    async fn test_file_import_full_selection() {
        let (mut wizard, api, _) = wizard();
        let file = csv_file(SAMPLE_CSV);
        at_review(&mut wizard, &file).await;

        let store = wizard.store();
        assert_eq!(store.parsed_accounts().len(), 3);
        assert_eq!(store.selected_account_ids().len(), 3);
        assert_eq!(
            store.parsed_accounts()[1].field("accountType").unwrap().to_string(),
            "expense"
        );

        assert_eq!(wizard.next().await.unwrap(), ImportStep::Complete);
        assert_eq!(wizard.store().import_results().unwrap().total, 3);

        // full selection goes up unmodified
        let (upload, _) = &api.uploads()[0];
        assert_eq!(upload.bytes, SAMPLE_CSV.as_bytes());
    }

    #[tokio::test]
    async fn test_file_import_partial_selection() {
        let (mut wizard, api, _) = wizard();
        let file = csv_file(SAMPLE_CSV);
        at_review(&mut wizard, &file).await;

        let rent = wizard
            .review_rows()
            .into_iter()
            .find(|r| r.value("accountName") == "Rent")
            .unwrap();
        wizard.toggle_account(&rent.id);
        wizard.next().await.unwrap();

        let (upload, _) = &api.uploads()[0];
        let parsed = parse_bytes(upload.bytes.clone(), FileKind::Xlsx).unwrap();
        let rows: Vec<Vec<String>> = parsed
            .data
            .iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect();
        assert_eq!(
            rows,
            vec![
                vec!["Account Name", "Account Type"],
                vec!["Cash", "asset"],
                vec!["Sales", "income"],
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_selection_sends_original() {
        let (mut wizard, api, _) = wizard();
        let file = csv_file(SAMPLE_CSV);
        at_review(&mut wizard, &file).await;

        wizard.deselect_all();
        wizard.next().await.unwrap();

        let (upload, _) = &api.uploads()[0];
        assert_eq!(upload.bytes, SAMPLE_CSV.as_bytes());
    }

    #[tokio::test]
    async fn test_template_import_skips_mapping() {
        let (mut wizard, api, _) = wizard();
        MockApi::set(
            &api.preview,
            Ok(serde_json::from_value(json!({
                "accounts": [{"accountName": "Cash", "accountType": "asset"}],
                "summary": {"totalAccounts": 10, "newAccounts": 8, "skippedAccounts": 2}
            }))
            .unwrap()),
        );
        MockApi::set(&api.apply, Ok(apply_response(10, 8, 2, 0)));

        wizard.set_method(ImportMethod::Template);
        assert!(!wizard.can_proceed());
        wizard.select_template(Some("tpl-1".into()));

        assert_eq!(wizard.next().await.unwrap(), ImportStep::Review);
        assert_eq!(wizard.preview_summary().unwrap().new_accounts, 8);
        let rows = wizard.review_rows();
        assert_eq!(rows[0].id, "template-acc-0");
        assert!(wizard.store().parsed_accounts().is_empty());

        assert_eq!(wizard.back(), ImportStep::Source);
        assert_eq!(wizard.next().await.unwrap(), ImportStep::Review);

        assert_eq!(wizard.next().await.unwrap(), ImportStep::Complete);
        assert_eq!(
            wizard.store().import_results(),
            Some(&ImportResults::completed(10, 8, 2, 0))
        );
        assert_eq!(api.invalidations(), vec![ACCOUNTS_KEY.to_string()]);
    }

    #[tokio::test]
    async fn test_mapping_gates_progress() {
        let (mut wizard, _, _) = wizard();
        let file = csv_file("Name,Kind\nCash,asset\n");
        wizard.load_fields().await;
        wizard.select_file(SelectedFile::new(file.path())).await.unwrap();
        wizard.next().await.unwrap();

        // nothing matches by label or key
        assert!(wizard.store().field_mappings().is_empty());
        assert!(!wizard.can_proceed());
        assert_eq!(wizard.next().await.unwrap(), ImportStep::Mapping);

        wizard.map_field("accountName", "Name");
        wizard.map_field("accountType", "Kind");
        assert!(wizard.can_proceed());
        assert_eq!(wizard.next().await.unwrap(), ImportStep::Review);
    }

    #[tokio::test]
    async fn test_auto_mapping_keeps_manual_choice() {
        let (mut wizard, _, _) = wizard();
        let file = csv_file("Account Name,Account Type,Type\nCash,asset,x\n");
        wizard.load_fields().await;
        wizard.select_file(SelectedFile::new(file.path())).await.unwrap();
        wizard.next().await.unwrap();

        wizard.map_field("accountType", "Type");
        assert_eq!(wizard.apply_auto_mapping(), 0);
        assert_eq!(
            wizard.store().field_mappings().get("accountType").map(String::as_str),
            Some("Type")
        );

        // back and forth re-runs the scan without clobbering
        wizard.back();
        wizard.next().await.unwrap();
        assert_eq!(
            wizard.store().field_mappings().get("accountType").map(String::as_str),
            Some("Type")
        );
    }

    #[tokio::test]
    async fn test_no_header_row_leaves_nothing_to_map() {
        let (mut wizard, api, _) = wizard();
        let file = csv_file("Account Name,Account Type\nCash,asset\n");
        wizard.load_fields().await;
        wizard.set_has_header_row(false);
        wizard.select_file(SelectedFile::new(file.path())).await.unwrap();

        assert!(wizard.store().file_headers().is_empty());
        assert_eq!(wizard.store().raw_file_data().len(), 2);

        assert_eq!(wizard.next().await.unwrap(), ImportStep::Mapping);
        assert!(wizard.store().field_mappings().is_empty());
        assert!(!wizard.can_proceed());
        assert_eq!(wizard.next().await.unwrap(), ImportStep::Mapping);
        assert!(api.uploads().is_empty());

        // turning the header row back on restores labels and auto-maps them
        wizard.set_has_header_row(true);
        assert_eq!(
            wizard.store().file_headers(),
            &["Account Name".to_string(), "Account Type".to_string()]
        );
        assert!(wizard.can_proceed());
        assert_eq!(wizard.next().await.unwrap(), ImportStep::Review);
        let accounts = wizard.store().parsed_accounts();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].field("accountName").unwrap().to_string(), "Cash");
    }

    #[tokio::test]
    async fn test_rejected_file_changes_nothing() {
        let (mut wizard, _, notifier) = wizard();

        let result = wizard.select_file(SelectedFile::new("/tmp/accounts.pdf")).await;
        assert!(matches!(result, Err(ImportError::FileValidation(_))));
        assert!(wizard.store().selected_file().is_none());
        assert!(wizard.store().error().is_none());
        assert_eq!(notifier.count(NoticeLevel::Error), 1);
    }

    #[tokio::test]
    async fn test_declared_media_type_accepts_bare_name() {
        use crate::import::parser::CSV_MIME;

        let (mut wizard, api, _) = wizard();
        let content = "Account Name,Account Type\nCash,asset\n";
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();

        wizard.load_fields().await;
        let selected = SelectedFile::new(file.path()).with_media_type(CSV_MIME);
        wizard.select_file(selected).await.unwrap();
        assert_eq!(wizard.store().file_headers(), ["Account Name", "Account Type"]);

        assert_eq!(wizard.next().await.unwrap(), ImportStep::Mapping);
        assert_eq!(wizard.next().await.unwrap(), ImportStep::Review);
        assert_eq!(wizard.next().await.unwrap(), ImportStep::Complete);

        let (upload, _) = &api.uploads()[0];
        assert_eq!(upload.media_type, CSV_MIME);
        assert_eq!(upload.bytes, content.as_bytes());
    }

    #[tokio::test]
    async fn test_empty_file_stays_on_source() {
        let (mut wizard, _, notifier) = wizard();
        let file = csv_file(",,\n  , \n");

        let result = wizard.select_file(SelectedFile::new(file.path())).await;
        assert!(matches!(result, Err(ImportError::EmptyFile)));
        assert!(wizard.store().error().is_some());
        assert!(!wizard.store().is_loading());
        assert!(!wizard.can_proceed());
        assert_eq!(wizard.next().await.unwrap(), ImportStep::Source);
        assert_eq!(notifier.count(NoticeLevel::Error), 1);
    }

    #[tokio::test]
    async fn test_fields_fall_back_on_error() {
        let (mut wizard, api, _) = wizard();
        MockApi::set(&api.fields, Err("503 Service Unavailable"));

        wizard.load_fields().await;
        assert!(wizard.fields.error().is_some());
        assert_eq!(wizard.fields().len(), default_import_fields().len());
    }

    #[tokio::test]
    async fn test_server_fields_are_used() {
        let (mut wizard, api, _) = wizard();
        MockApi::set(
            &api.fields,
            Ok(vec![ImportField::new("code", "Code", true)]),
        );

        wizard.load_fields().await;
        assert_eq!(wizard.fields().len(), 1);
        assert_eq!(wizard.fields()[0].key, "code");
    }

    #[tokio::test]
    async fn test_queued_import_completes_through_polling() {
        let (mut wizard, api, _) = wizard();
        MockApi::set(
            &api.import,
            Ok(ImportFileResponse {
                id: Some("job-1".into()),
                message: None,
            }),
        );
        api.push_progress(Ok(progress(ProgressStatus::Processing, 1)));
        api.push_progress(Ok(progress(ProgressStatus::Completed, 3)));

        let file = csv_file(SAMPLE_CSV);
        at_review(&mut wizard, &file).await;
        assert_eq!(wizard.next().await.unwrap(), ImportStep::Complete);
        assert!(wizard.poll_handle().is_some());
        assert!(wizard.store().is_loading());

        let results = wizard.wait_for_completion().await.unwrap().unwrap();
        assert_eq!(results.status, ResultStatus::Completed);
        assert_eq!(results.created, 3);
        assert!(!wizard.store().is_loading());
        assert_eq!(api.progress_calls(), 2);
    }

    #[tokio::test]
    async fn test_close_stops_polling_and_resets() {
        let (mut wizard, api, _) = wizard();
        MockApi::set(
            &api.import,
            Ok(ImportFileResponse {
                id: Some("job-2".into()),
                message: None,
            }),
        );

        let file = csv_file(SAMPLE_CSV);
        at_review(&mut wizard, &file).await;
        wizard.next().await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        wizard.close();
        let calls = api.progress_calls();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(api.progress_calls(), calls);
        assert!(wizard.poll_handle().is_none());
        assert_eq!(wizard.step(), ImportStep::Source);
        assert!(wizard.store().import_id().is_none());
    }

    #[tokio::test]
    async fn test_no_back_from_complete() {
        let (mut wizard, _, _) = wizard();
        let file = csv_file(SAMPLE_CSV);
        at_review(&mut wizard, &file).await;
        wizard.next().await.unwrap();

        assert_eq!(wizard.back(), ImportStep::Complete);
        assert!(!wizard.can_proceed());
        assert_eq!(wizard.next().await.unwrap(), ImportStep::Complete);
    }

    #[tokio::test]
    async fn test_file_back_is_single_step() {
        let (mut wizard, _, _) = wizard();
        let file = csv_file(SAMPLE_CSV);
        at_review(&mut wizard, &file).await;

        assert_eq!(wizard.back(), ImportStep::Mapping);
        assert_eq!(wizard.back(), ImportStep::Source);
        assert_eq!(wizard.back(), ImportStep::Source);
    }
}
