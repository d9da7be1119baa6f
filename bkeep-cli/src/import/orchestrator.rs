//! Import submission and completion tracking
//!
//! Two strategies share the wizard's last step:
//! - Template: apply a predefined template; always synchronous
//! - File: upload the original file (or a filtered copy) with a column
//!   mapping; the backend may answer synchronously or queue a job that is
//!   then polled until it reaches a terminal status

use std::sync::Arc;

use super::error::ImportError;
use super::mapping::invert_mappings;
use super::parser::{CSV_MIME, FileKind, XLS_MIME, XLSX_MIME, validate_file};
use super::progress::{PollHandle, PollOutcome, spawn_progress_poll};
use super::reencode::{UploadFile, needs_reencode, reencode_selection};
use super::state::{
    ImportMethod, ImportResults, ImportStep, ResultStatus, SelectedFile, WizardStore,
};
use crate::api::models::{ImportProgress, ProgressStatus};
use crate::api::{ACCOUNTS_KEY, ImportApi};
use crate::config::ImportConfig;
use crate::notify::Notifier;

/// What the backend did with a submitted import
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Results are already recorded
    Completed,
    /// Job queued under this id; results arrive through polling
    Queued(String),
}

pub struct ImportOrchestrator {
    api: Arc<dyn ImportApi>,
    notifier: Arc<dyn Notifier>,
    config: ImportConfig,
}

impl ImportOrchestrator {
    pub fn new(api: Arc<dyn ImportApi>, notifier: Arc<dyn Notifier>, config: ImportConfig) -> Self {
        Self {
            api,
            notifier,
            config,
        }
    }

    /// Submit using whichever strategy the wizard's method selects
    pub async fn submit(&self, store: &mut WizardStore) -> Result<Submission, ImportError> {
        match store.import_method() {
            ImportMethod::Template => self
                .apply_template(store)
                .await
                .map(|()| Submission::Completed),
            ImportMethod::File => self.import_file(store).await,
        }
    }

    /// Apply the selected template and record its summary
    pub async fn apply_template(&self, store: &mut WizardStore) -> Result<(), ImportError> {
        let Some(template_id) = store.selected_template_id().map(str::to_string) else {
            return Err(ImportError::MissingSelection("no template selected"));
        };

        store.set_is_loading(true);
        log::info!("Applying template {}", template_id);

        let response = match self.api.apply_template(&template_id).await {
            Ok(response) => response,
            Err(e) => {
                store.set_is_loading(false);
                let err = ImportError::TemplateApply(format!("{:#}", e));
                log::error!("{}", err);
                self.notifier.error(&err.to_string());
                return Err(err);
            }
        };

        let summary = response.summary;
        store.set_import_results(Some(ImportResults::completed(
            summary.total_processed,
            summary.created,
            summary.skipped,
            summary.failed,
        )));
        store.set_is_loading(false);
        self.notifier.success(&format!(
            "Template applied: {} accounts created, {} skipped",
            summary.created, summary.skipped
        ));

        self.refresh_accounts().await;
        store.go_to_step(ImportStep::Complete);
        Ok(())
    }

    /// Upload the selected file with the inverted column mapping
    pub async fn import_file(&self, store: &mut WizardStore) -> Result<Submission, ImportError> {
        let Some(selected) = store.selected_file().cloned() else {
            return Err(ImportError::MissingSelection("no file selected"));
        };

        let file = match self.build_upload(store, &selected).await {
            Ok(file) => file,
            Err(err) => {
                log::error!("{}", err);
                self.notifier.error(&err.to_string());
                return Err(err);
            }
        };
        let mapping = invert_mappings(store.field_mappings());

        store.set_is_loading(true);
        log::info!(
            "Uploading {} ({} bytes, {} mapped columns)",
            file.name,
            file.bytes.len(),
            mapping.len()
        );

        let response = match self.api.import_file(file, &mapping).await {
            Ok(response) => response,
            Err(e) => {
                store.set_is_loading(false);
                let err = ImportError::Submission(format!("{:#}", e));
                log::error!("{}", err);
                self.notifier.error(&err.to_string());
                return Err(err);
            }
        };

        if let Some(import_id) = response.id {
            log::info!("Import queued as {}", import_id);
            store.set_import_id(Some(import_id.clone()));
            store.go_to_step(ImportStep::Complete);
            return Ok(Submission::Queued(import_id));
        }

        // Synchronous import: the backend reports no counts, assume the selection went in
        let selected_count = store.selected_account_ids().len();
        let count = if selected_count == 0 {
            store.parsed_accounts().len()
        } else {
            selected_count
        } as u64;
        log::info!(
            "Import completed synchronously ({} accounts): {}",
            count,
            response.message.as_deref().unwrap_or("no message")
        );

        store.set_import_results(Some(ImportResults::completed(count, count, 0, 0)));
        store.set_is_loading(false);
        self.notifier.success(&format!("Imported {} accounts", count));

        self.refresh_accounts().await;
        store.go_to_step(ImportStep::Complete);
        Ok(Submission::Completed)
    }

    /// The file to send: a filtered copy for a partial selection, else the original.
    ///
    /// Filtering is best effort; if it fails the original file goes up instead.
    async fn build_upload(
        &self,
        store: &WizardStore,
        selected: &SelectedFile,
    ) -> Result<UploadFile, ImportError> {
        let accounts = store.parsed_accounts();
        let chosen = store.selected_account_ids();

        if chosen.is_empty() && !accounts.is_empty() {
            log::warn!("No accounts selected; importing the whole file");
        }

        if needs_reencode(chosen.len(), accounts.len()) {
            match reencode_selection(
                store.raw_file_data(),
                accounts,
                chosen,
                store.has_header_row(),
            ) {
                Ok(mut file) => {
                    file.name = self.config.filtered_file_name.clone();
                    return Ok(file);
                }
                Err(e) => {
                    log::error!("{}", e);
                    self.notifier
                        .warning("Could not filter the selected accounts, importing all");
                }
            }
        }

        original_upload(selected).await
    }

    /// Start polling when a queued job has no results yet
    pub fn start_polling(&self, store: &WizardStore) -> Option<PollHandle> {
        if store.import_results().is_some() {
            return None;
        }
        let import_id = store.import_id()?.to_string();
        Some(spawn_progress_poll(
            self.api.clone(),
            import_id,
            self.config.poll_interval(),
        ))
    }

    /// Record how a polling run ended
    pub async fn apply_poll_outcome(
        &self,
        store: &mut WizardStore,
        outcome: PollOutcome,
    ) -> Result<(), ImportError> {
        match outcome {
            PollOutcome::Finished(progress) => {
                let results = results_from_progress(&progress);
                match results.status {
                    ResultStatus::Completed => self.notifier.success(&format!(
                        "Import completed: {} of {} accounts created",
                        results.created, results.total
                    )),
                    ResultStatus::Failed => self.notifier.error(
                        results
                            .error_message
                            .as_deref()
                            .unwrap_or("Import failed"),
                    ),
                }
                store.set_import_results(Some(results));
                store.set_is_loading(false);
                self.refresh_accounts().await;
                Ok(())
            }
            PollOutcome::Failed(message) => {
                let err = ImportError::Polling(message);
                store.set_is_loading(false);
                store.set_error(Some(err.to_string()));
                self.notifier.error(&err.to_string());
                Err(err)
            }
        }
    }

    async fn refresh_accounts(&self) {
        if let Err(e) = self.api.invalidate_queries(ACCOUNTS_KEY).await {
            log::warn!("Failed to refresh accounts after import: {:#}", e);
        }
    }
}

/// Summary for a terminal progress response. The backend does not report skips.
pub fn results_from_progress(progress: &ImportProgress) -> ImportResults {
    let status = match progress.status {
        ProgressStatus::Completed => ResultStatus::Completed,
        _ => ResultStatus::Failed,
    };
    ImportResults {
        status,
        total: progress.total_rows,
        created: progress.successful_rows,
        skipped: 0,
        failed: progress.failed_rows,
        error_message: progress.error_message.clone(),
    }
}

async fn original_upload(selected: &SelectedFile) -> Result<UploadFile, ImportError> {
    let bytes = tokio::fs::read(&selected.path)
        .await
        .map_err(|e| ImportError::FileRead(format!("{}: {}", selected.path.display(), e)))?;

    let media_type = match &selected.media_type {
        Some(m) => m.clone(),
        None => match validate_file(&selected.name, None)? {
            FileKind::Xlsx => XLSX_MIME,
            FileKind::Xls => XLS_MIME,
            FileKind::Csv => CSV_MIME,
        }
        .to_string(),
    };

    Ok(UploadFile {
        name: selected.name.clone(),
        media_type,
        bytes,
    })
}
