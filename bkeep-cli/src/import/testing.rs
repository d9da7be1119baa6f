//! Scripted in-memory backend for wizard tests

use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Result, anyhow};
use async_trait::async_trait;

use crate::api::ImportApi;
use crate::api::models::{
    ApplySummary, ApplyTemplateResponse, ImportFileResponse, ImportProgress, ProgressStatus,
    TemplateFilter, TemplatePreview, TemplateSummary,
};
use crate::import::mapping::{ImportField, default_import_fields};
use crate::import::reencode::UploadFile;

type Scripted<T> = Mutex<Result<T, String>>;

fn scripted<T: Clone>(slot: &Scripted<T>) -> Result<T> {
    slot.lock().unwrap().clone().map_err(|e| anyhow!(e))
}

pub fn progress(status: ProgressStatus, successful_rows: u64) -> ImportProgress {
    ImportProgress {
        status,
        total_rows: 3,
        successful_rows,
        failed_rows: 0,
        error_message: None,
    }
}

pub fn apply_response(total: u64, created: u64, skipped: u64, failed: u64) -> ApplyTemplateResponse {
    ApplyTemplateResponse {
        summary: ApplySummary {
            total_processed: total,
            created,
            skipped,
            failed,
        },
    }
}

pub struct MockApi {
    pub fields: Scripted<Vec<ImportField>>,
    pub templates: Scripted<Vec<TemplateSummary>>,
    pub preview: Scripted<TemplatePreview>,
    pub apply: Scripted<ApplyTemplateResponse>,
    pub import: Scripted<ImportFileResponse>,
    pub sample: Scripted<Vec<u8>>,
    progress: Mutex<VecDeque<Result<ImportProgress, String>>>,
    progress_calls: AtomicUsize,
    uploads: Mutex<Vec<(UploadFile, BTreeMap<String, String>)>>,
    applied: Mutex<Vec<String>>,
    invalidations: Mutex<Vec<String>>,
}

impl Default for MockApi {
    fn default() -> Self {
        Self::new()
    }
}

impl MockApi {
    pub fn new() -> Self {
        Self {
            fields: Mutex::new(Ok(default_import_fields())),
            templates: Mutex::new(Ok(Vec::new())),
            preview: Mutex::new(Ok(TemplatePreview::default())),
            apply: Mutex::new(Ok(ApplyTemplateResponse::default())),
            import: Mutex::new(Ok(ImportFileResponse::default())),
            sample: Mutex::new(Ok(Vec::new())),
            progress: Mutex::new(VecDeque::new()),
            progress_calls: AtomicUsize::new(0),
            uploads: Mutex::new(Vec::new()),
            applied: Mutex::new(Vec::new()),
            invalidations: Mutex::new(Vec::new()),
        }
    }

    pub fn set<T>(slot: &Scripted<T>, value: Result<T, &str>) {
        *slot.lock().unwrap() = value.map_err(str::to_string);
    }

    /// Queue a progress response; once drained the mock answers "processing"
    pub fn push_progress(&self, response: Result<ImportProgress, String>) {
        self.progress.lock().unwrap().push_back(response);
    }

    pub fn progress_calls(&self) -> usize {
        self.progress_calls.load(Ordering::SeqCst)
    }

    pub fn uploads(&self) -> Vec<(UploadFile, BTreeMap<String, String>)> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn applied(&self) -> Vec<String> {
        self.applied.lock().unwrap().clone()
    }

    pub fn invalidations(&self) -> Vec<String> {
        self.invalidations.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImportApi for MockApi {
    async fn fetch_import_fields(&self) -> Result<Vec<ImportField>> {
        scripted(&self.fields)
    }

    async fn list_templates(&self, _filter: &TemplateFilter) -> Result<Vec<TemplateSummary>> {
        scripted(&self.templates)
    }

    async fn template_preview(&self, _template_id: &str) -> Result<TemplatePreview> {
        scripted(&self.preview)
    }

    async fn apply_template(&self, template_id: &str) -> Result<ApplyTemplateResponse> {
        self.applied.lock().unwrap().push(template_id.to_string());
        scripted(&self.apply)
    }

    async fn import_file(
        &self,
        file: UploadFile,
        mapping: &BTreeMap<String, String>,
    ) -> Result<ImportFileResponse> {
        self.uploads.lock().unwrap().push((file, mapping.clone()));
        scripted(&self.import)
    }

    async fn import_progress(&self, _import_id: &str) -> Result<ImportProgress> {
        self.progress_calls.fetch_add(1, Ordering::SeqCst);
        match self.progress.lock().unwrap().pop_front() {
            Some(response) => response.map_err(|e| anyhow!(e)),
            None => Ok(progress(ProgressStatus::Processing, 0)),
        }
    }

    async fn download_sample(&self) -> Result<Vec<u8>> {
        scripted(&self.sample)
    }

    async fn invalidate_queries(&self, key: &str) -> Result<()> {
        self.invalidations.lock().unwrap().push(key.to_string());
        Ok(())
    }
}
