//! Wire types for the BKeep chart-of-accounts endpoints

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Standard response wrapper `{success, message, data}`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEnvelope<T> {
    #[serde(default)]
    pub message: Option<String>,
    pub data: T,
}

impl ApiEnvelope<Option<ImportFileResponse>> {
    /// Synchronous imports may answer with `data` null or absent
    pub fn into_import_response(self) -> ImportFileResponse {
        let mut response = self.data.unwrap_or_default();
        if response.message.is_none() {
            response.message = self.message;
        }
        response
    }
}

/// Error body returned by the backend on non-2xx responses
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ApiErrorBody {
    pub fn describe(&self) -> Option<&str> {
        self.message.as_deref().or(self.error.as_deref())
    }
}

/// Filter for the template list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateFilter {
    pub template_type: Option<String>,
    pub is_active: Option<bool>,
    pub page: u32,
    pub limit: u32,
    pub sort: Option<String>,
}

impl Default for TemplateFilter {
    fn default() -> Self {
        Self {
            template_type: Some("chart_of_accounts".to_string()),
            is_active: Some(true),
            page: 1,
            limit: 50,
            sort: Some("name".to_string()),
        }
    }
}

impl TemplateFilter {
    /// Query-string pairs, unset filters omitted
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(t) = &self.template_type {
            pairs.push(("type", t.clone()));
        }
        if let Some(active) = self.is_active {
            pairs.push(("isActive", active.to_string()));
        }
        pairs.push(("page", self.page.to_string()));
        pairs.push(("limit", self.limit.to_string()));
        if let Some(sort) = &self.sort {
            pairs.push(("sort", sort.clone()));
        }
        pairs
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSummary {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// An account record as the template would create it
pub type TemplateAccount = BTreeMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewSummary {
    #[serde(default)]
    pub total_accounts: u64,
    #[serde(default)]
    pub new_accounts: u64,
    #[serde(default)]
    pub skipped_accounts: u64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplatePreview {
    #[serde(default)]
    pub accounts: Vec<TemplateAccount>,
    #[serde(default)]
    pub summary: PreviewSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplySummary {
    #[serde(default)]
    pub total_processed: u64,
    #[serde(default)]
    pub created: u64,
    #[serde(default)]
    pub skipped: u64,
    #[serde(default)]
    pub failed: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ApplyTemplateResponse {
    #[serde(default)]
    pub summary: ApplySummary,
}

/// Response of the file import endpoint.
///
/// `id` is present only when the backend queued the job.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImportFileResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Server-side job status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    #[serde(other)]
    Unknown,
}

impl ProgressStatus {
    /// Polling stops on these
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportProgress {
    pub status: ProgressStatus,
    #[serde(default)]
    pub total_rows: u64,
    #[serde(default)]
    pub successful_rows: u64,
    #[serde(default)]
    pub failed_rows: u64,
    #[serde(default)]
    pub error_message: Option<String>,
}
