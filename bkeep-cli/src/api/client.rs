//! HTTP client for the BKeep REST backend

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::cache::{ACCOUNTS_KEY, QueryCache};
use super::models::{
    ApiEnvelope, ApiErrorBody, ApplyTemplateResponse, ImportFileResponse, ImportProgress,
    TemplateFilter, TemplatePreview, TemplateSummary,
};
use crate::config::ApiConfig;
use crate::import::mapping::ImportField;
use crate::import::reencode::UploadFile;

/// Backend operations the import wizard depends on
#[async_trait]
pub trait ImportApi: Send + Sync {
    async fn fetch_import_fields(&self) -> Result<Vec<ImportField>>;

    async fn list_templates(&self, filter: &TemplateFilter) -> Result<Vec<TemplateSummary>>;

    async fn template_preview(&self, template_id: &str) -> Result<TemplatePreview>;

    async fn apply_template(&self, template_id: &str) -> Result<ApplyTemplateResponse>;

    /// `mapping` is file column -> system field
    async fn import_file(
        &self,
        file: UploadFile,
        mapping: &BTreeMap<String, String>,
    ) -> Result<ImportFileResponse>;

    async fn import_progress(&self, import_id: &str) -> Result<ImportProgress>;

    async fn download_sample(&self) -> Result<Vec<u8>>;

    /// Invalidate a cached query and refetch it if this client owns it
    async fn invalidate_queries(&self, key: &str) -> Result<()>;
}

/// reqwest-backed implementation of [`ImportApi`]
#[derive(Debug)]
pub struct BkeepClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
    tenant_id: Option<String>,
    cache: QueryCache,
}

impl BkeepClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("bkeep-cli/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            tenant_id: config.tenant_id.clone(),
            cache: QueryCache::new(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request_id = uuid::Uuid::new_v4().to_string();
        log::debug!("{} {} (request {})", method, path, request_id);

        let mut builder = self
            .http
            .request(method, self.url(path))
            .header("X-Request-Id", request_id);

        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        if let Some(tenant) = &self.tenant_id {
            builder = builder.header("X-Tenant-Id", tenant);
        }
        builder
    }

    /// Send and fail on non-success status, using the backend's message when present
    async fn send(&self, builder: RequestBuilder, what: &str) -> Result<Response> {
        let response = builder
            .send()
            .await
            .with_context(|| format!("Request failed: {}", what))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ApiErrorBody>(&body)
            .ok()
            .and_then(|b| b.describe().map(str::to_string))
            .unwrap_or(body);
        anyhow::bail!("{} failed ({}): {}", what, status, detail.trim())
    }

    async fn envelope<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        what: &str,
    ) -> Result<ApiEnvelope<T>> {
        let response = self.send(builder, what).await?;
        response
            .json()
            .await
            .with_context(|| format!("Invalid response body: {}", what))
    }

    async fn data<T: DeserializeOwned>(&self, builder: RequestBuilder, what: &str) -> Result<T> {
        Ok(self.envelope(builder, what).await?.data)
    }

    /// Fetch the accounts list and store it under [`ACCOUNTS_KEY`]
    pub async fn refetch_accounts(&self) -> Result<Value> {
        let accounts: Value = self
            .data(self.request(Method::GET, "accounts"), "fetch accounts")
            .await?;
        self.cache.insert(ACCOUNTS_KEY, accounts.clone()).await;
        Ok(accounts)
    }

    /// Cached accounts list, fetching it on a miss
    pub async fn accounts(&self) -> Result<Value> {
        match self.cache.get(ACCOUNTS_KEY).await {
            Some(cached) => Ok(cached),
            None => self.refetch_accounts().await,
        }
    }
}

fn template_path(template_id: &str, action: &str) -> String {
    format!(
        "chart-of-accounts/templates/{}/{}",
        urlencoding::encode(template_id),
        action
    )
}

#[async_trait]
impl ImportApi for BkeepClient {
    async fn fetch_import_fields(&self) -> Result<Vec<ImportField>> {
        self.data(
            self.request(Method::GET, "chart-of-accounts/import/fields"),
            "fetch import fields",
        )
        .await
    }

    async fn list_templates(&self, filter: &TemplateFilter) -> Result<Vec<TemplateSummary>> {
        let builder = self
            .request(Method::GET, "chart-of-accounts/templates")
            .query(&filter.query_pairs());
        self.data(builder, "list templates").await
    }

    async fn template_preview(&self, template_id: &str) -> Result<TemplatePreview> {
        self.data(
            self.request(Method::GET, &template_path(template_id, "preview")),
            "fetch template preview",
        )
        .await
    }

    async fn apply_template(&self, template_id: &str) -> Result<ApplyTemplateResponse> {
        self.data(
            self.request(Method::POST, &template_path(template_id, "apply")),
            "apply template",
        )
        .await
    }

    async fn import_file(
        &self,
        file: UploadFile,
        mapping: &BTreeMap<String, String>,
    ) -> Result<ImportFileResponse> {
        let part = Part::bytes(file.bytes)
            .file_name(file.name)
            .mime_str(&file.media_type)
            .context("Invalid media type for upload")?;
        let mapping = serde_json::to_string(mapping).context("Failed to encode column mapping")?;
        let form = Form::new().part("file", part).text("mapping", mapping);

        let builder = self
            .request(Method::POST, "chart-of-accounts/import")
            .multipart(form);
        let envelope: ApiEnvelope<Option<ImportFileResponse>> =
            self.envelope(builder, "import accounts").await?;
        Ok(envelope.into_import_response())
    }

    async fn import_progress(&self, import_id: &str) -> Result<ImportProgress> {
        let path = format!(
            "chart-of-accounts/import/{}/progress",
            urlencoding::encode(import_id)
        );
        self.data(self.request(Method::GET, &path), "check import progress")
            .await
    }

    async fn download_sample(&self) -> Result<Vec<u8>> {
        let response = self
            .send(
                self.request(Method::GET, "chart-of-accounts/import/sample"),
                "download sample file",
            )
            .await?;
        let bytes = response
            .bytes()
            .await
            .context("Failed to read sample file body")?;
        Ok(bytes.to_vec())
    }

    async fn invalidate_queries(&self, key: &str) -> Result<()> {
        self.cache.invalidate(key).await;
        if key == ACCOUNTS_KEY {
            self.refetch_accounts().await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> BkeepClient {
        BkeepClient::new(&ApiConfig {
            base_url: base_url.to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_url_joining() {
        let c = client("http://localhost:3000/api/v1/");
        assert_eq!(
            c.url("/chart-of-accounts/import"),
            "http://localhost:3000/api/v1/chart-of-accounts/import"
        );
    }

    #[test]
    fn test_template_path_encodes_id() {
        assert_eq!(
            template_path("tpl 1/x", "apply"),
            "chart-of-accounts/templates/tpl%201%2Fx/apply"
        );
    }
}
