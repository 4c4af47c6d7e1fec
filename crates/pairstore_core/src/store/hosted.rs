//! REST backend for the hosted table + object storage service.
//!
//! Object storage lives under `<base>/storage/v1/object/<bucket>/<key>`, rows
//! under `<base>/rest/v1/<table>` with PostgREST-style filters. Pattern
//! filters may over-match (`*` is a wildcard to the service and cannot be
//! escaped); the client re-checks rows, so that is harmless.

use super::{ObjectStore, PairFilter, PairTable};
use crate::matcher::escape_like_pattern;
use crate::{AppError, Config, ImageTextPair};
use async_trait::async_trait;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

const SELECT_COLUMNS: &str = "image_url,text_content";

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(rename = "Key")]
    key: Option<String>,
}

/// Hosted-service client implementing both [`ObjectStore`] and [`PairTable`].
#[derive(Clone)]
pub struct HostedBackend {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    table: String,
}

impl HostedBackend {
    /// Build a backend for `base_url`.
    ///
    /// # Arguments
    /// - `base_url`: Service base URL (trailing `/` ignored).
    /// - `api_key`: Key sent as `apikey` header and bearer token.
    /// - `table`: Table holding pair rows.
    /// - `timeout`: Transport-level timeout for each HTTP request.
    ///
    /// # Errors
    /// Returns [`AppError::StorageMessage`] if the HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        api_key: &str,
        table: &str,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("pairstore/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            table: table.to_string(),
        })
    }

    /// Build a backend from validated configuration.
    ///
    /// # Errors
    /// Returns [`AppError::Validation`] when URL or key are missing.
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        config.validate()?;
        let (Some(base_url), Some(api_key)) = (config.base_url.as_deref(), config.api_key.as_deref())
        else {
            return Err(AppError::Validation(
                "hosted backend requires PAIRSTORE_URL and PAIRSTORE_KEY".to_string(),
            ));
        };
        Self::new(base_url, api_key, &config.table, config.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn object_url(&self, bucket: &str, key: &str) -> String {
        let encoded_key = key
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url,
            urlencoding::encode(bucket),
            encoded_key
        )
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, urlencoding::encode(&self.table))
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }
}

fn filter_query(filter: &PairFilter) -> Option<(&'static str, String)> {
    match filter {
        PairFilter::All => None,
        PairFilter::TextEquals(text) => Some(("text_content", format!("eq.{}", text))),
        PairFilter::TextEqualsIgnoreCase(text) => Some((
            "text_content",
            format!("ilike.{}", escape_like_pattern(text)),
        )),
        PairFilter::ImageUrlContains(fragment) => Some((
            "image_url",
            format!("like.*{}*", escape_like_pattern(fragment)),
        )),
    }
}

/// Extract a human-readable message from a backend error body.
pub(crate) fn backend_error_message(status: reqwest::StatusCode, body: &str) -> String {
    if body.trim().is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string();
    }
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        for field in ["message", "error_description", "error", "msg"] {
            if let Some(message) = value.get(field).and_then(Value::as_str) {
                return message.to_string();
            }
        }
    }
    body.trim().to_string()
}

async fn ensure_success(
    response: reqwest::Response,
    operation: &str,
) -> Result<reqwest::Response, AppError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|err| format!("failed to read error response body: {}", err));
    Err(AppError::StorageMessage(format!(
        "{} failed ({}): {}",
        operation,
        status,
        backend_error_message(status, &body)
    )))
}

fn object_path_from_key(bucket: &str, key: &str, returned: Option<String>) -> String {
    let Some(returned) = returned.filter(|value| !value.trim().is_empty()) else {
        return key.to_string();
    };
    returned
        .strip_prefix(bucket)
        .and_then(|rest| rest.strip_prefix('/'))
        .map(str::to_string)
        .unwrap_or(returned)
}

#[async_trait]
impl ObjectStore for HostedBackend {
    async fn upload_object(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, AppError> {
        let content_type = HeaderValue::from_str(content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
        let response = self
            .authorized(self.http.post(self.object_url(bucket, key)))
            .header(CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await?;
        let response = ensure_success(response, "Upload").await?;
        let body = response.text().await?;
        let returned = if body.trim().is_empty() {
            None
        } else {
            serde_json::from_str::<UploadResponse>(&body)?.key
        };
        Ok(object_path_from_key(bucket, key, returned))
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), AppError> {
        let response = self
            .authorized(self.http.delete(self.object_url(bucket, key)))
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }
        ensure_success(response, "Delete object").await?;
        Ok(())
    }
}

#[async_trait]
impl PairTable for HostedBackend {
    async fn insert(&self, pair: &ImageTextPair) -> Result<(), AppError> {
        let response = self
            .authorized(self.http.post(self.table_url()))
            .header("Prefer", "return=minimal")
            .json(&[pair])
            .send()
            .await?;
        ensure_success(response, "Insert").await?;
        Ok(())
    }

    async fn select(&self, filter: &PairFilter) -> Result<Vec<ImageTextPair>, AppError> {
        let mut query = vec![("select", SELECT_COLUMNS.to_string())];
        if let Some(condition) = filter_query(filter) {
            query.push(condition);
        }
        let response = self
            .authorized(self.http.get(self.table_url()))
            .query(&query)
            .send()
            .await?;
        let response = ensure_success(response, "Select").await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}
