use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::oauth;
use super::requests::{RequestBuilder, StyledOperation};
use super::theme::Theme;
use crate::config::GoogleConfig;
use crate::http::{check_status, with_backoff, ApiError, MAX_RETRIES};
use crate::pipeline::DocumentPublisher;
use crate::transcript::Document;

const SERVICE: &str = "Google Docs";
const DOCUMENT_MIME_TYPE: &str = "application/vnd.google-apps.document";
/// Refresh this long before the reported expiry.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);
const DEFAULT_TOKEN_LIFETIME: u64 = 3600;

struct CachedToken {
    value: String,
    expires_at: Instant,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FileMetadata<'a> {
    name: &'a str,
    mime_type: &'a str,
    parents: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
struct CreatedFile {
    id: String,
}

/// Creates styled Google Docs in a Drive folder.
pub struct GDocsClient {
    client: reqwest::Client,
    config: GoogleConfig,
    builder: RequestBuilder,
    token: Mutex<Option<CachedToken>>,
}

impl GDocsClient {
    pub fn new(config: &GoogleConfig, theme: Theme) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .context("Failed to create HTTP client")?;
        let builder = RequestBuilder::new(theme)?;

        info!(
            "Initialized Google Docs client for folder: {}",
            config.drive_folder_id
        );

        Ok(Self {
            client,
            config: config.clone(),
            builder,
            token: Mutex::new(None),
        })
    }

    async fn access_token(&self) -> Result<String, ApiError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.expires_at {
                return Ok(token.value.clone());
            }
        }

        let response = oauth::refresh_access_token(&self.client, &self.config).await?;
        let lifetime = Duration::from_secs(response.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME));
        *cached = Some(CachedToken {
            value: response.access_token.clone(),
            expires_at: Instant::now() + lifetime.saturating_sub(EXPIRY_MARGIN),
        });
        Ok(response.access_token)
    }

    async fn create_file(&self, title: &str) -> Result<String, ApiError> {
        let token = self.access_token().await?;
        let url = format!(
            "{}/files",
            self.config.drive_api_base.trim_end_matches('/')
        );
        let metadata = FileMetadata {
            name: title,
            mime_type: DOCUMENT_MIME_TYPE,
            parents: [self.config.drive_folder_id.as_str()],
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&token)
            .query(&[("supportsAllDrives", "true"), ("fields", "id")])
            .json(&metadata)
            .send()
            .await
            .map_err(|e| ApiError::transport(SERVICE, e))?;
        let file: CreatedFile = check_status(SERVICE, response)
            .await?
            .json()
            .await
            .map_err(|e| ApiError::decode(SERVICE, e.to_string()))?;
        Ok(file.id)
    }

    async fn batch_update(
        &self,
        document_id: &str,
        operations: &[StyledOperation],
    ) -> Result<(), ApiError> {
        let url = format!(
            "{}/documents/{}:batchUpdate",
            self.config.docs_api_base.trim_end_matches('/'),
            document_id
        );
        let body = json!({ "requests": operations });

        with_backoff("Google Docs batchUpdate", MAX_RETRIES, ApiError::is_transient, || async {
            let token = self.access_token().await?;
            let response = self
                .client
                .post(&url)
                .bearer_auth(&token)
                .json(&body)
                .send()
                .await
                .map_err(|e| ApiError::transport(SERVICE, e))?;
            check_status(SERVICE, response).await.map(|_| ())
        })
        .await
    }
}

#[async_trait]
impl DocumentPublisher for GDocsClient {
    async fn publish(&self, title: &str, document: &Document) -> Result<String> {
        let document_id = self
            .create_file(title)
            .await
            .context("Failed to create Google Docs file")?;
        debug!("Created empty document {}", document_id);

        let operations = self.builder.build_document(document);
        if !operations.is_empty() {
            debug!("Sending {} styled operations", operations.len());
            self.batch_update(&document_id, &operations)
                .await
                .context("Failed to write document content")?;
        }

        info!("Created document: {} (ID: {})", title, document_id);
        Ok(document_id)
    }

    fn document_url(&self, document_id: &str) -> String {
        format!(
            "https://{}/document/d/{}/edit",
            self.config.docs_host, document_id
        )
    }
}
