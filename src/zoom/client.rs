use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::header::LOCATION;
use reqwest::{redirect, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::models::{Meeting, RecordingsPage, ZoomSummary};
use crate::config::ZoomConfig;
use crate::http::{check_status, with_backoff, ApiError, MAX_RETRIES};
use crate::pipeline::RecordingSource;

const SERVICE: &str = "Zoom";
const PAGE_SIZE: u32 = 300;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Server-to-Server OAuth client for the cloud recording API.
pub struct ZoomClient {
    client: reqwest::Client,
    /// Download requests must not carry the bearer token across redirects,
    /// so this client stops at the first 3xx.
    download_client: reqwest::Client,
    account_id: String,
    client_id: String,
    client_secret: String,
    oauth_url: String,
    api_base: String,
    token: Mutex<Option<String>>,
}

impl ZoomClient {
    pub fn new(config: &ZoomConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .context("Failed to create HTTP client")?;
        let download_client = reqwest::Client::builder()
            .redirect(redirect::Policy::none())
            .build()
            .context("Failed to create download HTTP client")?;
        let api_base = config.api_base.trim_end_matches('/').to_string();

        info!("Initialized Zoom client with base URL: {}", api_base);

        Ok(Self {
            client,
            download_client,
            account_id: config.account_id.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            oauth_url: config.oauth_url.clone(),
            api_base,
            token: Mutex::new(None),
        })
    }

    /// Fetches an account-credentials token once and reuses it for the run.
    async fn access_token(&self) -> Result<String, ApiError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            return Ok(token.clone());
        }

        debug!("Requesting Zoom access token");
        let response = self
            .client
            .post(&self.oauth_url)
            .query(&[
                ("grant_type", "account_credentials"),
                ("account_id", self.account_id.as_str()),
            ])
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .send()
            .await
            .map_err(|e| ApiError::transport(SERVICE, e))?;
        let response = check_status(SERVICE, response).await?;
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ApiError::decode(SERVICE, e.to_string()))?;

        *cached = Some(token.access_token.clone());
        Ok(token.access_token)
    }

    /// Authenticated GET, retried while the API rate-limits us.
    async fn api_get<Q>(&self, url: &str, query: &Q) -> Result<Response, ApiError>
    where
        Q: Serialize + ?Sized,
    {
        let token = self.access_token().await?;
        with_backoff("Zoom API request", MAX_RETRIES, ApiError::is_rate_limited, || async {
            let response = self
                .client
                .get(url)
                .bearer_auth(&token)
                .query(query)
                .send()
                .await
                .map_err(|e| ApiError::transport(SERVICE, e))?;
            check_status(SERVICE, response).await
        })
        .await
    }

    /// Downloads follow a 301/302 by hand; the storage host behind the
    /// redirect is fetched without credentials.
    async fn download(&self, url: &str) -> Result<Response, ApiError> {
        let token = self.access_token().await?;
        let response = self
            .download_client
            .get(url)
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| ApiError::transport(SERVICE, e))?;

        let response = match response.status() {
            StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND => {
                let location = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|value| value.to_str().ok())
                    .ok_or_else(|| ApiError::decode(SERVICE, "redirect without Location header"))?;
                let target = response
                    .url()
                    .join(location)
                    .map_err(|e| ApiError::decode(SERVICE, e.to_string()))?;

                debug!("Following download redirect to {}", target.host_str().unwrap_or(""));
                self.client
                    .get(target)
                    .send()
                    .await
                    .map_err(|e| ApiError::transport(SERVICE, e))?
            }
            _ => response,
        };

        check_status(SERVICE, response).await
    }
}

#[async_trait]
impl RecordingSource for ZoomClient {
    async fn list_meetings(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<Meeting>> {
        let url = format!("{}/accounts/me/recordings", self.api_base);
        let mut meetings = Vec::new();
        let mut next_page_token: Option<String> = None;

        loop {
            let mut query = vec![
                ("from", from.to_string()),
                ("to", to.to_string()),
                ("page_size", PAGE_SIZE.to_string()),
            ];
            if let Some(token) = &next_page_token {
                query.push(("next_page_token", token.clone()));
            }

            let page: RecordingsPage = self
                .api_get(&url, &query)
                .await
                .context("Failed to list Zoom recordings")?
                .json()
                .await
                .context("Failed to parse Zoom recordings response")?;

            meetings.extend(page.meetings);
            match page.next_page_token {
                Some(token) if !token.is_empty() => next_page_token = Some(token),
                _ => break,
            }
        }

        info!(
            "Found {} recorded meetings between {} and {}",
            meetings.len(),
            from,
            to
        );
        Ok(meetings)
    }

    async fn fetch_transcript(&self, url: &str) -> Result<String> {
        let text = self
            .download(url)
            .await
            .context("Failed to download transcript")?
            .text()
            .await
            .context("Failed to read transcript body")?;
        debug!("Downloaded transcript: {} chars", text.len());
        Ok(text)
    }

    async fn fetch_summary(&self, url: &str) -> Result<ZoomSummary> {
        self.download(url)
            .await
            .context("Failed to download meeting summary")?
            .json()
            .await
            .context("Failed to parse meeting summary")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::http::{header, HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn config(base: &str) -> ZoomConfig {
        ZoomConfig {
            account_id: "test_account".to_string(),
            client_id: "test_client".to_string(),
            client_secret: "test_secret".to_string(),
            oauth_url: format!("{}/oauth/token", base),
            api_base: format!("{}/v2", base),
            ..ZoomConfig::default()
        }
    }

    fn is_authorized(headers: &HeaderMap) -> bool {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            == Some("Bearer test_token")
    }

    fn token_route() -> Router {
        Router::new().route(
            "/oauth/token",
            post(|Query(params): Query<HashMap<String, String>>, headers: HeaderMap| async move {
                assert_eq!(params.get("grant_type").map(String::as_str), Some("account_credentials"));
                assert_eq!(params.get("account_id").map(String::as_str), Some("test_account"));
                assert!(headers.contains_key(header::AUTHORIZATION));
                Json(json!({"access_token": "test_token", "expires_in": 3600}))
            }),
        )
    }

    #[tokio::test]
    async fn test_list_meetings_follows_pages() {
        let router = token_route().route(
            "/v2/accounts/me/recordings",
            get(|Query(params): Query<HashMap<String, String>>, headers: HeaderMap| async move {
                assert!(is_authorized(&headers));
                assert_eq!(params.get("from").map(String::as_str), Some("2026-02-14"));
                assert_eq!(params.get("to").map(String::as_str), Some("2026-02-15"));
                let body = match params.get("next_page_token").map(String::as_str) {
                    None => json!({
                        "meetings": [{
                            "uuid": "meeting_123",
                            "topic": "テスト会議",
                            "start_time": "2026-02-15T10:00:00Z",
                            "share_url": "https://zoom.us/rec/share/abc123",
                            "recording_files": []
                        }],
                        "next_page_token": "page2"
                    }),
                    Some(_) => json!({
                        "meetings": [{"uuid": "meeting_456", "recording_files": []}],
                        "next_page_token": ""
                    }),
                };
                Json(body)
            }),
        );
        let base = serve(router).await;
        let client = ZoomClient::new(&config(&base)).unwrap();

        let meetings = client
            .list_meetings(
                NaiveDate::from_ymd_opt(2026, 2, 14).unwrap(),
                NaiveDate::from_ymd_opt(2026, 2, 15).unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(meetings.len(), 2);
        assert_eq!(meetings[0].topic.as_deref(), Some("テスト会議"));
        assert_eq!(
            meetings[0].share_url.as_deref(),
            Some("https://zoom.us/rec/share/abc123")
        );
        assert_eq!(meetings[1].uuid, "meeting_456");
    }

    #[tokio::test]
    async fn test_rate_limited_request_is_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let router = token_route().route(
            "/v2/accounts/me/recordings",
            get(move || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        StatusCode::TOO_MANY_REQUESTS.into_response()
                    } else {
                        Json(json!({"meetings": []})).into_response()
                    }
                }
            }),
        );
        let base = serve(router).await;
        let client = ZoomClient::new(&config(&base)).unwrap();
        let day = NaiveDate::from_ymd_opt(2026, 2, 15).unwrap();

        let meetings = client.list_meetings(day, day).await.unwrap();

        assert!(meetings.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_download_follows_redirect_without_token() {
        let router = token_route()
            .route(
                "/download/transcript",
                get(|headers: HeaderMap| async move {
                    assert!(is_authorized(&headers));
                    (StatusCode::FOUND, [(header::LOCATION, "/storage/transcript.vtt")])
                }),
            )
            .route(
                "/storage/transcript.vtt",
                get(|headers: HeaderMap| async move {
                    assert!(!headers.contains_key(header::AUTHORIZATION));
                    "WEBVTT\n\n1\n00:00:00.000 --> 00:00:05.000\nテスト"
                }),
            );
        let base = serve(router).await;
        let client = ZoomClient::new(&config(&base)).unwrap();

        let vtt = client
            .fetch_transcript(&format!("{}/download/transcript", base))
            .await
            .unwrap();

        assert!(vtt.contains("WEBVTT"));
        assert!(vtt.contains("テスト"));
    }

    #[tokio::test]
    async fn test_fetch_summary() {
        let router = token_route().route(
            "/download/summary",
            get(|| async {
                Json(json!({
                    "overall_summary": "全体の要約",
                    "items": [{"label": "議題A", "summary": "決定"}]
                }))
            }),
        );
        let base = serve(router).await;
        let client = ZoomClient::new(&config(&base)).unwrap();

        let summary = client
            .fetch_summary(&format!("{}/download/summary", base))
            .await
            .unwrap();

        assert_eq!(summary.overall_summary.as_deref(), Some("全体の要約"));
        assert_eq!(summary.items.len(), 1);
    }

    #[tokio::test]
    async fn test_download_error_status() {
        let router = token_route().route(
            "/download/missing",
            get(|| async { StatusCode::NOT_FOUND }),
        );
        let base = serve(router).await;
        let client = ZoomClient::new(&config(&base)).unwrap();

        let err = client
            .fetch_transcript(&format!("{}/download/missing", base))
            .await
            .unwrap_err();

        assert!(format!("{:#}", err).contains("404"));
    }
}
