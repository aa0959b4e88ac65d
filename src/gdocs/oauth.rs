//! Google OAuth 2.0 token endpoints used by the Docs client and the `auth`
//! command.

use reqwest::Url;
use serde::Deserialize;
use tracing::debug;

use crate::config::GoogleConfig;
use crate::http::{check_status, ApiError};

const SERVICE: &str = "Google OAuth";
pub const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";
pub const SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/documents",
    "https://www.googleapis.com/auth/drive",
];

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Consent page URL for an installed-app flow redirecting to `redirect_uri`.
pub fn authorization_url(
    client_id: &str,
    redirect_uri: &str,
    state: &str,
) -> Result<Url, ApiError> {
    let scope = SCOPES.join(" ");
    Url::parse_with_params(
        AUTH_URL,
        &[
            ("client_id", client_id),
            ("redirect_uri", redirect_uri),
            ("response_type", "code"),
            ("scope", scope.as_str()),
            ("access_type", "offline"),
            ("prompt", "consent"),
            ("state", state),
        ],
    )
    .map_err(|e| ApiError::decode(SERVICE, e.to_string()))
}

pub async fn refresh_access_token(
    client: &reqwest::Client,
    config: &GoogleConfig,
) -> Result<TokenResponse, ApiError> {
    debug!("Refreshing Google access token");
    request_token(
        client,
        &config.token_url,
        &[
            ("grant_type", "refresh_token"),
            ("refresh_token", config.refresh_token.as_str()),
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.as_str()),
        ],
    )
    .await
}

pub async fn exchange_code(
    client: &reqwest::Client,
    config: &GoogleConfig,
    code: &str,
    redirect_uri: &str,
) -> Result<TokenResponse, ApiError> {
    debug!("Exchanging authorization code");
    request_token(
        client,
        &config.token_url,
        &[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.as_str()),
        ],
    )
    .await
}

async fn request_token(
    client: &reqwest::Client,
    token_url: &str,
    form: &[(&str, &str)],
) -> Result<TokenResponse, ApiError> {
    let response = client
        .post(token_url)
        .form(form)
        .send()
        .await
        .map_err(|e| ApiError::transport(SERVICE, e))?;
    let response = check_status(SERVICE, response).await?;
    response
        .json()
        .await
        .map_err(|e| ApiError::decode(SERVICE, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_authorization_url_requests_offline_consent() {
        let url = authorization_url("client", "http://127.0.0.1:8080/", "xyz").unwrap();
        let params: HashMap<String, String> = url.query_pairs().into_owned().collect();

        assert_eq!(url.host_str(), Some("accounts.google.com"));
        assert_eq!(params["client_id"], "client");
        assert_eq!(params["access_type"], "offline");
        assert_eq!(params["prompt"], "consent");
        assert_eq!(params["state"], "xyz");
        assert!(params["scope"].contains("auth/documents"));
        assert!(params["scope"].contains("auth/drive"));
    }
}
