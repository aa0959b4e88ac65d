//! Installed-app consent flow that mints the Google refresh token used by
//! scheduled runs.

use anyhow::{anyhow, bail, Context, Result};
use axum::extract::{Query, State};
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::{env_keys, Config};
use crate::gdocs::oauth;

const CONSENT_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Clone)]
struct CallbackState {
    tx: mpsc::Sender<HashMap<String, String>>,
}

/// A reload of the bare redirect URL or a prefetch must not end the wait;
/// only a redirect carrying `code` or `error` does.
fn is_authorization_response(params: &HashMap<String, String>) -> bool {
    params.contains_key("code") || params.contains_key("error")
}

async fn callback(
    State(state): State<CallbackState>,
    Query(params): Query<HashMap<String, String>>,
) -> Html<&'static str> {
    if !is_authorization_response(&params) {
        debug!("Ignoring request without an authorization response");
        return Html("<p>認証を待っています。</p>");
    }
    let _ = state.tx.send(params).await;
    Html("<p>認証が完了しました。このウィンドウを閉じてください。</p>")
}

/// Unguessable anti-forgery value for the consent redirect.
fn new_state() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Pull the authorization code out of the redirect query.
pub fn authorization_code(
    params: &HashMap<String, String>,
    expected_state: &str,
) -> Result<String> {
    if let Some(error) = params.get("error") {
        bail!("Authorization was denied: {}", error);
    }
    if params.get("state").map(String::as_str) != Some(expected_state) {
        bail!("Authorization response state did not match");
    }
    params
        .get("code")
        .filter(|code| !code.is_empty())
        .cloned()
        .ok_or_else(|| anyhow!("Authorization response had no code"))
}

pub async fn handle_auth_command(config: Config) -> Result<()> {
    let google = &config.google;
    if google.client_id.is_empty() || google.client_secret.is_empty() {
        bail!(
            "Set {} and {} before running auth",
            env_keys::GOOGLE_CLIENT_ID,
            env_keys::GOOGLE_CLIENT_SECRET
        );
    }

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .context("Failed to bind redirect listener")?;
    let port = listener.local_addr()?.port();
    let redirect_uri = format!("http://127.0.0.1:{}/", port);
    let state = new_state();

    let (tx, mut rx) = mpsc::channel(1);
    let app = Router::new()
        .route("/", get(callback))
        .with_state(CallbackState { tx });
    let server = tokio::spawn(async move { axum::serve(listener, app).await });
    info!("Waiting for OAuth redirect on {}", redirect_uri);

    let url = oauth::authorization_url(&google.client_id, &redirect_uri, &state)?;
    println!("Open this URL in a browser and grant access:");
    println!();
    println!("{}", url);
    println!();

    let received = tokio::time::timeout(CONSENT_TIMEOUT, rx.recv()).await;
    server.abort();
    let params = received
        .context("Timed out waiting for the browser redirect")?
        .context("Redirect listener stopped unexpectedly")?;
    let code = authorization_code(&params, &state)?;
    debug!("Received authorization code");

    let client = reqwest::Client::new();
    let token = oauth::exchange_code(&client, google, &code, &redirect_uri)
        .await
        .context("Failed to exchange authorization code")?;
    let refresh_token = token
        .refresh_token
        .context("Google returned no refresh token; revoke the app's access and retry")?;

    println!("=== Refresh token ===");
    println!("{}", refresh_token);
    println!();
    println!(
        "Store it as {} (or google.refresh_token in the config file).",
        env_keys::GOOGLE_REFRESH_TOKEN
    );
    Ok(())
}
