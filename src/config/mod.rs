use crate::gdocs::ThemeKind;
use crate::global;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Environment variables that override config file values. Secrets are
/// usually supplied this way from the scheduler.
pub mod env_keys {
    pub const ZOOM_ACCOUNT_ID: &str = "ZOOM_ACCOUNT_ID";
    pub const ZOOM_CLIENT_ID: &str = "ZOOM_CLIENT_ID";
    pub const ZOOM_CLIENT_SECRET: &str = "ZOOM_CLIENT_SECRET";
    pub const GOOGLE_CLIENT_ID: &str = "GOOGLE_CLIENT_ID";
    pub const GOOGLE_CLIENT_SECRET: &str = "GOOGLE_CLIENT_SECRET";
    pub const GOOGLE_REFRESH_TOKEN: &str = "GOOGLE_REFRESH_TOKEN";
    pub const GOOGLE_DRIVE_FOLDER_ID: &str = "GOOGLE_DRIVE_FOLDER_ID";
    pub const DISCORD_WEBHOOK_URL: &str = "DISCORD_WEBHOOK_URL";
    pub const GEMINI_API_KEY: &str = "GEMINI_API_KEY";
    pub const LEDGER_PATH: &str = "GIJIROKU_LEDGER_PATH";
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub zoom: ZoomConfig,
    pub google: GoogleConfig,
    pub discord: DiscordConfig,
    pub gemini: GeminiConfig,
    pub document: DocumentConfig,
    pub ledger: LedgerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomConfig {
    pub account_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub oauth_url: String,
    pub api_base: String,
    /// Language prefix preferred when a meeting has several transcripts.
    pub transcript_language: String,
    /// How many days back from today to look for recordings.
    pub lookback_days: u32,
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self {
            account_id: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            oauth_url: "https://zoom.us/oauth/token".to_string(),
            api_base: "https://api.zoom.us/v2".to_string(),
            transcript_language: "ja".to_string(),
            lookback_days: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    pub drive_folder_id: String,
    pub token_url: String,
    pub docs_api_base: String,
    pub drive_api_base: String,
    /// Host used in document links handed to users.
    pub docs_host: String,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            refresh_token: String::new(),
            drive_folder_id: String::new(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            docs_api_base: "https://docs.googleapis.com/v1".to_string(),
            drive_api_base: "https://www.googleapis.com/drive/v3".to_string(),
            docs_host: "docs.google.com".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    /// Notifications are skipped when empty.
    pub webhook_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    /// Enables the fallback summarizer for meetings without a Zoom summary.
    pub api_key: Option<String>,
    pub model: String,
    pub api_base: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.0-flash".to_string(),
            api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    pub theme: ThemeKind,
    /// Overrides the theme's font family.
    pub font_family: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Defaults to `processed.json` in the data directory.
    pub path: Option<PathBuf>,
}

impl Config {
    /// Load from `path`, or from the default location (creating it on first
    /// use), then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                if !path.exists() {
                    bail!("Config file not found: {}", path.display());
                }
                Self::read(path)?
            }
            None => {
                let config_path = global::config_file()?;
                if config_path.exists() {
                    Self::read(&config_path)?
                } else {
                    info!(
                        "Config file not found, creating default at {:?}",
                        config_path
                    );
                    let config = Self::default();
                    config.save(&config_path)?;
                    config
                }
            }
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).context("Failed to read config file")?;
        let config: Self = toml::from_str(&content).context("Failed to parse config file")?;
        info!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Non-empty values from `lookup` replace config file values.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.is_empty());

        let overrides: [(&str, &mut String); 8] = [
            (env_keys::ZOOM_ACCOUNT_ID, &mut self.zoom.account_id),
            (env_keys::ZOOM_CLIENT_ID, &mut self.zoom.client_id),
            (env_keys::ZOOM_CLIENT_SECRET, &mut self.zoom.client_secret),
            (env_keys::GOOGLE_CLIENT_ID, &mut self.google.client_id),
            (env_keys::GOOGLE_CLIENT_SECRET, &mut self.google.client_secret),
            (env_keys::GOOGLE_REFRESH_TOKEN, &mut self.google.refresh_token),
            (env_keys::GOOGLE_DRIVE_FOLDER_ID, &mut self.google.drive_folder_id),
            (env_keys::DISCORD_WEBHOOK_URL, &mut self.discord.webhook_url),
        ];
        for (key, field) in overrides {
            if let Some(value) = get(key) {
                *field = value;
            }
        }

        if let Some(key) = get(env_keys::GEMINI_API_KEY) {
            self.gemini.api_key = Some(key);
        }
        if let Some(path) = get(env_keys::LEDGER_PATH) {
            self.ledger.path = Some(PathBuf::from(path));
        }
    }

    /// Fails listing every required setting that is still empty.
    pub fn validate(&self) -> Result<()> {
        let required = [
            (env_keys::ZOOM_ACCOUNT_ID, &self.zoom.account_id),
            (env_keys::ZOOM_CLIENT_ID, &self.zoom.client_id),
            (env_keys::ZOOM_CLIENT_SECRET, &self.zoom.client_secret),
            (env_keys::GOOGLE_CLIENT_ID, &self.google.client_id),
            (env_keys::GOOGLE_CLIENT_SECRET, &self.google.client_secret),
            (env_keys::GOOGLE_REFRESH_TOKEN, &self.google.refresh_token),
            (env_keys::GOOGLE_DRIVE_FOLDER_ID, &self.google.drive_folder_id),
        ];
        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.is_empty())
            .map(|(key, _)| *key)
            .collect();

        if !missing.is_empty() {
            bail!("Missing required settings: {}", missing.join(", "));
        }
        Ok(())
    }

    pub fn ledger_path(&self) -> Result<PathBuf> {
        match &self.ledger.path {
            Some(path) => Ok(path.clone()),
            None => global::ledger_file(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.zoom.api_base, "https://api.zoom.us/v2");
        assert_eq!(config.zoom.lookback_days, 1);
        assert_eq!(config.zoom.transcript_language, "ja");
        assert_eq!(config.google.docs_host, "docs.google.com");
        assert_eq!(config.document.theme, ThemeKind::Rich);
        assert!(config.gemini.api_key.is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [zoom]
            account_id = "acct"
            lookback_days = 3

            [document]
            theme = "plain"
            font_family = "Arial"
            "#,
        )
        .unwrap();

        assert_eq!(config.zoom.account_id, "acct");
        assert_eq!(config.zoom.lookback_days, 3);
        assert_eq!(config.zoom.oauth_url, "https://zoom.us/oauth/token");
        assert_eq!(config.document.theme, ThemeKind::Plain);
        assert_eq!(config.document.font_family.as_deref(), Some("Arial"));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("ZOOM_ACCOUNT_ID", "env_acct"),
            ("GOOGLE_REFRESH_TOKEN", "env_token"),
            ("DISCORD_WEBHOOK_URL", ""),
            ("GEMINI_API_KEY", "gemini"),
            ("GIJIROKU_LEDGER_PATH", "/tmp/processed.json"),
        ]);
        let mut config = Config::default();
        config.zoom.account_id = "file_acct".to_string();
        config.discord.webhook_url = "https://discord/file".to_string();

        config.apply_env(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.zoom.account_id, "env_acct");
        assert_eq!(config.google.refresh_token, "env_token");
        assert_eq!(config.discord.webhook_url, "https://discord/file");
        assert_eq!(config.gemini.api_key.as_deref(), Some("gemini"));
        assert_eq!(
            config.ledger_path().unwrap(),
            PathBuf::from("/tmp/processed.json")
        );
    }

    #[test]
    fn test_validate_lists_missing() {
        let mut config = Config::default();
        config.zoom.account_id = "acct".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(!err.contains("ZOOM_ACCOUNT_ID"));
        assert!(err.contains("ZOOM_CLIENT_ID"));
        assert!(err.contains("GOOGLE_DRIVE_FOLDER_ID"));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.zoom.lookback_days = 7;
        config.save(&path).unwrap();

        let loaded = Config::read(&path).unwrap();
        assert_eq!(loaded.zoom.lookback_days, 7);
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load(Some(&dir.path().join("absent.toml"))).is_err());
    }
}
