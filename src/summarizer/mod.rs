//! Fallback meeting summaries from Gemini, used when the recording platform
//! produced none.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, info};

use crate::config::GeminiConfig;
use crate::http::{check_status, with_backoff, ApiError, MAX_RETRIES};
use crate::transcript::SummaryData;

const SERVICE: &str = "Gemini";

const SUMMARY_HEADING: &str = "要約";
const AGENDA_HEADING: &str = "議題・決定事項";
const TODO_HEADING: &str = "TODO / アクションアイテム";

const PROMPT_TEMPLATE: &str = "以下の会議の文字起こしテキストを分析し、次の3つのセクションを日本語で生成してください。

## 要約
会議の概要を3〜5文で簡潔にまとめてください。

## 議題・決定事項
話し合われた議題と、それぞれの決定事項を箇条書きでリスト化してください。

## TODO / アクションアイテム
会議で生まれたタスクや次のアクションを、可能な限り担当者と期限を付けて箇条書きで抽出してください。チェックボックス形式（- [ ]）で記載してください。

---

文字起こしテキスト:

";

#[async_trait]
pub trait Summarizer: Send + Sync {
    /// `None` when no usable summary could be produced.
    async fn summarize(&self, transcript: &str) -> Option<SummaryData>;
}

pub fn build_prompt(transcript: &str) -> String {
    format!("{}{}", PROMPT_TEMPLATE, transcript)
}

/// Split a reply on its `## ` headings. The summary section becomes the
/// summary; agenda and TODO sections are joined into the chapters.
pub fn parse_summary_response(text: &str) -> Option<SummaryData> {
    if text.trim().is_empty() {
        return None;
    }

    let headings = [SUMMARY_HEADING, AGENDA_HEADING, TODO_HEADING];
    let mut sections: [String; 3] = Default::default();
    let mut current: Option<usize> = None;

    for line in text.split('\n') {
        let stripped = line.trim();
        if let Some(header) = stripped.strip_prefix("## ") {
            current = headings.iter().position(|h| header.contains(h));
        } else if let Some(i) = current {
            sections[i].push_str(line);
            sections[i].push('\n');
        }
    }

    let [summary, agenda, todos] = sections.map(|s| s.trim().to_string());
    if summary.is_empty() && agenda.is_empty() && todos.is_empty() {
        return None;
    }

    let chapters = [agenda, todos]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    Some(SummaryData { summary, chapters })
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

pub struct GeminiSummarizer {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl GeminiSummarizer {
    /// `None` when no API key is configured.
    pub fn from_config(config: &GeminiConfig) -> Result<Option<Self>> {
        match config.api_key.as_deref().filter(|key| !key.is_empty()) {
            Some(key) => Ok(Some(Self::new(config, key)?)),
            None => Ok(None),
        }
    }

    pub fn new(config: &GeminiConfig, api_key: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .context("Failed to create HTTP client")?;
        let endpoint = format!(
            "{}/models/{}:generateContent",
            config.api_base.trim_end_matches('/'),
            config.model
        );

        info!("Initialized Gemini summarizer with model: {}", config.model);

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            endpoint,
        })
    }

    async fn generate(&self, prompt: &str) -> Result<String, ApiError> {
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });
        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| ApiError::transport(SERVICE, e))?;
        let response: GenerateResponse = check_status(SERVICE, response)
            .await?
            .json()
            .await
            .map_err(|e| ApiError::decode(SERVICE, e.to_string()))?;
        Ok(response.text())
    }
}

#[async_trait]
impl Summarizer for GeminiSummarizer {
    async fn summarize(&self, transcript: &str) -> Option<SummaryData> {
        let prompt = build_prompt(transcript);
        debug!("Requesting Gemini summary for {} chars", transcript.len());

        let reply = with_backoff("Gemini request", MAX_RETRIES, |_: &ApiError| true, || {
            self.generate(&prompt)
        })
        .await;

        match reply {
            Ok(text) => parse_summary_response(&text),
            Err(e) => {
                error!("Gemini API failed after {} attempts: {}", MAX_RETRIES, e);
                None
            }
        }
    }
}
