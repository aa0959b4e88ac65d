use serde::{Deserialize, Serialize};

use crate::transcript::SummaryData;

pub mod recording_type {
    pub const AUDIO_TRANSCRIPT: &str = "audio_transcript";
    pub const SUMMARY: &str = "summary";
}

/// One page of `GET /accounts/me/recordings`.
#[derive(Debug, Deserialize)]
pub struct RecordingsPage {
    #[serde(default)]
    pub meetings: Vec<Meeting>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Meeting {
    pub uuid: String,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub share_url: Option<String>,
    #[serde(default)]
    pub recording_files: Vec<RecordingFile>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordingFile {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub recording_type: Option<String>,
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub transcript_language: Option<String>,
    #[serde(default)]
    pub file_language: Option<String>,
    #[serde(default)]
    pub language_code: Option<String>,
}

impl RecordingFile {
    /// Zoom reports the transcript language under several field names.
    fn is_language(&self, prefix: &str) -> bool {
        [
            &self.language,
            &self.transcript_language,
            &self.file_language,
            &self.language_code,
        ]
        .into_iter()
        .flatten()
        .any(|value| value.to_lowercase().starts_with(prefix))
    }
}

impl Meeting {
    /// Download URL of the first file of `kind`. Transcripts in
    /// `preferred_language` win over other transcripts.
    pub fn recording_url(&self, kind: &str, preferred_language: &str) -> Option<&str> {
        let files: Vec<&RecordingFile> = self
            .recording_files
            .iter()
            .filter(|f| f.recording_type.as_deref() == Some(kind))
            .collect();

        if kind == recording_type::AUDIO_TRANSCRIPT && !preferred_language.is_empty() {
            let prefix = preferred_language.to_lowercase();
            if let Some(url) = files
                .iter()
                .filter(|f| f.is_language(&prefix))
                .find_map(|f| f.download_url.as_deref())
            {
                return Some(url);
            }
        }

        files.iter().find_map(|f| f.download_url.as_deref())
    }
}

/// AI Companion meeting summary as downloaded from the summary file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ZoomSummary {
    #[serde(default)]
    pub overall_summary: Option<String>,
    #[serde(default)]
    pub items: Vec<SummaryItem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SummaryItem {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    /// Shape varies between summary versions, so it is kept untyped.
    #[serde(default)]
    pub time_range: Option<serde_json::Value>,
}

impl ZoomSummary {
    /// `None` when there is neither an overall summary nor any usable item.
    pub fn to_summary_data(&self) -> Option<SummaryData> {
        let overall = self.overall_summary.as_deref().unwrap_or_default();
        let chapters: Vec<String> = self
            .items
            .iter()
            .filter_map(|item| {
                let label = item.label.as_deref().unwrap_or_default();
                let summary = item.summary.as_deref().unwrap_or_default();
                match (label.is_empty(), summary.is_empty()) {
                    (false, false) => Some(format!("- {}: {}", label, summary)),
                    (false, true) => Some(format!("- {}", label)),
                    (true, false) => Some(format!("- {}", summary)),
                    (true, true) => None,
                }
            })
            .collect();

        if overall.is_empty() && chapters.is_empty() {
            return None;
        }

        Some(SummaryData {
            summary: overall.to_string(),
            chapters: chapters.join("\n"),
        })
    }
}
