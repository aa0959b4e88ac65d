//! Batch orchestration: turn newly recorded meetings into published minutes.
//!
//! Every external system sits behind a trait so a run can be driven with
//! fakes. One meeting failing never stops the batch; it is reported and left
//! out of the ledger so the next run tries again.

use std::collections::HashSet;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveDate};
use tracing::{debug, error, info, warn};

use crate::ledger::Ledger;
use crate::transcript::{
    participants_of, plain_text, render, CaptionParser, Document, MeetingMetadata, SummaryData,
};
use crate::zoom::{recording_type, Meeting, ZoomSummary};

pub use crate::notify::{Notifier, PublishedMeeting};
pub use crate::summarizer::Summarizer;

pub const DEFAULT_TOPIC: &str = "無題の会議";
const TITLE_PARTICIPANT_LIMIT: usize = 5;

#[async_trait]
pub trait RecordingSource: Send + Sync {
    /// Meetings with cloud recordings started between `from` and `to`
    /// inclusive.
    async fn list_meetings(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<Meeting>>;
    async fn fetch_transcript(&self, url: &str) -> Result<String>;
    async fn fetch_summary(&self, url: &str) -> Result<ZoomSummary>;
}

#[async_trait]
pub trait DocumentPublisher: Send + Sync {
    /// Create a document named `title` and return its id.
    async fn publish(&self, title: &str, document: &Document) -> Result<String>;
    fn document_url(&self, document_id: &str) -> String;
}

/// `YYYY-MM-DD HH:MM` from an ISO-8601 start time, as written by the source.
pub fn format_start_time(start_time: &str) -> String {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(start_time) {
        return parsed.format("%Y-%m-%d %H:%M").to_string();
    }
    let date: String = start_time.chars().take(10).collect();
    let time: String = start_time.chars().skip(11).take(5).collect();
    if time.is_empty() {
        date
    } else {
        format!("{} {}", date, time)
    }
}

/// `{date}_{participants}_{topic}` with at most five participants, or
/// `{date}_{topic}` when nobody was identified.
pub fn document_title(metadata: &MeetingMetadata) -> String {
    let date: String = metadata.date.chars().take(10).collect();
    let participants: Vec<&str> = metadata
        .participants
        .iter()
        .take(TITLE_PARTICIPANT_LIMIT)
        .map(String::as_str)
        .collect();

    if participants.is_empty() {
        format!("{}_{}", date, metadata.topic)
    } else {
        format!("{}_{}_{}", date, participants.join("、"), metadata.topic)
    }
}

fn topic_of(meeting: &Meeting) -> String {
    meeting
        .topic
        .as_deref()
        .filter(|topic| !topic.is_empty())
        .unwrap_or(DEFAULT_TOPIC)
        .to_string()
}

pub struct Pipeline {
    source: Box<dyn RecordingSource>,
    publisher: Box<dyn DocumentPublisher>,
    notifier: Box<dyn Notifier>,
    summarizer: Option<Box<dyn Summarizer>>,
    parser: CaptionParser,
    transcript_language: String,
}

impl Pipeline {
    pub fn new(
        source: Box<dyn RecordingSource>,
        publisher: Box<dyn DocumentPublisher>,
        notifier: Box<dyn Notifier>,
        transcript_language: &str,
    ) -> Result<Self> {
        Ok(Self {
            source,
            publisher,
            notifier,
            summarizer: None,
            parser: CaptionParser::new()?,
            transcript_language: transcript_language.to_string(),
        })
    }

    pub fn with_summarizer(mut self, summarizer: Box<dyn Summarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    /// Process the `lookback_days` window ending at `today`, then persist
    /// any newly processed ids. Returns how many meetings were processed.
    pub async fn run(
        &self,
        ledger: &mut Ledger,
        today: NaiveDate,
        lookback_days: u32,
    ) -> Result<usize> {
        let from = today
            .checked_sub_days(Days::new(u64::from(lookback_days)))
            .context("Lookback window is out of range")?;

        let meetings = self.source.list_meetings(from, today).await?;
        let new_ids = self.process(&meetings, ledger.processed()).await;

        if new_ids.is_empty() {
            info!("No new recordings to process");
            return Ok(0);
        }

        for id in &new_ids {
            ledger.record(id.as_str());
        }
        ledger.save()?;
        info!("Processed {} new recordings", new_ids.len());
        Ok(new_ids.len())
    }

    /// Returns the ids of meetings that were published in this call.
    pub async fn process(
        &self,
        meetings: &[Meeting],
        processed: &HashSet<String>,
    ) -> Vec<String> {
        let mut new_ids = Vec::new();

        for meeting in meetings {
            if processed.contains(&meeting.uuid) {
                info!("Skipping already processed: {}", meeting.uuid);
                continue;
            }

            let Some(transcript_url) =
                meeting.recording_url(recording_type::AUDIO_TRANSCRIPT, &self.transcript_language)
            else {
                info!(
                    "No transcript for: {}",
                    meeting.topic.as_deref().unwrap_or(&meeting.uuid)
                );
                continue;
            };

            match self.publish_meeting(meeting, transcript_url).await {
                Ok(published) => {
                    self.notifier.notify_success(&published).await;
                    info!("Processed: {}", published.topic);
                    new_ids.push(meeting.uuid.clone());
                }
                Err(e) => {
                    error!("Failed to process meeting {}: {:#}", meeting.uuid, e);
                    let topic = meeting.topic.as_deref().unwrap_or(&meeting.uuid);
                    self.notifier.notify_failure(topic, &format!("{:#}", e)).await;
                }
            }
        }

        new_ids
    }

    async fn publish_meeting(
        &self,
        meeting: &Meeting,
        transcript_url: &str,
    ) -> Result<PublishedMeeting> {
        let captions = self.source.fetch_transcript(transcript_url).await?;
        let segments = self.parser.parse(&captions);
        debug!("Parsed {} segments for {}", segments.len(), meeting.uuid);

        let recording_url = meeting.share_url.clone().filter(|url| !url.is_empty());
        let metadata = MeetingMetadata {
            date: meeting
                .start_time
                .as_deref()
                .map(format_start_time)
                .unwrap_or_default(),
            topic: topic_of(meeting),
            participants: participants_of(&segments),
            recording_url: recording_url.clone(),
        };

        let summary = self
            .summary_for(meeting, &metadata.topic, || plain_text(&segments))
            .await?;
        let document = render(&segments, &metadata, summary.as_ref());

        let title = document_title(&metadata);
        let document_id = self.publisher.publish(&title, &document).await?;

        Ok(PublishedMeeting {
            topic: metadata.topic,
            document_url: self.publisher.document_url(&document_id),
            recording_url,
        })
    }

    /// The platform summary if there is one, else the fallback summarizer.
    async fn summary_for<F>(
        &self,
        meeting: &Meeting,
        topic: &str,
        transcript: F,
    ) -> Result<Option<SummaryData>>
    where
        F: FnOnce() -> String,
    {
        if let Some(url) = meeting.recording_url(recording_type::SUMMARY, "") {
            let summary = self.source.fetch_summary(url).await?;
            if let Some(data) = summary.to_summary_data() {
                return Ok(Some(data));
            }
            warn!("Meeting summary for {} was empty", topic);
        } else {
            info!("No summary available for: {}", topic);
        }

        match &self.summarizer {
            Some(summarizer) => Ok(summarizer.summarize(&transcript()).await),
            None => Ok(None),
        }
    }
}
