//! Transcript model and the pure transformations over it.
//!
//! Caption text goes through [`caption::CaptionParser`] into [`Segment`]s,
//! which [`formatter::render`] turns into a [`formatter::Document`].

pub mod caption;
pub mod formatter;

use serde::{Deserialize, Serialize};

pub use caption::CaptionParser;
pub use formatter::{plain_text, render, Block, Document, HeadingLevel};

/// One merged speaker turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// Empty when the cue had no `name: ` prefix.
    pub speaker: String,
    /// Merged turns are joined with `\n`.
    pub text: String,
    /// `HH:MM:SS`
    pub start: String,
    /// `HH:MM:SS`
    pub end: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingMetadata {
    pub date: String,
    pub topic: String,
    pub participants: Vec<String>,
    pub recording_url: Option<String>,
}

/// AI summary attached to a meeting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryData {
    pub summary: String,
    /// Pre-joined `- ` bullet lines.
    pub chapters: String,
}

/// Unique non-empty speakers in first-seen order.
pub fn participants_of(segments: &[Segment]) -> Vec<String> {
    let mut participants: Vec<String> = Vec::new();
    for segment in segments {
        if !segment.speaker.is_empty() && !participants.contains(&segment.speaker) {
            participants.push(segment.speaker.clone());
        }
    }
    participants
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(speaker: &str) -> Segment {
        Segment {
            speaker: speaker.to_string(),
            text: "text".to_string(),
            start: "00:00:00".to_string(),
            end: "00:00:01".to_string(),
        }
    }

    #[test]
    fn test_participants_first_seen_order() {
        let segments = vec![
            segment("鈴木花子"),
            segment(""),
            segment("田中太郎"),
            segment("鈴木花子"),
        ];
        assert_eq!(participants_of(&segments), vec!["鈴木花子", "田中太郎"]);
    }

    #[test]
    fn test_participants_empty() {
        assert!(participants_of(&[segment("")]).is_empty());
    }
}
