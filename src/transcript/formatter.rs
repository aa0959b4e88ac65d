//! Meeting minutes layout.
//!
//! The formatter emits a typed [`Block`] sequence. The markdown-like text
//! form exists for previews and for callers that only carry a string;
//! [`Document::from_markdown`] classifies such text back into blocks.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{MeetingMetadata, Segment, SummaryData};

pub mod labels {
    pub const TITLE: &str = "会議議事録";
    pub const DATE: &str = "日時";
    pub const TOPIC: &str = "会議名";
    pub const PARTICIPANTS: &str = "参加者";
    pub const RECORDING_URL: &str = "録画URL";
    pub const SUMMARY: &str = "要約";
    pub const CHAPTERS: &str = "トピック";
    pub const TRANSCRIPT: &str = "文字起こし";
    pub const PARTICIPANT_SEPARATOR: &str = "、";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeadingLevel {
    /// `# `
    Title,
    /// `## `
    Section,
    /// `### `, used for segment time ranges
    Timestamp,
}

impl HeadingLevel {
    fn marker(self) -> &'static str {
        match self {
            HeadingLevel::Title => "# ",
            HeadingLevel::Section => "## ",
            HeadingLevel::Timestamp => "### ",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Block {
    Heading(HeadingLevel, String),
    /// Bold line, used for speaker names.
    Bold(String),
    Bullet(String),
    Separator,
    Paragraph(String),
    Blank,
}

impl Block {
    /// Classify one line of the text form by its prefix.
    pub fn classify(line: &str) -> Self {
        if let Some(rest) = line.strip_prefix("### ") {
            Block::Heading(HeadingLevel::Timestamp, rest.to_string())
        } else if let Some(rest) = line.strip_prefix("## ") {
            Block::Heading(HeadingLevel::Section, rest.to_string())
        } else if let Some(rest) = line.strip_prefix("# ") {
            Block::Heading(HeadingLevel::Title, rest.to_string())
        } else if line.starts_with("---") {
            Block::Separator
        } else if let Some(rest) = line.strip_prefix("- ") {
            Block::Bullet(rest.to_string())
        } else if let Some(inner) = bold_inner(line) {
            Block::Bold(inner.to_string())
        } else if line.trim().is_empty() {
            Block::Blank
        } else {
            Block::Paragraph(line.to_string())
        }
    }
}

/// `**x**` -> `x`; the wrapped text must be non-empty.
fn bold_inner(line: &str) -> Option<&str> {
    line.strip_prefix("**")
        .and_then(|rest| rest.strip_suffix("**"))
        .filter(|inner| !inner.is_empty())
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Block::Heading(level, text) => write!(f, "{}{}", level.marker(), text),
            Block::Bold(text) => write!(f, "**{}**", text),
            Block::Bullet(text) => write!(f, "- {}", text),
            Block::Separator => f.write_str("---"),
            Block::Paragraph(text) => f.write_str(text),
            Block::Blank => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub blocks: Vec<Block>,
}

impl Document {
    pub fn to_markdown(&self) -> String {
        self.blocks
            .iter()
            .map(Block::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn from_markdown(text: &str) -> Self {
        Self {
            blocks: text.split('\n').map(Block::classify).collect(),
        }
    }
}

/// Lay out the full minutes: metadata, optional summary, transcript.
pub fn render(
    segments: &[Segment],
    metadata: &MeetingMetadata,
    summary: Option<&SummaryData>,
) -> Document {
    let mut blocks = vec![
        Block::Heading(HeadingLevel::Title, labels::TITLE.to_string()),
        Block::Blank,
        Block::Bullet(format!("{}: {}", labels::DATE, metadata.date)),
        Block::Bullet(format!("{}: {}", labels::TOPIC, metadata.topic)),
        Block::Bullet(format!(
            "{}: {}",
            labels::PARTICIPANTS,
            metadata.participants.join(labels::PARTICIPANT_SEPARATOR)
        )),
    ];
    if let Some(url) = metadata.recording_url.as_deref().filter(|u| !u.is_empty()) {
        blocks.push(Block::Bullet(format!("{}: {}", labels::RECORDING_URL, url)));
    }
    blocks.extend([Block::Blank, Block::Separator, Block::Blank]);

    if let Some(summary) = summary {
        push_section(&mut blocks, labels::SUMMARY, &summary.summary);
        if !summary.chapters.is_empty() {
            push_section(&mut blocks, labels::CHAPTERS, &summary.chapters);
        }
        blocks.extend([Block::Separator, Block::Blank]);
    }

    blocks.push(Block::Heading(
        HeadingLevel::Section,
        labels::TRANSCRIPT.to_string(),
    ));
    blocks.push(Block::Blank);
    for segment in segments {
        push_segment(&mut blocks, segment);
    }

    Document { blocks }
}

/// Summary text is free-form markdown from the summarizer, so its lines are
/// classified rather than taken literally.
fn push_section(blocks: &mut Vec<Block>, heading: &str, body: &str) {
    blocks.push(Block::Heading(HeadingLevel::Section, heading.to_string()));
    blocks.push(Block::Blank);
    blocks.extend(body.split('\n').map(Block::classify));
    blocks.push(Block::Blank);
}

fn push_segment(blocks: &mut Vec<Block>, segment: &Segment) {
    blocks.push(Block::Heading(
        HeadingLevel::Timestamp,
        format!("{} - {}", segment.start, segment.end),
    ));
    blocks.push(Block::Blank);
    if !segment.speaker.is_empty() {
        blocks.push(Block::Bold(segment.speaker.clone()));
    }
    for line in segment.text.split('\n') {
        if line.trim().is_empty() {
            blocks.push(Block::Blank);
        } else {
            blocks.push(Block::Paragraph(line.to_string()));
        }
    }
    blocks.push(Block::Blank);
}

/// `speaker: text` per segment, for summarization input.
pub fn plain_text(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|segment| {
            if segment.speaker.is_empty() {
                segment.text.clone()
            } else {
                format!("{}: {}", segment.speaker, segment.text)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
