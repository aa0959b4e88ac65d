use anyhow::Result;
use regex::Regex;
use tracing::debug;

use super::Segment;

/// A single timed caption block before speaker merging.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Cue {
    speaker: String,
    text: String,
    start: String,
    end: String,
}

/// Parser for the WebVTT dialect the meeting platform emits for audio
/// transcripts: numbered cues, `start --> end` timing, `Name: text` payload.
pub struct CaptionParser {
    index_regex: Regex,
    timing_regex: Regex,
    seconds_regex: Regex,
    speaker_regex: Regex,
}

impl CaptionParser {
    pub fn new() -> Result<Self> {
        let index_regex = Regex::new(r"^\d+$")?;
        // Matches `00:00:05.500 --> 00:00:12.000`; trailing cue settings are ignored
        let timing_regex = Regex::new(r"^([\d:.]+)\s*-->\s*([\d:.]+)")?;
        let seconds_regex = Regex::new(r"^(\d{2}:\d{2}:\d{2})")?;
        let speaker_regex = Regex::new(r"^(.+?):\s+(.+)$")?;

        Ok(Self {
            index_regex,
            timing_regex,
            seconds_regex,
            speaker_regex,
        })
    }

    /// Parse caption text into speaker turns. Malformed cues are dropped;
    /// this never fails.
    pub fn parse(&self, raw_text: &str) -> Vec<Segment> {
        let segments = self
            .cues(raw_text)
            .into_iter()
            .fold(Vec::new(), merge_cue);

        debug!(
            "Parsed {} chars of captions into {} segments",
            raw_text.len(),
            segments.len()
        );
        segments
    }

    fn cues(&self, raw_text: &str) -> Vec<Cue> {
        let mut lines = raw_text.trim().lines().map(str::trim).peekable();
        let mut cues = Vec::new();

        while let Some(line) = lines.next() {
            // Header, NOTE blocks and stray text before a cue index are skipped
            if !self.index_regex.is_match(line) {
                continue;
            }

            let Some(timing_line) = lines.next() else {
                break;
            };
            let Some((start, end)) = self.parse_timing(timing_line) else {
                debug!("Skipping cue with malformed timing line: {}", timing_line);
                continue;
            };

            let mut text_lines = Vec::new();
            while let Some(text_line) = lines.next_if(|l| !l.is_empty()) {
                text_lines.push(text_line);
            }

            let (speaker, text) = self.split_speaker(&text_lines.join(" "));
            cues.push(Cue {
                speaker,
                text,
                start,
                end,
            });
        }

        cues
    }

    fn parse_timing(&self, line: &str) -> Option<(String, String)> {
        let captures = self.timing_regex.captures(line)?;
        Some((
            self.truncate_timestamp(&captures[1]),
            self.truncate_timestamp(&captures[2]),
        ))
    }

    /// `00:00:05.500` -> `00:00:05`. Anything without an `HH:MM:SS` prefix is
    /// kept as-is.
    fn truncate_timestamp(&self, timestamp: &str) -> String {
        self.seconds_regex
            .captures(timestamp)
            .map(|c| c[1].to_string())
            .unwrap_or_else(|| timestamp.to_string())
    }

    /// Split on the first `:` followed by whitespace.
    fn split_speaker(&self, line: &str) -> (String, String) {
        match self.speaker_regex.captures(line) {
            Some(captures) => (
                captures[1].trim().to_string(),
                captures[2].trim().to_string(),
            ),
            None => (String::new(), line.trim().to_string()),
        }
    }
}

/// Consecutive cues from the same speaker (empty included) collapse into one
/// segment spanning both.
fn merge_cue(mut segments: Vec<Segment>, cue: Cue) -> Vec<Segment> {
    match segments.last_mut() {
        Some(last) if last.speaker == cue.speaker => {
            last.text.push('\n');
            last.text.push_str(&cue.text);
            last.end = cue.end;
        }
        _ => segments.push(Segment {
            speaker: cue.speaker,
            text: cue.text,
            start: cue.start,
            end: cue.end,
        }),
    }
    segments
}
