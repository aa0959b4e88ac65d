use anyhow::{Context, Result};
use tracing::debug;

use super::{RenderCliArgs, RenderFormat};
use crate::gdocs::{RequestBuilder, Theme};
use crate::pipeline::DEFAULT_TOPIC;
use crate::transcript::{participants_of, plain_text, render, CaptionParser, MeetingMetadata};

pub fn handle_render_command(args: RenderCliArgs) -> Result<()> {
    let raw = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    println!("{}", render_output(&raw, &args)?);
    Ok(())
}

/// Produce the preview for `raw` captions in the requested format.
pub fn render_output(raw: &str, args: &RenderCliArgs) -> Result<String> {
    let segments = CaptionParser::new()?.parse(raw);
    debug!("Parsed {} segments from {}", segments.len(), args.file.display());

    if args.format == RenderFormat::Plain {
        return Ok(plain_text(&segments));
    }

    let metadata = MeetingMetadata {
        date: args.date.clone().unwrap_or_default(),
        topic: args
            .topic
            .clone()
            .unwrap_or_else(|| DEFAULT_TOPIC.to_string()),
        participants: participants_of(&segments),
        recording_url: args.recording_url.clone(),
    };
    let document = render(&segments, &metadata, None);

    match args.format {
        RenderFormat::Markdown => Ok(document.to_markdown()),
        _ => {
            let builder = RequestBuilder::new(Theme::from_kind(args.theme, None))?;
            let operations = builder.build_document(&document);
            serde_json::to_string_pretty(&operations).context("Failed to serialize requests")
        }
    }
}
