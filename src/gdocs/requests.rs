//! Translation of a [`Document`] into Google Docs `batchUpdate` requests.
//!
//! All text is inserted first, in document order, each block appended at the
//! running end offset. Styling requests follow and refer to the ranges
//! computed during insertion, so no later insert can shift them.
//!
//! Offsets are UTF-16 code units, starting at index 1 (the body start).

use anyhow::Result;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use super::theme::{HeadingStyle, Rgb, SeparatorStyle, Theme};
use crate::transcript::{Block, Document, HeadingLevel};

/// First insertable index of an empty document body.
pub const ORIGIN: usize = 1;
const BULLET_PRESET: &str = "BULLET_DISC_CIRCLE_SQUARE";
const LITERAL_BULLET_PREFIX: &str = "  - ";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StyledOperation {
    InsertText(InsertText),
    UpdateParagraphStyle(UpdateParagraphStyle),
    UpdateTextStyle(UpdateTextStyle),
    CreateParagraphBullets(CreateParagraphBullets),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsertText {
    pub location: Location,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Location {
    pub index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Range {
    pub start_index: usize,
    pub end_index: usize,
}

impl Range {
    fn new(start_index: usize, end_index: usize) -> Self {
        Self {
            start_index,
            end_index,
        }
    }

    fn is_empty(&self) -> bool {
        self.end_index <= self.start_index
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateParagraphStyle {
    pub range: Range,
    pub paragraph_style: ParagraphStyle,
    pub fields: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTextStyle {
    pub range: Range,
    pub text_style: TextStyle,
    pub fields: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateParagraphBullets {
    pub range: Range,
    pub bullet_preset: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParagraphStyle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub named_style_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_bottom: Option<ParagraphBorder>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub space_above: Option<Dimension>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub space_below: Option<Dimension>,
}

impl ParagraphStyle {
    /// Field mask naming exactly the properties that are set.
    fn fields(&self) -> String {
        let mut fields = Vec::new();
        if self.named_style_type.is_some() {
            fields.push("namedStyleType");
        }
        if self.border_bottom.is_some() {
            fields.push("borderBottom");
        }
        if self.space_above.is_some() {
            fields.push("spaceAbove");
        }
        if self.space_below.is_some() {
            fields.push("spaceBelow");
        }
        fields.join(",")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStyle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreground_color: Option<OptionalColor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<Dimension>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<Link>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weighted_font_family: Option<WeightedFontFamily>,
}

impl TextStyle {
    fn fields(&self) -> String {
        let mut fields = Vec::new();
        if self.bold.is_some() {
            fields.push("bold");
        }
        if self.foreground_color.is_some() {
            fields.push("foregroundColor");
        }
        if self.font_size.is_some() {
            fields.push("fontSize");
        }
        if self.link.is_some() {
            fields.push("link");
        }
        if self.weighted_font_family.is_some() {
            fields.push("weightedFontFamily");
        }
        fields.join(",")
    }

    fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionalColor {
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Color {
    pub rgb_color: RgbColor,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RgbColor {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
}

impl From<Rgb> for OptionalColor {
    fn from(rgb: Rgb) -> Self {
        Self {
            color: Color {
                rgb_color: RgbColor {
                    red: rgb.red,
                    green: rgb.green,
                    blue: rgb.blue,
                },
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dimension {
    pub magnitude: f32,
    pub unit: &'static str,
}

impl Dimension {
    fn pt(magnitude: f32) -> Self {
        Self {
            magnitude,
            unit: "PT",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParagraphBorder {
    pub color: OptionalColor,
    pub width: Dimension,
    pub padding: Dimension,
    pub dash_style: &'static str,
}

impl ParagraphBorder {
    fn solid(color: Rgb) -> Self {
        Self {
            color: color.into(),
            width: Dimension::pt(1.0),
            padding: Dimension::pt(4.0),
            dash_style: "SOLID",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Link {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightedFontFamily {
    pub font_family: String,
}

/// A block with its literal text and absolute start offset.
struct Placed<'a> {
    block: &'a Block,
    text: String,
    start: usize,
    /// Offset of the block's own content within `text`.
    content_offset: usize,
}

impl Placed<'_> {
    fn end(&self) -> usize {
        self.start + utf16_len(&self.text)
    }

    /// Whole paragraph including the trailing newline.
    fn paragraph_range(&self) -> Range {
        Range::new(self.start, self.end())
    }

    /// Text only, excluding the trailing newline.
    fn text_range(&self) -> Range {
        Range::new(self.start, self.end() - 1)
    }
}

pub fn utf16_len(text: &str) -> usize {
    text.encode_utf16().count()
}

pub struct RequestBuilder {
    theme: Theme,
    key_regex: Regex,
    url_regex: Regex,
}

impl RequestBuilder {
    pub fn new(theme: Theme) -> Result<Self> {
        // `key: value` or `key：value`; a half-width colon must be followed by
        // whitespace so `https://` is never taken as a key
        let key_regex = Regex::new(r"^([^:：]+?(?::\s|：))")?;
        let url_regex = Regex::new(r"https?://[^\s<>()「」『』、。]+")?;

        Ok(Self {
            theme,
            key_regex,
            url_regex,
        })
    }

    pub fn build_document(&self, document: &Document) -> Vec<StyledOperation> {
        self.build(&document.blocks)
    }

    /// Classify markdown-like text line by line, then build.
    pub fn build_from_text(&self, text: &str) -> Vec<StyledOperation> {
        self.build_document(&Document::from_markdown(text))
    }

    pub fn build(&self, blocks: &[Block]) -> Vec<StyledOperation> {
        let placed = self.place(blocks);
        let end = placed.last().map(Placed::end).unwrap_or(ORIGIN);

        let mut operations: Vec<StyledOperation> = placed
            .iter()
            .map(|p| {
                StyledOperation::InsertText(InsertText {
                    location: Location { index: p.start },
                    text: p.text.clone(),
                })
            })
            .collect();

        for p in &placed {
            self.style_block(p, &mut operations);
        }

        if end > ORIGIN {
            if let Some(font_family) = &self.theme.font_family {
                push_text_style(
                    &mut operations,
                    Range::new(ORIGIN, end),
                    TextStyle {
                        weighted_font_family: Some(WeightedFontFamily {
                            font_family: font_family.clone(),
                        }),
                        ..TextStyle::default()
                    },
                );
            }
        }

        debug!(
            "Built {} document requests for {} blocks ({} index units)",
            operations.len(),
            blocks.len(),
            end - ORIGIN
        );
        operations
    }

    fn place<'a>(&self, blocks: &'a [Block]) -> Vec<Placed<'a>> {
        let mut index = ORIGIN;
        let mut placed = Vec::with_capacity(blocks.len());

        for block in blocks {
            let (text, content_offset) = self.literal_text(block);
            let p = Placed {
                block,
                text,
                start: index,
                content_offset,
            };
            index = p.end();
            placed.push(p);
        }

        placed
    }

    fn literal_text(&self, block: &Block) -> (String, usize) {
        match block {
            Block::Heading(_, text) | Block::Bold(text) | Block::Paragraph(text) => {
                (format!("{}\n", text), 0)
            }
            Block::Bullet(text) if self.theme.native_bullets => (format!("{}\n", text), 0),
            Block::Bullet(text) => (
                format!("{}{}\n", LITERAL_BULLET_PREFIX, text),
                utf16_len(LITERAL_BULLET_PREFIX),
            ),
            Block::Separator => match &self.theme.separator {
                SeparatorStyle::Glyph(glyph) => (format!("{}\n", glyph), 0),
                SeparatorStyle::Border { .. } => ("\n".to_string(), 0),
            },
            Block::Blank => ("\n".to_string(), 0),
        }
    }

    fn style_block(&self, placed: &Placed<'_>, operations: &mut Vec<StyledOperation>) {
        match placed.block {
            Block::Heading(level, _) => self.style_heading(placed, *level, operations),
            Block::Bold(_) => {
                push_text_style(
                    operations,
                    placed.text_range(),
                    TextStyle {
                        bold: Some(true),
                        foreground_color: self.theme.speaker_color.map(Into::into),
                        font_size: self.theme.speaker_font_size_pt.map(Dimension::pt),
                        ..TextStyle::default()
                    },
                );
            }
            Block::Separator => {
                if let SeparatorStyle::Border { color, space_pt } = &self.theme.separator {
                    push_paragraph_style(
                        operations,
                        placed.paragraph_range(),
                        ParagraphStyle {
                            border_bottom: Some(ParagraphBorder::solid(*color)),
                            space_below: Some(Dimension::pt(*space_pt)),
                            ..ParagraphStyle::default()
                        },
                    );
                }
            }
            Block::Bullet(text) => self.style_bullet(placed, text, operations),
            Block::Paragraph(_) | Block::Blank => {}
        }
    }

    fn style_heading(
        &self,
        placed: &Placed<'_>,
        level: HeadingLevel,
        operations: &mut Vec<StyledOperation>,
    ) {
        let (named_style, style): (&str, &HeadingStyle) = match level {
            HeadingLevel::Title => ("HEADING_1", &self.theme.title),
            HeadingLevel::Section => ("HEADING_2", &self.theme.section),
            HeadingLevel::Timestamp => ("HEADING_3", &self.theme.timestamp),
        };

        push_paragraph_style(
            operations,
            placed.paragraph_range(),
            ParagraphStyle {
                named_style_type: Some(named_style.to_string()),
                border_bottom: style.border_bottom.map(ParagraphBorder::solid),
                space_above: style.space_above_pt.map(Dimension::pt),
                space_below: style.space_below_pt.map(Dimension::pt),
            },
        );

        if let Some(color) = style.color {
            push_text_style(
                operations,
                placed.text_range(),
                TextStyle {
                    foreground_color: Some(color.into()),
                    ..TextStyle::default()
                },
            );
        }
    }

    fn style_bullet(&self, placed: &Placed<'_>, text: &str, operations: &mut Vec<StyledOperation>) {
        if self.theme.native_bullets {
            let range = placed.paragraph_range();
            operations.push(StyledOperation::CreateParagraphBullets(
                CreateParagraphBullets {
                    range,
                    bullet_preset: BULLET_PRESET.to_string(),
                },
            ));
        }

        let content_start = placed.start + placed.content_offset;
        let span = |from: usize, to: usize| {
            Range::new(
                content_start + utf16_len(&text[..from]),
                content_start + utf16_len(&text[..to]),
            )
        };

        if self.theme.bold_bullet_keys {
            if let Some(key) = self.key_regex.captures(text).and_then(|c| c.get(1)) {
                let key_end = key.start() + key.as_str().trim_end().len();
                push_text_style(
                    operations,
                    span(key.start(), key_end),
                    TextStyle {
                        bold: Some(true),
                        ..TextStyle::default()
                    },
                );
            }
        }

        if self.theme.link_urls {
            for url in self.url_regex.find_iter(text) {
                push_text_style(
                    operations,
                    span(url.start(), url.end()),
                    TextStyle {
                        link: Some(Link {
                            url: url.as_str().to_string(),
                        }),
                        ..TextStyle::default()
                    },
                );
            }
        }
    }
}

fn push_paragraph_style(
    operations: &mut Vec<StyledOperation>,
    range: Range,
    paragraph_style: ParagraphStyle,
) {
    let fields = paragraph_style.fields();
    if range.is_empty() || fields.is_empty() {
        return;
    }
    operations.push(StyledOperation::UpdateParagraphStyle(UpdateParagraphStyle {
        range,
        paragraph_style,
        fields,
    }));
}

/// Skips empty ranges (a line that was only a newline) and no-op styles.
fn push_text_style(operations: &mut Vec<StyledOperation>, range: Range, text_style: TextStyle) {
    if range.is_empty() || text_style.is_empty() {
        return;
    }
    let fields = text_style.fields();
    operations.push(StyledOperation::UpdateTextStyle(UpdateTextStyle {
        range,
        text_style,
        fields,
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rich() -> RequestBuilder {
        RequestBuilder::new(Theme::rich()).unwrap()
    }

    fn plain() -> RequestBuilder {
        RequestBuilder::new(Theme::plain()).unwrap()
    }

    fn inserts(ops: &[StyledOperation]) -> Vec<&InsertText> {
        ops.iter()
            .filter_map(|op| match op {
                StyledOperation::InsertText(insert) => Some(insert),
                _ => None,
            })
            .collect()
    }

    fn text_styles(ops: &[StyledOperation]) -> Vec<&UpdateTextStyle> {
        ops.iter()
            .filter_map(|op| match op {
                StyledOperation::UpdateTextStyle(style) => Some(style),
                _ => None,
            })
            .collect()
    }

    /// Slice the concatenated inserted text by document range.
    fn text_at(ops: &[StyledOperation], range: Range) -> String {
        let body: Vec<u16> = inserts(ops)
            .iter()
            .flat_map(|i| i.text.encode_utf16())
            .collect();
        String::from_utf16(&body[range.start_index - ORIGIN..range.end_index - ORIGIN]).unwrap()
    }

    #[test]
    fn test_heading_and_paragraph() {
        let ops = plain().build_from_text("# 見出し\n\n本文テキスト\n");
        let inserted = inserts(&ops);

        assert_eq!(inserted.len(), 4);
        assert_eq!(inserted[0].text, "見出し\n");
        assert_eq!(inserted[0].location.index, 1);
        assert_eq!(inserted[1].location.index, 5);
        assert_eq!(inserted[2].text, "本文テキスト\n");

        assert!(ops.contains(&StyledOperation::UpdateParagraphStyle(
            UpdateParagraphStyle {
                range: Range::new(1, 5),
                paragraph_style: ParagraphStyle {
                    named_style_type: Some("HEADING_1".to_string()),
                    ..ParagraphStyle::default()
                },
                fields: "namedStyleType".to_string(),
            }
        )));
    }

    #[test]
    fn test_all_inserts_precede_styles() {
        let ops = rich().build_from_text("# T\n## S\n- a: b\n**x**\n---\n");
        let first_style = ops
            .iter()
            .position(|op| !matches!(op, StyledOperation::InsertText(_)))
            .unwrap();

        assert!(ops[first_style..]
            .iter()
            .all(|op| !matches!(op, StyledOperation::InsertText(_))));
        assert_eq!(inserts(&ops).len(), 6);
    }

    #[test]
    fn test_offsets_are_contiguous() {
        let ops = rich().build_from_text("# 会議議事録\n\n- 日時: 2026-02-15\n---\n### 00:00:00 - 00:00:05\n**田中**\nこんにちは 🎉\n");
        let inserted = inserts(&ops);

        for pair in inserted.windows(2) {
            assert_eq!(
                pair[1].location.index,
                pair[0].location.index + utf16_len(&pair[0].text)
            );
        }
    }

    #[test]
    fn test_text_ranges_exclude_trailing_newline() {
        let ops = rich().build_from_text("**田中太郎**\n### 00:00:00 - 00:00:05\n");
        let inserted = inserts(&ops);
        let styles = text_styles(&ops);

        let bold = styles.iter().find(|s| s.text_style.bold == Some(true)).unwrap();
        assert_eq!(bold.range.start_index, inserted[0].location.index);
        assert_eq!(bold.range.end_index, inserted[1].location.index - 1);
        assert_eq!(text_at(&ops, bold.range), "田中太郎");
        assert_eq!(bold.fields, "bold,foregroundColor,fontSize");

        let heading_color = styles
            .iter()
            .find(|s| s.range.start_index == inserted[1].location.index)
            .unwrap();
        assert_eq!(text_at(&ops, heading_color.range), "00:00:00 - 00:00:05");
    }

    #[test]
    fn test_bullet_with_key_and_url() {
        let ops = rich().build_from_text("- 田中: デザイン確認 https://x/y");

        let bullets: Vec<_> = ops
            .iter()
            .filter_map(|op| match op {
                StyledOperation::CreateParagraphBullets(b) => Some(b),
                _ => None,
            })
            .collect();
        assert_eq!(bullets.len(), 1);
        assert_eq!(bullets[0].range, Range::new(1, 1 + utf16_len("田中: デザイン確認 https://x/y\n")));

        let styles = text_styles(&ops);
        let key = styles.iter().find(|s| s.fields == "bold").unwrap();
        assert_eq!(text_at(&ops, key.range), "田中:");

        let link = styles.iter().find(|s| s.fields == "link").unwrap();
        assert_eq!(text_at(&ops, link.range), "https://x/y");
        assert_eq!(link.text_style.link.as_ref().unwrap().url, "https://x/y");
    }

    #[test]
    fn test_url_alone_is_not_a_key() {
        let ops = rich().build_from_text("- https://zoom.us/rec/share/abc");
        let styles = text_styles(&ops);

        assert!(!styles.iter().any(|s| s.fields == "bold"));
        assert!(styles.iter().any(|s| s.fields == "link"));
    }

    #[test]
    fn test_full_width_colon_key() {
        let ops = rich().build_from_text("- 議題：リリース日");
        let key = text_styles(&ops)
            .into_iter()
            .find(|s| s.fields == "bold")
            .unwrap();
        assert_eq!(text_at(&ops, key.range), "議題：");
    }

    #[test]
    fn test_plain_bullets_are_literal() {
        let ops = plain().build_from_text("- 録画URL: https://x/y");

        assert_eq!(inserts(&ops)[0].text, "  - 録画URL: https://x/y\n");
        assert_eq!(ops.len(), 1);
    }

    #[test]
    fn test_separator_variants() {
        let plain_ops = plain().build_from_text("---");
        assert_eq!(inserts(&plain_ops)[0].text, "───────────────────\n");
        assert_eq!(plain_ops.len(), 1);

        let rich_ops = rich().build_from_text("---");
        assert_eq!(inserts(&rich_ops)[0].text, "\n");
        match &rich_ops[1] {
            StyledOperation::UpdateParagraphStyle(style) => {
                assert_eq!(style.range, Range::new(1, 2));
                assert_eq!(style.fields, "borderBottom,spaceBelow");
            }
            other => panic!("unexpected operation: {:?}", other),
        }
        // No text colour on separators; only the font override follows
        assert!(text_styles(&rich_ops)
            .iter()
            .all(|s| s.text_style.foreground_color.is_none()));
    }

    #[test]
    fn test_blank_lines_get_no_styles() {
        let theme = Theme {
            font_family: None,
            ..Theme::rich()
        };
        let ops = RequestBuilder::new(theme).unwrap().build_from_text("\n\n");
        assert_eq!(ops.len(), 3);
        assert!(ops.iter().all(|op| matches!(op, StyledOperation::InsertText(_))));
    }

    #[test]
    fn test_empty_heading_skips_text_style() {
        let ops = rich().build(&[Block::Heading(HeadingLevel::Section, String::new())]);
        let styles = text_styles(&ops);

        // Only the whole-document font override remains
        assert_eq!(styles.len(), 1);
        assert!(styles[0].text_style.weighted_font_family.is_some());
    }

    #[test]
    fn test_font_family_covers_everything() {
        let ops = rich().build_from_text("# A\nbody");
        match ops.last().unwrap() {
            StyledOperation::UpdateTextStyle(style) => {
                assert_eq!(style.range, Range::new(1, 8));
                assert_eq!(style.fields, "weightedFontFamily");
            }
            other => panic!("unexpected operation: {:?}", other),
        }
    }

    #[test]
    fn test_no_blocks_no_operations() {
        assert!(rich().build(&[]).is_empty());
    }

    #[test]
    fn test_serializes_to_docs_api_shape() {
        let ops = plain().build_from_text("**田中**");
        let value = serde_json::to_value(&ops).unwrap();

        assert_eq!(
            value,
            json!([
                {"insertText": {"location": {"index": 1}, "text": "田中\n"}},
                {"updateTextStyle": {
                    "range": {"startIndex": 1, "endIndex": 3},
                    "textStyle": {"bold": true},
                    "fields": "bold"
                }}
            ])
        );
    }

    #[test]
    fn test_blocks_and_text_paths_agree() {
        use crate::transcript::{render, MeetingMetadata, Segment};

        let segments = vec![Segment {
            speaker: "田中".to_string(),
            text: "はい".to_string(),
            start: "00:00:00".to_string(),
            end: "00:00:01".to_string(),
        }];
        let metadata = MeetingMetadata {
            date: "2026-02-15 10:00".to_string(),
            topic: "定例".to_string(),
            participants: vec!["田中".to_string()],
            recording_url: Some("https://zoom.us/rec/share/abc".to_string()),
        };
        let doc = render(&segments, &metadata, None);
        let builder = rich();

        assert_eq!(builder.build_document(&doc), builder.build_from_text(&doc.to_markdown()));
    }
}
