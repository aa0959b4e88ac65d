//! End-to-end checks over the library: captions in, Docs requests out.

use gijiroku::gdocs::{utf16_len, RequestBuilder, StyledOperation, Theme, ORIGIN};
use gijiroku::transcript::{
    participants_of, plain_text, render, CaptionParser, MeetingMetadata, SummaryData,
};

const CAPTIONS: &str = "WEBVTT

1
00:00:00.000 --> 00:00:05.500
田中太郎: 今日はですね

2
00:00:05.500 --> 00:00:12.000
田中太郎: よろしくお願いします

3
00:00:12.000 --> 00:00:15.000
鈴木花子: 資料はこちらです: https://example.com/deck
";

fn metadata(participants: Vec<String>) -> MeetingMetadata {
    MeetingMetadata {
        date: "2026-02-15 10:00".to_string(),
        topic: "週次定例".to_string(),
        participants,
        recording_url: Some(String::new()),
    }
}

fn inserts(operations: &[StyledOperation]) -> Vec<(usize, String)> {
    operations
        .iter()
        .filter_map(|op| match op {
            StyledOperation::InsertText(insert) => {
                Some((insert.location.index, insert.text.clone()))
            }
            _ => None,
        })
        .collect()
}

#[test]
fn test_captions_to_markdown() {
    let parser = CaptionParser::new().unwrap();
    let segments = parser.parse(CAPTIONS);

    assert_eq!(segments.len(), 2);
    assert_eq!(segments[0].text, "今日はですね\nよろしくお願いします");
    assert_eq!(segments[0].end, "00:00:12");
    assert_eq!(segments[1].text, "資料はこちらです: https://example.com/deck");

    let participants = participants_of(&segments);
    let markdown = render(&segments, &metadata(participants), None).to_markdown();

    assert!(markdown.contains("- 参加者: 田中太郎、鈴木花子"));
    assert!(!markdown.contains("録画URL"));
    assert!(!markdown.contains("## 要約"));
    assert!(markdown.contains("### 00:00:00 - 00:00:12\n\n**田中太郎**\n今日はですね\nよろしくお願いします\n"));
}

#[test]
fn test_plain_projection_has_no_markup() {
    let segments = CaptionParser::new().unwrap().parse(CAPTIONS);
    let text = plain_text(&segments);

    assert_eq!(
        text,
        "田中太郎: 今日はですね\nよろしくお願いします\n鈴木花子: 資料はこちらです: https://example.com/deck"
    );
    assert!(!text.contains("00:00"));
    assert!(!text.contains("**"));
}

#[test]
fn test_inserts_are_contiguous_and_precede_styles() {
    let segments = CaptionParser::new().unwrap().parse(CAPTIONS);
    let summary = SummaryData {
        summary: "次回までに資料を確認する。".to_string(),
        chapters: "- 資料: https://example.com/deck".to_string(),
    };
    let document = render(
        &segments,
        &metadata(participants_of(&segments)),
        Some(&summary),
    );

    for theme in [Theme::rich(), Theme::plain()] {
        let operations = RequestBuilder::new(theme).unwrap().build_document(&document);

        let first_style = operations
            .iter()
            .position(|op| !matches!(op, StyledOperation::InsertText(_)))
            .unwrap();
        assert!(operations[first_style..]
            .iter()
            .all(|op| !matches!(op, StyledOperation::InsertText(_))));

        let mut expected = ORIGIN;
        for (index, text) in inserts(&operations) {
            assert_eq!(index, expected);
            assert!(text.ends_with('\n'));
            expected += utf16_len(&text);
        }
        assert_eq!(inserts(&operations).len(), document.blocks.len());
    }
}

#[test]
fn test_text_and_block_paths_agree() {
    let segments = CaptionParser::new().unwrap().parse(CAPTIONS);
    let document = render(&segments, &metadata(participants_of(&segments)), None);
    let builder = RequestBuilder::new(Theme::rich()).unwrap();

    assert_eq!(
        builder.build_document(&document),
        builder.build_from_text(&document.to_markdown())
    );
}
