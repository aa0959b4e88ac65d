use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
}

impl Rgb {
    pub const fn from_hex(hex: u32) -> Self {
        Self {
            red: ((hex >> 16) & 0xff) as f32 / 255.0,
            green: ((hex >> 8) & 0xff) as f32 / 255.0,
            blue: (hex & 0xff) as f32 / 255.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeadingStyle {
    pub color: Option<Rgb>,
    pub border_bottom: Option<Rgb>,
    pub space_above_pt: Option<f32>,
    pub space_below_pt: Option<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SeparatorStyle {
    /// A literal horizontal-rule line of box-drawing characters.
    Glyph(String),
    /// An empty paragraph with a bottom border.
    Border { color: Rgb, space_pt: f32 },
}

/// Named styling policies selectable from config.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ThemeKind {
    #[default]
    Rich,
    Plain,
}

pub const DEFAULT_FONT_FAMILY: &str = "Noto Sans JP";
const SEPARATOR_GLYPH: &str = "───────────────────";

/// Styling policy for the request builder. Every variant goes through the same
/// builder; a theme only switches individual styles on or off.
#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    pub title: HeadingStyle,
    pub section: HeadingStyle,
    pub timestamp: HeadingStyle,
    pub speaker_color: Option<Rgb>,
    pub speaker_font_size_pt: Option<f32>,
    pub separator: SeparatorStyle,
    /// Native list bullets instead of literal `  - ` text.
    pub native_bullets: bool,
    pub bold_bullet_keys: bool,
    pub link_urls: bool,
    pub font_family: Option<String>,
}

impl Theme {
    pub fn from_kind(kind: ThemeKind, font_family: Option<String>) -> Self {
        match kind {
            ThemeKind::Rich => {
                let mut theme = Self::rich();
                if let Some(font) = font_family.filter(|f| !f.is_empty()) {
                    theme.font_family = Some(font);
                }
                theme
            }
            ThemeKind::Plain => Self {
                font_family: font_family.filter(|f| !f.is_empty()),
                ..Self::plain()
            },
        }
    }

    pub fn rich() -> Self {
        let accent = Rgb::from_hex(0x1a73e8);
        Self {
            title: HeadingStyle {
                color: Some(Rgb::from_hex(0x0b3d91)),
                border_bottom: Some(accent),
                space_above_pt: None,
                space_below_pt: Some(12.0),
            },
            section: HeadingStyle {
                color: Some(accent),
                border_bottom: None,
                space_above_pt: Some(18.0),
                space_below_pt: Some(6.0),
            },
            timestamp: HeadingStyle {
                color: Some(Rgb::from_hex(0x5f6368)),
                ..HeadingStyle::default()
            },
            speaker_color: Some(Rgb::from_hex(0x174ea6)),
            speaker_font_size_pt: Some(11.0),
            separator: SeparatorStyle::Border {
                color: Rgb::from_hex(0xdadce0),
                space_pt: 6.0,
            },
            native_bullets: true,
            bold_bullet_keys: true,
            link_urls: true,
            font_family: Some(DEFAULT_FONT_FAMILY.to_string()),
        }
    }

    /// Named heading styles and bold speakers only.
    pub fn plain() -> Self {
        Self {
            title: HeadingStyle::default(),
            section: HeadingStyle::default(),
            timestamp: HeadingStyle::default(),
            speaker_color: None,
            speaker_font_size_pt: None,
            separator: SeparatorStyle::Glyph(SEPARATOR_GLYPH.to_string()),
            native_bullets: false,
            bold_bullet_keys: false,
            link_urls: false,
            font_family: None,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::rich()
    }
}
