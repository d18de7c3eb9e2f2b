use ratatui::style::Color;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Color scheme, read once at startup
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

/// Resolved colors for a theme
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub text: Color,
    pub muted: Color,
    pub accent: Color,
    pub user: Color,
    pub assistant: Color,
    pub error: Color,
    pub border: Color,
}

impl Theme {
    pub fn palette(self) -> Palette {
        match self {
            Theme::Light => Palette {
                text: Color::Black,
                muted: Color::Gray,
                accent: Color::Blue,
                user: Color::Blue,
                assistant: Color::Magenta,
                error: Color::Red,
                border: Color::DarkGray,
            },
            Theme::Dark => Palette {
                text: Color::White,
                muted: Color::DarkGray,
                accent: Color::Cyan,
                user: Color::LightBlue,
                assistant: Color::LightGreen,
                error: Color::LightRed,
                border: Color::Gray,
            },
        }
    }
}
