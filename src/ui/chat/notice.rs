//! Inline error notice that removes itself after a fixed lifetime

use crate::ui::theme::Palette;
use ratatui::{
    style::{Modifier, Style},
    text::{Line, Span},
};
use std::time::{Duration, Instant};

/// A notice sits in the transcript after the first `position` messages.
#[derive(Debug, Clone)]
pub struct ErrorNotice {
    message: String,
    position: usize,
    created_at: Instant,
    lifetime: Duration,
}

impl ErrorNotice {
    pub fn new(
        message: impl Into<String>,
        position: usize,
        now: Instant,
        lifetime: Duration,
    ) -> Self {
        Self {
            message: message.into(),
            position,
            created_at: now,
            lifetime,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) >= self.lifetime
    }

    pub fn line(&self, palette: &Palette) -> Line<'static> {
        Line::from(vec![
            Span::styled(
                "⚠ Error: ",
                Style::default()
                    .fg(palette.error)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(self.message.clone(), Style::default().fg(palette.error)),
        ])
    }
}
