//! Transcript and welcome-screen rendering

use crate::session::{Message, Role};
use crate::ui::chat::notice::ErrorNotice;
use crate::ui::theme::Palette;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Widget,
};

/// Messages, the typing placeholder and any live notices, newest at the bottom
pub struct TranscriptView<'a> {
    pub messages: &'a [Message],
    pub typing: bool,
    pub notices: &'a [ErrorNotice],
    pub palette: Palette,
}

impl Widget for TranscriptView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let width = area.width.saturating_sub(2) as usize;
        let mut all_lines: Vec<Line> = Vec::new();

        // Notices stay where the failure happened, between the messages around it
        let notices = self.notices;
        let notices_at = move |position: usize| {
            notices
                .iter()
                .filter(move |notice| notice.position() == position)
        };

        for (index, message) in self.messages.iter().enumerate() {
            all_lines.extend(notices_at(index).map(|notice| notice.line(&self.palette)));
            all_lines.extend(render_message(message, width, &self.palette));
            all_lines.push(Line::from(""));
        }

        all_lines.extend(
            notices
                .iter()
                .filter(|notice| notice.position() >= self.messages.len())
                .map(|notice| notice.line(&self.palette)),
        );

        if self.typing {
            all_lines.push(typing_line(&self.palette));
        }

        // Follow the newest content
        let height = area.height as usize;
        let start = all_lines.len().saturating_sub(height);
        for (i, line) in all_lines[start..].iter().enumerate() {
            buf.set_line(area.x, area.y + i as u16, line, area.width);
        }
    }
}

fn render_message(message: &Message, width: usize, palette: &Palette) -> Vec<Line<'static>> {
    let (icon, color) = match message.role {
        Role::User => ("👤", palette.user),
        Role::Assistant => ("🤖", palette.assistant),
    };

    let mut lines = vec![Line::from(vec![
        Span::raw(format!("{icon} ")),
        Span::styled(
            message.role.to_string(),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("  {}", message.clock_time()),
            Style::default().fg(palette.muted),
        ),
    ])];

    for content_line in wrap_text(&message.content, width) {
        lines.push(Line::from(vec![
            Span::raw("  "),
            Span::styled(content_line, Style::default().fg(palette.text)),
        ]));
    }

    lines
}

fn typing_line(palette: &Palette) -> Line<'static> {
    let dots = match (std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
        / 300)
        % 3
    {
        0 => "●○○",
        1 => "○●○",
        _ => "○○●",
    };

    Line::from(vec![
        Span::raw("🤖 "),
        Span::styled(dots, Style::default().fg(palette.assistant)),
        Span::styled(" Thinking...", Style::default().fg(palette.muted)),
    ])
}

/// Word-wrap that keeps explicit line breaks
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut current_line = String::new();
        let mut current_width = 0;

        for word in paragraph.split_whitespace() {
            let word_width = word.chars().count();
            if current_width > 0 && current_width + 1 + word_width > width {
                lines.push(std::mem::take(&mut current_line));
                current_width = 0;
            }
            if current_width > 0 {
                current_line.push(' ');
                current_width += 1;
            }
            current_line.push_str(word);
            current_width += word_width;
        }

        lines.push(current_line);
    }

    lines
}

/// Shown until the first accepted submission
pub struct WelcomeView<'a> {
    pub quick_questions: &'a [String],
    pub palette: Palette,
}

impl Widget for WelcomeView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let mut lines = vec![
            Line::from(vec![Span::styled(
                "👋 Hi! I'm the portfolio assistant.",
                Style::default()
                    .fg(self.palette.accent)
                    .add_modifier(Modifier::BOLD),
            )]),
            Line::from(""),
            Line::from(vec![Span::styled(
                "Ask me about projects, skills, experience or how to get in touch.",
                Style::default().fg(self.palette.text),
            )]),
            Line::from(""),
        ];

        if !self.quick_questions.is_empty() {
            lines.push(Line::from(vec![Span::styled(
                "Quick questions:",
                Style::default().fg(self.palette.muted),
            )]));
            for (index, question) in self.quick_questions.iter().take(9).enumerate() {
                lines.push(Line::from(vec![
                    Span::styled(
                        format!("  Alt+{} ", index + 1),
                        Style::default().fg(self.palette.accent),
                    ),
                    Span::styled(question.clone(), Style::default().fg(self.palette.text)),
                ]));
            }
        }

        for (i, line) in lines.iter().enumerate() {
            if i >= area.height as usize {
                break;
            }
            buf.set_line(area.x, area.y + i as u16, line, area.width);
        }
    }
}
