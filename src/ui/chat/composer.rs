use crate::ui::theme::Palette;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

/// Composer grows with its content up to this many text rows
const MAX_VISIBLE_ROWS: u16 = 4;

/// Result of feeding a key to the composer
#[derive(Debug, PartialEq)]
pub enum ComposerResult {
    /// Enter without a modifier; carries the current (untrimmed) content
    Submit(String),
    None,
}

/// Multi-line text input at the bottom of the chat panel
#[derive(Debug, Clone, Default)]
pub struct ChatComposer {
    content: String,
    /// Byte offset, always on a char boundary
    cursor: usize,
}

impl ChatComposer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle key input. Shift/Alt+Enter inserts a line break.
    pub fn handle_key(&mut self, key: KeyEvent) -> ComposerResult {
        if key.kind != KeyEventKind::Press {
            return ComposerResult::None;
        }

        match key.code {
            KeyCode::Enter => {
                if key
                    .modifiers
                    .intersects(KeyModifiers::SHIFT | KeyModifiers::ALT)
                {
                    self.insert_char('\n');
                } else {
                    return ComposerResult::Submit(self.content.clone());
                }
            }
            KeyCode::Char(c) => {
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
                {
                    self.insert_char(c);
                }
            }
            KeyCode::Backspace => {
                if let Some(prev) = self.prev_boundary() {
                    self.content.remove(prev);
                    self.cursor = prev;
                }
            }
            KeyCode::Delete => {
                if self.cursor < self.content.len() {
                    self.content.remove(self.cursor);
                }
            }
            KeyCode::Left => {
                if let Some(prev) = self.prev_boundary() {
                    self.cursor = prev;
                }
            }
            KeyCode::Right => {
                if let Some(next) = self.next_boundary() {
                    self.cursor = next;
                }
            }
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.content.len(),
            _ => {}
        }

        ComposerResult::None
    }

    /// Insert pasted text at the cursor
    pub fn paste(&mut self, text: &str) {
        let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
        self.content.insert_str(self.cursor, &normalized);
        self.cursor += normalized.len();
    }

    fn insert_char(&mut self, c: char) {
        self.content.insert(self.cursor, c);
        self.cursor += c.len_utf8();
    }

    fn prev_boundary(&self) -> Option<usize> {
        self.content[..self.cursor]
            .char_indices()
            .next_back()
            .map(|(index, _)| index)
    }

    fn next_boundary(&self) -> Option<usize> {
        self.content[self.cursor..]
            .chars()
            .next()
            .map(|c| self.cursor + c.len_utf8())
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn clear(&mut self) {
        self.content.clear();
        self.cursor = 0;
    }

    /// Rows needed to show the content, borders included
    pub fn height(&self) -> u16 {
        let rows = self.content.split('\n').count() as u16;
        rows.clamp(1, MAX_VISIBLE_ROWS) + 2
    }
}

/// Render-time view of the composer
pub struct ComposerView<'a> {
    pub composer: &'a ChatComposer,
    pub has_focus: bool,
    pub send_enabled: bool,
    pub palette: Palette,
}

impl Widget for ComposerView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let title = if self.send_enabled {
            " Ask a question · Enter to send · Shift+Enter for new line "
        } else {
            " Waiting for reply… "
        };
        let border_style = if self.has_focus {
            Style::default().fg(self.palette.accent)
        } else {
            Style::default().fg(self.palette.border)
        };

        let block = Block::default()
            .borders(Borders::ALL)
            .title(title)
            .border_style(border_style);
        let inner_area = block.inner(area);
        block.render(area, buf);

        let content = self.composer.content();
        if content.is_empty() {
            let placeholder = Line::from(vec![Span::styled(
                "Type your message...",
                Style::default()
                    .fg(self.palette.muted)
                    .add_modifier(Modifier::ITALIC),
            )]);
            buf.set_line(inner_area.x, inner_area.y, &placeholder, inner_area.width);
            return;
        }

        let mut text = content.to_string();
        if self.has_focus {
            text.insert(self.composer.cursor.min(text.len()), '▌');
        }

        // Keep the cursor's tail of the content visible
        let lines: Vec<&str> = text.split('\n').collect();
        let height = inner_area.height as usize;
        let start = lines.len().saturating_sub(height);
        for (i, line_text) in lines[start..].iter().enumerate() {
            let line = Line::from(vec![Span::styled(
                *line_text,
                Style::default().fg(self.palette.text),
            )]);
            buf.set_line(inner_area.x, inner_area.y + i as u16, &line, inner_area.width);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(composer: &mut ChatComposer, text: &str) {
        for c in text.chars() {
            composer.handle_key(press(KeyCode::Char(c)));
        }
    }

    #[test]
    fn test_enter_submits_current_content() {
        let mut composer = ChatComposer::new();
        type_text(&mut composer, "hello");

        let result = composer.handle_key(press(KeyCode::Enter));

        assert_eq!(result, ComposerResult::Submit("hello".to_string()));
        // Clearing is left to the widget once the submission is accepted
        assert_eq!(composer.content(), "hello");
    }

    #[test]
    fn test_shift_enter_inserts_line_break() {
        let mut composer = ChatComposer::new();
        type_text(&mut composer, "line one");

        let result = composer.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::SHIFT));
        type_text(&mut composer, "line two");

        assert_eq!(result, ComposerResult::None);
        assert_eq!(composer.content(), "line one\nline two");
        assert_eq!(composer.height(), 4);
    }

    #[test]
    fn test_editing_handles_multibyte_chars() {
        let mut composer = ChatComposer::new();
        type_text(&mut composer, "héllo");

        composer.handle_key(press(KeyCode::Left));
        composer.handle_key(press(KeyCode::Left));
        composer.handle_key(press(KeyCode::Left));
        composer.handle_key(press(KeyCode::Backspace));

        assert_eq!(composer.content(), "hllo");
    }

    #[test]
    fn test_control_chords_are_not_inserted() {
        let mut composer = ChatComposer::new();
        composer.handle_key(KeyEvent::new(KeyCode::Char('o'), KeyModifiers::CONTROL));

        assert_eq!(composer.content(), "");
    }

    #[test]
    fn test_paste_normalizes_line_endings() {
        let mut composer = ChatComposer::new();
        composer.paste("a\r\nb");

        assert_eq!(composer.content(), "a\nb");
    }

    #[test]
    fn test_height_is_capped() {
        let mut composer = ChatComposer::new();
        composer.paste("1\n2\n3\n4\n5\n6");

        assert_eq!(composer.height(), MAX_VISIBLE_ROWS + 2);
    }
}
