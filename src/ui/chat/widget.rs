use crate::config::{Config, UiConfig};
use crate::error::ChatError;
use crate::llm::{GeminiClient, TextGenerator};
use crate::prompts::SystemPrompt;
use crate::session::{ChatSession, Focus, SubmitOutcome};
use crate::ui::chat::composer::{ChatComposer, ComposerResult, ComposerView};
use crate::ui::chat::transcript::{TranscriptView, WelcomeView};
use crate::ui::theme::{Palette, Theme};
use anyhow::Result;
use futures::FutureExt;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Widget},
};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

type Reply = Result<String, ChatError>;

/// What the host loop should do after a key press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetAction {
    None,
    Quit,
}

/// Toggleable chat panel backed by a [`TextGenerator`].
///
/// Each accepted submission spawns one task; its result comes back over a
/// channel and is applied by [`ChatWidget::poll`] on the host's tick.
pub struct ChatWidget<G: TextGenerator> {
    session: ChatSession,
    composer: ChatComposer,
    generator: Arc<G>,
    quick_questions: Vec<String>,
    theme: Theme,
    reply_tx: mpsc::UnboundedSender<Reply>,
    reply_rx: mpsc::UnboundedReceiver<Reply>,
}

impl ChatWidget<GeminiClient> {
    /// Check the configuration and build a widget talking to the configured endpoint.
    pub fn from_config(config: &Config) -> Result<Self> {
        let report = config.setup_report();
        for issue in report.issues.iter().filter(|issue| !issue.is_fatal()) {
            warn!(%issue, "setup issue");
        }
        if report.is_fatal() {
            let details: Vec<String> = report.fatal_issues().map(|i| i.to_string()).collect();
            anyhow::bail!("Chat is not configured:\n  - {}", details.join("\n  - "));
        }

        let prompt = SystemPrompt::load(&config.prompt)?;
        let client = GeminiClient::new(config, prompt)?;
        info!(prompt = ?client.prompt().source(), endpoint = %config.endpoint.url, "chat widget ready");
        Ok(Self::new(client, &config.ui))
    }
}

impl<G: TextGenerator> ChatWidget<G> {
    pub fn new(generator: G, ui: &UiConfig) -> Self {
        let (reply_tx, reply_rx) = mpsc::unbounded_channel();

        Self {
            session: ChatSession::new(Duration::from_secs(ui.notice_seconds)),
            composer: ChatComposer::new(),
            generator: Arc::new(generator),
            quick_questions: ui.quick_questions.clone(),
            theme: ui.theme,
            reply_tx,
            reply_rx,
        }
    }

    pub fn open(&mut self) {
        self.session.open(Instant::now());
    }

    pub fn close(&mut self) {
        self.session.close();
    }

    pub fn toggle(&mut self) {
        self.session.toggle(Instant::now());
    }

    /// Submit text; empty input or a pending reply make this a silent no-op.
    pub fn submit(&mut self, raw_input: &str) -> SubmitOutcome {
        let outcome = self.session.begin_submission(raw_input);

        if let SubmitOutcome::Accepted(message) = &outcome {
            self.composer.clear();

            let generator = Arc::clone(&self.generator);
            let reply_tx = self.reply_tx.clone();
            let message = message.clone();
            let span = info_span!("submission", id = %Uuid::new_v4());

            tokio::spawn(
                async move {
                    // A panic still has to end the submission
                    let reply = AssertUnwindSafe(generator.generate(&message))
                        .catch_unwind()
                        .await
                        .unwrap_or_else(|panic| Err(ChatError::task(panic_message(panic.as_ref()))));
                    // The receiver lives as long as the widget; a send error means it is gone.
                    let _ = reply_tx.send(reply);
                }
                .instrument(span),
            );
        }

        outcome
    }

    /// Apply any finished reply and advance timers. Call on every host tick.
    pub fn poll(&mut self, now: Instant) {
        while let Ok(reply) = self.reply_rx.try_recv() {
            self.session.finish_submission(reply, now);
        }
        self.session.tick(now);
    }

    /// Wait for the in-flight reply, if any, and apply it.
    pub async fn wait_for_reply(&mut self) {
        if !self.session.is_loading() {
            return;
        }
        if let Some(reply) = self.reply_rx.recv().await {
            self.session.finish_submission(reply, Instant::now());
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> WidgetAction {
        if key.kind != KeyEventKind::Press {
            return WidgetAction::None;
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('c') | KeyCode::Char('q') if ctrl => return WidgetAction::Quit,
            KeyCode::Char('o') if ctrl => {
                self.toggle();
                return WidgetAction::None;
            }
            KeyCode::Char('d') if ctrl => {
                self.session.dismiss_notices();
                return WidgetAction::None;
            }
            KeyCode::Esc => {
                self.close();
                return WidgetAction::None;
            }
            _ => {}
        }

        if !self.session.is_open() {
            if key.code == KeyCode::Enter {
                self.open();
            }
            return WidgetAction::None;
        }

        if let Some(question) = self.quick_question_for(&key) {
            self.submit(&question);
            return WidgetAction::None;
        }

        if let ComposerResult::Submit(content) = self.composer.handle_key(key) {
            self.submit(&content);
        }
        WidgetAction::None
    }

    pub fn paste(&mut self, text: &str) {
        if self.session.is_open() {
            self.composer.paste(text);
        }
    }

    /// Alt+digit picks a suggestion while the welcome screen is up
    fn quick_question_for(&self, key: &KeyEvent) -> Option<String> {
        if !self.session.shows_welcome() || !key.modifiers.contains(KeyModifiers::ALT) {
            return None;
        }
        let KeyCode::Char(c) = key.code else {
            return None;
        };
        let index = c.to_digit(10)?.checked_sub(1)? as usize;
        self.quick_questions.get(index).cloned()
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    #[allow(dead_code)]
    pub fn composer(&self) -> &ChatComposer {
        &self.composer
    }

    pub fn render(&self, area: Rect, buf: &mut Buffer) {
        let palette = self.theme.palette();
        self.render_backdrop(area, buf, &palette);

        if !self.session.is_open() {
            return;
        }

        let panel = panel_area(area);
        Clear.render(panel, buf);

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(palette.accent))
            .title(" 💬 Portfolio assistant · Esc to close ");
        let inner = block.inner(panel);
        block.render(panel, buf);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(3),
                Constraint::Length(self.composer.height()),
            ])
            .split(inner);

        if self.session.shows_welcome() {
            WelcomeView {
                quick_questions: &self.quick_questions,
                palette,
            }
            .render(chunks[0], buf);
        } else {
            TranscriptView {
                messages: self.session.messages(),
                typing: self.session.is_typing(),
                notices: self.session.notices(),
                palette,
            }
            .render(chunks[0], buf);
        }

        ComposerView {
            composer: &self.composer,
            has_focus: self.session.focus() == Focus::Input,
            send_enabled: self.session.send_enabled(),
            palette,
        }
        .render(chunks[1], buf);
    }

    fn render_backdrop(&self, area: Rect, buf: &mut Buffer, palette: &Palette) {
        let hint = if self.session.is_open() {
            "Ctrl+O close chat · Ctrl+D dismiss errors · Ctrl+Q quit"
        } else {
            "💬 Ctrl+O or Enter to chat · Ctrl+Q quit"
        };
        let line = Line::from(vec![
            Span::styled(
                " folio ",
                Style::default()
                    .fg(palette.accent)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(hint, Style::default().fg(palette.muted)),
        ]);
        if area.height > 0 {
            buf.set_line(area.x, area.bottom() - 1, &line, area.width);
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("generator panicked: {message}")
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("generator panicked: {message}")
    } else {
        "generator panicked".to_string()
    }
}

/// Panel docked to the right, leaving the bottom hint row free
fn panel_area(area: Rect) -> Rect {
    let width = area.width.min(72).max(area.width / 2);
    let height = area.height.saturating_sub(1);
    Rect {
        x: area.x + area.width.saturating_sub(width),
        y: area.y,
        width,
        height,
    }
}
