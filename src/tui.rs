use crate::llm::TextGenerator;
use crate::ui::chat::{ChatWidget, WidgetAction};
use anyhow::{Context, Result};
use crossterm::event::{
    DisableBracketedPaste, EnableBracketedPaste, Event, EventStream, KeyboardEnhancementFlags,
    PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use crossterm::terminal::{
    self, EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use futures::StreamExt;
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io::{self, Stdout};
use std::time::Instant;
use tokio::time::{Duration, MissedTickBehavior};
use tracing::{debug, info};

const TICK: Duration = Duration::from_millis(100);

/// Raw mode and the alternate screen, held for as long as the guard lives
pub struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    keyboard_enhanced: bool,
}

impl TerminalGuard {
    pub fn enter() -> Result<Self> {
        enable_raw_mode().context("Failed to enable raw mode")?;

        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)
            .context("Failed to enter alternate screen")?;

        // Shift+Enter is only distinguishable from Enter with enhanced key reporting
        let keyboard_enhanced = terminal::supports_keyboard_enhancement().unwrap_or(false);
        if keyboard_enhanced {
            execute!(
                stdout,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES)
            )
            .context("Failed to enable keyboard enhancement")?;
        }

        let terminal = Terminal::new(CrosstermBackend::new(stdout))
            .context("Failed to create terminal")?;

        Ok(Self {
            terminal,
            keyboard_enhanced,
        })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let backend = self.terminal.backend_mut();
        if self.keyboard_enhanced {
            let _ = execute!(backend, PopKeyboardEnhancementFlags);
        }
        let _ = execute!(backend, DisableBracketedPaste, LeaveAlternateScreen);
        let _ = disable_raw_mode();
        let _ = self.terminal.show_cursor();
    }
}

/// Drive the widget until the user quits.
pub async fn run<G: TextGenerator>(mut widget: ChatWidget<G>) -> Result<()> {
    let mut guard = TerminalGuard::enter()?;
    let mut events = EventStream::new();
    let mut ticker = tokio::time::interval(TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!("chat session started");

    loop {
        guard
            .terminal
            .draw(|frame| {
                let area = frame.size();
                widget.render(area, frame.buffer_mut());
            })
            .context("Failed to draw frame")?;

        tokio::select! {
            _ = ticker.tick() => {
                widget.poll(Instant::now());
            }
            maybe_event = events.next() => match maybe_event {
                Some(Ok(Event::Key(key))) => {
                    if widget.handle_key(key) == WidgetAction::Quit {
                        break;
                    }
                }
                Some(Ok(Event::Paste(text))) => widget.paste(&text),
                Some(Ok(other)) => debug!(?other, "unhandled terminal event"),
                Some(Err(e)) => return Err(e).context("Failed to read terminal event"),
                None => break,
            },
        }
    }

    info!(
        messages = widget.session().messages().len(),
        "chat session ended"
    );
    Ok(())
}
