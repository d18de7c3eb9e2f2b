use crate::error::ChatError;
use crate::ui::chat::notice::ErrorNotice;
use chrono::{DateTime, Local};
use std::time::{Duration, Instant};
use strum::Display;
use tracing::{debug, error, info};

/// Delay between opening the panel and focusing the composer
pub const PANEL_TRANSITION: Duration = Duration::from_millis(300);

/// Who produced a transcript entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Single transcript entry; never modified after creation
#[derive(Debug, Clone)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Local>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Local::now(),
        }
    }

    /// Capture time as a 24-hour `HH:MM` clock
    pub fn clock_time(&self) -> String {
        self.timestamp.format("%H:%M").to_string()
    }
}

/// Why a submission was dropped without any visible effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    EmptyInput,
    Busy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Accepted; carries the trimmed text to send
    Accepted(String),
    Ignored(IgnoreReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Trigger,
    Input,
}

/// State of one conversation for the lifetime of the process.
///
/// The transcript only grows. At most one submission is in flight; a
/// submission is `Idle -> Sending -> Idle` and the second leg always runs,
/// whatever the outcome.
#[derive(Debug)]
pub struct ChatSession {
    is_open: bool,
    is_loading: bool,
    has_started: bool,
    typing: bool,
    messages: Vec<Message>,
    notices: Vec<ErrorNotice>,
    focus: Focus,
    focus_due: Option<Instant>,
    notice_lifetime: Duration,
}

impl ChatSession {
    pub fn new(notice_lifetime: Duration) -> Self {
        Self {
            is_open: false,
            is_loading: false,
            has_started: false,
            typing: false,
            messages: Vec::new(),
            notices: Vec::new(),
            focus: Focus::Trigger,
            focus_due: None,
            notice_lifetime,
        }
    }

    /// Returns false when the panel was already open
    pub fn open(&mut self, now: Instant) -> bool {
        if self.is_open {
            return false;
        }
        self.is_open = true;
        self.focus_due = Some(now + PANEL_TRANSITION);
        debug!("chat panel opened");
        true
    }

    /// Returns false when the panel was already closed
    pub fn close(&mut self) -> bool {
        if !self.is_open {
            return false;
        }
        self.is_open = false;
        self.focus = Focus::Trigger;
        self.focus_due = None;
        debug!("chat panel closed");
        true
    }

    pub fn toggle(&mut self, now: Instant) {
        if self.is_open {
            self.close();
        } else {
            self.open(now);
        }
    }

    /// First leg of a submission: validate, record the user turn, enter `Sending`.
    pub fn begin_submission(&mut self, raw_input: &str) -> SubmitOutcome {
        let message = raw_input.trim();
        if message.is_empty() {
            return SubmitOutcome::Ignored(IgnoreReason::EmptyInput);
        }
        if self.is_loading {
            debug!("submission ignored while a reply is pending");
            return SubmitOutcome::Ignored(IgnoreReason::Busy);
        }

        if !self.has_started {
            self.has_started = true;
        }

        self.messages.push(Message::new(Role::User, message));
        self.typing = true;
        self.is_loading = true;

        info!(
            turn = self.messages.len(),
            chars = message.chars().count(),
            "submission accepted"
        );
        SubmitOutcome::Accepted(message.to_string())
    }

    /// Second leg: record the reply or a notice, then return to `Idle`.
    pub fn finish_submission(&mut self, result: Result<String, ChatError>, now: Instant) {
        self.typing = false;

        match result {
            Ok(reply) => {
                info!(chars = reply.chars().count(), "reply received");
                self.messages.push(Message::new(Role::Assistant, reply));
            }
            Err(err) => {
                error!(error = %err, "chatbot error");
                self.notices.push(ErrorNotice::new(
                    err.user_message(),
                    self.messages.len(),
                    now,
                    self.notice_lifetime,
                ));
            }
        }

        self.is_loading = false;
        self.focus = Focus::Input;
        self.focus_due = None;
    }

    /// Advance time-driven state: deferred focus and notice expiry.
    pub fn tick(&mut self, now: Instant) {
        if let Some(due) = self.focus_due {
            if now >= due {
                self.focus = Focus::Input;
                self.focus_due = None;
            }
        }
        self.notices.retain(|notice| !notice.is_expired(now));
    }

    pub fn dismiss_notices(&mut self) {
        self.notices.clear();
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn has_started(&self) -> bool {
        self.has_started
    }

    pub fn shows_welcome(&self) -> bool {
        !self.has_started()
    }

    pub fn is_typing(&self) -> bool {
        self.typing
    }

    pub fn send_enabled(&self) -> bool {
        !self.is_loading
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn notices(&self) -> &[ErrorNotice] {
        &self.notices
    }
}
