//! Error types for the chat widget.

use thiserror::Error;

/// Text shown to the visitor for every failed round trip.
pub const GENERIC_FAILURE: &str = "Sorry, I encountered an error. Please try again.";

/// Failures of a single generate round trip.
///
/// None of these are fatal to the widget: they are caught at the
/// submission boundary, logged, and rendered as an inline notice.
#[derive(Error, Debug)]
pub enum ChatError {
    /// The endpoint answered with a non-success HTTP status
    #[error("API request failed: {status}")]
    Transport { status: u16 },

    /// The body did not contain `candidates[0].content.parts[0].text`
    #[error("Invalid response format: {0}")]
    Format(String),

    /// The request never got a status back (DNS, connect, TLS, ...).
    /// Built through [`ChatError::request`], which strips the URL and its key.
    #[error("Request could not be completed: {0}")]
    Request(reqwest::Error),

    /// The reply task ended without producing a result
    #[error("Reply task failed: {0}")]
    Task(String),

    /// No API key and the endpoint is not a credential-holding proxy
    #[error("No API key configured (set {env} or enable proxy mode)")]
    MissingCredential { env: String },
}

impl ChatError {
    pub fn transport(status: u16) -> Self {
        Self::Transport { status }
    }

    pub fn format(message: impl Into<String>) -> Self {
        Self::Format(message.into())
    }

    /// Wrap a reqwest error without its URL; the query string carries the key.
    pub fn request(error: reqwest::Error) -> Self {
        Self::Request(error.without_url())
    }

    pub fn task(message: impl Into<String>) -> Self {
        Self::Task(message.into())
    }

    /// The notice text presented to the visitor. Causes are not distinguished.
    pub fn user_message(&self) -> &'static str {
        GENERIC_FAILURE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_cause_maps_to_generic_notice() {
        let errors = [
            ChatError::transport(500),
            ChatError::format("missing candidates"),
            ChatError::task("generator panicked"),
            ChatError::MissingCredential {
                env: "GEMINI_API_KEY".to_string(),
            },
        ];

        for error in errors {
            assert_eq!(error.user_message(), GENERIC_FAILURE);
        }
    }

    #[test]
    fn test_transport_display_carries_status() {
        assert_eq!(ChatError::transport(503).to_string(), "API request failed: 503");
    }
}
