use crate::config::PromptConfig;
use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

/// Profile shipped with the binary, used when no prompt file is configured.
const BUNDLED_PROFILE: &str = include_str!("../assets/system_prompt.md");

/// Where the active system prompt was read from
#[derive(Debug, Clone, PartialEq)]
pub enum PromptSource {
    Bundled,
    File(PathBuf),
}

/// Fixed instructional text prepended to every request
#[derive(Debug, Clone)]
pub struct SystemPrompt {
    text: String,
    source: PromptSource,
}

impl SystemPrompt {
    pub fn bundled() -> Self {
        Self::from_text(BUNDLED_PROFILE, PromptSource::Bundled)
    }

    fn from_text(text: &str, source: PromptSource) -> Self {
        Self {
            text: text.trim_end().to_string(),
            source,
        }
    }

    /// Load the configured prompt file; a missing file falls back to the bundled profile.
    pub fn load(config: &PromptConfig) -> Result<Self> {
        let Some(path) = &config.path else {
            return Ok(Self::bundled());
        };

        if !path.is_file() {
            warn!(path = %path.display(), "prompt file not found, using bundled profile");
            return Ok(Self::bundled());
        }

        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read prompt file {}", path.display()))?;
        if text.trim().is_empty() {
            anyhow::bail!("Prompt file {} is empty", path.display());
        }

        info!(path = %path.display(), bytes = text.len(), "loaded system prompt");
        Ok(Self::from_text(&text, PromptSource::File(path.clone())))
    }

    /// Single-turn prompt: the system text, a blank line, then the visitor's message.
    pub fn compose(&self, user_message: &str) -> String {
        format!("{}\n\nUser: {}", self.text, user_message)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn source(&self) -> &PromptSource {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_prefixes_system_prompt() {
        let prompt = SystemPrompt::from_text("You are a guide.\n", PromptSource::Bundled);

        assert_eq!(
            prompt.compose("What projects has he built?"),
            "You are a guide.\n\nUser: What projects has he built?"
        );
    }

    #[test]
    fn test_bundled_profile_is_not_empty() {
        let prompt = SystemPrompt::bundled();
        assert!(prompt.text().contains("RESPONSE GUIDELINES"));
        assert_eq!(prompt.source(), &PromptSource::Bundled);
    }

    #[test]
    fn test_load_reads_configured_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("prompt.md");
        fs::write(&path, "Answer questions about Sam.\n\n").unwrap();

        let prompt = SystemPrompt::load(&PromptConfig {
            path: Some(path.clone()),
        })
        .unwrap();

        assert_eq!(prompt.text(), "Answer questions about Sam.");
        assert_eq!(prompt.source(), &PromptSource::File(path));
    }

    #[test]
    fn test_load_falls_back_when_file_missing() {
        let prompt = SystemPrompt::load(&PromptConfig {
            path: Some(PathBuf::from("/nonexistent/prompt.md")),
        })
        .unwrap();

        assert_eq!(prompt.source(), &PromptSource::Bundled);
    }

    #[test]
    fn test_load_rejects_empty_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("prompt.md");
        fs::write(&path, "  \n").unwrap();

        assert!(SystemPrompt::load(&PromptConfig { path: Some(path) }).is_err());
    }
}
