use crate::ui::theme::Theme;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash-exp:generateContent";

/// Main application configuration, stored in `~/.folio/config.toml`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Remote generative-text endpoint
    pub endpoint: EndpointConfig,

    /// Sampling parameters sent with every request
    pub generation: GenerationConfig,

    /// Where the system prompt comes from
    pub prompt: PromptConfig,

    /// UI preferences
    pub ui: UiConfig,

    /// Folio home directory (config and log file live here)
    #[serde(skip)]
    pub folio_home: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Full `generateContent` URL, or the URL of a proxy in front of it
    pub url: String,

    /// Inline API key. Prefer `api_key_env`.
    pub api_key: Option<String>,

    /// Environment variable consulted when `api_key` is unset
    pub api_key_env: String,

    /// The endpoint holds the credential itself; no key is sent
    pub proxy: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub temperature: f64,
    pub max_output_tokens: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// System prompt file. The bundled profile is used when unset.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub theme: Theme,
    /// Lifetime of an inline error notice
    pub notice_seconds: u64,
    /// Suggestions listed on the welcome screen
    pub quick_questions: Vec<String>,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            api_key_env: "GEMINI_API_KEY".to_string(),
            proxy: false,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_output_tokens: 1000,
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            theme: Theme::Light,
            notice_seconds: 5,
            quick_questions: vec![
                "What projects has he built?".to_string(),
                "What are his technical skills?".to_string(),
                "Tell me about his certifications".to_string(),
                "How can I contact him?".to_string(),
            ],
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("~"));

        Config {
            endpoint: EndpointConfig::default(),
            generation: GenerationConfig::default(),
            prompt: PromptConfig::default(),
            ui: UiConfig::default(),
            folio_home: home.join(".folio"),
        }
    }
}

impl Config {
    /// Load configuration from `~/.folio/config.toml`, writing defaults on first run
    pub fn load() -> Result<Self> {
        let home = dirs::home_dir().context("Could not find home directory")?;
        let folio_home = home.join(".folio");

        fs::create_dir_all(&folio_home).context("Failed to create .folio directory")?;

        let mut config = Self::load_from(&folio_home.join("config.toml"))?;
        config.folio_home = folio_home;
        Ok(config)
    }

    /// Load from an explicit path; a missing file yields (and writes) the defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = fs::read_to_string(path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")?
        } else {
            let config = Config::default();
            config.save_to(path)?;
            config
        };

        if let Some(parent) = path.parent() {
            config.folio_home = parent.to_path_buf();
        }
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// API key from config, falling back to the configured environment variable
    pub fn api_key(&self) -> Option<String> {
        self.endpoint
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| {
                std::env::var(&self.endpoint.api_key_env)
                    .ok()
                    .filter(|key| !key.trim().is_empty())
            })
    }

    /// Everything the widget needs but cannot find.
    pub fn setup_report(&self) -> SetupReport {
        let mut issues = Vec::new();

        if let Err(err) = reqwest::Url::parse(&self.endpoint.url) {
            issues.push(SetupIssue::InvalidEndpoint {
                url: self.endpoint.url.clone(),
                reason: err.to_string(),
            });
        }

        if !self.endpoint.proxy && self.api_key().is_none() {
            issues.push(SetupIssue::MissingCredential {
                env: self.endpoint.api_key_env.clone(),
            });
        }

        if let Some(path) = &self.prompt.path {
            if !path.is_file() {
                issues.push(SetupIssue::PromptFileMissing(path.clone()));
            }
        }

        SetupReport { issues }
    }
}

/// A single unmet requirement found while preparing the widget
#[derive(Debug, Clone, PartialEq)]
pub enum SetupIssue {
    MissingCredential { env: String },
    InvalidEndpoint { url: String, reason: String },
    PromptFileMissing(PathBuf),
}

impl SetupIssue {
    /// A missing prompt file degrades to the bundled profile; the rest abort startup.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, SetupIssue::PromptFileMissing(_))
    }
}

impl fmt::Display for SetupIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetupIssue::MissingCredential { env } => write!(
                f,
                "no API key: set endpoint.api_key, export {env}, or set endpoint.proxy = true"
            ),
            SetupIssue::InvalidEndpoint { url, reason } => {
                write!(f, "endpoint URL '{url}' is invalid: {reason}")
            }
            SetupIssue::PromptFileMissing(path) => write!(
                f,
                "prompt file {} not found, using the bundled profile",
                path.display()
            ),
        }
    }
}

/// Result of checking a [`Config`] before the widget is constructed
#[derive(Debug, Clone, Default)]
pub struct SetupReport {
    pub issues: Vec<SetupIssue>,
}

impl SetupReport {
    pub fn is_ready(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn is_fatal(&self) -> bool {
        self.issues.iter().any(SetupIssue::is_fatal)
    }

    pub fn fatal_issues(&self) -> impl Iterator<Item = &SetupIssue> {
        self.issues.iter().filter(|issue| issue.is_fatal())
    }
}
