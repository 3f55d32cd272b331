//! Configuration management for folio
//!
//! Handles the answering backend choice and persistence of user preferences.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::llm::openai::DEFAULT_BASE_URL;

/// Which service answers questions
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// An HTTP route that holds the model credentials (default)
    #[default]
    Endpoint,
    /// An OpenAI-compatible Chat Completions API, called directly
    OpenAi,
}

impl Backend {
    /// Display name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Endpoint => "endpoint",
            Self::OpenAi => "openai",
        }
    }

    /// Get all available options
    pub fn all() -> Vec<Self> {
        vec![Self::Endpoint, Self::OpenAi]
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Endpoint => "Answering endpoint (credentials stay on the server)",
            Self::OpenAi => "OpenAI-compatible API (needs an API key)",
        }
    }
}

/// Settings for the answering backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnsweringConfig {
    pub backend: Backend,
    /// URL of the answering endpoint
    pub endpoint: String,
    /// Base URL of the OpenAI-compatible API
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
    pub timeout_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for AnsweringConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            endpoint: "http://localhost:3000/api/chat".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.3,
            timeout_secs: 120,
            api_key: None,
        }
    }
}

/// Settings for PDF extraction
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PdfConfig {
    /// Version the background worker is pinned to. Defaults to the text
    /// layer's own version.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker_version: Option<String>,
}

/// folio configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Version of config schema (for future migrations)
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub answering: AnsweringConfig,
    #[serde(default)]
    pub pdf: PdfConfig,
}

fn default_version() -> u32 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: 1,
            answering: AnsweringConfig::default(),
            pdf: PdfConfig::default(),
        }
    }
}

impl Config {
    /// Get the config file path (~/.folio/config.toml)
    pub fn path() -> Result<PathBuf> {
        Ok(folio_dir()?.join("config.toml"))
    }

    /// Check if config exists (i.e., not first run)
    pub fn exists() -> bool {
        Self::path().map(|p| p.exists()).unwrap_or(false)
    }

    /// Load config from disk, or return None if it doesn't exist
    pub fn load() -> Result<Option<Self>> {
        let path = Self::path()?;
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path).context("Failed to read config file")?;
        let config = Self::parse(&content)?;
        Ok(Some(config))
    }

    /// Load config from disk, falling back to defaults, with environment
    /// overrides applied.
    pub fn load_or_default() -> Result<Self> {
        let mut config = Self::load()?.unwrap_or_default();
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file")
    }

    /// Save config to disk
    pub fn save(&self) -> Result<()> {
        let path = Self::path()?;

        // Ensure directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Apply `FOLIO_API_KEY` / `OPENAI_API_KEY` and `FOLIO_ENDPOINT`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("FOLIO_API_KEY").or_else(|| non_empty("OPENAI_API_KEY")) {
            self.answering.api_key = Some(key);
        }
        if let Some(endpoint) = non_empty("FOLIO_ENDPOINT") {
            self.answering.endpoint = endpoint;
        }
    }
}

/// Get the base folio directory path (~/.folio)
pub fn folio_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".folio"))
}
