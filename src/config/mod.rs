//! Configuration loading and validation.
//!
//! Loads configuration from `./argos.toml` (or `$ARGOS_CONFIG_PATH`).
//! Environment variables override file values; file values override defaults.
//!
//! Precedence: env vars > config file > defaults.
//!
//! The resulting [`ArgosConfig`] is constructed once at startup and handed
//! to the tutor and report components; nothing reads it from global state.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Prompt version stamped into exports when none is configured.
pub const DEFAULT_PROMPT_VERSION: &str = "2025-12-19_argos_v8_structured_criteria";

// ── Top-level config ────────────────────────────────────────────

/// Top-level configuration loaded from TOML.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ArgosConfig {
    /// Tutor persona settings (`[tutor]`).
    pub tutor: TutorConfig,
    /// Generative model settings (`[models]`).
    pub models: ModelsConfig,
    /// Per-turn exchange limits (`[exchange]`).
    pub exchange: ExchangeConfig,
    /// Final report settings (`[analysis]`).
    pub analysis: AnalysisConfig,
    /// Logging settings (`[logging]`).
    pub logging: LoggingConfig,
}

impl ArgosConfig {
    /// Load configuration with precedence: env vars > TOML file > defaults.
    ///
    /// Config file path: `$ARGOS_CONFIG_PATH` or `./argos.toml`.
    /// If the file does not exist, returns defaults.
    ///
    /// # Errors
    ///
    /// Returns an error when the file exists but cannot be read or parsed,
    /// or when the merged values fail [`ArgosConfig::validate`].
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from_file()?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load from TOML file only, no env overrides.
    fn load_from_file() -> Result<Self> {
        let path = Self::config_path_with(|key| std::env::var(key).ok());
        match std::fs::read_to_string(&path) {
            Ok(contents) => {
                tracing::info!(path = %path.display(), "loading config from file");
                Self::from_toml(&contents)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("no config file found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "failed to read config file {}: {e}",
                path.display()
            )),
        }
    }

    /// Resolve the config path using a custom env resolver.
    pub fn config_path_with(env: impl Fn(&str) -> Option<String>) -> PathBuf {
        env("ARGOS_CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("argos.toml"))
    }

    /// Apply environment variable overrides (env > config > defaults).
    ///
    /// Takes a resolver function for testability (avoids `set_var` in tests).
    pub fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        // Models.
        if let Some(v) = env("GENAI_CHAT_MODEL") {
            self.models.chat_model = v;
        }
        if let Some(v) = env("GENAI_ANALYSIS_MODEL") {
            self.models.analysis_model = v;
        }
        if let Some(v) = env("ARGOS_API_BASE") {
            self.models.api_base = v;
        }
        if let Some(v) = env("GENAI_CHAT_TEMPERATURE") {
            match v.parse() {
                Ok(t) => self.models.chat_temperature = t,
                Err(_) => tracing::warn!(
                    var = "GENAI_CHAT_TEMPERATURE",
                    value = %v,
                    "ignoring invalid env override"
                ),
            }
        }
        if let Some(v) = env("GENAI_ANALYSIS_TEMPERATURE") {
            match v.parse() {
                Ok(t) => self.models.analysis_temperature = t,
                Err(_) => tracing::warn!(
                    var = "GENAI_ANALYSIS_TEMPERATURE",
                    value = %v,
                    "ignoring invalid env override"
                ),
            }
        }

        // Tutor persona.
        if let Some(v) = env("DES_TUTOR_NAME").filter(|v| !v.trim().is_empty()) {
            self.tutor.name = v;
        }
        if let Some(v) = env("DES_PROMPT_VERSION").filter(|v| !v.trim().is_empty()) {
            self.tutor.prompt_version = v;
        }
    }

    /// Parse a TOML string into config.
    ///
    /// # Errors
    ///
    /// Returns an error when the TOML is malformed or has wrong value types.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: ArgosConfig =
            toml::from_str(toml_str).context("failed to parse config TOML")?;
        Ok(config)
    }

    /// Reject values the components cannot run with.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("models.chat_temperature", self.models.chat_temperature),
            ("models.analysis_temperature", self.models.analysis_temperature),
        ] {
            if !(0.0..=2.0).contains(&value) {
                anyhow::bail!("{name} must be within [0, 2], got {value}");
            }
        }
        if self.models.chat_model.trim().is_empty() || self.models.analysis_model.trim().is_empty()
        {
            anyhow::bail!("model identifiers must not be empty");
        }
        if self.exchange.max_attempts == 0 {
            anyhow::bail!("exchange.max_attempts must be at least 1");
        }
        if self.exchange.timeout_ms == 0 || self.analysis.timeout_ms == 0 {
            anyhow::bail!("timeouts must be greater than zero");
        }
        if self.exchange.min_message_chars > self.exchange.max_message_chars {
            anyhow::bail!(
                "exchange.min_message_chars ({}) exceeds exchange.max_message_chars ({})",
                self.exchange.min_message_chars,
                self.exchange.max_message_chars
            );
        }
        if self.tutor.name.trim().is_empty() {
            anyhow::bail!("tutor.name must not be empty");
        }
        Ok(())
    }
}

// ── Tutor config ────────────────────────────────────────────────

/// Tutor persona settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TutorConfig {
    /// Display name the tutor introduces itself with.
    pub name: String,
    /// Prompt version stamp recorded in exports.
    pub prompt_version: String,
}

impl Default for TutorConfig {
    fn default() -> Self {
        Self {
            name: "ARGOS".to_owned(),
            prompt_version: DEFAULT_PROMPT_VERSION.to_owned(),
        }
    }
}

// ── Models config ───────────────────────────────────────────────

/// Generative model endpoints and sampling settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// API base URL (without the `/models/...` suffix).
    pub api_base: String,
    /// Model used for the live dialogue.
    pub chat_model: String,
    /// Model used for the final report.
    pub analysis_model: String,
    /// Sampling temperature of the dialogue.
    pub chat_temperature: f32,
    /// Sampling temperature of the report.
    pub analysis_temperature: f32,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            api_base: "https://generativelanguage.googleapis.com/v1beta".to_owned(),
            chat_model: "gemini-3-pro-preview".to_owned(),
            analysis_model: "gemini-3-pro-preview".to_owned(),
            chat_temperature: 0.7,
            analysis_temperature: 0.3,
        }
    }
}

// ── Exchange config ─────────────────────────────────────────────

/// Limits applied to each forwarded student turn.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    /// Attempts before giving up (first call included).
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles for each further attempt.
    pub base_delay_ms: u64,
    /// Upper bound on a single attempt.
    pub timeout_ms: u64,
    /// Minimum message length in characters, after trimming.
    pub min_message_chars: usize,
    /// Maximum message length in characters.
    pub max_message_chars: usize,
}

impl ExchangeConfig {
    /// Per-attempt timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Base backoff delay as a [`Duration`].
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1_000,
            timeout_ms: 30_000,
            min_message_chars: 1,
            max_message_chars: 2_000,
        }
    }
}

// ── Analysis config ─────────────────────────────────────────────

/// Final report settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Upper bound on the single analysis call.
    pub timeout_ms: u64,
}

impl AnalysisConfig {
    /// Analysis timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self { timeout_ms: 120_000 }
    }
}

// ── Logging config ──────────────────────────────────────────────

/// Logging settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
    /// Directory for JSON log files; stderr only when unset.
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            dir: None,
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────
