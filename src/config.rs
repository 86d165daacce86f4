//! Configuration types for the orchestration core.
//!
//! This module provides configuration structures for the three tunable
//! stages of the pipeline: the parser client, the classifier, and the
//! dispatcher. All defaults match the platform's documented values, so
//! `OrchestratorConfig::default()` is a working production configuration.
//!
//! # Quick Start
//!
//! ```rust
//! use lifehub_core::config::OrchestratorConfig;
//!
//! // All defaults
//! let config = OrchestratorConfig::default();
//! assert_eq!(config.parser.timeout_ms, 2000);
//! assert_eq!(config.dispatch.max_parallel, 8);
//! ```
//!
//! # From Environment Variables
//!
//! ```rust,no_run
//! use lifehub_core::config::OrchestratorConfig;
//!
//! // Reads LIFEHUB_* variables, falling back to defaults
//! let config = OrchestratorConfig::from_env()?;
//! # Ok::<(), lifehub_core::CommandError>(())
//! ```
//!
//! | Env var | Field | Default |
//! |---------|-------|---------|
//! | `LIFEHUB_PARSER_BASE_URL` | `parser.base_url` | `http://localhost:11434` |
//! | `LIFEHUB_PARSER_API_KEY` | `parser.api_key` | (none) |
//! | `LIFEHUB_PARSER_MODEL` | `parser.model` | `llama3` |
//! | `LIFEHUB_PARSER_TIMEOUT_MS` | `parser.timeout_ms` | 2000 |
//! | `LIFEHUB_PRIMARY_RETRY` | `dispatch.primary_retry` | 2 |
//! | `LIFEHUB_SECONDARY_RETRY` | `dispatch.secondary_retry` | 1 |
//! | `LIFEHUB_BACKOFF_INITIAL_MS` | `dispatch.backoff_initial_ms` | 100 |
//! | `LIFEHUB_BACKOFF_FACTOR` | `dispatch.backoff_factor` | 2.0 |
//! | `LIFEHUB_BACKOFF_MAX_MS` | `dispatch.backoff_max_ms` | 1000 |
//! | `LIFEHUB_MAX_PARALLEL` | `dispatch.max_parallel` | 8 |
//! | `LIFEHUB_MIN_CONFIDENCE` | `classifier.min_confidence` | 0.5 |
//! | `LIFEHUB_SECONDARY_PENALTY` | `classifier.secondary_confidence_penalty` | 0.05 |
//! | `LIFEHUB_COMMAND_TIMEOUT_MS` | `command_timeout_ms` | 10000 |

use crate::error::{CommandError, CoreResult};
use crate::logging::log_debug;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Configuration for the parser client.
///
/// The parser is an OpenAI-compatible chat-completions endpoint. Local
/// deployments (Ollama-style) need no API key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserConfig {
    /// Base URL of the parser endpoint.
    pub base_url: String,

    /// API key, if the endpoint requires one.
    pub api_key: Option<String>,

    /// Model name passed through to the endpoint.
    pub model: String,

    /// Per-call deadline in milliseconds.
    pub timeout_ms: u64,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            api_key: None,
            model: "llama3".to_string(),
            timeout_ms: 2_000,
        }
    }
}

impl ParserConfig {
    /// The per-call deadline as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Configuration for the classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Minimum confidence for a primary event to be dispatched.
    pub min_confidence: f64,

    /// Penalty subtracted from the primary's confidence for each secondary.
    pub secondary_confidence_penalty: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.5,
            secondary_confidence_penalty: 0.05,
        }
    }
}

/// Configuration for the dispatcher.
///
/// # Defaults
///
/// | Parameter | Default | Description |
/// |-----------|---------|-------------|
/// | `primary_retry` | 2 | Retries for the primary on retriable errors |
/// | `secondary_retry` | 1 | Retries per secondary on retriable errors |
/// | `backoff_initial_ms` | 100 | First retry delay |
/// | `backoff_factor` | 2.0 | Exponential backoff multiplier |
/// | `backoff_max_ms` | 1000 | Delay cap |
/// | `max_parallel` | 8 | Fan-out parallelism across all commands |
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Retries for the primary handler on retriable errors.
    pub primary_retry: u32,

    /// Retries per secondary handler on retriable errors.
    pub secondary_retry: u32,

    /// Initial backoff delay in milliseconds.
    pub backoff_initial_ms: u64,

    /// Multiplier for exponential backoff.
    pub backoff_factor: f64,

    /// Maximum backoff delay in milliseconds.
    pub backoff_max_ms: u64,

    /// Degree of parallelism for secondary fan-out, shared across all
    /// in-flight commands.
    pub max_parallel: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            primary_retry: 2,
            secondary_retry: 1,
            backoff_initial_ms: 100,
            backoff_factor: 2.0,
            backoff_max_ms: 1_000,
            max_parallel: 8,
        }
    }
}

/// System-wide orchestrator configuration.
///
/// Combines the per-stage configurations with the overall command deadline
/// applied by [`CommandOrchestrator::process_command`](crate::CommandOrchestrator::process_command).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Parser client settings.
    #[serde(default)]
    pub parser: ParserConfig,

    /// Classifier settings.
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Dispatcher settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Overall deadline for a command when the caller supplies none,
    /// in milliseconds.
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,
}

fn default_command_timeout_ms() -> u64 {
    10_000
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            parser: ParserConfig::default(),
            classifier: ClassifierConfig::default(),
            dispatch: DispatchConfig::default(),
            command_timeout_ms: default_command_timeout_ms(),
        }
    }
}

impl OrchestratorConfig {
    /// Load configuration from `LIFEHUB_*` environment variables,
    /// falling back to defaults for anything unset.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Configuration`] if a variable is set but
    /// cannot be parsed as its field's type.
    pub fn from_env() -> CoreResult<Self> {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("LIFEHUB_PARSER_BASE_URL") {
            config.parser.base_url = url;
        }
        if let Ok(key) = std::env::var("LIFEHUB_PARSER_API_KEY") {
            config.parser.api_key = Some(key);
        }
        if let Ok(model) = std::env::var("LIFEHUB_PARSER_MODEL") {
            config.parser.model = model;
        }
        config.parser.timeout_ms = env_parsed("LIFEHUB_PARSER_TIMEOUT_MS", config.parser.timeout_ms)?;

        config.dispatch.primary_retry =
            env_parsed("LIFEHUB_PRIMARY_RETRY", config.dispatch.primary_retry)?;
        config.dispatch.secondary_retry =
            env_parsed("LIFEHUB_SECONDARY_RETRY", config.dispatch.secondary_retry)?;
        config.dispatch.backoff_initial_ms =
            env_parsed("LIFEHUB_BACKOFF_INITIAL_MS", config.dispatch.backoff_initial_ms)?;
        config.dispatch.backoff_factor =
            env_parsed("LIFEHUB_BACKOFF_FACTOR", config.dispatch.backoff_factor)?;
        config.dispatch.backoff_max_ms =
            env_parsed("LIFEHUB_BACKOFF_MAX_MS", config.dispatch.backoff_max_ms)?;
        config.dispatch.max_parallel =
            env_parsed("LIFEHUB_MAX_PARALLEL", config.dispatch.max_parallel)?;

        config.classifier.min_confidence =
            env_parsed("LIFEHUB_MIN_CONFIDENCE", config.classifier.min_confidence)?;
        config.classifier.secondary_confidence_penalty = env_parsed(
            "LIFEHUB_SECONDARY_PENALTY",
            config.classifier.secondary_confidence_penalty,
        )?;

        config.command_timeout_ms =
            env_parsed("LIFEHUB_COMMAND_TIMEOUT_MS", config.command_timeout_ms)?;

        config.validate()?;

        log_debug!(
            parser_base_url = %config.parser.base_url,
            parser_model = %config.parser.model,
            max_parallel = config.dispatch.max_parallel,
            "Orchestrator configuration loaded from environment"
        );

        Ok(config)
    }

    /// Validate cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Configuration`] if:
    /// - `min_confidence` is outside `[0, 1]`
    /// - `secondary_confidence_penalty` is negative
    /// - `max_parallel` is zero
    /// - `backoff_factor` is below 1.0
    pub fn validate(&self) -> CoreResult<()> {
        if !(0.0..=1.0).contains(&self.classifier.min_confidence) {
            return Err(CommandError::configuration(
                "classifier.min_confidence must be within [0, 1]",
            ));
        }
        if self.classifier.secondary_confidence_penalty < 0.0 {
            return Err(CommandError::configuration(
                "classifier.secondary_confidence_penalty must not be negative",
            ));
        }
        if self.dispatch.max_parallel == 0 {
            return Err(CommandError::configuration(
                "dispatch.max_parallel must be at least 1",
            ));
        }
        if self.dispatch.backoff_factor < 1.0 {
            return Err(CommandError::configuration(
                "dispatch.backoff_factor must be at least 1.0",
            ));
        }
        Ok(())
    }

    /// The overall command deadline as a [`Duration`].
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }
}

/// Parse an environment variable, keeping `fallback` when unset.
fn env_parsed<T: FromStr>(name: &str, fallback: T) -> CoreResult<T> {
    match std::env::var(name) {
        Ok(raw) => raw.parse().map_err(|_| {
            CommandError::configuration(format!("{name} has unparseable value: {raw}"))
        }),
        Err(_) => Ok(fallback),
    }
}
