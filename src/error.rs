//! Error types for command orchestration.
//!
//! This module provides structured error handling for the orchestration core,
//! including categorization, severity levels, and retry guidance.
//!
//! # Error Types
//!
//! The main error type is [`CommandError`], which covers all failure modes:
//! - Parser failures (timeout, unavailable, malformed output)
//! - Classification failures (no candidate, missing fields, low confidence)
//! - Handler failures (missing, transient, structured)
//! - Cancellation and configuration problems
//!
//! Everything else is a bug: the core never raises anything outside this
//! taxonomy.
//!
//! # Error Handling Example
//!
//! ```rust,no_run
//! use lifehub_core::{CommandError, CoreResult};
//!
//! fn handle_error(err: CommandError) {
//!     // Check if we should retry
//!     if err.is_retryable() {
//!         println!("Retryable error: {}", err);
//!         // Implement retry logic...
//!     }
//!
//!     // Get user-friendly message
//!     let user_msg = err.user_message();
//!     println!("Tell user: {}", user_msg);
//!
//!     // Check error category for routing
//!     match err.category() {
//!         lifehub_core::error::ErrorCategory::Transient => {
//!             println!("Temporary issue, try again later");
//!         }
//!         lifehub_core::error::ErrorCategory::Client => {
//!             println!("Fix the command and try again");
//!         }
//!         _ => {
//!             println!("System issue, contact support");
//!         }
//!     }
//! }
//! ```
//!
//! # Result Type
//!
//! Use [`CoreResult<T>`] as a convenient alias for `Result<T, CommandError>`.

use crate::catalog::{EventType, TargetModule};
use crate::logging::{log_debug, log_error, log_warn};
use thiserror::Error;

// ============================================================================
// Error categorization types
// ============================================================================

/// High-level categorization of errors for routing and handling decisions.
///
/// Use [`CommandError::category()`] to get the category for any error.
///
/// # Example
///
/// ```rust,no_run
/// use lifehub_core::{CommandError, error::ErrorCategory};
///
/// fn should_alert_ops(err: &CommandError) -> bool {
///     matches!(err.category(), ErrorCategory::Internal | ErrorCategory::External)
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// External collaborator failures (the parser endpoint, domain handlers).
    ///
    /// A dependency of the core had an issue. May be transient or indicate
    /// an outage in a peripheral module.
    External,

    /// Internal system errors (bugs, invariant violations).
    ///
    /// Something went wrong in the core itself. These should be logged
    /// and investigated.
    Internal,

    /// Client errors (unclassifiable commands, missing fields, bad config).
    ///
    /// The caller or operator made a mistake that they can fix (rephrase
    /// the command, supply the missing data, correct the catalog).
    Client,

    /// Temporary failures that should be retried.
    ///
    /// Handler timeouts and transient unavailability. Retry with
    /// exponential backoff per the dispatch policy.
    Transient,
}

/// Severity level for logging and alerting decisions.
///
/// Use [`CommandError::severity()`] to get the severity for any error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// System is unusable or data integrity is at risk.
    Critical,

    /// Action failed but system is stable.
    Error,

    /// Unexpected but recoverable situation.
    Warning,

    /// Expected failure (e.g., validation error on a sparse command).
    Info,
}

// ============================================================================
// Command error types
// ============================================================================

/// Convenient result type for orchestration operations.
///
/// Alias for `Result<T, CommandError>`. Use this throughout your application
/// for consistent error handling.
pub type CoreResult<T> = std::result::Result<T, CommandError>;

/// Errors that can occur while orchestrating a command.
///
/// Each variant includes relevant context and can be:
/// - Categorized via [`category()`](Self::category)
/// - Assessed for severity via [`severity()`](Self::severity)
/// - Checked for retryability via [`is_retryable()`](Self::is_retryable)
/// - Converted to user-friendly messages via [`user_message()`](Self::user_message)
///
/// # Creating Errors
///
/// Use the constructor methods which automatically log the error:
///
/// ```rust
/// use lifehub_core::CommandError;
///
/// // These methods log automatically
/// let err = CommandError::parser_timeout(2000);
/// let err = CommandError::configuration("duplicate event type in catalog");
/// ```
///
/// # Error Categories
///
/// | Variant | Category | Retryable |
/// |---------|----------|-----------|
/// | `ParserTimeout` | External | No (classifier proceeds without parser) |
/// | `ParserUnavailable` | External | No (classifier proceeds without parser) |
/// | `ParserMalformed` | External | No (classifier proceeds without parser) |
/// | `Unclassifiable` | Client | No |
/// | `Validation` | Client | No |
/// | `LowConfidence` | Client | No |
/// | `HandlerNotFound` | Client | No |
/// | `HandlerTimeout` | Transient | Yes |
/// | `HandlerUnavailable` | Transient | Yes |
/// | `Handler` | External | No |
/// | `Cancelled` | Client | No |
/// | `Configuration` | Client | No |
#[derive(Error, Debug)]
pub enum CommandError {
    /// The parser endpoint did not answer within its deadline.
    ///
    /// Non-fatal for the command: the classifier proceeds on keyword
    /// evidence alone and the failure is surfaced as a diagnostic.
    #[error("Parser timed out after {timeout_ms}ms")]
    ParserTimeout {
        /// The per-call deadline that was exceeded.
        timeout_ms: u64,
    },

    /// The parser endpoint could not be reached or answered with a
    /// server-side failure.
    #[error("Parser unavailable: {message}")]
    ParserUnavailable {
        /// Description of the transport or upstream failure.
        message: String,
    },

    /// The parser answered, but its output failed schema validation.
    ///
    /// The parser is treated as untrusted: any field may be absent or of
    /// the wrong type, and unknown event types are dropped with a
    /// diagnostic rather than an error. This variant means the payload
    /// was not recoverable at all.
    #[error("Parser output malformed: {message}")]
    ParserMalformed {
        /// Details about the validation failure.
        message: String,
    },

    /// Neither keyword scan nor parser produced any candidate event type.
    #[error("Could not classify command: {utterance_preview}")]
    Unclassifiable {
        /// Leading fragment of the utterance, for diagnostics.
        utterance_preview: String,
    },

    /// Required fields are still missing after derivation.
    #[error("Validation failed for {event_type}: missing {missing:?}")]
    Validation {
        /// The event type that failed validation.
        event_type: EventType,
        /// The required fields that are absent, in catalog order.
        missing: Vec<String>,
    },

    /// The best candidate scored below the confidence threshold without
    /// parser corroboration.
    #[error("Classification confidence {confidence:.2} below threshold {threshold:.2}")]
    LowConfidence {
        /// The score the best candidate achieved.
        confidence: f64,
        /// The configured minimum.
        threshold: f64,
    },

    /// No handler is registered for a required module.
    #[error("No handler registered for module {module}")]
    HandlerNotFound {
        /// The module the event targets.
        module: TargetModule,
    },

    /// A handler did not answer within its computed deadline.
    ///
    /// Retried per the dispatch policy.
    #[error("Handler for {module} timed out after {timeout_ms}ms")]
    HandlerTimeout {
        /// The module whose handler timed out.
        module: TargetModule,
        /// The per-handler deadline that was exceeded.
        timeout_ms: u64,
    },

    /// A handler reported transient unavailability.
    ///
    /// Retried per the dispatch policy.
    #[error("Handler for {module} unavailable: {message}")]
    HandlerUnavailable {
        /// The module whose handler is unavailable.
        module: TargetModule,
        /// Description of the transient condition.
        message: String,
    },

    /// A handler returned a structured error.
    ///
    /// Surfaced in that handler's result, never retried.
    #[error("Handler error [{kind}]: {message}")]
    Handler {
        /// Handler-defined error kind (e.g. "ledger_closed").
        kind: String,
        /// Handler-supplied description.
        message: String,
    },

    /// The caller cancelled the command or the overall deadline expired.
    #[error("Command cancelled")]
    Cancelled,

    /// Startup configuration or catalog validation failed.
    ///
    /// Catalog errors (duplicate event types, unknown module, required
    /// field not identifiable, circular secondary rule) are fatal.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration problem.
        message: String,
    },
}

impl CommandError {
    /// Get the error category for routing and handling decisions.
    ///
    /// - `Client`: fix the command, catalog, or registration
    /// - `External`: a collaborator failed, may need ops attention
    /// - `Transient`: retry with backoff
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ParserTimeout { .. } => ErrorCategory::External,
            Self::ParserUnavailable { .. } => ErrorCategory::External,
            Self::ParserMalformed { .. } => ErrorCategory::External,
            Self::Unclassifiable { .. } => ErrorCategory::Client,
            Self::Validation { .. } => ErrorCategory::Client,
            Self::LowConfidence { .. } => ErrorCategory::Client,
            Self::HandlerNotFound { .. } => ErrorCategory::Client,
            Self::HandlerTimeout { .. } => ErrorCategory::Transient,
            Self::HandlerUnavailable { .. } => ErrorCategory::Transient,
            Self::Handler { .. } => ErrorCategory::External,
            Self::Cancelled => ErrorCategory::Client,
            Self::Configuration { .. } => ErrorCategory::Client,
        }
    }

    /// Get the error severity for logging and alerting.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::ParserTimeout { .. } => ErrorSeverity::Warning,
            Self::ParserUnavailable { .. } => ErrorSeverity::Warning,
            Self::ParserMalformed { .. } => ErrorSeverity::Warning,
            Self::Unclassifiable { .. } => ErrorSeverity::Info,
            Self::Validation { .. } => ErrorSeverity::Info,
            Self::LowConfidence { .. } => ErrorSeverity::Info,
            Self::HandlerNotFound { .. } => ErrorSeverity::Error,
            Self::HandlerTimeout { .. } => ErrorSeverity::Warning,
            Self::HandlerUnavailable { .. } => ErrorSeverity::Warning,
            Self::Handler { .. } => ErrorSeverity::Error,
            Self::Cancelled => ErrorSeverity::Info,
            Self::Configuration { .. } => ErrorSeverity::Error,
        }
    }

    /// Whether this error is transient and should trigger a retry.
    ///
    /// Returns `true` for handler timeouts and transient handler
    /// unavailability. Parser failures are not retried here: the
    /// classifier proceeds without parser input instead.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::HandlerTimeout { .. } | Self::HandlerUnavailable { .. }
        )
    }

    /// Convert to a user-friendly message suitable for display.
    ///
    /// Returns a message that's safe to show to end users - technical
    /// details and internal information are stripped or generalized.
    pub fn user_message(&self) -> String {
        match self {
            Self::ParserTimeout { .. } | Self::ParserUnavailable { .. } => {
                "The language service is slow right now; your command was handled from keywords"
                    .to_string()
            }
            Self::ParserMalformed { .. } => {
                "The language service gave an unusable answer; your command was handled from keywords"
                    .to_string()
            }
            Self::Unclassifiable { .. } => {
                "I couldn't work out what you want to record. Try rephrasing the command".to_string()
            }
            Self::Validation { missing, .. } => {
                format!("Some details are missing: {}", missing.join(", "))
            }
            Self::LowConfidence { .. } => {
                "I'm not confident enough about what you meant. Try being more specific".to_string()
            }
            Self::HandlerNotFound { module } => {
                format!("The {module} module is not available")
            }
            Self::HandlerTimeout { .. } | Self::HandlerUnavailable { .. } => {
                "A module is busy. Please try again".to_string()
            }
            Self::Handler { message, .. } => message.clone(),
            Self::Cancelled => "The command was cancelled".to_string(),
            Self::Configuration { .. } => {
                "Service configuration issue. Please check your settings".to_string()
            }
        }
    }

    // =========================================================================
    // Constructor methods with automatic logging
    // =========================================================================
    //
    // These methods automatically log the error at the appropriate level.
    // Use them instead of constructing variants directly.

    /// Create a parser timeout error (logs at WARN level).
    pub fn parser_timeout(timeout_ms: u64) -> Self {
        log_warn!(
            error_type = "parser_timeout",
            timeout_ms = timeout_ms,
            "Parser call timed out"
        );
        Self::ParserTimeout { timeout_ms }
    }

    pub fn parser_unavailable(message: impl Into<String>) -> Self {
        let message = message.into();
        log_warn!(
            error_type = "parser_unavailable",
            message = %message,
            "Parser endpoint unavailable"
        );
        Self::ParserUnavailable { message }
    }

    pub fn parser_malformed(message: impl Into<String>) -> Self {
        let message = message.into();
        log_warn!(
            error_type = "parser_malformed",
            message = %message,
            "Parser output failed schema validation"
        );
        Self::ParserMalformed { message }
    }

    pub fn unclassifiable(utterance: &str) -> Self {
        let utterance_preview: String = utterance.chars().take(80).collect();
        log_debug!(
            error_type = "unclassifiable",
            utterance_preview = %utterance_preview,
            "No candidate event type for command"
        );
        Self::Unclassifiable { utterance_preview }
    }

    pub fn validation(event_type: EventType, missing: Vec<String>) -> Self {
        log_debug!(
            error_type = "validation",
            event_type = %event_type,
            missing = ?missing,
            "Required fields missing after derivation"
        );
        Self::Validation {
            event_type,
            missing,
        }
    }

    pub fn low_confidence(confidence: f64, threshold: f64) -> Self {
        log_debug!(
            error_type = "low_confidence",
            confidence = confidence,
            threshold = threshold,
            "Classification scored below confidence threshold"
        );
        Self::LowConfidence {
            confidence,
            threshold,
        }
    }

    pub fn handler_not_found(module: TargetModule) -> Self {
        log_error!(
            error_type = "handler_not_found",
            module = %module,
            "No handler registered for module"
        );
        Self::HandlerNotFound { module }
    }

    pub fn handler_timeout(module: TargetModule, timeout_ms: u64) -> Self {
        log_warn!(
            error_type = "handler_timeout",
            module = %module,
            timeout_ms = timeout_ms,
            "Handler invocation timed out"
        );
        Self::HandlerTimeout { module, timeout_ms }
    }

    pub fn handler_unavailable(module: TargetModule, message: impl Into<String>) -> Self {
        let message = message.into();
        log_warn!(
            error_type = "handler_unavailable",
            module = %module,
            message = %message,
            "Handler reported transient unavailability"
        );
        Self::HandlerUnavailable { module, message }
    }

    pub fn handler(kind: impl Into<String>, message: impl Into<String>) -> Self {
        let kind = kind.into();
        let message = message.into();
        log_error!(
            error_type = "handler_error",
            kind = %kind,
            message = %message,
            "Handler returned structured error"
        );
        Self::Handler { kind, message }
    }

    pub fn cancelled() -> Self {
        log_debug!(error_type = "cancelled", "Command cancelled by caller");
        Self::Cancelled
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        let message = message.into();
        log_error!(
            error_type = "configuration",
            message = %message,
            "Configuration validation failed"
        );
        Self::Configuration { message }
    }

    /// Short machine-readable kind, used in handler result payloads.
    pub fn kind(&self) -> &str {
        match self {
            Self::ParserTimeout { .. } => "parser_timeout",
            Self::ParserUnavailable { .. } => "parser_unavailable",
            Self::ParserMalformed { .. } => "parser_malformed",
            Self::Unclassifiable { .. } => "unclassifiable",
            Self::Validation { .. } => "validation",
            Self::LowConfidence { .. } => "low_confidence",
            Self::HandlerNotFound { .. } => "handler_not_found",
            Self::HandlerTimeout { .. } => "timeout",
            Self::HandlerUnavailable { .. } => "unavailable",
            Self::Handler { kind, .. } => kind,
            Self::Cancelled => "cancelled",
            Self::Configuration { .. } => "configuration",
        }
    }
}
