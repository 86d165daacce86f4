//! # lifehub-core
//!
//! Command orchestration core for the LifeHub life-management platform.
//!
//! The core accepts free-text user commands, classifies them into one or
//! more typed domain events, enriches each event with conditional
//! derivation rules, then dispatches a primary plus zero or more
//! secondary events to domain handlers and composes a single response.
//!
//! ## Key Features
//!
//! - **Hybrid classification**: fuses an external LLM's interpretation
//!   with a deterministic keyword/rule engine; explicit keywords win
//! - **Typed event schema**: per-type mandatory fields, optional fields,
//!   and algebraic derivation rules (`cost = gallons × price`)
//! - **Coordinated fan-out**: one utterance yields a primary event plus
//!   secondaries across independent modules (a refuel logs a fleet event
//!   *and* an expense)
//! - **Partial-failure semantics**: handlers are independently committed;
//!   a failed secondary degrades the command to `partial`, never rolls
//!   the primary back
//!
//! ## Example
//!
//! ```rust,no_run
//! use lifehub_core::{
//!     CommandOrchestrator, EventCatalog, HandlerRegistry, HttpParserClient,
//!     OrchestratorConfig,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), lifehub_core::CommandError> {
//! let config = OrchestratorConfig::from_env()?;
//! let catalog = Arc::new(EventCatalog::builtin()?);
//! let parser = Arc::new(HttpParserClient::new(config.parser.clone(), Arc::clone(&catalog))?);
//! let registry = Arc::new(HandlerRegistry::new()); // register domain handlers here
//!
//! let orchestrator = CommandOrchestrator::new(config, catalog, parser, registry);
//! let result = orchestrator
//!     .process_command("Filled up gas, 12 gallons, $45, odometer 45000", None)
//!     .await?;
//! println!("status: {}, events: {}", result.status, result.events_processed);
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module declarations
// =============================================================================

pub mod catalog;
pub mod classifier;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod fields;
pub mod orchestrator;
pub mod parser;
pub mod registry;

pub(crate) mod extract;
pub(crate) mod logging;

#[cfg(test)]
pub mod tests;

// =============================================================================
// Public API re-exports
// =============================================================================

// Orchestrator
pub use orchestrator::CommandOrchestrator;

// Configuration
pub use config::{ClassifierConfig, DispatchConfig, OrchestratorConfig, ParserConfig};

// Errors
pub use error::{CommandError, CoreResult};

// Catalog - the static event registry
pub use catalog::{
    DerivationRule, DeriveOp, EventCatalog, EventCategory, EventDescriptor, EventType, FieldKind,
    FieldPattern, FieldSpec, KeywordMatch, SecondaryRule, TargetModule,
};

// Field values
pub use fields::{ExtractedData, FieldValue};

// Classification
pub use classifier::{
    ClassificationResult, ClassificationSource, ClassifiedEvent, Classifier, DEFAULT_ACTION,
};

// Parser boundary
pub use parser::{HttpParserClient, OutputScrubber, ParserClient, ParserOutput};

// Handlers and dispatch
pub use dispatch::{
    ClassificationSummary, CommandResult, CommandStatus, Dispatcher, EventOutcome,
};
pub use registry::{Handler, HandlerFailure, HandlerRegistry, HandlerResult};

// Re-export commonly used external types
pub use async_trait::async_trait;
pub use tokio_util::sync::CancellationToken;
