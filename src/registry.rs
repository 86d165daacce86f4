//! Handler registry: maps target modules to their domain handlers.
//!
//! Each domain module registers its handler at startup. The dispatcher
//! looks handlers up per event and invokes them through one uniform
//! contract; the registry itself is immutable once wired and is read
//! without locks behind an `Arc`.

use crate::catalog::TargetModule;
use crate::classifier::ClassifiedEvent;
use crate::error::{CommandError, CoreResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Structured error a handler reports inside its result.
///
/// `kind` is handler-defined (e.g. `ledger_closed`); infrastructure
/// failures (timeout, unavailability) travel as [`CommandError`] instead
/// and are subject to retry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerFailure {
    pub kind: String,
    pub message: String,
}

/// Uniform handler result: `ok` plus either data or a structured error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandlerResult {
    pub ok: bool,
    #[serde(default)]
    pub data: serde_json::Map<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<HandlerFailure>,
}

impl HandlerResult {
    /// A successful result carrying `data`.
    pub fn success(data: serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            ok: true,
            data,
            error: None,
        }
    }

    /// A successful result with no payload.
    pub fn empty() -> Self {
        Self::success(serde_json::Map::new())
    }

    /// A structured business failure.
    pub fn failure(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: serde_json::Map::new(),
            error: Some(HandlerFailure {
                kind: kind.into(),
                message: message.into(),
            }),
        }
    }

    /// Render an infrastructure error as a failed result, preserving its
    /// machine-readable kind.
    pub fn from_command_error(error: &CommandError) -> Self {
        Self {
            ok: false,
            data: serde_json::Map::new(),
            error: Some(HandlerFailure {
                kind: error.kind().to_string(),
                message: error.to_string(),
            }),
        }
    }
}

/// The uniform handler contract.
///
/// `deadline` is the budget the dispatcher computed for this invocation;
/// handlers should give up by then. Handlers are expected to be idempotent
/// per `event.event_id` (retries reuse the same id), though the core does
/// not enforce it.
///
/// Return `Ok(HandlerResult { ok: false, .. })` for business failures;
/// return `Err` only for infrastructure conditions
/// ([`CommandError::HandlerTimeout`], [`CommandError::HandlerUnavailable`],
/// [`CommandError::Cancelled`]), which the dispatcher may retry.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn invoke(
        &self,
        action: &str,
        event: &ClassifiedEvent,
        deadline: Duration,
    ) -> CoreResult<HandlerResult>;
}

/// Registry mapping modules to handlers.
///
/// # Example
///
/// ```rust,ignore
/// let mut registry = HandlerRegistry::new();
/// registry.register(TargetModule::Fleet, Arc::new(FleetHandler::new(pool)));
/// registry.register(TargetModule::Accounting, Arc::new(LedgerHandler::new(pool)));
/// let registry = Arc::new(registry);
/// ```
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<TargetModule, Arc<dyn Handler>>,
}

impl HandlerRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a module's handler. Re-registering replaces the previous
    /// handler; last registration wins.
    pub fn register(&mut self, module: TargetModule, handler: Arc<dyn Handler>) {
        self.handlers.insert(module, handler);
    }

    /// Look up the handler for a module.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::HandlerNotFound`] when nothing is
    /// registered for `module`.
    pub fn handler_for(&self, module: TargetModule) -> CoreResult<Arc<dyn Handler>> {
        self.handlers
            .get(&module)
            .cloned()
            .ok_or_else(|| CommandError::handler_not_found(module))
    }

    /// Whether a handler is registered for `module`.
    pub fn is_registered(&self, module: TargetModule) -> bool {
        self.handlers.contains_key(&module)
    }

    /// All registered modules.
    pub fn registered_modules(&self) -> Vec<TargetModule> {
        self.handlers.keys().copied().collect()
    }
}
