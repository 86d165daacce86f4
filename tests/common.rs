//! Shared fixtures for lifehub-core integration tests.

// Allow dead code - helpers are used across different test binaries
#![allow(dead_code)]

use async_trait::async_trait;
use lifehub_core::{
    CancellationToken, ClassifiedEvent, CommandError, CommandOrchestrator, CoreResult,
    EventCatalog, Handler, HandlerRegistry, HandlerResult, OrchestratorConfig, ParserClient,
    ParserOutput, TargetModule,
};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn dec(raw: &str) -> Decimal {
    Decimal::from_str(raw).unwrap_or_else(|_| panic!("bad decimal literal: {raw}"))
}

pub fn builtin_catalog() -> Arc<EventCatalog> {
    Arc::new(EventCatalog::builtin().expect("builtin catalog must validate"))
}

// ============================================================================
// Parser fakes
// ============================================================================

/// Parser fake that replays a canned response (or error) for every call.
pub struct CannedParser {
    response: Mutex<Box<dyn Fn() -> CoreResult<ParserOutput> + Send>>,
}

impl CannedParser {
    /// Replay the interpretation in `payload` (raw parser JSON).
    pub fn replying(payload: serde_json::Value) -> Arc<Self> {
        let catalog = builtin_catalog();
        Arc::new(Self {
            response: Mutex::new(Box::new(move || {
                ParserOutput::from_json(&payload, &catalog)
            })),
        })
    }

    /// Fail every call with the given error factory.
    pub fn failing(factory: impl Fn() -> CommandError + Send + 'static) -> Arc<Self> {
        Arc::new(Self {
            response: Mutex::new(Box::new(move || Err(factory()))),
        })
    }
}

#[async_trait]
impl ParserClient for CannedParser {
    async fn interpret(
        &self,
        _utterance: &str,
        _deadline: Duration,
        _cancel: &CancellationToken,
    ) -> CoreResult<ParserOutput> {
        (self.response.lock().unwrap())()
    }
}

// ============================================================================
// Handler fakes
// ============================================================================

/// What a [`RecordingHandler`] answers.
pub enum HandlerBehavior {
    Succeed,
    FailStructured { kind: &'static str },
    FailTransient { failures_before_success: u32 },
}

/// Handler fake that records every event it is handed.
pub struct RecordingHandler {
    behavior: HandlerBehavior,
    calls: AtomicU32,
    events: Mutex<Vec<ClassifiedEvent>>,
}

impl RecordingHandler {
    pub fn new(behavior: HandlerBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            calls: AtomicU32::new(0),
            events: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn recorded_events(&self) -> Vec<ClassifiedEvent> {
        self.events.lock().unwrap().clone()
    }

    /// The recorded event of the given type; panics when absent.
    pub fn event_of_type(&self, event_type: lifehub_core::EventType) -> ClassifiedEvent {
        self.recorded_events()
            .into_iter()
            .find(|e| e.event_type == event_type)
            .unwrap_or_else(|| panic!("no recorded {event_type} event"))
    }
}

#[async_trait]
impl Handler for RecordingHandler {
    async fn invoke(
        &self,
        _action: &str,
        event: &ClassifiedEvent,
        _deadline: Duration,
    ) -> CoreResult<HandlerResult> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.events.lock().unwrap().push(event.clone());

        match &self.behavior {
            HandlerBehavior::Succeed => Ok(HandlerResult::empty()),
            HandlerBehavior::FailStructured { kind } => {
                Ok(HandlerResult::failure(*kind, "integration test failure"))
            }
            HandlerBehavior::FailTransient {
                failures_before_success,
            } => {
                if call <= *failures_before_success {
                    Err(CommandError::handler_unavailable(
                        event.module,
                        "transient test failure",
                    ))
                } else {
                    Ok(HandlerResult::empty())
                }
            }
        }
    }
}

// ============================================================================
// Wiring
// ============================================================================

pub fn registry_with(handlers: &[(TargetModule, Arc<RecordingHandler>)]) -> Arc<HandlerRegistry> {
    let mut registry = HandlerRegistry::new();
    for (module, handler) in handlers {
        registry.register(*module, Arc::clone(handler) as Arc<dyn Handler>);
    }
    Arc::new(registry)
}

pub fn orchestrator(
    parser: Arc<dyn ParserClient>,
    handlers: &[(TargetModule, Arc<RecordingHandler>)],
) -> CommandOrchestrator {
    CommandOrchestrator::new(
        OrchestratorConfig::default(),
        builtin_catalog(),
        parser,
        registry_with(handlers),
    )
}
