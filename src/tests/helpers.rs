//! Test helper utilities for lifehub-core tests
//!
//! This module provides reusable fixtures and scripted fakes that are
//! shared across multiple test modules.
//!
//! IMPORTANT: These helpers are test-only and should NEVER be used in
//! production code.

// Allow dead code in test utilities - helpers are used across different test files
#![allow(dead_code)]

use crate::catalog::{EventCatalog, TargetModule};
use crate::classifier::{ClassificationResult, ClassificationSource, ClassifiedEvent, Classifier};
use crate::config::ClassifierConfig;
use crate::error::{CommandError, CoreResult};
use crate::fields::{ExtractedData, FieldValue};
use crate::parser::ParserOutput;
use crate::registry::{Handler, HandlerRegistry, HandlerResult};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

/// Parse a decimal literal; panics on bad input (test failure is appropriate).
pub fn dec(raw: &str) -> Decimal {
    Decimal::from_str(raw).unwrap_or_else(|_| panic!("bad decimal literal: {raw}"))
}

/// The builtin catalog behind an `Arc`.
pub fn builtin_catalog() -> Arc<EventCatalog> {
    Arc::new(EventCatalog::builtin().expect("builtin catalog must validate"))
}

/// A classifier over the builtin catalog with default thresholds.
pub fn default_classifier() -> Classifier {
    Classifier::new(builtin_catalog(), ClassifierConfig::default())
}

/// A classifier with a custom config, over the builtin catalog.
pub fn classifier_with(config: ClassifierConfig) -> Classifier {
    Classifier::new(builtin_catalog(), config)
}

/// Parser output proposing the given event type names with extracted data.
pub fn parser_output(
    proposed: &[&str],
    primary: Option<&str>,
    data: &[(&str, FieldValue)],
) -> ParserOutput {
    let catalog = builtin_catalog();
    let mut extracted = ExtractedData::new();
    for (key, value) in data {
        extracted.insert(key.to_string(), value.clone());
    }
    ParserOutput {
        module: None,
        action: None,
        proposed_event_types: proposed
            .iter()
            .filter_map(|name| crate::catalog::EventType::from_name(name))
            .filter(|t| catalog.contains(*t))
            .collect(),
        primary_event: primary.and_then(crate::catalog::EventType::from_name),
        extracted_data: extracted,
        confidence: None,
        diagnostics: Vec::new(),
    }
}

/// Strip ids from a classification so runs can be compared for determinism.
pub fn classification_fingerprint(result: &ClassificationResult) -> String {
    let secondaries: Vec<String> = result
        .secondaries
        .iter()
        .map(|s| format!("{}:{:?}", s.event_type, s.extracted_data))
        .collect();
    format!(
        "{}|{:?}|{:.4}|{}|{:?}",
        result.primary.event_type,
        result.primary.extracted_data,
        result.primary.confidence,
        result.source,
        secondaries
    )
}

// ============================================================================
// Scripted handlers for dispatch tests
// ============================================================================

/// What a [`ScriptedHandler`] does when invoked.
pub enum HandlerScript {
    /// Always succeed with an empty payload.
    Succeed,
    /// Always return a structured business failure.
    FailStructured { kind: &'static str },
    /// Return `HandlerUnavailable` for the first N calls, then succeed.
    FailTransient { failures_before_success: u32 },
    /// Sleep, then succeed. Pairs with paused tokio time.
    Sleep(Duration),
}

/// Handler fake that records every invocation.
pub struct ScriptedHandler {
    script: HandlerScript,
    calls: AtomicU32,
    event_ids: Mutex<Vec<Uuid>>,
    actions: Mutex<Vec<String>>,
}

impl ScriptedHandler {
    pub fn new(script: HandlerScript) -> Arc<Self> {
        Arc::new(Self {
            script,
            calls: AtomicU32::new(0),
            event_ids: Mutex::new(Vec::new()),
            actions: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen_event_ids(&self) -> Vec<Uuid> {
        self.event_ids.lock().unwrap().clone()
    }

    pub fn seen_actions(&self) -> Vec<String> {
        self.actions.lock().unwrap().clone()
    }
}

#[async_trait]
impl Handler for ScriptedHandler {
    async fn invoke(
        &self,
        action: &str,
        event: &ClassifiedEvent,
        _deadline: Duration,
    ) -> CoreResult<HandlerResult> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(id) = event.event_id {
            self.event_ids.lock().unwrap().push(id);
        }
        self.actions.lock().unwrap().push(action.to_string());

        match &self.script {
            HandlerScript::Succeed => Ok(HandlerResult::empty()),
            HandlerScript::FailStructured { kind } => {
                Ok(HandlerResult::failure(*kind, "scripted failure"))
            }
            HandlerScript::FailTransient {
                failures_before_success,
            } => {
                if call <= *failures_before_success {
                    Err(CommandError::handler_unavailable(
                        event.module,
                        "scripted transient failure",
                    ))
                } else {
                    Ok(HandlerResult::empty())
                }
            }
            HandlerScript::Sleep(duration) => {
                tokio::time::sleep(*duration).await;
                Ok(HandlerResult::empty())
            }
        }
    }
}

/// Registry with one scripted handler per module.
pub fn registry_with(handlers: &[(TargetModule, Arc<ScriptedHandler>)]) -> Arc<HandlerRegistry> {
    let mut registry = HandlerRegistry::new();
    for (module, handler) in handlers {
        registry.register(*module, Arc::clone(handler) as Arc<dyn Handler>);
    }
    Arc::new(registry)
}

// ============================================================================
// Hand-built classification results for dispatch tests
// ============================================================================

/// A classified event with the given data, ready for dispatch.
pub fn classified_event(
    event_type: crate::catalog::EventType,
    data: &[(&str, FieldValue)],
    is_secondary: bool,
) -> ClassifiedEvent {
    let mut extracted = ExtractedData::new();
    for (key, value) in data {
        extracted.insert(key.to_string(), value.clone());
    }
    ClassifiedEvent {
        event_id: None,
        event_type,
        category: event_type.category(),
        module: event_type.module(),
        extracted_data: extracted,
        confidence: 0.8,
        is_secondary,
    }
}

/// A classification result wrapping pre-built events.
pub fn classification(
    primary: ClassifiedEvent,
    secondaries: Vec<ClassifiedEvent>,
) -> ClassificationResult {
    ClassificationResult {
        primary,
        secondaries,
        unresolved: Vec::new(),
        source: ClassificationSource::Keyword,
        action: crate::classifier::DEFAULT_ACTION.to_string(),
        diagnostics: Vec::new(),
    }
}
