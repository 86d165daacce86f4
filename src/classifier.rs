//! Hybrid classifier: fuses keyword evidence with the parser's
//! interpretation into one canonical [`ClassificationResult`].
//!
//! The classifier is a pure function over (utterance, parser output,
//! catalog): no state, no IO, no memoization. Explicit keywords win over
//! LLM disagreement, derivation rules run in catalog order, and required
//! fields are enforced before anything reaches a handler.

use crate::catalog::{
    DeriveOp, EventCatalog, EventCategory, EventDescriptor, EventType, TargetModule,
};
use crate::config::ClassifierConfig;
use crate::error::{CommandError, CoreResult};
use crate::extract::{coerce_to_kind, extract_fields};
use crate::fields::{round_half_even, ExtractedData, FieldValue, INTERMEDIATE_SCALE};
use crate::logging::log_debug;
use crate::parser::ParserOutput;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

/// How the primary event type was selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassificationSource {
    /// Parser candidates only; no keyword matched.
    Parser,
    /// Explicit keyword match, parser absent or disagreeing.
    Keyword,
    /// Keyword selection corroborated by the parser.
    Merged,
}

impl fmt::Display for ClassificationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Parser => "parser",
            Self::Keyword => "keyword",
            Self::Merged => "merged",
        };
        f.write_str(name)
    }
}

/// One concrete event produced by classification.
///
/// `event_id` is assigned by the dispatcher just before the handler call;
/// it is `None` while the event is only classified.
#[derive(Debug, Clone, Serialize)]
pub struct ClassifiedEvent {
    /// Dispatch identifier for handler idempotency.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<Uuid>,
    pub event_type: EventType,
    pub category: EventCategory,
    pub module: TargetModule,
    pub extracted_data: ExtractedData,
    pub confidence: f64,
    pub is_secondary: bool,
}

/// The classifier's canonical output: exactly one primary, zero or more
/// secondaries in catalog rule order.
#[derive(Debug, Clone)]
pub struct ClassificationResult {
    pub primary: ClassifiedEvent,
    pub secondaries: Vec<ClassifiedEvent>,
    /// Identifiable fields of the primary that stayed unpopulated.
    pub unresolved: Vec<String>,
    pub source: ClassificationSource,
    /// Handler action verb, from the parser hint when it gave one.
    pub action: String,
    /// Parser sanitation notes, disagreements, dropped secondaries.
    pub diagnostics: Vec<String>,
}

/// Action used when the parser supplies no hint.
pub const DEFAULT_ACTION: &str = "record";

/// Confidence scoring constants (see the classification algorithm).
const BASE_KEYWORD: f64 = 0.7;
const BASE_PARSER: f64 = 0.6;
const PER_KEYWORD_BONUS: f64 = 0.05;
const KEYWORD_BONUS_CAP: f64 = 0.2;
const COMPLETENESS_BONUS_CAP: f64 = 0.1;

/// Hybrid keyword/parser classifier.
pub struct Classifier {
    catalog: Arc<EventCatalog>,
    config: ClassifierConfig,
}

impl Classifier {
    pub fn new(catalog: Arc<EventCatalog>, config: ClassifierConfig) -> Self {
        Self { catalog, config }
    }

    /// Produce the canonical classification for one utterance.
    ///
    /// `parser` is the sanitized parser output, or `None` when the parser
    /// failed (its failure is already in the caller's diagnostics).
    ///
    /// # Errors
    ///
    /// - [`CommandError::Unclassifiable`] when neither keywords nor parser
    ///   produced a candidate
    /// - [`CommandError::Validation`] when required fields are missing
    ///   after derivation
    /// - [`CommandError::LowConfidence`] when the score stays below the
    ///   threshold without parser corroboration
    pub fn classify(
        &self,
        utterance: &str,
        parser: Option<&ParserOutput>,
    ) -> CoreResult<ClassificationResult> {
        let mut diagnostics: Vec<String> = parser
            .map(|p| p.diagnostics.clone())
            .unwrap_or_default();

        // 1-2. Candidate sets: keywords (K) and parser proposals (P).
        let keyword_candidates = self.catalog.candidates_for_keywords(utterance);
        let proposed: &[EventType] = parser.map(|p| p.proposed_event_types.as_slice()).unwrap_or(&[]);

        // 3. Primary selection: explicit keywords win over LLM disagreement.
        let (primary_type, source, matched_count) = match keyword_candidates.first() {
            Some(best) => {
                if proposed.contains(&best.event_type) {
                    (best.event_type, ClassificationSource::Merged, best.match_count())
                } else {
                    if let Some(parser_pick) = parser.and_then(|p| {
                        p.primary_event.or_else(|| p.proposed_event_types.first().copied())
                    }) {
                        if parser_pick != best.event_type {
                            diagnostics.push(format!(
                                "parser proposed {parser_pick}; explicit keyword selected {}",
                                best.event_type
                            ));
                        }
                    }
                    (best.event_type, ClassificationSource::Keyword, best.match_count())
                }
            }
            None => {
                let Some(first) = proposed.first() else {
                    return Err(CommandError::unclassifiable(utterance));
                };
                let pick = parser
                    .and_then(|p| p.primary_event)
                    .filter(|t| proposed.contains(t))
                    .unwrap_or(*first);
                (pick, ClassificationSource::Parser, 0)
            }
        };

        let descriptor = self
            .catalog
            .descriptor_for(primary_type)
            .ok_or_else(|| CommandError::configuration(format!("no descriptor for {primary_type}")))?;

        // 4. Data assembly: keyword extraction first, parser fills gaps.
        let mut data = extract_fields(descriptor, utterance);
        if let Some(parser) = parser {
            merge_parser_data(descriptor, &parser.extracted_data, &mut data, &mut diagnostics);
        }

        // 5. Derivation, in declared order.
        apply_derivations(descriptor, &mut data, &mut diagnostics);

        // 6. Validation: every required field present.
        let missing: Vec<String> = descriptor
            .required
            .iter()
            .filter(|name| !data.contains_key(**name))
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(CommandError::validation(primary_type, missing));
        }

        // 7. Confidence.
        let confidence = self.score(source, matched_count, descriptor, &data, parser)?;

        // 8. Secondaries, in catalog rule order.
        let secondaries =
            self.synthesize_secondaries(descriptor, &data, confidence, &mut diagnostics);

        let unresolved: Vec<String> = descriptor
            .fields
            .iter()
            .filter(|f| !data.contains_key(f.name))
            .map(|f| f.name.to_string())
            .collect();

        log_debug!(
            primary = %primary_type,
            source = %source,
            confidence = confidence,
            secondaries = secondaries.len(),
            "Command classified"
        );

        Ok(ClassificationResult {
            primary: ClassifiedEvent {
                event_id: None,
                event_type: primary_type,
                category: primary_type.category(),
                module: primary_type.module(),
                extracted_data: data,
                confidence,
                is_secondary: false,
            },
            secondaries,
            unresolved,
            source,
            action: parser
                .and_then(|p| p.action.clone())
                .unwrap_or_else(|| DEFAULT_ACTION.to_string()),
            diagnostics,
        })
    }

    fn score(
        &self,
        source: ClassificationSource,
        matched_count: usize,
        descriptor: &EventDescriptor,
        data: &ExtractedData,
        parser: Option<&ParserOutput>,
    ) -> CoreResult<f64> {
        let base = match source {
            ClassificationSource::Keyword | ClassificationSource::Merged => BASE_KEYWORD,
            ClassificationSource::Parser => BASE_PARSER,
        };
        let keyword_bonus = (matched_count as f64 * PER_KEYWORD_BONUS).min(KEYWORD_BONUS_CAP);
        let completeness = if descriptor.fields.is_empty() {
            0.0
        } else {
            COMPLETENESS_BONUS_CAP * data.len() as f64 / descriptor.fields.len() as f64
        };

        let mut confidence = base + keyword_bonus + completeness;
        if let Some(parser_confidence) = parser.and_then(|p| p.confidence) {
            confidence = confidence.max(parser_confidence);
        }
        confidence = confidence.clamp(0.0, 1.0);

        if confidence < self.config.min_confidence {
            // Parser corroboration floors the score instead of failing.
            if source == ClassificationSource::Merged {
                return Ok(self.config.min_confidence);
            }
            return Err(CommandError::low_confidence(
                confidence,
                self.config.min_confidence,
            ));
        }
        Ok(confidence)
    }

    fn synthesize_secondaries(
        &self,
        descriptor: &EventDescriptor,
        data: &ExtractedData,
        primary_confidence: f64,
        diagnostics: &mut Vec<String>,
    ) -> Vec<ClassifiedEvent> {
        let mut secondaries = Vec::new();

        for rule in descriptor.secondaries {
            if !rule.when_present.iter().all(|f| data.contains_key(*f)) {
                continue;
            }
            if let Some(field) = rule.nonzero {
                let is_nonzero = data
                    .get(field)
                    .and_then(FieldValue::as_decimal)
                    .is_some_and(|d| !d.is_zero());
                if !is_nonzero {
                    continue;
                }
            }

            // Catalog validation guarantees the child exists and is itself
            // secondary-free (fan-out depth 1).
            let Some(child) = self.catalog.descriptor_for(rule.event_type) else {
                continue;
            };

            let mut child_data = ExtractedData::new();
            for (key, value) in data {
                let name = rule
                    .map
                    .iter()
                    .find(|(source, _)| *source == key.as_str())
                    .map(|(_, target)| *target)
                    .unwrap_or(key.as_str());
                if child.is_identifiable(name) {
                    child_data.insert(name.to_string(), value.clone());
                }
            }

            let child_missing: Vec<&str> = child
                .required
                .iter()
                .filter(|name| !child_data.contains_key(**name))
                .copied()
                .collect();
            if !child_missing.is_empty() {
                diagnostics.push(format!(
                    "secondary {} dropped: missing {:?}",
                    rule.event_type, child_missing
                ));
                continue;
            }

            let confidence = primary_confidence - self.config.secondary_confidence_penalty;
            if confidence < self.config.min_confidence {
                diagnostics.push(format!(
                    "secondary {} dropped: confidence {confidence:.2} below threshold",
                    rule.event_type
                ));
                continue;
            }

            secondaries.push(ClassifiedEvent {
                event_id: None,
                event_type: rule.event_type,
                category: rule.event_type.category(),
                module: rule.event_type.module(),
                extracted_data: child_data,
                confidence,
                is_secondary: true,
            });
        }

        secondaries
    }
}

/// Parser-supplied values take precedence only when keyword extraction
/// yielded nothing for that field; keys outside the descriptor's
/// identifiable fields are dropped with a diagnostic.
fn merge_parser_data(
    descriptor: &EventDescriptor,
    parser_data: &ExtractedData,
    data: &mut ExtractedData,
    diagnostics: &mut Vec<String>,
) {
    for (key, value) in parser_data {
        let Some(spec) = descriptor.field(key) else {
            diagnostics.push(format!(
                "parser field '{key}' is not identifiable for {}",
                descriptor.event_type
            ));
            continue;
        };
        if data.contains_key(key) {
            continue;
        }
        match coerce_to_kind(value, spec.kind) {
            Some(coerced) => {
                data.insert(key.clone(), coerced);
            }
            None => diagnostics.push(format!(
                "parser value for '{key}' does not fit its field: {value}"
            )),
        }
    }
}

/// Run the descriptor's derivation rules once each, in declared order.
/// A rule fires only when its target is absent and every input is present.
fn apply_derivations(
    descriptor: &EventDescriptor,
    data: &mut ExtractedData,
    diagnostics: &mut Vec<String>,
) {
    for rule in descriptor.derivations {
        if data.contains_key(rule.produces) {
            continue;
        }
        if !rule.requires.iter().all(|f| data.contains_key(*f)) {
            continue;
        }

        let precision = descriptor
            .field(rule.produces)
            .and_then(|f| f.kind.precision())
            .unwrap_or(INTERMEDIATE_SCALE);

        let value = match rule.op {
            DeriveOp::Quotient(numerator, divisor) => {
                let (Some(n), Some(d)) = (decimal_field(data, numerator), decimal_field(data, divisor))
                else {
                    continue;
                };
                match crate::fields::checked_div_rounded(n, d, precision) {
                    Some(result) => FieldValue::Number(result),
                    None => {
                        diagnostics.push(format!(
                            "derivation of '{}' skipped: division by zero",
                            rule.produces
                        ));
                        continue;
                    }
                }
            }
            DeriveOp::Product(a, b) => {
                let (Some(a), Some(b)) = (decimal_field(data, a), decimal_field(data, b)) else {
                    continue;
                };
                match crate::fields::checked_mul_rounded(a, b, precision) {
                    Some(result) => FieldValue::Number(result),
                    None => continue,
                }
            }
            DeriveOp::ConstNumber(literal) => match Decimal::from_str(literal) {
                Ok(number) => FieldValue::Number(round_half_even(number, precision)),
                Err(_) => continue,
            },
            DeriveOp::ConstText(text) => FieldValue::text(text),
        };

        data.insert(rule.produces.to_string(), value);
    }
}

fn decimal_field(data: &ExtractedData, name: &str) -> Option<Decimal> {
    data.get(name).and_then(FieldValue::as_decimal)
}
