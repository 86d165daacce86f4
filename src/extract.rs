//! Pattern extraction: lifting field values straight out of an utterance.
//!
//! Each descriptor field may carry a [`FieldPattern`]; this module
//! interprets those patterns against the raw utterance. Extraction walks
//! the descriptor's fields in declared order and keeps a set of consumed
//! character spans so that, for example, the `$4.33` inside
//! `"$4.33/gallon"` is claimed by the unit-price pattern and never
//! double-counted as the purchase total.

use crate::catalog::{EventDescriptor, FieldKind, FieldPattern};
use crate::fields::{ExtractedData, FieldValue};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Mutex;

static CURRENCY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\s*(\d+(?:,\d{3})*(?:\.\d{1,2})?)").unwrap());

static VOLUME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d+(?:\.\d+)?)\s*(?:gallons?|gal|liters?|litres?)\b").unwrap());

static UNIT_PRICE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\$?\s*(\d+(?:\.\d+)?)\s*(?:/|per\s+)(?:gallon|gal|liter|litre)s?\b").unwrap()
});

static DISTANCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d+(?:\.\d+)?)\s*(?:miles?|mi|kilometers?|km)\b").unwrap());

static MINUTES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d+)\s*(?:minutes?|mins?)\b").unwrap());

static HOURS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d+(?:\.\d+)?)\s*(?:hours?|hrs?)\b").unwrap());

static CALORIES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d+)\s*(?:calories|kcal|cal)\b").unwrap());

static ODOMETER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bodometer\s*(?:at|:)?\s*(\d+)").unwrap());

static DESTINATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:driving|drove|heading|going|trip)\s+to\s+([A-Z][A-Za-z]+(?:\s+[A-Z][A-Za-z]+)*)")
        .unwrap()
});

static ISO_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{4}-\d{2}-\d{2})\b").unwrap());

static ACCOUNT_FROM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bfrom\s+(?:the\s+|my\s+)?([a-z][a-z0-9_-]*)").unwrap());

static ACCOUNT_TO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:to|into)\s+(?:the\s+|my\s+)?([a-z][a-z0-9_-]*)").unwrap());

// Capture patterns come from the catalog as literals; compile each once.
static CAPTURE_CACHE: Lazy<Mutex<HashMap<&'static str, Regex>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Extract every patterned field of `descriptor` from the utterance.
///
/// Fields are processed in descriptor order; each successful match claims
/// its span, and later span-based patterns skip claimed text.
pub(crate) fn extract_fields(descriptor: &EventDescriptor, utterance: &str) -> ExtractedData {
    let mut data = ExtractedData::new();
    let mut consumed: Vec<(usize, usize)> = Vec::new();

    for spec in descriptor.fields {
        let Some(pattern) = spec.pattern else {
            continue;
        };
        if let Some(value) = apply_pattern(pattern, utterance, &mut consumed) {
            data.insert(spec.name.to_string(), value);
        }
    }

    data
}

/// Coerce a loosely-typed value to the field's declared kind.
///
/// Numeric fields accept numeric text ("12" → 12); text fields accept
/// numbers by rendering them. Returns `None` when no sensible coercion
/// exists (the caller drops the value with a diagnostic).
pub(crate) fn coerce_to_kind(value: &FieldValue, kind: FieldKind) -> Option<FieldValue> {
    match (kind, value) {
        (FieldKind::Text | FieldKind::Date, FieldValue::Text(_)) => Some(value.clone()),
        (FieldKind::Text | FieldKind::Date, FieldValue::Number(n)) => {
            Some(FieldValue::Text(n.to_string()))
        }
        (_, FieldValue::Number(_)) => Some(value.clone()),
        (_, FieldValue::Text(s)) => parse_decimal(s).map(FieldValue::Number),
    }
}

fn apply_pattern(
    pattern: FieldPattern,
    utterance: &str,
    consumed: &mut Vec<(usize, usize)>,
) -> Option<FieldValue> {
    match pattern {
        FieldPattern::Currency => numeric_match(&CURRENCY, utterance, consumed),
        FieldPattern::VolumeAmount => numeric_match(&VOLUME, utterance, consumed),
        FieldPattern::UnitPrice => numeric_match(&UNIT_PRICE, utterance, consumed),
        FieldPattern::DistanceAmount => numeric_match(&DISTANCE, utterance, consumed),
        FieldPattern::Calories => numeric_match(&CALORIES, utterance, consumed),
        FieldPattern::Odometer => numeric_match(&ODOMETER, utterance, consumed),
        FieldPattern::DurationMinutes => duration_minutes(utterance, consumed),
        FieldPattern::Destination => text_match(&DESTINATION, utterance, consumed),
        FieldPattern::IsoDate => iso_date(utterance, consumed),
        FieldPattern::AccountFrom => text_match(&ACCOUNT_FROM, utterance, consumed),
        FieldPattern::AccountTo => text_match(&ACCOUNT_TO, utterance, consumed),
        FieldPattern::KeywordMap(map) => keyword_map(map, utterance),
        FieldPattern::Capture(raw) => capture(raw, utterance),
    }
}

/// First regex match whose full span is not yet claimed; parses capture 1
/// as a decimal and claims the span.
fn numeric_match(
    regex: &Regex,
    utterance: &str,
    consumed: &mut Vec<(usize, usize)>,
) -> Option<FieldValue> {
    for caps in regex.captures_iter(utterance) {
        let full = caps.get(0)?;
        if overlaps(consumed, full.start(), full.end()) {
            continue;
        }
        if let Some(number) = caps.get(1).and_then(|m| parse_decimal(m.as_str())) {
            consumed.push((full.start(), full.end()));
            return Some(FieldValue::Number(number));
        }
    }
    None
}

/// First regex match whose full span is not yet claimed; the trimmed
/// capture 1 becomes a text value and the span is claimed.
fn text_match(
    regex: &Regex,
    utterance: &str,
    consumed: &mut Vec<(usize, usize)>,
) -> Option<FieldValue> {
    for caps in regex.captures_iter(utterance) {
        let full = caps.get(0)?;
        if overlaps(consumed, full.start(), full.end()) {
            continue;
        }
        let text = trim_capture(caps.get(1)?.as_str());
        if text.is_empty() {
            continue;
        }
        consumed.push((full.start(), full.end()));
        return Some(FieldValue::Text(text));
    }
    None
}

/// First date-shaped token that is an actual calendar date; "2026-13-99"
/// never becomes a value.
fn iso_date(utterance: &str, consumed: &mut Vec<(usize, usize)>) -> Option<FieldValue> {
    for caps in ISO_DATE.captures_iter(utterance) {
        let full = caps.get(0)?;
        if overlaps(consumed, full.start(), full.end()) {
            continue;
        }
        let raw = caps.get(1)?.as_str();
        if NaiveDate::parse_from_str(raw, "%Y-%m-%d").is_ok() {
            consumed.push((full.start(), full.end()));
            return Some(FieldValue::text(raw));
        }
    }
    None
}

/// Minutes directly, else hours scaled by 60.
fn duration_minutes(utterance: &str, consumed: &mut Vec<(usize, usize)>) -> Option<FieldValue> {
    if let Some(minutes) = numeric_match(&MINUTES, utterance, consumed) {
        return Some(minutes);
    }
    let hours = numeric_match(&HOURS, utterance, consumed)?.as_decimal()?;
    Some(FieldValue::Number(hours * Decimal::from(60)))
}

/// First trigger word present in the utterance wins; triggers are checked
/// in map order so more specific entries shadow general ones.
fn keyword_map(
    map: &'static [(&'static str, &'static str)],
    utterance: &str,
) -> Option<FieldValue> {
    let lowered = utterance.to_lowercase();
    map.iter()
        .find(|(trigger, _)| crate::catalog::contains_phrase(&lowered, trigger))
        .map(|(_, canonical)| FieldValue::text(*canonical))
}

fn capture(raw: &'static str, utterance: &str) -> Option<FieldValue> {
    let mut cache = CAPTURE_CACHE.lock().ok()?;
    let regex = match cache.get(raw) {
        Some(r) => r.clone(),
        None => {
            let compiled = Regex::new(raw).ok()?;
            cache.insert(raw, compiled.clone());
            compiled
        }
    };
    drop(cache);

    let caps = regex.captures(utterance)?;
    let text = trim_capture(caps.get(1)?.as_str());
    if text.is_empty() {
        None
    } else {
        Some(FieldValue::Text(text))
    }
}

fn overlaps(consumed: &[(usize, usize)], start: usize, end: usize) -> bool {
    consumed.iter().any(|&(s, e)| start < e && s < end)
}

fn trim_capture(raw: &str) -> String {
    raw.trim()
        .trim_end_matches(['.', ',', '!', '?', ';'])
        .trim()
        .to_string()
}

fn parse_decimal(raw: &str) -> Option<Decimal> {
    Decimal::from_str(&raw.replace(',', "")).ok()
}
