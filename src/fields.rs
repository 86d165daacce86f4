//! Typed field values for extracted command data.
//!
//! Every value flowing through classification is either a decimal number or
//! text. Numbers are held as [`Decimal`] so money and volume arithmetic is
//! exact; JSON numbers are converted through their decimal representation
//! rather than through `f64`, so `45.10` stays `45.10`.
//!
//! Derivation arithmetic works at [`INTERMEDIATE_SCALE`] fractional digits;
//! results are then rounded half-to-even to the target field's declared
//! precision (see [`crate::catalog::FieldKind::precision`]).

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Scale used for intermediate derivation arithmetic.
pub const INTERMEDIATE_SCALE: u32 = 4;

/// Extracted data for one event: field name to value.
///
/// A `BTreeMap` keeps iteration and serialization order deterministic.
pub type ExtractedData = BTreeMap<String, FieldValue>;

/// A single extracted field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Decimal number (money, volume, counts, odometer readings).
    Number(Decimal),
    /// Free text (merchants, locations, fuel types, descriptions).
    Text(String),
}

impl FieldValue {
    /// Build a text value.
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Build a number value.
    pub fn number(d: Decimal) -> Self {
        Self::Number(d)
    }

    /// The numeric value, if this is a number.
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Self::Number(d) => Some(*d),
            Self::Text(_) => None,
        }
    }

    /// The text value, if this is text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Number(_) => None,
            Self::Text(s) => Some(s),
        }
    }

    /// Whether this is the number zero.
    pub fn is_zero(&self) -> bool {
        matches!(self, Self::Number(d) if d.is_zero())
    }

    /// Convert a JSON value into a field value.
    ///
    /// Numbers convert losslessly through their decimal text form; booleans
    /// become text; null, arrays, and objects are not representable and
    /// return `None` (the caller drops them with a diagnostic).
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => {
                let rendered = n.to_string();
                Decimal::from_str(&rendered)
                    .or_else(|_| Decimal::from_scientific(&rendered))
                    .ok()
                    .map(Self::Number)
            }
            serde_json::Value::String(s) => Some(Self::Text(s.clone())),
            serde_json::Value::Bool(b) => Some(Self::Text(b.to_string())),
            serde_json::Value::Null
            | serde_json::Value::Array(_)
            | serde_json::Value::Object(_) => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(d) => write!(f, "{d}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<Decimal> for FieldValue {
    fn from(d: Decimal) -> Self {
        Self::Number(d)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Number(d) => {
                // Integral values serialize as JSON integers, everything else
                // as a float of the decimal's exact rendering.
                if d.scale() == 0 || d.fract().is_zero() {
                    if let Some(i) = d.to_i64() {
                        return serializer.serialize_i64(i);
                    }
                }
                match d.to_f64() {
                    Some(f) => serializer.serialize_f64(f),
                    None => serializer.serialize_str(&d.to_string()),
                }
            }
            Self::Text(s) => serializer.serialize_str(s),
        }
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Self::from_json(&value)
            .ok_or_else(|| D::Error::custom("field value must be a number, string, or boolean"))
    }
}

/// Round half-to-even to `dp` fractional digits.
pub fn round_half_even(value: Decimal, dp: u32) -> Decimal {
    value
        .round_dp_with_strategy(dp, RoundingStrategy::MidpointNearestEven)
        .normalize()
}

/// Divide at the intermediate scale, then round to the target precision.
///
/// Returns `None` when the divisor is zero.
pub fn checked_div_rounded(numerator: Decimal, divisor: Decimal, dp: u32) -> Option<Decimal> {
    if divisor.is_zero() {
        return None;
    }
    let raw = numerator.checked_div(divisor)?;
    let intermediate = round_half_even(raw, INTERMEDIATE_SCALE);
    Some(round_half_even(intermediate, dp))
}

/// Multiply at the intermediate scale, then round to the target precision.
pub fn checked_mul_rounded(a: Decimal, b: Decimal, dp: u32) -> Option<Decimal> {
    let raw = a.checked_mul(b)?;
    let intermediate = round_half_even(raw, INTERMEDIATE_SCALE);
    Some(round_half_even(intermediate, dp))
}
