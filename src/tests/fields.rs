//! Unit Tests for Field Values
//!
//! UNIT UNDER TEST: FieldValue and the decimal rounding helpers
//!
//! BUSINESS RESPONSIBILITY:
//!   - Hold extracted values as exact decimals or text
//!   - Convert untrusted JSON losslessly (45.10 stays 45.10)
//!   - Round derivation results half-to-even at the declared precision
//!     after a 4-digit intermediate step
//!
//! TEST COVERAGE:
//!   - JSON conversion for numbers, strings, booleans, and rejects
//!   - Serialization shapes (integers as integers, decimals as numbers)
//!   - Half-to-even rounding and the derivation arithmetic helpers

use crate::fields::{
    checked_div_rounded, checked_mul_rounded, round_half_even, FieldValue,
};
use crate::tests::helpers::dec;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_numbers_convert_through_their_decimal_text() {
        // Arrange
        let value = serde_json::json!(45.10);

        // Act
        let converted = FieldValue::from_json(&value).unwrap();

        // Assert - conversion must not detour through f64 bit patterns
        assert_eq!(
            converted.as_decimal().unwrap(),
            dec("45.1"),
            "JSON 45.10 should convert to decimal 45.1 exactly"
        );
    }

    #[test]
    fn test_json_conversion_covers_strings_and_booleans() {
        assert_eq!(
            FieldValue::from_json(&serde_json::json!("Seattle")),
            Some(FieldValue::text("Seattle"))
        );
        assert_eq!(
            FieldValue::from_json(&serde_json::json!(true)),
            Some(FieldValue::text("true")),
            "Booleans should degrade to text rather than be dropped"
        );
        assert_eq!(
            FieldValue::from_json(&serde_json::json!(null)),
            None,
            "Null is not representable"
        );
        assert_eq!(
            FieldValue::from_json(&serde_json::json!({"nested": 1})),
            None,
            "Objects are not representable"
        );
    }

    #[test]
    fn test_integral_numbers_serialize_as_json_integers() {
        // Arrange
        let value = FieldValue::Number(dec("45000"));

        // Act
        let serialized = serde_json::to_value(&value).unwrap();

        // Assert
        assert_eq!(serialized, serde_json::json!(45000));
    }

    #[test]
    fn test_fractional_numbers_serialize_as_json_numbers() {
        let serialized = serde_json::to_value(FieldValue::Number(dec("3.75"))).unwrap();
        assert_eq!(serialized, serde_json::json!(3.75));
    }

    #[test]
    fn test_round_half_even_at_the_midpoint() {
        // Banker's rounding: .5 goes to the even neighbour.
        assert_eq!(round_half_even(dec("2.345"), 2), dec("2.34"));
        assert_eq!(round_half_even(dec("2.355"), 2), dec("2.36"));
        assert_eq!(round_half_even(dec("12.0092"), 3), dec("12.009"));
    }

    #[test]
    fn test_division_rounds_through_the_intermediate_scale() {
        // 52 / 4.33 = 12.00923...; 4-digit intermediate 12.0092, then
        // half-to-even at 3 digits gives the documented 12.009.

        // Act
        let quantity = checked_div_rounded(dec("52"), dec("4.33"), 3).unwrap();

        // Assert
        assert_eq!(quantity, dec("12.009"));
    }

    #[test]
    fn test_division_by_zero_yields_none() {
        assert_eq!(
            checked_div_rounded(dec("52"), dec("0"), 3),
            None,
            "Division by zero must be signalled, not panic"
        );
    }

    #[test]
    fn test_multiplication_rounds_to_target_precision() {
        // 12.009 * 4.33 = 51.99897 -> 51.999 at 4 digits... then currency 2
        let cost = checked_mul_rounded(dec("12.009"), dec("4.33"), 2).unwrap();
        assert_eq!(cost, dec("52"));
    }

    #[test]
    fn test_derived_price_stays_within_a_cent_of_the_product() {
        // Derivation soundness: recomputing cost from the derived pair
        // lands within 0.01 of the original.

        // Arrange
        let cost = dec("45");
        let quantity = dec("12");

        // Act
        let price = checked_div_rounded(cost, quantity, 4).unwrap();
        let recomputed = quantity * price;

        // Assert
        assert_eq!(price, dec("3.75"));
        assert!(
            (cost - recomputed).abs() <= dec("0.01"),
            "|cost - quantity * price| must stay within one cent"
        );
    }
}
