//! Unit Tests for the Event Catalog
//!
//! UNIT UNDER TEST: EventCatalog and the builtin descriptor table
//!
//! BUSINESS RESPONSIBILITY:
//!   - Map every event type to exactly one category and one module
//!   - Validate the descriptor table at startup (catalog errors are fatal)
//!   - Rank keyword candidates so explicit domain keywords win
//!   - Keep fan-out depth at one (no secondary-of-secondary chains)
//!
//! TEST COVERAGE:
//!   - Builtin table completeness and static type/module mapping
//!   - Startup validation: duplicates, unknown fields, secondary chains
//!   - Candidate ranking: match count, longest keyword, declaration order
//!   - Whole-phrase keyword matching at word boundaries

use crate::catalog::{
    DeriveOp, DerivationRule, EventCatalog, EventCategory, EventDescriptor, EventType, FieldKind,
    FieldSpec, SecondaryRule, TargetModule,
};
use crate::error::CommandError;

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE_AMOUNT_FIELDS: &[FieldSpec] = &[FieldSpec {
        name: "amount",
        kind: FieldKind::Currency,
        pattern: None,
    }];

    fn simple_descriptor(event_type: EventType) -> EventDescriptor {
        EventDescriptor {
            event_type,
            keywords: &["whatever"],
            fields: SIMPLE_AMOUNT_FIELDS,
            required: &[],
            derivations: &[],
            secondaries: &[],
        }
    }

    #[test]
    fn test_builtin_catalog_validates_and_covers_every_event_type() {
        // The builtin table is the production catalog; it must validate and
        // carry a descriptor for all 21 event types.

        // Arrange & Act
        let catalog = EventCatalog::builtin().expect("builtin catalog must validate");

        // Assert
        assert_eq!(
            catalog.descriptors().len(),
            EventType::ALL.len(),
            "Builtin catalog should carry one descriptor per event type"
        );
        for event_type in EventType::ALL {
            assert!(
                catalog.descriptor_for(event_type).is_some(),
                "Missing descriptor for {event_type}"
            );
        }
    }

    #[test]
    fn test_event_types_map_statically_to_category_and_module() {
        assert_eq!(EventType::Pump.category(), EventCategory::Fleet);
        assert_eq!(EventType::Pump.module(), TargetModule::Fleet);
        assert_eq!(EventType::Purchase.category(), EventCategory::Money);
        assert_eq!(
            EventType::Purchase.module(),
            TargetModule::Accounting,
            "Money events route to the accounting module"
        );
        assert_eq!(EventType::Meal.module(), TargetModule::Health);
        assert_eq!(EventType::Stock.module(), TargetModule::FoodInventory);
        assert_eq!(EventType::Reminder.module(), TargetModule::Calendar);
    }

    #[test]
    fn test_wire_names_round_trip() {
        for event_type in EventType::ALL {
            assert_eq!(
                EventType::from_name(event_type.name()),
                Some(event_type),
                "Wire name should round-trip for {event_type}"
            );
        }
        assert_eq!(EventType::from_name("warp_drive"), None);
    }

    #[test]
    fn test_duplicate_event_types_are_fatal() {
        // Arrange
        let descriptors = vec![
            simple_descriptor(EventType::Purchase),
            simple_descriptor(EventType::Purchase),
        ];

        // Act
        let result = EventCatalog::new(descriptors);

        // Assert
        assert!(
            matches!(result, Err(CommandError::Configuration { .. })),
            "Duplicate event types must fail catalog construction"
        );
    }

    #[test]
    fn test_required_field_outside_identifiable_fields_is_fatal() {
        // Arrange
        let mut descriptor = simple_descriptor(EventType::Purchase);
        descriptor.required = &["ghost_field"];

        // Act
        let result = EventCatalog::new(vec![descriptor]);

        // Assert
        assert!(
            matches!(result, Err(CommandError::Configuration { .. })),
            "Required fields must be a subset of identifiable fields"
        );
    }

    #[test]
    fn test_derivation_producing_unknown_field_is_fatal() {
        // Arrange
        const BAD_DERIVATION: &[DerivationRule] = &[DerivationRule {
            requires: &["amount"],
            produces: "phantom",
            op: DeriveOp::ConstText("x"),
        }];
        let mut descriptor = simple_descriptor(EventType::Purchase);
        descriptor.derivations = BAD_DERIVATION;

        // Act & Assert
        assert!(
            EventCatalog::new(vec![descriptor]).is_err(),
            "Derivation rules may only produce identifiable fields"
        );
    }

    #[test]
    fn test_secondary_chain_is_fatal() {
        // A secondary rule must not target an event type that itself has
        // secondary rules: fan-out depth is one.

        // Arrange
        const TO_PURCHASE: &[SecondaryRule] = &[SecondaryRule {
            event_type: EventType::Purchase,
            when_present: &["amount"],
            nonzero: None,
            map: &[],
        }];
        const TO_REPAIR: &[SecondaryRule] = &[SecondaryRule {
            event_type: EventType::Repair,
            when_present: &["amount"],
            nonzero: None,
            map: &[],
        }];

        let mut repair = simple_descriptor(EventType::Repair);
        repair.secondaries = TO_PURCHASE;
        let purchase = simple_descriptor(EventType::Purchase);
        let mut pump = simple_descriptor(EventType::Pump);
        pump.secondaries = TO_REPAIR;

        // Act
        let result = EventCatalog::new(vec![repair, purchase, pump]);

        // Assert
        assert!(
            matches!(result, Err(CommandError::Configuration { .. })),
            "Secondary rules targeting an event with its own secondaries must be fatal"
        );
    }

    #[test]
    fn test_secondary_targeting_missing_event_type_is_fatal() {
        // Arrange
        const TO_TRAVEL: &[SecondaryRule] = &[SecondaryRule {
            event_type: EventType::Travel,
            when_present: &[],
            nonzero: None,
            map: &[],
        }];
        let mut pump = simple_descriptor(EventType::Pump);
        pump.secondaries = TO_TRAVEL;

        // Act & Assert
        assert!(
            EventCatalog::new(vec![pump]).is_err(),
            "Secondary rules must target event types present in the catalog"
        );
    }

    #[test]
    fn test_candidate_ranking_prefers_more_matched_keywords() {
        // "got gas" + "gas" give pump two hits; "driving to" gives travel
        // one. Pump must rank first even though travel's keyword is longer.

        // Arrange
        let catalog = EventCatalog::builtin().unwrap();

        // Act
        let candidates =
            catalog.candidates_for_keywords("Started driving to Seattle, got gas along the way, $40");

        // Assert
        assert!(candidates.len() >= 2, "Both pump and travel should match");
        assert_eq!(
            candidates[0].event_type,
            EventType::Pump,
            "Pump should outrank travel on match count"
        );
        assert_eq!(candidates[0].match_count(), 2);
        assert_eq!(candidates[1].event_type, EventType::Travel);
    }

    #[test]
    fn test_candidate_ranking_breaks_count_ties_by_longest_keyword() {
        // "ran out" hits use_food; bare "ran" hits exercise. One match each,
        // so the longer phrase must win.

        // Arrange
        let catalog = EventCatalog::builtin().unwrap();

        // Act
        let candidates = catalog.candidates_for_keywords("ran out of milk this morning");

        // Assert
        assert_eq!(
            candidates[0].event_type,
            EventType::UseFood,
            "Longest matched keyword should break the tie"
        );
        assert!(candidates
            .iter()
            .any(|c| c.event_type == EventType::Exercise));
    }

    #[test]
    fn test_keyword_matching_is_whole_phrase_and_case_insensitive() {
        // Arrange
        let catalog = EventCatalog::builtin().unwrap();

        // Act & Assert - "gasket" must not light up the "gas" keyword
        assert!(
            catalog
                .candidates_for_keywords("replaced the gasket on the stove")
                .iter()
                .all(|c| c.event_type != EventType::Pump),
            "Keyword matching must respect word boundaries"
        );

        // Case-insensitivity
        let candidates = catalog.candidates_for_keywords("FILLED UP at the station");
        assert_eq!(candidates[0].event_type, EventType::Pump);
    }

    #[test]
    fn test_fleet_descriptors_are_declared_before_money() {
        // Declaration order encodes domain priority: fuel keywords must
        // outrank generic purchase keywords on ties.

        let catalog = EventCatalog::builtin().unwrap();
        let first_money = catalog
            .descriptors()
            .iter()
            .position(|d| d.category() == EventCategory::Money)
            .unwrap();
        let last_fleet = catalog
            .descriptors()
            .iter()
            .rposition(|d| d.category() == EventCategory::Fleet)
            .unwrap();
        assert!(
            last_fleet < first_money,
            "Fleet descriptors must precede money descriptors"
        );
    }
}
