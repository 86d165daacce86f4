//! Static event catalog: types, descriptors, and rules.
//!
//! The catalog is the read-only table behind classification. It maps every
//! event type to its category and target module, its indicative keywords,
//! the fields the classifier may extract, the fields that must be present
//! after derivation, the derivation rules themselves, and the rules that
//! synthesize secondary events.
//!
//! The table is built once at startup ([`EventCatalog::builtin`]) and
//! validated; catalog errors are fatal. Tests inject reduced catalogs via
//! [`EventCatalog::new`].
//!
//! Declaration order is meaningful: it breaks keyword-ranking ties, and it
//! encodes domain priority (fuel keywords outrank generic purchase
//! keywords).

use crate::error::{CommandError, CoreResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Event taxonomy
// ============================================================================

/// The five business categories of event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    Money,
    Fleet,
    Health,
    FoodInventory,
    Calendar,
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Money => "money",
            Self::Fleet => "fleet",
            Self::Health => "health",
            Self::FoodInventory => "food_inventory",
            Self::Calendar => "calendar",
        };
        f.write_str(name)
    }
}

/// The module that handles an event. Orthogonal to [`EventCategory`]:
/// the category groups events for reporting, the module picks the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetModule {
    Accounting,
    Fleet,
    Health,
    FoodInventory,
    Calendar,
}

impl fmt::Display for TargetModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Accounting => "accounting",
            Self::Fleet => "fleet",
            Self::Health => "health",
            Self::FoodInventory => "food_inventory",
            Self::Calendar => "calendar",
        };
        f.write_str(name)
    }
}

/// Closed enumeration of every business event the platform understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    // Money
    Purchase,
    Return,
    Transfer,
    ApPayment,
    ApInvoice,
    Deposit,
    Ach,
    Sales,
    // Fleet
    Pump,
    Repair,
    Maintenance,
    Travel,
    // Health
    Meal,
    Exercise,
    Hike,
    // Food inventory
    Stock,
    UseFood,
    FoodExpiryCheck,
    // Calendar
    Appointment,
    Reminder,
    Task,
}

impl EventType {
    /// Every event type, in catalog declaration order (Fleet first).
    pub const ALL: [EventType; 21] = [
        Self::Pump,
        Self::Repair,
        Self::Maintenance,
        Self::Travel,
        Self::Purchase,
        Self::Return,
        Self::Transfer,
        Self::ApPayment,
        Self::ApInvoice,
        Self::Deposit,
        Self::Ach,
        Self::Sales,
        Self::Meal,
        Self::Exercise,
        Self::Hike,
        Self::Stock,
        Self::UseFood,
        Self::FoodExpiryCheck,
        Self::Appointment,
        Self::Reminder,
        Self::Task,
    ];

    /// The wire name (snake_case, as in parser output and handler payloads).
    pub fn name(&self) -> &'static str {
        match self {
            Self::Purchase => "purchase",
            Self::Return => "return",
            Self::Transfer => "transfer",
            Self::ApPayment => "ap_payment",
            Self::ApInvoice => "ap_invoice",
            Self::Deposit => "deposit",
            Self::Ach => "ach",
            Self::Sales => "sales",
            Self::Pump => "pump",
            Self::Repair => "repair",
            Self::Maintenance => "maintenance",
            Self::Travel => "travel",
            Self::Meal => "meal",
            Self::Exercise => "exercise",
            Self::Hike => "hike",
            Self::Stock => "stock",
            Self::UseFood => "use_food",
            Self::FoodExpiryCheck => "food_expiry_check",
            Self::Appointment => "appointment",
            Self::Reminder => "reminder",
            Self::Task => "task",
        }
    }

    /// Parse a wire name. Unknown names yield `None` (the parser client
    /// drops them with a diagnostic rather than failing).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.name() == name)
    }

    /// The category this event type belongs to. Static, exactly one.
    pub fn category(&self) -> EventCategory {
        match self {
            Self::Purchase
            | Self::Return
            | Self::Transfer
            | Self::ApPayment
            | Self::ApInvoice
            | Self::Deposit
            | Self::Ach
            | Self::Sales => EventCategory::Money,
            Self::Pump | Self::Repair | Self::Maintenance | Self::Travel => EventCategory::Fleet,
            Self::Meal | Self::Exercise | Self::Hike => EventCategory::Health,
            Self::Stock | Self::UseFood | Self::FoodExpiryCheck => EventCategory::FoodInventory,
            Self::Appointment | Self::Reminder | Self::Task => EventCategory::Calendar,
        }
    }

    /// The module whose handler executes this event. Static, exactly one.
    pub fn module(&self) -> TargetModule {
        match self.category() {
            EventCategory::Money => TargetModule::Accounting,
            EventCategory::Fleet => TargetModule::Fleet,
            EventCategory::Health => TargetModule::Health,
            EventCategory::FoodInventory => TargetModule::FoodInventory,
            EventCategory::Calendar => TargetModule::Calendar,
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Field specifications
// ============================================================================

/// The shape of a field's value, fixing its rounding precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Money amount, 2 fractional digits.
    Currency,
    /// Liquid volume, 3 fractional digits.
    Volume,
    /// Money per unit of volume, 4 fractional digits.
    UnitPrice,
    /// Distance, 1 fractional digit.
    Distance,
    /// Whole number (odometer readings, calories, counts).
    Integer,
    /// Free text.
    Text,
    /// Calendar date, held as ISO-8601 text.
    Date,
}

impl FieldKind {
    /// Declared rounding precision for numeric kinds.
    pub fn precision(&self) -> Option<u32> {
        match self {
            Self::Currency => Some(2),
            Self::Volume => Some(3),
            Self::UnitPrice => Some(4),
            Self::Distance => Some(1),
            Self::Integer => Some(0),
            Self::Text | Self::Date => None,
        }
    }
}

/// How the classifier may lift a field straight out of the utterance.
///
/// Patterns are interpreted by `crate::extract`; a field without a pattern
/// is populated by the parser only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldPattern {
    /// A `$` currency amount (first one not already claimed by another
    /// pattern).
    Currency,
    /// A number followed by a volume unit ("12 gallons").
    VolumeAmount,
    /// A per-volume price ("$4.33/gallon").
    UnitPrice,
    /// A distance with unit ("5 miles").
    DistanceAmount,
    /// A duration, normalized to minutes ("45 min", "2 hours").
    DurationMinutes,
    /// A calorie count ("600 calories").
    Calories,
    /// An odometer reading ("odometer 45000").
    Odometer,
    /// A travel destination ("driving to Seattle").
    Destination,
    /// An ISO-8601 date ("2026-03-14").
    IsoDate,
    /// Source account phrase ("from checking").
    AccountFrom,
    /// Target account phrase ("to savings").
    AccountTo,
    /// First matching trigger word maps to a canonical value.
    KeywordMap(&'static [(&'static str, &'static str)]),
    /// Regex with one capture group; the trimmed capture is the value.
    Capture(&'static str),
}

/// One identifiable field of an event descriptor.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Field name as it appears in extracted data and handler payloads.
    pub name: &'static str,
    /// Value shape and precision.
    pub kind: FieldKind,
    /// Optional utterance extraction pattern.
    pub pattern: Option<FieldPattern>,
}

// ============================================================================
// Derivation and secondary rules
// ============================================================================

/// The computation a derivation rule performs once its preconditions hold.
#[derive(Debug, Clone, Copy)]
pub enum DeriveOp {
    /// `produces = field_a / field_b`, rounded to the target precision.
    Quotient(&'static str, &'static str),
    /// `produces = field_a * field_b`, rounded to the target precision.
    Product(&'static str, &'static str),
    /// A constant numeric fallback (decimal literal).
    ConstNumber(&'static str),
    /// A constant text fallback.
    ConstText(&'static str),
}

/// Conditional rewrite: if all of `requires` are present and `produces` is
/// absent, compute `produces` via `op`. Rules run once each, in declared
/// order, so later rules see the output of earlier ones.
#[derive(Debug, Clone, Copy)]
pub struct DerivationRule {
    pub requires: &'static [&'static str],
    pub produces: &'static str,
    pub op: DeriveOp,
}

/// Predicate that synthesizes a secondary event from a primary's derived
/// data. `map` renames parent fields into the child's vocabulary before
/// the data is restricted to the child's identifiable fields.
#[derive(Debug, Clone, Copy)]
pub struct SecondaryRule {
    /// The child event type.
    pub event_type: EventType,
    /// Parent fields that must all be present for the rule to fire.
    pub when_present: &'static [&'static str],
    /// Optional parent field that must additionally be a non-zero number.
    pub nonzero: Option<&'static str>,
    /// `(parent_field, child_field)` renames.
    pub map: &'static [(&'static str, &'static str)],
}

// ============================================================================
// Descriptors
// ============================================================================

/// Static metadata for one event type.
#[derive(Debug, Clone)]
pub struct EventDescriptor {
    pub event_type: EventType,
    /// Indicative phrases; multi-word entries allowed; matching is
    /// case-insensitive and whole-phrase.
    pub keywords: &'static [&'static str],
    /// The fields the classifier may extract, in declared order.
    pub fields: &'static [FieldSpec],
    /// Subset of field names that must be non-null after derivation.
    pub required: &'static [&'static str],
    pub derivations: &'static [DerivationRule],
    pub secondaries: &'static [SecondaryRule],
}

impl EventDescriptor {
    /// The category, intrinsic to the event type.
    pub fn category(&self) -> EventCategory {
        self.event_type.category()
    }

    /// The handling module, intrinsic to the event type.
    pub fn module(&self) -> TargetModule {
        self.event_type.module()
    }

    /// Look up a field spec by name.
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Whether `name` is one of this descriptor's identifiable fields.
    pub fn is_identifiable(&self, name: &str) -> bool {
        self.field(name).is_some()
    }
}

// ============================================================================
// Keyword matching
// ============================================================================

/// One descriptor's keyword hits against an utterance.
#[derive(Debug, Clone)]
pub struct KeywordMatch {
    pub event_type: EventType,
    /// The keywords that matched, in descriptor order.
    pub matched: Vec<&'static str>,
}

impl KeywordMatch {
    /// Number of distinct keywords that matched.
    pub fn match_count(&self) -> usize {
        self.matched.len()
    }

    /// Length of the longest matched keyword.
    pub fn longest_len(&self) -> usize {
        self.matched.iter().map(|k| k.len()).max().unwrap_or(0)
    }
}

/// Case-insensitive whole-phrase containment: `phrase` must appear in
/// `haystack` with non-alphanumeric (or boundary) characters on both sides.
pub(crate) fn contains_phrase(haystack_lower: &str, phrase: &str) -> bool {
    let phrase = phrase.to_lowercase();
    let mut search_from = 0;
    while let Some(pos) = haystack_lower[search_from..].find(&phrase) {
        let start = search_from + pos;
        let end = start + phrase.len();
        let left_ok = start == 0
            || !haystack_lower[..start]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_alphanumeric());
        let right_ok = end == haystack_lower.len()
            || !haystack_lower[end..]
                .chars()
                .next()
                .is_some_and(|c| c.is_alphanumeric());
        if left_ok && right_ok {
            return true;
        }
        search_from = start + 1;
    }
    false
}

// ============================================================================
// The catalog
// ============================================================================

/// Read-only registry of event descriptors, validated at construction.
#[derive(Debug, Clone)]
pub struct EventCatalog {
    descriptors: Vec<EventDescriptor>,
    by_type: HashMap<EventType, usize>,
}

impl EventCatalog {
    /// Build a catalog from descriptors, validating the §3 invariants.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Configuration`] for any of:
    /// - duplicate event types
    /// - a required field that is not identifiable
    /// - a derivation rule reading or producing a non-identifiable field
    /// - a secondary rule whose child is not in the catalog, whose child
    ///   itself declares secondary rules (fan-out depth must be 1), or
    ///   whose mapping references unknown fields on either side
    pub fn new(descriptors: Vec<EventDescriptor>) -> CoreResult<Self> {
        let mut by_type = HashMap::with_capacity(descriptors.len());
        for (idx, desc) in descriptors.iter().enumerate() {
            if by_type.insert(desc.event_type, idx).is_some() {
                return Err(CommandError::configuration(format!(
                    "duplicate event type in catalog: {}",
                    desc.event_type
                )));
            }
        }

        let catalog = Self {
            descriptors,
            by_type,
        };
        catalog.validate()?;
        Ok(catalog)
    }

    /// The platform's builtin catalog.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Configuration`] if the builtin table is
    /// inconsistent; this is a startup-fatal condition.
    pub fn builtin() -> CoreResult<Self> {
        Self::new(builtin_descriptors())
    }

    fn validate(&self) -> CoreResult<()> {
        for desc in &self.descriptors {
            let field_names: HashSet<&str> = desc.fields.iter().map(|f| f.name).collect();

            for req in desc.required {
                if !field_names.contains(req) {
                    return Err(CommandError::configuration(format!(
                        "{}: required field '{req}' is not identifiable",
                        desc.event_type
                    )));
                }
            }

            for rule in desc.derivations {
                if !field_names.contains(rule.produces) {
                    return Err(CommandError::configuration(format!(
                        "{}: derivation produces unknown field '{}'",
                        desc.event_type, rule.produces
                    )));
                }
                for input in rule.requires {
                    if !field_names.contains(input) {
                        return Err(CommandError::configuration(format!(
                            "{}: derivation reads unknown field '{input}'",
                            desc.event_type
                        )));
                    }
                }
                if let DeriveOp::ConstNumber(literal) = rule.op {
                    if Decimal::from_str(literal).is_err() {
                        return Err(CommandError::configuration(format!(
                            "{}: derivation constant '{literal}' is not a decimal",
                            desc.event_type
                        )));
                    }
                }
            }

            for rule in desc.secondaries {
                let child = self.descriptor_for(rule.event_type).ok_or_else(|| {
                    CommandError::configuration(format!(
                        "{}: secondary rule targets {} which is not in the catalog",
                        desc.event_type, rule.event_type
                    ))
                })?;
                if !child.secondaries.is_empty() {
                    return Err(CommandError::configuration(format!(
                        "{}: secondary rule targets {} which has secondary rules of its own \
                         (fan-out depth must be 1)",
                        desc.event_type, rule.event_type
                    )));
                }
                for cond in rule.when_present {
                    if !field_names.contains(cond) {
                        return Err(CommandError::configuration(format!(
                            "{}: secondary rule condition reads unknown field '{cond}'",
                            desc.event_type
                        )));
                    }
                }
                for (source, target) in rule.map {
                    if !field_names.contains(source) {
                        return Err(CommandError::configuration(format!(
                            "{}: secondary rule maps unknown source field '{source}'",
                            desc.event_type
                        )));
                    }
                    if !child.is_identifiable(target) {
                        return Err(CommandError::configuration(format!(
                            "{}: secondary rule maps into '{target}' which {} cannot identify",
                            desc.event_type, rule.event_type
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// The descriptor for an event type, if the catalog carries it.
    pub fn descriptor_for(&self, event_type: EventType) -> Option<&EventDescriptor> {
        self.by_type.get(&event_type).map(|&idx| &self.descriptors[idx])
    }

    /// Whether this catalog carries a descriptor for `event_type`.
    pub fn contains(&self, event_type: EventType) -> bool {
        self.by_type.contains_key(&event_type)
    }

    /// All descriptors, in declaration order.
    pub fn descriptors(&self) -> &[EventDescriptor] {
        &self.descriptors
    }

    /// Every descriptor whose keywords appear in the utterance, ordered by
    /// (matched-keyword count desc, longest matched keyword desc,
    /// declaration order asc).
    ///
    /// Ties fall back to declaration order, which encodes domain priority:
    /// fuel keywords outrank generic purchase keywords.
    pub fn candidates_for_keywords(&self, utterance: &str) -> Vec<KeywordMatch> {
        let lowered = utterance.to_lowercase();

        let mut candidates: Vec<(usize, KeywordMatch)> = self
            .descriptors
            .iter()
            .enumerate()
            .filter_map(|(idx, desc)| {
                let matched: Vec<&'static str> = desc
                    .keywords
                    .iter()
                    .copied()
                    .filter(|keyword| contains_phrase(&lowered, keyword))
                    .collect();
                if matched.is_empty() {
                    None
                } else {
                    Some((
                        idx,
                        KeywordMatch {
                            event_type: desc.event_type,
                            matched,
                        },
                    ))
                }
            })
            .collect();

        candidates.sort_by(|(idx_a, a), (idx_b, b)| {
            b.match_count()
                .cmp(&a.match_count())
                .then(b.longest_len().cmp(&a.longest_len()))
                .then(idx_a.cmp(idx_b))
        });

        candidates.into_iter().map(|(_, m)| m).collect()
    }
}

// ============================================================================
// Builtin table
// ============================================================================

const FUEL_TYPES: &[(&str, &str)] = &[
    ("diesel", "diesel"),
    ("premium", "premium"),
    ("unleaded", "gasoline"),
    ("gasoline", "gasoline"),
    ("gas", "gasoline"),
];

const SERVICE_TYPES: &[(&str, &str)] = &[
    ("oil change", "oil_change"),
    ("tune up", "tune_up"),
    ("tire rotation", "tire_rotation"),
    ("inspection", "inspection"),
    ("air filter", "air_filter"),
    ("serviced", "general_service"),
    ("maintenance", "general_service"),
];

const MEAL_TYPES: &[(&str, &str)] = &[
    ("breakfast", "breakfast"),
    ("lunch", "lunch"),
    ("dinner", "dinner"),
    ("snack", "snack"),
    ("ate", "meal"),
    ("meal", "meal"),
];

const ACTIVITIES: &[(&str, &str)] = &[
    ("ran", "running"),
    ("run", "running"),
    ("swam", "swimming"),
    ("biked", "cycling"),
    ("cycling", "cycling"),
    ("lifted", "weights"),
    ("gym", "gym"),
    ("worked out", "workout"),
    ("workout", "workout"),
    ("exercised", "workout"),
    ("exercise", "workout"),
];

/// The builtin descriptor table, in priority order: Fleet, Money, Health,
/// Food Inventory, Calendar.
fn builtin_descriptors() -> Vec<EventDescriptor> {
    vec![
        // ------------------------------------------------------------ Fleet
        EventDescriptor {
            event_type: EventType::Pump,
            keywords: &[
                "filled up", "got gas", "gas", "fuel", "refuel", "refueled", "diesel", "pump",
            ],
            fields: &[
                FieldSpec {
                    name: "quantity",
                    kind: FieldKind::Volume,
                    pattern: Some(FieldPattern::VolumeAmount),
                },
                FieldSpec {
                    name: "price_per_unit",
                    kind: FieldKind::UnitPrice,
                    pattern: Some(FieldPattern::UnitPrice),
                },
                FieldSpec {
                    name: "cost",
                    kind: FieldKind::Currency,
                    pattern: Some(FieldPattern::Currency),
                },
                FieldSpec {
                    name: "fuel_type",
                    kind: FieldKind::Text,
                    pattern: Some(FieldPattern::KeywordMap(FUEL_TYPES)),
                },
                FieldSpec {
                    name: "odometer",
                    kind: FieldKind::Integer,
                    pattern: Some(FieldPattern::Odometer),
                },
                FieldSpec {
                    name: "destination",
                    kind: FieldKind::Text,
                    pattern: Some(FieldPattern::Destination),
                },
                FieldSpec {
                    name: "location",
                    kind: FieldKind::Text,
                    pattern: None,
                },
                FieldSpec {
                    name: "from_account",
                    kind: FieldKind::Text,
                    pattern: None,
                },
                FieldSpec {
                    name: "to_account",
                    kind: FieldKind::Text,
                    pattern: None,
                },
                FieldSpec {
                    name: "date",
                    kind: FieldKind::Date,
                    pattern: Some(FieldPattern::IsoDate),
                },
            ],
            required: &[
                "price_per_unit",
                "quantity",
                "cost",
                "fuel_type",
                "location",
                "from_account",
                "to_account",
            ],
            derivations: &[
                DerivationRule {
                    requires: &["cost", "quantity"],
                    produces: "price_per_unit",
                    op: DeriveOp::Quotient("cost", "quantity"),
                },
                // Fallback pump price when only the total is known.
                DerivationRule {
                    requires: &["cost"],
                    produces: "price_per_unit",
                    op: DeriveOp::ConstNumber("3.50"),
                },
                DerivationRule {
                    requires: &["cost", "price_per_unit"],
                    produces: "quantity",
                    op: DeriveOp::Quotient("cost", "price_per_unit"),
                },
                DerivationRule {
                    requires: &["quantity", "price_per_unit"],
                    produces: "cost",
                    op: DeriveOp::Product("quantity", "price_per_unit"),
                },
                // Default ledger routing for fuel spend.
                DerivationRule {
                    requires: &["cost"],
                    produces: "from_account",
                    op: DeriveOp::ConstText("personal:checking"),
                },
                DerivationRule {
                    requires: &["cost"],
                    produces: "to_account",
                    op: DeriveOp::ConstText("expense:auto:fuel"),
                },
                DerivationRule {
                    requires: &["cost"],
                    produces: "location",
                    op: DeriveOp::ConstText("unspecified"),
                },
            ],
            secondaries: &[
                SecondaryRule {
                    event_type: EventType::Travel,
                    when_present: &["destination"],
                    nonzero: None,
                    map: &[("destination", "destination")],
                },
                SecondaryRule {
                    event_type: EventType::Purchase,
                    when_present: &["cost"],
                    nonzero: Some("cost"),
                    map: &[("cost", "amount")],
                },
            ],
        },
        EventDescriptor {
            event_type: EventType::Repair,
            keywords: &[
                "repair",
                "repaired",
                "fixed",
                "mechanic",
                "brakes",
                "transmission",
                "alternator",
            ],
            fields: &[
                FieldSpec {
                    name: "cost",
                    kind: FieldKind::Currency,
                    pattern: Some(FieldPattern::Currency),
                },
                FieldSpec {
                    name: "description",
                    kind: FieldKind::Text,
                    pattern: None,
                },
                FieldSpec {
                    name: "vendor",
                    kind: FieldKind::Text,
                    pattern: None,
                },
                FieldSpec {
                    name: "odometer",
                    kind: FieldKind::Integer,
                    pattern: Some(FieldPattern::Odometer),
                },
                FieldSpec {
                    name: "date",
                    kind: FieldKind::Date,
                    pattern: Some(FieldPattern::IsoDate),
                },
            ],
            required: &["cost"],
            derivations: &[],
            secondaries: &[SecondaryRule {
                event_type: EventType::Purchase,
                when_present: &["cost"],
                nonzero: Some("cost"),
                map: &[("cost", "amount")],
            }],
        },
        EventDescriptor {
            event_type: EventType::Maintenance,
            keywords: &[
                "oil change",
                "maintenance",
                "tune up",
                "tire rotation",
                "serviced",
                "inspection",
                "air filter",
            ],
            fields: &[
                FieldSpec {
                    name: "cost",
                    kind: FieldKind::Currency,
                    pattern: Some(FieldPattern::Currency),
                },
                FieldSpec {
                    name: "service_type",
                    kind: FieldKind::Text,
                    pattern: Some(FieldPattern::KeywordMap(SERVICE_TYPES)),
                },
                FieldSpec {
                    name: "odometer",
                    kind: FieldKind::Integer,
                    pattern: Some(FieldPattern::Odometer),
                },
                FieldSpec {
                    name: "vendor",
                    kind: FieldKind::Text,
                    pattern: None,
                },
                FieldSpec {
                    name: "date",
                    kind: FieldKind::Date,
                    pattern: Some(FieldPattern::IsoDate),
                },
            ],
            required: &["cost", "service_type"],
            derivations: &[],
            secondaries: &[SecondaryRule {
                event_type: EventType::Purchase,
                when_present: &["cost"],
                nonzero: Some("cost"),
                map: &[("cost", "amount")],
            }],
        },
        EventDescriptor {
            event_type: EventType::Travel,
            keywords: &["driving to", "drove to", "road trip", "travel", "traveling"],
            fields: &[
                FieldSpec {
                    name: "destination",
                    kind: FieldKind::Text,
                    pattern: Some(FieldPattern::Destination),
                },
                FieldSpec {
                    name: "purpose",
                    kind: FieldKind::Text,
                    pattern: None,
                },
                FieldSpec {
                    name: "odometer",
                    kind: FieldKind::Integer,
                    pattern: Some(FieldPattern::Odometer),
                },
                FieldSpec {
                    name: "distance",
                    kind: FieldKind::Distance,
                    pattern: Some(FieldPattern::DistanceAmount),
                },
                FieldSpec {
                    name: "date",
                    kind: FieldKind::Date,
                    pattern: Some(FieldPattern::IsoDate),
                },
            ],
            required: &["destination"],
            derivations: &[],
            secondaries: &[],
        },
        // ------------------------------------------------------------ Money
        EventDescriptor {
            event_type: EventType::Purchase,
            keywords: &["bought", "purchased", "paid for", "spent", "purchase"],
            fields: &[
                FieldSpec {
                    name: "amount",
                    kind: FieldKind::Currency,
                    pattern: Some(FieldPattern::Currency),
                },
                FieldSpec {
                    name: "merchant",
                    kind: FieldKind::Text,
                    pattern: None,
                },
                FieldSpec {
                    name: "category",
                    kind: FieldKind::Text,
                    pattern: None,
                },
                FieldSpec {
                    name: "payment_method",
                    kind: FieldKind::Text,
                    pattern: None,
                },
                FieldSpec {
                    name: "date",
                    kind: FieldKind::Date,
                    pattern: Some(FieldPattern::IsoDate),
                },
                FieldSpec {
                    name: "notes",
                    kind: FieldKind::Text,
                    pattern: None,
                },
            ],
            required: &["amount"],
            derivations: &[],
            secondaries: &[],
        },
        EventDescriptor {
            event_type: EventType::Return,
            keywords: &["returned", "refund", "refunded"],
            fields: &[
                FieldSpec {
                    name: "amount",
                    kind: FieldKind::Currency,
                    pattern: Some(FieldPattern::Currency),
                },
                FieldSpec {
                    name: "merchant",
                    kind: FieldKind::Text,
                    pattern: None,
                },
                FieldSpec {
                    name: "reason",
                    kind: FieldKind::Text,
                    pattern: None,
                },
                FieldSpec {
                    name: "date",
                    kind: FieldKind::Date,
                    pattern: Some(FieldPattern::IsoDate),
                },
            ],
            required: &["amount"],
            derivations: &[],
            secondaries: &[],
        },
        EventDescriptor {
            event_type: EventType::Transfer,
            keywords: &["transfer", "transferred", "moved money", "move money"],
            fields: &[
                FieldSpec {
                    name: "amount",
                    kind: FieldKind::Currency,
                    pattern: Some(FieldPattern::Currency),
                },
                FieldSpec {
                    name: "from_account",
                    kind: FieldKind::Text,
                    pattern: Some(FieldPattern::AccountFrom),
                },
                FieldSpec {
                    name: "to_account",
                    kind: FieldKind::Text,
                    pattern: Some(FieldPattern::AccountTo),
                },
                FieldSpec {
                    name: "date",
                    kind: FieldKind::Date,
                    pattern: Some(FieldPattern::IsoDate),
                },
            ],
            required: &["amount", "from_account", "to_account"],
            derivations: &[],
            secondaries: &[],
        },
        EventDescriptor {
            event_type: EventType::ApPayment,
            keywords: &["paid invoice", "bill payment", "paid the bill", "payable"],
            fields: &[
                FieldSpec {
                    name: "amount",
                    kind: FieldKind::Currency,
                    pattern: Some(FieldPattern::Currency),
                },
                FieldSpec {
                    name: "vendor",
                    kind: FieldKind::Text,
                    pattern: None,
                },
                FieldSpec {
                    name: "invoice_number",
                    kind: FieldKind::Text,
                    pattern: None,
                },
                FieldSpec {
                    name: "date",
                    kind: FieldKind::Date,
                    pattern: Some(FieldPattern::IsoDate),
                },
            ],
            required: &["amount"],
            derivations: &[],
            secondaries: &[],
        },
        EventDescriptor {
            event_type: EventType::ApInvoice,
            keywords: &["received invoice", "invoice from", "billed us", "new invoice"],
            fields: &[
                FieldSpec {
                    name: "amount",
                    kind: FieldKind::Currency,
                    pattern: Some(FieldPattern::Currency),
                },
                FieldSpec {
                    name: "vendor",
                    kind: FieldKind::Text,
                    pattern: None,
                },
                FieldSpec {
                    name: "invoice_number",
                    kind: FieldKind::Text,
                    pattern: None,
                },
                FieldSpec {
                    name: "due_date",
                    kind: FieldKind::Date,
                    pattern: Some(FieldPattern::IsoDate),
                },
            ],
            required: &["amount"],
            derivations: &[],
            secondaries: &[],
        },
        EventDescriptor {
            event_type: EventType::Deposit,
            keywords: &["deposit", "deposited"],
            fields: &[
                FieldSpec {
                    name: "amount",
                    kind: FieldKind::Currency,
                    pattern: Some(FieldPattern::Currency),
                },
                FieldSpec {
                    name: "to_account",
                    kind: FieldKind::Text,
                    pattern: Some(FieldPattern::AccountTo),
                },
                FieldSpec {
                    name: "source",
                    kind: FieldKind::Text,
                    pattern: None,
                },
                FieldSpec {
                    name: "date",
                    kind: FieldKind::Date,
                    pattern: Some(FieldPattern::IsoDate),
                },
            ],
            required: &["amount"],
            derivations: &[],
            secondaries: &[],
        },
        EventDescriptor {
            event_type: EventType::Ach,
            keywords: &["ach", "direct debit", "bank draft"],
            fields: &[
                FieldSpec {
                    name: "amount",
                    kind: FieldKind::Currency,
                    pattern: Some(FieldPattern::Currency),
                },
                FieldSpec {
                    name: "counterparty",
                    kind: FieldKind::Text,
                    pattern: None,
                },
                FieldSpec {
                    name: "date",
                    kind: FieldKind::Date,
                    pattern: Some(FieldPattern::IsoDate),
                },
            ],
            required: &["amount"],
            derivations: &[],
            secondaries: &[],
        },
        EventDescriptor {
            event_type: EventType::Sales,
            keywords: &["sold", "sale", "sales"],
            fields: &[
                FieldSpec {
                    name: "amount",
                    kind: FieldKind::Currency,
                    pattern: Some(FieldPattern::Currency),
                },
                FieldSpec {
                    name: "customer",
                    kind: FieldKind::Text,
                    pattern: None,
                },
                FieldSpec {
                    name: "item",
                    kind: FieldKind::Text,
                    pattern: None,
                },
                FieldSpec {
                    name: "date",
                    kind: FieldKind::Date,
                    pattern: Some(FieldPattern::IsoDate),
                },
            ],
            required: &["amount"],
            derivations: &[],
            secondaries: &[],
        },
        // ----------------------------------------------------------- Health
        EventDescriptor {
            event_type: EventType::Meal,
            keywords: &["ate", "breakfast", "lunch", "dinner", "meal", "snack"],
            fields: &[
                FieldSpec {
                    name: "meal_type",
                    kind: FieldKind::Text,
                    pattern: Some(FieldPattern::KeywordMap(MEAL_TYPES)),
                },
                FieldSpec {
                    name: "calories",
                    kind: FieldKind::Integer,
                    pattern: Some(FieldPattern::Calories),
                },
                FieldSpec {
                    name: "description",
                    kind: FieldKind::Text,
                    pattern: Some(FieldPattern::Capture(r"(?i)\bate\s+(.+)")),
                },
                FieldSpec {
                    name: "date",
                    kind: FieldKind::Date,
                    pattern: Some(FieldPattern::IsoDate),
                },
            ],
            required: &["meal_type"],
            derivations: &[],
            secondaries: &[],
        },
        EventDescriptor {
            event_type: EventType::Exercise,
            keywords: &[
                "workout",
                "worked out",
                "exercise",
                "exercised",
                "ran",
                "gym",
                "lifted",
                "swam",
                "biked",
            ],
            fields: &[
                FieldSpec {
                    name: "activity",
                    kind: FieldKind::Text,
                    pattern: Some(FieldPattern::KeywordMap(ACTIVITIES)),
                },
                FieldSpec {
                    name: "duration_minutes",
                    kind: FieldKind::Integer,
                    pattern: Some(FieldPattern::DurationMinutes),
                },
                FieldSpec {
                    name: "calories",
                    kind: FieldKind::Integer,
                    pattern: Some(FieldPattern::Calories),
                },
                FieldSpec {
                    name: "distance",
                    kind: FieldKind::Distance,
                    pattern: Some(FieldPattern::DistanceAmount),
                },
                FieldSpec {
                    name: "date",
                    kind: FieldKind::Date,
                    pattern: Some(FieldPattern::IsoDate),
                },
            ],
            required: &["activity"],
            derivations: &[],
            secondaries: &[],
        },
        EventDescriptor {
            event_type: EventType::Hike,
            keywords: &["hike", "hiked", "hiking", "trail"],
            fields: &[
                FieldSpec {
                    name: "trail",
                    kind: FieldKind::Text,
                    pattern: None,
                },
                FieldSpec {
                    name: "distance",
                    kind: FieldKind::Distance,
                    pattern: Some(FieldPattern::DistanceAmount),
                },
                FieldSpec {
                    name: "duration_minutes",
                    kind: FieldKind::Integer,
                    pattern: Some(FieldPattern::DurationMinutes),
                },
                FieldSpec {
                    name: "date",
                    kind: FieldKind::Date,
                    pattern: Some(FieldPattern::IsoDate),
                },
            ],
            required: &[],
            derivations: &[],
            secondaries: &[],
        },
        // --------------------------------------------------- Food inventory
        EventDescriptor {
            event_type: EventType::Stock,
            keywords: &["stocked", "stock up", "restocked", "groceries"],
            fields: &[
                FieldSpec {
                    name: "item",
                    kind: FieldKind::Text,
                    pattern: None,
                },
                FieldSpec {
                    name: "quantity",
                    kind: FieldKind::Integer,
                    pattern: None,
                },
                FieldSpec {
                    name: "unit",
                    kind: FieldKind::Text,
                    pattern: None,
                },
                FieldSpec {
                    name: "location",
                    kind: FieldKind::Text,
                    pattern: None,
                },
                FieldSpec {
                    name: "expiry_date",
                    kind: FieldKind::Date,
                    pattern: Some(FieldPattern::IsoDate),
                },
            ],
            required: &["item"],
            derivations: &[],
            secondaries: &[],
        },
        EventDescriptor {
            event_type: EventType::UseFood,
            keywords: &["used up", "used the last", "finished the", "ran out"],
            fields: &[
                FieldSpec {
                    name: "item",
                    kind: FieldKind::Text,
                    pattern: None,
                },
                FieldSpec {
                    name: "quantity",
                    kind: FieldKind::Integer,
                    pattern: None,
                },
                FieldSpec {
                    name: "unit",
                    kind: FieldKind::Text,
                    pattern: None,
                },
            ],
            required: &["item"],
            derivations: &[],
            secondaries: &[],
        },
        EventDescriptor {
            event_type: EventType::FoodExpiryCheck,
            keywords: &["expiring", "expiry", "expiration check", "going bad"],
            fields: &[
                FieldSpec {
                    name: "location",
                    kind: FieldKind::Text,
                    pattern: None,
                },
            ],
            required: &[],
            derivations: &[],
            secondaries: &[],
        },
        // --------------------------------------------------------- Calendar
        EventDescriptor {
            event_type: EventType::Appointment,
            keywords: &["appointment", "meeting", "scheduled"],
            fields: &[
                FieldSpec {
                    name: "title",
                    kind: FieldKind::Text,
                    pattern: Some(FieldPattern::Capture(
                        r"(?i)\b(?:appointment|meeting)\s+(?:with\s+|for\s+)?(.+)",
                    )),
                },
                FieldSpec {
                    name: "datetime",
                    kind: FieldKind::Date,
                    pattern: Some(FieldPattern::IsoDate),
                },
                FieldSpec {
                    name: "location",
                    kind: FieldKind::Text,
                    pattern: None,
                },
            ],
            required: &["title"],
            derivations: &[],
            secondaries: &[],
        },
        EventDescriptor {
            event_type: EventType::Reminder,
            keywords: &["remind me", "reminder"],
            fields: &[
                FieldSpec {
                    name: "description",
                    kind: FieldKind::Text,
                    pattern: Some(FieldPattern::Capture(
                        r"(?i)\bremind(?:er)?(?:\s+me)?(?:\s+to)?\s+(.+)",
                    )),
                },
                FieldSpec {
                    name: "datetime",
                    kind: FieldKind::Date,
                    pattern: Some(FieldPattern::IsoDate),
                },
            ],
            required: &["description"],
            derivations: &[],
            secondaries: &[],
        },
        EventDescriptor {
            event_type: EventType::Task,
            keywords: &["todo", "task", "need to"],
            fields: &[
                FieldSpec {
                    name: "description",
                    kind: FieldKind::Text,
                    pattern: Some(FieldPattern::Capture(
                        r"(?i)\b(?:todo|task|need to)\s*:?\s*(.+)",
                    )),
                },
                FieldSpec {
                    name: "due_date",
                    kind: FieldKind::Date,
                    pattern: Some(FieldPattern::IsoDate),
                },
                FieldSpec {
                    name: "priority",
                    kind: FieldKind::Text,
                    pattern: None,
                },
            ],
            required: &["description"],
            derivations: &[],
            secondaries: &[],
        },
    ]
}
