//! Rule based recognizer for canonical constraint phrasings
//!
//! A clause is lexed and each entry of [`PATTERNS`] is tried, in order, at every token
//! position. A pattern is a sequence of [`Step`]s matched with backtracking. The first
//! pattern that matches anywhere in the clause wins, and its confidence is fixed per
//! constraint type.
//!
//! A negation the pattern does not consume itself, before the match or inside a skipped
//! span, voids the match: "do not group node 1 with node 2" is not a grouping.
use tracing::trace;

use crate::constraints::lexer::tokenize;
use crate::constraints::token::Token;
use crate::constraints::{
    params, Clause, ConstraintEntity, ConstraintType, ParsedConstraint, ParsingMethod,
    PriorityLevel,
};

// region Word Sets
pub(crate) const NODE_WORDS: &[&str] = &[
    "node",
    "nodes",
    "customer",
    "customers",
    "location",
    "locations",
    "stop",
    "stops",
    "client",
    "clients",
    "site",
    "sites",
    "point",
    "points",
];
pub(crate) const VEHICLE_WORDS: &[&str] = &["vehicle", "vehicles", "truck", "trucks", "van", "vans"];
const ROUTE_WORDS: &[&str] = &["route", "routes", "tour", "tours", "trip", "trips"];
const ROUTE_OR_VEHICLE: &[&str] = &[
    "route", "routes", "tour", "tours", "trip", "trips", "vehicle", "vehicles", "truck", "trucks",
    "van", "vans",
];
const MODALS: &[&str] = &[
    "should", "must", "shall", "will", "can", "may", "need", "needs", "to", "always", "also",
    "only", "do", "does",
];
const NEGATIONS: &[&str] = &[
    "not", "never", "cannot", "can't", "shouldn't", "mustn't", "won't", "don't", "doesn't",
    "cant", "shouldnt", "mustnt", "wont", "dont", "doesnt",
];
/// Words that negate a clause without fitting where a pattern expects a negation
const NEGATION_CUES: &[&str] = &["avoid", "avoiding", "without", "no", "neither", "nor"];
/// Words allowed between a count and its vehicle word ("4 delivery vans")
const COUNT_ADJECTIVES: &[&str] = &[
    "more", "fewer", "less", "of", "the", "our", "delivery", "active", "available", "used",
    "different", "distinct", "separate", "additional", "extra",
];
const BE: &[&str] = &["be", "is", "are", "get", "stay", "remain", "kept", "go"];
const SERVED: &[&str] = &[
    "served",
    "visited",
    "delivered",
    "routed",
    "assigned",
    "placed",
    "put",
    "scheduled",
    "handled",
];
const SERVE_VERBS: &[&str] = &[
    "serve", "visit", "deliver", "put", "place", "assign", "keep", "route", "schedule",
];
const GROUP_VERBS: &[&str] = &["group", "pair", "combine", "cluster", "bundle"];
const ON: &[&str] = &["on", "in", "by", "under", "within", "with"];
const DISTANCE_WORDS: &[&str] = &["distance", "distances", "length", "lengths"];
const UNITS: &[&str] = &[
    "km",
    "kms",
    "kilometer",
    "kilometers",
    "kilometre",
    "kilometres",
    "mi",
    "mile",
    "miles",
    "m",
    "meter",
    "meters",
    "metre",
    "metres",
    "unit",
    "units",
];
// endregion Word Sets

// region Phrase Sets
const SAME: &[&[&str]] = &[&["the", "same"], &["one", "and", "the", "same"], &["a", "single"], &["one"]];
const DIFFERENT: &[&[&str]] = &[&["different"], &["separate"], &["distinct"]];
const AT_LEAST: &[&[&str]] = &[
    &["at", "least"],
    &["minimum", "of"],
    &["minimum"],
    &["min"],
    &["no", "fewer", "than"],
    &["no", "less", "than"],
    &["not", "fewer", "than"],
    &["not", "less", "than"],
];
const AT_MOST: &[&[&str]] = &[
    &["at", "most"],
    &["maximum", "of"],
    &["maximum"],
    &["max"],
    &["no", "more", "than"],
    &["not", "more", "than"],
    &["up", "to"],
];
const EXCEED: &[&[&str]] = &[
    &["exceed"],
    &["exceeds"],
    &["surpass"],
    &["go", "over"],
    &["go", "beyond"],
    &["be", "longer", "than"],
    &["be", "more", "than"],
    &["be", "over"],
    &["be", "above"],
    &["be", "greater", "than"],
];
const WITHIN: &[&[&str]] = &[
    &["at", "most"],
    &["no", "more", "than"],
    &["no", "longer", "than"],
    &["less", "than"],
    &["shorter", "than"],
    &["under"],
    &["below"],
    &["within"],
    &["up", "to"],
    &["limited", "to"],
    &["capped", "at"],
];
const TRAVEL_BEYOND: &[&[&str]] = &[
    &["more", "than"],
    &["over"],
    &["beyond"],
    &["further", "than"],
    &["farther", "than"],
];
const MAXIMUM: &[&[&str]] = &[&["maximum"], &["max"], &["longest"]];
// endregion Phrase Sets

/// A single matching step
#[derive(Debug, Clone, Copy)]
enum Step {
    /// Exactly one word from the set
    Word(&'static [&'static str]),
    /// Zero or one word from the set
    OptWord(&'static [&'static str]),
    /// Any number of words from the set
    Skip(&'static [&'static str]),
    /// One of several word sequences
    Phrase(&'static [&'static [&'static str]]),
    /// Up to n arbitrary tokens
    Filler(usize),
    /// A node word followed by an index
    Node,
    /// An index, optionally preceded by a node word
    NodeRef,
    /// A vehicle word followed by an index
    Vehicle,
    /// A vehicle word without index
    VehicleWord,
    Int,
    Number,
    /// Optional distance unit
    Unit,
    /// A priority level word
    Level,
}

/// What a matched pattern produces
#[derive(Debug, Clone, Copy)]
enum Shape {
    Separation,
    Grouping,
    Assignment,
    MinCount,
    MaxCount,
    ExactCount,
    CountRange,
    Distance,
    Priority(Option<PriorityLevel>),
}

impl Shape {
    fn constraint_type(&self) -> ConstraintType {
        match self {
            Shape::Separation => ConstraintType::NodeSeparation,
            Shape::Grouping => ConstraintType::NodeGrouping,
            Shape::Assignment => ConstraintType::VehicleAssignment,
            Shape::MinCount | Shape::MaxCount | Shape::ExactCount | Shape::CountRange => {
                ConstraintType::VehicleCountBound
            }
            Shape::Distance => ConstraintType::RouteDistanceLimit,
            Shape::Priority(_) => ConstraintType::Priority,
        }
    }
}

struct Pattern {
    name: &'static str,
    shape: Shape,
    steps: &'static [Step],
}

use Step::*;

/// Recognized phrasings, tried in order
static PATTERNS: &[Pattern] = &[
    // region Separation
    Pattern {
        name: "pair_not_together",
        shape: Shape::Separation,
        steps: &[
            Node,
            Word(&["and", "with"]),
            NodeRef,
            Skip(MODALS),
            Word(NEGATIONS),
            Skip(BE),
            OptWord(SERVED),
            Word(&["together"]),
        ],
    },
    Pattern {
        name: "pair_not_same_route",
        shape: Shape::Separation,
        steps: &[
            Node,
            Word(&["and", "with"]),
            NodeRef,
            Skip(MODALS),
            Word(NEGATIONS),
            Skip(BE),
            OptWord(SERVED),
            Word(ON),
            Phrase(SAME),
            Word(ROUTE_OR_VEHICLE),
        ],
    },
    Pattern {
        name: "pair_different_routes",
        shape: Shape::Separation,
        steps: &[
            Node,
            Word(&["and", "with"]),
            NodeRef,
            Skip(MODALS),
            Skip(BE),
            OptWord(SERVED),
            Word(ON),
            Phrase(DIFFERENT),
            Word(ROUTE_OR_VEHICLE),
        ],
    },
    Pattern {
        name: "pair_kept_apart",
        shape: Shape::Separation,
        steps: &[
            Node,
            Word(&["and", "with"]),
            NodeRef,
            Skip(MODALS),
            Skip(BE),
            Word(&["separated", "separate", "apart", "split"]),
        ],
    },
    Pattern {
        name: "separate_pair",
        shape: Shape::Separation,
        steps: &[
            Word(&["separate", "split"]),
            Node,
            Word(&["and", "from"]),
            NodeRef,
        ],
    },
    Pattern {
        name: "never_serve_pair_together",
        shape: Shape::Separation,
        steps: &[
            Word(NEGATIONS),
            OptWord(&["ever"]),
            Word(SERVE_VERBS),
            Node,
            Word(&["and", "with"]),
            NodeRef,
            Word(&["together"]),
        ],
    },
    Pattern {
        name: "never_serve_pair_same_route",
        shape: Shape::Separation,
        steps: &[
            Word(NEGATIONS),
            OptWord(&["ever"]),
            Word(SERVE_VERBS),
            Node,
            Word(&["and", "with"]),
            NodeRef,
            Word(ON),
            Phrase(SAME),
            Word(ROUTE_OR_VEHICLE),
        ],
    },
    Pattern {
        name: "never_group_pair",
        shape: Shape::Separation,
        steps: &[
            Word(NEGATIONS),
            OptWord(&["ever"]),
            Word(GROUP_VERBS),
            Node,
            Word(&["and", "with"]),
            NodeRef,
        ],
    },
    // endregion Separation
    // region Grouping
    Pattern {
        name: "pair_together",
        shape: Shape::Grouping,
        steps: &[
            Node,
            Word(&["and", "with"]),
            NodeRef,
            Skip(MODALS),
            Skip(BE),
            OptWord(SERVED),
            Word(&["together"]),
        ],
    },
    Pattern {
        name: "pair_same_route",
        shape: Shape::Grouping,
        steps: &[
            Node,
            Word(&["and", "with"]),
            NodeRef,
            Skip(MODALS),
            Skip(BE),
            OptWord(SERVED),
            Word(ON),
            Phrase(SAME),
            Word(ROUTE_OR_VEHICLE),
        ],
    },
    Pattern {
        name: "group_pair",
        shape: Shape::Grouping,
        steps: &[
            Word(GROUP_VERBS),
            Node,
            Word(&["and", "with"]),
            NodeRef,
        ],
    },
    Pattern {
        name: "serve_pair_together",
        shape: Shape::Grouping,
        steps: &[
            Word(SERVE_VERBS),
            Node,
            Word(&["and", "with"]),
            NodeRef,
            Word(&["together"]),
        ],
    },
    // endregion Grouping
    // region Assignment
    Pattern {
        name: "node_served_by_vehicle",
        shape: Shape::Assignment,
        steps: &[
            Node,
            Skip(MODALS),
            Skip(BE),
            Word(&[
                "served",
                "visited",
                "handled",
                "delivered",
                "assigned",
                "allocated",
                "covered",
            ]),
            Word(&["by", "to", "with", "on"]),
            Vehicle,
        ],
    },
    Pattern {
        name: "assign_node_to_vehicle",
        shape: Shape::Assignment,
        steps: &[
            Word(&["assign", "allocate", "give"]),
            Node,
            Word(&["to"]),
            Vehicle,
        ],
    },
    Pattern {
        name: "vehicle_serves_node",
        shape: Shape::Assignment,
        steps: &[
            Vehicle,
            Skip(MODALS),
            Word(&[
                "serve", "serves", "visit", "visits", "handle", "handles", "cover", "covers",
                "deliver",
            ]),
            OptWord(&["to"]),
            Node,
        ],
    },
    // endregion Assignment
    // region Vehicle Count
    Pattern {
        name: "between_counts",
        shape: Shape::CountRange,
        steps: &[
            Word(&["between"]),
            Int,
            Word(&["and", "to"]),
            Int,
            Skip(COUNT_ADJECTIVES),
            VehicleWord,
        ],
    },
    Pattern {
        name: "exact_count",
        shape: Shape::ExactCount,
        steps: &[Word(&["exactly", "precisely"]), Int, Skip(COUNT_ADJECTIVES), VehicleWord],
    },
    Pattern {
        name: "min_count",
        shape: Shape::MinCount,
        steps: &[Phrase(AT_LEAST), Int, Skip(COUNT_ADJECTIVES), VehicleWord],
    },
    Pattern {
        name: "max_count",
        shape: Shape::MaxCount,
        steps: &[Phrase(AT_MOST), Int, Skip(COUNT_ADJECTIVES), VehicleWord],
    },
    Pattern {
        name: "number_of_vehicles_min",
        shape: Shape::MinCount,
        steps: &[
            Word(&["number", "count"]),
            Word(&["of"]),
            OptWord(&["used", "active"]),
            VehicleWord,
            OptWord(&["used", "deployed", "dispatched"]),
            Skip(MODALS),
            Skip(BE),
            Phrase(AT_LEAST),
            Int,
        ],
    },
    Pattern {
        name: "number_of_vehicles_max",
        shape: Shape::MaxCount,
        steps: &[
            Word(&["number", "count"]),
            Word(&["of"]),
            OptWord(&["used", "active"]),
            VehicleWord,
            OptWord(&["used", "deployed", "dispatched"]),
            Skip(MODALS),
            Skip(BE),
            Phrase(AT_MOST),
            Int,
        ],
    },
    // endregion Vehicle Count
    // region Route Distance
    Pattern {
        name: "route_not_exceed",
        shape: Shape::Distance,
        steps: &[
            Word(ROUTE_WORDS),
            OptWord(DISTANCE_WORDS),
            Skip(MODALS),
            Word(NEGATIONS),
            Phrase(EXCEED),
            Number,
            Unit,
        ],
    },
    Pattern {
        name: "route_within",
        shape: Shape::Distance,
        steps: &[
            Word(ROUTE_WORDS),
            OptWord(DISTANCE_WORDS),
            Skip(MODALS),
            Skip(BE),
            Phrase(WITHIN),
            Number,
            Unit,
        ],
    },
    Pattern {
        name: "maximum_route_distance",
        shape: Shape::Distance,
        steps: &[
            Phrase(MAXIMUM),
            OptWord(&["route", "tour", "trip", "travel", "driving"]),
            Word(DISTANCE_WORDS),
            Filler(4),
            Number,
            Unit,
        ],
    },
    Pattern {
        name: "vehicle_not_travel_beyond",
        shape: Shape::Distance,
        steps: &[
            VehicleWord,
            Skip(MODALS),
            Word(NEGATIONS),
            Word(&["travel", "drive", "go"]),
            Phrase(TRAVEL_BEYOND),
            Number,
            Unit,
        ],
    },
    Pattern {
        name: "vehicle_travel_within",
        shape: Shape::Distance,
        steps: &[
            VehicleWord,
            Skip(MODALS),
            Word(&["travel", "drive", "go"]),
            Phrase(WITHIN),
            Number,
            Unit,
        ],
    },
    // endregion Route Distance
    // region Priority
    Pattern {
        name: "node_has_level_priority",
        shape: Shape::Priority(None),
        steps: &[
            Node,
            Skip(&["has", "have", "is", "gets", "get", "should", "must", "be", "given", "a", "an"]),
            Level,
            Filler(1),
            Word(&["priority"]),
        ],
    },
    Pattern {
        name: "node_served_first_or_last",
        shape: Shape::Priority(None),
        steps: &[
            Node,
            Skip(MODALS),
            Skip(BE),
            OptWord(SERVED),
            Level,
        ],
    },
    Pattern {
        name: "prioritize_node",
        shape: Shape::Priority(Some(PriorityLevel::High)),
        steps: &[Word(&["prioritize", "prioritise", "expedite"]), Node],
    },
    Pattern {
        name: "deprioritize_node",
        shape: Shape::Priority(Some(PriorityLevel::Low)),
        steps: &[Word(&["deprioritize", "deprioritise", "postpone"]), Node],
    },
    Pattern {
        name: "serve_node_first_or_last",
        shape: Shape::Priority(None),
        steps: &[Word(SERVE_VERBS), Node, Level],
    },
    Pattern {
        name: "level_priority_for_node",
        shape: Shape::Priority(None),
        steps: &[
            Level,
            Word(&["priority"]),
            OptWord(&["for", "to", "on"]),
            Node,
        ],
    },
    // endregion Priority
];

/// Values captured while matching
#[derive(Debug, Clone, Default)]
struct Captures {
    nodes: Vec<usize>,
    vehicles: Vec<usize>,
    ints: Vec<u64>,
    number: Option<f64>,
    unit: Option<String>,
    level: Option<PriorityLevel>,
    /// Negation words consumed by the pattern's own steps
    negations: usize,
    /// Token position after the match
    end: usize,
}

/// Fixed confidence of a pattern match, by constraint type
pub fn pattern_confidence(constraint_type: ConstraintType) -> f64 {
    match constraint_type {
        ConstraintType::NodeSeparation => 0.90,
        ConstraintType::NodeGrouping => 0.90,
        ConstraintType::VehicleAssignment => 0.88,
        ConstraintType::VehicleCountBound => 0.92,
        ConstraintType::RouteDistanceLimit => 0.87,
        ConstraintType::Priority => 0.85,
    }
}

/// Match a clause against the pattern table
///
/// Returns `None` when no pattern matches. Entity indices are taken verbatim from the
/// text; range checks happen at compile time.
pub fn match_clause(clause: &Clause) -> Option<ParsedConstraint> {
    let tokens = tokenize(&clause.normalized).ok()?;
    for pattern in PATTERNS {
        for start in 0..tokens.len() {
            let Some(captures) = match_steps(&tokens, start, pattern.steps, &Captures::default())
            else {
                continue;
            };
            let negations = tokens[..captures.end]
                .iter()
                .filter(|t| t.word().is_some_and(is_negation))
                .count();
            if negations > captures.negations {
                trace!(pattern = pattern.name, start, "match voided by negation");
                continue;
            }
            if let Some(parsed) = build(pattern.shape, &captures, clause) {
                trace!(pattern = pattern.name, start, "pattern matched");
                return Some(parsed);
            }
        }
    }
    None
}

fn build(shape: Shape, captures: &Captures, clause: &Clause) -> Option<ParsedConstraint> {
    let constraint_type = shape.constraint_type();
    let parsed = |entities: Vec<ConstraintEntity>| {
        ParsedConstraint::new(
            constraint_type,
            entities,
            pattern_confidence(constraint_type),
            ParsingMethod::Pattern,
            &clause.source,
        )
    };
    let constraint = match shape {
        Shape::Separation | Shape::Grouping => match captures.nodes.as_slice() {
            [a, b] => parsed(vec![ConstraintEntity::node(*a), ConstraintEntity::node(*b)]),
            _ => return None,
        },
        Shape::Assignment => parsed(vec![
            ConstraintEntity::node(*captures.nodes.first()?),
            ConstraintEntity::vehicle(*captures.vehicles.first()?),
        ]),
        Shape::MinCount => parsed(vec![]).with_parameter(params::MIN_COUNT, *captures.ints.first()?),
        Shape::MaxCount => parsed(vec![]).with_parameter(params::MAX_COUNT, *captures.ints.first()?),
        Shape::ExactCount => {
            let count = *captures.ints.first()?;
            parsed(vec![])
                .with_parameter(params::MIN_COUNT, count)
                .with_parameter(params::MAX_COUNT, count)
        }
        Shape::CountRange => match captures.ints.as_slice() {
            [a, b] => parsed(vec![])
                .with_parameter(params::MIN_COUNT, *a.min(b))
                .with_parameter(params::MAX_COUNT, *a.max(b)),
            _ => return None,
        },
        Shape::Distance => {
            let mut constraint =
                parsed(vec![]).with_parameter(params::MAX_DISTANCE, captures.number?);
            if let Some(unit) = &captures.unit {
                constraint = constraint.with_parameter(params::UNIT, unit.as_str());
            }
            constraint
        }
        Shape::Priority(fixed) => {
            let level = fixed.or(captures.level)?;
            parsed(vec![ConstraintEntity::node(*captures.nodes.first()?)])
                .with_parameter(params::LEVEL, level.as_str())
        }
    };
    Some(constraint.describe())
}

// region Matching
fn match_steps(
    tokens: &[Token],
    pos: usize,
    steps: &[Step],
    captures: &Captures,
) -> Option<Captures> {
    let Some((step, rest)) = steps.split_first() else {
        let mut found = captures.clone();
        found.end = pos;
        return Some(found);
    };
    match step {
        Word(words) => {
            let token = tokens.get(pos)?;
            if !token.is_word_in(words) {
                return None;
            }
            let mut captures = captures.clone();
            if token.word().is_some_and(is_negation) {
                captures.negations += 1;
            }
            match_steps(tokens, pos + 1, rest, &captures)
        }
        OptWord(words) => {
            if is_word_at(tokens, pos, words) {
                if let Some(found) = match_steps(tokens, pos + 1, rest, captures) {
                    return Some(found);
                }
            }
            match_steps(tokens, pos, rest, captures)
        }
        Skip(words) => {
            let mut end = pos;
            while is_word_at(tokens, end, words) {
                end += 1;
            }
            (pos..=end)
                .rev()
                .find_map(|p| match_steps(tokens, p, rest, captures))
        }
        Phrase(alternatives) => alternatives
            .iter()
            .filter(|phrase| phrase_at(tokens, pos, phrase))
            .find_map(|phrase| {
                let mut captures = captures.clone();
                captures.negations += phrase.iter().filter(|w| is_negation(w)).count();
                match_steps(tokens, pos + phrase.len(), rest, &captures)
            }),
        Filler(max) => (pos..=(pos + max).min(tokens.len()))
            .find_map(|p| match_steps(tokens, p, rest, captures)),
        Node | NodeRef => {
            let (index, next) = entity_at(tokens, pos, NODE_WORDS, matches!(step, Node))?;
            let mut captures = captures.clone();
            captures.nodes.push(index);
            match_steps(tokens, next, rest, &captures)
        }
        Vehicle => {
            let (index, next) = entity_at(tokens, pos, VEHICLE_WORDS, true)?;
            let mut captures = captures.clone();
            captures.vehicles.push(index);
            match_steps(tokens, next, rest, &captures)
        }
        VehicleWord => {
            if is_word_at(tokens, pos, VEHICLE_WORDS) {
                match_steps(tokens, pos + 1, rest, captures)
            } else {
                None
            }
        }
        Int => {
            let value = tokens.get(pos)?.integer()?;
            let mut captures = captures.clone();
            captures.ints.push(value);
            match_steps(tokens, pos + 1, rest, &captures)
        }
        Number => {
            let value = tokens.get(pos)?.number()?;
            let mut captures = captures.clone();
            captures.number = Some(value);
            match_steps(tokens, pos + 1, rest, &captures)
        }
        Unit => {
            if let Some(unit) = tokens.get(pos).and_then(|t| t.word()) {
                if UNITS.contains(&unit) {
                    let mut with_unit = captures.clone();
                    with_unit.unit = Some(unit.to_string());
                    if let Some(found) = match_steps(tokens, pos + 1, rest, &with_unit) {
                        return Some(found);
                    }
                }
            }
            match_steps(tokens, pos, rest, captures)
        }
        Level => {
            let level = PriorityLevel::from_word(tokens.get(pos)?.word()?)?;
            let mut captures = captures.clone();
            captures.level = Some(level);
            match_steps(tokens, pos + 1, rest, &captures)
        }
    }
}

fn is_negation(word: &str) -> bool {
    NEGATIONS.contains(&word) || NEGATION_CUES.contains(&word)
}

fn is_word_at(tokens: &[Token], pos: usize, words: &[&str]) -> bool {
    tokens.get(pos).is_some_and(|t| t.is_word_in(words))
}

fn phrase_at(tokens: &[Token], pos: usize, phrase: &[&str]) -> bool {
    phrase
        .iter()
        .enumerate()
        .all(|(offset, word)| tokens.get(pos + offset).and_then(|t| t.word()) == Some(*word))
}

/// Match an entity reference: an optional (or required) kind word, an optional `#` and an
/// index. Returns the index and the position after it.
fn entity_at(
    tokens: &[Token],
    pos: usize,
    words: &[&str],
    word_required: bool,
) -> Option<(usize, usize)> {
    let mut pos = pos;
    if is_word_at(tokens, pos, words) {
        pos += 1;
    } else if word_required {
        return None;
    }
    if matches!(tokens.get(pos), Some(Token::Other('#'))) {
        pos += 1;
    }
    let index = usize::try_from(tokens.get(pos)?.integer()?).unwrap_or(usize::MAX);
    Some((index, pos + 1))
}
// endregion Matching

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::EntityKind;
    use serde_json::json;

    fn parse(text: &str) -> ParsedConstraint {
        match_clause(&Clause::new(text)).unwrap_or_else(|| panic!("no match for {text:?}"))
    }

    fn nodes(c: &ParsedConstraint) -> Vec<usize> {
        c.node_indices().collect()
    }

    #[test]
    fn separation() {
        for text in [
            "node 1 and node 3 should not be served together",
            "Customer 1 and customer 3 cannot be on the same route",
            "node 1 and 3 must be on different routes",
            "separate node 1 from node 3",
            "Nodes 1 and 3 should be kept apart",
            "never serve customer 1 and customer 3 together",
            "do not put stop 1 and stop 3 in the same vehicle",
            "node 1 and node 3 shouldn't be served by the same truck",
            "Do not ever serve node 1 and node 3 together",
            "don't group node 1 with node 3",
            "Do not group node 1 with node 3",
        ] {
            let c = parse(text);
            assert_eq!(c.constraint_type, ConstraintType::NodeSeparation, "{text}");
            assert_eq!(nodes(&c), vec![1, 3], "{text}");
            assert_eq!(c.parsing_method, ParsingMethod::Pattern);
            assert!((c.confidence - 0.90).abs() < 1e-12);
            assert_eq!(c.source_clause, text);
        }
    }

    #[test]
    fn grouping() {
        for text in [
            "node 1 and node 2 should be served together",
            "Group customer 2 with customer 1",
            "location 1 and location 2 must always be on the same route",
            "node #1 and node #2 should be served by the same vehicle",
            "serve node 1 and node 2 together",
        ] {
            let c = parse(text);
            assert_eq!(c.constraint_type, ConstraintType::NodeGrouping, "{text}");
            let mut n = nodes(&c);
            n.sort();
            assert_eq!(n, vec![1, 2], "{text}");
        }
    }

    #[test]
    fn assignment() {
        for text in [
            "node 5 should be served by vehicle 2",
            "assign customer 5 to truck 2",
            "Vehicle 2 must visit node 5",
            "customer 5 must be assigned to van 2",
        ] {
            let c = parse(text);
            assert_eq!(c.constraint_type, ConstraintType::VehicleAssignment, "{text}");
            assert_eq!(
                c.entities,
                vec![ConstraintEntity::node(5), ConstraintEntity::vehicle(2)],
                "{text}"
            );
            assert!((c.confidence - 0.88).abs() < 1e-12);
        }
    }

    #[test]
    fn vehicle_counts() {
        let c = parse("Use at least 2 vehicles");
        assert_eq!(c.constraint_type, ConstraintType::VehicleCountBound);
        assert_eq!(c.integer_parameter(params::MIN_COUNT), Some(2));
        assert_eq!(c.integer_parameter(params::MAX_COUNT), None);
        assert!((c.confidence - 0.92).abs() < 1e-12);

        let c = parse("use a maximum of 3 trucks");
        assert_eq!(c.integer_parameter(params::MAX_COUNT), Some(3));

        let c = parse("no more than 4 delivery vans");
        assert_eq!(c.integer_parameter(params::MAX_COUNT), Some(4));

        let c = parse("the number of vehicles used should be at least 2");
        assert_eq!(c.integer_parameter(params::MIN_COUNT), Some(2));

        let c = parse("use between 4 and 2 vehicles");
        assert_eq!(c.integer_parameter(params::MIN_COUNT), Some(2));
        assert_eq!(c.integer_parameter(params::MAX_COUNT), Some(4));

        let c = parse("Dispatch exactly 3 trucks");
        assert_eq!(c.integer_parameter(params::MIN_COUNT), Some(3));
        assert_eq!(c.integer_parameter(params::MAX_COUNT), Some(3));
    }

    #[test]
    fn route_distance() {
        let c = parse("each route should not exceed 50 km");
        assert_eq!(c.constraint_type, ConstraintType::RouteDistanceLimit);
        assert_eq!(c.parameters.get(params::MAX_DISTANCE), Some(&json!(50.0)));
        assert_eq!(c.string_parameter(params::UNIT), Some("km"));
        assert!((c.confidence - 0.87).abs() < 1e-12);

        let c = parse("Route length must be less than 120.5");
        assert_eq!(c.number_parameter(params::MAX_DISTANCE), Some(120.5));
        assert_eq!(c.string_parameter(params::UNIT), None);

        let c = parse("maximum route distance per vehicle is 80 miles");
        assert_eq!(c.number_parameter(params::MAX_DISTANCE), Some(80.0));
        assert_eq!(c.string_parameter(params::UNIT), Some("miles"));

        let c = parse("each truck must not travel more than 30 units");
        assert_eq!(c.number_parameter(params::MAX_DISTANCE), Some(30.0));
    }

    #[test]
    fn priority() {
        let c = parse("node 4 has high priority");
        assert_eq!(c.constraint_type, ConstraintType::Priority);
        assert_eq!(nodes(&c), vec![4]);
        assert_eq!(c.string_parameter(params::LEVEL), Some("high"));
        assert!((c.confidence - 0.85).abs() < 1e-12);

        let c = parse("Customer 2 is a low-priority stop");
        assert_eq!(c.string_parameter(params::LEVEL), Some("low"));

        let c = parse("customer 7 should be served first");
        assert_eq!(c.string_parameter(params::LEVEL), Some("high"));

        let c = parse("node 3 should be visited last");
        assert_eq!(c.string_parameter(params::LEVEL), Some("low"));

        let c = parse("prioritize stop 6");
        assert_eq!(c.string_parameter(params::LEVEL), Some("high"));

        let c = parse("visit node 6 last");
        assert_eq!(c.string_parameter(params::LEVEL), Some("low"));
    }

    #[test]
    fn indices_are_exact() {
        // Out of range indices are still extracted verbatim
        let c = parse("node 1 and node 99 should be served together");
        assert_eq!(nodes(&c), vec![1, 99]);
        assert!(c.entities.iter().all(|e| e.kind == EntityKind::Node));

        // Indices too large for any instance are kept for the range check
        let c = parse("node 1 and node 99999999999999999999999 should be served together");
        assert_eq!(nodes(&c), vec![1, usize::MAX]);
    }

    #[test]
    fn no_match() {
        for text in [
            "the weather is nice today",
            "node 1 should not be served by vehicle 2",
            "vehicles should be clean",
            "",
            "Do not assign customer 5 to truck 2",
            "don't prioritize node 3",
            "avoid putting node 1 with node 2 on the same route",
            "it is not true that node 1 and node 3 should not be served together",
            "at least 2 stops per truck",
            "no more than 3 customers per van",
        ] {
            assert!(match_clause(&Clause::new(text)).is_none(), "{text}");
        }
    }
}
