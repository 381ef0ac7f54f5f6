//! Natural language routing constraints: parsing tiers, orchestration and compilation
//!
//! Text flows through [`orchestrator::Orchestrator`], which splits it into clauses and
//! resolves each clause with the [`pattern`], [`llm`] and [`fallback`] tiers in that
//! order. The resulting [`ParsedConstraint`]s are turned into linear constraints by
//! [`compiler::compile`].
use std::fmt::{Display, Formatter};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod compiler;
pub mod conflicts;
pub mod fallback;
pub mod lexer;
pub mod llm;
pub mod orchestrator;
pub mod pattern;
pub mod token;

/// Parameter names used by the constraint types
pub mod params {
    pub const MIN_COUNT: &str = "min_count";
    pub const MAX_COUNT: &str = "max_count";
    pub const MAX_DISTANCE: &str = "max_distance";
    pub const UNIT: &str = "unit";
    pub const LEVEL: &str = "level";
}

/// Words dropped from a clause before interpretation
const FILLER_PHRASES: &[&[&str]] = &[
    &["please"],
    &["kindly"],
    &["can", "you"],
    &["could", "you"],
    &["i", "want"],
    &["i", "need"],
    &["we", "need"],
    &["i'd", "like"],
    &["make", "sure", "that"],
    &["make", "sure"],
    &["ensure", "that"],
];

/// One independently interpretable piece of the constraint text
#[derive(Clone, Debug, PartialEq)]
pub struct Clause {
    /// Substring of the original text, reported back for audit
    pub source: String,
    /// Whitespace normalized text with filler phrases removed
    pub normalized: String,
}

impl Clause {
    pub fn new(source: &str) -> Self {
        Clause {
            source: source.to_string(),
            normalized: normalize_clause(source),
        }
    }
}

/// Collapse whitespace and drop filler phrases
pub fn normalize_clause(text: &str) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    let mut kept = Vec::with_capacity(words.len());
    let mut i = 0;
    'words: while i < words.len() {
        for phrase in FILLER_PHRASES {
            if starts_with_phrase(&words[i..], phrase) {
                i += phrase.len();
                continue 'words;
            }
        }
        kept.push(words[i]);
        i += 1;
    }
    kept.join(" ")
}

fn starts_with_phrase(words: &[&str], phrase: &[&str]) -> bool {
    words.len() >= phrase.len()
        && words.iter().zip(phrase).all(|(word, p)| {
            word.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'')
                .eq_ignore_ascii_case(p)
        })
}

/// The closed set of constraint kinds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintType {
    NodeSeparation,
    NodeGrouping,
    VehicleAssignment,
    VehicleCountBound,
    RouteDistanceLimit,
    Priority,
}

impl ConstraintType {
    pub const ALL: [ConstraintType; 6] = [
        ConstraintType::NodeSeparation,
        ConstraintType::NodeGrouping,
        ConstraintType::VehicleAssignment,
        ConstraintType::VehicleCountBound,
        ConstraintType::RouteDistanceLimit,
        ConstraintType::Priority,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConstraintType::NodeSeparation => "node_separation",
            ConstraintType::NodeGrouping => "node_grouping",
            ConstraintType::VehicleAssignment => "vehicle_assignment",
            ConstraintType::VehicleCountBound => "vehicle_count_bound",
            ConstraintType::RouteDistanceLimit => "route_distance_limit",
            ConstraintType::Priority => "priority",
        }
    }

    /// Parse the snake case name of a type
    pub fn from_name(name: &str) -> Option<ConstraintType> {
        let name = name.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }
}

impl Display for ConstraintType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Node,
    Vehicle,
}

/// A node or vehicle referenced by a constraint
///
/// Indices are not checked against the instance until compilation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConstraintEntity {
    pub kind: EntityKind,
    pub index: usize,
}

impl ConstraintEntity {
    pub fn node(index: usize) -> Self {
        ConstraintEntity {
            kind: EntityKind::Node,
            index,
        }
    }

    pub fn vehicle(index: usize) -> Self {
        ConstraintEntity {
            kind: EntityKind::Vehicle,
            index,
        }
    }
}

impl Display for ConstraintEntity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            EntityKind::Node => write!(f, "node {}", self.index),
            EntityKind::Vehicle => write!(f, "vehicle {}", self.index),
        }
    }
}

/// Which tier produced a constraint
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParsingMethod {
    Pattern,
    Llm,
    Fallback,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityLevel {
    High,
    Low,
}

impl PriorityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriorityLevel::High => "high",
            PriorityLevel::Low => "low",
        }
    }

    /// Map a level word to a level
    pub fn from_word(word: &str) -> Option<PriorityLevel> {
        match word.trim().to_ascii_lowercase().as_str() {
            "high" | "highest" | "urgent" | "first" | "early" | "top" => Some(PriorityLevel::High),
            "low" | "lowest" | "last" | "late" | "bottom" => Some(PriorityLevel::Low),
            _ => None,
        }
    }
}

/// One interpreted clause
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ParsedConstraint {
    #[serde(rename = "type")]
    pub constraint_type: ConstraintType,
    pub entities: Vec<ConstraintEntity>,
    pub parameters: IndexMap<String, Value>,
    pub confidence: f64,
    pub parsing_method: ParsingMethod,
    pub mathematical_description: String,
    pub source_clause: String,
}

impl ParsedConstraint {
    pub fn new(
        constraint_type: ConstraintType,
        entities: Vec<ConstraintEntity>,
        confidence: f64,
        parsing_method: ParsingMethod,
        source_clause: &str,
    ) -> Self {
        ParsedConstraint {
            constraint_type,
            entities,
            parameters: IndexMap::new(),
            confidence: confidence.clamp(0.0, 1.0),
            parsing_method,
            mathematical_description: String::new(),
            source_clause: source_clause.to_string(),
        }
    }

    pub fn with_parameter(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.parameters.insert(name.to_string(), value.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.mathematical_description = description.into();
        self
    }

    /// Fill in the description from the type and entities, if none was given
    pub fn describe(mut self) -> Self {
        if self.mathematical_description.is_empty() {
            self.mathematical_description = default_description(&self);
        }
        self
    }

    pub fn node_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.entities
            .iter()
            .filter(|e| e.kind == EntityKind::Node)
            .map(|e| e.index)
    }

    pub fn vehicle_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.entities
            .iter()
            .filter(|e| e.kind == EntityKind::Vehicle)
            .map(|e| e.index)
    }

    /// Integer parameter, accepting whole floats
    pub fn integer_parameter(&self, name: &str) -> Option<u64> {
        match self.parameters.get(name)? {
            Value::Number(n) => n.as_u64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= u64::MAX as f64)
                    .map(|f| f as u64)
            }),
            _ => None,
        }
    }

    pub fn number_parameter(&self, name: &str) -> Option<f64> {
        self.parameters.get(name)?.as_f64()
    }

    pub fn string_parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(name)?.as_str()
    }
}

fn default_description(constraint: &ParsedConstraint) -> String {
    let nodes: Vec<usize> = constraint.node_indices().collect();
    let vehicles: Vec<usize> = constraint.vehicle_indices().collect();
    match (constraint.constraint_type, nodes.as_slice(), vehicles.as_slice()) {
        (ConstraintType::NodeSeparation, [a, b], _) => {
            format!("for all k: y[{a},k] + y[{b},k] <= 1")
        }
        (ConstraintType::NodeGrouping, [a, b], _) => format!("for all k: y[{a},k] = y[{b},k]"),
        (ConstraintType::VehicleAssignment, [n], [v]) => {
            format!("for all k != {v}: y[{n},k] = 0")
        }
        (ConstraintType::VehicleCountBound, _, _) => {
            let min = constraint.integer_parameter(params::MIN_COUNT);
            let max = constraint.integer_parameter(params::MAX_COUNT);
            match (min, max) {
                (Some(min), Some(max)) => format!("{min} <= sum_k used[k] <= {max}"),
                (Some(min), None) => format!("sum_k used[k] >= {min}"),
                (None, Some(max)) => format!("sum_k used[k] <= {max}"),
                (None, None) => "bound on sum_k used[k]".to_string(),
            }
        }
        (ConstraintType::RouteDistanceLimit, _, _) => {
            match constraint.number_parameter(params::MAX_DISTANCE) {
                Some(d) => format!("for all k: sum_ij d[i,j] x[i,j,k] <= {d}"),
                None => "for all k: sum_ij d[i,j] x[i,j,k] <= D".to_string(),
            }
        }
        (ConstraintType::Priority, [n], _) => {
            let sign = match constraint.string_parameter(params::LEVEL) {
                Some("low") => "-",
                _ => "+",
            };
            format!("objective {sign}= w * position[{n}]")
        }
        (t, _, _) => t.to_string(),
    }
}

/// Why a clause or constraint was not applied
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectionReason {
    #[serde(rename = "unparsed")]
    Unparsed,
    #[serde(rename = "entity out of range")]
    EntityOutOfRange,
    #[serde(rename = "invalid constraint")]
    InvalidConstraint,
}

impl Display for RejectionReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            RejectionReason::Unparsed => "unparsed",
            RejectionReason::EntityOutOfRange => "entity out of range",
            RejectionReason::InvalidConstraint => "invalid constraint",
        })
    }
}

/// A clause or constraint that was reported back instead of applied
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RejectedConstraint {
    pub source_clause: String,
    pub reason: RejectionReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl RejectedConstraint {
    pub fn new(source_clause: &str, reason: RejectionReason, detail: Option<String>) -> Self {
        RejectedConstraint {
            source_clause: source_clause.to_string(),
            reason,
            detail,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalization() {
        assert_eq!(
            normalize_clause("  Please,  make sure that node 1\tand node 2\n are together "),
            "node 1 and node 2 are together"
        );
        assert_eq!(normalize_clause("I need at least 2 vans"), "at least 2 vans");
        // Only whole words are fillers
        assert_eq!(normalize_clause("pleased customers"), "pleased customers");
        let clause = Clause::new(" kindly use 3 trucks");
        assert_eq!(clause.source, " kindly use 3 trucks");
        assert_eq!(clause.normalized, "use 3 trucks");
    }

    #[test]
    fn type_names() {
        for t in ConstraintType::ALL {
            assert_eq!(ConstraintType::from_name(t.as_str()), Some(t));
            assert_eq!(serde_json::to_value(t).unwrap(), json!(t.as_str()));
        }
        assert_eq!(
            ConstraintType::from_name(" Node_Grouping "),
            Some(ConstraintType::NodeGrouping)
        );
        assert_eq!(ConstraintType::from_name("time_window"), None);
    }

    #[test]
    fn integer_parameters() {
        let c = ParsedConstraint::new(
            ConstraintType::VehicleCountBound,
            vec![],
            0.9,
            ParsingMethod::Llm,
            "x",
        )
        .with_parameter(params::MIN_COUNT, 2.0)
        .with_parameter(params::MAX_COUNT, 2.5)
        .with_parameter("other", "three");
        assert_eq!(c.integer_parameter(params::MIN_COUNT), Some(2));
        assert_eq!(c.integer_parameter(params::MAX_COUNT), None);
        assert_eq!(c.integer_parameter("other"), None);
        assert_eq!(c.integer_parameter("missing"), None);
    }

    #[test]
    fn descriptions() {
        let c = ParsedConstraint::new(
            ConstraintType::NodeSeparation,
            vec![ConstraintEntity::node(1), ConstraintEntity::node(3)],
            1.5,
            ParsingMethod::Pattern,
            "node 1 and node 3 apart",
        )
        .describe();
        assert_eq!(c.confidence, 1.0);
        assert_eq!(c.mathematical_description, "for all k: y[1,k] + y[3,k] <= 1");

        let c = ParsedConstraint::new(
            ConstraintType::VehicleCountBound,
            vec![],
            0.9,
            ParsingMethod::Pattern,
            "",
        )
        .with_parameter(params::MIN_COUNT, 2)
        .describe();
        assert_eq!(c.mathematical_description, "sum_k used[k] >= 2");
    }

    #[test]
    fn rejection_reason_names() {
        assert_eq!(
            serde_json::to_value(RejectionReason::EntityOutOfRange).unwrap(),
            json!("entity out of range")
        );
        assert_eq!(RejectionReason::Unparsed.to_string(), "unparsed");
    }
}
