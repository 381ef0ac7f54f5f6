//! Minimal keyword and number extractor, the last tier for a clause
use crate::constraints::lexer::tokenize;
use crate::constraints::pattern::{NODE_WORDS, VEHICLE_WORDS};
use crate::constraints::token::Token;
use crate::constraints::{
    params, Clause, ConstraintEntity, ConstraintType, ParsedConstraint, ParsingMethod,
};

/// Confidence of a vehicle count bound found by keyword
pub const COUNT_CONFIDENCE: f64 = 0.4;
/// Confidence of a best guess node pair
pub const PAIR_CONFIDENCE: f64 = 0.3;

/// How many tokens after a count keyword the integer may appear
const COUNT_WINDOW: usize = 3;

const MIN_KEYWORDS: &[&[&str]] = &[&["at", "least"], &["minimum"], &["min"]];
const MAX_KEYWORDS: &[&[&str]] = &[&["at", "most"], &["maximum"], &["max"]];
const NEGATION_KEYWORDS: &[&str] = &[
    "not", "never", "cannot", "can't", "separate", "separately", "different", "apart",
    "shouldn't", "mustn't", "don't", "won't",
];
const PAIR_JOINERS: &[&str] = &["and", "or", "with", "from"];

/// Result of the fallback tier
#[derive(Clone, Debug, PartialEq)]
pub enum FallbackOutcome {
    Parsed(ParsedConstraint),
    Unparsed,
}

/// Extract a low confidence constraint from a clause, never fails
pub fn parse_clause(clause: &Clause) -> FallbackOutcome {
    let Ok(tokens) = tokenize(&clause.normalized) else {
        return FallbackOutcome::Unparsed;
    };
    if let Some(parsed) = vehicle_count(&tokens, clause) {
        return FallbackOutcome::Parsed(parsed);
    }
    if let Some(parsed) = node_pair(&tokens, clause) {
        return FallbackOutcome::Parsed(parsed);
    }
    FallbackOutcome::Unparsed
}

fn vehicle_count(tokens: &[Token], clause: &Clause) -> Option<ParsedConstraint> {
    if !tokens.iter().any(|t| t.is_word_in(VEHICLE_WORDS)) {
        return None;
    }
    let mut min = None;
    let mut max = None;
    for pos in 0..tokens.len() {
        if min.is_none() {
            min = count_after(tokens, pos, MIN_KEYWORDS);
        }
        if max.is_none() {
            max = count_after(tokens, pos, MAX_KEYWORDS);
        }
    }
    if min.is_none() && max.is_none() {
        return None;
    }
    let mut parsed = ParsedConstraint::new(
        ConstraintType::VehicleCountBound,
        vec![],
        COUNT_CONFIDENCE,
        ParsingMethod::Fallback,
        &clause.source,
    );
    if let Some(min) = min {
        parsed = parsed.with_parameter(params::MIN_COUNT, min);
    }
    if let Some(max) = max {
        parsed = parsed.with_parameter(params::MAX_COUNT, max);
    }
    Some(parsed.describe())
}

/// The first integer within the window after a keyword starting at `pos`
///
/// An integer that counts nodes ("2 stops per truck") is not a vehicle count.
fn count_after(tokens: &[Token], pos: usize, keywords: &[&[&str]]) -> Option<u64> {
    let keyword = keywords.iter().find(|k| {
        k.iter()
            .enumerate()
            .all(|(i, w)| tokens.get(pos + i).and_then(|t| t.word()) == Some(*w))
    })?;
    let after = pos + keyword.len();
    let (offset, value) = tokens
        .iter()
        .enumerate()
        .skip(after)
        .take(COUNT_WINDOW)
        .find_map(|(i, t)| t.integer().map(|v| (i, v)))?;
    if tokens.get(offset + 1).is_some_and(|t| t.is_word_in(NODE_WORDS)) {
        return None;
    }
    Some(value)
}

fn node_pair(tokens: &[Token], clause: &Clause) -> Option<ParsedConstraint> {
    let mut indices: Vec<usize> = Vec::new();
    for (pos, token) in tokens.iter().enumerate() {
        let Some(value) = token.integer().map(|v| usize::try_from(v).unwrap_or(usize::MAX)) else {
            continue;
        };
        let previous = pos.checked_sub(1).and_then(|p| tokens.get(p));
        let before_hash = pos.checked_sub(2).and_then(|p| tokens.get(p));
        let follows_node_word = match previous {
            Some(Token::Other('#')) => before_hash.is_some_and(|t| t.is_word_in(NODE_WORDS)),
            Some(t) => t.is_word_in(NODE_WORDS),
            None => false,
        };
        let continues_list = !indices.is_empty()
            && previous.is_some_and(|t| t.is_word_in(PAIR_JOINERS) || *t == Token::Comma);
        if (follows_node_word || continues_list) && !indices.contains(&value) {
            indices.push(value);
        }
    }
    let [a, b, ..] = indices.as_slice() else {
        return None;
    };
    let constraint_type = if tokens.iter().any(|t| t.is_word_in(NEGATION_KEYWORDS)) {
        ConstraintType::NodeSeparation
    } else {
        ConstraintType::NodeGrouping
    };
    Some(
        ParsedConstraint::new(
            constraint_type,
            vec![ConstraintEntity::node(*a), ConstraintEntity::node(*b)],
            PAIR_CONFIDENCE,
            ParsingMethod::Fallback,
            &clause.source,
        )
        .describe(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> FallbackOutcome {
        parse_clause(&Clause::new(text))
    }

    fn parsed(text: &str) -> ParsedConstraint {
        match parse(text) {
            FallbackOutcome::Parsed(p) => p,
            FallbackOutcome::Unparsed => panic!("unparsed: {text:?}"),
        }
    }

    #[test]
    fn count_keywords() {
        let c = parsed("we'd like at least, say 2 of our vehicles out");
        assert_eq!(c.constraint_type, ConstraintType::VehicleCountBound);
        assert_eq!(c.integer_parameter(params::MIN_COUNT), Some(2));
        assert_eq!(c.parsing_method, ParsingMethod::Fallback);
        assert!((c.confidence - COUNT_CONFIDENCE).abs() < 1e-12);

        let c = parsed("trucks: min 1, max 3");
        assert_eq!(c.integer_parameter(params::MIN_COUNT), Some(1));
        assert_eq!(c.integer_parameter(params::MAX_COUNT), Some(3));
    }

    #[test]
    fn count_requires_vehicle_word() {
        // A keyword and an integer alone are not enough
        assert_eq!(
            parse("at least 3 deliveries before noon"),
            FallbackOutcome::Unparsed
        );
        // The integer must be close to the keyword
        assert_eq!(
            parse("maximum use of the fleet of vehicles 4"),
            FallbackOutcome::Unparsed
        );
        // A per vehicle stop count is not a fleet size
        assert_eq!(
            parse("each truck: at least 2 stops"),
            FallbackOutcome::Unparsed
        );
    }

    #[test]
    fn node_pairs() {
        let c = parsed("hmm, customers 4 and 5 not really compatible");
        assert_eq!(c.constraint_type, ConstraintType::NodeSeparation);
        assert_eq!(c.node_indices().collect::<Vec<_>>(), vec![4, 5]);
        assert!((c.confidence - PAIR_CONFIDENCE).abs() < 1e-12);

        let c = parsed("node #2 likes node #6");
        assert_eq!(c.constraint_type, ConstraintType::NodeGrouping);
        assert_eq!(c.node_indices().collect::<Vec<_>>(), vec![2, 6]);
    }

    #[test]
    fn unparsed() {
        for text in [
            "",
            "the quick brown fox",
            "node 3 is special",
            "deliver 4 and 5 boxes",
        ] {
            assert_eq!(parse(text), FallbackOutcome::Unparsed, "{text}");
        }
    }
}
