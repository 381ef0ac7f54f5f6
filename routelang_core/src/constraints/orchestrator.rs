//! Clause splitting and the per clause resolution policy
//!
//! Each clause goes through the tiers strictly in order: pattern, then the LLM when one is
//! configured, then the fallback parser. The first tier that produces a constraint ends the
//! clause. A clause nothing understands is rejected as `unparsed`.
use serde::Serialize;
use tracing::{debug, warn};

use crate::configuration::LlmConfig;
use crate::constraints::fallback::{self, FallbackOutcome};
use crate::constraints::llm::LlmInterpreter;
use crate::constraints::pattern;
use crate::constraints::{Clause, ParsedConstraint, ParsingMethod, RejectedConstraint, RejectionReason};
use crate::context::ProblemContext;

/// Words that open a new clause after a comma or at the start of a sentence
const CONNECTIVES: &[&str] = &["also", "additionally", "furthermore", "moreover"];
/// Words that open a new clause directly after "and"
const AND_CONNECTIVES: &[&str] = &["also", "further", "additionally", "furthermore", "moreover"];

/// Terminal state of a clause
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClauseOutcome {
    Matched,
    LlmParsed,
    FallbackParsed,
    Unparsed,
}

/// Why the LLM tier did not produce the constraint
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LlmStatus {
    Unavailable,
    Failed { message: String },
}

/// Record of how a clause was resolved
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ClauseTrace {
    pub clause: String,
    pub tiers: Vec<ParsingMethod>,
    pub outcome: ClauseOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm: Option<LlmStatus>,
}

/// Everything the orchestrator learned from the constraint text, in clause order
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ParseReport {
    pub constraints: Vec<ParsedConstraint>,
    pub rejected: Vec<RejectedConstraint>,
    pub traces: Vec<ClauseTrace>,
}

pub struct Orchestrator<'a> {
    context: &'a ProblemContext,
    llm: Option<LlmInterpreter>,
}

impl<'a> Orchestrator<'a> {
    /// Create an orchestrator, `llm` being `None` makes the LLM tier unavailable
    pub fn new(context: &'a ProblemContext, llm: Option<LlmInterpreter>) -> Self {
        Orchestrator { context, llm }
    }

    pub fn from_config(context: &'a ProblemContext, config: &LlmConfig) -> Self {
        Self::new(context, LlmInterpreter::from_config(config))
    }

    /// Split and resolve the whole constraint text
    pub fn parse(&self, text: &str) -> ParseReport {
        let clauses = split_clauses(text);
        debug!(clauses = clauses.len(), "split constraint text");
        let mut report = ParseReport::default();
        for clause in clauses {
            let (result, trace) = self.resolve(&clause);
            match result {
                Ok(parsed) => report.constraints.push(parsed),
                Err(rejected) => report.rejected.push(rejected),
            }
            report.traces.push(trace);
        }
        report
    }

    /// Run the tiers for one clause
    pub fn resolve(
        &self,
        clause: &Clause,
    ) -> (Result<ParsedConstraint, RejectedConstraint>, ClauseTrace) {
        let mut trace = ClauseTrace {
            clause: clause.source.clone(),
            tiers: vec![ParsingMethod::Pattern],
            outcome: ClauseOutcome::Unparsed,
            llm: None,
        };

        if let Some(parsed) = pattern::match_clause(clause) {
            debug!(clause = %clause.source, constraint_type = %parsed.constraint_type, "pattern matched");
            trace.outcome = ClauseOutcome::Matched;
            return (Ok(parsed), trace);
        }

        match &self.llm {
            None => {
                debug!(clause = %clause.source, "no pattern match, LLM tier unavailable");
                trace.llm = Some(LlmStatus::Unavailable);
            }
            Some(llm) => {
                trace.tiers.push(ParsingMethod::Llm);
                match llm.interpret(clause, self.context) {
                    Ok(parsed) => {
                        debug!(clause = %clause.source, constraint_type = %parsed.constraint_type, "LLM parsed");
                        trace.outcome = ClauseOutcome::LlmParsed;
                        return (Ok(parsed), trace);
                    }
                    Err(err) => {
                        warn!(clause = %clause.source, error = %err, "LLM interpretation failed, falling back");
                        trace.llm = Some(LlmStatus::Failed {
                            message: err.to_string(),
                        });
                    }
                }
            }
        }

        trace.tiers.push(ParsingMethod::Fallback);
        match fallback::parse_clause(clause) {
            FallbackOutcome::Parsed(parsed) => {
                debug!(clause = %clause.source, constraint_type = %parsed.constraint_type, "fallback parsed");
                trace.outcome = ClauseOutcome::FallbackParsed;
                (Ok(parsed), trace)
            }
            FallbackOutcome::Unparsed => {
                warn!(clause = %clause.source, "clause not understood");
                (
                    Err(RejectedConstraint::new(
                        &clause.source,
                        RejectionReason::Unparsed,
                        None,
                    )),
                    trace,
                )
            }
        }
    }
}

// region Clause Splitting
/// Split text into ordered clauses on sentence terminators and connectives
pub fn split_clauses(text: &str) -> Vec<Clause> {
    sentence_spans(text)
        .into_iter()
        .flat_map(|(start, end)| connective_spans(text, start, end))
        .map(|(start, end)| trim_clause(&text[start..end]))
        .filter(|clause| !clause.is_empty())
        .map(Clause::new)
        .collect()
}

fn trim_clause(text: &str) -> &str {
    text.trim_matches(|c: char| c.is_whitespace() || matches!(c, ',' | ':' | '-' | ';'))
}

/// Byte spans between terminators; a '.' between two digits is a decimal point
fn sentence_spans(text: &str) -> Vec<(usize, usize)> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut spans = Vec::new();
    let mut start = 0;
    for (i, &(offset, c)) in chars.iter().enumerate() {
        let terminates = match c {
            '!' | '?' | ';' | '\n' => true,
            '.' => {
                let digit_before = i > 0 && chars[i - 1].1.is_ascii_digit();
                let digit_after = chars.get(i + 1).is_some_and(|(_, n)| n.is_ascii_digit());
                !(digit_before && digit_after)
            }
            _ => false,
        };
        if terminates {
            spans.push((start, offset));
            start = offset + c.len_utf8();
        }
    }
    spans.push((start, text.len()));
    spans
}

struct WordSpan {
    start: usize,
    end: usize,
    lower: String,
}

fn words_in(text: &str, start: usize, end: usize) -> Vec<WordSpan> {
    let mut words = Vec::new();
    let mut current: Option<usize> = None;
    for (offset, c) in text[start..end].char_indices() {
        let offset = start + offset;
        match (c.is_alphabetic(), current) {
            (true, None) => current = Some(offset),
            (false, Some(word_start)) => {
                words.push(WordSpan {
                    start: word_start,
                    end: offset,
                    lower: text[word_start..offset].to_lowercase(),
                });
                current = None;
            }
            _ => {}
        }
    }
    if let Some(word_start) = current {
        words.push(WordSpan {
            start: word_start,
            end,
            lower: text[word_start..end].to_lowercase(),
        });
    }
    words
}

/// Split a sentence at connectives, dropping the connective words themselves
fn connective_spans(text: &str, start: usize, end: usize) -> Vec<(usize, usize)> {
    let words = words_in(text, start, end);
    let mut spans = Vec::new();
    let mut clause_start = start;
    let mut i = 0;
    while i < words.len() {
        let word = &words[i];
        if word.lower == "and" {
            if let Some(next) = words.get(i + 1) {
                if AND_CONNECTIVES.contains(&next.lower.as_str()) {
                    spans.push((clause_start, word.start));
                    clause_start = next.end;
                    i += 2;
                    continue;
                }
            }
        } else if CONNECTIVES.contains(&word.lower.as_str()) {
            let opens_sentence = text[start..word.start].trim().is_empty();
            let previous_end = if i == 0 { start } else { words[i - 1].end };
            if opens_sentence || text[previous_end..word.start].contains(',') {
                spans.push((clause_start, word.start));
                clause_start = word.end;
            }
        }
        i += 1;
    }
    spans.push((clause_start, end));
    spans
}
// endregion Clause Splitting

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::llm::tests::{context, FakeClient};
    use crate::constraints::llm::InterpretationError;
    use crate::constraints::{params, ConstraintEntity, ConstraintType};
    use std::sync::Arc;

    fn sources(text: &str) -> Vec<String> {
        split_clauses(text).into_iter().map(|c| c.source).collect()
    }

    #[test]
    fn split_sentences_and_connectives() {
        assert_eq!(
            sources("Use at least 2 vehicles. Also, node 1 and node 2 should be served together."),
            vec![
                "Use at least 2 vehicles",
                "node 1 and node 2 should be served together"
            ]
        );
        assert_eq!(
            sources("routes must stay under 12.5 km; node 3 has high priority!\nprioritize node 2"),
            vec![
                "routes must stay under 12.5 km",
                "node 3 has high priority",
                "prioritize node 2"
            ]
        );
        assert_eq!(
            sources("node 1 first, additionally node 2 last and also use at most 2 vans"),
            vec!["node 1 first", "node 2 last", "use at most 2 vans"]
        );
        assert_eq!(
            sources("separate node 1 from node 2 and further group node 3 with node 4"),
            vec!["separate node 1 from node 2", "group node 3 with node 4"]
        );
    }

    #[test]
    fn connective_inside_clause_is_kept() {
        assert_eq!(
            sources("node 4 must also be served by vehicle 1"),
            vec!["node 4 must also be served by vehicle 1"]
        );
    }

    #[test]
    fn empty_clauses_dropped() {
        assert!(sources("").is_empty());
        assert!(sources(" . ;; \n - ").is_empty());
    }

    #[test]
    fn two_clause_example() {
        let context = context();
        let orchestrator = Orchestrator::new(&context, None);
        let report = orchestrator
            .parse("Use at least 2 vehicles. Also, node 1 and node 2 should be served together.");
        assert!(report.rejected.is_empty());
        assert_eq!(report.constraints.len(), 2);
        let count = &report.constraints[0];
        assert_eq!(count.constraint_type, ConstraintType::VehicleCountBound);
        assert_eq!(count.integer_parameter(params::MIN_COUNT), Some(2));
        let group = &report.constraints[1];
        assert_eq!(group.constraint_type, ConstraintType::NodeGrouping);
        assert_eq!(
            group.entities,
            vec![ConstraintEntity::node(1), ConstraintEntity::node(2)]
        );
        assert!(report
            .traces
            .iter()
            .all(|t| t.outcome == ClauseOutcome::Matched && t.tiers == vec![ParsingMethod::Pattern]));
    }

    #[test]
    fn pattern_match_is_never_escalated() {
        let context = context();
        let client = Arc::new(FakeClient::replying(
            r#"{"type": "node_separation", "entities": [{"kind": "node", "index": 1}, {"kind": "node", "index": 2}], "confidence": 0.99}"#,
        ));
        let orchestrator =
            Orchestrator::new(&context, Some(LlmInterpreter::new(Box::new(client.clone()))));
        let report = orchestrator.parse("node 1 and node 2 should be served together");
        assert_eq!(report.constraints[0].constraint_type, ConstraintType::NodeGrouping);
        assert_eq!(report.constraints[0].parsing_method, ParsingMethod::Pattern);
        assert!(client.requests.lock().unwrap().is_empty());
    }

    #[test]
    fn llm_tier_used_when_no_pattern_matches() {
        let context = context();
        let client = Arc::new(FakeClient::replying(
            r#"{"type": "node_separation", "entities": [{"kind": "node", "index": 1}, {"kind": "node", "index": 2}], "confidence": 0.75}"#,
        ));
        let orchestrator =
            Orchestrator::new(&context, Some(LlmInterpreter::new(Box::new(client.clone()))));
        let report = orchestrator.parse("keep the first and second stops on their own");
        assert_eq!(report.constraints.len(), 1);
        assert_eq!(report.constraints[0].parsing_method, ParsingMethod::Llm);
        assert!((report.constraints[0].confidence - 0.75).abs() < 1e-12);
        assert_eq!(report.traces[0].outcome, ClauseOutcome::LlmParsed);
        assert_eq!(
            report.traces[0].tiers,
            vec![ParsingMethod::Pattern, ParsingMethod::Llm]
        );
        assert_eq!(client.requests.lock().unwrap().len(), 1);
    }

    #[test]
    fn llm_failure_falls_back() {
        let context = context();
        let llm = LlmInterpreter::new(Box::new(FakeClient::failing(
            InterpretationError::Request("connection refused".into()),
        )));
        let orchestrator = Orchestrator::new(&context, Some(llm));
        let report = orchestrator.parse("customers 1 and 3 not compatible");
        assert_eq!(report.constraints.len(), 1);
        let parsed = &report.constraints[0];
        assert_eq!(parsed.parsing_method, ParsingMethod::Fallback);
        assert_eq!(parsed.constraint_type, ConstraintType::NodeSeparation);
        let trace = &report.traces[0];
        assert_eq!(trace.outcome, ClauseOutcome::FallbackParsed);
        assert_eq!(
            trace.tiers,
            vec![
                ParsingMethod::Pattern,
                ParsingMethod::Llm,
                ParsingMethod::Fallback
            ]
        );
        assert!(matches!(trace.llm, Some(LlmStatus::Failed { .. })));
    }

    #[test]
    fn unparsed_clause_is_rejected() {
        let context = context();
        let orchestrator = Orchestrator::new(&context, None);
        let report = orchestrator.parse("Blue ideas sleep furiously. Use at most 1 truck.");
        assert_eq!(report.constraints.len(), 1);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].source_clause, "Blue ideas sleep furiously");
        assert_eq!(report.rejected[0].reason, RejectionReason::Unparsed);
        assert_eq!(report.traces[0].outcome, ClauseOutcome::Unparsed);
        assert_eq!(report.traces[0].llm, Some(LlmStatus::Unavailable));
    }
}
