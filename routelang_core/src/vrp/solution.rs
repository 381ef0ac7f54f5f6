//! Result of a scenario solve and route reconstruction
use indexmap::IndexMap;
use serde::Serialize;

use crate::constraints::{ConstraintType, ParsedConstraint, ParsingMethod, RejectedConstraint};
use crate::context::ProblemContext;
use crate::vrp::model::VrpModel;

/// Values above this count as a binary variable being set
const BINARY_THRESHOLD: f64 = 0.5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SolutionStatus {
    Optimal,
    /// Time limit reached with an incumbent
    FeasibleTimeout,
    Infeasible,
    Error,
}

/// Provenance of a constraint that made it into the model
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AppliedConstraint {
    pub source_clause: String,
    #[serde(rename = "type")]
    pub constraint_type: ConstraintType,
    pub parsing_method: ParsingMethod,
    pub confidence: f64,
}

impl From<&ParsedConstraint> for AppliedConstraint {
    fn from(parsed: &ParsedConstraint) -> Self {
        AppliedConstraint {
            source_clause: parsed.source_clause.clone(),
            constraint_type: parsed.constraint_type,
            parsing_method: parsed.parsing_method,
            confidence: parsed.confidence,
        }
    }
}

/// Outcome of a scenario solve, owned by the caller
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Solution {
    pub status: SolutionStatus,
    pub total_distance: f64,
    /// Vehicle index to its node sequence, starting and ending at the depot
    pub routes: IndexMap<usize, Vec<usize>>,
    pub route_distances: IndexMap<usize, f64>,
    pub vehicles_used: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub objective_value: Option<f64>,
    pub solve_time_ms: u64,
    pub applied_constraints: Vec<AppliedConstraint>,
    pub rejected_constraints: Vec<RejectedConstraint>,
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Solution {
    /// A solution without routes
    pub fn new(status: SolutionStatus) -> Self {
        Solution {
            status,
            total_distance: 0.,
            routes: IndexMap::new(),
            route_distances: IndexMap::new(),
            vehicles_used: 0,
            objective_value: None,
            solve_time_ms: 0,
            applied_constraints: Vec::new(),
            rejected_constraints: Vec::new(),
            warnings: Vec::new(),
            error: None,
        }
    }

    pub fn from_error(message: impl Into<String>) -> Self {
        Solution {
            error: Some(message.into()),
            ..Solution::new(SolutionStatus::Error)
        }
    }

    /// Set the routes and derive the distance metrics from them
    pub fn set_routes(&mut self, context: &ProblemContext, routes: IndexMap<usize, Vec<usize>>) {
        self.route_distances = routes
            .iter()
            .map(|(&k, route)| (k, route_distance(context, route)))
            .collect();
        self.total_distance = self.route_distances.values().sum();
        self.vehicles_used = routes.len();
        self.routes = routes;
    }
}

/// Distance of a node sequence
pub fn route_distance(context: &ProblemContext, route: &[usize]) -> f64 {
    route
        .windows(2)
        .map(|w| context.distance(w[0], w[1]))
        .sum()
}

/// Follow the arcs of each used vehicle from the depot back to the depot
///
/// Unused vehicles are left out.
pub fn extract_routes(model: &VrpModel, values: &[f64]) -> IndexMap<usize, Vec<usize>> {
    let context = model.context();
    let n = context.node_count();
    let depot = context.depot_index();
    let is_set = |var: Option<usize>| {
        var.and_then(|v| values.get(v))
            .is_some_and(|&value| value > BINARY_THRESHOLD)
    };

    let mut routes = IndexMap::new();
    for k in 0..context.vehicle_count() {
        if !is_set(model.used(k)) {
            continue;
        }
        let mut route = vec![depot];
        let mut current = depot;
        // A route visits each node at most once
        for _ in 0..n {
            let Some(next) = (0..n).find(|&j| is_set(model.arc(current, j, k))) else {
                break;
            };
            route.push(next);
            if next == depot {
                break;
            }
            current = next;
        }
        if route.len() > 2 {
            routes.insert(k, route);
        }
    }
    routes
}
