//! Advisory checks over a whole constraint set
//!
//! None of these checks reject anything; they explain up front why a model is likely to
//! come back infeasible.
use std::collections::{HashMap, HashSet};

use crate::constraints::{params, ConstraintType, ParsedConstraint};
use crate::context::ProblemContext;

/// Human readable warnings about constraint combinations that can't all hold
pub fn check_conflicts(constraints: &[ParsedConstraint], context: &ProblemContext) -> Vec<String> {
    let mut warnings = Vec::new();
    check_vehicle_counts(constraints, context, &mut warnings);
    check_distance_limits(constraints, &mut warnings);
    check_pairs(constraints, &mut warnings);
    check_assignments(constraints, &mut warnings);
    warnings
}

fn of_type(
    constraints: &[ParsedConstraint],
    constraint_type: ConstraintType,
) -> impl Iterator<Item = &ParsedConstraint> {
    constraints
        .iter()
        .filter(move |c| c.constraint_type == constraint_type)
}

fn check_vehicle_counts(
    constraints: &[ParsedConstraint],
    context: &ProblemContext,
    warnings: &mut Vec<String>,
) {
    let counts: Vec<&ParsedConstraint> =
        of_type(constraints, ConstraintType::VehicleCountBound).collect();
    let min = counts
        .iter()
        .filter_map(|c| c.integer_parameter(params::MIN_COUNT))
        .max();
    let max = counts
        .iter()
        .filter_map(|c| c.integer_parameter(params::MAX_COUNT))
        .min();

    if let (Some(min), Some(max)) = (min, max) {
        if min > max {
            warnings.push(format!(
                "vehicle count bounds conflict: at least {min} but at most {max} vehicles"
            ));
        }
    }
    if let Some(min) = min {
        if min > context.vehicle_count() as u64 {
            warnings.push(format!(
                "at least {min} vehicles requested but only {} are available",
                context.vehicle_count()
            ));
        }
    }
    if max == Some(0) && context.customers().next().is_some() {
        warnings.push("at most 0 vehicles allowed but there are customers to serve".to_string());
    }
}

fn check_distance_limits(constraints: &[ParsedConstraint], warnings: &mut Vec<String>) {
    for constraint in of_type(constraints, ConstraintType::RouteDistanceLimit) {
        if let Some(limit) = constraint.number_parameter(params::MAX_DISTANCE) {
            if limit <= 0. {
                warnings.push(format!(
                    "route distance limit {limit} is not positive, no route can satisfy it"
                ));
            }
        }
    }
}

fn unordered_pair(constraint: &ParsedConstraint) -> Option<(usize, usize)> {
    let nodes: Vec<usize> = constraint.node_indices().collect();
    match nodes.as_slice() {
        [a, b] => Some((*a.min(b), *a.max(b))),
        _ => None,
    }
}

fn check_pairs(constraints: &[ParsedConstraint], warnings: &mut Vec<String>) {
    let separated: HashSet<(usize, usize)> = of_type(constraints, ConstraintType::NodeSeparation)
        .filter_map(unordered_pair)
        .collect();
    let mut reported = HashSet::new();
    for pair in of_type(constraints, ConstraintType::NodeGrouping).filter_map(unordered_pair) {
        if separated.contains(&pair) && reported.insert(pair) {
            warnings.push(format!(
                "nodes {} and {} are required both together and apart",
                pair.0, pair.1
            ));
        }
    }
}

fn check_assignments(constraints: &[ParsedConstraint], warnings: &mut Vec<String>) {
    let mut assigned: HashMap<usize, usize> = HashMap::new();
    let mut reported = HashSet::new();
    for constraint in of_type(constraints, ConstraintType::VehicleAssignment) {
        let (Some(node), Some(vehicle)) = (
            constraint.node_indices().next(),
            constraint.vehicle_indices().next(),
        ) else {
            continue;
        };
        match assigned.get(&node) {
            Some(&first) if first != vehicle => {
                if reported.insert(node) {
                    warnings.push(format!(
                        "node {node} is assigned to both vehicle {first} and vehicle {vehicle}"
                    ));
                }
            }
            Some(_) => {}
            None => {
                assigned.insert(node, vehicle);
            }
        }
    }
}
