//! Turn parsed constraints into linear constraints over the VRP variables
//!
//! Each [`ConstraintType`] has exactly one compile function, chosen by [`compiler_for`].
//! Constraints are compiled one at a time: a constraint that fails validation is rejected
//! and the rest still compile.
//!
//! `y[a,k]` below is the incidence of node a on vehicle k, see
//! [`VrpModel::incidence_terms`].
use thiserror::Error;
use tracing::{info, warn};

use crate::constraints::{
    params, ConstraintType, EntityKind, ParsedConstraint, PriorityLevel, RejectedConstraint,
    RejectionReason,
};
use crate::optimize::constraint::{Constraint, ConstraintTerm};
use crate::optimize::objective::ObjectiveTerm;
use crate::vrp::model::VrpModel;

/// Linear constraints and objective terms generated for one parsed constraint
#[derive(Clone, Debug, PartialEq)]
pub struct CompiledConstraint {
    /// Clause the constraint came from
    pub source_clause: String,
    pub constraints: Vec<Constraint>,
    pub objective_terms: Vec<ObjectiveTerm>,
}

impl CompiledConstraint {
    fn new(parsed: &ParsedConstraint) -> Self {
        CompiledConstraint {
            source_clause: parsed.source_clause.clone(),
            constraints: Vec::new(),
            objective_terms: Vec::new(),
        }
    }
}

/// Settings that shape the generated terms
#[derive(Clone, Copy, Debug)]
pub struct CompileSettings {
    pub priority_weight: f64,
}

/// Outcome of compiling a list of parsed constraints
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CompileReport {
    /// Applied constraints, in input order
    pub applied: Vec<ParsedConstraint>,
    pub rejected: Vec<RejectedConstraint>,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("{0}")]
    EntityOutOfRange(String),
    #[error("{0}")]
    Invalid(String),
}

impl CompileError {
    pub fn reason(&self) -> RejectionReason {
        match self {
            CompileError::EntityOutOfRange(_) => RejectionReason::EntityOutOfRange,
            CompileError::Invalid(_) => RejectionReason::InvalidConstraint,
        }
    }
}

type CompileFn = fn(
    &ParsedConstraint,
    &VrpModel,
    &CompileSettings,
    &str,
) -> Result<CompiledConstraint, CompileError>;

/// The compile function of each constraint type
fn compiler_for(constraint_type: ConstraintType) -> CompileFn {
    match constraint_type {
        ConstraintType::NodeSeparation => compile_separation,
        ConstraintType::NodeGrouping => compile_grouping,
        ConstraintType::VehicleAssignment => compile_assignment,
        ConstraintType::VehicleCountBound => compile_vehicle_count,
        ConstraintType::RouteDistanceLimit => compile_distance_limit,
        ConstraintType::Priority => compile_priority,
    }
}

/// Compile every constraint and append the results to the model
pub fn compile(
    constraints: Vec<ParsedConstraint>,
    model: &mut VrpModel,
    settings: &CompileSettings,
) -> CompileReport {
    let mut report = CompileReport::default();
    for (index, parsed) in constraints.into_iter().enumerate() {
        let tag = format!("c{index}_{}", parsed.constraint_type);
        match compile_one(&parsed, model, settings, &tag) {
            Ok(()) => {
                info!(
                    clause = %parsed.source_clause,
                    constraint_type = %parsed.constraint_type,
                    method = ?parsed.parsing_method,
                    "constraint applied"
                );
                report.applied.push(parsed);
            }
            Err(err) => {
                warn!(clause = %parsed.source_clause, reason = %err.reason(), detail = %err, "constraint rejected");
                report.rejected.push(RejectedConstraint::new(
                    &parsed.source_clause,
                    err.reason(),
                    Some(err.to_string()),
                ));
            }
        }
    }
    report
}

fn compile_one(
    parsed: &ParsedConstraint,
    model: &mut VrpModel,
    settings: &CompileSettings,
    tag: &str,
) -> Result<(), CompileError> {
    check_entity_ranges(parsed, model)?;
    let compiled = compiler_for(parsed.constraint_type)(parsed, model, settings, tag)?;
    for constraint in compiled.constraints {
        model
            .append_constraint(constraint)
            .map_err(|e| CompileError::Invalid(e.to_string()))?;
    }
    for term in compiled.objective_terms {
        model
            .append_objective_term(term)
            .map_err(|e| CompileError::Invalid(e.to_string()))?;
    }
    Ok(())
}

fn check_entity_ranges(parsed: &ParsedConstraint, model: &VrpModel) -> Result<(), CompileError> {
    let context = model.context();
    for entity in &parsed.entities {
        let limit = match entity.kind {
            EntityKind::Node => context.node_count(),
            EntityKind::Vehicle => context.vehicle_count(),
        };
        if entity.index >= limit {
            return Err(CompileError::EntityOutOfRange(format!(
                "{} is out of range, valid indices are 0..{}",
                entity,
                limit - 1
            )));
        }
    }
    Ok(())
}

// region Entity Helpers
/// Exactly the expected entity kinds, in order
fn expect_entities(parsed: &ParsedConstraint, kinds: &[EntityKind]) -> Result<(), CompileError> {
    let actual: Vec<EntityKind> = parsed.entities.iter().map(|e| e.kind).collect();
    if actual != kinds {
        return Err(CompileError::Invalid(format!(
            "{} expects entities {:?}, got {:?}",
            parsed.constraint_type, kinds, actual
        )));
    }
    Ok(())
}

fn customer(model: &VrpModel, node: usize) -> Result<usize, CompileError> {
    if node == model.context().depot_index() {
        return Err(CompileError::Invalid(format!(
            "node {node} is the depot and can't be used as a customer"
        )));
    }
    Ok(node)
}

fn node_pair(parsed: &ParsedConstraint, model: &VrpModel) -> Result<(usize, usize), CompileError> {
    expect_entities(parsed, &[EntityKind::Node, EntityKind::Node])?;
    let a = customer(model, parsed.entities[0].index)?;
    let b = customer(model, parsed.entities[1].index)?;
    if a == b {
        return Err(CompileError::Invalid(format!(
            "{} names node {a} twice",
            parsed.constraint_type
        )));
    }
    Ok((a, b))
}
// endregion Entity Helpers

// region Compile Functions
/// y[a,k] + y[b,k] <= 1 for every vehicle
fn compile_separation(
    parsed: &ParsedConstraint,
    model: &VrpModel,
    _settings: &CompileSettings,
    tag: &str,
) -> Result<CompiledConstraint, CompileError> {
    let (a, b) = node_pair(parsed, model)?;
    let mut compiled = CompiledConstraint::new(parsed);
    for k in 0..model.context().vehicle_count() {
        let mut terms = model.incidence_terms(a, k);
        terms.extend(model.incidence_terms(b, k));
        compiled
            .constraints
            .push(Constraint::new_less_equal(&format!("{tag}_{k}"), terms, 1.));
    }
    Ok(compiled)
}

/// y[a,k] = y[b,k] for every vehicle
fn compile_grouping(
    parsed: &ParsedConstraint,
    model: &VrpModel,
    _settings: &CompileSettings,
    tag: &str,
) -> Result<CompiledConstraint, CompileError> {
    let (a, b) = node_pair(parsed, model)?;
    let mut compiled = CompiledConstraint::new(parsed);
    for k in 0..model.context().vehicle_count() {
        let mut terms = model.incidence_terms(a, k);
        terms.extend(
            model
                .incidence_terms(b, k)
                .into_iter()
                .map(|t| ConstraintTerm::new(t.variable, -t.coefficient)),
        );
        compiled
            .constraints
            .push(Constraint::new_equality(&format!("{tag}_{k}"), terms, 0.));
    }
    Ok(compiled)
}

/// y[n,k] = 0 for every vehicle other than the assigned one
fn compile_assignment(
    parsed: &ParsedConstraint,
    model: &VrpModel,
    _settings: &CompileSettings,
    tag: &str,
) -> Result<CompiledConstraint, CompileError> {
    expect_entities(parsed, &[EntityKind::Node, EntityKind::Vehicle])?;
    let node = customer(model, parsed.entities[0].index)?;
    let vehicle = parsed.entities[1].index;
    let mut compiled = CompiledConstraint::new(parsed);
    for k in (0..model.context().vehicle_count()).filter(|&k| k != vehicle) {
        compiled.constraints.push(Constraint::new_equality(
            &format!("{tag}_{k}"),
            model.incidence_terms(node, k),
            0.,
        ));
    }
    Ok(compiled)
}

/// min <= sum_k used[k] <= max
fn compile_vehicle_count(
    parsed: &ParsedConstraint,
    model: &VrpModel,
    _settings: &CompileSettings,
    tag: &str,
) -> Result<CompiledConstraint, CompileError> {
    expect_entities(parsed, &[])?;
    let min = count_parameter(parsed, params::MIN_COUNT)?;
    let max = count_parameter(parsed, params::MAX_COUNT)?;
    if min.is_none() && max.is_none() {
        return Err(CompileError::Invalid(format!(
            "vehicle_count_bound needs {} or {}",
            params::MIN_COUNT,
            params::MAX_COUNT
        )));
    }
    let mut compiled = CompiledConstraint::new(parsed);
    if let Some(min) = min {
        compiled.constraints.push(Constraint::new_greater_equal(
            &format!("{tag}_min"),
            model.used_terms(),
            min as f64,
        ));
    }
    if let Some(max) = max {
        compiled.constraints.push(Constraint::new_less_equal(
            &format!("{tag}_max"),
            model.used_terms(),
            max as f64,
        ));
    }
    Ok(compiled)
}

fn count_parameter(parsed: &ParsedConstraint, name: &str) -> Result<Option<u64>, CompileError> {
    match parsed.parameters.get(name) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(value) => parsed.integer_parameter(name).map(Some).ok_or_else(|| {
            CompileError::Invalid(format!(
                "{name} must be a non-negative integer, got {value}"
            ))
        }),
    }
}

/// sum_ij d[i,j] x[i,j,k] <= D for every vehicle
fn compile_distance_limit(
    parsed: &ParsedConstraint,
    model: &VrpModel,
    _settings: &CompileSettings,
    tag: &str,
) -> Result<CompiledConstraint, CompileError> {
    expect_entities(parsed, &[])?;
    let limit = parsed
        .number_parameter(params::MAX_DISTANCE)
        .filter(|d| d.is_finite())
        .ok_or_else(|| {
            CompileError::Invalid(format!(
                "route_distance_limit needs a finite numeric {}",
                params::MAX_DISTANCE
            ))
        })?;
    let mut compiled = CompiledConstraint::new(parsed);
    for k in 0..model.context().vehicle_count() {
        compiled.constraints.push(Constraint::new_less_equal(
            &format!("{tag}_{k}"),
            model.distance_terms(k),
            limit,
        ));
    }
    Ok(compiled)
}

/// Objective term +w * position (high) or -w * position (low)
fn compile_priority(
    parsed: &ParsedConstraint,
    model: &VrpModel,
    settings: &CompileSettings,
    _tag: &str,
) -> Result<CompiledConstraint, CompileError> {
    expect_entities(parsed, &[EntityKind::Node])?;
    let node = customer(model, parsed.entities[0].index)?;
    let level = parsed
        .string_parameter(params::LEVEL)
        .and_then(PriorityLevel::from_word)
        .ok_or_else(|| {
            CompileError::Invalid(format!("priority needs {} of high or low", params::LEVEL))
        })?;
    let position = model
        .position(node)
        .ok_or_else(|| CompileError::Invalid(format!("node {node} has no position")))?;
    let coefficient = match level {
        PriorityLevel::High => settings.priority_weight,
        PriorityLevel::Low => -settings.priority_weight,
    };
    let mut compiled = CompiledConstraint::new(parsed);
    compiled
        .objective_terms
        .push(ObjectiveTerm::new(position, coefficient));
    Ok(compiled)
}
// endregion Compile Functions
