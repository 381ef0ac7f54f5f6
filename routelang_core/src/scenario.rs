//! End to end solve of one scenario: parse, compile, solve, extract routes
use std::time::Instant;

use thiserror::Error;
use tracing::{info, warn};

use crate::configuration::{Configuration, SolverSettings};
use crate::constraints::compiler::{compile, CompileSettings};
use crate::constraints::conflicts::check_conflicts;
use crate::constraints::orchestrator::{Orchestrator, ParseReport};
use crate::context::ProblemContext;
use crate::optimize::problem::ProblemError;
use crate::optimize::solvers::{solver_for, SolverError};
use crate::optimize::OptimizationStatus;
use crate::vrp::model::VrpModel;
use crate::vrp::solution::{extract_routes, AppliedConstraint, Solution, SolutionStatus};

/// Failures that end a solve with status `error`
#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("Unable to build the routing model: {0}")]
    Model(#[from] ProblemError),
    #[error(transparent)]
    Solver(#[from] SolverError),
    #[error("time limit reached without a feasible solution")]
    NoIncumbent,
    #[error("the routing model is unbounded")]
    Unbounded,
    #[error("solver reported {0:?} without variable values")]
    MissingValues(OptimizationStatus),
}

/// Split and interpret the constraint text without building a model
pub fn parse_constraints(
    context: &ProblemContext,
    text: &str,
    configuration: &Configuration,
) -> ParseReport {
    Orchestrator::from_config(context, &configuration.llm).parse(text)
}

/// Solve the routing problem for `context` under the constraints described by `text`
///
/// Never fails: errors are reported through the status and `error` of the returned
/// solution, constraints that could not be used through `rejected_constraints`.
pub fn solve_scenario(
    context: &ProblemContext,
    text: &str,
    configuration: &Configuration,
) -> Solution {
    let report = parse_constraints(context, text, configuration);
    let warnings = check_conflicts(&report.constraints, context);
    for warning in &warnings {
        warn!(%warning, "constraint conflict");
    }
    let mut rejected = report.rejected;

    let mut model = match VrpModel::build(context) {
        Ok(model) => model,
        Err(err) => {
            let mut solution = Solution::from_error(ScenarioError::from(err).to_string());
            solution.rejected_constraints = rejected;
            solution.warnings = warnings;
            return solution;
        }
    };
    let settings = CompileSettings {
        priority_weight: configuration.priority_weight,
    };
    let compiled = compile(report.constraints, &mut model, &settings);
    rejected.extend(compiled.rejected);

    let mut solution = solve_model(&model, &configuration.solver).unwrap_or_else(|err| {
        warn!(error = %err, "solve failed");
        Solution::from_error(err.to_string())
    });
    solution.applied_constraints = compiled.applied.iter().map(AppliedConstraint::from).collect();
    solution.rejected_constraints = rejected;
    solution.warnings = warnings;
    solution
}

fn solve_model(model: &VrpModel, settings: &SolverSettings) -> Result<Solution, ScenarioError> {
    let solver = solver_for(settings.backend)?;
    info!(
        solver = solver.name(),
        variables = model.problem().num_variables(),
        constraints = model.problem().num_constraints(),
        "solving"
    );
    let started = Instant::now();
    let result = solver.solve(model.problem(), settings)?;
    let solve_time_ms = started.elapsed().as_millis() as u64;
    info!(status = ?result.status, solve_time_ms, "solver finished");

    let status = match (result.status, &result.variable_values) {
        (OptimizationStatus::Optimal, Some(_)) => SolutionStatus::Optimal,
        (OptimizationStatus::SolverHalted, Some(_)) => SolutionStatus::FeasibleTimeout,
        (OptimizationStatus::SolverHalted, None) => return Err(ScenarioError::NoIncumbent),
        (OptimizationStatus::Infeasible, _) => SolutionStatus::Infeasible,
        (OptimizationStatus::Unbounded, _) => return Err(ScenarioError::Unbounded),
        (status, None) => return Err(ScenarioError::MissingValues(status)),
    };

    let mut solution = Solution::new(status);
    solution.solve_time_ms = solve_time_ms;
    if let Some(values) = result.variable_values {
        solution.objective_value = result.objective_value;
        solution.set_routes(model.context(), extract_routes(model, &values));
    }
    Ok(solution)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::configuration::SolverBackend;
    use crate::constraints::{ConstraintType, ParsingMethod, RejectionReason};
    use crate::vrp::model::tests::square_context;

    /// Depot and three customers on a line, node i at position i
    fn line_context(vehicles: usize) -> ProblemContext {
        let matrix = (0..4)
            .map(|i: i32| (0..4).map(|j: i32| (i - j).abs() as f64).collect())
            .collect();
        ProblemContext::builder()
            .vehicle_count(vehicles)
            .capacity(100.)
            .demands(vec![0., 10., 10., 10.])
            .distance_matrix(matrix)
            .build()
            .unwrap()
    }

    fn vehicle_of(solution: &Solution, node: usize) -> Option<usize> {
        solution
            .routes
            .iter()
            .find(|(_, route)| route.contains(&node))
            .map(|(&k, _)| k)
    }

    fn assert_routes_cover_customers(solution: &Solution, context: &ProblemContext) {
        for customer in context.customers() {
            let visits = solution
                .routes
                .values()
                .map(|route| route.iter().filter(|&&n| n == customer).count())
                .sum::<usize>();
            assert_eq!(visits, 1, "customer {customer} in {:?}", solution.routes);
        }
        for route in solution.routes.values() {
            assert_eq!(route.first(), Some(&context.depot_index()));
            assert_eq!(route.last(), Some(&context.depot_index()));
        }
    }

    #[test]
    fn unconstrained_line() {
        let context = line_context(2);
        let solution = solve_scenario(&context, "", &Configuration::default());
        assert_eq!(solution.status, SolutionStatus::Optimal, "{:?}", solution.error);
        assert_routes_cover_customers(&solution, &context);
        assert!((solution.total_distance - 6.).abs() < 1e-6);
        assert_eq!(solution.vehicles_used, 1);
        assert!(solution.applied_constraints.is_empty());
        assert!(solution.rejected_constraints.is_empty());
    }

    #[test]
    fn separated_nodes_use_different_vehicles() {
        let context = line_context(2);
        let solution = solve_scenario(
            &context,
            "node 1 and node 3 should not be served together",
            &Configuration::default(),
        );
        assert_eq!(solution.status, SolutionStatus::Optimal, "{:?}", solution.error);
        assert_routes_cover_customers(&solution, &context);
        assert_ne!(vehicle_of(&solution, 1), vehicle_of(&solution, 3));
        assert!((solution.total_distance - 8.).abs() < 1e-6);

        assert_eq!(solution.applied_constraints.len(), 1);
        let applied = &solution.applied_constraints[0];
        assert_eq!(applied.constraint_type, ConstraintType::NodeSeparation);
        assert_eq!(applied.parsing_method, ParsingMethod::Pattern);
        assert!(applied.confidence >= 0.85);
    }

    #[test]
    fn grouped_nodes_share_a_vehicle() {
        let context = square_context();
        let solution = solve_scenario(
            &context,
            "separate node 1 from node 2. node 1 and node 3 should be served together",
            &Configuration::default(),
        );
        assert_eq!(solution.status, SolutionStatus::Optimal, "{:?}", solution.error);
        assert_routes_cover_customers(&solution, &context);
        assert_eq!(solution.applied_constraints.len(), 2);
        assert_eq!(vehicle_of(&solution, 1), vehicle_of(&solution, 3));
        assert_ne!(vehicle_of(&solution, 1), vehicle_of(&solution, 2));
    }

    #[test]
    fn minimum_vehicle_count() {
        let solution = solve_scenario(
            &line_context(2),
            "Use at least 3 vehicles",
            &Configuration::default(),
        );
        assert_eq!(solution.status, SolutionStatus::Infeasible);
        assert!(solution.routes.is_empty());
        assert_eq!(solution.applied_constraints.len(), 1);
        assert_eq!(
            solution.warnings,
            vec!["at least 3 vehicles requested but only 2 are available".to_string()]
        );

        let context = line_context(3);
        let solution = solve_scenario(&context, "Use at least 3 vehicles", &Configuration::default());
        assert_eq!(solution.status, SolutionStatus::Optimal, "{:?}", solution.error);
        assert_routes_cover_customers(&solution, &context);
        assert_eq!(solution.vehicles_used, 3);
        assert!((solution.total_distance - 12.).abs() < 1e-6);
    }

    #[test]
    fn no_constraints_match_the_base_model() {
        let context = square_context();
        let configuration = Configuration::default();
        let model = VrpModel::build(&context).unwrap();
        let base = solver_for(SolverBackend::Microlp)
            .unwrap()
            .solve(model.problem(), &configuration.solver)
            .unwrap();
        let solution = solve_scenario(&context, "", &configuration);
        assert_eq!(solution.status, SolutionStatus::Optimal);
        let expected = base.objective_value.unwrap();
        assert!((solution.objective_value.unwrap() - expected).abs() < 1e-6);
        // One vehicle around the square plus its fixed cost
        assert!((expected - (2. * 2f64.sqrt() + 6. + 5.)).abs() < 1e-6);
    }

    #[test]
    fn out_of_range_constraint_is_rejected_alone() {
        let context = line_context(2);
        let solution = solve_scenario(
            &context,
            "node 1 and node 99 should be served together. Also, node 1 and node 3 should not be served together",
            &Configuration::default(),
        );
        assert_eq!(solution.status, SolutionStatus::Optimal, "{:?}", solution.error);
        assert_eq!(solution.rejected_constraints.len(), 1);
        let rejected = &solution.rejected_constraints[0];
        assert_eq!(rejected.reason, RejectionReason::EntityOutOfRange);
        assert_eq!(rejected.source_clause, "node 1 and node 99 should be served together");
        assert_eq!(solution.applied_constraints.len(), 1);
        assert_ne!(vehicle_of(&solution, 1), vehicle_of(&solution, 3));
    }

    #[test]
    fn huge_index_is_out_of_range() {
        let solution = solve_scenario(
            &line_context(2),
            "node 1 and node 99999999999999999999999 should be served together",
            &Configuration::default(),
        );
        assert_eq!(solution.status, SolutionStatus::Optimal, "{:?}", solution.error);
        assert_eq!(solution.rejected_constraints.len(), 1);
        assert_eq!(
            solution.rejected_constraints[0].reason,
            RejectionReason::EntityOutOfRange
        );
        assert!(solution.applied_constraints.is_empty());
    }

    #[test]
    fn assigned_node_rides_its_vehicle() {
        let context = line_context(2);
        let solution = solve_scenario(
            &context,
            "node 3 should be served by vehicle 1",
            &Configuration::default(),
        );
        assert_eq!(solution.status, SolutionStatus::Optimal, "{:?}", solution.error);
        assert_routes_cover_customers(&solution, &context);
        assert!(solution.routes[&1].contains(&3), "{:?}", solution.routes);
        assert_eq!(
            solution.applied_constraints[0].constraint_type,
            ConstraintType::VehicleAssignment
        );
        // Everything fits on vehicle 1, so the line is still driven once
        assert!((solution.total_distance - 6.).abs() < 1e-6);
    }

    #[test]
    fn distance_limit_splits_the_tour() {
        let context = square_context();
        let solution = solve_scenario(
            &context,
            "each route should not exceed 7",
            &Configuration::default(),
        );
        assert_eq!(solution.status, SolutionStatus::Optimal, "{:?}", solution.error);
        assert_routes_cover_customers(&solution, &context);
        assert_eq!(
            solution.applied_constraints[0].constraint_type,
            ConstraintType::RouteDistanceLimit
        );
        // The single tour is 2 * sqrt(2) + 6, so two vehicles are needed
        assert_eq!(solution.vehicles_used, 2);
        for distance in solution.route_distances.values() {
            assert!(*distance <= 7. + 1e-6, "{:?}", solution.route_distances);
        }
        assert!((solution.total_distance - 4. * 2f64.sqrt() - 4.).abs() < 1e-6);

        let solution = solve_scenario(
            &context,
            "each route should not exceed 2",
            &Configuration::default(),
        );
        assert_eq!(solution.status, SolutionStatus::Infeasible);
    }

    #[test]
    fn time_limit_without_incumbent_is_an_error() {
        // Depot in the middle of a 3 by 3 grid
        let points: Vec<(f64, f64)> = (0..9)
            .map(|i| ((i % 3) as f64, (i / 3) as f64))
            .collect();
        let matrix = points
            .iter()
            .map(|a| {
                points
                    .iter()
                    .map(|b| (a.0 - b.0).hypot(a.1 - b.1))
                    .collect()
            })
            .collect();
        let context = ProblemContext::builder()
            .vehicle_count(3)
            .capacity(30.)
            .depot_index(4)
            .distance_matrix(matrix)
            .build()
            .unwrap();
        let mut configuration = Configuration::default();
        configuration.solver.time_limit = Duration::from_millis(1);

        let solution = solve_scenario(&context, "", &configuration);
        assert_eq!(solution.status, SolutionStatus::Error);
        assert_eq!(
            solution.error.as_deref(),
            Some("time limit reached without a feasible solution")
        );
        assert!(solution.routes.is_empty());
        assert!(solution.objective_value.is_none());
    }

    #[test]
    fn nonsense_is_unparsed() {
        let context = line_context(2);
        let solution = solve_scenario(
            &context,
            "the weather is nice today",
            &Configuration::default(),
        );
        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert_eq!(solution.rejected_constraints.len(), 1);
        assert_eq!(solution.rejected_constraints[0].reason, RejectionReason::Unparsed);
        assert!(solution.applied_constraints.is_empty());
    }

    #[test]
    fn parse_only() {
        let context = line_context(2);
        let report = parse_constraints(
            &context,
            "Use at least 2 vehicles. Also, node 1 and node 2 should be served together.",
            &Configuration::default(),
        );
        let types: Vec<ConstraintType> =
            report.constraints.iter().map(|c| c.constraint_type).collect();
        assert_eq!(
            types,
            vec![ConstraintType::VehicleCountBound, ConstraintType::NodeGrouping]
        );
        assert_eq!(report.traces.len(), 2);
    }

    #[cfg(not(feature = "highs"))]
    #[test]
    fn unavailable_backend_is_an_error_status() {
        let mut configuration = Configuration::default();
        configuration.solver.backend = SolverBackend::Highs;
        let solution = solve_scenario(
            &line_context(2),
            "the weather is nice today",
            &configuration,
        );
        assert_eq!(solution.status, SolutionStatus::Error);
        assert!(solution.error.unwrap().contains("highs"));
        assert_eq!(solution.rejected_constraints.len(), 1);
    }
}
