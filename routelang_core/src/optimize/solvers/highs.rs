//! Solver interface for HiGHS, requires the highs feature
//!
//! HiGHS honours the time limit and relative gap natively and keeps its incumbent when it
//! stops at the limit.
use ::highs::{HighsModelStatus, RowProblem, Sense};
use tracing::debug;

use crate::configuration::SolverSettings;
use crate::optimize::constraint::Constraint;
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::problem::Problem;
use crate::optimize::solvers::{Solver, SolverError};
use crate::optimize::variable::VariableType;
use crate::optimize::{OptimizationStatus, ProblemSolution};

/// Tolerance used when checking an incumbent against the constraints
const FEASIBILITY_TOLERANCE: f64 = 1e-6;

#[derive(Clone, Copy, Debug, Default)]
pub struct HighsSolver;

impl Solver for HighsSolver {
    fn name(&self) -> &'static str {
        "highs"
    }

    fn solve(
        &self,
        problem: &Problem,
        settings: &SolverSettings,
    ) -> Result<ProblemSolution, SolverError> {
        let coefficients = problem
            .objective()
            .dense_coefficients(problem.num_variables());
        let mut rows = RowProblem::default();
        let columns: Vec<_> = problem
            .variables()
            .zip(coefficients)
            .map(|(var, coef)| match var.variable_type {
                VariableType::Continuous => {
                    rows.add_column(coef, var.lower_bound..=var.upper_bound)
                }
                VariableType::Integer | VariableType::Binary => {
                    rows.add_integer_column(coef, var.lower_bound..=var.upper_bound)
                }
            })
            .collect();

        for constraint in problem.constraints() {
            let factors: Vec<_> = constraint
                .get_terms()
                .iter()
                .map(|t| (columns[t.variable], t.coefficient))
                .collect();
            match constraint {
                Constraint::Equality { equals, .. } => rows.add_row(*equals..=*equals, factors),
                Constraint::Inequality {
                    lower_bound,
                    upper_bound,
                    ..
                } => rows.add_row(*lower_bound..=*upper_bound, factors),
            }
        }

        let sense = match problem.objective().sense() {
            ObjectiveSense::Minimize => Sense::Minimise,
            ObjectiveSense::Maximize => Sense::Maximise,
        };
        let mut model = rows.optimise(sense);
        model.set_option("output_flag", false);
        model.set_option("time_limit", settings.time_limit.as_secs_f64());
        model.set_option("mip_rel_gap", settings.mip_gap);
        let solved = model
            .try_solve()
            .map_err(|status| SolverError::Backend(format!("{:?}", status)))?;

        let status = solved.status();
        debug!(?status, "highs finished");
        let values = solved.get_solution().columns().to_vec();
        let feasible = problem
            .constraints()
            .all(|c| c.is_satisfied(&values, FEASIBILITY_TOLERANCE));

        let solution = match status {
            HighsModelStatus::Optimal => ProblemSolution {
                status: OptimizationStatus::Optimal,
                objective_value: Some(problem.objective().evaluate(&values)),
                variable_values: Some(values),
            },
            HighsModelStatus::Infeasible => {
                ProblemSolution::without_values(OptimizationStatus::Infeasible)
            }
            HighsModelStatus::Unbounded | HighsModelStatus::UnboundedOrInfeasible => {
                ProblemSolution::without_values(OptimizationStatus::Unbounded)
            }
            HighsModelStatus::ReachedTimeLimit if feasible => ProblemSolution {
                status: OptimizationStatus::SolverHalted,
                objective_value: Some(problem.objective().evaluate(&values)),
                variable_values: Some(values),
            },
            HighsModelStatus::ReachedTimeLimit => {
                ProblemSolution::without_values(OptimizationStatus::SolverHalted)
            }
            other => return Err(SolverError::Backend(format!("{:?}", other))),
        };
        Ok(solution)
    }
}
