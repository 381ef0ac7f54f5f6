//! Solver interface for the pure Rust microlp MILP solver
//!
//! microlp has no time limit of its own, so the solve runs on a worker thread and the
//! caller stops waiting at the limit. The worker is detached and still occupies a core
//! until microlp returns. microlp keeps no incumbent, so a halted solve carries no values.
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;

use ::microlp::{ComparisonOp, LinearExpr, OptimizationDirection};
use tracing::{debug, warn};

use crate::configuration::SolverSettings;
use crate::optimize::constraint::{Constraint, ConstraintTerm};
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::problem::Problem;
use crate::optimize::solvers::{Solver, SolverError};
use crate::optimize::variable::VariableType;
use crate::optimize::{OptimizationStatus, ProblemSolution};

#[derive(Clone, Copy, Debug, Default)]
pub struct MicrolpSolver;

impl MicrolpSolver {
    /// Translate a problem into a microlp problem, returning the microlp variables in
    /// problem index order
    fn translate(
        problem: &Problem,
    ) -> Result<(::microlp::Problem, Vec<::microlp::Variable>), SolverError> {
        let direction = match problem.objective().sense() {
            ObjectiveSense::Minimize => OptimizationDirection::Minimize,
            ObjectiveSense::Maximize => OptimizationDirection::Maximize,
        };
        let mut lp = ::microlp::Problem::new(direction);
        let coefficients = problem
            .objective()
            .dense_coefficients(problem.num_variables());

        let mut variables = Vec::with_capacity(problem.num_variables());
        for (var, coef) in problem.variables().zip(coefficients) {
            let lp_var = match var.variable_type {
                VariableType::Binary => lp.add_binary_var(coef),
                VariableType::Integer => {
                    lp.add_integer_var(coef, (to_i32(var.lower_bound)?, to_i32(var.upper_bound)?))
                }
                VariableType::Continuous => lp.add_var(coef, (var.lower_bound, var.upper_bound)),
            };
            variables.push(lp_var);
        }

        for constraint in problem.constraints() {
            match constraint {
                Constraint::Equality { terms, equals, .. } => {
                    lp.add_constraint(expression(terms, &variables), ComparisonOp::Eq, *equals);
                }
                Constraint::Inequality {
                    terms,
                    lower_bound,
                    upper_bound,
                    ..
                } => {
                    if lower_bound.is_finite() {
                        lp.add_constraint(
                            expression(terms, &variables),
                            ComparisonOp::Ge,
                            *lower_bound,
                        );
                    }
                    if upper_bound.is_finite() {
                        lp.add_constraint(
                            expression(terms, &variables),
                            ComparisonOp::Le,
                            *upper_bound,
                        );
                    }
                }
            }
        }
        Ok((lp, variables))
    }
}

impl Solver for MicrolpSolver {
    fn name(&self) -> &'static str {
        "microlp"
    }

    fn solve(
        &self,
        problem: &Problem,
        settings: &SolverSettings,
    ) -> Result<ProblemSolution, SolverError> {
        let (lp, variables) = Self::translate(problem)?;
        debug!(
            variables = problem.num_variables(),
            constraints = problem.num_constraints(),
            "starting microlp solve"
        );

        let (sender, receiver) = mpsc::channel();
        thread::Builder::new()
            .name("microlp-solve".to_string())
            .spawn(move || {
                // The receiver is gone once the time limit has passed
                let _ = sender.send(lp.solve());
            })
            .map_err(|e| SolverError::Backend(e.to_string()))?;

        match receiver.recv_timeout(settings.time_limit) {
            Ok(Ok(solution)) => {
                let values: Vec<f64> = variables.iter().map(|v| solution[*v]).collect();
                Ok(ProblemSolution {
                    status: OptimizationStatus::Optimal,
                    objective_value: Some(problem.objective().evaluate(&values)),
                    variable_values: Some(values),
                })
            }
            Ok(Err(::microlp::Error::Infeasible)) => {
                Ok(ProblemSolution::without_values(OptimizationStatus::Infeasible))
            }
            Ok(Err(::microlp::Error::Unbounded)) => {
                Ok(ProblemSolution::without_values(OptimizationStatus::Unbounded))
            }
            Ok(Err(err)) => Err(SolverError::Backend(err.to_string())),
            Err(RecvTimeoutError::Timeout) => {
                // microlp can't be interrupted, the worker runs on until its solve returns
                warn!(
                    time_limit = ?settings.time_limit,
                    "microlp reached the time limit, the solve keeps running in the background"
                );
                Ok(ProblemSolution::without_values(
                    OptimizationStatus::SolverHalted,
                ))
            }
            Err(RecvTimeoutError::Disconnected) => Err(SolverError::Backend(
                "solver thread terminated without a result".to_string(),
            )),
        }
    }
}

fn expression(terms: &[ConstraintTerm], variables: &[::microlp::Variable]) -> LinearExpr {
    let mut expr = LinearExpr::empty();
    for term in terms {
        expr.add(variables[term.variable], term.coefficient);
    }
    expr
}

fn to_i32(bound: f64) -> Result<i32, SolverError> {
    if bound.is_finite() && bound >= i32::MIN as f64 && bound <= i32::MAX as f64 {
        Ok(bound.round() as i32)
    } else {
        Err(SolverError::InvalidProblem(format!(
            "integer variable bound {} is outside the supported range",
            bound
        )))
    }
}
