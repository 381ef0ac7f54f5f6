//! Solver interfaces
//!
//! Every backend takes a fully built [`Problem`] and returns a [`ProblemSolution`]. The
//! `microlp` backend is always available, `highs` requires the `highs` feature.
use cfg_if::cfg_if;
use thiserror::Error;

use crate::configuration::{SolverBackend, SolverSettings};
use crate::optimize::problem::Problem;
use crate::optimize::ProblemSolution;

pub mod microlp;

#[cfg(feature = "highs")]
pub mod highs;

/// A mixed integer linear programming backend
pub trait Solver: Send + Sync {
    /// Short name of the backend, used for logging
    fn name(&self) -> &'static str;

    /// Solve `problem`, respecting the time limit and gap in `settings`
    ///
    /// Proven infeasibility, unboundedness and reaching the time limit are statuses on the
    /// returned solution, not errors.
    fn solve(
        &self,
        problem: &Problem,
        settings: &SolverSettings,
    ) -> Result<ProblemSolution, SolverError>;
}

/// Create the solver for a backend
pub fn solver_for(backend: SolverBackend) -> Result<Box<dyn Solver>, SolverError> {
    match backend {
        SolverBackend::Microlp => Ok(Box::new(microlp::MicrolpSolver)),
        SolverBackend::Highs => {
            cfg_if! {
                if #[cfg(feature = "highs")] {
                    Ok(Box::new(highs::HighsSolver))
                } else {
                    Err(SolverError::BackendUnavailable("highs"))
                }
            }
        }
    }
}

/// Errors raised by solver backends
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    /// The requested backend was not compiled in
    #[error("Solver backend {0} is not available, enable the corresponding feature")]
    BackendUnavailable(&'static str),
    /// The problem can't be expressed for the backend
    #[error("Problem can't be passed to the solver: {0}")]
    InvalidProblem(String),
    /// The backend failed while solving
    #[error("Solver failed: {0}")]
    Backend(String),
}
