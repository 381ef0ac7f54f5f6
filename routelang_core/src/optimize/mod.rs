//! Module for constructing and solving optimization problems

pub mod constraint;
pub mod objective;
pub mod problem;
pub mod solvers;
pub mod variable;

/// Struct representing the solution to an optimization problem
#[derive(Debug, Clone)]
pub struct ProblemSolution {
    /// The status of the optimization problem, representing if the optimization was
    /// completed successfully
    pub status: OptimizationStatus,
    /// Value of the objective at the returned point
    ///
    /// Some(f64) if a solution was found, None otherwise
    pub objective_value: Option<f64>,
    /// Values of the variables, indexed like the problem's variables
    ///
    /// Some if the solver returned a point (optimal, or an incumbent when halted),
    /// None otherwise
    pub variable_values: Option<Vec<f64>>,
}

impl ProblemSolution {
    /// A solution carrying only a status
    pub fn without_values(status: OptimizationStatus) -> Self {
        ProblemSolution {
            status,
            objective_value: None,
            variable_values: None,
        }
    }
}

/// Status of an optimization problem
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum OptimizationStatus {
    /// Problem has been optimized
    Optimal,
    /// Problem can't be optimized because objective value is not bounded
    Unbounded,
    /// Problem can't be solved because it is infeasible (conflicting constraints)
    Infeasible,
    /// The solver hit the maximum allowed time before proving optimality
    SolverHalted,
}
