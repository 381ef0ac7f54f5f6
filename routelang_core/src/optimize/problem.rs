//! Provides struct representing an optimization problem
use crate::optimize::constraint::Constraint;
use crate::optimize::objective::{Objective, ObjectiveSense, ObjectiveTerm};
use crate::optimize::variable::{Variable, VariableType};
use indexmap::IndexMap;
use thiserror::Error;

/// An optimization problem
///
/// Problems are append-only: variables, constraints and objective terms can be added but
/// never removed or replaced, so anything layered on top of a base model is purely additive.
#[derive(Debug, Clone)]
pub struct Problem {
    /// Objective to optimize
    objective: Objective,
    /// Variables of the optimization problem, keyed by id
    variables: IndexMap<String, Variable>,
    /// Constraints of the optimization problem, keyed by id
    constraints: IndexMap<String, Constraint>,
}

impl Problem {
    // region Creation Functions
    /// Create a new optimization problem
    pub fn new(objective_sense: ObjectiveSense) -> Self {
        Self {
            objective: Objective::new(objective_sense),
            variables: IndexMap::new(),
            constraints: IndexMap::new(),
        }
    }

    /// Create a new minimization problem
    pub fn new_minimization() -> Self {
        Self::new(ObjectiveSense::Minimize)
    }
    // endregion Creation Functions

    // region Adding Variables
    /// Add a variable to the optimization problem, returning its index
    pub fn add_variable(&mut self, variable: Variable) -> Result<usize, ProblemError> {
        self.validate_variable(&variable)?;
        let index = self.variables.len();
        self.variables.insert(variable.id.clone(), variable);
        Ok(index)
    }

    /// Create a new variable and add it to the optimization problem
    pub fn add_new_variable(
        &mut self,
        id: &str,
        variable_type: VariableType,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<usize, ProblemError> {
        let (lower_bound, upper_bound) = match variable_type {
            VariableType::Binary => (0.0, 1.0),
            _ => (lower_bound, upper_bound),
        };
        self.add_variable(Variable {
            id: id.to_string(),
            variable_type,
            lower_bound,
            upper_bound,
        })
    }
    // endregion Adding Variables

    // region Adding Constraints
    /// Add a constraint to the problem
    pub fn add_constraint(&mut self, constraint: Constraint) -> Result<(), ProblemError> {
        self.validate_constraint(&constraint)?;
        self.constraints
            .insert(constraint.get_id().to_string(), constraint);
        Ok(())
    }
    // endregion Adding Constraints

    // region Adding Objective Terms
    /// Add a new term to the objective
    pub fn add_objective_term(&mut self, term: ObjectiveTerm) -> Result<(), ProblemError> {
        if term.variable >= self.variables.len() {
            return Err(ProblemError::NonExistentVariablesInObjective);
        }
        if !term.coefficient.is_finite() {
            return Err(ProblemError::InvalidCoefficient);
        }
        self.objective.add_term(term);
        Ok(())
    }

    /// Add a new linear term to the objective
    pub fn add_new_objective_term(
        &mut self,
        variable: usize,
        coefficient: f64,
    ) -> Result<(), ProblemError> {
        self.add_objective_term(ObjectiveTerm::new(variable, coefficient))
    }
    // endregion Adding Objective Terms

    // region Accessors
    pub fn objective(&self) -> &Objective {
        &self.objective
    }

    /// Variables in insertion order, which is also index order
    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.variables.values()
    }

    pub fn constraints(&self) -> impl Iterator<Item = &Constraint> {
        self.constraints.values()
    }

    pub fn constraint(&self, id: &str) -> Option<&Constraint> {
        self.constraints.get(id)
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }
    // endregion Accessors

    // region Validation Functions
    /// Check that a variable to be added is valid to add to this problem
    fn validate_variable(&self, variable: &Variable) -> Result<(), ProblemError> {
        if self.variables.contains_key(&variable.id) {
            return Err(ProblemError::VariableIdAlreadyExists(variable.id.clone()));
        }
        if variable.lower_bound > variable.upper_bound {
            return Err(ProblemError::InvalidVariableBounds);
        }
        Ok(())
    }

    /// Check that a constraint to be added is valid to add to this Problem
    fn validate_constraint(&self, constraint: &Constraint) -> Result<(), ProblemError> {
        if self.constraints.contains_key(constraint.get_id()) {
            return Err(ProblemError::ConstraintAlreadyExists(
                constraint.get_id().to_string(),
            ));
        }
        if let Constraint::Inequality {
            lower_bound,
            upper_bound,
            ..
        } = constraint
        {
            if lower_bound > upper_bound {
                return Err(ProblemError::InvalidConstraintBounds);
            }
        }
        for term in constraint.get_terms() {
            if term.variable >= self.variables.len() {
                return Err(ProblemError::NonExistentVariablesInConstraint);
            }
            if !term.coefficient.is_finite() {
                return Err(ProblemError::InvalidCoefficient);
            }
        }
        Ok(())
    }
    // endregion Validation Functions
}

/// Reasons a variable, constraint or objective term can't be added to a [`Problem`]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProblemError {
    #[error("Variable id {0} is already in use")]
    VariableIdAlreadyExists(String),
    #[error("Variable lower bound is above its upper bound")]
    InvalidVariableBounds,
    /// Constraints are never replaced
    #[error("Constraint id {0} is already in use")]
    ConstraintAlreadyExists(String),
    #[error("Inequality lower bound is above its upper bound")]
    InvalidConstraintBounds,
    #[error("Constraint refers to a variable index outside the problem")]
    NonExistentVariablesInConstraint,
    #[error("Objective term refers to a variable index outside the problem")]
    NonExistentVariablesInObjective,
    #[error("Coefficient is NaN or infinite")]
    InvalidCoefficient,
}
