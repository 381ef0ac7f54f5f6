//! Module providing representation of optimization problem variables

/// A decision variable of a [`Problem`](crate::optimize::problem::Problem)
///
/// Variables are addressed by their position in the problem, the id only has to be unique.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    /// Identifier, unique within a problem
    pub id: String,
    /// Type of the variable, see [`VariableType`]
    pub variable_type: VariableType,
    /// Lowest value the variable can take
    pub lower_bound: f64,
    /// Highest value the variable can take
    pub upper_bound: f64,
}

/// Represents the type of variable in an optimization problem
#[derive(Debug, PartialEq, Clone, Copy, Hash, Eq)]
pub enum VariableType {
    /// Continuous variable
    Continuous,
    /// Integer variable
    Integer,
    /// Binary Variable
    Binary,
}
