//! Provides struct for representing a constraint in an optimization problem
use std::fmt::{Display, Formatter};

/// Represents a linear constraint in an optimization problem
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// Represents an equality constraint, where `terms` = `equals`
    Equality {
        /// Identifier, unique within a problem
        id: String,
        /// Linear terms which are added together, see [`ConstraintTerm`] for more
        terms: Vec<ConstraintTerm>,
        /// The right hand side of the equality constraint
        equals: f64,
    },
    /// Represents an inequality constraint, `lower_bound` <= `terms` <= `upper_bound`
    Inequality {
        /// Identifier, unique within a problem
        id: String,
        /// Linear terms which are added together, see [`ConstraintTerm`] for more
        terms: Vec<ConstraintTerm>,
        /// The lowest value the sum of the terms can take
        lower_bound: f64,
        /// The highest value the sum of the terms can take
        upper_bound: f64,
    },
}

impl Constraint {
    /// Create a new equality constraint
    ///
    /// # Parameters
    /// - `id`: Identifier of the constraint
    /// - `terms`: Linear terms summed on the left hand side
    /// - `equals`: The right hand side of the equality
    ///
    /// # Examples
    /// ```rust
    /// use routelang_core::optimize::constraint::{Constraint, ConstraintTerm};
    /// // Represents 3*v0 + 2*v1 = 6
    /// let c = Constraint::new_equality(
    ///     "c0",
    ///     vec![ConstraintTerm::new(0, 3.0), ConstraintTerm::new(1, 2.0)],
    ///     6.0,
    /// );
    /// ```
    pub fn new_equality(id: &str, terms: Vec<ConstraintTerm>, equals: f64) -> Self {
        Constraint::Equality {
            id: id.to_string(),
            terms,
            equals,
        }
    }

    /// Create a new inequality constraint
    pub fn new_inequality(
        id: &str,
        terms: Vec<ConstraintTerm>,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Self {
        Constraint::Inequality {
            id: id.to_string(),
            terms,
            lower_bound,
            upper_bound,
        }
    }

    /// Create a new constraint of the form `terms` <= `upper_bound`
    pub fn new_less_equal(id: &str, terms: Vec<ConstraintTerm>, upper_bound: f64) -> Self {
        Self::new_inequality(id, terms, f64::NEG_INFINITY, upper_bound)
    }

    /// Create a new constraint of the form `terms` >= `lower_bound`
    pub fn new_greater_equal(id: &str, terms: Vec<ConstraintTerm>, lower_bound: f64) -> Self {
        Self::new_inequality(id, terms, lower_bound, f64::INFINITY)
    }

    pub fn get_id(&self) -> &str {
        match self {
            Constraint::Equality { id, .. } | Constraint::Inequality { id, .. } => id,
        }
    }

    pub fn get_terms(&self) -> &[ConstraintTerm] {
        match self {
            Constraint::Equality { terms, .. } | Constraint::Inequality { terms, .. } => terms,
        }
    }

    /// Evaluate the left hand side for a vector of variable values
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.get_terms()
            .iter()
            .map(|t| t.coefficient * values.get(t.variable).copied().unwrap_or(0.0))
            .sum()
    }

    /// Check whether a vector of variable values satisfies the constraint within `tolerance`
    pub fn is_satisfied(&self, values: &[f64], tolerance: f64) -> bool {
        let lhs = self.evaluate(values);
        match self {
            Constraint::Equality { equals, .. } => (lhs - equals).abs() <= tolerance,
            Constraint::Inequality {
                lower_bound,
                upper_bound,
                ..
            } => lhs >= lower_bound - tolerance && lhs <= upper_bound + tolerance,
        }
    }

    /// Convert a slice of terms into a String representation
    fn terms_to_string(terms: &[ConstraintTerm]) -> String {
        if terms.is_empty() {
            return "0".to_string();
        }
        terms
            .iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join(" + ")
    }
}

impl Display for Constraint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Constraint::Equality { terms, equals, .. } => {
                write!(f, "{} = {}", Self::terms_to_string(terms), equals)
            }
            Constraint::Inequality {
                terms,
                lower_bound,
                upper_bound,
                ..
            } => {
                let lhs = Self::terms_to_string(terms);
                match (lower_bound.is_finite(), upper_bound.is_finite()) {
                    (true, true) => write!(f, "{} <= {} <= {}", lower_bound, lhs, upper_bound),
                    (true, false) => write!(f, "{} >= {}", lhs, lower_bound),
                    (false, true) => write!(f, "{} <= {}", lhs, upper_bound),
                    (false, false) => write!(f, "{} free", lhs),
                }
            }
        }
    }
}

/// Represents a single term in a constraint, specifically
/// represents the multiplication of the variable at index `variable` by the `coefficient`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstraintTerm {
    /// Index of the variable in the problem
    pub variable: usize,
    /// The coefficient for the variable
    pub coefficient: f64,
}

impl ConstraintTerm {
    pub fn new(variable: usize, coefficient: f64) -> Self {
        ConstraintTerm {
            variable,
            coefficient,
        }
    }
}

impl Display for ConstraintTerm {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}*v{}", self.coefficient, self.variable)
    }
}
