//! The arc based VRP formulation
//!
//! Variables:
//! - `x_i_j_k` binary, vehicle k drives directly from node i to node j (i != j)
//! - `used_k` binary, vehicle k leaves the depot
//! - `p_i` continuous in [1, n-1], visiting order of customer i (MTZ)
//!
//! Objective: total arc distance plus the fixed cost of each used vehicle.
use crate::context::ProblemContext;
use crate::optimize::constraint::{Constraint, ConstraintTerm};
use crate::optimize::objective::ObjectiveTerm;
use crate::optimize::problem::{Problem, ProblemError};
use crate::optimize::variable::VariableType;

pub struct VrpModel<'a> {
    context: &'a ProblemContext,
    problem: Problem,
    /// Arc variable index, stored at `(i * n + j) * vehicles + k`
    arcs: Vec<Option<usize>>,
    used: Vec<usize>,
    positions: Vec<Option<usize>>,
}

impl<'a> VrpModel<'a> {
    /// Build the base model for an instance
    pub fn build(context: &'a ProblemContext) -> Result<Self, ProblemError> {
        let n = context.node_count();
        let vehicles = context.vehicle_count();
        let depot = context.depot_index();
        let mut problem = Problem::new_minimization();

        // region Variables
        let mut arcs = vec![None; n * n * vehicles];
        for i in 0..n {
            for j in (0..n).filter(|&j| j != i) {
                for k in 0..vehicles {
                    let var = problem.add_new_variable(
                        &format!("x_{i}_{j}_{k}"),
                        VariableType::Binary,
                        0.,
                        1.,
                    )?;
                    problem.add_new_objective_term(var, context.distance(i, j))?;
                    arcs[(i * n + j) * vehicles + k] = Some(var);
                }
            }
        }
        let mut used = Vec::with_capacity(vehicles);
        for k in 0..vehicles {
            let var = problem.add_new_variable(&format!("used_{k}"), VariableType::Binary, 0., 1.)?;
            if context.vehicle_fixed_cost() > 0. {
                problem.add_new_objective_term(var, context.vehicle_fixed_cost())?;
            }
            used.push(var);
        }
        let mut positions = vec![None; n];
        for i in context.customers() {
            positions[i] = Some(problem.add_new_variable(
                &format!("p_{i}"),
                VariableType::Continuous,
                1.,
                (n - 1) as f64,
            )?);
        }
        // endregion Variables

        let mut model = VrpModel {
            context,
            problem,
            arcs,
            used,
            positions,
        };
        model.add_base_constraints(depot)?;
        Ok(model)
    }

    fn add_base_constraints(&mut self, depot: usize) -> Result<(), ProblemError> {
        let n = self.context.node_count();
        let vehicles = self.context.vehicle_count();
        let customers: Vec<usize> = self.context.customers().collect();

        for &j in &customers {
            // Every customer is entered exactly once
            let terms = (0..vehicles)
                .flat_map(|k| self.incidence_terms(j, k))
                .collect();
            self.problem
                .add_constraint(Constraint::new_equality(&format!("visit_{j}"), terms, 1.))?;

            // What enters a customer on a vehicle leaves it on the same vehicle
            for k in 0..vehicles {
                let mut terms = self.incidence_terms(j, k);
                terms.extend(self.outflow_terms(j, k).into_iter().map(|t| {
                    ConstraintTerm::new(t.variable, -t.coefficient)
                }));
                self.problem
                    .add_constraint(Constraint::new_equality(&format!("flow_{j}_{k}"), terms, 0.))?;
            }
        }

        for k in 0..vehicles {
            let used = ConstraintTerm::new(self.used[k], -1.);
            let mut out_terms = self.outflow_terms(depot, k);
            out_terms.push(used);
            self.problem
                .add_constraint(Constraint::new_equality(&format!("depot_out_{k}"), out_terms, 0.))?;
            let mut in_terms = self.incidence_terms(depot, k);
            in_terms.push(used);
            self.problem
                .add_constraint(Constraint::new_equality(&format!("depot_in_{k}"), in_terms, 0.))?;

            let load = customers
                .iter()
                .flat_map(|&j| {
                    let demand = self.context.demand(j);
                    self.incidence_terms(j, k)
                        .into_iter()
                        .map(move |t| ConstraintTerm::new(t.variable, demand))
                })
                .collect();
            self.problem.add_constraint(Constraint::new_less_equal(
                &format!("capacity_{k}"),
                load,
                self.context.capacity(),
            ))?;
        }

        // Miller-Tucker-Zemlin ordering
        let big_m = (n - 1) as f64;
        for &i in &customers {
            for &j in customers.iter().filter(|&&j| j != i) {
                let (Some(p_i), Some(p_j)) = (self.positions[i], self.positions[j]) else {
                    continue;
                };
                let mut terms = vec![ConstraintTerm::new(p_i, 1.), ConstraintTerm::new(p_j, -1.)];
                terms.extend(
                    (0..vehicles)
                        .filter_map(|k| self.arc(i, j, k))
                        .map(|x| ConstraintTerm::new(x, big_m)),
                );
                self.problem.add_constraint(Constraint::new_less_equal(
                    &format!("mtz_{i}_{j}"),
                    terms,
                    big_m - 1.,
                ))?;
            }
        }
        Ok(())
    }

    // region Accessors
    pub fn context(&self) -> &ProblemContext {
        self.context
    }

    pub fn problem(&self) -> &Problem {
        &self.problem
    }

    /// Arc variable of vehicle k from i to j, `None` for self loops or unknown indices
    pub fn arc(&self, i: usize, j: usize, k: usize) -> Option<usize> {
        let n = self.context.node_count();
        let vehicles = self.context.vehicle_count();
        if i >= n || j >= n || k >= vehicles {
            return None;
        }
        self.arcs[(i * n + j) * vehicles + k]
    }

    pub fn used(&self, k: usize) -> Option<usize> {
        self.used.get(k).copied()
    }

    /// Ordering variable of a customer
    pub fn position(&self, node: usize) -> Option<usize> {
        self.positions.get(node).copied().flatten()
    }

    /// Terms of the inflow of `node` on vehicle k, 1 when k serves the node
    pub fn incidence_terms(&self, node: usize, k: usize) -> Vec<ConstraintTerm> {
        (0..self.context.node_count())
            .filter_map(|i| self.arc(i, node, k))
            .map(|x| ConstraintTerm::new(x, 1.))
            .collect()
    }

    pub fn outflow_terms(&self, node: usize, k: usize) -> Vec<ConstraintTerm> {
        (0..self.context.node_count())
            .filter_map(|j| self.arc(node, j, k))
            .map(|x| ConstraintTerm::new(x, 1.))
            .collect()
    }

    /// Distance driven by vehicle k
    pub fn distance_terms(&self, k: usize) -> Vec<ConstraintTerm> {
        let n = self.context.node_count();
        (0..n)
            .flat_map(|i| (0..n).map(move |j| (i, j)))
            .filter_map(|(i, j)| {
                self.arc(i, j, k)
                    .map(|x| ConstraintTerm::new(x, self.context.distance(i, j)))
            })
            .filter(|t| t.coefficient != 0.)
            .collect()
    }

    /// Number of vehicles leaving the depot
    pub fn used_terms(&self) -> Vec<ConstraintTerm> {
        self.used.iter().map(|&u| ConstraintTerm::new(u, 1.)).collect()
    }
    // endregion Accessors

    // region Extension Point
    /// Add a constraint on top of the base model; base constraints can't be replaced
    pub fn append_constraint(&mut self, constraint: Constraint) -> Result<(), ProblemError> {
        self.problem.add_constraint(constraint)
    }

    pub fn append_objective_term(&mut self, term: ObjectiveTerm) -> Result<(), ProblemError> {
        self.problem.add_objective_term(term)
    }
    // endregion Extension Point
}
