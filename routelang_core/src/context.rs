//! Static description of a VRP instance
use derive_builder::Builder;
use serde::Serialize;
use thiserror::Error;

/// A validated VRP instance
///
/// Built through [`ProblemContextBuilder`], immutable afterwards. Node 0 is the depot unless
/// `depot_index` says otherwise. When no demands are given every customer demands 1 and
/// the depot 0. Given demands must put 0 at the depot.
#[derive(Builder, Clone, Debug, PartialEq, Serialize)]
#[builder(pattern = "owned", build_fn(private, name = "build_unchecked"))]
pub struct ProblemContext {
    vehicle_count: usize,
    capacity: f64,
    #[builder(default)]
    depot_index: usize,
    distance_matrix: Vec<Vec<f64>>,
    #[builder(default)]
    demands: Vec<f64>,
    #[builder(default)]
    vehicle_fixed_cost: f64,
}

impl ProblemContextBuilder {
    /// Build and validate the context
    pub fn build(self) -> Result<ProblemContext, ContextError> {
        let mut context = self
            .build_unchecked()
            .map_err(|e| ContextError::MissingField(e.to_string()))?;
        if context.demands.is_empty() {
            context.demands = (0..context.distance_matrix.len())
                .map(|i| if i == context.depot_index { 0.0 } else { 1.0 })
                .collect();
        }
        context.validate()?;
        Ok(context)
    }
}

impl ProblemContext {
    pub fn builder() -> ProblemContextBuilder {
        ProblemContextBuilder::default()
    }

    fn validate(&self) -> Result<(), ContextError> {
        if self.vehicle_count == 0 {
            return Err(ContextError::NoVehicles);
        }
        if !(self.capacity.is_finite() && self.capacity > 0.0) {
            return Err(ContextError::InvalidCapacity(self.capacity));
        }
        let n = self.distance_matrix.len();
        if n < 2 {
            return Err(ContextError::TooFewNodes(n));
        }
        for (i, row) in self.distance_matrix.iter().enumerate() {
            if row.len() != n {
                return Err(ContextError::NonSquareMatrix {
                    row: i,
                    len: row.len(),
                    expected: n,
                });
            }
            if let Some(j) = row.iter().position(|d| !(d.is_finite() && *d >= 0.0)) {
                return Err(ContextError::InvalidDistance { from: i, to: j });
            }
        }
        if self.depot_index >= n {
            return Err(ContextError::DepotOutOfRange(self.depot_index));
        }
        if self.demands.len() != n {
            return Err(ContextError::DemandLength {
                len: self.demands.len(),
                expected: n,
            });
        }
        if let Some(node) = self
            .demands
            .iter()
            .position(|d| !(d.is_finite() && *d >= 0.0))
        {
            return Err(ContextError::InvalidDemand(node));
        }
        let depot_demand = self.demands[self.depot_index];
        if depot_demand != 0.0 {
            return Err(ContextError::DepotDemand(depot_demand));
        }
        if !(self.vehicle_fixed_cost.is_finite() && self.vehicle_fixed_cost >= 0.0) {
            return Err(ContextError::InvalidFixedCost(self.vehicle_fixed_cost));
        }
        Ok(())
    }

    // region Accessors
    pub fn vehicle_count(&self) -> usize {
        self.vehicle_count
    }

    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    /// Number of nodes, depot included
    pub fn node_count(&self) -> usize {
        self.distance_matrix.len()
    }

    pub fn depot_index(&self) -> usize {
        self.depot_index
    }

    pub fn distance(&self, from: usize, to: usize) -> f64 {
        self.distance_matrix[from][to]
    }

    pub fn demands(&self) -> &[f64] {
        &self.demands
    }

    pub fn demand(&self, node: usize) -> f64 {
        self.demands[node]
    }

    pub fn vehicle_fixed_cost(&self) -> f64 {
        self.vehicle_fixed_cost
    }

    /// Every node except the depot, in index order
    pub fn customers(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.node_count()).filter(move |&i| i != self.depot_index)
    }
    // endregion Accessors

    /// Short description handed to the LLM interpreter
    pub fn describe(&self) -> String {
        format!(
            "vehicle_count={}, capacity={}, node_count={} (node indices 0..{}, depot={}), \
             vehicle indices 0..{}",
            self.vehicle_count,
            self.capacity,
            self.node_count(),
            self.node_count() - 1,
            self.depot_index,
            self.vehicle_count - 1
        )
    }
}

/// Errors raised while building a [`ProblemContext`]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ContextError {
    #[error("Missing required field: {0}")]
    MissingField(String),
    #[error("At least one vehicle is required")]
    NoVehicles,
    #[error("Capacity must be positive and finite, got {0}")]
    InvalidCapacity(f64),
    #[error("At least two nodes (depot and one customer) are required, got {0}")]
    TooFewNodes(usize),
    #[error("Distance matrix row {row} has {len} entries, expected {expected}")]
    NonSquareMatrix {
        row: usize,
        len: usize,
        expected: usize,
    },
    #[error("Distance from {from} to {to} is negative or not finite")]
    InvalidDistance { from: usize, to: usize },
    #[error("Depot index {0} is not a node")]
    DepotOutOfRange(usize),
    #[error("Got {len} demands for {expected} nodes")]
    DemandLength { len: usize, expected: usize },
    #[error("Demand of node {0} is negative or not finite")]
    InvalidDemand(usize),
    #[error("The depot has demand {0}, it must be 0")]
    DepotDemand(f64),
    #[error("Vehicle fixed cost must be non-negative and finite, got {0}")]
    InvalidFixedCost(f64),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(n: usize) -> Vec<Vec<f64>> {
        (0..n)
            .map(|i| (0..n).map(|j| (i as f64 - j as f64).abs()).collect())
            .collect()
    }

    #[test]
    fn default_demands() {
        let context = ProblemContext::builder()
            .vehicle_count(2)
            .capacity(10.)
            .depot_index(1)
            .distance_matrix(matrix(3))
            .build()
            .unwrap();
        assert_eq!(context.node_count(), 3);
        assert_eq!(context.demands(), &[1.0, 0.0, 1.0]);
        assert_eq!(context.customers().collect::<Vec<_>>(), vec![0, 2]);
        assert!((context.distance(0, 2) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn invalid_contexts() {
        let base = || {
            ProblemContext::builder()
                .vehicle_count(2)
                .capacity(10.)
                .distance_matrix(matrix(3))
        };
        assert!(matches!(
            ProblemContext::builder().capacity(1.).build(),
            Err(ContextError::MissingField(_))
        ));
        assert_eq!(
            base().vehicle_count(0).build(),
            Err(ContextError::NoVehicles)
        );
        assert_eq!(
            base().capacity(-1.).build(),
            Err(ContextError::InvalidCapacity(-1.))
        );
        assert_eq!(
            base().distance_matrix(matrix(1)).build(),
            Err(ContextError::TooFewNodes(1))
        );
        assert_eq!(
            base()
                .distance_matrix(vec![vec![0., 1.], vec![1.]])
                .build(),
            Err(ContextError::NonSquareMatrix {
                row: 1,
                len: 1,
                expected: 2
            })
        );
        assert_eq!(
            base()
                .distance_matrix(vec![vec![0., -1.], vec![1., 0.]])
                .build(),
            Err(ContextError::InvalidDistance { from: 0, to: 1 })
        );
        assert_eq!(
            base().depot_index(3).build(),
            Err(ContextError::DepotOutOfRange(3))
        );
        assert_eq!(
            base().demands(vec![0., 1.]).build(),
            Err(ContextError::DemandLength {
                len: 2,
                expected: 3
            })
        );
        assert_eq!(
            base().demands(vec![0., 1., f64::NAN]).build(),
            Err(ContextError::InvalidDemand(2))
        );
        assert_eq!(
            base().demands(vec![3., 1., 1.]).build(),
            Err(ContextError::DepotDemand(3.))
        );
        assert!(base().depot_index(2).demands(vec![1., 1., 0.]).build().is_ok());
    }
}
