//! Module providing JSON IO for scenarios and solutions
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::context::{ContextError, ProblemContext};
use crate::vrp::solution::Solution;

// region JSON Scenario
/// Represents a JSON serialized scenario
///
/// Distances come from `distance_matrix`, or are the Euclidean distances between
/// `coordinates` when no matrix is given.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
struct JsonScenario {
    vehicle_count: usize,
    capacity: f64,
    depot_index: Option<usize>,
    demands: Option<Vec<f64>>,
    vehicle_fixed_cost: Option<f64>,
    distance_matrix: Option<Vec<Vec<f64>>>,
    coordinates: Option<Vec<[f64; 2]>>,
    constraints: Option<String>,
}
// endregion JSON Scenario

/// An instance together with its constraint text
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub context: ProblemContext,
    pub constraints: String,
}

impl Scenario {
    pub fn read_json<P: AsRef<Path>>(path: P) -> Result<Scenario, JsonError> {
        let scenario_str = match fs::read_to_string(path) {
            Ok(data) => data,
            Err(err) => return Err(JsonError::UnableToRead(format!("{:?}", err))),
        };
        Scenario::from_json_str(&scenario_str)
    }

    pub fn from_json_str(data: &str) -> Result<Scenario, JsonError> {
        let json_scenario = match serde_json::from_str::<JsonScenario>(data) {
            Ok(scenario) => scenario,
            Err(err) => return Err(JsonError::UnableToParse(err.to_string())),
        };
        Scenario::from_json(json_scenario)
    }

    fn from_json(json_scenario: JsonScenario) -> Result<Self, JsonError> {
        let distance_matrix = match (json_scenario.distance_matrix, json_scenario.coordinates) {
            (Some(_), Some(_)) => return Err(JsonError::AmbiguousDistances),
            (Some(matrix), None) => matrix,
            (None, Some(coordinates)) => euclidean_distances(&coordinates),
            (None, None) => return Err(JsonError::MissingDistances),
        };
        let mut builder = ProblemContext::builder()
            .vehicle_count(json_scenario.vehicle_count)
            .capacity(json_scenario.capacity)
            .distance_matrix(distance_matrix)
            .depot_index(json_scenario.depot_index.unwrap_or_default())
            .vehicle_fixed_cost(json_scenario.vehicle_fixed_cost.unwrap_or_default());
        if let Some(demands) = json_scenario.demands {
            builder = builder.demands(demands);
        }
        Ok(Scenario {
            context: builder.build()?,
            constraints: json_scenario.constraints.unwrap_or_default(),
        })
    }
}

fn euclidean_distances(coordinates: &[[f64; 2]]) -> Vec<Vec<f64>> {
    coordinates
        .iter()
        .map(|a| {
            coordinates
                .iter()
                .map(|b| (a[0] - b[0]).hypot(a[1] - b[1]))
                .collect()
        })
        .collect()
}

impl Solution {
    pub fn to_json_string(&self) -> Result<String, JsonError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<(), JsonError> {
        let solution_string = self.to_json_string()?;
        fs::write(path, solution_string)?;
        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum JsonError {
    #[error("Unable to read file due to {0}")]
    UnableToRead(String),
    #[error("Unable to parse json due to {0}")]
    UnableToParse(String),
    #[error("Scenario needs either distance_matrix or coordinates")]
    MissingDistances,
    #[error("Scenario has both distance_matrix and coordinates")]
    AmbiguousDistances,
    #[error("Invalid scenario: {0}")]
    InvalidContext(#[from] ContextError),
    #[error("Serde json error")]
    SerdeJsonError(#[from] serde_json::Error),
    #[error("Unable to write to file")]
    UnableToWrite(#[from] std::io::Error),
}

#[cfg(test)]
mod json_tests {
    use super::*;
    use crate::vrp::solution::SolutionStatus;

    #[test]
    fn scenario_with_matrix() {
        let data = r#"{
"vehicle_count": 2,
"capacity": 100,
"demands": [0, 10, 10, 10],
"distance_matrix": [[0, 1, 2, 3], [1, 0, 1, 2], [2, 1, 0, 1], [3, 2, 1, 0]],
"constraints": "node 1 and node 3 should not be served together"
}"#;
        let scenario = Scenario::from_json_str(data).unwrap();
        assert_eq!(scenario.context.node_count(), 4);
        assert_eq!(scenario.context.vehicle_count(), 2);
        assert_eq!(scenario.context.depot_index(), 0);
        assert_eq!(scenario.context.demand(2), 10.);
        assert_eq!(
            scenario.constraints,
            "node 1 and node 3 should not be served together"
        );
    }

    #[test]
    fn scenario_with_coordinates() {
        let data = r#"{"vehicle_count": 1, "capacity": 5, "depot_index": 1,
"coordinates": [[0, 0], [3, 4], [6, 8]]}"#;
        let scenario = Scenario::from_json_str(data).unwrap();
        assert!((scenario.context.distance(0, 1) - 5.).abs() < 1e-12);
        assert!((scenario.context.distance(2, 0) - 10.).abs() < 1e-12);
        assert_eq!(scenario.context.demands(), &[1., 0., 1.]);
        assert!(scenario.constraints.is_empty());
    }

    #[test]
    fn invalid_scenarios() {
        assert!(matches!(
            Scenario::from_json_str(r#"{"vehicle_count": 1, "capacity": 5}"#),
            Err(JsonError::MissingDistances)
        ));
        assert!(matches!(
            Scenario::from_json_str(
                r#"{"vehicle_count": 1, "capacity": 5, "coordinates": [[0, 0], [1, 1]],
"distance_matrix": [[0, 1], [1, 0]]}"#
            ),
            Err(JsonError::AmbiguousDistances)
        ));
        assert!(matches!(
            Scenario::from_json_str(
                r#"{"vehicle_count": 0, "capacity": 5, "coordinates": [[0, 0], [1, 1]]}"#
            ),
            Err(JsonError::InvalidContext(ContextError::NoVehicles))
        ));
        assert!(matches!(
            Scenario::from_json_str("{"),
            Err(JsonError::UnableToParse(_))
        ));
    }

    #[test]
    fn solution_json() {
        let solution = Solution::new(SolutionStatus::Infeasible);
        let json: serde_json::Value =
            serde_json::from_str(&solution.to_json_string().unwrap()).unwrap();
        assert_eq!(json["status"], "infeasible");
        assert_eq!(json["total_distance"], 0.0);
        assert!(json["routes"].as_object().unwrap().is_empty());
    }
}
