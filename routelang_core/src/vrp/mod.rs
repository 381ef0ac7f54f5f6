//! Vehicle routing model and solution

pub mod model;
pub mod solution;
