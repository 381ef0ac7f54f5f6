//! Core library of routelang, a crate for turning natural language routing requirements
//! into constraints of a vehicle routing MILP and solving it.

pub mod configuration;
pub mod constraints;
pub mod context;
pub mod io;
pub mod optimize;
pub mod scenario;
pub mod vrp;
