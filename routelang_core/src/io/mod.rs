//! Module for reading scenarios and writing solutions
pub mod json;
