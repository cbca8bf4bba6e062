//! Emission-factor reference data (activity factors and gas GWP values).
//!
//! Pure catalog types and their validation rules. Storage lives in infra.

pub mod catalog;

pub use catalog::{EmissionFactor, GasGwp, NewEmissionFactor, NewGasGwp, Scope};
