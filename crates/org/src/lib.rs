//! Organization module (groups, entities, facilities).
//!
//! This crate owns entity lifecycle for the rest of the system. It contains
//! validation rules only (no IO, no HTTP, no storage).

pub mod directory;

pub use directory::{Entity, Facility, Group, NewEntity, NewFacility, NewGroup};
