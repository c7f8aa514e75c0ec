//! Driven adapters for the assignment ports.

pub mod memory;
pub mod persistence;
