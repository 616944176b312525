//! Logic-circuit model and evaluation engine: a registry-backed circuit
//! graph (components, ports, wires, wire endpoints) kept in lockstep with a
//! dependency-ordered DAG that propagates tri-state signals.

#![warn(clippy::all, rust_2018_idioms)]

pub mod dag;
pub mod error;
pub mod graph;
pub mod templates;

pub use dag::{LogicDag, Signal};
pub use error::CircuitError;
pub use graph::CircuitGraph;
