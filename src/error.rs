use std::fmt::Display;

use crate::graph::{ComponentId, ComponentKind, EndpointId, PortId};

/// Everything a graph operation can reject. All of these are expected,
/// user-triggerable conditions: an `Err` means no registry or DAG state was
/// mutated and the caller may simply try a different action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CircuitError {
    /// A referenced id is absent from its registry.
    NotFound(String),
    /// The port already has a wire endpoint docked to it.
    PortOccupied(PortId),
    /// The wire endpoint is already docked to a port; it must be freed
    /// (by deleting its wire) before it can dock elsewhere.
    EndpointOccupied(EndpointId),
    /// The wire already feeds an input port; a second input end is invalid.
    DuplicateInput(PortId),
    /// The wire already has a source port; a second output end is invalid.
    DuplicateOutput(PortId),
    /// A junction port whose role is still unresolved cannot take this wire:
    /// a junction can neither anchor an isolated wire nor emit before it has
    /// an input.
    JunctionUnresolved(PortId),
    /// Docking would close a cycle in the logic graph.
    CycleRejected {
        from: ComponentId,
        to: ComponentId,
    },
    /// The component kind has no template and cannot be placed.
    InvalidType(ComponentKind),
    /// The component is not an INPUT switch and cannot be toggled.
    NotAnInput(ComponentId),
}

impl CircuitError {
    pub(crate) fn not_found(id: impl Display) -> Self {
        Self::NotFound(id.to_string())
    }
}

impl Display for CircuitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "{id} does not exist"),
            Self::PortOccupied(port) => write!(f, "port {port} is already connected"),
            Self::EndpointOccupied(endpoint) => {
                write!(f, "wire endpoint {endpoint} is already docked")
            }
            Self::DuplicateInput(port) => {
                write!(f, "wire already has an input end, cannot dock at {port}")
            }
            Self::DuplicateOutput(port) => {
                write!(f, "wire already has an output end, cannot dock at {port}")
            }
            Self::JunctionUnresolved(port) => {
                write!(f, "junction port {port} has no resolved direction yet")
            }
            Self::CycleRejected { from, to } => {
                write!(f, "connecting {from} to {to} would form a cycle")
            }
            Self::InvalidType(kind) => write!(f, "{kind} has no template"),
            Self::NotAnInput(id) => write!(f, "{id} is not an input switch"),
        }
    }
}

impl std::error::Error for CircuitError {}
