use std::collections::HashMap;
use std::fmt::Display;

use egui::Pos2;

use crate::dag::{LogicDag, Signal};
use crate::error::CircuitError;
use crate::templates::{self, PortDirection, WIRE_ENDPOINT_OFFSETS};

/// Every placeable kind. `Wire` is the pseudo-kind accepted by
/// [`CircuitGraph::add_component`] that spawns a wire record instead of a
/// component; NAND/NOR/XOR/XNOR are reserved and cannot be placed yet.
#[derive(
    serde::Deserialize, serde::Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
pub enum ComponentKind {
    Input,
    Output,
    And,
    Or,
    Not,
    Nand,
    Nor,
    Xor,
    Xnor,
    Junction,
    Wire,
}

impl ComponentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Input => "INPUT",
            Self::Output => "OUTPUT",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Not => "NOT",
            Self::Nand => "NAND",
            Self::Nor => "NOR",
            Self::Xor => "XOR",
            Self::Xnor => "XNOR",
            Self::Junction => "JUNCTION",
            Self::Wire => "WIRE",
        }
    }
}

impl Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured component id: kind plus a 1-based per-kind running index.
/// Indices are monotonic and never reused, even after deletion.
#[derive(
    serde::Deserialize, serde::Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
pub struct ComponentId {
    pub kind: ComponentKind,
    pub index: u32,
}

impl ComponentId {
    pub fn new(kind: ComponentKind, index: u32) -> Self {
        Self { kind, index }
    }
}

impl Display for ComponentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.kind, self.index)
    }
}

/// A specific port on a component, addressed by template pin index. Pin 0 is
/// the letter A, pin 1 is B, and so on.
#[derive(
    serde::Deserialize, serde::Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
pub struct PortId {
    pub component: ComponentId,
    pub pin: u8,
}

impl PortId {
    pub fn new(component: ComponentId, pin: u8) -> Self {
        Self { component, pin }
    }

    pub fn letter(self) -> char {
        (b'A' + self.pin) as char
    }
}

impl Display for PortId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}${}", self.component, self.letter())
    }
}

#[derive(
    serde::Deserialize, serde::Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
pub enum WireEnd {
    A,
    B,
}

/// One end of a wire; lifecycle tied 1:1 to the owning wire.
#[derive(
    serde::Deserialize, serde::Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
pub struct EndpointId {
    pub wire: ComponentId,
    pub end: WireEnd,
}

impl Display for EndpointId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let end = match self.end {
            WireEnd::A => 'A',
            WireEnd::B => 'B',
        };
        write!(f, "{}${end}", self.wire)
    }
}

#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, PartialEq)]
pub struct Component {
    pub id: ComponentId,
    pub kind: ComponentKind,
    pub pos: Pos2,
    pub selected: bool,
    pub ports: Vec<PortId>,
    pub value: Signal,
}

/// Connection point on a component. `endpoints` is kept as a list, but the
/// connection rules enforce at most one docked endpoint per port.
#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, PartialEq)]
pub struct Port {
    pub id: PortId,
    pub parent: ComponentId,
    pub pos: Pos2,
    pub direction: PortDirection,
    pub connected: bool,
    pub endpoints: Vec<EndpointId>,
}

/// A two-ended edge candidate. A wire with both ends undocked is a dangling
/// visual object; it becomes logically meaningful only once `connected_from`
/// and `connected_to` are both set.
#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, Copy, PartialEq)]
pub struct Wire {
    pub id: ComponentId,
    pub selected: bool,
    pub connected_from: Option<PortId>,
    pub connected_to: Option<PortId>,
}

impl Wire {
    pub fn endpoint_ids(&self) -> [EndpointId; 2] {
        [
            EndpointId {
                wire: self.id,
                end: WireEnd::A,
            },
            EndpointId {
                wire: self.id,
                end: WireEnd::B,
            },
        ]
    }
}

#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, Copy, PartialEq)]
pub struct WireEndpoint {
    pub id: EndpointId,
    pub pos: Pos2,
    pub connected_to_port: bool,
}

/// Aggregate root over all circuit state: flat id-keyed registries of
/// components, ports, wires and wire endpoints, plus the logic DAG that
/// mirrors the logical (not geometric) topology. All cross-references are id
/// lookups; the DAG is mutated only through connection and deletion
/// operations and never sees geometry.
#[derive(Default, serde::Deserialize, serde::Serialize, Debug, Clone)]
pub struct CircuitGraph {
    components: HashMap<ComponentId, Component>,
    ports: HashMap<PortId, Port>,
    wires: HashMap<ComponentId, Wire>,
    endpoints: HashMap<EndpointId, WireEndpoint>,
    next_index: HashMap<ComponentKind, u32>,
    selected_components: Vec<ComponentId>,
    selected_wires: Vec<ComponentId>,
    output_ids: Vec<ComponentId>,
    dag: LogicDag,
}

impl CircuitGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&mut self, kind: ComponentKind) -> ComponentId {
        let counter = self.next_index.entry(kind).or_insert(0);
        *counter += 1;
        ComponentId::new(kind, *counter)
    }

    /// Place a new component (or, for the `Wire` pseudo-kind, a wire with
    /// two undocked endpoints) at `pos`. Every non-wire kind also gets a DAG
    /// node; inputs start driven low, everything else undefined.
    pub fn add_component(
        &mut self,
        pos: Pos2,
        kind: ComponentKind,
    ) -> Result<ComponentId, CircuitError> {
        let template = templates::template(kind).ok_or(CircuitError::InvalidType(kind))?;
        let id = self.allocate_id(kind);

        if kind == ComponentKind::Wire {
            self.wires.insert(
                id,
                Wire {
                    id,
                    selected: false,
                    connected_from: None,
                    connected_to: None,
                },
            );
            for (end, offset) in [
                (WireEnd::A, WIRE_ENDPOINT_OFFSETS[0]),
                (WireEnd::B, WIRE_ENDPOINT_OFFSETS[1]),
            ] {
                let endpoint_id = EndpointId { wire: id, end };
                self.endpoints.insert(
                    endpoint_id,
                    WireEndpoint {
                        id: endpoint_id,
                        pos: pos + offset,
                        connected_to_port: false,
                    },
                );
            }
            log::debug!("added {id}");
            return Ok(id);
        }

        let mut ports = Vec::with_capacity(template.pins.len());
        for (pin_index, pin) in template.pins.iter().enumerate() {
            let port_id = PortId::new(id, pin_index as u8);
            ports.push(port_id);
            self.ports.insert(
                port_id,
                Port {
                    id: port_id,
                    parent: id,
                    pos: pos + pin.offset,
                    direction: pin.direction,
                    connected: false,
                    endpoints: Vec::new(),
                },
            );
        }

        let value = if kind == ComponentKind::Input {
            Signal::Low
        } else {
            Signal::X
        };
        self.components.insert(
            id,
            Component {
                id,
                kind,
                pos,
                selected: false,
                ports,
                value,
            },
        );
        self.dag.add_node(id, kind);
        if kind == ComponentKind::Output {
            self.output_ids.push(id);
        }

        log::debug!("added {id}");
        Ok(id)
    }

    /// Drag-end position update: rewrite the stored position and recompute
    /// every owned port from the template offsets. Pure geometry.
    pub fn move_component(&mut self, id: ComponentId, pos: Pos2) -> Result<(), CircuitError> {
        let component = self
            .components
            .get_mut(&id)
            .ok_or_else(|| CircuitError::not_found(id))?;
        component.pos = pos;
        let kind = component.kind;
        let port_ids = component.ports.clone();

        let template = templates::template(kind).expect("placed component has a template");
        for port_id in port_ids {
            let port = self
                .ports
                .get_mut(&port_id)
                .expect("component ports exist in the port registry");
            port.pos = pos + template.pins[port_id.pin as usize].offset;
        }
        Ok(())
    }

    /// Live-drag variant: recompute the positions of the connected ports
    /// from the in-flight position and drag their docked wire endpoints
    /// along, so wires stay glued to the component without waiting for drag
    /// end. Unconnected ports are left alone; [`Self::move_component`]
    /// rewrites everything at drag end. No DAG effect.
    pub fn move_component_and_propagate(
        &mut self,
        id: ComponentId,
        pos: Pos2,
    ) -> Result<(), CircuitError> {
        let component = self
            .components
            .get(&id)
            .ok_or_else(|| CircuitError::not_found(id))?;
        let kind = component.kind;
        let port_ids = component.ports.clone();

        let template = templates::template(kind).expect("placed component has a template");
        for port_id in port_ids {
            let new_pos = pos + template.pins[port_id.pin as usize].offset;
            let docked = {
                let port = self
                    .ports
                    .get_mut(&port_id)
                    .expect("component ports exist in the port registry");
                if !port.connected {
                    continue;
                }
                port.pos = new_pos;
                port.endpoints.clone()
            };
            for endpoint_id in docked {
                if let Some(endpoint) = self.endpoints.get_mut(&endpoint_id) {
                    endpoint.pos = new_pos;
                }
            }
        }
        Ok(())
    }

    /// Geometry-only endpoint drag.
    pub fn move_wire_endpoint(
        &mut self,
        id: EndpointId,
        pos: Pos2,
    ) -> Result<(), CircuitError> {
        let endpoint = self
            .endpoints
            .get_mut(&id)
            .ok_or_else(|| CircuitError::not_found(id))?;
        endpoint.pos = pos;
        Ok(())
    }

    /// Dock a wire endpoint onto a port. This is the single place where
    /// topology legality is enforced; on any `Err` no registry or DAG state
    /// has changed. Order of checks: existence, single occupancy (of both
    /// the port and the endpoint), junction polarity, directional
    /// exclusivity, then the DAG cycle guard, and only after all of those
    /// the docking state is committed.
    pub fn connect_wire_endpoint(
        &mut self,
        port_id: PortId,
        endpoint_id: EndpointId,
    ) -> Result<(), CircuitError> {
        let port = self
            .ports
            .get(&port_id)
            .ok_or_else(|| CircuitError::not_found(port_id))?;
        let endpoint = self
            .endpoints
            .get(&endpoint_id)
            .ok_or_else(|| CircuitError::not_found(endpoint_id))?;
        let wire = self
            .wires
            .get(&endpoint_id.wire)
            .ok_or_else(|| CircuitError::not_found(endpoint_id.wire))?;
        let component = self
            .components
            .get(&port.parent)
            .ok_or_else(|| CircuitError::not_found(port.parent))?;

        if port.connected {
            return Err(CircuitError::PortOccupied(port_id));
        }
        // An endpoint docks exactly once; moving it to another port requires
        // freeing it first. Without this check a dragged-but-still-docked
        // endpoint would end up registered at two ports.
        if endpoint.connected_to_port {
            return Err(CircuitError::EndpointOccupied(endpoint_id));
        }

        let has_source = wire.connected_from.is_some();
        let has_sink = wire.connected_to.is_some();

        // Junction polarity resolution. Junction ports start out
        // directionless (Both) and are pinned by the first wire that reaches
        // the junction: the docked port becomes the single input, every
        // other port broadcasts as an output.
        let mut direction = port.direction;
        let mut pin_junction_ports = false;
        if component.kind == ComponentKind::Junction {
            if direction == PortDirection::Both && !has_source && !has_sink {
                // a junction cannot be the first anchor of an isolated wire
                return Err(CircuitError::JunctionUnresolved(port_id));
            }
            if has_source && direction != PortDirection::Both {
                // would route a second source into the junction
                return Err(CircuitError::DuplicateOutput(port_id));
            }
            if has_sink && direction == PortDirection::Both {
                // a junction cannot emit before it has an input
                return Err(CircuitError::JunctionUnresolved(port_id));
            }
            if has_source {
                direction = PortDirection::Input;
                pin_junction_ports = true;
            } else if has_sink {
                direction = PortDirection::Output;
            }
        }

        let docks_as_input = match direction {
            PortDirection::Input => true,
            PortDirection::Output => false,
            PortDirection::Both => return Err(CircuitError::JunctionUnresolved(port_id)),
        };

        // Directional exclusivity: a wire has at most one end per role.
        if docks_as_input && has_sink {
            return Err(CircuitError::DuplicateInput(port_id));
        }
        if !docks_as_input && has_source {
            return Err(CircuitError::DuplicateOutput(port_id));
        }

        // If the other end is already anchored the wire becomes fully
        // resolved and contributes a logic edge. The cycle guard runs here,
        // before any docking state is committed, so rejection is atomic.
        let dag_edge = if docks_as_input {
            match wire.connected_from {
                Some(source_port) => {
                    let source = self
                        .ports
                        .get(&source_port)
                        .ok_or_else(|| CircuitError::not_found(source_port))?;
                    Some((source.parent, port.parent))
                }
                None => None,
            }
        } else {
            match wire.connected_to {
                Some(sink_port) => {
                    let sink = self
                        .ports
                        .get(&sink_port)
                        .ok_or_else(|| CircuitError::not_found(sink_port))?;
                    Some((port.parent, sink.parent))
                }
                None => None,
            }
        };

        let junction_ports = component.ports.clone();
        let wire_id = endpoint_id.wire;

        if let Some((from, to)) = dag_edge {
            self.dag.add_edge(from, to)?;
        }

        // Commit.
        if pin_junction_ports {
            for sibling in &junction_ports {
                let sibling_port = self
                    .ports
                    .get_mut(sibling)
                    .expect("component ports exist in the port registry");
                sibling_port.direction = if *sibling == port_id {
                    PortDirection::Input
                } else {
                    PortDirection::Output
                };
            }
        } else if direction != port.direction {
            // lone sink-side pinning of a junction port
            self.ports
                .get_mut(&port_id)
                .expect("port checked above")
                .direction = direction;
        }

        let port_pos = {
            let port = self.ports.get_mut(&port_id).expect("port checked above");
            port.connected = true;
            port.endpoints.push(endpoint_id);
            port.pos
        };
        {
            let wire = self.wires.get_mut(&wire_id).expect("wire checked above");
            if docks_as_input {
                wire.connected_to = Some(port_id);
            } else {
                wire.connected_from = Some(port_id);
            }
        }
        {
            let endpoint = self
                .endpoints
                .get_mut(&endpoint_id)
                .expect("endpoint checked above");
            endpoint.pos = port_pos;
            endpoint.connected_to_port = true;
        }

        log::debug!("docked {endpoint_id} onto {port_id}");
        if dag_edge.is_some() {
            self.reevaluate();
        }
        Ok(())
    }

    /// Delete a wire, undocking both ends. Removes the matching logic edge
    /// and re-evaluates when the wire had both a source and a sink.
    pub fn delete_wire(&mut self, id: ComponentId) -> Result<(), CircuitError> {
        let wire = self
            .wires
            .get(&id)
            .ok_or_else(|| CircuitError::not_found(id))?;
        let from_port = wire.connected_from;
        let to_port = wire.connected_to;
        let endpoint_ids = wire.endpoint_ids();

        let dag_edge = match (from_port, to_port) {
            (Some(from), Some(to)) => {
                let from_component = self
                    .ports
                    .get(&from)
                    .ok_or_else(|| CircuitError::not_found(from))?
                    .parent;
                let to_component = self
                    .ports
                    .get(&to)
                    .ok_or_else(|| CircuitError::not_found(to))?
                    .parent;
                Some((from_component, to_component))
            }
            _ => None,
        };

        if let Some((from, to)) = dag_edge {
            self.dag.remove_edge(from, to)?;
        }

        for port_id in [from_port, to_port].into_iter().flatten() {
            if let Some(port) = self.ports.get_mut(&port_id) {
                port.connected = false;
                port.endpoints.retain(|e| e.wire != id);
            }
        }
        for endpoint_id in endpoint_ids {
            self.endpoints.remove(&endpoint_id);
        }
        self.wires.remove(&id);
        self.selected_wires.retain(|w| *w != id);

        log::debug!("deleted {id}");
        if dag_edge.is_some() {
            self.reevaluate();
        }
        Ok(())
    }

    /// Delete a component: undock every attached wire end, drop the owned
    /// ports, remove the DAG node (cascading edge removal) and re-evaluate.
    pub fn delete_component(&mut self, id: ComponentId) -> Result<(), CircuitError> {
        let component = self
            .components
            .get(&id)
            .ok_or_else(|| CircuitError::not_found(id))?;
        let port_ids = component.ports.clone();

        for port_id in port_ids {
            let docked = self
                .ports
                .get(&port_id)
                .map(|p| p.endpoints.clone())
                .unwrap_or_default();
            for endpoint_id in docked {
                if let Some(wire) = self.wires.get_mut(&endpoint_id.wire) {
                    if wire.connected_from == Some(port_id) {
                        wire.connected_from = None;
                    }
                    if wire.connected_to == Some(port_id) {
                        wire.connected_to = None;
                    }
                }
                if let Some(endpoint) = self.endpoints.get_mut(&endpoint_id) {
                    endpoint.connected_to_port = false;
                }
            }
            self.ports.remove(&port_id);
        }

        self.components.remove(&id);
        self.selected_components.retain(|c| *c != id);
        self.output_ids.retain(|o| *o != id);
        self.dag.remove_node(id)?;

        log::debug!("deleted {id}");
        self.reevaluate();
        Ok(())
    }

    /// Toggle an INPUT switch and propagate.
    pub fn toggle_input(&mut self, id: ComponentId) -> Result<(), CircuitError> {
        let component = self
            .components
            .get_mut(&id)
            .ok_or_else(|| CircuitError::not_found(id))?;
        if component.kind != ComponentKind::Input {
            return Err(CircuitError::NotAnInput(id));
        }
        component.value = component.value.toggled();
        let value = component.value;
        self.dag.set_value(id, value)?;
        self.reevaluate();
        Ok(())
    }

    pub fn toggle_component_selected(&mut self, id: ComponentId) -> Result<(), CircuitError> {
        let component = self
            .components
            .get_mut(&id)
            .ok_or_else(|| CircuitError::not_found(id))?;
        component.selected = !component.selected;
        if component.selected {
            self.selected_components.push(id);
        } else {
            self.selected_components.retain(|c| *c != id);
        }
        Ok(())
    }

    pub fn toggle_wire_selected(&mut self, id: ComponentId) -> Result<(), CircuitError> {
        let wire = self
            .wires
            .get_mut(&id)
            .ok_or_else(|| CircuitError::not_found(id))?;
        wire.selected = !wire.selected;
        if wire.selected {
            self.selected_wires.push(id);
        } else {
            self.selected_wires.retain(|w| *w != id);
        }
        Ok(())
    }

    /// Batched delete of everything currently selected. Each entity goes
    /// through its single-entity delete, so each one independently updates
    /// the DAG; k re-evaluations for k selected entities is accepted at
    /// interactive scale.
    pub fn delete_selected_components(&mut self) -> Result<(), CircuitError> {
        for id in std::mem::take(&mut self.selected_components) {
            self.delete_component(id)?;
        }
        Ok(())
    }

    pub fn delete_selected_wires(&mut self) -> Result<(), CircuitError> {
        for id in std::mem::take(&mut self.selected_wires) {
            self.delete_wire(id)?;
        }
        Ok(())
    }

    // Snapshot accessors: owned copies, never live aliases, so the caller
    // can diff against previous render state.

    pub fn components(&self) -> Vec<Component> {
        self.components.values().cloned().collect()
    }

    pub fn ports(&self) -> Vec<Port> {
        self.ports.values().cloned().collect()
    }

    pub fn wires(&self) -> Vec<Wire> {
        self.wires.values().copied().collect()
    }

    pub fn wire_endpoints(&self) -> Vec<WireEndpoint> {
        self.endpoints.values().copied().collect()
    }

    pub fn component(&self, id: ComponentId) -> Option<&Component> {
        self.components.get(&id)
    }

    pub fn port(&self, id: PortId) -> Option<&Port> {
        self.ports.get(&id)
    }

    pub fn wire(&self, id: ComponentId) -> Option<&Wire> {
        self.wires.get(&id)
    }

    pub fn wire_endpoint(&self, id: EndpointId) -> Option<&WireEndpoint> {
        self.endpoints.get(&id)
    }

    pub fn node_value(&self, id: ComponentId) -> Result<Signal, CircuitError> {
        self.dag.value(id)
    }

    pub fn dag(&self) -> &LogicDag {
        &self.dag
    }

    /// Full, eager re-evaluation after a logical-topology change or input
    /// toggle. Skipped entirely while nothing observes the result; after a
    /// pass every node's value is copied back onto its component record.
    fn reevaluate(&mut self) {
        if self.output_ids.is_empty() {
            return;
        }
        self.dag.evaluate();
        for (id, component) in &mut self.components {
            if let Ok(value) = self.dag.value(*id) {
                component.value = value;
            }
        }
    }
}
