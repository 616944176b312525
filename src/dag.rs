use std::collections::{HashMap, HashSet, VecDeque};

use crate::error::CircuitError;
use crate::graph::{ComponentId, ComponentKind};

/// Tri-state signal value. `X` means undefined: the node has not been driven
/// yet or one of its required inputs is missing.
#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Low,
    High,
    X,
}

impl Default for Signal {
    fn default() -> Self {
        Self::X
    }
}

impl Signal {
    pub fn from_bool(value: bool) -> Self {
        if value { Self::High } else { Self::Low }
    }

    pub fn as_bool(self) -> Option<bool> {
        match self {
            Self::Low => Some(false),
            Self::High => Some(true),
            Self::X => None,
        }
    }

    pub fn is_high(self) -> bool {
        self == Self::High
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::High => Self::Low,
            Self::Low | Self::X => Self::High,
        }
    }

    fn not(self) -> Self {
        match self {
            Self::Low => Self::High,
            Self::High => Self::Low,
            Self::X => Self::X,
        }
    }

    // Undefined propagates strictly: an X operand always yields X, even
    // where short-circuit evaluation could decide the result.
    fn and(self, other: Self) -> Self {
        match (self, other) {
            (Self::X, _) | (_, Self::X) => Self::X,
            (Self::High, Self::High) => Self::High,
            _ => Self::Low,
        }
    }

    fn or(self, other: Self) -> Self {
        match (self, other) {
            (Self::X, _) | (_, Self::X) => Self::X,
            (Self::Low, Self::Low) => Self::Low,
            _ => Self::High,
        }
    }
}

/// Logical mirror of an evaluated component. Adjacency is kept as ordered
/// lists; a parent may legitimately appear twice when one source feeds both
/// inputs of a gate.
#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, PartialEq, Eq)]
pub struct DagNode {
    pub id: ComponentId,
    pub kind: ComponentKind,
    pub value: Signal,
    pub parents: Vec<ComponentId>,
    pub children: Vec<ComponentId>,
}

/// The evaluation engine: a directed acyclic graph of component nodes with
/// per-node dependency counts. Edges are inserted only after a reachability
/// check, so the node set is acyclic at all times.
#[derive(Default, serde::Deserialize, serde::Serialize, Debug, Clone)]
pub struct LogicDag {
    nodes: HashMap<ComponentId, DagNode>,
    dependencies: HashMap<ComponentId, usize>,
}

impl LogicDag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: ComponentId) -> Option<&DagNode> {
        self.nodes.get(&id)
    }

    pub fn add_node(&mut self, id: ComponentId, kind: ComponentKind) {
        let value = if kind == ComponentKind::Input {
            Signal::Low
        } else {
            Signal::X
        };
        let previous = self.nodes.insert(
            id,
            DagNode {
                id,
                kind,
                value,
                parents: Vec::new(),
                children: Vec::new(),
            },
        );
        debug_assert!(previous.is_none(), "dag node {id} inserted twice");
        self.dependencies.insert(id, 0);
    }

    /// Insert the edge `from -> to`. Self edges and edges that would close a
    /// cycle are rejected before any state changes.
    pub fn add_edge(&mut self, from: ComponentId, to: ComponentId) -> Result<(), CircuitError> {
        if from == to {
            return Err(CircuitError::CycleRejected { from, to });
        }
        if !self.nodes.contains_key(&from) {
            return Err(CircuitError::not_found(from));
        }
        if !self.nodes.contains_key(&to) {
            return Err(CircuitError::not_found(to));
        }
        if self.would_cycle(from, to) {
            return Err(CircuitError::CycleRejected { from, to });
        }

        self.nodes
            .get_mut(&from)
            .expect("from node checked above")
            .children
            .push(to);
        self.nodes
            .get_mut(&to)
            .expect("to node checked above")
            .parents
            .push(from);
        *self
            .dependencies
            .get_mut(&to)
            .expect("dependency entry exists for every node") += 1;

        log::debug!("dag edge added: {from} -> {to}");
        Ok(())
    }

    /// Remove one occurrence of the edge `from -> to`.
    pub fn remove_edge(&mut self, from: ComponentId, to: ComponentId) -> Result<(), CircuitError> {
        if !self.nodes.contains_key(&to) {
            return Err(CircuitError::not_found(to));
        }
        let from_node = self
            .nodes
            .get_mut(&from)
            .ok_or_else(|| CircuitError::not_found(from))?;
        let Some(child_idx) = from_node.children.iter().position(|c| *c == to) else {
            log::warn!("asked to remove nonexistent edge {from} -> {to}");
            return Ok(());
        };
        from_node.children.remove(child_idx);

        let to_node = self.nodes.get_mut(&to).expect("to node checked above");
        if let Some(parent_idx) = to_node.parents.iter().position(|p| *p == from) {
            to_node.parents.remove(parent_idx);
        }

        let count = self
            .dependencies
            .get_mut(&to)
            .expect("dependency entry exists for every node");
        *count = count.saturating_sub(1);
        Ok(())
    }

    /// Remove a node and every edge incident to it.
    pub fn remove_node(&mut self, id: ComponentId) -> Result<(), CircuitError> {
        let node = self
            .nodes
            .get(&id)
            .ok_or_else(|| CircuitError::not_found(id))?;
        let children = node.children.clone();
        let parents = node.parents.clone();

        for child in children {
            self.remove_edge(id, child)?;
        }
        for parent in parents {
            self.remove_edge(parent, id)?;
        }

        self.nodes.remove(&id);
        self.dependencies.remove(&id);
        Ok(())
    }

    pub fn value(&self, id: ComponentId) -> Result<Signal, CircuitError> {
        self.nodes
            .get(&id)
            .map(|n| n.value)
            .ok_or_else(|| CircuitError::not_found(id))
    }

    pub fn set_value(&mut self, id: ComponentId, value: Signal) -> Result<(), CircuitError> {
        self.nodes
            .get_mut(&id)
            .map(|n| n.value = value)
            .ok_or_else(|| CircuitError::not_found(id))
    }

    /// Would inserting `from -> to` close a cycle? Depth-first reachability
    /// from `to` over children edges, looking for `from`.
    fn would_cycle(&self, from: ComponentId, to: ComponentId) -> bool {
        let mut visited: HashSet<ComponentId> = HashSet::new();
        let mut stack = vec![to];

        while let Some(current) = stack.pop() {
            if current == from {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            if let Some(node) = self.nodes.get(&current) {
                stack.extend(node.children.iter().copied());
            }
        }
        false
    }

    /// Kahn's algorithm over a scratch copy of the dependency counts.
    ///
    /// Panics when the ordering does not cover every node: that means a
    /// cycle slipped past the insertion-time guard, which is a bug in this
    /// module rather than a recoverable condition.
    fn topological_order(&self) -> Vec<ComponentId> {
        let mut dependencies = self.dependencies.clone();
        let mut queue: VecDeque<ComponentId> = dependencies
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(id, _)| *id)
            .collect();
        let mut ordered = Vec::with_capacity(self.nodes.len());

        while let Some(id) = queue.pop_front() {
            ordered.push(id);
            let node = self.nodes.get(&id).expect("ordered node missing from dag");
            for child in &node.children {
                let count = dependencies
                    .get_mut(child)
                    .expect("dependency entry exists for every node");
                *count -= 1;
                if *count == 0 {
                    queue.push_back(*child);
                }
            }
        }

        assert_eq!(
            ordered.len(),
            self.nodes.len(),
            "topological ordering covered {} of {} nodes, the cycle guard was bypassed",
            ordered.len(),
            self.nodes.len(),
        );
        ordered
    }

    /// One full dependency-ordered pass over the node set. Every parent is
    /// evaluated before its children, so each rule only reads settled values.
    pub fn evaluate(&mut self) {
        log::debug!("evaluating logic dag ({} nodes)", self.nodes.len());

        for id in self.topological_order() {
            let new_value = {
                let node = self.nodes.get(&id).expect("ordered node missing from dag");
                self.evaluate_node(node)
            };
            if let Some(value) = new_value {
                self.nodes
                    .get_mut(&id)
                    .expect("ordered node missing from dag")
                    .value = value;
                log::debug!("{id} -> {value:?}");
            }
        }
    }

    fn evaluate_node(&self, node: &DagNode) -> Option<Signal> {
        match node.kind {
            ComponentKind::And => Some(self.binary(node, Signal::and)),
            ComponentKind::Or => Some(self.binary(node, Signal::or)),
            ComponentKind::Not => Some(self.unary(node).not()),
            ComponentKind::Output | ComponentKind::Junction => Some(self.unary(node)),
            // Inputs keep whatever the user last set; reserved gate kinds
            // have no evaluation rule yet and stay X.
            _ => None,
        }
    }

    fn binary(&self, node: &DagNode, op: fn(Signal, Signal) -> Signal) -> Signal {
        if node.parents.len() < 2 {
            return Signal::X;
        }
        let a = self.parent_value(node.parents[0]);
        let b = self.parent_value(node.parents[1]);
        op(a, b)
    }

    fn unary(&self, node: &DagNode) -> Signal {
        match node.parents.first() {
            Some(parent) => self.parent_value(*parent),
            None => Signal::X,
        }
    }

    fn parent_value(&self, id: ComponentId) -> Signal {
        self.nodes.get(&id).map(|n| n.value).unwrap_or(Signal::X)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(kind: ComponentKind, index: u32) -> ComponentId {
        ComponentId::new(kind, index)
    }

    fn dag_with(kinds: &[(ComponentKind, u32)]) -> LogicDag {
        let mut dag = LogicDag::new();
        for &(kind, index) in kinds {
            dag.add_node(id(kind, index), kind);
        }
        dag
    }

    #[test]
    fn input_feeds_output_through_pass_through() {
        let input = id(ComponentKind::Input, 1);
        let output = id(ComponentKind::Output, 1);
        let mut dag = dag_with(&[(ComponentKind::Input, 1), (ComponentKind::Output, 1)]);

        dag.add_edge(input, output).expect("edge is legal");
        dag.evaluate();
        assert_eq!(dag.value(output).expect("node exists"), Signal::Low);

        dag.set_value(input, Signal::High).expect("node exists");
        dag.evaluate();
        assert_eq!(dag.value(output).expect("node exists"), Signal::High);
    }

    #[test]
    fn and_gate_with_one_parent_is_undefined() {
        let input = id(ComponentKind::Input, 1);
        let and = id(ComponentKind::And, 1);
        let mut dag = dag_with(&[(ComponentKind::Input, 1), (ComponentKind::And, 1)]);

        dag.add_edge(input, and).expect("edge is legal");
        dag.evaluate();
        assert_eq!(dag.value(and).expect("node exists"), Signal::X);
    }

    #[test]
    fn undefined_parent_propagates_through_gates() {
        let input = id(ComponentKind::Input, 1);
        let not = id(ComponentKind::Not, 1);
        let and = id(ComponentKind::And, 1);
        let mut dag = dag_with(&[
            (ComponentKind::Input, 1),
            (ComponentKind::Not, 1),
            (ComponentKind::And, 1),
        ]);

        // NOT has no parent, so it stays X; the AND sees one real and one
        // undefined input and must stay X too.
        dag.add_edge(input, and).expect("edge is legal");
        dag.add_edge(not, and).expect("edge is legal");
        dag.set_value(input, Signal::High).expect("node exists");
        dag.evaluate();
        assert_eq!(dag.value(and).expect("node exists"), Signal::X);
    }

    #[test]
    fn and_or_not_truth_values() {
        let a = id(ComponentKind::Input, 1);
        let b = id(ComponentKind::Input, 2);
        let and = id(ComponentKind::And, 1);
        let or = id(ComponentKind::Or, 1);
        let not = id(ComponentKind::Not, 1);
        let mut dag = dag_with(&[
            (ComponentKind::Input, 1),
            (ComponentKind::Input, 2),
            (ComponentKind::And, 1),
            (ComponentKind::Or, 1),
            (ComponentKind::Not, 1),
        ]);
        dag.add_edge(a, and).expect("edge is legal");
        dag.add_edge(b, and).expect("edge is legal");
        dag.add_edge(a, or).expect("edge is legal");
        dag.add_edge(b, or).expect("edge is legal");
        dag.add_edge(a, not).expect("edge is legal");

        dag.set_value(a, Signal::High).expect("node exists");
        dag.set_value(b, Signal::Low).expect("node exists");
        dag.evaluate();
        assert_eq!(dag.value(and).expect("node exists"), Signal::Low);
        assert_eq!(dag.value(or).expect("node exists"), Signal::High);
        assert_eq!(dag.value(not).expect("node exists"), Signal::Low);

        dag.set_value(b, Signal::High).expect("node exists");
        dag.evaluate();
        assert_eq!(dag.value(and).expect("node exists"), Signal::High);
    }

    #[test]
    fn same_parent_may_feed_both_gate_inputs() {
        let input = id(ComponentKind::Input, 1);
        let and = id(ComponentKind::And, 1);
        let mut dag = dag_with(&[(ComponentKind::Input, 1), (ComponentKind::And, 1)]);

        dag.add_edge(input, and).expect("first edge is legal");
        dag.add_edge(input, and).expect("duplicate edge is legal");
        dag.set_value(input, Signal::High).expect("node exists");
        dag.evaluate();
        assert_eq!(dag.value(and).expect("node exists"), Signal::High);
    }

    #[test]
    fn self_edge_is_rejected() {
        let and = id(ComponentKind::And, 1);
        let mut dag = dag_with(&[(ComponentKind::And, 1)]);
        assert_eq!(
            dag.add_edge(and, and),
            Err(CircuitError::CycleRejected { from: and, to: and })
        );
    }

    #[test]
    fn cycle_is_rejected_and_adjacency_unchanged() {
        let a = id(ComponentKind::And, 1);
        let b = id(ComponentKind::Not, 1);
        let c = id(ComponentKind::Or, 1);
        let mut dag = dag_with(&[
            (ComponentKind::And, 1),
            (ComponentKind::Not, 1),
            (ComponentKind::Or, 1),
        ]);
        dag.add_edge(a, b).expect("edge is legal");
        dag.add_edge(b, c).expect("edge is legal");

        let before = dag.clone();
        assert_eq!(
            dag.add_edge(c, a),
            Err(CircuitError::CycleRejected { from: c, to: a })
        );
        assert_eq!(dag.node(a), before.node(a));
        assert_eq!(dag.node(b), before.node(b));
        assert_eq!(dag.node(c), before.node(c));

        // the graph still evaluates
        dag.evaluate();
    }

    #[test]
    fn remove_node_cascades_edges() {
        let input = id(ComponentKind::Input, 1);
        let not = id(ComponentKind::Not, 1);
        let output = id(ComponentKind::Output, 1);
        let mut dag = dag_with(&[
            (ComponentKind::Input, 1),
            (ComponentKind::Not, 1),
            (ComponentKind::Output, 1),
        ]);
        dag.add_edge(input, not).expect("edge is legal");
        dag.add_edge(not, output).expect("edge is legal");

        dag.remove_node(not).expect("node exists");

        assert!(dag.node(not).is_none());
        assert!(dag.node(input).expect("node exists").children.is_empty());
        assert!(dag.node(output).expect("node exists").parents.is_empty());

        dag.evaluate();
        assert_eq!(dag.value(output).expect("node exists"), Signal::X);
    }

    #[test]
    fn reserved_kinds_stay_undefined() {
        let input = id(ComponentKind::Input, 1);
        let nand = id(ComponentKind::Nand, 1);
        let mut dag = dag_with(&[(ComponentKind::Input, 1), (ComponentKind::Nand, 1)]);
        dag.add_edge(input, nand).expect("edge is legal");
        dag.add_edge(input, nand).expect("edge is legal");
        dag.set_value(input, Signal::High).expect("node exists");
        dag.evaluate();
        assert_eq!(dag.value(nand).expect("node exists"), Signal::X);
    }
}
