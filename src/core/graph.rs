// This module implements the mutable IR graph that assemblers, builders and passes operate on.
// Nodes live in a single vector indexed by NodeId; deleted nodes stay in place as tombstones so
// ids never move while a graph is being edited, and the encoder compacts them away when the
// graph is frozen. Every NodeId carries the id of the graph that created it, which lets every
// entry point reject nodes from another graph immediately. Control edges are kept in both
// directions (successor slots and a predecessor link) and are only changed through methods
// that keep the two consistent. Data usages are recomputed by scanning, which keeps the
// representation simple for the small graphs replacements produce. The editing helpers at the
// bottom (replace_at_usages, kill_cfg, merge collapsing, dead floating sweeps) are what the
// cleanup passes are built from.

//! Mutable IR graph.

use super::definition::{DefinitionId, ValueKind};
use super::node::{Constant, GraphId, Node, NodeId, NodeKind};
use super::options::Options;
use super::position::SourcePosition;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_GRAPH_ID: AtomicU32 = AtomicU32::new(1);

/// A mutable graph owned by a single compilation task.
pub struct Graph {
    id: GraphId,
    nodes: Vec<Node>,
    options: Options,
    track_positions: bool,
    definition: Option<DefinitionId>,
}

impl Graph {
    /// Create a graph containing only its start node.
    pub fn new(options: Options, track_positions: bool) -> Self {
        let mut graph = Self {
            id: GraphId(NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed)),
            nodes: Vec::new(),
            options,
            track_positions,
            definition: None,
        };
        graph.push_raw(NodeKind::Start, ValueKind::Void, None);
        graph
    }

    /// Create a graph for the body of `definition`.
    pub fn for_definition(definition: DefinitionId, options: Options, track_positions: bool) -> Self {
        let mut graph = Self::new(options, track_positions);
        graph.definition = Some(definition);
        graph
    }

    pub fn id(&self) -> GraphId {
        self.id
    }

    pub fn start(&self) -> NodeId {
        self.id_at(0)
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn tracks_positions(&self) -> bool {
        self.track_positions
    }

    pub fn definition(&self) -> Option<&DefinitionId> {
        self.definition.as_ref()
    }

    fn id_at(&self, index: usize) -> NodeId {
        NodeId {
            graph: self.id,
            index: index as u32,
        }
    }

    fn check_owned(&self, id: NodeId) {
        assert!(
            id.graph == self.id,
            "node {id} belongs to graph {:?}, not {:?}",
            id.graph,
            self.id
        );
        assert!(id.index() < self.nodes.len(), "node {id} is out of range");
    }

    /// Whether `id` is a live node of this graph.
    pub fn contains(&self, id: NodeId) -> bool {
        id.graph == self.id && id.index() < self.nodes.len() && !self.nodes[id.index()].deleted
    }

    pub fn node(&self, id: NodeId) -> &Node {
        self.check_owned(id);
        let node = &self.nodes[id.index()];
        assert!(!node.deleted, "node {id} was deleted");
        node
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.check_owned(id);
        let node = &mut self.nodes[id.index()];
        assert!(!node.deleted, "node {id} was deleted");
        node
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.node(id).kind
    }

    pub fn value_kind(&self, id: NodeId) -> ValueKind {
        self.node(id).value_kind
    }

    pub fn inputs(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).inputs
    }

    pub fn predecessor(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).predecessor
    }

    pub fn successors(&self, id: NodeId) -> Vec<NodeId> {
        self.node(id).successors().collect()
    }

    pub fn constant_value(&self, id: NodeId) -> Option<Constant> {
        self.kind(id).as_constant()
    }

    // ------------------------------------------------------------------
    // Node creation
    // ------------------------------------------------------------------

    /// Push a node without validation. Positions are dropped unless the
    /// graph tracks them.
    pub(crate) fn push_raw(
        &mut self,
        kind: NodeKind,
        value_kind: ValueKind,
        position: Option<SourcePosition>,
    ) -> NodeId {
        let mut node = Node::new(kind, value_kind);
        if self.track_positions {
            node.position = position;
        }
        let id = self.id_at(self.nodes.len());
        self.nodes.push(node);
        id
    }

    pub(crate) fn set_inputs_raw(&mut self, id: NodeId, inputs: Vec<NodeId>) {
        self.node_mut(id).inputs = inputs;
    }

    /// Create an unattached node.
    pub fn add(&mut self, kind: NodeKind, value_kind: ValueKind, inputs: &[NodeId]) -> NodeId {
        self.add_at(kind, value_kind, inputs, None)
    }

    /// Create an unattached node tagged with `position`.
    pub fn add_at(
        &mut self,
        kind: NodeKind,
        value_kind: ValueKind,
        inputs: &[NodeId],
        position: Option<SourcePosition>,
    ) -> NodeId {
        assert!(
            !matches!(kind, NodeKind::Start),
            "a graph has exactly one start node"
        );
        for &input in inputs {
            self.check_owned(input);
            assert!(self.contains(input), "input {input} was deleted");
        }
        self.check_shape(&kind, value_kind, inputs);
        let id = self.push_raw(kind, value_kind, position);
        self.set_inputs_raw(id, inputs.to_vec());
        id
    }

    fn check_shape(&self, kind: &NodeKind, value_kind: ValueKind, inputs: &[NodeId]) {
        match kind {
            NodeKind::If { probability } => {
                assert!(
                    (0.0..=1.0).contains(probability),
                    "branch probability {probability} outside [0, 1]"
                );
                assert_eq!(inputs.len(), 1, "if takes exactly one condition");
                assert_eq!(
                    self.value_kind(inputs[0]),
                    ValueKind::Boolean,
                    "if condition must be boolean"
                );
            }
            NodeKind::Pure(op) => {
                assert_eq!(inputs.len(), op.arity(), "wrong input count for {}", op.name());
            }
            NodeKind::Constant(c) => {
                assert!(inputs.is_empty(), "constants take no inputs");
                assert_eq!(value_kind, c.kind(), "constant {c} has kind {}", c.kind());
            }
            NodeKind::Parameter(_) => assert!(inputs.is_empty(), "parameters take no inputs"),
            NodeKind::Phi => {
                assert!(!inputs.is_empty(), "phi needs its merge as first input");
                assert!(
                    matches!(self.kind(inputs[0]), NodeKind::Merge),
                    "first phi input must be a merge"
                );
                assert!(!value_kind.is_void(), "phi must produce a value");
            }
            NodeKind::Unwind => assert_eq!(inputs.len(), 1, "unwind takes the exception"),
            NodeKind::Return => assert!(inputs.len() <= 1, "return takes at most one value"),
            _ => {}
        }
    }

    /// Find or create a value-numberable floating node.
    pub fn unique(&mut self, kind: NodeKind, value_kind: ValueKind, inputs: &[NodeId]) -> NodeId {
        assert!(
            kind.is_value_numberable(),
            "{} cannot be value numbered",
            kind.name()
        );
        if let Some(existing) = self.find_equivalent(&kind, value_kind, inputs) {
            return existing;
        }
        self.add(kind, value_kind, inputs)
    }

    pub(crate) fn find_equivalent(
        &self,
        kind: &NodeKind,
        value_kind: ValueKind,
        inputs: &[NodeId],
    ) -> Option<NodeId> {
        self.live_nodes().find(|&id| {
            let node = &self.nodes[id.index()];
            node.kind == *kind && node.value_kind == value_kind && node.inputs == inputs
        })
    }

    pub fn constant(&mut self, constant: Constant) -> NodeId {
        self.unique(NodeKind::Constant(constant), constant.kind(), &[])
    }

    // ------------------------------------------------------------------
    // Control edges
    // ------------------------------------------------------------------

    pub fn next(&self, id: NodeId) -> Option<NodeId> {
        assert!(
            self.kind(id).is_fixed_with_next(),
            "{} has no next slot",
            self.kind(id).name()
        );
        self.node(id).successor(0)
    }

    pub fn set_next(&mut self, node: NodeId, next: NodeId) {
        assert!(
            self.kind(node).is_fixed_with_next(),
            "{} ({node}) cannot have a next node",
            self.kind(node).name()
        );
        self.set_successor(node, 0, next);
    }

    pub fn set_successor(&mut self, node: NodeId, slot: usize, successor: NodeId) {
        let current = self.node(node).successors.get(slot).copied();
        let current = current.unwrap_or_else(|| panic!("{node} has no successor slot {slot}"));
        assert!(
            current.is_none(),
            "successor slot {slot} of {node} is already occupied"
        );
        let kind = self.kind(successor);
        assert!(
            kind.is_fixed() && !matches!(kind, NodeKind::Start | NodeKind::Merge),
            "{} ({successor}) cannot be a control successor",
            kind.name()
        );
        if let Some(pred) = self.node(successor).predecessor {
            panic!("{successor} is already attached after {pred}");
        }
        self.node_mut(node).successors[slot] = Some(successor);
        self.node_mut(successor).predecessor = Some(node);
    }

    pub(crate) fn clear_successor(&mut self, node: NodeId, slot: usize) -> Option<NodeId> {
        let successor = self.node_mut(node).successors[slot].take()?;
        self.node_mut(successor).predecessor = None;
        Some(successor)
    }

    /// Disconnect `node` from its predecessor, returning the freed slot.
    pub(crate) fn detach(&mut self, node: NodeId) -> Option<(NodeId, usize)> {
        let pred = self.node_mut(node).predecessor.take()?;
        let slot = self
            .node(pred)
            .successors
            .iter()
            .position(|s| *s == Some(node))
            .unwrap_or_else(|| panic!("{pred} -> {node} has no matching successor slot"));
        self.node_mut(pred).successors[slot] = None;
        Some((pred, slot))
    }

    /// Remove a fixed-with-next node from its control chain, joining its
    /// predecessor to its successor.
    pub(crate) fn unlink_fixed(&mut self, node: NodeId) {
        assert!(self.kind(node).is_fixed_with_next());
        let next = self.clear_successor(node, 0);
        let freed = self.detach(node);
        if let (Some((pred, slot)), Some(next)) = (freed, next) {
            self.set_successor(pred, slot, next);
        }
    }

    // ------------------------------------------------------------------
    // Merges
    // ------------------------------------------------------------------

    pub fn add_merge_end(&mut self, merge: NodeId, end: NodeId) {
        assert!(matches!(self.kind(merge), NodeKind::Merge), "{merge} is not a merge");
        assert!(matches!(self.kind(end), NodeKind::End), "{end} is not an end");
        if let Some(owner) = self.merge_of(end) {
            panic!("{end} already flows into {owner}");
        }
        self.node_mut(merge).inputs.push(end);
    }

    pub fn merge_ends(&self, merge: NodeId) -> &[NodeId] {
        assert!(matches!(self.kind(merge), NodeKind::Merge), "{merge} is not a merge");
        self.inputs(merge)
    }

    pub fn merge_of(&self, end: NodeId) -> Option<NodeId> {
        self.live_nodes().find(|&id| {
            let node = &self.nodes[id.index()];
            matches!(node.kind, NodeKind::Merge) && node.inputs.contains(&end)
        })
    }

    pub fn phis(&self, merge: NodeId) -> Vec<NodeId> {
        self.live_nodes()
            .filter(|&id| {
                let node = &self.nodes[id.index()];
                matches!(node.kind, NodeKind::Phi) && node.inputs[0] == merge
            })
            .collect()
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn live_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| !node.deleted)
            .map(|(index, _)| self.id_at(index))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.iter().filter(|node| !node.deleted).count()
    }

    /// Capacity of the node table, tombstones included.
    pub(crate) fn raw_len(&self) -> usize {
        self.nodes.len()
    }

    pub fn count(&self, predicate: impl Fn(&NodeKind) -> bool) -> usize {
        self.nodes
            .iter()
            .filter(|node| !node.deleted && predicate(&node.kind))
            .count()
    }

    pub fn nodes_where(&self, predicate: impl Fn(&NodeKind) -> bool) -> Vec<NodeId> {
        self.live_nodes()
            .filter(|&id| predicate(&self.nodes[id.index()].kind))
            .collect()
    }

    pub fn usages(&self, id: NodeId) -> Vec<NodeId> {
        self.check_owned(id);
        self.live_nodes()
            .filter(|&user| self.nodes[user.index()].inputs.contains(&id))
            .collect()
    }

    pub fn has_usages(&self, id: NodeId) -> bool {
        self.nodes
            .iter()
            .any(|node| !node.deleted && node.inputs.contains(&id))
    }

    // ------------------------------------------------------------------
    // Editing
    // ------------------------------------------------------------------

    pub fn replace_at_usages(&mut self, old: NodeId, replacement: NodeId) {
        assert!(self.contains(old) && self.contains(replacement));
        assert_ne!(old, replacement, "cannot replace {old} with itself");
        for node in self.nodes.iter_mut().filter(|node| !node.deleted) {
            for input in node.inputs.iter_mut() {
                if *input == old {
                    *input = replacement;
                }
            }
        }
    }

    pub(crate) fn delete(&mut self, id: NodeId) {
        let node = self.node_mut(id);
        node.deleted = true;
        node.inputs.clear();
        node.successors.iter_mut().for_each(|s| *s = None);
        node.predecessor = None;
    }

    /// Remove the control subgraph rooted at `root`, which must no longer be
    /// reachable. Merges reached through an end lose that end; a merge left
    /// with a single end is collapsed into straight-line control flow and a
    /// merge left with none is removed along with its continuation.
    pub fn kill_cfg(&mut self, root: NodeId) {
        assert!(self.kind(root).is_fixed(), "kill_cfg needs a fixed root");
        self.detach(root);
        let mut worklist = vec![root];
        while let Some(node) = worklist.pop() {
            if !self.contains(node) {
                continue;
            }
            let kind = self.kind(node).clone();
            match kind {
                NodeKind::End => {
                    if let Some(merge) = self.merge_of(node) {
                        self.remove_merge_end(merge, node, &mut worklist);
                    }
                }
                NodeKind::Merge => {
                    for phi in self.phis(node) {
                        self.delete(phi);
                    }
                    worklist.extend(self.node(node).successors());
                }
                _ => worklist.extend(self.node(node).successors()),
            }
            if self.contains(node) {
                self.delete(node);
            }
        }
        self.remove_dead_floating();
    }

    fn remove_merge_end(&mut self, merge: NodeId, end: NodeId, worklist: &mut Vec<NodeId>) {
        let index = self
            .inputs(merge)
            .iter()
            .position(|&e| e == end)
            .unwrap_or_else(|| panic!("{end} is not registered with {merge}"));
        self.node_mut(merge).inputs.remove(index);
        for phi in self.phis(merge) {
            self.node_mut(phi).inputs.remove(index + 1);
        }
        match self.inputs(merge).len() {
            0 => worklist.push(merge),
            1 => self.collapse_merge(merge),
            _ => {}
        }
    }

    /// Replace a single-input merge by straight-line control flow.
    fn collapse_merge(&mut self, merge: NodeId) {
        let end = self.inputs(merge)[0];
        for phi in self.phis(merge) {
            let value = self.inputs(phi)[1];
            self.replace_at_usages(phi, value);
            self.delete(phi);
        }
        let next = self.clear_successor(merge, 0);
        let freed = self.detach(end);
        self.delete(merge);
        self.delete(end);
        if let (Some((pred, slot)), Some(next)) = (freed, next) {
            self.set_successor(pred, slot, next);
        }
    }

    /// Delete floating nodes that are unused or depend on deleted nodes.
    /// Parameters are kept so the graph's signature stays intact.
    pub fn remove_dead_floating(&mut self) -> usize {
        let mut removed = 0;
        loop {
            let mut changed = false;
            for index in 0..self.nodes.len() {
                let node = &self.nodes[index];
                if node.deleted
                    || !node.kind.is_floating()
                    || matches!(node.kind, NodeKind::Parameter(_))
                {
                    continue;
                }
                let id = self.id_at(index);
                let has_dead_input = node
                    .inputs
                    .iter()
                    .any(|input| self.nodes[input.index()].deleted);
                if has_dead_input || !self.has_usages(id) {
                    self.delete(id);
                    removed += 1;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
        removed
    }

    /// Check structural well-formedness of the graph.
    pub fn verify(&self) -> Result<(), String> {
        for id in self.live_nodes() {
            let node = &self.nodes[id.index()];
            for &input in &node.inputs {
                if !self.contains(input) {
                    return Err(format!("{id} uses dead or foreign node {input}"));
                }
            }
            for successor in node.successors() {
                if !self.contains(successor) || self.nodes[successor.index()].predecessor != Some(id) {
                    return Err(format!("{id} -> {successor} has no matching predecessor link"));
                }
            }
            if let Some(pred) = node.predecessor {
                if !self.contains(pred) || !self.nodes[pred.index()].successors.contains(&Some(id)) {
                    return Err(format!("{id} names {pred} as predecessor without a successor edge"));
                }
            }
            match &node.kind {
                NodeKind::Start => {}
                NodeKind::Merge => {
                    if node.inputs.len() < 2 {
                        return Err(format!("merge {id} has {} ends", node.inputs.len()));
                    }
                    if node.inputs.iter().any(|e| !matches!(self.kind(*e), NodeKind::End)) {
                        return Err(format!("merge {id} has a non-end input"));
                    }
                }
                NodeKind::Phi => {
                    let merge = node.inputs[0];
                    let expected = self.inputs(merge).len() + 1;
                    if node.inputs.len() != expected {
                        return Err(format!(
                            "phi {id} has {} inputs, merge {merge} expects {expected}",
                            node.inputs.len()
                        ));
                    }
                }
                NodeKind::If { .. } => {
                    if node.successors().filter(|s| matches!(self.kind(*s), NodeKind::Begin)).count() != 2 {
                        return Err(format!("if {id} needs two begin successors"));
                    }
                }
                NodeKind::Invoke { .. } => {
                    let normal = node.successor(0).map(|s| self.kind(s).clone());
                    let exceptional = node.successor(1).map(|s| self.kind(s).clone());
                    if normal != Some(NodeKind::Begin) || exceptional != Some(NodeKind::ExceptionObject) {
                        return Err(format!("invoke {id} needs a begin and an exception edge"));
                    }
                }
                _ => {}
            }
            if node.kind.is_fixed()
                && !matches!(node.kind, NodeKind::Start | NodeKind::Merge)
                && node.predecessor.is_none()
            {
                return Err(format!("{} {id} is not attached", node.kind.name()));
            }
            if matches!(node.kind, NodeKind::End) {
                let owners = self
                    .live_nodes()
                    .filter(|m| matches!(self.kind(*m), NodeKind::Merge) && self.inputs(*m).contains(&id))
                    .count();
                if owners != 1 {
                    return Err(format!("end {id} flows into {owners} merges"));
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.definition {
            Some(def) => writeln!(f, "graph {:?} for {def}", self.id)?,
            None => writeln!(f, "graph {:?}", self.id)?,
        }
        for id in self.live_nodes() {
            let node = &self.nodes[id.index()];
            write!(f, "  {id} = {}", node.kind.name())?;
            if !node.inputs.is_empty() {
                let inputs: Vec<String> = node.inputs.iter().map(|i| i.to_string()).collect();
                write!(f, "({})", inputs.join(", "))?;
            }
            if !node.value_kind.is_void() {
                write!(f, " : {}", node.value_kind)?;
            }
            let successors: Vec<String> = node.successors().map(|s| s.to_string()).collect();
            if !successors.is_empty() {
                write!(f, " -> [{}]", successors.join(", "))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
