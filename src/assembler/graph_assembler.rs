// This module implements the GraphAssembler, the imperative front end for building replacement
// graphs. It owns one in-progress Graph and a cursor: the fixed node after which the next
// control node is appended, or None when the most recently built path ended in a control sink.
// On top of plain appends it offers structured regions (conditionals and exception dispatch)
// recorded on a RegionStack. Closing a region runs merge synthesis over the two exit cursors:
// two reachable exits are joined by a new merge (consequent or normal edge first, which fixes
// the order of per-edge phi inputs), a single reachable exit simply becomes the cursor, and no
// reachable exit leaves the cursor empty so the whole region counts as a dead end. Nested early
// exits such as deoptimizations or thrown exceptions therefore need no special casing by
// callers. Every structural misuse panics before the graph is modified.

//! Cursor-based graph assembly with structured regions.

use super::region::{ConditionalRegion, DispatchRegion, Region, RegionStack};
use crate::core::{
    Constant, DeoptReason, DefinitionId, Graph, NodeId, NodeKind, SourcePosition, ValueKind,
};

/// Builds a single graph through a cursor and a stack of open regions.
pub struct GraphAssembler {
    graph: Graph,
    cursor: Option<NodeId>,
    regions: RegionStack,
    position: Option<SourcePosition>,
}

impl GraphAssembler {
    /// Start assembling after the start node of `graph`.
    pub fn new(graph: Graph) -> Self {
        let start = graph.start();
        Self::at(graph, start)
    }

    /// Start assembling after `cursor`, which must be an open fixed node of `graph`.
    pub fn at(graph: Graph, cursor: NodeId) -> Self {
        let mut assembler = Self {
            graph,
            cursor: None,
            regions: RegionStack::new(),
            position: None,
        };
        assembler.resume_at(cursor);
        assembler
    }

    /// Tag nodes created from now on with `position` (tracking graphs only).
    pub fn with_position_context(mut self, position: SourcePosition) -> Self {
        self.position = Some(position);
        self
    }

    pub fn set_position_context(&mut self, position: Option<SourcePosition>) {
        self.position = position;
    }

    pub fn position_context(&self) -> Option<&SourcePosition> {
        self.position.as_ref()
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Direct access to the graph for edits the assembler does not model.
    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    /// Current insertion point; `None` means the current path is unreachable.
    pub fn cursor(&self) -> Option<NodeId> {
        self.cursor
    }

    pub fn is_reachable(&self) -> bool {
        self.cursor.is_some()
    }

    pub fn region_depth(&self) -> usize {
        self.regions.depth()
    }

    pub fn top_region(&self) -> &Region {
        self.regions.top()
    }

    /// Move the cursor to `node`, a fixed-with-next node without a successor.
    pub fn resume_at(&mut self, node: NodeId) {
        assert!(
            self.graph.kind(node).is_fixed_with_next(),
            "cannot resume at {} ({node})",
            self.graph.kind(node).name()
        );
        assert!(
            self.graph.next(node).is_none(),
            "cannot resume at {node}: it already has a successor"
        );
        self.cursor = Some(node);
    }

    pub(crate) fn set_cursor(&mut self, cursor: Option<NodeId>) {
        self.cursor = cursor;
    }

    // ------------------------------------------------------------------
    // Node creation
    // ------------------------------------------------------------------

    /// Create an unattached node tagged with the position context.
    pub fn add(&mut self, kind: NodeKind, value_kind: ValueKind, inputs: &[NodeId]) -> NodeId {
        let position = self.position.clone();
        self.graph.add_at(kind, value_kind, inputs, position)
    }

    /// Find or create a value-numbered floating node.
    pub fn unique(&mut self, kind: NodeKind, value_kind: ValueKind, inputs: &[NodeId]) -> NodeId {
        assert!(
            kind.is_value_numberable(),
            "{} cannot be value numbered",
            kind.name()
        );
        match self.graph.find_equivalent(&kind, value_kind, inputs) {
            Some(existing) => existing,
            None => self.add(kind, value_kind, inputs),
        }
    }

    pub fn constant(&mut self, constant: Constant) -> NodeId {
        self.unique(NodeKind::Constant(constant), constant.kind(), &[])
    }

    pub fn parameter(&mut self, index: u32, kind: ValueKind) -> NodeId {
        self.unique(NodeKind::Parameter(index), kind, &[])
    }

    /// Attach `node` to the current path.
    ///
    /// Floating nodes are returned unchanged. A fixed node is linked after the
    /// cursor; the cursor then moves to the node if it can take a successor,
    /// and becomes `None` for control sinks, ends and splits, whose
    /// continuations the caller must address explicitly.
    pub fn append(&mut self, node: NodeId) -> NodeId {
        assert!(
            self.graph.contains(node),
            "node {node} is not a live node of graph {:?}",
            self.graph.id()
        );
        let kind = self.graph.kind(node).clone();
        if kind.is_floating() {
            return node;
        }
        let Some(cursor) = self.cursor else {
            panic!("cannot append {} ({node}): the current path is unreachable", kind.name());
        };
        self.graph.set_next(cursor, node);
        self.cursor = if kind.is_fixed_with_next() { Some(node) } else { None };
        node
    }

    /// Create a node and append it.
    pub fn append_node(&mut self, kind: NodeKind, value_kind: ValueKind, inputs: &[NodeId]) -> NodeId {
        let node = self.add(kind, value_kind, inputs);
        self.append(node)
    }

    pub fn append_return(&mut self, value: Option<NodeId>) -> NodeId {
        let inputs: Vec<NodeId> = value.into_iter().collect();
        self.append_node(NodeKind::Return, ValueKind::Void, &inputs)
    }

    pub fn append_unwind(&mut self, exception: NodeId) -> NodeId {
        self.append_node(NodeKind::Unwind, ValueKind::Void, &[exception])
    }

    pub fn append_deoptimize(&mut self, reason: DeoptReason) -> NodeId {
        self.append_node(NodeKind::Deoptimize(reason), ValueKind::Void, &[])
    }

    /// Create a phi over `merge` with one value per merge end, in end order.
    pub fn phi(&mut self, merge: NodeId, kind: ValueKind, values: &[NodeId]) -> NodeId {
        let ends = self.graph.merge_ends(merge).len();
        assert_eq!(
            values.len(),
            ends,
            "phi at {merge} needs one value per end"
        );
        let mut inputs = Vec::with_capacity(values.len() + 1);
        inputs.push(merge);
        inputs.extend_from_slice(values);
        self.add(NodeKind::Phi, kind, &inputs)
    }

    // ------------------------------------------------------------------
    // Conditional regions
    // ------------------------------------------------------------------

    /// Append a two-way branch on `condition` and open a conditional region.
    ///
    /// The cursor becomes `None`; one of the branches must be entered
    /// before anything else is appended.
    pub fn start_conditional(&mut self, condition: NodeId, probability: f64) -> NodeId {
        assert!(self.is_reachable(), "cannot branch from an unreachable path");
        let consequent = self.add(NodeKind::Begin, ValueKind::Void, &[]);
        let alternate = self.add(NodeKind::Begin, ValueKind::Void, &[]);
        let split = self.add(NodeKind::If { probability }, ValueKind::Void, &[condition]);
        self.graph.set_successor(split, 0, consequent);
        self.graph.set_successor(split, 1, alternate);
        self.append(split);
        self.regions
            .push(Region::Conditional(ConditionalRegion::new(split, consequent, alternate)));
        split
    }

    pub fn enter_consequent(&mut self) {
        let cursor = self.cursor;
        self.cursor = self.regions.top_conditional().enter_consequent(cursor);
    }

    pub fn enter_alternate(&mut self) {
        let cursor = self.cursor;
        self.cursor = self.regions.top_conditional().enter_alternate(cursor);
    }

    /// Close the top conditional region and join its branches.
    ///
    /// Returns the merge node when both branches continue, `None` otherwise.
    pub fn end_conditional(&mut self) -> Option<NodeId> {
        let cursor = self.cursor;
        let mut region = self.regions.pop_conditional();
        let (consequent, alternate) = region.close(cursor);
        self.merge_exits(consequent, alternate)
    }

    // ------------------------------------------------------------------
    // Exception-dispatch regions
    // ------------------------------------------------------------------

    /// Append an invoke of `target` with an exception edge and open an
    /// exception-dispatch region. The invoke node is also its result value.
    pub fn start_exception_dispatch(
        &mut self,
        target: DefinitionId,
        arguments: &[NodeId],
        result_kind: ValueKind,
    ) -> NodeId {
        assert!(self.is_reachable(), "cannot invoke from an unreachable path");
        let (invoke, normal, exception_object) = self.add_invoke(target, arguments, result_kind);
        self.append(invoke);
        self.regions.push(Region::ExceptionDispatch(DispatchRegion::new(
            invoke,
            normal,
            exception_object,
        )));
        invoke
    }

    /// Create an invoke with its normal begin and exception object attached.
    pub(crate) fn add_invoke(
        &mut self,
        target: DefinitionId,
        arguments: &[NodeId],
        result_kind: ValueKind,
    ) -> (NodeId, NodeId, NodeId) {
        let normal = self.add(NodeKind::Begin, ValueKind::Void, &[]);
        let exception_object = self.add(NodeKind::ExceptionObject, ValueKind::Object, &[]);
        let invoke = self.add(NodeKind::Invoke { target }, result_kind, arguments);
        self.graph.set_successor(invoke, 0, normal);
        self.graph.set_successor(invoke, 1, exception_object);
        (invoke, normal, exception_object)
    }

    /// Exception value of the innermost open dispatch region.
    pub fn exception_object(&mut self) -> NodeId {
        self.regions.top_dispatch().exception_object()
    }

    pub fn enter_normal_edge(&mut self) {
        let cursor = self.cursor;
        self.cursor = self.regions.top_dispatch().enter_normal_edge(cursor);
    }

    pub fn enter_exceptional_edge(&mut self) {
        let cursor = self.cursor;
        self.cursor = self.regions.top_dispatch().enter_exceptional_edge(cursor);
    }

    /// Close the top dispatch region and join its edges.
    pub fn end_exception_dispatch(&mut self) -> Option<NodeId> {
        let cursor = self.cursor;
        let mut region = self.regions.pop_dispatch();
        let (normal, exceptional) = region.close(cursor);
        self.merge_exits(normal, exceptional)
    }

    // ------------------------------------------------------------------
    // Merge synthesis
    // ------------------------------------------------------------------

    fn merge_exits(&mut self, x: Option<NodeId>, y: Option<NodeId>) -> Option<NodeId> {
        match (x, y) {
            (Some(x), Some(y)) => {
                let merge = self.merge_paths(&[x, y]);
                self.cursor = Some(merge);
                Some(merge)
            }
            (Some(only), None) | (None, Some(only)) => {
                self.cursor = Some(only);
                None
            }
            (None, None) => {
                self.cursor = None;
                None
            }
        }
    }

    /// Terminate each open path in `exits` with an end and join them in a
    /// new merge, in the given order. Does not move the cursor.
    pub fn merge_paths(&mut self, exits: &[NodeId]) -> NodeId {
        assert!(exits.len() >= 2, "a merge joins at least two paths");
        let merge = self.add(NodeKind::Merge, ValueKind::Void, &[]);
        for &exit in exits {
            let end = self.add(NodeKind::End, ValueKind::Void, &[]);
            self.graph.set_next(exit, end);
            self.graph.add_merge_end(merge, end);
        }
        merge
    }

    /// Hand back the graph once every region is closed.
    pub fn finish(self) -> Graph {
        assert_eq!(
            self.regions.depth(),
            0,
            "finishing with {} still open",
            self.regions.top().kind_name()
        );
        self.graph
    }
}
