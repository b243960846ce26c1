// This module implements the reference-graph builder: the non-parsing path that produces a
// complete single-entry graph for one definition by running a caller-supplied plugin. The
// builder creates one parameter node per declared parameter, hands the plugin a small surface
// (a graph assembler, a single synthetic return slot, and instrumented exception edges), and
// runs the plugin exactly once. A plugin that declines yields PluginDeclined and no graph; the
// caller falls back to the generic lowering. After the plugin returns, a Return is appended
// if the path is still open, every Return in the graph is checked against the declared return
// kind, and every recorded exception edge is unified into a single exceptional exit by the builder's
// ExceptionMerge strategy, since a replacement graph may carry at most one.

//! Plugin-driven construction of reference graphs.

pub mod plugins;

pub use plugins::PluginBodyProvider;

use crate::assembler::GraphAssembler;
use crate::cache::BuildRequest;
use crate::core::{
    BuildError, BuildResult, Constant, Definition, DefinitionId, Graph, NodeId, NodeKind, Options,
    SourcePosition, ValueKind,
};

/// Procedural lowering of one definition.
pub trait ReplacementPlugin: Send + Sync {
    /// Emit the replacement into `builder`. Returns `false` to decline, in
    /// which case nothing the plugin built is kept.
    fn apply(&self, builder: &mut ReferenceGraphBuilder<'_>) -> bool;
}

impl<F> ReplacementPlugin for F
where
    F: Fn(&mut ReferenceGraphBuilder<'_>) -> bool + Send + Sync,
{
    fn apply(&self, builder: &mut ReferenceGraphBuilder<'_>) -> bool {
        self(builder)
    }
}

/// Strategy for joining the exception edges a plugin raised into one exit.
pub trait ExceptionMerge: Send + Sync {
    /// `edges` are exception objects with no successor yet, in the order
    /// they were raised.
    fn merge_exception_edges(
        &self,
        definition: &DefinitionId,
        assembler: &mut GraphAssembler,
        edges: &[NodeId],
    ) -> BuildResult<()>;
}

/// Routes every exception edge into a single `Unwind`, joining multiple
/// edges through a merge and a phi of the exception values.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnifiedExceptionMerge;

impl ExceptionMerge for UnifiedExceptionMerge {
    fn merge_exception_edges(
        &self,
        definition: &DefinitionId,
        assembler: &mut GraphAssembler,
        edges: &[NodeId],
    ) -> BuildResult<()> {
        for &edge in edges {
            let graph = assembler.graph();
            if !matches!(graph.kind(edge), NodeKind::ExceptionObject) {
                return Err(BuildError::UnsupportedExceptionShape {
                    definition: definition.clone(),
                    reason: format!("{edge} is a {}, not an exception edge", graph.kind(edge).name()),
                });
            }
            if let Some(next) = graph.next(edge) {
                return Err(BuildError::UnsupportedExceptionShape {
                    definition: definition.clone(),
                    reason: format!("exception edge {edge} already continues at {next}"),
                });
            }
        }
        match edges {
            [] => {}
            [single] => {
                assembler.resume_at(*single);
                assembler.append_unwind(*single);
            }
            _ => {
                let merge = assembler.merge_paths(edges);
                let exception = assembler.phi(merge, ValueKind::Object, edges);
                assembler.resume_at(merge);
                assembler.append_unwind(exception);
            }
        }
        Ok(())
    }
}

/// Builds one graph for one definition from a [`ReplacementPlugin`].
pub struct ReferenceGraphBuilder<'d> {
    definition: &'d Definition,
    assembler: GraphAssembler,
    arguments: Vec<NodeId>,
    return_slot: Option<(ValueKind, NodeId)>,
    exception_edges: Vec<NodeId>,
    exception_merge: Box<dyn ExceptionMerge>,
}

impl<'d> ReferenceGraphBuilder<'d> {
    pub fn new(definition: &'d Definition, options: Options, track_positions: bool) -> Self {
        let graph = Graph::for_definition(definition.id().clone(), options, track_positions);
        let mut assembler = GraphAssembler::new(graph);
        if track_positions {
            assembler.set_position_context(Some(SourcePosition::new(definition.id().clone(), 0)));
        }
        let arguments = definition
            .parameters()
            .iter()
            .enumerate()
            .map(|(index, param)| assembler.parameter(index as u32, param.kind))
            .collect();
        Self {
            definition,
            assembler,
            arguments,
            return_slot: None,
            exception_edges: Vec::new(),
            exception_merge: Box::new(UnifiedExceptionMerge),
        }
    }

    pub fn for_request(request: &BuildRequest<'d>) -> Self {
        Self::new(request.definition, request.options.clone(), request.track_positions)
    }

    pub fn with_exception_merge(mut self, merge: impl ExceptionMerge + 'static) -> Self {
        self.exception_merge = Box::new(merge);
        self
    }

    pub fn definition(&self) -> &'d Definition {
        self.definition
    }

    pub fn arguments(&self) -> &[NodeId] {
        &self.arguments
    }

    pub fn argument(&self, index: usize) -> NodeId {
        *self.arguments.get(index).unwrap_or_else(|| {
            panic!("{} has no parameter {index}", self.definition.id())
        })
    }

    pub fn argument_named(&self, name: &str) -> NodeId {
        match self.definition.parameter_index(name) {
            Some(index) => self.arguments[index],
            None => panic!("{} has no parameter `{name}`", self.definition.id()),
        }
    }

    /// The underlying assembler, for structured regions and raw appends.
    pub fn assembler(&mut self) -> &mut GraphAssembler {
        &mut self.assembler
    }

    pub fn graph(&self) -> &Graph {
        self.assembler.graph()
    }

    pub fn constant(&mut self, constant: Constant) -> NodeId {
        self.assembler.constant(constant)
    }

    pub fn unique(&mut self, kind: NodeKind, value_kind: ValueKind, inputs: &[NodeId]) -> NodeId {
        self.assembler.unique(kind, value_kind, inputs)
    }

    pub fn append_node(&mut self, kind: NodeKind, value_kind: ValueKind, inputs: &[NodeId]) -> NodeId {
        self.assembler.append_node(kind, value_kind, inputs)
    }

    /// Append a call of `target` with an instrumented exception edge.
    ///
    /// Building continues on the normal edge; the exception edge is recorded
    /// and unified with the others when the build finishes.
    pub fn append_with_exception(
        &mut self,
        target: DefinitionId,
        arguments: &[NodeId],
        result_kind: ValueKind,
    ) -> NodeId {
        assert!(
            self.assembler.is_reachable(),
            "cannot call {target} from an unreachable path"
        );
        let (invoke, normal, exception_object) =
            self.assembler.add_invoke(target, arguments, result_kind);
        self.assembler.append(invoke);
        self.assembler.resume_at(normal);
        self.exception_edges.push(exception_object);
        invoke
    }

    pub fn exception_edge_count(&self) -> usize {
        self.exception_edges.len()
    }

    /// Push the single return value.
    pub fn push(&mut self, kind: ValueKind, value: NodeId) {
        assert!(!kind.is_void(), "cannot push a void value");
        if let Some((_, existing)) = self.return_slot {
            panic!(
                "{} already pushed return value {existing}; only one is allowed",
                self.definition.id()
            );
        }
        let actual = self.assembler.graph().value_kind(value);
        assert_eq!(actual, kind, "pushed {value} as {kind} but it produces {actual}");
        self.return_slot = Some((kind, value));
    }

    /// Take the pushed return value back out of the slot.
    pub fn pop(&mut self, kind: ValueKind) -> NodeId {
        let Some((pushed, value)) = self.return_slot.take() else {
            panic!("pop from the empty return slot of {}", self.definition.id());
        };
        assert_eq!(pushed, kind, "popped {kind} but {pushed} was pushed");
        value
    }

    pub fn peek(&self) -> Option<NodeId> {
        self.return_slot.map(|(_, value)| value)
    }

    /// Run `plugin` once and finish the graph.
    ///
    /// Fails with [`BuildError::PluginDeclined`] when the plugin declines and
    /// with [`BuildError::UnsupportedExceptionShape`] when the exception
    /// edges cannot be unified; no graph is produced in either case.
    pub fn build(mut self, plugin: &dyn ReplacementPlugin) -> BuildResult<Graph> {
        let id = self.definition.id().clone();
        if !plugin.apply(&mut self) {
            log::debug!("plugin for {id} declined");
            return Err(BuildError::PluginDeclined { definition: id });
        }
        assert_eq!(
            self.assembler.region_depth(),
            0,
            "plugin for {id} left {} open",
            self.assembler.top_region().kind_name()
        );

        let declared = self.definition.return_kind();
        match self.return_slot {
            Some((pushed, value)) if declared.is_void() => {
                panic!("{id} returns void but pushed {pushed} value {value}")
            }
            Some((pushed, _)) if pushed != declared => {
                panic!("{id} returns {declared} but pushed a {pushed} value")
            }
            None if !declared.is_void() && self.assembler.is_reachable() => {
                panic!("{id} returns {declared} but no return value was pushed")
            }
            _ => {}
        }
        if self.assembler.is_reachable() {
            let value = self.return_slot.map(|(_, value)| value);
            self.assembler.append_return(value);
        } else if let Some((pushed, value)) = self.return_slot {
            panic!("{id} pushed {pushed} value {value} on an unreachable path");
        }
        self.check_returns(&id, declared);

        let edges = std::mem::take(&mut self.exception_edges);
        if !edges.is_empty() {
            log::trace!("unifying {} exception edges of {id}", edges.len());
            self.exception_merge
                .merge_exception_edges(&id, &mut self.assembler, &edges)?;
        }
        Ok(self.assembler.finish())
    }

    /// Every Return, including ones the plugin appended through the
    /// assembler, must carry a value of the declared kind.
    fn check_returns(&self, id: &DefinitionId, declared: ValueKind) {
        let graph = self.assembler.graph();
        for ret in graph.nodes_where(|kind| matches!(kind, NodeKind::Return)) {
            match (graph.inputs(ret).first(), declared.is_void()) {
                (Some(&value), true) => panic!(
                    "{id} returns void but {ret} returns a {} value",
                    graph.value_kind(value)
                ),
                (Some(&value), false) if graph.value_kind(value) != declared => panic!(
                    "{id} returns {declared} but {ret} returns a {} value",
                    graph.value_kind(value)
                ),
                (None, false) => panic!("{id} returns {declared} but {ret} has no value"),
                _ => {}
            }
        }
    }
}
