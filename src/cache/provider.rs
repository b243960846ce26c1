//! Reference-body provider contract.
//!
//! The cache never parses anything itself. A [`BodyProvider`] answers
//! whether a definition has an executable body and, when asked, builds the
//! initial graph for it. Providers may be slow but must be deterministic:
//! two builds of the same request have to be interchangeable, because
//! concurrent cache misses may build the same key twice and keep either.

use crate::assembler::GraphAssembler;
use crate::core::{BuildResult, Definition, DefinitionId, Graph, Options, SourcePosition};

/// Everything a provider needs to build one graph.
#[derive(Debug, Clone, Copy)]
pub struct BuildRequest<'a> {
    pub definition: &'a Definition,
    pub options: &'a Options,
    pub track_positions: bool,
}

impl<'a> BuildRequest<'a> {
    pub fn new(definition: &'a Definition, options: &'a Options, track_positions: bool) -> Self {
        Self {
            definition,
            options,
            track_positions,
        }
    }

    /// Empty graph configured for this request.
    pub fn new_graph(&self) -> Graph {
        Graph::for_definition(
            self.definition.id().clone(),
            self.options.clone(),
            self.track_positions,
        )
    }

    /// Assembler over [`BuildRequest::new_graph`], tagging nodes with the
    /// definition's entry position when positions are tracked.
    pub fn new_assembler(&self) -> GraphAssembler {
        let assembler = GraphAssembler::new(self.new_graph());
        if self.track_positions {
            assembler.with_position_context(SourcePosition::new(self.definition.id().clone(), 0))
        } else {
            assembler
        }
    }
}

pub trait BodyProvider: Send + Sync {
    /// Whether `definition` has an executable body to build from.
    fn has_body(&self, definition: &DefinitionId) -> bool;

    /// Build the initial graph. Only called when `has_body` returned true.
    fn build(&self, request: &BuildRequest<'_>) -> BuildResult<Graph>;
}
