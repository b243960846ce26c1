// This module implements templates: frozen, parameterized graph fragments that are
// instantiated many times into caller graphs. A Template pairs a definition (whose declared
// parameter names are the template's binding slots) with the EncodedGraph built for it under
// one option set. Instantiation first validates the Arguments against the declared parameters
// (unknown names, duplicate bindings, missing parameters, kind mismatches and an unreachable
// insertion point all panic before the target graph is touched), then copies the fragment in
// at the assembler's cursor with every parameter bound to its argument node or constant. The
// fragment's returns are spliced into the caller's control flow: a single return continues
// straight after its predecessor, several returns are joined by a merge with a phi of the
// returned values, and a fragment that never returns leaves the cursor unreachable.
// TemplateRegistry caches templates per (definition, options).

//! Graph templates and their registry.

pub mod arguments;
pub mod registry;

pub use arguments::{ArgumentValue, Arguments};
pub use registry::TemplateRegistry;

use crate::assembler::GraphAssembler;
use crate::cache::EncodedGraph;
use crate::core::{Definition, Graph, NodeId, NodeKind, Options};
use bumpalo::Bump;
use std::sync::Arc;

/// Result of splicing a template into a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instantiation {
    /// Value returned by the fragment, if it returns one.
    pub result: Option<NodeId>,
    /// Merge joining multiple returns.
    pub merge: Option<NodeId>,
    pub returns: usize,
}

#[derive(Debug)]
pub struct Template {
    definition: Definition,
    options: Options,
    graph: Arc<EncodedGraph>,
}

impl Template {
    /// Panics if the graph has a parameter the definition does not declare,
    /// or one whose kind differs from the declared one. Unused parameters may
    /// be absent from the graph.
    pub fn new(definition: Definition, options: Options, graph: Arc<EncodedGraph>) -> Self {
        let declared = definition.parameters();
        for (index, kind) in graph.parameters() {
            let expected = declared.get(index as usize).map(|param| param.kind);
            assert_eq!(
                expected,
                Some(kind),
                "graph for {} has {kind} parameter {index}, but {} declared",
                definition.id(),
                declared.len()
            );
        }
        Self {
            definition,
            options,
            graph,
        }
    }

    pub fn definition(&self) -> &Definition {
        &self.definition
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn graph(&self) -> &Arc<EncodedGraph> {
        &self.graph
    }

    pub fn parameter_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.definition.parameters().iter().map(|param| &*param.name)
    }

    pub fn tracks_positions(&self) -> bool {
        self.graph.tracks_positions()
    }

    /// Splice a copy of the fragment in at the assembler's cursor.
    pub fn instantiate(
        &self,
        assembler: &mut GraphAssembler,
        arguments: &Arguments,
        arena: &Bump,
    ) -> Instantiation {
        let id = self.definition.id();
        let bound = self.bind(assembler.graph(), arguments);
        let Some(entry) = assembler.cursor() else {
            panic!("cannot instantiate template {id} on an unreachable path");
        };

        let values: Vec<NodeId> = bound
            .into_iter()
            .map(|value| match value {
                ArgumentValue::Node(node) => node,
                ArgumentValue::Constant(constant) => assembler.constant(constant),
            })
            .collect();
        let caller = assembler.position_context().cloned();
        let map = self.graph.decode_into(
            assembler.graph_mut(),
            entry,
            |index| values[index as usize],
            caller.as_ref(),
            arena,
        );

        let graph = assembler.graph_mut();
        let returns: Vec<NodeId> = map
            .iter()
            .copied()
            .filter(|&node| matches!(graph.kind(node), NodeKind::Return))
            .collect();
        let mut exits = Vec::with_capacity(returns.len());
        let mut results = Vec::with_capacity(returns.len());
        for ret in &returns {
            results.extend(graph.inputs(*ret).first().copied());
            if let Some((pred, _)) = graph.detach(*ret) {
                exits.push(pred);
            }
            graph.delete(*ret);
        }
        log::trace!("instantiated {id} at {entry} with {} returns", exits.len());

        match exits.as_slice() {
            [] => {
                assembler.set_cursor(None);
                Instantiation {
                    result: None,
                    merge: None,
                    returns: 0,
                }
            }
            [exit] => {
                assembler.set_cursor(Some(*exit));
                Instantiation {
                    result: results.first().copied(),
                    merge: None,
                    returns: 1,
                }
            }
            _ => {
                let merge = assembler.merge_paths(&exits);
                let result = if results.len() == exits.len() {
                    let kind = self.definition.return_kind();
                    Some(assembler.phi(merge, kind, &results))
                } else {
                    None
                };
                assembler.set_cursor(Some(merge));
                Instantiation {
                    result,
                    merge: Some(merge),
                    returns: exits.len(),
                }
            }
        }
    }

    /// Order `arguments` by parameter index, panicking on any mismatch.
    fn bind(&self, graph: &Graph, arguments: &Arguments) -> Vec<ArgumentValue> {
        let id = self.definition.id();
        let params = self.definition.parameters();
        let mut slots: Vec<Option<ArgumentValue>> = vec![None; params.len()];
        for (name, value) in arguments.iter() {
            let Some(index) = self.definition.parameter_index(name) else {
                panic!("template {id} has no parameter `{name}`");
            };
            if slots[index].is_some() {
                panic!("parameter `{name}` of template {id} is bound twice");
            }
            let kind = match value {
                ArgumentValue::Node(node) => {
                    assert!(
                        graph.contains(node),
                        "argument `{name}` ({node}) is not a live node of the target graph"
                    );
                    graph.value_kind(node)
                }
                ArgumentValue::Constant(constant) => constant.kind(),
            };
            let expected = params[index].kind;
            assert_eq!(
                kind, expected,
                "argument `{name}` of template {id} is {kind}, expected {expected}"
            );
            slots[index] = Some(value);
        }
        slots
            .into_iter()
            .zip(params)
            .map(|(slot, param)| {
                slot.unwrap_or_else(|| {
                    panic!("template {id} is missing parameter `{}`", param.name)
                })
            })
            .collect()
    }
}
