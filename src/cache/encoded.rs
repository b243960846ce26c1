// This module implements EncodedGraph, the immutable form in which graphs are cached. Encoding
// compacts a Graph: tombstoned nodes are dropped, surviving nodes are renumbered densely in
// their original order (the start node always lands at index 0), and edges become plain
// indices. Predecessor links are not stored; they are recovered from successor slots when the
// graph is decoded. An encoded graph is shared behind an Arc by every reader, and every decode
// produces a fresh mutable Graph, so no reader can observe another reader's edits. Besides the
// full decode there is decode_into, which copies the body into an existing graph, binding
// parameters to caller nodes, splicing the start node onto a caller position and, for tracking
// graphs, prefixing node positions with the caller's inlining position.

//! Immutable, shareable graph encoding.

use crate::core::{DefinitionId, Graph, NodeId, NodeKind, Options, SourcePosition, ValueKind};
use bumpalo::{collections::Vec as BumpVec, Bump};

#[derive(Debug, Clone)]
struct EncodedNode {
    kind: NodeKind,
    value_kind: ValueKind,
    inputs: Box<[u32]>,
    successors: Box<[Option<u32>]>,
    position: Option<SourcePosition>,
}

/// Frozen graph shared by all readers of a cache entry.
#[derive(Debug, Clone)]
pub struct EncodedGraph {
    definition: Option<DefinitionId>,
    options: Options,
    tracks_positions: bool,
    nodes: Box<[EncodedNode]>,
}

impl EncodedGraph {
    /// Compact `graph` into its encoded form. `arena` only holds scratch data.
    pub fn encode(graph: &Graph, arena: &Bump) -> EncodedGraph {
        let mut remap: BumpVec<'_, Option<u32>> = BumpVec::with_capacity_in(graph.raw_len(), arena);
        remap.resize(graph.raw_len(), None);
        let mut live: BumpVec<'_, NodeId> = BumpVec::new_in(arena);
        for id in graph.live_nodes() {
            remap[id.index()] = Some(live.len() as u32);
            live.push(id);
        }
        debug_assert_eq!(live.first().copied(), Some(graph.start()));

        let index = |id: NodeId| remap[id.index()].unwrap_or_else(|| unreachable!("{id} is dead"));
        let nodes = live
            .iter()
            .map(|&id| {
                let node = graph.node(id);
                EncodedNode {
                    kind: node.kind().clone(),
                    value_kind: node.value_kind(),
                    inputs: node.inputs().iter().map(|&input| index(input)).collect(),
                    successors: (0..node.kind().successor_count())
                        .map(|slot| node.successor(slot).map(index))
                        .collect(),
                    position: node.position().cloned(),
                }
            })
            .collect();

        EncodedGraph {
            definition: graph.definition().cloned(),
            options: graph.options().clone(),
            tracks_positions: graph.tracks_positions(),
            nodes,
        }
    }

    pub fn definition(&self) -> Option<&DefinitionId> {
        self.definition.as_ref()
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn tracks_positions(&self) -> bool {
        self.tracks_positions
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of nodes of the given kind.
    pub fn count(&self, predicate: impl Fn(&NodeKind) -> bool) -> usize {
        self.nodes.iter().filter(|node| predicate(&node.kind)).count()
    }

    /// Parameter indices with their kinds, in index order.
    pub fn parameters(&self) -> Vec<(u32, ValueKind)> {
        let mut params: Vec<(u32, ValueKind)> = self
            .nodes
            .iter()
            .filter_map(|node| match node.kind {
                NodeKind::Parameter(index) => Some((index, node.value_kind)),
                _ => None,
            })
            .collect();
        params.sort_by_key(|(index, _)| *index);
        params
    }

    /// Materialize a fresh, independently mutable graph.
    pub fn decode(&self) -> Graph {
        let mut graph = match &self.definition {
            Some(def) => Graph::for_definition(def.clone(), self.options.clone(), self.tracks_positions),
            None => Graph::new(self.options.clone(), self.tracks_positions),
        };
        let mut map = Vec::with_capacity(self.nodes.len());
        map.push(graph.start());
        for node in self.nodes.iter().skip(1) {
            map.push(graph.push_raw(node.kind.clone(), node.value_kind, node.position.clone()));
        }
        self.link(&mut graph, &map);
        graph
    }

    /// Copy this graph's body into `target`.
    ///
    /// The start node is not copied: its successor is attached after
    /// `entry`. Parameters are not copied either; `bind_parameter` supplies
    /// the target node for each parameter index. When `target` tracks
    /// positions, copied positions are prefixed with `caller`, and nodes
    /// without a position of their own take `caller` itself.
    ///
    /// Returns the target node for every encoded index.
    pub fn decode_into<'a>(
        &self,
        target: &mut Graph,
        entry: NodeId,
        mut bind_parameter: impl FnMut(u32) -> NodeId,
        caller: Option<&SourcePosition>,
        arena: &'a Bump,
    ) -> BumpVec<'a, NodeId> {
        assert!(
            target.kind(entry).is_fixed_with_next() && target.next(entry).is_none(),
            "cannot decode into {entry}: it is not an open insertion point"
        );
        let mut map = BumpVec::with_capacity_in(self.nodes.len(), arena);
        map.push(entry);
        for node in self.nodes.iter().skip(1) {
            let id = match node.kind {
                NodeKind::Parameter(index) => bind_parameter(index),
                _ => {
                    let position = match (&node.position, caller) {
                        (Some(own), Some(caller)) => Some(own.with_caller(caller)),
                        (Some(own), None) => Some(own.clone()),
                        (None, caller) => caller.cloned(),
                    };
                    target.push_raw(node.kind.clone(), node.value_kind, position)
                }
            };
            map.push(id);
        }
        self.link(target, &map);
        map
    }

    /// Restore inputs and control edges of copied nodes.
    fn link(&self, graph: &mut Graph, map: &[NodeId]) {
        for (index, node) in self.nodes.iter().enumerate() {
            if index != 0 && !matches!(node.kind, NodeKind::Parameter(_)) {
                let inputs = node.inputs.iter().map(|&i| map[i as usize]).collect();
                graph.set_inputs_raw(map[index], inputs);
            }
            for (slot, successor) in node.successors.iter().enumerate() {
                if let Some(successor) = successor {
                    graph.set_successor(map[index], slot, map[*successor as usize]);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::GraphAssembler;
    use crate::core::{Constant, Opcode};

    fn sample(track: bool) -> Graph {
        let def = DefinitionId::new("Math", "inc", "(I)I");
        let graph = Graph::for_definition(def.clone(), Options::default(), track);
        let mut asm = GraphAssembler::new(graph).with_position_context(SourcePosition::new(def, 3));
        let x = asm.parameter(0, ValueKind::Int);
        let one = asm.constant(Constant::Int(1));
        let dead = asm.constant(Constant::Int(7));
        let sum = asm.unique(NodeKind::Pure(Opcode::Add), ValueKind::Int, &[x, one]);
        asm.append_return(Some(sum));
        let mut graph = asm.finish();
        graph.delete(dead);
        graph
    }

    #[test]
    fn encoding_drops_tombstones() {
        let graph = sample(false);
        let arena = Bump::new();
        let encoded = EncodedGraph::encode(&graph, &arena);
        assert_eq!(encoded.node_count(), graph.node_count());
        assert_eq!(encoded.parameters(), vec![(0, ValueKind::Int)]);
    }

    #[test]
    fn decodes_are_independent() {
        let arena = Bump::new();
        let encoded = EncodedGraph::encode(&sample(false), &arena);
        let mut first = encoded.decode();
        let second = encoded.decode();
        let ret = first.nodes_where(|k| matches!(k, NodeKind::Return))[0];
        first.kill_cfg(ret);
        assert_eq!(second.count(|k| matches!(k, NodeKind::Return)), 1);
        assert!(second.verify().is_ok(), "{second}");
        assert_ne!(first.id(), second.id());
    }

    #[test]
    fn decode_into_binds_parameters_and_prefixes_positions() {
        let arena = Bump::new();
        let encoded = EncodedGraph::encode(&sample(true), &arena);
        assert!(encoded.tracks_positions());

        let caller_def = DefinitionId::new("App", "run", "()I");
        let mut target = Graph::for_definition(caller_def.clone(), Options::default(), true);
        let argument = target.constant(Constant::Int(41));
        let entry = target.start();
        let call_site = SourcePosition::new(caller_def.clone(), 12);
        let map = encoded.decode_into(&mut target, entry, |_| argument, Some(&call_site), &arena);

        let ret = map
            .iter()
            .copied()
            .find(|&id| matches!(target.kind(id), NodeKind::Return))
            .expect("return copied");
        assert_eq!(target.predecessor(ret), Some(entry));
        let sum = target.inputs(ret)[0];
        assert_eq!(target.inputs(sum)[0], argument);
        let position = target.node(sum).position().expect("tracked");
        assert_eq!(position.bci(), 3);
        assert_eq!(position.caller().map(|c| c.definition()), Some(&caller_def));
    }
}
