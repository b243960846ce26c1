//! Global value numbering of floating nodes.

use super::Phase;
use crate::core::{Constant, Graph, NodeId, NodeKind, Opcode, ValueKind};
use hashbrown::HashMap;

pub struct GlobalValueNumbering;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ValueKey {
    Constant(Constant),
    Parameter(u32),
    Pure(Opcode, ValueKind, Vec<NodeId>),
}

impl ValueKey {
    fn of(graph: &Graph, node: NodeId) -> Option<ValueKey> {
        match graph.kind(node) {
            NodeKind::Constant(c) => Some(ValueKey::Constant(*c)),
            NodeKind::Parameter(index) => Some(ValueKey::Parameter(*index)),
            NodeKind::Pure(op) => {
                let mut inputs = graph.inputs(node).to_vec();
                if op.is_commutative() {
                    inputs.sort();
                }
                Some(ValueKey::Pure(*op, graph.value_kind(node), inputs))
            }
            _ => None,
        }
    }
}

impl Phase for GlobalValueNumbering {
    fn name(&self) -> &'static str {
        "gvn"
    }

    fn apply(&self, graph: &mut Graph) -> bool {
        let mut replaced = 0usize;
        loop {
            let mut table: HashMap<ValueKey, NodeId> = HashMap::new();
            let mut progress = false;
            for node in graph.nodes_where(NodeKind::is_value_numberable) {
                if !graph.contains(node) {
                    continue;
                }
                let Some(key) = ValueKey::of(graph, node) else {
                    continue;
                };
                match table.get(&key) {
                    Some(&leader) => {
                        graph.replace_at_usages(node, leader);
                        graph.delete(node);
                        replaced += 1;
                        progress = true;
                    }
                    None => {
                        table.insert(key, node);
                    }
                }
            }
            if !progress {
                break;
            }
        }
        if replaced > 0 {
            log::trace!("gvn replaced {replaced} nodes");
        }
        replaced > 0
    }
}
