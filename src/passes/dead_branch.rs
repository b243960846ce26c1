//! Removal of branches whose condition is a known constant.

use super::Phase;
use crate::core::{FixedOp, Graph, NodeKind};

pub struct DeadBranchReduction;

impl Phase for DeadBranchReduction {
    fn name(&self) -> &'static str {
        "dead-branch"
    }

    fn apply(&self, graph: &mut Graph) -> bool {
        let mut changed = false;
        for split in graph.nodes_where(|kind| matches!(kind, NodeKind::If { .. })) {
            if !graph.contains(split) {
                continue;
            }
            let condition = graph.inputs(split)[0];
            let Some(taken) = graph.constant_value(condition).and_then(|c| c.as_bool()) else {
                continue;
            };
            let (live_slot, dead_slot) = if taken { (0, 1) } else { (1, 0) };

            let checkpoints_before = count_checkpoints(graph);
            if let Some(dead) = graph.clear_successor(split, dead_slot) {
                graph.kill_cfg(dead);
            }
            let survivor = graph.clear_successor(split, live_slot);
            let freed = graph.detach(split);
            graph.delete(split);
            if let (Some((pred, slot)), Some(survivor)) = (freed, survivor) {
                graph.set_successor(pred, slot, survivor);
            }
            graph.remove_dead_floating();

            let removed = checkpoints_before - count_checkpoints(graph);
            if removed > 0 {
                log::debug!("dead branch at {split} removed {removed} checkpoints");
            }
            changed = true;
        }
        changed
    }
}

fn count_checkpoints(graph: &Graph) -> usize {
    graph.count(|kind| matches!(kind, NodeKind::Fixed(FixedOp::Checkpoint)))
}
