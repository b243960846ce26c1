// This test suite exercises the graph assembler through its public surface: nested
// conditionals whose branches end in control sinks, exception dispatch regions nested inside
// conditionals, and the fail-fast behaviour of structural misuse. Merge synthesis is checked
// end to end: join nodes appear exactly when both exits are reachable, their ends are ordered
// consequent first, and every finished graph passes structural verification.

//! Integration tests for the graph assembler.

mod common;

use replacements::core::{DeoptReason, FixedOp, Opcode};
use replacements::{DefinitionId, Graph, GraphAssembler, NodeKind, Options, ValueKind};

fn checkpoint(asm: &mut GraphAssembler) -> replacements::NodeId {
    asm.append_node(NodeKind::Fixed(FixedOp::Checkpoint), ValueKind::Void, &[])
}

fn new_assembler() -> GraphAssembler {
    common::init_logging();
    GraphAssembler::new(Graph::new(Options::default(), false))
}

#[test]
fn consequent_sink_leaves_alternate_exit_and_no_merge() {
    let mut asm = new_assembler();
    let cond = asm.parameter(0, ValueKind::Boolean);
    asm.start_conditional(cond, 0.5);
    asm.enter_consequent();
    asm.append_deoptimize(DeoptReason::TransferToInterpreter);
    asm.enter_alternate();
    let exit = checkpoint(&mut asm);

    assert_eq!(asm.end_conditional(), None);
    assert_eq!(asm.cursor(), Some(exit));
    assert_eq!(asm.graph().count(|k| matches!(k, NodeKind::Merge)), 0);
}

#[test]
fn nested_sink_does_not_leak_into_outer_merge() {
    let mut asm = new_assembler();
    let outer = asm.parameter(0, ValueKind::Boolean);
    let inner = asm.parameter(1, ValueKind::Boolean);

    asm.start_conditional(outer, 0.5);
    asm.enter_consequent();
    asm.start_conditional(inner, 0.9);
    asm.enter_consequent();
    asm.append_deoptimize(DeoptReason::BoundsCheck);
    asm.enter_alternate();
    let inner_exit = checkpoint(&mut asm);
    assert_eq!(asm.end_conditional(), None);
    assert_eq!(asm.cursor(), Some(inner_exit));
    asm.enter_alternate();
    let outer_alt_exit = checkpoint(&mut asm);
    let merge = asm.end_conditional().expect("both outer branches continue");

    let ends = asm.graph().merge_ends(merge).to_vec();
    assert_eq!(ends.len(), 2);
    assert_eq!(asm.graph().predecessor(ends[0]), Some(inner_exit));
    assert_eq!(asm.graph().predecessor(ends[1]), Some(outer_alt_exit));

    asm.append_return(None);
    let graph = asm.finish();
    assert!(graph.verify().is_ok(), "{graph}");
    assert_eq!(graph.count(|k| matches!(k, NodeKind::Merge)), 1);
}

#[test]
fn all_paths_sinking_makes_outer_region_unreachable() {
    let mut asm = new_assembler();
    let a = asm.parameter(0, ValueKind::Boolean);
    let b = asm.parameter(1, ValueKind::Boolean);

    asm.start_conditional(a, 0.5);
    asm.enter_consequent();
    asm.start_conditional(b, 0.5);
    asm.enter_consequent();
    asm.append_return(None);
    asm.enter_alternate();
    asm.append_deoptimize(DeoptReason::Unreached);
    asm.end_conditional();
    asm.enter_alternate();
    asm.append_return(None);
    assert_eq!(asm.end_conditional(), None);
    assert!(!asm.is_reachable());
    assert!(asm.finish().verify().is_ok());
}

#[test]
fn dispatch_nested_in_conditional_merges_with_alternate() {
    let mut asm = new_assembler();
    let cond = asm.parameter(0, ValueKind::Boolean);
    let x = asm.parameter(1, ValueKind::Int);

    asm.start_conditional(cond, 0.5);
    asm.enter_consequent();
    let call = asm.start_exception_dispatch(DefinitionId::new("Io", "read", "(I)I"), &[x], ValueKind::Int);
    asm.enter_normal_edge();
    let normal_exit = checkpoint(&mut asm);
    asm.enter_exceptional_edge();
    let exception = asm.exception_object();
    asm.append_unwind(exception);
    assert_eq!(asm.end_exception_dispatch(), None);
    assert_eq!(asm.cursor(), Some(normal_exit));
    asm.enter_alternate();
    let merge = asm.end_conditional().expect("both continue");

    let one = asm.constant(replacements::Constant::Int(1));
    let value = asm.phi(merge, ValueKind::Int, &[call, one]);
    let sum = asm.unique(NodeKind::Pure(Opcode::Add), ValueKind::Int, &[value, x]);
    asm.append_return(Some(sum));
    let graph = asm.finish();
    assert!(graph.verify().is_ok(), "{graph}");
    assert_eq!(graph.count(|k| matches!(k, NodeKind::Unwind)), 1);
}

#[test]
fn closing_the_wrong_kind_fails_before_touching_the_graph() {
    let mut asm = new_assembler();
    let cond = asm.parameter(0, ValueKind::Boolean);
    asm.start_conditional(cond, 0.5);
    let before = asm.graph().node_count();
    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        asm.enter_normal_edge();
    }));
    assert!(outcome.is_err());
    assert_eq!(asm.graph().node_count(), before);
    assert_eq!(asm.region_depth(), 1);
}

#[test]
fn out_of_order_branch_entry_is_rejected() {
    let mut asm = new_assembler();
    let cond = asm.parameter(0, ValueKind::Boolean);
    asm.start_conditional(cond, 0.5);
    asm.enter_alternate();
    let alternate_exit = checkpoint(&mut asm);
    let before = asm.graph().node_count();
    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        asm.enter_consequent();
    }));
    assert!(outcome.is_err());
    assert_eq!(asm.graph().node_count(), before);
    assert_eq!(asm.cursor(), Some(alternate_exit));

    let merge = asm.end_conditional().expect("both branches continue");
    assert_eq!(asm.graph().merge_ends(merge).len(), 2);
}

#[test]
#[should_panic(expected = "cannot enter the normal edge")]
fn normal_edge_after_exceptional_edge_panics() {
    let mut asm = new_assembler();
    asm.start_exception_dispatch(DefinitionId::new("Io", "sync", "()V"), &[], ValueKind::Void);
    asm.enter_exceptional_edge();
    asm.enter_normal_edge();
}

#[test]
#[should_panic(expected = "is not a live node")]
fn appending_a_foreign_node_panics() {
    let mut other = Graph::new(Options::default(), false);
    let foreign = other.add(NodeKind::Fixed(FixedOp::Checkpoint), ValueKind::Void, &[]);
    let mut asm = new_assembler();
    asm.append(foreign);
}

#[test]
fn positions_are_tagged_only_when_tracked() {
    let def = DefinitionId::new("Str", "len", "()I");
    let position = replacements::SourcePosition::new(def.clone(), 7);

    let mut tracked = GraphAssembler::new(Graph::new(Options::default(), true))
        .with_position_context(position.clone());
    let node = checkpoint(&mut tracked);
    assert_eq!(tracked.graph().node(node).position().map(|p| p.bci()), Some(7));

    let mut untracked = GraphAssembler::new(Graph::new(Options::default(), false))
        .with_position_context(position);
    let node = checkpoint(&mut untracked);
    assert!(untracked.graph().node(node).position().is_none());
}
