// Property tests for merge synthesis. Random trees of nested conditionals, whose leaves either
// fall through or end in a control sink, are assembled with the graph assembler. For every
// tree the test checks that a merge appears exactly where both branches of a conditional
// continue and that its ends are ordered consequent first. It also checks that the cursor
// lands on the surviving exit when only one branch continues, that reachability of the whole
// tree is preserved, and that the finished graph verifies.

//! Property tests for conditional merge synthesis.

mod common;

use proptest::prelude::*;
use replacements::core::{DeoptReason, FixedOp};
use replacements::{Graph, GraphAssembler, NodeKind, Options, ValueKind};

#[derive(Debug, Clone)]
enum Shape {
    Fallthrough,
    Sink,
    Cond(Box<Shape>, Box<Shape>),
}

fn reaches(shape: &Shape) -> bool {
    match shape {
        Shape::Fallthrough => true,
        Shape::Sink => false,
        Shape::Cond(a, b) => reaches(a) || reaches(b),
    }
}

fn expected_merges(shape: &Shape) -> usize {
    match shape {
        Shape::Cond(a, b) => {
            let own = usize::from(reaches(a) && reaches(b));
            own + expected_merges(a) + expected_merges(b)
        }
        _ => 0,
    }
}

fn shapes() -> impl Strategy<Value = Shape> {
    let leaf = prop_oneof![Just(Shape::Fallthrough), Just(Shape::Sink)];
    leaf.prop_recursive(5, 32, 2, |inner| {
        (inner.clone(), inner).prop_map(|(a, b)| Shape::Cond(Box::new(a), Box::new(b)))
    })
}

fn emit(asm: &mut GraphAssembler, shape: &Shape) -> Result<(), TestCaseError> {
    match shape {
        Shape::Fallthrough => {
            asm.append_node(NodeKind::Fixed(FixedOp::Checkpoint), ValueKind::Void, &[]);
        }
        Shape::Sink => {
            asm.append_deoptimize(DeoptReason::Unreached);
        }
        Shape::Cond(a, b) => {
            let cond = asm.parameter(0, ValueKind::Boolean);
            asm.start_conditional(cond, 0.5);
            asm.enter_consequent();
            emit(asm, a)?;
            let consequent_exit = asm.cursor();
            asm.enter_alternate();
            emit(asm, b)?;
            let alternate_exit = asm.cursor();
            let merge = asm.end_conditional();

            match (consequent_exit, alternate_exit) {
                (Some(x), Some(y)) => {
                    let merge = merge.ok_or_else(|| TestCaseError::fail("missing merge"))?;
                    let ends = asm.graph().merge_ends(merge).to_vec();
                    prop_assert_eq!(ends.len(), 2);
                    prop_assert_eq!(asm.graph().predecessor(ends[0]), Some(x));
                    prop_assert_eq!(asm.graph().predecessor(ends[1]), Some(y));
                    prop_assert_eq!(asm.cursor(), Some(merge));
                }
                (Some(only), None) | (None, Some(only)) => {
                    prop_assert_eq!(merge, None);
                    prop_assert_eq!(asm.cursor(), Some(only));
                }
                (None, None) => {
                    prop_assert_eq!(merge, None);
                    prop_assert_eq!(asm.cursor(), None);
                }
            }
        }
    }
    Ok(())
}

proptest! {
    #[test]
    fn merges_follow_branch_reachability(shape in shapes()) {
        common::init_logging();
        let mut asm = GraphAssembler::new(Graph::new(Options::default(), false));
        emit(&mut asm, &shape)?;

        prop_assert_eq!(asm.is_reachable(), reaches(&shape));
        prop_assert_eq!(asm.region_depth(), 0);
        if asm.is_reachable() {
            asm.append_return(None);
        }
        let graph = asm.finish();
        prop_assert_eq!(graph.count(|k| matches!(k, NodeKind::Merge)), expected_merges(&shape));
        prop_assert!(graph.verify().is_ok(), "{}", graph);
    }
}
