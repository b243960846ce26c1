//! Local simplification: constant folding, algebraic identities and
//! removal of begins that no longer follow a split.

use super::Phase;
use crate::core::{Constant, Graph, NodeId, NodeKind, Opcode, ValueKind};

pub struct Canonicalize;

impl Phase for Canonicalize {
    fn name(&self) -> &'static str {
        "canonicalize"
    }

    fn apply(&self, graph: &mut Graph) -> bool {
        let mut changed = false;
        loop {
            let mut progress = false;
            for node in graph.nodes_where(|kind| matches!(kind, NodeKind::Pure(_))) {
                if !graph.contains(node) {
                    continue;
                }
                if let Some(replacement) = simplify(graph, node) {
                    graph.replace_at_usages(node, replacement);
                    graph.delete(node);
                    progress = true;
                }
            }
            for begin in graph.nodes_where(|kind| matches!(kind, NodeKind::Begin)) {
                if is_redundant_begin(graph, begin) {
                    graph.unlink_fixed(begin);
                    graph.delete(begin);
                    progress = true;
                }
            }
            if !progress {
                break;
            }
            changed = true;
        }
        graph.remove_dead_floating() > 0 || changed
    }
}

/// A begin is only needed directly below a split.
fn is_redundant_begin(graph: &Graph, begin: NodeId) -> bool {
    match graph.predecessor(begin) {
        Some(pred) => !graph.kind(pred).is_control_split() && graph.next(begin).is_some(),
        None => false,
    }
}

fn simplify(graph: &mut Graph, node: NodeId) -> Option<NodeId> {
    let NodeKind::Pure(op) = *graph.kind(node) else {
        return None;
    };
    let result = graph.value_kind(node);
    let inputs = graph.inputs(node).to_vec();
    let constants: Vec<Option<Constant>> = inputs.iter().map(|&i| graph.constant_value(i)).collect();

    if let Some(values) = constants.iter().copied().collect::<Option<Vec<_>>>() {
        if let Some(folded) = fold(op, result, &values) {
            return Some(graph.constant(folded));
        }
    }

    match (op, inputs.as_slice(), constants.as_slice()) {
        (Opcode::Negate | Opcode::Not, &[x], _) => match graph.kind(x) {
            NodeKind::Pure(inner) if *inner == op => Some(graph.inputs(x)[0]),
            _ => None,
        },
        (Opcode::Add | Opcode::Or | Opcode::Xor, &[x, y], [cx, cy]) => {
            if is_zero(*cy) {
                Some(x)
            } else if is_zero(*cx) {
                Some(y)
            } else {
                None
            }
        }
        (Opcode::Sub | Opcode::Shl | Opcode::Shr, &[x, _], [_, cy]) if is_zero(*cy) => Some(x),
        (Opcode::Mul, &[x, y], [cx, cy]) => {
            if is_one(*cy) {
                Some(x)
            } else if is_one(*cx) {
                Some(y)
            } else if is_zero(*cx) || is_zero(*cy) {
                Constant::zero(result).map(|zero| graph.constant(zero))
            } else {
                None
            }
        }
        (Opcode::And, _, [cx, cy]) if is_zero(*cx) || is_zero(*cy) => {
            Constant::zero(result).map(|zero| graph.constant(zero))
        }
        (Opcode::Equals, &[x, y], _) if x == y => Some(graph.constant(Constant::Boolean(true))),
        _ => None,
    }
}

fn is_zero(constant: Option<Constant>) -> bool {
    constant.is_some_and(Constant::is_zero)
}

fn is_one(constant: Option<Constant>) -> bool {
    constant.is_some_and(Constant::is_one)
}

/// Evaluate `op` over constant operands. Integral arithmetic wraps at the
/// width of `result` and shift counts are masked to it.
pub(crate) fn fold(op: Opcode, result: ValueKind, args: &[Constant]) -> Option<Constant> {
    match (op, args) {
        (Opcode::IsNull, [value]) => Some(Constant::Boolean(*value == Constant::Null)),
        (Opcode::Equals, [x, y]) => Some(Constant::Boolean(x == y)),
        (Opcode::LessThan, [x, y]) => Some(Constant::Boolean(x.as_long()? < y.as_long()?)),
        (Opcode::Not, [Constant::Boolean(b)]) => Some(Constant::Boolean(!b)),
        (Opcode::And, [Constant::Boolean(x), Constant::Boolean(y)]) => Some(Constant::Boolean(*x && *y)),
        (Opcode::Or, [Constant::Boolean(x), Constant::Boolean(y)]) => Some(Constant::Boolean(*x || *y)),
        (Opcode::Xor, [Constant::Boolean(x), Constant::Boolean(y)]) => Some(Constant::Boolean(x != y)),
        (Opcode::Negate, [x]) => narrow(result, x.as_long()?.wrapping_neg()),
        (Opcode::Not, [x]) => narrow(result, !x.as_long()?),
        (_, [x, y]) => {
            let (x, y) = (x.as_long()?, y.as_long()?);
            let mask = if result == ValueKind::Int { 31 } else { 63 };
            let value = match op {
                Opcode::Add => x.wrapping_add(y),
                Opcode::Sub => x.wrapping_sub(y),
                Opcode::Mul => x.wrapping_mul(y),
                Opcode::And => x & y,
                Opcode::Or => x | y,
                Opcode::Xor => x ^ y,
                Opcode::Shl => x << (y & mask),
                Opcode::Shr => x >> (y & mask),
                _ => return None,
            };
            narrow(result, value)
        }
        _ => None,
    }
}

fn narrow(kind: ValueKind, value: i64) -> Option<Constant> {
    match kind {
        ValueKind::Int => Some(Constant::Int(value as i32)),
        ValueKind::Long => Some(Constant::Long(value)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::GraphAssembler;
    use crate::core::Options;

    #[test]
    fn folds_wrapping_int_arithmetic() {
        let folded = fold(
            Opcode::Add,
            ValueKind::Int,
            &[Constant::Int(i32::MAX), Constant::Int(1)],
        );
        assert_eq!(folded, Some(Constant::Int(i32::MIN)));
        let shifted = fold(Opcode::Shl, ValueKind::Int, &[Constant::Int(1), Constant::Int(33)]);
        assert_eq!(shifted, Some(Constant::Int(2)));
    }

    #[test]
    fn folds_comparisons() {
        let lt = fold(
            Opcode::LessThan,
            ValueKind::Boolean,
            &[Constant::Long(-1), Constant::Long(3)],
        );
        assert_eq!(lt, Some(Constant::Boolean(true)));
        let null = fold(Opcode::IsNull, ValueKind::Boolean, &[Constant::Null]);
        assert_eq!(null, Some(Constant::Boolean(true)));
    }

    #[test]
    fn collapses_constant_expression_feeding_return() {
        let mut asm = GraphAssembler::new(Graph::new(Options::default(), false));
        let two = asm.constant(Constant::Int(2));
        let three = asm.constant(Constant::Int(3));
        let sum = asm.unique(NodeKind::Pure(Opcode::Add), ValueKind::Int, &[two, three]);
        let ret = asm.append_return(Some(sum));
        let mut graph = asm.finish();

        assert!(Canonicalize.apply(&mut graph));
        let value = graph.inputs(ret)[0];
        assert_eq!(graph.constant_value(value), Some(Constant::Int(5)));
        assert_eq!(graph.count(|k| matches!(k, NodeKind::Pure(_))), 0);
        assert_eq!(graph.count(|k| matches!(k, NodeKind::Constant(_))), 1);
    }

    #[test]
    fn adding_zero_is_identity() {
        let mut asm = GraphAssembler::new(Graph::new(Options::default(), false));
        let x = asm.parameter(0, ValueKind::Long);
        let zero = asm.constant(Constant::Long(0));
        let sum = asm.unique(NodeKind::Pure(Opcode::Add), ValueKind::Long, &[zero, x]);
        let ret = asm.append_return(Some(sum));
        let mut graph = asm.finish();

        Canonicalize.apply(&mut graph);
        assert_eq!(graph.inputs(ret), &[x]);
    }
}
