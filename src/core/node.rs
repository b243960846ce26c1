// This module defines the node vocabulary of the replacement IR graph. Control nodes form the
// fixed skeleton of a graph: Start, Begin (entry of a split successor), End/Merge (control
// joins), If and Invoke (two-way splits), ExceptionObject (entry of an exceptional edge), the
// control sinks Return/Unwind/Deoptimize, and Fixed operations that sit in the control chain
// (calls, memory access, state checkpoints). Floating nodes (constants, parameters, phis and
// pure arithmetic) hang off the skeleton through data inputs only. NodeKind carries the
// classification queries the assembler and passes rely on: how many successors a node has,
// whether appending it leaves an insertion point, and whether it can be value-numbered.

//! IR node kinds and per-node storage.

use super::definition::{DefinitionId, ValueKind};
use super::position::SourcePosition;
use std::fmt;
use std::sync::Arc;

/// Identity of a graph; node ids carry it so cross-graph use is caught.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GraphId(pub(crate) u32);

/// Reference to a node of a specific graph.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    pub(crate) graph: GraphId,
    pub(crate) index: u32,
}

impl NodeId {
    pub fn graph(self) -> GraphId {
        self.graph
    }

    pub fn index(self) -> usize {
        self.index as usize
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.index)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.index)
    }
}

/// Compile-time constant values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Constant {
    Boolean(bool),
    Int(i32),
    Long(i64),
    Null,
}

impl Constant {
    pub fn kind(self) -> ValueKind {
        match self {
            Constant::Boolean(_) => ValueKind::Boolean,
            Constant::Int(_) => ValueKind::Int,
            Constant::Long(_) => ValueKind::Long,
            Constant::Null => ValueKind::Object,
        }
    }

    pub fn as_bool(self) -> Option<bool> {
        match self {
            Constant::Boolean(b) => Some(b),
            _ => None,
        }
    }

    /// Integral value widened to `i64`.
    pub fn as_long(self) -> Option<i64> {
        match self {
            Constant::Int(i) => Some(i64::from(i)),
            Constant::Long(l) => Some(l),
            _ => None,
        }
    }

    pub fn is_zero(self) -> bool {
        self.as_long() == Some(0)
    }

    pub fn is_one(self) -> bool {
        self.as_long() == Some(1)
    }

    /// Zero constant of an integral kind.
    pub fn zero(kind: ValueKind) -> Option<Constant> {
        match kind {
            ValueKind::Int => Some(Constant::Int(0)),
            ValueKind::Long => Some(Constant::Long(0)),
            _ => None,
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Boolean(b) => write!(f, "{b}"),
            Constant::Int(i) => write!(f, "{i}i"),
            Constant::Long(l) => write!(f, "{l}l"),
            Constant::Null => f.write_str("null"),
        }
    }
}

/// Side-effect free operations; always floating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Opcode {
    Add,
    Sub,
    Mul,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    Negate,
    Not,
    Equals,
    LessThan,
    IsNull,
}

impl Opcode {
    pub fn arity(self) -> usize {
        match self {
            Opcode::Negate | Opcode::Not | Opcode::IsNull => 1,
            _ => 2,
        }
    }

    pub fn is_commutative(self) -> bool {
        matches!(
            self,
            Opcode::Add | Opcode::Mul | Opcode::And | Opcode::Or | Opcode::Xor | Opcode::Equals
        )
    }

    pub fn is_comparison(self) -> bool {
        matches!(self, Opcode::Equals | Opcode::LessThan | Opcode::IsNull)
    }

    pub fn name(self) -> &'static str {
        match self {
            Opcode::Add => "add",
            Opcode::Sub => "sub",
            Opcode::Mul => "mul",
            Opcode::And => "and",
            Opcode::Or => "or",
            Opcode::Xor => "xor",
            Opcode::Shl => "shl",
            Opcode::Shr => "shr",
            Opcode::Negate => "neg",
            Opcode::Not => "not",
            Opcode::Equals => "eq",
            Opcode::LessThan => "lt",
            Opcode::IsNull => "isnull",
        }
    }
}

/// Operations that live in the control chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FixedOp {
    /// Call without an exception edge.
    Call(DefinitionId),
    Load(Arc<str>),
    Store(Arc<str>),
    /// Captures execution state for deoptimization.
    Checkpoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeoptReason {
    Unreached,
    NullCheck,
    BoundsCheck,
    TypeCheck,
    TransferToInterpreter,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Start,
    Begin,
    End,
    Merge,
    /// Inputs: `[condition]`. Successors: `[consequent, alternate]`.
    If { probability: f64 },
    /// Inputs: arguments. Successors: `[normal begin, exception object]`.
    Invoke { target: DefinitionId },
    ExceptionObject,
    Return,
    Unwind,
    Deoptimize(DeoptReason),
    Fixed(FixedOp),
    Constant(Constant),
    Parameter(u32),
    /// Inputs: `[merge, value per merge end...]`.
    Phi,
    Pure(Opcode),
}

impl NodeKind {
    pub fn is_floating(&self) -> bool {
        matches!(
            self,
            NodeKind::Constant(_) | NodeKind::Parameter(_) | NodeKind::Phi | NodeKind::Pure(_)
        )
    }

    pub fn is_fixed(&self) -> bool {
        !self.is_floating()
    }

    /// Fixed nodes with exactly one control successor slot.
    pub fn is_fixed_with_next(&self) -> bool {
        matches!(
            self,
            NodeKind::Start
                | NodeKind::Begin
                | NodeKind::Merge
                | NodeKind::ExceptionObject
                | NodeKind::Fixed(_)
        )
    }

    pub fn is_control_split(&self) -> bool {
        matches!(self, NodeKind::If { .. } | NodeKind::Invoke { .. })
    }

    /// Terminal nodes after which nothing can be appended on the same path.
    pub fn is_control_sink(&self) -> bool {
        matches!(
            self,
            NodeKind::Return | NodeKind::Unwind | NodeKind::Deoptimize(_)
        )
    }

    /// Nodes that may start a successor path of a split.
    pub fn is_begin(&self) -> bool {
        matches!(self, NodeKind::Begin | NodeKind::ExceptionObject)
    }

    pub fn successor_count(&self) -> usize {
        if self.is_fixed_with_next() {
            1
        } else if self.is_control_split() {
            2
        } else {
            0
        }
    }

    /// Floating nodes that can be shared by value.
    pub fn is_value_numberable(&self) -> bool {
        matches!(
            self,
            NodeKind::Constant(_) | NodeKind::Parameter(_) | NodeKind::Pure(_)
        )
    }

    pub fn as_constant(&self) -> Option<Constant> {
        match self {
            NodeKind::Constant(c) => Some(*c),
            _ => None,
        }
    }

    pub fn name(&self) -> String {
        match self {
            NodeKind::Start => "start".into(),
            NodeKind::Begin => "begin".into(),
            NodeKind::End => "end".into(),
            NodeKind::Merge => "merge".into(),
            NodeKind::If { probability } => format!("if p={probability}"),
            NodeKind::Invoke { target } => format!("invoke {target}"),
            NodeKind::ExceptionObject => "exception".into(),
            NodeKind::Return => "return".into(),
            NodeKind::Unwind => "unwind".into(),
            NodeKind::Deoptimize(reason) => format!("deopt {reason:?}"),
            NodeKind::Fixed(FixedOp::Call(target)) => format!("call {target}"),
            NodeKind::Fixed(FixedOp::Load(field)) => format!("load {field}"),
            NodeKind::Fixed(FixedOp::Store(field)) => format!("store {field}"),
            NodeKind::Fixed(FixedOp::Checkpoint) => "checkpoint".into(),
            NodeKind::Constant(c) => format!("const {c}"),
            NodeKind::Parameter(i) => format!("param {i}"),
            NodeKind::Phi => "phi".into(),
            NodeKind::Pure(op) => op.name().into(),
        }
    }
}

/// Storage for a single node.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) value_kind: ValueKind,
    pub(crate) inputs: Vec<NodeId>,
    pub(crate) successors: Vec<Option<NodeId>>,
    pub(crate) predecessor: Option<NodeId>,
    pub(crate) position: Option<SourcePosition>,
    pub(crate) deleted: bool,
}

impl Node {
    pub(crate) fn new(kind: NodeKind, value_kind: ValueKind) -> Self {
        let successors = vec![None; kind.successor_count()];
        Self {
            kind,
            value_kind,
            inputs: Vec::new(),
            successors,
            predecessor: None,
            position: None,
            deleted: false,
        }
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn value_kind(&self) -> ValueKind {
        self.value_kind
    }

    pub fn inputs(&self) -> &[NodeId] {
        &self.inputs
    }

    pub fn successors(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.successors.iter().flatten().copied()
    }

    pub fn successor(&self, slot: usize) -> Option<NodeId> {
        self.successors.get(slot).copied().flatten()
    }

    pub fn predecessor(&self) -> Option<NodeId> {
        self.predecessor
    }

    pub fn position(&self) -> Option<&SourcePosition> {
        self.position.as_ref()
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_is_exclusive() {
        let kinds = [
            NodeKind::Start,
            NodeKind::Begin,
            NodeKind::End,
            NodeKind::Merge,
            NodeKind::If { probability: 0.5 },
            NodeKind::Invoke {
                target: DefinitionId::new("A", "b", "()V"),
            },
            NodeKind::ExceptionObject,
            NodeKind::Return,
            NodeKind::Unwind,
            NodeKind::Deoptimize(DeoptReason::Unreached),
            NodeKind::Fixed(FixedOp::Checkpoint),
            NodeKind::Constant(Constant::Int(1)),
            NodeKind::Parameter(0),
            NodeKind::Phi,
            NodeKind::Pure(Opcode::Add),
        ];
        for kind in &kinds {
            let classes = [
                kind.is_floating(),
                kind.is_fixed_with_next(),
                kind.is_control_split(),
                kind.is_control_sink(),
                matches!(kind, NodeKind::End),
            ];
            assert_eq!(
                classes.iter().filter(|c| **c).count(),
                1,
                "{} must fall into exactly one class",
                kind.name()
            );
        }
    }

    #[test]
    fn constant_helpers() {
        assert_eq!(Constant::Int(7).as_long(), Some(7));
        assert!(Constant::Long(0).is_zero());
        assert!(Constant::Int(1).is_one());
        assert_eq!(Constant::Null.kind(), ValueKind::Object);
        assert_eq!(Constant::zero(ValueKind::Boolean), None);
    }
}
