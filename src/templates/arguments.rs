//! Named arguments for template instantiation.

use crate::core::{Constant, NodeId};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentValue {
    Node(NodeId),
    Constant(Constant),
}

/// Ordered (parameter name, value) pairs.
#[derive(Debug, Clone, Default)]
pub struct Arguments {
    values: Vec<(Arc<str>, ArgumentValue)>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to a node of the target graph.
    pub fn add(mut self, name: &str, node: NodeId) -> Self {
        self.values.push((Arc::from(name), ArgumentValue::Node(node)));
        self
    }

    /// Bind `name` to a compile-time constant.
    pub fn add_const(mut self, name: &str, constant: Constant) -> Self {
        self.values
            .push((Arc::from(name), ArgumentValue::Constant(constant)));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ArgumentValue)> + '_ {
        self.values.iter().map(|(name, value)| (&**name, *value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
