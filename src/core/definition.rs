// This module defines how a replaced operation is identified and described. DefinitionId is
// the stable identity of a reference definition (holder, name, descriptor) and is what every
// cache in the crate keys on; it is built purely from strings so two processes that record and
// replay compilations agree on it. Definition adds the declared shape the builders need: the
// ordered parameter list with names and value kinds, and the declared return kind that the
// reference-graph builder checks its single return slot against. ValueKind is the small kind
// lattice shared with the IR graph's node stamps.

//! Definition identity and declared signatures.

use std::fmt;
use std::sync::Arc;

/// Kind of value a node produces, or that a definition returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValueKind {
    Void,
    Boolean,
    Int,
    Long,
    Object,
}

impl ValueKind {
    pub fn is_void(self) -> bool {
        self == ValueKind::Void
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, ValueKind::Int | ValueKind::Long)
    }

    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Void => "void",
            ValueKind::Boolean => "boolean",
            ValueKind::Int => "int",
            ValueKind::Long => "long",
            ValueKind::Object => "object",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Stable identity of "what is being replaced".
///
/// Equality and hashing are over the three strings only, never over the
/// address of any in-memory object, so an identity recorded in one process
/// matches the same definition looked up in another.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DefinitionId {
    holder: Arc<str>,
    name: Arc<str>,
    descriptor: Arc<str>,
}

impl DefinitionId {
    pub fn new(holder: &str, name: &str, descriptor: &str) -> Self {
        Self {
            holder: Arc::from(holder),
            name: Arc::from(name),
            descriptor: Arc::from(descriptor),
        }
    }

    pub fn holder(&self) -> &str {
        &self.holder
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }
}

impl fmt::Display for DefinitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}{}", self.holder, self.name, self.descriptor)
    }
}

impl fmt::Debug for DefinitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DefinitionId({self})")
    }
}

/// A declared parameter of a definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParameterSpec {
    pub name: Arc<str>,
    pub kind: ValueKind,
}

/// A reference definition together with its declared signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Definition {
    id: DefinitionId,
    parameters: Vec<ParameterSpec>,
    return_kind: ValueKind,
}

impl Definition {
    pub fn new(id: DefinitionId, return_kind: ValueKind) -> Self {
        Self {
            id,
            parameters: Vec::new(),
            return_kind,
        }
    }

    /// Append a declared parameter.
    ///
    /// Parameter kinds may not be `Void` and names must be unique; both are
    /// checked here rather than when the definition is first built.
    pub fn with_parameter(mut self, name: &str, kind: ValueKind) -> Self {
        assert!(!kind.is_void(), "parameter `{name}` of {} declared void", self.id);
        assert!(
            self.parameters.iter().all(|p| &*p.name != name),
            "duplicate parameter `{name}` in {}",
            self.id
        );
        self.parameters.push(ParameterSpec {
            name: Arc::from(name),
            kind,
        });
        self
    }

    pub fn id(&self) -> &DefinitionId {
        &self.id
    }

    pub fn parameters(&self) -> &[ParameterSpec] {
        &self.parameters
    }

    pub fn parameter_index(&self, name: &str) -> Option<usize> {
        self.parameters.iter().position(|p| &*p.name == name)
    }

    pub fn return_kind(&self) -> ValueKind {
        self.return_kind
    }
}
