//! Source positions attached to nodes of position-tracking graphs.
//!
//! A position names a definition and a bytecode index within it, and
//! optionally the caller position it was inlined into. Positions are only
//! recorded when the owning graph tracks them; tracking cannot be added to a
//! graph after it has been built.

use super::definition::DefinitionId;
use std::fmt;
use std::sync::Arc;

#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SourcePosition {
    definition: DefinitionId,
    bci: u32,
    caller: Option<Arc<SourcePosition>>,
}

impl SourcePosition {
    pub fn new(definition: DefinitionId, bci: u32) -> Self {
        Self {
            definition,
            bci,
            caller: None,
        }
    }

    pub fn definition(&self) -> &DefinitionId {
        &self.definition
    }

    pub fn bci(&self) -> u32 {
        self.bci
    }

    pub fn caller(&self) -> Option<&SourcePosition> {
        self.caller.as_deref()
    }

    /// Re-root this position under `caller`, keeping any existing chain.
    pub fn with_caller(&self, caller: &SourcePosition) -> SourcePosition {
        let caller = match &self.caller {
            Some(existing) => existing.with_caller(caller),
            None => caller.clone(),
        };
        SourcePosition {
            definition: self.definition.clone(),
            bci: self.bci,
            caller: Some(Arc::new(caller)),
        }
    }

    /// Number of frames in the chain, this one included.
    pub fn depth(&self) -> usize {
        1 + self.caller.as_ref().map_or(0, |c| c.depth())
    }
}

impl fmt::Debug for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.definition, self.bci)?;
        if let Some(caller) = &self.caller {
            write!(f, " <- {caller:?}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caller_chain_is_appended_at_the_root() {
        let inner = SourcePosition::new(DefinitionId::new("A", "a", "()V"), 3);
        let mid = SourcePosition::new(DefinitionId::new("B", "b", "()V"), 7);
        let outer = SourcePosition::new(DefinitionId::new("C", "c", "()V"), 11);

        let chained = inner.with_caller(&mid).with_caller(&outer);
        assert_eq!(chained.depth(), 3);
        assert_eq!(chained.caller().unwrap().bci(), 7);
        assert_eq!(chained.caller().unwrap().caller().unwrap().bci(), 11);
    }
}
