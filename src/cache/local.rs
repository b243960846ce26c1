//! Session-local graph cache tier.

use super::encoded::EncodedGraph;
use crate::core::DefinitionId;
use hashbrown::{HashMap, HashSet};
use std::sync::Arc;

/// Single-owner cache of one compilation session.
///
/// A session compiles under a single option set, so entries are keyed by
/// definition alone. Definitions found to have no body are remembered as
/// absent for the rest of the session.
#[derive(Default)]
pub struct LocalGraphCache {
    graphs: HashMap<DefinitionId, Arc<EncodedGraph>>,
    absent: HashSet<DefinitionId>,
}

impl LocalGraphCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, definition: &DefinitionId) -> Option<Arc<EncodedGraph>> {
        self.graphs.get(definition).cloned()
    }

    pub fn insert(&mut self, definition: DefinitionId, graph: Arc<EncodedGraph>) {
        self.graphs.insert(definition, graph);
    }

    pub fn is_known_absent(&self, definition: &DefinitionId) -> bool {
        self.absent.contains(definition)
    }

    pub fn mark_absent(&mut self, definition: DefinitionId) {
        self.absent.insert(definition);
    }

    pub fn len(&self) -> usize {
        self.graphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graphs.is_empty()
    }
}
