//! Process-wide graph cache tier.

use super::encoded::EncodedGraph;
use crate::core::{DefinitionId, Options};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

/// Shared-tier key. Options compare by contents.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub definition: DefinitionId,
    pub options: Options,
}

impl CacheKey {
    pub fn new(definition: DefinitionId, options: Options) -> Self {
        Self {
            definition,
            options,
        }
    }
}

/// Insert-only map of frozen graphs shared by all sessions.
///
/// Entries are never replaced or removed. Concurrent builders of the same
/// key race in [`SharedGraphCache::publish`] and every one of them walks
/// away with the first published graph.
#[derive(Default)]
pub struct SharedGraphCache {
    entries: DashMap<CacheKey, Arc<EncodedGraph>>,
}

impl SharedGraphCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<EncodedGraph>> {
        self.entries.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// Publish `graph` unless an entry already exists; returns the entry
    /// that is in the cache afterwards.
    pub fn publish(&self, key: CacheKey, graph: Arc<EncodedGraph>) -> Arc<EncodedGraph> {
        match self.entries.entry(key) {
            Entry::Occupied(existing) => {
                log::debug!(
                    "lost publication race for {}, discarding redundant build",
                    existing.key().definition
                );
                Arc::clone(existing.get())
            }
            Entry::Vacant(slot) => {
                log::debug!("published graph for {}", slot.key().definition);
                Arc::clone(slot.insert(graph).value())
            }
        }
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
