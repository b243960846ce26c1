// This module holds ReplacementsRuntime, the process-wide state of the replacements core. It is
// created once when the worker pool starts, shared by Arc between all compilation sessions, and
// dropped at shutdown. It owns the body provider every cache build goes through, the optional
// construction scope that brackets those builds, the shared graph tier and the template
// registry. Both caches only grow through insert-if-absent publication; the runtime exposes no
// way to remove or overwrite an entry.

//! Process-wide replacements state.

use crate::cache::{BodyProvider, ConstructionScope, SharedGraphCache};
use crate::templates::TemplateRegistry;
use std::sync::Arc;

pub struct ReplacementsRuntime {
    provider: Arc<dyn BodyProvider>,
    scope: Option<Arc<dyn ConstructionScope>>,
    graphs: SharedGraphCache,
    templates: TemplateRegistry,
}

impl ReplacementsRuntime {
    pub fn new(provider: Arc<dyn BodyProvider>) -> Self {
        Self {
            provider,
            scope: None,
            graphs: SharedGraphCache::new(),
            templates: TemplateRegistry::new(),
        }
    }

    /// Bracket every cache build with `scope`.
    pub fn with_construction_scope(mut self, scope: Arc<dyn ConstructionScope>) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn provider(&self) -> &dyn BodyProvider {
        self.provider.as_ref()
    }

    pub fn construction_scope(&self) -> Option<&dyn ConstructionScope> {
        self.scope.as_deref()
    }

    pub fn shared_graphs(&self) -> &SharedGraphCache {
        &self.graphs
    }

    pub fn templates(&self) -> &TemplateRegistry {
        &self.templates
    }
}
