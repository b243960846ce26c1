//! Body provider backed by registered replacement plugins.

use super::{ReferenceGraphBuilder, ReplacementPlugin};
use crate::cache::{BodyProvider, BuildRequest};
use crate::core::{BuildError, BuildResult, DefinitionId, Graph};
use hashbrown::HashMap;
use std::sync::Arc;

/// Maps definitions to the plugins that build their reference graphs.
#[derive(Default)]
pub struct PluginBodyProvider {
    plugins: HashMap<DefinitionId, Arc<dyn ReplacementPlugin>>,
}

impl PluginBodyProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `plugin` for `definition`, replacing any earlier one.
    pub fn register(&mut self, definition: DefinitionId, plugin: Arc<dyn ReplacementPlugin>) {
        log::trace!("registered plugin for {definition}");
        self.plugins.insert(definition, plugin);
    }

    pub fn register_fn<F>(&mut self, definition: DefinitionId, plugin: F)
    where
        F: Fn(&mut ReferenceGraphBuilder<'_>) -> bool + Send + Sync + 'static,
    {
        self.register(definition, Arc::new(plugin));
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

impl BodyProvider for PluginBodyProvider {
    fn has_body(&self, definition: &DefinitionId) -> bool {
        self.plugins.contains_key(definition)
    }

    fn build(&self, request: &BuildRequest<'_>) -> BuildResult<Graph> {
        let plugin = self
            .plugins
            .get(request.definition.id())
            .ok_or_else(|| BuildError::NoBody {
                definition: request.definition.id().clone(),
            })?;
        ReferenceGraphBuilder::for_request(request).build(plugin.as_ref())
    }
}
