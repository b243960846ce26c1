//! Process-wide template registry.

use super::Template;
use crate::cache::EncodedGraph;
use crate::core::{options, Definition, DefinitionId, Options};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TemplateKey {
    definition: DefinitionId,
    options: Options,
}

/// Templates frozen per (definition, options), compared by option contents.
#[derive(Default)]
pub struct TemplateRegistry {
    templates: DashMap<TemplateKey, Arc<Template>>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the template for `definition` under `options`, freezing one
    /// from `build` on a miss.
    ///
    /// A published template without source positions is not handed to a
    /// caller that tracks them; such a caller gets a freshly built template,
    /// published only if the key is still vacant. With `UseTemplateCache`
    /// off nothing is published. `build` returning `None` means the
    /// definition has no usable graph.
    pub fn get(
        &self,
        definition: &Definition,
        options: &Options,
        track_positions: bool,
        build: impl FnOnce() -> Option<Arc<EncodedGraph>>,
    ) -> Option<Arc<Template>> {
        let key = TemplateKey {
            definition: definition.id().clone(),
            options: options.clone(),
        };
        let existing = self.templates.get(&key).map(|entry| Arc::clone(entry.value()));
        if let Some(existing) = existing {
            if !track_positions || existing.tracks_positions() {
                return Some(existing);
            }
            log::debug!(
                "template for {} has no source positions, building a tracked one",
                definition.id()
            );
        }

        let template = Arc::new(Template::new(definition.clone(), options.clone(), build()?));
        if !options.flag(options::USE_TEMPLATE_CACHE, true) {
            return Some(template);
        }
        match self.templates.entry(key) {
            Entry::Occupied(published) => {
                let published = Arc::clone(published.get());
                if track_positions && !published.tracks_positions() {
                    Some(template)
                } else {
                    Some(published)
                }
            }
            Entry::Vacant(slot) => {
                log::debug!("froze template for {}", definition.id());
                Some(Arc::clone(slot.insert(template).value()))
            }
        }
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
