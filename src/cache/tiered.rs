// This module implements the two-tier graph lookup used while a session lowers calls. The
// session-local tier is consulted first and needs no synchronization. On a local miss the
// body provider is asked whether the definition has a body at all; a definition without one
// is remembered as absent for the rest of the session only, so the shared tier never holds
// negative entries. Otherwise the shared tier is consulted by (definition, options). A miss
// there builds the graph under the runtime's construction scope (provider build, the phase
// suite for the options, encoding) and publishes it insert-if-absent, keeping whichever graph
// won the race. A shared entry built without source positions cannot serve a session that
// tracks them, so such a session rebuilds with tracking and keeps the result to itself. Every
// graph a lookup returns is also stored in the local tier. Failed builds are logged and
// produce no entry in either tier.

//! Local → shared → build lookup.

use super::encoded::EncodedGraph;
use super::local::LocalGraphCache;
use super::provider::BuildRequest;
use super::scope::within_scope;
use super::shared::CacheKey;
use crate::core::BuildResult;
use crate::passes::PhaseSuite;
use crate::runtime::ReplacementsRuntime;
use bumpalo::Bump;
use std::sync::Arc;

/// Which tier answered a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupSource {
    Local,
    /// Absence already recorded by this session.
    KnownAbsent,
    NoBody,
    Shared,
    /// Built by this lookup and published (or lost the race to an equal build).
    Built,
    /// Rebuilt with position tracking, kept session-local.
    Rebuilt,
    Failed,
}

#[derive(Debug, Clone)]
pub struct Lookup {
    pub graph: Option<Arc<EncodedGraph>>,
    pub source: LookupSource,
}

impl Lookup {
    fn found(graph: Arc<EncodedGraph>, source: LookupSource) -> Self {
        Self {
            graph: Some(graph),
            source,
        }
    }

    fn absent(source: LookupSource) -> Self {
        Self {
            graph: None,
            source,
        }
    }
}

/// Resolve the graph for `request`, building and publishing it if needed.
pub fn lookup(
    runtime: &ReplacementsRuntime,
    local: &mut LocalGraphCache,
    request: &BuildRequest<'_>,
    arena: &Bump,
) -> Lookup {
    let id = request.definition.id();
    if let Some(graph) = local.get(id) {
        log::trace!("local hit for {id}");
        return Lookup::found(graph, LookupSource::Local);
    }
    if local.is_known_absent(id) {
        return Lookup::absent(LookupSource::KnownAbsent);
    }
    if !runtime.provider().has_body(id) {
        log::debug!("{id} has no body");
        local.mark_absent(id.clone());
        return Lookup::absent(LookupSource::NoBody);
    }

    let key = CacheKey::new(id.clone(), request.options.clone());
    let shared = runtime.shared_graphs().get(&key);
    let (graph, source) = match shared {
        Some(shared) if request.track_positions && !shared.tracks_positions() => {
            log::debug!("rebuilding {id} with source positions for this session");
            match build_encoded(runtime, request, arena) {
                Ok(graph) => (Arc::new(graph), LookupSource::Rebuilt),
                Err(err) => {
                    log::debug!("rebuild of {id} failed: {err}");
                    return Lookup::absent(LookupSource::Failed);
                }
            }
        }
        Some(shared) => {
            log::trace!("shared hit for {id}");
            (shared, LookupSource::Shared)
        }
        None => match build_encoded(runtime, request, arena) {
            Ok(graph) => {
                let built = Arc::new(graph);
                let winner = runtime.shared_graphs().publish(key, Arc::clone(&built));
                if request.track_positions && !winner.tracks_positions() {
                    (built, LookupSource::Rebuilt)
                } else {
                    (winner, LookupSource::Built)
                }
            }
            Err(err) => {
                log::debug!("build of {id} failed: {err}");
                return Lookup::absent(LookupSource::Failed);
            }
        },
    };
    local.insert(id.clone(), Arc::clone(&graph));
    Lookup::found(graph, source)
}

/// Build, simplify and encode one graph inside the construction scope.
pub fn build_encoded(
    runtime: &ReplacementsRuntime,
    request: &BuildRequest<'_>,
    arena: &Bump,
) -> BuildResult<EncodedGraph> {
    let id = request.definition.id();
    within_scope(runtime.construction_scope(), id, || {
        log::debug!(
            "building {id}{}",
            if request.track_positions { " with positions" } else { "" }
        );
        let mut graph = runtime.provider().build(request)?;
        PhaseSuite::for_options(request.options).run(&mut graph);
        Ok(EncodedGraph::encode(&graph, arena))
    })
}
