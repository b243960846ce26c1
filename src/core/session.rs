// This module provides the compilation session, the per-task view of the replacements core. A
// CompilationSession borrows an arena owned by the embedding compiler, holds the process-wide
// runtime by Arc, and fixes the option set and source-position mode for everything the task
// looks up. Graph lookups go through the tiered cache with the session-local tier held here;
// template lookups go through the runtime's registry and fall back to a graph lookup on a miss.
// The arena backs scratch tables for encoding and instantiation. Sessions keep their state in
// RefCells and are deliberately neither Send nor Sync: a session belongs to exactly one
// worker. SessionStats counts which tier answered each lookup.

//! Per-task compilation session.

use super::definition::Definition;
use super::options::Options;
use crate::assembler::GraphAssembler;
use crate::cache::tiered::{self, LookupSource};
use crate::cache::{BuildRequest, EncodedGraph, LocalGraphCache};
use crate::runtime::ReplacementsRuntime;
use crate::templates::{Arguments, Instantiation, Template};
use bumpalo::Bump;
use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;

pub struct CompilationSession<'arena> {
    /// Arena allocator for scratch data.
    arena: &'arena Bump,

    runtime: Arc<ReplacementsRuntime>,

    options: Options,

    track_positions: bool,

    /// Session-local graph tier.
    local: RefCell<LocalGraphCache>,

    stats: RefCell<SessionStats>,
}

impl<'arena> CompilationSession<'arena> {
    pub fn new(arena: &'arena Bump, runtime: Arc<ReplacementsRuntime>, options: Options) -> Self {
        Self {
            arena,
            runtime,
            options,
            track_positions: false,
            local: RefCell::new(LocalGraphCache::new()),
            stats: RefCell::new(SessionStats::default()),
        }
    }

    /// Require graphs that carry source positions.
    pub fn with_source_positions(mut self, track: bool) -> Self {
        self.track_positions = track;
        self
    }

    pub fn arena(&self) -> &'arena Bump {
        self.arena
    }

    pub fn runtime(&self) -> &Arc<ReplacementsRuntime> {
        &self.runtime
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn tracks_positions(&self) -> bool {
        self.track_positions
    }

    /// Frozen graph for `definition`, or `None` to use the generic lowering.
    pub fn graph(&self, definition: &Definition) -> Option<Arc<EncodedGraph>> {
        let request = BuildRequest::new(definition, &self.options, self.track_positions);
        let lookup = tiered::lookup(
            &self.runtime,
            &mut self.local.borrow_mut(),
            &request,
            self.arena,
        );
        self.stats.borrow_mut().record(lookup.source);
        lookup.graph
    }

    pub fn template(&self, definition: &Definition) -> Option<Arc<Template>> {
        self.runtime.templates().get(
            definition,
            &self.options,
            self.track_positions,
            || self.graph(definition),
        )
    }

    /// Splice the template for `definition` in at the assembler's cursor.
    pub fn instantiate(
        &self,
        definition: &Definition,
        assembler: &mut GraphAssembler,
        arguments: &Arguments,
    ) -> Option<Instantiation> {
        let template = self.template(definition)?;
        let instantiation = template.instantiate(assembler, arguments, self.arena);
        self.stats.borrow_mut().templates_instantiated += 1;
        Some(instantiation)
    }

    pub fn local_graph_count(&self) -> usize {
        self.local.borrow().len()
    }

    pub fn stats(&self) -> SessionStats {
        self.stats.borrow().clone()
    }
}

/// Lookup statistics of one session.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SessionStats {
    pub local_hits: usize,
    pub shared_hits: usize,
    /// Graphs built and offered to the shared tier.
    pub builds: usize,
    /// Graphs rebuilt with positions and kept local.
    pub rebuilds: usize,
    pub absent: usize,
    pub failures: usize,
    pub templates_instantiated: usize,
}

impl SessionStats {
    fn record(&mut self, source: LookupSource) {
        match source {
            LookupSource::Local => self.local_hits += 1,
            LookupSource::Shared => self.shared_hits += 1,
            LookupSource::Built => self.builds += 1,
            LookupSource::Rebuilt => self.rebuilds += 1,
            LookupSource::NoBody | LookupSource::KnownAbsent => self.absent += 1,
            LookupSource::Failed => self.failures += 1,
        }
    }
}

impl fmt::Display for SessionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Replacement Session Statistics:")?;
        writeln!(f, "  Local hits: {}", self.local_hits)?;
        writeln!(f, "  Shared hits: {}", self.shared_hits)?;
        writeln!(f, "  Builds: {}", self.builds)?;
        writeln!(f, "  Position rebuilds: {}", self.rebuilds)?;
        writeln!(f, "  Absent: {}", self.absent)?;
        writeln!(f, "  Failed builds: {}", self.failures)?;
        write!(f, "  Templates instantiated: {}", self.templates_instantiated)
    }
}
