//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use replacements::builder::ReferenceGraphBuilder;
use replacements::cache::{BodyProvider, BuildRequest, ConstructionScope, ScopeOutcome};
use replacements::core::{BuildResult, DefinitionId, Opcode};
use replacements::{Definition, Graph, NodeKind, PluginBodyProvider, ValueKind};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Barrier, Mutex};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// `max(a, b)` on ints.
pub fn max_def() -> Definition {
    Definition::new(DefinitionId::new("Math", "max", "(II)I"), ValueKind::Int)
        .with_parameter("a", ValueKind::Int)
        .with_parameter("b", ValueKind::Int)
}

/// `abs(x)` on longs.
pub fn abs_def() -> Definition {
    Definition::new(DefinitionId::new("Math", "abs", "(J)J"), ValueKind::Long)
        .with_parameter("x", ValueKind::Long)
}

pub fn emit_max(b: &mut ReferenceGraphBuilder<'_>) -> bool {
    let (x, y) = (b.argument_named("a"), b.argument_named("b"));
    let less = b.unique(NodeKind::Pure(Opcode::LessThan), ValueKind::Boolean, &[x, y]);
    let asm = b.assembler();
    asm.start_conditional(less, 0.5);
    asm.enter_consequent();
    asm.append_return(Some(y));
    asm.enter_alternate();
    asm.append_return(Some(x));
    asm.end_conditional();
    true
}

pub fn emit_abs(b: &mut ReferenceGraphBuilder<'_>) -> bool {
    let x = b.argument(0);
    let zero = b.constant(replacements::Constant::Long(0));
    let negative = b.unique(NodeKind::Pure(Opcode::LessThan), ValueKind::Boolean, &[x, zero]);
    let negated = b.unique(NodeKind::Pure(Opcode::Negate), ValueKind::Long, &[x]);
    let asm = b.assembler();
    asm.start_conditional(negative, 0.3);
    asm.enter_consequent();
    asm.enter_alternate();
    let merge = asm.end_conditional().expect("both branches fall through");
    let result = asm.phi(merge, ValueKind::Long, &[negated, x]);
    b.push(ValueKind::Long, result);
    true
}

/// Plugin table for the definitions above.
pub fn plugins() -> PluginBodyProvider {
    let mut provider = PluginBodyProvider::new();
    provider.register_fn(max_def().id().clone(), emit_max);
    provider.register_fn(abs_def().id().clone(), emit_abs);
    provider
}

/// Provider wrapper counting builds, optionally rendezvousing inside them.
pub struct CountingProvider {
    inner: PluginBodyProvider,
    builds: AtomicUsize,
    rendezvous: Option<Barrier>,
}

impl CountingProvider {
    pub fn new(inner: PluginBodyProvider) -> Self {
        Self {
            inner,
            builds: AtomicUsize::new(0),
            rendezvous: None,
        }
    }

    /// Every build waits until `parties` builds are in flight.
    pub fn with_rendezvous(mut self, parties: usize) -> Self {
        self.rendezvous = Some(Barrier::new(parties));
        self
    }

    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}

impl BodyProvider for CountingProvider {
    fn has_body(&self, definition: &DefinitionId) -> bool {
        self.inner.has_body(definition)
    }

    fn build(&self, request: &BuildRequest<'_>) -> BuildResult<Graph> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        if let Some(barrier) = &self.rendezvous {
            barrier.wait();
        }
        self.inner.build(request)
    }
}

/// Construction scope recording its enter/exit events.
#[derive(Default)]
pub struct RecordingScope {
    events: Mutex<Vec<String>>,
}

impl RecordingScope {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl ConstructionScope for RecordingScope {
    fn enter(&self, definition: &DefinitionId) {
        self.events.lock().unwrap().push(format!("enter {}", definition.name()));
    }

    fn exit(&self, definition: &DefinitionId, outcome: ScopeOutcome) {
        self.events
            .lock()
            .unwrap()
            .push(format!("exit {} {outcome:?}", definition.name()));
    }
}
