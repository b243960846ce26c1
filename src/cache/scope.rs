//! Caller-supplied hook bracketing shared-cache builds.

use crate::core::{BuildResult, DefinitionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeOutcome {
    Built,
    Failed,
    /// The build unwound.
    Panicked,
}

/// Opaque resource acquired around each cache build, never around hits.
pub trait ConstructionScope: Send + Sync {
    fn enter(&self, definition: &DefinitionId);

    /// Called exactly once per `enter`, on every exit path.
    fn exit(&self, definition: &DefinitionId, outcome: ScopeOutcome);
}

struct ScopeGuard<'s> {
    scope: &'s dyn ConstructionScope,
    definition: &'s DefinitionId,
    outcome: ScopeOutcome,
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        self.scope.exit(self.definition, self.outcome);
    }
}

/// Run `build` inside `scope`, if there is one.
pub(crate) fn within_scope<T>(
    scope: Option<&dyn ConstructionScope>,
    definition: &DefinitionId,
    build: impl FnOnce() -> BuildResult<T>,
) -> BuildResult<T> {
    let Some(scope) = scope else {
        return build();
    };
    scope.enter(definition);
    let mut guard = ScopeGuard {
        scope,
        definition,
        outcome: ScopeOutcome::Panicked,
    };
    let result = build();
    guard.outcome = if result.is_ok() {
        ScopeOutcome::Built
    } else {
        ScopeOutcome::Failed
    };
    result
}
