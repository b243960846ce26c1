// This module holds the graph passes the cache runs over a freshly built reference graph before
// encoding it. Each pass implements Phase: a named in-place rewrite that reports whether it
// changed anything. PhaseSuite assembles the fixed pipeline from the graph's Options:
// canonicalization, then dead-branch reduction followed by a second canonicalization (only when
// DeadBranchReduction is on, the default), then global value numbering when
// GlobalValueNumbering is set. The passes are deliberately local and cheap; the heavy lifting
// happens later in the embedding compiler.

//! Cache-time graph passes.

pub mod canonicalize;
pub mod dead_branch;
pub mod gvn;

pub use canonicalize::Canonicalize;
pub use dead_branch::DeadBranchReduction;
pub use gvn::GlobalValueNumbering;

use crate::core::{options, Graph, Options};

/// An in-place graph rewrite.
pub trait Phase: Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns whether the graph changed.
    fn apply(&self, graph: &mut Graph) -> bool;
}

/// Ordered list of phases.
pub struct PhaseSuite {
    phases: Vec<Box<dyn Phase>>,
}

impl PhaseSuite {
    pub fn empty() -> Self {
        Self { phases: Vec::new() }
    }

    /// Pipeline used for cache builds under `options`.
    pub fn for_options(options: &Options) -> Self {
        let mut suite = Self::empty().with(Canonicalize);
        if options.flag(options::DEAD_BRANCH_REDUCTION, true) {
            suite = suite.with(DeadBranchReduction).with(Canonicalize);
        }
        if options.flag(options::GLOBAL_VALUE_NUMBERING, false) {
            suite = suite.with(GlobalValueNumbering);
        }
        suite
    }

    pub fn with(mut self, phase: impl Phase + 'static) -> Self {
        self.phases.push(Box::new(phase));
        self
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.phases.iter().map(|phase| phase.name()).collect()
    }

    pub fn run(&self, graph: &mut Graph) {
        for phase in &self.phases {
            let before = graph.node_count();
            let changed = phase.apply(graph);
            log::trace!(
                "{}: {} nodes -> {} nodes{}",
                phase.name(),
                before,
                graph.node_count(),
                if changed { "" } else { " (unchanged)" }
            );
        }
        debug_assert!(graph.verify().is_ok(), "passes broke the graph:\n{graph}");
    }
}
