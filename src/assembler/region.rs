// This module implements the region stack the graph assembler uses to track open structured
// regions. A region is a tagged variant: a conditional region records the exit cursors of its
// consequent and alternate branches, an exception-dispatch region records the exit cursors of
// its normal and exceptional edges plus the exception value node. Each variant carries its own
// four-state machine, and the transitions (entering a sub-part, closing) are methods on the
// variant so the assembler only ever touches the region it expects. Each sub-part is entered
// at most once and in order, consequent before alternate and normal edge before exceptional
// edge; an out-of-order entry panics and leaves the region as it was. The stack always holds an
// inert sentinel at the bottom; asking for a conditional or dispatch region when the top is
// anything else, including the sentinel, panics before the graph is touched.

//! Stack of open structured regions.

use crate::core::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionalState {
    EvaluatingCondition,
    InConsequent,
    InAlternate,
    Closed,
}

/// An open two-way conditional.
///
/// Until a branch is entered its slot holds the branch's begin node, so a
/// branch that is never entered is treated as empty and reachable.
#[derive(Debug, Clone)]
pub struct ConditionalRegion {
    split: NodeId,
    consequent: Option<NodeId>,
    alternate: Option<NodeId>,
    state: ConditionalState,
}

impl ConditionalRegion {
    pub(crate) fn new(split: NodeId, consequent_begin: NodeId, alternate_begin: NodeId) -> Self {
        Self {
            split,
            consequent: Some(consequent_begin),
            alternate: Some(alternate_begin),
            state: ConditionalState::EvaluatingCondition,
        }
    }

    pub fn split(&self) -> NodeId {
        self.split
    }

    pub fn state(&self) -> ConditionalState {
        self.state
    }

    /// Branches are entered at most once each, consequent first.
    fn expect_state(&self, branch: &str, allowed: &[ConditionalState]) {
        if self.state == ConditionalState::Closed {
            panic!("conditional at {} is already closed", self.split);
        }
        assert!(
            allowed.contains(&self.state),
            "cannot enter the {branch} of conditional at {} while {:?}",
            self.split,
            self.state
        );
    }

    /// Store the outgoing cursor into the slot of the branch being left.
    fn save_exit(&mut self, cursor: Option<NodeId>) {
        match self.state {
            ConditionalState::EvaluatingCondition => {}
            ConditionalState::InConsequent => self.consequent = cursor,
            ConditionalState::InAlternate => self.alternate = cursor,
            ConditionalState::Closed => panic!("conditional at {} is already closed", self.split),
        }
    }

    /// Returns the cursor to resume at.
    pub(crate) fn enter_consequent(&mut self, cursor: Option<NodeId>) -> Option<NodeId> {
        self.expect_state("consequent", &[ConditionalState::EvaluatingCondition]);
        self.save_exit(cursor);
        self.state = ConditionalState::InConsequent;
        self.consequent
    }

    pub(crate) fn enter_alternate(&mut self, cursor: Option<NodeId>) -> Option<NodeId> {
        self.expect_state(
            "alternate",
            &[ConditionalState::EvaluatingCondition, ConditionalState::InConsequent],
        );
        self.save_exit(cursor);
        self.state = ConditionalState::InAlternate;
        self.alternate
    }

    /// Close the region, returning the (consequent, alternate) exits.
    pub(crate) fn close(&mut self, cursor: Option<NodeId>) -> (Option<NodeId>, Option<NodeId>) {
        self.save_exit(cursor);
        self.state = ConditionalState::Closed;
        (self.consequent, self.alternate)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Start,
    InNormalEdge,
    InExceptionalEdge,
    Closed,
}

/// An open split between a normal continuation and an exception handler.
#[derive(Debug, Clone)]
pub struct DispatchRegion {
    split: NodeId,
    exception_object: NodeId,
    normal: Option<NodeId>,
    exceptional: Option<NodeId>,
    state: DispatchState,
}

impl DispatchRegion {
    pub(crate) fn new(split: NodeId, normal_begin: NodeId, exception_object: NodeId) -> Self {
        Self {
            split,
            exception_object,
            normal: Some(normal_begin),
            exceptional: Some(exception_object),
            state: DispatchState::Start,
        }
    }

    pub fn split(&self) -> NodeId {
        self.split
    }

    pub fn exception_object(&self) -> NodeId {
        self.exception_object
    }

    pub fn state(&self) -> DispatchState {
        self.state
    }

    fn expect_state(&self, edge: &str, allowed: &[DispatchState]) {
        if self.state == DispatchState::Closed {
            panic!("exception dispatch at {} is already closed", self.split);
        }
        assert!(
            allowed.contains(&self.state),
            "cannot enter the {edge} edge of exception dispatch at {} while {:?}",
            self.split,
            self.state
        );
    }

    fn save_exit(&mut self, cursor: Option<NodeId>) {
        match self.state {
            DispatchState::Start => {}
            DispatchState::InNormalEdge => self.normal = cursor,
            DispatchState::InExceptionalEdge => self.exceptional = cursor,
            DispatchState::Closed => panic!("exception dispatch at {} is already closed", self.split),
        }
    }

    pub(crate) fn enter_normal_edge(&mut self, cursor: Option<NodeId>) -> Option<NodeId> {
        self.expect_state("normal", &[DispatchState::Start]);
        self.save_exit(cursor);
        self.state = DispatchState::InNormalEdge;
        self.normal
    }

    pub(crate) fn enter_exceptional_edge(&mut self, cursor: Option<NodeId>) -> Option<NodeId> {
        self.expect_state("exceptional", &[DispatchState::Start, DispatchState::InNormalEdge]);
        self.save_exit(cursor);
        self.state = DispatchState::InExceptionalEdge;
        self.exceptional
    }

    /// Close the region, returning the (normal, exceptional) exits.
    pub(crate) fn close(&mut self, cursor: Option<NodeId>) -> (Option<NodeId>, Option<NodeId>) {
        self.save_exit(cursor);
        self.state = DispatchState::Closed;
        (self.normal, self.exceptional)
    }
}

#[derive(Debug, Clone)]
pub enum Region {
    /// Bottom of every stack; never matches an expected region kind.
    Sentinel,
    Conditional(ConditionalRegion),
    ExceptionDispatch(DispatchRegion),
}

impl Region {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Region::Sentinel => "no open region",
            Region::Conditional(_) => "a conditional region",
            Region::ExceptionDispatch(_) => "an exception-dispatch region",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RegionStack {
    regions: Vec<Region>,
}

impl Default for RegionStack {
    fn default() -> Self {
        Self::new()
    }
}

impl RegionStack {
    pub fn new() -> Self {
        Self {
            regions: vec![Region::Sentinel],
        }
    }

    pub fn push(&mut self, region: Region) {
        assert!(
            !matches!(region, Region::Sentinel),
            "the sentinel region cannot be pushed"
        );
        log::trace!("open {} at depth {}", region.kind_name(), self.depth() + 1);
        self.regions.push(region);
    }

    pub fn top(&self) -> &Region {
        self.regions
            .last()
            .unwrap_or_else(|| unreachable!("region stack lost its sentinel"))
    }

    /// Number of open regions, sentinel excluded.
    pub fn depth(&self) -> usize {
        self.regions.len() - 1
    }

    pub fn top_conditional(&mut self) -> &mut ConditionalRegion {
        let found = self.top().kind_name();
        match self.regions.last_mut() {
            Some(Region::Conditional(region)) => region,
            _ => panic!("expected a conditional region on top of the region stack, found {found}"),
        }
    }

    pub fn top_dispatch(&mut self) -> &mut DispatchRegion {
        let found = self.top().kind_name();
        match self.regions.last_mut() {
            Some(Region::ExceptionDispatch(region)) => region,
            _ => panic!(
                "expected an exception-dispatch region on top of the region stack, found {found}"
            ),
        }
    }

    /// Pop the top region; popping the sentinel is a contract violation.
    pub fn pop(&mut self) -> Region {
        assert!(self.depth() > 0, "pop past the bottom of the region stack");
        let region = self
            .regions
            .pop()
            .unwrap_or_else(|| unreachable!("region stack lost its sentinel"));
        log::trace!("close {} at depth {}", region.kind_name(), self.depth() + 1);
        region
    }

    pub fn pop_conditional(&mut self) -> ConditionalRegion {
        self.top_conditional();
        match self.pop() {
            Region::Conditional(region) => region,
            _ => unreachable!(),
        }
    }

    pub fn pop_dispatch(&mut self) -> DispatchRegion {
        self.top_dispatch();
        match self.pop() {
            Region::ExceptionDispatch(region) => region,
            _ => unreachable!(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Graph, NodeKind, Options, ValueKind};

    fn nodes(n: usize) -> Vec<NodeId> {
        let mut g = Graph::new(Options::default(), false);
        (0..n)
            .map(|_| g.add(NodeKind::Begin, ValueKind::Void, &[]))
            .collect()
    }

    #[test]
    fn fresh_stack_is_empty() {
        let stack = RegionStack::new();
        assert_eq!(stack.depth(), 0);
        assert!(matches!(stack.top(), Region::Sentinel));
    }

    #[test]
    #[should_panic(expected = "pop past the bottom")]
    fn popping_the_sentinel_panics() {
        RegionStack::new().pop();
    }

    #[test]
    #[should_panic(expected = "found no open region")]
    fn sentinel_is_not_a_conditional() {
        RegionStack::new().top_conditional();
    }

    #[test]
    #[should_panic(expected = "expected an exception-dispatch region")]
    fn wrong_kind_on_top_panics() {
        let n = nodes(3);
        let mut stack = RegionStack::new();
        stack.push(Region::Conditional(ConditionalRegion::new(n[0], n[1], n[2])));
        stack.pop_dispatch();
    }

    #[test]
    fn wrong_kind_leaves_stack_intact() {
        let n = nodes(3);
        let mut stack = RegionStack::new();
        stack.push(Region::Conditional(ConditionalRegion::new(n[0], n[1], n[2])));
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            stack.pop_dispatch();
        }));
        assert!(result.is_err());
        assert_eq!(stack.depth(), 1);
        assert!(matches!(stack.top(), Region::Conditional(_)));
    }

    #[test]
    fn conditional_state_machine() {
        let n = nodes(5);
        let mut region = ConditionalRegion::new(n[0], n[1], n[2]);
        assert_eq!(region.enter_consequent(None), Some(n[1]));
        assert_eq!(region.state(), ConditionalState::InConsequent);
        // Leaving the consequent at n[3] records it as the consequent exit.
        assert_eq!(region.enter_alternate(Some(n[3])), Some(n[2]));
        assert_eq!(region.close(Some(n[4])), (Some(n[3]), Some(n[4])));
        assert_eq!(region.state(), ConditionalState::Closed);
    }

    #[test]
    fn unentered_branch_exits_at_its_begin() {
        let n = nodes(4);
        let mut region = ConditionalRegion::new(n[0], n[1], n[2]);
        region.enter_consequent(None);
        assert_eq!(region.close(None), (None, Some(n[2])));
    }

    #[test]
    #[should_panic(expected = "already closed")]
    fn entering_a_closed_conditional_panics() {
        let n = nodes(3);
        let mut region = ConditionalRegion::new(n[0], n[1], n[2]);
        region.close(None);
        region.enter_alternate(None);
    }

    #[test]
    fn dispatch_state_machine() {
        let n = nodes(4);
        let mut region = DispatchRegion::new(n[0], n[1], n[2]);
        assert_eq!(region.exception_object(), n[2]);
        assert_eq!(region.enter_normal_edge(None), Some(n[1]));
        assert_eq!(region.state(), DispatchState::InNormalEdge);
        assert_eq!(region.enter_exceptional_edge(Some(n[3])), Some(n[2]));
        assert_eq!(region.state(), DispatchState::InExceptionalEdge);
        assert_eq!(region.close(None), (Some(n[3]), None));
    }

    #[test]
    fn exceptional_edge_may_be_entered_alone() {
        let n = nodes(3);
        let mut region = DispatchRegion::new(n[0], n[1], n[2]);
        assert_eq!(region.enter_exceptional_edge(None), Some(n[2]));
        assert_eq!(region.close(None), (Some(n[1]), None));
    }

    #[test]
    #[should_panic(expected = "cannot enter the normal edge")]
    fn normal_edge_after_exceptional_panics() {
        let n = nodes(3);
        let mut region = DispatchRegion::new(n[0], n[1], n[2]);
        region.enter_exceptional_edge(None);
        region.enter_normal_edge(None);
    }

    #[test]
    #[should_panic(expected = "cannot enter the consequent")]
    fn entering_the_consequent_twice_panics() {
        let n = nodes(3);
        let mut region = ConditionalRegion::new(n[0], n[1], n[2]);
        region.enter_consequent(None);
        region.enter_consequent(None);
    }

    #[test]
    fn consequent_after_alternate_is_rejected_without_losing_exits() {
        let n = nodes(4);
        let mut region = ConditionalRegion::new(n[0], n[1], n[2]);
        region.enter_alternate(None);
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            region.enter_consequent(Some(n[3]));
        }));
        assert!(outcome.is_err());
        assert_eq!(region.state(), ConditionalState::InAlternate);
        assert_eq!(region.close(Some(n[3])), (Some(n[1]), Some(n[3])));
    }
}
