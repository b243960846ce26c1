//! Test utilities for arena-backed sessions.
//!
//! Tests own the arena the way an embedding compiler would, and borrow
//! sessions from it.

#[cfg(test)]
pub mod test {
    use super::super::options::Options;
    use super::super::session::CompilationSession;
    use crate::runtime::ReplacementsRuntime;
    use bumpalo::Bump;
    use std::sync::Arc;

    /// Owns the arena sessions borrow from.
    pub struct TestContext {
        arena: Bump,
    }

    impl TestContext {
        pub fn new() -> Self {
            let _ = env_logger::builder().is_test(true).try_init();
            Self { arena: Bump::new() }
        }

        pub fn arena(&self) -> &Bump {
            &self.arena
        }

        /// The returned session borrows from the context, so the context
        /// must outlive it.
        pub fn create_session(
            &self,
            runtime: Arc<ReplacementsRuntime>,
            options: Options,
        ) -> CompilationSession<'_> {
            CompilationSession::new(&self.arena, runtime, options)
        }

        /// Run `f` with a fresh session.
        pub fn with_session<F, R>(&self, runtime: Arc<ReplacementsRuntime>, options: Options, f: F) -> R
        where
            F: FnOnce(&CompilationSession<'_>) -> R,
        {
            let session = self.create_session(runtime, options);
            f(&session)
        }

        pub fn memory_used(&self) -> usize {
            self.arena.allocated_bytes()
        }
    }

    impl Default for TestContext {
        fn default() -> Self {
            Self::new()
        }
    }
}
