//! Replacements - IR assembly and graph caching for intrinsic lowering.
//!
//! A JIT lowers calls to well-known operations by splicing in small,
//! pre-built IR graphs instead of compiling the callee generically. This
//! crate builds those graphs and keeps them: a cursor-based assembler with
//! structured regions, a plugin-driven builder for reference definitions,
//! a two-tier (shared plus session-local) cache of frozen graphs, and a
//! registry of parameterized templates.
//!
//! # Primary Usage
//!
//! ```ignore
//! use replacements::{CompilationSession, Options, ReplacementsRuntime};
//! use replacements::builder::PluginBodyProvider;
//! use bumpalo::Bump;
//! use std::sync::Arc;
//!
//! // Once per process
//! let mut provider = PluginBodyProvider::new();
//! provider.register_fn(def.id().clone(), |b| { /* emit the lowering */ true });
//! let runtime = Arc::new(ReplacementsRuntime::new(Arc::new(provider)));
//!
//! // Once per compilation task
//! let arena = Bump::new();
//! let session = CompilationSession::new(&arena, Arc::clone(&runtime), Options::default());
//! if let Some(inst) = session.instantiate(&def, &mut assembler, &arguments) {
//!     // continue after the spliced fragment
//! }
//! ```
//!
//! # Architecture
//!
//! - [`core`] - IR graph, definitions, options, errors, session
//! - [`assembler`] - Region stack and graph assembler
//! - [`builder`] - Reference-graph builder and plugins
//! - [`passes`] - Cache-time canonicalization and cleanup
//! - [`cache`] - Encoded graphs and the tiered cache
//! - [`templates`] - Templates and their registry

pub mod assembler;
pub mod builder;
pub mod cache;
pub mod core;
pub mod passes;
pub mod runtime;
pub mod templates;

pub use assembler::{GraphAssembler, RegionStack};
pub use builder::{PluginBodyProvider, ReferenceGraphBuilder, ReplacementPlugin};
pub use cache::{BodyProvider, BuildRequest, EncodedGraph};
pub use self::core::{
    BuildError, BuildResult, CompilationSession, Constant, Definition, DefinitionId, Graph,
    NodeId, NodeKind, Options, SessionStats, SourcePosition, ValueKind,
};
pub use runtime::ReplacementsRuntime;
pub use templates::{Arguments, Instantiation, Template, TemplateRegistry};
