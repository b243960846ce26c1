// This module is the shared foundation of the replacements core. It defines the IR graph the
// rest of the crate builds and rewrites (node kinds, graph storage with owner-checked node ids,
// structural editing and verification), the identity of the definitions being replaced and
// their declared signatures, value-compared compilation options, inlining-aware source
// positions, the recoverable BuildError, and the per-task compilation session that ties a
// task's options and arena to the process-wide runtime.

//! Core infrastructure shared by every component.
//!
//! # Key Components
//!
//! ## Graph (`graph`, `node`)
//! - Vector-backed node storage with tombstone deletion
//! - Control edges kept as successor slots plus a predecessor link
//! - `kill_cfg` and `verify` for passes and tests
//!
//! ## Identity and configuration (`definition`, `options`, `position`)
//! - `DefinitionId` compares by holder, name and descriptor
//! - `Options` compares by contents
//!
//! ## Session (`session`)
//! - Arena-backed, single-owner view of the runtime

pub mod definition;
pub mod error;
pub mod graph;
pub mod node;
pub mod options;
pub mod position;
pub mod session;
pub mod test_utils;

pub use definition::{Definition, DefinitionId, ParameterSpec, ValueKind};
pub use error::{BuildError, BuildResult};
pub use graph::Graph;
pub use node::{Constant, DeoptReason, FixedOp, GraphId, Node, NodeId, NodeKind, Opcode};
pub use options::{OptionValue, Options, OptionsBuilder};
pub use position::SourcePosition;
pub use session::{CompilationSession, SessionStats};
