// This module groups the graph cache: the frozen EncodedGraph form, the process-wide shared
// tier keyed by (definition, options), the single-owner session-local tier, the body-provider
// contract the cache builds through, the optional construction scope bracketing each build,
// and the tiered lookup that ties them together.

//! Tiered graph cache.

pub mod encoded;
pub mod local;
pub mod provider;
pub mod scope;
pub mod shared;
pub mod tiered;

pub use encoded::EncodedGraph;
pub use local::LocalGraphCache;
pub use provider::{BodyProvider, BuildRequest};
pub use scope::{ConstructionScope, ScopeOutcome};
pub use shared::{CacheKey, SharedGraphCache};
pub use tiered::{Lookup, LookupSource};
