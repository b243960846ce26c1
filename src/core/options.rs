// This module holds the immutable configuration a graph is built under. Options is a sorted
// map of option keys to values behind an Arc, so cloning it into cache keys is cheap while
// equality and hashing still compare the option contents. Two option sets assembled
// independently with the same entries are the same cache key; any differing entry makes them
// distinct keys. A handful of well-known keys steer the cache build pipeline and the template
// registry. Parsing options from text is left to the embedding compiler.

//! Value-compared compilation options.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Enables the global value numbering pass during cache builds.
pub const GLOBAL_VALUE_NUMBERING: &str = "GlobalValueNumbering";
/// Enables dead-branch reduction during cache builds (default on).
pub const DEAD_BRANCH_REDUCTION: &str = "DeadBranchReduction";
/// Allows the template registry to publish templates (default on).
pub const USE_TEMPLATE_CACHE: &str = "UseTemplateCache";

/// A single option value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Str(Arc<str>),
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(b) => write!(f, "{b}"),
            OptionValue::Int(i) => write!(f, "{i}"),
            OptionValue::Str(s) => write!(f, "{s}"),
        }
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        OptionValue::Bool(value)
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        OptionValue::Int(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::Str(Arc::from(value))
    }
}

/// Immutable set of compilation options.
///
/// `Eq` and `Hash` go through the `Arc` to the sorted map, so comparison is by
/// contents and never by container identity.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Options {
    values: Arc<BTreeMap<Arc<str>, OptionValue>>,
}

impl Options {
    pub fn builder() -> OptionsBuilder {
        OptionsBuilder::default()
    }

    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.values.get(key)
    }

    /// Boolean option with a fallback for absent or non-boolean entries.
    pub fn flag(&self, key: &str, default: bool) -> bool {
        match self.values.get(key) {
            Some(OptionValue::Bool(b)) => *b,
            _ => default,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Derive a new option set with one entry overridden.
    pub fn with(&self, key: &str, value: impl Into<OptionValue>) -> Options {
        let mut values = (*self.values).clone();
        values.insert(Arc::from(key), value.into());
        Options {
            values: Arc::new(values),
        }
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.values.iter().map(|(k, v)| (&**k, v)))
            .finish()
    }
}

/// Accumulates entries for an [`Options`] set.
#[derive(Default)]
pub struct OptionsBuilder {
    values: BTreeMap<Arc<str>, OptionValue>,
}

impl OptionsBuilder {
    pub fn set(mut self, key: &str, value: impl Into<OptionValue>) -> Self {
        self.values.insert(Arc::from(key), value.into());
        self
    }

    pub fn build(self) -> Options {
        Options {
            values: Arc::new(self.values),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    fn hash_of(options: &Options) -> u64 {
        let mut hasher = DefaultHasher::new();
        options.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn equality_is_by_contents() {
        let a = Options::builder()
            .set("Inline", true)
            .set("MaxNodes", 100i64)
            .build();
        // Insertion order differs, contents do not.
        let b = Options::builder()
            .set("MaxNodes", 100i64)
            .set("Inline", true)
            .build();
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn differing_entry_is_distinct() {
        let a = Options::builder().set("Inline", true).build();
        let b = Options::builder().set("Inline", false).build();
        assert_ne!(a, b);
        assert_ne!(a, Options::default());
    }

    #[test]
    fn with_leaves_original_untouched() {
        let base = Options::builder().set(GLOBAL_VALUE_NUMBERING, false).build();
        let derived = base.with(GLOBAL_VALUE_NUMBERING, true);
        assert!(!base.flag(GLOBAL_VALUE_NUMBERING, true));
        assert!(derived.flag(GLOBAL_VALUE_NUMBERING, false));
    }

    #[test]
    fn flag_falls_back_on_wrong_type() {
        let options = Options::builder().set(USE_TEMPLATE_CACHE, "yes").build();
        assert!(options.flag(USE_TEMPLATE_CACHE, true));
        assert!(!options.flag(USE_TEMPLATE_CACHE, false));
    }
}
