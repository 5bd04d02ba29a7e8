//! State Registry.
//!
//! Two flat structures indexed by opaque, process-unique keys: one for
//! key -> (target -> value) maps, one for key -> set-of-targets. First-time
//! reads materialize an empty container. No value type checking is
//! performed here by design: this is the untyped side channel external
//! decorators use to stash per-type metadata, and the checker never
//! inspects what's inside.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};

use crate::types::TypeId;

/// An opaque, process-unique token a library obtains once (e.g. via a
/// `once_cell::sync::Lazy<StateKey>`) and reuses across every compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateKey(u32);

static NEXT_KEY: AtomicU32 = AtomicU32::new(0);

impl StateKey {
    pub fn new() -> Self {
        StateKey(NEXT_KEY.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for StateKey {
    fn default() -> Self {
        Self::new()
    }
}

/// Untyped per-library metadata, keyed by an opaque `StateKey` and
/// attached to one `TypeId`. The registry does not care what's inside;
/// `serde_json::Value` is the widest thing external decorators can hand
/// across the Host boundary without this crate knowing their shape.
pub type StateValue = serde_json::Value;

/// The sanctioned channel between the checker and external decorators.
/// Per-program: one `StateRegistry` lives as long as the `Program` that
/// owns it, never across compilations.
#[derive(Debug, Default)]
pub struct StateRegistry {
    maps: HashMap<StateKey, HashMap<TypeId, StateValue>>,
    sets: HashMap<StateKey, HashSet<TypeId>>,
}

impl StateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state_map(&mut self, key: StateKey) -> &mut HashMap<TypeId, StateValue> {
        self.maps.entry(key).or_default()
    }

    pub fn state_set(&mut self, key: StateKey) -> &mut HashSet<TypeId> {
        self.sets.entry(key).or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_read_materializes_an_empty_container() {
        let mut registry = StateRegistry::new();
        let key = StateKey::new();
        assert!(registry.state_map(key).is_empty());
        assert!(registry.state_set(key).is_empty());
    }

    #[test]
    fn keys_are_distinct_per_library() {
        let a = StateKey::new();
        let b = StateKey::new();
        assert_ne!(a, b);
    }

    #[test]
    fn map_and_set_entries_persist_across_reads() {
        let mut registry = StateRegistry::new();
        let key = StateKey::new();
        registry.state_map(key).insert(TypeId(0), StateValue::Bool(true));
        assert_eq!(registry.state_map(key).get(&TypeId(0)), Some(&StateValue::Bool(true)));
        registry.state_set(key).insert(TypeId(1));
        assert!(registry.state_set(key).contains(&TypeId(1)));
    }
}
