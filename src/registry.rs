//! Generic dual-keyed registry.
//!
//! Every content module relates three things: a human-readable namespaced
//! key, an engine-native identifier (note-block state, custom model data,
//! numeric player id) and a descriptor object. `DualKeyRegistry` keeps the
//! descriptor reachable through either key and guarantees the two internal
//! maps never disagree, including on replacement.

use std::collections::HashMap;
use std::hash::Hash;

/// Bidirectional registry: one value reachable by either of two independent
/// unique keys. Mutation keeps the forward map `P -> (S, V)` and the reverse
/// map `S -> P` consistent in the same call; a lookup miss is `None`, never
/// an error. Entries are unordered.
///
/// Not internally synchronized: callers mutate it from the main loop only.
#[derive(Debug, Clone)]
pub struct DualKeyRegistry<P, S, V> {
    forward: HashMap<P, (S, V)>,
    reverse: HashMap<S, P>,
}

impl<P, S, V> Default for DualKeyRegistry<P, S, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P, S, V> DualKeyRegistry<P, S, V> {
    pub fn new() -> Self {
        Self {
            forward: HashMap::new(),
            reverse: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    pub fn clear(&mut self) {
        self.forward.clear();
        self.reverse.clear();
    }
}

impl<P, S, V> DualKeyRegistry<P, S, V>
where
    P: Eq + Hash + Clone,
    S: Eq + Hash + Clone,
{
    /// Inserts the triple, or atomically replaces the one keyed by
    /// `primary`. On replacement the old secondary mapping is retired
    /// first, so no stale reverse entry survives. Returns the previous
    /// value for `primary`, if any.
    pub fn put(&mut self, primary: P, secondary: S, value: V) -> Option<V> {
        // A secondary key may also be stolen from a different primary;
        // that primary's whole triple goes away with it.
        if let Some(old_primary) = self.reverse.get(&secondary)
            && *old_primary != primary
        {
            let old_primary = old_primary.clone();
            self.forward.remove(&old_primary);
        }

        let previous = self.forward.insert(primary.clone(), (secondary.clone(), value));
        if let Some((old_secondary, _)) = &previous {
            self.reverse.remove(old_secondary);
        }
        self.reverse.insert(secondary, primary);

        previous.map(|(_, v)| v)
    }

    pub fn get_by_primary(&self, primary: &P) -> Option<&V> {
        self.forward.get(primary).map(|(_, v)| v)
    }

    pub fn get_by_secondary(&self, secondary: &S) -> Option<&V> {
        let primary = self.reverse.get(secondary)?;
        self.forward.get(primary).map(|(_, v)| v)
    }

    /// Removes the full triple addressed by `primary` from both
    /// directions. Returns the removed value.
    pub fn remove_by_primary(&mut self, primary: &P) -> Option<V> {
        let (secondary, value) = self.forward.remove(primary)?;
        self.reverse.remove(&secondary);
        Some(value)
    }

    /// Removes the full triple addressed by `secondary` from both
    /// directions. Returns the removed value.
    pub fn remove_by_secondary(&mut self, secondary: &S) -> Option<V> {
        let primary = self.reverse.remove(secondary)?;
        self.forward.remove(&primary).map(|(_, v)| v)
    }

    pub fn contains_primary(&self, primary: &P) -> bool {
        self.forward.contains_key(primary)
    }

    pub fn contains_secondary(&self, secondary: &S) -> bool {
        self.reverse.contains_key(secondary)
    }

    pub fn contains_value(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.forward.values().any(|(_, v)| v == value)
    }

    /// Secondary key currently paired with `primary`.
    pub fn secondary_for(&self, primary: &P) -> Option<&S> {
        self.forward.get(primary).map(|(s, _)| s)
    }

    pub fn primary_keys(&self) -> impl Iterator<Item = &P> {
        self.forward.keys()
    }

    pub fn secondary_keys(&self) -> impl Iterator<Item = &S> {
        self.reverse.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.forward.values().map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&P, &S, &V)> {
        self.forward.iter().map(|(p, (s, v))| (p, s, v))
    }
}
