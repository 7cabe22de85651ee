use std::fmt::{self, Display};
use std::hash::Hash;

use anyhow::{anyhow, Result};
use indexmap::{Equivalent, IndexMap};

use anyval::Variant;

/// A map that remembers insertion order.
///
/// Removal is O(1): it leaves a tombstone behind and marks the list for reorganisation.
/// Tombstones are dropped by [`reorg`](Self::reorg) and by the calls returning keys or values.
#[derive(Clone)]
pub struct PropertyList<K, V> {
    entries: IndexMap<K, Option<V>>,
    live: usize,
    dirty: bool,
}

/// A property list of variants, keyed by name.
pub type Object = PropertyList<String, Variant>;

anyval::storable!(@eq Object);

impl<K: Hash + Eq, V> PropertyList<K, V> {
    pub fn new() -> Self {
        crate::register_type_codes();
        Self {
            entries: IndexMap::new(),
            live: 0,
            dirty: false,
        }
    }

    /// Inserts or replaces the value of `key`. Returns whether the key was already there.
    ///
    /// A key removed earlier is inserted again at the end.
    pub fn put(&mut self, key: K, value: V) -> bool {
        match self.entries.get_mut(&key) {
            Some(Some(slot)) => {
                *slot = value;
                true
            }
            Some(None) => {
                self.entries.shift_remove(&key);
                self.entries.insert(key, Some(value));
                self.live += 1;
                false
            }
            None => {
                self.entries.insert(key, Some(value));
                self.live += 1;
                false
            }
        }
    }

    /// The value of `key`, failing with "key not found" when absent.
    pub fn get<Q>(&self, key: &Q) -> Result<&V>
    where
        Q: ?Sized + Hash + Equivalent<K> + Display,
    {
        self.get_ptr(key).ok_or_else(|| anyhow!("key not found: {}", key))
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Result<&mut V>
    where
        Q: ?Sized + Hash + Equivalent<K> + Display,
    {
        match self.entries.get_mut(key) {
            Some(Some(value)) => Ok(value),
            _ => Err(anyhow!("key not found: {}", key)),
        }
    }

    /// The value of `key`, or `None` when absent.
    pub fn get_ptr<Q>(&self, key: &Q) -> Option<&V>
    where
        Q: ?Sized + Hash + Equivalent<K>,
    {
        self.entries.get(key).and_then(Option::as_ref)
    }

    pub fn get_def<Q>(&self, key: &Q, default: V) -> V
    where
        Q: ?Sized + Hash + Equivalent<K>,
        V: Clone,
    {
        self.get_ptr(key).cloned().unwrap_or(default)
    }

    /// Removes `key`, returning its value.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        Q: ?Sized + Hash + Equivalent<K>,
    {
        let removed = self.entries.get_mut(key)?.take()?;
        self.live -= 1;
        self.dirty = true;
        Some(removed)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.live = 0;
        self.dirty = false;
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        Q: ?Sized + Hash + Equivalent<K>,
    {
        self.get_ptr(key).is_some()
    }

    /// Whether removals left tombstones behind.
    pub fn needs_reorg(&self) -> bool {
        self.dirty
    }

    pub fn reorg(&mut self) {
        if self.dirty {
            self.entries.retain(|_, value| value.is_some());
            self.dirty = false;
        }
    }

    /// Keys in insertion order.
    pub fn get_keys(&mut self) -> Vec<K>
    where
        K: Clone,
    {
        self.reorg();
        self.entries.keys().cloned().collect()
    }

    /// Values in insertion order.
    pub fn get_values(&mut self) -> Vec<V>
    where
        V: Clone,
    {
        self.reorg();
        self.entries.values().flatten().cloned().collect()
    }

    /// Live entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries
            .iter()
            .filter_map(|(key, value)| value.as_ref().map(|value| (key, value)))
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.iter().map(|(key, _)| key)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, value)| value)
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.entries.values_mut().flatten()
    }
}

impl<K: Hash + Eq, V> Default for PropertyList<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Same live entries, in the same order.
impl<K: Hash + Eq, V: PartialEq> PartialEq for PropertyList<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<K: Hash + Eq, V> FromIterator<(K, V)> for PropertyList<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut list = Self::new();
        list.extend(iter);
        list
    }
}

impl<K: Hash + Eq, V> Extend<(K, V)> for PropertyList<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.put(key, value);
        }
    }
}

impl<K: Hash + Eq + fmt::Debug, V: fmt::Debug> fmt::Debug for PropertyList<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removal_leaves_a_tombstone_until_reorg() {
        let mut list: PropertyList<&str, i32> = [("a", 1), ("b", 2)].into_iter().collect();
        assert_eq!(list.remove(&"a"), Some(1));
        assert_eq!(list.entries.len(), 2);
        assert_eq!(list.len(), 1);

        list.reorg();
        assert_eq!(list.entries.len(), 1);
        assert!(!list.needs_reorg());
    }

    #[test]
    fn removing_twice_is_harmless() {
        let mut list = PropertyList::new();
        list.put("a", 1);
        assert_eq!(list.remove(&"a"), Some(1));
        assert_eq!(list.remove(&"a"), None);
        assert_eq!(list.remove(&"b"), None);
        assert_eq!(list.len(), 0);
    }
}
