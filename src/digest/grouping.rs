use std::hash::Hash;

use indexmap::IndexMap;

/// Multimap whose keys iterate in first-insertion order and whose values
/// iterate in push order. Values are only ever appended.
#[derive(Debug, Clone)]
pub struct OrderedMultimap<K, V> {
    inner: IndexMap<K, Vec<V>>,
}

impl<K: Hash + Eq, V> OrderedMultimap<K, V> {
    pub fn new() -> Self {
        Self {
            inner: IndexMap::new(),
        }
    }

    /// Appends `value` under `key`. Returns true if `key` was seen for the first time.
    pub fn push(&mut self, key: K, value: V) -> bool {
        let entry = self.inner.entry(key);
        let is_new = matches!(entry, indexmap::map::Entry::Vacant(_));
        entry.or_default().push(value);
        is_new
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.inner.keys()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<K: Hash + Eq, V> Default for OrderedMultimap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> IntoIterator for OrderedMultimap<K, V> {
    type Item = (K, Vec<V>);
    type IntoIter = indexmap::map::IntoIter<K, Vec<V>>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.into_iter()
    }
}

impl<K: Hash + Eq, V> FromIterator<(K, V)> for OrderedMultimap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.push(k, v);
        }
        map
    }
}
