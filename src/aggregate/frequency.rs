//! Key → count mapping that remembers the order in which keys first appeared.

use std::collections::HashMap;
use std::hash::Hash;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencyMap<K: Eq + Hash> {
    index: HashMap<K, usize>,
    entries: Vec<(K, u64)>,
}

impl<K: Eq + Hash> Default for FrequencyMap<K> {
    fn default() -> Self {
        Self {
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }
}

impl<K: Clone + Eq + Hash> FrequencyMap<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one more occurrence of `key`.
    pub fn increment(&mut self, key: K) {
        self.add(key, 1);
    }

    pub fn add(&mut self, key: K, n: u64) {
        match self.index.get(&key) {
            Some(&i) => self.entries[i].1 += n,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, n));
            }
        }
    }

    /// Fold another map into this one; keys new to `self` keep `other`'s order.
    pub fn merge(&mut self, other: FrequencyMap<K>) {
        for (k, n) in other.entries {
            self.add(k, n);
        }
    }
}

impl<K: Eq + Hash> FrequencyMap<K> {
    pub fn get(&self, key: &K) -> Option<u64> {
        self.index.get(key).map(|&i| self.entries[i].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.entries.iter().map(|(_, n)| n).sum()
    }

    /// Entries in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, u64)> + '_ {
        self.entries.iter().map(|(k, n)| (k, *n))
    }
}

impl<K: Eq + Hash> IntoIterator for FrequencyMap<K> {
    type Item = (K, u64);
    type IntoIter = std::vec::IntoIter<(K, u64)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<K: Clone + Eq + Hash> FromIterator<K> for FrequencyMap<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut map = Self::new();
        for k in iter {
            map.increment(k);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_in_first_seen_order() {
        let m: FrequencyMap<&str> = ["b", "a", "b", "c", "a", "b"].into_iter().collect();
        let v: Vec<_> = m.into_iter().collect();
        assert_eq!(v, vec![("b", 3), ("a", 2), ("c", 1)]);
    }

    #[test]
    fn get_total_and_len() {
        let m: FrequencyMap<u8> = [1, 1, 2].into_iter().collect();
        assert_eq!(m.get(&1), Some(2));
        assert_eq!(m.get(&9), None);
        assert_eq!(m.len(), 2);
        assert_eq!(m.total(), 3);
        assert!(FrequencyMap::<u8>::new().is_empty());
    }

    #[test]
    fn merge_adds_counts() {
        let mut a: FrequencyMap<&str> = ["x", "y"].into_iter().collect();
        let b: FrequencyMap<&str> = ["z", "x", "x"].into_iter().collect();
        a.merge(b);
        let v: Vec<_> = a.iter().map(|(k, n)| (*k, n)).collect();
        assert_eq!(v, vec![("x", 3), ("y", 1), ("z", 1)]);
    }
}
