// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Last-confirmed value cache.

use std::collections::HashMap;
use std::hash::Hash;

/// Per-adapter map from logical channel to last-confirmed value.
///
/// The cache is the only authority for no-op detection: adapters compare a
/// candidate against it and skip all side effects when nothing changed. It is
/// written once per confirmed transition, never speculatively.
///
/// # Examples
///
/// ```
/// use accessory_sync::state::StateCache;
///
/// let mut cache = StateCache::new();
/// assert!(cache.apply("light", true));
/// assert!(!cache.apply("light", true));
/// assert_eq!(cache.get(&"light"), Some(true));
/// ```
#[derive(Debug, Clone)]
pub struct StateCache<K, V> {
    entries: HashMap<K, V>,
}

impl<K, V> StateCache<K, V>
where
    K: Eq + Hash,
    V: Clone + PartialEq,
{
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Returns the cached value for a channel.
    #[must_use]
    pub fn get(&self, channel: &K) -> Option<V> {
        self.entries.get(channel).cloned()
    }

    /// Returns `true` if the cached value equals `value`.
    #[must_use]
    pub fn matches(&self, channel: &K, value: &V) -> bool {
        self.entries.get(channel) == Some(value)
    }

    /// Stores a value unconditionally.
    pub fn set(&mut self, channel: K, value: V) {
        self.entries.insert(channel, value);
    }

    /// Stores a value if it differs from the cached one.
    ///
    /// Returns `true` if the cache changed.
    pub fn apply(&mut self, channel: K, value: V) -> bool {
        if self.matches(&channel, &value) {
            return false;
        }
        self.entries.insert(channel, value);
        true
    }

    /// Forgets a channel.
    pub fn remove(&mut self, channel: &K) -> Option<V> {
        self.entries.remove(channel)
    }

    /// Forgets everything.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Returns the number of cached channels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> Default for StateCache<K, V>
where
    K: Eq + Hash,
    V: Clone + PartialEq,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> FromIterator<(K, V)> for StateCache<K, V>
where
    K: Eq + Hash,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_reports_change_only_once() {
        let mut cache = StateCache::new();
        assert!(cache.apply(1_u8, 21.5_f64));
        assert!(!cache.apply(1, 21.5));
        assert!(cache.apply(1, 22.0));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn set_overwrites_without_comparison() {
        let mut cache = StateCache::new();
        cache.set("speed", 33_u8);
        cache.set("speed", 33);
        assert_eq!(cache.get(&"speed"), Some(33));
        assert!(cache.matches(&"speed", &33));
    }

    #[test]
    fn remove_and_clear() {
        let mut cache: StateCache<&str, bool> = [("a", true), ("b", false)].into_iter().collect();
        assert_eq!(cache.remove(&"a"), Some(true));
        assert_eq!(cache.get(&"a"), None);
        cache.clear();
        assert!(cache.is_empty());
    }
}
