//! Generic name and key indices shared by the aggregate read models.

use crate::search::{Lookup, SearchPhrase, SearchResult, find_by_key, normalize};
use im::{OrdMap, OrdSet};

/// Normalized name to ids. Several ids may share a name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameIndex<T: Ord + Clone> {
    buckets: OrdMap<String, OrdSet<T>>,
    names: OrdMap<T, String>,
}

impl<T: Ord + Clone> NameIndex<T> {
    pub fn new() -> Self {
        Self {
            buckets: OrdMap::new(),
            names: OrdMap::new(),
        }
    }

    /// Files `id` under `name`, leaving whatever bucket it was in before.
    pub fn with(self, id: T, name: &str) -> Self {
        let index = self.without(&id);
        let name = normalize(name);
        if name.is_empty() {
            return index;
        }
        Self {
            buckets: add_to_bucket(index.buckets, name.clone(), id.clone()),
            names: index.names.update(id, name),
        }
    }

    pub fn without(self, id: &T) -> Self {
        let Some(name) = self.names.get(id).cloned() else {
            return self;
        };
        Self {
            buckets: remove_from_bucket(self.buckets, &name, id),
            names: self.names.without(id),
        }
    }

    pub fn name_of(&self, id: &T) -> Option<&str> {
        self.names.get(id).map(String::as_str)
    }

    pub fn contains(&self, id: &T) -> bool {
        self.names.contains_key(id)
    }

    pub fn buckets(&self) -> &OrdMap<String, OrdSet<T>> {
        &self.buckets
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<T: Ord + Clone> Default for NameIndex<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Ord + Clone> Lookup<T> for NameIndex<T> {
    fn by_exact_or_pattern(&self, phrase: &SearchPhrase) -> SearchResult<T> {
        SearchResult::from_results(
            find_by_key(&self.buckets, phrase)
                .into_iter()
                .flat_map(|bucket| bucket.iter().cloned()),
        )
    }
}

/// Normalized key to its single owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyIndex<T: Ord + Clone> {
    keys: OrdMap<String, T>,
    owners: OrdMap<T, String>,
}

impl<T: Ord + Clone> KeyIndex<T> {
    pub fn new() -> Self {
        Self {
            keys: OrdMap::new(),
            owners: OrdMap::new(),
        }
    }

    /// Gives `key` to `id`. The previous holder of the key loses it, and
    /// `id` drops its own previous key. `None` just clears `id`'s key.
    pub fn assign(self, id: T, key: Option<&str>) -> Self {
        let index = self.without(&id);
        let Some(key) = key.map(normalize).filter(|key| !key.is_empty()) else {
            return index;
        };
        let owners = match index.keys.get(&key) {
            Some(previous) => index.owners.without(previous),
            None => index.owners,
        };
        Self {
            keys: index.keys.update(key.clone(), id.clone()),
            owners: owners.update(id, key),
        }
    }

    pub fn without(self, id: &T) -> Self {
        match self.owners.get(id).cloned() {
            Some(key) => Self {
                keys: self.keys.without(&key),
                owners: self.owners.without(id),
            },
            None => self,
        }
    }

    pub fn owner(&self, key: &str) -> Option<&T> {
        self.keys.get(&normalize(key))
    }

    pub fn key_of(&self, id: &T) -> Option<&str> {
        self.owners.get(id).map(String::as_str)
    }

    pub fn keys(&self) -> &OrdMap<String, T> {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl<T: Ord + Clone> Default for KeyIndex<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Ord + Clone> Lookup<T> for KeyIndex<T> {
    fn by_exact_or_pattern(&self, phrase: &SearchPhrase) -> SearchResult<T> {
        SearchResult::from_results(find_by_key(&self.keys, phrase).into_iter().cloned())
    }
}

/// Drops `item` from the bucket under `key`, removing the bucket once empty.
pub(crate) fn remove_from_bucket<K, T>(
    map: OrdMap<K, OrdSet<T>>,
    key: &K,
    item: &T,
) -> OrdMap<K, OrdSet<T>>
where
    K: Ord + Clone,
    T: Ord + Clone,
{
    match map.get(key) {
        Some(bucket) => {
            let bucket = bucket.without(item);
            if bucket.is_empty() {
                map.without(key)
            } else {
                map.update(key.clone(), bucket)
            }
        }
        None => map,
    }
}

pub(crate) fn add_to_bucket<K, T>(map: OrdMap<K, OrdSet<T>>, key: K, item: T) -> OrdMap<K, OrdSet<T>>
where
    K: Ord + Clone,
    T: Ord + Clone,
{
    let bucket = map.get(&key).cloned().unwrap_or_default().update(item);
    map.update(key, bucket)
}
