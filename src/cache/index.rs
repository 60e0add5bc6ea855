use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;

use dashmap::mapref::one::RefMut;
use dashmap::DashMap;

use super::RuleCacheEntry;

/// Builds an index key from its parts. Keys compare case-insensitively, so
/// they are stored lowercased.
pub(crate) fn index_key(
    separator: char,
    parts: [&str; 3],
) -> String {
    let mut key = String::with_capacity(parts.iter().map(|p| p.len() + 1).sum());
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            key.push(separator);
        }
        key.push_str(part);
    }
    key.to_lowercase()
}

/// `appId|parentCluster|namespace` → entries ordered by rule id
#[derive(Debug, Default)]
pub(crate) struct ForwardIndex {
    map: DashMap<String, BTreeMap<u64, Arc<RuleCacheEntry>>>,
}

impl ForwardIndex {
    /// Locks `key` for the lifetime of the returned guard, creating an empty
    /// slot when absent.
    pub(crate) fn lock(
        &self,
        key: &str,
    ) -> RefMut<'_, String, BTreeMap<u64, Arc<RuleCacheEntry>>> {
        self.map.entry(key.to_string()).or_default()
    }

    /// Drops `key` if it holds no entries.
    pub(crate) fn prune(
        &self,
        key: &str,
    ) {
        self.map.remove_if(key, |_, entries| entries.is_empty());
    }

    /// Point-in-time copy of the entries under `key`
    pub(crate) fn snapshot(
        &self,
        key: &str,
    ) -> Option<Vec<Arc<RuleCacheEntry>>> {
        self.map
            .get(key)
            .map(|entries| entries.values().cloned().collect())
    }

    pub(crate) fn len(&self) -> usize {
        self.map.iter().map(|e| e.value().len()).sum()
    }

    #[cfg(test)]
    pub(crate) fn contains_key(
        &self,
        key: &str,
    ) -> bool {
        self.map.contains_key(key)
    }
}

/// `ownerAppId|namespace|tag` → ids of ACTIVE cached rules
#[derive(Debug, Default)]
pub(crate) struct ReverseIndex {
    map: DashMap<String, BTreeSet<u64>>,
}

impl ReverseIndex {
    pub(crate) fn insert(
        &self,
        key: &str,
        rule_id: u64,
    ) {
        self.map.entry(key.to_string()).or_default().insert(rule_id);
    }

    pub(crate) fn remove(
        &self,
        key: &str,
        rule_id: u64,
    ) {
        if let Some(mut ids) = self.map.get_mut(key) {
            ids.remove(&rule_id);
        }
        self.map.remove_if(key, |_, ids| ids.is_empty());
    }

    pub(crate) fn contains(
        &self,
        key: &str,
    ) -> bool {
        self.map.get(key).is_some_and(|ids| !ids.is_empty())
    }

    #[cfg(test)]
    pub(crate) fn ids(
        &self,
        key: &str,
    ) -> BTreeSet<u64> {
        self.map.get(key).map(|ids| ids.clone()).unwrap_or_default()
    }

    pub(crate) fn len(&self) -> usize {
        self.map.iter().map(|e| e.value().len()).sum()
    }
}
