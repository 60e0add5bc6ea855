use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use crate::BranchStatus;
use crate::TagReleaseRule;

/// Snapshot of one rule row as last observed by the cache.
///
/// Every field except the load version is fixed at construction; a newer
/// row produces a new entry instead of mutating this one.
#[derive(Debug)]
pub struct RuleCacheEntry {
    pub rule_id: u64,
    pub branch_name: String,
    pub namespace_name: String,
    pub release_id: u64,
    pub branch_status: BranchStatus,
    pub owner_app_id: String,
    pub tag: String,
    load_version: AtomicU64,
}

impl RuleCacheEntry {
    pub fn from_rule(
        rule: &TagReleaseRule,
        load_version: u64,
    ) -> Self {
        Self {
            rule_id: rule.id,
            branch_name: rule.branch_name.clone(),
            namespace_name: rule.namespace_name.clone(),
            release_id: rule.release_id,
            branch_status: rule.branch_status,
            owner_app_id: rule.app_id.clone(),
            tag: rule.tag.clone(),
            load_version: AtomicU64::new(load_version),
        }
    }

    pub fn is_active(&self) -> bool {
        self.branch_status.is_active()
    }

    pub fn load_version(&self) -> u64 {
        self.load_version.load(Ordering::Acquire)
    }

    /// Marks the entry as seen alive during pass `version`.
    pub fn refresh(
        &self,
        version: u64,
    ) {
        self.load_version.store(version, Ordering::Release);
    }

    /// Scan passes elapsed since the entry was last confirmed
    pub fn age(
        &self,
        current_version: u64,
    ) -> u64 {
        current_version.saturating_sub(self.load_version())
    }

    /// Whether this entry serves `client_app_id` tagged `client_tag`.
    /// Empty owner or tag never match.
    pub fn matches(
        &self,
        client_app_id: &str,
        client_tag: &str,
    ) -> bool {
        !self.owner_app_id.is_empty()
            && !self.tag.is_empty()
            && self.owner_app_id == client_app_id
            && self.tag == client_tag
    }
}
