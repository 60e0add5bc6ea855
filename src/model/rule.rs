use serde::Deserialize;
use serde::Serialize;

use super::DataChange;
use crate::constants::SWIMLANE_TAG_PREFIX;

/// Lifecycle state of a namespace branch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum BranchStatus {
    /// Abandoned
    Deleted = 0,
    /// Currently effective
    Active = 1,
    /// Folded back into the main release
    Merged = 2,
}

impl BranchStatus {
    pub fn is_active(self) -> bool {
        self == BranchStatus::Active
    }
}

impl TryFrom<i32> for BranchStatus {
    type Error = i32;

    fn try_from(value: i32) -> std::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(BranchStatus::Deleted),
            1 => Ok(BranchStatus::Active),
            2 => Ok(BranchStatus::Merged),
            other => Err(other),
        }
    }
}

/// One branch's gray-tag binding.
///
/// Rows are never updated in place: a new release or a deletion inserts a
/// replacement row (which receives a larger id) and then soft-deletes the
/// previous one. The rule cache relies on this to use "higher id wins" as its
/// only freshness rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagReleaseRule {
    /// Assigned by the store on insert, strictly increasing; 0 before insert
    pub id: u64,
    pub app_id: String,
    pub parent_cluster_name: String,
    /// Branch cluster name
    pub cluster_name: String,
    pub namespace_name: String,
    /// Same value as `cluster_name`
    pub branch_name: String,
    pub tag: String,
    /// 0 means the branch was never released
    pub release_id: u64,
    pub branch_status: BranchStatus,
    pub data_change: DataChange,
}

impl TagReleaseRule {
    /// Unreleased ACTIVE rule for a freshly created branch cluster.
    pub fn new_active(
        app_id: &str,
        parent_cluster_name: &str,
        branch_cluster_name: &str,
        namespace_name: &str,
        tag: &str,
        operator: &str,
    ) -> Self {
        Self {
            id: 0,
            app_id: app_id.to_string(),
            parent_cluster_name: parent_cluster_name.to_string(),
            cluster_name: branch_cluster_name.to_string(),
            namespace_name: namespace_name.to_string(),
            branch_name: branch_cluster_name.to_string(),
            tag: normalize_tag(tag),
            release_id: 0,
            branch_status: BranchStatus::Active,
            data_change: DataChange::new(operator),
        }
    }

    pub fn is_released(&self) -> bool {
        self.release_id != 0
    }

    pub fn is_active(&self) -> bool {
        self.branch_status.is_active()
    }

    /// A rule belongs to `cluster` when it is either its branch cluster or its
    /// parent cluster.
    pub fn in_cluster(
        &self,
        cluster_name: &str,
    ) -> bool {
        self.cluster_name == cluster_name || self.parent_cluster_name == cluster_name
    }

    /// Row that supersedes this one after the branch is released.
    ///
    /// Copies every descriptive column; only `release_id` changes and the
    /// status is forced back to ACTIVE.
    pub fn replacement(
        &self,
        release_id: u64,
        operator: &str,
    ) -> Self {
        Self {
            id: 0,
            release_id,
            branch_status: BranchStatus::Active,
            data_change: DataChange::new(operator),
            ..self.clone()
        }
    }

    /// Row that retires this one once the branch is abandoned or merged.
    pub fn tombstone(
        &self,
        status: BranchStatus,
        operator: &str,
    ) -> Self {
        Self {
            id: 0,
            branch_status: status,
            data_change: DataChange::new(operator),
            ..self.clone()
        }
    }
}

/// Prepends the swimlane marker unless the tag already carries it.
pub fn normalize_tag(tag: &str) -> String {
    if tag.starts_with(SWIMLANE_TAG_PREFIX) {
        tag.to_string()
    } else {
        format!("{}{}", SWIMLANE_TAG_PREFIX, tag)
    }
}
