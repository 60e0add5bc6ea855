use serde::Deserialize;
use serde::Serialize;

use super::DataChange;
use super::BranchStatus;

/// A published snapshot of a namespace's configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub id: u64,
    pub app_id: String,
    pub cluster_name: String,
    pub namespace_name: String,
    pub name: String,
    pub is_abandoned: bool,
    pub data_change: DataChange,
}

impl Release {
    pub fn new(
        app_id: &str,
        cluster_name: &str,
        namespace_name: &str,
        name: &str,
        operator: &str,
    ) -> Self {
        Self {
            id: 0,
            app_id: app_id.to_string(),
            cluster_name: cluster_name.to_string(),
            namespace_name: namespace_name.to_string(),
            name: name.to_string(),
            is_abandoned: false,
            data_change: DataChange::new(operator),
        }
    }
}

/// Operation recorded in the release history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum ReleaseOperation {
    NormalRelease = 0,
    Rollback = 1,
    GrayRelease = 2,
    ApplyGrayRules = 3,
    GrayReleaseMergedToMaster = 4,
    MainBranchReleaseSyncToGray = 5,
    AbandonGrayRelease = 6,
    GrayReleaseDeletedAfterMerge = 7,
    AbandonTagRelease = 8,
    TagReleaseDeletedAfterMerge = 9,
    ApplyTagRules = 10,
}

impl ReleaseOperation {
    /// History operation describing the removal of a tag branch that ends in
    /// `status`.
    pub fn for_tag_branch_removal(status: BranchStatus) -> Self {
        match status {
            BranchStatus::Merged => ReleaseOperation::TagReleaseDeletedAfterMerge,
            _ => ReleaseOperation::AbandonTagRelease,
        }
    }
}

/// Audit trail of a release-affecting operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseHistory {
    pub id: u64,
    pub app_id: String,
    pub cluster_name: String,
    pub namespace_name: String,
    pub branch_name: String,
    pub release_id: u64,
    pub previous_release_id: u64,
    pub operation: ReleaseOperation,
    /// Free-form context, e.g. `{"oldTag":..,"newTag":..}`
    pub operation_context: Option<String>,
    pub data_change: DataChange,
}

impl ReleaseHistory {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        app_id: &str,
        cluster_name: &str,
        namespace_name: &str,
        branch_name: &str,
        release_id: u64,
        previous_release_id: u64,
        operation: ReleaseOperation,
        operation_context: Option<String>,
        operator: &str,
    ) -> Self {
        Self {
            id: 0,
            app_id: app_id.to_string(),
            cluster_name: cluster_name.to_string(),
            namespace_name: namespace_name.to_string(),
            branch_name: branch_name.to_string(),
            release_id,
            previous_release_id,
            operation,
            operation_context,
            data_change: DataChange::new(operator),
        }
    }
}
