use super::TEST_APP;
use super::TEST_CLUSTER;
use super::TEST_NAMESPACE;
use super::TEST_OPERATOR;
use crate::normalize_tag;
use crate::BranchStatus;
use crate::TagReleaseRule;

/// Fluent builder for rule rows used across unit tests
pub(crate) struct RuleBuilder {
    rule: TagReleaseRule,
}

impl RuleBuilder {
    /// Unreleased ACTIVE rule of branch `branch` under `A/C/N`, tag `swimlane-beta`
    pub(crate) fn new(branch: &str) -> Self {
        Self {
            rule: TagReleaseRule::new_active(
                TEST_APP,
                TEST_CLUSTER,
                branch,
                TEST_NAMESPACE,
                "beta",
                TEST_OPERATOR,
            ),
        }
    }

    pub(crate) fn id(
        mut self,
        id: u64,
    ) -> Self {
        self.rule.id = id;
        self
    }

    pub(crate) fn app(
        mut self,
        app_id: &str,
    ) -> Self {
        self.rule.app_id = app_id.to_string();
        self
    }

    pub(crate) fn namespace(
        mut self,
        namespace_name: &str,
    ) -> Self {
        self.rule.namespace_name = namespace_name.to_string();
        self
    }

    pub(crate) fn tag(
        mut self,
        tag: &str,
    ) -> Self {
        self.rule.tag = normalize_tag(tag);
        self
    }

    pub(crate) fn release(
        mut self,
        release_id: u64,
    ) -> Self {
        self.rule.release_id = release_id;
        self
    }

    pub(crate) fn status(
        mut self,
        status: BranchStatus,
    ) -> Self {
        self.rule.branch_status = status;
        self
    }

    pub(crate) fn deleted(mut self) -> Self {
        self.rule.data_change.mark_deleted(TEST_OPERATOR);
        self
    }

    pub(crate) fn build(self) -> TagReleaseRule {
        self.rule
    }
}
