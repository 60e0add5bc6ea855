use std::sync::Arc;

use tracing::debug;
use tracing::info;
use tracing::instrument;
use tracing::warn;

use super::UniqueKeyGenerator;
use crate::normalize_tag;
use crate::Audit;
use crate::AuditOp;
use crate::BranchStatus;
use crate::Cluster;
use crate::LifecycleError;
use crate::MessageSender;
use crate::Namespace;
use crate::NotificationConfig;
use crate::ReleaseHistory;
use crate::ReleaseMessageKeyGenerator;
use crate::ReleaseOperation;
use crate::Result;
use crate::Store;
use crate::TagNamespace;
use crate::TagReleaseRule;

/// Audit entity name of tag branches
pub const TAG_AUDIT_ENTITY: &str = "Tag";

/// Creates, replaces and retires tag branches.
///
/// Every mutation runs in one store transaction and either commits whole or
/// leaves the store untouched.
pub struct NamespaceTagService<S>
where
    S: Store,
{
    store: Arc<S>,
    message_sender: Arc<dyn MessageSender>,
    key_generator: ReleaseMessageKeyGenerator,
    release_topic: String,
}

impl<S> NamespaceTagService<S>
where
    S: Store,
{
    pub fn new(
        store: Arc<S>,
        message_sender: Arc<dyn MessageSender>,
        notification_config: &NotificationConfig,
    ) -> Self {
        Self {
            store,
            message_sender,
            key_generator: ReleaseMessageKeyGenerator::new(notification_config.key_separator),
            release_topic: notification_config.release_topic.clone(),
        }
    }

    /// Creates a branch cluster under the root cluster `parent_cluster_name`,
    /// mirrors `namespace_name` into it and binds `tag` to the branch.
    ///
    /// Returns the branch namespace. Publishing the release notification is
    /// left to the caller.
    #[instrument(skip(self))]
    pub fn create_tag_branch(
        &self,
        app_id: &str,
        parent_cluster_name: &str,
        namespace_name: &str,
        tag: &str,
        operator: &str,
    ) -> Result<Namespace> {
        let tag = normalize_tag(tag);

        self.store.transaction(|txn| {
            let parent = txn
                .find_cluster(app_id, parent_cluster_name)?
                .filter(Cluster::is_root)
                .ok_or_else(|| LifecycleError::InvalidBranch {
                    app_id: app_id.to_string(),
                    cluster: parent_cluster_name.to_string(),
                })?;

            if txn
                .find_namespace(app_id, parent_cluster_name, namespace_name)?
                .is_none()
            {
                return Err(LifecycleError::NotFound(format!(
                    "namespace {}/{}/{}",
                    app_id, parent_cluster_name, namespace_name
                ))
                .into());
            }

            let branch_name = UniqueKeyGenerator::generate(&[app_id, &parent.name, namespace_name]);
            let branch = txn.insert_cluster(Cluster::new_branch(&parent, &branch_name, operator))?;
            let namespace =
                txn.insert_namespace(Namespace::new(app_id, &branch.name, namespace_name, operator))?;

            if txn
                .find_active_rule_by_tag(app_id, parent_cluster_name, namespace_name, &tag)?
                .is_some()
            {
                return Err(LifecycleError::Conflict {
                    app_id: app_id.to_string(),
                    cluster: parent_cluster_name.to_string(),
                    namespace: namespace_name.to_string(),
                    tag: tag.clone(),
                }
                .into());
            }

            let rule = txn.insert_rule(TagReleaseRule::new_active(
                app_id,
                parent_cluster_name,
                &branch.name,
                namespace_name,
                &tag,
                operator,
            ))?;
            txn.insert_audit(Audit::new(TAG_AUDIT_ENTITY, branch.id, AuditOp::Insert, operator))?;

            info!(
                "Created tag branch {} for {}/{}/{} with tag {} (rule {})",
                branch.name, app_id, parent_cluster_name, namespace_name, tag, rule.id
            );
            Ok(namespace)
        })
    }

    /// Retires the tag branch `branch_name`.
    ///
    /// Does nothing when the branch cluster is already gone. Otherwise the
    /// current rule is superseded by a row in `target_status` (never ACTIVE;
    /// an ACTIVE target is recorded as DELETED), the branch cluster and its
    /// namespaces are soft-deleted, and a release message for the parent
    /// namespace is published after commit.
    #[instrument(skip(self))]
    pub fn delete_tag_branch(
        &self,
        app_id: &str,
        parent_cluster_name: &str,
        namespace_name: &str,
        branch_name: &str,
        target_status: BranchStatus,
        operator: &str,
    ) -> Result<()> {
        let status = if target_status.is_active() {
            BranchStatus::Deleted
        } else {
            target_status
        };

        let deleted = self.store.transaction(|txn| {
            let Some(branch) = txn.find_cluster(app_id, branch_name)? else {
                debug!("tag branch {} already deleted", branch_name);
                return Ok(false);
            };

            let latest_release_id = txn
                .find_latest_active_release(app_id, branch_name, namespace_name)?
                .map_or(0, |release| release.id);

            if let Some(rule) =
                txn.find_latest_branch_rule(app_id, &branch.name, namespace_name, branch_name)?
            {
                // Successor first, so it gets the larger id
                let tombstone = txn.insert_rule(rule.tombstone(status, operator))?;
                txn.delete_rule(rule.id, operator)?;
                debug!("rule {} retired by tombstone {}", rule.id, tombstone.id);
            }

            txn.delete_cluster(branch.id, operator)?;

            txn.insert_release_history(ReleaseHistory::new(
                app_id,
                parent_cluster_name,
                namespace_name,
                branch_name,
                latest_release_id,
                latest_release_id,
                ReleaseOperation::for_tag_branch_removal(status),
                None,
                operator,
            ))?;
            txn.insert_audit(Audit::new(TAG_AUDIT_ENTITY, branch.id, AuditOp::Delete, operator))?;

            Ok(true)
        })?;

        if deleted {
            info!(
                "Deleted tag branch {} of {}/{}/{} as {:?}",
                branch_name, app_id, parent_cluster_name, namespace_name, status
            );
            self.publish(app_id, parent_cluster_name, namespace_name);
        }
        Ok(())
    }

    /// Rebinds the branch's rule to `new_release_id` after the branch was
    /// released.
    ///
    /// Returns the replacement rule, or `None` when the branch has no ACTIVE
    /// rule.
    #[instrument(skip(self))]
    pub fn update_branch_rule_on_new_release(
        &self,
        app_id: &str,
        cluster_name: &str,
        namespace_name: &str,
        branch_name: &str,
        new_release_id: u64,
        operator: &str,
    ) -> Result<Option<TagReleaseRule>> {
        self.store.transaction(|txn| {
            let Some(old) =
                txn.find_latest_branch_rule(app_id, cluster_name, namespace_name, branch_name)?
            else {
                return Ok(None);
            };

            if !old.is_active() {
                debug!(
                    "branch {} rule {} is {:?}, not rebinding",
                    branch_name, old.id, old.branch_status
                );
                return Ok(None);
            }

            let new = txn.insert_rule(old.replacement(new_release_id, operator))?;
            txn.delete_rule(old.id, operator)?;

            txn.insert_release_history(ReleaseHistory::new(
                app_id,
                &old.parent_cluster_name,
                namespace_name,
                branch_name,
                new_release_id,
                old.release_id,
                ReleaseOperation::ApplyTagRules,
                Some(format!(
                    r#"{{"oldTag":"{}","newTag":"{}"}}"#,
                    old.tag, new.tag
                )),
                operator,
            ))?;

            debug!(
                "branch {} rule {} (release {}) replaced by {} (release {})",
                branch_name, old.id, old.release_id, new.id, new.release_id
            );
            Ok(Some(new))
        })
    }

    /// Branch namespaces of `parent_cluster_name` that carry a tag rule.
    pub fn find_tag_branches(
        &self,
        app_id: &str,
        parent_cluster_name: &str,
        namespace_name: &str,
    ) -> Result<Vec<TagNamespace>> {
        self.store.transaction(|txn| {
            let mut branches = Vec::new();
            for namespace in txn.find_child_namespaces(app_id, parent_cluster_name, namespace_name)? {
                let rules =
                    txn.find_rules_by_natural_key(app_id, &namespace.cluster_name, namespace_name)?;
                if let Some(rule) = rules.into_iter().rev().find(|r| r.is_active()) {
                    branches.push(TagNamespace {
                        namespace,
                        tag: rule.tag,
                    });
                }
            }
            Ok(branches)
        })
    }

    /// Branch namespace whose ACTIVE rule binds `tag`.
    pub fn find_tag_branch(
        &self,
        app_id: &str,
        parent_cluster_name: &str,
        namespace_name: &str,
        tag: &str,
    ) -> Result<Option<Namespace>> {
        let tag = normalize_tag(tag);
        self.store.transaction(|txn| {
            match txn.find_active_rule_by_tag(app_id, parent_cluster_name, namespace_name, &tag)? {
                Some(rule) => txn.find_namespace(app_id, &rule.cluster_name, namespace_name),
                None => Ok(None),
            }
        })
    }

    /// Latest rule of `branch_name`, whatever its status.
    pub fn find_branch_tag_rule(
        &self,
        app_id: &str,
        cluster_name: &str,
        namespace_name: &str,
        branch_name: &str,
    ) -> Result<Option<TagReleaseRule>> {
        self.store.transaction(|txn| {
            txn.find_latest_branch_rule(app_id, cluster_name, namespace_name, branch_name)
        })
    }

    fn publish(
        &self,
        app_id: &str,
        cluster_name: &str,
        namespace_name: &str,
    ) {
        let message = self.key_generator.generate(app_id, cluster_name, namespace_name);
        // Best effort: the periodic scan converges the caches anyway
        if let Err(e) = self.message_sender.send_message(&message, &self.release_topic) {
            warn!("Failed to publish release message {}: {}", message, e);
        }
    }
}
