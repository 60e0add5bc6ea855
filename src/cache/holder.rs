use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::trace;
use tracing::warn;

use super::index_key;
use super::ForwardIndex;
use super::ReverseIndex;
use super::RuleCacheEntry;
use crate::constants::INACTIVE_RULE_MAX_AGE;
use crate::metrics::INDEX_SIZE_METRIC;
use crate::metrics::LOAD_VERSION_METRIC;
use crate::metrics::RELEASE_MESSAGE_METRIC;
use crate::metrics::RULE_MERGE_METRIC;
use crate::metrics::SCAN_PASS_METRIC;
use crate::CacheConfig;
use crate::CacheError;
use crate::Error;
use crate::NotificationConfig;
use crate::NotificationError;
use crate::ReleaseMessage;
use crate::ReleaseMessageKeyGenerator;
use crate::ReleaseMessageListener;
use crate::Result;
use crate::RuleStore;
use crate::SystemError;
use crate::TagReleaseRule;

/// What a single merge step did to the indices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Unreleased row, or inactive row with no cached counterpart
    Skipped,
    /// First entry for this branch
    Added,
    /// Strictly newer row superseded the cached counterpart
    Replaced,
    /// Re-observed ACTIVE entry stamped with the current load version
    Refreshed,
    /// Re-observed inactive entry that is still young enough to keep
    Kept,
    /// Inactive entry aged out of both indices
    Evicted,
}

impl MergeOutcome {
    fn as_label(self) -> &'static str {
        match self {
            MergeOutcome::Skipped => "skipped",
            MergeOutcome::Added => "added",
            MergeOutcome::Replaced => "replaced",
            MergeOutcome::Refreshed => "refreshed",
            MergeOutcome::Kept => "kept",
            MergeOutcome::Evicted => "evicted",
        }
    }
}

/// Tag release rule cache.
///
/// Holds a forward index keyed by configuration identity and a reverse index
/// keyed by client identity, both fed from the [`RuleStore`] by two paths: a
/// targeted re-query per release message and a periodic paginated scan. Both
/// paths go through [`TagReleaseRulesHolder::merge_rule`], which decides purely
/// on rule id order and scan age, so concurrent or reordered merges converge.
///
/// Resolution reads never touch the store.
pub struct TagReleaseRulesHolder<S>
where
    S: RuleStore,
{
    store: Arc<S>,
    forward: ForwardIndex,
    reverse: ReverseIndex,
    load_version: AtomicU64,
    key_generator: ReleaseMessageKeyGenerator,
    release_topic: String,
    page_size: usize,
}

impl<S> std::fmt::Debug for TagReleaseRulesHolder<S>
where
    S: RuleStore,
{
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("TagReleaseRulesHolder")
            .field("load_version", &self.load_version())
            .field("forward_len", &self.forward.len())
            .field("reverse_len", &self.reverse.len())
            .finish()
    }
}

impl<S> TagReleaseRulesHolder<S>
where
    S: RuleStore,
{
    pub fn new(
        store: Arc<S>,
        cache_config: &CacheConfig,
        notification_config: &NotificationConfig,
    ) -> Self {
        Self {
            store,
            forward: ForwardIndex::default(),
            reverse: ReverseIndex::default(),
            load_version: AtomicU64::new(0),
            key_generator: ReleaseMessageKeyGenerator::new(notification_config.key_separator),
            release_topic: notification_config.release_topic.clone(),
            page_size: cache_config.scan_page_size.max(1),
        }
    }

    pub fn load_version(&self) -> u64 {
        self.load_version.load(Ordering::Acquire)
    }

    // ----------------------------------------------------------------
    // Resolution

    /// Release id the client should be served for this namespace, if an
    /// ACTIVE released rule binds exactly `client_app_id`/`client_tag`.
    pub fn resolve(
        &self,
        client_app_id: &str,
        client_tag: &str,
        config_app_id: &str,
        config_cluster_name: &str,
        config_namespace: &str,
    ) -> Option<u64> {
        let key = self.forward_key(config_app_id, config_cluster_name, config_namespace);
        let entries = self.forward.snapshot(&key)?;

        entries
            .iter()
            .find(|entry| entry.is_active() && entry.matches(client_app_id, client_tag))
            .map(|entry| entry.release_id)
    }

    /// Whether any ACTIVE released rule of `namespace_name` targets this
    /// client, regardless of cluster.
    pub fn has_tag_rule(
        &self,
        client_app_id: &str,
        client_tag: &str,
        namespace_name: &str,
    ) -> bool {
        let key = self.reverse_key(client_app_id, namespace_name, client_tag);
        self.reverse.contains(&key)
    }

    // ----------------------------------------------------------------
    // Merge

    pub fn merge_rules(
        &self,
        rules: &[TagReleaseRule],
    ) {
        for rule in rules {
            let outcome = self.merge_rule(rule);
            RULE_MERGE_METRIC.with_label_values(&[outcome.as_label()]).inc();
        }
    }

    /// Folds one observed row into both indices.
    pub fn merge_rule(
        &self,
        rule: &TagReleaseRule,
    ) -> MergeOutcome {
        if !rule.is_released() {
            return MergeOutcome::Skipped;
        }

        let key = self.forward_key(&rule.app_id, &rule.parent_cluster_name, &rule.namespace_name);
        let version = self.load_version();

        let outcome = {
            // Serializes merges of the same key. Forward is always locked
            // before reverse.
            let mut slot = self.forward.lock(&key);

            let cached = slot
                .values()
                .find(|entry| entry.branch_name == rule.branch_name)
                .cloned();

            match cached {
                None if !rule.is_active() => MergeOutcome::Skipped,
                None => {
                    self.insert_entry(&mut slot, rule, version);
                    MergeOutcome::Added
                }
                Some(cached) if rule.id > cached.rule_id => {
                    self.insert_entry(&mut slot, rule, version);
                    self.remove_entry(&mut slot, &cached);
                    MergeOutcome::Replaced
                }
                Some(cached) if cached.is_active() => {
                    cached.refresh(version);
                    MergeOutcome::Refreshed
                }
                Some(cached) if cached.age(version) > INACTIVE_RULE_MAX_AGE => {
                    self.remove_entry(&mut slot, &cached);
                    MergeOutcome::Evicted
                }
                Some(_) => MergeOutcome::Kept,
            }
        };

        self.forward.prune(&key);

        trace!(
            rule_id = rule.id,
            branch = %rule.branch_name,
            ?outcome,
            "merged rule into {}",
            key
        );
        outcome
    }

    fn insert_entry(
        &self,
        slot: &mut std::collections::BTreeMap<u64, Arc<RuleCacheEntry>>,
        rule: &TagReleaseRule,
        version: u64,
    ) {
        let entry = Arc::new(RuleCacheEntry::from_rule(rule, version));
        if entry.is_active() {
            self.reverse.insert(&self.entry_reverse_key(&entry), entry.rule_id);
        }
        slot.insert(entry.rule_id, entry);
    }

    fn remove_entry(
        &self,
        slot: &mut std::collections::BTreeMap<u64, Arc<RuleCacheEntry>>,
        entry: &RuleCacheEntry,
    ) {
        slot.remove(&entry.rule_id);
        self.reverse.remove(&self.entry_reverse_key(entry), entry.rule_id);
    }

    // ----------------------------------------------------------------
    // Notification path

    /// Re-queries and merges the namespace named by a release message.
    ///
    /// Returns the number of rows merged.
    pub fn handle_release_message(
        &self,
        message: &ReleaseMessage,
        channel: &str,
    ) -> Result<usize> {
        info!("message received - channel: {}, message: {:?}", channel, message);

        if channel != self.release_topic {
            return Err(NotificationError::UnexpectedChannel(channel.to_string()).into());
        }

        let key = self
            .key_generator
            .parse(&message.message)
            .ok_or_else(|| NotificationError::Malformed {
                channel: channel.to_string(),
                message: message.message.clone(),
            })?;

        let rules = self.store.find_rules_by_natural_key(
            &key.app_id,
            &key.cluster_name,
            &key.namespace_name,
        )?;
        self.merge_rules(&rules);
        self.record_index_sizes();

        debug!("merged {} rules for {:?}", rules.len(), key);
        Ok(rules.len())
    }

    // ----------------------------------------------------------------
    // Scan path

    /// One full pass over the rule table.
    ///
    /// Bumps the load version, then merges ascending-id pages until a short
    /// page. Shutdown is checked between pages. Merges applied before a failure
    /// are kept. Returns the number of rows scanned.
    pub fn scan_pass(
        &self,
        shutdown: &watch::Receiver<()>,
    ) -> Result<usize> {
        let version = self.load_version.fetch_add(1, Ordering::AcqRel) + 1;
        LOAD_VERSION_METRIC.set(version as i64);

        let mut last_scanned_id = 0;
        let mut scanned = 0;

        loop {
            if shutdown_requested(shutdown) {
                return Err(CacheError::Interrupted(version).into());
            }

            let page = self
                .store
                .find_rules_page(last_scanned_id, self.page_size)
                .map_err(|e| CacheError::ScanPass {
                    load_version: version,
                    last_scanned_id,
                    source: Box::new(e),
                })?;

            self.merge_rules(&page);
            scanned += page.len();

            if let Some(last) = page.last() {
                last_scanned_id = last.id;
            }
            if page.len() < self.page_size {
                break;
            }
        }

        Ok(scanned)
    }

    /// Runs [`Self::scan_pass`] and logs the outcome. Never fails.
    pub fn periodic_scan(
        &self,
        shutdown: &watch::Receiver<()>,
    ) {
        match self.scan_pass(shutdown) {
            Ok(scanned) => {
                SCAN_PASS_METRIC.with_label_values(&["ok"]).inc();
                debug!(
                    "scan pass {} merged {} rules",
                    self.load_version(),
                    scanned
                );
            }
            Err(Error::Cache(CacheError::Interrupted(version))) => {
                SCAN_PASS_METRIC.with_label_values(&["interrupted"]).inc();
                info!("scan pass {} abandoned on shutdown", version);
            }
            Err(e) => {
                SCAN_PASS_METRIC.with_label_values(&["failed"]).inc();
                error!("Load tag release rules failed: {}", e);
            }
        }
        self.record_index_sizes();
    }

    fn record_index_sizes(&self) {
        INDEX_SIZE_METRIC
            .with_label_values(&["forward"])
            .set(self.forward.len() as i64);
        INDEX_SIZE_METRIC
            .with_label_values(&["reverse"])
            .set(self.reverse.len() as i64);
    }

    // ----------------------------------------------------------------
    // Keys

    fn forward_key(
        &self,
        app_id: &str,
        cluster_name: &str,
        namespace_name: &str,
    ) -> String {
        index_key(
            self.key_generator.separator(),
            [app_id, cluster_name, namespace_name],
        )
    }

    fn reverse_key(
        &self,
        owner_app_id: &str,
        namespace_name: &str,
        tag: &str,
    ) -> String {
        index_key(self.key_generator.separator(), [owner_app_id, namespace_name, tag])
    }

    fn entry_reverse_key(
        &self,
        entry: &RuleCacheEntry,
    ) -> String {
        self.reverse_key(&entry.owner_app_id, &entry.namespace_name, &entry.tag)
    }
}

impl<S> ReleaseMessageListener for TagReleaseRulesHolder<S>
where
    S: RuleStore,
{
    fn handle_message(
        &self,
        message: &ReleaseMessage,
        channel: &str,
    ) {
        match self.handle_release_message(message, channel) {
            Ok(_) => {
                RELEASE_MESSAGE_METRIC.with_label_values(&["merged"]).inc();
            }
            Err(Error::System(SystemError::Notification(e))) => {
                RELEASE_MESSAGE_METRIC.with_label_values(&["ignored"]).inc();
                error!("Invalid release message: {}", e);
            }
            Err(e) => {
                RELEASE_MESSAGE_METRIC.with_label_values(&["failed"]).inc();
                warn!("Reload tag release rules for {:?} failed: {}", message.message, e);
            }
        }
    }
}

fn shutdown_requested(shutdown: &watch::Receiver<()>) -> bool {
    // A dropped sender means the node is going away too
    shutdown.has_changed().unwrap_or(true)
}

#[cfg(test)]
impl<S> TagReleaseRulesHolder<S>
where
    S: RuleStore,
{
    pub(crate) fn forward_entries(
        &self,
        app_id: &str,
        cluster_name: &str,
        namespace_name: &str,
    ) -> Vec<Arc<RuleCacheEntry>> {
        let key = self.forward_key(app_id, cluster_name, namespace_name);
        self.forward.snapshot(&key).unwrap_or_default()
    }

    pub(crate) fn has_forward_key(
        &self,
        app_id: &str,
        cluster_name: &str,
        namespace_name: &str,
    ) -> bool {
        self.forward
            .contains_key(&self.forward_key(app_id, cluster_name, namespace_name))
    }

    pub(crate) fn reverse_ids(
        &self,
        owner_app_id: &str,
        namespace_name: &str,
        tag: &str,
    ) -> std::collections::BTreeSet<u64> {
        self.reverse.ids(&self.reverse_key(owner_app_id, namespace_name, tag))
    }

    pub(crate) fn index_sizes(&self) -> (usize, usize) {
        (self.forward.len(), self.reverse.len())
    }
}
