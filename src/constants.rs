// -
// Tag rules

/// Marker prepended once to every tag label at branch creation
pub const SWIMLANE_TAG_PREFIX: &str = "swimlane-";

/// Rows fetched per page by the periodic scan
pub(crate) const DEFAULT_SCAN_PAGE_SIZE: usize = 500;

/// Inactive cache entries survive this many unrefreshed scan passes
pub(crate) const INACTIVE_RULE_MAX_AGE: u64 = 1;

// -
// Notification

/// Channel on which release-change messages are delivered
pub const APOLLO_RELEASE_TOPIC: &str = "apollo-release";

/// Joins `appId`, `cluster` and `namespace` in release messages and cache keys
pub const DEFAULT_KEY_SEPARATOR: char = '+';

// -
// Sled

/// Sled database tree holding every table
pub(crate) const CONFIG_DB_TREE: &str = "_swimlane_config_tree";

/// Sled key prefixes, one per table
pub(crate) const RULE_TABLE: &str = "tag_release_rule";
pub(crate) const CLUSTER_TABLE: &str = "cluster";
pub(crate) const NAMESPACE_TABLE: &str = "namespace";
pub(crate) const RELEASE_TABLE: &str = "release";
pub(crate) const RELEASE_HISTORY_TABLE: &str = "release_history";
pub(crate) const AUDIT_TABLE: &str = "audit";
