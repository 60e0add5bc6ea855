//! Persisted row types of the configuration store.
//!
//! Every row carries the same bookkeeping columns ([`DataChange`]): a
//! soft-delete flag, creator/modifier and timestamps. Reads through any
//! [`crate::RuleStore`] never return soft-deleted rows.
mod audit;
mod cluster;
mod release;
mod rule;

pub use audit::*;
pub use cluster::*;
pub use release::*;
pub use rule::*;


use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

/// Bookkeeping columns shared by every table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataChange {
    pub is_deleted: bool,
    pub created_by: String,
    pub created_time: DateTime<Utc>,
    pub last_modified_by: String,
    pub last_modified_time: DateTime<Utc>,
}

impl DataChange {
    pub fn new(operator: &str) -> Self {
        let now = Utc::now();
        Self {
            is_deleted: false,
            created_by: operator.to_string(),
            created_time: now,
            last_modified_by: operator.to_string(),
            last_modified_time: now,
        }
    }

    /// Flags the row deleted on behalf of `operator`
    pub fn mark_deleted(
        &mut self,
        operator: &str,
    ) {
        self.is_deleted = true;
        self.last_modified_by = operator.to_string();
        self.last_modified_time = Utc::now();
    }
}
