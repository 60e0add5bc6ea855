//! Tag Release Error Hierarchy
//!
//! Defines error types for the swimlane node, categorized by the layer that
//! produces them: infrastructure (storage, notification transport), rule
//! lifecycle mutations and the reconciliation engine.

use std::path::PathBuf;

use config::ConfigError;
use tokio::task::JoinError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Infrastructure-level failures (storage, notification transport)
    #[error(transparent)]
    System(#[from] SystemError),

    /// Configuration loading and validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Tag branch lifecycle violations, surfaced to administrative callers
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// Reconciliation engine failures, never surfaced to resolution callers
    #[error(transparent)]
    Cache(#[from] CacheError),
}

#[derive(Debug, thiserror::Error)]
pub enum SystemError {
    // Storage layer
    #[error("Storage operation failed: {0}")]
    Storage(#[from] StorageError),

    // Pub/sub layer
    #[error("Notification error: {0}")]
    Notification(#[from] NotificationError),

    #[error("Node failed to start: {0}")]
    NodeStartFailed(String),

    #[error("Background task failed: {0}")]
    TaskFailed(#[from] JoinError),

    #[error("Failed to send shutdown signal: {0}")]
    SignalSenderClosed(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Disk I/O failures while opening or writing the store
    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error("Error occurred at path: {path}")]
    PathError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Serialization failures for persisted rows
    #[error(transparent)]
    BincodeError(#[from] bincode::Error),

    /// Embedded database errors
    #[error("Embedded database error: {0}")]
    DbError(String),

    /// Row referenced by a write does not exist (or is soft-deleted)
    #[error("{table} row {id} not found")]
    RowNotFound { table: &'static str, id: u64 },
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    /// Message on the release channel that is not `appId<sep>cluster<sep>namespace`
    #[error("Malformed release message on channel {channel}: {message:?}")]
    Malformed { channel: String, message: String },

    /// Message delivered on a channel this listener does not serve
    #[error("Unexpected channel {0}")]
    UnexpectedChannel(String),

    /// Bus queue is full or closed; the message was dropped
    #[error("Release message dropped: {0}")]
    Dropped(String),
}

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// Parent cluster missing, or itself a branch cluster
    #[error("Cluster {cluster} of app {app_id} does not exist or is not a root cluster")]
    InvalidBranch { app_id: String, cluster: String },

    /// A currently relevant rule already binds this tag
    #[error("Tag {tag} already exists for {app_id}/{cluster}/{namespace}")]
    Conflict {
        app_id: String,
        cluster: String,
        namespace: String,
        tag: String,
    },

    /// Branch or namespace absent where one is required
    #[error("{0} not found")]
    NotFound(String),
}

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Any failure while paginating the rule table; the pass is abandoned
    #[error("Scan pass {load_version} aborted after id {last_scanned_id}: {source}")]
    ScanPass {
        load_version: u64,
        last_scanned_id: u64,
        #[source]
        source: Box<Error>,
    },

    /// Shutdown observed between pages
    #[error("Scan pass {0} interrupted by shutdown")]
    Interrupted(u64),
}

// ============== Conversion Implementations ============== //
impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Error::System(SystemError::Storage(e))
    }
}

impl From<NotificationError> for Error {
    fn from(e: NotificationError) -> Self {
        Error::System(SystemError::Notification(e))
    }
}

impl From<sled::Error> for Error {
    fn from(err: sled::Error) -> Self {
        StorageError::DbError(err.to_string()).into()
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        StorageError::BincodeError(err).into()
    }
}

impl From<JoinError> for Error {
    fn from(err: JoinError) -> Self {
        SystemError::TaskFailed(err).into()
    }
}
