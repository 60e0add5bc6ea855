//! Release-change notifications.
//!
//! Publishers announce that a namespace was released by sending
//! `appId<sep>cluster<sep>namespace` on the release topic. Delivery is best
//! effort: listeners must tolerate lost, duplicated and reordered messages.
mod bus;
mod key;

pub use bus::*;
pub use key::*;

#[cfg(test)]
mod key_test;

#[cfg(test)]
use mockall::automock;

use crate::Result;

/// One delivered release-change message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseMessage {
    /// Bus-assigned sequence number, informational only
    pub id: u64,
    pub message: String,
}

impl ReleaseMessage {
    pub fn new(
        id: u64,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id,
            message: message.into(),
        }
    }
}

/// Publishing side of the release topic
#[cfg_attr(test, automock)]
pub trait MessageSender: Send + Sync + 'static {
    fn send_message(
        &self,
        message: &str,
        channel: &str,
    ) -> Result<()>;
}

/// Consumer of release-change messages. Invoked once per delivered message,
/// possibly concurrently with other invocations.
#[cfg_attr(test, automock)]
pub trait ReleaseMessageListener: Send + Sync + 'static {
    fn handle_message(
        &self,
        message: &ReleaseMessage,
        channel: &str,
    );
}
