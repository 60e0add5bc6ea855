//! Tag-based swimlane routing for a configuration service.
//!
//! A swimlane node keeps an in-memory index of tag release rules that tells
//! the config-serving path which branch release a tagged client should
//! receive, and offers the administrative operations that create, rebind and
//! retire tag branches. See [`NodeBuilder`] for assembling a node.
mod cache;
mod config;
mod constants;
mod errors;
mod lifecycle;
mod metrics;
mod model;
mod node;
mod notification;
mod storage;
pub mod utils;

pub use cache::*;
pub use config::*;
pub use constants::*;
pub use errors::*;
pub use lifecycle::*;
pub use metrics::*;
pub use model::*;
pub use node::*;
pub use notification::*;
pub use storage::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;
