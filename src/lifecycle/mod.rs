//! Tag branch lifecycle: the only writer of tag release rules.
//!
//! Rule rows are replaced by inserting the successor before deleting the
//! predecessor, so the successor always carries the larger id. The rule cache
//! depends on this ordering.
mod namespace_tag_service;
mod unique_key;

pub use namespace_tag_service::*;
pub use unique_key::*;
