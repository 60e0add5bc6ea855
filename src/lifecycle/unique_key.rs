use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;

use lazy_static::lazy_static;

use crate::utils::convert::hash_args;
use crate::utils::time::now_as_compact_timestamp;

const LOW_24_BITS: u32 = 0x00ff_ffff;

lazy_static! {
    static ref MACHINE_IDENTIFIER: u32 = rand::random::<u32>() & LOW_24_BITS;
    static ref COUNTER: AtomicU32 = AtomicU32::new(rand::random::<u32>());
}

/// Globally unique names for branch clusters.
///
/// Format: `yyyyMMddHHmmss-` followed by 20 hex digits packing the argument
/// hash (32 bits), a per-process machine id (24 bits) and a counter (24 bits).
pub struct UniqueKeyGenerator;

impl UniqueKeyGenerator {
    pub fn generate(args: &[&str]) -> String {
        let counter = COUNTER.fetch_add(1, Ordering::Relaxed).wrapping_add(1) & LOW_24_BITS;
        format!(
            "{}-{:08x}{:06x}{:06x}",
            now_as_compact_timestamp(),
            hash_args(args),
            *MACHINE_IDENTIFIER,
            counter
        )
    }
}
