use std::collections::hash_map::DefaultHasher;
use std::hash::Hash;
use std::hash::Hasher;

/// Hash of an argument list, folded to 32 bits
pub fn hash_args(args: &[&str]) -> u32 {
    let mut hasher = DefaultHasher::new();
    args.hash(&mut hasher);
    let h = hasher.finish();
    (h ^ (h >> 32)) as u32
}
