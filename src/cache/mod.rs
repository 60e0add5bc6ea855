//! In-process tag rule cache and its reconciliation engine.
mod entry;
mod holder;
mod index;
mod scanner;

pub use entry::*;
pub use holder::*;
pub(crate) use index::*;
pub use scanner::*;
