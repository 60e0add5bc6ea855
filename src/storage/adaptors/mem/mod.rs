mod mem_storage_engine;

pub use mem_storage_engine::*;
