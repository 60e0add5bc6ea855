mod sled_storage_engine;

pub use sled_storage_engine::*;


use crate::Result;

/// Opens (or creates) the config database under `sled_db_root_path`.
#[doc(hidden)]
pub fn init_sled_config_db(
    sled_db_root_path: impl AsRef<std::path::Path> + std::fmt::Debug
) -> Result<::sled::Db> {
    tracing::debug!("init_sled_config_db from path: {:?}", &sled_db_root_path);

    let path = sled_db_root_path.as_ref();
    let config_db_path = path.join("config_db");

    ::sled::Config::default()
        .path(&config_db_path)
        .cache_capacity(64 * 1024 * 1024) //64MB
        .flush_every_ms(Some(10))
        .use_compression(true)
        .compression_factor(1)
        .open()
        .map_err(|e| {
            tracing::warn!(
                "Try to open DB at this location: {:?} and failed: {:?}",
                config_db_path,
                e
            );
            e.into()
        })
}
