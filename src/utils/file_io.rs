use std::fs::create_dir_all;
use std::fs::File;
use std::fs::OpenOptions;
use std::path::Path;

use tracing::error;

use crate::Result;
use crate::StorageError;

/// Creates `dir` and its parents when missing.
pub fn create_dir_if_not_exist(dir: &Path) -> Result<()> {
    if !dir.exists() {
        if let Err(e) = create_dir_all(dir) {
            error!("Failed to create directory {:?}: {:?}", dir, e);
            return Err(StorageError::PathError {
                path: dir.to_path_buf(),
                source: e,
            }
            .into());
        }
    }
    Ok(())
}

/// Opens `path` for appending, creating it and its parent directory first.
pub fn open_file_for_append(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        create_dir_if_not_exist(parent)?;
    }
    OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .map_err(|e| StorageError::IoError(e).into())
}
