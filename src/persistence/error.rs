//! Helpers for building persistence errors

use crate::persistence::PersistenceError;

/// Create a corrupted data error
pub fn corrupted_data(reason: impl Into<String>) -> PersistenceError {
    PersistenceError::CorruptedData(reason.into())
}

/// Create a version mismatch error
pub fn version_mismatch(expected: u32, found: u32) -> PersistenceError {
    PersistenceError::VersionMismatch { expected, found }
}

/// Create a load error carrying the file path
pub fn load_error(path: impl AsRef<std::path::Path>, error: impl std::fmt::Display) -> PersistenceError {
    PersistenceError::DeserializationError(format!("Load failed for {}: {}", path.as_ref().display(), error))
}
