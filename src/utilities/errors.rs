//! Error types shared across the profile service.

use thiserror::Error;

/// Errors surfaced by profile operations and the storage layer.
///
/// `VersionConflict` is distinguished from the other variants so callers can
/// implement reload-and-retry; everything else is either a caller-contract
/// violation (bad or missing identifier, unknown profile) or a storage
/// failure propagated unmodified.
#[derive(Debug, Error)]
pub enum ProfileError {
    /// Neither a profile id nor a correlation id was supplied.
    #[error("either a profile id or a correlation id must be supplied")]
    MissingIdentifier,

    /// The referenced profile does not exist.
    #[error("profile not found: {id}")]
    NotFound { id: String },

    /// The identifier contains characters that could escape the storage
    /// namespace.
    #[error("invalid profile identifier: {id:?}")]
    InvalidIdentifier { id: String },

    /// A profile with this id already exists.
    #[error("profile already exists: {id}")]
    AlreadyExists { id: String },

    /// The stored record moved on since it was read.
    #[error("version conflict: expected version {expected}, found {actual}")]
    VersionConflict { expected: u64, actual: u64 },

    /// Underlying storage I/O failure.
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl ProfileError {
    /// Whether the caller can recover by reloading and retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProfileError::VersionConflict { .. })
    }
}
