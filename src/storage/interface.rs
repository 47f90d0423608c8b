//! Abstract repository interface for profile persistence.
//!
//! Backends implement the synchronous methods; the `a`-prefixed async
//! variants default to calling them directly and exist so async callers can
//! stay backend-agnostic.

use async_trait::async_trait;

use crate::profile::types::{Profile, ProfileSummary};
use crate::utilities::errors::ProfileError;

/// Repository contract for profile records and their rendered documents.
///
/// Writes to the same profile id are serialized by the implementation; the
/// optimistic version check in [`ProfileStore::save`] is the unit of
/// concurrency control across load-merge-save cycles.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Load a profile by id. `Ok(None)` if it does not exist.
    fn load(&self, id: &str) -> Result<Option<Profile>, ProfileError>;

    /// Load a profile by its external correlation id. `Ok(None)` if no
    /// stored profile carries it.
    fn load_by_correlation(&self, correlation_id: &str) -> Result<Option<Profile>, ProfileError>;

    /// Persist a profile together with its two rendered documents.
    ///
    /// With `expected_version = Some(v)`, the write succeeds only if the
    /// currently-stored version still equals `v`; a mismatch fails with
    /// [`ProfileError::VersionConflict`] and leaves the record untouched.
    /// If no record exists yet there is no conflict (first write wins).
    /// With `None`, the write is unconditional.
    fn save(
        &self,
        profile: &Profile,
        soul_doc: &str,
        identity_doc: &str,
        expected_version: Option<u64>,
    ) -> Result<(), ProfileError>;

    /// Summaries of every stored profile, ordered by id.
    fn list(&self) -> Result<Vec<ProfileSummary>, ProfileError>;

    /// Delete a profile and its documents. Returns whether it existed.
    fn delete(&self, id: &str) -> Result<bool, ProfileError>;

    async fn aload(&self, id: &str) -> Result<Option<Profile>, ProfileError> {
        self.load(id)
    }

    async fn aload_by_correlation(
        &self,
        correlation_id: &str,
    ) -> Result<Option<Profile>, ProfileError> {
        self.load_by_correlation(correlation_id)
    }

    async fn asave(
        &self,
        profile: &Profile,
        soul_doc: &str,
        identity_doc: &str,
        expected_version: Option<u64>,
    ) -> Result<(), ProfileError> {
        self.save(profile, soul_doc, identity_doc, expected_version)
    }

    async fn alist(&self) -> Result<Vec<ProfileSummary>, ProfileError> {
        self.list()
    }

    async fn adelete(&self, id: &str) -> Result<bool, ProfileError> {
        self.delete(id)
    }
}
