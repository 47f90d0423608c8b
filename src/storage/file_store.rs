//! File-backed profile store.
//!
//! One directory per profile under a configurable root:
//!
//! ```text
//! <root>/<id>/profile.json   — the profile record
//! <root>/<id>/soul.md        — rendered narrative document
//! <root>/<id>/identity.md    — rendered structured document
//! ```
//!
//! Identifiers are validated against a strict pattern before any path is
//! built, so an id can never escape the storage root. Concurrent writers to
//! the same profile are serialized through a per-id lock held across the
//! version check and the write; the record file is written to a temp path
//! and atomically renamed into place.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;

use crate::profile::types::{Profile, ProfileSummary};
use crate::storage::interface::ProfileStore;
use crate::utilities::errors::ProfileError;
use crate::utilities::paths::storage_root;

const PROFILE_FILE: &str = "profile.json";
const SOUL_FILE: &str = "soul.md";
const IDENTITY_FILE: &str = "identity.md";

static ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]*$").expect("invalid id pattern"));

/// Validate an identifier against the storage namespace pattern.
pub fn validate_id(id: &str) -> Result<(), ProfileError> {
    if ID_PATTERN.is_match(id) {
        Ok(())
    } else {
        Err(ProfileError::InvalidIdentifier { id: id.to_string() })
    }
}

/// File-system implementation of [`ProfileStore`].
pub struct FileProfileStore {
    root: PathBuf,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl FileProfileStore {
    /// Open (and create if needed) a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, ProfileError> {
        let root = root.into();
        fs::create_dir_all(&root)
            .with_context(|| format!("failed to create storage root {}", root.display()))?;
        Ok(Self {
            root,
            locks: DashMap::new(),
        })
    }

    /// Open the store at the default location (`SOULKEEPER_STORAGE_DIR` or
    /// the platform data directory).
    pub fn open_default() -> Result<Self, ProfileError> {
        Self::new(storage_root())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn profile_dir(&self, id: &str) -> Result<PathBuf, ProfileError> {
        validate_id(id)?;
        Ok(self.root.join(id))
    }

    fn lock_for(&self, id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn read_record(path: &Path) -> Result<Option<Profile>, ProfileError> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let profile = serde_json::from_str(&content)
            .with_context(|| format!("malformed profile record at {}", path.display()))?;
        Ok(Some(profile))
    }

    fn write_atomic(path: &Path, content: &str) -> Result<(), ProfileError> {
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content).with_context(|| format!("failed to write {}", tmp.display()))?;
        fs::rename(&tmp, path)
            .with_context(|| format!("failed to move {} into place", tmp.display()))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl ProfileStore for FileProfileStore {
    fn load(&self, id: &str) -> Result<Option<Profile>, ProfileError> {
        let dir = self.profile_dir(id)?;
        Self::read_record(&dir.join(PROFILE_FILE))
    }

    fn load_by_correlation(&self, correlation_id: &str) -> Result<Option<Profile>, ProfileError> {
        // Full scan; profile counts are small and ids are sorted for a
        // deterministic winner if a correlation id was ever duplicated.
        for summary in self.list()? {
            if summary.correlation_id.as_deref() == Some(correlation_id) {
                return self.load(&summary.id);
            }
        }
        Ok(None)
    }

    fn save(
        &self,
        profile: &Profile,
        soul_doc: &str,
        identity_doc: &str,
        expected_version: Option<u64>,
    ) -> Result<(), ProfileError> {
        let dir = self.profile_dir(&profile.id)?;
        let lock = self.lock_for(&profile.id);
        let _guard = lock.lock();

        if let Some(expected) = expected_version {
            if let Some(current) = Self::read_record(&dir.join(PROFILE_FILE))? {
                if current.version != expected {
                    return Err(ProfileError::VersionConflict {
                        expected,
                        actual: current.version,
                    });
                }
            }
        }

        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
        let record = serde_json::to_string_pretty(profile)
            .context("failed to serialize profile record")?;
        Self::write_atomic(&dir.join(PROFILE_FILE), &record)?;
        fs::write(dir.join(SOUL_FILE), soul_doc)
            .with_context(|| format!("failed to write {}", dir.join(SOUL_FILE).display()))?;
        fs::write(dir.join(IDENTITY_FILE), identity_doc)
            .with_context(|| format!("failed to write {}", dir.join(IDENTITY_FILE).display()))?;

        log::debug!(
            "saved profile {} at version {} ({} facets)",
            profile.id,
            profile.version,
            profile.facets.len()
        );
        Ok(())
    }

    fn list(&self) -> Result<Vec<ProfileSummary>, ProfileError> {
        let mut summaries = Vec::new();
        let entries = fs::read_dir(&self.root)
            .with_context(|| format!("failed to read storage root {}", self.root.display()))?;
        for entry in entries {
            let entry = entry.context("failed to read storage entry")?;
            let record = entry.path().join(PROFILE_FILE);
            if !record.is_file() {
                continue;
            }
            match Self::read_record(&record) {
                Ok(Some(profile)) => summaries.push(profile.summary()),
                Ok(None) => {}
                Err(e) => {
                    // A single corrupt record should not hide the rest.
                    log::warn!("skipping unreadable profile at {}: {e}", record.display());
                }
            }
        }
        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(summaries)
    }

    fn delete(&self, id: &str) -> Result<bool, ProfileError> {
        let dir = self.profile_dir(id)?;
        let lock = self.lock_for(id);
        let _guard = lock.lock();

        if !dir.join(PROFILE_FILE).is_file() {
            return Ok(false);
        }
        fs::remove_dir_all(&dir)
            .with_context(|| format!("failed to delete {}", dir.display()))?;
        self.locks.remove(id);
        Ok(true)
    }
}
