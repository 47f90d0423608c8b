//! Domain model for personality profiles.
//!
//! A profile owns a map of binary facets, each tracked as a [`FacetBelief`]:
//! the currently believed pole, a confidence score in `[0, 1]`, and an
//! append-only history of the observations that produced it. Merging new
//! observations into a profile is handled by [`crate::profile::merge`];
//! these types are plain data.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default source label recorded when the caller does not supply one.
pub const DEFAULT_SOURCE: &str = "text_analysis";

// ---------------------------------------------------------------------------
// Observations and beliefs
// ---------------------------------------------------------------------------

/// One caller-supplied observation of a facet, not yet merged.
///
/// `confidence` is a probability-like strength-of-belief score. Out-of-range
/// values are clamped to `[0, 1]` by the merge engine rather than rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetObservation {
    /// The observed pole of the facet.
    pub value: String,
    /// Strength of belief in `[0, 1]`. Exactly `1.0` is a reserved sentinel
    /// meaning "ground truth, overrides everything".
    pub confidence: f64,
}

impl FacetObservation {
    pub fn new(value: impl Into<String>, confidence: f64) -> Self {
        Self {
            value: value.into(),
            confidence,
        }
    }
}

/// One provenance entry in a facet's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetEvidence {
    /// The pole this entry settled on.
    pub value: String,
    /// The confidence after the merge that produced this entry.
    pub confidence: f64,
    /// Free-text label of what produced the observation.
    pub source: String,
    /// When the entry was appended.
    pub timestamp: DateTime<Utc>,
}

/// The persisted state for one facet: current value, confidence, and the
/// append-only, chronologically ordered history behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetBelief {
    pub value: String,
    pub confidence: f64,
    #[serde(default)]
    pub history: Vec<FacetEvidence>,
}

impl FacetBelief {
    /// Build a belief from a single piece of evidence.
    pub fn from_evidence(evidence: FacetEvidence) -> Self {
        Self {
            value: evidence.value.clone(),
            confidence: evidence.confidence,
            history: vec![evidence],
        }
    }
}

// ---------------------------------------------------------------------------
// Merge output
// ---------------------------------------------------------------------------

/// Classification of how a merge decision was reached.
///
/// `ExistingUserConfirmed` and `ExistingRetained` resolve to no-ops and never
/// appear in a [`ChangeRecord`]; they exist for trace logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeReason {
    /// The facet had no prior belief; the observation was adopted as-is.
    NewFacet,
    /// The incoming observation carried confidence `1.0`.
    UserConfirmed,
    /// The existing belief is ground truth and cannot be overridden.
    ExistingUserConfirmed,
    /// A reinforcing observation raised the confidence.
    ConfidenceBoost,
    /// A conflicting observation won on higher confidence.
    HigherConfidenceOverride,
    /// A conflicting observation lost; the existing belief stands.
    ExistingRetained,
}

/// Before/after image of a facet inside a [`ChangeRecord`].
///
/// `value` is `None` and `confidence` is `0.0` when the facet had no prior
/// belief.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetSnapshot {
    pub value: Option<String>,
    pub confidence: f64,
}

impl FacetSnapshot {
    /// Snapshot of a facet with no prior belief.
    pub fn absent() -> Self {
        Self {
            value: None,
            confidence: 0.0,
        }
    }

    pub fn of(value: &str, confidence: f64) -> Self {
        Self {
            value: Some(value.to_string()),
            confidence,
        }
    }
}

/// Record of one facet actually changed (or newly introduced) by a merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub facet: String,
    pub previous: FacetSnapshot,
    pub current: FacetSnapshot,
    pub reason: MergeReason,
}

/// Advisory warning produced by drift detection on a merge batch.
///
/// Never persisted. `facet` is the sentinel `"_global"` for batch-wide
/// warnings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftWarning {
    pub facet: String,
    pub message: String,
}

/// Result of merging one batch of observations.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    /// The updated belief map. The input map is never mutated.
    pub merged: BTreeMap<String, FacetBelief>,
    /// One record per facet whose `(value, confidence)` actually changed.
    pub changes: Vec<ChangeRecord>,
}

/// [`MergeOutcome`] plus the drift warnings for the same batch. This is the
/// composed result every caller consumes.
#[derive(Debug, Clone)]
pub struct MergeReport {
    pub merged: BTreeMap<String, FacetBelief>,
    pub changes: Vec<ChangeRecord>,
    pub drift_warnings: Vec<DriftWarning>,
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// Optional free-form identity fields, as a fixed enumerated set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Demographics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pronouns: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occupation: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interests: Vec<String>,
}

impl Demographics {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// The unit of storage and of optimistic concurrency control.
///
/// `version` starts at 1 and increases by exactly 1 per successful save that
/// follows a merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub name: String,
    /// External correlation id (e.g. a chat or CRM identity), if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    pub locale: String,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub demographics: Demographics,
    #[serde(default)]
    pub facets: BTreeMap<String, FacetBelief>,
}

impl Profile {
    /// Create an empty profile at version 1 with a generated id.
    pub fn new(name: impl Into<String>, locale: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            correlation_id: None,
            locale: locale.into(),
            version: 1,
            created_at: now,
            updated_at: now,
            demographics: Demographics::default(),
            facets: BTreeMap::new(),
        }
    }

    /// Apply a merge outcome: replace the belief map, bump the version by 1,
    /// and refresh the modification timestamp.
    pub fn apply_merge(&mut self, merged: BTreeMap<String, FacetBelief>, now: DateTime<Utc>) {
        self.facets = merged;
        self.version += 1;
        self.updated_at = now;
    }

    pub fn summary(&self) -> ProfileSummary {
        ProfileSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            correlation_id: self.correlation_id.clone(),
            locale: self.locale.clone(),
            version: self.version,
            updated_at: self.updated_at,
            facet_count: self.facets.len(),
        }
    }
}

/// Listing row for a stored profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    pub locale: String,
    pub version: u64,
    pub updated_at: DateTime<Utc>,
    pub facet_count: usize,
}
