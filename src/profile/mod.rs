//! Personality profile domain: data model, confidence merge, drift
//! detection.
//!
//! The merge engine and drift detector are synchronous pure functions over
//! in-memory data; persistence and rendering live in [`crate::storage`] and
//! [`crate::render`].

pub mod drift;
pub mod merge;
pub mod types;

pub use drift::{detect_drift, DRIFT_CONFIDENCE_DELTA, GLOBAL_FACET, MASS_FLIP_THRESHOLD};
pub use merge::{clamp_confidence, merge_observations, merge_with_drift};
pub use types::{
    ChangeRecord, Demographics, DriftWarning, FacetBelief, FacetEvidence, FacetObservation,
    FacetSnapshot, MergeOutcome, MergeReason, MergeReport, Profile, ProfileSummary,
    DEFAULT_SOURCE,
};
