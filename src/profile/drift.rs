//! Drift detection over a merge batch.
//!
//! Flags facet flips that happened with suspiciously similar confidence, and
//! batches where too many facets flipped at once. Both rules operate on the
//! change records of a single merge call; nothing is kept across calls and
//! warnings are never persisted.

use crate::profile::types::{ChangeRecord, DriftWarning};

/// A value flip counts as suspicious when the confidence moved by less than
/// this (strict).
pub const DRIFT_CONFIDENCE_DELTA: f64 = 0.2;

/// Number of flips in one batch that triggers a full-profile review warning.
pub const MASS_FLIP_THRESHOLD: usize = 3;

/// Sentinel facet key for batch-wide warnings.
pub const GLOBAL_FACET: &str = "_global";

/// A real flip: the value changed and there was a prior belief to drift
/// from. A fresh facet (prior confidence 0) never counts.
fn is_flip(change: &ChangeRecord) -> bool {
    change.previous.confidence > 0.0 && change.previous.value != change.current.value
}

/// Inspect one batch of change records and return advisory warnings.
///
/// Two independent rules, both may fire:
/// - per-facet: a flip whose confidence delta stayed under
///   [`DRIFT_CONFIDENCE_DELTA`] gets its own warning;
/// - batch-wide: [`MASS_FLIP_THRESHOLD`] or more flips (any delta) add one
///   [`GLOBAL_FACET`] warning.
pub fn detect_drift(changes: &[ChangeRecord]) -> Vec<DriftWarning> {
    let mut warnings = Vec::new();
    let mut flips = 0usize;

    for change in changes {
        if !is_flip(change) {
            continue;
        }
        flips += 1;

        let delta = (change.current.confidence - change.previous.confidence).abs();
        if delta < DRIFT_CONFIDENCE_DELTA {
            let old_value = change.previous.value.as_deref().unwrap_or("?");
            let new_value = change.current.value.as_deref().unwrap_or("?");
            warnings.push(DriftWarning {
                facet: change.facet.clone(),
                message: format!(
                    "value flipped from {:?} ({:.2}) to {:?} ({:.2}) with similar confidence; \
                     user verification recommended",
                    old_value, change.previous.confidence, new_value, change.current.confidence
                ),
            });
        }
    }

    if flips >= MASS_FLIP_THRESHOLD {
        warnings.push(DriftWarning {
            facet: GLOBAL_FACET.to_string(),
            message: format!(
                "{flips} facets changed value in a single update; full profile review recommended"
            ),
        });
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::types::{FacetSnapshot, MergeReason};

    fn flip(facet: &str, old_conf: f64, new_conf: f64) -> ChangeRecord {
        ChangeRecord {
            facet: facet.to_string(),
            previous: FacetSnapshot::of("a", old_conf),
            current: FacetSnapshot::of("b", new_conf),
            reason: MergeReason::HigherConfidenceOverride,
        }
    }

    fn boost(facet: &str, old_conf: f64, new_conf: f64) -> ChangeRecord {
        ChangeRecord {
            facet: facet.to_string(),
            previous: FacetSnapshot::of("a", old_conf),
            current: FacetSnapshot::of("a", new_conf),
            reason: MergeReason::ConfidenceBoost,
        }
    }

    fn fresh(facet: &str, conf: f64) -> ChangeRecord {
        ChangeRecord {
            facet: facet.to_string(),
            previous: FacetSnapshot::absent(),
            current: FacetSnapshot::of("a", conf),
            reason: MergeReason::NewFacet,
        }
    }

    #[test]
    fn test_flip_with_small_delta_warns() {
        let warnings = detect_drift(&[flip("t1", 0.6, 0.65)]);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].facet, "t1");
        assert!(warnings[0].message.contains("0.60"));
        assert!(warnings[0].message.contains("0.65"));
    }

    #[test]
    fn test_flip_with_large_delta_does_not_warn() {
        // |0.7 - 0.4| = 0.3
        assert!(detect_drift(&[flip("t1", 0.4, 0.7)]).is_empty());
    }

    #[test]
    fn test_delta_threshold_is_strict() {
        // Exactly 0.2 does not warn.
        assert!(detect_drift(&[flip("t1", 0.2, 0.4)]).is_empty());
        assert_eq!(detect_drift(&[flip("t1", 0.5, 0.6999)]).len(), 1);
    }

    #[test]
    fn test_fresh_facet_never_counts_as_flip() {
        assert!(detect_drift(&[fresh("t1", 0.9)]).is_empty());
        let records = [fresh("t1", 0.9), fresh("t2", 0.9), fresh("t3", 0.9)];
        assert!(detect_drift(&records).is_empty());
    }

    #[test]
    fn test_same_value_boost_never_warns() {
        assert!(detect_drift(&[boost("t1", 0.5, 0.55)]).is_empty());
    }

    #[test]
    fn test_two_flips_do_not_trigger_global_warning() {
        let records = [flip("t1", 0.4, 0.9), flip("t2", 0.4, 0.9)];
        assert!(detect_drift(&records).is_empty());
    }

    #[test]
    fn test_three_flips_trigger_global_warning() {
        let records = [
            flip("t1", 0.4, 0.9),
            flip("t2", 0.4, 0.9),
            flip("t3", 0.4, 0.9),
        ];
        let warnings = detect_drift(&records);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].facet, GLOBAL_FACET);
        assert!(warnings[0].message.contains('3'));
    }

    #[test]
    fn test_both_rules_fire_independently() {
        let records = [
            flip("t1", 0.6, 0.65),
            flip("t2", 0.6, 0.7),
            flip("t3", 0.6, 0.75),
        ];
        let warnings = detect_drift(&records);
        // Three per-facet warnings plus one global.
        assert_eq!(warnings.len(), 4);
        assert_eq!(
            warnings.iter().filter(|w| w.facet == GLOBAL_FACET).count(),
            1
        );
    }

    #[test]
    fn test_global_count_includes_large_delta_flips() {
        let records = [
            flip("t1", 0.6, 0.65),
            flip("t2", 0.1, 0.9),
            flip("t3", 0.1, 0.9),
        ];
        let warnings = detect_drift(&records);
        assert_eq!(warnings.len(), 2);
        assert!(warnings.iter().any(|w| w.facet == GLOBAL_FACET));
        assert!(warnings.iter().any(|w| w.facet == "t1"));
    }

    #[test]
    fn test_empty_batch_is_quiet() {
        assert!(detect_drift(&[]).is_empty());
    }
}
