//! Confidence-merge engine.
//!
//! Reconciles a batch of new facet observations against the previously
//! stored beliefs. Each facet is decided independently, first match wins:
//!
//! 1. Incoming confidence `1.0`: caller asserts ground truth, adopt it.
//! 2. Existing confidence `1.0`: stored ground truth, keep it.
//! 3. Same value: combine as independent evidence,
//!    `1 - (1 - old)(1 - new)`.
//! 4. Conflicting value: higher confidence wins, ties keep the existing.
//!
//! Pure computation: inputs are never mutated, no I/O. History entries and
//! change records are produced only when the resulting `(value, confidence)`
//! pair differs from the stored one.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::profile::drift::detect_drift;
use crate::profile::types::{
    ChangeRecord, FacetBelief, FacetEvidence, FacetObservation, FacetSnapshot, MergeOutcome,
    MergeReason, MergeReport,
};

/// Clamp a confidence score to `[0, 1]`. Out-of-range input is a caller
/// error that is silently corrected, never rejected. NaN collapses to 0.
pub fn clamp_confidence(confidence: f64) -> f64 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}

/// Combine two independent pieces of evidence for the same conclusion.
///
/// Monotonically non-decreasing in both inputs; saturates toward 1.0 but
/// only reaches it when an input is already 1.0.
fn combine_reinforcing(old: f64, new: f64) -> f64 {
    1.0 - (1.0 - old) * (1.0 - new)
}

/// Merge a batch of observations into an existing belief map.
///
/// Returns the updated map and one [`ChangeRecord`] per facet whose
/// `(value, confidence)` pair actually changed. Facets absent from
/// `incoming` pass through untouched. `now` is stamped on every history
/// entry appended by this call.
pub fn merge_observations(
    existing: &BTreeMap<String, FacetBelief>,
    incoming: &BTreeMap<String, FacetObservation>,
    source: &str,
    now: DateTime<Utc>,
) -> MergeOutcome {
    let mut merged = existing.clone();
    let mut changes = Vec::new();
    let mut tally: HashMap<MergeReason, usize> = HashMap::new();

    for (facet, observation) in incoming {
        let new_conf = clamp_confidence(observation.confidence);

        let (result_value, result_conf, reason) = match merged.get(facet) {
            None => (observation.value.clone(), new_conf, MergeReason::NewFacet),
            Some(belief) => decide(belief, &observation.value, new_conf),
        };
        *tally.entry(reason).or_insert(0) += 1;

        let previous = match merged.get(facet) {
            None => FacetSnapshot::absent(),
            Some(belief) => FacetSnapshot::of(&belief.value, belief.confidence),
        };

        // No-op resolutions leave both history and the changelog untouched.
        if previous.value.as_deref() == Some(result_value.as_str())
            && previous.confidence == result_conf
        {
            continue;
        }

        let evidence = FacetEvidence {
            value: result_value.clone(),
            confidence: result_conf,
            source: source.to_string(),
            timestamp: now,
        };
        match merged.entry(facet.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(FacetBelief::from_evidence(evidence));
            }
            Entry::Occupied(mut slot) => {
                let belief = slot.get_mut();
                belief.value = result_value.clone();
                belief.confidence = result_conf;
                belief.history.push(evidence);
            }
        }

        changes.push(ChangeRecord {
            facet: facet.clone(),
            previous,
            current: FacetSnapshot::of(&result_value, result_conf),
            reason,
        });
    }

    if !incoming.is_empty() {
        log::debug!(
            "merged {} observation(s) from {:?}: {} change(s), reasons {:?}",
            incoming.len(),
            source,
            changes.len(),
            tally
        );
    }

    MergeOutcome { merged, changes }
}

/// Resolve one facet against its existing belief. First match wins.
fn decide(belief: &FacetBelief, new_value: &str, new_conf: f64) -> (String, f64, MergeReason) {
    if new_conf == 1.0 {
        (new_value.to_string(), 1.0, MergeReason::UserConfirmed)
    } else if belief.confidence == 1.0 {
        (belief.value.clone(), 1.0, MergeReason::ExistingUserConfirmed)
    } else if new_value == belief.value {
        (
            belief.value.clone(),
            combine_reinforcing(belief.confidence, new_conf),
            MergeReason::ConfidenceBoost,
        )
    } else if new_conf > belief.confidence {
        (
            new_value.to_string(),
            new_conf,
            MergeReason::HigherConfidenceOverride,
        )
    } else {
        (
            belief.value.clone(),
            belief.confidence,
            MergeReason::ExistingRetained,
        )
    }
}

/// The composed operation every caller uses: merge the batch, then run
/// drift detection over its change records.
pub fn merge_with_drift(
    existing: &BTreeMap<String, FacetBelief>,
    incoming: &BTreeMap<String, FacetObservation>,
    source: &str,
    now: DateTime<Utc>,
) -> MergeReport {
    let MergeOutcome { merged, changes } = merge_observations(existing, incoming, source, now);
    let drift_warnings = detect_drift(&changes);
    MergeReport {
        merged,
        changes,
        drift_warnings,
    }
}
