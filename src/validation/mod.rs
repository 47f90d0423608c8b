//! Boundary validation: raw request payloads in, typed core inputs out.
//!
//! Validation is explicit: each function walks its payload and accumulates
//! field-level errors rather than failing on the first one, so a caller sees
//! everything wrong with a request at once. Out-of-range confidence is NOT
//! an error here: clamping is input normalization and belongs to the merge
//! engine.

use std::collections::BTreeMap;

use serde_json::Value;
use thiserror::Error;

use crate::catalog::Catalog;
use crate::profile::types::{Demographics, FacetObservation};

/// One field-level problem with a request payload.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// All field errors found in one payload.
#[derive(Debug, Clone, Error)]
#[error("invalid request: {}", summarize(errors))]
pub struct ValidationErrors {
    pub errors: Vec<ValidationError>,
}

fn summarize(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

fn finish<T>(value: T, errors: Vec<ValidationError>) -> Result<T, ValidationErrors> {
    if errors.is_empty() {
        Ok(value)
    } else {
        Err(ValidationErrors { errors })
    }
}

/// Validate a map of raw facet observations against the catalog.
///
/// Each entry must be an object `{ "value": <pole>, "confidence": <number> }`
/// where the facet id exists in the catalog, the value is one of that
/// facet's two poles, and the confidence is a finite number (clamping to
/// `[0, 1]` happens later, in the core).
pub fn validate_observations(
    raw: &BTreeMap<String, Value>,
    catalog: &Catalog,
) -> Result<BTreeMap<String, FacetObservation>, ValidationErrors> {
    let mut observations = BTreeMap::new();
    let mut errors = Vec::new();

    for (facet_id, entry) in raw {
        let field = format!("facets.{facet_id}");

        let facet = match catalog.facet(facet_id) {
            Some(facet) => facet,
            None => {
                errors.push(ValidationError::new(&field, "unknown facet"));
                continue;
            }
        };

        let object = match entry.as_object() {
            Some(object) => object,
            None => {
                errors.push(ValidationError::new(
                    &field,
                    "expected an object with value and confidence",
                ));
                continue;
            }
        };

        let value = match object.get("value").and_then(Value::as_str) {
            Some(value) => value,
            None => {
                errors.push(ValidationError::new(
                    format!("{field}.value"),
                    "expected a string",
                ));
                continue;
            }
        };
        if !facet.has_pole(value) {
            errors.push(ValidationError::new(
                format!("{field}.value"),
                format!(
                    "expected one of {:?}, got {value:?}",
                    facet.poles
                ),
            ));
            continue;
        }

        let confidence = match object.get("confidence").and_then(Value::as_f64) {
            Some(confidence) if confidence.is_finite() => confidence,
            _ => {
                errors.push(ValidationError::new(
                    format!("{field}.confidence"),
                    "expected a finite number",
                ));
                continue;
            }
        };

        observations.insert(facet_id.clone(), FacetObservation::new(value, confidence));
    }

    finish(observations, errors)
}

/// Validate demographics. The field set itself is closed at the serde layer
/// (`deny_unknown_fields`); this checks the values.
pub fn validate_demographics(demographics: &Demographics) -> Result<(), ValidationErrors> {
    let mut errors = Vec::new();
    if let Some(age) = demographics.age {
        if age > 150 {
            errors.push(ValidationError::new(
                "demographics.age",
                "expected an age between 0 and 150",
            ));
        }
    }
    if demographics.interests.iter().any(|i| i.trim().is_empty()) {
        errors.push(ValidationError::new(
            "demographics.interests",
            "interests must not be blank",
        ));
    }
    finish((), errors)
}

/// Validate a requested locale against the catalog; `None` falls back to the
/// catalog's fallback locale.
pub fn validate_locale(
    locale: Option<&str>,
    catalog: &Catalog,
) -> Result<String, ValidationErrors> {
    match locale {
        None => Ok(crate::catalog::FALLBACK_LOCALE.to_string()),
        Some(locale) if catalog.has_locale(locale) => Ok(locale.to_string()),
        Some(locale) => Err(ValidationErrors {
            errors: vec![ValidationError::new(
                "locale",
                format!(
                    "unsupported locale {locale:?}; available: {:?}",
                    catalog.available_locales()
                ),
            )],
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(entries: &[(&str, Value)]) -> BTreeMap<String, Value> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_valid_observations_pass_through() {
        let observations = validate_observations(
            &raw(&[(
                "sociability",
                json!({"value": "introverted", "confidence": 0.7}),
            )]),
            Catalog::get(),
        )
        .unwrap();
        assert_eq!(
            observations["sociability"],
            FacetObservation::new("introverted", 0.7)
        );
    }

    #[test]
    fn test_out_of_range_confidence_is_not_an_error() {
        let observations = validate_observations(
            &raw(&[(
                "sociability",
                json!({"value": "introverted", "confidence": 3.5}),
            )]),
            Catalog::get(),
        )
        .unwrap();
        // Passed through unclamped; the merge engine normalizes it.
        assert_eq!(observations["sociability"].confidence, 3.5);
    }

    #[test]
    fn test_unknown_facet_rejected() {
        let err = validate_observations(
            &raw(&[("charisma", json!({"value": "high", "confidence": 0.5}))]),
            Catalog::get(),
        )
        .unwrap_err();
        assert_eq!(err.errors.len(), 1);
        assert_eq!(err.errors[0].field, "facets.charisma");
    }

    #[test]
    fn test_wrong_pole_rejected() {
        let err = validate_observations(
            &raw(&[(
                "sociability",
                json!({"value": "ambiverted", "confidence": 0.5}),
            )]),
            Catalog::get(),
        )
        .unwrap_err();
        assert_eq!(err.errors[0].field, "facets.sociability.value");
    }

    #[test]
    fn test_all_errors_reported_at_once() {
        let err = validate_observations(
            &raw(&[
                ("charisma", json!({"value": "high", "confidence": 0.5})),
                ("sociability", json!({"value": "introverted"})),
                ("outlook", json!("optimistic")),
            ]),
            Catalog::get(),
        )
        .unwrap_err();
        assert_eq!(err.errors.len(), 3);
    }

    #[test]
    fn test_non_finite_confidence_rejected() {
        // JSON cannot carry NaN/Infinity, but a null or string can arrive.
        let err = validate_observations(
            &raw(&[(
                "sociability",
                json!({"value": "introverted", "confidence": "high"}),
            )]),
            Catalog::get(),
        )
        .unwrap_err();
        assert_eq!(err.errors[0].field, "facets.sociability.confidence");
    }

    #[test]
    fn test_demographics_age_bounds() {
        let mut d = Demographics::default();
        d.age = Some(200);
        assert!(validate_demographics(&d).is_err());
        d.age = Some(34);
        assert!(validate_demographics(&d).is_ok());
    }

    #[test]
    fn test_locale_validation() {
        let catalog = Catalog::get();
        assert_eq!(validate_locale(None, catalog).unwrap(), "en");
        assert_eq!(validate_locale(Some("es"), catalog).unwrap(), "es");
        assert!(validate_locale(Some("tlh"), catalog).is_err());
    }
}
