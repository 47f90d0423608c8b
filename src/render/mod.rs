//! Markdown rendering of a profile into its two human-readable documents.
//!
//! The "soul" document is a narrative portrait; the "identity" document is a
//! structured fact sheet. Both are deterministic for identical inputs:
//! facets appear in catalog order, and every string comes from the catalog's
//! locale data for the profile's locale.
//!
//! Per-facet confidence maps onto four display tiers: exactly 0 is unknown,
//! below 0.5 is tentative, below 1.0 is stated plainly, exactly 1.0 is
//! confirmed.

use once_cell::sync::Lazy;
use serde::Serialize;
use tera::{Context, Tera};

use crate::catalog::Catalog;
use crate::profile::types::Profile;

static TEMPLATES: Lazy<Tera> = Lazy::new(|| {
    let mut tera = Tera::default();
    tera.add_raw_template("soul.md", include_str!("templates/soul.md.tera"))
        .expect("error compiling embedded soul.md template");
    tera.add_raw_template("identity.md", include_str!("templates/identity.md.tera"))
        .expect("error compiling embedded identity.md template");
    tera
});

/// Display tier for a confidence score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceTier {
    /// Exactly 0: nothing is actually believed.
    Unknown,
    /// In (0, 0.5): a lean, not a statement.
    Tentative,
    /// In [0.5, 1.0): stated plainly.
    Stated,
    /// Exactly 1.0: ground truth.
    Confirmed,
}

/// Map a (clamped) confidence score to its display tier.
pub fn confidence_tier(confidence: f64) -> ConfidenceTier {
    if confidence <= 0.0 {
        ConfidenceTier::Unknown
    } else if confidence < 0.5 {
        ConfidenceTier::Tentative
    } else if confidence < 1.0 {
        ConfidenceTier::Stated
    } else {
        ConfidenceTier::Confirmed
    }
}

/// Both rendered documents for one profile.
#[derive(Debug, Clone)]
pub struct RenderedDocs {
    pub soul: String,
    pub identity: String,
}

#[derive(Serialize)]
struct SoulSection {
    title: String,
    body: String,
}

#[derive(Serialize)]
struct AboutRow {
    label: String,
    value: String,
}

#[derive(Serialize)]
struct FacetRow {
    facet: String,
    value: String,
    confidence: String,
}

#[derive(Serialize)]
struct IdentityCategory {
    title: String,
    rows: Vec<FacetRow>,
}

fn footer(profile: &Profile, catalog: &Catalog, locale: &str) -> String {
    format!(
        "{}: {} · {} {}",
        catalog.ui("updated_label", locale),
        profile.updated_at.format("%Y-%m-%d %H:%M UTC"),
        catalog.ui("version_label", locale),
        profile.version
    )
}

fn percent(confidence: f64) -> String {
    format!("{}%", (confidence * 100.0).round() as i64)
}

/// Render the narrative "soul" document.
pub fn render_soul(profile: &Profile, catalog: &Catalog) -> Result<String, anyhow::Error> {
    let locale = profile.locale.as_str();

    let mut sections = Vec::new();
    for category in catalog.categories() {
        let mut lines = Vec::new();
        for facet in &category.facets {
            let belief = match profile.facets.get(&facet.id) {
                Some(belief) => belief,
                None => continue,
            };
            let label = catalog.label(&facet.id, &belief.value, locale);
            let description = catalog.description(&facet.id, &belief.value, locale);
            let line = match confidence_tier(belief.confidence) {
                ConfidenceTier::Unknown => format!(
                    "{} {}.",
                    catalog.facet_name(&facet.id, locale),
                    catalog.ui("phrase_remains_unknown", locale)
                ),
                ConfidenceTier::Tentative => format!(
                    "{} {} {}.",
                    profile.name,
                    catalog.ui("phrase_may_be", locale),
                    label
                ),
                ConfidenceTier::Stated => format!(
                    "{} {} {}. *{}*",
                    profile.name,
                    catalog.ui("phrase_is", locale),
                    label,
                    description
                ),
                ConfidenceTier::Confirmed => format!(
                    "{} {} {} ({}). *{}*",
                    profile.name,
                    catalog.ui("phrase_is", locale),
                    label,
                    catalog.ui("marker_confirmed", locale),
                    description
                ),
            };
            lines.push(line);
        }
        if !lines.is_empty() {
            sections.push(SoulSection {
                title: catalog.category_name(&category.id, locale),
                body: lines.join("\n"),
            });
        }
    }

    let mut context = Context::new();
    context.insert(
        "title",
        &format!("{} {}", catalog.ui("soul_title_prefix", locale), profile.name),
    );
    context.insert("tagline", &catalog.ui("soul_tagline", locale));
    context.insert("about", &about_line(profile));
    context.insert("sections", &sections);
    context.insert("footer", &footer(profile, catalog, locale));

    Ok(TEMPLATES.render("soul.md", &context)?)
}

/// One-line demographic summary for the soul document, or `None` if the
/// profile has no demographics.
fn about_line(profile: &Profile) -> Option<String> {
    let d = &profile.demographics;
    let mut parts = Vec::new();
    if let Some(pronouns) = &d.pronouns {
        parts.push(pronouns.clone());
    }
    if let Some(age) = d.age {
        parts.push(age.to_string());
    }
    if let Some(occupation) = &d.occupation {
        parts.push(occupation.clone());
    }
    if let Some(location) = &d.location {
        parts.push(location.clone());
    }
    if !d.interests.is_empty() {
        parts.push(d.interests.join(", "));
    }
    if parts.is_empty() {
        None
    } else {
        Some(format!("*{}*", parts.join(" · ")))
    }
}

/// Render the structured "identity" document.
pub fn render_identity(profile: &Profile, catalog: &Catalog) -> Result<String, anyhow::Error> {
    let locale = profile.locale.as_str();

    let mut about_rows = vec![AboutRow {
        label: "Name".to_string(),
        value: profile.name.clone(),
    }];
    let d = &profile.demographics;
    if let Some(pronouns) = &d.pronouns {
        about_rows.push(AboutRow {
            label: catalog.ui("field_pronouns", locale),
            value: pronouns.clone(),
        });
    }
    if let Some(age) = d.age {
        about_rows.push(AboutRow {
            label: catalog.ui("field_age", locale),
            value: age.to_string(),
        });
    }
    if let Some(occupation) = &d.occupation {
        about_rows.push(AboutRow {
            label: catalog.ui("field_occupation", locale),
            value: occupation.clone(),
        });
    }
    if let Some(location) = &d.location {
        about_rows.push(AboutRow {
            label: catalog.ui("field_location", locale),
            value: location.clone(),
        });
    }
    if !d.interests.is_empty() {
        about_rows.push(AboutRow {
            label: catalog.ui("field_interests", locale),
            value: d.interests.join(", "),
        });
    }

    let unknown_marker = catalog.ui("marker_unknown", locale);
    let mut categories = Vec::new();
    for category in catalog.categories() {
        let mut rows = Vec::new();
        for facet in &category.facets {
            let facet_name = catalog.facet_name(&facet.id, locale);
            let row = match profile.facets.get(&facet.id) {
                None => FacetRow {
                    facet: facet_name,
                    value: "—".to_string(),
                    confidence: unknown_marker.clone(),
                },
                Some(belief) => {
                    let label = catalog.label(&facet.id, &belief.value, locale);
                    match confidence_tier(belief.confidence) {
                        ConfidenceTier::Unknown => FacetRow {
                            facet: facet_name,
                            value: "—".to_string(),
                            confidence: unknown_marker.clone(),
                        },
                        ConfidenceTier::Tentative => FacetRow {
                            facet: facet_name,
                            value: label,
                            confidence: format!(
                                "{} ({})",
                                percent(belief.confidence),
                                catalog.ui("marker_tentative", locale)
                            ),
                        },
                        ConfidenceTier::Stated => FacetRow {
                            facet: facet_name,
                            value: label,
                            confidence: percent(belief.confidence),
                        },
                        ConfidenceTier::Confirmed => FacetRow {
                            facet: facet_name,
                            value: label,
                            confidence: format!(
                                "100% ({})",
                                catalog.ui("marker_confirmed", locale)
                            ),
                        },
                    }
                }
            };
            rows.push(row);
        }
        categories.push(IdentityCategory {
            title: catalog.category_name(&category.id, locale),
            rows,
        });
    }

    let mut context = Context::new();
    context.insert(
        "title",
        &format!("{}: {}", catalog.ui("identity_title", locale), profile.name),
    );
    context.insert("about_heading", &catalog.ui("about_heading", locale));
    context.insert("facets_heading", &catalog.ui("facets_heading", locale));
    context.insert("col_facet", &catalog.ui("col_facet", locale));
    context.insert("col_value", &catalog.ui("col_value", locale));
    context.insert("col_confidence", &catalog.ui("col_confidence", locale));
    context.insert("about_rows", &about_rows);
    context.insert("categories", &categories);
    context.insert("footer", &footer(profile, catalog, locale));

    Ok(TEMPLATES.render("identity.md", &context)?)
}

/// Render both documents.
pub fn render_documents(profile: &Profile, catalog: &Catalog) -> Result<RenderedDocs, anyhow::Error> {
    Ok(RenderedDocs {
        soul: render_soul(profile, catalog)?,
        identity: render_identity(profile, catalog)?,
    })
}
