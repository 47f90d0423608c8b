//! Static facet catalog and localized strings.
//!
//! Twelve binary facets across four categories, defined in an embedded YAML
//! file, with per-locale labels, descriptions, and UI strings embedded as
//! JSON. The catalog is read-only, constructed once, and handed to the
//! renderer and validation layers by reference; the merge engine never
//! touches it and treats facet ids as opaque keys.

use std::collections::HashMap;
use std::sync::OnceLock;

use serde::Deserialize;

/// Embedded catalog structure.
const FACETS_YAML: &str = include_str!("facets.yaml");

/// Embedded locale strings. The first entry is the fallback locale.
const LOCALES: &[(&str, &str)] = &[
    ("en", include_str!("locales/en.json")),
    ("es", include_str!("locales/es.json")),
];

/// Fallback locale for any string a locale file is missing.
pub const FALLBACK_LOCALE: &str = "en";

// ---------------------------------------------------------------------------
// Definitions
// ---------------------------------------------------------------------------

/// One binary facet: an opaque id and its two poles.
#[derive(Debug, Clone, Deserialize)]
pub struct FacetDef {
    pub id: String,
    pub poles: [String; 2],
}

impl FacetDef {
    /// Whether `value` is one of this facet's two poles.
    pub fn has_pole(&self, value: &str) -> bool {
        self.poles.iter().any(|p| p == value)
    }
}

/// A named group of facets.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryDef {
    pub id: String,
    pub facets: Vec<FacetDef>,
}

#[derive(Debug, Deserialize)]
struct CatalogData {
    categories: Vec<CategoryDef>,
}

#[derive(Debug, Clone, Deserialize)]
struct PoleStrings {
    label: String,
    description: String,
}

#[derive(Debug, Clone, Deserialize)]
struct FacetStrings {
    name: String,
    poles: HashMap<String, PoleStrings>,
}

#[derive(Debug, Clone, Deserialize)]
struct LocaleData {
    categories: HashMap<String, String>,
    facets: HashMap<String, FacetStrings>,
    ui: HashMap<String, String>,
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// The facet catalog: structure plus localized strings.
#[derive(Debug)]
pub struct Catalog {
    categories: Vec<CategoryDef>,
    facet_index: HashMap<String, FacetDef>,
    locales: HashMap<String, LocaleData>,
}

static CATALOG: OnceLock<Catalog> = OnceLock::new();

impl Catalog {
    /// The process-wide catalog, constructed on first use.
    pub fn get() -> &'static Catalog {
        CATALOG.get_or_init(Catalog::load_default)
    }

    /// Parse the embedded catalog and locale files.
    ///
    /// # Panics
    /// Panics if the embedded data is malformed; that is a build defect, not
    /// a runtime condition.
    pub fn load_default() -> Self {
        let data: CatalogData =
            serde_yaml::from_str(FACETS_YAML).expect("error decoding embedded facets.yaml");

        let mut facet_index = HashMap::new();
        for category in &data.categories {
            for facet in &category.facets {
                facet_index.insert(facet.id.clone(), facet.clone());
            }
        }

        let mut locales = HashMap::new();
        for (locale, json) in LOCALES {
            let parsed: LocaleData = serde_json::from_str(json)
                .unwrap_or_else(|e| panic!("error decoding embedded {locale}.json: {e}"));
            locales.insert(locale.to_string(), parsed);
        }

        Self {
            categories: data.categories,
            facet_index,
            locales,
        }
    }

    /// Categories in catalog order.
    pub fn categories(&self) -> &[CategoryDef] {
        &self.categories
    }

    /// Look up a facet definition by id.
    pub fn facet(&self, id: &str) -> Option<&FacetDef> {
        self.facet_index.get(id)
    }

    /// Total number of facets across all categories.
    pub fn facet_count(&self) -> usize {
        self.facet_index.len()
    }

    /// Locales with embedded strings.
    pub fn available_locales(&self) -> Vec<&str> {
        LOCALES.iter().map(|(locale, _)| *locale).collect()
    }

    pub fn has_locale(&self, locale: &str) -> bool {
        self.locales.contains_key(locale)
    }

    fn locale_data(&self, locale: &str) -> &LocaleData {
        self.locales
            .get(locale)
            .unwrap_or_else(|| &self.locales[FALLBACK_LOCALE])
    }

    /// Localized display name of a category. Falls back to the id.
    pub fn category_name(&self, category: &str, locale: &str) -> String {
        self.locale_data(locale)
            .categories
            .get(category)
            .cloned()
            .unwrap_or_else(|| category.to_string())
    }

    /// Localized display name of a facet. Falls back to the id.
    pub fn facet_name(&self, facet: &str, locale: &str) -> String {
        self.locale_data(locale)
            .facets
            .get(facet)
            .map(|f| f.name.clone())
            .unwrap_or_else(|| facet.to_string())
    }

    /// Localized label for a facet pole. Falls back to the raw value.
    pub fn label(&self, facet: &str, value: &str, locale: &str) -> String {
        self.locale_data(locale)
            .facets
            .get(facet)
            .and_then(|f| f.poles.get(value))
            .map(|p| p.label.clone())
            .unwrap_or_else(|| value.to_string())
    }

    /// Localized description for a facet pole. Falls back to the raw value.
    pub fn description(&self, facet: &str, value: &str, locale: &str) -> String {
        self.locale_data(locale)
            .facets
            .get(facet)
            .and_then(|f| f.poles.get(value))
            .map(|p| p.description.clone())
            .unwrap_or_else(|| value.to_string())
    }

    /// Localized UI string by key. Falls back to `en`, then to the key.
    pub fn ui(&self, key: &str, locale: &str) -> String {
        let data = self.locale_data(locale);
        if let Some(value) = data.ui.get(key) {
            return value.clone();
        }
        self.locales[FALLBACK_LOCALE]
            .ui
            .get(key)
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }
}
