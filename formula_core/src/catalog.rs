//! Ingredient catalog: lookup, CSV import and read-only queries.
//!
//! The catalog is the persistence-side source of ingredient records. The
//! compliance core only ever sees ingredients already resolved from it.

use crate::classifier::RuleTable;
use crate::store::{load_json, save_json, update_json};
use crate::{Ingredient, Result, SafetyLevel};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::io::Read;
use std::path::Path;

/// Cached default catalog - built once and reused
static DEFAULT_CATALOG: Lazy<IngredientCatalog> = Lazy::new(build_default_catalog);

/// Get a reference to the cached default catalog
pub fn get_default_catalog() -> &'static IngredientCatalog {
    &DEFAULT_CATALOG
}

/// All known ingredients, keyed by id
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct IngredientCatalog {
    ingredients: BTreeMap<u64, Ingredient>,
}

/// Outcome of a CSV import
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
}

/// Query filters; all text filters are case-insensitive substring matches
#[derive(Clone, Debug, Default)]
pub struct IngredientFilter {
    pub category: Option<String>,
    pub source: Option<String>,
    pub safety: Option<String>,
    /// Matches name, category or source
    pub search: Option<String>,
    pub exclude_risk: bool,
}

#[derive(Clone, Copy, Debug, Default, Serialize, PartialEq, Eq)]
pub struct LevelCounts {
    pub safe: usize,
    pub caution: usize,
    pub risk: usize,
}

#[derive(Clone, Copy, Debug, Default, Serialize, PartialEq, Eq)]
pub struct CatalogStats {
    pub total: usize,
    pub by_safety_level: LevelCounts,
    pub categories: usize,
}

/// Ingredient import file row (`Ingredient,Category,Source,Safety,Evidence`)
#[derive(Debug, Deserialize)]
struct ImportRow {
    #[serde(rename = "Ingredient", default)]
    name: String,
    #[serde(rename = "Category", default)]
    category: String,
    #[serde(rename = "Source", default)]
    source: String,
    #[serde(rename = "Safety", default)]
    safety: String,
    #[serde(rename = "Evidence", default)]
    evidence: String,
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

impl IngredientCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.ingredients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ingredients.is_empty()
    }

    pub fn get(&self, id: u64) -> Option<&Ingredient> {
        self.ingredients.get(&id)
    }

    /// Exact name match first, then case-insensitive
    pub fn find_by_name(&self, name: &str) -> Option<&Ingredient> {
        let name = name.trim();
        self.ingredients
            .values()
            .find(|i| i.name == name)
            .or_else(|| {
                self.ingredients
                    .values()
                    .find(|i| i.name.eq_ignore_ascii_case(name))
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Ingredient> {
        self.ingredients.values()
    }

    fn next_id(&self) -> u64 {
        self.ingredients.keys().next_back().map_or(1, |id| id + 1)
    }

    /// Insert or update by exact name. Returns the id and whether it was created.
    pub fn upsert(
        &mut self,
        name: &str,
        category: &str,
        source: &str,
        safety: &str,
        evidence: &str,
    ) -> (u64, bool) {
        let existing = self
            .ingredients
            .values()
            .find(|i| i.name == name)
            .map(|i| i.id);

        let (id, created) = match existing {
            Some(id) => (id, false),
            None => (self.next_id(), true),
        };

        self.ingredients.insert(
            id,
            Ingredient {
                id,
                name: name.to_string(),
                category: category.to_string(),
                source: source.to_string(),
                safety: safety.to_string(),
                evidence: evidence.to_string(),
            },
        );
        (id, created)
    }

    /// Import ingredients from CSV, updating existing names in place.
    ///
    /// Rows without a name or that fail to parse are skipped and counted.
    pub fn import_csv<R: Read>(&mut self, reader: R) -> Result<ImportSummary> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let mut summary = ImportSummary::default();

        for (idx, row) in reader.deserialize::<ImportRow>().enumerate() {
            // header is line 1
            let line = idx + 2;
            let row = match row {
                Ok(row) => row,
                Err(e) => {
                    tracing::warn!("Row {}: {}", line, e);
                    summary.skipped += 1;
                    continue;
                }
            };

            if row.name.is_empty() {
                tracing::warn!("Row {}: skipping, no ingredient name", line);
                summary.skipped += 1;
                continue;
            }

            let (_, created) = self.upsert(
                &row.name,
                &row.category,
                &row.source,
                &row.safety,
                &row.evidence,
            );
            if created {
                summary.created += 1;
            } else {
                summary.updated += 1;
            }
        }

        tracing::info!(
            "Imported ingredients: {} created, {} updated, {} skipped",
            summary.created,
            summary.updated,
            summary.skipped
        );
        Ok(summary)
    }

    /// Import from a CSV file on disk
    pub fn import_csv_path(&mut self, path: &Path) -> Result<ImportSummary> {
        let file = std::fs::File::open(path)?;
        self.import_csv(file)
    }

    /// Ingredients matching `filter`, ordered by name
    pub fn filter(&self, filter: &IngredientFilter, rules: &RuleTable) -> Vec<&Ingredient> {
        let mut matches: Vec<_> = self
            .ingredients
            .values()
            .filter(|i| {
                filter
                    .category
                    .as_deref()
                    .map_or(true, |c| contains_ci(&i.category, c))
            })
            .filter(|i| {
                filter
                    .source
                    .as_deref()
                    .map_or(true, |s| contains_ci(&i.source, s))
            })
            .filter(|i| {
                filter
                    .safety
                    .as_deref()
                    .map_or(true, |s| contains_ci(&i.safety, s))
            })
            .filter(|i| {
                filter.search.as_deref().map_or(true, |q| {
                    contains_ci(&i.name, q) || contains_ci(&i.category, q) || contains_ci(&i.source, q)
                })
            })
            .filter(|i| !filter.exclude_risk || i.safety_level_with(rules) != SafetyLevel::Risk)
            .collect();

        matches.sort_by(|a, b| a.name.cmp(&b.name));
        matches
    }

    /// Distinct non-empty categories, sorted
    pub fn categories(&self) -> Vec<String> {
        self.ingredients
            .values()
            .map(|i| i.category.as_str())
            .filter(|c| !c.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(String::from)
            .collect()
    }

    /// Distinct non-empty sources, sorted
    pub fn sources(&self) -> Vec<String> {
        self.ingredients
            .values()
            .map(|i| i.source.as_str())
            .filter(|s| !s.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(String::from)
            .collect()
    }

    pub fn stats(&self, rules: &RuleTable) -> CatalogStats {
        let mut by_level = LevelCounts::default();
        for ingredient in self.ingredients.values() {
            match ingredient.safety_level_with(rules) {
                SafetyLevel::Safe => by_level.safe += 1,
                SafetyLevel::Caution => by_level.caution += 1,
                SafetyLevel::Risk => by_level.risk += 1,
                SafetyLevel::Unknown => {}
            }
        }

        CatalogStats {
            total: self.ingredients.len(),
            by_safety_level: by_level,
            categories: self.categories().len(),
        }
    }

    /// Validate the catalog for consistency
    ///
    /// Returns a list of validation errors, or empty Vec if valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let mut seen = HashSet::new();

        for (id, ingredient) in &self.ingredients {
            if *id != ingredient.id {
                errors.push(format!(
                    "Ingredient key {} doesn't match ingredient.id {}",
                    id, ingredient.id
                ));
            }
            if ingredient.name.trim().is_empty() {
                errors.push(format!("Ingredient {} has empty name", id));
            } else if !seen.insert(ingredient.name.as_str()) {
                errors.push(format!("Duplicate ingredient name '{}'", ingredient.name));
            }
        }

        errors
    }

    /// Load a persisted catalog (empty if the file doesn't exist)
    pub fn load(path: &Path) -> Result<Self> {
        let catalog: Self = load_json(path)?;
        tracing::debug!("Loaded {} ingredients from {:?}", catalog.len(), path);
        Ok(catalog)
    }

    /// Load a persisted catalog, falling back to the built-in one
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::info!("No ingredient catalog at {:?}, using built-in catalog", path);
            Ok(get_default_catalog().clone())
        }
    }

    /// Load, modify and save the catalog under an exclusive lock.
    ///
    /// With no persisted catalog yet, `f` starts from the built-in one so
    /// that ids already referenced by formulas keep naming the same
    /// ingredients.
    pub fn update<F, R>(path: &Path, f: F) -> Result<R>
    where
        F: FnOnce(&mut IngredientCatalog) -> Result<R>,
    {
        update_json(path, |catalog: &mut IngredientCatalog| {
            // still under the lock, before the first save creates the file
            if !path.exists() {
                tracing::info!("Seeding ingredient catalog at {:?} from built-in catalog", path);
                *catalog = get_default_catalog().clone();
            }
            f(catalog)
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        save_json(self, path)?;
        tracing::info!("Saved {} ingredients to {:?}", self.len(), path);
        Ok(())
    }
}

/// Builds the built-in sample catalog, one or more ingredients per level
pub fn build_default_catalog() -> IngredientCatalog {
    let mut catalog = IngredientCatalog::new();

    let entries = [
        (
            "Vitamin C",
            "Vitamins",
            "Synthetic",
            "General dietary use",
            "Well-established antioxidant properties",
        ),
        (
            "Vitamin D3",
            "Vitamins",
            "Lanolin",
            "General dietary use",
            "Supports calcium absorption",
        ),
        (
            "Magnesium Glycinate",
            "Minerals",
            "Synthetic",
            "General dietary use",
            "Well tolerated chelated form",
        ),
        (
            "Zinc Picolinate",
            "Minerals",
            "Synthetic",
            "General dietary use, do not exceed 40 mg daily",
            "Immune support",
        ),
        (
            "Ashwagandha Root",
            "Herbs",
            "Plant",
            "General dietary use",
            "Traditional adaptogen",
        ),
        (
            "Kava Extract",
            "Herbs",
            "Plant",
            "Caution, processing required",
            "Anxiolytic; hepatotoxicity reports with improper extraction",
        ),
        (
            "Comfrey Leaf",
            "Herbs",
            "Plant",
            "Topical use only; contains pyrrolizidine alkaloids",
            "Traditional wound care",
        ),
        (
            "Ephedra",
            "Herbs",
            "Plant",
            "Banned for sale in dietary supplements",
            "Cardiovascular adverse events",
        ),
        (
            "DMAA",
            "Stimulants",
            "Synthetic",
            "Restricted substance",
            "Not lawfully marketed as a supplement",
        ),
        ("Moringa Leaf", "Herbs", "Plant", "", ""),
    ];

    for (name, category, source, safety, evidence) in entries {
        catalog.upsert(name, category, source, safety, evidence);
    }

    catalog
}
