//! Owner-scoped formula storage.
//!
//! Every operation takes the calling owner. Formulas belonging to someone
//! else are reported as not found, exactly like formulas that don't exist.
//! Dose and unit validation happens here, at the item-mutation boundary, so
//! the compliance core only ever receives well-formed items.

use crate::catalog::IngredientCatalog;
use crate::store::{load_json, save_json, update_json};
use crate::units::validate_dose;
use crate::{
    DoseUnit, Error, Formula, FormulaItem, Ingredient, Region, ResolvedItem, Result,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// All formulas, keyed by id
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct FormulaBook {
    #[serde(default)]
    last_id: u64,
    #[serde(default)]
    formulas: BTreeMap<u64, Formula>,
}

#[derive(Clone, Debug, Default)]
pub struct NewFormula {
    pub name: String,
    pub description: String,
    pub region: Region,
}

#[derive(Clone, Debug, Default)]
pub struct FormulaPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub region: Option<Region>,
}

#[derive(Clone, Debug)]
pub struct NewItem {
    pub dose_value: f64,
    pub dose_unit: DoseUnit,
    pub notes: String,
}

/// Mutable item fields; the ingredient reference is fixed at creation
#[derive(Clone, Debug, Default)]
pub struct ItemPatch {
    pub dose_value: Option<f64>,
    pub dose_unit: Option<DoseUnit>,
    pub notes: Option<String>,
}

fn validate_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidFormula("name must not be empty".into()));
    }
    Ok(name.to_string())
}

impl FormulaBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Formulas visible to `owner`, by id
    pub fn list_formulas(&self, owner: &str) -> Vec<&Formula> {
        self.formulas.values().filter(|f| f.owner == owner).collect()
    }

    pub fn get(&self, owner: &str, id: u64) -> Result<&Formula> {
        self.formulas
            .get(&id)
            .filter(|f| f.owner == owner)
            .ok_or(Error::FormulaNotFound(id))
    }

    fn get_mut(&mut self, owner: &str, id: u64) -> Result<&mut Formula> {
        self.formulas
            .get_mut(&id)
            .filter(|f| f.owner == owner)
            .ok_or(Error::FormulaNotFound(id))
    }

    pub fn create_formula(&mut self, owner: &str, new: NewFormula) -> Result<&Formula> {
        let name = validate_name(&new.name)?;
        self.last_id += 1;
        let id = self.last_id;
        let now = Utc::now();

        let formula = Formula {
            id,
            owner: owner.to_string(),
            name,
            description: new.description,
            region: new.region,
            items: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        tracing::info!("Created formula {} '{}' for {}", id, formula.name, owner);
        Ok(self.formulas.entry(id).or_insert(formula))
    }

    pub fn update_formula(&mut self, owner: &str, id: u64, patch: FormulaPatch) -> Result<&Formula> {
        let name = patch.name.as_deref().map(validate_name).transpose()?;
        let formula = self.get_mut(owner, id)?;

        if let Some(name) = name {
            formula.name = name;
        }
        if let Some(description) = patch.description {
            formula.description = description;
        }
        if let Some(region) = patch.region {
            formula.region = region;
        }
        formula.updated_at = Utc::now();

        Ok(formula)
    }

    /// Delete a formula and all of its items
    pub fn delete_formula(&mut self, owner: &str, id: u64) -> Result<Formula> {
        self.get(owner, id)?;
        let formula = self
            .formulas
            .remove(&id)
            .ok_or(Error::FormulaNotFound(id))?;
        tracing::info!(
            "Deleted formula {} with {} items",
            id,
            formula.items.len()
        );
        Ok(formula)
    }

    pub fn add_ingredient(
        &mut self,
        owner: &str,
        id: u64,
        ingredient: &Ingredient,
        new: NewItem,
    ) -> Result<&FormulaItem> {
        validate_dose(new.dose_value, &new.dose_unit)?;
        let formula = self.get_mut(owner, id)?;

        if formula
            .items
            .iter()
            .any(|item| item.ingredient_id == ingredient.id)
        {
            return Err(Error::DuplicateIngredient(ingredient.name.clone()));
        }

        let item_id = formula.items.iter().map(|i| i.id).max().unwrap_or(0) + 1;
        formula.items.push(FormulaItem {
            id: item_id,
            ingredient_id: ingredient.id,
            dose_value: new.dose_value,
            dose_unit: new.dose_unit,
            notes: new.notes,
            order: formula.items.len() as u32,
        });
        formula.updated_at = Utc::now();

        tracing::info!(
            "Added {} to formula {} as item {}",
            ingredient.name,
            id,
            item_id
        );
        Ok(&formula.items[formula.items.len() - 1])
    }

    pub fn update_ingredient(
        &mut self,
        owner: &str,
        id: u64,
        item_id: u64,
        patch: ItemPatch,
    ) -> Result<&FormulaItem> {
        let formula = self.get_mut(owner, id)?;
        let idx = formula
            .items
            .iter()
            .position(|i| i.id == item_id)
            .ok_or(Error::ItemNotFound {
                formula_id: id,
                item_id,
            })?;

        let current = &formula.items[idx];
        let dose_value = patch.dose_value.unwrap_or(current.dose_value);
        let dose_unit = patch
            .dose_unit
            .unwrap_or_else(|| current.dose_unit.clone());
        validate_dose(dose_value, &dose_unit)?;

        let item = &mut formula.items[idx];
        item.dose_value = dose_value;
        item.dose_unit = dose_unit;
        if let Some(notes) = patch.notes {
            item.notes = notes;
        }
        formula.updated_at = Utc::now();

        Ok(&formula.items[idx])
    }

    /// Remove an item; remaining items keep their relative order
    pub fn remove_ingredient(&mut self, owner: &str, id: u64, item_id: u64) -> Result<FormulaItem> {
        let formula = self.get_mut(owner, id)?;
        let idx = formula
            .items
            .iter()
            .position(|i| i.id == item_id)
            .ok_or(Error::ItemNotFound {
                formula_id: id,
                item_id,
            })?;

        let removed = formula.items.remove(idx);
        renumber(formula);
        formula.updated_at = Utc::now();

        tracing::info!("Removed item {} from formula {}", item_id, id);
        Ok(removed)
    }

    /// Reorder items; `item_ids` must list every item exactly once
    pub fn reorder_items(&mut self, owner: &str, id: u64, item_ids: &[u64]) -> Result<&Formula> {
        let formula = self.get_mut(owner, id)?;

        let existing: HashSet<u64> = formula.items.iter().map(|i| i.id).collect();
        let requested: HashSet<u64> = item_ids.iter().copied().collect();
        if requested.len() != item_ids.len() {
            return Err(Error::InvalidOrder("item ids repeat".into()));
        }
        if requested != existing {
            return Err(Error::InvalidOrder(format!(
                "expected a permutation of {} item ids",
                existing.len()
            )));
        }

        for item in &mut formula.items {
            if let Some(pos) = item_ids.iter().position(|&i| i == item.id) {
                item.order = pos as u32;
            }
        }
        formula.items.sort_by_key(|i| i.order);
        formula.updated_at = Utc::now();

        Ok(formula)
    }

    /// Copy a formula and its items under a new name
    pub fn duplicate_formula(&mut self, owner: &str, id: u64, name: &str) -> Result<&Formula> {
        let name = validate_name(name)?;
        let source = self.get(owner, id)?.clone();

        self.last_id += 1;
        let new_id = self.last_id;
        let now = Utc::now();

        let copy = Formula {
            id: new_id,
            name,
            items: source.ordered_items().into_iter().cloned().collect(),
            created_at: now,
            updated_at: now,
            ..source
        };

        tracing::info!("Duplicated formula {} as {}", id, new_id);
        Ok(self.formulas.entry(new_id).or_insert(copy))
    }

    pub fn load(path: &Path) -> Result<Self> {
        load_json(path)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        save_json(self, path)
    }

    /// Load, modify and save the book under an exclusive lock
    pub fn update<F, R>(path: &Path, f: F) -> Result<R>
    where
        F: FnOnce(&mut FormulaBook) -> Result<R>,
    {
        update_json(path, f)
    }
}

fn renumber(formula: &mut Formula) {
    formula.items.sort_by_key(|i| i.order);
    for (pos, item) in formula.items.iter_mut().enumerate() {
        item.order = pos as u32;
    }
}

impl Formula {
    /// Pair each item, in display order, with its catalog ingredient
    pub fn resolve<'a>(&'a self, catalog: &'a IngredientCatalog) -> Result<Vec<ResolvedItem<'a>>> {
        self.ordered_items()
            .into_iter()
            .map(|item| {
                let ingredient = catalog.get(item.ingredient_id).ok_or_else(|| {
                    Error::UnknownIngredient(format!(
                        "id {} (item {} of formula {})",
                        item.ingredient_id, item.id, self.id
                    ))
                })?;
                Ok(ResolvedItem { item, ingredient })
            })
            .collect()
    }
}
