//! Core domain types for the formula compliance system.
//!
//! This module defines the fundamental types used throughout the system:
//! - Ingredients and their derived safety levels
//! - Dose units and regions
//! - Formulas and their ordered items
//! - Compliance verdicts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Ingredient Types
// ============================================================================

/// An ingredient record as held by the catalog.
///
/// `safety_level` and `safety_color` are never stored; see the accessors in
/// [`crate::classifier`].
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Ingredient {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub safety: String,
    #[serde(default)]
    pub evidence: String,
}

/// Classified safety of a single ingredient
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SafetyLevel {
    Safe,
    Caution,
    Risk,
    Unknown,
}

impl SafetyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SafetyLevel::Safe => "SAFE",
            SafetyLevel::Caution => "CAUTION",
            SafetyLevel::Risk => "RISK",
            SafetyLevel::Unknown => "UNKNOWN",
        }
    }

    /// Display color for UI rendering
    pub fn color(&self) -> &'static str {
        match self {
            SafetyLevel::Safe => "#4caf50",
            SafetyLevel::Caution => "#ff9800",
            SafetyLevel::Risk => "#f44336",
            SafetyLevel::Unknown => "#757575",
        }
    }
}

impl fmt::Display for SafetyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SafetyLevel {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "SAFE" => Ok(SafetyLevel::Safe),
            "CAUTION" => Ok(SafetyLevel::Caution),
            "RISK" => Ok(SafetyLevel::Risk),
            "UNKNOWN" => Ok(SafetyLevel::Unknown),
            other => Err(crate::Error::Other(format!("Unknown safety level: {}", other))),
        }
    }
}

// ============================================================================
// Dose Units
// ============================================================================

/// Unit a dose is expressed in.
///
/// Unrecognized strings are kept verbatim in `Other` so they survive into
/// exports unchanged; they are rejected when an item is created or updated.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(from = "String", into = "String")]
pub enum DoseUnit {
    Mg,
    Mcg,
    G,
    Iu,
    Other(String),
}

impl DoseUnit {
    /// Parse a unit string, ignoring case. Only mg, mcg, g and IU are
    /// recognized; anything else becomes `Other`. Never fails.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "mg" => DoseUnit::Mg,
            "mcg" => DoseUnit::Mcg,
            "g" => DoseUnit::G,
            "iu" => DoseUnit::Iu,
            _ => DoseUnit::Other(s.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            DoseUnit::Mg => "mg",
            DoseUnit::Mcg => "mcg",
            DoseUnit::G => "g",
            DoseUnit::Iu => "IU",
            DoseUnit::Other(s) => s,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, DoseUnit::Other(_))
    }
}

impl fmt::Display for DoseUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for DoseUnit {
    fn from(s: String) -> Self {
        DoseUnit::parse(&s)
    }
}

impl From<DoseUnit> for String {
    fn from(unit: DoseUnit) -> Self {
        unit.as_str().to_string()
    }
}

// ============================================================================
// Formula Types
// ============================================================================

/// Regulatory region a formula targets
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Region {
    #[default]
    #[serde(rename = "US")]
    Us,
    #[serde(rename = "EU")]
    Eu,
    #[serde(rename = "CA")]
    Ca,
    #[serde(rename = "AU")]
    Au,
}

impl Region {
    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Us => "US",
            Region::Eu => "EU",
            Region::Ca => "CA",
            Region::Au => "AU",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Region {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "US" => Ok(Region::Us),
            "EU" => Ok(Region::Eu),
            "CA" => Ok(Region::Ca),
            "AU" => Ok(Region::Au),
            other => Err(crate::Error::InvalidFormula(format!(
                "Unknown region '{}' (expected US, EU, CA or AU)",
                other
            ))),
        }
    }
}

/// A single ingredient line within a formula
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FormulaItem {
    pub id: u64,
    pub ingredient_id: u64,
    pub dose_value: f64,
    pub dose_unit: DoseUnit,
    #[serde(default)]
    pub notes: String,
    pub order: u32,
}

impl FormulaItem {
    /// Rendered dose, e.g. `500mg` or `200IU`
    pub fn dose_label(&self) -> String {
        format!("{}{}", self.dose_value, self.dose_unit)
    }
}

/// A user-owned supplement formula
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Formula {
    pub id: u64,
    pub owner: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub region: Region,
    #[serde(default)]
    pub items: Vec<FormulaItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Formula {
    pub fn ingredient_count(&self) -> usize {
        self.items.len()
    }

    /// Items in display order
    pub fn ordered_items(&self) -> Vec<&FormulaItem> {
        let mut items: Vec<_> = self.items.iter().collect();
        items.sort_by_key(|item| (item.order, item.id));
        items
    }
}

/// A formula item paired with the ingredient it references.
///
/// This is the snapshot the compliance core consumes; it never looks
/// ingredients up itself.
#[derive(Clone, Copy, Debug)]
pub struct ResolvedItem<'a> {
    pub item: &'a FormulaItem,
    pub ingredient: &'a Ingredient,
}

// ============================================================================
// Compliance Verdict
// ============================================================================

/// Formula-level verdict
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplianceStatus {
    Approved,
    Warning,
    Stop,
}

impl ComplianceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComplianceStatus::Approved => "APPROVED",
            ComplianceStatus::Warning => "WARNING",
            ComplianceStatus::Stop => "STOP",
        }
    }
}

impl fmt::Display for ComplianceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
