//! Per-formula aggregation of safety levels, dose mass and issues.

use crate::classifier::RuleTable;
use crate::units::to_milligrams;
use crate::{ComplianceStatus, DoseUnit, ResolvedItem, SafetyLevel};
use serde::{Deserialize, Serialize};

/// Item counts per safety level.
///
/// `unknown` is informational only and never affects the verdict.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SafetyCounts {
    pub safe: usize,
    pub caution: usize,
    pub risk: usize,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub unknown: usize,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

impl SafetyCounts {
    pub fn record(&mut self, level: SafetyLevel) {
        match level {
            SafetyLevel::Safe => self.safe += 1,
            SafetyLevel::Caution => self.caution += 1,
            SafetyLevel::Risk => self.risk += 1,
            SafetyLevel::Unknown => self.unknown += 1,
        }
    }

    pub fn get(&self, level: SafetyLevel) -> usize {
        match level {
            SafetyLevel::Safe => self.safe,
            SafetyLevel::Caution => self.caution,
            SafetyLevel::Risk => self.risk,
            SafetyLevel::Unknown => self.unknown,
        }
    }
}

/// Structured explanation attached to one flagged formula item
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ComplianceIssue {
    pub ingredient_id: u64,
    pub ingredient: String,
    pub dose: String,
    pub category: String,
    pub severity: SafetyLevel,
    /// Verdict this issue drives on its own
    pub level: ComplianceStatus,
    pub safety_info: String,
    pub message: String,
    pub action: String,
}

/// Result of walking a formula's items
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FormulaAggregate {
    pub total_ingredients: usize,
    pub total_weight_mg: f64,
    pub summary: SafetyCounts,
    pub issues: Vec<ComplianceIssue>,
}

/// Aggregate resolved items, in the order given.
pub fn aggregate(items: &[ResolvedItem<'_>], rules: &RuleTable) -> FormulaAggregate {
    let mut result = FormulaAggregate {
        total_ingredients: items.len(),
        ..FormulaAggregate::default()
    };

    for resolved in items {
        let item = resolved.item;
        let ingredient = resolved.ingredient;
        let level = rules.classify(&ingredient.safety);
        result.summary.record(level);

        match to_milligrams(item.dose_value, &item.dose_unit) {
            Some(mg) => result.total_weight_mg += mg,
            None => match &item.dose_unit {
                DoseUnit::Other(unit) => tracing::warn!(
                    "Item {} ({}) has unrecognized unit '{}', excluded from total weight",
                    item.id,
                    ingredient.name,
                    unit
                ),
                _ => tracing::debug!(
                    "Item {} ({}) dosed in {}, excluded from total weight",
                    item.id,
                    ingredient.name,
                    item.dose_unit
                ),
            },
        }

        if let Some(issue) = issue_for(resolved, level) {
            tracing::debug!("Flagged {} as {}", ingredient.name, level);
            result.issues.push(issue);
        }
    }

    result
}

fn issue_for(resolved: &ResolvedItem<'_>, level: SafetyLevel) -> Option<ComplianceIssue> {
    let ingredient = resolved.ingredient;

    let (status, message, action) = match level {
        SafetyLevel::Risk => (
            ComplianceStatus::Stop,
            format!(
                "{} is a restricted or controlled substance and cannot be included in this formula.",
                ingredient.name
            ),
            "Remove this ingredient before proceeding.".to_string(),
        ),
        SafetyLevel::Caution => (
            ComplianceStatus::Warning,
            format!(
                "{} has conditional safety requirements: {}",
                ingredient.name,
                ingredient.safety.trim()
            ),
            "Review dosage limits, processing and labeling requirements for this ingredient."
                .to_string(),
        ),
        SafetyLevel::Safe | SafetyLevel::Unknown => return None,
    };

    Some(ComplianceIssue {
        ingredient_id: ingredient.id,
        ingredient: ingredient.name.clone(),
        dose: resolved.item.dose_label(),
        category: ingredient.category.clone(),
        severity: level,
        level: status,
        safety_info: ingredient.safety.clone(),
        message,
        action,
    })
}
