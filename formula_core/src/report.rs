//! Compliance reports over a formula snapshot.
//!
//! Reports are recomputed on every request and never cached: any item
//! mutation would make a stored report unsafe to reuse.

use crate::aggregator::{aggregate, ComplianceIssue, SafetyCounts};
use crate::classifier::RuleTable;
use crate::evaluator::evaluate;
use crate::{ComplianceStatus, Formula, Region, ResolvedItem};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Full compliance check result
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ComplianceReport {
    pub formula_id: u64,
    pub formula_name: String,
    pub region: Region,
    pub status: ComplianceStatus,
    pub status_message: String,
    pub can_proceed: bool,
    pub total_ingredients: usize,
    pub total_weight_mg: f64,
    pub summary: SafetyCounts,
    pub issues: Vec<ComplianceIssue>,
    pub checked_at: DateTime<Utc>,
}

/// Compact view for list and dashboard use
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComplianceSummary {
    pub status: ComplianceStatus,
    pub summary: SafetyCounts,
    pub total_ingredients: usize,
}

impl ComplianceReport {
    pub fn summary(&self) -> ComplianceSummary {
        ComplianceSummary {
            status: self.status,
            summary: self.summary,
            total_ingredients: self.total_ingredients,
        }
    }
}

/// Run the full check.
///
/// `items` must be the formula's items in display order, each resolved to
/// its ingredient.
pub fn check_compliance(
    formula: &Formula,
    items: &[ResolvedItem<'_>],
    rules: &RuleTable,
    now: DateTime<Utc>,
) -> ComplianceReport {
    let agg = aggregate(items, rules);
    let verdict = evaluate(&agg.summary);

    tracing::info!(
        "Formula {} checked: {} ({} ingredients, {} issues)",
        formula.id,
        verdict.status,
        agg.total_ingredients,
        agg.issues.len()
    );

    ComplianceReport {
        formula_id: formula.id,
        formula_name: formula.name.clone(),
        region: formula.region,
        status: verdict.status,
        status_message: verdict.status_message,
        can_proceed: verdict.can_proceed,
        total_ingredients: agg.total_ingredients,
        total_weight_mg: agg.total_weight_mg,
        summary: agg.summary,
        issues: agg.issues,
        checked_at: now,
    }
}

/// Summary-only check
pub fn compliance_summary(items: &[ResolvedItem<'_>], rules: &RuleTable) -> ComplianceSummary {
    let agg = aggregate(items, rules);
    ComplianceSummary {
        status: evaluate(&agg.summary).status,
        summary: agg.summary,
        total_ingredients: agg.total_ingredients,
    }
}
