//! Reduction of aggregated counts to a single compliance verdict.
//!
//! Rules, in priority order:
//! 1. Any RISK item → STOP (blocks the formula)
//! 2. Any CAUTION item → WARNING (may proceed)
//! 3. Otherwise → APPROVED
//!
//! UNKNOWN items never raise the verdict.

use crate::aggregator::SafetyCounts;
use crate::ComplianceStatus;
use serde::{Deserialize, Serialize};

/// Outcome of evaluating a formula's counts
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Verdict {
    pub status: ComplianceStatus,
    pub status_message: String,
    pub can_proceed: bool,
}

pub fn evaluate(summary: &SafetyCounts) -> Verdict {
    let status = determine_status(summary);
    Verdict {
        status,
        status_message: status_message(status, summary),
        can_proceed: status != ComplianceStatus::Stop,
    }
}

pub fn determine_status(summary: &SafetyCounts) -> ComplianceStatus {
    if summary.risk > 0 {
        ComplianceStatus::Stop
    } else if summary.caution > 0 {
        ComplianceStatus::Warning
    } else {
        ComplianceStatus::Approved
    }
}

fn status_message(status: ComplianceStatus, summary: &SafetyCounts) -> String {
    match status {
        ComplianceStatus::Approved => {
            "Formula approved: no ingredients require attention.".to_string()
        }
        ComplianceStatus::Warning => format!(
            "Formula contains {} ingredient(s) that require attention. Review the issues before proceeding.",
            summary.caution
        ),
        ComplianceStatus::Stop => format!(
            "Formula cannot proceed, contains {} restricted ingredient(s). Remove them before continuing.",
            summary.risk
        ),
    }
}
