#![forbid(unsafe_code)]

//! Core domain model and compliance logic for formulary.
//!
//! This crate provides:
//! - Domain types (ingredients, formulas, items, safety levels)
//! - Unit normalization and safety classification
//! - Formula aggregation, compliance evaluation and reports
//! - CSV export
//! - Persistence (ingredient catalog, owner-scoped formula book)

pub mod types;
pub mod error;
pub mod units;
pub mod classifier;
pub mod aggregator;
pub mod evaluator;
pub mod report;
pub mod export;
pub mod store;
pub mod catalog;
pub mod formulas;
pub mod config;
pub mod logging;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use units::to_milligrams;
pub use classifier::{default_rules, RuleTable, SafetyRule};
pub use aggregator::{aggregate, ComplianceIssue, FormulaAggregate, SafetyCounts};
pub use evaluator::{determine_status, evaluate, Verdict};
pub use report::{check_compliance, compliance_summary, ComplianceReport, ComplianceSummary};
pub use catalog::{build_default_catalog, IngredientCatalog, IngredientFilter};
pub use formulas::{FormulaBook, FormulaPatch, ItemPatch, NewFormula, NewItem};
pub use config::Config;
