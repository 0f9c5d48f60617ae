//! Keyword-driven safety classification.
//!
//! Classification policy is data: an ordered [`RuleTable`] of
//! (keywords → level) rules evaluated top-down, first match wins.
//! Text that matches no rule is SAFE; empty text is UNKNOWN.

use crate::{Ingredient, SafetyLevel};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Cached built-in policy
static DEFAULT_RULES: Lazy<RuleTable> = Lazy::new(build_default_rules);

/// Get a reference to the built-in rule table
pub fn default_rules() -> &'static RuleTable {
    &DEFAULT_RULES
}

/// One policy rule: any keyword found in the text assigns `level`
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SafetyRule {
    pub level: SafetyLevel,
    pub keywords: Vec<String>,
}

impl SafetyRule {
    pub fn new(level: SafetyLevel, keywords: &[&str]) -> Self {
        Self {
            level,
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    /// `text` must already be lowercased
    fn matches(&self, text: &str) -> bool {
        self.keywords
            .iter()
            .any(|k| !k.is_empty() && text.contains(k.as_str()))
    }
}

/// Ordered classification policy
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(from = "Vec<SafetyRule>", into = "Vec<SafetyRule>")]
pub struct RuleTable {
    rules: Vec<SafetyRule>,
}

impl From<Vec<SafetyRule>> for RuleTable {
    fn from(rules: Vec<SafetyRule>) -> Self {
        RuleTable::new(rules)
    }
}

impl From<RuleTable> for Vec<SafetyRule> {
    fn from(table: RuleTable) -> Self {
        table.rules
    }
}

impl RuleTable {
    /// Build a table; keywords are normalized to trimmed lowercase
    pub fn new(rules: Vec<SafetyRule>) -> Self {
        let rules = rules
            .into_iter()
            .map(|rule| SafetyRule {
                level: rule.level,
                keywords: rule
                    .keywords
                    .iter()
                    .map(|k| k.trim().to_lowercase())
                    .collect(),
            })
            .collect();
        Self { rules }
    }

    pub fn rules(&self) -> &[SafetyRule] {
        &self.rules
    }

    /// Classify a free-text safety description
    pub fn classify(&self, text: &str) -> SafetyLevel {
        let text = text.trim();
        if text.is_empty() {
            return SafetyLevel::Unknown;
        }

        let lowered = text.to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.matches(&lowered))
            .map(|rule| rule.level)
            .unwrap_or(SafetyLevel::Safe)
    }

    /// Validate the table for consistency
    ///
    /// Returns a list of validation errors, or empty Vec if valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.rules.is_empty() {
            errors.push("Rule table has no rules".to_string());
        }

        for (idx, rule) in self.rules.iter().enumerate() {
            if rule.level == SafetyLevel::Unknown {
                errors.push(format!(
                    "Rule {} maps to UNKNOWN, which is reserved for empty text",
                    idx + 1
                ));
            }
            if rule.keywords.is_empty() {
                errors.push(format!("Rule {} ({}) has no keywords", idx + 1, rule.level));
            }
            if rule.keywords.iter().any(|k| k.is_empty()) {
                errors.push(format!("Rule {} ({}) has an empty keyword", idx + 1, rule.level));
            }
        }

        // RISK must never be shadowed by a milder rule listed before it
        if let Some(first_risk) = self
            .rules
            .iter()
            .position(|r| r.level == SafetyLevel::Risk)
        {
            if self.rules[..first_risk]
                .iter()
                .any(|r| r.level != SafetyLevel::Risk)
            {
                errors.push("RISK rules must precede all other rules".to_string());
            }
        }

        errors
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        default_rules().clone()
    }
}

fn build_default_rules() -> RuleTable {
    RuleTable::new(vec![
        SafetyRule::new(
            SafetyLevel::Risk,
            &[
                "banned",
                "controlled",
                "restricted",
                "illegal",
                "prohibited",
                "not for sale",
                "high-risk",
                "high risk",
            ],
        ),
        SafetyRule::new(
            SafetyLevel::Caution,
            &[
                "caution",
                "topical",
                "external",
                "processing required",
                "alkaloid",
                "dosage limit",
                "dose limit",
                "do not exceed",
                "maximum daily",
            ],
        ),
        SafetyRule::new(
            SafetyLevel::Safe,
            &["general dietary use", "generally recognized as safe"],
        ),
    ])
}

impl Ingredient {
    /// Safety level under the built-in policy
    pub fn safety_level(&self) -> SafetyLevel {
        default_rules().classify(&self.safety)
    }

    /// Safety level under a caller-supplied policy
    pub fn safety_level_with(&self, rules: &RuleTable) -> SafetyLevel {
        rules.classify(&self.safety)
    }

    pub fn safety_color(&self) -> &'static str {
        self.safety_level().color()
    }
}
