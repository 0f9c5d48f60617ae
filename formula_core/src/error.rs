//! Error types for the formula_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for formula_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Ingredient catalog validation error
    #[error("Catalog validation error: {0}")]
    CatalogValidation(String),

    /// Dose value or unit rejected at the item boundary
    #[error("Invalid dose: {0}")]
    InvalidDose(String),

    /// Formula fields rejected (empty name, unknown region)
    #[error("Invalid formula: {0}")]
    InvalidFormula(String),

    /// Referenced ingredient is not in the catalog
    #[error("Unknown ingredient: {0}")]
    UnknownIngredient(String),

    /// Formula does not exist or is not visible to the caller
    #[error("Formula {0} not found")]
    FormulaNotFound(u64),

    /// Item does not exist within the formula
    #[error("Item {item_id} not found in formula {formula_id}")]
    ItemNotFound { formula_id: u64, item_id: u64 },

    /// Ingredient is already part of the formula
    #[error("Ingredient '{0}' already exists in this formula")]
    DuplicateIngredient(String),

    /// Reorder request is not a permutation of the formula's items
    #[error("Invalid item order: {0}")]
    InvalidOrder(String),

    /// Operation requires at least one ingredient
    #[error("Formula {0} has no ingredients")]
    EmptyFormula(u64),

    /// Persisted store could not be read back
    #[error("Store error: {0}")]
    Store(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
