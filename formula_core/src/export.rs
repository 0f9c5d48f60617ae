//! Tabular (CSV) export of formula items.
//!
//! One row per item in display order. Multi-formula exports prefix each row
//! with the formula's id and name.

use crate::classifier::RuleTable;
use crate::{Formula, ResolvedItem, Result, SafetyLevel};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::Path;

/// Column headers of a single-formula export
pub const EXPORT_HEADERS: [&str; 8] = [
    "Ingredient",
    "Category",
    "Source",
    "Dose Value",
    "Dose Unit",
    "Safety",
    "Safety Level",
    "Notes",
];

/// A row in the CSV output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRow {
    #[serde(rename = "Ingredient")]
    pub ingredient: String,
    #[serde(rename = "Category")]
    pub category: String,
    #[serde(rename = "Source")]
    pub source: String,
    #[serde(rename = "Dose Value")]
    pub dose_value: f64,
    #[serde(rename = "Dose Unit")]
    pub dose_unit: String,
    #[serde(rename = "Safety")]
    pub safety: String,
    #[serde(rename = "Safety Level")]
    pub safety_level: SafetyLevel,
    #[serde(rename = "Notes")]
    pub notes: String,
}

impl ExportRow {
    pub fn new(resolved: &ResolvedItem<'_>, rules: &RuleTable) -> Self {
        let ingredient = resolved.ingredient;
        let item = resolved.item;
        ExportRow {
            ingredient: ingredient.name.clone(),
            category: ingredient.category.clone(),
            source: ingredient.source.clone(),
            dose_value: item.dose_value,
            dose_unit: item.dose_unit.to_string(),
            safety: ingredient.safety.clone(),
            safety_level: ingredient.safety_level_with(rules),
            notes: item.notes.clone(),
        }
    }
}

/// Row of a multi-formula export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormulaExportRow {
    #[serde(rename = "Formula ID")]
    pub formula_id: u64,
    #[serde(rename = "Formula")]
    pub formula: String,
    #[serde(rename = "Ingredient")]
    pub ingredient: String,
    #[serde(rename = "Category")]
    pub category: String,
    #[serde(rename = "Source")]
    pub source: String,
    #[serde(rename = "Dose Value")]
    pub dose_value: f64,
    #[serde(rename = "Dose Unit")]
    pub dose_unit: String,
    #[serde(rename = "Safety")]
    pub safety: String,
    #[serde(rename = "Safety Level")]
    pub safety_level: SafetyLevel,
    #[serde(rename = "Notes")]
    pub notes: String,
}

impl FormulaExportRow {
    fn new(formula: &Formula, row: ExportRow) -> Self {
        FormulaExportRow {
            formula_id: formula.id,
            formula: formula.name.clone(),
            ingredient: row.ingredient,
            category: row.category,
            source: row.source,
            dose_value: row.dose_value,
            dose_unit: row.dose_unit,
            safety: row.safety,
            safety_level: row.safety_level,
            notes: row.notes,
        }
    }
}

/// Build export rows; `items` must already be in display order
pub fn export_rows(items: &[ResolvedItem<'_>], rules: &RuleTable) -> Vec<ExportRow> {
    items.iter().map(|r| ExportRow::new(r, rules)).collect()
}

/// Write a single-formula table. The header row is always written.
pub fn write_csv<W: Write>(writer: W, rows: &[ExportRow]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    writer.write_record(EXPORT_HEADERS)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    tracing::debug!("Wrote {} export rows", rows.len());
    Ok(())
}

/// Write several formulas into one table
pub fn write_multi_csv<W: Write>(
    writer: W,
    formulas: &[(&Formula, Vec<ResolvedItem<'_>>)],
    rules: &RuleTable,
) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    let mut headers = vec!["Formula ID", "Formula"];
    headers.extend_from_slice(&EXPORT_HEADERS);
    writer.write_record(&headers)?;

    let mut count = 0;
    for (formula, items) in formulas {
        for row in export_rows(items, rules) {
            writer.serialize(FormulaExportRow::new(formula, row))?;
            count += 1;
        }
    }
    writer.flush()?;

    tracing::debug!("Wrote {} rows for {} formulas", count, formulas.len());
    Ok(())
}

/// Write a single-formula export to a file, syncing it to disk
pub fn export_to_path(path: &Path, rows: &[ExportRow]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = std::fs::File::create(path)?;
    let mut buffered = std::io::BufWriter::new(file);
    write_csv(&mut buffered, rows)?;
    let file = buffered
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    file.sync_all()?;

    tracing::info!("Exported {} rows to {:?}", rows.len(), path);
    Ok(())
}

/// Write a multi-formula export to a file, syncing it to disk
pub fn export_multi_to_path(
    path: &Path,
    formulas: &[(&Formula, Vec<ResolvedItem<'_>>)],
    rules: &RuleTable,
) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = std::fs::File::create(path)?;
    let mut buffered = std::io::BufWriter::new(file);
    write_multi_csv(&mut buffered, formulas, rules)?;
    let file = buffered
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    file.sync_all()?;

    tracing::info!("Exported {} formulas to {:?}", formulas.len(), path);
    Ok(())
}

/// Parse a single-formula export back into rows
pub fn read_csv<R: Read>(reader: R) -> Result<Vec<ExportRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(reader);

    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

/// Parse a multi-formula export back into rows
pub fn read_multi_csv<R: Read>(reader: R) -> Result<Vec<FormulaExportRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(reader);

    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}
