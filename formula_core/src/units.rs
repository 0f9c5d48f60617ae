//! Dose normalization onto a common milligram basis.
//!
//! Mass units convert exactly; potency units (IU) and anything unrecognized
//! have no mass equivalent and are reported as non-convertible rather than
//! treated as an error.

use crate::{DoseUnit, Error, Result};

/// Convert a dose to milligrams.
///
/// Returns `None` for IU and unrecognized units.
pub fn to_milligrams(value: f64, unit: &DoseUnit) -> Option<f64> {
    match unit {
        DoseUnit::Mg => Some(value),
        DoseUnit::G => Some(value * 1000.0),
        DoseUnit::Mcg => Some(value / 1000.0),
        DoseUnit::Iu | DoseUnit::Other(_) => None,
    }
}

/// Parse a user-supplied dose value
pub fn parse_dose_value(s: &str) -> Result<f64> {
    let value: f64 = s
        .trim()
        .parse()
        .map_err(|_| Error::InvalidDose(format!("'{}' is not a number", s.trim())))?;
    validate_dose_value(value)?;
    Ok(value)
}

/// Reject negative and non-finite dose values
pub fn validate_dose_value(value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(Error::InvalidDose(format!("{} is not a finite number", value)));
    }
    if value < 0.0 {
        return Err(Error::InvalidDose(format!("{} is negative", value)));
    }
    Ok(())
}

/// Full item-boundary check: value and unit
pub fn validate_dose(value: f64, unit: &DoseUnit) -> Result<()> {
    validate_dose_value(value)?;
    if !unit.is_recognized() {
        return Err(Error::InvalidDose(format!(
            "unrecognized unit '{}' (expected mg, mcg, g or IU)",
            unit
        )));
    }
    Ok(())
}
