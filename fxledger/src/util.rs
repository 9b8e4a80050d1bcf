use std::fs::{File, OpenOptions};
use std::num::ParseFloatError;
use std::path::Path;

use crate::errors::LedgerError;

// Rounds to a fixed number of decimal places. Negative zero collapses to zero so
// that "-0.0000" never reaches the ledger.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    let rounded = (value * factor).round() / factor;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

pub fn format_fixed(value: f64, places: usize) -> String {
    format!("{:.*}", places, round_to(value, places as i32))
}

// Empty string denotes an unresolved optional field.
pub fn format_optional(value: Option<f64>, places: usize) -> String {
    match value {
        Some(value) => format_fixed(value, places),
        None => String::new(),
    }
}

pub fn parse_optional(field: &str) -> Result<Option<f64>, ParseFloatError> {
    let field = field.trim();
    if field.is_empty() {
        return Ok(None);
    }
    field.parse::<f64>().map(Some)
}

pub fn ensure_parent_exists(path: &Path) -> Result<(), LedgerError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            log::info!("Creating directory {}...", parent.display());
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

// Opens a CSV file for appending. The flag tells the caller whether a header is still owed.
pub fn open_csv_for_append(path: &Path) -> Result<(csv::Writer<File>, bool), LedgerError> {
    ensure_parent_exists(path)?;
    let is_new = std::fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let writer = csv::WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_writer(file);
    Ok((writer, is_new))
}
