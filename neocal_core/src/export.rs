//! CSV export of calculation history.
//!
//! The export file is written to a temporary sibling and renamed into
//! place, so a failed export never leaves a half-written file behind.

use crate::{CalculationRecord, Result};
use std::io::Write;
use std::path::Path;

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct CsvRow {
    id: String,
    timestamp: String,
    patient_name: String,
    nhs_number: String,
    date_of_birth: String,
    weight: String,
    gestation_weeks: String,
    gestation_days: String,
    needs_sync: bool,
}

impl From<&CalculationRecord> for CsvRow {
    fn from(record: &CalculationRecord) -> Self {
        CsvRow {
            id: record.id.to_string(),
            timestamp: record.timestamp.to_rfc3339(),
            patient_name: record.details.name.clone().unwrap_or_default(),
            nhs_number: record.details.nhs_number.clone().unwrap_or_default(),
            date_of_birth: record.input.date_of_birth.clone(),
            weight: record.input.birth_weight_kg.clone(),
            gestation_weeks: record.input.gestation_weeks.clone(),
            gestation_days: record.input.gestation_days.clone(),
            needs_sync: record.needs_sync,
        }
    }
}

/// Write records to a CSV file, replacing any existing file.
///
/// Returns the number of rows written (headers are always written).
pub fn export_records_csv(records: &[CalculationRecord], csv_path: &Path) -> Result<usize> {
    let dir = match csv_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let temp = tempfile::NamedTempFile::new_in(dir)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(true)
        .from_writer(temp);

    for record in records {
        writer.serialize(CsvRow::from(record))?;
    }
    if records.is_empty() {
        writer.write_record([
            "id",
            "timestamp",
            "patient_name",
            "nhs_number",
            "date_of_birth",
            "weight",
            "gestation_weeks",
            "gestation_days",
            "needs_sync",
        ])?;
    }

    writer.flush()?;
    let mut temp = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    temp.flush()?;
    temp.as_file().sync_all()?;
    temp.persist(csv_path).map_err(|e| e.error)?;

    tracing::info!("Exported {} records to {:?}", records.len(), csv_path);
    Ok(records.len())
}
