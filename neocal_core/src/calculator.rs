//! End-to-end calculation workflow.
//!
//! validate → resolve settings → evaluate → render → persist.
//!
//! Validation and computation failures abort with an error. A failure to
//! store the record does not: the schedule is still returned and the
//! save failure travels alongside it in [`PersistenceStatus`].

use crate::engine::calculate_milestones;
use crate::records::RecordSink;
use crate::render::render_table;
use crate::settings::SettingsProvider;
use crate::validation::validate;
use crate::{
    CalculationRecord, Error, MilestoneSchedule, PatientDetails, PatientInput, RawPatientInput,
    RecordId, Result,
};
use chrono::Utc;

/// What happened to the calculation record
#[derive(Debug)]
pub enum PersistenceStatus {
    /// Stored under this id
    Saved(RecordId),
    /// No sink supplied (dry run)
    Skipped,
    /// The sink rejected the record
    Failed(Error),
}

impl PersistenceStatus {
    pub fn is_saved(&self) -> bool {
        matches!(self, PersistenceStatus::Saved(_))
    }
}

/// Result of a successful calculation
#[derive(Debug)]
pub struct CalculationOutcome {
    pub input: PatientInput,
    pub schedule: MilestoneSchedule,
    /// Plain-text rendering, as stored with the record
    pub rendered: String,
    pub persistence: PersistenceStatus,
}

/// Run one calculation.
///
/// Pass `None` for `sink` to skip persistence. `online` decides whether
/// the stored record needs a later reconciliation pass.
pub fn calculate(
    raw: &RawPatientInput,
    details: &PatientDetails,
    provider: &dyn SettingsProvider,
    sink: Option<&mut dyn RecordSink>,
    online: bool,
) -> Result<CalculationOutcome> {
    let input = validate(raw)?;
    let settings = provider.active_settings();
    let schedule = calculate_milestones(&input, &settings)?;
    let rendered = render_table(&schedule);

    let persistence = match sink {
        None => {
            tracing::debug!("Dry run, record not stored");
            PersistenceStatus::Skipped
        }
        Some(sink) => {
            let record = CalculationRecord::new(
                raw.clone(),
                details.clone(),
                rendered.clone(),
                Utc::now(),
                online,
            );
            match sink.save_record(&record) {
                Ok(id) => {
                    tracing::info!("Stored calculation {} (needs_sync: {})", id, record.needs_sync);
                    PersistenceStatus::Saved(id)
                }
                Err(e) => {
                    tracing::error!("Failed to store calculation: {}", e);
                    PersistenceStatus::Failed(e)
                }
            }
        }
    };

    Ok(CalculationOutcome {
        input,
        schedule,
        rendered,
        persistence,
    })
}
