//! Core domain types for the neonatal milestone calendar.
//!
//! This module defines the fundamental types used throughout the system:
//! - Patient input (validated) and optional patient details
//! - Milestone entries, values and groups
//! - The full milestone schedule emitted by the engine
//! - Persisted calculation records

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Patient Types
// ============================================================================

/// Validated birth parameters. Only produced by [`crate::validation`].
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PatientInput {
    pub date_of_birth: NaiveDate,
    pub gestation_weeks: u32,
    pub gestation_days: u32,
    pub birth_weight_kg: f64,
}

/// Raw form values as entered, before validation.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
pub struct RawPatientInput {
    pub date_of_birth: String,
    pub gestation_weeks: String,
    pub gestation_days: String,
    pub birth_weight_kg: String,
}

/// Identifying details shown on printouts. Not used by the rules.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
pub struct PatientDetails {
    pub name: Option<String>,
    pub nhs_number: Option<String>,
}

// ============================================================================
// Milestone Types
// ============================================================================

/// Value of a single milestone row.
///
/// A date is kept as a calendar date and only formatted by the renderer.
/// `Status` marks values that replace a date outright (ROP "Not Indicated").
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum MilestoneValue {
    Date(NaiveDate),
    Instruction(String),
    Status(String),
}

impl MilestoneValue {
    pub fn instruction(text: impl Into<String>) -> Self {
        MilestoneValue::Instruction(text.into())
    }

    pub fn status(text: impl Into<String>) -> Self {
        MilestoneValue::Status(text.into())
    }

    /// The text, if this value is an instruction or status
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MilestoneValue::Instruction(t) | MilestoneValue::Status(t) => Some(t),
            MilestoneValue::Date(_) => None,
        }
    }
}

/// One row within a milestone group
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MilestoneEntry {
    pub label: String,
    pub value: MilestoneValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl MilestoneEntry {
    pub fn new(label: impl Into<String>, value: MilestoneValue) -> Self {
        Self {
            label: label.into(),
            value,
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// The ten milestone groups, declared in emission order
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum GroupKind {
    CorrectedGestation,
    NewbornExamination,
    BloodSpotTest,
    CranialUltrasound,
    Medication,
    Feeding,
    Immunisations,
    RopScreening,
    Miscellaneous,
    ResearchStudies,
}

impl GroupKind {
    /// All groups in the fixed order the engine emits them
    pub const ALL: [GroupKind; 10] = [
        GroupKind::CorrectedGestation,
        GroupKind::NewbornExamination,
        GroupKind::BloodSpotTest,
        GroupKind::CranialUltrasound,
        GroupKind::Medication,
        GroupKind::Feeding,
        GroupKind::Immunisations,
        GroupKind::RopScreening,
        GroupKind::Miscellaneous,
        GroupKind::ResearchStudies,
    ];

    /// Short label
    pub fn label(&self) -> &'static str {
        match self {
            GroupKind::CorrectedGestation => "Corrected Gestation",
            GroupKind::NewbornExamination => "Newborn Examination",
            GroupKind::BloodSpotTest => "Blood Spot Test",
            GroupKind::CranialUltrasound => "Cranial Ultrasound",
            GroupKind::Medication => "Medication",
            GroupKind::Feeding => "Feeding",
            GroupKind::Immunisations => "Immunisations",
            GroupKind::RopScreening => "ROP Screening",
            GroupKind::Miscellaneous => "Miscellaneous",
            GroupKind::ResearchStudies => "Research Studies",
        }
    }

    /// Heading used on the rendered table and printout
    pub fn title(&self) -> &'static str {
        match self {
            GroupKind::BloodSpotTest => "Newborn Blood Spot Test",
            GroupKind::Feeding => {
                "Feeding - See separate guidelines for cardiac and surgical newborns"
            }
            GroupKind::RopScreening => "Retinopathy of Prematurity (ROP) Screening",
            GroupKind::Miscellaneous => "Miscellaneous Dates",
            other => other.label(),
        }
    }
}

/// A titled, ordered list of milestone entries
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MilestoneGroup {
    pub kind: GroupKind,
    pub entries: Vec<MilestoneEntry>,
}

impl MilestoneGroup {
    pub fn new(kind: GroupKind) -> Self {
        Self {
            kind,
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, entry: MilestoneEntry) {
        self.entries.push(entry);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find an entry by its exact label
    pub fn entry(&self, label: &str) -> Option<&MilestoneEntry> {
        self.entries.iter().find(|e| e.label == label)
    }
}

/// Engine output: all ten groups, always in [`GroupKind::ALL`] order
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MilestoneSchedule {
    pub groups: Vec<MilestoneGroup>,
}

impl MilestoneSchedule {
    /// Look up a group by kind
    pub fn group(&self, kind: GroupKind) -> Option<&MilestoneGroup> {
        self.groups.iter().find(|g| g.kind == kind)
    }
}

// ============================================================================
// Persistence Types
// ============================================================================

/// Identifier assigned to a stored calculation
pub type RecordId = Uuid;

/// A stored calculation: raw inputs plus the rendered result
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CalculationRecord {
    pub id: RecordId,
    pub input: RawPatientInput,
    #[serde(default)]
    pub details: PatientDetails,
    pub results: String,
    pub timestamp: DateTime<Utc>,
    pub needs_sync: bool,
}

impl CalculationRecord {
    /// Create a fresh record. `needs_sync` is set when produced offline.
    pub fn new(
        input: RawPatientInput,
        details: PatientDetails,
        results: String,
        timestamp: DateTime<Utc>,
        online: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            input,
            details,
            results,
            timestamp,
            needs_sync: !online,
        }
    }
}
