//! Patient input validation.
//!
//! All four fields are checked on every call and every failure is
//! reported; there is no partial success.

use crate::{PatientInput, RawPatientInput};
use chrono::NaiveDate;
use thiserror::Error;

pub const MIN_WEIGHT_KG: f64 = 0.3;
pub const MAX_WEIGHT_KG: f64 = 6.0;
pub const MIN_GESTATION_WEEKS: u32 = 20;
pub const MAX_GESTATION_WEEKS: u32 = 45;
pub const MAX_GESTATION_DAYS: u32 = 7;

/// Input field a violation refers to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    DateOfBirth,
    BirthWeight,
    GestationWeeks,
    GestationDays,
}

/// A single failed rule
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    pub field: Field,
    pub message: String,
}

impl Violation {
    fn new(field: Field, message: &str) -> Self {
        Self {
            field,
            message: message.to_string(),
        }
    }
}

/// Aggregate of every violation found in one input
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{}", joined(.violations))]
pub struct ValidationError {
    pub violations: Vec<Violation>,
}

impl ValidationError {
    /// Whether any violation refers to the given field
    pub fn has(&self, field: Field) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }

    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.violations.iter().map(|v| v.message.as_str())
    }
}

fn joined(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| v.message.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Validate raw form values into a [`PatientInput`]
pub fn validate(raw: &RawPatientInput) -> Result<PatientInput, ValidationError> {
    let mut violations = Vec::new();

    let dob = raw.date_of_birth.trim();
    let date_of_birth = if dob.is_empty() {
        violations.push(Violation::new(
            Field::DateOfBirth,
            "Date of Birth is required.",
        ));
        None
    } else {
        match NaiveDate::parse_from_str(dob, "%Y-%m-%d") {
            Ok(d) => Some(d),
            Err(_) => {
                violations.push(Violation::new(
                    Field::DateOfBirth,
                    "Date of Birth must be a valid date (YYYY-MM-DD).",
                ));
                None
            }
        }
    };

    let weight = raw
        .birth_weight_kg
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|w| (MIN_WEIGHT_KG..=MAX_WEIGHT_KG).contains(w));
    if weight.is_none() {
        violations.push(Violation::new(
            Field::BirthWeight,
            "Birth Weight must be between 0.3 and 6 kg.",
        ));
    }

    let weeks = raw
        .gestation_weeks
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|w| (MIN_GESTATION_WEEKS..=MAX_GESTATION_WEEKS).contains(w));
    if weeks.is_none() {
        violations.push(Violation::new(
            Field::GestationWeeks,
            "Gestation (Weeks) must be between 20 and 45.",
        ));
    }

    let days = raw
        .gestation_days
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|d| *d <= MAX_GESTATION_DAYS);
    if days.is_none() {
        violations.push(Violation::new(
            Field::GestationDays,
            "Gestation (Days) must be between 0 and 7.",
        ));
    }

    match (date_of_birth, weight, weeks, days) {
        (Some(date_of_birth), Some(birth_weight_kg), Some(gestation_weeks), Some(gestation_days))
            if violations.is_empty() =>
        {
            Ok(PatientInput {
                date_of_birth,
                gestation_weeks,
                gestation_days,
                birth_weight_kg,
            })
        }
        _ => {
            tracing::debug!("Input validation failed with {} violations", violations.len());
            Err(ValidationError { violations })
        }
    }
}
