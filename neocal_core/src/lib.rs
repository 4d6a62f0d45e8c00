#![forbid(unsafe_code)]

//! Core domain model and business logic for the neonatal milestone calendar.
//!
//! This crate provides:
//! - Domain types (patient input, milestone groups, calculation records)
//! - Input validation and calendar arithmetic
//! - The milestone engine (feeding and ROP decision trees included)
//! - Clinical settings and named settings profiles
//! - Persistence (JSONL record store, CSV export) and offline reconciliation
//! - Text and HTML rendering

pub mod types;
pub mod error;
pub mod validation;
pub mod dates;
pub mod settings;
pub mod profiles;
pub mod feeding;
pub mod rop;
pub mod engine;
pub mod render;
pub mod records;
pub mod export;
pub mod calculator;
pub mod config;
pub mod logging;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use validation::{validate, ValidationError};
pub use settings::{ClinicalSettings, SettingsProvider};
pub use profiles::{ProfileStore, SettingsProfile};
pub use engine::calculate_milestones;
pub use records::{reconcile_pending, JsonlRecordStore, RecordSink};
pub use export::export_records_csv;
pub use calculator::{calculate, CalculationOutcome, PersistenceStatus};
pub use config::Config;
