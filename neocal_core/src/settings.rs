//! Clinical threshold settings.
//!
//! Every threshold has a hard-coded default. Stored settings are decoded
//! with per-field serde defaults, so a profile saved before a field
//! existed (or written by hand with only a few keys) is repaired leaf by
//! leaf when it is read.

use crate::{Error, Result, SettingsProfile};
use once_cell::sync::Lazy;
use serde::{Deserialize, Deserializer, Serialize};

/// Built-in thresholds, shared by every fallback path
static DEFAULT_SETTINGS: Lazy<ClinicalSettings> = Lazy::new(ClinicalSettings::default);

/// Complete threshold configuration consumed by the engine
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
pub struct ClinicalSettings {
    #[serde(default)]
    pub cranial_ultrasound: CranialUltrasoundSettings,

    #[serde(default)]
    pub medications: MedicationSettings,

    #[serde(default)]
    pub feeding: FeedingSettings,
}

/// Cranial ultrasound screening thresholds
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CranialUltrasoundSettings {
    pub gestation: f64,
    pub weight: f64,
    pub follow_up_gestation: f64,
    pub follow_up_weight: f64,
    pub initial_day: i64,
    pub follow_up_day: i64,
}

impl Default for CranialUltrasoundSettings {
    fn default() -> Self {
        Self {
            gestation: 28.0,
            weight: 1.5,
            follow_up_gestation: 29.0,
            follow_up_weight: 1.0,
            initial_day: 3,
            follow_up_day: 28,
        }
    }
}

/// Medication thresholds
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MedicationSettings {
    pub hydrocortisone_gestation: f64,
    pub hydrocortisone_review_day: i64,
    pub probiotics_gestation: f64,
    pub probiotics_weight: f64,
    pub caffeine_gestation: f64,
    /// Corrected week of the caffeine and probiotics reviews
    pub caffeine_review_gestation: i64,
    pub sytron_weight: f64,
    pub sytron_start_day: i64,
}

impl Default for MedicationSettings {
    fn default() -> Self {
        Self {
            hydrocortisone_gestation: 28.0,
            hydrocortisone_review_day: 10,
            probiotics_gestation: 32.0,
            probiotics_weight: 1.5,
            caffeine_gestation: 32.0,
            caffeine_review_gestation: 34,
            sytron_weight: 2.5,
            sytron_start_day: 28,
        }
    }
}

/// Feed advancement rates in ml/kg/24h
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AdvancementRates {
    pub standard_increment: f64,
    pub slow_increment: f64,
}

impl AdvancementRates {
    pub fn breast_milk() -> Self {
        Self {
            standard_increment: 30.0,
            slow_increment: 15.0,
        }
    }

    pub fn formula() -> Self {
        Self {
            standard_increment: 20.0,
            slow_increment: 10.0,
        }
    }
}

/// Stored rates with any subset of fields present
#[derive(Deserialize)]
struct PartialRates {
    standard_increment: Option<f64>,
    slow_increment: Option<f64>,
}

impl PartialRates {
    fn over(self, defaults: AdvancementRates) -> AdvancementRates {
        AdvancementRates {
            standard_increment: self.standard_increment.unwrap_or(defaults.standard_increment),
            slow_increment: self.slow_increment.unwrap_or(defaults.slow_increment),
        }
    }
}

fn breast_milk_rates<'de, D>(deserializer: D) -> std::result::Result<AdvancementRates, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(PartialRates::deserialize(deserializer)?.over(AdvancementRates::breast_milk()))
}

fn formula_rates<'de, D>(deserializer: D) -> std::result::Result<AdvancementRates, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(PartialRates::deserialize(deserializer)?.over(AdvancementRates::formula()))
}

/// Feeding thresholds
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FeedingSettings {
    pub pn_gestation: f64,
    pub pn_weight: f64,
    pub pn_review_day: i64,
    pub trophic_gestation: f64,
    pub trophic_weight: f64,
    pub breast_milk_increment_gestation: f64,
    pub breast_milk_increment_weight: f64,
    pub fortifier_gestation: f64,
    pub formula_avoid_gestation: f64,
    pub formula_avoid_weight: f64,
    pub full_enteral_gestation: f64,
    pub full_enteral_weight: f64,
    #[serde(deserialize_with = "breast_milk_rates")]
    pub breast_milk_advancement: AdvancementRates,
    #[serde(deserialize_with = "formula_rates")]
    pub formula_advancement: AdvancementRates,
}

impl Default for FeedingSettings {
    fn default() -> Self {
        Self {
            pn_gestation: 30.0,
            pn_weight: 1.25,
            pn_review_day: 5,
            trophic_gestation: 27.0,
            trophic_weight: 0.8,
            breast_milk_increment_gestation: 29.0,
            breast_milk_increment_weight: 1.5,
            fortifier_gestation: 32.0,
            formula_avoid_gestation: 30.0,
            formula_avoid_weight: 1.0,
            full_enteral_gestation: 32.0,
            full_enteral_weight: 1.5,
            breast_milk_advancement: AdvancementRates::breast_milk(),
            formula_advancement: AdvancementRates::formula(),
        }
    }
}

impl ClinicalSettings {
    /// Reference to the cached built-in defaults
    pub fn defaults() -> &'static ClinicalSettings {
        &DEFAULT_SETTINGS
    }

    /// Decode stored settings, falling back per missing field.
    ///
    /// Advancement rates merge per field over the defaults for their
    /// feed type, like every other leaf.
    pub fn from_stored(value: &serde_json::Value) -> Result<Self> {
        if value.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(value.clone())?)
    }

    /// Decode a (possibly partial) TOML settings document
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Pretty TOML, the format accepted by [`Self::from_toml_str`]
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize settings: {}", e)))
    }

    /// Value form used in the profile store
    pub fn to_stored(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Source of the settings in force for a calculation.
///
/// Implementations never fail: any problem reading stored settings is
/// logged and replaced by the defaults.
pub trait SettingsProvider {
    fn active_settings(&self) -> ClinicalSettings;
}

impl SettingsProvider for ClinicalSettings {
    fn active_settings(&self) -> ClinicalSettings {
        self.clone()
    }
}

/// Pick the active profile (flagged, else first) and decode its settings
pub fn resolve_active(profiles: &[SettingsProfile]) -> ClinicalSettings {
    let Some(profile) = profiles
        .iter()
        .find(|p| p.is_active)
        .or_else(|| profiles.first())
    else {
        tracing::info!("No settings profiles stored, using defaults");
        return ClinicalSettings::defaults().clone();
    };

    match ClinicalSettings::from_stored(&profile.settings) {
        Ok(settings) => {
            tracing::info!("Using settings from profile '{}'", profile.name);
            settings
        }
        Err(e) => {
            tracing::warn!(
                "Settings in profile '{}' could not be decoded: {}. Using defaults.",
                profile.name,
                e
            );
            ClinicalSettings::defaults().clone()
        }
    }
}
