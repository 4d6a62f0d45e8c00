//! Feeding guidance decision trees.
//!
//! Each tree is evaluated top to bottom; the first satisfied condition
//! wins and later conditions are not re-checked.

use crate::render::format_number;
use crate::settings::FeedingSettings;
use crate::{MilestoneEntry, MilestoneValue, PatientInput};

// Fixed cut-offs that are not part of the configurable settings
const BREAST_MILK_15_ML_GESTATION: u32 = 30;
const BREAST_MILK_15_ML_WEIGHT: f64 = 1.0;
const FORMULA_HIGH_RISK_WEIGHT: f64 = 1.25;
const FORMULA_HIGH_RISK_GESTATION: u32 = 32;
const FORMULA_STANDARD_MAX_WEIGHT: f64 = 1.5;

const PN: &str = "Parenteral Nutrition";
const BREAST_MILK_INITIAL: &str = "Breast Milk - Initial Feeding Rate";
const BREAST_MILK_INCREMENT: &str = "Breast Milk - Increment Rate";
const FORMULA_FEEDING: &str = "Formula Feeding";
const FORMULA_INITIAL: &str = "Formula - Initial Feeding Rate";
const FORMULA_INCREMENT: &str = "Formula - Increment Rate";

/// Outcome of the breast milk initial-rate tree
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BreastMilkStart {
    TrophicOnly,
    FifteenMlPerKg,
    FullEnteral,
    ThirtyMlPerKg,
}

/// Outcome of the formula tree
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormulaPlan {
    Avoid,
    FullEnteral,
    HighRiskSlowIncrement,
    StandardIncrement,
    AsTolerated,
}

fn gestation_below(input: &PatientInput, threshold: f64) -> bool {
    f64::from(input.gestation_weeks) < threshold
}

fn is_trophic(input: &PatientInput, s: &FeedingSettings) -> bool {
    gestation_below(input, s.trophic_gestation) || input.birth_weight_kg < s.trophic_weight
}

fn is_full_enteral(input: &PatientInput, s: &FeedingSettings) -> bool {
    f64::from(input.gestation_weeks) >= s.full_enteral_gestation
        && input.birth_weight_kg >= s.full_enteral_weight
}

fn rate(ml_per_kg: f64) -> MilestoneValue {
    MilestoneValue::Instruction(format!("{} ml/kg/24h", format_number(ml_per_kg)))
}

pub fn breast_milk_start(input: &PatientInput, s: &FeedingSettings) -> BreastMilkStart {
    if is_trophic(input, s) {
        BreastMilkStart::TrophicOnly
    } else if input.gestation_weeks < BREAST_MILK_15_ML_GESTATION
        || input.birth_weight_kg < BREAST_MILK_15_ML_WEIGHT
    {
        BreastMilkStart::FifteenMlPerKg
    } else if is_full_enteral(input, s) {
        BreastMilkStart::FullEnteral
    } else {
        BreastMilkStart::ThirtyMlPerKg
    }
}

pub fn formula_plan(input: &PatientInput, s: &FeedingSettings) -> FormulaPlan {
    if gestation_below(input, s.formula_avoid_gestation)
        || input.birth_weight_kg < s.formula_avoid_weight
    {
        FormulaPlan::Avoid
    } else if is_full_enteral(input, s) {
        FormulaPlan::FullEnteral
    } else if input.birth_weight_kg < FORMULA_HIGH_RISK_WEIGHT
        || input.gestation_weeks < FORMULA_HIGH_RISK_GESTATION
    {
        FormulaPlan::HighRiskSlowIncrement
    } else if input.birth_weight_kg <= FORMULA_STANDARD_MAX_WEIGHT {
        FormulaPlan::StandardIncrement
    } else {
        FormulaPlan::AsTolerated
    }
}

/// All feeding rows, in display order
pub fn feeding_entries(input: &PatientInput, s: &FeedingSettings) -> Vec<MilestoneEntry> {
    let mut entries = Vec::new();

    let pn = if gestation_below(input, s.pn_gestation) || input.birth_weight_kg < s.pn_weight {
        "Start within 6 hours of birth".to_string()
    } else {
        format!("Consider if not reaching 100 ml/kg/day by Day {}", s.pn_review_day)
    };
    entries.push(MilestoneEntry::new(PN, MilestoneValue::Instruction(pn)));

    let start = breast_milk_start(input, s);
    let start_text = match start {
        BreastMilkStart::TrophicOnly => "Trophic Expressed Breast Milk (EBM)",
        BreastMilkStart::FifteenMlPerKg => "15 ml/kg/day",
        BreastMilkStart::FullEnteral => "Full enteral feeds",
        BreastMilkStart::ThirtyMlPerKg => "30 ml/kg/day",
    };
    entries.push(MilestoneEntry::new(
        BREAST_MILK_INITIAL,
        MilestoneValue::instruction(start_text),
    ));

    let advancement = &s.breast_milk_advancement;
    let increment = if is_trophic(input, s) {
        MilestoneValue::instruction("Consider Trophic EBM")
    } else if f64::from(input.gestation_weeks) > s.breast_milk_increment_gestation
        && input.birth_weight_kg > s.breast_milk_increment_weight
    {
        rate(advancement.standard_increment)
    } else {
        rate(advancement.slow_increment)
    };
    entries.push(MilestoneEntry::new(BREAST_MILK_INCREMENT, increment));

    let plan = formula_plan(input, s);
    tracing::debug!("Feeding plan: breast milk {:?}, formula {:?}", start, plan);
    let formula = &s.formula_advancement;
    match plan {
        FormulaPlan::Avoid => entries.push(MilestoneEntry::new(
            FORMULA_FEEDING,
            MilestoneValue::instruction("Avoid formula use at this gestation/weight"),
        )),
        FormulaPlan::FullEnteral => entries.push(MilestoneEntry::new(
            FORMULA_INITIAL,
            MilestoneValue::instruction("Full enteral feeds"),
        )),
        FormulaPlan::HighRiskSlowIncrement => {
            entries.push(MilestoneEntry::new(
                FORMULA_INITIAL,
                MilestoneValue::instruction("15 ml/kg/day starting day 3"),
            ));
            entries.push(MilestoneEntry::new(
                FORMULA_INCREMENT,
                rate(formula.slow_increment),
            ));
        }
        FormulaPlan::StandardIncrement => {
            entries.push(MilestoneEntry::new(
                FORMULA_INITIAL,
                MilestoneValue::instruction("30 ml/kg/day starting day 1"),
            ));
            entries.push(MilestoneEntry::new(
                FORMULA_INCREMENT,
                rate(formula.standard_increment),
            ));
        }
        FormulaPlan::AsTolerated => entries.push(MilestoneEntry::new(
            FORMULA_FEEDING,
            MilestoneValue::instruction("Increase as tolerated"),
        )),
    }

    entries
}
