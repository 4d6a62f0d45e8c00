//! Retinopathy of prematurity screening window.
//!
//! Branches are checked top to bottom and the first match wins. Some
//! ranges look like they overlap; the order is clinical policy and must
//! not be rearranged.

use crate::dates::{corrected_gestation_date, days_from_birth};
use crate::{MilestoneEntry, MilestoneValue, PatientInput, Result};
use chrono::NaiveDate;

pub const CONSIDER_SCREENING: &str = "Consider ROP Screening";
pub const NOT_INDICATED: &str = "Not Indicated";

const LOW_WEIGHT_KG: f64 = 1.5;

/// Which rule selected the screening start
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RopBranch {
    /// Under 27 weeks: a week after reaching 30 weeks corrected
    Under27Weeks,
    /// 27 to 30 weeks: day 28
    Under31Weeks,
    /// 31 weeks and at most 1.5 kg: day 28
    LowWeightUnder32Weeks,
    /// At most 1.5 kg, under 36 weeks: 36 weeks corrected
    LowWeightUnder36Weeks,
    /// At most 1.5 kg, over 35 weeks: from birth
    LowWeightOver35Weeks,
    /// Exactly 31 weeks and over 1.5 kg
    Consider31Weeks,
    NotIndicated,
}

/// Start of the screening window
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScreeningStart {
    Date(NaiveDate),
    Consider,
    NotIndicated,
}

/// Select the screening branch for an infant
pub fn select_branch(input: &PatientInput) -> RopBranch {
    let gw = input.gestation_weeks;
    let low_weight = input.birth_weight_kg <= LOW_WEIGHT_KG;

    if gw < 27 {
        RopBranch::Under27Weeks
    } else if gw < 31 {
        RopBranch::Under31Weeks
    } else if low_weight && gw < 32 {
        RopBranch::LowWeightUnder32Weeks
    } else if low_weight && gw < 36 {
        RopBranch::LowWeightUnder36Weeks
    } else if low_weight && gw > 35 {
        RopBranch::LowWeightOver35Weeks
    } else if gw == 31 && input.birth_weight_kg > LOW_WEIGHT_KG {
        RopBranch::Consider31Weeks
    } else {
        RopBranch::NotIndicated
    }
}

/// Screening start for the selected branch
pub fn screening_start(input: &PatientInput) -> Result<ScreeningStart> {
    let dob = input.date_of_birth;
    let gw = input.gestation_weeks;
    let gd = input.gestation_days;

    let branch = select_branch(input);
    tracing::info!("ROP screening branch: {:?}", branch);

    let start = match branch {
        RopBranch::Under27Weeks => {
            let corrected_30 = corrected_gestation_date(dob, 30, gw, gd)?;
            ScreeningStart::Date(days_from_birth(corrected_30, 7)?)
        }
        RopBranch::Under31Weeks | RopBranch::LowWeightUnder32Weeks => {
            ScreeningStart::Date(days_from_birth(dob, 28)?)
        }
        RopBranch::LowWeightUnder36Weeks => {
            ScreeningStart::Date(corrected_gestation_date(dob, 36, gw, gd)?)
        }
        RopBranch::LowWeightOver35Weeks => ScreeningStart::Date(dob),
        RopBranch::Consider31Weeks => ScreeningStart::Consider,
        RopBranch::NotIndicated => ScreeningStart::NotIndicated,
    };
    Ok(start)
}

/// Date before which the first screen is due
pub fn screening_due(dob: NaiveDate, start: &ScreeningStart) -> Result<MilestoneValue> {
    Ok(match start {
        ScreeningStart::Consider => MilestoneValue::Date(days_from_birth(dob, 35)?),
        ScreeningStart::Date(d) => MilestoneValue::Date(days_from_birth(*d, 7)?),
        ScreeningStart::NotIndicated => MilestoneValue::status(NOT_INDICATED),
    })
}

/// The two ROP rows: window start and first screen due
pub fn rop_entries(input: &PatientInput) -> Result<Vec<MilestoneEntry>> {
    let start = screening_start(input)?;
    let due = screening_due(input.date_of_birth, &start)?;

    let start_value = match start {
        ScreeningStart::Date(d) => MilestoneValue::Date(d),
        ScreeningStart::Consider => MilestoneValue::status(CONSIDER_SCREENING),
        ScreeningStart::NotIndicated => MilestoneValue::status(NOT_INDICATED),
    };

    Ok(vec![
        MilestoneEntry::new("ROP screening window start", start_value),
        MilestoneEntry::new("First ROP screening due before", due),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn patient(weeks: u32, days: u32, weight: f64) -> PatientInput {
        PatientInput {
            date_of_birth: ymd(2024, 1, 1),
            gestation_weeks: weeks,
            gestation_days: days,
            birth_weight_kg: weight,
        }
    }

    #[test]
    fn test_under_27_weeks() {
        let input = patient(26, 0, 0.8);
        assert_eq!(select_branch(&input), RopBranch::Under27Weeks);

        let entries = rop_entries(&input).unwrap();
        assert_eq!(entries[0].value, MilestoneValue::Date(ymd(2024, 2, 5)));
        assert_eq!(entries[1].value, MilestoneValue::Date(ymd(2024, 2, 12)));
    }

    #[test]
    fn test_under_27_weeks_with_days() {
        let input = patient(24, 5, 0.6);
        // (30-24)*7 - 5 + 7 = 44 days
        assert_eq!(
            screening_start(&input).unwrap(),
            ScreeningStart::Date(ymd(2024, 2, 14))
        );
    }

    #[test]
    fn test_27_to_30_weeks_is_day_28_regardless_of_weight() {
        for (weeks, weight) in [(27, 0.9), (30, 2.8)] {
            let input = patient(weeks, 0, weight);
            assert_eq!(select_branch(&input), RopBranch::Under31Weeks);
            assert_eq!(
                screening_start(&input).unwrap(),
                ScreeningStart::Date(ymd(2024, 1, 29))
            );
        }
    }

    #[test]
    fn test_31_weeks_low_weight() {
        let input = patient(31, 2, 1.5);
        assert_eq!(select_branch(&input), RopBranch::LowWeightUnder32Weeks);
    }

    #[test]
    fn test_low_weight_under_36_weeks() {
        let input = patient(33, 1, 1.2);
        assert_eq!(select_branch(&input), RopBranch::LowWeightUnder36Weeks);
        // (36-33)*7 - 1 = 20 days
        assert_eq!(
            screening_start(&input).unwrap(),
            ScreeningStart::Date(ymd(2024, 1, 21))
        );
    }

    #[test]
    fn test_low_weight_over_35_weeks_starts_at_birth() {
        let input = patient(37, 0, 1.4);
        assert_eq!(select_branch(&input), RopBranch::LowWeightOver35Weeks);
        let entries = rop_entries(&input).unwrap();
        assert_eq!(entries[0].value, MilestoneValue::Date(ymd(2024, 1, 1)));
        assert_eq!(entries[1].value, MilestoneValue::Date(ymd(2024, 1, 8)));
    }

    #[test]
    fn test_consider_at_31_weeks() {
        let input = patient(31, 0, 1.6);
        assert_eq!(select_branch(&input), RopBranch::Consider31Weeks);

        let entries = rop_entries(&input).unwrap();
        assert_eq!(entries[0].value, MilestoneValue::status(CONSIDER_SCREENING));
        assert_eq!(entries[1].value, MilestoneValue::Date(ymd(2024, 2, 5)));
    }

    #[test]
    fn test_not_indicated() {
        let input = patient(34, 0, 2.2);
        assert_eq!(select_branch(&input), RopBranch::NotIndicated);

        let entries = rop_entries(&input).unwrap();
        assert_eq!(entries[0].value, MilestoneValue::status(NOT_INDICATED));
        assert_eq!(entries[1].value, MilestoneValue::status(NOT_INDICATED));
    }
}
