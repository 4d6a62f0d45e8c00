//! Calendar arithmetic for milestone dates.
//!
//! All helpers are checked: leaving chrono's representable range is a
//! computation error rather than a panic.

use crate::{Error, Result};
use chrono::{Days, Months, NaiveDate};

/// Offset in days from birth to `target_weeks` corrected gestation.
///
/// Negative when the infant was born after `target_weeks`.
pub fn corrected_offset_days(target_weeks: i64, gestation_weeks: u32, gestation_days: u32) -> i64 {
    (target_weeks - i64::from(gestation_weeks)) * 7 - i64::from(gestation_days)
}

/// Calendar date at which the infant reaches `target_weeks` corrected
/// gestational age.
pub fn corrected_gestation_date(
    dob: NaiveDate,
    target_weeks: i64,
    gestation_weeks: u32,
    gestation_days: u32,
) -> Result<NaiveDate> {
    add_days(
        dob,
        corrected_offset_days(target_weeks, gestation_weeks, gestation_days),
    )
}

/// `dob + days`, used for fixed-day milestones
pub fn days_from_birth(dob: NaiveDate, days: i64) -> Result<NaiveDate> {
    add_days(dob, days)
}

/// `dob` plus whole calendar months.
///
/// Days past the end of the target month clamp to its last day
/// (29 Feb + 12 months is 28 Feb).
pub fn months_from_birth(dob: NaiveDate, months: u32) -> Result<NaiveDate> {
    dob.checked_add_months(Months::new(months)).ok_or_else(|| {
        Error::Computation(format!("{} + {} months is out of range", dob, months))
    })
}

/// Signed day addition
pub fn add_days(date: NaiveDate, days: i64) -> Result<NaiveDate> {
    let magnitude = Days::new(days.unsigned_abs());
    let shifted = if days >= 0 {
        date.checked_add_days(magnitude)
    } else {
        date.checked_sub_days(magnitude)
    };

    shifted.ok_or_else(|| Error::Computation(format!("{} + {} days is out of range", date, days)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_corrected_date_forward() {
        // 26+0 reaching 30 weeks: 28 days later
        let date = corrected_gestation_date(ymd(2024, 1, 1), 30, 26, 0).unwrap();
        assert_eq!(date, ymd(2024, 1, 29));
    }

    #[test]
    fn test_corrected_date_subtracts_days() {
        let date = corrected_gestation_date(ymd(2024, 1, 1), 34, 32, 3).unwrap();
        assert_eq!(date, ymd(2024, 1, 12));
    }

    #[test]
    fn test_corrected_date_in_the_past() {
        let date = corrected_gestation_date(ymd(2024, 3, 1), 30, 32, 0).unwrap();
        assert_eq!(date, ymd(2024, 2, 16));
    }

    #[test]
    fn test_months_from_birth_clamps() {
        assert_eq!(months_from_birth(ymd(2024, 1, 31), 12).unwrap(), ymd(2025, 1, 31));
        assert_eq!(months_from_birth(ymd(2024, 2, 29), 12).unwrap(), ymd(2025, 2, 28));
    }

    #[test]
    fn test_out_of_range_is_error() {
        let result = add_days(NaiveDate::MAX, 1);
        assert!(matches!(result, Err(Error::Computation(_))));
    }

    proptest! {
        #[test]
        fn prop_corrected_offset_is_exact(
            days_since_epoch in 0i64..60_000,
            target in 20i64..=60,
            weeks in 20u32..=45,
            days in 0u32..=7,
        ) {
            let dob = ymd(1970, 1, 1) + chrono::Duration::days(days_since_epoch);
            let result = corrected_gestation_date(dob, target, weeks, days).unwrap();
            let expected = (target - i64::from(weeks)) * 7 - i64::from(days);
            prop_assert_eq!((result - dob).num_days(), expected);
        }

        #[test]
        fn prop_days_from_birth_round_trips(offset in -5_000i64..5_000) {
            let dob = ymd(2024, 6, 15);
            let date = days_from_birth(dob, offset).unwrap();
            prop_assert_eq!((date - dob).num_days(), offset);
        }
    }
}
