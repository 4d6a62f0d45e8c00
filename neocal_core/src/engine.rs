//! Milestone derivation engine.
//!
//! Maps a validated [`PatientInput`] and the active [`ClinicalSettings`]
//! to the ten milestone groups. The engine is a pure function: no state
//! is kept between calls and identical inputs give identical schedules.
//!
//! Groups are independent of each other. Feeding and ROP screening have
//! their own ordered decision trees in [`crate::feeding`] and
//! [`crate::rop`].

use crate::dates::{corrected_gestation_date, days_from_birth, months_from_birth};
use crate::settings::{ClinicalSettings, CranialUltrasoundSettings, MedicationSettings};
use crate::{
    feeding, rop, GroupKind, MilestoneEntry, MilestoneGroup, MilestoneSchedule, MilestoneValue,
    PatientInput, Result,
};

/// Corrected weeks listed in the corrected gestation group
pub const CORRECTED_GESTATION_MILESTONES: [u32; 6] = [30, 32, 34, 36, 38, 40];

const BEFORE_DISCHARGE: &str = "Before Discharge";
const CONSIDER_PARTICIPATION: &str = "Consider participation";

/// Compute the full milestone schedule.
///
/// Input is assumed valid. Any failure aborts the calculation; no partial
/// schedule is returned.
pub fn calculate_milestones(
    input: &PatientInput,
    settings: &ClinicalSettings,
) -> Result<MilestoneSchedule> {
    tracing::info!(
        "Calculating milestones for {}+{} weeks, {} kg, born {}",
        input.gestation_weeks,
        input.gestation_days,
        input.birth_weight_kg,
        input.date_of_birth
    );

    let mut groups = Vec::with_capacity(GroupKind::ALL.len());
    for kind in GroupKind::ALL {
        let entries = match kind {
            GroupKind::CorrectedGestation => corrected_gestation(input)?,
            GroupKind::NewbornExamination => newborn_examination(input)?,
            GroupKind::BloodSpotTest => blood_spot(input)?,
            GroupKind::CranialUltrasound => cranial_ultrasound(input, &settings.cranial_ultrasound)?,
            GroupKind::Medication => medication(input, &settings.medications)?,
            GroupKind::Feeding => feeding::feeding_entries(input, &settings.feeding),
            GroupKind::Immunisations => immunisations(input)?,
            GroupKind::RopScreening => rop::rop_entries(input)?,
            GroupKind::Miscellaneous => miscellaneous(input)?,
            GroupKind::ResearchStudies => research_studies(input),
        };
        tracing::debug!("{}: {} entries", kind.label(), entries.len());
        groups.push(MilestoneGroup { kind, entries });
    }

    Ok(MilestoneSchedule { groups })
}

fn date(d: chrono::NaiveDate) -> MilestoneValue {
    MilestoneValue::Date(d)
}

fn gestation_below(input: &PatientInput, threshold: f64) -> bool {
    f64::from(input.gestation_weeks) < threshold
}

fn corrected(input: &PatientInput, target_weeks: i64) -> Result<chrono::NaiveDate> {
    corrected_gestation_date(
        input.date_of_birth,
        target_weeks,
        input.gestation_weeks,
        input.gestation_days,
    )
}

fn corrected_gestation(input: &PatientInput) -> Result<Vec<MilestoneEntry>> {
    CORRECTED_GESTATION_MILESTONES
        .iter()
        .filter(|weeks| **weeks > input.gestation_weeks)
        .map(|weeks| -> Result<MilestoneEntry> {
            Ok(MilestoneEntry::new(
                format!("{} weeks", weeks),
                date(corrected(input, i64::from(*weeks))?),
            ))
        })
        .collect()
}

fn newborn_examination(input: &PatientInput) -> Result<Vec<MilestoneEntry>> {
    let mut entries = vec![MilestoneEntry::new(
        "Newborn examination (by day 3)",
        date(days_from_birth(input.date_of_birth, 3)?),
    )];

    if input.gestation_weeks < 34 {
        entries.push(MilestoneEntry::new(
            "Newborn examination (34 weeks corrected)",
            date(corrected(input, 34)?),
        ));
    }
    Ok(entries)
}

fn blood_spot(input: &PatientInput) -> Result<Vec<MilestoneEntry>> {
    let mut entries = vec![MilestoneEntry::new(
        "Newborn blood spot test (day 5)",
        date(days_from_birth(input.date_of_birth, 5)?),
    )];

    if input.gestation_weeks < 32 {
        entries.push(MilestoneEntry::new(
            "Newborn blood spot test (day 28)",
            date(days_from_birth(input.date_of_birth, 28)?),
        ));
    }
    Ok(entries)
}

fn cranial_ultrasound(
    input: &PatientInput,
    s: &CranialUltrasoundSettings,
) -> Result<Vec<MilestoneEntry>> {
    let mut entries = Vec::new();
    if !(gestation_below(input, s.gestation) || input.birth_weight_kg < s.weight) {
        return Ok(entries);
    }

    entries.push(MilestoneEntry::new(
        format!("Cranial ultrasound (day {})", s.initial_day),
        date(days_from_birth(input.date_of_birth, s.initial_day)?),
    ));
    entries.push(MilestoneEntry::new(
        "Cranial ultrasound (before discharge)",
        MilestoneValue::instruction(BEFORE_DISCHARGE),
    ));

    if gestation_below(input, s.follow_up_gestation) || input.birth_weight_kg < s.follow_up_weight {
        entries.push(MilestoneEntry::new(
            format!("Cranial ultrasound (day {})", s.follow_up_day),
            date(days_from_birth(input.date_of_birth, s.follow_up_day)?),
        ));
    }
    Ok(entries)
}

fn medication(input: &PatientInput, s: &MedicationSettings) -> Result<Vec<MilestoneEntry>> {
    let mut entries = Vec::new();
    let dob = input.date_of_birth;
    let review_weeks = s.caffeine_review_gestation;

    if gestation_below(input, s.hydrocortisone_gestation) {
        entries.push(MilestoneEntry::new(
            format!("Hydrocortisone review (day {})", s.hydrocortisone_review_day),
            date(days_from_birth(dob, s.hydrocortisone_review_day)?),
        ));
    }

    if gestation_below(input, s.probiotics_gestation) || input.birth_weight_kg < s.probiotics_weight {
        entries.push(MilestoneEntry::new(
            "Probiotics start",
            MilestoneValue::instruction("Commence when tolerating at least 0.5ml of milk every 2 hours"),
        ));
        entries.push(MilestoneEntry::new(
            format!("Probiotics review ({} weeks corrected)", review_weeks),
            date(corrected(input, review_weeks)?),
        ));
    }

    if gestation_below(input, s.caffeine_gestation) {
        entries.push(MilestoneEntry::new(
            format!("Caffeine review ({} weeks corrected)", review_weeks),
            date(corrected(input, review_weeks)?),
        ));
    } else {
        entries.push(MilestoneEntry::new(
            "Caffeine",
            MilestoneValue::instruction("Not routinely indicated"),
        ));
    }

    if input.birth_weight_kg < s.sytron_weight {
        entries.push(
            MilestoneEntry::new(
                format!("Sytron start (day {})", s.sytron_start_day),
                date(days_from_birth(dob, s.sytron_start_day)?),
            )
            .with_note("Do not use if receiving formula or fortifier"),
        );
        entries.push(MilestoneEntry::new(
            "Abidec",
            MilestoneValue::instruction(
                "Commence when tolerating full feeds. Do not use if receiving formula",
            ),
        ));
    }

    Ok(entries)
}

fn immunisations(input: &PatientInput) -> Result<Vec<MilestoneEntry>> {
    let dob = input.date_of_birth;
    let mut entries = Vec::new();
    for weeks in [8, 12, 16] {
        entries.push(MilestoneEntry::new(
            format!("{}-week immunisations", weeks),
            date(days_from_birth(dob, weeks * 7)?),
        ));
    }
    entries.push(MilestoneEntry::new(
        "12-month immunisations",
        date(months_from_birth(dob, 12)?),
    ));
    Ok(entries)
}

fn miscellaneous(input: &PatientInput) -> Result<Vec<MilestoneEntry>> {
    Ok(vec![
        MilestoneEntry::new(
            "Newborn Hearing Screening",
            MilestoneValue::instruction(BEFORE_DISCHARGE),
        ),
        MilestoneEntry::new(
            "Day 100 of Life",
            date(days_from_birth(input.date_of_birth, 100)?),
        ),
    ])
}

fn research_studies(input: &PatientInput) -> Vec<MilestoneEntry> {
    let gw = input.gestation_weeks;
    let studies = [
        ("NeoGASTRIC", gw < 34),
        ("WHEAT", gw < 30),
        ("BASE", gw < 31),
        ("SurfON", (34..=38).contains(&gw)),
    ];

    studies
        .iter()
        .filter(|(_, eligible)| *eligible)
        .map(|(name, _)| {
            MilestoneEntry::new(*name, MilestoneValue::instruction(CONSIDER_PARTICIPATION))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

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

    fn schedule(input: &PatientInput) -> MilestoneSchedule {
        calculate_milestones(input, &ClinicalSettings::default()).unwrap()
    }

    fn group(schedule: &MilestoneSchedule, kind: GroupKind) -> &MilestoneGroup {
        schedule.group(kind).unwrap()
    }

    fn labels(group: &MilestoneGroup) -> Vec<&str> {
        group.entries.iter().map(|e| e.label.as_str()).collect()
    }

    #[test]
    fn test_groups_emitted_in_fixed_order() {
        crate::logging::init_test();
        let s = schedule(&patient(33, 2, 1.9));
        let kinds: Vec<GroupKind> = s.groups.iter().map(|g| g.kind).collect();
        assert_eq!(kinds, GroupKind::ALL.to_vec());
    }

    #[test]
    fn test_idempotent() {
        let input = patient(27, 4, 0.95);
        let settings = ClinicalSettings::default();
        let first = calculate_milestones(&input, &settings).unwrap();
        let second = calculate_milestones(&input, &settings).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_scenario_extremely_preterm() {
        // 26+0, 0.8 kg
        let s = schedule(&patient(26, 0, 0.8));

        let cranial = group(&s, GroupKind::CranialUltrasound);
        assert_eq!(
            labels(cranial),
            vec![
                "Cranial ultrasound (day 3)",
                "Cranial ultrasound (before discharge)",
                "Cranial ultrasound (day 28)",
            ]
        );
        assert_eq!(cranial.entries[0].value, MilestoneValue::Date(ymd(2024, 1, 4)));

        let rop = group(&s, GroupKind::RopScreening);
        assert_eq!(rop.entries[0].value, MilestoneValue::Date(ymd(2024, 2, 5)));
        assert_eq!(rop.entries[1].value, MilestoneValue::Date(ymd(2024, 2, 12)));
    }

    #[test]
    fn test_scenario_consider_rop() {
        let s = schedule(&patient(31, 0, 1.6));
        let rop = group(&s, GroupKind::RopScreening);
        assert_eq!(
            rop.entries[0].value,
            MilestoneValue::status(rop::CONSIDER_SCREENING)
        );
        assert_eq!(rop.entries[1].value, MilestoneValue::Date(ymd(2024, 2, 5)));
    }

    #[test]
    fn test_scenario_term_infant() {
        let s = schedule(&patient(40, 0, 3.5));
        assert!(group(&s, GroupKind::CranialUltrasound).is_empty());
        assert!(group(&s, GroupKind::CorrectedGestation).is_empty());
        assert!(group(&s, GroupKind::ResearchStudies).is_empty());

        let meds = group(&s, GroupKind::Medication);
        assert_eq!(labels(meds), vec!["Caffeine"]);
    }

    #[test]
    fn test_scenario_sytron_start() {
        let s = schedule(&patient(29, 0, 1.0));
        let meds = group(&s, GroupKind::Medication);
        let sytron = meds.entry("Sytron start (day 28)").unwrap();
        assert_eq!(sytron.value, MilestoneValue::Date(ymd(2024, 1, 29)));
        assert_eq!(
            sytron.note.as_deref(),
            Some("Do not use if receiving formula or fortifier")
        );
        assert!(meds.entry("Abidec").is_some());
    }

    #[test]
    fn test_corrected_gestation_weeks() {
        let s = schedule(&patient(33, 3, 1.9));
        let corrected = group(&s, GroupKind::CorrectedGestation);
        assert_eq!(labels(corrected), vec!["34 weeks", "36 weeks", "38 weeks", "40 weeks"]);
        // (34-33)*7 - 3 = 4 days
        assert_eq!(corrected.entries[0].value, MilestoneValue::Date(ymd(2024, 1, 5)));
    }

    #[test]
    fn test_newborn_exam_and_blood_spot() {
        let s = schedule(&patient(30, 0, 1.4));
        let exam = group(&s, GroupKind::NewbornExamination);
        assert_eq!(exam.entries.len(), 2);
        assert_eq!(exam.entries[1].value, MilestoneValue::Date(ymd(2024, 1, 29)));

        let spot = group(&s, GroupKind::BloodSpotTest);
        assert_eq!(
            labels(spot),
            vec!["Newborn blood spot test (day 5)", "Newborn blood spot test (day 28)"]
        );

        let s = schedule(&patient(35, 0, 2.6));
        assert_eq!(group(&s, GroupKind::NewbornExamination).entries.len(), 1);
        assert_eq!(group(&s, GroupKind::BloodSpotTest).entries.len(), 1);
    }

    #[test]
    fn test_cranial_ultrasound_without_follow_up() {
        // Below the 1.5 kg screening weight but above follow-up thresholds
        let s = schedule(&patient(33, 0, 1.3));
        let cranial = group(&s, GroupKind::CranialUltrasound);
        assert_eq!(cranial.entries.len(), 2);
        assert_eq!(
            cranial.entries[1].value,
            MilestoneValue::instruction("Before Discharge")
        );
    }

    #[test]
    fn test_cranial_thresholds_come_from_settings() {
        let mut settings = ClinicalSettings::default();
        settings.cranial_ultrasound.gestation = 30.0;
        settings.cranial_ultrasound.initial_day = 5;

        let input = patient(29, 0, 1.6);
        let s = calculate_milestones(&input, &settings).unwrap();
        let cranial = group(&s, GroupKind::CranialUltrasound);
        assert_eq!(cranial.entries[0].label, "Cranial ultrasound (day 5)");
        assert_eq!(cranial.entries[0].value, MilestoneValue::Date(ymd(2024, 1, 6)));

        let s = schedule(&input);
        assert!(group(&s, GroupKind::CranialUltrasound).is_empty());
    }

    #[test]
    fn test_medication_reviews() {
        let s = schedule(&patient(27, 2, 0.9));
        let meds = group(&s, GroupKind::Medication);
        assert_eq!(
            labels(meds),
            vec![
                "Hydrocortisone review (day 10)",
                "Probiotics start",
                "Probiotics review (34 weeks corrected)",
                "Caffeine review (34 weeks corrected)",
                "Sytron start (day 28)",
                "Abidec",
            ]
        );
        // (34-27)*7 - 2 = 47 days
        let review = meds.entry("Caffeine review (34 weeks corrected)").unwrap();
        assert_eq!(review.value, MilestoneValue::Date(ymd(2024, 2, 17)));
    }

    #[test]
    fn test_immunisations() {
        let input = PatientInput {
            date_of_birth: ymd(2024, 2, 29),
            ..patient(38, 0, 3.0)
        };
        let s = schedule(&input);
        let imms = group(&s, GroupKind::Immunisations);
        assert_eq!(imms.entries[0].value, MilestoneValue::Date(ymd(2024, 4, 25)));
        assert_eq!(imms.entries[1].value, MilestoneValue::Date(ymd(2024, 5, 23)));
        assert_eq!(imms.entries[2].value, MilestoneValue::Date(ymd(2024, 6, 20)));
        assert_eq!(imms.entries[3].value, MilestoneValue::Date(ymd(2025, 2, 28)));
    }

    #[test]
    fn test_miscellaneous() {
        let s = schedule(&patient(36, 0, 2.8));
        let misc = group(&s, GroupKind::Miscellaneous);
        assert_eq!(misc.entries[0].value, MilestoneValue::instruction("Before Discharge"));
        assert_eq!(misc.entries[1].value, MilestoneValue::Date(ymd(2024, 4, 10)));
    }

    #[test]
    fn test_research_studies_membership() {
        let names = |weeks| {
            let s = schedule(&patient(weeks, 0, 2.0));
            labels(group(&s, GroupKind::ResearchStudies))
                .into_iter()
                .map(String::from)
                .collect::<Vec<_>>()
        };

        assert_eq!(names(29), vec!["NeoGASTRIC", "WHEAT", "BASE"]);
        assert_eq!(names(30), vec!["NeoGASTRIC", "BASE"]);
        assert_eq!(names(33), vec!["NeoGASTRIC"]);
        assert_eq!(names(34), vec!["SurfON"]);
        assert_eq!(names(38), vec!["SurfON"]);
        assert!(names(39).is_empty());
    }

    #[test]
    fn test_out_of_range_settings_abort_calculation() {
        let mut settings = ClinicalSettings::default();
        settings.medications.sytron_start_day = i64::MAX / 2;

        let result = calculate_milestones(&patient(29, 0, 1.0), &settings);
        assert!(matches!(result, Err(crate::Error::Computation(_))));
    }
}
