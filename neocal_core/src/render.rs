//! Rendering of milestone schedules.
//!
//! Dates use the long UK form ("5 February 2024"). Two outputs are
//! provided: a plain-text table (also what gets stored with each
//! calculation record) and a standalone HTML print document.

use crate::{
    MilestoneEntry, MilestoneSchedule, MilestoneValue, PatientDetails, PatientInput,
};
use chrono::NaiveDate;
use std::fmt::Write as _;

/// Long-form UK date, e.g. `5 February 2024`
pub fn format_date_long(date: NaiveDate) -> String {
    date.format("%-d %B %Y").to_string()
}

/// Whole numbers without a trailing `.0`
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Display text for a value
pub fn format_value(value: &MilestoneValue) -> String {
    match value {
        MilestoneValue::Date(d) => format_date_long(*d),
        MilestoneValue::Instruction(t) | MilestoneValue::Status(t) => t.clone(),
    }
}

/// Display text for an entry's value column, with any note appended
pub fn format_entry_value(entry: &MilestoneEntry) -> String {
    let value = format_value(&entry.value);
    match &entry.note {
        Some(note) => format!("{} - {}", value, note),
        None => value,
    }
}

/// Plain-text table: one heading per group, one row per entry.
///
/// Empty groups still print their heading.
pub fn render_table(schedule: &MilestoneSchedule) -> String {
    let width = schedule
        .groups
        .iter()
        .flat_map(|g| g.entries.iter())
        .map(|e| e.label.chars().count())
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    for (i, group) in schedule.groups.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let _ = writeln!(out, "{}", group.kind.title());
        let _ = writeln!(out, "{}", "─".repeat(group.kind.title().chars().count()));
        for entry in &group.entries {
            let _ = writeln!(
                out,
                "  {:<width$}  {}",
                entry.label,
                format_entry_value(entry),
                width = width
            );
        }
    }
    out
}

/// Escape text for inclusion in HTML
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

const PRINT_STYLE: &str = "\
body { font-family: Arial, sans-serif; font-size: 11px; max-width: 800px; margin: 0 auto; }
h1 { text-align: center; color: #005eb8; font-size: 16px; margin-bottom: 15px; }
.demographics { display: flex; justify-content: space-between; margin-bottom: 20px; padding: 10px; border-bottom: 2px solid #005eb8; }
.demographics div { flex: 1; }
.demographics p { margin: 5px 0; }
table { width: 100%; border-collapse: collapse; margin-top: 10px; }
tr { page-break-inside: avoid; }
th, td { border: 1px solid #ccc; padding: 4px 8px; text-align: left; font-size: 11px; }
th { background-color: #f2f2f2; }
@media print { body { margin: 15mm; } }
";

/// The milestone table as HTML rows
pub fn render_html_table(schedule: &MilestoneSchedule) -> String {
    let mut out = String::from("<table>\n");
    for group in &schedule.groups {
        let _ = writeln!(
            out,
            "<tr><th colspan=\"2\">{}</th></tr>",
            escape_html(group.kind.title())
        );
        for entry in &group.entries {
            let _ = writeln!(
                out,
                "<tr><td>{}</td><td>{}</td></tr>",
                escape_html(&entry.label),
                escape_html(&format_entry_value(entry))
            );
        }
    }
    out.push_str("</table>\n");
    out
}

/// Standalone print document with a demographics header
pub fn render_print_html(
    schedule: &MilestoneSchedule,
    input: &PatientInput,
    details: &PatientDetails,
) -> String {
    let name = details.name.as_deref().unwrap_or("");
    let nhs = details.nhs_number.as_deref().unwrap_or("");

    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\">");
    out.push_str("<title>Neonatal Care Calculator</title>\n<style>\n");
    out.push_str(PRINT_STYLE);
    out.push_str("</style></head><body>\n<h1>Neonatal Care Calendar</h1>\n");

    out.push_str("<div class=\"demographics\">\n<div>\n");
    let _ = writeln!(out, "<p><strong>Patient Name:</strong> {}</p>", escape_html(name));
    let _ = writeln!(out, "<p><strong>NHS Number:</strong> {}</p>", escape_html(nhs));
    let _ = writeln!(
        out,
        "<p><strong>Date of Birth:</strong> {}</p>",
        input.date_of_birth.format("%d/%m/%Y")
    );
    out.push_str("</div>\n<div>\n");
    let _ = writeln!(
        out,
        "<p><strong>Birth Weight:</strong> {} kg</p>",
        format_number(input.birth_weight_kg)
    );
    let _ = writeln!(
        out,
        "<p><strong>Gestation:</strong> {}+{}</p>",
        input.gestation_weeks, input.gestation_days
    );
    out.push_str("</div>\n</div>\n");

    out.push_str(&render_html_table(schedule));
    out.push_str("</body></html>\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GroupKind, MilestoneGroup};

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_schedule() -> MilestoneSchedule {
        let groups = GroupKind::ALL
            .iter()
            .map(|kind| {
                let mut group = MilestoneGroup::new(*kind);
                if *kind == GroupKind::Medication {
                    group.push(
                        MilestoneEntry::new("Sytron start (day 28)", MilestoneValue::Date(ymd(2024, 1, 29)))
                            .with_note("Do not use if receiving formula or fortifier"),
                    );
                }
                group
            })
            .collect();
        MilestoneSchedule { groups }
    }

    #[test]
    fn test_format_date_long() {
        assert_eq!(format_date_long(ymd(2024, 2, 5)), "5 February 2024");
        assert_eq!(format_date_long(ymd(2024, 12, 25)), "25 December 2024");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(30.0), "30");
        assert_eq!(format_number(12.5), "12.5");
        assert_eq!(format_number(0.8), "0.8");
    }

    #[test]
    fn test_note_appended_to_value() {
        let entry = MilestoneEntry::new("Sytron start (day 28)", MilestoneValue::Date(ymd(2024, 1, 29)))
            .with_note("Do not use if receiving formula or fortifier");
        assert_eq!(
            format_entry_value(&entry),
            "29 January 2024 - Do not use if receiving formula or fortifier"
        );
    }

    #[test]
    fn test_table_lists_every_group_title() {
        let table = render_table(&sample_schedule());
        for kind in GroupKind::ALL {
            assert!(table.contains(kind.title()), "missing {}", kind.title());
        }
        assert!(table.contains("29 January 2024 - Do not use"));
    }

    #[test]
    fn test_print_document_escapes_details() {
        let input = PatientInput {
            date_of_birth: ymd(2024, 1, 1),
            gestation_weeks: 29,
            gestation_days: 3,
            birth_weight_kg: 1.0,
        };
        let details = PatientDetails {
            name: Some("Baby <Smith> & Co".into()),
            nhs_number: Some("943 476 5919".into()),
        };
        let html = render_print_html(&sample_schedule(), &input, &details);
        assert!(html.contains("Baby &lt;Smith&gt; &amp; Co"));
        assert!(html.contains("01/01/2024"));
        assert!(html.contains("<strong>Gestation:</strong> 29+3"));
        assert!(html.contains("<strong>Birth Weight:</strong> 1 kg"));
        assert!(html.contains("Retinopathy of Prematurity (ROP) Screening"));
    }
}
