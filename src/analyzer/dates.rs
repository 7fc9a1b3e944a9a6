//! Relative date phrase resolution
//!
//! Sprint and release phrases ("next sprint", "last 3 releases", "rest of
//! the year") become Month Year filter values against the request clock.
//! Release phrases query epics; sprint phrases leave the grain alone so the
//! team rule in the tracker connector can decide.

use chrono::{Datelike, Months, NaiveDate};

use super::TicketFilters;

fn month_label(date: NaiveDate) -> String {
    date.format("%B %Y").to_string()
}

fn shifted(today: NaiveDate, delta: i32) -> NaiveDate {
    let result = if delta >= 0 {
        today.checked_add_months(Months::new(delta as u32))
    } else {
        today.checked_sub_months(Months::new(delta.unsigned_abs()))
    };
    result.unwrap_or(today)
}

fn month_range(today: NaiveDate, deltas: &[i32]) -> String {
    deltas
        .iter()
        .map(|d| month_label(shifted(today, *d)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Months from the current one through December of the current year.
fn rest_of_year(today: NaiveDate) -> String {
    let mut labels = Vec::new();
    for month in today.month()..=12 {
        if let Some(date) = NaiveDate::from_ymd_opt(today.year(), month, 1) {
            labels.push(month_label(date));
        }
    }
    labels.join(", ")
}

fn year_wildcard(today: NaiveDate) -> String {
    format!("%{}%", today.year())
}

/// Fill date filters from a lowercased question. First matching phrase wins.
pub fn apply(lower: &str, today: NaiveDate, filters: &mut TicketFilters) {
    if lower.contains("current sprint") || lower.contains("this sprint") {
        filters.sprint_date = Some(month_label(today));
    } else if lower.contains("last sprint") || lower.contains("previous sprint") {
        filters.sprint_date = Some(month_range(today, &[-1]));
    } else if lower.contains("next 3 sprints") || lower.contains("next three sprints") {
        filters.sprint_date = Some(month_range(today, &[1, 2, 3]));
    } else if lower.contains("next 2 sprints") || lower.contains("next two sprints") {
        filters.sprint_date = Some(month_range(today, &[1, 2]));
    } else if lower.contains("next sprint") {
        filters.sprint_date = Some(month_range(today, &[1]));
    } else if lower.contains("current release") || lower.contains("this release") {
        filters.release_date = Some(month_label(today));
        filters.issue_type_name = Some("Epic".to_string());
    } else if lower.contains("last release") || lower.contains("previous release") {
        filters.release_date = Some(month_range(today, &[-1]));
        filters.issue_type_name = Some("Epic".to_string());
    } else if lower.contains("last 3 releases") || lower.contains("last three releases") {
        filters.release_date = Some(month_range(today, &[-2, -1, 0]));
        filters.issue_type_name = Some("Epic".to_string());
    } else if lower.contains("next 3 releases") || lower.contains("next three releases") {
        filters.release_date = Some(month_range(today, &[1, 2, 3]));
        filters.issue_type_name = Some("Epic".to_string());
    } else if lower.contains("next release") {
        filters.release_date = Some(month_range(today, &[1]));
        filters.issue_type_name = Some("Epic".to_string());
    } else if lower.contains("releases")
        && (lower.contains("ytd") || lower.contains("year to date"))
    {
        filters.release_date = Some(year_wildcard(today));
        filters.issue_type_name = Some("Epic".to_string());
    } else if lower.contains("rest of the year")
        || lower.contains("rest of this year")
        || lower.contains("remainder of the year")
        || lower.contains("remainder of this year")
    {
        filters.sprint_date = Some(rest_of_year(today));
        filters.issue_type_name = Some("Epic".to_string());
    } else if lower.contains("this year") || lower.contains("ytd") || lower.contains("year to date")
    {
        filters.sprint_date = Some(year_wildcard(today));
        filters.issue_type_name = Some("Epic".to_string());
    }
}
