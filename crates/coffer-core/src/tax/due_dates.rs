//! Quarterly payment calendar

use chrono::{Datelike, NaiveDate};

use super::config::DueDateRule;
use crate::models::DueDate;

/// Dates more than this many days in the past are dropped
const PAST_DUE_WINDOW_DAYS: i64 = 30;
/// Future dates within this many days are urgent
const URGENT_WINDOW_DAYS: i64 = 30;
/// Look ahead one full calendar cycle
const HORIZON_DAYS: i64 = 366;

/// Due dates from the annual calendar relative to `today`, nearest first
///
/// Returns every date in the next year plus any date within the past 30 days.
pub fn upcoming(rules: &[DueDateRule], today: NaiveDate) -> Vec<DueDate> {
    let mut dates: Vec<DueDate> = (today.year() - 1..=today.year() + 1)
        .flat_map(|tax_year| {
            rules.iter().filter_map(move |rule| {
                NaiveDate::from_ymd_opt(tax_year + rule.year_offset, rule.month, rule.day)
                    .map(|due| (format!("{} {}", rule.period, tax_year), due))
            })
        })
        .filter_map(|(period, due_date)| {
            let days_until = (due_date - today).num_days();
            if !(-PAST_DUE_WINDOW_DAYS..=HORIZON_DAYS).contains(&days_until) {
                return None;
            }
            Some(DueDate {
                period,
                due_date,
                days_until,
                is_urgent: (0..=URGENT_WINDOW_DAYS).contains(&days_until),
                is_past_due: days_until < 0,
            })
        })
        .collect();

    dates.sort_by_key(|d| (d.days_until.abs(), d.days_until < 0));
    dates
}

/// The nearest due date on or after `today`
pub fn next_due_date(rules: &[DueDateRule], today: NaiveDate) -> Option<NaiveDate> {
    upcoming(rules, today)
        .into_iter()
        .filter(|d| !d.is_past_due)
        .map(|d| d.due_date)
        .min()
}
