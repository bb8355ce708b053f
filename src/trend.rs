use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

use chrono::{Datelike, Duration, NaiveDate};
use regex::Regex;
use serde::Serialize;

use crate::models::RepairRecord;
use crate::query::ticket_totals;

pub const TRAILING_WINDOW_DAYS: i64 = 90;
pub const DEFAULT_TOP_ISSUES: usize = 10;
pub const DEFAULT_RECENT: usize = 10;

fn year_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\b(20\d{2}|19\d{2})\b").unwrap_or_else(|e| panic!("invalid year pattern: {}", e))
    })
}

/// First four-digit year (1900-2099) standing alone in a YMM string.
pub fn extract_year(ymm: &str) -> Option<i32> {
    year_pattern()
        .captures(ymm)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueCount {
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyRollup {
    /// `YYYY-MM`
    pub month: String,
    pub cost: f64,
    pub downtime_days: i64,
}

/// Rollup of one unit's repair history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendReport {
    pub unit: String,
    pub total_records: usize,
    pub last_90_days: usize,
    pub total_cost: f64,
    pub total_downtime_days: i64,
    pub ymm: String,
    pub ymm_year: Option<i32>,
    pub truck_age: Option<i32>,
    pub top_issues: Vec<IssueCount>,
    pub assignments: Vec<IssueCount>,
    pub monthly: Vec<MonthlyRollup>,
    pub recent: Vec<RepairRecord>,
}

/// Units that have at least one repair, sorted.
pub fn units(records: &[RepairRecord]) -> Vec<String> {
    records
        .iter()
        .map(|r| r.unit.trim())
        .filter(|u| !u.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn ranked<'a>(labels: impl Iterator<Item = &'a str>, blank: &str) -> Vec<IssueCount> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for label in labels {
        let label = label.trim();
        let label = if label.is_empty() { blank } else { label };
        *counts.entry(label.to_string()).or_default() += 1;
    }
    let mut ranked: Vec<IssueCount> = counts
        .into_iter()
        .map(|(label, count)| IssueCount { label, count })
        .collect();
    // Stable sort keeps label order among ties.
    ranked.sort_by_key(|c| Reverse(c.count));
    ranked
}

impl TrendReport {
    /// Build the report for `unit`, or `None` when the unit has no records.
    pub fn for_unit(
        records: &[RepairRecord],
        unit: &str,
        today: NaiveDate,
        top_n: usize,
        recent_n: usize,
    ) -> Option<Self> {
        let rows: Vec<&RepairRecord> = records.iter().filter(|r| r.unit == unit).collect();
        if rows.is_empty() {
            return None;
        }

        let cutoff = today - Duration::days(TRAILING_WINDOW_DAYS);
        let last_90_days = rows
            .iter()
            .filter(|r| r.parsed_date().is_some_and(|d| d >= cutoff))
            .count();

        let (total_downtime_days, total_cost) = ticket_totals(rows.iter().copied());

        let ymm = rows
            .iter()
            .map(|r| r.ymm.trim())
            .find(|y| !y.is_empty())
            .unwrap_or_default()
            .to_string();
        let ymm_year = extract_year(&ymm);
        let truck_age = ymm_year.map(|y| today.year() - y);

        let mut top_issues = ranked(rows.iter().map(|r| r.alert.as_str()), "Unknown");
        top_issues.truncate(top_n);
        let assignments = ranked(rows.iter().map(|r| r.assigned_to.as_str()), "Unassigned");

        let mut by_month: BTreeMap<String, Vec<&RepairRecord>> = BTreeMap::new();
        for r in &rows {
            if let Some(date) = r.parsed_date() {
                by_month
                    .entry(date.format("%Y-%m").to_string())
                    .or_default()
                    .push(r);
            }
        }
        let monthly = by_month
            .into_iter()
            .map(|(month, group)| {
                let (downtime_days, cost) = ticket_totals(group);
                MonthlyRollup {
                    month,
                    cost,
                    downtime_days,
                }
            })
            .collect();

        let mut recent: Vec<&RepairRecord> = rows.clone();
        // None sorts below Some, so unparseable dates land last.
        recent.sort_by_key(|r| Reverse(r.parsed_date()));
        let recent = recent.into_iter().take(recent_n).cloned().collect();

        Some(TrendReport {
            unit: unit.to_string(),
            total_records: rows.len(),
            last_90_days,
            total_cost,
            total_downtime_days,
            ymm,
            ymm_year,
            truck_age,
            top_issues,
            assignments,
            monthly,
            recent,
        })
    }
}
