use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::StoreError;
use crate::persistence::{Column, Schema, Table};

/// Dates are stored as `MM/DD/YYYY` text.
pub const DATE_FORMAT: &str = "%m/%d/%Y";

pub const TRUCK_COLUMNS: &[Column] = &[
    Column::text("Truck #"),
    Column::text("Truck Type"),
    Column::text("Service Type"),
];

pub const ALERT_COLUMN: &str = "Alert Type/Issue";
pub const ALERT_COLUMN_ALIASES: &[&str] = &["Alert Type"];
pub const ALERT_COLUMNS: &[Column] = &[Column::text(ALERT_COLUMN)];

pub const REPAIR_COLUMNS: &[Column] = &[
    Column::integer("Ticket ID"),
    Column::text("Unit #"),
    Column::text("YMM"),
    Column::text(ALERT_COLUMN),
    Column::text("Description"),
    Column::integer("Mileage"),
    Column::text("Date"),
    Column::text("Scheduled"),
    Column::text("Priority Tier (1/2/3)"),
    Column::text("Assigned to"),
    Column::text("Status"),
    Column::text("Open/Miles at"),
    Column::integer("Downtime (Days)"),
    Column::float("Cost"),
    Column::text("Completed Date"),
    Column::text("Notes"),
];

pub const SERVICE_TYPES: [&str; 10] = [
    "SERVICE TRUCKS",
    "FLATBED",
    "AUTO LOADER",
    "TRACTOR",
    "TRAILER",
    "WRECKER",
    "Landoll Tractors/ Medium",
    "Landoll Trailers",
    "Heavy Wreckers",
    "TRACTOR/ WRECKER",
];

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parse a stored date. Accepts `MM/DD/YYYY` and ISO `YYYY-MM-DD`
/// (optionally followed by a time, as spreadsheet exports write it).
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .ok()
        .or_else(|| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
        .or_else(|| {
            s.get(..10)
                .and_then(|head| NaiveDate::parse_from_str(head, "%Y-%m-%d").ok())
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Open,
    Scheduled,
    Completed,
}

impl Status {
    pub const ALL: [Status; 3] = [Status::Open, Status::Scheduled, Status::Completed];

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Open => "Open",
            Status::Scheduled => "Scheduled",
            Status::Completed => "Completed",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Status::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                StoreError::Validation(format!(
                    "Invalid status '{}'. Must be one of: Open, Scheduled, Completed",
                    s
                ))
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PriorityTier {
    Critical,
    High,
    PreventiveMaintenance,
    NonCritical,
}

impl PriorityTier {
    pub const ALL: [PriorityTier; 4] = [
        PriorityTier::Critical,
        PriorityTier::High,
        PriorityTier::PreventiveMaintenance,
        PriorityTier::NonCritical,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PriorityTier::Critical => "Tier 1 (Critical)",
            PriorityTier::High => "Tier 2 (High)",
            PriorityTier::PreventiveMaintenance => "Tier 3 (PM)",
            PriorityTier::NonCritical => "Tier 4 (Non-Critical)",
        }
    }

    fn short_names(self) -> [&'static str; 2] {
        match self {
            PriorityTier::Critical => ["1", "critical"],
            PriorityTier::High => ["2", "high"],
            PriorityTier::PreventiveMaintenance => ["3", "pm"],
            PriorityTier::NonCritical => ["4", "non-critical"],
        }
    }
}

impl fmt::Display for PriorityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PriorityTier {
    type Err = StoreError;

    /// Accepts the stored label (`Tier 2 (High)`), the tier number or
    /// its short name (`2`, `high`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        PriorityTier::ALL
            .into_iter()
            .find(|tier| {
                tier.as_str().eq_ignore_ascii_case(s)
                    || tier.short_names().iter().any(|n| n.eq_ignore_ascii_case(s))
            })
            .ok_or_else(|| {
                StoreError::Validation(format!(
                    "Invalid priority '{}'. Must be one of: 1 (Critical), 2 (High), 3 (PM), 4 (Non-Critical)",
                    s
                ))
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Truck {
    #[serde(rename = "Truck #")]
    pub number: String,
    #[serde(rename = "Truck Type")]
    pub truck_type: String,
    #[serde(rename = "Service Type")]
    pub service_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertType {
    #[serde(rename = "Alert Type/Issue")]
    pub name: String,
}

/// One alert/issue line of a ticket. Several rows may share a ticket id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepairRecord {
    #[serde(rename = "Ticket ID")]
    pub ticket_id: i64,
    #[serde(rename = "Unit #")]
    pub unit: String,
    #[serde(rename = "YMM")]
    pub ymm: String,
    #[serde(rename = "Alert Type/Issue")]
    pub alert: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Mileage")]
    pub mileage: i64,
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Scheduled")]
    pub scheduled: String,
    #[serde(rename = "Priority Tier (1/2/3)")]
    pub priority: String,
    #[serde(rename = "Assigned to")]
    pub assigned_to: String,
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "Open/Miles at")]
    pub opened_at: String,
    #[serde(rename = "Downtime (Days)")]
    pub downtime_days: i64,
    #[serde(rename = "Cost")]
    pub cost: f64,
    #[serde(rename = "Completed Date")]
    pub completed_date: String,
    #[serde(rename = "Notes")]
    pub notes: String,
}

impl RepairRecord {
    /// Hand-edited files may carry any casing of the status.
    pub fn is_completed(&self) -> bool {
        self.status
            .trim()
            .eq_ignore_ascii_case(Status::Completed.as_str())
    }

    pub fn parsed_date(&self) -> Option<NaiveDate> {
        parse_date(&self.date)
    }

    /// Completed Date is set iff the status is Completed. An existing
    /// completion date is kept; a missing one becomes `today`.
    pub fn recompute_completed_date(&mut self, today: NaiveDate) {
        if !self.is_completed() {
            self.completed_date.clear();
        } else if self.completed_date.trim().is_empty() {
            self.completed_date = format_date(today);
        }
    }
}

/// Conversion between a typed record and a schema-ordered table row.
pub trait TableRecord: Sized {
    fn schema() -> Schema;
    fn from_row(row: &[String]) -> Self;
    fn to_row(&self) -> Vec<String>;
}

pub fn records_from_table<T: TableRecord>(table: &Table) -> Vec<T> {
    table.rows.iter().map(|row| T::from_row(row)).collect()
}

pub fn table_from_records<T: TableRecord>(records: &[T]) -> Table {
    Table {
        headers: T::schema().headers(),
        rows: records.iter().map(TableRecord::to_row).collect(),
    }
}

fn cell(row: &[String], idx: usize) -> String {
    row.get(idx).cloned().unwrap_or_default()
}

/// Integer cell; blanks and garbage read as 0, `3.0` reads as 3.
pub fn coerce_int(raw: &str) -> i64 {
    let s = raw.trim();
    if s.is_empty() {
        return 0;
    }
    if let Ok(v) = s.parse::<i64>() {
        return v;
    }
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() => v.trunc() as i64,
        _ => {
            debug!(value = s, "non-numeric integer cell read as 0");
            0
        }
    }
}

/// Float cell; blanks and garbage read as 0.0.
pub fn coerce_float(raw: &str) -> f64 {
    let s = raw.trim().trim_start_matches('$').replace(',', "");
    if s.is_empty() {
        return 0.0;
    }
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => {
            debug!(value = %s, "non-numeric float cell read as 0");
            0.0
        }
    }
}

/// Floats keep a fractional digit so whole amounts round-trip as `0.0`.
pub fn format_float(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

impl TableRecord for Truck {
    fn schema() -> Schema {
        Schema(TRUCK_COLUMNS)
    }

    fn from_row(row: &[String]) -> Self {
        Truck {
            number: cell(row, 0),
            truck_type: cell(row, 1),
            service_type: cell(row, 2),
        }
    }

    fn to_row(&self) -> Vec<String> {
        vec![
            self.number.clone(),
            self.truck_type.clone(),
            self.service_type.clone(),
        ]
    }
}

impl TableRecord for AlertType {
    fn schema() -> Schema {
        Schema(ALERT_COLUMNS)
    }

    fn from_row(row: &[String]) -> Self {
        AlertType {
            name: cell(row, 0),
        }
    }

    fn to_row(&self) -> Vec<String> {
        vec![self.name.clone()]
    }
}

impl TableRecord for RepairRecord {
    fn schema() -> Schema {
        Schema(REPAIR_COLUMNS)
    }

    fn from_row(row: &[String]) -> Self {
        RepairRecord {
            ticket_id: coerce_int(&cell(row, 0)),
            unit: cell(row, 1),
            ymm: cell(row, 2),
            alert: cell(row, 3),
            description: cell(row, 4),
            mileage: coerce_int(&cell(row, 5)),
            date: cell(row, 6),
            scheduled: cell(row, 7),
            priority: cell(row, 8),
            assigned_to: cell(row, 9),
            status: cell(row, 10),
            opened_at: cell(row, 11),
            downtime_days: coerce_int(&cell(row, 12)),
            cost: coerce_float(&cell(row, 13)),
            completed_date: cell(row, 14),
            notes: cell(row, 15),
        }
    }

    fn to_row(&self) -> Vec<String> {
        vec![
            self.ticket_id.to_string(),
            self.unit.clone(),
            self.ymm.clone(),
            self.alert.clone(),
            self.description.clone(),
            self.mileage.to_string(),
            self.date.clone(),
            self.scheduled.clone(),
            self.priority.clone(),
            self.assigned_to.clone(),
            self.status.clone(),
            self.opened_at.clone(),
            self.downtime_days.to_string(),
            format_float(self.cost),
            self.completed_date.clone(),
            self.notes.clone(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn record(status: &str, completed: &str) -> RepairRecord {
        RepairRecord {
            ticket_id: 1,
            unit: "T1".to_string(),
            ymm: "2020 FORD F150".to_string(),
            alert: "Brakes".to_string(),
            description: "Pads".to_string(),
            mileage: 0,
            date: "01/02/2025".to_string(),
            scheduled: String::new(),
            priority: PriorityTier::High.as_str().to_string(),
            assigned_to: String::new(),
            status: status.to_string(),
            opened_at: "01/02/2025".to_string(),
            downtime_days: 0,
            cost: 0.0,
            completed_date: completed.to_string(),
            notes: String::new(),
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date("03/15/2025"), Some(day(2025, 3, 15)));
        assert_eq!(parse_date("2025-03-15"), Some(day(2025, 3, 15)));
        assert_eq!(parse_date("2025-03-15 00:00:00"), Some(day(2025, 3, 15)));
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("soon"), None);
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date(day(2024, 7, 4)), "07/04/2024");
    }

    #[test]
    fn test_status_parse_is_case_insensitive() {
        assert_eq!("completed".parse::<Status>().unwrap(), Status::Completed);
        assert_eq!(" Open ".parse::<Status>().unwrap(), Status::Open);
        assert!("Closed".parse::<Status>().is_err());
    }

    #[test]
    fn test_priority_parse_accepts_short_forms() {
        assert_eq!("1".parse::<PriorityTier>().unwrap(), PriorityTier::Critical);
        assert_eq!("pm".parse::<PriorityTier>().unwrap(), PriorityTier::PreventiveMaintenance);
        assert_eq!(
            "Tier 4 (Non-Critical)".parse::<PriorityTier>().unwrap(),
            PriorityTier::NonCritical
        );
        assert!("urgent".parse::<PriorityTier>().is_err());
    }

    #[test]
    fn test_recompute_sets_today_when_completed() {
        let mut r = record("Completed", "");
        r.recompute_completed_date(day(2025, 5, 6));
        assert_eq!(r.completed_date, "05/06/2025");
    }

    #[test]
    fn test_recompute_keeps_existing_completion() {
        let mut r = record("Completed", "04/01/2025");
        r.recompute_completed_date(day(2025, 5, 6));
        assert_eq!(r.completed_date, "04/01/2025");
    }

    #[test]
    fn test_recompute_clears_when_not_completed() {
        let mut r = record("Open", "04/01/2025");
        r.recompute_completed_date(day(2025, 5, 6));
        assert_eq!(r.completed_date, "");
    }

    #[test]
    fn test_hand_edited_completed_keeps_date() {
        let mut r = record(" completed", "03/04/2025");
        assert!(r.is_completed());
        r.recompute_completed_date(day(2025, 5, 6));
        assert_eq!(r.completed_date, "03/04/2025");
    }

    #[test]
    fn test_coerce_numbers() {
        assert_eq!(coerce_int("3"), 3);
        assert_eq!(coerce_int("3.0"), 3);
        assert_eq!(coerce_int(""), 0);
        assert_eq!(coerce_int("n/a"), 0);
        assert_eq!(coerce_float("12.5"), 12.5);
        assert_eq!(coerce_float("$1,200.00"), 1200.0);
        assert_eq!(coerce_float("abc"), 0.0);
        assert_eq!(coerce_float("NaN"), 0.0);
    }

    #[test]
    fn test_format_float_keeps_fraction_digit() {
        assert_eq!(format_float(0.0), "0.0");
        assert_eq!(format_float(125.0), "125.0");
        assert_eq!(format_float(125.5), "125.5");
    }

    #[test]
    fn test_repair_row_conversion() {
        let r = record("Open", "");
        let row = r.to_row();
        assert_eq!(row.len(), REPAIR_COLUMNS.len());
        assert_eq!(row[0], "1");
        assert_eq!(row[13], "0.0");
        assert_eq!(RepairRecord::from_row(&row), r);
    }

    #[test]
    fn test_from_row_tolerates_short_rows() {
        let r = RepairRecord::from_row(&["5".to_string(), "T9".to_string()]);
        assert_eq!(r.ticket_id, 5);
        assert_eq!(r.unit, "T9");
        assert_eq!(r.cost, 0.0);
        assert_eq!(r.notes, "");
    }

    proptest! {
        #[test]
        fn prop_completed_date_tracks_status(
            status in "Open|Scheduled|Completed",
            existing in "|01/01/2024"
        ) {
            let mut r = record(&status, &existing);
            r.recompute_completed_date(day(2025, 1, 1));
            prop_assert_eq!(r.completed_date.is_empty(), status != "Completed");
        }

        #[test]
        fn prop_coerce_int_never_panics(s in "\\PC{0,20}") {
            let _ = coerce_int(&s);
            let _ = coerce_float(&s);
        }
    }
}
