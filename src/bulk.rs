//! Field updates, bulk overrides and the staged edit grid.
//!
//! The grid is an editable projection of the repairs table. It is staged
//! from the committed records, edited outside the store (as a CSV file),
//! and committed back either as "rows that changed" or as an explicit
//! selection with bulk overrides. Bulk overrides are applied after the
//! per-row edits, so they win when both touch the same field.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDate;

use crate::error::{StoreError, StoreResult};
use crate::models::{
    coerce_float, coerce_int, format_date, format_float, parse_date, PriorityTier, RepairRecord,
    Status,
};
use crate::persistence::{read_table, Table};

const NOTES_SEPARATOR: &str = " | ";

/// Changes to one record. `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordUpdate {
    pub alert: Option<String>,
    pub description: Option<String>,
    pub mileage: Option<i64>,
    /// Empty string clears the scheduled date.
    pub scheduled: Option<String>,
    pub priority: Option<PriorityTier>,
    pub assigned_to: Option<String>,
    pub status: Option<Status>,
    pub downtime_days: Option<i64>,
    pub cost: Option<f64>,
    pub notes: Option<String>,
}

impl RecordUpdate {
    pub fn is_empty(&self) -> bool {
        self == &RecordUpdate::default()
    }

    pub fn validate(&self) -> StoreResult<()> {
        if let Some(scheduled) = &self.scheduled {
            if !scheduled.trim().is_empty() && parse_date(scheduled).is_none() {
                return Err(StoreError::Validation(format!(
                    "Invalid scheduled date '{}'. Use MM/DD/YYYY",
                    scheduled
                )));
            }
        }
        if let Some(description) = &self.description {
            if description.trim().is_empty() {
                return Err(StoreError::Validation(
                    "Description can't be blank.".to_string(),
                ));
            }
        }
        if self.alert.as_deref().is_some_and(|a| a.trim().is_empty()) {
            return Err(StoreError::Validation(
                "Alert type can't be blank.".to_string(),
            ));
        }
        check_amounts(self.mileage, self.downtime_days, self.cost)
    }

    pub fn apply_to(&self, record: &mut RepairRecord) {
        if let Some(alert) = &self.alert {
            record.alert = alert.trim().to_string();
        }
        if let Some(description) = &self.description {
            record.description = description.clone();
        }
        if let Some(mileage) = self.mileage {
            record.mileage = mileage;
        }
        if let Some(scheduled) = &self.scheduled {
            record.scheduled = parse_date(scheduled).map(format_date).unwrap_or_default();
        }
        if let Some(priority) = self.priority {
            record.priority = priority.as_str().to_string();
        }
        if let Some(assigned_to) = &self.assigned_to {
            record.assigned_to = assigned_to.trim().to_string();
        }
        if let Some(status) = self.status {
            record.status = status.as_str().to_string();
        }
        if let Some(downtime) = self.downtime_days {
            record.downtime_days = downtime;
        }
        if let Some(cost) = self.cost {
            record.cost = cost;
        }
        if let Some(notes) = &self.notes {
            record.notes = notes.clone();
        }
    }
}

/// Mileage, downtime and cost may not be negative.
pub fn check_amounts(mileage: Option<i64>, downtime: Option<i64>, cost: Option<f64>) -> StoreResult<()> {
    if mileage.is_some_and(|m| m < 0) {
        return Err(StoreError::Validation("Mileage can't be negative.".to_string()));
    }
    if downtime.is_some_and(|d| d < 0) {
        return Err(StoreError::Validation(
            "Downtime (Days) can't be negative.".to_string(),
        ));
    }
    if cost.is_some_and(|c| c < 0.0 || !c.is_finite()) {
        return Err(StoreError::Validation(
            "Cost must be a non-negative amount.".to_string(),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotesMode {
    #[default]
    Append,
    Replace,
}

/// Overrides applied to every selected row. `None` means "no change".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkUpdate {
    pub status: Option<Status>,
    pub alert: Option<String>,
    /// Ignored when blank.
    pub notes: Option<String>,
    pub notes_mode: NotesMode,
}

impl BulkUpdate {
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.alert.is_none()
            && self.notes.as_deref().map_or(true, |n| n.trim().is_empty())
    }

    pub fn validate(&self) -> StoreResult<()> {
        match &self.alert {
            Some(alert) if alert.trim().is_empty() => Err(StoreError::Validation(
                "Bulk alert type can't be blank.".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

fn merge_notes(existing: &str, text: &str, mode: NotesMode) -> String {
    let existing = existing.trim();
    match mode {
        NotesMode::Append if !existing.is_empty() => {
            format!("{}{}{}", existing, NOTES_SEPARATOR, text)
        }
        _ => text.to_string(),
    }
}

/// Per-row edit, then bulk status/alert, then notes, then the completed
/// date recompute.
pub fn apply_to_record(
    record: &mut RepairRecord,
    row_edit: Option<&RecordUpdate>,
    bulk: &BulkUpdate,
    today: NaiveDate,
) {
    if let Some(edit) = row_edit {
        edit.apply_to(record);
    }
    if let Some(status) = bulk.status {
        record.status = status.as_str().to_string();
    }
    if let Some(alert) = &bulk.alert {
        record.alert = alert.trim().to_string();
    }
    if let Some(text) = bulk.notes.as_deref().map(str::trim) {
        if !text.is_empty() {
            record.notes = merge_notes(&record.notes, text, bulk.notes_mode);
        }
    }
    record.recompute_completed_date(today);
}

const GRID_HEADERS: [&str; 11] = [
    "RowID",
    "Select",
    "Ticket ID",
    "Unit #",
    "Scheduled",
    "Priority Tier (1/2/3)",
    "Assigned to",
    "Status",
    "Downtime (Days)",
    "Cost",
    "Alert Type/Issue",
];

/// One row of the editable projection. Ticket ID and Unit # identify the
/// record the row was staged from and can't be edited.
#[derive(Debug, Clone, PartialEq)]
pub struct GridRow {
    pub row_id: usize,
    pub selected: bool,
    pub ticket_id: i64,
    pub unit: String,
    pub scheduled: String,
    pub priority: String,
    pub assigned_to: String,
    pub status: String,
    pub downtime_days: i64,
    pub cost: f64,
    pub alert: String,
}

impl GridRow {
    fn from_record(row_id: usize, r: &RepairRecord) -> Self {
        GridRow {
            row_id,
            selected: false,
            ticket_id: r.ticket_id,
            unit: r.unit.clone(),
            scheduled: r.scheduled.clone(),
            priority: r.priority.clone(),
            assigned_to: r.assigned_to.clone(),
            status: r.status.clone(),
            downtime_days: r.downtime_days,
            cost: r.cost,
            alert: r.alert.clone(),
        }
    }

    fn staged_from(&self, committed: &RepairRecord) -> bool {
        self.ticket_id == committed.ticket_id && self.unit.trim() == committed.unit.trim()
    }

    /// The update that turns `committed` into this row, if any field
    /// meaningfully differs.
    fn diff(&self, committed: &RepairRecord) -> StoreResult<Option<RecordUpdate>> {
        let mut update = RecordUpdate::default();

        if parse_date(&self.scheduled) != parse_date(&committed.scheduled)
            || (parse_date(&self.scheduled).is_none()
                && self.scheduled.trim() != committed.scheduled.trim())
        {
            update.scheduled = Some(self.scheduled.trim().to_string());
        }
        if self.priority.trim() != committed.priority.trim() {
            update.priority = Some(self.priority.parse()?);
        }
        if self.assigned_to.trim() != committed.assigned_to.trim() {
            update.assigned_to = Some(self.assigned_to.clone());
        }
        if self.status.trim() != committed.status.trim() {
            update.status = Some(self.status.parse()?);
        }
        if self.downtime_days != committed.downtime_days {
            update.downtime_days = Some(self.downtime_days);
        }
        if (self.cost - committed.cost).abs() > 0.005 {
            update.cost = Some(self.cost);
        }
        if self.alert.trim() != committed.alert.trim() {
            update.alert = Some(self.alert.clone());
        }

        if update.is_empty() {
            return Ok(None);
        }
        update.validate()?;
        Ok(Some(update))
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EditGrid {
    pub rows: Vec<GridRow>,
}

impl EditGrid {
    pub fn stage(records: &[RepairRecord]) -> Self {
        EditGrid {
            rows: records
                .iter()
                .enumerate()
                .map(|(i, r)| GridRow::from_record(i, r))
                .collect(),
        }
    }

    /// Stage only a filtered view; rows keep their ids in the full table.
    pub fn stage_view(view: &[(usize, &RepairRecord)]) -> Self {
        EditGrid {
            rows: view
                .iter()
                .map(|(i, r)| GridRow::from_record(*i, r))
                .collect(),
        }
    }

    pub fn selected(&self) -> Vec<usize> {
        self.rows
            .iter()
            .filter(|r| r.selected)
            .map(|r| r.row_id)
            .collect()
    }

    /// Ids of rows whose editable fields differ from `records`.
    pub fn changed_rows(&self, records: &[RepairRecord]) -> StoreResult<Vec<usize>> {
        Ok(self.row_edits(records)?.into_keys().collect())
    }

    /// Per-row updates for every row that differs from `records`. Fails
    /// without edits if any row id now points at a different record.
    pub fn row_edits(&self, records: &[RepairRecord]) -> StoreResult<BTreeMap<usize, RecordUpdate>> {
        let mut edits = BTreeMap::new();
        for row in &self.rows {
            let committed = records
                .get(row.row_id)
                .ok_or_else(|| StoreError::NotFound(format!("Row {}", row.row_id)))?;
            if !row.staged_from(committed) {
                return Err(StoreError::StaleGrid {
                    row_id: row.row_id,
                    ticket_id: row.ticket_id,
                    unit: row.unit.clone(),
                });
            }
            if let Some(update) = row.diff(committed)? {
                edits.insert(row.row_id, update);
            }
        }
        Ok(edits)
    }

    pub fn to_table(&self) -> Table {
        let mut table = Table::new(GRID_HEADERS.iter().map(|h| h.to_string()).collect());
        for r in &self.rows {
            table.rows.push(vec![
                r.row_id.to_string(),
                r.selected.to_string(),
                r.ticket_id.to_string(),
                r.unit.clone(),
                r.scheduled.clone(),
                r.priority.clone(),
                r.assigned_to.clone(),
                r.status.clone(),
                r.downtime_days.to_string(),
                format_float(r.cost),
                r.alert.clone(),
            ]);
        }
        table
    }

    pub fn from_table(table: &Table) -> StoreResult<Self> {
        let mut idx = [0usize; GRID_HEADERS.len()];
        for (slot, header) in idx.iter_mut().zip(GRID_HEADERS) {
            *slot = table.column(header).ok_or_else(|| {
                StoreError::Validation(format!("Edit grid is missing column '{}'", header))
            })?;
        }

        let mut rows = Vec::with_capacity(table.len());
        for raw in &table.rows {
            let get = |i: usize| raw[idx[i]].as_str();
            let row_id = get(0).trim().parse::<usize>().map_err(|_| {
                StoreError::Validation(format!("Invalid RowID '{}' in edit grid", get(0)))
            })?;
            rows.push(GridRow {
                row_id,
                selected: parse_flag(get(1)),
                ticket_id: coerce_int(get(2)),
                unit: get(3).to_string(),
                scheduled: get(4).to_string(),
                priority: get(5).to_string(),
                assigned_to: get(6).to_string(),
                status: get(7).to_string(),
                downtime_days: coerce_int(get(8)),
                cost: coerce_float(get(9)),
                alert: get(10).to_string(),
            });
        }
        Ok(EditGrid { rows })
    }

    pub fn write_csv(&self, path: &Path) -> StoreResult<()> {
        let save_err = |reason: String| StoreError::Save {
            path: path.to_path_buf(),
            reason,
        };
        let bytes = self
            .to_table()
            .to_csv_bytes()
            .map_err(|e| save_err(e.to_string()))?;
        std::fs::write(path, bytes).map_err(|e| save_err(e.to_string()))
    }

    pub fn read_csv(path: &Path) -> StoreResult<Self> {
        EditGrid::from_table(&read_table(path)?)
    }
}

fn parse_flag(s: &str) -> bool {
    matches!(
        s.trim().to_ascii_lowercase().as_str(),
        "true" | "yes" | "y" | "x" | "1"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 10).unwrap()
    }

    fn record(status: &str) -> RepairRecord {
        RepairRecord {
            ticket_id: 4,
            unit: "FB-3".to_string(),
            ymm: "2020 FREIGHTLINER- FLATBED".to_string(),
            alert: "Tires".to_string(),
            description: "Rotate".to_string(),
            mileage: 1200,
            date: "06/01/2025".to_string(),
            scheduled: "06/05/2025".to_string(),
            priority: "Tier 2 (High)".to_string(),
            assigned_to: String::new(),
            status: status.to_string(),
            opened_at: "06/01/2025".to_string(),
            downtime_days: 1,
            cost: 40.0,
            completed_date: String::new(),
            notes: String::new(),
        }
    }

    #[test]
    fn test_record_update_applies_only_set_fields() {
        let mut r = record("Open");
        let update = RecordUpdate {
            assigned_to: Some(" Rigo ".to_string()),
            scheduled: Some("2025-07-01".to_string()),
            ..Default::default()
        };
        update.apply_to(&mut r);
        assert_eq!(r.assigned_to, "Rigo");
        assert_eq!(r.scheduled, "07/01/2025");
        assert_eq!(r.alert, "Tires");
        assert_eq!(r.cost, 40.0);
    }

    #[test]
    fn test_record_update_clears_schedule() {
        let mut r = record("Open");
        RecordUpdate {
            scheduled: Some(String::new()),
            ..Default::default()
        }
        .apply_to(&mut r);
        assert_eq!(r.scheduled, "");
    }

    #[test]
    fn test_record_update_validation() {
        let bad_date = RecordUpdate {
            scheduled: Some("next week".to_string()),
            ..Default::default()
        };
        assert!(bad_date.validate().is_err());

        let negative = RecordUpdate {
            downtime_days: Some(-1),
            ..Default::default()
        };
        assert!(negative.validate().is_err());

        let blank_desc = RecordUpdate {
            description: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(blank_desc.validate().is_err());

        let blank_alert = RecordUpdate {
            alert: Some(" ".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            blank_alert.validate(),
            Err(StoreError::Validation(_))
        ));
    }

    #[test]
    fn test_bulk_status_beats_row_status() {
        let mut r = record("Open");
        let row = RecordUpdate {
            status: Some(Status::Scheduled),
            ..Default::default()
        };
        let bulk = BulkUpdate {
            status: Some(Status::Completed),
            ..Default::default()
        };
        apply_to_record(&mut r, Some(&row), &bulk, today());
        assert_eq!(r.status, "Completed");
        assert_eq!(r.completed_date, "06/10/2025");
    }

    #[test]
    fn test_bulk_alert_beats_row_alert() {
        let mut r = record("Open");
        let row = RecordUpdate {
            alert: Some("Brakes".to_string()),
            ..Default::default()
        };
        let bulk = BulkUpdate {
            alert: Some("Electrical".to_string()),
            ..Default::default()
        };
        apply_to_record(&mut r, Some(&row), &bulk, today());
        assert_eq!(r.alert, "Electrical");
    }

    #[test]
    fn test_notes_append_on_blank_has_no_separator() {
        assert_eq!(merge_notes("", "new", NotesMode::Append), "new");
        assert_eq!(merge_notes("  ", "new", NotesMode::Append), "new");
        assert_eq!(merge_notes("old", "new", NotesMode::Append), "old | new");
        assert_eq!(merge_notes("old", "new", NotesMode::Replace), "new");
    }

    #[test]
    fn test_blank_bulk_notes_ignored() {
        let mut r = record("Open");
        r.notes = "keep".to_string();
        let bulk = BulkUpdate {
            notes: Some("   ".to_string()),
            notes_mode: NotesMode::Replace,
            ..Default::default()
        };
        assert!(bulk.is_empty());
        apply_to_record(&mut r, None, &bulk, today());
        assert_eq!(r.notes, "keep");
    }

    #[test]
    fn test_leaving_completed_clears_date() {
        let mut r = record("Completed");
        r.completed_date = "06/02/2025".to_string();
        let bulk = BulkUpdate {
            status: Some(Status::Open),
            ..Default::default()
        };
        apply_to_record(&mut r, None, &bulk, today());
        assert_eq!(r.completed_date, "");
    }

    #[test]
    fn test_grid_unchanged_has_no_edits() {
        let records = vec![record("Open"), record("Scheduled")];
        let grid = EditGrid::stage(&records);
        assert!(grid.changed_rows(&records).unwrap().is_empty());
    }

    #[test]
    fn test_grid_detects_meaningful_changes_only() {
        let records = vec![record("Open"), record("Open"), record("Open")];
        let mut grid = EditGrid::stage(&records);
        // Same date in another format is not a change
        grid.rows[0].scheduled = "2025-06-05".to_string();
        grid.rows[1].status = "Completed".to_string();
        grid.rows[2].cost = 40.001;

        let edits = grid.row_edits(&records).unwrap();
        assert_eq!(edits.keys().copied().collect::<Vec<_>>(), vec![1]);
        assert_eq!(edits[&1].status, Some(Status::Completed));
    }

    #[test]
    fn test_grid_rejects_invalid_status() {
        let records = vec![record("Open")];
        let mut grid = EditGrid::stage(&records);
        grid.rows[0].status = "Closed".to_string();
        assert!(matches!(
            grid.row_edits(&records),
            Err(StoreError::Validation(_))
        ));
    }

    #[test]
    fn test_grid_unknown_row_is_not_found() {
        let records = vec![record("Open")];
        let mut grid = EditGrid::stage(&records);
        grid.rows[0].row_id = 9;
        assert!(matches!(grid.row_edits(&records), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_grid_row_pointing_at_other_record_is_stale() {
        let mut records = vec![record("Open"), record("Open")];
        records[1].ticket_id = 5;
        let grid = EditGrid::stage(&records[1..]);
        // row 0 was ticket #5 when staged; the table now has #4 there
        assert!(matches!(
            grid.row_edits(&records),
            Err(StoreError::StaleGrid { row_id: 0, ticket_id: 5, .. })
        ));

        let mut moved = EditGrid::stage(&records);
        moved.rows[0].unit = "FB-9".to_string();
        assert!(matches!(
            moved.changed_rows(&records),
            Err(StoreError::StaleGrid { .. })
        ));
    }

    #[test]
    fn test_grid_csv_file_roundtrip_with_selection() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("grid.csv");
        let records = vec![record("Open"), record("Open")];
        let mut grid = EditGrid::stage(&records);
        grid.rows[1].selected = true;
        grid.rows[1].assigned_to = "Ana".to_string();

        grid.write_csv(&path).unwrap();
        let back = EditGrid::read_csv(&path).unwrap();
        assert_eq!(back, grid);
        assert_eq!(back.selected(), vec![1]);
    }

    #[test]
    fn test_grid_missing_column() {
        let table = Table {
            headers: vec!["RowID".to_string(), "Status".to_string()],
            rows: vec![],
        };
        assert!(EditGrid::from_table(&table).is_err());
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("TRUE"));
        assert!(parse_flag("x"));
        assert!(!parse_flag(""));
        assert!(!parse_flag("false"));
    }

    #[test]
    fn test_stage_view_keeps_table_row_ids() {
        let mut records = vec![record("Open"), record("Completed"), record("Open")];
        records[2].assigned_to = "Rigo".to_string();
        let view: Vec<(usize, &RepairRecord)> = records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.status == "Open")
            .collect();
        let mut grid = EditGrid::stage_view(&view);
        assert_eq!(grid.rows.len(), 2);
        assert_eq!(grid.rows[1].row_id, 2);

        grid.rows[1].assigned_to = "Ana".to_string();
        assert_eq!(grid.changed_rows(&records).unwrap(), vec![2]);
    }
}
