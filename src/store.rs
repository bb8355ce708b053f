use std::collections::BTreeMap;
use std::path::Path;

use chrono::{Local, NaiveDate};
use tracing::{info, warn};

use crate::auth::Session;
use crate::bulk::{self, BulkUpdate, EditGrid, RecordUpdate};
use crate::config::DataPaths;
use crate::error::{AuthError, StoreError, StoreResult};
use crate::models::{
    format_date, records_from_table, table_from_records, AlertType, PriorityTier, RepairRecord,
    Status, TableRecord, Truck, ALERT_COLUMN, ALERT_COLUMN_ALIASES,
};
use crate::persistence::{load_list_table, load_table, save_table, Loaded, SaveReport};
use crate::seed;

/// Source of "today" for derived dates and backup names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clock {
    System,
    Fixed(NaiveDate),
}

impl Clock {
    pub fn today(&self) -> NaiveDate {
        match self {
            Clock::System => Local::now().date_naive(),
            Clock::Fixed(date) => *date,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Repairs,
    Trucks,
    Alerts,
}

impl TableKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TableKind::Repairs => "repairs",
            TableKind::Trucks => "trucks",
            TableKind::Alerts => "alerts",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertSelector<'a> {
    Name(&'a str),
    Index(usize),
}

/// One alert line of a new ticket.
#[derive(Debug, Clone, PartialEq)]
pub struct RepairLine {
    pub alert: String,
    pub description: String,
    pub mileage: i64,
    pub date: NaiveDate,
    pub scheduled: Option<NaiveDate>,
    pub priority: PriorityTier,
    pub assigned_to: String,
    pub status: Status,
    pub downtime_days: i64,
    pub cost: f64,
    pub notes: String,
}

impl RepairLine {
    pub fn new(alert: &str, description: &str, date: NaiveDate) -> Self {
        RepairLine {
            alert: alert.trim().to_string(),
            description: description.to_string(),
            mileage: 0,
            date,
            scheduled: None,
            priority: PriorityTier::Critical,
            assigned_to: String::new(),
            status: Status::Open,
            downtime_days: 0,
            cost: 0.0,
            notes: String::new(),
        }
    }

    fn validate(&self) -> StoreResult<()> {
        if self.description.trim().is_empty() {
            return Err(StoreError::Validation(
                "Unit # and Description are required.".to_string(),
            ));
        }
        bulk::check_amounts(Some(self.mileage), Some(self.downtime_days), Some(self.cost))
    }

    fn into_record(self, ticket_id: i64, unit: &str, ymm: &str) -> RepairRecord {
        let date = format_date(self.date);
        let completed_date = if self.status == Status::Completed {
            date.clone()
        } else {
            String::new()
        };
        RepairRecord {
            ticket_id,
            unit: unit.to_string(),
            ymm: ymm.to_string(),
            alert: self.alert,
            description: self.description,
            mileage: self.mileage,
            scheduled: self.scheduled.map(format_date).unwrap_or_default(),
            priority: self.priority.as_str().to_string(),
            assigned_to: self.assigned_to,
            status: self.status.as_str().to_string(),
            opened_at: date.clone(),
            date,
            downtime_days: self.downtime_days,
            cost: self.cost,
            completed_date,
            notes: self.notes,
        }
    }
}

/// How a staged grid is written back.
#[derive(Debug, Clone, PartialEq)]
pub enum CommitMode {
    /// Write back every row whose editable fields differ from the store.
    ChangedRows,
    /// Apply grid edits and `bulk` to the rows flagged Select in the grid,
    /// plus `extra` row ids.
    Selection { extra: Vec<usize>, bulk: BulkUpdate },
}

/// The three tables of one session. Every mutation saves the affected
/// table before returning; an in-memory change stays applied even when
/// that save fails.
pub struct Store {
    paths: DataPaths,
    clock: Clock,
    trucks: Vec<Truck>,
    alerts: Vec<AlertType>,
    repairs: Vec<RepairRecord>,
    load_warnings: Vec<StoreError>,
}

impl Store {
    /// Load all three tables. Unreadable files fall back to seed data and
    /// are reported through `load_warnings`. An expired session is refused.
    pub fn open(session: &Session, paths: DataPaths, clock: Clock) -> StoreResult<Self> {
        if session.is_expired() {
            return Err(AuthError::Expired(session.username().to_string()).into());
        }
        let today = clock.today();
        let mut load_warnings = Vec::new();
        let mut take = |loaded: Loaded| {
            if let Some(w) = loaded.warning {
                load_warnings.push(w);
            }
            (loaded.table, loaded.added_columns)
        };

        let truck_seed = table_from_records(&seed::default_trucks());
        let (table, _) = take(load_table(&paths.trucks, Truck::schema(), &truck_seed));
        let trucks: Vec<Truck> = records_from_table(&table);

        let alert_seed = table_from_records(&seed::default_alert_types());
        let (table, _) = take(load_list_table(
            &paths.alerts,
            ALERT_COLUMN,
            ALERT_COLUMN_ALIASES,
            &alert_seed,
        ));
        let alerts: Vec<AlertType> = records_from_table(&table);

        let repair_seed = table_from_records(&seed::sample_repairs(today, &trucks));
        let (table, added) = take(load_table(
            &paths.repairs,
            RepairRecord::schema(),
            &repair_seed,
        ));
        let mut repairs: Vec<RepairRecord> = records_from_table(&table);
        if added.iter().any(|c| c == "Ticket ID") {
            // Files from before ticket ids existed: one ticket per row
            for (i, r) in repairs.iter_mut().enumerate() {
                r.ticket_id = i as i64 + 1;
            }
        }

        info!(
            user = session.username(),
            trucks = trucks.len(),
            alerts = alerts.len(),
            repairs = repairs.len(),
            "store opened"
        );

        Ok(Store {
            paths,
            clock,
            trucks,
            alerts,
            repairs,
            load_warnings,
        })
    }

    pub fn paths(&self) -> &DataPaths {
        &self.paths
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn load_warnings(&self) -> &[StoreError] {
        &self.load_warnings
    }

    pub fn trucks(&self) -> &[Truck] {
        &self.trucks
    }

    pub fn alert_types(&self) -> &[AlertType] {
        &self.alerts
    }

    pub fn repairs(&self) -> &[RepairRecord] {
        &self.repairs
    }

    /// Managed alert names, trimmed, de-duplicated and sorted.
    pub fn alert_options(&self) -> Vec<String> {
        let mut opts: Vec<String> = self
            .alerts
            .iter()
            .map(|a| a.name.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();
        opts.sort();
        opts.dedup();
        opts
    }

    /// Current Truck Type for `unit`, used to snapshot YMM onto tickets.
    pub fn ymm_for_unit(&self, unit: &str) -> Option<&str> {
        self.trucks
            .iter()
            .find(|t| t.number == unit)
            .map(|t| t.truck_type.as_str())
    }

    // Trucks

    pub fn add_truck(
        &mut self,
        number: &str,
        truck_type: &str,
        service_type: &str,
    ) -> StoreResult<SaveReport> {
        let number = number.trim();
        let truck_type = truck_type.trim();
        if number.is_empty() || truck_type.is_empty() {
            return Err(StoreError::Validation(
                "Truck # and YMM are required.".to_string(),
            ));
        }

        self.trucks.push(Truck {
            number: number.to_string(),
            truck_type: truck_type.to_string(),
            service_type: service_type.trim().to_string(),
        });
        self.save(TableKind::Trucks)
    }

    pub fn delete_truck(&mut self, index: usize) -> StoreResult<(Truck, SaveReport)> {
        if index >= self.trucks.len() {
            return Err(StoreError::NotFound(format!("Truck row {}", index)));
        }
        let removed = self.trucks.remove(index);
        let report = self.save(TableKind::Trucks)?;
        Ok((removed, report))
    }

    // Alert types

    pub fn add_alert_type(&mut self, name: &str) -> StoreResult<SaveReport> {
        let value = name.trim();
        if value.is_empty() {
            return Err(StoreError::Validation(
                "Alert Type/Issue is required.".to_string(),
            ));
        }
        if self.alerts.iter().any(|a| a.name.trim() == value) {
            return Err(StoreError::Duplicate(format!("Alert type '{}'", value)));
        }

        self.alerts.push(AlertType {
            name: value.to_string(),
        });
        self.save(TableKind::Alerts)
    }

    pub fn delete_alert_type(
        &mut self,
        selector: AlertSelector<'_>,
    ) -> StoreResult<(AlertType, SaveReport)> {
        let index = match selector {
            AlertSelector::Name(name) => self
                .alerts
                .iter()
                .position(|a| a.name == name.trim())
                .ok_or_else(|| StoreError::NotFound(format!("Alert type '{}'", name.trim())))?,
            AlertSelector::Index(i) if i < self.alerts.len() => i,
            AlertSelector::Index(i) => {
                return Err(StoreError::NotFound(format!("Alert type row {}", i)))
            }
        };
        let removed = self.alerts.remove(index);
        let report = self.save(TableKind::Alerts)?;
        Ok((removed, report))
    }

    // Repairs

    pub fn next_ticket_id(&self) -> i64 {
        self.repairs
            .iter()
            .map(|r| r.ticket_id)
            .max()
            .map_or(1, |max| max + 1)
    }

    /// Append one record per line, all under `ticket_id`. Nothing is
    /// written unless every line is valid.
    pub fn add_repair_batch(
        &mut self,
        ticket_id: i64,
        unit: &str,
        ymm_snapshot: &str,
        lines: Vec<RepairLine>,
    ) -> StoreResult<SaveReport> {
        let unit = unit.trim();
        if unit.is_empty() {
            return Err(StoreError::Validation(
                "Unit # and Description are required.".to_string(),
            ));
        }
        if lines.is_empty() {
            return Err(StoreError::Validation(
                "A ticket needs at least one alert line.".to_string(),
            ));
        }
        for line in &lines {
            line.validate()?;
        }

        let ymm = ymm_snapshot.trim();
        self.repairs.extend(
            lines
                .into_iter()
                .map(|line| line.into_record(ticket_id, unit, ymm)),
        );
        self.save(TableKind::Repairs)
    }

    /// Allocate the next ticket id and snapshot the unit's YMM. Units
    /// missing from the truck table are accepted with a blank YMM.
    pub fn add_ticket(
        &mut self,
        unit: &str,
        lines: Vec<RepairLine>,
    ) -> StoreResult<(i64, SaveReport)> {
        let ticket_id = self.next_ticket_id();
        let ymm = self.ymm_for_unit(unit.trim()).unwrap_or_default().to_string();
        if ymm.is_empty() {
            warn!(unit = unit.trim(), "unit not in truck table; YMM left blank");
        }
        let report = self.add_repair_batch(ticket_id, unit, &ymm, lines)?;
        Ok((ticket_id, report))
    }

    /// Row ids of the records on `ticket_id` whose alert is `alert`.
    pub fn find_rows(&self, ticket_id: i64, alert: &str) -> Vec<usize> {
        self.repairs
            .iter()
            .enumerate()
            .filter(|(_, r)| r.ticket_id == ticket_id && r.alert == alert)
            .map(|(i, _)| i)
            .collect()
    }

    /// Edit the row addressed by (Ticket ID, Alert Type/Issue). When two
    /// rows of a ticket share the alert, the key is ambiguous and nothing
    /// changes; use `apply_row_edit` with one of the reported row ids.
    pub fn apply_edit(
        &mut self,
        ticket_id: i64,
        alert_key: &str,
        update: &RecordUpdate,
    ) -> StoreResult<SaveReport> {
        let rows = self.find_rows(ticket_id, alert_key);
        match rows.as_slice() {
            [] => Err(StoreError::NotFound(format!(
                "Ticket #{} with alert '{}'",
                ticket_id, alert_key
            ))),
            [row] => self.apply_row_edit(*row, update),
            _ => Err(StoreError::Ambiguous {
                ticket_id,
                alert: alert_key.to_string(),
                rows,
            }),
        }
    }

    pub fn apply_row_edit(&mut self, row_id: usize, update: &RecordUpdate) -> StoreResult<SaveReport> {
        update.validate()?;
        let today = self.today();
        let record = self
            .repairs
            .get_mut(row_id)
            .ok_or_else(|| StoreError::NotFound(format!("Row {}", row_id)))?;
        update.apply_to(record);
        record.recompute_completed_date(today);
        self.save(TableKind::Repairs)
    }

    /// Apply per-row edits then bulk overrides to every selected row, and
    /// save once. Nothing changes if any row id is unknown.
    pub fn apply_bulk_edit(
        &mut self,
        row_edits: &BTreeMap<usize, RecordUpdate>,
        selection: &[usize],
        bulk: &BulkUpdate,
    ) -> StoreResult<SaveReport> {
        if selection.is_empty() {
            return Err(StoreError::Validation(
                "Select one or more rows first.".to_string(),
            ));
        }
        self.check_rows(selection)?;
        for edit in row_edits.values() {
            edit.validate()?;
        }
        bulk.validate()?;

        let today = self.today();
        for &row_id in selection {
            bulk::apply_to_record(
                &mut self.repairs[row_id],
                row_edits.get(&row_id),
                bulk,
                today,
            );
        }
        info!(rows = selection.len(), "bulk update applied");
        self.save(TableKind::Repairs)
    }

    /// Write a staged edit grid back. Returns the ids of the rows written,
    /// or `None` as the report when nothing differed.
    pub fn commit_grid(
        &mut self,
        grid: &EditGrid,
        mode: CommitMode,
    ) -> StoreResult<(Vec<usize>, Option<SaveReport>)> {
        let row_edits = grid.row_edits(&self.repairs)?;
        let selection: Vec<usize> = match &mode {
            CommitMode::ChangedRows => row_edits.keys().copied().collect(),
            CommitMode::Selection { extra, .. } => {
                let mut ids = grid.selected();
                ids.extend(extra.iter().copied());
                ids.sort_unstable();
                ids.dedup();
                ids
            }
        };

        match mode {
            CommitMode::ChangedRows if selection.is_empty() => Ok((selection, None)),
            CommitMode::ChangedRows => {
                let report = self.apply_bulk_edit(&row_edits, &selection, &BulkUpdate::default())?;
                Ok((selection, Some(report)))
            }
            CommitMode::Selection { bulk, .. } => {
                let report = self.apply_bulk_edit(&row_edits, &selection, &bulk)?;
                Ok((selection, Some(report)))
            }
        }
    }

    pub fn delete_repairs(&mut self, row_ids: &[usize]) -> StoreResult<(usize, SaveReport)> {
        if row_ids.is_empty() {
            return Err(StoreError::Validation(
                "Select one or more rows first.".to_string(),
            ));
        }
        self.check_rows(row_ids)?;

        let mut ids = row_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();
        for &id in ids.iter().rev() {
            self.repairs.remove(id);
        }
        let report = self.save(TableKind::Repairs)?;
        Ok((ids.len(), report))
    }

    fn check_rows(&self, row_ids: &[usize]) -> StoreResult<()> {
        match row_ids.iter().find(|&&id| id >= self.repairs.len()) {
            Some(id) => Err(StoreError::NotFound(format!("Row {}", id))),
            None => Ok(()),
        }
    }

    // Persistence

    /// The table as CSV bytes, identical to what a save writes.
    pub fn export(&self, kind: TableKind) -> StoreResult<Vec<u8>> {
        let table = match kind {
            TableKind::Repairs => table_from_records(&self.repairs),
            TableKind::Trucks => table_from_records(&self.trucks),
            TableKind::Alerts => table_from_records(&self.alerts),
        };
        table.to_csv_bytes().map_err(|e| StoreError::Save {
            path: self.path_of(kind).to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn path_of(&self, kind: TableKind) -> &Path {
        match kind {
            TableKind::Repairs => &self.paths.repairs,
            TableKind::Trucks => &self.paths.trucks,
            TableKind::Alerts => &self.paths.alerts,
        }
    }

    pub fn save(&self, kind: TableKind) -> StoreResult<SaveReport> {
        let table = match kind {
            TableKind::Repairs => table_from_records(&self.repairs),
            TableKind::Trucks => table_from_records(&self.trucks),
            TableKind::Alerts => table_from_records(&self.alerts),
        };
        save_table(self.path_of(kind), &table, &self.paths.backups, self.today())
    }
}
