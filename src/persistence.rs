//! CSV-backed tables: loading with schema reconciliation, full-overwrite
//! saves and once-per-day backup snapshots.

use std::fs::{self, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::error::{StoreError, StoreResult};

/// Column renamed on load when the canonical name is absent.
const LEGACY_COLUMNS: [(&str, &str); 1] = [("YYMM", "YMM")];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Integer,
    Float,
}

impl ColumnKind {
    /// Value used to fill a column that a stored file is missing.
    pub fn empty_value(self) -> &'static str {
        match self {
            ColumnKind::Text => "",
            ColumnKind::Integer | ColumnKind::Float => "0",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
}

impl Column {
    pub const fn text(name: &'static str) -> Self {
        Column {
            name,
            kind: ColumnKind::Text,
        }
    }

    pub const fn integer(name: &'static str) -> Self {
        Column {
            name,
            kind: ColumnKind::Integer,
        }
    }

    pub const fn float(name: &'static str) -> Self {
        Column {
            name,
            kind: ColumnKind::Float,
        }
    }
}

/// Canonical column order for one table.
#[derive(Debug, Clone, Copy)]
pub struct Schema(pub &'static [Column]);

impl Schema {
    pub fn names(&self) -> Vec<&'static str> {
        self.0.iter().map(|c| c.name).collect()
    }

    pub fn headers(&self) -> Vec<String> {
        self.0.iter().map(|c| c.name.to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A table of text cells, as stored on disk.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Table {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Parse CSV with a header row. Short rows are padded with blanks;
    /// rows longer than the header are rejected.
    pub fn from_csv_reader<R: Read>(rdr: R) -> Result<Table, String> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(rdr);

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| e.to_string())?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        if headers.iter().all(|h| h.is_empty()) {
            return Err("no columns to parse".to_string());
        }

        let mut table = Table::new(headers);
        for (line, record) in reader.records().enumerate() {
            let record = record.map_err(|e| e.to_string())?;
            if record.len() > table.headers.len() {
                return Err(format!(
                    "expected {} fields in record {}, saw {}",
                    table.headers.len(),
                    line + 1,
                    record.len()
                ));
            }
            let mut row: Vec<String> = record.iter().map(str::to_string).collect();
            row.resize(table.headers.len(), String::new());
            table.rows.push(row);
        }
        Ok(table)
    }

    pub fn to_csv_bytes(&self) -> Result<Vec<u8>, csv::Error> {
        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(Vec::new());
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        writer
            .into_inner()
            .map_err(|e| csv::Error::from(e.into_error()))
    }

    fn rename_column(&mut self, from: &str, to: &str) -> bool {
        if self.column(to).is_some() {
            return false;
        }
        match self.column(from) {
            Some(idx) => {
                self.headers[idx] = to.to_string();
                true
            }
            None => false,
        }
    }

    fn add_column(&mut self, name: &str, fill: &str) {
        self.headers.push(name.to_string());
        for row in &mut self.rows {
            row.push(fill.to_string());
        }
    }

    /// Keep only `names`, in that order. Every name must already be present.
    fn project(&self, names: &[&str]) -> Table {
        let indices: Vec<usize> = names
            .iter()
            .filter_map(|name| self.column(name))
            .collect();
        Table {
            headers: indices.iter().map(|&i| self.headers[i].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
                .collect(),
        }
    }
}

/// Result of loading one table. Load problems are never fatal: the seed
/// table is returned and the problem is carried in `warning`.
#[derive(Debug)]
pub struct Loaded {
    pub table: Table,
    /// Schema columns the stored file did not have.
    pub added_columns: Vec<String>,
    pub from_seed: bool,
    pub warning: Option<StoreError>,
}

impl Loaded {
    fn seeded(seed: &Table, warning: Option<StoreError>) -> Self {
        Loaded {
            table: seed.clone(),
            added_columns: Vec::new(),
            from_seed: true,
            warning,
        }
    }
}

pub fn read_table(path: &Path) -> StoreResult<Table> {
    let file = fs::File::open(path).map_err(|e| StoreError::Load {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    Table::from_csv_reader(io::BufReader::new(file)).map_err(|reason| StoreError::Load {
        path: path.to_path_buf(),
        reason,
    })
}

/// Load `path`, reconciling it against `schema`.
///
/// Missing file yields a copy of `seed`. A file that can't be read or
/// parsed also yields `seed`, with the error attached as a warning.
pub fn load_table(path: &Path, schema: Schema, seed: &Table) -> Loaded {
    if !path.exists() {
        return Loaded::seeded(seed, None);
    }

    match read_table(path) {
        Ok(raw) => {
            let (table, added_columns) = reconcile(raw, schema);
            Loaded {
                table,
                added_columns,
                from_seed: false,
                warning: None,
            }
        }
        Err(err) => {
            warn!(error = %err, "falling back to seed table");
            Loaded::seeded(seed, Some(err))
        }
    }
}

/// Apply legacy renames, add missing schema columns and reorder to the
/// schema's order. Columns unknown to the schema are dropped.
pub fn reconcile(mut table: Table, schema: Schema) -> (Table, Vec<String>) {
    for (legacy, canonical) in LEGACY_COLUMNS {
        if table.rename_column(legacy, canonical) {
            info!(from = legacy, to = canonical, "migrated legacy column");
        }
    }

    let mut added = Vec::new();
    for column in schema.0 {
        if table.column(column.name).is_none() {
            table.add_column(column.name, column.kind.empty_value());
            added.push(column.name.to_string());
        }
    }

    (table.project(&schema.names()), added)
}

/// Load a one-column list table. The header may be `column`, any of
/// `aliases`, or anything else; the first column is taken in that last
/// case. Values are trimmed, blanks dropped and duplicates removed.
pub fn load_list_table(path: &Path, column: &str, aliases: &[&str], seed: &Table) -> Loaded {
    if !path.exists() {
        return Loaded::seeded(seed, None);
    }

    let raw = match read_table(path) {
        Ok(raw) => raw,
        Err(err) => {
            warn!(error = %err, "falling back to seed list");
            return Loaded::seeded(seed, Some(err));
        }
    };

    let idx = raw
        .column(column)
        .or_else(|| aliases.iter().find_map(|a| raw.column(a)))
        .unwrap_or(0);

    let mut table = Table::new(vec![column.to_string()]);
    for row in &raw.rows {
        let value = row[idx].trim();
        if value.is_empty() || table.rows.iter().any(|r| r[0] == value) {
            continue;
        }
        table.rows.push(vec![value.to_string()]);
    }

    Loaded {
        table,
        added_columns: Vec::new(),
        from_seed: false,
        warning: None,
    }
}

/// What happened to the daily snapshot during a save.
#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot {
    Created(PathBuf),
    /// Today's snapshot already existed and was left alone.
    AlreadyTaken(PathBuf),
    Failed { path: PathBuf, reason: String },
}

/// A successful primary write. The snapshot outcome is reported
/// separately so callers can tell "saved, backup failed" apart from a
/// failed save (which is an `Err`).
#[derive(Debug, Clone, PartialEq)]
pub struct SaveReport {
    pub path: PathBuf,
    pub rows: usize,
    pub snapshot: Snapshot,
}

impl SaveReport {
    pub fn backup_failed(&self) -> Option<&str> {
        match &self.snapshot {
            Snapshot::Failed { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

pub fn snapshot_path(path: &Path, backups_dir: &Path, today: NaiveDate) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "table".to_string());
    backups_dir.join(format!("{}_{}.csv", stem, today.format("%Y-%m-%d")))
}

/// Overwrite `path` with `table`, then take today's snapshot if none
/// exists yet.
pub fn save_table(
    path: &Path,
    table: &Table,
    backups_dir: &Path,
    today: NaiveDate,
) -> StoreResult<SaveReport> {
    let save_err = |reason: String| StoreError::Save {
        path: path.to_path_buf(),
        reason,
    };

    let bytes = table.to_csv_bytes().map_err(|e| save_err(e.to_string()))?;
    fs::write(path, &bytes).map_err(|e| save_err(e.to_string()))?;
    info!(path = %path.display(), rows = table.len(), "saved table");

    let snapshot = write_snapshot(path, &bytes, backups_dir, today);
    if let Snapshot::Failed { path, reason } = &snapshot {
        warn!(snapshot = %path.display(), %reason, "daily backup failed");
    }

    Ok(SaveReport {
        path: path.to_path_buf(),
        rows: table.len(),
        snapshot,
    })
}

fn write_snapshot(path: &Path, bytes: &[u8], backups_dir: &Path, today: NaiveDate) -> Snapshot {
    let snap = snapshot_path(path, backups_dir, today);
    if snap.exists() {
        return Snapshot::AlreadyTaken(snap);
    }

    if let Err(e) = fs::create_dir_all(backups_dir) {
        return Snapshot::Failed {
            path: snap,
            reason: e.to_string(),
        };
    }

    // create_new: a snapshot, once written, is never overwritten
    let result = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&snap)
        .and_then(|mut file| file.write_all(bytes));

    match result {
        Ok(()) => Snapshot::Created(snap),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Snapshot::AlreadyTaken(snap),
        Err(e) => Snapshot::Failed {
            path: snap,
            reason: e.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::tempdir;

    const TEST_COLUMNS: &[Column] = &[
        Column::integer("Ticket ID"),
        Column::text("Unit #"),
        Column::text("YMM"),
        Column::float("Cost"),
        Column::text("Notes"),
    ];
    const TEST_SCHEMA: Schema = Schema(TEST_COLUMNS);

    fn seed() -> Table {
        Table {
            headers: TEST_SCHEMA.headers(),
            rows: vec![vec![
                "1".to_string(),
                "S1".to_string(),
                "2022 FORD".to_string(),
                "0.0".to_string(),
                String::new(),
            ]],
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // ==================== Loading ====================

    #[test]
    fn test_missing_file_returns_seed() {
        let dir = tempdir().unwrap();
        let loaded = load_table(&dir.path().join("nope.csv"), TEST_SCHEMA, &seed());
        assert!(loaded.from_seed);
        assert!(loaded.warning.is_none());
        assert_eq!(loaded.table, seed());
    }

    #[test]
    fn test_missing_columns_are_added_with_typed_blanks() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("repairs.csv");
        fs::write(&path, "Unit #,YMM\nT1,2020 FORD F150\n").unwrap();

        let loaded = load_table(&path, TEST_SCHEMA, &seed());
        assert!(!loaded.from_seed);
        assert_eq!(loaded.table.headers, TEST_SCHEMA.headers());
        assert_eq!(
            loaded.table.rows[0],
            vec!["0", "T1", "2020 FORD F150", "0", ""]
        );
        assert_eq!(loaded.added_columns, vec!["Ticket ID", "Cost", "Notes"]);
    }

    #[test]
    fn test_legacy_yymm_is_renamed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("repairs.csv");
        fs::write(&path, "Ticket ID,Unit #,YYMM\n3,T1,2019 HINO\n").unwrap();

        let loaded = load_table(&path, TEST_SCHEMA, &seed());
        assert!(loaded.table.column("YYMM").is_none());
        let ymm = loaded.table.column("YMM").unwrap();
        assert_eq!(loaded.table.rows[0][ymm], "2019 HINO");
        assert!(!loaded.added_columns.contains(&"YMM".to_string()));
    }

    #[test]
    fn test_yymm_left_alone_when_ymm_present() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("repairs.csv");
        fs::write(&path, "YYMM,YMM\nold,new\n").unwrap();

        let loaded = load_table(&path, TEST_SCHEMA, &seed());
        let ymm = loaded.table.column("YMM").unwrap();
        assert_eq!(loaded.table.rows[0][ymm], "new");
        assert!(loaded.table.column("YYMM").is_none());
    }

    #[test]
    fn test_columns_reordered_and_unknown_dropped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("repairs.csv");
        fs::write(
            &path,
            "Notes,Extra,Cost,YMM,Unit #,Ticket ID\nn,x,12.5,y,u,7\n",
        )
        .unwrap();

        let loaded = load_table(&path, TEST_SCHEMA, &seed());
        assert_eq!(loaded.table.headers, TEST_SCHEMA.headers());
        assert_eq!(loaded.table.rows[0], vec!["7", "u", "y", "12.5", "n"]);
    }

    #[test]
    fn test_unparseable_file_falls_back_with_warning() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("repairs.csv");
        fs::write(&path, "Unit #,YMM\nT1,a,b,c\n").unwrap();

        let loaded = load_table(&path, TEST_SCHEMA, &seed());
        assert!(loaded.from_seed);
        assert!(matches!(loaded.warning, Some(StoreError::Load { .. })));
        assert_eq!(loaded.table, seed());
    }

    #[test]
    fn test_empty_file_falls_back_with_warning() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("repairs.csv");
        fs::write(&path, "").unwrap();

        let loaded = load_table(&path, TEST_SCHEMA, &seed());
        assert!(loaded.from_seed);
        assert!(loaded.warning.is_some());
    }

    #[test]
    fn test_short_rows_are_padded() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("repairs.csv");
        fs::write(&path, "Ticket ID,Unit #,YMM,Cost,Notes\n1,T1\n").unwrap();

        let loaded = load_table(&path, TEST_SCHEMA, &seed());
        assert_eq!(loaded.table.rows[0], vec!["1", "T1", "", "", ""]);
    }

    #[test]
    fn test_list_table_accepts_alias_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("alerts.csv");
        fs::write(&path, "Alert Type\nBrakes\n Tires \nBrakes\n\n").unwrap();
        let seed = Table::new(vec!["Alert Type/Issue".to_string()]);

        let loaded = load_list_table(&path, "Alert Type/Issue", &["Alert Type"], &seed);
        assert_eq!(loaded.table.headers, vec!["Alert Type/Issue"]);
        assert_eq!(
            loaded.table.rows,
            vec![vec!["Brakes".to_string()], vec!["Tires".to_string()]]
        );
    }

    #[test]
    fn test_list_table_takes_first_unknown_column() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("alerts.csv");
        fs::write(&path, "Issue,Other\nFuel,x\n").unwrap();
        let seed = Table::new(vec!["Alert Type/Issue".to_string()]);

        let loaded = load_list_table(&path, "Alert Type/Issue", &["Alert Type"], &seed);
        assert_eq!(loaded.table.rows, vec![vec!["Fuel".to_string()]]);
    }

    // ==================== Saving ====================

    #[test]
    fn test_save_overwrites_and_snapshots_once_per_day() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("repairs_data.csv");
        let backups = dir.path().join("Backups");
        let mut table = seed();

        let first = save_table(&path, &table, &backups, day(2025, 3, 1)).unwrap();
        let snap = backups.join("repairs_data_2025-03-01.csv");
        assert_eq!(first.snapshot, Snapshot::Created(snap.clone()));

        table.rows[0][1] = "S2".to_string();
        let second = save_table(&path, &table, &backups, day(2025, 3, 1)).unwrap();
        assert_eq!(second.snapshot, Snapshot::AlreadyTaken(snap.clone()));

        // Primary reflects the latest save, snapshot keeps the first one
        assert!(fs::read_to_string(&path).unwrap().contains("S2"));
        assert!(fs::read_to_string(&snap).unwrap().contains("S1"));
        assert_eq!(fs::read_dir(&backups).unwrap().count(), 1);

        let third = save_table(&path, &table, &backups, day(2025, 3, 2)).unwrap();
        assert_eq!(
            third.snapshot,
            Snapshot::Created(backups.join("repairs_data_2025-03-02.csv"))
        );
        assert_eq!(fs::read_dir(&backups).unwrap().count(), 2);
    }

    #[test]
    fn test_snapshot_failure_does_not_fail_save() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("trucks_data.csv");
        // A regular file where the backups directory should be
        let backups = dir.path().join("Backups");
        fs::write(&backups, "not a dir").unwrap();

        let report = save_table(&path, &seed(), &backups, day(2025, 1, 1)).unwrap();
        assert!(report.backup_failed().is_some());
        assert!(path.exists());
    }

    #[test]
    fn test_primary_write_failure_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("repairs.csv");
        let result = save_table(&path, &seed(), &dir.path().join("Backups"), day(2025, 1, 1));
        assert!(matches!(result, Err(StoreError::Save { .. })));
    }

    #[test]
    fn test_saved_file_loads_back_identically() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("repairs.csv");
        let mut table = seed();
        table.rows.push(vec![
            "2".to_string(),
            "FB-10".to_string(),
            "2023 HINO, \"L6\"".to_string(),
            "125.5".to_string(),
            "line one\nline two".to_string(),
        ]);

        save_table(&path, &table, &dir.path().join("Backups"), day(2025, 1, 1)).unwrap();
        let loaded = load_table(&path, TEST_SCHEMA, &Table::default());
        assert_eq!(loaded.table, table);
    }

    #[test]
    fn test_csv_bytes_use_plain_newlines() {
        let bytes = seed().to_csv_bytes().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("Ticket ID,Unit #,YMM,Cost,Notes\n"));
        assert!(!text.contains('\r'));
    }

    proptest! {
        #[test]
        fn prop_reconcile_always_yields_schema_headers(
            present in proptest::sample::subsequence(
                vec!["Ticket ID", "Unit #", "YYMM", "Cost", "Notes", "Junk"], 0..6
            )
        ) {
            let mut table = Table::new(present.iter().map(|s| s.to_string()).collect());
            table.rows.push(present.iter().map(|s| format!("v-{}", s)).collect());

            let (out, _) = reconcile(table, TEST_SCHEMA);
            prop_assert_eq!(out.headers, TEST_SCHEMA.headers());
            prop_assert!(out.rows.iter().all(|r| r.len() == TEST_SCHEMA.len()));
        }

        #[test]
        fn prop_parse_never_panics(input in "[a-zA-Z0-9,\"\n ]{0,200}") {
            let _ = Table::from_csv_reader(input.as_bytes());
        }
    }
}
