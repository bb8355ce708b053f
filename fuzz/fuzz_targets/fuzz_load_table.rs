#![no_main]

//! Fuzz target for loading hand-edited or corrupted CSV files.
//!
//! Loading must never panic: bad files fall back to seed data, and any
//! table that does load must come out in schema shape.

use libfuzzer_sys::fuzz_target;
use tempfile::tempdir;

use repair_tracker::models::{records_from_table, RepairRecord, TableRecord};
use repair_tracker::persistence::{load_list_table, load_table, Table};

fuzz_target!(|data: &[u8]| {
    let dir = match tempdir() {
        Ok(d) => d,
        Err(_) => return,
    };
    let path = dir.path().join("repairs_data.csv");
    if std::fs::write(&path, data).is_err() {
        return;
    }

    let schema = RepairRecord::schema();
    let seed = Table::new(schema.headers());
    let loaded = load_table(&path, schema, &seed);

    assert_eq!(loaded.table.headers, schema.headers());
    for row in &loaded.table.rows {
        assert_eq!(row.len(), schema.len());
    }

    let records: Vec<RepairRecord> = records_from_table(&loaded.table);
    assert_eq!(records.len(), loaded.table.len());
    for r in &records {
        let _ = r.parsed_date();
        let _ = r.to_row();
    }

    if let Ok(bytes) = loaded.table.to_csv_bytes() {
        let _ = Table::from_csv_reader(bytes.as_slice());
    }

    let alerts = load_list_table(&path, "Alert Type/Issue", &["Alert Type"], &seed);
    for row in &alerts.table.rows {
        assert!(!row[0].trim().is_empty());
    }
});
