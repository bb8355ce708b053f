#![no_main]

//! Fuzz target for sequences of store mutations.
//!
//! After every operation, whether it succeeded or not, Completed Date must
//! be set exactly on Completed rows and ticket ids must stay positive.

use arbitrary::Arbitrary;
use chrono::NaiveDate;
use libfuzzer_sys::fuzz_target;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tempfile::tempdir;

use repair_tracker::auth::AuthGate;
use repair_tracker::bulk::{BulkUpdate, NotesMode, RecordUpdate};
use repair_tracker::config::{AuthSettings, CookieSettings, DataPaths, UserEntry};
use repair_tracker::models::Status;
use repair_tracker::store::{Clock, RepairLine, Store};

#[derive(Arbitrary, Debug)]
enum Op {
    AddTicket { unit: String, alerts: Vec<String>, completed: bool },
    EditRow { row: u8, status: u8, notes: Option<String> },
    Bulk { rows: Vec<u8>, status: u8, notes: Option<String>, replace: bool },
    Delete { rows: Vec<u8> },
}

fn status(n: u8) -> Option<Status> {
    Status::ALL.get(n as usize % 4).copied()
}

fn password_hash() -> &'static str {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| bcrypt::hash("fuzz", 4).unwrap_or_default())
}

fn settings() -> AuthSettings {
    let mut users = BTreeMap::new();
    users.insert(
        "fuzz".to_string(),
        UserEntry {
            name: "Fuzz".to_string(),
            password: password_hash().to_string(),
            email: None,
        },
    );
    AuthSettings {
        cookie: CookieSettings {
            name: "fuzz".to_string(),
            expiry_days: 1,
        },
        users,
    }
}

fuzz_target!(|ops: Vec<Op>| {
    let dir = match tempdir() {
        Ok(d) => d,
        Err(_) => return,
    };
    let session = match AuthGate::new(settings()).login("fuzz", "fuzz") {
        Ok(s) => s,
        Err(_) => return,
    };
    let today = match NaiveDate::from_ymd_opt(2025, 6, 10) {
        Some(d) => d,
        None => return,
    };
    let mut store = match Store::open(&session, DataPaths::new(dir.path()), Clock::Fixed(today)) {
        Ok(s) => s,
        Err(_) => return,
    };

    for op in ops.into_iter().take(32) {
        match op {
            Op::AddTicket { unit, alerts, completed } => {
                let lines = alerts
                    .iter()
                    .take(4)
                    .map(|a| RepairLine {
                        status: if completed { Status::Completed } else { Status::Open },
                        ..RepairLine::new(a, "fuzz", today)
                    })
                    .collect();
                let _ = store.add_ticket(&unit, lines);
            }
            Op::EditRow { row, status: s, notes } => {
                let update = RecordUpdate {
                    status: status(s),
                    notes,
                    ..Default::default()
                };
                let _ = store.apply_row_edit(row as usize, &update);
            }
            Op::Bulk { rows, status: s, notes, replace } => {
                let bulk = BulkUpdate {
                    status: status(s),
                    alert: None,
                    notes,
                    notes_mode: if replace { NotesMode::Replace } else { NotesMode::Append },
                };
                let rows: Vec<usize> = rows.into_iter().map(usize::from).collect();
                let _ = store.apply_bulk_edit(&BTreeMap::new(), &rows, &bulk);
            }
            Op::Delete { rows } => {
                let rows: Vec<usize> = rows.into_iter().map(usize::from).collect();
                let _ = store.delete_repairs(&rows);
            }
        }

        for r in store.repairs() {
            assert_eq!(r.is_completed(), !r.completed_date.is_empty());
            assert!(r.ticket_id > 0);
        }
    }
});
