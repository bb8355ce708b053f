use anyhow::{bail, Result};
use std::collections::BTreeMap;

use repair_tracker::bulk::BulkUpdate;
use repair_tracker::store::Store;

use super::report_save;

/// Row ids named directly plus every row of the named tickets, sorted and
/// de-duplicated.
pub fn select_rows(store: &Store, rows: &[usize], tickets: &[i64]) -> Result<Vec<usize>> {
    let mut selection: Vec<usize> = rows.to_vec();
    for &ticket in tickets {
        let before = selection.len();
        selection.extend(
            store
                .repairs()
                .iter()
                .enumerate()
                .filter(|(_, r)| r.ticket_id == ticket)
                .map(|(i, _)| i),
        );
        if selection.len() == before {
            bail!("Ticket #{} not found", ticket);
        }
    }
    selection.sort_unstable();
    selection.dedup();
    Ok(selection)
}

pub fn run(store: &mut Store, rows: &[usize], tickets: &[i64], bulk: &BulkUpdate) -> Result<()> {
    if bulk.is_empty() {
        bail!("Nothing to apply. Pass --set-status, --set-alert or --notes.");
    }
    let selection = select_rows(store, rows, tickets)?;
    if selection.is_empty() {
        bail!("Select one or more rows first (--row or --ticket).");
    }

    let report = store.apply_bulk_edit(&BTreeMap::new(), &selection, bulk)?;
    report_save(&report);
    println!("Updated {} row(s)", selection.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::setup_test_store;
    use repair_tracker::bulk::NotesMode;
    use repair_tracker::models::Status;
    use repair_tracker::store::RepairLine;

    fn completed() -> BulkUpdate {
        BulkUpdate {
            status: Some(Status::Completed),
            ..Default::default()
        }
    }

    // ==================== Unit Tests ====================

    #[test]
    fn test_bulk_by_rows() {
        let (mut store, _dir) = setup_test_store();
        run(&mut store, &[0, 1], &[], &completed()).unwrap();
        assert!(store.repairs().iter().all(|r| r.status == "Completed"));
        assert!(store.repairs().iter().all(|r| r.completed_date == "06/10/2025"));
    }

    #[test]
    fn test_bulk_by_ticket_selects_all_rows() {
        let (mut store, _dir) = setup_test_store();
        let date = store.today();
        let lines = vec![
            RepairLine::new("Brakes", "pads", date),
            RepairLine::new("Tires", "rotate", date),
        ];
        let (ticket, _) = store.add_ticket("S1", lines).unwrap();

        let bulk = BulkUpdate {
            notes: Some("parts ordered".to_string()),
            notes_mode: NotesMode::Append,
            ..Default::default()
        };
        run(&mut store, &[], &[ticket], &bulk).unwrap();
        let notes: Vec<&str> = store
            .repairs()
            .iter()
            .filter(|r| r.ticket_id == ticket)
            .map(|r| r.notes.as_str())
            .collect();
        assert_eq!(notes, vec!["parts ordered", "parts ordered"]);
        assert_eq!(store.repairs()[0].notes, "");
    }

    #[test]
    fn test_select_rows_dedupes() {
        let (store, _dir) = setup_test_store();
        assert_eq!(select_rows(&store, &[1, 0], &[2]).unwrap(), vec![0, 1]);
    }

    #[test]
    fn test_bulk_unknown_ticket() {
        let (mut store, _dir) = setup_test_store();
        assert!(run(&mut store, &[], &[77], &completed()).is_err());
    }

    #[test]
    fn test_bulk_requires_selection() {
        let (mut store, _dir) = setup_test_store();
        assert!(run(&mut store, &[], &[], &completed()).is_err());
    }

    #[test]
    fn test_bulk_requires_change() {
        let (mut store, _dir) = setup_test_store();
        assert!(run(&mut store, &[0], &[], &BulkUpdate::default()).is_err());
    }
}
