use anyhow::{bail, Result};

use repair_tracker::store::Store;

use super::bulk::select_rows;
use super::{confirm, report_save};

pub fn run(store: &mut Store, rows: &[usize], tickets: &[i64], force: bool) -> Result<()> {
    let selection = select_rows(store, rows, tickets)?;
    if selection.is_empty() {
        bail!("Select one or more rows first (--row or --ticket).");
    }
    if let Some(&missing) = selection.iter().find(|&&id| id >= store.repairs().len()) {
        bail!("Row {} not found", missing);
    }

    if !force {
        for &id in &selection {
            let r = &store.repairs()[id];
            println!("  row {}: ticket #{} {} - {}", id, r.ticket_id, r.unit, r.alert);
        }
        if !confirm(&format!("Delete {} row(s)?", selection.len()))? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let (removed, report) = store.delete_repairs(&selection)?;
    report_save(&report);
    println!("Deleted {} row(s)", removed);
    Ok(())
}

/// Internal function for testing without stdin interaction
#[cfg(test)]
pub fn run_force(store: &mut Store, rows: &[usize], tickets: &[i64]) -> Result<()> {
    run(store, rows, tickets, true)
}
