use anyhow::{bail, Result};

use repair_tracker::models::RepairRecord;
use repair_tracker::query::ticket_totals;
use repair_tracker::store::Store;

pub fn run(store: &Store, ticket_id: i64) -> Result<()> {
    let rows: Vec<(usize, &RepairRecord)> = store
        .repairs()
        .iter()
        .enumerate()
        .filter(|(_, r)| r.ticket_id == ticket_id)
        .collect();

    let first = match rows.first() {
        Some((_, r)) => *r,
        None => bail!("Ticket #{} not found", ticket_id),
    };

    println!("Ticket #{}: {}", ticket_id, first.unit);
    if !first.ymm.is_empty() {
        println!("YMM: {}", first.ymm);
    }
    println!("Date: {}", first.date);
    if first.mileage > 0 {
        println!("Mileage: {}", first.mileage);
    }

    for (row_id, r) in &rows {
        println!("\n[row {}] {}", row_id, r.alert);
        println!("  Status: {}", r.status);
        println!("  Priority: {}", r.priority);
        if !r.assigned_to.is_empty() {
            println!("  Assigned to: {}", r.assigned_to);
        }
        if !r.scheduled.is_empty() {
            println!("  Scheduled: {}", r.scheduled);
        }
        if !r.completed_date.is_empty() {
            println!("  Completed: {}", r.completed_date);
        }
        if !r.description.is_empty() {
            println!("  Description:");
            for line in r.description.lines() {
                println!("    {}", line);
            }
        }
        if !r.notes.is_empty() {
            println!("  Notes: {}", r.notes);
        }
    }

    let (downtime, cost) = ticket_totals(rows.iter().map(|(_, r)| *r));
    println!("\nDowntime: {} days, Cost: ${:.2}", downtime, cost);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::setup_test_store;

    #[test]
    fn test_show_existing_ticket() {
        let (store, _dir) = setup_test_store();
        assert!(run(&store, 1).is_ok());
    }

    #[test]
    fn test_show_nonexistent_ticket() {
        let (store, _dir) = setup_test_store();
        let err = run(&store, 99).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
