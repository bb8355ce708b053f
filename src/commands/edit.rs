use anyhow::{bail, Result};

use repair_tracker::bulk::RecordUpdate;
use repair_tracker::store::Store;

use super::report_save;

/// Which row an edit addresses.
pub enum Target {
    Row(usize),
    /// Ticket + current alert. The alert may be omitted when the ticket
    /// has a single row.
    Ticket {
        ticket: i64,
        alert_key: Option<String>,
    },
}

pub fn run(store: &mut Store, target: Target, update: &RecordUpdate) -> Result<()> {
    if update.is_empty() {
        bail!("Nothing to update. Pass at least one field to change.");
    }

    let (label, report) = match target {
        Target::Row(row) => (format!("row {}", row), store.apply_row_edit(row, update)?),
        Target::Ticket {
            ticket,
            alert_key: Some(alert),
        } => (
            format!("ticket #{} ({})", ticket, alert),
            store.apply_edit(ticket, &alert, update)?,
        ),
        Target::Ticket {
            ticket,
            alert_key: None,
        } => {
            let rows: Vec<usize> = store
                .repairs()
                .iter()
                .enumerate()
                .filter(|(_, r)| r.ticket_id == ticket)
                .map(|(i, _)| i)
                .collect();
            match rows.as_slice() {
                [] => bail!("Ticket #{} not found", ticket),
                [row] => (format!("ticket #{}", ticket), store.apply_row_edit(*row, update)?),
                _ => {
                    let alerts: Vec<&str> = rows
                        .iter()
                        .map(|&i| store.repairs()[i].alert.as_str())
                        .collect();
                    bail!(
                        "Ticket #{} has {} rows ({}). Pass --alert-key or --row.",
                        ticket,
                        rows.len(),
                        alerts.join(", ")
                    )
                }
            }
        }
    };

    report_save(&report);
    println!("Updated {}", label);
    Ok(())
}
