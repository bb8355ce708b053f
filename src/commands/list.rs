use anyhow::{Context, Result};
use serde::Serialize;

use repair_tracker::models::RepairRecord;
use repair_tracker::query::{Facets, RepairFilter, Summary};
use repair_tracker::store::Store;

use super::{parse_priority, parse_status, truncate};

/// Rewrite status and priority criteria to their stored spelling, so
/// `-s open` or `-p 2` match what the table holds.
pub fn canonical_filter(mut filter: RepairFilter) -> Result<RepairFilter> {
    filter.statuses = filter
        .statuses
        .iter()
        .map(|s| parse_status(s).map(|s| s.as_str().to_string()))
        .collect::<Result<_>>()?;
    filter.priorities = filter
        .priorities
        .iter()
        .map(|p| parse_priority(p).map(|t| t.as_str().to_string()))
        .collect::<Result<_>>()?;
    Ok(filter)
}

pub fn run(store: &Store, filter: &RepairFilter, show_facets: bool) -> Result<()> {
    let rows = filter.apply_indexed(store.repairs());

    if show_facets {
        print_facets(&Facets::from_records(store.repairs()));
    }

    if rows.is_empty() {
        println!("No repairs found.");
        return Ok(());
    }

    println!(
        "{:<5} {:<7} {:<7} {:<24} {:<10} {:<22} {:<12} {}",
        "Row", "Ticket", "Unit", "Alert", "Status", "Priority", "Assigned", "Date"
    );
    for (row_id, r) in &rows {
        println!(
            "{:<5} #{:<6} {:<7} {:<24} {:<10} {:<22} {:<12} {}",
            row_id,
            r.ticket_id,
            truncate(&r.unit, 7),
            truncate(&r.alert, 24),
            r.status,
            truncate(&r.priority, 22),
            truncate(&r.assigned_to, 12),
            r.date
        );
    }

    let records: Vec<&RepairRecord> = rows.iter().map(|(_, r)| *r).collect();
    let summary = Summary::of(&records);
    println!(
        "\n{} repairs, {} downtime days, ${:.2} total cost",
        summary.repairs, summary.downtime_days, summary.cost
    );

    Ok(())
}

fn print_facets(facets: &Facets) {
    let line = |label: &str, values: &[String]| {
        if values.is_empty() {
            println!("{}: (none)", label);
        } else {
            println!("{}: {}", label, values.join(", "));
        }
    };
    line("Status", &facets.statuses);
    line("Assigned to", &facets.assigned);
    line("Priority", &facets.priorities);
    line("Unit #", &facets.units);
    line("YMM", &facets.ymms);
    println!();
}

#[derive(Serialize)]
struct ListedRepair<'a> {
    row_id: usize,
    #[serde(flatten)]
    record: &'a RepairRecord,
}

#[derive(Serialize)]
struct Listing<'a> {
    repairs: Vec<ListedRepair<'a>>,
    summary: Summary,
}

pub fn run_json(store: &Store, filter: &RepairFilter) -> Result<()> {
    let rows = filter.apply_indexed(store.repairs());
    let records: Vec<&RepairRecord> = rows.iter().map(|(_, r)| *r).collect();
    let listing = Listing {
        summary: Summary::of(&records),
        repairs: rows
            .into_iter()
            .map(|(row_id, record)| ListedRepair { row_id, record })
            .collect(),
    };
    let json = serde_json::to_string_pretty(&listing).context("Failed to serialize repairs")?;
    println!("{}", json);
    Ok(())
}
