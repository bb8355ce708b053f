use anyhow::{bail, Result};

use repair_tracker::models::SERVICE_TYPES;
use repair_tracker::store::Store;

use super::{confirm, report_save, truncate};

pub fn list(store: &Store) -> Result<()> {
    let trucks = store.trucks();
    if trucks.is_empty() {
        println!("No trucks.");
        return Ok(());
    }

    println!("{:<5} {:<8} {:<36} {}", "Row", "Truck #", "YMM", "Service Type");
    for (i, t) in trucks.iter().enumerate() {
        println!(
            "{:<5} {:<8} {:<36} {}",
            i,
            t.number,
            truncate(&t.truck_type, 36),
            t.service_type
        );
    }
    Ok(())
}

pub fn add(store: &mut Store, number: &str, ymm: &str, service_type: &str) -> Result<()> {
    let service_type = service_type.trim();
    if !service_type.is_empty() && !SERVICE_TYPES.contains(&service_type) {
        eprintln!(
            "Warning: '{}' is not one of the usual service types ({})",
            service_type,
            SERVICE_TYPES.join(", ")
        );
    }
    if store.trucks().iter().any(|t| t.number == number.trim()) {
        eprintln!("Warning: truck {} is already listed; adding another row", number.trim());
    }

    let report = store.add_truck(number, ymm, service_type)?;
    report_save(&report);
    println!("Added truck {}", number.trim());
    Ok(())
}

pub fn delete(
    store: &mut Store,
    number: Option<&str>,
    index: Option<usize>,
    force: bool,
) -> Result<()> {
    let index = match (number, index) {
        (_, Some(i)) => i,
        (Some(number), None) => {
            let matches: Vec<usize> = store
                .trucks()
                .iter()
                .enumerate()
                .filter(|(_, t)| t.number == number.trim())
                .map(|(i, _)| i)
                .collect();
            match matches.as_slice() {
                [] => bail!("Truck {} not found", number.trim()),
                [i] => *i,
                _ => bail!(
                    "Truck {} is listed {} times; pass --index",
                    number.trim(),
                    matches.len()
                ),
            }
        }
        (None, None) => bail!("Give a truck # or --index"),
    };

    if !force {
        let label = match store.trucks().get(index) {
            Some(t) => format!("{} ({})", t.number, t.truck_type),
            None => bail!("Truck row {} not found", index),
        };
        if !confirm(&format!("Delete truck {}?", label))? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let (removed, report) = store.delete_truck(index)?;
    report_save(&report);
    println!("Deleted truck {}", removed.number);
    Ok(())
}
