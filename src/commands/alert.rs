use anyhow::{bail, Result};

use repair_tracker::store::{AlertSelector, Store};

use super::report_save;

pub fn list(store: &Store) -> Result<()> {
    let alerts = store.alert_types();
    if alerts.is_empty() {
        println!("No alert types.");
        return Ok(());
    }
    for (i, a) in alerts.iter().enumerate() {
        println!("{:<4} {}", i, a.name);
    }
    Ok(())
}

pub fn add(store: &mut Store, name: &str) -> Result<()> {
    let report = store.add_alert_type(name)?;
    report_save(&report);
    println!("Added alert type '{}'", name.trim());
    Ok(())
}

pub fn delete(store: &mut Store, name: Option<&str>, index: Option<usize>) -> Result<()> {
    let selector = match (name, index) {
        (_, Some(i)) => AlertSelector::Index(i),
        (Some(name), None) => AlertSelector::Name(name),
        (None, None) => bail!("Give an alert type or --index"),
    };
    let (removed, report) = store.delete_alert_type(selector)?;
    report_save(&report);
    println!("Deleted alert type '{}'", removed.name);
    Ok(())
}
