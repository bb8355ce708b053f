use anyhow::{bail, Context, Result};

use repair_tracker::store::Store;
use repair_tracker::trend::{self, IssueCount, TrendReport};

use super::truncate;

fn report_for(store: &Store, unit: &str, top: usize, recent: usize) -> Result<TrendReport> {
    match TrendReport::for_unit(store.repairs(), unit, store.today(), top, recent) {
        Some(report) => Ok(report),
        None => bail!("No records for unit {}", unit),
    }
}

fn print_counts(title: &str, counts: &[IssueCount]) {
    println!("\n{}:", title);
    if counts.is_empty() {
        println!("  -");
    }
    for c in counts {
        println!("  {:<30} {}", truncate(&c.label, 30), c.count);
    }
}

pub fn run(store: &Store, unit: &str, top: usize, recent: usize) -> Result<()> {
    let report = report_for(store, unit, top, recent)?;

    println!("Unit {}", report.unit);
    if !report.ymm.is_empty() {
        println!("YMM: {}", report.ymm);
    }
    println!("Total repairs: {}", report.total_records);
    println!(
        "Repairs (last {}d): {}",
        trend::TRAILING_WINDOW_DAYS,
        report.last_90_days
    );
    println!("Total cost: ${:.2}", report.total_cost);
    println!("Downtime (days): {}", report.total_downtime_days);
    match (report.ymm_year, report.truck_age) {
        (Some(year), Some(age)) => println!("YMM year / age: {} / {}", year, age),
        _ => println!("YMM year / age: - / -"),
    }

    print_counts("Top issues", &report.top_issues);
    print_counts("Assignments", &report.assignments);

    println!("\nMonthly:");
    if report.monthly.is_empty() {
        println!("  -");
    }
    for m in &report.monthly {
        println!("  {}  cost ${:>10.2}  downtime {:>3}d", m.month, m.cost, m.downtime_days);
    }

    println!("\nMost recent {}:", report.recent.len());
    for r in &report.recent {
        println!(
            "  #{:<5} {:<10} {:<10} {:<24} {}",
            r.ticket_id,
            r.date,
            r.status,
            truncate(&r.alert, 24),
            truncate(&r.description, 40)
        );
    }
    Ok(())
}

pub fn run_json(store: &Store, unit: &str, top: usize, recent: usize) -> Result<()> {
    let report = report_for(store, unit, top, recent)?;
    let json = serde_json::to_string_pretty(&report).context("Failed to serialize trend report")?;
    println!("{}", json);
    Ok(())
}

pub fn list_units(store: &Store) -> Result<()> {
    let units = trend::units(store.repairs());
    if units.is_empty() {
        println!("No repair data yet.");
        return Ok(());
    }
    println!("Units with repairs:");
    for unit in units {
        println!("  {}", unit);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::setup_test_store;

    #[test]
    fn test_trend_for_unit() {
        let (store, _dir) = setup_test_store();
        assert!(run(&store, "FB-10", 10, 10).is_ok());
        assert!(run_json(&store, "FB-11", 5, 5).is_ok());
    }

    #[test]
    fn test_trend_unknown_unit() {
        let (store, _dir) = setup_test_store();
        let err = run(&store, "ZZ-1", 10, 10).unwrap_err();
        assert!(err.to_string().contains("No records"));
    }

    #[test]
    fn test_trend_report_uses_store_today() {
        let (store, _dir) = setup_test_store();
        let report = report_for(&store, "FB-10", 10, 10).unwrap();
        assert_eq!(report.last_90_days, 1);
        assert_eq!(report.truck_age, Some(2));
    }

    #[test]
    fn test_list_units() {
        let (store, _dir) = setup_test_store();
        assert!(list_units(&store).is_ok());
    }
}
