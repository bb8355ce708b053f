use anyhow::{bail, Result};

use repair_tracker::store::{RepairLine, Store};

use super::{parse_date_arg, parse_priority, parse_status, report_save};

/// Everything the user entered for a new ticket.
pub struct TicketArgs {
    pub unit: String,
    pub alerts: Vec<String>,
    pub description: String,
    pub mileage: i64,
    pub date: Option<String>,
    pub scheduled: Option<String>,
    pub priority: String,
    pub assigned: Option<String>,
    pub status: String,
    pub downtime: i64,
    pub cost: f64,
    pub notes: Option<String>,
}

fn build_lines(store: &Store, args: &TicketArgs) -> Result<Vec<RepairLine>> {
    let mut alerts: Vec<String> = Vec::new();
    for alert in &args.alerts {
        let alert = alert.trim();
        if !alert.is_empty() && !alerts.iter().any(|a| a == alert) {
            alerts.push(alert.to_string());
        }
    }
    if alerts.is_empty() {
        bail!("Select at least one alert type/issue.");
    }

    let date = match &args.date {
        Some(d) => parse_date_arg(d)?,
        None => store.today(),
    };
    let scheduled = args.scheduled.as_deref().map(parse_date_arg).transpose()?;
    let priority = parse_priority(&args.priority)?;
    let status = parse_status(&args.status)?;

    let options = store.alert_options();
    Ok(alerts
        .iter()
        .map(|alert| {
            if !options.iter().any(|o| o == alert) {
                eprintln!("Warning: '{}' is not a managed alert type", alert);
            }
            RepairLine {
                mileage: args.mileage,
                scheduled,
                priority,
                assigned_to: args.assigned.clone().unwrap_or_default(),
                status,
                downtime_days: args.downtime,
                cost: args.cost,
                notes: args.notes.clone().unwrap_or_default(),
                ..RepairLine::new(alert, &args.description, date)
            }
        })
        .collect())
}

pub fn run(store: &mut Store, args: TicketArgs) -> Result<()> {
    let lines = build_lines(store, &args)?;
    let count = lines.len();
    let (ticket_id, report) = store.add_ticket(&args.unit, lines)?;
    report_save(&report);

    println!(
        "Created ticket #{} for {} with {} alert line(s)",
        ticket_id,
        args.unit.trim(),
        count
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::setup_test_store;

    fn args(unit: &str, alerts: &[&str]) -> TicketArgs {
        TicketArgs {
            unit: unit.to_string(),
            alerts: alerts.iter().map(|a| a.to_string()).collect(),
            description: "Air leak at rear".to_string(),
            mileage: 120_500,
            date: None,
            scheduled: None,
            priority: "2".to_string(),
            assigned: Some("Rigo".to_string()),
            status: "Open".to_string(),
            downtime: 1,
            cost: 0.0,
            notes: None,
        }
    }

    // ==================== Unit Tests ====================

    #[test]
    fn test_add_one_row_per_alert() {
        let (mut store, _dir) = setup_test_store();
        run(&mut store, args("S1", &["Brakes", "Air Hose"])).unwrap();

        let new: Vec<_> = store.repairs().iter().filter(|r| r.ticket_id == 3).collect();
        assert_eq!(new.len(), 2);
        assert_eq!(new[0].alert, "Brakes");
        assert_eq!(new[1].alert, "Air Hose");
        assert_eq!(new[0].ymm, "2022 FORD F150- SERVICE TRUCK");
        assert_eq!(new[0].priority, "Tier 2 (High)");
        assert_eq!(new[0].date, "06/10/2025");
    }

    #[test]
    fn test_add_dedupes_alerts() {
        let (mut store, _dir) = setup_test_store();
        run(&mut store, args("S1", &["Brakes", " Brakes "])).unwrap();
        assert_eq!(store.repairs().iter().filter(|r| r.ticket_id == 3).count(), 1);
    }

    #[test]
    fn test_add_requires_alert() {
        let (mut store, _dir) = setup_test_store();
        assert!(run(&mut store, args("S1", &["  "])).is_err());
        assert_eq!(store.repairs().len(), 2);
    }

    #[test]
    fn test_add_rejects_bad_date() {
        let (mut store, _dir) = setup_test_store();
        let mut a = args("S1", &["Brakes"]);
        a.date = Some("yesterday".to_string());
        assert!(run(&mut store, a).is_err());
    }

    #[test]
    fn test_add_completed_sets_completed_date() {
        let (mut store, _dir) = setup_test_store();
        let mut a = args("S2", &["Tires"]);
        a.status = "completed".to_string();
        a.date = Some("06/01/2025".to_string());
        run(&mut store, a).unwrap();
        let r = store.repairs().last().unwrap();
        assert_eq!(r.status, "Completed");
        assert_eq!(r.completed_date, "06/01/2025");
    }

    #[test]
    fn test_add_blank_unit_fails() {
        let (mut store, _dir) = setup_test_store();
        assert!(run(&mut store, args("  ", &["Brakes"])).is_err());
    }
}
