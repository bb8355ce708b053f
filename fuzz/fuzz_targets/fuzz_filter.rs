#![no_main]

//! Fuzz target for the repair filter and the summary/trend rollups.
//!
//! Records and criteria carry arbitrary Unicode. Filtering must agree with
//! `matches`, composition must narrow, and the rollups must not panic on
//! garbage dates or extreme amounts.

use arbitrary::Arbitrary;
use chrono::NaiveDate;
use libfuzzer_sys::fuzz_target;

use repair_tracker::models::RepairRecord;
use repair_tracker::query::{Facets, RepairFilter, Summary};
use repair_tracker::trend::{units, TrendReport};

#[derive(Arbitrary, Debug)]
struct FuzzRecord {
    ticket_id: i8,
    unit: String,
    alert: String,
    description: String,
    date: String,
    status: String,
    assigned_to: String,
    notes: String,
    downtime_days: u16,
    cost: u32,
}

#[derive(Arbitrary, Debug)]
struct FilterInput {
    records: Vec<FuzzRecord>,
    statuses: Vec<String>,
    units: Vec<String>,
    text: Option<String>,
}

fuzz_target!(|input: FilterInput| {
    let records: Vec<RepairRecord> = input
        .records
        .into_iter()
        .take(64)
        .map(|r| RepairRecord {
            ticket_id: r.ticket_id as i64,
            unit: r.unit,
            ymm: String::new(),
            alert: r.alert,
            description: r.description,
            mileage: 0,
            date: r.date,
            scheduled: String::new(),
            priority: String::new(),
            assigned_to: r.assigned_to,
            status: r.status,
            opened_at: String::new(),
            downtime_days: r.downtime_days as i64,
            cost: r.cost as f64 / 100.0,
            completed_date: String::new(),
            notes: r.notes,
        })
        .collect();

    let filter = RepairFilter {
        statuses: input.statuses.into_iter().collect(),
        units: input.units.into_iter().collect(),
        text: input.text,
        ..Default::default()
    };

    let matched = filter.apply(&records);
    assert_eq!(
        matched.len(),
        records.iter().filter(|r| filter.matches(r)).count()
    );

    let by_status = RepairFilter {
        statuses: filter.statuses.clone(),
        ..Default::default()
    };
    assert!(matched.len() <= by_status.apply(&records).len());

    let summary = Summary::of(&matched);
    assert_eq!(summary.repairs, matched.len());
    assert!(summary.downtime_days >= 0);

    let _ = Facets::from_records(&records);

    if let Some(today) = NaiveDate::from_ymd_opt(2025, 6, 10) {
        for unit in units(&records) {
            if let Some(report) = TrendReport::for_unit(&records, &unit, today, 5, 5) {
                assert!(report.recent.len() <= 5);
                assert!(report.last_90_days <= report.total_records);
            }
        }
    }
});
