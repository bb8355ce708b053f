//! First-run data used when a table file doesn't exist yet (or can't be read).

use chrono::NaiveDate;

use crate::models::{format_date, AlertType, PriorityTier, RepairRecord, Status, Truck};

const TRUCKS: &[(&str, &str, &str)] = &[
    ("S1", "2022 FORD F150- SERVICE TRUCK", "SERVICE TRUCKS"),
    ("S2", "2025 FORD F150- SERVICE TRUCK", "SERVICE TRUCKS"),
    ("S3", "2025 FORD F150- SERVICE TRUCK", "SERVICE TRUCKS"),
    ("FB-2", "2023 INTERNATIONAL- FLATBED", "FLATBED"),
    ("FB-3", "2020 FREIGHTLINER- FLATBED", "FLATBED"),
    ("FB-4", "2023 ISUZU NRR- FLATBED", "FLATBED"),
    ("WL-5", "2017 FORD F-450- WHEEL LIFT", "AUTO LOADER"),
    ("FB-6", "2023 PETERBILT 337- FLATBED", "FLATBED"),
    ("FB-7", "2022 HINO L6- FLATBED", "FLATBED"),
    ("FB-8", "2024 FREIGHTLINER M2", "FLATBED"),
    ("FB-9", "2021 FREIGHTLINER M2", "FLATBED"),
    ("FB-10", "2023 HINO L6", "FLATBED"),
    ("FB-11", "2024 HINO L6", "FLATBED"),
    ("MD-15", "2018 INTERNATIONAL FLATBED", "Landoll Tractors/ Medium"),
    ("16", "2016 KENWORTH T680", "TRACTOR"),
    ("17", "2019 INTERNATIONAL LT625", "TRACTOR"),
    ("25", "2016 FREIGHTLINER CASCADIA", "TRACTOR"),
    ("26", "2020 WESTERN STAR", "TRACTOR"),
    ("27", "2016 INTERNATIONAL LF687", "TRACTOR"),
    ("LD1", "2021 LANDOLL 440B", "Landoll Tractors/ Medium"),
    ("LD2", "2015 TRAILEZE", "TRAILER"),
    ("LD3", "2017 TRAILEZE", "TRAILER"),
    ("LD4", "2017 TRAILEZE", "TRAILER"),
    ("LD5", "2017 TRAILEZE", "TRAILER"),
    ("18", "2018 PETERBILT 567", "Heavy Wreckers"),
    ("19", "2024 PETERBUILT 567", "WRECKER"),
    ("21", "2021 PETERBILT 389", "TRACTOR/ WRECKER"),
    ("23", "2023 PETERBILT 389", "WRECKER"),
    ("24", "2023 PETERBILT 389", "WRECKER"),
];

const ALERT_TYPES: &[&str] = &[
    "Oil Change- PM Service",
    "Truck Inspection",
    "Radiator",
    "Electrical",
    "Brakes",
    "Tires",
    "Hydraulic/ PTO",
    "Tool Boxes",
    "Winch Cable",
    "Coolant Hose",
    "Air Hose",
    "Air Bags",
    "Shocks",
    "CARB smog test",
    "Transmission",
    "Steering",
    "Suspension",
    "In-Cab",
    "Misc.",
    "Fuel",
];

pub fn default_trucks() -> Vec<Truck> {
    TRUCKS
        .iter()
        .map(|(number, truck_type, service_type)| Truck {
            number: number.to_string(),
            truck_type: truck_type.to_string(),
            service_type: service_type.to_string(),
        })
        .collect()
}

pub fn default_alert_types() -> Vec<AlertType> {
    ALERT_TYPES
        .iter()
        .map(|name| AlertType {
            name: name.to_string(),
        })
        .collect()
}

/// Two example tickets dated `today`, YMM taken from `trucks`.
pub fn sample_repairs(today: NaiveDate, trucks: &[Truck]) -> Vec<RepairRecord> {
    let today = format_date(today);
    let ymm_of = |unit: &str| {
        trucks
            .iter()
            .find(|t| t.number == unit)
            .map(|t| t.truck_type.clone())
            .unwrap_or_default()
    };

    vec![
        RepairRecord {
            ticket_id: 1,
            unit: "FB-10".to_string(),
            ymm: ymm_of("FB-10"),
            alert: "PM Service".to_string(),
            description: "Oil + filters".to_string(),
            mileage: 31984,
            date: today.clone(),
            scheduled: today.clone(),
            priority: PriorityTier::PreventiveMaintenance.as_str().to_string(),
            assigned_to: "Rigo".to_string(),
            status: Status::Scheduled.as_str().to_string(),
            opened_at: today.clone(),
            downtime_days: 0,
            cost: 0.0,
            completed_date: String::new(),
            notes: String::new(),
        },
        RepairRecord {
            ticket_id: 2,
            unit: "FB-11".to_string(),
            ymm: ymm_of("FB-11"),
            alert: "Water pump".to_string(),
            description: "Replace water pump".to_string(),
            mileage: 32046,
            date: today.clone(),
            scheduled: String::new(),
            priority: PriorityTier::High.as_str().to_string(),
            assigned_to: String::new(),
            status: Status::Open.as_str().to_string(),
            opened_at: today,
            downtime_days: 1,
            cost: 0.0,
            completed_date: String::new(),
            notes: String::new(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_repairs_snapshot_ymm() {
        let today = NaiveDate::from_ymd_opt(2025, 2, 3).unwrap();
        let repairs = sample_repairs(today, &default_trucks());
        assert_eq!(repairs.len(), 2);
        assert_eq!(repairs[0].ymm, "2023 HINO L6");
        assert_eq!(repairs[1].ymm, "2024 HINO L6");
        assert_eq!(repairs[0].date, "02/03/2025");
        assert!(repairs.iter().all(|r| r.completed_date.is_empty()));
    }

    #[test]
    fn test_default_alert_types_are_unique() {
        let alerts = default_alert_types();
        let mut names: Vec<_> = alerts.iter().map(|a| a.name.as_str()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), alerts.len());
    }
}
