use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::models::RepairRecord;

/// Conjunctive filter over repair records. An empty set skips its
/// criterion; the text search narrows whatever the sets selected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepairFilter {
    pub statuses: BTreeSet<String>,
    pub assigned: BTreeSet<String>,
    pub priorities: BTreeSet<String>,
    pub units: BTreeSet<String>,
    pub ymms: BTreeSet<String>,
    /// Case-insensitive substring over Description, Notes and Alert.
    pub text: Option<String>,
}

fn passes(set: &BTreeSet<String>, value: &str) -> bool {
    set.is_empty() || set.contains(value)
}

impl RepairFilter {
    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
            && self.assigned.is_empty()
            && self.priorities.is_empty()
            && self.units.is_empty()
            && self.ymms.is_empty()
            && self.search_term().is_none()
    }

    fn search_term(&self) -> Option<String> {
        self.text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
    }

    pub fn matches(&self, r: &RepairRecord) -> bool {
        self.matches_fields(r) && self.matches_text(r, self.search_term().as_deref())
    }

    fn matches_fields(&self, r: &RepairRecord) -> bool {
        passes(&self.statuses, &r.status)
            && passes(&self.assigned, &r.assigned_to)
            && passes(&self.priorities, &r.priority)
            && passes(&self.units, &r.unit)
            && passes(&self.ymms, &r.ymm)
    }

    fn matches_text(&self, r: &RepairRecord, needle: Option<&str>) -> bool {
        match needle {
            None => true,
            Some(needle) => [&r.description, &r.notes, &r.alert]
                .iter()
                .any(|field| field.to_lowercase().contains(needle)),
        }
    }

    /// Matching records with their row ids, in table order.
    pub fn apply_indexed<'a>(&self, records: &'a [RepairRecord]) -> Vec<(usize, &'a RepairRecord)> {
        let needle = self.search_term();
        records
            .iter()
            .enumerate()
            .filter(|(_, r)| self.matches_fields(r) && self.matches_text(r, needle.as_deref()))
            .collect()
    }

    pub fn apply<'a>(&self, records: &'a [RepairRecord]) -> Vec<&'a RepairRecord> {
        self.apply_indexed(records)
            .into_iter()
            .map(|(_, r)| r)
            .collect()
    }
}

/// Choices offered for each filter criterion: distinct non-blank values,
/// sorted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Facets {
    pub statuses: Vec<String>,
    pub assigned: Vec<String>,
    pub priorities: Vec<String>,
    pub units: Vec<String>,
    pub ymms: Vec<String>,
}

impl Facets {
    pub fn from_records(records: &[RepairRecord]) -> Self {
        fn distinct<'a>(values: impl Iterator<Item = &'a String>) -> Vec<String> {
            values
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()
        }

        Facets {
            statuses: distinct(records.iter().map(|r| &r.status)),
            assigned: distinct(records.iter().map(|r| &r.assigned_to)),
            priorities: distinct(records.iter().map(|r| &r.priority)),
            units: distinct(records.iter().map(|r| &r.unit)),
            ymms: distinct(records.iter().map(|r| &r.ymm)),
        }
    }
}

/// Downtime and cost summed once per ticket. When rows of one ticket
/// disagree, the largest value recorded on the ticket counts.
pub fn ticket_totals<'a>(records: impl IntoIterator<Item = &'a RepairRecord>) -> (i64, f64) {
    let mut per_ticket: BTreeMap<i64, (i64, f64)> = BTreeMap::new();
    for r in records {
        let entry = per_ticket.entry(r.ticket_id).or_insert((0, 0.0));
        entry.0 = entry.0.max(r.downtime_days);
        entry.1 = entry.1.max(r.cost);
    }
    per_ticket
        .values()
        .fold((0, 0.0), |(down, cost), (d, c)| (down + d, cost + c))
}

/// Headline numbers for a filtered view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub repairs: usize,
    pub downtime_days: i64,
    pub cost: f64,
}

impl Summary {
    pub fn of(records: &[&RepairRecord]) -> Self {
        let (downtime_days, cost) = ticket_totals(records.iter().copied());
        Summary {
            repairs: records.len(),
            downtime_days,
            cost,
        }
    }
}
