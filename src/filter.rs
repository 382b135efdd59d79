//! Filtering, grouping and availability classification over event records.
//!
//! Everything here is pure: inputs are borrowed, never mutated, and results
//! are fresh collections in input order.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::models::{Availability, EventRecord, FilterCriteria, TimeOfDay};

type Predicate = fn(&FilterCriteria, &EventRecord) -> bool;

const PREDICATES: [Predicate; 3] = [matches_type, matches_time_of_day, matches_price];

fn matches_type(criteria: &FilterCriteria, record: &EventRecord) -> bool {
    criteria
        .event_type
        .map_or(true, |category| record.category == category)
}

fn matches_time_of_day(criteria: &FilterCriteria, record: &EventRecord) -> bool {
    criteria
        .time_of_day
        .map_or(true, |bucket| bucket.contains(record.start_time))
}

// Compared against the cheapest admission.
fn matches_price(criteria: &FilterCriteria, record: &EventRecord) -> bool {
    criteria
        .max_price
        .map_or(true, |max| record.price_min <= max)
}

pub fn matches(record: &EventRecord, criteria: &FilterCriteria) -> bool {
    PREDICATES
        .iter()
        .all(|predicate| predicate(criteria, record))
}

/// Returns the records matching every specified criterion, in input order.
pub fn filter(records: &[EventRecord], criteria: &FilterCriteria) -> Vec<EventRecord> {
    records
        .iter()
        .filter(|record| matches(record, criteria))
        .cloned()
        .collect()
}

/// Partitions records by start-time bucket. All three buckets are present in
/// the result, empty ones included.
pub fn group_by_time_of_day(records: &[EventRecord]) -> BTreeMap<TimeOfDay, Vec<EventRecord>> {
    let mut buckets: BTreeMap<TimeOfDay, Vec<EventRecord>> =
        TimeOfDay::ALL.iter().map(|bucket| (*bucket, Vec::new())).collect();

    for record in records {
        buckets
            .entry(record.time_of_day())
            .or_default()
            .push(record.clone());
    }

    buckets
}

/// Classifies remaining capacity. Callers must only pass validated records
/// (capacity > 0).
///
/// Thresholds are evaluated with integer cross-multiplication, so a ratio of
/// exactly 0.20 or 0.50 is `Limited`.
pub fn classify_availability(record: &EventRecord) -> Availability {
    debug_assert!(record.capacity > 0, "capacity must be validated upstream");

    let available = u64::from(record.available_spots);
    let capacity = u64::from(record.capacity);

    if available == 0 {
        Availability::SoldOut
    } else if available * 5 < capacity {
        Availability::AlmostFull
    } else if available * 2 <= capacity {
        Availability::Limited
    } else {
        Availability::Good
    }
}

/// Every distinct date on which an event named exactly `event_name` occurs in
/// `catalog`, ascending. The first record seen for a date represents it.
pub fn find_alternative_dates(
    catalog: &[EventRecord],
    event_name: &str,
) -> Vec<(NaiveDate, EventRecord)> {
    let mut by_date: BTreeMap<NaiveDate, EventRecord> = BTreeMap::new();
    for record in catalog.iter().filter(|record| record.name == event_name) {
        by_date
            .entry(record.date)
            .or_insert_with(|| record.clone());
    }
    by_date.into_iter().collect()
}
