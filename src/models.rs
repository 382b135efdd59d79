use std::{fmt, str::FromStr};

use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
#[error("invalid event record {id}: {reason}")]
pub struct RecordError {
    pub id: i64,
    pub reason: String,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CriteriaError {
    #[error("unrecognized {field} value: {value:?}")]
    Unrecognized { field: &'static str, value: String },
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Indoor,
    Outdoor,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Indoor => "indoor",
            Category::Outdoor => "outdoor",
        }
    }
}

impl FromStr for Category {
    type Err = CriteriaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "indoor" => Ok(Category::Indoor),
            "outdoor" => Ok(Category::Outdoor),
            _ => Err(CriteriaError::Unrecognized {
                field: "event type",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Part of the day an event starts in.
///
/// Ordering follows the day: morning, afternoon, evening.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
}

impl TimeOfDay {
    pub const ALL: [TimeOfDay; 3] = [TimeOfDay::Morning, TimeOfDay::Afternoon, TimeOfDay::Evening];

    /// Morning is [06:00, 12:00), afternoon [12:00, 18:00). Everything else,
    /// including late-night starts before 06:00, is evening.
    pub fn of(start: NaiveTime) -> Self {
        match start.hour() {
            6..=11 => TimeOfDay::Morning,
            12..=17 => TimeOfDay::Afternoon,
            _ => TimeOfDay::Evening,
        }
    }

    /// Whether `start` falls inside this part of the day's own window:
    /// [06:00, 12:00), [12:00, 18:00) or [18:00, 24:00). Starts before 06:00
    /// belong to none of them.
    pub fn contains(&self, start: NaiveTime) -> bool {
        let hour = start.hour();
        match self {
            TimeOfDay::Morning => (6..12).contains(&hour),
            TimeOfDay::Afternoon => (12..18).contains(&hour),
            TimeOfDay::Evening => hour >= 18,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeOfDay::Morning => "morning",
            TimeOfDay::Afternoon => "afternoon",
            TimeOfDay::Evening => "evening",
        }
    }
}

impl FromStr for TimeOfDay {
    type Err = CriteriaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "morning" => Ok(TimeOfDay::Morning),
            "afternoon" => Ok(TimeOfDay::Afternoon),
            "evening" => Ok(TimeOfDay::Evening),
            _ => Err(CriteriaError::Unrecognized {
                field: "time of day",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    Good,
    Limited,
    AlmostFull,
    SoldOut,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct EventRecord {
    pub id: i64,
    pub name: String,
    pub category: Category,
    pub description: String,
    pub location: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub price_min: f64,
    pub price_max: f64,
    pub capacity: u32,
    pub available_spots: u32,
}

impl EventRecord {
    pub fn time_of_day(&self) -> TimeOfDay {
        TimeOfDay::of(self.start_time)
    }

    pub fn is_free(&self) -> bool {
        self.price_min == 0.0 && self.price_max == 0.0
    }

    /// Checks the invariants every catalog row must satisfy before it can be
    /// filtered or classified.
    pub fn validate(&self) -> Result<(), RecordError> {
        let reject = |reason: String| {
            Err(RecordError {
                id: self.id,
                reason,
            })
        };

        if self.capacity == 0 {
            return reject("capacity must be positive".to_string());
        }
        if self.available_spots > self.capacity {
            return reject(format!(
                "available spots {} exceed capacity {}",
                self.available_spots, self.capacity
            ));
        }
        if !self.price_min.is_finite() || !self.price_max.is_finite() || self.price_min < 0.0 {
            return reject(format!(
                "price bounds {}..{} must be finite and non-negative",
                self.price_min, self.price_max
            ));
        }
        if self.price_min > self.price_max {
            return reject(format!(
                "price_min {} is greater than price_max {}",
                self.price_min, self.price_max
            ));
        }
        if self.start_time >= self.end_time {
            return reject(format!(
                "start {} is not before end {}",
                self.start_time.format("%H:%M"),
                self.end_time.format("%H:%M")
            ));
        }
        Ok(())
    }
}

/// Optional per-query restrictions. An absent field does not restrict.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FilterCriteria {
    pub event_type: Option<Category>,
    pub time_of_day: Option<TimeOfDay>,
    pub max_price: Option<f64>,
}

impl FilterCriteria {
    /// Builds criteria from caller-supplied option values. `"any"` disables a
    /// restriction; anything outside a field's domain is rejected.
    pub fn parse(
        event_type: Option<&str>,
        time_of_day: Option<&str>,
        max_price: Option<f64>,
    ) -> Result<Self, CriteriaError> {
        let event_type = match event_type {
            Some(raw) if !is_any(raw) => Some(raw.parse::<Category>()?),
            _ => None,
        };
        let time_of_day = match time_of_day {
            Some(raw) if !is_any(raw) => Some(raw.parse::<TimeOfDay>()?),
            _ => None,
        };
        if let Some(price) = max_price {
            if !price.is_finite() || price < 0.0 {
                return Err(CriteriaError::Unrecognized {
                    field: "max price",
                    value: price.to_string(),
                });
            }
        }

        Ok(Self {
            event_type,
            time_of_day,
            max_price,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.event_type.is_none() && self.time_of_day.is_none() && self.max_price.is_none()
    }
}

fn is_any(raw: &str) -> bool {
    raw.trim().eq_ignore_ascii_case("any")
}

#[cfg(test)]
pub(crate) fn sample_record(id: i64, name: &str, category: Category, start: &str) -> EventRecord {
    let start_time = NaiveTime::parse_from_str(start, "%H:%M").expect("valid start time");
    EventRecord {
        id,
        name: name.to_string(),
        category,
        description: format!("{name} description"),
        location: "Downtown".to_string(),
        date: NaiveDate::from_ymd_opt(2026, 2, 15).expect("valid date"),
        start_time,
        end_time: NaiveTime::from_hms_opt(23, 59, 0).expect("valid end time"),
        price_min: 10.0,
        price_max: 10.0,
        capacity: 100,
        available_spots: 60,
    }
}
