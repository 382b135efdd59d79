use std::collections::BTreeMap;

use serde::Serialize;

use crate::filter::classify_availability;
use crate::models::{Availability, Category, EventRecord, TimeOfDay};
use crate::weather::WeatherSnapshot;

pub const NO_EVENTS_MESSAGE: &str = "No events found matching your criteria for this date.";

const RULE: &str = "══════════════════════════════════════════════════════════════════";

pub fn weather_icon(condition: &str) -> &'static str {
    let lower = condition.to_lowercase();
    if lower.contains("sun") || lower.contains("clear") {
        "☀️"
    } else if lower.contains("partly cloud") {
        "⛅"
    } else if lower.contains("cloudy") || lower.contains("overcast") {
        "☁️"
    } else if lower.contains("rain") || lower.contains("drizzle") {
        "🌧️"
    } else if lower.contains("storm") || lower.contains("thunder") {
        "⛈️"
    } else if lower.contains("snow") {
        "❄️"
    } else if lower.contains("fog") || lower.contains("mist") {
        "🌫️"
    } else {
        "🌤️"
    }
}

pub fn temperature_icon(temp_c: f64) -> &'static str {
    match temp_c {
        t if t < 10.0 => "🥶",
        t if t < 15.0 => "❄️",
        t if t < 20.0 => "😊",
        t if t < 25.0 => "☺️",
        t if t < 30.0 => "😎",
        _ => "🥵",
    }
}

pub fn temperature_label(temp_c: f64) -> &'static str {
    match temp_c {
        t if t < 10.0 => "Very Cold",
        t if t < 15.0 => "Cold",
        t if t < 20.0 => "Cool",
        t if t < 25.0 => "Pleasant",
        t if t < 30.0 => "Warm",
        t if t < 35.0 => "Hot",
        _ => "Very Hot",
    }
}

fn time_icon(bucket: TimeOfDay) -> &'static str {
    match bucket {
        TimeOfDay::Morning => "🌅",
        TimeOfDay::Afternoon => "☀️",
        TimeOfDay::Evening => "🌙",
    }
}

fn category_icon(category: Category) -> &'static str {
    match category {
        Category::Indoor => "🏠",
        Category::Outdoor => "🌳",
    }
}

pub fn price_label(event: &EventRecord) -> String {
    if event.is_free() {
        "FREE 🎉".to_string()
    } else if event.price_min == event.price_max {
        format!("${:.0}", event.price_min)
    } else {
        format!("${:.0}-${:.0}", event.price_min, event.price_max)
    }
}

pub fn availability_label(availability: Availability) -> &'static str {
    match availability {
        Availability::Good => "✅ Good availability",
        Availability::Limited => "⚠️ Limited spots",
        Availability::AlmostFull => "🔴 Almost full - BOOK NOW!",
        Availability::SoldOut => "❌ SOLD OUT",
    }
}

fn optional_measure(value: Option<f64>) -> String {
    value
        .map(|v| format!("{v}"))
        .unwrap_or_else(|| "N/A".to_string())
}

pub fn weather_box(snapshot: &WeatherSnapshot, clothing: &[String], transport: &str) -> String {
    let current = match &snapshot.current {
        Some(current) => current,
        None => return "Weather data unavailable\n".to_string(),
    };
    let icon = weather_icon(&current.condition);

    let mut lines = vec![
        format!("╔{RULE}╗"),
        format!("║  {icon}  WEATHER CONDITIONS  {icon}"),
        format!("╠{RULE}╣"),
        format!("║  📍 Location: {}", snapshot.location),
        format!(
            "║  🌡️  Temperature: {}°C {} ({})",
            current.temp_c,
            temperature_icon(current.temp_c),
            temperature_label(current.temp_c)
        ),
        format!("║  🌡️  Feels Like: {}°C", current.feels_like_c),
        format!("║  🌤️  Condition: {}", current.condition),
        format!("║  💧 Humidity: {}%", optional_measure(current.humidity)),
        format!("║  💨 Wind Speed: {} km/h", optional_measure(current.wind_kph)),
        format!("╠{RULE}╣"),
        "║  👔 WHAT TO WEAR:".to_string(),
    ];
    lines.extend(clothing.iter().map(|item| format!("║     • {item}")));
    lines.push(format!("╠{RULE}╣"));
    lines.push("║  🚗 TRANSPORT ADVICE:".to_string());
    lines.push(format!("║     {transport}"));
    lines.push(format!("╚{RULE}╝"));

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn event_block(event: &EventRecord) -> String {
    format!(
        "  {icon} {name} ({kind})\n     {description}\n     📍 {location}\n     ⏰ {start} - {end}\n     💰 {price}\n     👥 {availability} ({available}/{capacity} spots available)\n",
        icon = category_icon(event.category),
        name = event.name,
        kind = event.category.as_str().to_uppercase(),
        description = event.description,
        location = event.location,
        start = event.start_time.format("%H:%M"),
        end = event.end_time.format("%H:%M"),
        price = price_label(event),
        availability = availability_label(classify_availability(event)),
        available = event.available_spots,
        capacity = event.capacity,
    )
}

/// Listing of the non-empty buckets in day order.
pub fn events_listing(grouped: &BTreeMap<TimeOfDay, Vec<EventRecord>>) -> String {
    let mut out = format!("╔{RULE}╗\n║  📅 EVENTS GROUPED BY TIME OF DAY\n╚{RULE}╝\n");
    for (bucket, events) in grouped.iter().filter(|(_, events)| !events.is_empty()) {
        out.push_str(&format!(
            "\n{} {}\n{}\n",
            time_icon(*bucket),
            bucket.as_str().to_uppercase(),
            "─".repeat(70)
        ));
        for event in events {
            out.push('\n');
            out.push_str(&event_block(event));
        }
    }
    out
}

fn urgency_hint(event: &EventRecord) -> String {
    match classify_availability(event) {
        Availability::SoldOut => "sold out".to_string(),
        Availability::AlmostFull => format!("🔴 only {} spots left, book now", event.available_spots),
        Availability::Limited => format!("{} spots left", event.available_spots),
        Availability::Good => "plenty of spots".to_string(),
    }
}

/// Deterministic recommendation used when no completion is available.
pub fn fallback_recommendation(
    weather_box: &str,
    grouped: &BTreeMap<TimeOfDay, Vec<EventRecord>>,
    notes: &[String],
) -> String {
    let mut lines = vec!["TOP RECOMMENDATIONS:".to_string()];
    for events in grouped.values() {
        for event in events {
            lines.push(format!(
                "• {} ({}-{}) - {} event, {}, {}",
                event.name,
                event.start_time.format("%H:%M"),
                event.end_time.format("%H:%M"),
                event.category.as_str(),
                price_label(event),
                urgency_hint(event)
            ));
        }
    }
    for note in notes {
        lines.push(format!("ℹ️ {note}"));
    }
    format!("{weather_box}\n{}", lines.join("\n"))
}

#[derive(Serialize)]
struct ListedEvent<'a> {
    #[serde(flatten)]
    event: &'a EventRecord,
    time_of_day: TimeOfDay,
    availability: Availability,
}

/// Machine-readable listing: each record plus its derived bucket and tier.
pub fn events_json(events: &[EventRecord]) -> serde_json::Result<String> {
    let listed: Vec<ListedEvent<'_>> = events
        .iter()
        .map(|event| ListedEvent {
            event,
            time_of_day: event.time_of_day(),
            availability: classify_availability(event),
        })
        .collect();
    serde_json::to_string_pretty(&listed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::group_by_time_of_day;
    use crate::models::sample_record;
    use crate::weather::CurrentConditions;

    fn snapshot(current: Option<CurrentConditions>) -> WeatherSnapshot {
        WeatherSnapshot {
            location: "Singapore".to_string(),
            current,
        }
    }

    #[test]
    fn icons_follow_condition_priority() {
        assert_eq!(weather_icon("Sunny"), "☀️");
        assert_eq!(weather_icon("Partly cloudy"), "⛅");
        assert_eq!(weather_icon("Overcast"), "☁️");
        assert_eq!(weather_icon("Light drizzle"), "🌧️");
        assert_eq!(weather_icon("Thundery outbreaks"), "⛈️");
        assert_eq!(weather_icon("Blowing snow"), "❄️");
        assert_eq!(weather_icon("Mist"), "🌫️");
        assert_eq!(weather_icon("Hazy"), "🌤️");
    }

    #[test]
    fn temperature_ranges() {
        assert_eq!(temperature_label(9.9), "Very Cold");
        assert_eq!(temperature_label(20.0), "Pleasant");
        assert_eq!(temperature_label(34.0), "Hot");
        assert_eq!(temperature_icon(29.9), "😎");
        assert_eq!(temperature_icon(30.0), "🥵");
    }

    #[test]
    fn price_labels() {
        let mut event = sample_record(1, "Food Festival", Category::Outdoor, "12:00");
        event.price_min = 0.0;
        event.price_max = 0.0;
        assert_eq!(price_label(&event), "FREE 🎉");

        event.price_max = 15.0;
        assert_eq!(price_label(&event), "$0-$15");

        event.price_min = 12.0;
        event.price_max = 12.0;
        assert_eq!(price_label(&event), "$12");
    }

    #[test]
    fn weather_box_lists_suggestions() {
        let conditions = CurrentConditions {
            temp_c: 29.0,
            feels_like_c: 33.0,
            condition: "Partly cloudy".to_string(),
            humidity: Some(80.0),
            wind_kph: None,
        };
        let rendered = weather_box(
            &snapshot(Some(conditions)),
            &["light clothing".to_string()],
            "Weather is pleasant for walking or any form of transport.",
        );
        assert!(rendered.contains("📍 Location: Singapore"));
        assert!(rendered.contains("29°C 😎 (Warm)"));
        assert!(rendered.contains("💨 Wind Speed: N/A km/h"));
        assert!(rendered.contains("║     • light clothing"));

        assert_eq!(
            weather_box(&snapshot(None), &[], ""),
            "Weather data unavailable\n"
        );
    }

    #[test]
    fn listing_skips_empty_buckets() {
        let mut workshop = sample_record(6, "Cooking Workshop", Category::Indoor, "14:00");
        workshop.capacity = 15;
        workshop.available_spots = 3;
        let grouped = group_by_time_of_day(&[workshop]);

        let listing = events_listing(&grouped);
        assert!(listing.contains("AFTERNOON"));
        assert!(!listing.contains("MORNING"));
        assert!(!listing.contains("EVENING"));
        assert!(listing.contains("🏠 Cooking Workshop (INDOOR)"));
        assert!(listing.contains("⚠️ Limited spots (3/15 spots available)"));
    }

    #[test]
    fn fallback_mentions_urgency_and_notes() {
        let mut yoga = sample_record(1, "Morning Yoga", Category::Outdoor, "06:00");
        yoga.available_spots = 8;
        let grouped = group_by_time_of_day(&[yoga]);

        let text = fallback_recommendation(
            "BOX\n",
            &grouped,
            &["Morning Yoga also runs on 2026-02-18".to_string()],
        );
        assert!(text.starts_with("BOX\n"));
        assert!(text.contains("• Morning Yoga (06:00-23:59) - outdoor event, $10, 🔴 only 8 spots left"));
        assert!(text.contains("ℹ️ Morning Yoga also runs on 2026-02-18"));
    }

    #[test]
    fn json_listing_carries_derived_fields() {
        let mut theater = sample_record(2, "Theater Show", Category::Indoor, "19:30");
        theater.available_spots = 5;

        let json = events_json(&[theater]).expect("json");
        let value: serde_json::Value = serde_json::from_str(&json).expect("parse");
        let first = &value[0];
        assert_eq!(first["name"], "Theater Show");
        assert_eq!(first["category"], "indoor");
        assert_eq!(first["date"], "2026-02-15");
        assert_eq!(first["start_time"], "19:30:00");
        assert_eq!(first["time_of_day"], "evening");
        assert_eq!(first["availability"], "almost_full");
    }
}
