//! Coordinates weather, catalog and completion collaborators into one
//! recommendation. Each collaborator sits behind a port so it can be swapped
//! out in tests.

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::db::{CatalogError, CatalogResult};
use crate::filter::{filter, find_alternative_dates, group_by_time_of_day, matches};
use crate::format;
use crate::llm::{build_user_prompt, ComposeError, SYSTEM_PROMPT};
use crate::models::{Category, EventRecord, FilterCriteria};
use crate::weather::{self, WeatherError, WeatherSnapshot};

#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn current(&self, location: &str) -> Result<WeatherSnapshot, WeatherError>;
}

#[async_trait]
pub trait EventCatalog: Send + Sync {
    async fn events_on(&self, date: NaiveDate) -> CatalogResult<Vec<EventRecord>>;
    async fn all_events(&self) -> CatalogResult<Vec<EventRecord>>;
}

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String, ComposeError>;
}

#[derive(Debug, Error)]
pub enum RecommendError {
    #[error("weather lookup failed: {0}")]
    Weather(#[from] WeatherError),
    #[error("event catalog failed: {0}")]
    Catalog(#[from] CatalogError),
}

#[derive(Debug, Clone)]
pub struct RecommendationRequest {
    pub location: String,
    pub date: NaiveDate,
    pub criteria: FilterCriteria,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlternativeDates {
    pub event_name: String,
    pub dates: Vec<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Recommendation {
    NoEvents {
        alternatives: Vec<AlternativeDates>,
    },
    Ready {
        text: String,
        events: Vec<EventRecord>,
        composed: bool,
    },
}

impl Recommendation {
    pub fn render(&self) -> String {
        match self {
            Recommendation::Ready { text, .. } => text.clone(),
            Recommendation::NoEvents { alternatives } => {
                let mut out = format::NO_EVENTS_MESSAGE.to_string();
                for alternative in alternatives {
                    out.push_str(&format!(
                        "\n• {} is also scheduled on {}",
                        alternative.event_name,
                        join_dates(&alternative.dates)
                    ));
                }
                out
            }
        }
    }
}

fn join_dates(dates: &[NaiveDate]) -> String {
    dates
        .iter()
        .map(|date| date.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn distinct_names<'a>(records: impl Iterator<Item = &'a EventRecord>) -> Vec<&'a str> {
    let mut names: Vec<&str> = Vec::new();
    for record in records {
        if !names.contains(&record.name.as_str()) {
            names.push(&record.name);
        }
    }
    names
}

/// Other dates on which the given events recur. A date counts when any of
/// its occurrences is accepted by `keep`.
fn recurring_dates<F>(
    names: &[&str],
    catalog: &[EventRecord],
    excluded: NaiveDate,
    keep: F,
) -> Vec<AlternativeDates>
where
    F: Fn(&EventRecord) -> bool,
{
    let eligible: Vec<EventRecord> = catalog
        .iter()
        .filter(|record| record.date != excluded && keep(record))
        .cloned()
        .collect();

    names
        .iter()
        .filter_map(|name| {
            let dates: Vec<NaiveDate> = find_alternative_dates(&eligible, name)
                .into_iter()
                .map(|(date, _)| date)
                .collect();
            (!dates.is_empty()).then(|| AlternativeDates {
                event_name: name.to_string(),
                dates,
            })
        })
        .collect()
}

pub struct Recommender {
    weather: Box<dyn WeatherProvider>,
    catalog: Box<dyn EventCatalog>,
    composer: Option<Box<dyn CompletionProvider>>,
}

impl Recommender {
    pub fn new(
        weather: Box<dyn WeatherProvider>,
        catalog: Box<dyn EventCatalog>,
        composer: Option<Box<dyn CompletionProvider>>,
    ) -> Self {
        Self {
            weather,
            catalog,
            composer,
        }
    }

    pub async fn recommend(
        &self,
        request: &RecommendationRequest,
    ) -> Result<Recommendation, RecommendError> {
        tracing::info!(location = %request.location, date = %request.date, "fetching weather");
        let snapshot = self.weather.current(&request.location).await?;

        tracing::info!(date = %request.date, "fetching events");
        let candidates = self.catalog.events_on(request.date).await?;
        let matched = filter(&candidates, &request.criteria);
        tracing::debug!(
            candidates = candidates.len(),
            matched = matched.len(),
            "applied filters"
        );

        if matched.is_empty() {
            let alternatives = if candidates.is_empty() {
                Vec::new()
            } else {
                let catalog = self.catalog.all_events().await?;
                recurring_dates(
                    &distinct_names(candidates.iter()),
                    &catalog,
                    request.date,
                    |record| matches(record, &request.criteria),
                )
            };
            return Ok(Recommendation::NoEvents { alternatives });
        }

        let grouped = group_by_time_of_day(&matched);
        let notes = self.wet_weather_notes(&snapshot, &matched, request.date).await?;

        let (clothing, transport) = match &snapshot.current {
            Some(current) => (
                weather::clothing_suggestions(current.temp_c, &current.condition),
                weather::transport_suggestion(current.temp_c, &current.condition).to_string(),
            ),
            None => (Vec::new(), "Weather data unavailable".to_string()),
        };
        let weather_box = format::weather_box(&snapshot, &clothing, &transport);

        let (text, composed) = match &self.composer {
            Some(composer) => {
                tracing::info!("generating recommendations");
                let listing = format::events_listing(&grouped);
                let prompt = build_user_prompt(&weather_box, &listing, &notes);
                match composer.complete(SYSTEM_PROMPT, &prompt).await {
                    Ok(reply) => (format!("{weather_box}\n{reply}"), true),
                    Err(err) => {
                        tracing::warn!("composer failed, using fallback: {err}");
                        (
                            format::fallback_recommendation(&weather_box, &grouped, &notes),
                            false,
                        )
                    }
                }
            }
            None => (
                format::fallback_recommendation(&weather_box, &grouped, &notes),
                false,
            ),
        };

        Ok(Recommendation::Ready {
            text,
            events: matched,
            composed,
        })
    }

    /// When rain is expected, lists other dates with open spots for each
    /// outdoor event.
    async fn wet_weather_notes(
        &self,
        snapshot: &WeatherSnapshot,
        matched: &[EventRecord],
        date: NaiveDate,
    ) -> Result<Vec<String>, RecommendError> {
        let wet = snapshot
            .current
            .as_ref()
            .map_or(false, |current| current.is_wet());
        let outdoor: Vec<&str> = distinct_names(
            matched
                .iter()
                .filter(|record| record.category == Category::Outdoor),
        );
        if !wet || outdoor.is_empty() {
            return Ok(Vec::new());
        }

        let catalog = self.catalog.all_events().await?;
        Ok(recurring_dates(&outdoor, &catalog, date, |record| {
            record.available_spots > 0
        })
        .into_iter()
        .map(|alternative| {
            format!(
                "Wet weather expected: outdoor event {} also runs on {}",
                alternative.event_name,
                join_dates(&alternative.dates)
            )
        })
        .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::models::{sample_record, TimeOfDay};
    use crate::weather::CurrentConditions;

    struct FakeWeather {
        condition: Option<&'static str>,
    }

    #[async_trait]
    impl WeatherProvider for FakeWeather {
        async fn current(&self, location: &str) -> Result<WeatherSnapshot, WeatherError> {
            Ok(WeatherSnapshot {
                location: location.to_string(),
                current: self.condition.map(|condition| CurrentConditions {
                    temp_c: 27.0,
                    feels_like_c: 30.0,
                    condition: condition.to_string(),
                    humidity: Some(70.0),
                    wind_kph: Some(9.0),
                }),
            })
        }
    }

    struct BrokenWeather;

    #[async_trait]
    impl WeatherProvider for BrokenWeather {
        async fn current(&self, _location: &str) -> Result<WeatherSnapshot, WeatherError> {
            Err(WeatherError::Http("status 503".to_string()))
        }
    }

    struct FakeCatalog {
        records: Vec<EventRecord>,
    }

    #[async_trait]
    impl EventCatalog for FakeCatalog {
        async fn events_on(&self, date: NaiveDate) -> CatalogResult<Vec<EventRecord>> {
            Ok(self
                .records
                .iter()
                .filter(|record| record.date == date)
                .cloned()
                .collect())
        }

        async fn all_events(&self) -> CatalogResult<Vec<EventRecord>> {
            Ok(self.records.clone())
        }
    }

    #[derive(Default)]
    struct FakeComposer {
        reply: Option<&'static str>,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CompletionProvider for FakeComposer {
        async fn complete(&self, system: &str, user: &str) -> Result<String, ComposeError> {
            assert_eq!(system, SYSTEM_PROMPT);
            self.prompts
                .lock()
                .expect("prompt log")
                .push(user.to_string());
            self.reply
                .map(str::to_string)
                .ok_or_else(|| ComposeError::Unavailable("offline".to_string()))
        }
    }

    struct SharedComposer(std::sync::Arc<FakeComposer>);

    #[async_trait]
    impl CompletionProvider for SharedComposer {
        async fn complete(&self, system: &str, user: &str) -> Result<String, ComposeError> {
            self.0.complete(system, user).await
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, d).expect("valid date")
    }

    fn catalog() -> Vec<EventRecord> {
        let mut yoga = sample_record(1, "Morning Yoga", Category::Outdoor, "06:00");
        yoga.available_spots = 8;

        let mut theater = sample_record(2, "Theater Show", Category::Indoor, "19:00");
        theater.price_min = 40.0;
        theater.price_max = 80.0;
        theater.capacity = 200;
        theater.available_spots = 5;

        let mut yoga_free = yoga.clone();
        yoga_free.id = 3;
        yoga_free.date = day(16);
        yoga_free.price_min = 0.0;
        yoga_free.price_max = 0.0;

        let mut yoga_full = yoga.clone();
        yoga_full.id = 4;
        yoga_full.date = day(18);
        yoga_full.available_spots = 0;

        let mut yoga_late = yoga.clone();
        yoga_late.id = 5;
        yoga_late.date = day(20);

        vec![yoga, theater, yoga_free, yoga_full, yoga_late]
    }

    fn request(criteria: FilterCriteria) -> RecommendationRequest {
        RecommendationRequest {
            location: "Singapore".to_string(),
            date: day(15),
            criteria,
        }
    }

    fn recommender(
        condition: Option<&'static str>,
        composer: Option<Box<dyn CompletionProvider>>,
    ) -> Recommender {
        Recommender::new(
            Box::new(FakeWeather { condition }),
            Box::new(FakeCatalog { records: catalog() }),
            composer,
        )
    }

    #[tokio::test]
    async fn composed_reply_follows_weather_box() {
        let composer = FakeComposer {
            reply: Some("• Morning Yoga (06:00) - only 8 spots left"),
            ..Default::default()
        };
        let engine = recommender(Some("Sunny"), Some(Box::new(composer)));
        let criteria = FilterCriteria {
            event_type: Some(Category::Outdoor),
            ..Default::default()
        };

        match engine.recommend(&request(criteria)).await.expect("recommend") {
            Recommendation::Ready {
                text,
                events,
                composed,
            } => {
                assert!(composed);
                assert_eq!(events.len(), 1);
                assert_eq!(events[0].name, "Morning Yoga");
                assert!(text.contains("WEATHER CONDITIONS"));
                assert!(text.ends_with("• Morning Yoga (06:00) - only 8 spots left"));
            }
            other => panic!("expected recommendation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn composer_failure_falls_back_to_listing() {
        let engine = recommender(Some("Sunny"), Some(Box::new(FakeComposer::default())));

        match engine
            .recommend(&request(FilterCriteria::default()))
            .await
            .expect("recommend")
        {
            Recommendation::Ready { text, composed, .. } => {
                assert!(!composed);
                assert!(text.contains("TOP RECOMMENDATIONS:"));
                assert!(text.contains("• Theater Show (19:00-23:59)"));
            }
            other => panic!("expected recommendation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn no_matches_offer_dates_that_satisfy_the_criteria() {
        let engine = recommender(Some("Sunny"), None);
        let criteria = FilterCriteria {
            time_of_day: Some(TimeOfDay::Morning),
            max_price: Some(5.0),
            ..Default::default()
        };

        let outcome = engine.recommend(&request(criteria)).await.expect("recommend");
        assert_eq!(
            outcome,
            Recommendation::NoEvents {
                alternatives: vec![AlternativeDates {
                    event_name: "Morning Yoga".to_string(),
                    dates: vec![day(16)],
                }],
            }
        );
        assert_eq!(
            outcome.render(),
            "No events found matching your criteria for this date.\n• Morning Yoga is also scheduled on 2026-02-16"
        );
    }

    #[tokio::test]
    async fn empty_day_has_no_alternatives() {
        let engine = recommender(None, None);
        let mut empty_day = request(FilterCriteria::default());
        empty_day.date = day(17);

        let outcome = engine.recommend(&empty_day).await.expect("recommend");
        assert_eq!(outcome.render(), format::NO_EVENTS_MESSAGE);
    }

    #[tokio::test]
    async fn wet_weather_adds_outdoor_alternatives_to_prompt() {
        let composer = std::sync::Arc::new(FakeComposer {
            reply: Some("• Theater Show"),
            ..Default::default()
        });
        let engine = recommender(
            Some("Moderate rain"),
            Some(Box::new(SharedComposer(composer.clone()))),
        );

        engine
            .recommend(&request(FilterCriteria::default()))
            .await
            .expect("recommend");

        let prompts = composer.prompts.lock().expect("prompt log");
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains(
            "Wet weather expected: outdoor event Morning Yoga also runs on 2026-02-16, 2026-02-20"
        ));
        assert!(prompts[0].contains("umbrella or raincoat"));
    }

    fn with_second_session(mut records: Vec<EventRecord>) -> Vec<EventRecord> {
        let mut later = sample_record(6, "Morning Yoga", Category::Outdoor, "08:00");
        later.date = day(18);
        later.available_spots = 20;
        later.price_min = 0.0;
        later.price_max = 0.0;
        records.push(later);
        records
    }

    #[tokio::test]
    async fn wet_weather_counts_a_date_with_any_open_session() {
        let composer = std::sync::Arc::new(FakeComposer {
            reply: Some("• Theater Show"),
            ..Default::default()
        });
        let engine = Recommender::new(
            Box::new(FakeWeather {
                condition: Some("Light drizzle"),
            }),
            Box::new(FakeCatalog {
                records: with_second_session(catalog()),
            }),
            Some(Box::new(SharedComposer(composer.clone()))),
        );

        engine
            .recommend(&request(FilterCriteria::default()))
            .await
            .expect("recommend");

        let prompts = composer.prompts.lock().expect("prompt log");
        assert!(prompts[0].contains(
            "outdoor event Morning Yoga also runs on 2026-02-16, 2026-02-18, 2026-02-20"
        ));
    }

    #[tokio::test]
    async fn no_matches_consider_every_session_of_a_date() {
        let engine = Recommender::new(
            Box::new(FakeWeather {
                condition: Some("Sunny"),
            }),
            Box::new(FakeCatalog {
                records: with_second_session(catalog()),
            }),
            None,
        );
        let criteria = FilterCriteria {
            time_of_day: Some(TimeOfDay::Morning),
            max_price: Some(5.0),
            ..Default::default()
        };

        let outcome = engine.recommend(&request(criteria)).await.expect("recommend");
        assert_eq!(
            outcome,
            Recommendation::NoEvents {
                alternatives: vec![AlternativeDates {
                    event_name: "Morning Yoga".to_string(),
                    dates: vec![day(16), day(18)],
                }],
            }
        );
    }

    #[tokio::test]
    async fn weather_failure_is_reported() {
        let engine = Recommender::new(
            Box::new(BrokenWeather),
            Box::new(FakeCatalog { records: catalog() }),
            None,
        );
        assert!(matches!(
            engine.recommend(&request(FilterCriteria::default())).await,
            Err(RecommendError::Weather(_))
        ));
    }
}
