pub mod cli;
pub mod config;
pub mod db;
pub mod filter;
pub mod format;
pub mod llm;
pub mod models;
pub mod recommend;
pub mod utils;
pub mod weather;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, ConfigAction, FilterArgs};
use config::{ConfigError, ConfigStore};
use db::{SqliteCatalog, Store};
use llm::LLMComposer;
use models::FilterCriteria;
use recommend::{CompletionProvider, RecommendationRequest, Recommender};
use weather::WeatherClient;

pub fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let db_path = cli
        .db
        .as_deref()
        .map(PathBuf::from)
        .unwrap_or_else(utils::database_path);

    match cli.command {
        Commands::Init { reset } => init_catalog(&db_path, reset),
        Commands::Events {
            date,
            filters,
            grouped,
            json,
        } => list_events(&db_path, &date, &filters, grouped, json),
        Commands::Alternatives { name, exclude } => {
            list_alternatives(&db_path, &name, exclude.as_deref())
        }
        Commands::Recommend {
            location,
            date,
            filters,
            no_llm,
        } => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("failed to start async runtime")?;
            runtime.block_on(run_recommendation(db_path, location, &date, &filters, no_llm))
        }
        Commands::Config { action } => manage_config(action),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn parse_date(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
        .with_context(|| format!("invalid date {text:?}, expected YYYY-MM-DD"))
}

fn criteria_from(filters: &FilterArgs) -> Result<FilterCriteria> {
    FilterCriteria::parse(
        filters.event_type.as_deref(),
        filters.time_of_day.as_deref(),
        filters.max_price,
    )
    .context("invalid filter options")
}

/// Opens the catalog, loading the sample events into an empty one.
fn open_store(path: &Path) -> Result<Store> {
    let store = Store::open(path)
        .with_context(|| format!("failed to open event catalog at {}", path.display()))?;
    let seeded = store.seed_if_empty().context("failed to seed event catalog")?;
    if seeded > 0 {
        tracing::info!(count = seeded, path = %path.display(), "loaded sample events");
    }
    Ok(store)
}

fn init_catalog(path: &Path, reset: bool) -> Result<()> {
    let store = Store::open(path)
        .with_context(|| format!("failed to open event catalog at {}", path.display()))?;
    let inserted = if reset {
        store.reset_with_samples()
    } else {
        store.seed_if_empty()
    }
    .context("failed to load sample events")?;

    println!(
        "✅ Event catalog ready at {} ({} sample events loaded)",
        path.display(),
        inserted
    );
    Ok(())
}

fn list_events(
    path: &Path,
    date: &str,
    filters: &FilterArgs,
    grouped: bool,
    json: bool,
) -> Result<()> {
    let date = parse_date(date)?;
    let criteria = criteria_from(filters)?;
    let store = open_store(path)?;

    let candidates = store.events_on(date).context("failed to load events")?;
    let matched = filter::filter(&candidates, &criteria);
    if json {
        println!(
            "{}",
            format::events_json(&matched).context("failed to serialize events")?
        );
        return Ok(());
    }
    if matched.is_empty() {
        println!("{}", format::NO_EVENTS_MESSAGE);
        return Ok(());
    }

    if grouped {
        print!(
            "{}",
            format::events_listing(&filter::group_by_time_of_day(&matched))
        );
        return Ok(());
    }

    for event in &matched {
        println!(
            "{}-{}  {} [{}] {}  {} ({}/{})",
            event.start_time.format("%H:%M"),
            event.end_time.format("%H:%M"),
            event.name,
            event.category,
            format::price_label(event),
            format::availability_label(filter::classify_availability(event)),
            event.available_spots,
            event.capacity
        );
    }
    Ok(())
}

fn list_alternatives(path: &Path, name: &str, exclude: Option<&str>) -> Result<()> {
    let exclude = exclude.map(parse_date).transpose()?;
    let store = open_store(path)?;
    let catalog = store.all_events().context("failed to load events")?;

    let dates: Vec<_> = filter::find_alternative_dates(&catalog, name)
        .into_iter()
        .filter(|(date, _)| Some(*date) != exclude)
        .collect();
    if dates.is_empty() {
        println!("No other dates found for {name:?}.");
        return Ok(());
    }

    for (date, event) in dates {
        println!(
            "{}  {} at {}  {}",
            date,
            event.start_time.format("%H:%M"),
            event.location,
            format::availability_label(filter::classify_availability(&event))
        );
    }
    Ok(())
}

async fn run_recommendation(
    db_path: PathBuf,
    location: String,
    date: &str,
    filters: &FilterArgs,
    no_llm: bool,
) -> Result<()> {
    let date = parse_date(date)?;
    let criteria = criteria_from(filters)?;
    let config = ConfigStore::load()
        .context("failed to load configuration")?
        .read()
        .with_env_overrides();

    let seed_path = db_path.clone();
    tokio::task::spawn_blocking(move || open_store(&seed_path).map(|_| ()))
        .await
        .context("catalog task failed")??;

    let weather = WeatherClient::from_config(&config)
        .context("weather client is not configured (set WEATHER_API_KEY)")?;
    let composer: Option<Box<dyn CompletionProvider>> = if no_llm {
        None
    } else {
        Some(Box::new(
            LLMComposer::from_config(&config).context("failed to build composer")?,
        ))
    };

    let recommender = Recommender::new(
        Box::new(weather),
        Box::new(SqliteCatalog::new(db_path)),
        composer,
    );
    let request = RecommendationRequest {
        location,
        date,
        criteria,
    };
    let outcome = recommender
        .recommend(&request)
        .await
        .context("failed to build recommendation")?;

    println!("{}", outcome.render());
    Ok(())
}

fn manage_config(action: ConfigAction) -> Result<()> {
    let mut store = ConfigStore::load().context("failed to load configuration")?;
    match action {
        ConfigAction::Show => {
            let effective = store.read().with_env_overrides();
            println!("# {}", store.path().display());
            println!("{}", effective.to_display_json()?);
        }
        ConfigAction::Set { key, value } => {
            match store.update(|config| config.set(&key, &value)) {
                Ok(_) => println!("Updated {key} in {}", store.path().display()),
                Err(err @ ConfigError::UnknownKey(_)) => {
                    return Err(err).with_context(|| {
                        format!("known keys: {}", config::KEYS.join(", "))
                    });
                }
                Err(err) => return Err(err).context("failed to update configuration"),
            }
        }
    }
    Ok(())
}
