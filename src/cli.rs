use clap::{Args, Parser, Subcommand};

/// Weather-aware event recommendations from a local event catalog
#[derive(Parser, Debug)]
#[command(name = "event-advisor", version, about, long_about = None)]
pub struct Cli {
    /// Override database path (useful for tests or a custom catalog)
    #[arg(global = true, long = "db")]
    pub db: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Raw filter options, validated by `FilterCriteria::parse`.
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// indoor, outdoor or any
    #[arg(long = "type")]
    pub event_type: Option<String>,

    /// morning, afternoon, evening or any
    #[arg(long = "time")]
    pub time_of_day: Option<String>,

    /// Maximum admission price (compared with the cheapest ticket)
    #[arg(long = "max-price")]
    pub max_price: Option<f64>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the catalog and load the sample events
    Init {
        /// Drop existing events before loading the samples
        #[arg(long)]
        reset: bool,
    },

    /// List the catalog events of a date
    Events {
        /// Date of the events (YYYY-MM-DD)
        date: String,

        #[command(flatten)]
        filters: FilterArgs,

        /// Group the listing by time of day
        #[arg(long, conflicts_with = "json")]
        grouped: bool,

        /// Print the matching events as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show every date on which a named event takes place
    Alternatives {
        /// Exact event name
        name: String,

        /// Leave this date (YYYY-MM-DD) out of the result
        #[arg(long)]
        exclude: Option<String>,
    },

    /// Build a weather-aware recommendation for a location and date
    Recommend {
        /// City used for the weather lookup
        location: String,

        /// Date of the events (YYYY-MM-DD)
        date: String,

        #[command(flatten)]
        filters: FilterArgs,

        /// Skip the language model and print the plain recommendation
        #[arg(long = "no-llm")]
        no_llm: bool,
    },

    /// View or change the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration with secrets masked
    Show,
    /// Persist a configuration value
    Set { key: String, value: String },
}
