//! CricNex CLI
//!
//! Train the model set over a ball-by-ball corpus and serve single-fixture
//! batting predictions from the command line.

use clap::{Parser, Subcommand};
use cricnex::{Config, Result};

#[derive(Parser)]
#[command(name = "cricnex")]
#[command(about = "Cricket player performance prediction", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge the corpus, train every model variant, and save the artifacts
    Train,
    /// Predict batting performance for one fixture
    Predict {
        /// Batter name
        player: String,
        /// Batting team
        team: String,
        /// Opposition team
        opponent: String,
        /// Match venue
        venue: String,
        /// Use a specific registered model instead of the default
        #[arg(long)]
        model: Option<String>,
        /// Override the rolling runs average
        #[arg(long)]
        runs_last_5: Option<f64>,
        /// Override the rolling strike rate
        #[arg(long)]
        strike_rate_last_5: Option<f64>,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// List registered models and their held-out metrics
    Models,
    /// Initialize a new project with default config
    Init,
}

#[derive(Clone, Debug)]
enum OutputFormat {
    Table,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}. Use table or json.", s)),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    let config = if std::path::Path::new(&cli.config).exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    let result = match cli.command {
        Commands::Train => commands::train(&config),
        Commands::Predict {
            player,
            team,
            opponent,
            venue,
            model,
            runs_last_5,
            strike_rate_last_5,
            format,
        } => commands::predict(
            &config,
            player,
            team,
            opponent,
            venue,
            model,
            runs_last_5,
            strike_rate_last_5,
            format,
        ),
        Commands::Models => commands::models(&config),
        Commands::Init => commands::init(&cli.config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use cricnex::data::{load_deliveries, load_matches, merge_records};
    use cricnex::features::schema::{RUNS_LAST_5_AVG, STRIKE_RATE_LAST_5};
    use cricnex::features::FeatureEngine;
    use cricnex::predict::PredictionService;
    use cricnex::registry::{store, ModelRegistry};
    use cricnex::training::train_from_corpus;
    use cricnex::PredictionRequest;
    use std::sync::Arc;

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        std::fs::create_dir_all("data")?;
        std::fs::create_dir_all(&config.data.models_dir)?;
        println!("Created data/ and {}/ directories", config.data.models_dir);

        println!("\nNext steps:");
        println!("  1. Place deliveries.csv and matches.csv under data/");
        println!("  2. Run 'cricnex train'");
        println!("  3. Run 'cricnex predict <player> <team> <opponent> <venue>'");
        Ok(())
    }

    pub fn train(config: &Config) -> Result<()> {
        let deliveries = load_deliveries(&config.data.deliveries_path)?;
        let matches = load_matches(&config.data.matches_path)?;
        let outcome = merge_records(&deliveries, &matches)?;

        let (engine, snapshot) = train_from_corpus(&outcome.stats, config)?;
        store::save(&config.data.models_dir, &snapshot)?;

        println!("\nTrained models (held-out metrics):");
        for summary in snapshot.summaries() {
            let marker = if summary.is_default { " (default)" } else { "" };
            println!("  {:<20} {}{}", summary.name, summary.metrics, marker);
        }
        println!("\nFeature schema: {}", engine.schema_version());
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn predict(
        config: &Config,
        player: String,
        team: String,
        opponent: String,
        venue: String,
        model: Option<String>,
        runs_last_5: Option<f64>,
        strike_rate_last_5: Option<f64>,
        format: OutputFormat,
    ) -> Result<()> {
        let (engine, _) = build_engine(config)?;
        let snapshot = store::load(&config.data.models_dir, engine.schema_version())?;
        let registry = ModelRegistry::with_snapshot(snapshot);
        let service = PredictionService::new(Arc::new(engine), Arc::new(registry))?;

        let mut request = PredictionRequest::new(&player, &team, &opponent, &venue);
        request.model_name = model;
        if let Some(runs) = runs_last_5 {
            request
                .recent_form_overrides
                .insert(RUNS_LAST_5_AVG.to_string(), runs);
        }
        if let Some(sr) = strike_rate_last_5 {
            request
                .recent_form_overrides
                .insert(STRIKE_RATE_LAST_5.to_string(), sr);
        }

        let result = service.predict(&request)?;
        match format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&result)?);
            }
            OutputFormat::Table => {
                println!("\n{} vs {} at {}", result.player, result.opponent, result.venue);
                println!("  Predicted runs:        {:.1}", result.predicted_runs);
                println!("  Predicted strike rate: {:.1}", result.predicted_strike_rate);
                println!("  Confidence:            {:.0}/100", result.confidence);
                println!("  Model:                 {}", result.model_used);
            }
        }
        Ok(())
    }

    pub fn models(config: &Config) -> Result<()> {
        let (engine, _) = build_engine(config)?;
        let snapshot = store::load(&config.data.models_dir, engine.schema_version())?;

        println!("Registered models:");
        for summary in snapshot.summaries() {
            let marker = if summary.is_default { " (default)" } else { "" };
            println!("  {:<20} {}{}", summary.name, summary.metrics, marker);
        }
        Ok(())
    }

    fn build_engine(config: &Config) -> Result<(FeatureEngine, Vec<cricnex::features::LabeledRow>)> {
        let deliveries = load_deliveries(&config.data.deliveries_path)?;
        let matches = load_matches(&config.data.matches_path)?;
        let outcome = merge_records(&deliveries, &matches)?;
        Ok(FeatureEngine::fit(&outcome.stats))
    }
}
