use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use inquire::{Confirm, Password, PasswordDisplayMode};
use weather_core::{Config, ErrorKind, ProviderId, RetrievalError, WeatherService};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-cache", version, about = "Weather lookups with a Redis cache in front")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure credentials for a specific provider.
    Configure {
        /// Provider short name, e.g. "openweather" or "weatherapi".
        provider: String,
    },

    /// Show weather for one or more locations.
    Show {
        /// Location names, e.g. "London".
        #[arg(required = true)]
        locations: Vec<String>,

        /// Look each location up this many times.
        #[arg(long, default_value_t = 1)]
        repeat: u32,

        /// Print cache statistics after the lookups.
        #[arg(long)]
        stats: bool,
    },

    /// Print cache statistics.
    Stats,

    /// Remove cached entries for one or more locations.
    Invalidate {
        #[arg(required = true)]
        locations: Vec<String>,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure { provider } => configure(&provider),
            Command::Show { locations, repeat, stats } => {
                let locations = validate_locations(locations)?;
                let service = connect().await?;
                let outcome = show(&service, &locations, repeat).await;
                if stats {
                    print_json(&service.stats().await)?;
                }
                service.shutdown().await;
                outcome
            }
            Command::Stats => {
                let service = connect().await?;
                print_json(&service.stats().await)?;
                service.shutdown().await;
                Ok(())
            }
            Command::Invalidate { locations } => {
                let locations = validate_locations(locations)?;
                let service = connect().await?;
                for location in &locations {
                    let removed = service.invalidate(location).await?;
                    println!("{location}: {}", if removed { "invalidated" } else { "cache unavailable" });
                }
                service.shutdown().await;
                Ok(())
            }
        }
    }
}

async fn connect() -> anyhow::Result<WeatherService> {
    let config = Config::load_with_env()?;
    tracing::debug!(backend = ?config.cache.backend, provider = ?config.default_provider, "Configuration loaded");
    WeatherService::from_config(&config).await
}

async fn show(service: &WeatherService, locations: &[String], repeat: u32) -> anyhow::Result<()> {
    let mut failures = 0usize;

    for location in locations {
        for _ in 0..repeat.max(1) {
            match service.get_weather(location).await {
                Ok(result) => print_json(&result)?,
                Err(err) => {
                    failures += 1;
                    print_json(&serde_json::json!({
                        "location": location,
                        "kind": kind_label(&err),
                        "error": err.to_string(),
                    }))?;
                    break;
                }
            }
        }
    }

    if failures > 0 {
        bail!("{failures} of {} lookups failed", locations.len());
    }
    Ok(())
}

fn configure(provider: &str) -> anyhow::Result<()> {
    let id = ProviderId::try_from(provider)?;
    let mut config = Config::load()?;

    if config.is_provider_configured(id) {
        let overwrite = Confirm::new(&format!("An API key for '{id}' is already stored. Replace it?"))
            .with_default(false)
            .prompt()?;
        if !overwrite {
            return Ok(());
        }
    }

    let api_key = Password::new(&format!("API key for {id}:"))
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()?;
    let api_key = api_key.trim().to_string();
    if api_key.is_empty() {
        bail!("API key must not be empty");
    }

    config.upsert_provider_api_key(id, api_key);

    let make_default = Confirm::new(&format!("Use '{id}' as the default provider?"))
        .with_default(config.default_provider_id().ok() == Some(id))
        .prompt()?;
    if make_default {
        config.set_default_provider(id);
    }

    config.save()?;
    println!(
        "Saved credentials for {id} to {}",
        Config::config_file_path()?.display()
    );
    Ok(())
}

fn validate_locations(locations: Vec<String>) -> anyhow::Result<Vec<String>> {
    if locations.iter().any(|l| l.trim().is_empty()) {
        bail!("you must specify a location");
    }
    Ok(locations)
}

fn kind_label(err: &RetrievalError) -> &'static str {
    match err.kind() {
        ErrorKind::Validation => "validation",
        ErrorKind::Configuration => "configuration",
        ErrorKind::NotFound => "not_found",
        ErrorKind::Upstream => "upstream",
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Failed to render JSON")?;
    println!("{out}");
    Ok(())
}
