use anyhow::{Context, Result};
use capbridge::config::{Config, EnvironmentOverrides};
use capbridge::startup::StartupLogger;
use capbridge::ServiceContainer;
use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = env!("CARGO_PKG_NAME"))]
#[command(about = "Expose service-client libraries as a catalog of callable tools")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = capbridge::DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Discover all configured providers and print the summary
    Discover,
    /// List the registered catalog keys
    List {
        /// Only show keys starting with this prefix
        #[arg(short, long)]
        prefix: Option<String>,
        /// Print full adapter records as JSON
        #[arg(long)]
        json: bool,
    },
    /// Invoke one adapter by catalog key
    Invoke {
        /// Catalog key to invoke
        key: String,
        /// Arguments as a JSON object
        #[arg(short, long, default_value = "{}")]
        args: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // .env may carry the config path, so it is loaded before the overrides are read
    Config::load_env_files();
    let overrides = EnvironmentOverrides::load()?;
    let config_path = overrides.get_config_path(&cli.config);

    let (level, format) = logging_settings(&cli.log_level, &config_path);
    init_logging(&level, &format)?;

    let config = Config::load(&config_path)?;

    StartupLogger::display_startup_info(&config, &config_path, &overrides, capbridge::VERSION);

    let container = ServiceContainer::from_config(config)?;
    let report = container.discover(Vec::new()).await;
    StartupLogger::display_discovery_report(&report);

    match cli.command.unwrap_or(Command::Discover) {
        Command::Discover => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::List { prefix, json } => {
            let entries = container.registry().list(prefix.as_deref());
            if json {
                let records: Vec<_> = entries
                    .iter()
                    .filter_map(|entry| container.registry().get(&entry.catalog_key))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                for entry in entries {
                    println!("{}\t{}", entry.catalog_key, entry.summary);
                }
            }
        }
        Command::Invoke { key, args } => {
            let args = parse_arguments(&args)?;
            info!("Invoking '{}'", key);
            let output = container.registry().invoke(&key, args).await;
            println!("{}", output);
        }
    }

    container.shutdown();

    if !report.failed_providers().is_empty() {
        error!("{} providers failed discovery", report.failed_providers().len());
    }
    Ok(())
}

/// `--log-level` wins unless left at its default; the format comes from the config file
fn logging_settings(cli_level: &str, config_path: &Path) -> (String, String) {
    let logging = Config::from_file(config_path)
        .ok()
        .and_then(|config| config.logging)
        .unwrap_or_default();
    let level = if cli_level == "info" { logging.level } else { cli_level.to_string() };
    (level, logging.format)
}

fn parse_arguments(raw: &str) -> Result<Map<String, Value>> {
    let value: Value = serde_json::from_str(raw).context("--args must be valid JSON")?;
    match value {
        Value::Object(map) => Ok(map),
        other => anyhow::bail!("--args must be a JSON object, got {}", other),
    }
}

fn init_logging(level: &str, format: &str) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    // Logs go to stderr so command output stays clean on stdout
    if format.eq_ignore_ascii_case("json") {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_writer(std::io::stderr),
            )
            .with(env_filter)
            .init();
    }

    Ok(())
}
