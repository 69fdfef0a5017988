use std::path::PathBuf;

use clap::{Parser, Subcommand};
use raffle_core::config::{LoggingConfig, RaffleConfig};
use raffle_engine::RaffleController;
use raffle_import::{ImportFormat, decode_bytes, parse_csv};

mod interactive;

#[derive(Parser)]
#[command(
    name = "raffle-machine",
    about = "Draw raffle winners one at a time from a list of names",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an interactive raffle
    Run {
        /// Text file with one name per line to preload
        #[arg(long)]
        names: Option<PathBuf>,

        /// CSV file to preload
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Seed the random generator for a reproducible draw order
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Print the names that would be imported from a file
    Parse {
        file: PathBuf,

        /// Treat the file as plain text even if it ends in .csv
        #[arg(long)]
        text: bool,

        /// Print names as a JSON array
        #[arg(long)]
        json: bool,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Print the config file location
    Path,
    /// Get a specific config value
    Get { key: String },
    /// Set a config value and write the config file
    Set { key: String, value: String },
    /// Check the configuration for problems
    Validate,
}

fn init_logging(verbose: bool, logging: Option<&LoggingConfig>) {
    let mut directives = if verbose {
        "debug".to_string()
    } else {
        logging
            .and_then(|l| l.level.clone())
            .unwrap_or_else(|| "warn".to_string())
    };
    for filter in logging.map(|l| l.filters.as_slice()).unwrap_or_default() {
        directives.push(',');
        directives.push_str(filter);
    }

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&directives));

    if logging.is_some_and(|l| l.format == "json") {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .map(PathBuf::from)
        .unwrap_or_else(RaffleConfig::config_path);

    let loaded = RaffleConfig::load(&config_path);
    init_logging(
        cli.verbose,
        loaded.as_ref().ok().and_then(|c| c.logging.as_ref()),
    );
    let config = loaded?;

    match cli.command {
        Commands::Run { names, csv, seed } => {
            let controller = match seed {
                Some(seed) => RaffleController::with_seed(&config, seed),
                None => RaffleController::new(&config),
            };

            if let Some(path) = names {
                let bytes = raffle_import::read_file(&path).await?;
                let added = controller.add_from_text(&decode_bytes(&bytes))?;
                tracing::info!(added, path = %path.display(), "Preloaded names");
            }
            if let Some(path) = csv {
                match controller.import_csv_file(&path).await {
                    Ok(added) => tracing::info!(added, path = %path.display(), "Preloaded CSV"),
                    Err(e) => eprintln!("{e}"),
                }
            }

            interactive::run(controller).await?;
        }
        Commands::Parse { file, text, json } => {
            let content = decode_bytes(&raffle_import::read_file(&file).await?);
            let format = if text {
                ImportFormat::Text
            } else {
                ImportFormat::from_path(&file)
            };

            let names = match format {
                ImportFormat::Csv => {
                    let import = parse_csv(&content);
                    eprintln!(
                        "{} ({} rows{})",
                        import.feedback().message,
                        import.rows,
                        if import.header_skipped { ", header skipped" } else { "" }
                    );
                    import.names
                }
                ImportFormat::Text => format.parse(&content),
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&names)?);
            } else {
                for name in &names {
                    println!("{name}");
                }
            }
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let json = serde_json::to_string_pretty(&config)?;
                println!("{json}");
            }
            ConfigAction::Path => {
                println!("{}", config_path.display());
            }
            ConfigAction::Get { key } => match config.get_path(&key) {
                Some(value) => println!("{value}"),
                None => anyhow::bail!("No config value at '{key}'"),
            },
            ConfigAction::Set { key, value } => {
                let mut config = config;
                let parsed = serde_json::from_str(&value)
                    .unwrap_or_else(|_| serde_json::Value::String(value.clone()));
                config.set_path(&key, parsed)?;
                config.save(&config_path)?;
                tracing::info!(key = %key, path = %config_path.display(), "Config updated");
                println!("{key} = {}", config.get_path(&key).unwrap_or_default());
            }
            ConfigAction::Validate => {
                let (warnings, errors) = config.validate();
                for w in &warnings {
                    println!("warning: {w}");
                }
                for e in &errors {
                    println!("error: {e}");
                }
                if !errors.is_empty() {
                    anyhow::bail!("{} config error(s)", errors.len());
                }
                println!(
                    "Config OK: {} ticks every {}ms ({:.1}s per draw)",
                    config.tick_count(),
                    config.tick_interval().as_millis(),
                    config.draw_duration().as_secs_f64()
                );
            }
        },
    }

    Ok(())
}
