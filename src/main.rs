use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use vesrates::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for vesrates::AppCommand {
    fn from(cmd: Commands) -> vesrates::AppCommand {
        match cmd {
            Commands::Fetch => vesrates::AppCommand::Fetch,
            Commands::Show => vesrates::AppCommand::Show,
            Commands::Watch => vesrates::AppCommand::Watch,
            Commands::Setup | Commands::Key(_) => {
                unreachable!("Handled before command dispatch")
            }
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Run one fetch cycle and display the latest rates
    Fetch,
    /// Display the last stored rates without fetching
    Show,
    /// Fetch periodically and redraw on every update
    Watch,
    /// Manage the CoinMarketCap API key
    #[command(subcommand)]
    Key(KeyCommand),
}

#[derive(Subcommand)]
enum KeyCommand {
    /// Store the API key in the system keyring
    Set { api_key: String },
    /// Remove the stored API key
    Clear,
    /// Report whether an API key is stored
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => setup(),
        Some(Commands::Key(cmd)) => key(cmd),
        Some(cmd) => vesrates::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}

fn setup() -> anyhow::Result<()> {
    use anyhow::Context;

    let path = vesrates::config::AppConfig::default_config_path()?;

    if path.exists() {
        anyhow::bail!("Configuration file already exists at {}", path.display());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let default_config = r#"---
providers:
  bcv:
    base_url: "https://www.bcv.org.ve"
  binance:
    base_url: "https://p2p.binance.com"
  coinmarketcap:
    base_url: "https://pro-api.coinmarketcap.com"

fetch_interval_minutes: 15
"#;

    std::fs::write(&path, default_config)
        .with_context(|| format!("Failed to write config file to {}", path.display()))?;

    tracing::info!("Created default configuration at {}", path.display());
    Ok(())
}

fn key(cmd: KeyCommand) -> Result<()> {
    use vesrates::credentials::{CredentialStore, KeyringStore};

    let store = KeyringStore;
    match cmd {
        KeyCommand::Set { api_key } => {
            let api_key = api_key.trim();
            if api_key.is_empty() {
                anyhow::bail!("API key must not be empty");
            }
            store.set_api_key(api_key)?;
            println!("API key saved.");
        }
        KeyCommand::Clear => {
            store.clear_api_key()?;
            println!("API key cleared.");
        }
        KeyCommand::Status => match store.api_key() {
            Some(_) => println!("API key is set."),
            None => println!("No API key set. The satoshi rate will be skipped."),
        },
    }
    Ok(())
}
