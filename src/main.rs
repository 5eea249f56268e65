use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// Use library instead of local modules
use simple_banking::{
    accounts_json, card_number_report, is_valid, AccountStore, BankingService, Config, Console,
};

/// Simple Banking System - card accounts on a local SQLite file
#[derive(Parser)]
#[command(name = "simple-banking")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database file path (overrides the config file)
    #[arg(long, env = "BANKING_DB", global = true)]
    db: Option<PathBuf>,

    /// JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive console (default)
    Run,

    /// Check a card number against the Luhn checksum
    Check {
        /// 16-digit card number
        number: String,
    },

    /// Print stored accounts as JSON (PINs omitted)
    Accounts,
}

fn main() -> Result<()> {
    // Logs go to stderr; stdout belongs to the menu
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Run) {
        Command::Check { number } => {
            println!("{}", card_number_report(&number));
            if !is_valid(&number) {
                std::process::exit(1);
            }
            Ok(())
        }
        Command::Accounts => {
            let config = Config::load(cli.config.as_deref(), cli.db)?;
            let store = open_store(&config)?;
            println!("{}", accounts_json(&store)?);
            Ok(())
        }
        Command::Run => {
            let config = Config::load(cli.config.as_deref(), cli.db)?;
            run_console(&config)
        }
    }
}

fn open_store(config: &Config) -> Result<AccountStore> {
    AccountStore::open(&config.database)
        .with_context(|| format!("Failed to open database {}", config.database.display()))
}

fn run_console(config: &Config) -> Result<()> {
    let mut store = open_store(config)?;
    let service = BankingService::new(config.issuer());

    let stdin = io::stdin();
    let stdout = io::stdout();
    Console::new(&mut store, service, stdin.lock(), stdout.lock()).run()
}
