// walletsync CLI - reconcile on-chain token transfers against a budgeting ledger

mod config;
mod exit_codes;
mod fetch;
mod prompt;
mod registry;
mod sync;
mod transfers;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use walletsync_config::Settings;

use exit_codes::{EXIT_CANCELED, EXIT_INPUT_FORMAT, EXIT_SUCCESS};

#[derive(Parser)]
#[command(name = "wsync")]
#[command(about = "Reconcile wallet token transfers against a budgeting ledger")]
#[command(version, long_version = long_version())]
struct Cli {
    /// Settings file (default: <config dir>/walletsync/config.toml)
    #[arg(long, global = true, env = "WALLETSYNC_CONFIG")]
    config: Option<PathBuf>,

    /// Skip/processed registry file (default: registry_path from config)
    #[arg(long, global = true)]
    registry: Option<PathBuf>,

    /// Verbose logging (RUST_LOG overrides)
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Settle ledger entries with matching transfers and import the rest
    Sync(sync::SyncArgs),

    /// Parse an export and list its transfers
    Transfers(transfers::TransfersArgs),

    /// Inspect or edit the skip/processed registry
    #[command(subcommand)]
    Registry(registry::RegistryCommands),

    /// Settings file and stored credentials
    #[command(subcommand)]
    Config(config::ConfigCommands),
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nengine:  walletsync-recon ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("TARGET"),
    )
}

fn init_tracing(debug: bool) {
    let default = if debug {
        "info,wsync=debug,walletsync_recon=debug,walletsync_config=debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn run(cli: Cli) -> Result<(), CliError> {
    let settings_path = cli.config.clone().unwrap_or_else(Settings::config_path);
    let settings = Settings::load_from(&settings_path).map_err(|e| CliError {
        code: EXIT_INPUT_FORMAT,
        message: e.to_string(),
        hint: None,
    })?;
    let registry_path = cli.registry.clone().unwrap_or_else(|| settings.registry_path.clone());

    match cli.command {
        Commands::Sync(args) => sync::cmd_sync(args, &settings, &registry_path),
        Commands::Transfers(args) => transfers::cmd_transfers(args, &settings),
        Commands::Registry(cmd) => registry::cmd_registry(cmd, &registry_path),
        Commands::Config(cmd) => config::cmd_config(cmd, &settings, &settings_path),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    match run(cli) {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if code == EXIT_CANCELED {
                eprintln!("{}", message);
            } else if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}
