//! `wsync sync`: reconcile a wallet export against the ledger.

use std::path::{Path, PathBuf};

use chrono::Local;
use clap::Args;

use walletsync_config::Settings;
use walletsync_recon::export::load_transfers_from_path;
use walletsync_recon::token::require_token;
use walletsync_recon::{resolve_account, Prompter, SyncOptions, SyncReport, TokenDetails};

use crate::exit_codes::{
    ledger_exit_code, recon_exit_code, token_exit_code, EXIT_CANCELED, EXIT_ERROR,
    EXIT_FETCH_NOT_AUTH, EXIT_INPUT_FORMAT, EXIT_USAGE,
};
use crate::fetch::ledger::LedgerClient;
use crate::fetch::token::TokenClient;
use crate::prompt::{TerminalPrompter, UnattendedPrompter};
use crate::registry::{load_registry, save_registry};
use crate::CliError;

#[derive(Args)]
#[command(after_help = "\
Examples:
  wsync sync --csv-file export-token-0xabc.csv
  wsync sync --csv-file export.csv --wallet-address 0xabc... --dry-run
  wsync sync --csv-file export.csv --unattended --json > report.json
  WALLETSYNC_ACCESS_TOKEN=... wsync sync --csv-file export.csv")]
pub struct SyncArgs {
    /// Token transfer export (CSV) from the block explorer
    #[arg(long, short = 'f')]
    pub csv_file: PathBuf,

    /// Wallet to reconcile (default: wallet_address from config)
    #[arg(long)]
    pub wallet_address: Option<String>,

    /// ERC-20 contract address (default: USDC on Base)
    #[arg(long)]
    pub token_address: Option<String>,

    /// Token decimals; skips the RPC metadata lookup
    #[arg(long)]
    pub decimals: Option<u8>,

    /// JSON-RPC endpoint for token metadata
    #[arg(long)]
    pub rpc_url: Option<String>,

    /// Ledger API base URL
    #[arg(long)]
    pub ledger_url: Option<String>,

    /// Ledger access token (default: keychain, then WALLETSYNC_ACCESS_TOKEN)
    #[arg(long)]
    pub access_token: Option<String>,

    /// Ledger account holding the token
    #[arg(long)]
    pub account_name: Option<String>,

    /// Ledger budget id (default: prompt when several exist)
    #[arg(long)]
    pub budget_id: Option<String>,

    /// Days of ledger history to examine
    #[arg(long)]
    pub lookback_days: Option<u32>,

    /// Report what would change without writing to the ledger or registry
    #[arg(long)]
    pub dry_run: bool,

    /// Also match transfers already in the registry
    #[arg(long)]
    pub include_registered: bool,

    /// Never prompt: settle unique matches, skip everything else
    #[arg(long)]
    pub unattended: bool,

    /// Output the JSON report to stdout
    #[arg(long)]
    pub json: bool,

    /// Write the JSON report to file
    #[arg(long)]
    pub output: Option<PathBuf>,
}

fn sync_err(code: u8, msg: impl Into<String>) -> CliError {
    CliError { code, message: msg.into(), hint: None }
}

pub fn cmd_sync(args: SyncArgs, settings: &Settings, registry_path: &Path) -> Result<(), CliError> {
    let wallet = args
        .wallet_address
        .clone()
        .or_else(|| settings.wallet_address.clone())
        .filter(|w| !w.trim().is_empty())
        .ok_or_else(|| CliError {
            code: EXIT_USAGE,
            message: "missing wallet address".into(),
            hint: Some("pass --wallet-address or set wallet_address in config.toml".into()),
        })?;

    if !args.csv_file.is_file() {
        return Err(sync_err(
            EXIT_USAGE,
            format!("export not found: {}", args.csv_file.display()),
        ));
    }

    let mut registry = load_registry(registry_path)?;

    let lookup = walletsync_config::get_access_token(args.access_token.as_deref());
    let Some(access_token) = lookup.key else {
        return Err(CliError {
            code: EXIT_FETCH_NOT_AUTH,
            message: "missing ledger access token".into(),
            hint: Some(format!(
                "pass --access-token, run `wsync config set-token`, or set {}",
                walletsync_config::credentials::ACCESS_TOKEN_ENV
            )),
        });
    };
    tracing::debug!(source = lookup.source.as_str(), "ledger access token");

    let token_address = args.token_address.as_deref().unwrap_or(&settings.token_address);
    let rpc_url = args.rpc_url.as_deref().unwrap_or(&settings.rpc_url);
    let token = resolve_token(args.decimals, token_address, rpc_url)?;

    let transfers = load_transfers_from_path(&args.csv_file, &token)
        .map_err(|e| sync_err(EXIT_INPUT_FORMAT, format!("{}: {e}", args.csv_file.display())))?;
    tracing::info!(count = transfers.len(), token = %token.name, "loaded transfers");

    let ledger_url = args.ledger_url.clone().unwrap_or_else(|| settings.ledger_api_url.clone());
    let ledger = LedgerClient::with_base_url(access_token, ledger_url)
        .map_err(|e| sync_err(ledger_exit_code(&e), e.to_string()))?;

    let interactive = !args.unattended && atty::is(atty::Stream::Stdin);
    let mut prompter: Box<dyn Prompter> = if interactive {
        Box::new(TerminalPrompter::stdio())
    } else {
        tracing::debug!("stdin is not interactive; prompts will be skipped");
        Box::new(UnattendedPrompter)
    };

    let budget_id = args.budget_id.clone().or_else(|| settings.budget_id.clone());
    let account_name = args.account_name.clone().unwrap_or_else(|| settings.account_name.clone());
    let resolved = resolve_account(&ledger, prompter.as_mut(), budget_id.as_deref(), &account_name)
        .map_err(|e| sync_err(recon_exit_code(&e), e.to_string()))?;

    let mut options = SyncOptions::new(
        wallet,
        token,
        resolved.budget.id,
        resolved.account.id,
        Local::now().date_naive(),
    );
    options.lookback_days = args.lookback_days.unwrap_or(settings.lookback_days);
    options.dry_run = args.dry_run;
    options.exclude_registered = !args.include_registered;

    let outcome = walletsync_recon::run(&ledger, prompter.as_mut(), &mut registry, transfers, &options);

    // Persist progress even when the run was canceled or failed.
    if !options.dry_run {
        if let Err(save_err) = save_registry(registry_path, &registry) {
            if outcome.is_ok() {
                return Err(save_err);
            }
            tracing::error!(error = %save_err.message, "registry not saved");
        }
    }

    let report = match outcome {
        Ok(report) => report,
        Err(e) if e.is_canceled() => {
            return Err(CliError {
                code: EXIT_CANCELED,
                message: "canceled".into(),
                hint: (!options.dry_run)
                    .then(|| format!("progress so far was saved to {}", registry_path.display())),
            });
        }
        Err(e) => return Err(sync_err(recon_exit_code(&e), e.to_string())),
    };

    write_report(&report, args.json, args.output.as_deref())?;
    print_summary(&report, &account_name);
    Ok(())
}

fn resolve_token(
    decimals: Option<u8>,
    token_address: &str,
    rpc_url: &str,
) -> Result<TokenDetails, CliError> {
    if let Some(decimals) = decimals {
        return Ok(TokenDetails { decimals, name: token_address.to_string() });
    }
    let client = TokenClient::new(rpc_url.to_string())
        .map_err(|e| sync_err(token_exit_code(&e), e.to_string()))?;
    require_token(&client, token_address).map_err(|e| CliError {
        code: token_exit_code(&e),
        message: e.to_string(),
        hint: Some(format!("check --token-address and --rpc-url ({rpc_url})")),
    })
}

fn write_report(report: &SyncReport, json: bool, output: Option<&Path>) -> Result<(), CliError> {
    if !json && output.is_none() {
        return Ok(());
    }
    let json_str = serde_json::to_string_pretty(report)
        .map_err(|e| sync_err(EXIT_ERROR, format!("JSON serialization error: {e}")))?;

    if let Some(path) = output {
        std::fs::write(path, &json_str)
            .map_err(|e| sync_err(EXIT_ERROR, format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }
    if json {
        println!("{json_str}");
    }
    Ok(())
}

fn print_summary(report: &SyncReport, account_name: &str) {
    let prefix = if report.dry_run { "dry run: " } else { "" };
    eprintln!(
        "{prefix}{account_name}: {} entries examined, {} matched, {} unmatched, {} ambiguous skipped",
        report.entries_examined, report.matched, report.unmatched, report.ambiguous_skipped,
    );
    eprintln!(
        "transfers: {} loaded, {} already registered, {} created, {} ignored, {} skipped, {} below dust, {} unrelated",
        report.transfers_loaded,
        report.excluded_registered,
        report.created,
        report.ignored,
        report.skipped,
        report.below_dust,
        report.unrelated,
    );
    if report.settle_failures + report.create_failures > 0 {
        eprintln!(
            "failures: {} settle, {} create (see log above)",
            report.settle_failures, report.create_failures,
        );
    }
}
