//! `wsync transfers`: preview how an export parses.

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use walletsync_config::Settings;
use walletsync_recon::amount::{dust_threshold, format_base_units};
use walletsync_recon::export::load_transfers_from_path;
use walletsync_recon::model::Direction;
use walletsync_recon::token::require_token;
use walletsync_recon::{TokenDetails, Transfer};

use crate::exit_codes::{token_exit_code, EXIT_ERROR, EXIT_INPUT_FORMAT, EXIT_USAGE};
use crate::fetch::token::TokenClient;
use crate::CliError;

#[derive(Args)]
#[command(after_help = "\
Examples:
  wsync transfers export.csv --decimals 6
  wsync transfers export.csv --wallet-address 0xabc... --json")]
pub struct TransfersArgs {
    /// Token transfer export (CSV)
    pub csv_file: PathBuf,

    /// Token decimals; skips the RPC metadata lookup
    #[arg(long)]
    pub decimals: Option<u8>,

    /// ERC-20 contract address (default: from config)
    #[arg(long)]
    pub token_address: Option<String>,

    /// JSON-RPC endpoint for token metadata
    #[arg(long)]
    pub rpc_url: Option<String>,

    /// Show direction relative to this wallet
    #[arg(long)]
    pub wallet_address: Option<String>,

    /// Output JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct TransferRow<'a> {
    transaction_hash: &'a str,
    execution_time: String,
    from: &'a str,
    to: &'a str,
    amount: String,
    base_units: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    direction: Option<Direction>,
    below_dust: bool,
}

fn row<'a>(t: &'a Transfer, token: &TokenDetails, wallet: Option<&str>) -> TransferRow<'a> {
    let dust = dust_threshold(token.decimals);
    TransferRow {
        transaction_hash: &t.transaction_hash,
        execution_time: t.execution_time.format("%Y-%m-%d %H:%M:%S").to_string(),
        from: &t.from_address,
        to: &t.to_address,
        amount: format_base_units(t.amount.as_ref(), token.decimals),
        base_units: t.amount.map(|a| a.to_string()).unwrap_or_default(),
        direction: wallet.and_then(|w| t.direction(w)),
        below_dust: t.amount.map_or(true, |a| a < dust),
    }
}

pub fn cmd_transfers(args: TransfersArgs, settings: &Settings) -> Result<(), CliError> {
    if !args.csv_file.is_file() {
        return Err(CliError {
            code: EXIT_USAGE,
            message: format!("export not found: {}", args.csv_file.display()),
            hint: None,
        });
    }

    let token = match args.decimals {
        Some(decimals) => TokenDetails {
            decimals,
            name: args.token_address.clone().unwrap_or_else(|| settings.token_address.clone()),
        },
        None => {
            let rpc_url = args.rpc_url.clone().unwrap_or_else(|| settings.rpc_url.clone());
            let address = args.token_address.as_deref().unwrap_or(&settings.token_address);
            let client = TokenClient::new(rpc_url)
                .map_err(|e| CliError { code: token_exit_code(&e), message: e.to_string(), hint: None })?;
            require_token(&client, address).map_err(|e| CliError {
                code: token_exit_code(&e),
                message: e.to_string(),
                hint: Some("pass --decimals to skip the lookup".into()),
            })?
        }
    };

    let transfers = load_transfers_from_path(&args.csv_file, &token).map_err(|e| CliError {
        code: EXIT_INPUT_FORMAT,
        message: format!("{}: {e}", args.csv_file.display()),
        hint: None,
    })?;
    let wallet = args.wallet_address.as_deref().or(settings.wallet_address.as_deref());
    let rows: Vec<TransferRow> = transfers.iter().map(|t| row(t, &token, wallet)).collect();

    if args.json {
        let out = serde_json::to_string_pretty(&rows)
            .map_err(|e| CliError { code: EXIT_ERROR, message: e.to_string(), hint: None })?;
        println!("{out}");
        return Ok(());
    }

    for r in &rows {
        let direction = match r.direction {
            Some(Direction::Outbound) => "out",
            Some(Direction::Inbound) => "in ",
            None => "   ",
        };
        println!(
            "{}  {}  {:>18}  {} -> {}  {}{}",
            r.execution_time,
            direction,
            r.amount,
            r.from,
            r.to,
            r.transaction_hash,
            if r.below_dust { "  (dust)" } else { "" },
        );
    }
    eprintln!("{} transfers, {} decimals ({})", rows.len(), token.decimals, token.name);
    Ok(())
}
