//! `wsync config`: settings file and stored credentials.

use std::io::{self, BufRead, Write};
use std::path::Path;

use clap::Subcommand;

use walletsync_config::credentials::{delete_access_token, set_access_token};
use walletsync_config::Settings;

use crate::exit_codes::{EXIT_ERROR, EXIT_USAGE};
use crate::CliError;

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the settings file location
    Path,

    /// Print the effective settings as TOML
    Show,

    /// Write the effective settings to the settings file
    Init,

    /// Store the ledger access token in the system keychain (read from stdin)
    SetToken,

    /// Remove the ledger access token from the system keychain
    ClearToken,
}

fn config_err(msg: impl Into<String>) -> CliError {
    CliError { code: EXIT_ERROR, message: msg.into(), hint: None }
}

pub fn cmd_config(cmd: ConfigCommands, settings: &Settings, path: &Path) -> Result<(), CliError> {
    match cmd {
        ConfigCommands::Path => {
            println!("{}", path.display());
            Ok(())
        }
        ConfigCommands::Show => {
            let text = settings.to_toml().map_err(|e| config_err(e.to_string()))?;
            print!("{text}");
            Ok(())
        }
        ConfigCommands::Init => {
            if path.exists() {
                return Err(CliError {
                    code: EXIT_USAGE,
                    message: format!("{} already exists", path.display()),
                    hint: Some("edit it directly or remove it first".into()),
                });
            }
            settings.save_to(path).map_err(|e| config_err(e.to_string()))?;
            eprintln!("wrote {}", path.display());
            Ok(())
        }
        ConfigCommands::SetToken => {
            if atty::is(atty::Stream::Stdin) {
                eprint!("Ledger access token: ");
                io::stderr().flush().ok();
            }
            let mut token = String::new();
            io::stdin()
                .lock()
                .read_line(&mut token)
                .map_err(|e| config_err(format!("failed to read token: {e}")))?;
            let token = token.trim();
            if token.is_empty() {
                return Err(CliError { code: EXIT_USAGE, message: "empty token".into(), hint: None });
            }
            set_access_token(token).map_err(config_err)?;
            eprintln!("token stored in keychain");
            Ok(())
        }
        ConfigCommands::ClearToken => {
            delete_access_token().map_err(config_err)?;
            eprintln!("token removed from keychain");
            Ok(())
        }
    }
}
