//! `wsync registry`: inspect and edit the skip/processed registry file.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use clap::Subcommand;
use walletsync_recon::SkipRegistry;

use crate::exit_codes::{EXIT_ERROR, EXIT_INPUT_FORMAT, EXIT_REGISTRY_WRITE};
use crate::CliError;

#[derive(Subcommand)]
pub enum RegistryCommands {
    /// List registered transaction hashes
    #[command(after_help = "\
Examples:
  wsync registry list
  wsync registry list --json")]
    List {
        /// Output JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Mark transaction hashes as permanently ignored
    #[command(after_help = "\
Examples:
  wsync registry ignore 0x5f2c...e1 0x99ab...07")]
    Ignore {
        /// Transaction hashes
        #[arg(required = true)]
        hashes: Vec<String>,
    },

    /// Exit 0 if the hash is registered, 1 otherwise
    Check {
        hash: String,
    },
}

/// Load the registry, treating a missing file as empty.
pub fn load_registry(path: &Path) -> Result<SkipRegistry, CliError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no registry file yet");
            return Ok(SkipRegistry::new());
        }
        Err(e) => {
            return Err(CliError {
                code: EXIT_ERROR,
                message: format!("cannot read registry {}: {e}", path.display()),
                hint: None,
            })
        }
    };
    SkipRegistry::from_toml(&text).map_err(|e| CliError {
        code: EXIT_INPUT_FORMAT,
        message: format!("{}: {e}", path.display()),
        hint: Some("fix or remove the file; it is plain TOML".into()),
    })
}

/// Write the registry via a sibling temp file and rename.
pub fn save_registry(path: &Path, registry: &SkipRegistry) -> Result<(), CliError> {
    let write_err = |e: String| CliError {
        code: EXIT_REGISTRY_WRITE,
        message: format!("cannot write registry {}: {e}", path.display()),
        hint: None,
    };
    let text = registry.to_toml().map_err(|e| write_err(e.to_string()))?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, text).map_err(|e| write_err(e.to_string()))?;
    fs::rename(&tmp, path).map_err(|e| write_err(e.to_string()))?;
    tracing::debug!(path = %path.display(), entries = registry.len(), "registry saved");
    Ok(())
}

pub fn cmd_registry(cmd: RegistryCommands, path: &Path) -> Result<(), CliError> {
    match cmd {
        RegistryCommands::List { json } => cmd_registry_list(path, json),
        RegistryCommands::Ignore { hashes } => cmd_registry_ignore(path, &hashes),
        RegistryCommands::Check { hash } => cmd_registry_check(path, &hash),
    }
}

fn cmd_registry_list(path: &Path, json: bool) -> Result<(), CliError> {
    let registry = load_registry(path)?;
    if json {
        let entries: Vec<serde_json::Value> = registry
            .entries()
            .iter()
            .map(|e| serde_json::json!({ "hash": e.hash, "reason": e.reason }))
            .collect();
        let out = serde_json::to_string_pretty(&entries).map_err(|e| CliError {
            code: EXIT_ERROR,
            message: e.to_string(),
            hint: None,
        })?;
        println!("{out}");
        return Ok(());
    }

    if registry.is_empty() {
        eprintln!("registry {} is empty", path.display());
        return Ok(());
    }
    for entry in registry.entries() {
        println!("{}  {}", entry.hash, entry.reason);
    }
    Ok(())
}

fn cmd_registry_ignore(path: &Path, hashes: &[String]) -> Result<(), CliError> {
    let mut registry = load_registry(path)?;
    for hash in hashes {
        if registry.add_ignored(hash) {
            eprintln!("ignored {hash}");
        } else {
            eprintln!("{hash} already registered");
        }
    }
    save_registry(path, &registry)
}

fn cmd_registry_check(path: &Path, hash: &str) -> Result<(), CliError> {
    let registry = load_registry(path)?;
    match registry.get(hash) {
        Some(entry) => {
            println!("{}", entry.reason);
            Ok(())
        }
        None => Err(CliError { code: EXIT_ERROR, message: String::new(), hint: None }),
    }
}
