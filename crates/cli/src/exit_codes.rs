//! Exit codes for `wsync`.
//!
//! Scripts and cron wrappers branch on these, so codes are never reused.
//!
//! | Code  | Meaning                                         |
//! |-------|-------------------------------------------------|
//! | 0     | Success                                         |
//! | 1     | Unspecified failure; `registry check` miss      |
//! | 2     | Usage: bad arguments, missing wallet or export  |
//! | 3-9   | Input files and workflow outcomes               |
//! | 50-59 | Ledger API and JSON-RPC endpoints               |
//!
//! New codes go in the matching range and get a row in `recon_exit_code`
//! or the fetch mappers below.

use walletsync_recon::{LedgerError, ReconError, TokenError};

// =============================================================================
// Universal (0-2)
// =============================================================================

pub const EXIT_SUCCESS: u8 = 0;

/// Anything without a more specific code.
pub const EXIT_ERROR: u8 = 1;

/// Missing wallet address, export file not found, bad flags.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Sync (3-9)
// =============================================================================

/// Export, registry, or settings file could not be parsed.
pub const EXIT_INPUT_FORMAT: u8 = 3;

/// User quit at a prompt. The registry is still saved.
pub const EXIT_CANCELED: u8 = 4;

/// Configured ledger account does not exist (or no budgets at all).
pub const EXIT_ACCOUNT_NOT_FOUND: u8 = 5;

/// Registry file could not be written.
pub const EXIT_REGISTRY_WRITE: u8 = 6;

// =============================================================================
// Fetch (50-59): ledger API and JSON-RPC
// =============================================================================

/// No ledger access token (flag, keychain, or env).
pub const EXIT_FETCH_NOT_AUTH: u8 = 50;

/// Ledger refused the token (401/403).
pub const EXIT_FETCH_AUTH: u8 = 51;

/// Ledger rejected the request body (400).
pub const EXIT_FETCH_VALIDATION: u8 = 52;

/// Upstream error (other non-2xx), network failure, or undecodable body.
pub const EXIT_FETCH_UPSTREAM: u8 = 54;

/// Token contract address has no ERC-20 metadata.
pub const EXIT_TOKEN_NOT_FOUND: u8 = 57;

// =============================================================================
// Error mapping
// =============================================================================

pub fn ledger_exit_code(err: &LedgerError) -> u8 {
    match err {
        LedgerError::Auth(_) => EXIT_FETCH_AUTH,
        LedgerError::Rejected(_) => EXIT_FETCH_VALIDATION,
        LedgerError::Upstream { .. } | LedgerError::Network(_) | LedgerError::Decode(_) => {
            EXIT_FETCH_UPSTREAM
        }
    }
}

pub fn token_exit_code(err: &TokenError) -> u8 {
    match err {
        TokenError::NotFound(_) => EXIT_TOKEN_NOT_FOUND,
        _ => EXIT_FETCH_UPSTREAM,
    }
}

pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::Canceled => EXIT_CANCELED,
        ReconError::Prompt(_) => EXIT_ERROR,
        ReconError::NoBudgets | ReconError::AccountNotFound { .. } => EXIT_ACCOUNT_NOT_FOUND,
        ReconError::Ledger(e) => ledger_exit_code(e),
        ReconError::Token(e) => token_exit_code(e),
        ReconError::Export(_) | ReconError::Amount(_) | ReconError::Registry(_) => {
            EXIT_INPUT_FORMAT
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recon_errors_map_to_registry_codes() {
        assert_eq!(recon_exit_code(&ReconError::Canceled), EXIT_CANCELED);
        assert_eq!(recon_exit_code(&ReconError::NoBudgets), EXIT_ACCOUNT_NOT_FOUND);
        assert_eq!(
            recon_exit_code(&ReconError::Ledger(LedgerError::Auth("nope".into()))),
            EXIT_FETCH_AUTH
        );
        assert_eq!(
            recon_exit_code(&ReconError::Token(TokenError::NotFound("0x1".into()))),
            EXIT_TOKEN_NOT_FOUND
        );
    }
}
