//! `walletsync-recon`: Wallet transfer to ledger reconciliation engine.
//!
//! Pure engine crate: receives parsed transfers and talks to the ledger, the
//! chain and the user only through the [`Ledger`], [`TokenMetadata`] and
//! [`Prompter`] traits.
//! No HTTP or terminal dependencies.

pub mod amount;
pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod ledger;
pub mod matcher;
pub mod model;
pub mod prompt;
pub mod registry;
pub mod token;

pub use config::SyncOptions;
pub use engine::{resolve_account, run, ResolvedAccount, TransferPool};
pub use error::ReconError;
pub use ledger::{Ledger, LedgerError};
pub use model::{Account, Budget, LedgerEntry, SyncReport, TokenDetails, Transfer};
pub use prompt::{Choice, EntryDetails, ImportAction, Prompter};
pub use registry::SkipRegistry;
pub use token::{TokenError, TokenMetadata};
