use thiserror::Error;

use crate::amount::AmountError;
use crate::export::ExportError;
use crate::ledger::LedgerError;
use crate::prompt::PromptError;
use crate::registry::RegistryError;
use crate::token::TokenError;

#[derive(Debug, Error)]
pub enum ReconError {
    /// The user aborted at a prompt.
    #[error("canceled by user")]
    Canceled,
    #[error(transparent)]
    Prompt(#[from] PromptError),
    #[error("no budgets available in the ledger")]
    NoBudgets,
    #[error("account '{name}' not found in budget '{budget_id}'")]
    AccountNotFound { budget_id: String, name: String },
    /// Ledger failure outside the per-item loop (listing, resolution).
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Amount(#[from] AmountError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Token(#[from] TokenError),
}

impl ReconError {
    pub fn is_canceled(&self) -> bool {
        matches!(self, ReconError::Canceled)
    }
}
