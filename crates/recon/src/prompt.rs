use thiserror::Error;

use crate::model::{Budget, LedgerEntry, TokenDetails, Transfer};

/// Outcome of an interactive decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Choice<T> {
    Selected(T),
    /// Leave this item for a later run.
    Skip,
    /// Abort the whole run.
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportAction {
    /// Create a new ledger entry for the transfer.
    Create,
    /// Never offer this transfer again.
    Ignore,
}

/// Payee and memo for a ledger entry about to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryDetails {
    pub payee: String,
    pub memo: String,
}

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("prompt I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("no interactive terminal available for prompt: {0}")]
    NotInteractive(String),
}

/// Source of user decisions during a run.
pub trait Prompter {
    fn select_budget(&mut self, budgets: &[Budget]) -> Result<Choice<usize>, PromptError>;

    /// Pick which of `candidates` settles `entry`. The index is into `candidates`.
    fn disambiguate(
        &mut self,
        entry: &LedgerEntry,
        candidates: &[&Transfer],
        token: &TokenDetails,
    ) -> Result<Choice<usize>, PromptError>;

    fn import_action(
        &mut self,
        transfer: &Transfer,
        wallet: &str,
        token: &TokenDetails,
    ) -> Result<Choice<ImportAction>, PromptError>;

    /// Confirm or edit payee and memo. `defaults` carries the suggested values.
    fn entry_details(
        &mut self,
        transfer: &Transfer,
        defaults: EntryDetails,
    ) -> Result<Choice<EntryDetails>, PromptError>;
}
