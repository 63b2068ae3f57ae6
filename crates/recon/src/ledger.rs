use chrono::NaiveDate;
use thiserror::Error;

use crate::model::{Account, Budget, LedgerEntry, NewTransaction};

/// Failure talking to the ledger. Inside the reconciliation loop these are
/// logged per item and never abort the run.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger authentication failed: {0}")]
    Auth(String),
    #[error("ledger rejected request: {0}")]
    Rejected(String),
    #[error("ledger error (HTTP {status}): {message}")]
    Upstream { status: u16, message: String },
    #[error("ledger unreachable: {0}")]
    Network(String),
    #[error("unexpected ledger response: {0}")]
    Decode(String),
}

/// Budgeting ledger the reconciler reads from and writes to.
pub trait Ledger {
    fn list_budgets(&self) -> Result<Vec<Budget>, LedgerError>;

    fn list_accounts(&self, budget_id: &str) -> Result<Vec<Account>, LedgerError>;

    /// Transactions of one account dated on or after `since`.
    fn list_transactions(
        &self,
        budget_id: &str,
        account_id: &str,
        since: NaiveDate,
    ) -> Result<Vec<LedgerEntry>, LedgerError>;

    fn create_transaction(
        &self,
        budget_id: &str,
        transaction: &NewTransaction,
    ) -> Result<LedgerEntry, LedgerError>;

    /// Mark an entry cleared and append `transaction_hash` to its memo
    /// (see [`append_memo`]).
    fn settle(
        &self,
        budget_id: &str,
        entry_id: &str,
        transaction_hash: &str,
    ) -> Result<(), LedgerError>;
}

/// Hashes compare case-insensitively, as in the registry.
fn mentions_hash(memo: &str, transaction_hash: &str) -> bool {
    memo.to_ascii_lowercase().contains(&transaction_hash.to_ascii_lowercase())
}

/// Memo after settlement: the trimmed memo with the hash appended once,
/// space separated.
pub fn append_memo(existing: &str, transaction_hash: &str) -> String {
    let existing = existing.trim();
    if transaction_hash.is_empty() {
        return existing.to_string();
    }
    if existing.is_empty() {
        return transaction_hash.to_string();
    }
    if mentions_hash(existing, transaction_hash) {
        return existing.to_string();
    }
    format!("{existing} {transaction_hash}")
}

/// Memo for a newly created entry: ensures the hash is present.
pub fn memo_with_hash(memo: &str, transaction_hash: &str) -> String {
    if mentions_hash(memo, transaction_hash) {
        memo.to_string()
    } else if memo.is_empty() {
        format!("transaction hash: {transaction_hash}")
    } else {
        format!("{memo}; transaction hash: {transaction_hash}")
    }
}
