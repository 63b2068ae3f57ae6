use alloy_primitives::U256;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Transfers
// ---------------------------------------------------------------------------

/// One token movement parsed from a wallet export row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub from_address: String,
    pub to_address: String,
    /// Base units. `None` never matches a ledger entry.
    pub amount: Option<U256>,
    pub execution_time: DateTime<Utc>,
    pub transaction_hash: String,
}

/// Direction of a transfer relative to the reconciled wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Inbound,
    Outbound,
}

impl Direction {
    pub fn is_outbound(self) -> bool {
        self == Direction::Outbound
    }
}

impl Transfer {
    /// Direction relative to `wallet`, or None when the wallet is on neither side.
    /// A self-transfer counts as outbound.
    pub fn direction(&self, wallet: &str) -> Option<Direction> {
        if self.from_address.eq_ignore_ascii_case(wallet) {
            Some(Direction::Outbound)
        } else if self.to_address.eq_ignore_ascii_case(wallet) {
            Some(Direction::Inbound)
        } else {
            None
        }
    }

    /// The address on the other side of the transfer from `wallet`.
    pub fn counterparty(&self, wallet: &str) -> &str {
        match self.direction(wallet) {
            Some(Direction::Inbound) => &self.from_address,
            _ => &self.to_address,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenDetails {
    pub decimals: u8,
    pub name: String,
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// A ledger transaction. Amounts are milliunits; negative is outflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: String,
    pub amount: i64,
    pub date: NaiveDate,
    #[serde(default)]
    pub payee: String,
    #[serde(default)]
    pub memo: String,
    pub cleared: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Budget {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub closed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClearedStatus {
    Cleared,
    Uncleared,
    Reconciled,
}

impl ClearedStatus {
    /// Anything other than `uncleared` counts as settled.
    pub fn is_cleared(self) -> bool {
        self != ClearedStatus::Uncleared
    }
}

/// Body of a create-transaction request. Absent fields are omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub account_id: String,
    pub date: NaiveDate,
    pub amount: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payee_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flag_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleared: Option<ClearedStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved: Option<bool>,
}

// ---------------------------------------------------------------------------
// Run summary
// ---------------------------------------------------------------------------

/// Counters for one reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub budget_id: String,
    pub account_id: String,
    pub dry_run: bool,
    pub transfers_loaded: usize,
    pub excluded_registered: usize,
    pub entries_examined: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub ambiguous_skipped: usize,
    pub settle_failures: usize,
    pub created: usize,
    pub create_failures: usize,
    pub ignored: usize,
    pub skipped: usize,
    pub below_dust: usize,
    pub unrelated: usize,
    /// Hashes settled against an existing entry, in processing order.
    pub settled_hashes: Vec<String>,
}
