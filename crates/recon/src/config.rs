use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::TokenDetails;

/// Days of ledger history fetched when looking for unsettled entries.
pub const DEFAULT_LOOKBACK_DAYS: u32 = 7;

/// Parameters for a single reconciliation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOptions {
    pub wallet_address: String,
    pub token: TokenDetails,
    pub budget_id: String,
    pub account_id: String,
    /// "Today" for the lookback window; injected so runs are reproducible.
    pub today: NaiveDate,
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,
    /// Log what would happen; no ledger writes, no registry additions, no prompts to import.
    #[serde(default)]
    pub dry_run: bool,
    /// Drop transfers already in the registry before matching.
    #[serde(default = "default_true")]
    pub exclude_registered: bool,
}

fn default_lookback_days() -> u32 {
    DEFAULT_LOOKBACK_DAYS
}

fn default_true() -> bool {
    true
}

impl SyncOptions {
    pub fn new(
        wallet_address: impl Into<String>,
        token: TokenDetails,
        budget_id: impl Into<String>,
        account_id: impl Into<String>,
        today: NaiveDate,
    ) -> Self {
        SyncOptions {
            wallet_address: wallet_address.into(),
            token,
            budget_id: budget_id.into(),
            account_id: account_id.into(),
            today,
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            dry_run: false,
            exclude_registered: true,
        }
    }

    pub fn since(&self) -> NaiveDate {
        self.today - chrono::Duration::days(self.lookback_days as i64)
    }
}
