//! Ledger adapter: YNAB-style budgeting API (v1).
//!
//! Endpoints used:
//! - `GET  /budgets`
//! - `GET  /budgets/{budget}/accounts`
//! - `GET  /budgets/{budget}/accounts/{account}/transactions?since_date=YYYY-MM-DD`
//! - `GET  /budgets/{budget}/transactions/{id}`
//! - `PUT  /budgets/{budget}/transactions/{id}`
//! - `POST /budgets/{budget}/transactions`
//!
//! Every response is wrapped in `{"data": {...}}`. Amounts are milliunits.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use walletsync_recon::ledger::append_memo;
use walletsync_recon::model::{ClearedStatus, NewTransaction};
use walletsync_recon::{Account, Budget, Ledger, LedgerEntry, LedgerError};

use super::common::FetchClient;

pub const LEDGER_API_BASE: &str = "https://api.ynab.com/v1";

// ── Wire types ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct BudgetsData {
    budgets: Vec<Budget>,
}

#[derive(Debug, Deserialize)]
struct AccountsData {
    accounts: Vec<WireAccount>,
}

#[derive(Debug, Deserialize)]
struct WireAccount {
    id: String,
    name: String,
    #[serde(default)]
    closed: bool,
    #[serde(default)]
    deleted: bool,
}

#[derive(Debug, Deserialize)]
struct TransactionsData {
    transactions: Vec<WireTransaction>,
}

#[derive(Debug, Deserialize)]
struct TransactionData {
    transaction: WireTransaction,
}

#[derive(Debug, Deserialize)]
struct WireTransaction {
    id: String,
    date: NaiveDate,
    amount: i64,
    #[serde(default)]
    payee_name: Option<String>,
    #[serde(default)]
    memo: Option<String>,
    cleared: ClearedStatus,
    #[serde(default)]
    deleted: bool,
}

impl From<WireTransaction> for LedgerEntry {
    fn from(t: WireTransaction) -> Self {
        LedgerEntry {
            id: t.id,
            amount: t.amount,
            date: t.date,
            payee: t.payee_name.unwrap_or_default(),
            memo: t.memo.unwrap_or_default(),
            cleared: t.cleared.is_cleared(),
        }
    }
}

#[derive(Debug, Serialize)]
struct TransactionBody<T> {
    transaction: T,
}

/// Settle payload for `PUT /transactions/{id}`.
#[derive(Debug, Serialize)]
struct TransactionUpdate<'a> {
    memo: &'a str,
    cleared: ClearedStatus,
}

fn extract_ledger_error(body: &serde_json::Value, status: u16) -> String {
    body["error"]["detail"]
        .as_str()
        .or_else(|| body["error"]["name"].as_str())
        .unwrap_or(&format!("HTTP {}", status))
        .to_string()
}

// ── Client ──────────────────────────────────────────────────────────

pub struct LedgerClient {
    client: FetchClient,
    access_token: String,
    base_url: String,
}

impl LedgerClient {
    pub fn new(access_token: String) -> Result<Self, LedgerError> {
        Self::with_base_url(access_token, LEDGER_API_BASE.to_string())
    }

    pub fn with_base_url(access_token: String, base_url: String) -> Result<Self, LedgerError> {
        Ok(Self {
            client: FetchClient::new("Ledger", extract_ledger_error)?,
            access_token,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, LedgerError> {
        let url = format!("{}{}", self.base_url, path);
        let envelope: Envelope<T> = self
            .client
            .send_typed(|http| http.get(&url).bearer_auth(&self.access_token).query(query))?;
        Ok(envelope.data)
    }

    fn get_transaction(&self, budget_id: &str, entry_id: &str) -> Result<LedgerEntry, LedgerError> {
        let data: TransactionData =
            self.get(&format!("/budgets/{budget_id}/transactions/{entry_id}"), &[])?;
        Ok(data.transaction.into())
    }
}

impl Ledger for LedgerClient {
    fn list_budgets(&self) -> Result<Vec<Budget>, LedgerError> {
        let data: BudgetsData = self.get("/budgets", &[])?;
        Ok(data.budgets)
    }

    fn list_accounts(&self, budget_id: &str) -> Result<Vec<Account>, LedgerError> {
        let data: AccountsData = self.get(&format!("/budgets/{budget_id}/accounts"), &[])?;
        Ok(data
            .accounts
            .into_iter()
            .filter(|a| !a.deleted)
            .map(|a| Account { id: a.id, name: a.name, closed: a.closed })
            .collect())
    }

    fn list_transactions(
        &self,
        budget_id: &str,
        account_id: &str,
        since: NaiveDate,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        let data: TransactionsData = self.get(
            &format!("/budgets/{budget_id}/accounts/{account_id}/transactions"),
            &[("since_date", since.format("%Y-%m-%d").to_string())],
        )?;
        Ok(data
            .transactions
            .into_iter()
            .filter(|t| !t.deleted)
            .map(LedgerEntry::from)
            .collect())
    }

    fn create_transaction(
        &self,
        budget_id: &str,
        transaction: &NewTransaction,
    ) -> Result<LedgerEntry, LedgerError> {
        let url = format!("{}/budgets/{budget_id}/transactions", self.base_url);
        let body = TransactionBody { transaction };
        let envelope: Envelope<TransactionData> = self
            .client
            .send_typed(|http| http.post(&url).bearer_auth(&self.access_token).json(&body))?;
        Ok(envelope.data.transaction.into())
    }

    fn settle(
        &self,
        budget_id: &str,
        entry_id: &str,
        transaction_hash: &str,
    ) -> Result<(), LedgerError> {
        let current = self.get_transaction(budget_id, entry_id)?;
        let memo = append_memo(&current.memo, transaction_hash);

        let url = format!("{}/budgets/{budget_id}/transactions/{entry_id}", self.base_url);
        let body = TransactionBody {
            transaction: TransactionUpdate { memo: &memo, cleared: ClearedStatus::Cleared },
        };
        self.client
            .send(|http| http.put(&url).bearer_auth(&self.access_token).json(&body))?;
        Ok(())
    }
}
