use std::cell::RefCell;
use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;

use alloy_primitives::U256;
use chrono::{DateTime, NaiveDate, Utc};

use walletsync_recon::export::{load_transfers_from_path, ExportError, TransferColumn};
use walletsync_recon::ledger::append_memo;
use walletsync_recon::model::{ClearedStatus, NewTransaction};
use walletsync_recon::prompt::PromptError;
use walletsync_recon::{
    resolve_account, run, Account, Budget, Choice, EntryDetails, ImportAction, Ledger,
    LedgerEntry, LedgerError, Prompter, ReconError, SkipRegistry, SyncOptions, TokenDetails,
    Transfer,
};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn usdc() -> TokenDetails {
    TokenDetails { decimals: 6, name: "USD Coin".into() }
}

fn day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn options() -> SyncOptions {
    SyncOptions::new("0xabc", usdc(), "budget-1", "account-1", day("2025-12-08"))
}

fn entry(id: &str, amount: i64, date: &str, memo: &str, cleared: bool) -> LedgerEntry {
    LedgerEntry {
        id: id.into(),
        amount,
        date: day(date),
        payee: String::new(),
        memo: memo.into(),
        cleared,
    }
}

fn transfer(hash: &str, from: &str, to: &str, base: u64, at: &str) -> Transfer {
    Transfer {
        from_address: from.into(),
        to_address: to.into(),
        amount: Some(U256::from(base)),
        execution_time: DateTime::parse_from_rfc3339(at).unwrap().with_timezone(&Utc),
        transaction_hash: hash.into(),
    }
}

fn fixture_transfers() -> Vec<Transfer> {
    load_transfers_from_path(&fixtures_dir().join("wallet-transfers.csv"), &usdc()).unwrap()
}

// -------------------------------------------------------------------------
// Test doubles
// -------------------------------------------------------------------------

#[derive(Default)]
struct FakeLedger {
    budgets: Vec<Budget>,
    accounts: Vec<Account>,
    entries: RefCell<Vec<LedgerEntry>>,
    created: RefCell<Vec<NewTransaction>>,
    settle_calls: RefCell<usize>,
    fail_settle: HashSet<String>,
    /// Transfer hashes whose create request is rejected.
    fail_create: HashSet<String>,
}

impl FakeLedger {
    fn with_entries(entries: Vec<LedgerEntry>) -> Self {
        FakeLedger { entries: RefCell::new(entries), ..Default::default() }
    }

    fn entry(&self, id: &str) -> LedgerEntry {
        self.entries.borrow().iter().find(|e| e.id == id).cloned().unwrap()
    }
}

impl Ledger for FakeLedger {
    fn list_budgets(&self) -> Result<Vec<Budget>, LedgerError> {
        Ok(self.budgets.clone())
    }

    fn list_accounts(&self, _budget_id: &str) -> Result<Vec<Account>, LedgerError> {
        Ok(self.accounts.clone())
    }

    fn list_transactions(
        &self,
        _budget_id: &str,
        _account_id: &str,
        since: NaiveDate,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        Ok(self.entries.borrow().iter().filter(|e| e.date >= since).cloned().collect())
    }

    fn create_transaction(
        &self,
        _budget_id: &str,
        transaction: &NewTransaction,
    ) -> Result<LedgerEntry, LedgerError> {
        let memo = transaction.memo.clone().unwrap_or_default();
        if self.fail_create.iter().any(|hash| memo.contains(hash.as_str())) {
            return Err(LedgerError::Rejected("account is closed".into()));
        }
        let mut created = self.created.borrow_mut();
        created.push(transaction.clone());
        Ok(LedgerEntry {
            id: format!("new-{}", created.len()),
            amount: transaction.amount,
            date: transaction.date,
            payee: transaction.payee_name.clone().unwrap_or_default(),
            memo: transaction.memo.clone().unwrap_or_default(),
            cleared: false,
        })
    }

    fn settle(&self, _budget_id: &str, entry_id: &str, hash: &str) -> Result<(), LedgerError> {
        *self.settle_calls.borrow_mut() += 1;
        if self.fail_settle.contains(entry_id) {
            return Err(LedgerError::Upstream { status: 500, message: "boom".into() });
        }
        let mut entries = self.entries.borrow_mut();
        let e = entries
            .iter_mut()
            .find(|e| e.id == entry_id)
            .ok_or_else(|| LedgerError::Rejected(format!("no entry {entry_id}")))?;
        e.memo = append_memo(&e.memo, hash);
        e.cleared = true;
        Ok(())
    }
}

#[derive(Default)]
struct ScriptedPrompter {
    budget: VecDeque<Choice<usize>>,
    disambiguate: VecDeque<Choice<usize>>,
    import: VecDeque<Choice<ImportAction>>,
    details: VecDeque<Choice<EntryDetails>>,
    offered: Vec<String>,
    candidate_counts: Vec<usize>,
}

impl Prompter for ScriptedPrompter {
    fn select_budget(&mut self, _budgets: &[Budget]) -> Result<Choice<usize>, PromptError> {
        Ok(self.budget.pop_front().expect("unexpected budget prompt"))
    }

    fn disambiguate(
        &mut self,
        _entry: &LedgerEntry,
        candidates: &[&Transfer],
        _token: &TokenDetails,
    ) -> Result<Choice<usize>, PromptError> {
        self.candidate_counts.push(candidates.len());
        Ok(self.disambiguate.pop_front().expect("unexpected disambiguation prompt"))
    }

    fn import_action(
        &mut self,
        transfer: &Transfer,
        _wallet: &str,
        _token: &TokenDetails,
    ) -> Result<Choice<ImportAction>, PromptError> {
        self.offered.push(transfer.transaction_hash.clone());
        Ok(self.import.pop_front().expect("unexpected import prompt"))
    }

    fn entry_details(
        &mut self,
        _transfer: &Transfer,
        defaults: EntryDetails,
    ) -> Result<Choice<EntryDetails>, PromptError> {
        Ok(self.details.pop_front().unwrap_or(Choice::Selected(defaults)))
    }
}

// -------------------------------------------------------------------------
// End-to-end
// -------------------------------------------------------------------------

#[test]
fn settles_single_match_and_records_hash() {
    let ledger = FakeLedger::with_entries(vec![entry("e1", -1000, "2025-12-01", "", false)]);
    let transfers = vec![transfer("0xhash1", "0xABC", "0xdef", 1_000_000, "2025-12-01T03:00:00Z")];
    let mut prompter = ScriptedPrompter::default();
    let mut registry = SkipRegistry::new();

    let report = run(&ledger, &mut prompter, &mut registry, transfers, &options()).unwrap();

    assert_eq!(report.matched, 1);
    assert_eq!(report.settled_hashes, vec!["0xhash1".to_string()]);
    let settled = ledger.entry("e1");
    assert!(settled.cleared);
    assert_eq!(settled.memo.matches("0xhash1").count(), 1);
    assert_eq!(
        registry.get("0xhash1").unwrap().reason,
        "Processed for ledger entry e1 on 2025-12-08"
    );
    assert!(prompter.offered.is_empty());
}

#[test]
fn full_fixture_run() {
    let ledger = FakeLedger::with_entries(vec![
        entry("e0", -1000, "2025-12-01", "already done", true),
        entry("e1", -1000, "2025-12-01", "coffee", false),
        entry("e2", 2_500_000, "2025-12-02", "", false),
        entry("e3", -7000, "2025-12-03", "", false),
        entry("old", -20_000, "2025-11-20", "", false),
    ]);
    let mut prompter = ScriptedPrompter {
        import: VecDeque::from([
            Choice::Selected(ImportAction::Create),
            Choice::Selected(ImportAction::Ignore),
        ]),
        details: VecDeque::from([Choice::Selected(EntryDetails {
            payee: "Friend".into(),
            memo: "dinner".into(),
        })]),
        ..Default::default()
    };
    let mut registry = SkipRegistry::new();

    let report = run(&ledger, &mut prompter, &mut registry, fixture_transfers(), &options()).unwrap();

    assert_eq!(report.transfers_loaded, 6);
    assert_eq!(report.entries_examined, 3);
    assert_eq!(report.matched, 2);
    assert_eq!(report.unmatched, 1);
    assert_eq!(report.created, 1);
    assert_eq!(report.ignored, 1);
    assert_eq!(report.below_dust, 1);
    assert_eq!(report.unrelated, 1);

    assert_eq!(ledger.entry("e1").memo, "coffee 0xt1");
    assert_eq!(ledger.entry("e2").memo, "0xt2");
    assert!(!ledger.entry("e3").cleared);
    assert_eq!(ledger.entry("e0").memo, "already done");

    assert_eq!(prompter.offered, vec!["0xt3".to_string(), "0xt6".to_string()]);
    let created = ledger.created.borrow();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].amount, -20_000);
    assert_eq!(created[0].date, day("2025-12-03"));
    assert_eq!(created[0].account_id, "account-1");
    assert_eq!(created[0].payee_name.as_deref(), Some("Friend"));
    assert_eq!(created[0].memo.as_deref(), Some("dinner; transaction hash: 0xt3"));
    assert_eq!(created[0].cleared, Some(ClearedStatus::Uncleared));

    assert_eq!(registry.len(), 4);
    assert_eq!(registry.get("0xt3").unwrap().reason, "Processed for ledger entry new-1 on 2025-12-08");
    assert_eq!(registry.get("0xT6").unwrap().reason, "Marked as ignored on 2025-12-08");
    assert!(!registry.contains("0xt4"));
    assert!(!registry.contains("0xt5"));
}

#[test]
fn default_details_use_counterparty_and_hash() {
    let ledger = FakeLedger::default();
    let transfers = vec![transfer("0xin", "0xpayer", "0xABC", 3_000_000, "2025-12-05T00:00:00Z")];
    let mut prompter = ScriptedPrompter {
        import: VecDeque::from([Choice::Selected(ImportAction::Create)]),
        ..Default::default()
    };
    let mut registry = SkipRegistry::new();

    run(&ledger, &mut prompter, &mut registry, transfers, &options()).unwrap();

    let created = ledger.created.borrow();
    assert_eq!(created[0].amount, 3000);
    assert_eq!(created[0].payee_name.as_deref(), Some("0xpayer"));
    assert_eq!(created[0].memo.as_deref(), Some("0xin"));
}

// -------------------------------------------------------------------------
// Matching behaviour
// -------------------------------------------------------------------------

#[test]
fn matched_transfer_is_consumed() {
    let ledger = FakeLedger::with_entries(vec![
        entry("e1", -1000, "2025-12-01", "", false),
        entry("e2", -1000, "2025-12-01", "", false),
    ]);
    let transfers = vec![transfer("0xonly", "0xabc", "0xdef", 1_000_000, "2025-12-01T10:00:00Z")];
    let mut prompter = ScriptedPrompter::default();
    let mut registry = SkipRegistry::new();

    let report = run(&ledger, &mut prompter, &mut registry, transfers, &options()).unwrap();

    assert_eq!(report.matched, 1);
    assert_eq!(report.unmatched, 1);
    assert!(ledger.entry("e1").cleared);
    assert!(!ledger.entry("e2").cleared);
    assert!(prompter.offered.is_empty());
}

#[test]
fn ambiguous_entry_uses_chosen_candidate() {
    let ledger = FakeLedger::with_entries(vec![entry("e1", 5000, "2025-12-02", "", false)]);
    let transfers = vec![
        transfer("0xa", "0x1", "0xabc", 5_000_000, "2025-12-01T10:00:00Z"),
        transfer("0xb", "0x2", "0xabc", 5_000_000, "2025-12-02T10:00:00Z"),
    ];
    let mut prompter = ScriptedPrompter {
        disambiguate: VecDeque::from([Choice::Selected(1)]),
        import: VecDeque::from([Choice::Skip]),
        ..Default::default()
    };
    let mut registry = SkipRegistry::new();

    let report = run(&ledger, &mut prompter, &mut registry, transfers, &options()).unwrap();

    assert_eq!(prompter.candidate_counts, vec![2]);
    assert_eq!(report.matched, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(ledger.entry("e1").memo, "0xb");
    assert_eq!(prompter.offered, vec!["0xa".to_string()]);
    assert!(!registry.contains("0xa"));
}

#[test]
fn skipped_ambiguity_leaves_candidates_in_pool() {
    let ledger = FakeLedger::with_entries(vec![entry("e1", 5000, "2025-12-02", "", false)]);
    let transfers = vec![
        transfer("0xa", "0x1", "0xabc", 5_000_000, "2025-12-01T10:00:00Z"),
        transfer("0xb", "0x2", "0xabc", 5_000_000, "2025-12-02T10:00:00Z"),
    ];
    let mut prompter = ScriptedPrompter {
        disambiguate: VecDeque::from([Choice::Skip]),
        import: VecDeque::from([Choice::Skip, Choice::Skip]),
        ..Default::default()
    };
    let mut registry = SkipRegistry::new();

    let report = run(&ledger, &mut prompter, &mut registry, transfers, &options()).unwrap();

    assert_eq!(report.ambiguous_skipped, 1);
    assert_eq!(report.matched, 0);
    assert_eq!(prompter.offered.len(), 2);
    assert!(!ledger.entry("e1").cleared);
}

#[test]
fn cancel_during_disambiguation_aborts_but_keeps_prior_work() {
    let ledger = FakeLedger::with_entries(vec![
        entry("e1", -1000, "2025-12-01", "", false),
        entry("e2", 5000, "2025-12-02", "", false),
    ]);
    let transfers = vec![
        transfer("0xfirst", "0xabc", "0xdef", 1_000_000, "2025-12-01T10:00:00Z"),
        transfer("0xa", "0x1", "0xabc", 5_000_000, "2025-12-01T10:00:00Z"),
        transfer("0xb", "0x2", "0xabc", 5_000_000, "2025-12-02T10:00:00Z"),
    ];
    let mut prompter = ScriptedPrompter {
        disambiguate: VecDeque::from([Choice::Cancel]),
        ..Default::default()
    };
    let mut registry = SkipRegistry::new();

    let err = run(&ledger, &mut prompter, &mut registry, transfers, &options()).unwrap_err();

    assert!(err.is_canceled());
    assert!(registry.contains("0xfirst"));
    assert_eq!(registry.len(), 1);
    assert!(prompter.offered.is_empty());
}

#[test]
fn cancel_at_import_prompt_aborts() {
    let ledger = FakeLedger::default();
    let transfers = vec![transfer("0xa", "0xabc", "0x1", 5_000_000, "2025-12-01T10:00:00Z")];
    let mut prompter = ScriptedPrompter {
        import: VecDeque::from([Choice::Cancel]),
        ..Default::default()
    };
    let mut registry = SkipRegistry::new();

    let err = run(&ledger, &mut prompter, &mut registry, transfers, &options()).unwrap_err();
    assert!(matches!(err, ReconError::Canceled));
}

#[test]
fn settle_failure_is_not_fatal() {
    let mut ledger = FakeLedger::with_entries(vec![
        entry("bad", -1000, "2025-12-01", "", false),
        entry("good", -2000, "2025-12-01", "", false),
    ]);
    ledger.fail_settle.insert("bad".into());
    let transfers = vec![
        transfer("0x1", "0xabc", "0xdef", 1_000_000, "2025-12-01T10:00:00Z"),
        transfer("0x2", "0xabc", "0xdef", 2_000_000, "2025-12-01T10:00:00Z"),
    ];
    let mut prompter = ScriptedPrompter::default();
    let mut registry = SkipRegistry::new();

    let report = run(&ledger, &mut prompter, &mut registry, transfers, &options()).unwrap();

    assert_eq!(report.settle_failures, 1);
    assert_eq!(report.matched, 1);
    assert!(!registry.contains("0x1"));
    assert!(registry.contains("0x2"));
    // The failed transfer was consumed, so it is not offered for import.
    assert!(prompter.offered.is_empty());
}

#[test]
fn registered_transfers_are_excluded() {
    let ledger = FakeLedger::with_entries(vec![entry("e1", -1000, "2025-12-01", "", false)]);
    let transfers = vec![transfer("0xDONE", "0xabc", "0xdef", 1_000_000, "2025-12-01T10:00:00Z")];
    let mut registry = SkipRegistry::new();
    registry.add_ignored_on("0xdone", day("2025-11-30"));

    let report = run(
        &ledger,
        &mut ScriptedPrompter::default(),
        &mut registry,
        transfers.clone(),
        &options(),
    )
    .unwrap();
    assert_eq!(report.excluded_registered, 1);
    assert_eq!(report.unmatched, 1);

    let mut opts = options();
    opts.exclude_registered = false;
    let report = run(&ledger, &mut ScriptedPrompter::default(), &mut registry, transfers, &opts).unwrap();
    assert_eq!(report.matched, 1);
    assert_eq!(registry.len(), 1);
}

#[test]
fn registered_transfers_are_never_offered_for_import() {
    let ledger = FakeLedger::default();
    let transfers = vec![
        transfer("0xIGNORED", "0xdef", "0xabc", 5_000_000, "2025-12-05T10:00:00Z"),
        transfer("0xCREATED", "0xabc", "0xdef", 2_000_000, "2025-12-05T11:00:00Z"),
    ];
    let mut registry = SkipRegistry::new();
    registry.add_ignored_on("0xignored", day("2025-11-30"));
    registry.add_processed_on("0xcreated", "old-entry", day("2025-11-30"));
    let mut prompter = ScriptedPrompter {
        import: VecDeque::from([Choice::Selected(ImportAction::Create)]),
        ..Default::default()
    };
    let mut opts = options();
    opts.exclude_registered = false;

    let report = run(&ledger, &mut prompter, &mut registry, transfers, &opts).unwrap();

    assert!(prompter.offered.is_empty());
    assert_eq!(report.created, 0);
    assert_eq!(report.excluded_registered, 2);
    assert!(ledger.created.borrow().is_empty());
    assert_eq!(registry.get("0xIGNORED").unwrap().reason, "Marked as ignored on 2025-11-30");
}

#[test]
fn create_failure_is_not_fatal() {
    let mut ledger = FakeLedger::default();
    ledger.fail_create.insert("0xrejected".into());
    let transfers = vec![
        transfer("0xrejected", "0xdef", "0xabc", 5_000_000, "2025-12-05T10:00:00Z"),
        transfer("0xaccepted", "0xdef", "0xabc", 7_000_000, "2025-12-05T11:00:00Z"),
    ];
    let mut prompter = ScriptedPrompter {
        import: VecDeque::from([
            Choice::Selected(ImportAction::Create),
            Choice::Selected(ImportAction::Create),
        ]),
        ..Default::default()
    };
    let mut registry = SkipRegistry::new();

    let report = run(&ledger, &mut prompter, &mut registry, transfers, &options()).unwrap();

    assert_eq!(report.create_failures, 1);
    assert_eq!(report.created, 1);
    assert_eq!(prompter.offered, vec!["0xrejected".to_string(), "0xaccepted".to_string()]);
    assert!(!registry.contains("0xrejected"));
    assert_eq!(
        registry.get("0xaccepted").unwrap().reason,
        "Processed for ledger entry new-1 on 2025-12-08"
    );
    assert_eq!(ledger.created.borrow()[0].amount, 7000);
}

#[test]
fn unconvertible_amount_is_a_create_failure() {
    let ledger = FakeLedger::default();
    let mut huge = transfer("0xhuge", "0xdef", "0xabc", 0, "2025-12-05T10:00:00Z");
    huge.amount = Some(U256::MAX);
    let transfers = vec![huge, transfer("0xnext", "0xdef", "0xabc", 1_000_000, "2025-12-05T11:00:00Z")];
    let mut prompter = ScriptedPrompter {
        import: VecDeque::from([Choice::Selected(ImportAction::Create), Choice::Skip]),
        ..Default::default()
    };
    let mut registry = SkipRegistry::new();

    let report = run(&ledger, &mut prompter, &mut registry, transfers, &options()).unwrap();

    assert_eq!(report.create_failures, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(prompter.offered.len(), 2);
    assert!(ledger.created.borrow().is_empty());
    assert!(registry.is_empty());
}

#[test]
fn dry_run_changes_nothing() {
    let ledger = FakeLedger::with_entries(vec![entry("e1", -1000, "2025-12-01", "", false)]);
    let mut prompter = ScriptedPrompter::default();
    let mut registry = SkipRegistry::new();
    let mut opts = options();
    opts.dry_run = true;

    let report = run(&ledger, &mut prompter, &mut registry, fixture_transfers(), &opts).unwrap();

    assert!(report.dry_run);
    assert_eq!(report.matched, 1);
    assert_eq!(*ledger.settle_calls.borrow(), 0);
    assert!(ledger.created.borrow().is_empty());
    assert!(!ledger.entry("e1").cleared);
    assert!(registry.is_empty());
    assert!(prompter.offered.is_empty());
}

// -------------------------------------------------------------------------
// Account resolution
// -------------------------------------------------------------------------

fn budgets_and_accounts() -> FakeLedger {
    FakeLedger {
        budgets: vec![
            Budget { id: "b1".into(), name: "Personal".into() },
            Budget { id: "b2".into(), name: "Business".into() },
        ],
        accounts: vec![
            Account { id: "a0".into(), name: "Base USDC Hot Storage".into(), closed: true },
            Account { id: "a1".into(), name: "Base USDC Hot Storage".into(), closed: false },
        ],
        ..Default::default()
    }
}

#[test]
fn resolve_prompts_for_budget_and_skips_closed_accounts() {
    let ledger = budgets_and_accounts();
    let mut prompter = ScriptedPrompter {
        budget: VecDeque::from([Choice::Selected(1)]),
        ..Default::default()
    };
    let resolved = resolve_account(&ledger, &mut prompter, None, "Base USDC Hot Storage").unwrap();
    assert_eq!(resolved.budget.id, "b2");
    assert_eq!(resolved.account.id, "a1");
}

#[test]
fn resolve_with_configured_budget_does_not_prompt() {
    let ledger = budgets_and_accounts();
    let mut prompter = ScriptedPrompter::default();
    let resolved =
        resolve_account(&ledger, &mut prompter, Some("b1"), "Base USDC Hot Storage").unwrap();
    assert_eq!(resolved.budget.id, "b1");
}

#[test]
fn resolve_errors() {
    let ledger = budgets_and_accounts();
    let mut prompter = ScriptedPrompter {
        budget: VecDeque::from([Choice::Cancel, Choice::Skip]),
        ..Default::default()
    };
    assert!(resolve_account(&ledger, &mut prompter, None, "x").unwrap_err().is_canceled());
    assert!(matches!(
        resolve_account(&ledger, &mut prompter, None, "Savings"),
        Err(ReconError::AccountNotFound { .. })
    ));

    let empty = FakeLedger::default();
    assert!(matches!(
        resolve_account(&empty, &mut prompter, None, "x"),
        Err(ReconError::NoBudgets)
    ));
}

// -------------------------------------------------------------------------
// Export errors
// -------------------------------------------------------------------------

#[test]
fn missing_from_column_is_reported() {
    let err = load_transfers_from_path(&fixtures_dir().join("missing-from.csv"), &usdc()).unwrap_err();
    match &err {
        ExportError::MissingColumn { column, available } => {
            assert_eq!(*column, TransferColumn::From);
            assert_eq!(available, &["Transaction Hash", "DateTime (UTC)", "To", "Amount"]);
        }
        other => panic!("expected MissingColumn, got {other:?}"),
    }
    assert!(err.to_string().contains("From"));
}
