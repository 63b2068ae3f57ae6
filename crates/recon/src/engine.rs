use crate::amount::{base_units_to_ledger_amount, dust_threshold, format_base_units, format_ledger_amount};
use crate::config::SyncOptions;
use crate::error::ReconError;
use crate::ledger::{memo_with_hash, Ledger};
use crate::matcher::match_transfers;
use crate::model::{Account, Budget, ClearedStatus, LedgerEntry, NewTransaction, SyncReport, Transfer};
use crate::prompt::{Choice, EntryDetails, ImportAction, Prompter};
use crate::registry::SkipRegistry;

// ---------------------------------------------------------------------------
// Account resolution
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAccount {
    pub budget: Budget,
    pub account: Account,
}

/// Find the budget and the open account named `account_name`.
///
/// With `budget_id` set the budget listing is skipped. Otherwise a single
/// budget is used as-is and several are put to the prompter; skipping that
/// prompt falls back to the first budget.
pub fn resolve_account<L, P>(
    ledger: &L,
    prompter: &mut P,
    budget_id: Option<&str>,
    account_name: &str,
) -> Result<ResolvedAccount, ReconError>
where
    L: Ledger + ?Sized,
    P: Prompter + ?Sized,
{
    let budget = match budget_id {
        Some(id) => Budget { id: id.to_string(), name: id.to_string() },
        None => {
            let mut budgets = ledger.list_budgets()?;
            match budgets.len() {
                0 => return Err(ReconError::NoBudgets),
                1 => budgets.remove(0),
                _ => match prompter.select_budget(&budgets)? {
                    Choice::Selected(i) if i < budgets.len() => budgets.swap_remove(i),
                    Choice::Selected(_) | Choice::Skip => budgets.remove(0),
                    Choice::Cancel => return Err(ReconError::Canceled),
                },
            }
        }
    };
    tracing::debug!(budget = %budget.name, id = %budget.id, "using budget");

    let account = ledger
        .list_accounts(&budget.id)?
        .into_iter()
        .find(|a| !a.closed && a.name == account_name)
        .ok_or_else(|| ReconError::AccountNotFound {
            budget_id: budget.id.clone(),
            name: account_name.to_string(),
        })?;
    tracing::debug!(account = %account.name, id = %account.id, "using account");

    Ok(ResolvedAccount { budget, account })
}

// ---------------------------------------------------------------------------
// Transfer pool
// ---------------------------------------------------------------------------

/// Transfers not yet claimed by a ledger entry during one run.
#[derive(Debug, Clone, Default)]
pub struct TransferPool {
    transfers: Vec<Transfer>,
}

impl TransferPool {
    pub fn new(transfers: Vec<Transfer>) -> Self {
        TransferPool { transfers }
    }

    pub fn as_slice(&self) -> &[Transfer] {
        &self.transfers
    }

    pub fn len(&self) -> usize {
        self.transfers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transfers.is_empty()
    }

    /// Remove and return the transfer at `index`, keeping the rest in order.
    pub fn take(&mut self, index: usize) -> Transfer {
        self.transfers.remove(index)
    }

    pub fn into_inner(self) -> Vec<Transfer> {
        self.transfers
    }
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

/// Reconcile `transfers` against the unsettled entries of one ledger account.
///
/// Settled and created hashes are added to `registry`; persisting it is the
/// caller's job and should happen whether or not this returns an error.
pub fn run<L, P>(
    ledger: &L,
    prompter: &mut P,
    registry: &mut SkipRegistry,
    transfers: Vec<Transfer>,
    options: &SyncOptions,
) -> Result<SyncReport, ReconError>
where
    L: Ledger + ?Sized,
    P: Prompter + ?Sized,
{
    let mut report = SyncReport {
        budget_id: options.budget_id.clone(),
        account_id: options.account_id.clone(),
        dry_run: options.dry_run,
        transfers_loaded: transfers.len(),
        ..SyncReport::default()
    };

    let transfers = if options.exclude_registered {
        let (known, fresh): (Vec<_>, Vec<_>) =
            transfers.into_iter().partition(|t| registry.contains(&t.transaction_hash));
        report.excluded_registered = known.len();
        fresh
    } else {
        transfers
    };
    let mut pool = TransferPool::new(transfers);

    let entries: Vec<LedgerEntry> = ledger
        .list_transactions(&options.budget_id, &options.account_id, options.since())?
        .into_iter()
        .filter(|e| !e.cleared)
        .collect();
    tracing::info!(
        entries = entries.len(),
        transfers = pool.len(),
        since = %options.since(),
        "reconciling unsettled ledger entries"
    );

    let mut ctx = RunContext { ledger, prompter, registry, options, report };

    for entry in &entries {
        ctx.report.entries_examined += 1;
        ctx.reconcile_entry(entry, &mut pool)?;
    }
    for transfer in pool.into_inner() {
        ctx.offer_import(transfer)?;
    }

    tracing::info!(
        matched = ctx.report.matched,
        unmatched = ctx.report.unmatched,
        created = ctx.report.created,
        ignored = ctx.report.ignored,
        "reconciliation finished"
    );
    Ok(ctx.report)
}

struct RunContext<'a, L: ?Sized, P: ?Sized> {
    ledger: &'a L,
    prompter: &'a mut P,
    registry: &'a mut SkipRegistry,
    options: &'a SyncOptions,
    report: SyncReport,
}

impl<L, P> RunContext<'_, L, P>
where
    L: Ledger + ?Sized,
    P: Prompter + ?Sized,
{
    fn reconcile_entry(
        &mut self,
        entry: &LedgerEntry,
        pool: &mut TransferPool,
    ) -> Result<(), ReconError> {
        let opts = self.options;
        let candidates = match_transfers(entry, &opts.wallet_address, &opts.token, pool.as_slice());

        let chosen = match candidates.as_slice() {
            [] => {
                tracing::info!(
                    entry = %entry.id,
                    date = %entry.date,
                    amount = %format_ledger_amount(entry.amount),
                    payee = %entry.payee,
                    "no matching transfer"
                );
                self.report.unmatched += 1;
                return Ok(());
            }
            [only] => *only,
            many => {
                let refs: Vec<&Transfer> = many.iter().map(|&i| &pool.as_slice()[i]).collect();
                match self.prompter.disambiguate(entry, &refs, &opts.token)? {
                    Choice::Selected(i) if i < many.len() => many[i],
                    Choice::Selected(i) => {
                        tracing::warn!(entry = %entry.id, choice = i, "choice out of range, skipping");
                        self.report.ambiguous_skipped += 1;
                        return Ok(());
                    }
                    Choice::Skip => {
                        tracing::info!(entry = %entry.id, candidates = many.len(), "ambiguous entry skipped");
                        self.report.ambiguous_skipped += 1;
                        return Ok(());
                    }
                    Choice::Cancel => return Err(ReconError::Canceled),
                }
            }
        };

        let transfer = pool.take(chosen);
        self.settle(entry, &transfer);
        Ok(())
    }

    fn settle(&mut self, entry: &LedgerEntry, transfer: &Transfer) {
        let hash = &transfer.transaction_hash;
        if self.options.dry_run {
            tracing::info!(entry = %entry.id, %hash, "dry run: would settle");
            self.report.matched += 1;
            self.report.settled_hashes.push(hash.clone());
            return;
        }

        match self.ledger.settle(&self.options.budget_id, &entry.id, hash) {
            Ok(()) => {
                tracing::info!(entry = %entry.id, %hash, "settled ledger entry");
                self.registry.add_processed_on(hash, &entry.id, self.options.today);
                self.report.matched += 1;
                self.report.settled_hashes.push(hash.clone());
            }
            Err(err) => {
                tracing::error!(entry = %entry.id, %hash, %err, "failed to settle ledger entry");
                self.report.settle_failures += 1;
            }
        }
    }

    fn offer_import(&mut self, transfer: Transfer) -> Result<(), ReconError> {
        let opts = self.options;
        let Some(direction) = transfer.direction(&opts.wallet_address) else {
            self.report.unrelated += 1;
            return Ok(());
        };
        // Matching may see registered transfers; importing them never.
        if self.registry.contains(&transfer.transaction_hash) {
            tracing::debug!(hash = %transfer.transaction_hash, "already registered, not offered");
            self.report.excluded_registered += 1;
            return Ok(());
        }
        let dust = dust_threshold(opts.token.decimals);
        let amount = match transfer.amount {
            Some(amount) if amount >= dust => amount,
            _ => {
                tracing::debug!(hash = %transfer.transaction_hash, "below dust threshold");
                self.report.below_dust += 1;
                return Ok(());
            }
        };

        let hash = &transfer.transaction_hash;
        if opts.dry_run {
            tracing::info!(
                %hash,
                amount = %format_base_units(Some(&amount), opts.token.decimals),
                ?direction,
                "dry run: unmatched transfer would be offered for import"
            );
            self.report.skipped += 1;
            return Ok(());
        }

        match self.prompter.import_action(&transfer, &opts.wallet_address, &opts.token)? {
            Choice::Cancel => Err(ReconError::Canceled),
            Choice::Skip => {
                self.report.skipped += 1;
                Ok(())
            }
            Choice::Selected(ImportAction::Ignore) => {
                self.registry.add_ignored_on(hash, opts.today);
                self.report.ignored += 1;
                Ok(())
            }
            Choice::Selected(ImportAction::Create) => {
                let defaults = EntryDetails {
                    payee: transfer.counterparty(&opts.wallet_address).to_string(),
                    memo: hash.clone(),
                };
                let details = match self.prompter.entry_details(&transfer, defaults)? {
                    Choice::Selected(details) => details,
                    Choice::Skip => {
                        self.report.skipped += 1;
                        return Ok(());
                    }
                    Choice::Cancel => return Err(ReconError::Canceled),
                };
                self.create_entry(&transfer, &amount, direction.is_outbound(), details);
                Ok(())
            }
        }
    }

    fn create_entry(
        &mut self,
        transfer: &Transfer,
        amount: &alloy_primitives::U256,
        outbound: bool,
        details: EntryDetails,
    ) {
        let opts = self.options;
        let hash = &transfer.transaction_hash;
        let milliunits = match base_units_to_ledger_amount(amount, opts.token.decimals, outbound) {
            Ok(v) => v,
            Err(err) => {
                tracing::error!(%hash, %err, "cannot convert transfer amount");
                self.report.create_failures += 1;
                return;
            }
        };

        let new_tx = NewTransaction {
            account_id: opts.account_id.clone(),
            date: transfer.execution_time.date_naive(),
            amount: milliunits,
            payee_name: Some(details.payee).filter(|p| !p.is_empty()),
            memo: Some(memo_with_hash(&details.memo, hash)),
            category_id: None,
            flag_color: None,
            cleared: Some(ClearedStatus::Uncleared),
            approved: None,
        };

        match self.ledger.create_transaction(&opts.budget_id, &new_tx) {
            Ok(created) => {
                tracing::info!(%hash, entry = %created.id, "created ledger entry");
                self.registry.add_processed_on(hash, &created.id, opts.today);
                self.report.created += 1;
            }
            Err(err) => {
                tracing::error!(%hash, %err, "failed to create ledger entry");
                self.report.create_failures += 1;
            }
        }
    }
}
