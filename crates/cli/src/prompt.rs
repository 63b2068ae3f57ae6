//! Interactive prompts on stdin/stderr.
//!
//! Menus are numbered; `s` skips, `q` quits. End of input and Ctrl-C count
//! as quit, so the caller still gets to save the registry.

use std::io::{self, BufRead, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use walletsync_recon::amount::{format_base_units, format_ledger_amount};
use walletsync_recon::prompt::PromptError;
use walletsync_recon::{Budget, Choice, EntryDetails, ImportAction, LedgerEntry, Prompter, TokenDetails, Transfer};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

enum Answer {
    Pick(usize),
    Skip,
    Quit,
}

const INTERRUPT_POLL: Duration = Duration::from_millis(100);

/// Stdin lines fed by a reader thread, so a blocked prompt still notices
/// the interrupt flag. Once the flag is set, reads fail.
pub struct InterruptibleLines {
    lines: Receiver<io::Result<String>>,
    interrupted: Arc<AtomicBool>,
    buf: Vec<u8>,
    pos: usize,
}

impl InterruptibleLines {
    fn new(lines: Receiver<io::Result<String>>, interrupted: Arc<AtomicBool>) -> Self {
        Self { lines, interrupted, buf: Vec::new(), pos: 0 }
    }

    fn stdin(interrupted: Arc<AtomicBool>) -> Self {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let stdin = io::stdin();
            loop {
                let mut line = String::new();
                match stdin.lock().read_line(&mut line) {
                    Ok(0) => break,
                    Ok(_) => {
                        if tx.send(Ok(line)).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(Err(e));
                        break;
                    }
                }
            }
        });
        Self::new(rx, interrupted)
    }
}

impl Read for InterruptibleLines {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        let n = {
            let available = self.fill_buf()?;
            let n = available.len().min(out.len());
            out[..n].copy_from_slice(&available[..n]);
            n
        };
        self.consume(n);
        Ok(n)
    }
}

impl BufRead for InterruptibleLines {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        while self.pos >= self.buf.len() {
            if self.interrupted.load(Ordering::SeqCst) {
                return Err(io::Error::new(io::ErrorKind::Other, "interrupted"));
            }
            match self.lines.recv_timeout(INTERRUPT_POLL) {
                Ok(Ok(line)) => {
                    self.buf = line.into_bytes();
                    self.pos = 0;
                }
                Ok(Err(e)) => return Err(e),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return Ok(&[]),
            }
        }
        Ok(&self.buf[self.pos..])
    }

    fn consume(&mut self, amt: usize) {
        self.pos = (self.pos + amt).min(self.buf.len());
    }
}

pub struct TerminalPrompter<R, W> {
    input: R,
    output: W,
    interrupted: Arc<AtomicBool>,
}

impl TerminalPrompter<InterruptibleLines, io::Stderr> {
    /// Prompt on stderr, reading stdin. Ctrl-C cancels the pending prompt
    /// instead of killing the process.
    pub fn stdio() -> Self {
        let interrupted = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&interrupted);
        if let Err(err) = ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)) {
            tracing::warn!(%err, "cannot install Ctrl-C handler; interrupting will lose unsaved progress");
        }
        Self::new(InterruptibleLines::stdin(Arc::clone(&interrupted)), io::stderr())
            .with_interrupt(interrupted)
    }
}

impl<R: BufRead, W: Write> TerminalPrompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output, interrupted: Arc::new(AtomicBool::new(false)) }
    }

    pub fn with_interrupt(mut self, interrupted: Arc<AtomicBool>) -> Self {
        self.interrupted = interrupted;
        self
    }

    fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }

    /// One trimmed line, or None at end of input or after Ctrl-C.
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>, PromptError> {
        if self.is_interrupted() {
            return Ok(None);
        }
        write!(self.output, "{prompt}")?;
        self.output.flush()?;
        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) => {
                writeln!(self.output)?;
                Ok(None)
            }
            Ok(_) => Ok(Some(line.trim().to_string())),
            Err(_) if self.is_interrupted() => {
                writeln!(self.output)?;
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Ask until the answer is a number in `1..=count`, `s`, or `q`.
    fn menu(&mut self, count: usize, allow_skip: bool) -> Result<Answer, PromptError> {
        let hint = if allow_skip {
            format!("Choice [1-{count}, s=skip, q=quit]: ")
        } else {
            format!("Choice [1-{count}, q=quit]: ")
        };
        loop {
            let Some(answer) = self.read_line(&hint)? else {
                return Ok(Answer::Quit);
            };
            match answer.to_ascii_lowercase().as_str() {
                "q" | "quit" => return Ok(Answer::Quit),
                "s" | "skip" if allow_skip => return Ok(Answer::Skip),
                other => match other.parse::<usize>() {
                    Ok(n) if (1..=count).contains(&n) => return Ok(Answer::Pick(n - 1)),
                    _ => writeln!(self.output, "Invalid choice '{answer}'")?,
                },
            }
        }
    }

    fn describe(&mut self, transfer: &Transfer, token: &TokenDetails) -> Result<(), PromptError> {
        writeln!(
            self.output,
            "{}  {} {}  {} -> {}  {}",
            transfer.execution_time.format(TIME_FORMAT),
            format_base_units(transfer.amount.as_ref(), token.decimals),
            token.name,
            transfer.from_address,
            transfer.to_address,
            transfer.transaction_hash,
        )?;
        Ok(())
    }

    /// Free-text field with a default used for empty input.
    fn field(&mut self, label: &str, default: &str) -> Result<Option<String>, PromptError> {
        let answer = self.read_line(&format!("{label} [{default}]: "))?;
        Ok(answer.map(|a| if a.is_empty() { default.to_string() } else { a }))
    }
}

impl<R: BufRead, W: Write> Prompter for TerminalPrompter<R, W> {
    fn select_budget(&mut self, budgets: &[Budget]) -> Result<Choice<usize>, PromptError> {
        writeln!(self.output, "Select a budget:")?;
        for (i, budget) in budgets.iter().enumerate() {
            writeln!(self.output, "  {}) {}", i + 1, budget.name)?;
        }
        Ok(match self.menu(budgets.len(), false)? {
            Answer::Pick(i) => Choice::Selected(i),
            Answer::Skip => Choice::Skip,
            Answer::Quit => Choice::Cancel,
        })
    }

    fn disambiguate(
        &mut self,
        entry: &LedgerEntry,
        candidates: &[&Transfer],
        token: &TokenDetails,
    ) -> Result<Choice<usize>, PromptError> {
        writeln!(
            self.output,
            "\nLedger entry {} on {}: {} {} {}",
            entry.id,
            entry.date,
            format_ledger_amount(entry.amount),
            entry.payee,
            entry.memo,
        )?;
        writeln!(self.output, "matches {} transfers:", candidates.len())?;

        // Show oldest first; answers map back to the caller's order.
        let mut order: Vec<usize> = (0..candidates.len()).collect();
        order.sort_by_key(|&i| (candidates[i].execution_time, candidates[i].transaction_hash.clone()));
        for (n, &i) in order.iter().enumerate() {
            write!(self.output, "  {}) ", n + 1)?;
            self.describe(candidates[i], token)?;
        }

        Ok(match self.menu(order.len(), true)? {
            Answer::Pick(n) => Choice::Selected(order[n]),
            Answer::Skip => Choice::Skip,
            Answer::Quit => Choice::Cancel,
        })
    }

    fn import_action(
        &mut self,
        transfer: &Transfer,
        wallet: &str,
        token: &TokenDetails,
    ) -> Result<Choice<ImportAction>, PromptError> {
        let direction = match transfer.direction(wallet) {
            Some(d) if d.is_outbound() => "outgoing",
            _ => "incoming",
        };
        write!(self.output, "\nUnmatched {direction} transfer: ")?;
        self.describe(transfer, token)?;
        writeln!(self.output, "  1) Create ledger entry")?;
        writeln!(self.output, "  2) Skip (for now)")?;
        writeln!(self.output, "  3) Ignore (skip permanently)")?;

        Ok(match self.menu(3, true)? {
            Answer::Pick(0) => Choice::Selected(ImportAction::Create),
            Answer::Pick(2) => Choice::Selected(ImportAction::Ignore),
            Answer::Pick(_) | Answer::Skip => Choice::Skip,
            Answer::Quit => Choice::Cancel,
        })
    }

    fn entry_details(
        &mut self,
        _transfer: &Transfer,
        defaults: EntryDetails,
    ) -> Result<Choice<EntryDetails>, PromptError> {
        let Some(payee) = self.field("Payee", &defaults.payee)? else {
            return Ok(Choice::Cancel);
        };
        let Some(memo) = self.field("Memo", &defaults.memo)? else {
            return Ok(Choice::Cancel);
        };
        Ok(Choice::Selected(EntryDetails { payee, memo }))
    }
}

/// Prompter for unattended runs: never asks, skips every decision.
///
/// Unique matches still settle; ambiguous entries and unmatched transfers
/// are left for an interactive run.
pub struct UnattendedPrompter;

impl Prompter for UnattendedPrompter {
    fn select_budget(&mut self, _budgets: &[Budget]) -> Result<Choice<usize>, PromptError> {
        Err(PromptError::NotInteractive(
            "several budgets exist; set budget_id or pass --budget-id".into(),
        ))
    }

    fn disambiguate(
        &mut self,
        _entry: &LedgerEntry,
        _candidates: &[&Transfer],
        _token: &TokenDetails,
    ) -> Result<Choice<usize>, PromptError> {
        Ok(Choice::Skip)
    }

    fn import_action(
        &mut self,
        _transfer: &Transfer,
        _wallet: &str,
        _token: &TokenDetails,
    ) -> Result<Choice<ImportAction>, PromptError> {
        Ok(Choice::Skip)
    }

    fn entry_details(
        &mut self,
        _transfer: &Transfer,
        _defaults: EntryDetails,
    ) -> Result<Choice<EntryDetails>, PromptError> {
        Ok(Choice::Skip)
    }
}
