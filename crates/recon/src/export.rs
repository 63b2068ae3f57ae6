//! Wallet export parsing: token-transfer CSV into ordered [`Transfer`]s.
//!
//! Columns are located by header name (trimmed, case-insensitive), never by
//! position, so exports with extra or reordered columns load unchanged.

use std::fmt;
use std::path::Path;

use chrono::{NaiveDateTime, TimeZone, Utc};
use thiserror::Error;

use crate::amount::{parse_decimal_to_base_units, AmountError};
use crate::model::{TokenDetails, Transfer};

/// Timestamp layout of the `DateTime (UTC)` column.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("cannot read export: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse export: {0}")]
    Csv(#[from] csv::Error),
    #[error("export is missing required column '{column}' (found: [{}])", .available.join(", "))]
    MissingColumn { column: TransferColumn, available: Vec<String> },
    #[error("malformed export row at line {line}: {fields:?}")]
    MalformedRecord { line: u64, fields: Vec<String> },
    #[error("transaction {hash}: cannot parse amount '{value}': {source}")]
    Amount { hash: String, value: String, source: AmountError },
    #[error("transaction {hash}: cannot parse datetime '{value}'")]
    DateTime { hash: String, value: String },
}

/// Columns the parser reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferColumn {
    TransactionHash,
    From,
    To,
    Amount,
    DateTime,
}

impl TransferColumn {
    pub const ALL: [TransferColumn; 5] = [
        TransferColumn::TransactionHash,
        TransferColumn::From,
        TransferColumn::To,
        TransferColumn::Amount,
        TransferColumn::DateTime,
    ];

    pub fn header(self) -> &'static str {
        match self {
            TransferColumn::TransactionHash => "Transaction Hash",
            TransferColumn::From => "From",
            TransferColumn::To => "To",
            TransferColumn::Amount => "Amount",
            TransferColumn::DateTime => "DateTime (UTC)",
        }
    }
}

impl fmt::Display for TransferColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

/// Header positions, resolved once before any row is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnIndex {
    hash: usize,
    from: usize,
    to: usize,
    amount: usize,
    datetime: usize,
}

impl ColumnIndex {
    pub fn resolve<'a, I>(headers: I) -> Result<Self, ExportError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let headers: Vec<String> = headers
            .into_iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();

        let find = |column: TransferColumn| {
            headers
                .iter()
                .position(|h| h.eq_ignore_ascii_case(column.header()))
                .ok_or_else(|| ExportError::MissingColumn {
                    column,
                    available: headers.clone(),
                })
        };

        Ok(ColumnIndex {
            hash: find(TransferColumn::TransactionHash)?,
            from: find(TransferColumn::From)?,
            to: find(TransferColumn::To)?,
            amount: find(TransferColumn::Amount)?,
            datetime: find(TransferColumn::DateTime)?,
        })
    }

    fn width(&self) -> usize {
        [self.hash, self.from, self.to, self.amount, self.datetime]
            .into_iter()
            .max()
            .unwrap_or(0)
            + 1
    }
}

/// Parse an export held in memory.
pub fn load_transfers(data: &str, token: &TokenDetails) -> Result<Vec<Transfer>, ExportError> {
    let data = data.trim_start_matches('\u{feff}');
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(data.as_bytes());

    let columns = ColumnIndex::resolve(reader.headers()?.iter())?;
    let width = columns.width();

    let mut transfers = Vec::new();
    for result in reader.records() {
        let record = result?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        if record.iter().all(|f| f.is_empty()) {
            tracing::debug!(line, "skipping blank export row");
            continue;
        }
        if record.len() < width {
            return Err(ExportError::MalformedRecord {
                line,
                fields: record.iter().map(str::to_string).collect(),
            });
        }

        let hash = record[columns.hash].to_string();
        let amount_text = &record[columns.amount];
        let amount = parse_decimal_to_base_units(amount_text, token.decimals).map_err(|source| {
            ExportError::Amount {
                hash: hash.clone(),
                value: amount_text.to_string(),
                source,
            }
        })?;

        let datetime_text = &record[columns.datetime];
        let execution_time = NaiveDateTime::parse_from_str(datetime_text, DATETIME_FORMAT)
            .map(|naive| Utc.from_utc_datetime(&naive))
            .map_err(|_| ExportError::DateTime {
                hash: hash.clone(),
                value: datetime_text.to_string(),
            })?;

        transfers.push(Transfer {
            from_address: record[columns.from].to_string(),
            to_address: record[columns.to].to_string(),
            amount: Some(amount),
            execution_time,
            transaction_hash: hash,
        });
    }

    tracing::debug!(count = transfers.len(), "parsed export");
    Ok(transfers)
}

/// Read and parse an export file.
pub fn load_transfers_from_path(
    path: &Path,
    token: &TokenDetails,
) -> Result<Vec<Transfer>, ExportError> {
    let data = std::fs::read_to_string(path)?;
    load_transfers(&data, token)
}
