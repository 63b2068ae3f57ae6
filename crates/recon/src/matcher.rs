use crate::amount::ledger_amount_to_expected_base_units;
use crate::model::{LedgerEntry, TokenDetails, Transfer};

/// Calendar days a transfer may fall either side of a ledger entry's date.
pub const DATE_TOLERANCE_DAYS: i64 = 1;

/// Indices of transfers in `transfers` that could settle `entry`, in pool order.
///
/// A candidate executes within [`DATE_TOLERANCE_DAYS`] of the entry's date
/// (by UTC calendar day), moves funds in the entry's direction relative to
/// `wallet`, and carries exactly the base-unit amount the entry implies.
pub fn match_transfers(
    entry: &LedgerEntry,
    wallet: &str,
    token: &TokenDetails,
    transfers: &[Transfer],
) -> Vec<usize> {
    let expected = match ledger_amount_to_expected_base_units(entry.amount, token.decimals) {
        Ok(v) => v,
        Err(err) => {
            tracing::debug!(entry = %entry.id, %err, "ledger amount out of range, no candidates");
            return Vec::new();
        }
    };
    let outbound = entry.amount < 0;

    transfers
        .iter()
        .enumerate()
        .filter(|(_, t)| {
            let Some(amount) = t.amount.as_ref() else {
                return false;
            };
            let offset = (t.execution_time.date_naive() - entry.date).num_days();
            if offset.abs() > DATE_TOLERANCE_DAYS {
                return false;
            }
            let side = if outbound { &t.from_address } else { &t.to_address };
            side.eq_ignore_ascii_case(wallet) && *amount == expected
        })
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::U256;
    use chrono::{DateTime, NaiveDate, Utc};

    fn usdc() -> TokenDetails {
        TokenDetails { decimals: 6, name: "USDC".into() }
    }

    fn entry(amount: i64, date: &str) -> LedgerEntry {
        LedgerEntry {
            id: "e1".into(),
            amount,
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            payee: String::new(),
            memo: String::new(),
            cleared: false,
        }
    }

    fn transfer(from: &str, to: &str, base: u64, at: &str) -> Transfer {
        Transfer {
            from_address: from.into(),
            to_address: to.into(),
            amount: Some(U256::from(base)),
            execution_time: DateTime::parse_from_rfc3339(at).unwrap().with_timezone(&Utc),
            transaction_hash: format!("0x{base}{at}"),
        }
    }

    #[test]
    fn outbound_matches_from_address() {
        let pool = vec![
            transfer("0xABC", "0xdef", 1_000_000, "2025-12-01T03:00:00Z"),
            transfer("0xdef", "0xabc", 1_000_000, "2025-12-01T03:00:00Z"),
        ];
        assert_eq!(match_transfers(&entry(-1000, "2025-12-01"), "0xabc", &usdc(), &pool), vec![0]);
        assert_eq!(match_transfers(&entry(1000, "2025-12-01"), "0xabc", &usdc(), &pool), vec![1]);
    }

    #[test]
    fn wallet_case_is_irrelevant() {
        let pool = vec![transfer("0xAbC", "0xdef", 1_000_000, "2025-12-01T03:00:00Z")];
        let e = entry(-1000, "2025-12-01");
        assert_eq!(match_transfers(&e, "0xabc", &usdc(), &pool), vec![0]);
        assert_eq!(match_transfers(&e, "0XABC", &usdc(), &pool), vec![0]);
    }

    #[test]
    fn date_tolerance_is_one_calendar_day() {
        let e = entry(1000, "2025-12-14");
        let at = |ts: &str| vec![transfer("0xdef", "0xabc", 1_000_000, ts)];
        assert_eq!(match_transfers(&e, "0xabc", &usdc(), &at("2025-12-15T07:00:00Z")).len(), 1);
        assert_eq!(match_transfers(&e, "0xabc", &usdc(), &at("2025-12-13T23:30:00Z")).len(), 1);
        assert!(match_transfers(&e, "0xabc", &usdc(), &at("2025-12-16T12:00:00Z")).is_empty());
        assert!(match_transfers(&e, "0xabc", &usdc(), &at("2025-12-12T12:00:00Z")).is_empty());
    }

    #[test]
    fn amount_must_be_exact() {
        let pool = vec![transfer("0xdef", "0xabc", 1_000_001, "2025-12-01T00:00:00Z")];
        assert!(match_transfers(&entry(1000, "2025-12-01"), "0xabc", &usdc(), &pool).is_empty());
    }

    #[test]
    fn absent_amount_never_matches() {
        let mut t = transfer("0xdef", "0xabc", 0, "2025-12-01T00:00:00Z");
        t.amount = None;
        assert!(match_transfers(&entry(0, "2025-12-01"), "0xabc", &usdc(), &[t]).is_empty());
    }

    #[test]
    fn returns_every_candidate_in_pool_order() {
        let pool = vec![
            transfer("0xdef", "0xabc", 5_000_000, "2025-12-02T00:00:00Z"),
            transfer("0xdef", "0xzzz", 5_000_000, "2025-12-01T00:00:00Z"),
            transfer("0x123", "0xABC", 5_000_000, "2025-12-01T00:00:00Z"),
        ];
        assert_eq!(match_transfers(&entry(5000, "2025-12-01"), "0xabc", &usdc(), &pool), vec![0, 2]);
    }
}
