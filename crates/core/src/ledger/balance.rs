//! Student balance calculations.
//!
//! The running balance of a student is the left fold of `debit - credit` over
//! that student's entries ordered by `(date, entry_number)`. This fold is the
//! only source of truth; balances cached on entries are advisory and get
//! refreshed from it.

use std::collections::BTreeMap;

use hostel_shared::types::{LedgerEntryId, StudentId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::entry::LedgerEntry;
use super::types::{BalanceType, EntryType};

/// Running balance information for a ledger entry.
///
/// `previous` is the signed total before the entry, `current` the signed
/// total after it (`debits - credits`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunningBalance {
    /// Signed balance before this entry.
    pub previous: Decimal,
    /// Signed balance after this entry.
    pub current: Decimal,
}

impl RunningBalance {
    /// The balance of an account with no entries.
    #[must_use]
    pub fn opening() -> Self {
        Self::default()
    }

    /// Applies one entry's debit and credit.
    ///
    /// Saturates at the `Decimal` range instead of panicking.
    #[must_use]
    pub fn next_entry(&self, debit: Decimal, credit: Decimal) -> Self {
        Self {
            previous: self.current,
            current: self.current.saturating_add(debit).saturating_sub(credit),
        }
    }

    /// Absolute value shown to users.
    #[must_use]
    pub fn amount(&self) -> Decimal {
        self.current.abs()
    }

    /// Sign classification of the current balance.
    #[must_use]
    pub fn balance_type(&self) -> BalanceType {
        BalanceType::from_signed(self.current)
    }
}

/// A student's balance as an absolute amount and its classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentBalance {
    /// Absolute balance.
    pub amount: Decimal,
    /// Dr, Cr or Nil.
    pub balance_type: BalanceType,
}

impl CurrentBalance {
    /// A settled balance.
    pub const ZERO: Self = Self {
        amount: Decimal::ZERO,
        balance_type: BalanceType::Nil,
    };
}

/// A cached balance that no longer matches the fold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceUpdate {
    /// The entry whose cache must be rewritten.
    pub entry_id: LedgerEntryId,
    /// Recomputed absolute balance.
    pub balance: Decimal,
    /// Recomputed classification.
    pub balance_type: BalanceType,
}

/// Stateless balance calculator.
pub struct BalanceCalculator;

impl BalanceCalculator {
    /// Sorts entries into fold order: `(date, entry_number)` ascending.
    pub fn order(entries: &mut [LedgerEntry]) {
        entries.sort_by_key(|e| (e.date, e.entry_number));
    }

    /// Orders one student's entries and fills in `balance`/`balance_type`.
    #[must_use]
    pub fn compute_running_balances(mut entries: Vec<LedgerEntry>) -> Vec<LedgerEntry> {
        Self::order(&mut entries);

        let mut running = RunningBalance::opening();
        for entry in &mut entries {
            running = running.next_entry(entry.debit, entry.credit);
            entry.balance = running.amount();
            entry.balance_type = running.balance_type();
        }
        entries
    }

    /// Recomputes balances and reports which cached values were stale.
    ///
    /// Backdating an entry shifts every later entry's balance; only those
    /// whose cache actually differs are returned.
    #[must_use]
    pub fn recompute(entries: Vec<LedgerEntry>) -> (Vec<LedgerEntry>, Vec<BalanceUpdate>) {
        let cached: BTreeMap<LedgerEntryId, (Decimal, BalanceType)> = entries
            .iter()
            .map(|e| (e.id, (e.balance, e.balance_type)))
            .collect();

        let recomputed = Self::compute_running_balances(entries);
        let updates = recomputed
            .iter()
            .filter(|e| cached.get(&e.id) != Some(&(e.balance, e.balance_type)))
            .map(|e| BalanceUpdate {
                entry_id: e.id,
                balance: e.balance,
                balance_type: e.balance_type,
            })
            .collect();

        (recomputed, updates)
    }

    /// Balance after the last entry of an ordered sequence.
    #[must_use]
    pub fn current_balance(ordered: &[LedgerEntry]) -> CurrentBalance {
        ordered.last().map_or(CurrentBalance::ZERO, |last| CurrentBalance {
            amount: last.balance,
            balance_type: last.balance_type,
        })
    }

    /// Signed sum of `debit - credit`; independent of order.
    #[must_use]
    pub fn signed_total(entries: &[LedgerEntry]) -> Decimal {
        entries
            .iter()
            .map(LedgerEntry::signed_amount)
            .fold(Decimal::ZERO, Decimal::saturating_add)
    }
}

/// Read-only aggregate of one student's account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentBalance {
    /// The student.
    pub student_id: StudentId,
    /// Absolute balance after the last entry.
    pub current_balance: Decimal,
    /// Dr, Cr or Nil.
    pub balance_type: BalanceType,
    /// Sum of all debits, reversals included.
    pub debit_total: Decimal,
    /// Sum of all credits, reversals included.
    pub credit_total: Decimal,
    /// Number of entries, reversals included.
    pub total_entries: u64,
    /// Net `debit - credit` per type over live entries only.
    pub breakdown: BTreeMap<EntryType, Decimal>,
}

impl StudentBalance {
    /// Builds the view from a student's entries in fold order with balances filled.
    ///
    /// Reversed originals and the reversal entries cancelling them both stay in
    /// the fold but are left out of the breakdown, so the breakdown total still
    /// equals the signed balance.
    #[must_use]
    pub fn from_ordered(student_id: StudentId, ordered: &[LedgerEntry]) -> Self {
        let current = BalanceCalculator::current_balance(ordered);

        let mut breakdown: BTreeMap<EntryType, Decimal> =
            EntryType::ALL.into_iter().map(|t| (t, Decimal::ZERO)).collect();
        for entry in ordered.iter().filter(|e| e.is_live()) {
            let net = breakdown.entry(entry.entry_type).or_default();
            *net = net.saturating_add(entry.signed_amount());
        }

        Self {
            student_id,
            current_balance: current.amount,
            balance_type: current.balance_type,
            debit_total: ordered.iter().map(|e| e.debit).fold(Decimal::ZERO, Decimal::saturating_add),
            credit_total: ordered.iter().map(|e| e.credit).fold(Decimal::ZERO, Decimal::saturating_add),
            total_entries: u64::try_from(ordered.len()).unwrap_or(u64::MAX),
            breakdown,
        }
    }

    /// Signed balance (`debit_total - credit_total`).
    #[must_use]
    pub fn signed_balance(&self) -> Decimal {
        self.debit_total.saturating_sub(self.credit_total)
    }
}
