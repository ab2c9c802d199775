//! Ledger entry and allocation records.

use chrono::{DateTime, NaiveDate, Utc};
use hostel_shared::types::{AllocationId, LedgerEntryId, StudentId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::LedgerError;
use super::types::{BalanceType, Direction, EntryType};

/// An immutable record of one financial event on a student account.
///
/// Only `is_reversed` (false to true, once) and the cached
/// `balance`/`balance_type` ever change after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Unique identifier for this entry.
    pub id: LedgerEntryId,
    /// The student account this entry belongs to.
    pub student_id: StudentId,
    /// Global, strictly increasing sequence number.
    pub entry_number: i64,
    /// Business date; may be backdated.
    pub date: NaiveDate,
    /// What kind of event this is.
    pub entry_type: EntryType,
    /// Free text shown on statements.
    pub description: String,
    /// Debit amount (0 if credit).
    pub debit: Decimal,
    /// Credit amount (0 if debit).
    pub credit: Decimal,
    /// Cached absolute running balance after this entry.
    pub balance: Decimal,
    /// Cached classification of the running balance.
    pub balance_type: BalanceType,
    /// Originating record, or the reversed entry for reversals.
    pub reference_id: Option<Uuid>,
    /// Whether a reversal has been posted against this entry.
    pub is_reversed: bool,
    /// The entry this one reverses.
    pub reversal_of: Option<LedgerEntryId>,
    /// Wall-clock creation time (audit only).
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Returns the signed amount (positive for debit, negative for credit).
    #[must_use]
    pub fn signed_amount(&self) -> Decimal {
        self.debit - self.credit
    }

    /// Returns the positive side of the entry.
    #[must_use]
    pub fn amount(&self) -> Decimal {
        self.debit.max(self.credit)
    }

    /// Returns the side this entry was posted on.
    #[must_use]
    pub fn direction(&self) -> Direction {
        if self.debit > Decimal::ZERO {
            Direction::Debit
        } else {
            Direction::Credit
        }
    }

    /// Returns true if this entry reverses another.
    #[must_use]
    pub fn is_reversal(&self) -> bool {
        self.reversal_of.is_some()
    }

    /// Returns true if this entry still carries economic effect on its own:
    /// neither reversed nor a reversal.
    #[must_use]
    pub fn is_live(&self) -> bool {
        !self.is_reversed && !self.is_reversal()
    }
}

/// A validated entry ready to be appended; the store assigns the entry number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLedgerEntry {
    /// Identifier chosen up front so callers can log it before commit.
    pub id: LedgerEntryId,
    /// The student account.
    pub student_id: StudentId,
    /// Business date.
    pub date: NaiveDate,
    /// What kind of event this is.
    pub entry_type: EntryType,
    /// Free text.
    pub description: String,
    /// Debit amount.
    pub debit: Decimal,
    /// Credit amount.
    pub credit: Decimal,
    /// External reference.
    pub reference_id: Option<Uuid>,
    /// Set on reversal entries only.
    pub reversal_of: Option<LedgerEntryId>,
}

impl NewLedgerEntry {
    /// Materializes the entry once the store has assigned its number.
    ///
    /// The cached balance starts at zero/Nil until the balance calculator
    /// refreshes it.
    #[must_use]
    pub fn into_entry(self, entry_number: i64, created_at: DateTime<Utc>) -> LedgerEntry {
        LedgerEntry {
            id: self.id,
            student_id: self.student_id,
            entry_number,
            date: self.date,
            entry_type: self.entry_type,
            description: self.description,
            debit: self.debit,
            credit: self.credit,
            balance: Decimal::ZERO,
            balance_type: BalanceType::Nil,
            reference_id: self.reference_id,
            is_reversed: false,
            reversal_of: self.reversal_of,
            created_at,
        }
    }
}

/// Most decimal places a stored amount may carry (`NUMERIC(19,4)`).
pub const MAX_AMOUNT_SCALE: u32 = 4;

/// Exclusive upper bound for a single amount: 10^15, the integer range of
/// `NUMERIC(19,4)`.
pub const AMOUNT_LIMIT: Decimal = Decimal::from_parts(2_764_472_320, 232_830, 0, false, 0);

/// Checks that an amount is strictly positive and fits the stored precision.
///
/// # Errors
///
/// Returns `InvalidAmount` for zero, negative, over-scale or over-magnitude
/// amounts.
pub fn check_amount(amount: Decimal) -> Result<(), LedgerError> {
    if amount <= Decimal::ZERO
        || amount.normalize().scale() > MAX_AMOUNT_SCALE
        || amount >= AMOUNT_LIMIT
    {
        return Err(LedgerError::InvalidAmount(amount));
    }
    Ok(())
}

/// Checks that both sides are non-negative and exactly one is positive.
pub fn check_debit_credit(debit: Decimal, credit: Decimal) -> Result<(), LedgerError> {
    if debit < Decimal::ZERO || credit < Decimal::ZERO {
        return Err(LedgerError::Validation(
            "Debit and credit must not be negative".to_string(),
        ));
    }
    if (debit > Decimal::ZERO) == (credit > Decimal::ZERO) {
        return Err(LedgerError::Validation(
            "Exactly one of debit or credit must be positive".to_string(),
        ));
    }
    Ok(())
}

/// Link between a payment entry and an invoice entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    /// Unique identifier.
    pub id: AllocationId,
    /// The payment (credit) entry.
    pub payment_id: LedgerEntryId,
    /// The invoice (debit) entry.
    pub invoice_id: LedgerEntryId,
    /// Amount of the payment applied to the invoice.
    pub allocated_amount: Decimal,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// A requested allocation, not yet checked against outstanding amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewAllocation {
    /// Identifier for the new row.
    pub id: AllocationId,
    /// The payment entry.
    pub payment_id: LedgerEntryId,
    /// The invoice entry.
    pub invoice_id: LedgerEntryId,
    /// Amount to apply.
    pub amount: Decimal,
}

impl NewAllocation {
    /// Materializes the allocation row.
    #[must_use]
    pub fn into_allocation(self, created_at: DateTime<Utc>) -> Allocation {
        Allocation {
            id: self.id,
            payment_id: self.payment_id,
            invoice_id: self.invoice_id,
            allocated_amount: self.amount,
            created_at,
        }
    }
}
