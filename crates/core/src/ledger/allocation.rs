//! Allocation of payments against invoices.
//!
//! Outstanding amounts are always derived by subtracting allocations from the
//! entry's own amount; entries are never mutated by allocation.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::entry::{Allocation, LedgerEntry, check_amount};
use super::error::LedgerError;
use super::types::{AllocationSide, EntryType};

/// How much of an entry has been allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outstanding {
    /// The entry's own amount (invoice debit or payment credit).
    pub amount: Decimal,
    /// Sum of allocations touching the entry.
    pub allocated: Decimal,
    /// `amount - allocated`.
    pub outstanding: Decimal,
}

/// Stateless allocation rules.
pub struct AllocationService;

impl AllocationService {
    /// Computes what is left on an entry given the allocations that touch it.
    ///
    /// Allocations not referencing the entry are ignored.
    #[must_use]
    pub fn outstanding(entry: &LedgerEntry, allocations: &[Allocation]) -> Outstanding {
        let allocated: Decimal = allocations
            .iter()
            .filter(|a| a.payment_id == entry.id || a.invoice_id == entry.id)
            .map(|a| a.allocated_amount)
            .fold(Decimal::ZERO, Decimal::saturating_add);
        let amount = entry.amount();
        Outstanding {
            amount,
            allocated,
            outstanding: amount - allocated,
        }
    }

    /// Checks a requested allocation against both entries and their existing
    /// allocations.
    ///
    /// Checks, in order:
    /// 1. amount is strictly positive and fits `NUMERIC(19,4)`
    /// 2. the payment is a Payment credit, the invoice an Invoice debit
    /// 3. neither entry has been reversed
    /// 4. both belong to the same student
    /// 5. the invoice's outstanding debit covers the amount
    /// 6. the payment's unallocated credit covers the amount
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount`, `Validation`, `AlreadyReversed`,
    /// `StudentMismatch` or `OverAllocation`.
    pub fn validate(
        payment: &LedgerEntry,
        invoice: &LedgerEntry,
        payment_allocations: &[Allocation],
        invoice_allocations: &[Allocation],
        amount: Decimal,
    ) -> Result<(), LedgerError> {
        check_amount(amount)?;

        if payment.entry_type != EntryType::Payment
            || payment.credit <= Decimal::ZERO
            || payment.is_reversal()
        {
            return Err(LedgerError::Validation(format!(
                "Entry {} is not a payment credit",
                payment.id
            )));
        }
        if invoice.entry_type != EntryType::Invoice
            || invoice.debit <= Decimal::ZERO
            || invoice.is_reversal()
        {
            return Err(LedgerError::Validation(format!(
                "Entry {} is not an invoice debit",
                invoice.id
            )));
        }

        for entry in [payment, invoice] {
            if entry.is_reversed {
                return Err(LedgerError::AlreadyReversed(entry.id));
            }
        }

        if payment.student_id != invoice.student_id {
            return Err(LedgerError::StudentMismatch {
                payment_student: payment.student_id,
                invoice_student: invoice.student_id,
            });
        }

        let invoice_left = Self::outstanding(invoice, invoice_allocations).outstanding;
        if amount > invoice_left {
            return Err(LedgerError::OverAllocation {
                side: AllocationSide::Invoice,
                requested: amount,
                available: invoice_left,
            });
        }

        let payment_left = Self::outstanding(payment, payment_allocations).outstanding;
        if amount > payment_left {
            return Err(LedgerError::OverAllocation {
                side: AllocationSide::Payment,
                requested: amount,
                available: payment_left,
            });
        }

        Ok(())
    }
}
