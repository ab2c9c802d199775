//! Posting service for building new ledger entries.

use chrono::NaiveDate;
use hostel_shared::types::LedgerEntryId;

use super::entry::{NewLedgerEntry, check_amount, check_debit_credit};
use super::error::LedgerError;
use super::types::{Direction, EntryType, PostingInput};

/// Stateless service that validates posting input.
pub struct PostingService;

impl PostingService {
    /// Resolves which side an entry posts on.
    ///
    /// Invoice/Penalty always debit, Payment/Discount/Refund always credit.
    /// Adjustments must name a direction. A direction that contradicts the
    /// type is rejected rather than silently ignored.
    pub fn resolve_direction(
        entry_type: EntryType,
        requested: Option<Direction>,
    ) -> Result<Direction, LedgerError> {
        match (entry_type.natural_direction(), requested) {
            (None, Some(direction)) => Ok(direction),
            (None, None) => Err(LedgerError::Validation(
                "Adjustment entries require an explicit direction (debit or credit)".to_string(),
            )),
            (Some(natural), None) => Ok(natural),
            (Some(natural), Some(direction)) if natural == direction => Ok(natural),
            (Some(_), Some(direction)) => Err(LedgerError::Validation(format!(
                "{entry_type} entries cannot be posted as {direction:?}"
            ))),
        }
    }

    /// Validates the input and builds the entry to append.
    ///
    /// Runs every check before anything touches the store:
    /// 1. amount is strictly positive and fits `NUMERIC(19,4)`
    /// 2. description is not blank
    /// 3. direction resolves for the type
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount` or `Validation`.
    pub fn prepare(input: &PostingInput, today: NaiveDate) -> Result<NewLedgerEntry, LedgerError> {
        check_amount(input.amount)?;

        let description = input.description.trim();
        if description.is_empty() {
            return Err(LedgerError::Validation("Description is required".to_string()));
        }

        let direction = Self::resolve_direction(input.entry_type, input.direction)?;
        let (debit, credit) = direction.split(input.amount);
        check_debit_credit(debit, credit)?;

        Ok(NewLedgerEntry {
            id: LedgerEntryId::new(),
            student_id: input.student_id,
            date: input.date.unwrap_or(today),
            entry_type: input.entry_type,
            description: description.to_string(),
            debit,
            credit,
            reference_id: input.reference_id,
            reversal_of: None,
        })
    }
}
