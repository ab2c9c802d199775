//! Ledger domain types for posting and balance classification.
//!
//! This module defines the vocabulary of the student ledger: what kind of
//! financial event an entry records, which side of the account it hits,
//! and how a running balance is classified.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use hostel_shared::types::StudentId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::LedgerError;

/// Kind of financial event recorded by a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    /// Charge raised against the student.
    Invoice,
    /// Money received from the student.
    Payment,
    /// Reduction of what the student owes.
    Discount,
    /// Manual correction, either direction.
    Adjustment,
    /// Amount credited back to the student.
    Refund,
    /// Fine or late fee.
    Penalty,
}

impl EntryType {
    /// All entry types, in reporting order.
    pub const ALL: [Self; 6] = [
        Self::Invoice,
        Self::Payment,
        Self::Discount,
        Self::Adjustment,
        Self::Refund,
        Self::Penalty,
    ];

    /// Returns the direction this type always posts on, or `None` for
    /// adjustments, which must be told.
    ///
    /// - Invoice/Penalty: debit (increase what the student owes)
    /// - Payment/Discount/Refund: credit
    #[must_use]
    pub fn natural_direction(self) -> Option<Direction> {
        match self {
            Self::Invoice | Self::Penalty => Some(Direction::Debit),
            Self::Payment | Self::Discount | Self::Refund => Some(Direction::Credit),
            Self::Adjustment => None,
        }
    }

    /// Returns the wire/storage name of this type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Invoice => "invoice",
            Self::Payment => "payment",
            Self::Discount => "discount",
            Self::Adjustment => "adjustment",
            Self::Refund => "refund",
            Self::Penalty => "penalty",
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| LedgerError::Validation(format!("Unknown entry type: {s}")))
    }
}

/// Side of the student account an entry hits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Increases what the student owes.
    Debit,
    /// Decreases what the student owes.
    Credit,
}

impl Direction {
    /// Returns the other side.
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::Debit => Self::Credit,
            Self::Credit => Self::Debit,
        }
    }

    /// Splits a positive amount into `(debit, credit)`.
    #[must_use]
    pub fn split(self, amount: Decimal) -> (Decimal, Decimal) {
        match self {
            Self::Debit => (amount, Decimal::ZERO),
            Self::Credit => (Decimal::ZERO, amount),
        }
    }
}

impl FromStr for Direction {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debit" => Ok(Self::Debit),
            "credit" => Ok(Self::Credit),
            other => Err(LedgerError::Validation(format!(
                "Direction must be 'debit' or 'credit', got '{other}'"
            ))),
        }
    }
}

/// Sign classification of a running balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BalanceType {
    /// Cumulative debits exceed credits: the student owes.
    Dr,
    /// Cumulative credits exceed debits: the hostel owes the student.
    Cr,
    /// Settled.
    #[default]
    Nil,
}

impl BalanceType {
    /// Classifies a signed running total (`debits - credits`).
    #[must_use]
    pub fn from_signed(running: Decimal) -> Self {
        if running > Decimal::ZERO {
            Self::Dr
        } else if running < Decimal::ZERO {
            Self::Cr
        } else {
            Self::Nil
        }
    }

    /// Returns the storage name of this balance type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dr => "Dr",
            Self::Cr => "Cr",
            Self::Nil => "Nil",
        }
    }
}

impl FromStr for BalanceType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Dr" => Ok(Self::Dr),
            "Cr" => Ok(Self::Cr),
            "Nil" => Ok(Self::Nil),
            other => Err(LedgerError::Validation(format!("Unknown balance type: {other}"))),
        }
    }
}

/// Input for posting a new entry.
#[derive(Debug, Clone)]
pub struct PostingInput {
    /// The student account to post to.
    pub student_id: StudentId,
    /// What kind of event this is.
    pub entry_type: EntryType,
    /// Positive amount.
    pub amount: Decimal,
    /// Free text shown on statements.
    pub description: String,
    /// Business date; defaults to today.
    pub date: Option<NaiveDate>,
    /// Originating invoice/payment/discount record.
    pub reference_id: Option<Uuid>,
    /// Required for adjustments, optional (but must agree) otherwise.
    pub direction: Option<Direction>,
}

impl PostingInput {
    /// Creates an input with no date, reference or explicit direction.
    #[must_use]
    pub fn new(
        student_id: StudentId,
        entry_type: EntryType,
        amount: Decimal,
        description: impl Into<String>,
    ) -> Self {
        Self {
            student_id,
            entry_type,
            amount,
            description: description.into(),
            date: None,
            reference_id: None,
            direction: None,
        }
    }

    /// Sets the business date.
    #[must_use]
    pub fn on(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    /// Sets the explicit direction.
    #[must_use]
    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }

    /// Sets the external reference.
    #[must_use]
    pub fn reference(mut self, reference_id: Uuid) -> Self {
        self.reference_id = Some(reference_id);
        self
    }
}

/// Which side of an allocation ran out of room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllocationSide {
    /// The invoice's outstanding debit.
    Invoice,
    /// The payment's unallocated credit.
    Payment,
}

impl fmt::Display for AllocationSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invoice => f.write_str("invoice"),
            Self::Payment => f.write_str("payment"),
        }
    }
}
