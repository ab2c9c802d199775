//! Core business logic for the hostel student ledger.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! All domain types, validation rules, and balance calculations live here, plus
//! the [`ledger::LedgerStore`] seam that persistence layers implement.
//!
//! # Modules
//!
//! - `ledger` - Double-entry bookkeeping for student accounts

pub mod ledger;
