//! Shared identifiers, pagination, and configuration for the hostel ledger.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for type-safe entity references
//! - Pagination types for list endpoints
//! - Configuration management

pub mod config;
pub mod types;

pub use config::{AppConfig, LedgerConfig};
