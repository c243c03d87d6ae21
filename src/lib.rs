//! A multi-currency personal banking ledger over a single SQLite file.
//!
//! The crate is organised around four persisted record types (users, banks,
//! accounts and append-only transactions), a generic record store, a
//! validation layer for account data, an external currency-rate collaborator
//! and a transfer processor that moves money between two accounts.

pub mod cli;
pub mod config;
pub mod currency;
pub mod database;
pub mod ledger;
pub mod validation;
