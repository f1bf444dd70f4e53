//! Transactional ledger store boundary.
//!
//! This module defines an infrastructure-facing abstraction for persisting
//! stock positions and sales without making any storage assumptions. Any
//! backend offering a transactional read-modify-write over keyed records and
//! an atomic multi-row write satisfies it.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryLedgerStore;
pub use postgres::PostgresLedgerStore;
pub use r#trait::{LedgerStore, PositionWrite, StoreError};
