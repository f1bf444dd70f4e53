//! `stockroom-parties` — suppliers and customers.
//!
//! Entity types plus the read-only registry capability the ledger uses to
//! validate references before touching stock.

pub mod customer;
pub mod supplier;

pub use customer::{Customer, CustomerRegistry, InMemoryCustomerRegistry};
pub use supplier::{InMemorySupplierRegistry, Supplier, SupplierRegistry};
