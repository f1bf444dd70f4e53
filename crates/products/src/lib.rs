//! `stockroom-products` — the product catalog.
//!
//! Entity type plus the read-only registry capability the ledger uses to
//! validate sale lines and adjustments.

pub mod product;

pub use product::{InMemoryProductRegistry, Product, ProductRegistry};
