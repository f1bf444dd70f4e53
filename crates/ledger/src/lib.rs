//! `stockroom-ledger` — the stock ledger domain.
//!
//! Owns the authoritative on-hand quantity for each (supplier, product) pair
//! and the sale/return transactions that consume and restore it. This crate
//! is pure decision logic: validation and arithmetic only, no IO. Persistence
//! and orchestration live in `stockroom-infra`.

pub mod position;
pub mod sale;

pub use position::{AdjustStock, PositionKey, StockPosition};
pub use sale::{
    InvoiceNumber, LineReturn, NewSale, NewSaleLine, PaymentMethod, ReturnSale, Sale, SaleLine,
    SaleStatus,
};
