use std::sync::Arc;

use thiserror::Error;

use stockroom_core::{ExpectedVersion, SaleId, TenantId};
use stockroom_ledger::{InvoiceNumber, PositionKey, Sale, StockPosition};

/// A stock position write conditioned on a version stamp.
///
/// `position` carries the computed new state; `expected` is the version the
/// caller read before computing it. The store compares the stamp under its
/// own lock/transaction and assigns the next version on success, so a check
/// performed far in advance of the write can never slip through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionWrite {
    pub position: StockPosition,
    pub expected: ExpectedVersion,
}

impl PositionWrite {
    pub fn new(position: StockPosition, expected: ExpectedVersion) -> Self {
        Self { position, expected }
    }

    /// Condition the write on the version the position currently carries.
    ///
    /// This is the common case: the caller loaded the position, computed a
    /// new quantity, and expects nobody to have written in between.
    pub fn from_read(position: StockPosition) -> Self {
        let expected = ExpectedVersion::Exact(position.version());
        Self { position, expected }
    }
}

/// Ledger store operation error.
///
/// These are **infrastructure errors** (concurrency, storage) as opposed to
/// domain errors (validation, invariants). The service layer maps both into
/// its caller-facing taxonomy.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Optimistic concurrency check failed (version mismatch).
    #[error("optimistic concurrency check failed: {0}")]
    Conflict(String),

    /// Invoice number already taken (must trigger regeneration, never overwrite).
    #[error("duplicate invoice number: {0}")]
    DuplicateInvoice(String),

    /// Invalid record state or malformed write.
    #[error("invalid write: {0}")]
    Invalid(String),

    /// Underlying storage unavailable (pool closed, connection loss).
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Transactional, tenant-scoped ledger store.
///
/// ## Design Principles
///
/// - **No storage assumptions**: works with the in-memory implementation
///   (tests/dev) and the Postgres backend (production)
/// - **Tenant isolation**: every read and write is scoped by `TenantId`
/// - **Optimistic locking**: via version stamps on positions and sales
/// - **Atomic multi-row writes**: `commit_sale`/`update_sale` persist the
///   sale and all position updates together or not at all
///
/// ## Write Semantics
///
/// Implementations must validate **every** version stamp in a batch before
/// mutating anything, so a failed call leaves no partial update visible to
/// other readers. Version stamps are assigned by the store: the first
/// durable write of a record stores version 1, and every subsequent write
/// bumps it by one.
///
/// ## Invoice Numbers
///
/// `allocate_invoice_number` hands out candidates from a monotonic sequence;
/// uniqueness is enforced again at commit time. A collision surfaces as
/// [`StoreError::DuplicateInvoice`] and the caller regenerates; a committed
/// sale's number is never silently overwritten.
pub trait LedgerStore: Send + Sync {
    /// Load one stock position, if it has ever been persisted.
    fn load_position(&self, key: &PositionKey) -> Result<Option<StockPosition>, StoreError>;

    /// All positions of a tenant.
    fn positions(&self, tenant_id: TenantId) -> Result<Vec<StockPosition>, StoreError>;

    /// Persist a single position write (version-checked).
    fn save_position(&self, write: PositionWrite) -> Result<StockPosition, StoreError>;

    /// Allocate a candidate invoice number.
    fn allocate_invoice_number(&self) -> Result<InvoiceNumber, StoreError>;

    /// Atomically persist a new sale plus its position decrements.
    fn commit_sale(
        &self,
        sale: Sale,
        positions: Vec<PositionWrite>,
    ) -> Result<Sale, StoreError>;

    /// Atomically persist a sale update (version-checked) plus position
    /// restorations (the return path).
    fn update_sale(
        &self,
        sale: Sale,
        expected: ExpectedVersion,
        positions: Vec<PositionWrite>,
    ) -> Result<Sale, StoreError>;

    /// Load one sale, if it exists for the tenant.
    fn load_sale(&self, tenant_id: TenantId, sale_id: SaleId) -> Result<Option<Sale>, StoreError>;

    /// All sales of a tenant.
    fn sales(&self, tenant_id: TenantId) -> Result<Vec<Sale>, StoreError>;
}

impl<S> LedgerStore for Arc<S>
where
    S: LedgerStore + ?Sized,
{
    fn load_position(&self, key: &PositionKey) -> Result<Option<StockPosition>, StoreError> {
        (**self).load_position(key)
    }

    fn positions(&self, tenant_id: TenantId) -> Result<Vec<StockPosition>, StoreError> {
        (**self).positions(tenant_id)
    }

    fn save_position(&self, write: PositionWrite) -> Result<StockPosition, StoreError> {
        (**self).save_position(write)
    }

    fn allocate_invoice_number(&self) -> Result<InvoiceNumber, StoreError> {
        (**self).allocate_invoice_number()
    }

    fn commit_sale(
        &self,
        sale: Sale,
        positions: Vec<PositionWrite>,
    ) -> Result<Sale, StoreError> {
        (**self).commit_sale(sale, positions)
    }

    fn update_sale(
        &self,
        sale: Sale,
        expected: ExpectedVersion,
        positions: Vec<PositionWrite>,
    ) -> Result<Sale, StoreError> {
        (**self).update_sale(sale, expected, positions)
    }

    fn load_sale(&self, tenant_id: TenantId, sale_id: SaleId) -> Result<Option<Sale>, StoreError> {
        (**self).load_sale(tenant_id, sale_id)
    }

    fn sales(&self, tenant_id: TenantId) -> Result<Vec<Sale>, StoreError> {
        (**self).sales(tenant_id)
    }
}
