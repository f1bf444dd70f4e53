//! Ledger operation pipeline (application-level orchestration).
//!
//! `StockLedger` is the one sanctioned entry point for mutating stock: it
//! validates input, consults the supplier/customer/product registries, runs
//! the read-compute-write cycle against the store, and retries version
//! conflicts up to a bounded budget. Domain code stays pure; all IO flows
//! through the injected store and registries.
//!
//! ## Execution Guarantees
//!
//! - **Atomicity**: a failed operation leaves no partial update visible to
//!   other readers; multi-line sales commit every position decrement and the
//!   sale itself together or not at all
//! - **Consistency**: stock checks are re-validated on every retry attempt
//!   under the same version stamps that guard the write, never as a separate
//!   read far in advance of it
//! - **Bounded retry**: only transient store conflicts are retried; domain
//!   failures (insufficient stock, missing references) surface immediately

use std::collections::HashMap;

use thiserror::Error;
use tracing::{debug, warn};

use stockroom_core::{
    ExpectedVersion, LedgerError, ProductId, SaleId, SupplierId, TenantId,
};
use stockroom_ledger::{
    AdjustStock, NewSale, PositionKey, ReturnSale, Sale, SaleLine, StockPosition,
};
use stockroom_parties::{CustomerRegistry, SupplierRegistry};
use stockroom_products::ProductRegistry;

use crate::store::{LedgerStore, PositionWrite, StoreError};

/// Caller-facing error for ledger operations.
///
/// The HTTP collaborator maps these to status codes: `NotFound` → 404;
/// `Validation`, `InsufficientStock`, `AlreadyReturned` → 400; `Conflict` →
/// 409; `Storage` → 500. The first four are expected, recoverable
/// conditions; none of them implies partial state mutation.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed input (non-positive quantity, empty sale, bad reference mix).
    #[error("validation failed: {0}")]
    Validation(String),

    /// Referenced supplier, product, customer, stock position, or sale is missing.
    #[error("not found: {0}")]
    NotFound(String),

    /// Requested decrement exceeds the current on-hand quantity.
    #[error(
        "insufficient stock for product {product_id} from supplier {supplier_id}: \
         requested {requested}, available {available}"
    )]
    InsufficientStock {
        supplier_id: SupplierId,
        product_id: ProductId,
        requested: i64,
        available: i64,
    },

    /// Return requested on a line already marked returned.
    #[error("already returned: {0}")]
    AlreadyReturned(String),

    /// Optimistic version conflicts exhausted the retry budget.
    #[error("concurrency conflict: {0}")]
    Conflict(String),

    /// Underlying persistence failed; the caller must not assume any effect.
    #[error("storage failure: {0}")]
    Storage(StoreError),
}

impl From<LedgerError> for ServiceError {
    fn from(value: LedgerError) -> Self {
        match value {
            LedgerError::Validation(msg) => ServiceError::Validation(msg),
            LedgerError::InvalidId(msg) => ServiceError::Validation(msg),
            LedgerError::NotFound(msg) => ServiceError::NotFound(msg),
            LedgerError::InsufficientStock {
                supplier_id,
                product_id,
                requested,
                available,
            } => ServiceError::InsufficientStock {
                supplier_id,
                product_id,
                requested,
                available,
            },
            LedgerError::AlreadyReturned(msg) => ServiceError::AlreadyReturned(msg),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Conflict(msg) => ServiceError::Conflict(msg),
            StoreError::DuplicateInvoice(msg) => ServiceError::Conflict(msg),
            other => ServiceError::Storage(other),
        }
    }
}

/// Tunables for the operation pipeline.
#[derive(Debug, Clone, Copy)]
pub struct ServiceConfig {
    /// Read-compute-write attempts before a conflict surfaces to the caller.
    pub max_retries: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self { max_retries: 5 }
    }
}

/// The stock ledger service.
///
/// Generic over the store and the three read-only registries so tests can
/// run entirely in memory and production can wire Postgres plus real
/// catalog lookups without changing domain code.
#[derive(Debug)]
pub struct StockLedger<S, SR, CR, PR> {
    store: S,
    suppliers: SR,
    customers: CR,
    products: PR,
    config: ServiceConfig,
}

impl<S, SR, CR, PR> StockLedger<S, SR, CR, PR> {
    pub fn new(store: S, suppliers: SR, customers: CR, products: PR) -> Self {
        Self {
            store,
            suppliers,
            customers,
            products,
            config: ServiceConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ServiceConfig) -> Self {
        self.config = config;
        self
    }
}

impl<S, SR, CR, PR> StockLedger<S, SR, CR, PR>
where
    S: LedgerStore,
    SR: SupplierRegistry,
    CR: CustomerRegistry,
    PR: ProductRegistry,
{
    /// Directly adjust a stock position (receiving stock, correction).
    ///
    /// Creates the position on the first positive adjustment for its key;
    /// decrementing a position that does not exist is `NotFound`, and a
    /// decrement below zero is `InsufficientStock` with state unchanged.
    pub fn adjust_stock(&self, cmd: AdjustStock) -> Result<StockPosition, ServiceError> {
        if cmd.delta_qty == 0 {
            return Err(ServiceError::Validation(
                "delta_qty cannot be zero".to_string(),
            ));
        }
        if !self.suppliers.exists(cmd.tenant_id, cmd.supplier_id) {
            return Err(ServiceError::NotFound(format!(
                "supplier {}",
                cmd.supplier_id
            )));
        }
        if !self.products.exists(cmd.tenant_id, cmd.product_id) {
            return Err(ServiceError::NotFound(format!(
                "product {}",
                cmd.product_id
            )));
        }

        let key = PositionKey::new(cmd.tenant_id, cmd.supplier_id, cmd.product_id);
        let mut attempt = 0;
        loop {
            let current = match self.store.load_position(&key)? {
                Some(position) => position,
                None if cmd.delta_qty < 0 => {
                    return Err(ServiceError::NotFound(format!(
                        "no stock position for {key}"
                    )));
                }
                None => StockPosition::open(key),
            };

            let updated = current.with_delta(cmd.delta_qty, cmd.unit_cost)?;
            match self.store.save_position(PositionWrite::from_read(updated)) {
                Ok(stored) => return Ok(stored),
                Err(StoreError::Conflict(msg)) => {
                    attempt += 1;
                    if attempt >= self.config.max_retries {
                        warn!(%key, attempts = attempt, "adjustment retry budget exhausted");
                        return Err(ServiceError::Conflict(msg));
                    }
                    debug!(%key, attempt, "version conflict on adjustment, retrying");
                }
                Err(other) => return Err(other.into()),
            }
        }
    }

    /// Record a sale as a single all-or-nothing unit.
    ///
    /// Every line is validated against its stock position before any
    /// position is decremented; a failure on line k leaves lines 1..k
    /// untouched too. The sale header, its lines, and all decrements commit
    /// in one store transaction.
    pub fn record_sale(&self, cmd: NewSale) -> Result<Sale, ServiceError> {
        if cmd.lines.is_empty() {
            return Err(ServiceError::Validation(
                "a sale must have at least one line".to_string(),
            ));
        }
        if !self.customers.exists(cmd.tenant_id, cmd.customer_id) {
            return Err(ServiceError::NotFound(format!(
                "customer {}",
                cmd.customer_id
            )));
        }

        let mut lines = Vec::with_capacity(cmd.lines.len());
        for (idx, line) in cmd.lines.iter().enumerate() {
            let product = self
                .products
                .get(cmd.tenant_id, line.product_id)
                .ok_or_else(|| ServiceError::NotFound(format!("product {}", line.product_id)))?;
            if !self.suppliers.exists(cmd.tenant_id, line.supplier_id) {
                return Err(ServiceError::NotFound(format!(
                    "supplier {}",
                    line.supplier_id
                )));
            }
            let unit_price = line.unit_price.unwrap_or(product.price);
            lines.push(SaleLine::new(
                idx as u32 + 1,
                line.supplier_id,
                line.product_id,
                line.quantity,
                unit_price,
            )?);
        }

        // Lines may repeat a (supplier, product) pair; each position gets one
        // combined decrement so its stamp is checked exactly once.
        let mut required: HashMap<PositionKey, i64> = HashMap::new();
        for line in &lines {
            let key = PositionKey::new(cmd.tenant_id, line.supplier_id(), line.product_id());
            *required.entry(key).or_insert(0) += line.quantity();
        }

        let mut attempt = 0;
        loop {
            let mut writes = Vec::with_capacity(required.len());
            for (key, qty) in &required {
                let position = self.store.load_position(key)?.ok_or_else(|| {
                    ServiceError::NotFound(format!("no stock position for {key}"))
                })?;
                if position.qty_on_hand() < *qty {
                    return Err(ServiceError::InsufficientStock {
                        supplier_id: key.supplier_id,
                        product_id: key.product_id,
                        requested: *qty,
                        available: position.qty_on_hand(),
                    });
                }
                writes.push(PositionWrite::from_read(position.with_delta(-*qty, None)?));
            }

            let invoice_no = self.store.allocate_invoice_number()?;
            let sale = Sale::record(
                SaleId::new(),
                cmd.tenant_id,
                invoice_no,
                cmd.customer_id,
                cmd.occurred_at,
                cmd.payment_method,
                cmd.discount,
                cmd.tax,
                lines.clone(),
            )?;

            match self.store.commit_sale(sale, writes) {
                Ok(committed) => {
                    debug!(
                        sale_id = %committed.id(),
                        invoice_no = %committed.invoice_no(),
                        lines = committed.lines().len(),
                        "sale committed"
                    );
                    return Ok(committed);
                }
                Err(StoreError::Conflict(msg)) | Err(StoreError::DuplicateInvoice(msg)) => {
                    attempt += 1;
                    if attempt >= self.config.max_retries {
                        warn!(attempts = attempt, "sale retry budget exhausted");
                        return Err(ServiceError::Conflict(msg));
                    }
                    debug!(attempt, "conflict while committing sale, retrying");
                }
                Err(other) => return Err(other.into()),
            }
        }
    }

    /// Return a committed sale, or one line of it.
    ///
    /// Marks the targeted line(s) returned and restores exactly the quantity
    /// originally sold to each originating position. A second return of the
    /// same line fails with `AlreadyReturned` and restores nothing.
    pub fn return_sale(&self, cmd: ReturnSale) -> Result<Sale, ServiceError> {
        let mut attempt = 0;
        loop {
            let mut sale = self
                .store
                .load_sale(cmd.tenant_id, cmd.sale_id)?
                .ok_or_else(|| ServiceError::NotFound(format!("sale {}", cmd.sale_id)))?;
            let expected = ExpectedVersion::Exact(sale.version());

            let restored = sale.mark_returned(cmd.line_no, cmd.reason.clone())?;

            let mut restocks: HashMap<PositionKey, i64> = HashMap::new();
            for line in &restored {
                let key = PositionKey::new(cmd.tenant_id, line.supplier_id, line.product_id);
                *restocks.entry(key).or_insert(0) += line.quantity;
            }

            let mut writes = Vec::with_capacity(restocks.len());
            for (key, qty) in &restocks {
                // Positions are never deleted, so the originating position
                // must still exist; a missing row is corrupted storage.
                let position = self.store.load_position(key)?.ok_or_else(|| {
                    ServiceError::Storage(StoreError::Invalid(format!(
                        "missing stock position {key} for returned line"
                    )))
                })?;
                writes.push(PositionWrite::from_read(position.with_return(*qty)?));
            }

            match self.store.update_sale(sale, expected, writes) {
                Ok(updated) => {
                    debug!(
                        sale_id = %updated.id(),
                        fully_returned = updated.fully_returned(),
                        "return recorded"
                    );
                    return Ok(updated);
                }
                Err(StoreError::Conflict(msg)) => {
                    attempt += 1;
                    if attempt >= self.config.max_retries {
                        warn!(sale_id = %cmd.sale_id, attempts = attempt, "return retry budget exhausted");
                        return Err(ServiceError::Conflict(msg));
                    }
                    debug!(sale_id = %cmd.sale_id, attempt, "conflict while recording return, retrying");
                }
                Err(other) => return Err(other.into()),
            }
        }
    }

    /// One stock position.
    pub fn position(
        &self,
        tenant_id: TenantId,
        supplier_id: SupplierId,
        product_id: ProductId,
    ) -> Result<StockPosition, ServiceError> {
        let key = PositionKey::new(tenant_id, supplier_id, product_id);
        self.store
            .load_position(&key)?
            .ok_or_else(|| ServiceError::NotFound(format!("no stock position for {key}")))
    }

    /// All stock positions of a tenant.
    pub fn positions(&self, tenant_id: TenantId) -> Result<Vec<StockPosition>, ServiceError> {
        Ok(self.store.positions(tenant_id)?)
    }

    /// Total on-hand quantity of a product, summed across its suppliers.
    ///
    /// Always computed from the positions; there is deliberately no stored
    /// product-level counter to drift out of sync.
    pub fn product_stock(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> Result<i64, ServiceError> {
        if !self.products.exists(tenant_id, product_id) {
            return Err(ServiceError::NotFound(format!("product {product_id}")));
        }
        Ok(self
            .store
            .positions(tenant_id)?
            .iter()
            .filter(|p| p.product_id() == product_id)
            .map(|p| p.qty_on_hand())
            .sum())
    }

    /// One sale.
    pub fn sale(&self, tenant_id: TenantId, sale_id: SaleId) -> Result<Sale, ServiceError> {
        self.store
            .load_sale(tenant_id, sale_id)?
            .ok_or_else(|| ServiceError::NotFound(format!("sale {sale_id}")))
    }

    /// All sales of a tenant, oldest first.
    pub fn sales(&self, tenant_id: TenantId) -> Result<Vec<Sale>, ServiceError> {
        Ok(self.store.sales(tenant_id)?)
    }
}
