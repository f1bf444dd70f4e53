use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockroom_core::{LedgerError, LedgerResult, ProductId, SupplierId, TenantId};

/// Key of a stock position: one (supplier, product) pair within a tenant.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PositionKey {
    pub tenant_id: TenantId,
    pub supplier_id: SupplierId,
    pub product_id: ProductId,
}

impl PositionKey {
    pub fn new(tenant_id: TenantId, supplier_id: SupplierId, product_id: ProductId) -> Self {
        Self {
            tenant_id,
            supplier_id,
            product_id,
        }
    }
}

impl core::fmt::Display for PositionKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "supplier {} / product {}",
            self.supplier_id, self.product_id
        )
    }
}

/// Command: adjust a stock position directly (receiving stock, correction).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustStock {
    pub tenant_id: TenantId,
    pub supplier_id: SupplierId,
    pub product_id: ProductId,
    /// Signed, non-zero quantity delta.
    pub delta_qty: i64,
    /// Unit cost of the received stock; recorded informationally when present.
    pub unit_cost: Option<Decimal>,
}

/// Authoritative on-hand quantity for one (supplier, product) pair.
///
/// Invariant: `qty_on_hand` is never negative. A position comes into
/// existence on the first positive adjustment for its key and is never
/// deleted afterwards.
///
/// The version stamp is owned by the store: 0 means "never persisted", and
/// every durable write bumps it by one. Methods here return updated copies
/// with the stamp untouched; the store assigns the next one on commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockPosition {
    key: PositionKey,
    qty_on_hand: i64,
    last_unit_cost: Option<Decimal>,
    version: u64,
}

impl StockPosition {
    /// A fresh, never-persisted position at quantity zero.
    pub fn open(key: PositionKey) -> Self {
        Self {
            key,
            qty_on_hand: 0,
            last_unit_cost: None,
            version: 0,
        }
    }

    /// Rebuild a position from stored parts (e.g. a database row).
    pub fn from_parts(
        key: PositionKey,
        qty_on_hand: i64,
        last_unit_cost: Option<Decimal>,
        version: u64,
    ) -> LedgerResult<Self> {
        if qty_on_hand < 0 {
            return Err(LedgerError::validation(format!(
                "stored quantity for {key} is negative ({qty_on_hand})"
            )));
        }
        Ok(Self {
            key,
            qty_on_hand,
            last_unit_cost,
            version,
        })
    }

    pub fn key(&self) -> PositionKey {
        self.key
    }

    pub fn tenant_id(&self) -> TenantId {
        self.key.tenant_id
    }

    pub fn supplier_id(&self) -> SupplierId {
        self.key.supplier_id
    }

    pub fn product_id(&self) -> ProductId {
        self.key.product_id
    }

    pub fn qty_on_hand(&self) -> i64 {
        self.qty_on_hand
    }

    pub fn last_unit_cost(&self) -> Option<Decimal> {
        self.last_unit_cost
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Stamp the version assigned by the store.
    pub fn at_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    /// Apply a signed quantity delta, gated by the non-negativity invariant.
    ///
    /// Returns the updated position without mutating `self`; state only
    /// changes once the store commits the copy.
    pub fn with_delta(&self, delta_qty: i64, unit_cost: Option<Decimal>) -> LedgerResult<Self> {
        if delta_qty == 0 {
            return Err(LedgerError::validation("delta_qty cannot be zero"));
        }
        if let Some(cost) = unit_cost {
            if cost < Decimal::ZERO {
                return Err(LedgerError::validation("unit_cost cannot be negative"));
            }
        }

        let new_qty = self
            .qty_on_hand
            .checked_add(delta_qty)
            .ok_or_else(|| LedgerError::validation("quantity overflow"))?;
        if new_qty < 0 {
            return Err(LedgerError::insufficient_stock(
                self.key.supplier_id,
                self.key.product_id,
                -delta_qty,
                self.qty_on_hand,
            ));
        }

        Ok(Self {
            key: self.key,
            qty_on_hand: new_qty,
            last_unit_cost: unit_cost.or(self.last_unit_cost),
            version: self.version,
        })
    }

    /// Restore quantity sold by a returned sale line.
    ///
    /// Returns never record a cost and can never fail the non-negativity
    /// check, so this is narrower than [`StockPosition::with_delta`].
    pub fn with_return(&self, quantity: i64) -> LedgerResult<Self> {
        if quantity <= 0 {
            return Err(LedgerError::validation(
                "returned quantity must be positive",
            ));
        }
        let new_qty = self
            .qty_on_hand
            .checked_add(quantity)
            .ok_or_else(|| LedgerError::validation("quantity overflow"))?;

        Ok(Self {
            key: self.key,
            qty_on_hand: new_qty,
            last_unit_cost: self.last_unit_cost,
            version: self.version,
        })
    }
}
