use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockroom_core::{LedgerError, LedgerResult, ProductId, SupplierId, TenantId};

/// A sellable product.
///
/// `supplier_id` records the primary supplier; the ledger tracks on-hand
/// quantity per (supplier, product) pair, so a product can be stocked from
/// other suppliers too. There is deliberately no stored stock counter here:
/// "total stock for a product" is a computed aggregate over the ledger's
/// positions, never a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub tenant_id: TenantId,
    pub supplier_id: SupplierId,
    pub name: String,
    /// List price used when a sale line does not override the unit price.
    pub price: Decimal,
    pub category: Option<String>,
}

impl Product {
    pub fn new(
        id: ProductId,
        tenant_id: TenantId,
        supplier_id: SupplierId,
        name: impl Into<String>,
        price: Decimal,
        category: Option<String>,
    ) -> LedgerResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(LedgerError::validation("product name cannot be empty"));
        }
        if price < Decimal::ZERO {
            return Err(LedgerError::validation("product price cannot be negative"));
        }
        Ok(Self {
            id,
            tenant_id,
            supplier_id,
            name,
            price,
            category,
        })
    }
}

/// Read-only product lookups.
pub trait ProductRegistry: Send + Sync {
    fn get(&self, tenant_id: TenantId, id: ProductId) -> Option<Product>;

    fn exists(&self, tenant_id: TenantId, id: ProductId) -> bool {
        self.get(tenant_id, id).is_some()
    }
}

impl<R> ProductRegistry for Arc<R>
where
    R: ProductRegistry + ?Sized,
{
    fn get(&self, tenant_id: TenantId, id: ProductId) -> Option<Product> {
        (**self).get(tenant_id, id)
    }
}

/// In-memory product registry.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryProductRegistry {
    products: RwLock<HashMap<(TenantId, ProductId), Product>>,
}

impl InMemoryProductRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, product: Product) {
        if let Ok(mut products) = self.products.write() {
            products.insert((product.tenant_id, product.id), product);
        }
    }
}

impl ProductRegistry for InMemoryProductRegistry {
    fn get(&self, tenant_id: TenantId, id: ProductId) -> Option<Product> {
        let products = self.products.read().ok()?;
        products.get(&(tenant_id, id)).cloned()
    }
}
