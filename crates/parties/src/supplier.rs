use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use stockroom_core::{LedgerError, LedgerResult, SupplierId, TenantId};

/// A supplier of stocked products.
///
/// Suppliers are the first half of the (supplier, product) key every stock
/// position hangs off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplier {
    pub id: SupplierId,
    pub tenant_id: TenantId,
    pub name: String,
    pub phone: Option<String>,
}

impl Supplier {
    pub fn new(
        id: SupplierId,
        tenant_id: TenantId,
        name: impl Into<String>,
        phone: Option<String>,
    ) -> LedgerResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(LedgerError::validation("supplier name cannot be empty"));
        }
        Ok(Self {
            id,
            tenant_id,
            name,
            phone,
        })
    }
}

/// Read-only supplier lookups.
///
/// The ledger consults this before creating or mutating a stock position; it
/// never writes through it. Registry maintenance (CRUD, admin console) is a
/// different collaborator entirely.
pub trait SupplierRegistry: Send + Sync {
    fn get(&self, tenant_id: TenantId, id: SupplierId) -> Option<Supplier>;

    fn exists(&self, tenant_id: TenantId, id: SupplierId) -> bool {
        self.get(tenant_id, id).is_some()
    }
}

impl<R> SupplierRegistry for Arc<R>
where
    R: SupplierRegistry + ?Sized,
{
    fn get(&self, tenant_id: TenantId, id: SupplierId) -> Option<Supplier> {
        (**self).get(tenant_id, id)
    }
}

/// In-memory supplier registry.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemorySupplierRegistry {
    suppliers: RwLock<HashMap<(TenantId, SupplierId), Supplier>>,
}

impl InMemorySupplierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, supplier: Supplier) {
        if let Ok(mut suppliers) = self.suppliers.write() {
            suppliers.insert((supplier.tenant_id, supplier.id), supplier);
        }
    }
}

impl SupplierRegistry for InMemorySupplierRegistry {
    fn get(&self, tenant_id: TenantId, id: SupplierId) -> Option<Supplier> {
        let suppliers = self.suppliers.read().ok()?;
        suppliers.get(&(tenant_id, id)).cloned()
    }
}
