use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use stockroom_core::{CustomerId, LedgerError, LedgerResult, TenantId};

/// A customer referenced by sale headers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub tenant_id: TenantId,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
}

impl Customer {
    pub fn new(
        id: CustomerId,
        tenant_id: TenantId,
        name: impl Into<String>,
        phone: impl Into<String>,
        email: Option<String>,
    ) -> LedgerResult<Self> {
        let name = name.into();
        let phone = phone.into();
        if name.trim().is_empty() {
            return Err(LedgerError::validation("customer name cannot be empty"));
        }
        if phone.trim().is_empty() {
            return Err(LedgerError::validation("customer phone cannot be empty"));
        }
        Ok(Self {
            id,
            tenant_id,
            name,
            phone,
            email,
        })
    }
}

/// Read-only customer lookups.
///
/// `find_by_phone` exists because the point-of-sale flow identifies walk-in
/// customers by phone number, not by id.
pub trait CustomerRegistry: Send + Sync {
    fn get(&self, tenant_id: TenantId, id: CustomerId) -> Option<Customer>;

    fn find_by_phone(&self, tenant_id: TenantId, phone: &str) -> Option<Customer>;

    fn exists(&self, tenant_id: TenantId, id: CustomerId) -> bool {
        self.get(tenant_id, id).is_some()
    }
}

impl<R> CustomerRegistry for Arc<R>
where
    R: CustomerRegistry + ?Sized,
{
    fn get(&self, tenant_id: TenantId, id: CustomerId) -> Option<Customer> {
        (**self).get(tenant_id, id)
    }

    fn find_by_phone(&self, tenant_id: TenantId, phone: &str) -> Option<Customer> {
        (**self).find_by_phone(tenant_id, phone)
    }
}

/// In-memory customer registry.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryCustomerRegistry {
    customers: RwLock<HashMap<(TenantId, CustomerId), Customer>>,
}

impl InMemoryCustomerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, customer: Customer) {
        if let Ok(mut customers) = self.customers.write() {
            customers.insert((customer.tenant_id, customer.id), customer);
        }
    }
}

impl CustomerRegistry for InMemoryCustomerRegistry {
    fn get(&self, tenant_id: TenantId, id: CustomerId) -> Option<Customer> {
        let customers = self.customers.read().ok()?;
        customers.get(&(tenant_id, id)).cloned()
    }

    fn find_by_phone(&self, tenant_id: TenantId, phone: &str) -> Option<Customer> {
        let customers = self.customers.read().ok()?;
        customers
            .values()
            .find(|c| c.tenant_id == tenant_id && c.phone == phone)
            .cloned()
    }
}
