use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use stockroom_core::{ExpectedVersion, SaleId, TenantId};
use stockroom_ledger::{InvoiceNumber, PositionKey, Sale, StockPosition};

use super::r#trait::{LedgerStore, PositionWrite, StoreError};

/// In-memory transactional ledger store.
///
/// Intended for tests/dev. Not optimized for performance. A single lock
/// guards all state, which makes every multi-row commit trivially atomic:
/// all version stamps are validated before anything is mutated.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    positions: HashMap<PositionKey, StockPosition>,
    sales: HashMap<(TenantId, SaleId), Sale>,
    invoice_seq: u64,
    invoice_numbers: HashSet<String>,
}

impl Inner {
    fn current_position_version(&self, key: &PositionKey) -> u64 {
        self.positions.get(key).map(|p| p.version()).unwrap_or(0)
    }

    /// Validate every stamp in the batch before any mutation.
    fn check_position_writes(&self, writes: &[PositionWrite]) -> Result<(), StoreError> {
        for write in writes {
            let key = write.position.key();
            let current = self.current_position_version(&key);
            if !write.expected.matches(current) {
                return Err(StoreError::Conflict(format!(
                    "position {key}: expected {:?}, found {current}",
                    write.expected
                )));
            }
        }
        Ok(())
    }

    fn apply_position_writes(&mut self, writes: Vec<PositionWrite>) {
        for write in writes {
            let key = write.position.key();
            let next = self.current_position_version(&key) + 1;
            self.positions.insert(key, write.position.at_version(next));
        }
    }
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn load_position(&self, key: &PositionKey) -> Result<Option<StockPosition>, StoreError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        Ok(inner.positions.get(key).cloned())
    }

    fn positions(&self, tenant_id: TenantId) -> Result<Vec<StockPosition>, StoreError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        Ok(inner
            .positions
            .values()
            .filter(|p| p.tenant_id() == tenant_id)
            .cloned()
            .collect())
    }

    fn save_position(&self, write: PositionWrite) -> Result<StockPosition, StoreError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;

        let key = write.position.key();
        inner.check_position_writes(std::slice::from_ref(&write))?;
        inner.apply_position_writes(vec![write]);
        Ok(inner.positions[&key].clone())
    }

    fn allocate_invoice_number(&self) -> Result<InvoiceNumber, StoreError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        inner.invoice_seq += 1;
        Ok(InvoiceNumber::from_sequence(inner.invoice_seq))
    }

    fn commit_sale(
        &self,
        sale: Sale,
        positions: Vec<PositionWrite>,
    ) -> Result<Sale, StoreError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;

        let sale_key = (sale.tenant_id(), sale.id());
        if inner.sales.contains_key(&sale_key) {
            return Err(StoreError::Invalid(format!(
                "sale {} already exists",
                sale.id()
            )));
        }
        if inner.invoice_numbers.contains(sale.invoice_no().as_str()) {
            return Err(StoreError::DuplicateInvoice(sale.invoice_no().to_string()));
        }
        // Positions of a sale must belong to the sale's tenant.
        for write in &positions {
            if write.position.tenant_id() != sale.tenant_id() {
                return Err(StoreError::Invalid(format!(
                    "position {} belongs to a different tenant",
                    write.position.key()
                )));
            }
        }
        inner.check_position_writes(&positions)?;

        // All checks passed; apply everything.
        inner.apply_position_writes(positions);
        let invoice_no = sale.invoice_no().to_string();
        inner.invoice_numbers.insert(invoice_no);
        let stored = sale.at_version(1);
        inner.sales.insert(sale_key, stored.clone());
        Ok(stored)
    }

    fn update_sale(
        &self,
        sale: Sale,
        expected: ExpectedVersion,
        positions: Vec<PositionWrite>,
    ) -> Result<Sale, StoreError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;

        let sale_key = (sale.tenant_id(), sale.id());
        let current = match inner.sales.get(&sale_key) {
            Some(existing) => existing.version(),
            None => {
                return Err(StoreError::Invalid(format!(
                    "sale {} does not exist",
                    sale.id()
                )));
            }
        };
        if !expected.matches(current) {
            return Err(StoreError::Conflict(format!(
                "sale {}: expected {expected:?}, found {current}",
                sale.id()
            )));
        }
        inner.check_position_writes(&positions)?;

        inner.apply_position_writes(positions);
        let stored = sale.at_version(current + 1);
        inner.sales.insert(sale_key, stored.clone());
        Ok(stored)
    }

    fn load_sale(&self, tenant_id: TenantId, sale_id: SaleId) -> Result<Option<Sale>, StoreError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        Ok(inner.sales.get(&(tenant_id, sale_id)).cloned())
    }

    fn sales(&self, tenant_id: TenantId) -> Result<Vec<Sale>, StoreError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        let mut sales: Vec<Sale> = inner
            .sales
            .iter()
            .filter(|((tenant, _), _)| *tenant == tenant_id)
            .map(|(_, sale)| sale.clone())
            .collect();
        sales.sort_by_key(|s| s.occurred_at());
        Ok(sales)
    }
}
