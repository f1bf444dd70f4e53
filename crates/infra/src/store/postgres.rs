//! Postgres-backed ledger store implementation.
//!
//! This module provides a persistent ledger store using PostgreSQL as the
//! backing storage. It enforces tenant isolation, optimistic concurrency
//! control, and all-or-nothing multi-row commits at the database level.
//!
//! ## Error Mapping
//!
//! SQLx errors are mapped to `StoreError` as follows:
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError | Scenario |
//! |------------|----------------------|------------|----------|
//! | Database (unique violation) | `23505` | `Conflict` / `DuplicateInvoice` | Concurrent write detected, or invoice number already taken |
//! | Database (check constraint violation) | `23514` | `Invalid` | Invalid data (e.g., qty_on_hand < 0) |
//! | Database (other) | Any other | `Invalid` | Other database errors |
//! | PoolClosed | N/A | `Unavailable` | Connection pool was closed |
//! | Io / Tls | N/A | `Unavailable` | Network errors, connection failures |
//! | Other | N/A | `Invalid` | Remaining sqlx errors |
//!
//! ## Thread Safety
//!
//! `PostgresLedgerStore` is `Send + Sync` and can be shared across threads.
//! All operations use the SQLx connection pool which handles thread-safe
//! connection management.

use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::sync::Arc;
use tracing::instrument;

use stockroom_core::{CustomerId, ExpectedVersion, ProductId, SaleId, SupplierId, TenantId};
use stockroom_ledger::{
    InvoiceNumber, PaymentMethod, PositionKey, Sale, SaleLine, SaleStatus, StockPosition,
};

use super::r#trait::{LedgerStore, PositionWrite, StoreError};

/// DDL for the ledger tables.
///
/// The `CHECK (qty_on_hand >= 0)` constraint is the database-level backstop
/// for the non-negativity invariant; the domain and the version-guarded
/// updates enforce it first.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS stock_positions (
    tenant_id      UUID NOT NULL,
    supplier_id    UUID NOT NULL,
    product_id     UUID NOT NULL,
    qty_on_hand    BIGINT NOT NULL CHECK (qty_on_hand >= 0),
    last_unit_cost NUMERIC,
    version        BIGINT NOT NULL CHECK (version > 0),
    PRIMARY KEY (tenant_id, supplier_id, product_id)
);

CREATE TABLE IF NOT EXISTS sales (
    sale_id        UUID PRIMARY KEY,
    tenant_id      UUID NOT NULL,
    invoice_no     TEXT NOT NULL UNIQUE,
    customer_id    UUID NOT NULL,
    occurred_at    TIMESTAMPTZ NOT NULL,
    payment_method TEXT NOT NULL,
    status         TEXT NOT NULL,
    discount       NUMERIC NOT NULL,
    tax            NUMERIC NOT NULL,
    version        BIGINT NOT NULL CHECK (version > 0)
);

CREATE TABLE IF NOT EXISTS sale_lines (
    sale_id       UUID NOT NULL REFERENCES sales (sale_id),
    line_no       INTEGER NOT NULL CHECK (line_no > 0),
    supplier_id   UUID NOT NULL,
    product_id    UUID NOT NULL,
    quantity      BIGINT NOT NULL CHECK (quantity > 0),
    unit_price    NUMERIC NOT NULL,
    returned      BOOLEAN NOT NULL DEFAULT FALSE,
    return_reason TEXT,
    PRIMARY KEY (sale_id, line_no)
);

CREATE INDEX IF NOT EXISTS idx_sales_tenant ON sales (tenant_id, occurred_at);

CREATE SEQUENCE IF NOT EXISTS invoice_number_seq;
"#;

/// Postgres-backed transactional ledger store.
///
/// ## Optimistic Concurrency
///
/// Every write runs in a transaction that:
/// 1. Reads the current version (`SELECT ... FOR UPDATE`)
/// 2. Validates it against the caller's `ExpectedVersion`
/// 3. Writes the new state with `version = current + 1`
///
/// The `FOR UPDATE` lock only covers the touched rows, so positions with
/// different keys never block each other.
///
/// ## Tenant Isolation
///
/// Every query includes `tenant_id` in the WHERE clause, making it
/// impossible to accidentally load or modify another tenant's rows.
#[derive(Debug, Clone)]
pub struct PostgresLedgerStore {
    pool: Arc<PgPool>,
}

impl PostgresLedgerStore {
    /// Create a new PostgresLedgerStore with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Connect a small pool to the given database URL.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(8)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create the ledger tables if they do not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(key = %key), err)]
    pub async fn load_position_async(
        &self,
        key: &PositionKey,
    ) -> Result<Option<StockPosition>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT qty_on_hand, last_unit_cost, version
            FROM stock_positions
            WHERE tenant_id = $1 AND supplier_id = $2 AND product_id = $3
            "#,
        )
        .bind(key.tenant_id.as_uuid())
        .bind(key.supplier_id.as_uuid())
        .bind(key.product_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_position", e))?;

        row.map(|row| position_from_row(*key, &row)).transpose()
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id), err)]
    pub async fn positions_async(
        &self,
        tenant_id: TenantId,
    ) -> Result<Vec<StockPosition>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT supplier_id, product_id, qty_on_hand, last_unit_cost, version
            FROM stock_positions
            WHERE tenant_id = $1
            ORDER BY supplier_id, product_id
            "#,
        )
        .bind(tenant_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("positions", e))?;

        rows.iter()
            .map(|row| {
                let supplier_id: uuid::Uuid = row
                    .try_get("supplier_id")
                    .map_err(|e| StoreError::Invalid(format!("bad supplier_id column: {e}")))?;
                let product_id: uuid::Uuid = row
                    .try_get("product_id")
                    .map_err(|e| StoreError::Invalid(format!("bad product_id column: {e}")))?;
                let key = PositionKey::new(
                    tenant_id,
                    SupplierId::from_uuid(supplier_id),
                    ProductId::from_uuid(product_id),
                );
                position_from_row(key, row)
            })
            .collect()
    }

    #[instrument(skip(self, write), fields(key = %write.position.key()), err)]
    pub async fn save_position_async(
        &self,
        write: PositionWrite,
    ) -> Result<StockPosition, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("save_position", e))?;

        let stored = apply_position_write(&mut tx, &write).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("save_position", e))?;
        Ok(stored)
    }

    #[instrument(skip(self), err)]
    pub async fn allocate_invoice_number_async(&self) -> Result<InvoiceNumber, StoreError> {
        let row = sqlx::query("SELECT nextval('invoice_number_seq') AS seq")
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("allocate_invoice_number", e))?;
        let seq: i64 = row
            .try_get("seq")
            .map_err(|e| StoreError::Invalid(format!("bad sequence value: {e}")))?;
        Ok(InvoiceNumber::from_sequence(seq as u64))
    }

    #[instrument(skip(self, sale, positions), fields(sale_id = %sale.id()), err)]
    pub async fn commit_sale_async(
        &self,
        sale: Sale,
        positions: Vec<PositionWrite>,
    ) -> Result<Sale, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("commit_sale", e))?;

        for write in &positions {
            if write.position.tenant_id() != sale.tenant_id() {
                return Err(StoreError::Invalid(format!(
                    "position {} belongs to a different tenant",
                    write.position.key()
                )));
            }
            apply_position_write(&mut tx, write).await?;
        }

        let insert = sqlx::query(
            r#"
            INSERT INTO sales (
                sale_id, tenant_id, invoice_no, customer_id, occurred_at,
                payment_method, status, discount, tax, version
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 1)
            "#,
        )
        .bind(sale.id().as_uuid())
        .bind(sale.tenant_id().as_uuid())
        .bind(sale.invoice_no().as_str())
        .bind(sale.customer_id().as_uuid())
        .bind(sale.occurred_at())
        .bind(sale.payment_method().as_str())
        .bind(sale.status().as_str())
        .bind(sale.discount())
        .bind(sale.tax())
        .execute(&mut *tx)
        .await;

        if let Err(err) = insert {
            if is_unique_violation(&err) {
                return Err(StoreError::DuplicateInvoice(sale.invoice_no().to_string()));
            }
            return Err(map_sqlx_error("commit_sale", err));
        }

        for line in sale.lines() {
            sqlx::query(
                r#"
                INSERT INTO sale_lines (
                    sale_id, line_no, supplier_id, product_id,
                    quantity, unit_price, returned, return_reason
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(sale.id().as_uuid())
            .bind(line.line_no() as i32)
            .bind(line.supplier_id().as_uuid())
            .bind(line.product_id().as_uuid())
            .bind(line.quantity())
            .bind(line.unit_price())
            .bind(line.returned())
            .bind(line.return_reason())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("commit_sale", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_sale", e))?;
        Ok(sale.at_version(1))
    }

    #[instrument(skip(self, sale, positions), fields(sale_id = %sale.id()), err)]
    pub async fn update_sale_async(
        &self,
        sale: Sale,
        expected: ExpectedVersion,
        positions: Vec<PositionWrite>,
    ) -> Result<Sale, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("update_sale", e))?;

        let row = sqlx::query(
            "SELECT version FROM sales WHERE sale_id = $1 AND tenant_id = $2 FOR UPDATE",
        )
        .bind(sale.id().as_uuid())
        .bind(sale.tenant_id().as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_sale", e))?;

        let current = match row {
            Some(row) => {
                let version: i64 = row
                    .try_get("version")
                    .map_err(|e| StoreError::Invalid(format!("bad version column: {e}")))?;
                version as u64
            }
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

        for write in &positions {
            apply_position_write(&mut tx, write).await?;
        }

        sqlx::query("UPDATE sales SET status = $1, version = $2 WHERE sale_id = $3")
            .bind(sale.status().as_str())
            .bind((current + 1) as i64)
            .bind(sale.id().as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_sale", e))?;

        for line in sale.lines() {
            sqlx::query(
                r#"
                UPDATE sale_lines
                SET returned = $1, return_reason = $2
                WHERE sale_id = $3 AND line_no = $4
                "#,
            )
            .bind(line.returned())
            .bind(line.return_reason())
            .bind(sale.id().as_uuid())
            .bind(line.line_no() as i32)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_sale", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("update_sale", e))?;
        Ok(sale.at_version(current + 1))
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, sale_id = %sale_id), err)]
    pub async fn load_sale_async(
        &self,
        tenant_id: TenantId,
        sale_id: SaleId,
    ) -> Result<Option<Sale>, StoreError> {
        let header = sqlx::query(
            r#"
            SELECT invoice_no, customer_id, occurred_at, payment_method,
                   status, discount, tax, version
            FROM sales
            WHERE sale_id = $1 AND tenant_id = $2
            "#,
        )
        .bind(sale_id.as_uuid())
        .bind(tenant_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_sale", e))?;

        let Some(header) = header else {
            return Ok(None);
        };

        let lines = self.load_sale_lines(sale_id).await?;
        Ok(Some(sale_from_row(tenant_id, sale_id, &header, lines)?))
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id), err)]
    pub async fn sales_async(&self, tenant_id: TenantId) -> Result<Vec<Sale>, StoreError> {
        let headers = sqlx::query(
            r#"
            SELECT sale_id, invoice_no, customer_id, occurred_at, payment_method,
                   status, discount, tax, version
            FROM sales
            WHERE tenant_id = $1
            ORDER BY occurred_at ASC
            "#,
        )
        .bind(tenant_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("sales", e))?;

        let mut sales = Vec::with_capacity(headers.len());
        for header in &headers {
            let sale_id: uuid::Uuid = header
                .try_get("sale_id")
                .map_err(|e| StoreError::Invalid(format!("bad sale_id column: {e}")))?;
            let sale_id = SaleId::from_uuid(sale_id);
            let lines = self.load_sale_lines(sale_id).await?;
            sales.push(sale_from_row(tenant_id, sale_id, header, lines)?);
        }
        Ok(sales)
    }

    async fn load_sale_lines(&self, sale_id: SaleId) -> Result<Vec<SaleLine>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT line_no, supplier_id, product_id, quantity,
                   unit_price, returned, return_reason
            FROM sale_lines
            WHERE sale_id = $1
            ORDER BY line_no ASC
            "#,
        )
        .bind(sale_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_sale_lines", e))?;

        rows.iter().map(line_from_row).collect()
    }
}

/// Version-checked write of one position inside an open transaction.
///
/// Rows are locked with `FOR UPDATE`, so concurrent writers to the same key
/// serialize here and the stamp comparison stays exact; different keys never
/// block each other.
async fn apply_position_write(
    tx: &mut Transaction<'_, Postgres>,
    write: &PositionWrite,
) -> Result<StockPosition, StoreError> {
    let key = write.position.key();
    let row = sqlx::query(
        r#"
        SELECT version FROM stock_positions
        WHERE tenant_id = $1 AND supplier_id = $2 AND product_id = $3
        FOR UPDATE
        "#,
    )
    .bind(key.tenant_id.as_uuid())
    .bind(key.supplier_id.as_uuid())
    .bind(key.product_id.as_uuid())
    .fetch_optional(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("apply_position_write", e))?;

    let current = match row {
        Some(row) => {
            let version: i64 = row
                .try_get("version")
                .map_err(|e| StoreError::Invalid(format!("bad version column: {e}")))?;
            version as u64
        }
        None => 0,
    };
    if !write.expected.matches(current) {
        return Err(StoreError::Conflict(format!(
            "position {key}: expected {:?}, found {current}",
            write.expected
        )));
    }

    let next = (current + 1) as i64;
    let result = if current == 0 {
        sqlx::query(
            r#"
            INSERT INTO stock_positions (
                tenant_id, supplier_id, product_id, qty_on_hand, last_unit_cost, version
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(key.tenant_id.as_uuid())
        .bind(key.supplier_id.as_uuid())
        .bind(key.product_id.as_uuid())
        .bind(write.position.qty_on_hand())
        .bind(write.position.last_unit_cost())
        .bind(next)
        .execute(&mut **tx)
        .await
    } else {
        sqlx::query(
            r#"
            UPDATE stock_positions
            SET qty_on_hand = $4, last_unit_cost = $5, version = $6
            WHERE tenant_id = $1 AND supplier_id = $2 AND product_id = $3 AND version = $7
            "#,
        )
        .bind(key.tenant_id.as_uuid())
        .bind(key.supplier_id.as_uuid())
        .bind(key.product_id.as_uuid())
        .bind(write.position.qty_on_hand())
        .bind(write.position.last_unit_cost())
        .bind(next)
        .bind(current as i64)
        .execute(&mut **tx)
        .await
    };

    match result {
        Ok(_) => Ok(write.position.clone().at_version(next as u64)),
        Err(err) if is_unique_violation(&err) => Err(StoreError::Conflict(format!(
            "position {key}: concurrent insert detected"
        ))),
        Err(err) => Err(map_sqlx_error("apply_position_write", err)),
    }
}

fn position_from_row(
    key: PositionKey,
    row: &sqlx::postgres::PgRow,
) -> Result<StockPosition, StoreError> {
    let qty_on_hand: i64 = row
        .try_get("qty_on_hand")
        .map_err(|e| StoreError::Invalid(format!("bad qty_on_hand column: {e}")))?;
    let last_unit_cost: Option<Decimal> = row
        .try_get("last_unit_cost")
        .map_err(|e| StoreError::Invalid(format!("bad last_unit_cost column: {e}")))?;
    let version: i64 = row
        .try_get("version")
        .map_err(|e| StoreError::Invalid(format!("bad version column: {e}")))?;

    StockPosition::from_parts(key, qty_on_hand, last_unit_cost, version as u64)
        .map_err(|e| StoreError::Invalid(e.to_string()))
}

fn line_from_row(row: &sqlx::postgres::PgRow) -> Result<SaleLine, StoreError> {
    let line_no: i32 = row
        .try_get("line_no")
        .map_err(|e| StoreError::Invalid(format!("bad line_no column: {e}")))?;
    let supplier_id: uuid::Uuid = row
        .try_get("supplier_id")
        .map_err(|e| StoreError::Invalid(format!("bad supplier_id column: {e}")))?;
    let product_id: uuid::Uuid = row
        .try_get("product_id")
        .map_err(|e| StoreError::Invalid(format!("bad product_id column: {e}")))?;
    let quantity: i64 = row
        .try_get("quantity")
        .map_err(|e| StoreError::Invalid(format!("bad quantity column: {e}")))?;
    let unit_price: Decimal = row
        .try_get("unit_price")
        .map_err(|e| StoreError::Invalid(format!("bad unit_price column: {e}")))?;
    let returned: bool = row
        .try_get("returned")
        .map_err(|e| StoreError::Invalid(format!("bad returned column: {e}")))?;
    let return_reason: Option<String> = row
        .try_get("return_reason")
        .map_err(|e| StoreError::Invalid(format!("bad return_reason column: {e}")))?;

    SaleLine::from_parts(
        line_no as u32,
        SupplierId::from_uuid(supplier_id),
        ProductId::from_uuid(product_id),
        quantity,
        unit_price,
        returned,
        return_reason,
    )
    .map_err(|e| StoreError::Invalid(e.to_string()))
}

fn sale_from_row(
    tenant_id: TenantId,
    sale_id: SaleId,
    row: &sqlx::postgres::PgRow,
    lines: Vec<SaleLine>,
) -> Result<Sale, StoreError> {
    let invoice_no: String = row
        .try_get("invoice_no")
        .map_err(|e| StoreError::Invalid(format!("bad invoice_no column: {e}")))?;
    let customer_id: uuid::Uuid = row
        .try_get("customer_id")
        .map_err(|e| StoreError::Invalid(format!("bad customer_id column: {e}")))?;
    let occurred_at: chrono::DateTime<chrono::Utc> = row
        .try_get("occurred_at")
        .map_err(|e| StoreError::Invalid(format!("bad occurred_at column: {e}")))?;
    let payment_method: String = row
        .try_get("payment_method")
        .map_err(|e| StoreError::Invalid(format!("bad payment_method column: {e}")))?;
    let status: String = row
        .try_get("status")
        .map_err(|e| StoreError::Invalid(format!("bad status column: {e}")))?;
    let discount: Decimal = row
        .try_get("discount")
        .map_err(|e| StoreError::Invalid(format!("bad discount column: {e}")))?;
    let tax: Decimal = row
        .try_get("tax")
        .map_err(|e| StoreError::Invalid(format!("bad tax column: {e}")))?;
    let version: i64 = row
        .try_get("version")
        .map_err(|e| StoreError::Invalid(format!("bad version column: {e}")))?;

    Sale::from_parts(
        sale_id,
        tenant_id,
        InvoiceNumber::new(invoice_no).map_err(|e| StoreError::Invalid(e.to_string()))?,
        CustomerId::from_uuid(customer_id),
        occurred_at,
        PaymentMethod::parse(&payment_method).map_err(|e| StoreError::Invalid(e.to_string()))?,
        SaleStatus::parse(&status).map_err(|e| StoreError::Invalid(e.to_string()))?,
        discount,
        tax,
        lines,
        version as u64,
    )
    .map_err(|e| StoreError::Invalid(e.to_string()))
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());

            if let Some(code) = db_err.code() {
                match code.as_ref() {
                    "23505" => {
                        // Unique violation
                        StoreError::Conflict(msg)
                    }
                    "23514" => {
                        // Check constraint violation
                        StoreError::Invalid(msg)
                    }
                    _ => StoreError::Invalid(msg),
                }
            } else {
                StoreError::Invalid(msg)
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Unavailable(format!("connection pool closed in {operation}"))
        }
        sqlx::Error::Io(e) => StoreError::Unavailable(format!("io error in {operation}: {e}")),
        sqlx::Error::Tls(e) => StoreError::Unavailable(format!("tls error in {operation}: {e}")),
        _ => StoreError::Invalid(format!("sqlx error in {operation}: {err}")),
    }
}

/// Check if an error is a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        if let Some(code) = db_err.code() {
            return code.as_ref() == "23505";
        }
    }
    false
}

fn runtime_handle(operation: &str) -> Result<tokio::runtime::Handle, StoreError> {
    tokio::runtime::Handle::try_current().map_err(|_| {
        StoreError::Unavailable(format!(
            "PostgresLedgerStore requires an async runtime (tokio) for {operation}. \
             Ensure you're calling from within a tokio runtime context."
        ))
    })
}

// Implement LedgerStore trait
//
// The LedgerStore trait is synchronous, but Postgres operations require
// async. We use tokio::runtime::Handle to run async code in a sync context.
// This works when called from within a tokio runtime (e.g., from HTTP
// handlers).

impl LedgerStore for PostgresLedgerStore {
    fn load_position(&self, key: &PositionKey) -> Result<Option<StockPosition>, StoreError> {
        runtime_handle("load_position")?.block_on(self.load_position_async(key))
    }

    fn positions(&self, tenant_id: TenantId) -> Result<Vec<StockPosition>, StoreError> {
        runtime_handle("positions")?.block_on(self.positions_async(tenant_id))
    }

    fn save_position(&self, write: PositionWrite) -> Result<StockPosition, StoreError> {
        runtime_handle("save_position")?.block_on(self.save_position_async(write))
    }

    fn allocate_invoice_number(&self) -> Result<InvoiceNumber, StoreError> {
        runtime_handle("allocate_invoice_number")?.block_on(self.allocate_invoice_number_async())
    }

    fn commit_sale(
        &self,
        sale: Sale,
        positions: Vec<PositionWrite>,
    ) -> Result<Sale, StoreError> {
        runtime_handle("commit_sale")?.block_on(self.commit_sale_async(sale, positions))
    }

    fn update_sale(
        &self,
        sale: Sale,
        expected: ExpectedVersion,
        positions: Vec<PositionWrite>,
    ) -> Result<Sale, StoreError> {
        runtime_handle("update_sale")?.block_on(self.update_sale_async(sale, expected, positions))
    }

    fn load_sale(&self, tenant_id: TenantId, sale_id: SaleId) -> Result<Option<Sale>, StoreError> {
        runtime_handle("load_sale")?.block_on(self.load_sale_async(tenant_id, sale_id))
    }

    fn sales(&self, tenant_id: TenantId) -> Result<Vec<Sale>, StoreError> {
        runtime_handle("sales")?.block_on(self.sales_async(tenant_id))
    }
}
