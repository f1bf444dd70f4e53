use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockroom_core::{CustomerId, LedgerError, LedgerResult, ProductId, SaleId, SupplierId, TenantId};

/// How a sale was paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    BankTransfer,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::BankTransfer => "bank_transfer",
        }
    }

    pub fn parse(s: &str) -> LedgerResult<Self> {
        match s {
            "cash" => Ok(PaymentMethod::Cash),
            "card" => Ok(PaymentMethod::Card),
            "bank_transfer" => Ok(PaymentMethod::BankTransfer),
            other => Err(LedgerError::validation(format!(
                "unknown payment method '{other}'"
            ))),
        }
    }
}

/// Sale status lifecycle.
///
/// The ledger only ever commits whole sales, so there is no draft state;
/// `Cancelled` exists for administratively voided records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaleStatus {
    Completed,
    Cancelled,
}

impl SaleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Completed => "completed",
            SaleStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> LedgerResult<Self> {
        match s {
            "completed" => Ok(SaleStatus::Completed),
            "cancelled" => Ok(SaleStatus::Cancelled),
            other => Err(LedgerError::validation(format!(
                "unknown sale status '{other}'"
            ))),
        }
    }
}

/// System-wide unique invoice number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvoiceNumber(String);

impl InvoiceNumber {
    /// Format a store-allocated sequence value as an invoice number.
    pub fn from_sequence(seq: u64) -> Self {
        Self(format!("INV-{seq:08}"))
    }

    pub fn new(value: impl Into<String>) -> LedgerResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(LedgerError::validation("invoice number cannot be empty"));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for InvoiceNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// One product/quantity/price entry within a sale, consuming one stock
/// position keyed by (supplier, product), never by product alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleLine {
    line_no: u32,
    supplier_id: SupplierId,
    product_id: ProductId,
    quantity: i64,
    unit_price: Decimal,
    returned: bool,
    return_reason: Option<String>,
}

impl SaleLine {
    pub fn new(
        line_no: u32,
        supplier_id: SupplierId,
        product_id: ProductId,
        quantity: i64,
        unit_price: Decimal,
    ) -> LedgerResult<Self> {
        if line_no == 0 {
            return Err(LedgerError::validation("line_no is 1-based"));
        }
        if quantity <= 0 {
            return Err(LedgerError::validation("line quantity must be positive"));
        }
        if unit_price < Decimal::ZERO {
            return Err(LedgerError::validation("unit_price cannot be negative"));
        }
        Ok(Self {
            line_no,
            supplier_id,
            product_id,
            quantity,
            unit_price,
            returned: false,
            return_reason: None,
        })
    }

    /// Rebuild a line from stored parts (e.g. a database row).
    pub fn from_parts(
        line_no: u32,
        supplier_id: SupplierId,
        product_id: ProductId,
        quantity: i64,
        unit_price: Decimal,
        returned: bool,
        return_reason: Option<String>,
    ) -> LedgerResult<Self> {
        let mut line = Self::new(line_no, supplier_id, product_id, quantity, unit_price)?;
        line.returned = returned;
        line.return_reason = return_reason;
        Ok(line)
    }

    pub fn line_no(&self) -> u32 {
        self.line_no
    }

    pub fn supplier_id(&self) -> SupplierId {
        self.supplier_id
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    pub fn returned(&self) -> bool {
        self.returned
    }

    pub fn return_reason(&self) -> Option<&str> {
        self.return_reason.as_deref()
    }

    pub fn subtotal(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Stock restored to one position by a returned line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineReturn {
    pub line_no: u32,
    pub supplier_id: SupplierId,
    pub product_id: ProductId,
    pub quantity: i64,
}

/// Input: one line of a sale to record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSaleLine {
    pub supplier_id: SupplierId,
    pub product_id: ProductId,
    pub quantity: i64,
    /// Overrides the product's registry price when present.
    pub unit_price: Option<Decimal>,
}

/// Command: record a sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSale {
    pub tenant_id: TenantId,
    pub customer_id: CustomerId,
    pub occurred_at: DateTime<Utc>,
    pub payment_method: PaymentMethod,
    pub discount: Decimal,
    pub tax: Decimal,
    pub lines: Vec<NewSaleLine>,
}

/// Command: return a sale, or one line of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnSale {
    pub tenant_id: TenantId,
    pub sale_id: SaleId,
    /// Targeted line; `None` returns every not-yet-returned line.
    pub line_no: Option<u32>,
    pub reason: Option<String>,
}

/// A committed sale transaction: header plus its lines.
///
/// The sale references the stock positions it consumed but duplicates no
/// quantity state; `StockPosition` stays the single source of truth.
/// The version stamp guards return marking the same way position stamps
/// guard quantity writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    id: SaleId,
    tenant_id: TenantId,
    invoice_no: InvoiceNumber,
    customer_id: CustomerId,
    occurred_at: DateTime<Utc>,
    payment_method: PaymentMethod,
    status: SaleStatus,
    discount: Decimal,
    tax: Decimal,
    lines: Vec<SaleLine>,
    version: u64,
}

impl Sale {
    /// Assemble a sale ready to commit.
    #[allow(clippy::too_many_arguments)]
    pub fn record(
        id: SaleId,
        tenant_id: TenantId,
        invoice_no: InvoiceNumber,
        customer_id: CustomerId,
        occurred_at: DateTime<Utc>,
        payment_method: PaymentMethod,
        discount: Decimal,
        tax: Decimal,
        lines: Vec<SaleLine>,
    ) -> LedgerResult<Self> {
        if lines.is_empty() {
            return Err(LedgerError::validation("a sale must have at least one line"));
        }
        for (idx, line) in lines.iter().enumerate() {
            if line.line_no as usize != idx + 1 {
                return Err(LedgerError::validation(format!(
                    "line numbers must be sequential from 1 (found {} at index {idx})",
                    line.line_no
                )));
            }
            if line.returned {
                return Err(LedgerError::validation(
                    "cannot record a sale with pre-returned lines",
                ));
            }
        }
        if discount < Decimal::ZERO {
            return Err(LedgerError::validation("discount cannot be negative"));
        }
        if tax < Decimal::ZERO {
            return Err(LedgerError::validation("tax cannot be negative"));
        }

        let sale = Self {
            id,
            tenant_id,
            invoice_no,
            customer_id,
            occurred_at,
            payment_method,
            status: SaleStatus::Completed,
            discount,
            tax,
            lines,
            version: 0,
        };
        if sale.total() < Decimal::ZERO {
            return Err(LedgerError::validation("discount exceeds subtotal plus tax"));
        }
        Ok(sale)
    }

    /// Rebuild a sale from stored parts (e.g. database rows).
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: SaleId,
        tenant_id: TenantId,
        invoice_no: InvoiceNumber,
        customer_id: CustomerId,
        occurred_at: DateTime<Utc>,
        payment_method: PaymentMethod,
        status: SaleStatus,
        discount: Decimal,
        tax: Decimal,
        lines: Vec<SaleLine>,
        version: u64,
    ) -> LedgerResult<Self> {
        if lines.is_empty() {
            return Err(LedgerError::validation("a stored sale has no lines"));
        }
        Ok(Self {
            id,
            tenant_id,
            invoice_no,
            customer_id,
            occurred_at,
            payment_method,
            status,
            discount,
            tax,
            lines,
            version,
        })
    }

    pub fn id(&self) -> SaleId {
        self.id
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn invoice_no(&self) -> &InvoiceNumber {
        &self.invoice_no
    }

    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }

    pub fn status(&self) -> SaleStatus {
        self.status
    }

    pub fn discount(&self) -> Decimal {
        self.discount
    }

    pub fn tax(&self) -> Decimal {
        self.tax
    }

    pub fn lines(&self) -> &[SaleLine] {
        &self.lines
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Stamp the version assigned by the store.
    pub fn at_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    pub fn subtotal(&self) -> Decimal {
        self.lines.iter().map(SaleLine::subtotal).sum()
    }

    pub fn total(&self) -> Decimal {
        self.subtotal() - self.discount + self.tax
    }

    pub fn fully_returned(&self) -> bool {
        self.lines.iter().all(|l| l.returned)
    }

    /// Mark a line (or every not-yet-returned line) as returned.
    ///
    /// Returns the stock restorations the caller must apply to the
    /// originating positions. Each line can be returned at most once; a
    /// second attempt fails with `AlreadyReturned` and restores nothing.
    pub fn mark_returned(
        &mut self,
        line_no: Option<u32>,
        reason: Option<String>,
    ) -> LedgerResult<Vec<LineReturn>> {
        let reason = reason.unwrap_or_else(|| "no reason provided".to_string());

        let targets: Vec<usize> = match line_no {
            Some(no) => {
                let idx = self
                    .lines
                    .iter()
                    .position(|l| l.line_no == no)
                    .ok_or_else(|| {
                        LedgerError::not_found(format!("sale {} has no line {no}", self.id))
                    })?;
                if self.lines[idx].returned {
                    return Err(LedgerError::already_returned(format!(
                        "line {no} of sale {} is already returned",
                        self.id
                    )));
                }
                vec![idx]
            }
            None => {
                let open: Vec<usize> = self
                    .lines
                    .iter()
                    .enumerate()
                    .filter(|(_, l)| !l.returned)
                    .map(|(idx, _)| idx)
                    .collect();
                if open.is_empty() {
                    return Err(LedgerError::already_returned(format!(
                        "sale {} is already fully returned",
                        self.id
                    )));
                }
                open
            }
        };

        let mut restored = Vec::with_capacity(targets.len());
        for idx in targets {
            let line = &mut self.lines[idx];
            line.returned = true;
            line.return_reason = Some(reason.clone());
            restored.push(LineReturn {
                line_no: line.line_no,
                supplier_id: line.supplier_id,
                product_id: line.product_id,
                quantity: line.quantity,
            });
        }
        Ok(restored)
    }
}
