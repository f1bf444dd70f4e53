//! Integration tests for the full ledger pipeline.
//!
//! Tests: StockLedger service → LedgerStore, with the in-memory store and
//! registries.
//!
//! Verifies:
//! - Non-negativity holds for every committed read
//! - Multi-line sales are all-or-nothing
//! - Returns restore stock exactly once
//! - Concurrent adjustments never oversell

mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use rust_decimal_macros::dec;

    use stockroom_core::{CustomerId, ProductId, SupplierId, TenantId};
    use stockroom_ledger::{
        AdjustStock, NewSale, NewSaleLine, PaymentMethod, ReturnSale, SaleStatus,
    };
    use stockroom_parties::{
        Customer, InMemoryCustomerRegistry, InMemorySupplierRegistry, Supplier,
    };
    use stockroom_products::{InMemoryProductRegistry, Product};

    use crate::service::{ServiceConfig, ServiceError, StockLedger};
    use crate::store::InMemoryLedgerStore;

    type TestLedger = StockLedger<
        Arc<InMemoryLedgerStore>,
        Arc<InMemorySupplierRegistry>,
        Arc<InMemoryCustomerRegistry>,
        Arc<InMemoryProductRegistry>,
    >;

    struct Fixture {
        tenant_id: TenantId,
        supplier_id: SupplierId,
        product_a: ProductId,
        product_b: ProductId,
        customer_id: CustomerId,
        suppliers: Arc<InMemorySupplierRegistry>,
        customers: Arc<InMemoryCustomerRegistry>,
        products: Arc<InMemoryProductRegistry>,
        store: Arc<InMemoryLedgerStore>,
        ledger: Arc<TestLedger>,
    }

    fn setup() -> Fixture {
        stockroom_observability::init();

        let tenant_id = TenantId::new();
        let supplier_id = SupplierId::new();
        let product_a = ProductId::new();
        let product_b = ProductId::new();
        let customer_id = CustomerId::new();

        let suppliers = Arc::new(InMemorySupplierRegistry::new());
        suppliers.insert(
            Supplier::new(supplier_id, tenant_id, "Acme Wholesale", None).unwrap(),
        );

        let customers = Arc::new(InMemoryCustomerRegistry::new());
        customers.insert(
            Customer::new(customer_id, tenant_id, "Jane Retail", "555-0100", None).unwrap(),
        );

        let products = Arc::new(InMemoryProductRegistry::new());
        products.insert(
            Product::new(product_a, tenant_id, supplier_id, "Beans", dec!(8.00), None).unwrap(),
        );
        products.insert(
            Product::new(product_b, tenant_id, supplier_id, "Rice", dec!(3.00), None).unwrap(),
        );

        let store = Arc::new(InMemoryLedgerStore::new());
        let ledger = Arc::new(StockLedger::new(
            store.clone(),
            suppliers.clone(),
            customers.clone(),
            products.clone(),
        ));

        Fixture {
            tenant_id,
            supplier_id,
            product_a,
            product_b,
            customer_id,
            suppliers,
            customers,
            products,
            store,
            ledger,
        }
    }

    fn adjust(fx: &Fixture, product_id: ProductId, delta_qty: i64) -> AdjustStock {
        AdjustStock {
            tenant_id: fx.tenant_id,
            supplier_id: fx.supplier_id,
            product_id,
            delta_qty,
            unit_cost: None,
        }
    }

    fn sale_of(fx: &Fixture, lines: Vec<NewSaleLine>) -> NewSale {
        NewSale {
            tenant_id: fx.tenant_id,
            customer_id: fx.customer_id,
            occurred_at: Utc::now(),
            payment_method: PaymentMethod::Cash,
            discount: dec!(0),
            tax: dec!(0),
            lines,
        }
    }

    fn line_of(fx: &Fixture, product_id: ProductId, quantity: i64) -> NewSaleLine {
        NewSaleLine {
            supplier_id: fx.supplier_id,
            product_id,
            quantity,
            unit_price: None,
        }
    }

    #[test]
    fn adjust_round_trip_ends_at_zero_and_guards_below() {
        let fx = setup();

        let position = fx.ledger.adjust_stock(adjust(&fx, fx.product_a, 10)).unwrap();
        assert_eq!(position.qty_on_hand(), 10);

        let position = fx.ledger.adjust_stock(adjust(&fx, fx.product_a, -10)).unwrap();
        assert_eq!(position.qty_on_hand(), 0);

        let err = fx
            .ledger
            .adjust_stock(adjust(&fx, fx.product_a, -1))
            .unwrap_err();
        match err {
            ServiceError::InsufficientStock {
                requested,
                available,
                ..
            } => {
                assert_eq!(requested, 1);
                assert_eq!(available, 0);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }

        let position = fx
            .ledger
            .position(fx.tenant_id, fx.supplier_id, fx.product_a)
            .unwrap();
        assert_eq!(position.qty_on_hand(), 0);
    }

    #[test]
    fn decrementing_an_absent_position_is_not_found() {
        let fx = setup();
        let err = fx
            .ledger
            .adjust_stock(adjust(&fx, fx.product_a, -5))
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[test]
    fn unknown_references_are_not_found() {
        let fx = setup();

        let err = fx
            .ledger
            .adjust_stock(AdjustStock {
                supplier_id: SupplierId::new(),
                ..adjust(&fx, fx.product_a, 5)
            })
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        let err = fx
            .ledger
            .adjust_stock(adjust(&fx, ProductId::new(), 5))
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        let mut sale = sale_of(&fx, vec![line_of(&fx, fx.product_a, 1)]);
        sale.customer_id = CustomerId::new();
        let err = fx.ledger.record_sale(sale).unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[test]
    fn zero_delta_and_empty_sale_are_validation_errors() {
        let fx = setup();

        let err = fx
            .ledger
            .adjust_stock(adjust(&fx, fx.product_a, 0))
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let err = fx.ledger.record_sale(sale_of(&fx, vec![])).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[test]
    fn failed_multi_line_sale_mutates_nothing() {
        let fx = setup();
        fx.ledger.adjust_stock(adjust(&fx, fx.product_a, 10)).unwrap();
        fx.ledger.adjust_stock(adjust(&fx, fx.product_b, 1)).unwrap();

        // Line 2 is short by 4; line 1 alone would have passed.
        let err = fx
            .ledger
            .record_sale(sale_of(
                &fx,
                vec![line_of(&fx, fx.product_a, 2), line_of(&fx, fx.product_b, 5)],
            ))
            .unwrap_err();
        match err {
            ServiceError::InsufficientStock {
                product_id,
                requested,
                available,
                ..
            } => {
                assert_eq!(product_id, fx.product_b);
                assert_eq!(requested, 5);
                assert_eq!(available, 1);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }

        // Zero mutations: both positions unchanged, no sale persisted.
        assert_eq!(
            fx.ledger
                .position(fx.tenant_id, fx.supplier_id, fx.product_a)
                .unwrap()
                .qty_on_hand(),
            10
        );
        assert_eq!(
            fx.ledger
                .position(fx.tenant_id, fx.supplier_id, fx.product_b)
                .unwrap()
                .qty_on_hand(),
            1
        );
        assert!(fx.ledger.sales(fx.tenant_id).unwrap().is_empty());
    }

    #[test]
    fn sale_lines_price_from_the_registry_unless_overridden() {
        let fx = setup();
        fx.ledger.adjust_stock(adjust(&fx, fx.product_a, 10)).unwrap();
        fx.ledger.adjust_stock(adjust(&fx, fx.product_b, 10)).unwrap();

        let sale = fx
            .ledger
            .record_sale(sale_of(
                &fx,
                vec![
                    line_of(&fx, fx.product_a, 2),
                    NewSaleLine {
                        unit_price: Some(dec!(2.50)),
                        ..line_of(&fx, fx.product_b, 1)
                    },
                ],
            ))
            .unwrap();

        // 2 × 8.00 (registry) + 1 × 2.50 (override)
        assert_eq!(sale.subtotal(), dec!(18.50));
        assert_eq!(sale.lines()[0].unit_price(), dec!(8.00));
        assert_eq!(sale.lines()[1].unit_price(), dec!(2.50));
    }

    #[test]
    fn invoice_numbers_are_unique_across_sales() {
        let fx = setup();
        fx.ledger.adjust_stock(adjust(&fx, fx.product_a, 10)).unwrap();

        let first = fx
            .ledger
            .record_sale(sale_of(&fx, vec![line_of(&fx, fx.product_a, 1)]))
            .unwrap();
        let second = fx
            .ledger
            .record_sale(sale_of(&fx, vec![line_of(&fx, fx.product_a, 1)]))
            .unwrap();

        assert_ne!(first.invoice_no(), second.invoice_no());
    }

    #[test]
    fn return_restores_stock_exactly_once() {
        let fx = setup();
        fx.ledger.adjust_stock(adjust(&fx, fx.product_a, 10)).unwrap();

        let sale = fx
            .ledger
            .record_sale(sale_of(&fx, vec![line_of(&fx, fx.product_a, 4)]))
            .unwrap();
        assert_eq!(
            fx.ledger
                .position(fx.tenant_id, fx.supplier_id, fx.product_a)
                .unwrap()
                .qty_on_hand(),
            6
        );

        let cmd = ReturnSale {
            tenant_id: fx.tenant_id,
            sale_id: sale.id(),
            line_no: None,
            reason: None,
        };
        let returned = fx.ledger.return_sale(cmd.clone()).unwrap();
        assert!(returned.fully_returned());
        assert_eq!(
            returned.lines()[0].return_reason(),
            Some("no reason provided")
        );
        assert_eq!(
            fx.ledger
                .position(fx.tenant_id, fx.supplier_id, fx.product_a)
                .unwrap()
                .qty_on_hand(),
            10
        );

        // Second return: AlreadyReturned, incremented exactly once.
        let err = fx.ledger.return_sale(cmd).unwrap_err();
        assert!(matches!(err, ServiceError::AlreadyReturned(_)));
        assert_eq!(
            fx.ledger
                .position(fx.tenant_id, fx.supplier_id, fx.product_a)
                .unwrap()
                .qty_on_hand(),
            10
        );
    }

    #[test]
    fn targeted_line_return_leaves_other_lines_open() {
        let fx = setup();
        fx.ledger.adjust_stock(adjust(&fx, fx.product_a, 10)).unwrap();
        fx.ledger.adjust_stock(adjust(&fx, fx.product_b, 10)).unwrap();

        let sale = fx
            .ledger
            .record_sale(sale_of(
                &fx,
                vec![line_of(&fx, fx.product_a, 3), line_of(&fx, fx.product_b, 2)],
            ))
            .unwrap();

        let returned = fx
            .ledger
            .return_sale(ReturnSale {
                tenant_id: fx.tenant_id,
                sale_id: sale.id(),
                line_no: Some(2),
                reason: Some("damaged".to_string()),
            })
            .unwrap();
        assert!(!returned.fully_returned());
        assert_eq!(returned.lines()[1].return_reason(), Some("damaged"));

        assert_eq!(
            fx.ledger
                .position(fx.tenant_id, fx.supplier_id, fx.product_a)
                .unwrap()
                .qty_on_hand(),
            7
        );
        assert_eq!(
            fx.ledger
                .position(fx.tenant_id, fx.supplier_id, fx.product_b)
                .unwrap()
                .qty_on_hand(),
            10
        );
    }

    #[test]
    fn full_scenario_receive_sell_return() {
        let fx = setup();

        let position = fx
            .ledger
            .adjust_stock(AdjustStock {
                unit_cost: Some(dec!(5.00)),
                ..adjust(&fx, fx.product_a, 100)
            })
            .unwrap();
        assert_eq!(position.qty_on_hand(), 100);
        assert_eq!(position.last_unit_cost(), Some(dec!(5.00)));

        let sale = fx
            .ledger
            .record_sale(sale_of(&fx, vec![line_of(&fx, fx.product_a, 30)]))
            .unwrap();
        assert_eq!(sale.total(), dec!(240.00));
        assert_eq!(sale.status(), SaleStatus::Completed);
        assert_eq!(
            fx.ledger
                .position(fx.tenant_id, fx.supplier_id, fx.product_a)
                .unwrap()
                .qty_on_hand(),
            70
        );

        fx.ledger
            .return_sale(ReturnSale {
                tenant_id: fx.tenant_id,
                sale_id: sale.id(),
                line_no: Some(1),
                reason: None,
            })
            .unwrap();
        assert_eq!(
            fx.ledger
                .position(fx.tenant_id, fx.supplier_id, fx.product_a)
                .unwrap()
                .qty_on_hand(),
            100
        );
    }

    #[test]
    fn product_stock_sums_across_suppliers() {
        let fx = setup();

        // Same product stocked from a second supplier: registries validate
        // existence, not association, and the total is a computed aggregate.
        let second_supplier = SupplierId::new();
        fx.suppliers
            .insert(Supplier::new(second_supplier, fx.tenant_id, "Backup Goods", None).unwrap());

        fx.ledger.adjust_stock(adjust(&fx, fx.product_a, 6)).unwrap();
        fx.ledger
            .adjust_stock(AdjustStock {
                supplier_id: second_supplier,
                ..adjust(&fx, fx.product_a, 4)
            })
            .unwrap();

        assert_eq!(
            fx.ledger.product_stock(fx.tenant_id, fx.product_a).unwrap(),
            10
        );
        assert_eq!(fx.ledger.positions(fx.tenant_id).unwrap().len(), 2);

        let err = fx
            .ledger
            .product_stock(fx.tenant_id, ProductId::new())
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    /// 50 concurrent single-unit decrements against a position holding 30:
    /// exactly 30 succeed, 20 fail with InsufficientStock, and the final
    /// quantity is 0 (never negative, never over-decremented).
    #[test]
    fn concurrent_decrements_never_oversell() {
        let fx = setup();

        // Generous retry budget: 50 writers hammering one key produce long
        // conflict chains that a production-sized budget need not absorb.
        let ledger = Arc::new(
            StockLedger::new(
                fx.store.clone(),
                fx.suppliers.clone(),
                fx.customers.clone(),
                fx.products.clone(),
            )
            .with_config(ServiceConfig { max_retries: 100 }),
        );

        ledger.adjust_stock(adjust(&fx, fx.product_a, 30)).unwrap();

        let mut handles = Vec::new();
        for _ in 0..50 {
            let ledger = ledger.clone();
            let cmd = adjust(&fx, fx.product_a, -1);
            handles.push(std::thread::spawn(move || {
                // A conflict means the whole-operation retry budget ran out;
                // the caller retries at whole-operation granularity.
                loop {
                    match ledger.adjust_stock(cmd.clone()) {
                        Ok(_) => return true,
                        Err(ServiceError::InsufficientStock { .. }) => return false,
                        Err(ServiceError::Conflict(_)) => continue,
                        Err(other) => panic!("unexpected error: {other:?}"),
                    }
                }
            }));
        }

        let outcomes: Vec<bool> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let successes = outcomes.iter().filter(|ok| **ok).count();
        let failures = outcomes.len() - successes;

        assert_eq!(successes, 30);
        assert_eq!(failures, 20);
        assert_eq!(
            ledger
                .position(fx.tenant_id, fx.supplier_id, fx.product_a)
                .unwrap()
                .qty_on_hand(),
            0
        );
    }

    #[test]
    fn operations_are_tenant_scoped() {
        let fx = setup();
        fx.ledger.adjust_stock(adjust(&fx, fx.product_a, 5)).unwrap();

        let other_tenant = TenantId::new();
        let err = fx
            .ledger
            .position(other_tenant, fx.supplier_id, fx.product_a)
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
        assert!(fx.ledger.positions(other_tenant).unwrap().is_empty());
    }
}
