use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use std::sync::Arc;

use chrono::Utc;
use rust_decimal_macros::dec;

use stockroom_core::{CustomerId, ProductId, SupplierId, TenantId};
use stockroom_infra::service::StockLedger;
use stockroom_infra::store::{InMemoryLedgerStore, LedgerStore, PositionWrite};
use stockroom_ledger::{AdjustStock, NewSale, NewSaleLine, PaymentMethod, PositionKey, StockPosition};
use stockroom_parties::{Customer, InMemoryCustomerRegistry, InMemorySupplierRegistry, Supplier};
use stockroom_products::{InMemoryProductRegistry, Product};

struct BenchWorld {
    tenant_id: TenantId,
    supplier_id: SupplierId,
    products: Vec<ProductId>,
    customer_id: CustomerId,
    ledger: Arc<
        StockLedger<
            Arc<InMemoryLedgerStore>,
            Arc<InMemorySupplierRegistry>,
            Arc<InMemoryCustomerRegistry>,
            Arc<InMemoryProductRegistry>,
        >,
    >,
    store: Arc<InMemoryLedgerStore>,
}

fn bench_world(product_count: usize) -> BenchWorld {
    let tenant_id = TenantId::new();
    let supplier_id = SupplierId::new();
    let customer_id = CustomerId::new();

    let suppliers = Arc::new(InMemorySupplierRegistry::new());
    suppliers.insert(Supplier::new(supplier_id, tenant_id, "Bench Supplier", None).unwrap());

    let customers = Arc::new(InMemoryCustomerRegistry::new());
    customers.insert(
        Customer::new(customer_id, tenant_id, "Bench Customer", "555-0100", None).unwrap(),
    );

    let product_registry = Arc::new(InMemoryProductRegistry::new());
    let mut products = Vec::with_capacity(product_count);
    for i in 0..product_count {
        let product_id = ProductId::new();
        product_registry.insert(
            Product::new(
                product_id,
                tenant_id,
                supplier_id,
                format!("Product {i}"),
                dec!(9.99),
                None,
            )
            .unwrap(),
        );
        products.push(product_id);
    }

    let store = Arc::new(InMemoryLedgerStore::new());
    let ledger = Arc::new(StockLedger::new(
        store.clone(),
        suppliers,
        customers,
        product_registry,
    ));

    // Deep stock so decrement benchmarks never run dry.
    for product_id in &products {
        ledger
            .adjust_stock(AdjustStock {
                tenant_id,
                supplier_id,
                product_id: *product_id,
                delta_qty: 1_000_000_000,
                unit_cost: Some(dec!(1.00)),
            })
            .unwrap();
    }

    BenchWorld {
        tenant_id,
        supplier_id,
        products,
        customer_id,
        ledger,
        store,
    }
}

/// Service-mediated adjustment vs a raw store write: measures what the
/// validation + retry pipeline costs on top of the bare CAS.
fn bench_adjust_stock(c: &mut Criterion) {
    let world = bench_world(1);
    let product_id = world.products[0];

    let mut group = c.benchmark_group("adjust_stock");
    group.throughput(Throughput::Elements(1));

    group.bench_function("service", |b| {
        b.iter(|| {
            let position = world
                .ledger
                .adjust_stock(black_box(AdjustStock {
                    tenant_id: world.tenant_id,
                    supplier_id: world.supplier_id,
                    product_id,
                    delta_qty: 1,
                    unit_cost: None,
                }))
                .unwrap();
            black_box(position);
        })
    });

    group.bench_function("raw_store", |b| {
        let key = PositionKey::new(world.tenant_id, world.supplier_id, product_id);
        b.iter(|| {
            let current = world
                .store
                .load_position(&key)
                .unwrap()
                .unwrap_or_else(|| StockPosition::open(key));
            let updated = current.with_delta(1, None).unwrap();
            let stored = world
                .store
                .save_position(PositionWrite::from_read(updated))
                .unwrap();
            black_box(stored);
        })
    });

    group.finish();
}

/// Whole-sale commits at increasing line counts.
fn bench_record_sale(c: &mut Criterion) {
    let mut group = c.benchmark_group("record_sale");

    for line_count in [1usize, 4, 8] {
        let world = bench_world(line_count);
        group.throughput(Throughput::Elements(line_count as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(line_count),
            &line_count,
            |b, _| {
                b.iter(|| {
                    let sale = world
                        .ledger
                        .record_sale(black_box(NewSale {
                            tenant_id: world.tenant_id,
                            customer_id: world.customer_id,
                            occurred_at: Utc::now(),
                            payment_method: PaymentMethod::Card,
                            discount: dec!(0),
                            tax: dec!(0),
                            lines: world
                                .products
                                .iter()
                                .map(|product_id| NewSaleLine {
                                    supplier_id: world.supplier_id,
                                    product_id: *product_id,
                                    quantity: 1,
                                    unit_price: None,
                                })
                                .collect(),
                        }))
                        .unwrap();
                    black_box(sale);
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_adjust_stock, bench_record_sale);
criterion_main!(benches);
