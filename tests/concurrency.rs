//! Concurrent callers share one store without overselling.

use std::thread;

use rust_decimal::Decimal;
use testresult::TestResult;

use bundlecart::prelude::*;

#[test]
fn concurrent_bundle_reservations_never_oversell() -> TestResult {
    let store = Store::new(default_catalog()?);
    let bundle = store.create_bundle(NewBundle {
        name: "Luxury Pair".to_string(),
        seller_id: SellerId::from("s1"),
        items: vec![BundleItem::new("p1", 1), BundleItem::new("p2", 1)],
        discount_type: DiscountType::Fixed,
        discount_value: Decimal::from(50),
    })?;

    let results: Vec<Result<CartView, StoreError>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| store.add_bundle_to_cart(&bundle.id)))
            .collect();

        handles.into_iter().filter_map(|handle| handle.join().ok()).collect()
    });

    assert_eq!(results.len(), 8, "a reservation thread panicked");

    let succeeded = results.iter().filter(|result| result.is_ok()).count();

    assert_eq!(succeeded, 3);
    assert!(
        results
            .iter()
            .filter_map(|result| result.as_ref().err())
            .all(|error| error.kind() == ErrorKind::InsufficientInventory)
    );
    assert_eq!(store.stock(&ProductId::from("p1"))?, 2);
    assert_eq!(store.stock(&ProductId::from("p2"))?, 0);

    let cart = store.get_cart()?;

    assert_eq!(cart.items.len(), 3);
    assert_eq!(cart.total, Decimal::from(900));

    Ok(())
}

#[test]
fn concurrent_product_adds_account_for_every_unit() -> TestResult {
    let store = Store::new(default_catalog()?);
    let p4 = ProductId::from("p4");

    let results: Vec<bool> = thread::scope(|scope| {
        let handles: Vec<_> = (0..20)
            .map(|_| scope.spawn(|| store.add_item_to_cart(&p4, 1).is_ok()))
            .collect();

        handles.into_iter().filter_map(|handle| handle.join().ok()).collect()
    });

    // Twelve units in stock: the losers are rejected, not oversold.
    assert_eq!(results.len(), 20, "an add thread panicked");
    assert_eq!(results.iter().filter(|added| **added).count(), 12);

    let cart = store.get_cart()?;

    assert_eq!(store.stock(&p4)?, 0);
    assert_eq!(cart.items.len(), 12);
    assert_eq!(cart.total, Decimal::from(360));

    Ok(())
}

#[test]
fn readers_see_consistent_snapshots() -> TestResult {
    let store = Store::new(default_catalog()?);
    let p3 = ProductId::from("p3");

    let added = thread::scope(|scope| {
        let writer = scope.spawn(|| {
            (0..10)
                .filter(|_| store.add_item_to_cart(&p3, 1).is_ok())
                .count()
        });

        scope.spawn(|| {
            for _ in 0..50 {
                if let Ok(cart) = store.get_cart() {
                    let units: u32 = cart
                        .items
                        .iter()
                        .map(|item| match item {
                            CartItemView::Product(product) => product.quantity,
                            CartItemView::Bundle(bundle) => bundle.quantity,
                        })
                        .sum();

                    assert_eq!(cart.total, Decimal::from(50 * units));
                }
            }
        });

        writer.join().ok()
    });

    assert_eq!(added, Some(10));
    assert_eq!(store.stock(&p3)?, 0);

    Ok(())
}
