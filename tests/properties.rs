//! Property tests over random operation sequences.

use std::collections::BTreeMap;

use proptest::prelude::*;
use rust_decimal::{Decimal, RoundingStrategy};

use bundlecart::prelude::*;

const PRODUCTS: [(&str, &str); 5] = [("p1", "s1"), ("p2", "s1"), ("p3", "s2"), ("p4", "s2"), ("p5", "s3")];
const SELLERS: [&str; 3] = ["s1", "s2", "s3"];

#[derive(Debug, Clone)]
enum Op {
    AddProduct(usize, u32),
    AddBundle(usize),
    Restock(usize, u32),
    Checkout,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0..PRODUCTS.len(), 0..6u32).prop_map(|(product, quantity)| Op::AddProduct(product, quantity)),
        3 => (0..3usize).prop_map(Op::AddBundle),
        1 => (0..PRODUCTS.len(), 1..4u32).prop_map(|(product, quantity)| Op::Restock(product, quantity)),
        1 => Just(Op::Checkout),
    ]
}

fn product_id(index: usize) -> ProductId {
    PRODUCTS
        .get(index)
        .map_or_else(|| ProductId::from("missing"), |(id, _)| ProductId::from(*id))
}

fn seeded_store() -> Result<(Store, Vec<BundleId>), TestCaseError> {
    let store = Store::new(default_catalog().map_err(|e| TestCaseError::fail(e.to_string()))?);

    let requests = [
        ("Luxury Pair", "s1", vec![("p1", 1), ("p2", 1)], DiscountType::Fixed, Decimal::from(50)),
        ("Gourmet Box", "s2", vec![("p3", 1), ("p4", 2)], DiscountType::Percentage, Decimal::from(10)),
        ("Speaker Pair", "s3", vec![("p5", 2)], DiscountType::Percentage, Decimal::new(3333, 2)),
    ];

    let mut ids = Vec::new();

    for (name, seller, items, discount_type, discount_value) in requests {
        let bundle = store
            .create_bundle(NewBundle {
                name: name.to_string(),
                seller_id: SellerId::from(seller),
                items: items
                    .into_iter()
                    .map(|(product, quantity)| BundleItem::new(product, quantity))
                    .collect(),
                discount_type,
                discount_value,
            })
            .map_err(|e| TestCaseError::fail(e.to_string()))?;

        ids.push(bundle.id);
    }

    Ok((store, ids))
}

fn stocks(store: &Store) -> Result<BTreeMap<String, u32>, TestCaseError> {
    PRODUCTS
        .iter()
        .map(|(id, _)| {
            store
                .stock(&ProductId::from(*id))
                .map(|stock| ((*id).to_string(), stock))
                .map_err(|e| TestCaseError::fail(e.to_string()))
        })
        .collect()
}

fn reserved_in(cart: &CartView) -> BTreeMap<String, u32> {
    let mut reserved = BTreeMap::new();

    for item in &cart.items {
        match item {
            CartItemView::Product(product) => {
                *reserved.entry(product.id.to_string()).or_default() += product.quantity;
            }
            CartItemView::Bundle(bundle) => {
                for product in &bundle.products {
                    *reserved.entry(product.id.to_string()).or_default() += product.quantity;
                }
            }
        }
    }

    reserved
}

fn recomputed_total(cart: &CartView) -> Decimal {
    cart.items
        .iter()
        .map(|item| match item {
            CartItemView::Product(product) => product.price * Decimal::from(product.quantity),
            CartItemView::Bundle(bundle) => bundle.price_after_discount,
        })
        .sum::<Decimal>()
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

proptest! {
    #[test]
    fn stock_is_conserved_and_totals_match(ops in prop::collection::vec(op(), 1..40)) {
        let (store, bundles) = seeded_store()?;
        let initial = stocks(&store)?;
        let mut restocked: BTreeMap<String, u32> = BTreeMap::new();
        let mut sold: BTreeMap<String, u32> = BTreeMap::new();

        for op in ops {
            let before = stocks(&store)?;

            let failed = match &op {
                Op::AddProduct(product, quantity) => {
                    store.add_item_to_cart(&product_id(*product), *quantity).is_err()
                }
                Op::AddBundle(bundle) => match bundles.get(*bundle) {
                    Some(id) => store.add_bundle_to_cart(id).is_err(),
                    None => true,
                },
                Op::Restock(product, quantity) => {
                    let id = product_id(*product);
                    store.restock(&id, *quantity).map_err(|e| TestCaseError::fail(e.to_string()))?;
                    *restocked.entry(id.to_string()).or_default() += quantity;
                    false
                }
                Op::Checkout => {
                    let cart = store.get_cart().map_err(|e| TestCaseError::fail(e.to_string()))?;
                    for (product, units) in reserved_in(&cart) {
                        *sold.entry(product).or_default() += units;
                    }
                    let confirmation = store.checkout(GiftOptions::default());
                    prop_assert_eq!(confirmation.total, cart.total);
                    false
                }
            };

            if failed {
                prop_assert_eq!(&stocks(&store)?, &before, "failed {:?} changed stock", op);
            }

            let cart = store.get_cart().map_err(|e| TestCaseError::fail(e.to_string()))?;
            let reserved = reserved_in(&cart);
            let current = stocks(&store)?;

            for (product, start) in &initial {
                let held = reserved.get(product).copied().unwrap_or_default()
                    + sold.get(product).copied().unwrap_or_default();
                let added = restocked.get(product).copied().unwrap_or_default();

                prop_assert_eq!(current.get(product).copied().unwrap_or_default() + held, start + added);
            }

            prop_assert_eq!(cart.total, recomputed_total(&cart));
        }
    }

    #[test]
    fn bundles_must_stay_within_one_seller(
        seller in 0..SELLERS.len(),
        items in prop::collection::btree_map(0..PRODUCTS.len(), 1..4u32, 1..4),
    ) {
        let store = Store::new(default_catalog().map_err(|e| TestCaseError::fail(e.to_string()))?);
        let seller_id = SELLERS.get(seller).copied().unwrap_or("s1");

        let same_seller = items
            .keys()
            .all(|index| PRODUCTS.get(*index).is_some_and(|(_, owner)| *owner == seller_id));

        let result = store.create_bundle(NewBundle {
            name: "Generated".to_string(),
            seller_id: SellerId::from(seller_id),
            items: items
                .iter()
                .map(|(index, quantity)| BundleItem::new(product_id(*index), *quantity))
                .collect(),
            discount_type: DiscountType::Fixed,
            discount_value: Decimal::ZERO,
        });

        if same_seller {
            prop_assert!(result.is_ok(), "expected success, got {:?}", result);
        } else {
            prop_assert!(
                matches!(&result, Err(error) if error.kind() == ErrorKind::SellerMismatch),
                "expected SellerMismatch, got {:?}",
                result
            );
        }

        prop_assert_eq!(store.list_bundles().len(), usize::from(same_seller));
    }
}
