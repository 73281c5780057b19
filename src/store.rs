//! Store
//!
//! The single shared catalog, bundle registry and cart behind one lock.
//! Every operation holds the lock for its whole read-modify-write sequence,
//! so a bundle's dry run and commit can never interleave with another
//! mutation. Reads take the same lock and always see a consistent snapshot.

use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tracing::info;

use crate::{
    bundles::{Bundle, BundleError, BundleId, BundleRegistry, NewBundle},
    cart::{CartError, CartSession, CartView, GiftOptions},
    catalog::{Catalog, CatalogError},
    checkout::{OrderConfirmation, checkout},
    pricing::PricingError,
    products::{Product, ProductId, SellerId},
    reservation::ReservationError,
};

/// Errors surfaced by store operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Catalog lookup or stock change failed.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Bundle creation or lookup failed.
    #[error(transparent)]
    Bundle(#[from] BundleError),

    /// Adding to or projecting the cart failed.
    #[error(transparent)]
    Cart(#[from] CartError),
}

/// Coarse classification of a [`StoreError`] for callers that report errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unknown product, seller or bundle
    NotFound,

    /// Bundle items span more than one seller
    SellerMismatch,

    /// Not enough stock
    InsufficientInventory,

    /// Malformed request (zero quantities, bad discounts, empty bundles)
    InvalidInput,

    /// Internal inconsistency or arithmetic overflow
    Internal,
}

impl StoreError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Catalog(error) => catalog_kind(error),
            Self::Bundle(error) | Self::Cart(CartError::Bundle(error)) => bundle_kind(error),
            Self::Cart(CartError::Reservation(error)) => match error {
                ReservationError::ProductNotFound(_) => ErrorKind::NotFound,
                ReservationError::InvalidQuantity(_) => ErrorKind::InvalidInput,
                ReservationError::InsufficientInventory { .. } => ErrorKind::InsufficientInventory,
                ReservationError::Catalog(error) => catalog_kind(error),
            },
            Self::Cart(CartError::Pricing(error)) => match error {
                PricingError::MissingProduct(_) | PricingError::MissingBundle(_) => {
                    ErrorKind::NotFound
                }
                PricingError::Overflow => ErrorKind::Internal,
            },
        }
    }
}

fn catalog_kind(error: &CatalogError) -> ErrorKind {
    match error {
        CatalogError::ProductNotFound(_) | CatalogError::UnknownSeller(_) => ErrorKind::NotFound,
        CatalogError::InsufficientInventory { .. } => ErrorKind::InsufficientInventory,
        CatalogError::DuplicateProduct(_)
        | CatalogError::DuplicateSeller(_)
        | CatalogError::NegativePrice(_)
        | CatalogError::InvalidQuantity(_) => ErrorKind::InvalidInput,
        CatalogError::InventoryOverflow(_) => ErrorKind::Internal,
    }
}

fn bundle_kind(error: &BundleError) -> ErrorKind {
    match error {
        BundleError::NotFound(_) | BundleError::UnknownSeller(_) | BundleError::ProductNotFound(_) => {
            ErrorKind::NotFound
        }
        BundleError::SellerMismatch { .. } => ErrorKind::SellerMismatch,
        BundleError::EmptyBundle
        | BundleError::InvalidQuantity(_)
        | BundleError::InvalidDiscount { .. } => ErrorKind::InvalidInput,
    }
}

#[derive(Debug, Default)]
struct StoreState {
    catalog: Catalog,
    bundles: BundleRegistry,
    cart: CartSession,
}

/// Shared in-memory store. Construct once and pass by reference.
#[derive(Debug, Default)]
pub struct Store {
    state: Mutex<StoreState>,
}

impl Store {
    /// Create a store over a seeded catalog with no bundles and an empty cart.
    pub fn new(catalog: Catalog) -> Self {
        Self {
            state: Mutex::new(StoreState {
                catalog,
                bundles: BundleRegistry::new(),
                cart: CartSession::new(),
            }),
        }
    }

    /// Every product in the catalog.
    #[tracing::instrument(name = "store.list_products", skip(self))]
    pub fn list_products(&self) -> Vec<Product> {
        self.lock().catalog.list_all().cloned().collect()
    }

    /// Products owned by a seller; empty for unknown sellers.
    #[tracing::instrument(name = "store.list_seller_products", skip(self), fields(seller = %seller))]
    pub fn list_seller_products(&self, seller: &SellerId) -> Vec<Product> {
        self.lock().catalog.list_by_seller(seller).cloned().collect()
    }

    /// Create a bundle after validating every item belongs to the declared seller.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Bundle`], most notably [`BundleError::SellerMismatch`].
    #[tracing::instrument(
        name = "store.create_bundle",
        skip(self, bundle),
        fields(seller = %bundle.seller_id, items = bundle.items.len()),
        err
    )]
    pub fn create_bundle(&self, bundle: NewBundle) -> Result<Bundle, StoreError> {
        let mut state = self.lock();
        let StoreState {
            catalog, bundles, ..
        } = &mut *state;

        Ok(bundles.create(catalog, bundle)?)
    }

    /// Every bundle, in creation order.
    #[tracing::instrument(name = "store.list_bundles", skip(self))]
    pub fn list_bundles(&self) -> Vec<Bundle> {
        self.lock().bundles.list().cloned().collect()
    }

    /// Reserve stock for a product, append it to the cart and return the cart.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Cart`] for unknown products and insufficient stock.
    #[tracing::instrument(
        name = "store.add_item_to_cart",
        skip(self),
        fields(product = %product),
        err
    )]
    pub fn add_item_to_cart(&self, product: &ProductId, quantity: u32) -> Result<CartView, StoreError> {
        let mut state = self.lock();
        let StoreState {
            catalog,
            bundles,
            cart,
        } = &mut *state;

        cart.add_product_line(catalog, bundles, product, quantity)?;

        info!(product = %product, quantity, total = %cart.total(), "added product to cart");

        Ok(cart.view(catalog, bundles)?)
    }

    /// Reserve every item of a bundle, append it to the cart and return the cart.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Cart`] for unknown bundles and insufficient stock.
    #[tracing::instrument(
        name = "store.add_bundle_to_cart",
        skip(self),
        fields(bundle = %bundle),
        err
    )]
    pub fn add_bundle_to_cart(&self, bundle: &BundleId) -> Result<CartView, StoreError> {
        let mut state = self.lock();
        let StoreState {
            catalog,
            bundles,
            cart,
        } = &mut *state;

        cart.add_bundle_line(catalog, bundles, bundle)?;

        info!(bundle = %bundle, total = %cart.total(), "added bundle to cart");

        Ok(cart.view(catalog, bundles)?)
    }

    /// Current cart projection.
    ///
    /// # Errors
    ///
    /// Only fails if a line no longer resolves, which cannot happen while
    /// products and bundles are never removed.
    #[tracing::instrument(name = "store.get_cart", skip(self), err)]
    pub fn get_cart(&self) -> Result<CartView, StoreError> {
        let state = self.lock();

        Ok(state.cart.view(&state.catalog, &state.bundles)?)
    }

    /// Finalize the cart into an order and reset it.
    #[tracing::instrument(name = "store.checkout", skip(self, gift), fields(is_gift = gift.is_gift))]
    pub fn checkout(&self, gift: GiftOptions) -> OrderConfirmation {
        checkout(&mut self.lock().cart, gift)
    }

    /// Current stock of a product.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::ProductNotFound`] for unknown identifiers.
    pub fn stock(&self, product: &ProductId) -> Result<u32, StoreError> {
        Ok(self.lock().catalog.stock(product)?)
    }

    /// Return units to stock, e.g. before retrying a failed reservation.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Catalog`] for unknown products or zero quantities.
    #[tracing::instrument(name = "store.restock", skip(self), fields(product = %product), err)]
    pub fn restock(&self, product: &ProductId, quantity: u32) -> Result<u32, StoreError> {
        let stock = self.lock().catalog.restock(product, quantity)?;

        info!(product = %product, quantity, stock, "restocked product");

        Ok(stock)
    }

    /// No operation leaves the state half-mutated before a fallible step, so a
    /// poisoned lock still guards consistent data.
    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use testresult::TestResult;

    use crate::{
        bundles::{BundleItem, DiscountType},
        products::Seller,
    };

    use super::*;

    fn test_store() -> TestResult<Store> {
        let mut catalog = Catalog::new();

        catalog.insert_seller(Seller::new("s1", "Luxury Goods Inc."))?;
        catalog.insert_seller(Seller::new("s2", "Gourmet Delights"))?;
        catalog.insert_product(Product::new("p1", "Luxury Watch", Decimal::from(200), "s1", 5))?;
        catalog.insert_product(Product::new("p2", "Designer Handbag", Decimal::from(150), "s1", 3))?;
        catalog.insert_product(Product::new("p3", "Gourmet Coffee Set", Decimal::from(50), "s2", 10))?;

        Ok(Store::new(catalog))
    }

    fn new_bundle(items: &[(&str, u32)]) -> NewBundle {
        NewBundle {
            name: "Luxury Pair".to_string(),
            seller_id: SellerId::from("s1"),
            items: items
                .iter()
                .map(|(product, quantity)| BundleItem::new(*product, *quantity))
                .collect(),
            discount_type: DiscountType::Percentage,
            discount_value: Decimal::from(10),
        }
    }

    #[test]
    fn error_kinds_follow_the_taxonomy() -> TestResult {
        let store = test_store()?;

        let missing = store.add_item_to_cart(&ProductId::from("p9"), 1);
        let short = store.add_item_to_cart(&ProductId::from("p3"), 11);
        let mismatch = store.create_bundle(NewBundle {
            seller_id: SellerId::from("s2"),
            ..new_bundle(&[("p1", 1)])
        });
        let no_bundle = store.add_bundle_to_cart(&BundleId::from("b9"));

        assert_eq!(missing.map_err(|e| e.kind()).err(), Some(ErrorKind::NotFound));
        assert_eq!(short.map_err(|e| e.kind()).err(), Some(ErrorKind::InsufficientInventory));
        assert_eq!(mismatch.map_err(|e| e.kind()).err(), Some(ErrorKind::SellerMismatch));
        assert_eq!(no_bundle.map_err(|e| e.kind()).err(), Some(ErrorKind::NotFound));

        Ok(())
    }

    #[test]
    fn bundle_errors_classify_the_same_from_either_path() {
        let direct = StoreError::Bundle(BundleError::NotFound(BundleId::from("b9")));
        let via_cart = StoreError::Cart(CartError::Bundle(BundleError::NotFound(BundleId::from("b9"))));
        let invalid = StoreError::Cart(CartError::Bundle(BundleError::EmptyBundle));

        assert_eq!(direct.kind(), ErrorKind::NotFound);
        assert_eq!(via_cart.kind(), direct.kind());
        assert_eq!(invalid.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn list_bundles_returns_created_bundles() -> TestResult {
        let store = test_store()?;

        let bundle = store.create_bundle(new_bundle(&[("p1", 1), ("p2", 1)]))?;

        assert_eq!(store.list_bundles(), vec![bundle]);

        Ok(())
    }

    #[test]
    fn restock_allows_retrying_a_failed_reservation() -> TestResult {
        let store = test_store()?;
        let p3 = ProductId::from("p3");

        assert!(store.add_item_to_cart(&p3, 12).is_err());

        store.restock(&p3, 2)?;
        let cart = store.add_item_to_cart(&p3, 12)?;

        assert_eq!(cart.total, Decimal::from(600));
        assert_eq!(store.stock(&p3)?, 0);

        Ok(())
    }

    #[test]
    fn checkout_through_the_store_empties_the_cart() -> TestResult {
        let store = test_store()?;

        store.add_item_to_cart(&ProductId::from("p1"), 1)?;
        let confirmation = store.checkout(GiftOptions::default());
        let cart = store.get_cart()?;

        assert_eq!(confirmation.line_count, 1);
        assert!(cart.is_empty());
        assert_eq!(cart.total, Decimal::ZERO);

        Ok(())
    }
}
