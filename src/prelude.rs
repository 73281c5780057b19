//! Bundlecart prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    bundles::{
        Bundle, BundleError, BundleId, BundleItem, BundleRegistry, DiscountPolicy, DiscountType,
        NewBundle,
    },
    cart::{CartError, CartItemView, CartLine, CartSession, CartView, GiftOptions},
    catalog::{Catalog, CatalogError},
    checkout::{CheckoutState, OrderConfirmation, OrderId},
    fixtures::{default_catalog, load_catalog},
    pricing::{BundlePrice, PricingError, bundle_price, cart_total},
    products::{Product, ProductId, Seller, SellerId},
    reservation::ReservationError,
    store::{ErrorKind, Store, StoreError},
};
