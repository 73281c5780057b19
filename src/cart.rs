//! Cart
//!
//! The cart only records identifiers and quantities. Prices are looked up
//! live whenever the total is rebuilt or the cart is projected for display.

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::{
    bundles::{BundleError, BundleId, BundleRegistry, DiscountType},
    catalog::Catalog,
    checkout::CheckoutState,
    pricing::{PricingError, bundle_price, cart_total, round_total},
    products::ProductId,
    reservation::{ReservationError, plan_bundle, reserve_product},
};

/// Errors raised by cart mutations and projections.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CartError {
    /// Stock could not be reserved.
    #[error(transparent)]
    Reservation(#[from] ReservationError),

    /// The bundle could not be resolved.
    #[error(transparent)]
    Bundle(#[from] BundleError),

    /// The cart could not be priced.
    #[error(transparent)]
    Pricing(#[from] PricingError),
}

/// One entry in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CartLine {
    /// A single product
    Product {
        /// Referenced product
        #[serde(rename = "product_id")]
        product: ProductId,
        /// Units reserved
        quantity: u32,
    },

    /// A whole bundle; priced once regardless of `quantity`
    Bundle {
        /// Referenced bundle
        #[serde(rename = "bundle_id")]
        bundle: BundleId,
        /// Always 1 for lines added through the cart
        quantity: u32,
    },
}

/// Gift metadata applied at checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GiftOptions {
    /// Whether the order is a gift
    pub is_gift: bool,

    /// Free-text gift message
    pub message: String,

    /// Whether to gift-wrap the order
    pub wrapping: bool,
}

/// The shared cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartSession {
    lines: Vec<CartLine>,
    total: Decimal,
    gift: GiftOptions,
    finalizing: bool,
}

impl Default for CartSession {
    fn default() -> Self {
        Self {
            lines: Vec::new(),
            total: round_total(Decimal::ZERO),
            gift: GiftOptions::default(),
            finalizing: false,
        }
    }
}

impl CartSession {
    /// Create an empty cart.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve stock for a product and append a product line.
    ///
    /// Nothing is appended, and no stock is taken, on failure.
    ///
    /// # Errors
    ///
    /// - [`ReservationError::ProductNotFound`] / [`ReservationError::InvalidQuantity`]
    /// - [`ReservationError::InsufficientInventory`]
    /// - [`PricingError::Overflow`]
    pub fn add_product_line(
        &mut self,
        catalog: &mut Catalog,
        bundles: &BundleRegistry,
        product: &ProductId,
        quantity: u32,
    ) -> Result<(), CartError> {
        if quantity == 0 {
            return Err(ReservationError::InvalidQuantity(quantity).into());
        }

        if catalog.get(product).is_err() {
            return Err(ReservationError::ProductNotFound(product.clone()).into());
        }

        let line = CartLine::Product {
            product: product.clone(),
            quantity,
        };

        let total = self.total_with(&line, catalog, bundles)?;

        reserve_product(catalog, product, quantity)?;

        self.push(line, total);

        Ok(())
    }

    /// Reserve every item of a bundle and append a bundle line.
    ///
    /// Nothing is appended, and no stock is taken, on failure.
    ///
    /// # Errors
    ///
    /// - [`BundleError::NotFound`]
    /// - [`ReservationError::InsufficientInventory`] naming the first short product
    /// - [`PricingError::Overflow`]
    pub fn add_bundle_line(
        &mut self,
        catalog: &mut Catalog,
        bundles: &BundleRegistry,
        bundle: &BundleId,
    ) -> Result<(), CartError> {
        let resolved = bundles.get(bundle)?;
        let plan = plan_bundle(catalog, resolved)?;

        let line = CartLine::Bundle {
            bundle: bundle.clone(),
            quantity: 1,
        };

        let total = self.total_with(&line, catalog, bundles)?;

        plan.commit(catalog)?;

        self.push(line, total);

        Ok(())
    }

    /// Replace the gift metadata. Has no effect on stock or lines.
    pub fn set_gift_options(&mut self, gift: GiftOptions) {
        self.gift = gift;
    }

    /// Freeze the cart for checkout. Cleared by [`CartSession::reset`].
    pub fn begin_finalizing(&mut self) {
        self.finalizing = true;
    }

    /// Clear lines, total and gift metadata.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Lines in insertion order.
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Stored total, rebuilt after every mutation.
    pub fn total(&self) -> Decimal {
        self.total
    }

    /// Current gift metadata.
    pub fn gift(&self) -> &GiftOptions {
        &self.gift
    }

    /// `Finalizing` during checkout, else `Empty` with no lines and `Active`
    /// otherwise.
    pub fn state(&self) -> CheckoutState {
        if self.finalizing {
            CheckoutState::Finalizing
        } else if self.lines.is_empty() {
            CheckoutState::Empty
        } else {
            CheckoutState::Active
        }
    }

    /// Expand every line into display data using live prices.
    ///
    /// # Errors
    ///
    /// Returns an error if a line references a product or bundle that no
    /// longer resolves, or pricing overflows.
    pub fn view(&self, catalog: &Catalog, bundles: &BundleRegistry) -> Result<CartView, CartError> {
        let items = self
            .lines
            .iter()
            .map(|line| line_view(line, catalog, bundles))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(CartView {
            items,
            total: self.total,
            is_gift: self.gift.is_gift,
            gift_message: self.gift.message.clone(),
            gift_wrapping: self.gift.wrapping,
        })
    }

    fn total_with(
        &self,
        line: &CartLine,
        catalog: &Catalog,
        bundles: &BundleRegistry,
    ) -> Result<Decimal, PricingError> {
        let mut lines = Vec::with_capacity(self.lines.len() + 1);

        lines.extend_from_slice(&self.lines);
        lines.push(line.clone());

        cart_total(&lines, catalog, bundles)
    }

    fn push(&mut self, line: CartLine, total: Decimal) {
        debug!(?line, %total, "appended cart line");

        self.lines.push(line);
        self.total = total;
    }
}

/// Read-only projection of the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartView {
    /// Expanded lines in insertion order
    pub items: Vec<CartItemView>,

    /// Cart total, rounded to two decimal places
    pub total: Decimal,

    /// Gift flag
    pub is_gift: bool,

    /// Gift message
    pub gift_message: String,

    /// Gift wrapping flag
    pub gift_wrapping: bool,
}

impl CartView {
    /// Whether the projected cart has no lines.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Display data for one cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CartItemView {
    /// A product line
    Product(ProductView),

    /// A bundle line
    Bundle(BundleView),
}

/// Display data for a product, inside a product line or a bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductView {
    /// Product identifier
    pub id: ProductId,

    /// Product name
    pub name: String,

    /// Current unit price
    pub price: Decimal,

    /// Units in the line or bundle
    pub quantity: u32,
}

/// Display data for a bundle line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BundleView {
    /// Bundle identifier
    pub id: BundleId,

    /// Bundle name
    pub name: String,

    /// Line quantity
    pub quantity: u32,

    /// Discount kind
    pub discount_type: DiscountType,

    /// Discount value
    pub discount_value: Decimal,

    /// Constituent products with their own prices and quantities
    pub products: Vec<ProductView>,

    /// Sum of constituent prices
    pub original_price: Decimal,

    /// Price after the bundle discount
    pub price_after_discount: Decimal,

    /// Amount saved by the discount
    pub savings: Decimal,
}

fn line_view(
    line: &CartLine,
    catalog: &Catalog,
    bundles: &BundleRegistry,
) -> Result<CartItemView, CartError> {
    match line {
        CartLine::Product { product, quantity } => {
            Ok(CartItemView::Product(product_view(catalog, product, *quantity)?))
        }
        CartLine::Bundle { bundle, quantity } => {
            let bundle = bundles.get(bundle)?;
            let price = bundle_price(bundle, catalog)?;

            let products = bundle
                .items
                .iter()
                .map(|item| product_view(catalog, &item.product_id, item.quantity))
                .collect::<Result<Vec<_>, _>>()?;

            Ok(CartItemView::Bundle(BundleView {
                id: bundle.id.clone(),
                name: bundle.name.clone(),
                quantity: *quantity,
                discount_type: bundle.discount.kind(),
                discount_value: bundle.discount.value(),
                products,
                original_price: price.original,
                price_after_discount: price.discounted,
                savings: price.savings,
            }))
        }
    }
}

fn product_view(
    catalog: &Catalog,
    id: &ProductId,
    quantity: u32,
) -> Result<ProductView, PricingError> {
    let product = catalog
        .get(id)
        .map_err(|_err| PricingError::MissingProduct(id.clone()))?;

    Ok(ProductView {
        id: product.id.clone(),
        name: product.name.clone(),
        price: product.price,
        quantity,
    })
}
