//! Pricing
//!
//! Pure computations over catalog, bundle and cart line data. Nothing here
//! mutates state, and nothing is cached: totals are always rebuilt from lines.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use thiserror::Error;

use crate::{
    bundles::{Bundle, BundleId, BundleRegistry, DiscountPolicy},
    cart::CartLine,
    catalog::Catalog,
    products::ProductId,
};

/// Decimal places cart totals are rounded to.
pub const TOTAL_DECIMAL_PLACES: u32 = 2;

/// Errors that can occur while pricing bundles or carts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PricingError {
    /// A line or bundle references a product the catalog does not hold.
    #[error("missing product: {0}")]
    MissingProduct(ProductId),

    /// A cart line references a bundle the registry does not hold.
    #[error("missing bundle: {0}")]
    MissingBundle(BundleId),

    /// Decimal arithmetic overflowed.
    #[error("price arithmetic overflowed")]
    Overflow,
}

/// Price breakdown for a single bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BundlePrice {
    /// Sum of item prices times quantities
    pub original: Decimal,

    /// Price after the bundle's discount
    pub discounted: Decimal,

    /// `original - discounted`
    pub savings: Decimal,
}

/// Price a bundle against current catalog prices.
///
/// A fixed discount larger than the original price yields a negative
/// discounted price; it is not clamped.
///
/// # Errors
///
/// - [`PricingError::MissingProduct`]: a bundle item's product is gone.
/// - [`PricingError::Overflow`]: arithmetic overflowed.
pub fn bundle_price(bundle: &Bundle, catalog: &Catalog) -> Result<BundlePrice, PricingError> {
    let original = bundle
        .items
        .iter()
        .try_fold(Decimal::ZERO, |acc, item| {
            let product = catalog
                .get(&item.product_id)
                .map_err(|_err| PricingError::MissingProduct(item.product_id.clone()))?;

            product
                .price
                .checked_mul(Decimal::from(item.quantity))
                .and_then(|line| acc.checked_add(line))
                .ok_or(PricingError::Overflow)
        })?;

    let savings = match bundle.discount {
        DiscountPolicy::Percentage(fraction) => original
            .checked_mul(fraction * Decimal::ONE)
            .ok_or(PricingError::Overflow)?,
        DiscountPolicy::Fixed(amount) => amount,
    };

    let discounted = original
        .checked_sub(savings)
        .ok_or(PricingError::Overflow)?;

    Ok(BundlePrice {
        original,
        discounted,
        savings,
    })
}

/// Price a single cart line.
///
/// A bundle line always contributes exactly one bundle's discounted price;
/// its quantity is not multiplied in.
///
/// # Errors
///
/// - [`PricingError::MissingProduct`] / [`PricingError::MissingBundle`]: dangling references.
/// - [`PricingError::Overflow`]: arithmetic overflowed.
pub fn line_price(
    line: &CartLine,
    catalog: &Catalog,
    bundles: &BundleRegistry,
) -> Result<Decimal, PricingError> {
    match line {
        CartLine::Product { product, quantity } => {
            let product = catalog
                .get(product)
                .map_err(|_err| PricingError::MissingProduct(product.clone()))?;

            product
                .price
                .checked_mul(Decimal::from(*quantity))
                .ok_or(PricingError::Overflow)
        }
        CartLine::Bundle { bundle, .. } => {
            let bundle = bundles
                .get(bundle)
                .map_err(|_err| PricingError::MissingBundle(bundle.clone()))?;

            Ok(bundle_price(bundle, catalog)?.discounted)
        }
    }
}

/// Sum every line's price and round the result to two decimal places.
///
/// # Errors
///
/// Propagates any [`line_price`] error.
pub fn cart_total(
    lines: &[CartLine],
    catalog: &Catalog,
    bundles: &BundleRegistry,
) -> Result<Decimal, PricingError> {
    let total = lines.iter().try_fold(Decimal::ZERO, |acc, line| {
        acc.checked_add(line_price(line, catalog, bundles)?)
            .ok_or(PricingError::Overflow)
    })?;

    Ok(round_total(total))
}

/// Round a monetary amount the way cart totals are rounded. The result
/// always carries exactly two decimal places, so `300` serializes as `300.00`.
pub fn round_total(amount: Decimal) -> Decimal {
    let mut rounded =
        amount.round_dp_with_strategy(TOTAL_DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(TOTAL_DECIMAL_PLACES);

    rounded
}
