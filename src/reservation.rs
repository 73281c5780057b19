//! Inventory reservation
//!
//! Single products reserve straight through [`Catalog::try_reserve`]. Bundles
//! go through a two-phase procedure: [`plan_bundle`] validates every item
//! against a local snapshot of stock levels without touching the catalog, and
//! [`ReservationPlan::commit`] applies the decrements in bundle item order.
//! Callers must hold the store lock across both phases.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    bundles::Bundle,
    catalog::{Catalog, CatalogError},
    products::ProductId,
};

/// Errors raised while reserving stock.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReservationError {
    /// Unknown product.
    #[error("product not found: {0}")]
    ProductNotFound(ProductId),

    /// Quantity must be positive.
    #[error("quantity must be positive, got {0}")]
    InvalidQuantity(u32),

    /// Not enough stock for the named product.
    #[error("not enough inventory for product {product}: requested {requested}, available {available}")]
    InsufficientInventory {
        /// First product whose stock fell short
        product: ProductId,
        /// Quantity asked for
        requested: u32,
        /// Stock available at that point of the check
        available: u32,
    },

    /// The catalog rejected a reservation the plan had already validated.
    #[error(transparent)]
    Catalog(CatalogError),
}

impl From<CatalogError> for ReservationError {
    fn from(error: CatalogError) -> Self {
        match error {
            CatalogError::ProductNotFound(product) => Self::ProductNotFound(product),
            CatalogError::InvalidQuantity(quantity) => Self::InvalidQuantity(quantity),
            CatalogError::InsufficientInventory {
                product,
                requested,
                available,
            } => Self::InsufficientInventory {
                product,
                requested,
                available,
            },
            other => Self::Catalog(other),
        }
    }
}

/// Reserve `quantity` units of a single product.
///
/// # Errors
///
/// - [`ReservationError::InvalidQuantity`]: `quantity` is zero.
/// - [`ReservationError::ProductNotFound`]: unknown product.
/// - [`ReservationError::InsufficientInventory`]: not enough stock; stock is unchanged.
pub fn reserve_product(
    catalog: &mut Catalog,
    product: &ProductId,
    quantity: u32,
) -> Result<(), ReservationError> {
    catalog.try_reserve(product, quantity).map_err(|error| {
        warn!(product = %product, quantity, %error, "product reservation rejected");
        ReservationError::from(error)
    })
}

/// Validated, not-yet-applied decrements for a bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationPlan {
    decrements: SmallVec<[(ProductId, u32); 4]>,
}

impl ReservationPlan {
    /// Decrements in the order they will be applied.
    pub fn decrements(&self) -> &[(ProductId, u32)] {
        &self.decrements
    }

    /// Apply the planned decrements one at a time, in bundle item order.
    ///
    /// # Errors
    ///
    /// Only fails if the catalog changed since the plan was made, which the
    /// store lock rules out.
    pub fn commit(self, catalog: &mut Catalog) -> Result<(), ReservationError> {
        for (product, quantity) in &self.decrements {
            catalog.try_reserve(product, *quantity)?;
        }

        Ok(())
    }
}

/// Dry-run a bundle reservation against a snapshot of current stock.
///
/// The snapshot is decremented item by item, so a product listed twice must
/// have stock for both entries. The catalog is never modified.
///
/// # Errors
///
/// - [`ReservationError::ProductNotFound`]: a bundle item's product is gone.
/// - [`ReservationError::InvalidQuantity`]: a bundle item has quantity zero.
/// - [`ReservationError::InsufficientInventory`]: the first item whose
///   required quantity exceeds its snapshot stock.
pub fn plan_bundle(catalog: &Catalog, bundle: &Bundle) -> Result<ReservationPlan, ReservationError> {
    let mut snapshot: FxHashMap<&ProductId, u32> = FxHashMap::default();
    let mut decrements = SmallVec::new();

    for item in &bundle.items {
        if item.quantity == 0 {
            return Err(ReservationError::InvalidQuantity(item.quantity));
        }

        let available = match snapshot.get(&item.product_id) {
            Some(stock) => *stock,
            None => catalog.stock(&item.product_id)?,
        };

        let Some(remaining) = available.checked_sub(item.quantity) else {
            warn!(
                bundle = %bundle.id,
                product = %item.product_id,
                requested = item.quantity,
                available,
                "bundle reservation rejected"
            );

            return Err(ReservationError::InsufficientInventory {
                product: item.product_id.clone(),
                requested: item.quantity,
                available,
            });
        };

        snapshot.insert(&item.product_id, remaining);
        decrements.push((item.product_id.clone(), item.quantity));
    }

    debug!(bundle = %bundle.id, items = decrements.len(), "bundle reservation planned");

    Ok(ReservationPlan { decrements })
}

/// Reserve every item of a bundle, or nothing.
///
/// # Errors
///
/// See [`plan_bundle`]. On error no product's stock has changed.
pub fn reserve_bundle(catalog: &mut Catalog, bundle: &Bundle) -> Result<(), ReservationError> {
    plan_bundle(catalog, bundle)?.commit(catalog)
}
