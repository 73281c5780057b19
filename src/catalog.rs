//! Catalog Store
//!
//! Owns product and seller records. Inventory is only ever changed through
//! [`Catalog::try_reserve`] and [`Catalog::restock`].

use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use slotmap::SlotMap;
use thiserror::Error;
use tracing::debug;

use crate::products::{Product, ProductId, ProductKey, Seller, SellerId};

/// Errors raised by the catalog.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    /// No product with this identifier exists.
    #[error("product not found: {0}")]
    ProductNotFound(ProductId),

    /// A product or query referenced a seller that does not exist.
    #[error("unknown seller: {0}")]
    UnknownSeller(SellerId),

    /// A product with this identifier was already inserted.
    #[error("duplicate product: {0}")]
    DuplicateProduct(ProductId),

    /// A seller with this identifier was already inserted.
    #[error("duplicate seller: {0}")]
    DuplicateSeller(SellerId),

    /// Product prices must not be negative.
    #[error("product {0} has a negative price")]
    NegativePrice(ProductId),

    /// Reservation and restock quantities must be positive.
    #[error("quantity must be positive, got {0}")]
    InvalidQuantity(u32),

    /// Not enough stock to satisfy the reservation.
    #[error("insufficient inventory for product {product}: requested {requested}, available {available}")]
    InsufficientInventory {
        /// Product whose stock fell short
        product: ProductId,
        /// Quantity asked for
        requested: u32,
        /// Stock at the time of the request
        available: u32,
    },

    /// Restocking would overflow the inventory counter.
    #[error("inventory overflow for product {0}")]
    InventoryOverflow(ProductId),
}

/// In-memory product and seller store.
#[derive(Debug, Default)]
pub struct Catalog {
    products: SlotMap<ProductKey, Product>,
    product_keys: FxHashMap<ProductId, ProductKey>,
    sellers: Vec<Seller>,
}

impl Catalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a seller.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::DuplicateSeller`] if the identifier is taken.
    pub fn insert_seller(&mut self, seller: Seller) -> Result<(), CatalogError> {
        if self.seller(&seller.id).is_some() {
            return Err(CatalogError::DuplicateSeller(seller.id));
        }

        self.sellers.push(seller);

        Ok(())
    }

    /// Register a product owned by an existing seller.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::UnknownSeller`]: the owning seller was never inserted.
    /// - [`CatalogError::DuplicateProduct`]: the identifier is taken.
    /// - [`CatalogError::NegativePrice`]: the price is below zero.
    pub fn insert_product(&mut self, product: Product) -> Result<ProductKey, CatalogError> {
        if self.seller(&product.seller_id).is_none() {
            return Err(CatalogError::UnknownSeller(product.seller_id));
        }

        if self.product_keys.contains_key(&product.id) {
            return Err(CatalogError::DuplicateProduct(product.id));
        }

        if product.price < Decimal::ZERO {
            return Err(CatalogError::NegativePrice(product.id));
        }

        let id = product.id.clone();
        let key = self.products.insert(product);

        self.product_keys.insert(id, key);

        Ok(key)
    }

    /// Look up a product by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::ProductNotFound`] for unknown identifiers.
    pub fn get(&self, id: &ProductId) -> Result<&Product, CatalogError> {
        self.product_keys
            .get(id)
            .and_then(|key| self.products.get(*key))
            .ok_or_else(|| CatalogError::ProductNotFound(id.clone()))
    }

    /// All products in insertion order.
    pub fn list_all(&self) -> impl Iterator<Item = &Product> {
        self.products.values()
    }

    /// Products owned by `seller`, in insertion order. Unknown sellers yield nothing.
    pub fn list_by_seller<'a>(&'a self, seller: &'a SellerId) -> impl Iterator<Item = &'a Product> {
        self.list_all()
            .filter(move |product| &product.seller_id == seller)
    }

    /// Look up a seller.
    pub fn seller(&self, id: &SellerId) -> Option<&Seller> {
        self.sellers.iter().find(|seller| &seller.id == id)
    }

    /// All sellers in insertion order.
    pub fn sellers(&self) -> &[Seller] {
        &self.sellers
    }

    /// Current stock of a product.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::ProductNotFound`] for unknown identifiers.
    pub fn stock(&self, id: &ProductId) -> Result<u32, CatalogError> {
        self.get(id).map(|product| product.inventory)
    }

    /// Check `inventory >= quantity` and decrement if so.
    ///
    /// On failure the inventory is left untouched.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::InvalidQuantity`]: `quantity` is zero.
    /// - [`CatalogError::ProductNotFound`]: unknown identifier.
    /// - [`CatalogError::InsufficientInventory`]: not enough stock.
    pub fn try_reserve(&mut self, id: &ProductId, quantity: u32) -> Result<(), CatalogError> {
        if quantity == 0 {
            return Err(CatalogError::InvalidQuantity(quantity));
        }

        let product = self.get_mut(id)?;

        let Some(remaining) = product.inventory.checked_sub(quantity) else {
            return Err(CatalogError::InsufficientInventory {
                product: id.clone(),
                requested: quantity,
                available: product.inventory,
            });
        };

        product.inventory = remaining;

        debug!(product = %id, quantity, remaining, "reserved stock");

        Ok(())
    }

    /// Return units to stock.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::InvalidQuantity`]: `quantity` is zero.
    /// - [`CatalogError::ProductNotFound`]: unknown identifier.
    /// - [`CatalogError::InventoryOverflow`]: the counter would overflow.
    pub fn restock(&mut self, id: &ProductId, quantity: u32) -> Result<u32, CatalogError> {
        if quantity == 0 {
            return Err(CatalogError::InvalidQuantity(quantity));
        }

        let product = self.get_mut(id)?;

        product.inventory = product
            .inventory
            .checked_add(quantity)
            .ok_or_else(|| CatalogError::InventoryOverflow(id.clone()))?;

        debug!(product = %id, quantity, stock = product.inventory, "restocked");

        Ok(product.inventory)
    }

    fn get_mut(&mut self, id: &ProductId) -> Result<&mut Product, CatalogError> {
        self.product_keys
            .get(id)
            .and_then(|key| self.products.get_mut(*key))
            .ok_or_else(|| CatalogError::ProductNotFound(id.clone()))
    }
}
