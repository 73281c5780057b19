//! Fixtures
//!
//! Seed catalogs described in YAML.

use std::{fs, path::Path, str::FromStr};

use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use crate::{
    catalog::{Catalog, CatalogError},
    products::{Product, Seller},
};

/// The built-in seed catalog: five products across three sellers.
pub const DEFAULT_CATALOG: &str = include_str!("../fixtures/catalog/default.yml");

/// Fixture Parsing Errors
#[derive(Debug, Error)]
pub enum FixtureError {
    /// IO error reading fixture files
    #[error("Failed to read fixture file: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// Invalid price format
    #[error("Invalid price for product {product}: {price}")]
    InvalidPrice {
        /// Product the price belongs to
        product: String,
        /// Unparseable price string
        price: String,
    },

    /// The fixture describes an inconsistent catalog
    #[error("Invalid catalog: {0}")]
    Catalog(#[from] CatalogError),
}

/// Catalog fixture
#[derive(Debug, Deserialize)]
pub struct CatalogFixture {
    /// Sellers, in listing order
    pub sellers: Vec<SellerFixture>,

    /// Products, in listing order
    pub products: Vec<ProductFixture>,
}

/// Seller fixture
#[derive(Debug, Deserialize)]
pub struct SellerFixture {
    /// Seller identifier
    pub id: String,

    /// Seller name
    pub name: String,
}

/// Product fixture
#[derive(Debug, Deserialize)]
pub struct ProductFixture {
    /// Product identifier
    pub id: String,

    /// Product name
    pub name: String,

    /// Unit price as a decimal string (e.g. "29.99")
    pub price: String,

    /// Owning seller identifier
    pub seller: String,

    /// Initial stock
    pub inventory: u32,
}

impl CatalogFixture {
    /// Parse a fixture from YAML.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::Yaml`] for malformed documents.
    pub fn from_yaml(contents: &str) -> Result<Self, FixtureError> {
        Ok(serde_norway::from_str(contents)?)
    }

    /// Read and parse a fixture file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, FixtureError> {
        let contents = fs::read_to_string(path)?;

        Self::from_yaml(&contents)
    }
}

impl TryFrom<CatalogFixture> for Catalog {
    type Error = FixtureError;

    fn try_from(fixture: CatalogFixture) -> Result<Self, Self::Error> {
        let mut catalog = Catalog::new();

        for seller in fixture.sellers {
            catalog.insert_seller(Seller::new(seller.id, seller.name))?;
        }

        for product in fixture.products {
            let price = parse_price(&product.id, &product.price)?;

            catalog.insert_product(Product::new(
                product.id,
                product.name,
                price,
                product.seller,
                product.inventory,
            ))?;
        }

        Ok(catalog)
    }
}

/// Build the built-in seed catalog.
///
/// # Errors
///
/// Only fails if the embedded fixture is malformed.
pub fn default_catalog() -> Result<Catalog, FixtureError> {
    CatalogFixture::from_yaml(DEFAULT_CATALOG)?.try_into()
}

/// Load a catalog from a YAML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or describes an invalid catalog.
pub fn load_catalog(path: impl AsRef<Path>) -> Result<Catalog, FixtureError> {
    CatalogFixture::load(path)?.try_into()
}

fn parse_price(product: &str, price: &str) -> Result<Decimal, FixtureError> {
    Decimal::from_str(price.trim()).map_err(|_err| FixtureError::InvalidPrice {
        product: product.to_string(),
        price: price.to_string(),
    })
}
