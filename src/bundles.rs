//! Bundles
//!
//! Seller-scoped groups of products sold as a single cart line under one
//! discount rule. The same-seller constraint is checked once, at creation.

use decimal_percentage::Percentage;
use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use slotmap::{SlotMap, new_key_type};
use smallvec::SmallVec;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::{
    catalog::Catalog,
    products::{ProductId, SellerId},
};

new_key_type! {
    /// Bundle Key
    pub struct BundleKey;
}

/// Bundle identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BundleId(String);

impl BundleId {
    /// Generate a fresh, random bundle identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BundleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BundleId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Errors raised while creating or resolving bundles.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BundleError {
    /// No bundle with this identifier exists.
    #[error("bundle not found: {0}")]
    NotFound(BundleId),

    /// A bundle needs at least one item.
    #[error("a bundle must contain at least one item")]
    EmptyBundle,

    /// Bundle item quantities must be positive.
    #[error("bundle item {0} has a zero quantity")]
    InvalidQuantity(ProductId),

    /// The declared seller does not exist.
    #[error("unknown seller: {0}")]
    UnknownSeller(SellerId),

    /// A bundle item references an unknown product.
    #[error("product not found: {0}")]
    ProductNotFound(ProductId),

    /// A bundle item belongs to a different seller than the bundle.
    #[error("all products in a bundle must belong to the same seller: {product} belongs to {actual}, not {expected}")]
    SellerMismatch {
        /// Offending product
        product: ProductId,
        /// Seller declared on the bundle
        expected: SellerId,
        /// Seller that actually owns the product
        actual: SellerId,
    },

    /// Discount value out of range for its policy.
    #[error("invalid {kind:?} discount value {value}")]
    InvalidDiscount {
        /// Requested discount type
        kind: DiscountType,
        /// Rejected value
        value: Decimal,
    },
}

/// Discount kind, as named on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountType {
    /// Proportional reduction, value in `[0, 100]`
    Percentage,

    /// Flat amount subtracted from the bundle's original price
    #[default]
    Fixed,
}

impl std::str::FromStr for DiscountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PERCENTAGE" => Ok(Self::Percentage),
            "FIXED" => Ok(Self::Fixed),
            other => Err(format!("unknown discount type: {other}")),
        }
    }
}

/// A validated bundle discount.
///
/// Percentages are held as fractions (`0.1` for 10%) and serialized back as
/// percentage points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "DiscountWire")]
pub enum DiscountPolicy {
    /// Fraction of the original price taken off
    Percentage(Percentage),

    /// Fixed amount off the original price
    Fixed(Decimal),
}

impl DiscountPolicy {
    /// Build a policy, checking the value is in range for its kind.
    /// Percentage values are given in points (`10` for 10%).
    ///
    /// # Errors
    ///
    /// Returns [`BundleError::InvalidDiscount`] for a percentage outside
    /// `[0, 100]` or a negative fixed amount.
    pub fn new(kind: DiscountType, value: Decimal) -> Result<Self, BundleError> {
        let invalid = || BundleError::InvalidDiscount { kind, value };

        match kind {
            DiscountType::Percentage => {
                if !(Decimal::ZERO..=Decimal::ONE_HUNDRED).contains(&value) {
                    return Err(invalid());
                }

                let fraction = value.checked_div(Decimal::ONE_HUNDRED).ok_or_else(invalid)?;

                Ok(Self::Percentage(Percentage::from(fraction)))
            }
            DiscountType::Fixed if value < Decimal::ZERO => Err(invalid()),
            DiscountType::Fixed => Ok(Self::Fixed(value)),
        }
    }

    /// The policy's kind.
    pub fn kind(&self) -> DiscountType {
        match self {
            Self::Percentage(_) => DiscountType::Percentage,
            Self::Fixed(_) => DiscountType::Fixed,
        }
    }

    /// The discount value as given at creation: percentage points or a flat amount.
    pub fn value(&self) -> Decimal {
        match *self {
            Self::Percentage(fraction) => (fraction * Decimal::ONE_HUNDRED).normalize(),
            Self::Fixed(amount) => amount,
        }
    }
}

#[derive(Serialize)]
struct DiscountWire {
    discount_type: DiscountType,
    discount_value: Decimal,
}

impl From<DiscountPolicy> for DiscountWire {
    fn from(policy: DiscountPolicy) -> Self {
        Self {
            discount_type: policy.kind(),
            discount_value: policy.value(),
        }
    }
}

/// One product and quantity inside a bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleItem {
    /// Referenced product
    pub product_id: ProductId,

    /// Units of the product in one bundle
    pub quantity: u32,
}

impl BundleItem {
    /// Creates a new bundle item.
    pub fn new(product_id: impl Into<ProductId>, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// Bundle items; most bundles are small.
pub type BundleItems = SmallVec<[BundleItem; 4]>;

/// A seller-scoped, discounted group of products.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bundle {
    /// Bundle identifier
    pub id: BundleId,

    /// Display name
    pub name: String,

    /// Seller owning every product in the bundle
    pub seller_id: SellerId,

    /// Discount applied to the bundle's original price
    #[serde(flatten)]
    pub discount: DiscountPolicy,

    /// Items, in the order they were declared
    pub items: BundleItems,
}

/// Request to create a bundle.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewBundle {
    /// Display name
    #[serde(rename = "bundle_name")]
    pub name: String,

    /// Declared owning seller
    pub seller_id: SellerId,

    /// Requested items
    pub items: Vec<BundleItem>,

    /// Discount kind, `FIXED` when omitted
    #[serde(default)]
    pub discount_type: DiscountType,

    /// Discount value, zero when omitted
    #[serde(default)]
    pub discount_value: Decimal,
}

/// Owns bundle definitions.
#[derive(Debug, Default)]
pub struct BundleRegistry {
    bundles: SlotMap<BundleKey, Bundle>,
    bundle_keys: FxHashMap<BundleId, BundleKey>,
}

impl BundleRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and store a new bundle. Nothing is stored on failure.
    ///
    /// # Errors
    ///
    /// - [`BundleError::EmptyBundle`]: no items were given.
    /// - [`BundleError::InvalidQuantity`]: an item has quantity zero.
    /// - [`BundleError::UnknownSeller`]: the declared seller does not exist.
    /// - [`BundleError::ProductNotFound`]: an item references an unknown product.
    /// - [`BundleError::SellerMismatch`]: an item belongs to another seller.
    /// - [`BundleError::InvalidDiscount`]: the discount value is out of range.
    pub fn create(&mut self, catalog: &Catalog, new: NewBundle) -> Result<Bundle, BundleError> {
        let NewBundle {
            name,
            seller_id,
            items,
            discount_type,
            discount_value,
        } = new;

        if items.is_empty() {
            return Err(BundleError::EmptyBundle);
        }

        if let Some(item) = items.iter().find(|item| item.quantity == 0) {
            return Err(BundleError::InvalidQuantity(item.product_id.clone()));
        }

        if catalog.seller(&seller_id).is_none() {
            return Err(BundleError::UnknownSeller(seller_id));
        }

        for item in &items {
            let Ok(product) = catalog.get(&item.product_id) else {
                return Err(BundleError::ProductNotFound(item.product_id.clone()));
            };

            if product.seller_id != seller_id {
                return Err(BundleError::SellerMismatch {
                    product: product.id.clone(),
                    expected: seller_id,
                    actual: product.seller_id.clone(),
                });
            }
        }

        let discount = DiscountPolicy::new(discount_type, discount_value)?;

        let bundle = Bundle {
            id: BundleId::generate(),
            name,
            seller_id,
            discount,
            items: items.into_iter().collect(),
        };

        info!(
            bundle = %bundle.id,
            seller = %bundle.seller_id,
            items = bundle.items.len(),
            "created bundle"
        );

        let key = self.bundles.insert(bundle.clone());

        self.bundle_keys.insert(bundle.id.clone(), key);

        Ok(bundle)
    }

    /// Look up a bundle.
    ///
    /// # Errors
    ///
    /// Returns [`BundleError::NotFound`] for unknown identifiers.
    pub fn get(&self, id: &BundleId) -> Result<&Bundle, BundleError> {
        self.bundle_keys
            .get(id)
            .and_then(|key| self.bundles.get(*key))
            .ok_or_else(|| BundleError::NotFound(id.clone()))
    }

    /// All bundles in creation order.
    pub fn list(&self) -> impl Iterator<Item = &Bundle> {
        self.bundles.values()
    }

    /// Bundles owned by `seller`, in creation order.
    pub fn list_by_seller<'a>(&'a self, seller: &'a SellerId) -> impl Iterator<Item = &'a Bundle> {
        self.list().filter(move |bundle| &bundle.seller_id == seller)
    }

    /// Number of bundles defined.
    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    /// Whether no bundles are defined.
    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use testresult::TestResult;

    use crate::products::{Product, Seller};

    use super::*;

    fn test_catalog() -> TestResult<Catalog> {
        let mut catalog = Catalog::new();

        catalog.insert_seller(Seller::new("s1", "Luxury Goods Inc."))?;
        catalog.insert_seller(Seller::new("s2", "Gourmet Delights"))?;
        catalog.insert_product(Product::new("p1", "Luxury Watch", Decimal::from(200), "s1", 5))?;
        catalog.insert_product(Product::new("p2", "Designer Handbag", Decimal::from(150), "s1", 3))?;
        catalog.insert_product(Product::new("p3", "Gourmet Coffee Set", Decimal::from(50), "s2", 10))?;

        Ok(catalog)
    }

    fn new_bundle(seller: &str, items: &[(&str, u32)]) -> NewBundle {
        NewBundle {
            name: "Gift Set".to_string(),
            seller_id: SellerId::from(seller),
            items: items
                .iter()
                .map(|(product, quantity)| BundleItem::new(*product, *quantity))
                .collect(),
            discount_type: DiscountType::Fixed,
            discount_value: Decimal::from(50),
        }
    }

    #[test]
    fn create_stores_bundle_with_items_in_order() -> TestResult {
        let catalog = test_catalog()?;
        let mut registry = BundleRegistry::new();

        let bundle = registry.create(&catalog, new_bundle("s1", &[("p2", 1), ("p1", 2)]))?;

        assert_eq!(bundle.discount, DiscountPolicy::Fixed(Decimal::from(50)));
        assert_eq!(
            bundle.items.as_slice(),
            [BundleItem::new("p2", 1), BundleItem::new("p1", 2)]
        );
        assert_eq!(registry.get(&bundle.id)?, &bundle);

        Ok(())
    }

    #[test]
    fn create_rejects_products_from_another_seller() -> TestResult {
        let catalog = test_catalog()?;
        let mut registry = BundleRegistry::new();

        let result = registry.create(&catalog, new_bundle("s1", &[("p1", 1), ("p3", 1)]));

        assert_eq!(
            result,
            Err(BundleError::SellerMismatch {
                product: ProductId::from("p3"),
                expected: SellerId::from("s1"),
                actual: SellerId::from("s2"),
            })
        );
        assert!(registry.is_empty());

        Ok(())
    }

    #[test]
    fn create_validates_input() -> TestResult {
        let catalog = test_catalog()?;
        let mut registry = BundleRegistry::new();

        assert_eq!(
            registry.create(&catalog, new_bundle("s1", &[])),
            Err(BundleError::EmptyBundle)
        );
        assert_eq!(
            registry.create(&catalog, new_bundle("s1", &[("p1", 0)])),
            Err(BundleError::InvalidQuantity(ProductId::from("p1")))
        );
        assert_eq!(
            registry.create(&catalog, new_bundle("s7", &[("p1", 1)])),
            Err(BundleError::UnknownSeller(SellerId::from("s7")))
        );
        assert_eq!(
            registry.create(&catalog, new_bundle("s1", &[("p404", 1)])),
            Err(BundleError::ProductNotFound(ProductId::from("p404")))
        );
        assert_eq!(registry.len(), 0);

        Ok(())
    }

    #[test]
    fn discount_policy_checks_ranges() {
        assert!(DiscountPolicy::new(DiscountType::Percentage, Decimal::from(100)).is_ok());
        assert!(DiscountPolicy::new(DiscountType::Percentage, Decimal::from(101)).is_err());
        assert!(DiscountPolicy::new(DiscountType::Percentage, Decimal::NEGATIVE_ONE).is_err());
        assert!(DiscountPolicy::new(DiscountType::Fixed, Decimal::from(10_000)).is_ok());
        assert!(DiscountPolicy::new(DiscountType::Fixed, Decimal::NEGATIVE_ONE).is_err());
    }

    #[test]
    fn percentage_is_stored_as_a_fraction_and_reported_in_points() -> TestResult {
        let policy = DiscountPolicy::new(DiscountType::Percentage, Decimal::from(10))?;

        assert_eq!(policy, DiscountPolicy::Percentage(Percentage::from(Decimal::new(1, 1))));
        assert_eq!(policy.value(), Decimal::from(10));
        assert_eq!(policy.value().to_string(), "10");

        let json = serde_json::to_value(policy)?;

        assert_eq!(json["discount_type"], "PERCENTAGE");
        assert_eq!(json["discount_value"], "10");

        Ok(())
    }

    #[test]
    fn new_bundle_defaults_to_zero_fixed_discount() -> TestResult {
        let new: NewBundle = serde_json::from_str(
            r#"{"bundle_name": "Pair", "seller_id": "s1", "items": [{"product_id": "p1", "quantity": 1}]}"#,
        )?;

        assert_eq!(new.discount_type, DiscountType::Fixed);
        assert_eq!(new.discount_value, Decimal::ZERO);

        Ok(())
    }

    #[test]
    fn bundle_serializes_discount_inline() -> TestResult {
        let catalog = test_catalog()?;
        let mut registry = BundleRegistry::new();
        let bundle = registry.create(&catalog, new_bundle("s1", &[("p1", 1)]))?;

        let json = serde_json::to_value(&bundle)?;

        assert_eq!(json["discount_type"], "FIXED");
        assert_eq!(json["discount_value"], "50");
        assert_eq!(json["items"][0]["product_id"], "p1");

        Ok(())
    }

    #[test]
    fn discount_type_parses_case_insensitively() {
        assert_eq!("percentage".parse::<DiscountType>(), Ok(DiscountType::Percentage));
        assert_eq!("FIXED".parse::<DiscountType>(), Ok(DiscountType::Fixed));
        assert!("bogo".parse::<DiscountType>().is_err());
    }
}
