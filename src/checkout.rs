//! Checkout
//!
//! Finalizes the cart into an order identifier and resets it. Stock was
//! already committed when lines were added, so checkout never touches the
//! catalog.

use std::fmt;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::cart::{CartSession, GiftOptions};

/// Logical cart states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutState {
    /// No lines
    Empty,

    /// At least one line
    Active,

    /// Checkout in progress, until the cart is reset
    Finalizing,
}

/// Opaque, globally unique order identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct OrderId(Uuid);

impl OrderId {
    /// Generate a fresh order identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// The underlying UUID.
    pub fn into_uuid(self) -> Uuid {
        self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// What a checkout finalized. Nothing of it is retained by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderConfirmation {
    /// Receipt token for the order
    pub order_id: OrderId,

    /// Number of cart lines finalized
    pub line_count: usize,

    /// Cart total at checkout
    pub total: Decimal,

    /// Gift options the order was placed with
    pub gift: GiftOptions,
}

/// Apply gift options, issue an order identifier and reset the cart.
///
/// Succeeds on an empty cart too, returning an identifier for zero items.
pub fn checkout(cart: &mut CartSession, gift: GiftOptions) -> OrderConfirmation {
    let from = cart.state();

    cart.set_gift_options(gift);
    cart.begin_finalizing();

    let order_id = OrderId::generate();

    info!(
        %order_id,
        ?from,
        to = ?cart.state(),
        lines = cart.lines().len(),
        total = %cart.total(),
        is_gift = cart.gift().is_gift,
        "finalizing order"
    );

    let confirmation = OrderConfirmation {
        order_id,
        line_count: cart.lines().len(),
        total: cart.total(),
        gift: cart.gift().clone(),
    };

    cart.reset();

    confirmation
}
