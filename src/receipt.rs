//! Receipt
//!
//! Renders cart projections, listings and order confirmations either as
//! box-drawn tables or as JSON documents.

use std::io;

use rust_decimal::Decimal;
use rusty_money::{Money, iso::Currency};
use serde::Serialize;
use tabled::{
    builder::Builder,
    settings::{
        Alignment, Color, Style,
        object::{Columns, Rows},
    },
};
use thiserror::Error;

use crate::{
    bundles::Bundle,
    cart::{CartItemView, CartView},
    checkout::OrderConfirmation,
    config::OutputFormat,
    pricing::round_total,
    products::Product,
};

/// Errors that can occur while rendering output.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Writing to the output failed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Writes responses in the configured format. Tables show amounts in
/// `currency`; JSON keeps them as plain decimal strings.
#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    format: OutputFormat,
    currency: &'static Currency,
}

impl Renderer {
    /// Create a renderer for the given format and display currency.
    pub fn new(format: OutputFormat, currency: &'static Currency) -> Self {
        Self { format, currency }
    }

    /// Render the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if writing or serialization fails.
    pub fn cart(&self, out: &mut impl io::Write, cart: &CartView) -> Result<(), RenderError> {
        match self.format {
            OutputFormat::Json => write_json(out, cart),
            OutputFormat::Table => self.write_cart(out, cart),
        }
    }

    /// Render a product listing.
    ///
    /// # Errors
    ///
    /// Returns an error if writing or serialization fails.
    pub fn products(&self, out: &mut impl io::Write, products: &[Product]) -> Result<(), RenderError> {
        match self.format {
            OutputFormat::Json => write_json(out, &products),
            OutputFormat::Table => self.write_products(out, products),
        }
    }

    /// Render a bundle listing.
    ///
    /// # Errors
    ///
    /// Returns an error if writing or serialization fails.
    pub fn bundles(&self, out: &mut impl io::Write, bundles: &[Bundle]) -> Result<(), RenderError> {
        match self.format {
            OutputFormat::Json => write_json(out, &bundles),
            OutputFormat::Table => write_bundles(out, bundles),
        }
    }

    /// Render an order confirmation.
    ///
    /// # Errors
    ///
    /// Returns an error if writing or serialization fails.
    pub fn confirmation(
        &self,
        out: &mut impl io::Write,
        confirmation: &OrderConfirmation,
    ) -> Result<(), RenderError> {
        match self.format {
            OutputFormat::Json => write_json(out, confirmation),
            OutputFormat::Table => {
                writeln!(out, "Checkout successful")?;
                writeln!(out, " Order: {}", confirmation.order_id)?;
                writeln!(out, " Lines: {}", confirmation.line_count)?;
                writeln!(out, " Total: {}", money(confirmation.total, self.currency))?;

                if confirmation.gift.is_gift {
                    writeln!(
                        out,
                        " Gift:  yes{}",
                        if confirmation.gift.wrapping { ", wrapped" } else { "" }
                    )?;

                    if !confirmation.gift.message.is_empty() {
                        writeln!(out, " Note:  {}", confirmation.gift.message)?;
                    }
                }

                Ok(())
            }
        }
    }
}

/// Format an amount in `currency`, rounded half away from zero to two
/// decimal places first.
pub fn money(amount: Decimal, currency: &Currency) -> String {
    Money::from_decimal(round_total(amount), currency).to_string()
}

fn write_json<T: Serialize + ?Sized>(out: &mut impl io::Write, value: &T) -> Result<(), RenderError> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;

    Ok(())
}

impl Renderer {
    fn write_cart(&self, out: &mut impl io::Write, cart: &CartView) -> Result<(), RenderError> {
        if cart.is_empty() {
            writeln!(out, "Cart is empty")?;
            return self.write_cart_summary(out, cart);
        }

        let mut builder = Builder::default();

        builder.push_record(["", "Item", "Qty", "Price", "Discounted Price", "Savings"]);

        for (idx, item) in cart.items.iter().enumerate() {
            match item {
                CartItemView::Product(product) => {
                    builder.push_record([
                        format!("#{:<3}", idx + 1),
                        product.name.clone(),
                        product.quantity.to_string(),
                        money(product.price, self.currency),
                        String::new(),
                        String::new(),
                    ]);
                }
                CartItemView::Bundle(bundle) => {
                    builder.push_record([
                        format!("#{:<3}", idx + 1),
                        format!("{} ({:?} {})", bundle.name, bundle.discount_type, bundle.discount_value),
                        bundle.quantity.to_string(),
                        money(bundle.original_price, self.currency),
                        money(bundle.price_after_discount, self.currency),
                        money(bundle.savings, self.currency),
                    ]);

                    for product in &bundle.products {
                        builder.push_record([
                            String::new(),
                            format!("  {}", product.name),
                            product.quantity.to_string(),
                            money(product.price, self.currency),
                            String::new(),
                            String::new(),
                        ]);
                    }
                }
            }
        }

        let mut table = builder.build();

        table.with(Style::modern_rounded());
        table.modify(Rows::first(), Color::BOLD);
        table.modify(Columns::new(2..6), Alignment::right());

        writeln!(out, "{table}")?;

        self.write_cart_summary(out, cart)
    }

    fn write_cart_summary(&self, out: &mut impl io::Write, cart: &CartView) -> Result<(), RenderError> {
        writeln!(out, " Total: {}", money(cart.total, self.currency))?;

        if cart.is_gift {
            writeln!(out, " Gift:  yes (wrapping: {})", cart.gift_wrapping)?;
        }

        Ok(())
    }

    fn write_products(&self, out: &mut impl io::Write, products: &[Product]) -> Result<(), RenderError> {
        let mut builder = Builder::default();

        builder.push_record(["Id", "Name", "Seller", "Price", "Stock"]);

        for product in products {
            builder.push_record([
                product.id.to_string(),
                product.name.clone(),
                product.seller_id.to_string(),
                money(product.price, self.currency),
                product.inventory.to_string(),
            ]);
        }

        let mut table = builder.build();

        table.with(Style::modern_rounded());
        table.modify(Rows::first(), Color::BOLD);
        table.modify(Columns::new(3..5), Alignment::right());

        writeln!(out, "{table}")?;

        Ok(())
    }
}

fn write_bundles(out: &mut impl io::Write, bundles: &[Bundle]) -> Result<(), RenderError> {
    let mut builder = Builder::default();

    builder.push_record(["Id", "Name", "Seller", "Discount", "Items"]);

    for bundle in bundles {
        let items = bundle
            .items
            .iter()
            .map(|item| format!("{} x{}", item.product_id, item.quantity))
            .collect::<Vec<_>>()
            .join("\n");

        builder.push_record([
            bundle.id.to_string(),
            bundle.name.clone(),
            bundle.seller_id.to_string(),
            format!("{:?} {}", bundle.discount.kind(), bundle.discount.value()),
            items,
        ]);
    }

    let mut table = builder.build();

    table.with(Style::modern_rounded());
    table.modify(Rows::first(), Color::BOLD);

    writeln!(out, "{table}")?;

    Ok(())
}
