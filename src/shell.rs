//! Shell
//!
//! A line-oriented command interpreter over one [`Store`]. Each line is
//! tokenized and parsed as a `clap` subcommand, so every command gets the
//! usual `help` output for free.

use std::{io, str::FromStr};

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::{
    bundles::{BundleId, BundleItem, DiscountType, NewBundle},
    cart::GiftOptions,
    products::{ProductId, SellerId},
    receipt::{RenderError, Renderer},
    store::{Store, StoreError},
};

/// Errors raised while executing a shell line.
#[derive(Debug, Error)]
pub enum ShellError {
    /// The line is not a valid command (this includes `help` output).
    #[error("{0}")]
    Parse(#[from] clap::Error),

    /// A double quote was opened and never closed.
    #[error("unterminated quote in: {0}")]
    UnterminatedQuote(String),

    /// The store rejected the operation.
    #[error("{0}")]
    Store(#[from] StoreError),

    /// Output could not be written.
    #[error(transparent)]
    Render(#[from] RenderError),
}

impl ShellError {
    /// Whether the shell can carry on after this error.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Render(_))
    }
}

/// Whether the shell should keep reading lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Read the next line
    Continue,

    /// Stop reading
    Quit,
}

/// `product:quantity`, as used when creating bundles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemArg(BundleItem);

impl FromStr for ItemArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (product, quantity) = match s.split_once(':') {
            Some((product, quantity)) => (
                product,
                quantity
                    .parse::<u32>()
                    .map_err(|error| format!("invalid quantity in {s}: {error}"))?,
            ),
            None => (s, 1),
        };

        if product.is_empty() {
            return Err(format!("missing product in {s}"));
        }

        Ok(Self(BundleItem::new(product, quantity)))
    }
}

#[derive(Debug, Parser)]
#[command(multicall = true)]
struct ShellLine {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List every product
    Products,

    /// List the products of one seller
    Seller {
        /// Seller identifier
        seller: String,
    },

    /// Create a bundle from products of a single seller
    Bundle {
        /// Bundle name
        name: String,

        /// Owning seller
        seller: String,

        /// Discount type (percentage, fixed)
        #[arg(short = 't', long = "type", default_value = "fixed")]
        discount_type: DiscountType,

        /// Discount value (percentage points or flat amount)
        #[arg(short, long, default_value = "0")]
        value: Decimal,

        /// Items as product:quantity
        #[arg(required = true)]
        items: Vec<ItemArg>,
    },

    /// List every bundle
    Bundles,

    /// Add a product to the cart
    Add {
        /// Product identifier
        product: String,

        /// Units to add
        #[arg(default_value_t = 1)]
        quantity: u32,
    },

    /// Add one bundle to the cart
    AddBundle {
        /// Bundle identifier
        bundle: String,
    },

    /// Show the cart
    Cart,

    /// Return units of a product to stock
    Restock {
        /// Product identifier
        product: String,

        /// Units to add back
        quantity: u32,
    },

    /// Check out and empty the cart
    Checkout {
        /// Mark the order as a gift
        #[arg(long)]
        gift: bool,

        /// Gift-wrap the order
        #[arg(long)]
        wrap: bool,

        /// Gift message
        #[arg(trailing_var_arg = true)]
        message: Vec<String>,
    },

    /// Leave the shell
    #[command(alias = "exit")]
    Quit,
}

/// Executes shell lines against a store.
#[derive(Debug)]
pub struct Shell<'a> {
    store: &'a Store,
    renderer: Renderer,
}

impl<'a> Shell<'a> {
    /// Create a shell over `store`.
    pub fn new(store: &'a Store, renderer: Renderer) -> Self {
        Self { store, renderer }
    }

    /// Parse and run one line, writing any output to `out`.
    ///
    /// Blank lines and `#` comments are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the line cannot be parsed, the store rejects the
    /// operation or output cannot be written.
    pub fn execute(&self, line: &str, out: &mut impl io::Write) -> Result<Flow, ShellError> {
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            return Ok(Flow::Continue);
        }

        let ShellLine { command } = ShellLine::try_parse_from(tokenize(line)?)?;

        match command {
            Command::Products => {
                self.renderer.products(out, &self.store.list_products())?;
            }
            Command::Seller { seller } => {
                let products = self.store.list_seller_products(&SellerId::from(seller));
                self.renderer.products(out, &products)?;
            }
            Command::Bundle {
                name,
                seller,
                discount_type,
                value,
                items,
            } => {
                let bundle = self.store.create_bundle(NewBundle {
                    name,
                    seller_id: SellerId::from(seller),
                    items: items.into_iter().map(|ItemArg(item)| item).collect(),
                    discount_type,
                    discount_value: value,
                })?;

                self.renderer.bundles(out, &[bundle])?;
            }
            Command::Bundles => {
                self.renderer.bundles(out, &self.store.list_bundles())?;
            }
            Command::Add { product, quantity } => {
                let cart = self
                    .store
                    .add_item_to_cart(&ProductId::from(product), quantity)?;
                self.renderer.cart(out, &cart)?;
            }
            Command::AddBundle { bundle } => {
                let cart = self.store.add_bundle_to_cart(&BundleId::from(bundle.as_str()))?;
                self.renderer.cart(out, &cart)?;
            }
            Command::Cart => {
                self.renderer.cart(out, &self.store.get_cart()?)?;
            }
            Command::Restock { product, quantity } => {
                let product = ProductId::from(product);
                let stock = self.store.restock(&product, quantity)?;
                writeln!(out, "{product}: {stock} in stock").map_err(RenderError::from)?;
            }
            Command::Checkout {
                gift,
                wrap,
                message,
            } => {
                let confirmation = self.store.checkout(GiftOptions {
                    is_gift: gift,
                    message: message.join(" "),
                    wrapping: wrap,
                });
                self.renderer.confirmation(out, &confirmation)?;
            }
            Command::Quit => return Ok(Flow::Quit),
        }

        Ok(Flow::Continue)
    }
}

/// Split a line on whitespace, keeping double-quoted runs together.
fn tokenize(line: &str) -> Result<Vec<String>, ShellError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quoted = false;

    for ch in line.chars() {
        match ch {
            '"' => {
                quoted = !quoted;
                in_token = true;
            }
            c if c.is_whitespace() && !quoted => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            c => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if quoted {
        return Err(ShellError::UnterminatedQuote(line.to_string()));
    }

    if in_token {
        tokens.push(current);
    }

    Ok(tokens)
}
