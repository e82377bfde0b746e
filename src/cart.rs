//! Cart

use std::io;

use decimal_percentage::Percentage;
use rust_decimal::{
    Decimal, RoundingStrategy,
    prelude::{FromPrimitive, ToPrimitive},
};
use rusty_money::{Money, MoneyError, iso::Currency};
use smallvec::SmallVec;
use tabled::{
    builder::Builder,
    settings::{
        Alignment, Color, Style,
        object::{Columns, Rows},
    },
};
use thiserror::Error;

use crate::catalog::{Catalog, Deal, DealKey};

/// Errors related to cart contents or totals.
#[derive(Debug, Error)]
pub enum CartError {
    /// A deal's currency differs from the cart currency (deal currency, cart currency).
    #[error("Deal has currency {0}, but cart has currency {1}")]
    CurrencyMismatch(&'static str, &'static str),

    /// More units were requested than the deal has available.
    #[error("Stocks available: {available}, requested: {requested}")]
    InsufficientStock {
        /// Units the deal has left
        available: u32,

        /// Units the cart line would hold
        requested: u32,
    },

    /// A line cannot be added with zero units.
    #[error("quantity must be at least 1")]
    ZeroQuantity,

    /// A line total or subtotal does not fit in minor units.
    #[error("cart total overflowed")]
    Overflow,

    /// Percentage calculation could not be safely converted.
    #[error("percentage conversion overflowed or was not finite")]
    PercentConversion,

    /// A cart line refers to a deal missing from the catalog.
    #[error("Missing deal")]
    MissingDeal(DealKey),

    /// Wrapped money arithmetic or currency mismatch error.
    #[error(transparent)]
    Money(#[from] MoneyError),

    /// IO error
    #[error("IO error")]
    IO,
}

/// A selected deal and how many units of it the customer wants.
#[derive(Debug, Clone, PartialEq)]
pub struct CartItem {
    deal: DealKey,
    unit_price: Money<'static, Currency>,
    quantity: u32,
    available: u32,
}

impl CartItem {
    /// The deal this line refers to.
    pub fn deal(&self) -> DealKey {
        self.deal
    }

    /// Price of a single unit.
    pub fn unit_price(&self) -> &Money<'static, Currency> {
        &self.unit_price
    }

    /// Units on this line. Never below 1.
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Unit price multiplied by quantity.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Overflow`] if the product does not fit in minor units.
    pub fn line_total(&self) -> Result<Money<'static, Currency>, CartError> {
        let minor = self
            .unit_price
            .to_minor_units()
            .checked_mul(i64::from(self.quantity))
            .ok_or(CartError::Overflow)?;

        Ok(Money::from_minor(minor, self.unit_price.currency()))
    }
}

/// How a cart's discount and delivery are derived from its subtotal.
#[derive(Debug, Clone, PartialEq)]
pub struct CartPricing {
    /// Fraction of the subtotal taken off.
    pub discount: Percentage,

    /// Flat delivery fee added to non-empty carts.
    pub delivery_fee: Option<Money<'static, Currency>>,
}

impl Default for CartPricing {
    fn default() -> Self {
        Self {
            discount: Percentage::from(Decimal::ZERO),
            delivery_fee: None,
        }
    }
}

/// Cart
#[derive(Debug, Clone, PartialEq)]
pub struct Cart {
    items: SmallVec<[CartItem; 8]>,
    currency: &'static Currency,
}

impl Cart {
    /// Create an empty cart priced in `currency`.
    #[must_use]
    pub fn new(currency: &'static Currency) -> Self {
        Cart {
            items: SmallVec::new(),
            currency,
        }
    }

    /// Add units of a deal, merging into an existing line. Returns the line's new quantity.
    ///
    /// # Errors
    ///
    /// - [`CartError::ZeroQuantity`]: `quantity` is zero.
    /// - [`CartError::CurrencyMismatch`]: the deal is priced in another currency.
    /// - [`CartError::InsufficientStock`]: the line would exceed the deal's availability.
    pub fn add(&mut self, key: DealKey, deal: &Deal, quantity: u32) -> Result<u32, CartError> {
        if quantity == 0 {
            return Err(CartError::ZeroQuantity);
        }

        let deal_currency = deal.price.currency();

        if deal_currency != self.currency {
            return Err(CartError::CurrencyMismatch(
                deal_currency.iso_alpha_code,
                self.currency.iso_alpha_code,
            ));
        }

        let existing = self.get(key).map_or(0, CartItem::quantity);
        let requested = existing.saturating_add(quantity);

        if requested > deal.available {
            return Err(CartError::InsufficientStock {
                available: deal.available,
                requested,
            });
        }

        if let Some(item) = self.items.iter_mut().find(|item| item.deal == key) {
            item.quantity = requested;
        } else {
            self.items.push(CartItem {
                deal: key,
                unit_price: deal.price,
                quantity: requested,
                available: deal.available,
            });
        }

        Ok(requested)
    }

    /// Change a line's quantity by `delta`, clamped between 1 and the deal's availability.
    ///
    /// Returns the new quantity, or `None` if the deal is not in the cart.
    pub fn update_quantity(&mut self, key: DealKey, delta: i64) -> Option<u32> {
        let item = self.items.iter_mut().find(|item| item.deal == key)?;
        let ceiling = i64::from(item.available.max(1));

        let clamped = i64::from(item.quantity)
            .saturating_add(delta)
            .clamp(1, ceiling);

        item.quantity = u32::try_from(clamped).unwrap_or(1);

        Some(item.quantity)
    }

    /// Remove a line. Returns whether anything was removed.
    pub fn remove(&mut self, key: DealKey) -> bool {
        let before = self.items.len();

        self.items.retain(|item| item.deal != key);

        self.items.len() != before
    }

    /// Remove every line.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Get the line for a deal.
    pub fn get(&self, key: DealKey) -> Option<&CartItem> {
        self.items.iter().find(|item| item.deal == key)
    }

    /// Iterate over the lines in the order they were added.
    pub fn iter(&self) -> impl Iterator<Item = &CartItem> {
        self.items.iter()
    }

    /// Calculate the subtotal of the cart.
    ///
    /// # Errors
    ///
    /// Returns a `CartError` if a line total overflows or money arithmetic fails.
    pub fn subtotal(&self) -> Result<Money<'static, Currency>, CartError> {
        self.items
            .iter()
            .try_fold(Money::from_minor(0, self.currency), |acc, item| {
                Ok(acc.add(item.line_total()?)?)
            })
    }

    /// Calculate subtotal, discount, delivery and total.
    ///
    /// # Errors
    ///
    /// Returns a `CartError` if any amount cannot be represented or money
    /// arithmetic fails (for example, a delivery fee in another currency).
    pub fn summary(&self, pricing: &CartPricing) -> Result<CartSummary, CartError> {
        let subtotal = self.subtotal()?;

        let discount_minor = percent_of_minor(&pricing.discount, subtotal.to_minor_units())?;
        let discount = Money::from_minor(discount_minor, self.currency);

        let delivery = match pricing.delivery_fee {
            Some(fee) if !self.is_empty() => fee,
            _ => Money::from_minor(0, self.currency),
        };

        let total = subtotal.sub(discount)?.add(delivery)?;

        Ok(CartSummary {
            subtotal,
            discount,
            delivery,
            total,
        })
    }

    /// Total units across all lines.
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    /// Get the number of lines in the cart.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the cart is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Get the currency of the cart.
    pub fn currency(&self) -> &'static Currency {
        self.currency
    }
}

/// Amounts shown beneath the cart lines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CartSummary {
    /// Sum of line totals
    pub subtotal: Money<'static, Currency>,

    /// Amount taken off the subtotal
    pub discount: Money<'static, Currency>,

    /// Delivery fee
    pub delivery: Money<'static, Currency>,

    /// Amount payable
    pub total: Money<'static, Currency>,
}

impl CartSummary {
    /// Render the cart lines and totals as a table.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::MissingDeal`] if a line's deal is not in the
    /// catalog, or [`CartError::IO`] if writing fails.
    pub fn write_to(
        &self,
        mut out: impl io::Write,
        cart: &Cart,
        catalog: &Catalog,
    ) -> Result<(), CartError> {
        let mut builder = Builder::default();

        builder.push_record(["Deal", "Business", "Unit Price", "Qty", "Line Total"]);

        for item in cart.iter() {
            let deal = catalog
                .get(item.deal())
                .ok_or(CartError::MissingDeal(item.deal()))?;

            builder.push_record([
                deal.title.clone(),
                deal.business.clone(),
                item.unit_price().to_string(),
                item.quantity().to_string(),
                item.line_total()?.to_string(),
            ]);
        }

        let mut table = builder.build();

        table.with(Style::modern_rounded());
        table.modify(Rows::first(), Color::BOLD);
        table.modify(Columns::new(2..5), Alignment::right());

        writeln!(out, "\n{table}").map_err(|_err| CartError::IO)?;

        for (label, value) in [
            (" Subtotal:", self.subtotal),
            (" Discount:", self.discount),
            (" Delivery:", self.delivery),
            (" Total:", self.total),
        ] {
            let value = value.to_string();

            writeln!(out, "{label:<12}{value:>12}").map_err(|_err| CartError::IO)?;
        }

        Ok(())
    }
}

/// Calculate the amount in minor units based on a percentage and a minor unit amount.
fn percent_of_minor(percent: &Percentage, minor: i64) -> Result<i64, CartError> {
    let minor = Decimal::from_i64(minor).ok_or(CartError::PercentConversion)?;

    ((*percent) * Decimal::ONE) // the percentage type does not expose its Decimal
        .checked_mul(minor)
        .ok_or(CartError::PercentConversion)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or(CartError::PercentConversion)
}
