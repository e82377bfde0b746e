//! Orders
//!
//! A reservation moves `Confirming -> Confirmed -> Completed`, and may be
//! `Cancelled` from either of the first two states. The pickup code and
//! deadline are assigned exactly once, on confirmation.

use std::fmt;

use jiff::{SignedDuration, Timestamp};
use rustc_hash::FxHashSet;
use rusty_money::{Money, iso::Currency};
use slotmap::{SlotMap, new_key_type};
use thiserror::Error;
use tracing::info;

use crate::{
    catalog::{Deal, DealKey, whole_seconds},
    orders::pickup_code::{PickupCode, PickupCodeSource},
};

pub mod countdown;
pub mod pickup_code;

/// How many candidate codes are drawn before giving up.
pub const MAX_CODE_ATTEMPTS: usize = 64;

new_key_type! {
    /// Order Key
    pub struct OrderKey;
}

/// Where an order is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderStatus {
    /// Waiting for the business to acknowledge the reservation.
    Confirming,
    /// Acknowledged; a pickup code and deadline are assigned.
    Confirmed,
    /// Picked up.
    Completed,
    /// Abandoned or cancelled before pickup.
    Cancelled,
}

impl OrderStatus {
    /// Status name as displayed.
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Confirming => "Confirming",
            OrderStatus::Confirmed => "Confirmed",
            OrderStatus::Completed => "Completed",
            OrderStatus::Cancelled => "Cancelled",
        }
    }

    /// Whether the order belongs on the active orders tab.
    pub fn is_active(self) -> bool {
        matches!(self, OrderStatus::Confirming | OrderStatus::Confirmed)
    }

    /// Whether the lifecycle allows moving to `next`.
    pub fn can_become(self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Confirming, OrderStatus::Confirmed)
                | (OrderStatus::Confirmed, OrderStatus::Completed)
                | (
                    OrderStatus::Confirming | OrderStatus::Confirmed,
                    OrderStatus::Cancelled
                )
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors related to order lifecycle operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// No order with this key
    #[error("Order not found")]
    NotFound(OrderKey),

    /// The lifecycle does not allow this move
    #[error("Cannot move order from {from} to {to}")]
    InvalidTransition {
        /// Current status
        from: OrderStatus,
        /// Requested status
        to: OrderStatus,
    },

    /// Every candidate code was already in use
    #[error("No unused pickup code after {0} attempts")]
    PickupCodesExhausted(usize),

    /// Orders need at least one unit
    #[error("Order quantity must be at least 1")]
    ZeroQuantity,

    /// Price times quantity does not fit in minor units
    #[error("Order total overflowed")]
    Overflow,

    /// The pickup deadline could not be represented
    #[error(transparent)]
    Time(#[from] jiff::Error),
}

/// Order
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    number: u32,
    deal: DealKey,
    deal_id: String,
    quantity: u32,
    price: Money<'static, Currency>,
    status: OrderStatus,
    pickup_code: Option<PickupCode>,
    pickup_deadline: Option<Timestamp>,
    countdown: u64,
    created_at: Timestamp,
    confirmed_at: Option<Timestamp>,
    completed_at: Option<Timestamp>,
}

impl Order {
    /// Sequential order number, starting at 1.
    pub fn number(&self) -> u32 {
        self.number
    }

    /// Order reference shown to customers, e.g. `ord-001`.
    pub fn reference(&self) -> String {
        format!("ord-{:03}", self.number)
    }

    /// The reserved deal.
    pub fn deal(&self) -> DealKey {
        self.deal
    }

    /// Catalog id of the reserved deal.
    pub fn deal_id(&self) -> &str {
        &self.deal_id
    }

    /// Units reserved.
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Total price of the reservation.
    pub fn price(&self) -> &Money<'static, Currency> {
        &self.price
    }

    /// Current status.
    pub fn status(&self) -> OrderStatus {
        self.status
    }

    /// Pickup code, assigned on confirmation.
    pub fn pickup_code(&self) -> Option<&PickupCode> {
        self.pickup_code.as_ref()
    }

    /// Pickup deadline, assigned on confirmation.
    pub fn pickup_deadline(&self) -> Option<Timestamp> {
        self.pickup_deadline
    }

    /// When the reservation was made.
    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// When the reservation was confirmed.
    pub fn confirmed_at(&self) -> Option<Timestamp> {
        self.confirmed_at
    }

    /// When the order was picked up or cancelled.
    pub fn completed_at(&self) -> Option<Timestamp> {
        self.completed_at
    }

    /// Whole seconds left to collect the order, clamped at zero.
    ///
    /// Only a confirmed order has a countdown. The value never exceeds the
    /// last tick, so it cannot go back up if `now` lags behind.
    pub fn time_remaining(&self, now: Timestamp) -> Option<u64> {
        if self.status != OrderStatus::Confirmed {
            return None;
        }

        let deadline = self.pickup_deadline?;

        Some(self.countdown.min(whole_seconds(deadline.duration_since(now))))
    }

    fn move_to(&mut self, next: OrderStatus) -> Result<(), OrderError> {
        if !self.status.can_become(next) {
            return Err(OrderError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }

        self.status = next;

        Ok(())
    }
}

/// Order Manager
pub struct OrderManager {
    orders: SlotMap<OrderKey, Order>,
    live_codes: FxHashSet<PickupCode>,
    codes: Box<dyn PickupCodeSource>,
    pickup_window: SignedDuration,
    next_number: u32,
}

impl fmt::Debug for OrderManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderManager")
            .field("orders", &self.orders)
            .field("live_codes", &self.live_codes)
            .field("pickup_window", &self.pickup_window)
            .field("next_number", &self.next_number)
            .finish_non_exhaustive()
    }
}

impl OrderManager {
    /// Create an order manager drawing pickup codes from `codes`.
    #[must_use]
    pub fn new(pickup_window: SignedDuration, codes: Box<dyn PickupCodeSource>) -> Self {
        OrderManager {
            orders: SlotMap::with_key(),
            live_codes: FxHashSet::default(),
            codes,
            pickup_window,
            next_number: 1,
        }
    }

    /// How long a confirmed order may be collected for.
    pub fn pickup_window(&self) -> SignedDuration {
        self.pickup_window
    }

    /// Reserve `quantity` units of a deal, creating a `Confirming` order.
    ///
    /// # Errors
    ///
    /// - [`OrderError::ZeroQuantity`]: `quantity` is zero.
    /// - [`OrderError::Overflow`]: the total price does not fit in minor units.
    pub fn reserve(
        &mut self,
        key: DealKey,
        deal: &Deal,
        quantity: u32,
        at: Timestamp,
    ) -> Result<OrderKey, OrderError> {
        if quantity == 0 {
            return Err(OrderError::ZeroQuantity);
        }

        let minor = deal
            .price
            .to_minor_units()
            .checked_mul(i64::from(quantity))
            .ok_or(OrderError::Overflow)?;

        let number = self.next_number;
        self.next_number = self.next_number.saturating_add(1);

        let order = Order {
            number,
            deal: key,
            deal_id: deal.id.clone(),
            quantity,
            price: Money::from_minor(minor, deal.price.currency()),
            status: OrderStatus::Confirming,
            pickup_code: None,
            pickup_deadline: None,
            countdown: 0,
            created_at: at,
            confirmed_at: None,
            completed_at: None,
        };

        info!(
            order = %order.reference(),
            deal = %order.deal_id,
            quantity,
            price = %order.price,
            "reservation created"
        );

        Ok(self.orders.insert(order))
    }

    /// Confirm a reservation at `at`, assigning its pickup code and deadline.
    ///
    /// # Errors
    ///
    /// - [`OrderError::NotFound`]: no such order.
    /// - [`OrderError::InvalidTransition`]: the order is not `Confirming`.
    /// - [`OrderError::PickupCodesExhausted`]: no unused code was drawn.
    /// - [`OrderError::Time`]: the deadline is out of range.
    pub fn confirm(&mut self, key: OrderKey, at: Timestamp) -> Result<PickupCode, OrderError> {
        let status = self.get(key).ok_or(OrderError::NotFound(key))?.status;

        if !status.can_become(OrderStatus::Confirmed) {
            return Err(OrderError::InvalidTransition {
                from: status,
                to: OrderStatus::Confirmed,
            });
        }

        let deadline = at.checked_add(self.pickup_window)?;
        let code = self.unused_code()?;

        let order = self.orders.get_mut(key).ok_or(OrderError::NotFound(key))?;

        order.move_to(OrderStatus::Confirmed)?;
        order.pickup_code = Some(code.clone());
        order.pickup_deadline = Some(deadline);
        order.countdown = whole_seconds(self.pickup_window);
        order.confirmed_at = Some(at);

        self.live_codes.insert(code.clone());

        info!(
            order = %order.reference(),
            pickup_code = %code,
            deadline = %deadline,
            "reservation confirmed"
        );

        Ok(code)
    }

    fn unused_code(&mut self) -> Result<PickupCode, OrderError> {
        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = self.codes.next_code();

            if !self.live_codes.contains(&code) {
                return Ok(code);
            }
        }

        Err(OrderError::PickupCodesExhausted(MAX_CODE_ATTEMPTS))
    }

    /// Advance a confirmed order's countdown to `at`, returning the seconds left.
    ///
    /// Returns `None` if the order is gone or no longer confirmed.
    pub fn tick(&mut self, key: OrderKey, at: Timestamp) -> Option<u64> {
        let order = self.orders.get_mut(key)?;
        let remaining = order.time_remaining(at)?;

        order.countdown = remaining;

        Some(remaining)
    }

    /// Mark a confirmed order as picked up.
    ///
    /// # Errors
    ///
    /// - [`OrderError::NotFound`]: no such order.
    /// - [`OrderError::InvalidTransition`]: the order is not `Confirmed`.
    pub fn complete(&mut self, key: OrderKey, at: Timestamp) -> Result<(), OrderError> {
        let order = self.orders.get_mut(key).ok_or(OrderError::NotFound(key))?;

        order.move_to(OrderStatus::Completed)?;
        order.completed_at = Some(at);

        info!(order = %order.reference(), "order picked up");

        Ok(())
    }

    /// Cancel an order that has not been picked up, releasing its pickup code.
    ///
    /// # Errors
    ///
    /// - [`OrderError::NotFound`]: no such order.
    /// - [`OrderError::InvalidTransition`]: the order is already completed or cancelled.
    pub fn cancel(&mut self, key: OrderKey, at: Timestamp) -> Result<(), OrderError> {
        let order = self.orders.get_mut(key).ok_or(OrderError::NotFound(key))?;

        order.move_to(OrderStatus::Cancelled)?;
        order.completed_at = Some(at);

        if let Some(code) = &order.pickup_code {
            self.live_codes.remove(code);
        }

        info!(order = %order.reference(), "order cancelled");

        Ok(())
    }

    /// Get an order by key.
    pub fn get(&self, key: OrderKey) -> Option<&Order> {
        self.orders.get(key)
    }

    /// All orders, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (OrderKey, &Order)> {
        self.orders.iter()
    }

    /// Confirming and confirmed orders, newest first.
    pub fn active(&self) -> Vec<(OrderKey, &Order)> {
        self.newest_first(|order| order.status.is_active())
    }

    /// Completed and cancelled orders, newest first.
    pub fn past(&self) -> Vec<(OrderKey, &Order)> {
        self.newest_first(|order| !order.status.is_active())
    }

    fn newest_first(&self, keep: impl Fn(&Order) -> bool) -> Vec<(OrderKey, &Order)> {
        let mut orders: Vec<_> = self.orders.iter().filter(|(_, order)| keep(order)).collect();

        orders.sort_by_key(|(_, order)| std::cmp::Reverse(order.number));

        orders
    }

    /// Number of orders ever created.
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    /// Whether no order was created yet.
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}
