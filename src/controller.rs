//! Controller
//!
//! Single entry point for views. Intents and timer firings are processed one
//! at a time against one session; each screen change cancels the timers the
//! previous screen owned.

use jiff::Timestamp;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    cart::{Cart, CartError, CartItem, CartSummary},
    catalog::{Catalog, CatalogError, Deal, DealKey},
    config::{ConfigError, SessionConfig},
    orders::{
        Order, OrderError, OrderKey, OrderManager, OrderStatus,
        countdown::{format_listing_countdown, format_pickup_countdown},
        pickup_code::{PickupCode, PickupCodeSource, RandomPickupCodes},
    },
    roles::Role,
    screens::Screen,
    session::{Effect, Intent, NavigationError, Session, Transition},
    timers::{Fired, TimerError, Timers},
};

/// Errors surfaced to views.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Rejected transition; the session is unchanged
    #[error(transparent)]
    Navigation(#[from] NavigationError),

    /// Order lifecycle error
    #[error(transparent)]
    Order(#[from] OrderError),

    /// Cart error
    #[error(transparent)]
    Cart(#[from] CartError),

    /// Timer scheduling error
    #[error(transparent)]
    Timer(#[from] TimerError),

    /// Catalog error
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Time arithmetic error
    #[error(transparent)]
    Time(#[from] jiff::Error),

    /// A deal key that is not in the catalog
    #[error("Deal not found in catalog")]
    MissingDeal(DealKey),

    /// The action needs a signed-in customer
    #[error("{0} needs a signed-in customer")]
    CustomerOnly(&'static str),

    /// The action needs a signed-in business
    #[error("{0} needs a signed-in business")]
    BusinessOnly(&'static str),
}

/// What a timer does when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// Confirm a reservation.
    ConfirmOrder(OrderKey),

    /// Advance an order's pickup countdown.
    CountdownTick(OrderKey),
}

impl TimerEvent {
    /// The order this timer acts on.
    pub fn order(self) -> OrderKey {
        match self {
            TimerEvent::ConfirmOrder(order) | TimerEvent::CountdownTick(order) => order,
        }
    }
}

/// Observable results of timers firing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A reservation was confirmed.
    OrderConfirmed {
        /// Order
        order: OrderKey,
        /// Assigned pickup code
        pickup_code: PickupCode,
        /// Seconds left to collect
        time_remaining: u64,
    },

    /// The pickup countdown ticked.
    CountdownTicked {
        /// Order
        order: OrderKey,
        /// Seconds left to collect
        time_remaining: u64,
    },

    /// The pickup countdown reached zero; the order stays confirmed.
    CountdownElapsed {
        /// Order
        order: OrderKey,
    },
}

/// An order as shown on checkout and the orders list.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderView<'a> {
    /// Order key
    pub key: OrderKey,

    /// The order
    pub order: &'a Order,

    /// The reserved deal
    pub deal: Option<&'a Deal>,

    /// Seconds left to collect, while confirmed
    pub time_remaining: Option<u64>,

    /// `time_remaining` as `H:MM:SS`
    pub countdown: Option<String>,
}

/// Everything a view needs to render the current screen.
#[derive(Debug, Clone, PartialEq)]
pub struct View<'a> {
    /// Screen showing
    pub screen: Screen,

    /// Current role
    pub role: Role,

    /// Whether the session is signed in
    pub signed_in: bool,

    /// Whether the bottom navigation bar is shown
    pub show_bottom_nav: bool,

    /// Deal being viewed or reserved
    pub selected_deal: Option<&'a Deal>,

    /// Latest reservation
    pub active_order: Option<OrderView<'a>>,

    /// Cart lines
    pub cart: &'a Cart,
}

/// A deal's time left on the merchant dashboard.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingCountdown<'a> {
    /// Deal key
    pub key: DealKey,

    /// The deal
    pub deal: &'a Deal,

    /// Seconds until the listing ends
    pub remaining: u64,

    /// `remaining` as `Hh Mm` or `Mm`
    pub label: String,
}

/// Controller
#[derive(Debug)]
pub struct Controller {
    config: SessionConfig,
    catalog: Catalog,
    session: Session,
    orders: OrderManager,
    cart: Cart,
    timers: Timers<TimerEvent>,
    events: Vec<SessionEvent>,
    clock: Timestamp,
}

impl Controller {
    /// Start a session at `continue-as`.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::OutOfRange`]: a delay or the discount fails [`SessionConfig::validate`].
    /// - [`CatalogError::DealNotFound`]: the configured default deal is not in the catalog.
    /// - [`ConfigError::CurrencyMismatch`]: the delivery fee is not in the catalog currency.
    pub fn new(
        catalog: Catalog,
        config: SessionConfig,
        now: Timestamp,
    ) -> Result<Self, ControllerError> {
        config.validate()?;

        let catalog = match config.default_deal_id.as_deref() {
            Some(id) => catalog.with_default(id)?,
            None => catalog,
        };

        let fee_currency = config
            .pricing
            .delivery_fee
            .as_ref()
            .map(|fee| fee.currency());

        if let Some(fee_currency) = fee_currency.filter(|currency| *currency != catalog.currency()) {
            return Err(ConfigError::CurrencyMismatch {
                fee: fee_currency.iso_alpha_code.to_string(),
                catalog: catalog.currency().iso_alpha_code.to_string(),
            }
            .into());
        }

        let codes: Box<dyn PickupCodeSource> = match config.pickup_code_seed {
            Some(seed) => Box::new(RandomPickupCodes::seeded(seed)),
            None => Box::new(RandomPickupCodes::from_entropy()),
        };

        Ok(Controller {
            orders: OrderManager::new(config.pickup_window, codes),
            cart: Cart::new(catalog.currency()),
            config,
            catalog,
            session: Session::new(),
            timers: Timers::new(),
            events: Vec::new(),
            clock: now,
        })
    }

    /// Draw pickup codes from `codes` instead. Call before the first reservation.
    #[must_use]
    pub fn with_pickup_codes(mut self, codes: Box<dyn PickupCodeSource>) -> Self {
        self.orders = OrderManager::new(self.config.pickup_window, codes);
        self
    }

    /// Apply an intent at `now`, after firing any timers due by then.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::Navigation`] if the transition is rejected,
    /// in which case the session is unchanged, or an error from the side
    /// effects of the transition.
    pub fn dispatch(&mut self, intent: &Intent, now: Timestamp) -> Result<Session, ControllerError> {
        self.fire_due(now)?;

        let from = self.session;

        let Transition { mut session, effect } = from
            .transition(intent, &self.catalog)
            .inspect_err(|error| {
                warn!(%intent, screen = %from.screen(), %error, "transition rejected");
            })?;

        if let Some(Effect::Reserve(deal)) = effect {
            let order = self.reserve(deal)?;
            session = session.with_reservation(order);
        }

        if *intent == Intent::Logout {
            self.timers.clear();
            self.cart.clear();
            self.abandon_checkout(from)?;

            info!(role = %from.role(), "signed out");
        } else if from.screen() != session.screen() {
            self.leave(from)?;
        }

        self.session = session;

        debug!(
            %intent,
            from = %from.screen(),
            to = %session.screen(),
            show_bottom_nav = session.show_bottom_nav(),
            "transition"
        );

        Ok(session)
    }

    /// Navigate to a screen by name. Unknown names are ignored.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`Controller::dispatch`].
    pub fn navigate_named(
        &mut self,
        name: &str,
        now: Timestamp,
    ) -> Result<Option<Session>, ControllerError> {
        match name.parse::<Screen>() {
            Ok(screen) => self.dispatch(&Intent::Navigate(screen), now).map(Some),
            Err(error) => {
                self.fire_due(now)?;

                warn!(%error, screen = %self.session.screen(), "ignoring navigation");

                Ok(None)
            }
        }
    }

    fn reserve(&mut self, deal: DealKey) -> Result<OrderKey, ControllerError> {
        let quantity = self.cart.get(deal).map_or(1, CartItem::quantity);
        let due = self.clock.checked_add(self.config.confirmation_delay)?;

        let row = self
            .catalog
            .get(deal)
            .ok_or(ControllerError::MissingDeal(deal))?;

        let order = self.orders.reserve(deal, row, quantity, self.clock)?;

        self.timers
            .once(Screen::Checkout, due, TimerEvent::ConfirmOrder(order));

        Ok(order)
    }

    fn leave(&mut self, from: Session) -> Result<(), ControllerError> {
        let cancelled = self.timers.cancel_owned_by(from.screen());

        if cancelled > 0 {
            debug!(screen = %from.screen(), cancelled, "cancelled screen timers");
        }

        if from.screen() == Screen::Checkout {
            self.abandon_checkout(from)?;
        }

        Ok(())
    }

    fn abandon_checkout(&mut self, from: Session) -> Result<(), ControllerError> {
        let Some(order) = from.active_reservation() else {
            return Ok(());
        };

        if self.orders.get(order).map(Order::status) == Some(OrderStatus::Confirming) {
            self.orders.cancel(order, self.clock)?;
            self.timers.cancel_matching(|event| event.order() == order);

            info!("reservation abandoned before confirmation");
        }

        Ok(())
    }

    /// Fire every timer due by `now` and return what happened, oldest first.
    ///
    /// Also returns events from timers fired while dispatching intents.
    ///
    /// # Errors
    ///
    /// Returns an error if confirming an order or re-arming a timer fails.
    pub fn advance_to(&mut self, now: Timestamp) -> Result<Vec<SessionEvent>, ControllerError> {
        self.fire_due(now)?;

        Ok(std::mem::take(&mut self.events))
    }

    fn fire_due(&mut self, now: Timestamp) -> Result<(), ControllerError> {
        if now > self.clock {
            self.clock = now;
        }

        while let Some(fired) = self.timers.pop_due(self.clock)? {
            self.fire(fired)?;
        }

        Ok(())
    }

    fn fire(&mut self, fired: Fired<TimerEvent>) -> Result<(), ControllerError> {
        match fired.event {
            TimerEvent::ConfirmOrder(order) => {
                let status = self.orders.get(order).map(Order::status);

                if status != Some(OrderStatus::Confirming) {
                    debug!(?status, "confirmation fired for an order that is not confirming");

                    return Ok(());
                }

                let pickup_code = match self.confirm(order, fired.at) {
                    Ok(pickup_code) => pickup_code,
                    Err(error) => {
                        self.timers
                            .cancel_matching(|event| *event == TimerEvent::CountdownTick(order));
                        self.orders.cancel(order, fired.at)?;

                        warn!(%error, "confirmation failed, reservation cancelled");

                        return Err(error);
                    }
                };

                let time_remaining = self
                    .orders
                    .get(order)
                    .and_then(|confirmed| confirmed.time_remaining(fired.at))
                    .unwrap_or_default();

                self.events.push(SessionEvent::OrderConfirmed {
                    order,
                    pickup_code,
                    time_remaining,
                });
            }
            TimerEvent::CountdownTick(order) => match self.orders.tick(order, fired.at) {
                Some(time_remaining) => {
                    self.events.push(SessionEvent::CountdownTicked {
                        order,
                        time_remaining,
                    });

                    if time_remaining == 0 {
                        self.timers.cancel(fired.key);
                        self.events.push(SessionEvent::CountdownElapsed { order });

                        info!("pickup window elapsed");
                    }
                }
                None => {
                    self.timers.cancel(fired.key);

                    debug!("countdown fired for an order that is not confirmed");
                }
            },
        }

        Ok(())
    }

    /// Arm the countdown, then confirm; the caller unwinds both on failure.
    fn confirm(&mut self, order: OrderKey, at: Timestamp) -> Result<PickupCode, ControllerError> {
        let interval = self.config.countdown_interval;

        self.timers.every(
            Screen::Checkout,
            at.checked_add(interval)?,
            interval,
            TimerEvent::CountdownTick(order),
        )?;

        Ok(self.orders.confirm(order, at)?)
    }

    /// Events fired while dispatching that have not been collected yet.
    pub fn take_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    fn require_customer(&self, action: &'static str) -> Result<(), ControllerError> {
        if self.session.is_signed_in() && self.session.role() == Role::Customer {
            return Ok(());
        }

        warn!(action, role = %self.session.role(), "rejected customer-only action");

        Err(ControllerError::CustomerOnly(action))
    }

    /// Add units of a deal to the cart. Unknown ids resolve to the default deal.
    ///
    /// # Errors
    ///
    /// - [`ControllerError::CustomerOnly`]: the session is not a signed-in customer.
    /// - [`ControllerError::Cart`]: the cart rejected the line.
    pub fn add_to_cart(&mut self, deal_id: &str, quantity: u32) -> Result<u32, ControllerError> {
        self.require_customer("add to cart")?;

        let key = self.catalog.resolve(deal_id);
        let deal = self
            .catalog
            .get(key)
            .ok_or(ControllerError::MissingDeal(key))?;

        Ok(self.cart.add(key, deal, quantity)?)
    }

    /// Change a cart line's quantity by `delta`, clamped to `[1, available]`.
    ///
    /// Returns `None` if the deal is unknown or not in the cart.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::CustomerOnly`] if the session is not a signed-in customer.
    pub fn update_cart_quantity(
        &mut self,
        deal_id: &str,
        delta: i64,
    ) -> Result<Option<u32>, ControllerError> {
        self.require_customer("update cart")?;

        Ok(self
            .catalog
            .key_of(deal_id)
            .and_then(|key| self.cart.update_quantity(key, delta)))
    }

    /// Remove a deal from the cart. Returns whether a line was removed.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::CustomerOnly`] if the session is not a signed-in customer.
    pub fn remove_from_cart(&mut self, deal_id: &str) -> Result<bool, ControllerError> {
        self.require_customer("remove from cart")?;

        Ok(self
            .catalog
            .key_of(deal_id)
            .is_some_and(|key| self.cart.remove(key)))
    }

    /// Subtotal, discount, delivery and total for the cart.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError`] if the money arithmetic fails.
    pub fn cart_summary(&self) -> Result<CartSummary, CartError> {
        self.cart.summary(&self.config.pricing)
    }

    /// Record that a confirmed order was picked up. Its deal leaves the cart.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::Order`] if the order is missing or not confirmed.
    pub fn confirm_pickup(&mut self, order: OrderKey, now: Timestamp) -> Result<(), ControllerError> {
        self.fire_due(now)?;
        self.orders.complete(order, self.clock)?;
        self.timers.cancel_matching(|event| event.order() == order);

        let picked_up = self.orders.get(order).map(Order::deal);

        if picked_up.is_some_and(|deal| self.cart.remove(deal)) {
            debug!("removed picked-up deal from cart");
        }

        Ok(())
    }

    /// Cancel an order that has not been picked up.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::Order`] if the order is missing, completed or
    /// already cancelled.
    pub fn cancel_order(&mut self, order: OrderKey, now: Timestamp) -> Result<(), ControllerError> {
        self.fire_due(now)?;
        self.orders.cancel(order, self.clock)?;
        self.timers.cancel_matching(|event| event.order() == order);

        Ok(())
    }

    /// Read-only data for the current screen.
    ///
    /// `now` earlier than the latest event is treated as the latest event.
    pub fn view(&self, now: Timestamp) -> View<'_> {
        let session = self.session;

        View {
            screen: session.screen(),
            role: session.role(),
            signed_in: session.is_signed_in(),
            show_bottom_nav: session.show_bottom_nav(),
            selected_deal: session.selected_deal().and_then(|key| self.catalog.get(key)),
            active_order: session
                .active_reservation()
                .and_then(|key| self.order_view(key, now)),
            cart: &self.cart,
        }
    }

    /// An order with its deal and countdown at `now`.
    pub fn order_view(&self, key: OrderKey, now: Timestamp) -> Option<OrderView<'_>> {
        let order = self.orders.get(key)?;
        let time_remaining = order.time_remaining(now.max(self.clock));

        Some(OrderView {
            key,
            order,
            deal: self.catalog.get(order.deal()),
            time_remaining,
            countdown: time_remaining.map(format_pickup_countdown),
        })
    }

    /// Listing countdowns for the merchant dashboard.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::BusinessOnly`] if the session is not a signed-in business.
    pub fn merchant_listings(
        &self,
        now: Timestamp,
    ) -> Result<Vec<ListingCountdown<'_>>, ControllerError> {
        if !(self.session.is_signed_in() && self.session.role() == Role::Business) {
            return Err(ControllerError::BusinessOnly("merchant listings"));
        }

        let now = now.max(self.clock);

        Ok(self
            .catalog
            .iter()
            .filter_map(|(key, deal)| {
                let remaining = self.catalog.listing_remaining(key, now)?;

                Some(ListingCountdown {
                    key,
                    deal,
                    remaining,
                    label: format_listing_countdown(remaining),
                })
            })
            .collect())
    }

    /// Current session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Deal catalog.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// All orders.
    pub fn orders(&self) -> &OrderManager {
        &self.orders
    }

    /// Cart.
    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Latest instant the controller has seen.
    pub fn clock(&self) -> Timestamp {
        self.clock
    }

    /// When the next scheduled timer is due.
    pub fn next_due(&self) -> Option<Timestamp> {
        self.timers.next_due()
    }
}
