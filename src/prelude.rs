//! Foodloop prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    cart::{Cart, CartError, CartItem, CartPricing, CartSummary},
    catalog::{Catalog, CatalogError, Deal, DealKey},
    config::{ConfigError, SessionConfig, SessionConfigFile},
    controller::{
        Controller, ControllerError, ListingCountdown, OrderView, SessionEvent, TimerEvent, View,
    },
    orders::{
        Order, OrderError, OrderKey, OrderManager, OrderStatus,
        countdown::{format_listing_countdown, format_pickup_countdown},
        pickup_code::{InvalidPickupCode, PickupCode, PickupCodeSource, RandomPickupCodes},
    },
    roles::Role,
    screens::{Audience, Screen, UnknownScreen},
    session::{Effect, Intent, NavigationError, Session, Transition},
    timers::{Fired, TimerError, TimerKey, Timers},
};
