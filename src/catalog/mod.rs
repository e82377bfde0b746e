//! Catalog
//!
//! Read-only deal rows supplied from outside the core. The core never mutates
//! a loaded deal; sessions, carts and orders reference them by [`DealKey`].

use decimal_percentage::Percentage;
use jiff::{SignedDuration, Timestamp};
use rust_decimal::{Decimal, prelude::FromPrimitive};
use rustc_hash::FxHashMap;
use rusty_money::{Money, MoneyError, iso::Currency};
use slotmap::{SlotMap, new_key_type};
use thiserror::Error;
use tracing::warn;

use crate::catalog::fixture::DealsFixture;

pub mod fixture;

const BUNDLED_DEALS_YAML: &str = include_str!("../../fixtures/deals.yml");

new_key_type! {
    /// Deal Key
    pub struct DealKey;
}

/// Catalog loading errors
#[derive(Debug, Error)]
pub enum CatalogError {
    /// YAML parsing error
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// Invalid price format
    #[error("Invalid price format: {0}")]
    InvalidPrice(String),

    /// Invalid percentage format
    #[error("Invalid percentage format: {0}")]
    InvalidPercentage(String),

    /// Unknown currency code
    #[error("Unknown currency code: {0}")]
    UnknownCurrency(String),

    /// Currency mismatch between deals
    #[error("Currency mismatch: expected {0}, found {1}")]
    CurrencyMismatch(String, String),

    /// Discounted price is higher than the original price
    #[error("Deal {0} is priced above its original price")]
    PriceAboveOriginal(String),

    /// Two deals share an id
    #[error("Duplicate deal id: {0}")]
    DuplicateId(String),

    /// Deal id not present in the catalog
    #[error("Deal not found: {0}")]
    DealNotFound(String),

    /// No deals were supplied
    #[error("Catalog has no deals")]
    Empty,
}

/// A surplus-food deal (a "Loop") offered by a business partner.
#[derive(Debug, Clone, PartialEq)]
pub struct Deal {
    /// Catalog id referenced by views
    pub id: String,

    /// Deal title
    pub title: String,

    /// Business offering the deal
    pub business: String,

    /// Deal category
    pub category: String,

    /// Price before the surplus discount
    pub original_price: Money<'static, Currency>,

    /// Discounted price
    pub price: Money<'static, Currency>,

    /// Pickup window shown to customers
    pub pickup_window: String,

    /// Units left
    pub available: u32,

    /// How long the listing stays live after the catalog is loaded
    pub listing_window: Option<SignedDuration>,
}

impl Deal {
    /// Amount saved against the original price.
    ///
    /// # Errors
    ///
    /// Returns a [`MoneyError`] if the subtraction operation fails.
    pub fn savings(&self) -> Result<Money<'static, Currency>, MoneyError> {
        self.original_price.sub(self.price)
    }

    /// Savings as a fraction of the original price.
    ///
    /// # Errors
    ///
    /// Returns a [`MoneyError`] if the subtraction operation fails.
    pub fn savings_percent(&self) -> Result<Percentage, MoneyError> {
        let savings_minor = self.savings()?.to_minor_units();
        let original_minor = self.original_price.to_minor_units();

        if original_minor == 0 {
            return Ok(Percentage::from(Decimal::ZERO));
        }

        let savings_dec = Decimal::from_i64(savings_minor).unwrap_or(Decimal::ZERO);
        let original_dec = Decimal::from_i64(original_minor).unwrap_or(Decimal::ONE);

        Ok(Percentage::from(savings_dec / original_dec))
    }
}

/// Catalog
#[derive(Debug)]
pub struct Catalog {
    deals: SlotMap<DealKey, Deal>,
    ids: FxHashMap<String, DealKey>,
    order: Vec<DealKey>,
    default: DealKey,
    currency: &'static Currency,
    loaded_at: Timestamp,
}

impl Catalog {
    /// Build a catalog from deals in display order. The first deal is the default.
    ///
    /// # Errors
    ///
    /// Returns an error if no deals are given, if two deals share an id, or if
    /// the deals are priced in different currencies.
    pub fn with_deals(
        deals: impl IntoIterator<Item = Deal>,
        loaded_at: Timestamp,
    ) -> Result<Self, CatalogError> {
        let mut slots: SlotMap<DealKey, Deal> = SlotMap::with_key();
        let mut ids = FxHashMap::default();
        let mut order = Vec::new();
        let mut currency: Option<&'static Currency> = None;

        for deal in deals {
            let deal_currency = deal.price.currency();

            match currency {
                Some(existing) if existing != deal_currency => {
                    return Err(CatalogError::CurrencyMismatch(
                        existing.iso_alpha_code.to_string(),
                        deal_currency.iso_alpha_code.to_string(),
                    ));
                }
                Some(_) => {}
                None => currency = Some(deal_currency),
            }

            if ids.contains_key(&deal.id) {
                return Err(CatalogError::DuplicateId(deal.id));
            }

            let id = deal.id.clone();
            let key = slots.insert(deal);

            ids.insert(id, key);
            order.push(key);
        }

        let (Some(&default), Some(currency)) = (order.first(), currency) else {
            return Err(CatalogError::Empty);
        };

        Ok(Self {
            deals: slots,
            ids,
            order,
            default,
            currency,
            loaded_at,
        })
    }

    /// Load a catalog from a YAML fixture.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML cannot be parsed or any deal is invalid.
    pub fn from_yaml(contents: &str, loaded_at: Timestamp) -> Result<Self, CatalogError> {
        let fixture: DealsFixture = serde_norway::from_str(contents)?;

        let deals = fixture
            .deals
            .into_iter()
            .map(Deal::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Self::with_deals(deals, loaded_at)
    }

    /// Load the mock catalog bundled with the crate.
    ///
    /// # Errors
    ///
    /// Returns an error if the bundled fixture is invalid.
    pub fn bundled(loaded_at: Timestamp) -> Result<Self, CatalogError> {
        Self::from_yaml(BUNDLED_DEALS_YAML, loaded_at)
    }

    /// Use the deal with the given id as the fallback for unknown ids.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::DealNotFound`] if the id is not in the catalog.
    pub fn with_default(mut self, id: &str) -> Result<Self, CatalogError> {
        self.default = self
            .key_of(id)
            .ok_or_else(|| CatalogError::DealNotFound(id.to_string()))?;

        Ok(self)
    }

    /// Get a deal by key.
    pub fn get(&self, key: DealKey) -> Option<&Deal> {
        self.deals.get(key)
    }

    /// Get a deal by its catalog id.
    pub fn get_by_id(&self, id: &str) -> Option<&Deal> {
        self.key_of(id).and_then(|key| self.deals.get(key))
    }

    /// Look up the key for a catalog id.
    pub fn key_of(&self, id: &str) -> Option<DealKey> {
        self.ids.get(id).copied()
    }

    /// Resolve a deal id, falling back to the default deal for unknown ids.
    pub fn resolve(&self, id: &str) -> DealKey {
        if let Some(key) = self.key_of(id) {
            return key;
        }

        warn!(deal_id = id, "unknown deal id, using default deal");

        self.default
    }

    /// The deal used when an unknown id is requested.
    pub fn default_key(&self) -> DealKey {
        self.default
    }

    /// Iterate over deals in display order.
    pub fn iter(&self) -> impl Iterator<Item = (DealKey, &Deal)> {
        self.order
            .iter()
            .filter_map(|&key| self.deals.get(key).map(|deal| (key, deal)))
    }

    /// Seconds left before a deal's listing ends, or `None` if it has no listing window.
    pub fn listing_remaining(&self, key: DealKey, now: Timestamp) -> Option<u64> {
        let window = self.deals.get(key)?.listing_window?;
        let elapsed = now.duration_since(self.loaded_at);

        Some(whole_seconds(window.saturating_sub(elapsed)))
    }

    /// Number of deals in the catalog.
    pub fn len(&self) -> usize {
        self.deals.len()
    }

    /// Whether the catalog has no deals. Always false for a constructed catalog.
    pub fn is_empty(&self) -> bool {
        self.deals.is_empty()
    }

    /// Currency every deal is priced in.
    pub fn currency(&self) -> &'static Currency {
        self.currency
    }

    /// When the catalog was loaded.
    pub fn loaded_at(&self) -> Timestamp {
        self.loaded_at
    }
}

/// Whole seconds in a duration, clamped at zero.
pub(crate) fn whole_seconds(duration: SignedDuration) -> u64 {
    u64::try_from(duration.as_secs()).unwrap_or(0)
}
