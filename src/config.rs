//! Session Config

use jiff::SignedDuration;
use rust_decimal::Decimal;
use rusty_money::Money;
use serde::Deserialize;
use thiserror::Error;

use crate::{
    cart::CartPricing,
    catalog::{
        CatalogError,
        fixture::{parse_percentage, parse_price},
    },
};

/// Errors raised while loading session configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// YAML parsing error
    #[error(transparent)]
    Yaml(#[from] serde_norway::Error),

    /// Malformed price or percentage
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// A duration or the discount is out of range
    #[error("{0} is out of range")]
    OutOfRange(&'static str),

    /// The delivery fee is not in the catalog currency
    #[error("Delivery fee is in {fee} but the catalog is in {catalog}")]
    CurrencyMismatch {
        /// Currency of the delivery fee
        fee: String,
        /// Currency of the catalog
        catalog: String,
    },
}

/// Tunables for a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Delay between reserving and the order being confirmed.
    pub confirmation_delay: SignedDuration,

    /// How long a confirmed order may be collected for.
    pub pickup_window: SignedDuration,

    /// How often the pickup countdown ticks.
    pub countdown_interval: SignedDuration,

    /// Deal shown when a view names an unknown deal id.
    pub default_deal_id: Option<String>,

    /// Discount and delivery applied to the cart.
    pub pricing: CartPricing,

    /// Seed for reproducible pickup codes.
    pub pickup_code_seed: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            confirmation_delay: SignedDuration::from_millis(1500),
            pickup_window: SignedDuration::from_secs(3600),
            countdown_interval: SignedDuration::from_secs(1),
            default_deal_id: Some("1".to_string()),
            pricing: CartPricing::default(),
            pickup_code_seed: None,
        }
    }
}

impl SessionConfig {
    /// Load session configuration from YAML. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the YAML is malformed or a value is invalid.
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let file: SessionConfigFile = serde_norway::from_str(contents)?;

        SessionConfig::try_from(file)
    }

    /// Check that the delays can be scheduled and the discount is a fraction of the subtotal.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::OutOfRange`] naming the first field that is
    /// negative, a countdown interval that is not positive, or a discount
    /// outside `0..=1`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.confirmation_delay.is_negative() {
            return Err(ConfigError::OutOfRange("confirmation_delay"));
        }

        if self.pickup_window.is_negative() {
            return Err(ConfigError::OutOfRange("pickup_window"));
        }

        if !self.countdown_interval.is_positive() {
            return Err(ConfigError::OutOfRange("countdown_interval"));
        }

        let discount = self.pricing.discount * Decimal::ONE;

        if discount < Decimal::ZERO || discount > Decimal::ONE {
            return Err(ConfigError::OutOfRange("discount"));
        }

        Ok(())
    }
}

/// Session configuration as written in YAML
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfigFile {
    /// Milliseconds between reserving and confirmation
    pub confirmation_delay_ms: u64,

    /// Seconds a confirmed order may be collected for
    pub pickup_window_secs: u64,

    /// Milliseconds between countdown ticks
    pub countdown_interval_ms: u64,

    /// Fallback deal id
    pub default_deal_id: Option<String>,

    /// Cart discount (e.g., "10%" or "0.1")
    pub discount: Option<String>,

    /// Delivery fee (e.g., "2.50 AUD")
    pub delivery_fee: Option<String>,

    /// Pickup code RNG seed
    pub pickup_code_seed: Option<u64>,
}

impl Default for SessionConfigFile {
    fn default() -> Self {
        SessionConfigFile {
            confirmation_delay_ms: 1500,
            pickup_window_secs: 3600,
            countdown_interval_ms: 1000,
            default_deal_id: Some("1".to_string()),
            discount: None,
            delivery_fee: None,
            pickup_code_seed: None,
        }
    }
}

impl TryFrom<SessionConfigFile> for SessionConfig {
    type Error = ConfigError;

    fn try_from(file: SessionConfigFile) -> Result<Self, Self::Error> {
        let confirmation_delay = i64::try_from(file.confirmation_delay_ms)
            .map(SignedDuration::from_millis)
            .map_err(|_err| ConfigError::OutOfRange("confirmation_delay_ms"))?;

        let pickup_window = i64::try_from(file.pickup_window_secs)
            .map(SignedDuration::from_secs)
            .map_err(|_err| ConfigError::OutOfRange("pickup_window_secs"))?;

        let countdown_interval = i64::try_from(file.countdown_interval_ms)
            .ok()
            .filter(|ms| *ms > 0)
            .map(SignedDuration::from_millis)
            .ok_or(ConfigError::OutOfRange("countdown_interval_ms"))?;

        let mut pricing = CartPricing::default();

        if let Some(discount) = &file.discount {
            pricing.discount = parse_percentage(discount)?;
        }

        if let Some(fee) = &file.delivery_fee {
            let (minor, currency) = parse_price(fee)?;
            pricing.delivery_fee = Some(Money::from_minor(minor, currency));
        }

        let config = SessionConfig {
            confirmation_delay,
            pickup_window,
            countdown_interval,
            default_deal_id: file.default_deal_id,
            pricing,
            pickup_code_seed: file.pickup_code_seed,
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use decimal_percentage::Percentage;
    use rusty_money::iso::AUD;
    use testresult::TestResult;

    use super::*;

    #[test]
    fn empty_yaml_gives_defaults() -> TestResult {
        let config = SessionConfig::from_yaml("{}")?;

        assert_eq!(config, SessionConfig::default());

        Ok(())
    }

    #[test]
    fn reads_every_field() -> TestResult {
        let yaml = r#"
confirmation_delay_ms: 250
pickup_window_secs: 600
countdown_interval_ms: 500
default_deal_id: "3"
discount: "10%"
delivery_fee: "2.50 AUD"
pickup_code_seed: 7
"#;

        let config = SessionConfig::from_yaml(yaml)?;

        assert_eq!(config.confirmation_delay, SignedDuration::from_millis(250));
        assert_eq!(config.pickup_window, SignedDuration::from_secs(600));
        assert_eq!(config.countdown_interval, SignedDuration::from_millis(500));
        assert_eq!(config.default_deal_id.as_deref(), Some("3"));
        assert_eq!(
            config.pricing.discount,
            Percentage::from(Decimal::new(1, 1))
        );
        assert_eq!(
            config.pricing.delivery_fee,
            Some(Money::from_minor(250, AUD))
        );
        assert_eq!(config.pickup_code_seed, Some(7));

        Ok(())
    }

    #[test]
    fn zero_countdown_interval_is_rejected() {
        let result = SessionConfig::from_yaml("countdown_interval_ms: 0");

        assert!(matches!(
            result,
            Err(ConfigError::OutOfRange("countdown_interval_ms"))
        ));
    }

    #[test]
    fn discounts_outside_zero_to_one_are_rejected() {
        for discount in ["150%", "-20%", "1.5", "-0.01"] {
            let result = SessionConfig::from_yaml(&format!("discount: \"{discount}\""));

            assert!(
                matches!(result, Err(ConfigError::OutOfRange("discount"))),
                "{discount} should be rejected"
            );
        }
    }

    #[test]
    fn whole_and_zero_discounts_are_accepted() -> TestResult {
        for discount in ["0%", "100%", "0.25"] {
            SessionConfig::from_yaml(&format!("discount: \"{discount}\""))?;
        }

        Ok(())
    }

    #[test]
    fn negative_or_zero_durations_fail_validation() {
        let negative_delay = SessionConfig {
            confirmation_delay: SignedDuration::from_millis(-1),
            ..SessionConfig::default()
        };
        let negative_window = SessionConfig {
            pickup_window: SignedDuration::from_secs(-60),
            ..SessionConfig::default()
        };
        let zero_interval = SessionConfig {
            countdown_interval: SignedDuration::ZERO,
            ..SessionConfig::default()
        };

        assert!(matches!(
            negative_delay.validate(),
            Err(ConfigError::OutOfRange("confirmation_delay"))
        ));
        assert!(matches!(
            negative_window.validate(),
            Err(ConfigError::OutOfRange("pickup_window"))
        ));
        assert!(matches!(
            zero_interval.validate(),
            Err(ConfigError::OutOfRange("countdown_interval"))
        ));
        assert!(SessionConfig::default().validate().is_ok());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result = SessionConfig::from_yaml("confirmation_delay: 5");

        assert!(matches!(result, Err(ConfigError::Yaml(_))));
    }

    #[test]
    fn malformed_fee_is_rejected() {
        let result = SessionConfig::from_yaml("delivery_fee: \"2.50\"");

        assert!(matches!(
            result,
            Err(ConfigError::Catalog(CatalogError::InvalidPrice(_)))
        ));
    }
}
