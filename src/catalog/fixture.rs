//! Deal Fixtures

use decimal_percentage::Percentage;
use jiff::SignedDuration;
use rust_decimal::{Decimal, prelude::ToPrimitive};
use rusty_money::{
    Money,
    iso::{AUD, Currency, EUR, GBP, NZD, USD},
};
use serde::Deserialize;

use crate::catalog::{CatalogError, Deal};

/// Wrapper for deals in YAML
#[derive(Debug, Deserialize)]
pub struct DealsFixture {
    /// Deals in display order
    pub deals: Vec<DealFixture>,
}

/// Deal Fixture
#[derive(Debug, Deserialize)]
pub struct DealFixture {
    /// Catalog id referenced by views
    pub id: String,

    /// Deal title
    pub title: String,

    /// Business offering the deal
    #[serde(default)]
    pub business: String,

    /// Deal category
    pub category: String,

    /// Price before the surplus discount (e.g., "18.00 AUD")
    pub original_price: String,

    /// Discounted price (e.g., "2.80 AUD")
    pub price: String,

    /// Pickup window shown to customers
    pub pickup_window: String,

    /// Units left
    pub available: u32,

    /// Minutes until the listing ends, counted from catalog load
    #[serde(default)]
    pub listing_minutes: Option<u32>,
}

impl TryFrom<DealFixture> for Deal {
    type Error = CatalogError;

    fn try_from(fixture: DealFixture) -> Result<Self, Self::Error> {
        let (original_minor, original_currency) = parse_price(&fixture.original_price)?;
        let (price_minor, currency) = parse_price(&fixture.price)?;

        if original_currency != currency {
            return Err(CatalogError::CurrencyMismatch(
                original_currency.iso_alpha_code.to_string(),
                currency.iso_alpha_code.to_string(),
            ));
        }

        if price_minor > original_minor {
            return Err(CatalogError::PriceAboveOriginal(fixture.id));
        }

        Ok(Deal {
            id: fixture.id,
            title: fixture.title,
            business: fixture.business,
            category: fixture.category,
            original_price: Money::from_minor(original_minor, original_currency),
            price: Money::from_minor(price_minor, currency),
            pickup_window: fixture.pickup_window,
            available: fixture.available,
            listing_window: fixture
                .listing_minutes
                .map(|minutes| SignedDuration::from_mins(i64::from(minutes))),
        })
    }
}

/// Parse price string (e.g., "2.80 AUD") into minor units and currency
///
/// # Errors
///
/// Returns an error if the string is not in the format "AMOUNT CURRENCY",
/// if the amount cannot be parsed as a decimal, or if the currency code
/// is not recognized.
pub fn parse_price(s: &str) -> Result<(i64, &'static Currency), CatalogError> {
    let mut parts = s.split_whitespace();

    let (Some(amount), Some(currency_code), None) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(CatalogError::InvalidPrice(format!(
            "Expected format 'AMOUNT CURRENCY', got: {s}"
        )));
    };

    let amount = amount
        .parse::<Decimal>()
        .map_err(|_err| CatalogError::InvalidPrice(s.to_string()))?;

    if amount.is_sign_negative() {
        return Err(CatalogError::InvalidPrice(s.to_string()));
    }

    let minor_units = amount
        .checked_mul(Decimal::new(100, 0))
        .and_then(|value| value.round_dp(0).to_i64())
        .ok_or_else(|| CatalogError::InvalidPrice(s.to_string()))?;

    let currency = match currency_code {
        "AUD" => AUD,
        "NZD" => NZD,
        "GBP" => GBP,
        "USD" => USD,
        "EUR" => EUR,
        other => return Err(CatalogError::UnknownCurrency(other.to_string())),
    };

    Ok((minor_units, currency))
}

/// Parse percentage string (e.g., "15%" or "0.15") into a `Percentage`
///
/// # Errors
///
/// Returns an error if the string cannot be parsed as a number.
pub fn parse_percentage(s: &str) -> Result<Percentage, CatalogError> {
    let trimmed = s.trim();

    if let Some(percent_str) = trimmed.strip_suffix('%') {
        let value = percent_str
            .trim()
            .parse::<Decimal>()
            .map_err(|_err| CatalogError::InvalidPercentage(s.to_string()))?;

        Ok(Percentage::from(value / Decimal::ONE_HUNDRED))
    } else {
        let value = trimmed
            .parse::<Decimal>()
            .map_err(|_err| CatalogError::InvalidPercentage(s.to_string()))?;

        Ok(Percentage::from(value))
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn parse_price_reads_amount_and_currency() -> TestResult {
        let (minor, currency) = parse_price("2.80 AUD")?;

        assert_eq!(minor, 280);
        assert_eq!(currency, AUD);

        Ok(())
    }

    #[test]
    fn parse_price_rejects_missing_currency() {
        assert!(matches!(
            parse_price("2.80"),
            Err(CatalogError::InvalidPrice(_))
        ));
    }

    #[test]
    fn parse_price_rejects_trailing_tokens() {
        assert!(matches!(
            parse_price("2.80 AUD extra"),
            Err(CatalogError::InvalidPrice(_))
        ));
    }

    #[test]
    fn parse_price_rejects_negative_amounts() {
        assert!(matches!(
            parse_price("-1.00 AUD"),
            Err(CatalogError::InvalidPrice(_))
        ));
    }

    #[test]
    fn parse_price_rejects_unknown_currency() {
        assert!(matches!(
            parse_price("1.00 XYZ"),
            Err(CatalogError::UnknownCurrency(code)) if code == "XYZ"
        ));
    }

    #[test]
    fn parse_percentage_accepts_both_forms() -> TestResult {
        let expected = Percentage::from(Decimal::new(15, 2));

        assert_eq!(parse_percentage("15%")?, expected);
        assert_eq!(parse_percentage("0.15")?, expected);

        Ok(())
    }

    #[test]
    fn parse_percentage_rejects_garbage() {
        assert!(matches!(
            parse_percentage("lots"),
            Err(CatalogError::InvalidPercentage(_))
        ));
    }

    #[test]
    fn deal_fixture_rejects_price_above_original() {
        let fixture = DealFixture {
            id: "9".to_string(),
            title: "Bread".to_string(),
            business: String::new(),
            category: "Bakery".to_string(),
            original_price: "2.00 AUD".to_string(),
            price: "3.00 AUD".to_string(),
            pickup_window: "5:00 PM - 6:00 PM".to_string(),
            available: 1,
            listing_minutes: None,
        };

        assert!(matches!(
            Deal::try_from(fixture),
            Err(CatalogError::PriceAboveOriginal(id)) if id == "9"
        ));
    }
}
