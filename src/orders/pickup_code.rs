//! Pickup Codes

use std::{fmt, str::FromStr};

#[cfg(test)]
use mockall::automock;
use rand::{Rng, SeedableRng, rngs::StdRng};
use thiserror::Error;

/// A string that is not two uppercase letters followed by four digits.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid pickup code: {0}")]
pub struct InvalidPickupCode(pub String);

/// Code a customer shows to collect an order, e.g. `AB1234`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PickupCode(String);

impl PickupCode {
    /// The code as shown to customers.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for PickupCode {
    type Err = InvalidPickupCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();

        let valid = bytes.len() == 6
            && bytes.iter().take(2).all(u8::is_ascii_uppercase)
            && bytes.iter().skip(2).all(u8::is_ascii_digit);

        if valid {
            Ok(PickupCode(s.to_string()))
        } else {
            Err(InvalidPickupCode(s.to_string()))
        }
    }
}

impl fmt::Display for PickupCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where new pickup codes come from.
#[cfg_attr(test, automock)]
pub trait PickupCodeSource {
    /// Draw the next candidate code. Uniqueness is checked by the caller.
    fn next_code(&mut self) -> PickupCode;
}

/// Pickup codes drawn from a standard RNG.
#[derive(Debug, Clone)]
pub struct RandomPickupCodes {
    rng: StdRng,
}

impl RandomPickupCodes {
    /// Seed from the operating system.
    #[must_use]
    pub fn from_entropy() -> Self {
        RandomPickupCodes {
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible codes for a given seed.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        RandomPickupCodes {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl PickupCodeSource for RandomPickupCodes {
    fn next_code(&mut self) -> PickupCode {
        let first = self.rng.gen_range(b'A'..=b'Z');
        let second = self.rng.gen_range(b'A'..=b'Z');
        let number = self.rng.gen_range(0..10_000_u16);

        PickupCode(format!(
            "{}{}{number:04}",
            char::from(first),
            char::from(second)
        ))
    }
}
