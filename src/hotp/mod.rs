//! HMAC-based one-time passwords (RFC 4226).

mod error;
mod util;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use self::error::HotpError;
use self::util::get_hotp;

pub const MIN_DIGITS: u8 = 6;
pub const MAX_DIGITS: u8 = 8;

/// Number of decimal digits in a rendered code, always within
/// `MIN_DIGITS..=MAX_DIGITS`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Digits(u8);

impl Default for Digits {
    fn default() -> Self {
        Self(MIN_DIGITS)
    }
}

impl Digits {
    pub fn new(digits: u8) -> Option<Self> {
        if (MIN_DIGITS..=MAX_DIGITS).contains(&digits) {
            Some(Self(digits))
        } else {
            None
        }
    }

    pub fn get(&self) -> u8 {
        self.0
    }

    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

impl TryFrom<u8> for Digits {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| {
            format!(
                "digits must be between {} and {}, got {}",
                MIN_DIGITS, MAX_DIGITS, value
            )
        })
    }
}

impl From<Digits> for u8 {
    fn from(digits: Digits) -> Self {
        digits.0
    }
}

impl fmt::Display for Digits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Numeric HOTP value for `counter`, before zero padding.
pub fn compute_value(key: &[u8], counter: u64, digits: Digits) -> Result<u32, HotpError> {
    get_hotp(key, counter, digits)
}

/// HOTP code for `counter`, left padded with zeros to exactly `digits`
/// characters.
pub fn compute(key: &[u8], counter: u64, digits: Digits) -> Result<String, HotpError> {
    let value = compute_value(key, counter, digits)?;

    Ok(format!("{:0width$}", value, width = digits.get() as usize))
}
