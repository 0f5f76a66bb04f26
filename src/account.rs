use std::num::NonZeroU64;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::{hotp::Digits, secret, totp, uri};

pub const DEFAULT_PERIOD: u64 = 30;

const DEMO_ISSUER: &str = "Demo Account";
const DEMO_SECRET: &str = "JBSWY3DPEHPK3PXP";

pub fn default_period() -> NonZeroU64 {
    NonZeroU64::new(DEFAULT_PERIOD).unwrap_or(NonZeroU64::MIN)
}

// a missing or null text field reads as empty
fn nullable_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn is_default_period(period: &NonZeroU64) -> bool {
    period.get() == DEFAULT_PERIOD
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Issuer must not be empty.")]
    MissingIssuer,

    #[error("Secret must not be empty.")]
    MissingSecret,
}

/// A stored two-factor secret and the parameters its codes are generated
/// with. Default digits and period are left out of the persisted JSON.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    #[serde(default, deserialize_with = "nullable_string")]
    pub issuer: String,

    #[serde(default, deserialize_with = "nullable_string")]
    pub account: String,

    pub secret: String,

    #[serde(default, skip_serializing_if = "Digits::is_default")]
    pub digits: Digits,

    #[serde(default = "default_period", skip_serializing_if = "is_default_period")]
    pub period: NonZeroU64,
}

impl Account {
    pub fn new(issuer: impl Into<String>, account: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            account: account.into(),
            secret: secret.into(),
            digits: Digits::default(),
            period: default_period(),
        }
    }

    pub fn demo() -> Self {
        Self::new(DEMO_ISSUER, "", DEMO_SECRET)
    }

    pub fn with_digits(mut self, digits: Digits) -> Self {
        self.digits = digits;
        self
    }

    pub fn with_period(mut self, period: NonZeroU64) -> Self {
        self.period = period;
        self
    }

    /// Trims the text fields and checks that issuer and secret are present.
    pub fn validated(mut self) -> Result<Self, ValidationError> {
        self.issuer = self.issuer.trim().to_string();
        self.account = self.account.trim().to_string();
        self.secret = self.secret.trim().to_string();

        if self.issuer.is_empty() {
            return Err(ValidationError::MissingIssuer);
        }
        if self.secret.is_empty() {
            return Err(ValidationError::MissingSecret);
        }

        Ok(self)
    }

    /// Whether the secret decodes to a usable key.
    pub fn is_usable(&self) -> bool {
        secret::is_usable(&self.secret)
    }

    pub fn code_at(&self, now: u64) -> String {
        totp::compute(&self.secret, now, self.period, self.digits)
    }

    pub fn remaining_at(&self, now: u64) -> u64 {
        totp::remaining(now, self.period)
    }

    pub fn enrollment_uri(&self) -> String {
        uri::build(
            &self.issuer,
            &self.account,
            &self.secret,
            self.digits,
            self.period,
        )
    }

    pub fn title(&self) -> &str {
        if self.issuer.is_empty() {
            "No name"
        } else {
            &self.issuer
        }
    }

    /// Secondary line: the account label, or a truncated secret when there is none.
    pub fn subtitle(&self) -> String {
        if self.account.is_empty() {
            let prefix: String = self.secret.chars().take(12).collect();
            format!("{}...", prefix)
        } else {
            self.account.clone()
        }
    }

    pub fn initial(&self) -> char {
        self.issuer
            .chars()
            .next()
            .map(|c| c.to_ascii_uppercase())
            .unwrap_or('U')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_trims_and_requires_fields() {
        let account = Account::new("  GitHub ", " me ", " JBSWY3DP ")
            .validated()
            .unwrap();
        assert_eq!(account.issuer, "GitHub");
        assert_eq!(account.account, "me");
        assert_eq!(account.secret, "JBSWY3DP");

        assert_eq!(
            Account::new("   ", "", "JBSWY3DP").validated(),
            Err(ValidationError::MissingIssuer)
        );
        assert_eq!(
            Account::new("GitHub", "", " \t").validated(),
            Err(ValidationError::MissingSecret)
        );
    }

    #[test]
    fn persisted_shape_omits_defaults() {
        let json = serde_json::to_string(&Account::demo()).unwrap();
        assert_eq!(
            json,
            r#"{"issuer":"Demo Account","account":"","secret":"JBSWY3DPEHPK3PXP"}"#
        );

        let custom = Account::demo()
            .with_digits(Digits::new(8).unwrap())
            .with_period(NonZeroU64::new(60).unwrap());
        let json = serde_json::to_string(&custom).unwrap();
        assert!(json.ends_with(r#","digits":8,"period":60}"#));
    }

    #[test]
    fn missing_parameters_take_defaults() {
        let account: Account = serde_json::from_str(r#"{"secret":"JBSWY3DP"}"#).unwrap();
        assert_eq!(account.issuer, "");
        assert_eq!(account.digits.get(), 6);
        assert_eq!(account.period.get(), 30);

        assert!(serde_json::from_str::<Account>(r#"{"secret":"A","period":0}"#).is_err());
        assert!(serde_json::from_str::<Account>(r#"{"issuer":"x"}"#).is_err());
    }

    #[test]
    fn null_text_fields_read_as_empty() {
        let account: Account =
            serde_json::from_str(r#"{"issuer":null,"account":null,"secret":"JBSWY3DP"}"#).unwrap();
        assert_eq!(account.issuer, "");
        assert_eq!(account.account, "");
        assert_eq!(account.title(), "No name");
    }

    #[test]
    fn display_labels() {
        let demo = Account::demo();
        assert_eq!(demo.title(), "Demo Account");
        assert_eq!(demo.subtitle(), "JBSWY3DPEHPK...");
        assert_eq!(demo.initial(), 'D');

        let unnamed = Account::new("", "me@example.com", "JBSWY3DP");
        assert_eq!(unnamed.title(), "No name");
        assert_eq!(unnamed.subtitle(), "me@example.com");
        assert_eq!(unnamed.initial(), 'U');
    }

    #[test]
    fn codes_and_uri() {
        let demo = Account::demo();
        assert_eq!(demo.code_at(59), "996554");
        assert_eq!(demo.remaining_at(59), 1);
        assert_eq!(
            demo.enrollment_uri(),
            "otpauth://totp/Demo%20Account%3A?secret=JBSWY3DPEHPK3PXP&issuer=Demo%20Account&digits=6&period=30"
        );
        assert!(demo.is_usable());
        assert!(!Account::new("x", "", "!!").is_usable());
    }
}
