//! `otpauth://` enrollment URIs, handed to whatever renders the QR image.

use std::num::NonZeroU64;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::hotp::Digits;

// Characters a URI component may carry unescaped, as in
// `encodeURIComponent`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

pub fn label(issuer: &str, account: &str) -> String {
    if issuer.is_empty() {
        account.to_string()
    } else {
        format!("{}:{}", issuer, account)
    }
}

/// Renders the enrollment URI. No field is validated.
pub fn build(
    issuer: &str,
    account: &str,
    secret: &str,
    digits: Digits,
    period: NonZeroU64,
) -> String {
    format!(
        "otpauth://totp/{}?secret={}&issuer={}&digits={}&period={}",
        utf8_percent_encode(&label(issuer, account), COMPONENT),
        utf8_percent_encode(secret, COMPONENT),
        utf8_percent_encode(issuer, COMPONENT),
        digits,
        period
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thirty() -> NonZeroU64 {
        NonZeroU64::new(30).unwrap()
    }

    #[test]
    fn issuer_without_account() {
        assert_eq!(
            build("Demo", "", "JBSWY3DPEHPK3PXP", Digits::default(), thirty()),
            "otpauth://totp/Demo%3A?secret=JBSWY3DPEHPK3PXP&issuer=Demo&digits=6&period=30"
        );
    }

    #[test]
    fn account_without_issuer() {
        assert_eq!(
            build("", "alice@example.com", "JBSWY3DP", Digits::default(), thirty()),
            "otpauth://totp/alice%40example.com?secret=JBSWY3DP&issuer=&digits=6&period=30"
        );
    }

    #[test]
    fn components_are_encoded_independently() {
        let uri = build(
            "Acme & Co",
            "bob smith",
            "JBSW Y3DP",
            Digits::new(8).unwrap(),
            NonZeroU64::new(60).unwrap(),
        );
        assert_eq!(
            uri,
            "otpauth://totp/Acme%20%26%20Co%3Abob%20smith?secret=JBSW%20Y3DP&issuer=Acme%20%26%20Co&digits=8&period=60"
        );
    }

    #[test]
    fn unreserved_marks_pass_through() {
        assert_eq!(
            utf8_percent_encode("a-b_c.d!e~f*g'h(i)", COMPONENT).to_string(),
            "a-b_c.d!e~f*g'h(i)"
        );
        assert_eq!(
            utf8_percent_encode("é/?#", COMPONENT).to_string(),
            "%C3%A9%2F%3F%23"
        );
    }

    #[test]
    fn label_rules() {
        assert_eq!(label("GitHub", "me"), "GitHub:me");
        assert_eq!(label("", "me"), "me");
        assert_eq!(label("", ""), "");
    }
}
