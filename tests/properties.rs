use std::num::NonZeroU64;

use twofa::{
    hotp::{self, Digits},
    secret,
    store::MemoryStore,
    totp, uri, Account, AccountStore, LoadOutcome, ERROR_CODE,
};

fn thirty() -> NonZeroU64 {
    NonZeroU64::new(30).unwrap()
}

#[test]
fn decode_ignores_case_spacing_and_padding() {
    let canonical = secret::decode("JBSWY3DPEHPK3PXP");

    assert_eq!(secret::decode("jbswy3dpehpk3pxp"), canonical);
    assert_eq!(secret::decode("JBSW Y3DP EHPK 3PXP===="), canonical);
}

#[test]
fn hotp_reference_sequence() {
    let key = b"12345678901234567890";
    let codes: Vec<String> = (0..10)
        .map(|counter| hotp::compute(key, counter, Digits::default()).unwrap())
        .collect();

    assert_eq!(
        codes,
        [
            "755224", "287082", "359152", "969429", "338314", "254676", "287922", "162583",
            "399871", "520489"
        ]
    );
}

#[test]
fn totp_changes_exactly_at_period_boundaries() {
    let secret = "JBSWY3DPEHPK3PXP";
    let start = 1_700_000_010;

    for now in start..start + 120 {
        let here = totp::compute(secret, now, thirty(), Digits::default());
        let next = totp::compute(secret, now + 1, thirty(), Digits::default());

        if (now + 1) % 30 == 0 {
            assert_ne!(here, next, "expected a new code at {}", now + 1);
        } else {
            assert_eq!(here, next, "code changed mid period at {}", now + 1);
        }

        let remaining = totp::remaining(now, thirty());
        assert!((1..=30).contains(&remaining));
    }
}

#[test]
fn unusable_secret_yields_error_code() {
    for secret in ["", "====", "0000 1111", "??"] {
        assert_eq!(
            totp::compute(secret, 1_700_000_000, thirty(), Digits::default()),
            ERROR_CODE
        );
    }
}

#[test]
fn enrollment_uri_for_demo_issuer() {
    assert_eq!(
        uri::build("Demo", "", "JBSWY3DPEHPK3PXP", Digits::default(), thirty()),
        "otpauth://totp/Demo%3A?secret=JBSWY3DPEHPK3PXP&issuer=Demo&digits=6&period=30"
    );
}

#[test]
fn store_lifecycle_persists_every_mutation() {
    let kv = MemoryStore::default();
    let mut store = AccountStore::new(kv.clone());
    assert_eq!(store.load(), LoadOutcome::Absent);

    store.add(Account::new("GitHub", "me", "JBSWY3DPEHPK3PXP")).unwrap();
    store.add(Account::new("Google", "", "MZXW6YTBOI")).unwrap();
    store.add(Account::new("AWS", "root", "GEZDGNBVGY3TQOJQ")).unwrap();
    assert_eq!(store.len(), 3);
    assert_eq!(store.selected_index(), Some(2));

    store.remove(0).unwrap();
    assert_eq!(store.selected_index(), Some(1));
    assert_eq!(store.selected().map(|a| a.issuer.as_str()), Some("AWS"));

    store.edit(0, Account::new("Google", "work", "MZXW6YTBOI")).unwrap();

    let mut reloaded = AccountStore::new(kv.clone());
    assert_eq!(reloaded.load(), LoadOutcome::Loaded(2));
    assert_eq!(reloaded.accounts(), store.accounts());

    store.clear().unwrap();
    let mut reloaded = AccountStore::new(kv);
    assert_eq!(reloaded.load(), LoadOutcome::Loaded(0));
}
