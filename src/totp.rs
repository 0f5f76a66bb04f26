//! Time-based one-time passwords (RFC 6238) on top of [`crate::hotp`].

use std::{
    num::NonZeroU64,
    time::{SystemTime, UNIX_EPOCH},
};

use thiserror::Error;
use tracing::debug;

use crate::{
    hotp::{self, Digits, HotpError},
    secret, ERROR_CODE,
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TotpError {
    #[error("Secret does not decode to any key bytes.")]
    Decode,

    #[error("{0}")]
    Computation(#[from] HotpError),
}

/// Source of wall-clock seconds since the unix epoch.
pub trait Clock: Send + Sync {
    fn now(&self) -> u64;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        now_seconds()
    }
}

/// Seconds since the unix epoch. A clock set before the epoch reads as 0.
pub fn now_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}

pub fn counter(now: u64, period: NonZeroU64) -> u64 {
    now / period
}

/// Seconds until the code for `now` expires, always in `1..=period`.
pub fn remaining(now: u64, period: NonZeroU64) -> u64 {
    period.get() - now % period
}

pub fn try_compute(
    secret: &str,
    now: u64,
    period: NonZeroU64,
    digits: Digits,
) -> Result<String, TotpError> {
    let key = secret::decode(secret);
    if key.is_empty() {
        return Err(TotpError::Decode);
    }

    Ok(hotp::compute(&key, counter(now, period), digits)?)
}

/// The code valid at `now`, or [`ERROR_CODE`] if the secret is unusable.
pub fn compute(secret: &str, now: u64, period: NonZeroU64, digits: Digits) -> String {
    try_compute(secret, now, period, digits).unwrap_or_else(|err| {
        debug!(%err, "could not compute code");
        ERROR_CODE.to_string()
    })
}
