//! Multi-account TOTP authenticator: base32 secrets, RFC 4226/6238 codes,
//! `otpauth://` enrollment URIs, a persisted account list, and a refresh
//! scheduler that keeps the displayed code current without races.

pub mod account;
pub mod config;
pub mod error;
pub mod hotp;
pub mod scheduler;
pub mod secret;
pub mod store;
pub mod totp;
pub mod uri;

use std::time::Duration;

pub use account::Account;
pub use error::{AppError, AppResult};
pub use store::{AccountStore, LoadOutcome, SharedStore};

/// Name of the rkv store holding the account list.
pub const SERVICE_NAME: &str = "dev.twofa";

pub const STORAGE_KEY: &str = "twofa_accounts_v1";

/// Shown while no account is selected.
pub const PLACEHOLDER_CODE: &str = "------";

/// Shown when a code cannot be computed from the selected account's secret.
pub const ERROR_CODE: &str = "ERR";

pub const REFRESH_INTERVAL: Duration = Duration::from_secs(1);
