use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HotpError {
    #[error("Key must contain at least one byte.")]
    EmptyKey,

    #[error("Could not compute HMAC: {0}")]
    Hmac(String),
}
