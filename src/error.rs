use crate::{account::ValidationError, store::KvError, store::StoreError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    StoreError(#[from] StoreError),

    #[error("{0}")]
    KvError(#[from] KvError),

    #[error("{0}")]
    ValidationError(#[from] ValidationError),

    #[error("{0}")]
    IOError(#[from] std::io::Error),

    #[error("{0}")]
    PromptError(#[from] inquire::InquireError),

    #[error("Could not copy to the clipboard: {0}")]
    ClipboardError(String),

    #[error("{0}")]
    GenericError(String),
}

pub type AppResult<T> = Result<T, AppError>;
