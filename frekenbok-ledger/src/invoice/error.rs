use thiserror::Error;

use crate::{
    account::error::AccountError, balance::error::BalanceError, entry::error::EntryError,
    primitives::*,
};

#[derive(Error, Debug)]
pub enum InvoiceError {
    #[error("InvoiceError - Sqlx: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("InvoiceError - NotFound: {0}")]
    NotFound(InvoiceId),
    #[error("InvoiceError - EntryError: {0}")]
    EntryError(#[from] EntryError),
    #[error("InvoiceError - BalanceError: {0}")]
    BalanceError(#[from] BalanceError),
    #[error("InvoiceError - AccountError: {0}")]
    AccountError(#[from] AccountError),
}
