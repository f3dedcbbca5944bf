use thiserror::Error;

use crate::{account::error::AccountError, balance::error::BalanceError, primitives::*};

#[derive(Error, Debug)]
pub enum EntryError {
    #[error("EntryError - Sqlx: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("EntryError - NotFound: {0}")]
    NotFound(EntryId),
    #[error("EntryError - {0}")]
    UnknownCurrency(#[from] UnknownCurrencyError),
    #[error("EntryError - CorruptAmount: could not parse stored value '{0}'")]
    CorruptAmount(String),
    #[error("EntryError - DanglingReference: account {0} or invoice {1:?} does not exist")]
    DanglingReference(AccountId, Option<InvoiceId>),
    #[error("EntryError - AccountError: {0}")]
    AccountError(#[from] AccountError),
    #[error("EntryError - BalanceError: {0}")]
    BalanceError(#[from] BalanceError),
}
