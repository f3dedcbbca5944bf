use thiserror::Error;

use crate::{account::error::AccountError, primitives::*};

#[derive(Error, Debug)]
pub enum BalanceError {
    #[error("BalanceError - Sqlx: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("BalanceError - DuplicateBalanceRowError: a sheaf for account {0} in {1} already exists")]
    DuplicateBalanceRow(AccountId, Currency),
    #[error("BalanceError - CorruptAmount: could not parse stored amount '{0}'")]
    CorruptAmount(String),
    #[error("BalanceError - UnknownCurrency: {0}")]
    UnknownCurrency(#[from] UnknownCurrencyError),
    #[error("BalanceError - AccountError: {0}")]
    AccountError(#[from] AccountError),
}
