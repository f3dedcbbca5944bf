use thiserror::Error;

use crate::{
    account::error::AccountError, balance::error::BalanceError, entry::error::EntryError,
    invoice::error::InvoiceError,
};

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("LedgerError - Sqlx: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("LedgerError - Migrate: {0}")]
    SqlxMigrate(#[from] sqlx::migrate::MigrateError),
    #[error("LedgerError - Config: {0}")]
    ConfigError(String),
    #[error("LedgerError - InvalidInput: {0}")]
    InvalidInput(String),
    #[error("LedgerError - AccountError: {0}")]
    AccountError(#[from] AccountError),
    #[error("LedgerError - EntryError: {0}")]
    EntryError(#[from] EntryError),
    #[error("LedgerError - BalanceError: {0}")]
    BalanceError(#[from] BalanceError),
    #[error("LedgerError - InvoiceError: {0}")]
    InvoiceError(#[from] InvoiceError),
}
