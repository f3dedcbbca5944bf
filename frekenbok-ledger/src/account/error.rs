use thiserror::Error;

use crate::primitives::*;

#[derive(Error, Debug)]
pub enum AccountError {
    #[error("AccountError - Sqlx: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("AccountError - CouldNotFindById: {0}")]
    CouldNotFindById(AccountId),
    #[error("AccountError - CycleError: account {0} cannot be moved under {1}, which lies in its own subtree")]
    Cycle(AccountId, AccountId),
    #[error("AccountError - CorruptTreeError: {0}")]
    CorruptTree(String),
    #[error("AccountError - HasEntries: account {0} or one of its descendants is referenced by entries")]
    HasEntries(AccountId),
}
