//! [Entry] is a signed money movement in one currency on one account.
//!
//! Every mutation of the log keeps the balance cache consistent inside the
//! same transaction: creating an entry adds it to its sheaf, while updates
//! and deletions recalculate the sheaves of every account they touched.
mod entity;
pub mod error;
mod repo;

use sqlx::SqlitePool;
use tracing::instrument;

use crate::{account::Accounts, atomic_operation::*, balance::Balances, primitives::*};

pub use entity::*;
use error::*;
use repo::*;

/// Number of entries [`Entries::list_for_account`] returns when no limit is given.
pub const DEFAULT_LIST_LIMIT: i64 = 20;

#[derive(Clone)]
pub struct Entries {
    repo: EntryRepo,
    accounts: Accounts,
    balances: Balances,
    pool: SqlitePool,
}

impl Entries {
    pub(crate) fn new(pool: &SqlitePool, accounts: &Accounts, balances: &Balances) -> Self {
        Self {
            repo: EntryRepo::new(),
            accounts: accounts.clone(),
            balances: balances.clone(),
            pool: pool.clone(),
        }
    }

    #[instrument(name = "frekenbok.entries.create", skip(self), err)]
    pub async fn create(&self, new_entry: NewEntry) -> Result<Entry, EntryError> {
        let mut op = AtomicOperation::init(&self.pool).await?;
        let entry = self.create_in_op(&mut op, new_entry).await?;
        op.commit().await?;
        Ok(entry)
    }

    /// Inserts the entry and adds it to the sheaf of its account and currency.
    pub async fn create_in_op(
        &self,
        op: &mut AtomicOperation<'_>,
        new_entry: NewEntry,
    ) -> Result<Entry, EntryError> {
        let values = new_entry.into_values()?;
        self.repo.insert(op.conn(), &values).await?;
        self.balances.apply_new_entry_in_op(op, &values).await?;
        Ok(Entry::new(values))
    }

    /// Changes the entry and, before returning, recalculates the sheaves of
    /// the account it was on and of the account it is on now.
    #[instrument(name = "frekenbok.entries.update", skip(self, update), err)]
    pub async fn update(
        &self,
        entry_id: EntryId,
        update: impl Into<EntryUpdate>,
    ) -> Result<Entry, EntryError> {
        let mut op = AtomicOperation::init(&self.pool).await?;
        let entry = self.update_in_op(&mut op, entry_id, update).await?;
        op.commit().await?;
        Ok(entry)
    }

    pub async fn update_in_op(
        &self,
        op: &mut AtomicOperation<'_>,
        entry_id: EntryId,
        update: impl Into<EntryUpdate>,
    ) -> Result<Entry, EntryError> {
        let mut entry = self.repo.bump_version(op.conn(), entry_id).await?;
        let old_account_id = entry.account_id();
        let updated_fields = entry.update(update)?;
        if entry.account_id() != old_account_id {
            self.accounts
                .find_by_id_in_op(op, entry.account_id())
                .await?;
        }
        self.repo.update(op.conn(), entry.values()).await?;
        tracing::debug!(%entry_id, ?updated_fields, "updated entry");

        self.balances
            .recalculate_summary_in_op(op, old_account_id)
            .await?;
        if entry.account_id() != old_account_id {
            self.balances
                .recalculate_summary_in_op(op, entry.account_id())
                .await?;
        }
        Ok(entry)
    }

    /// Marks a provisional entry as approved so it starts counting in balances.
    pub async fn approve(&self, entry_id: EntryId) -> Result<Entry, EntryError> {
        let mut update = EntryUpdate::default();
        update.approved(true);
        self.update(entry_id, update).await
    }

    #[instrument(name = "frekenbok.entries.delete", skip(self), err)]
    pub async fn delete(&self, entry_id: EntryId) -> Result<Entry, EntryError> {
        let mut op = AtomicOperation::init(&self.pool).await?;
        let entry = self.delete_in_op(&mut op, entry_id).await?;
        op.commit().await?;
        Ok(entry)
    }

    pub async fn delete_in_op(
        &self,
        op: &mut AtomicOperation<'_>,
        entry_id: EntryId,
    ) -> Result<Entry, EntryError> {
        let entry = self.repo.delete(op.conn(), entry_id).await?;
        self.balances
            .recalculate_summary_in_op(op, entry.account_id())
            .await?;
        Ok(entry)
    }

    #[instrument(name = "frekenbok.entries.find_by_id", skip(self), err)]
    pub async fn find_by_id(&self, entry_id: EntryId) -> Result<Entry, EntryError> {
        let mut conn = self.pool.acquire().await?;
        self.repo.find_by_id(&mut conn, entry_id).await
    }

    /// Latest entries of the account, newest first.
    pub async fn list_for_account(
        &self,
        account_id: AccountId,
        limit: Option<i64>,
    ) -> Result<Vec<Entry>, EntryError> {
        let mut conn = self.pool.acquire().await?;
        self.repo
            .list_for_account(&mut conn, account_id, limit.unwrap_or(DEFAULT_LIST_LIMIT))
            .await
    }

    pub async fn list_for_invoice(&self, invoice_id: InvoiceId) -> Result<Vec<Entry>, EntryError> {
        let mut conn = self.pool.acquire().await?;
        self.repo.list_for_invoice(&mut conn, invoice_id).await
    }

    pub async fn list_for_invoice_in_op(
        &self,
        op: &mut AtomicOperation<'_>,
        invoice_id: InvoiceId,
    ) -> Result<Vec<Entry>, EntryError> {
        self.repo.list_for_invoice(op.conn(), invoice_id).await
    }
}
