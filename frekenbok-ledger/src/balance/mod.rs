//! Balance cache and aggregation queries.
//!
//! A sheaf caches the sum of the approved entries of one account in one
//! currency. New approved entries are added to their sheaf directly; any
//! other change to the entry log replaces the sheaves of the touched
//! accounts wholesale from the log.
mod aggregate;
pub mod error;
mod repo;

use chrono::NaiveDate;
use sqlx::SqlitePool;
use tracing::instrument;

pub use frekenbok_types::balance::*;

use crate::{account::Accounts, atomic_operation::*, entry::EntryValues, primitives::*};

pub(crate) use aggregate::{sum_by_currency, SumQuery, SumScope};
use error::BalanceError;
use repo::SheafRepo;

#[derive(Clone)]
pub struct Balances {
    repo: SheafRepo,
    accounts: Accounts,
    pool: SqlitePool,
    base_currency: Currency,
}

impl Balances {
    pub(crate) fn new(pool: &SqlitePool, accounts: &Accounts, base_currency: Currency) -> Self {
        Self {
            repo: SheafRepo::new(),
            accounts: accounts.clone(),
            pool: pool.clone(),
            base_currency,
        }
    }

    pub fn base_currency(&self) -> Currency {
        self.base_currency
    }

    /// Cached balance of the account itself, descendants excluded.
    #[instrument(name = "frekenbok.balances.current_balance", skip(self), err)]
    pub async fn current_balance(
        &self,
        account_id: AccountId,
    ) -> Result<BalanceSummary, BalanceError> {
        self.accounts.find_by_id(account_id).await?;
        self.summarize(SumQuery::sheaves(SumScope::Account(account_id)))
            .await
    }

    /// Cached balance of the account and all of its descendants.
    #[instrument(name = "frekenbok.balances.tree_summary", skip(self), err)]
    pub async fn tree_summary(
        &self,
        account_id: AccountId,
    ) -> Result<BalanceSummary, BalanceError> {
        let position = self.accounts.find_by_id(account_id).await?.position();
        self.summarize(SumQuery::sheaves(SumScope::Subtree(position)))
            .await
    }

    /// Balance of the account and its descendants recomputed from the entry
    /// log, counting approved entries dated on or before `as_of`.
    #[instrument(name = "frekenbok.balances.summary_at", skip(self), err)]
    pub async fn summary_at(
        &self,
        account_id: AccountId,
        as_of: NaiveDate,
    ) -> Result<BalanceSummary, BalanceError> {
        let position = self.accounts.find_by_id(account_id).await?.position();
        self.summarize(
            SumQuery::entries(SumScope::Subtree(position))
                .approved_only()
                .as_of(as_of),
        )
        .await
    }

    /// [`Self::tree_summary`] without a date, [`Self::summary_at`] with one.
    pub async fn subtree_balance(
        &self,
        account_id: AccountId,
        as_of: Option<NaiveDate>,
    ) -> Result<BalanceSummary, BalanceError> {
        match as_of {
            Some(date) => self.summary_at(account_id, date).await,
            None => self.tree_summary(account_id).await,
        }
    }

    /// Cached total over the open childless ACCOUNT-type accounts.
    #[instrument(name = "frekenbok.balances.dashboard_total", skip(self), err)]
    pub async fn dashboard_total(&self, on: NaiveDate) -> Result<BalanceSummary, BalanceError> {
        self.summarize(
            SumQuery::sheaves(SumScope::All)
                .account_type(AccountType::Account)
                .open_leaves_on(on),
        )
        .await
    }

    /// Replaces the sheaves of the account with fresh sums over its approved entries.
    #[instrument(name = "frekenbok.balances.recalculate_summary", skip(self), err)]
    pub async fn recalculate_summary(
        &self,
        account_id: AccountId,
    ) -> Result<BalanceSummary, BalanceError> {
        let mut op = AtomicOperation::init(&self.pool).await?;
        let summary = self.recalculate_summary_in_op(&mut op, account_id).await?;
        op.commit().await?;
        Ok(summary)
    }

    pub async fn recalculate_summary_in_op(
        &self,
        op: &mut AtomicOperation<'_>,
        account_id: AccountId,
    ) -> Result<BalanceSummary, BalanceError> {
        let n_deleted = self.repo.delete_for_account(op.conn(), account_id).await?;
        self.accounts.find_by_id_in_op(op, account_id).await?;
        let totals = sum_by_currency(
            op.conn(),
            &SumQuery::entries(SumScope::Account(account_id)).approved_only(),
        )
        .await?;
        for (currency, amount) in totals.iter() {
            self.repo
                .insert(op.conn(), account_id, *currency, *amount)
                .await?;
        }
        tracing::debug!(%account_id, n_deleted, n_written = totals.len(), "recalculated sheaves");
        Ok(BalanceSummary::new(totals, self.base_currency))
    }

    /// Drops the whole cache and rebuilds it from the entry log in one
    /// transaction. Returns the number of accounts that have entries.
    #[instrument(name = "frekenbok.balances.recalculate_all", skip(self), err)]
    pub async fn recalculate_all(&self) -> Result<usize, BalanceError> {
        let mut op = AtomicOperation::init(&self.pool).await?;
        let n_deleted = self.repo.delete_all(op.conn()).await?;
        let account_ids = self.repo.accounts_with_entries(op.conn()).await?;
        for account_id in account_ids.iter() {
            self.recalculate_summary_in_op(&mut op, *account_id).await?;
        }
        op.commit().await?;
        tracing::info!(n_deleted, n_accounts = account_ids.len(), "rebuilt balance cache");
        Ok(account_ids.len())
    }

    /// Adds a freshly inserted entry to its sheaf. Unapproved entries are
    /// not cached.
    pub(crate) async fn apply_new_entry_in_op(
        &self,
        op: &mut AtomicOperation<'_>,
        entry: &EntryValues,
    ) -> Result<(), BalanceError> {
        if !entry.approved {
            return Ok(());
        }
        match self
            .repo
            .find(op.conn(), entry.account_id, entry.currency)
            .await?
        {
            Some(amount) => {
                self.repo
                    .update_amount(
                        op.conn(),
                        entry.account_id,
                        entry.currency,
                        amount + entry.amount,
                    )
                    .await
            }
            None => {
                self.repo
                    .insert(op.conn(), entry.account_id, entry.currency, entry.amount)
                    .await
            }
        }
    }

    async fn summarize(&self, sum: SumQuery) -> Result<BalanceSummary, BalanceError> {
        let mut conn = self.pool.acquire().await?;
        let totals = sum_by_currency(&mut conn, &sum).await?;
        Ok(BalanceSummary::new(totals, self.base_currency))
    }
}
