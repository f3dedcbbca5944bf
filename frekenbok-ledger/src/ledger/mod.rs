pub mod config;
pub mod error;

use chrono::NaiveDate;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use tracing::instrument;

use std::str::FromStr;

pub use config::*;
use error::*;

use crate::{
    account::{Account, Accounts, NewAccount},
    atomic_operation::*,
    balance::{BalanceSummary, Balances, CurrencyBalance},
    entry::{Entries, Entry, EntryUpdate, NewEntry},
    invoice::{Invoice, Invoices, NewInvoice},
    migrate,
    primitives::*,
};

#[derive(Clone)]
pub struct FrekenbokLedger {
    pool: SqlitePool,
    accounts: Accounts,
    entries: Entries,
    balances: Balances,
    invoices: Invoices,
}

impl FrekenbokLedger {
    pub async fn init(config: FrekenbokLedgerConfig) -> Result<Self, LedgerError> {
        let base_currency = Currency::from_str(&config.base_currency)
            .map_err(|e| LedgerError::ConfigError(e.to_string()))?;
        let pool = match (config.pool, config.db_url) {
            (Some(pool), None) => pool,
            (None, Some(db_url)) => {
                let options = SqliteConnectOptions::from_str(&db_url)?.create_if_missing(true);
                let mut pool_opts = SqlitePoolOptions::new();
                if db_url.contains(":memory:") {
                    // every connection would open its own empty database
                    pool_opts = pool_opts
                        .max_connections(1)
                        .idle_timeout(None)
                        .max_lifetime(None);
                } else if let Some(max_connections) = config.max_connections {
                    pool_opts = pool_opts.max_connections(max_connections);
                }
                pool_opts.connect_with(options).await?
            }
            _ => {
                return Err(LedgerError::ConfigError(
                    "One of db_url or pool must be set".to_string(),
                ))
            }
        };
        if config.exec_migrations {
            migrate::run(&pool).await?;
        }

        let accounts = Accounts::new(&pool);
        let balances = Balances::new(&pool, &accounts, base_currency);
        let entries = Entries::new(&pool, &accounts, &balances);
        let invoices = Invoices::new(&pool, &accounts, &entries, &balances);
        tracing::info!(%base_currency, "frekenbok ledger initialized");
        Ok(Self {
            pool,
            accounts,
            entries,
            balances,
            invoices,
        })
    }

    pub fn accounts(&self) -> &Accounts {
        &self.accounts
    }

    pub fn entries(&self) -> &Entries {
        &self.entries
    }

    pub fn balances(&self) -> &Balances {
        &self.balances
    }

    pub fn invoices(&self) -> &Invoices {
        &self.invoices
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Opens a transaction that several `*_in_op` calls can share.
    pub async fn begin_op(&self) -> Result<AtomicOperation<'static>, LedgerError> {
        Ok(AtomicOperation::init(&self.pool).await?)
    }

    #[instrument(name = "frekenbok.create_account", skip(self), err)]
    pub async fn create_account(
        &self,
        title: &str,
        account_type: AccountType,
        parent: Option<AccountId>,
    ) -> Result<Account, LedgerError> {
        let mut builder = NewAccount::builder();
        builder.title(title).account_type(account_type);
        if let Some(parent) = parent {
            builder.parent(parent);
        }
        let new_account = builder
            .build()
            .map_err(|e| LedgerError::InvalidInput(e.to_string()))?;
        Ok(self.accounts.create(new_account).await?)
    }

    /// Records an entry and adds it to the balance cache when approved.
    #[instrument(name = "frekenbok.create_entry", skip(self), err)]
    pub async fn create_entry(&self, new_entry: NewEntry) -> Result<Entry, LedgerError> {
        Ok(self.entries.create(new_entry).await?)
    }

    pub async fn update_entry(
        &self,
        entry_id: EntryId,
        update: impl Into<EntryUpdate>,
    ) -> Result<Entry, LedgerError> {
        Ok(self.entries.update(entry_id, update).await?)
    }

    pub async fn delete_entry(&self, entry_id: EntryId) -> Result<(), LedgerError> {
        self.entries.delete(entry_id).await?;
        Ok(())
    }

    pub async fn create_invoice(&self, new_invoice: NewInvoice) -> Result<Invoice, LedgerError> {
        Ok(self.invoices.create(new_invoice).await?)
    }

    pub async fn verify_invoice(
        &self,
        invoice_id: InvoiceId,
    ) -> Result<Vec<CurrencyBalance>, LedgerError> {
        Ok(self.invoices.verify(invoice_id).await?)
    }

    pub async fn current_balance(
        &self,
        account_id: AccountId,
    ) -> Result<BalanceSummary, LedgerError> {
        Ok(self.balances.current_balance(account_id).await?)
    }

    pub async fn subtree_balance(
        &self,
        account_id: AccountId,
        as_of: Option<NaiveDate>,
    ) -> Result<BalanceSummary, LedgerError> {
        Ok(self.balances.subtree_balance(account_id, as_of).await?)
    }

    pub async fn recalculate_summary(
        &self,
        account_id: AccountId,
    ) -> Result<BalanceSummary, LedgerError> {
        Ok(self.balances.recalculate_summary(account_id).await?)
    }
}
