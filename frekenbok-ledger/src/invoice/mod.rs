//! [Invoice] groups entries that describe one purchase, receipt or transfer.
//!
//! Verification is derived, never stored: an invoice is verified when the
//! entries referencing it net to zero in every currency. An unverified
//! invoice is logged and kept.
mod entity;
pub mod error;
mod repo;

use rust_decimal::Decimal;
use sqlx::SqlitePool;
use tracing::instrument;

use crate::{
    account::{Account, Accounts},
    atomic_operation::*,
    balance::{sum_by_currency, BalanceSummary, Balances, CurrencyBalance, SumQuery, SumScope},
    entry::{Entries, Entry, NewEntry},
    primitives::*,
};

pub use entity::*;
use error::*;
use repo::*;

#[derive(Clone)]
pub struct Invoices {
    repo: InvoiceRepo,
    accounts: Accounts,
    entries: Entries,
    balances: Balances,
    pool: SqlitePool,
}

impl Invoices {
    pub(crate) fn new(
        pool: &SqlitePool,
        accounts: &Accounts,
        entries: &Entries,
        balances: &Balances,
    ) -> Self {
        Self {
            repo: InvoiceRepo::new(),
            accounts: accounts.clone(),
            entries: entries.clone(),
            balances: balances.clone(),
            pool: pool.clone(),
        }
    }

    #[instrument(name = "frekenbok.invoices.create", skip(self), err)]
    pub async fn create(&self, new_invoice: NewInvoice) -> Result<Invoice, InvoiceError> {
        let mut op = AtomicOperation::init(&self.pool).await?;
        let invoice = self.create_in_op(&mut op, new_invoice).await?;
        op.commit().await?;
        Ok(invoice)
    }

    pub async fn create_in_op(
        &self,
        op: &mut AtomicOperation<'_>,
        new_invoice: NewInvoice,
    ) -> Result<Invoice, InvoiceError> {
        let values = InvoiceValues::from(new_invoice);
        self.repo.insert(op.conn(), &values).await?;
        Ok(Invoice::new(values))
    }

    /// Records the invoice together with its entries in one transaction.
    /// The invoice is persisted even if its entries do not net to zero.
    #[instrument(name = "frekenbok.invoices.create_with_entries", skip(self, new_entries), err)]
    pub async fn create_with_entries(
        &self,
        new_invoice: NewInvoice,
        new_entries: Vec<NewEntry>,
    ) -> Result<(Invoice, Vec<Entry>), InvoiceError> {
        let mut op = AtomicOperation::init(&self.pool).await?;
        let invoice = self.create_in_op(&mut op, new_invoice).await?;
        let mut entries = Vec::with_capacity(new_entries.len());
        for mut new_entry in new_entries {
            new_entry.assign_invoice(invoice.id());
            entries.push(self.entries.create_in_op(&mut op, new_entry).await?);
        }
        self.verify_in_op(&mut op, invoice.id()).await?;
        op.commit().await?;
        Ok((invoice, entries))
    }

    #[instrument(name = "frekenbok.invoices.find_by_id", skip(self), err)]
    pub async fn find_by_id(&self, invoice_id: InvoiceId) -> Result<Invoice, InvoiceError> {
        let mut conn = self.pool.acquire().await?;
        self.repo.find_by_id(&mut conn, invoice_id).await
    }

    pub async fn entries(&self, invoice_id: InvoiceId) -> Result<Vec<Entry>, InvoiceError> {
        self.find_by_id(invoice_id).await?;
        Ok(self.entries.list_for_invoice(invoice_id).await?)
    }

    /// Currencies in which the entries of the invoice do not net to zero,
    /// with the remaining amount. Empty for a verified invoice.
    #[instrument(name = "frekenbok.invoices.verify", skip(self), err)]
    pub async fn verify(
        &self,
        invoice_id: InvoiceId,
    ) -> Result<Vec<CurrencyBalance>, InvoiceError> {
        let mut op = AtomicOperation::init(&self.pool).await?;
        let imbalance = self.verify_in_op(&mut op, invoice_id).await?;
        op.commit().await?;
        Ok(imbalance)
    }

    pub async fn verify_in_op(
        &self,
        op: &mut AtomicOperation<'_>,
        invoice_id: InvoiceId,
    ) -> Result<Vec<CurrencyBalance>, InvoiceError> {
        self.repo.find_by_id(op.conn(), invoice_id).await?;
        let nets = sum_by_currency(op.conn(), &SumQuery::entries(SumScope::Invoice(invoice_id)))
            .await?;
        let imbalance: Vec<_> = nets
            .into_iter()
            .map(|(currency, amount)| CurrencyBalance {
                currency,
                amount: amount.round_dp(DECIMAL_PLACES),
            })
            .filter(|net| net.amount != Decimal::ZERO)
            .collect();
        if !imbalance.is_empty() {
            tracing::warn!(%invoice_id, ?imbalance, "invoice is not verified");
        }
        Ok(imbalance)
    }

    pub async fn is_verified(&self, invoice_id: InvoiceId) -> Result<bool, InvoiceError> {
        Ok(self.verify(invoice_id).await?.is_empty())
    }

    /// Net of the entries on ACCOUNT-type accounts, i.e. what the invoice
    /// actually cost or earned.
    #[instrument(name = "frekenbok.invoices.pnl", skip(self), err)]
    pub async fn pnl(&self, invoice_id: InvoiceId) -> Result<BalanceSummary, InvoiceError> {
        let mut conn = self.pool.acquire().await?;
        self.repo.find_by_id(&mut conn, invoice_id).await?;
        let totals = sum_by_currency(
            &mut conn,
            &SumQuery::entries(SumScope::Invoice(invoice_id)).account_type(AccountType::Account),
        )
        .await?;
        Ok(BalanceSummary::new(totals, self.balances.base_currency()))
    }

    pub async fn incomes(&self, invoice_id: InvoiceId) -> Result<Vec<Account>, InvoiceError> {
        self.touched_accounts(invoice_id, Some(AccountType::Income))
            .await
    }

    pub async fn expenses(&self, invoice_id: InvoiceId) -> Result<Vec<Account>, InvoiceError> {
        self.touched_accounts(invoice_id, Some(AccountType::Expense))
            .await
    }

    pub async fn accounts(&self, invoice_id: InvoiceId) -> Result<Vec<Account>, InvoiceError> {
        self.touched_accounts(invoice_id, Some(AccountType::Account))
            .await
    }

    async fn touched_accounts(
        &self,
        invoice_id: InvoiceId,
        account_type: Option<AccountType>,
    ) -> Result<Vec<Account>, InvoiceError> {
        Ok(self
            .accounts
            .list_for_invoice(invoice_id, account_type)
            .await?)
    }
}
