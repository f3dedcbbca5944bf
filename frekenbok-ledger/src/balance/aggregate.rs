use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use tracing::instrument;

use std::collections::BTreeMap;

use crate::{account::TreePosition, primitives::*};

use super::error::BalanceError;

/// Which table the amounts are read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SumSource {
    /// The entry log itself. Supports date and approval predicates.
    Entries,
    /// The cached sheaves. Only reflect the current state of approved entries.
    Sheaves,
}

/// Set of accounts (or entries) that contribute to a sum.
#[derive(Debug, Clone, Copy)]
pub(crate) enum SumScope {
    Account(AccountId),
    Subtree(TreePosition),
    /// Entries grouped under one invoice. Only meaningful for [`SumSource::Entries`].
    Invoice(InvoiceId),
    All,
}

/// The one aggregation every balance report is built on: amounts grouped by
/// currency, filtered by an account set and optional date, approval and
/// account attribute predicates.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SumQuery {
    pub source: SumSource,
    pub scope: SumScope,
    pub as_of: Option<NaiveDate>,
    pub approved_only: bool,
    pub account_type: Option<AccountType>,
    pub leaves_only: bool,
    pub open_on: Option<NaiveDate>,
}

impl SumQuery {
    pub fn entries(scope: SumScope) -> Self {
        Self {
            source: SumSource::Entries,
            scope,
            as_of: None,
            approved_only: false,
            account_type: None,
            leaves_only: false,
            open_on: None,
        }
    }

    pub fn sheaves(scope: SumScope) -> Self {
        Self {
            source: SumSource::Sheaves,
            ..Self::entries(scope)
        }
    }

    pub fn approved_only(mut self) -> Self {
        self.approved_only = true;
        self
    }

    pub fn as_of(mut self, date: NaiveDate) -> Self {
        self.as_of = Some(date);
        self
    }

    pub fn account_type(mut self, account_type: AccountType) -> Self {
        self.account_type = Some(account_type);
        self
    }

    pub fn open_leaves_on(mut self, date: NaiveDate) -> Self {
        self.leaves_only = true;
        self.open_on = Some(date);
        self
    }

    fn build(&self) -> QueryBuilder<'static, Sqlite> {
        let table = match self.source {
            SumSource::Entries => "entries",
            SumSource::Sheaves => "sheaves",
        };
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT s.currency, s.amount FROM {table} s JOIN accounts a ON a.id = s.account_id WHERE 1 = 1"
        ));
        match self.scope {
            SumScope::Account(account_id) => {
                query.push(" AND s.account_id = ").push_bind(account_id);
            }
            SumScope::Subtree(position) => {
                query
                    .push(" AND a.tree_id = ")
                    .push_bind(position.tree_id)
                    .push(" AND a.lft >= ")
                    .push_bind(position.lft)
                    .push(" AND a.rgt <= ")
                    .push_bind(position.rgt);
            }
            SumScope::Invoice(invoice_id) => {
                debug_assert_eq!(self.source, SumSource::Entries);
                query.push(" AND s.invoice_id = ").push_bind(invoice_id);
            }
            SumScope::All => (),
        }
        if self.source == SumSource::Entries {
            if self.approved_only {
                query.push(" AND s.approved = TRUE");
            }
            if let Some(as_of) = self.as_of {
                query.push(" AND s.date <= ").push_bind(as_of);
            }
        }
        if let Some(account_type) = self.account_type {
            query.push(" AND a.account_type = ").push_bind(account_type);
        }
        if self.leaves_only {
            query.push(" AND a.rgt = a.lft + 1");
        }
        if let Some(open_on) = self.open_on {
            query
                .push(" AND (a.closed IS NULL OR a.closed >= ")
                .push_bind(open_on)
                .push(")");
        }
        query
    }
}

/// Runs the query and folds the amounts per currency with exact decimal
/// arithmetic. A currency is present in the result as soon as one row
/// matched, even if its total is zero.
#[instrument(level = "trace", name = "frekenbok.balances.sum_by_currency", skip(db), err)]
pub(crate) async fn sum_by_currency(
    db: &mut SqliteConnection,
    sum: &SumQuery,
) -> Result<BTreeMap<Currency, Decimal>, BalanceError> {
    let mut query = sum.build();
    let rows: Vec<(String, String)> = query.build_query_as().fetch_all(&mut *db).await?;
    let mut totals = BTreeMap::new();
    for (currency, amount) in rows {
        let currency: Currency = currency.parse()?;
        let amount = parse_amount(&amount)?;
        *totals.entry(currency).or_insert(Decimal::ZERO) += amount;
    }
    Ok(totals)
}

pub(crate) fn parse_amount(raw: &str) -> Result<Decimal, BalanceError> {
    raw.parse()
        .map_err(|_| BalanceError::CorruptAmount(raw.to_string()))
}
