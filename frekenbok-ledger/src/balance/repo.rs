use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::SqliteConnection;
use tracing::instrument;

use crate::primitives::*;

use super::{aggregate::parse_amount, error::BalanceError};

/// Storage of the balance cache, one sheaf per (account, currency).
#[derive(Debug, Clone, Default)]
pub(super) struct SheafRepo {}

impl SheafRepo {
    pub fn new() -> Self {
        Self {}
    }

    pub async fn find(
        &self,
        db: &mut SqliteConnection,
        account_id: AccountId,
        currency: Currency,
    ) -> Result<Option<Decimal>, BalanceError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT amount FROM sheaves WHERE account_id = ? AND currency = ?")
                .bind(account_id)
                .bind(currency.code())
                .fetch_optional(&mut *db)
                .await?;
        row.map(|(amount,)| parse_amount(&amount)).transpose()
    }

    #[instrument(level = "trace", name = "frekenbok.balances.insert_sheaf", skip(self, db), err)]
    pub async fn insert(
        &self,
        db: &mut SqliteConnection,
        account_id: AccountId,
        currency: Currency,
        amount: Decimal,
    ) -> Result<(), BalanceError> {
        let result = sqlx::query(
            "INSERT INTO sheaves (account_id, currency, amount, modified_at) VALUES (?, ?, ?, ?)",
        )
        .bind(account_id)
        .bind(currency.code())
        .bind(amount.to_string())
        .bind(Utc::now())
        .execute(&mut *db)
        .await;
        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
                Err(BalanceError::DuplicateBalanceRow(account_id, currency))
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn update_amount(
        &self,
        db: &mut SqliteConnection,
        account_id: AccountId,
        currency: Currency,
        amount: Decimal,
    ) -> Result<(), BalanceError> {
        sqlx::query(
            "UPDATE sheaves SET amount = ?, modified_at = ? WHERE account_id = ? AND currency = ?",
        )
        .bind(amount.to_string())
        .bind(Utc::now())
        .bind(account_id)
        .bind(currency.code())
        .execute(&mut *db)
        .await?;
        Ok(())
    }

    pub async fn delete_for_account(
        &self,
        db: &mut SqliteConnection,
        account_id: AccountId,
    ) -> Result<u64, BalanceError> {
        let result = sqlx::query("DELETE FROM sheaves WHERE account_id = ?")
            .bind(account_id)
            .execute(&mut *db)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_all(&self, db: &mut SqliteConnection) -> Result<u64, BalanceError> {
        let result = sqlx::query("DELETE FROM sheaves")
            .execute(&mut *db)
            .await?;
        Ok(result.rows_affected())
    }

    /// Accounts that currently have at least one entry, approved or not.
    pub async fn accounts_with_entries(
        &self,
        db: &mut SqliteConnection,
    ) -> Result<Vec<AccountId>, BalanceError> {
        let rows: Vec<(AccountId,)> = sqlx::query_as("SELECT DISTINCT account_id FROM entries")
            .fetch_all(&mut *db)
            .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use sqlx::sqlite::SqlitePoolOptions;

    use crate::{primitives::*, FrekenbokLedger, FrekenbokLedgerConfig};

    use super::*;

    #[tokio::test]
    async fn second_sheaf_for_a_currency_is_a_duplicate() -> anyhow::Result<()> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        let config = FrekenbokLedgerConfig::builder()
            .pool(pool.clone())
            .exec_migrations(true)
            .build()?;
        let ledger = FrekenbokLedger::init(config).await?;
        let wallet = ledger
            .create_account("Wallet", AccountType::Account, None)
            .await?;
        let rub: Currency = "RUB".parse()?;

        let repo = SheafRepo::new();
        let mut conn = pool.acquire().await?;
        repo.insert(&mut conn, wallet.id(), rub, Decimal::ONE).await?;
        let res = repo.insert(&mut conn, wallet.id(), rub, Decimal::TWO).await;
        assert!(matches!(
            res,
            Err(BalanceError::DuplicateBalanceRow(account_id, currency))
                if account_id == wallet.id() && currency == rub
        ));
        assert_eq!(repo.find(&mut conn, wallet.id(), rub).await?, Some(Decimal::ONE));
        Ok(())
    }
}
