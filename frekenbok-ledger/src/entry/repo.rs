use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::SqliteConnection;

use crate::primitives::*;

use super::{entity::*, error::EntryError};

const ENTRY_COLUMNS: &str =
    "id, version, date, approved, account_id, amount, currency, quantity, unit, invoice_id, comment";

#[derive(sqlx::FromRow)]
struct EntryRow {
    id: EntryId,
    version: i64,
    date: NaiveDate,
    approved: bool,
    account_id: AccountId,
    amount: String,
    currency: String,
    quantity: Option<String>,
    unit: Option<String>,
    invoice_id: Option<InvoiceId>,
    comment: String,
}

fn parse_decimal(raw: &str) -> Result<Decimal, EntryError> {
    raw.parse()
        .map_err(|_| EntryError::CorruptAmount(raw.to_string()))
}

impl TryFrom<EntryRow> for Entry {
    type Error = EntryError;

    fn try_from(row: EntryRow) -> Result<Self, Self::Error> {
        Ok(Entry::new(EntryValues {
            id: row.id,
            version: row.version,
            date: row.date,
            approved: row.approved,
            account_id: row.account_id,
            amount: parse_decimal(&row.amount)?,
            currency: row.currency.parse()?,
            quantity: row.quantity.as_deref().map(parse_decimal).transpose()?,
            unit: row.unit,
            invoice_id: row.invoice_id,
            comment: row.comment,
        }))
    }
}

fn into_entries(rows: Vec<EntryRow>) -> Result<Vec<Entry>, EntryError> {
    rows.into_iter().map(Entry::try_from).collect()
}

fn map_write_error(err: sqlx::Error, values: &EntryValues) -> EntryError {
    match err {
        sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
            EntryError::DanglingReference(values.account_id, values.invoice_id)
        }
        err => err.into(),
    }
}

#[derive(Debug, Clone, Default)]
pub(super) struct EntryRepo {}

impl EntryRepo {
    pub fn new() -> Self {
        Self {}
    }

    pub async fn insert(
        &self,
        db: &mut SqliteConnection,
        values: &EntryValues,
    ) -> Result<(), EntryError> {
        sqlx::query(
            r#"INSERT INTO entries
            (id, version, date, approved, account_id, amount, currency, quantity, unit,
             invoice_id, comment, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(values.id)
        .bind(values.version)
        .bind(values.date)
        .bind(values.approved)
        .bind(values.account_id)
        .bind(values.amount.to_string())
        .bind(values.currency.code())
        .bind(values.quantity.map(|quantity| quantity.to_string()))
        .bind(&values.unit)
        .bind(values.invoice_id)
        .bind(&values.comment)
        .bind(Utc::now())
        .execute(&mut *db)
        .await
        .map_err(|err| map_write_error(err, values))?;
        Ok(())
    }

    /// Bumps the version of the entry and returns it. Being a write, it takes
    /// the database write lock before the entry is read.
    pub async fn bump_version(
        &self,
        db: &mut SqliteConnection,
        id: EntryId,
    ) -> Result<Entry, EntryError> {
        let row: Option<EntryRow> = sqlx::query_as(&format!(
            "UPDATE entries SET version = version + 1 WHERE id = ? RETURNING {ENTRY_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&mut *db)
        .await?;
        row.ok_or(EntryError::NotFound(id))?.try_into()
    }

    pub async fn update(
        &self,
        db: &mut SqliteConnection,
        values: &EntryValues,
    ) -> Result<(), EntryError> {
        sqlx::query(
            r#"UPDATE entries
            SET date = ?, approved = ?, account_id = ?, amount = ?, currency = ?,
                quantity = ?, unit = ?, invoice_id = ?, comment = ?
            WHERE id = ?"#,
        )
        .bind(values.date)
        .bind(values.approved)
        .bind(values.account_id)
        .bind(values.amount.to_string())
        .bind(values.currency.code())
        .bind(values.quantity.map(|quantity| quantity.to_string()))
        .bind(&values.unit)
        .bind(values.invoice_id)
        .bind(&values.comment)
        .bind(values.id)
        .execute(&mut *db)
        .await
        .map_err(|err| map_write_error(err, values))?;
        Ok(())
    }

    pub async fn delete(
        &self,
        db: &mut SqliteConnection,
        id: EntryId,
    ) -> Result<Entry, EntryError> {
        let row: Option<EntryRow> = sqlx::query_as(&format!(
            "DELETE FROM entries WHERE id = ? RETURNING {ENTRY_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&mut *db)
        .await?;
        row.ok_or(EntryError::NotFound(id))?.try_into()
    }

    pub async fn find_by_id(
        &self,
        db: &mut SqliteConnection,
        id: EntryId,
    ) -> Result<Entry, EntryError> {
        let row: Option<EntryRow> =
            sqlx::query_as(&format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE id = ?"))
                .bind(id)
                .fetch_optional(&mut *db)
                .await?;
        row.ok_or(EntryError::NotFound(id))?.try_into()
    }

    /// Latest entries of an account first.
    pub async fn list_for_account(
        &self,
        db: &mut SqliteConnection,
        account_id: AccountId,
        limit: i64,
    ) -> Result<Vec<Entry>, EntryError> {
        let rows: Vec<EntryRow> = sqlx::query_as(&format!(
            "SELECT {ENTRY_COLUMNS} FROM entries WHERE account_id = ? ORDER BY date DESC, created_at DESC LIMIT ?"
        ))
        .bind(account_id)
        .bind(limit)
        .fetch_all(&mut *db)
        .await?;
        into_entries(rows)
    }

    pub async fn list_for_invoice(
        &self,
        db: &mut SqliteConnection,
        invoice_id: InvoiceId,
    ) -> Result<Vec<Entry>, EntryError> {
        let rows: Vec<EntryRow> = sqlx::query_as(&format!(
            "SELECT {ENTRY_COLUMNS} FROM entries WHERE invoice_id = ? ORDER BY date, created_at"
        ))
        .bind(invoice_id)
        .fetch_all(&mut *db)
        .await?;
        into_entries(rows)
    }
}
