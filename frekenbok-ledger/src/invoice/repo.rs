use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use crate::primitives::*;

use super::{entity::*, error::InvoiceError};

#[derive(sqlx::FromRow)]
struct InvoiceRow {
    id: InvoiceId,
    timestamp: DateTime<Utc>,
    comment: String,
    user_ref: Option<String>,
}

impl From<InvoiceRow> for Invoice {
    fn from(row: InvoiceRow) -> Self {
        Invoice::new(InvoiceValues {
            id: row.id,
            timestamp: row.timestamp,
            comment: row.comment,
            user: row.user_ref,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub(super) struct InvoiceRepo {}

impl InvoiceRepo {
    pub fn new() -> Self {
        Self {}
    }

    pub async fn insert(
        &self,
        db: &mut SqliteConnection,
        values: &InvoiceValues,
    ) -> Result<(), InvoiceError> {
        sqlx::query(
            "INSERT INTO invoices (id, timestamp, comment, user_ref, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(values.id)
        .bind(values.timestamp)
        .bind(&values.comment)
        .bind(&values.user)
        .bind(Utc::now())
        .execute(&mut *db)
        .await?;
        Ok(())
    }

    pub async fn find_by_id(
        &self,
        db: &mut SqliteConnection,
        id: InvoiceId,
    ) -> Result<Invoice, InvoiceError> {
        let row: Option<InvoiceRow> = sqlx::query_as(
            "SELECT id, timestamp, comment, user_ref FROM invoices WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&mut *db)
        .await?;
        row.map(Invoice::from).ok_or(InvoiceError::NotFound(id))
    }
}
