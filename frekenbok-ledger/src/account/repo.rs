use chrono::{NaiveDate, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use tracing::instrument;

use crate::primitives::*;

use super::{entity::*, error::AccountError};

const ACCOUNT_COLUMNS: &str = "id, title, bank_title, account_type, dashboard, opened, closed, \
     credentials, tree_id, lft, rgt, depth";

#[derive(sqlx::FromRow)]
struct AccountRow {
    id: AccountId,
    title: String,
    bank_title: Option<String>,
    account_type: AccountType,
    dashboard: bool,
    opened: Option<NaiveDate>,
    closed: Option<NaiveDate>,
    credentials: String,
    tree_id: TreeId,
    lft: i64,
    rgt: i64,
    depth: i64,
}

impl TryFrom<AccountRow> for Account {
    type Error = AccountError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let position = TreePosition {
            tree_id: row.tree_id,
            lft: row.lft,
            rgt: row.rgt,
            depth: row.depth,
        };
        if !position.is_well_formed() {
            return Err(AccountError::CorruptTree(format!(
                "account {} has range ({}, {}) at depth {} in tree {}",
                row.id, row.lft, row.rgt, row.depth, row.tree_id
            )));
        }
        Ok(Account::new(AccountValues {
            id: row.id,
            title: row.title,
            bank_title: row.bank_title,
            account_type: row.account_type,
            dashboard: row.dashboard,
            opened: row.opened,
            closed: row.closed,
            credentials: row.credentials,
            position,
        }))
    }
}

fn into_accounts(rows: Vec<AccountRow>) -> Result<Vec<Account>, AccountError> {
    rows.into_iter().map(Account::try_from).collect()
}

/// Filters for listing accounts.
#[derive(Debug, Default, Clone, Copy)]
pub(super) struct AccountFilter {
    pub account_type: Option<AccountType>,
    pub open_on: Option<NaiveDate>,
    pub leaves_only: bool,
}

#[derive(Debug, Clone, Default)]
pub(super) struct AccountRepo {}

impl AccountRepo {
    pub fn new() -> Self {
        Self {}
    }

    #[instrument(level = "trace", name = "frekenbok.accounts.allocate_tree", skip(self, db))]
    pub async fn allocate_tree(&self, db: &mut SqliteConnection) -> Result<TreeId, AccountError> {
        let (id,): (i64,) =
            sqlx::query_as("INSERT INTO account_trees (created_at) VALUES (?) RETURNING id")
                .bind(Utc::now())
                .fetch_one(&mut *db)
                .await?;
        Ok(TreeId::from(id))
    }

    /// Takes the write lock on the trees holding `account_ids` and returns the
    /// ids of the trees it bumped. Must be the first statement of a structural
    /// change: a transaction that has already read cannot wait for the lock.
    #[instrument(level = "trace", name = "frekenbok.accounts.lock_trees_of", skip(self, db))]
    pub async fn lock_trees_of(
        &self,
        db: &mut SqliteConnection,
        account_ids: &[AccountId],
    ) -> Result<Vec<TreeId>, AccountError> {
        let mut query = QueryBuilder::<Sqlite>::new(
            "UPDATE account_trees SET revision = revision + 1 \
             WHERE id IN (SELECT tree_id FROM accounts WHERE id IN (",
        );
        let mut ids = query.separated(", ");
        for account_id in account_ids {
            ids.push_bind(*account_id);
        }
        ids.push_unseparated(")) RETURNING id");
        let rows: Vec<(TreeId,)> = query.build_query_as().fetch_all(&mut *db).await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    pub async fn drop_tree_if_empty(
        &self,
        db: &mut SqliteConnection,
        tree_id: TreeId,
    ) -> Result<(), AccountError> {
        sqlx::query(
            "DELETE FROM account_trees WHERE id = ? AND NOT EXISTS (SELECT 1 FROM accounts WHERE tree_id = ?)",
        )
        .bind(tree_id)
        .bind(tree_id)
        .execute(&mut *db)
        .await?;
        Ok(())
    }

    pub async fn insert(
        &self,
        db: &mut SqliteConnection,
        values: &AccountValues,
    ) -> Result<(), AccountError> {
        sqlx::query(
            r#"INSERT INTO accounts
            (id, title, bank_title, account_type, dashboard, opened, closed, credentials,
             tree_id, lft, rgt, depth, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(values.id)
        .bind(&values.title)
        .bind(&values.bank_title)
        .bind(values.account_type)
        .bind(values.dashboard)
        .bind(values.opened)
        .bind(values.closed)
        .bind(&values.credentials)
        .bind(values.position.tree_id)
        .bind(values.position.lft)
        .bind(values.position.rgt)
        .bind(values.position.depth)
        .bind(Utc::now())
        .execute(&mut *db)
        .await?;
        Ok(())
    }

    pub async fn update_attributes(
        &self,
        db: &mut SqliteConnection,
        values: &AccountValues,
    ) -> Result<(), AccountError> {
        let result = sqlx::query(
            r#"UPDATE accounts
            SET title = ?, bank_title = ?, dashboard = ?, opened = ?, closed = ?, credentials = ?
            WHERE id = ?"#,
        )
        .bind(&values.title)
        .bind(&values.bank_title)
        .bind(values.dashboard)
        .bind(values.opened)
        .bind(values.closed)
        .bind(&values.credentials)
        .bind(values.id)
        .execute(&mut *db)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AccountError::CouldNotFindById(values.id));
        }
        Ok(())
    }

    pub async fn find_by_id(
        &self,
        db: &mut SqliteConnection,
        id: AccountId,
    ) -> Result<Account, AccountError> {
        let row: Option<AccountRow> =
            sqlx::query_as(&format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?"))
                .bind(id)
                .fetch_optional(&mut *db)
                .await?;
        row.ok_or(AccountError::CouldNotFindById(id))?.try_into()
    }

    pub async fn find_by_bank_title(
        &self,
        db: &mut SqliteConnection,
        bank_title: &str,
    ) -> Result<Option<Account>, AccountError> {
        let row: Option<AccountRow> = sqlx::query_as(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE bank_title = ? ORDER BY tree_id, lft LIMIT 1"
        ))
        .bind(bank_title)
        .fetch_optional(&mut *db)
        .await?;
        row.map(Account::try_from).transpose()
    }

    pub async fn list(
        &self,
        db: &mut SqliteConnection,
        filter: AccountFilter,
    ) -> Result<Vec<Account>, AccountError> {
        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE 1 = 1"));
        if let Some(account_type) = filter.account_type {
            query.push(" AND account_type = ").push_bind(account_type);
        }
        if let Some(date) = filter.open_on {
            query
                .push(" AND (closed IS NULL OR closed >= ")
                .push_bind(date)
                .push(")");
        }
        if filter.leaves_only {
            query.push(" AND rgt - lft = 1");
        }
        query.push(" ORDER BY tree_id, lft");
        let rows: Vec<AccountRow> = query.build_query_as().fetch_all(&mut *db).await?;
        into_accounts(rows)
    }

    pub async fn list_tree(
        &self,
        db: &mut SqliteConnection,
        tree_id: TreeId,
    ) -> Result<Vec<Account>, AccountError> {
        let rows: Vec<AccountRow> = sqlx::query_as(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE tree_id = ? ORDER BY lft"
        ))
        .bind(tree_id)
        .fetch_all(&mut *db)
        .await?;
        into_accounts(rows)
    }

    /// Nodes whose range lies inside `position`, optionally including the node itself.
    pub async fn descendants(
        &self,
        db: &mut SqliteConnection,
        position: TreePosition,
        include_self: bool,
    ) -> Result<Vec<Account>, AccountError> {
        let (lower, upper) = if include_self {
            (position.lft, position.rgt)
        } else {
            (position.lft + 1, position.rgt - 1)
        };
        let rows: Vec<AccountRow> = sqlx::query_as(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE tree_id = ? AND lft >= ? AND lft <= ? ORDER BY lft"
        ))
        .bind(position.tree_id)
        .bind(lower)
        .bind(upper)
        .fetch_all(&mut *db)
        .await?;
        into_accounts(rows)
    }

    pub async fn children(
        &self,
        db: &mut SqliteConnection,
        position: TreePosition,
    ) -> Result<Vec<Account>, AccountError> {
        let rows: Vec<AccountRow> = sqlx::query_as(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE tree_id = ? AND lft > ? AND rgt < ? AND depth = ? ORDER BY lft"
        ))
        .bind(position.tree_id)
        .bind(position.lft)
        .bind(position.rgt)
        .bind(position.depth + 1)
        .fetch_all(&mut *db)
        .await?;
        into_accounts(rows)
    }

    /// Nodes whose range strictly contains `position`, root first.
    pub async fn ancestors(
        &self,
        db: &mut SqliteConnection,
        position: TreePosition,
    ) -> Result<Vec<Account>, AccountError> {
        let rows: Vec<AccountRow> = sqlx::query_as(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE tree_id = ? AND lft < ? AND rgt > ? ORDER BY lft"
        ))
        .bind(position.tree_id)
        .bind(position.lft)
        .bind(position.rgt)
        .fetch_all(&mut *db)
        .await?;
        into_accounts(rows)
    }

    /// Distinct accounts touched by the entries of an invoice.
    pub async fn list_for_invoice(
        &self,
        db: &mut SqliteConnection,
        invoice_id: InvoiceId,
        account_type: Option<AccountType>,
    ) -> Result<Vec<Account>, AccountError> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id IN (SELECT account_id FROM entries WHERE invoice_id = "
        ));
        query.push_bind(invoice_id).push(")");
        if let Some(account_type) = account_type {
            query.push(" AND account_type = ").push_bind(account_type);
        }
        query.push(" ORDER BY tree_id, lft");
        let rows: Vec<AccountRow> = query.build_query_as().fetch_all(&mut *db).await?;
        into_accounts(rows)
    }

    pub async fn tree_ids(&self, db: &mut SqliteConnection) -> Result<Vec<TreeId>, AccountError> {
        let rows: Vec<(TreeId,)> = sqlx::query_as("SELECT id FROM account_trees ORDER BY id")
            .fetch_all(&mut *db)
            .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    pub async fn tree_positions(
        &self,
        db: &mut SqliteConnection,
        tree_id: TreeId,
    ) -> Result<Vec<TreePosition>, AccountError> {
        let rows: Vec<(i64, i64, i64)> =
            sqlx::query_as("SELECT lft, rgt, depth FROM accounts WHERE tree_id = ? ORDER BY lft")
                .bind(tree_id)
                .fetch_all(&mut *db)
                .await?;
        Ok(rows
            .into_iter()
            .map(|(lft, rgt, depth)| TreePosition {
                tree_id,
                lft,
                rgt,
                depth,
            })
            .collect())
    }

    /// Moves every boundary at or after `from` by `delta`.
    #[instrument(level = "trace", name = "frekenbok.accounts.shift", skip(self, db))]
    pub async fn shift(
        &self,
        db: &mut SqliteConnection,
        tree_id: TreeId,
        from: i64,
        delta: i64,
    ) -> Result<(), AccountError> {
        sqlx::query("UPDATE accounts SET lft = lft + ? WHERE tree_id = ? AND lft >= ?")
            .bind(delta)
            .bind(tree_id)
            .bind(from)
            .execute(&mut *db)
            .await?;
        sqlx::query("UPDATE accounts SET rgt = rgt + ? WHERE tree_id = ? AND rgt >= ?")
            .bind(delta)
            .bind(tree_id)
            .bind(from)
            .execute(&mut *db)
            .await?;
        Ok(())
    }

    /// Marks the subtree as detached by negating its ranges. Negative ranges
    /// are never touched by [`Self::shift`] since `from` is always positive.
    pub async fn detach_subtree(
        &self,
        db: &mut SqliteConnection,
        position: TreePosition,
    ) -> Result<(), AccountError> {
        sqlx::query(
            "UPDATE accounts SET lft = -lft, rgt = -rgt WHERE tree_id = ? AND lft >= ? AND rgt <= ?",
        )
        .bind(position.tree_id)
        .bind(position.lft)
        .bind(position.rgt)
        .execute(&mut *db)
        .await?;
        Ok(())
    }

    /// Re-attaches a detached subtree of `from_tree` into `to_tree`, moving
    /// its ranges by `offset` and its depths by `depth_delta`.
    pub async fn attach_detached(
        &self,
        db: &mut SqliteConnection,
        from_tree: TreeId,
        to_tree: TreeId,
        offset: i64,
        depth_delta: i64,
    ) -> Result<u64, AccountError> {
        let result = sqlx::query(
            r#"UPDATE accounts
            SET tree_id = ?, lft = -lft + ?, rgt = -rgt + ?, depth = depth + ?
            WHERE tree_id = ? AND lft < 0"#,
        )
        .bind(to_tree)
        .bind(offset)
        .bind(offset)
        .bind(depth_delta)
        .bind(from_tree)
        .execute(&mut *db)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn subtree_has_entries(
        &self,
        db: &mut SqliteConnection,
        position: TreePosition,
    ) -> Result<bool, AccountError> {
        let (has_entries,): (bool,) = sqlx::query_as(
            r#"SELECT EXISTS (
                SELECT 1 FROM entries e
                JOIN accounts a ON a.id = e.account_id
                WHERE a.tree_id = ? AND a.lft >= ? AND a.rgt <= ?
            )"#,
        )
        .bind(position.tree_id)
        .bind(position.lft)
        .bind(position.rgt)
        .fetch_one(&mut *db)
        .await?;
        Ok(has_entries)
    }

    /// Removes every node of the subtree together with its cached sheaves.
    pub async fn delete_subtree(
        &self,
        db: &mut SqliteConnection,
        position: TreePosition,
    ) -> Result<u64, AccountError> {
        sqlx::query(
            r#"DELETE FROM sheaves WHERE account_id IN (
                SELECT id FROM accounts WHERE tree_id = ? AND lft >= ? AND rgt <= ?
            )"#,
        )
        .bind(position.tree_id)
        .bind(position.lft)
        .bind(position.rgt)
        .execute(&mut *db)
        .await?;
        let result =
            sqlx::query("DELETE FROM accounts WHERE tree_id = ? AND lft >= ? AND rgt <= ?")
                .bind(position.tree_id)
                .bind(position.lft)
                .bind(position.rgt)
                .execute(&mut *db)
                .await?;
        Ok(result.rows_affected())
    }
}
