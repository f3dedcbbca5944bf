//! [Account] is a node in the chart of accounts.
//!
//! Accounts form a forest of nested-set trees. Structural changes (insert,
//! move, delete) rewrite the ranges of every node after the change point, so
//! each of them opens its transaction with a write to the tree's row, which
//! holds the database write lock until commit.
mod entity;
pub mod error;
mod repo;
mod tree;

use chrono::NaiveDate;
use sqlx::SqlitePool;
use tracing::instrument;

use crate::{atomic_operation::*, primitives::*};

pub use entity::*;
use error::*;
use repo::*;

/// Service for working with `Account` entities.
#[derive(Clone)]
pub struct Accounts {
    repo: AccountRepo,
    pool: SqlitePool,
}

impl Accounts {
    pub(crate) fn new(pool: &SqlitePool) -> Self {
        Self {
            repo: AccountRepo::new(),
            pool: pool.clone(),
        }
    }

    /// Inserts the account as a new root, or as the last child of its parent
    /// when one was set on the builder.
    #[instrument(name = "frekenbok.accounts.create", skip(self), err)]
    pub async fn create(&self, new_account: NewAccount) -> Result<Account, AccountError> {
        let mut op = AtomicOperation::init(&self.pool).await?;
        let account = self.create_in_op(&mut op, new_account).await?;
        op.commit().await?;
        Ok(account)
    }

    pub async fn create_in_op(
        &self,
        op: &mut AtomicOperation<'_>,
        mut new_account: NewAccount,
    ) -> Result<Account, AccountError> {
        match new_account.parent.take() {
            Some(parent) => self.add_child_in_op(op, parent, new_account).await,
            None => self.add_root_in_op(op, new_account).await,
        }
    }

    #[instrument(name = "frekenbok.accounts.add_root", skip(self), err)]
    pub async fn add_root(&self, new_account: NewAccount) -> Result<Account, AccountError> {
        let mut op = AtomicOperation::init(&self.pool).await?;
        let account = self.add_root_in_op(&mut op, new_account).await?;
        op.commit().await?;
        Ok(account)
    }

    pub async fn add_root_in_op(
        &self,
        op: &mut AtomicOperation<'_>,
        new_account: NewAccount,
    ) -> Result<Account, AccountError> {
        let tree_id = self.repo.allocate_tree(op.conn()).await?;
        let values = new_account.into_values(TreePosition::root(tree_id));
        self.repo.insert(op.conn(), &values).await?;
        Ok(Account::new(values))
    }

    #[instrument(name = "frekenbok.accounts.add_child", skip(self), err)]
    pub async fn add_child(
        &self,
        parent_id: AccountId,
        new_account: NewAccount,
    ) -> Result<Account, AccountError> {
        let mut op = AtomicOperation::init(&self.pool).await?;
        let account = self.add_child_in_op(&mut op, parent_id, new_account).await?;
        op.commit().await?;
        Ok(account)
    }

    pub async fn add_child_in_op(
        &self,
        op: &mut AtomicOperation<'_>,
        parent_id: AccountId,
        new_account: NewAccount,
    ) -> Result<Account, AccountError> {
        let parent = self.lock_tree_of(op, parent_id).await?.position();
        let at = parent.rgt;
        self.repo.shift(op.conn(), parent.tree_id, at, 2).await?;
        let values = new_account.into_values(TreePosition {
            tree_id: parent.tree_id,
            lft: at,
            rgt: at + 1,
            depth: parent.depth + 1,
        });
        self.repo.insert(op.conn(), &values).await?;
        Ok(Account::new(values))
    }

    /// Re-inserts the account and its whole subtree as the last child of `new_parent_id`.
    #[instrument(name = "frekenbok.accounts.move_to", skip(self), err)]
    pub async fn move_to(
        &self,
        account_id: AccountId,
        new_parent_id: AccountId,
    ) -> Result<Account, AccountError> {
        let mut op = AtomicOperation::init(&self.pool).await?;
        let account = self.move_to_in_op(&mut op, account_id, new_parent_id).await?;
        op.commit().await?;
        Ok(account)
    }

    pub async fn move_to_in_op(
        &self,
        op: &mut AtomicOperation<'_>,
        account_id: AccountId,
        new_parent_id: AccountId,
    ) -> Result<Account, AccountError> {
        if account_id == new_parent_id {
            return Err(AccountError::Cycle(account_id, new_parent_id));
        }
        let locked = self
            .repo
            .lock_trees_of(op.conn(), &[account_id, new_parent_id])
            .await?;
        let node = self.locked_account(op, account_id, &locked).await?.position();
        let parent = self
            .locked_account(op, new_parent_id, &locked)
            .await?
            .position();
        if node.contains(&parent) {
            return Err(AccountError::Cycle(account_id, new_parent_id));
        }

        let width = node.width();
        self.repo.detach_subtree(op.conn(), node).await?;
        self.repo
            .shift(op.conn(), node.tree_id, node.rgt + 1, -width)
            .await?;

        let parent = self.repo.find_by_id(op.conn(), new_parent_id).await?.position();
        let at = parent.rgt;
        self.repo.shift(op.conn(), parent.tree_id, at, width).await?;
        let n_moved = self
            .repo
            .attach_detached(
                op.conn(),
                node.tree_id,
                parent.tree_id,
                at - node.lft,
                parent.depth + 1 - node.depth,
            )
            .await?;
        if n_moved as i64 != width / 2 {
            return Err(AccountError::CorruptTree(format!(
                "moved {n_moved} nodes for a subtree of width {width}"
            )));
        }
        if node.tree_id != parent.tree_id {
            self.repo.drop_tree_if_empty(op.conn(), node.tree_id).await?;
        }
        self.repo.find_by_id(op.conn(), account_id).await
    }

    /// Physically removes the account and all of its descendants.
    ///
    /// Rejected with [`AccountError::HasEntries`] when any node of the subtree
    /// is referenced by an entry. Closing the account is the usual way to
    /// retire it.
    #[instrument(name = "frekenbok.accounts.delete", skip(self), err)]
    pub async fn delete(&self, account_id: AccountId) -> Result<(), AccountError> {
        let mut op = AtomicOperation::init(&self.pool).await?;
        self.delete_in_op(&mut op, account_id).await?;
        op.commit().await?;
        Ok(())
    }

    pub async fn delete_in_op(
        &self,
        op: &mut AtomicOperation<'_>,
        account_id: AccountId,
    ) -> Result<(), AccountError> {
        let node = self.lock_tree_of(op, account_id).await?.position();
        if self.repo.subtree_has_entries(op.conn(), node).await? {
            return Err(AccountError::HasEntries(account_id));
        }
        let n_deleted = self.repo.delete_subtree(op.conn(), node).await?;
        tracing::debug!(%account_id, n_deleted, "deleted account subtree");
        self.repo
            .shift(op.conn(), node.tree_id, node.rgt + 1, -node.width())
            .await?;
        self.repo.drop_tree_if_empty(op.conn(), node.tree_id).await?;
        Ok(())
    }

    #[instrument(name = "frekenbok.accounts.close", skip(self), err)]
    pub async fn close(
        &self,
        account_id: AccountId,
        date: NaiveDate,
    ) -> Result<Account, AccountError> {
        let mut op = AtomicOperation::init(&self.pool).await?;
        let mut account = self.repo.find_by_id(op.conn(), account_id).await?;
        account.close(date);
        self.repo.update_attributes(op.conn(), account.values()).await?;
        op.commit().await?;
        Ok(account)
    }

    #[instrument(name = "frekenbok.accounts.update", skip(self, update), err)]
    pub async fn update(
        &self,
        account_id: AccountId,
        update: impl Into<AccountUpdate>,
    ) -> Result<Account, AccountError> {
        let mut op = AtomicOperation::init(&self.pool).await?;
        let mut account = self.repo.find_by_id(op.conn(), account_id).await?;
        if !account.update(update).is_empty() {
            self.repo.update_attributes(op.conn(), account.values()).await?;
            op.commit().await?;
        }
        Ok(account)
    }

    #[instrument(name = "frekenbok.accounts.find_by_id", skip(self), err)]
    pub async fn find_by_id(&self, account_id: AccountId) -> Result<Account, AccountError> {
        let mut conn = self.pool.acquire().await?;
        self.repo.find_by_id(&mut conn, account_id).await
    }

    pub async fn find_by_id_in_op(
        &self,
        op: &mut AtomicOperation<'_>,
        account_id: AccountId,
    ) -> Result<Account, AccountError> {
        self.repo.find_by_id(op.conn(), account_id).await
    }

    /// Looks up the account a bank refers to in its notifications.
    #[instrument(name = "frekenbok.accounts.find_by_bank_title", skip(self), err)]
    pub async fn find_by_bank_title(
        &self,
        bank_title: &str,
    ) -> Result<Option<Account>, AccountError> {
        let mut conn = self.pool.acquire().await?;
        self.repo.find_by_bank_title(&mut conn, bank_title).await
    }

    /// All accounts ordered by tree and position, i.e. depth first.
    pub async fn list_all(&self) -> Result<Vec<Account>, AccountError> {
        let mut conn = self.pool.acquire().await?;
        self.repo.list(&mut conn, AccountFilter::default()).await
    }

    /// Accounts of one type, optionally only those still open on `open_on`.
    #[instrument(name = "frekenbok.accounts.list_by_type", skip(self), err)]
    pub async fn list_by_type(
        &self,
        account_type: AccountType,
        open_on: Option<NaiveDate>,
    ) -> Result<Vec<Account>, AccountError> {
        let mut conn = self.pool.acquire().await?;
        self.repo
            .list(
                &mut conn,
                AccountFilter {
                    account_type: Some(account_type),
                    open_on,
                    leaves_only: false,
                },
            )
            .await
    }

    pub async fn incomes(&self) -> Result<Vec<Account>, AccountError> {
        self.list_by_type(AccountType::Income, None).await
    }

    pub async fn expenses(&self) -> Result<Vec<Account>, AccountError> {
        self.list_by_type(AccountType::Expense, None).await
    }

    pub async fn accounts(&self) -> Result<Vec<Account>, AccountError> {
        self.list_by_type(AccountType::Account, None).await
    }

    /// Childless accounts of one type that are open on `open_on`.
    #[instrument(name = "frekenbok.accounts.list_leaves", skip(self), err)]
    pub async fn list_leaves(
        &self,
        account_type: AccountType,
        open_on: NaiveDate,
    ) -> Result<Vec<Account>, AccountError> {
        let mut conn = self.pool.acquire().await?;
        self.repo
            .list(
                &mut conn,
                AccountFilter {
                    account_type: Some(account_type),
                    open_on: Some(open_on),
                    leaves_only: true,
                },
            )
            .await
    }

    pub async fn children(&self, account_id: AccountId) -> Result<Vec<Account>, AccountError> {
        let mut conn = self.pool.acquire().await?;
        let position = self.repo.find_by_id(&mut conn, account_id).await?.position();
        self.repo.children(&mut conn, position).await
    }

    /// Every node strictly below the account.
    pub async fn descendants(&self, account_id: AccountId) -> Result<Vec<Account>, AccountError> {
        let mut conn = self.pool.acquire().await?;
        let position = self.repo.find_by_id(&mut conn, account_id).await?.position();
        self.repo.descendants(&mut conn, position, false).await
    }

    /// The account followed by all of its descendants.
    pub async fn subtree(&self, account_id: AccountId) -> Result<Vec<Account>, AccountError> {
        let mut conn = self.pool.acquire().await?;
        let position = self.repo.find_by_id(&mut conn, account_id).await?.position();
        self.repo.descendants(&mut conn, position, true).await
    }

    /// Every node above the account, root first.
    pub async fn ancestors(&self, account_id: AccountId) -> Result<Vec<Account>, AccountError> {
        let mut conn = self.pool.acquire().await?;
        let position = self.repo.find_by_id(&mut conn, account_id).await?.position();
        self.repo.ancestors(&mut conn, position).await
    }

    pub async fn list_tree(&self, tree_id: TreeId) -> Result<Vec<Account>, AccountError> {
        let mut conn = self.pool.acquire().await?;
        self.repo.list_tree(&mut conn, tree_id).await
    }

    pub async fn tree_ids(&self) -> Result<Vec<TreeId>, AccountError> {
        let mut conn = self.pool.acquire().await?;
        self.repo.tree_ids(&mut conn).await
    }

    /// Checks the nested-set invariants of one tree, failing with
    /// [`AccountError::CorruptTree`] on the first violation.
    #[instrument(name = "frekenbok.accounts.verify_tree", skip(self), err)]
    pub async fn verify_tree(&self, tree_id: TreeId) -> Result<(), AccountError> {
        let mut conn = self.pool.acquire().await?;
        let positions = self.repo.tree_positions(&mut conn, tree_id).await?;
        tree::check_tree(tree_id, &positions).map_err(AccountError::CorruptTree)
    }

    /// Distinct accounts touched by the entries of an invoice, optionally of one type.
    pub async fn list_for_invoice(
        &self,
        invoice_id: InvoiceId,
        account_type: Option<AccountType>,
    ) -> Result<Vec<Account>, AccountError> {
        let mut conn = self.pool.acquire().await?;
        self.repo
            .list_for_invoice(&mut conn, invoice_id, account_type)
            .await
    }

    async fn lock_tree_of(
        &self,
        op: &mut AtomicOperation<'_>,
        account_id: AccountId,
    ) -> Result<Account, AccountError> {
        let locked = self.repo.lock_trees_of(op.conn(), &[account_id]).await?;
        self.locked_account(op, account_id, &locked).await
    }

    async fn locked_account(
        &self,
        op: &mut AtomicOperation<'_>,
        account_id: AccountId,
        locked: &[TreeId],
    ) -> Result<Account, AccountError> {
        let account = self.repo.find_by_id(op.conn(), account_id).await?;
        let tree_id = account.position().tree_id;
        if !locked.contains(&tree_id) {
            return Err(AccountError::CorruptTree(format!(
                "tree {tree_id} of account {account_id} is not registered"
            )));
        }
        Ok(account)
    }
}
