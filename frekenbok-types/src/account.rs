use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::primitives::*;

/// Nested-set coordinates of an account inside its tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreePosition {
    pub tree_id: TreeId,
    pub lft: i64,
    pub rgt: i64,
    pub depth: i64,
}

impl TreePosition {
    pub fn root(tree_id: TreeId) -> Self {
        Self {
            tree_id,
            lft: 1,
            rgt: 2,
            depth: 0,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.rgt - self.lft == 1
    }

    /// Number of range slots occupied by this node and its descendants.
    pub fn width(&self) -> i64 {
        self.rgt - self.lft + 1
    }

    pub fn n_descendants(&self) -> i64 {
        (self.width() - 2) / 2
    }

    /// True when `other` lies strictly inside this node's range.
    pub fn contains(&self, other: &TreePosition) -> bool {
        self.tree_id == other.tree_id && self.lft < other.lft && other.rgt < self.rgt
    }

    pub fn is_well_formed(&self) -> bool {
        self.lft < self.rgt && self.lft >= 1 && self.depth >= 0 && self.width() % 2 == 0
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AccountValues {
    pub id: AccountId,
    pub title: String,
    pub bank_title: Option<String>,
    pub account_type: AccountType,
    pub dashboard: bool,
    pub opened: Option<NaiveDate>,
    pub closed: Option<NaiveDate>,
    pub credentials: String,
    pub position: TreePosition,
}

impl AccountValues {
    pub fn is_open_on(&self, date: NaiveDate) -> bool {
        self.closed.map(|closed| closed >= date).unwrap_or(true)
    }
}
