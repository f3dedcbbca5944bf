use rusty_money::iso;
use serde::{Deserialize, Serialize};

crate::entity_id! { AccountId }
crate::entity_id! { EntryId }
crate::entity_id! { InvoiceId }

/// Precision every money comparison is rounded to.
pub const DECIMAL_PLACES: u32 = 5;

/// Identifies one nested-set tree in the chart of accounts.
#[derive(
    sqlx::Type, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct TreeId(i64);

impl From<i64> for TreeId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<TreeId> for i64 {
    fn from(id: TreeId) -> Self {
        id.0
    }
}

impl std::fmt::Display for TreeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    sqlx::Type,
    strum::Display,
    strum::EnumString,
)]
#[repr(i32)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum AccountType {
    Income = 1,
    Expense = 2,
    /// A real store of value (wallet, bank account).
    Account = 3,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("UnknownCurrencyError: '{0}' is not a supported ISO 4217 currency code")]
pub struct UnknownCurrencyError(pub String);

/// ISO 4217 currency. Only codes known to the ISO table can be constructed.
#[derive(Clone, Copy)]
pub struct Currency(&'static iso::Currency);

impl Currency {
    pub fn code(&self) -> &'static str {
        self.0.iso_alpha_code
    }

    pub fn name(&self) -> &'static str {
        self.0.name
    }
}

impl std::str::FromStr for Currency {
    type Err = UnknownCurrencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_uppercase();
        iso::find(&code)
            .map(Currency)
            .ok_or_else(|| UnknownCurrencyError(s.to_string()))
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl std::fmt::Debug for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Currency({})", self.code())
    }
}

impl PartialEq for Currency {
    fn eq(&self, other: &Self) -> bool {
        self.code() == other.code()
    }
}

impl Eq for Currency {}

impl std::hash::Hash for Currency {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.code().hash(state);
    }
}

impl PartialOrd for Currency {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Currency {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.code().cmp(other.code())
    }
}

impl Serialize for Currency {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

impl<'de> Deserialize<'de> for Currency {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        code.parse().map_err(serde::de::Error::custom)
    }
}
