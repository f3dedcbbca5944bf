#![allow(dead_code)]
use chrono::NaiveDate;
use rand::distr::{Alphanumeric, SampleString};
use sqlx::sqlite::SqlitePoolOptions;

use rust_decimal::Decimal;

use frekenbok_ledger::{account::*, entry::NewEntry, *};

/// A fresh in-memory database with the schema applied. The pool is held to a
/// single connection since every in-memory connection is its own database.
pub async fn init_pool() -> anyhow::Result<sqlx::SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;
    Ok(pool)
}

pub async fn init_ledger() -> anyhow::Result<FrekenbokLedger> {
    init_ledger_with_base("RUB").await
}

pub async fn init_ledger_with_base(base_currency: &str) -> anyhow::Result<FrekenbokLedger> {
    let pool = init_pool().await?;
    let config = FrekenbokLedgerConfig::builder()
        .pool(pool)
        .exec_migrations(true)
        .base_currency(base_currency)
        .build()?;
    Ok(FrekenbokLedger::init(config).await?)
}

/// A ledger on a fresh database file with a multi-connection pool, for tests
/// that need real concurrency. Returns the file path for cleanup.
pub async fn init_file_ledger(
    max_connections: u32,
) -> anyhow::Result<(FrekenbokLedger, std::path::PathBuf)> {
    let code = Alphanumeric.sample_string(&mut rand::rng(), 12);
    let path = std::env::temp_dir().join(format!("frekenbok-test-{code}.db"));
    let config = FrekenbokLedgerConfig::builder()
        .db_url(format!("sqlite://{}", path.display()))
        .max_connections(max_connections)
        .exec_migrations(true)
        .build()?;
    Ok((FrekenbokLedger::init(config).await?, path))
}

pub async fn drop_file_ledger(ledger: FrekenbokLedger, path: std::path::PathBuf) {
    ledger.pool().close().await;
    for suffix in ["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
    }
}

pub fn test_account(account_type: AccountType) -> NewAccount {
    let code = Alphanumeric.sample_string(&mut rand::rng(), 12);
    NewAccount::builder()
        .title(format!("Test Account {code}"))
        .account_type(account_type)
        .build()
        .unwrap()
}

pub fn test_child(account_type: AccountType, parent: AccountId) -> NewAccount {
    let code = Alphanumeric.sample_string(&mut rand::rng(), 12);
    NewAccount::builder()
        .title(format!("Test Account {code}"))
        .account_type(account_type)
        .parent(parent)
        .build()
        .unwrap()
}

pub fn new_entry(
    account_id: AccountId,
    amount: Decimal,
    currency: &str,
    date: NaiveDate,
) -> NewEntry {
    NewEntry::builder()
        .account_id(account_id)
        .amount(amount)
        .currency(currency)
        .date(date)
        .build()
        .unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn currency(code: &str) -> Currency {
    code.parse().unwrap()
}
