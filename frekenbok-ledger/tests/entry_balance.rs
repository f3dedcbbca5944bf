mod helpers;

use rand::Rng;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use std::collections::HashMap;

use frekenbok_ledger::{entry::error::EntryError, entry::*, *};

#[tokio::test]
async fn wallet_seeding() -> anyhow::Result<()> {
    let ledger = helpers::init_ledger().await?;
    let wallet = ledger
        .create_account("Wallet", AccountType::Account, None)
        .await?;
    let today = helpers::date(2015, 4, 1);
    for code in ["RUB", "USD", "EUR"] {
        ledger
            .create_entry(helpers::new_entry(wallet.id(), dec!(10), code, today))
            .await?;
    }

    let balance = ledger.current_balance(wallet.id()).await?;
    assert_eq!(balance.len(), 3);
    let codes: Vec<_> = balance.currencies().map(|c| c.code()).collect();
    assert_eq!(codes, vec!["RUB", "EUR", "USD"]);
    assert!(balance.iter().all(|b| b.amount == dec!(10)));
    Ok(())
}

#[tokio::test]
async fn fast_path_accumulates_into_one_sheaf() -> anyhow::Result<()> {
    let ledger = helpers::init_ledger().await?;
    let wallet = ledger
        .create_account("Wallet", AccountType::Account, None)
        .await?;
    let today = helpers::date(2015, 4, 1);
    ledger
        .create_entry(helpers::new_entry(wallet.id(), dec!(700.50), "RUB", today))
        .await?;
    ledger
        .create_entry(helpers::new_entry(wallet.id(), dec!(-200.25), "rub", today))
        .await?;

    let balance = ledger.current_balance(wallet.id()).await?;
    assert_eq!(balance.len(), 1);
    assert_eq!(balance.get(helpers::currency("RUB")), Some(dec!(500.25)));
    Ok(())
}

#[tokio::test]
async fn unknown_currency_is_rejected() -> anyhow::Result<()> {
    let ledger = helpers::init_ledger().await?;
    let wallet = ledger
        .create_account("Wallet", AccountType::Account, None)
        .await?;
    let new_entry = NewEntry::builder()
        .account_id(wallet.id())
        .amount(dec!(1))
        .currency("ABC")
        .date(helpers::date(2015, 4, 1))
        .build()?;
    let res = ledger.entries().create(new_entry).await;
    assert!(matches!(res, Err(EntryError::UnknownCurrency(_))));
    assert!(ledger.current_balance(wallet.id()).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn entry_on_missing_account_is_rejected() -> anyhow::Result<()> {
    let ledger = helpers::init_ledger().await?;
    let new_entry = NewEntry::builder()
        .account_id(AccountId::new())
        .amount(dec!(1))
        .currency("RUB")
        .date(helpers::date(2015, 4, 1))
        .build()?;
    let res = ledger.entries().create(new_entry).await;
    assert!(matches!(res, Err(EntryError::DanglingReference(_, None))));
    Ok(())
}

#[tokio::test]
async fn approval_filtering() -> anyhow::Result<()> {
    let ledger = helpers::init_ledger().await?;
    let wallet = ledger
        .create_account("Wallet", AccountType::Account, None)
        .await?;
    ledger
        .create_entry(helpers::new_entry(wallet.id(), dec!(100), "RUB", helpers::date(2015, 4, 1)))
        .await?;
    let provisional = ledger
        .entries()
        .create(
            NewEntry::builder()
                .account_id(wallet.id())
                .amount(dec!(50))
                .currency("RUB")
                .date(helpers::date(2015, 4, 2))
                .approved(false)
                .build()?,
        )
        .await?;
    assert!(!provisional.is_approved());

    let rub = helpers::currency("RUB");
    assert_eq!(
        ledger.current_balance(wallet.id()).await?.get(rub),
        Some(dec!(100))
    );
    assert_eq!(
        ledger.recalculate_summary(wallet.id()).await?.get(rub),
        Some(dec!(100))
    );

    let approved = ledger.entries().approve(provisional.id()).await?;
    assert!(approved.is_approved());
    assert_eq!(approved.version(), 2);
    ledger.recalculate_summary(wallet.id()).await?;
    assert_eq!(
        ledger.current_balance(wallet.id()).await?.get(rub),
        Some(dec!(150))
    );
    Ok(())
}

#[tokio::test]
async fn unapproved_only_currency_has_no_sheaf() -> anyhow::Result<()> {
    let ledger = helpers::init_ledger().await?;
    let wallet = ledger
        .create_account("Wallet", AccountType::Account, None)
        .await?;
    ledger
        .entries()
        .create(
            NewEntry::builder()
                .account_id(wallet.id())
                .amount(dec!(50))
                .currency("USD")
                .date(helpers::date(2015, 4, 2))
                .approved(false)
                .build()?,
        )
        .await?;
    assert!(ledger.current_balance(wallet.id()).await?.is_empty());
    assert!(ledger.recalculate_summary(wallet.id()).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn update_recalculates_old_and_new_account() -> anyhow::Result<()> {
    let ledger = helpers::init_ledger().await?;
    let cash = ledger
        .create_account("Cash", AccountType::Account, None)
        .await?;
    let card = ledger
        .create_account("Card", AccountType::Account, None)
        .await?;
    let entry = ledger
        .create_entry(helpers::new_entry(cash.id(), dec!(300), "RUB", helpers::date(2015, 4, 1)))
        .await?;
    ledger
        .create_entry(helpers::new_entry(cash.id(), dec!(5), "USD", helpers::date(2015, 4, 1)))
        .await?;

    let mut update = EntryUpdate::default();
    update.account_id(card.id()).amount(dec!(250));
    let entry = ledger.update_entry(entry.id(), update).await?;
    assert_eq!(entry.account_id(), card.id());
    assert_eq!(entry.version(), 2);

    let cash_balance = ledger.current_balance(cash.id()).await?;
    assert_eq!(cash_balance.get(helpers::currency("RUB")), None);
    assert_eq!(cash_balance.get(helpers::currency("USD")), Some(dec!(5)));
    let card_balance = ledger.current_balance(card.id()).await?;
    assert_eq!(card_balance.get(helpers::currency("RUB")), Some(dec!(250)));
    assert_eq!(card_balance.len(), 1);
    Ok(())
}

#[tokio::test]
async fn changing_currency_drops_the_old_bucket() -> anyhow::Result<()> {
    let ledger = helpers::init_ledger().await?;
    let wallet = ledger
        .create_account("Wallet", AccountType::Account, None)
        .await?;
    let entry = ledger
        .create_entry(helpers::new_entry(wallet.id(), dec!(10), "USD", helpers::date(2015, 4, 1)))
        .await?;

    let mut update = EntryUpdate::default();
    update.currency("EUR");
    ledger.update_entry(entry.id(), update).await?;

    let balance = ledger.current_balance(wallet.id()).await?;
    assert_eq!(balance.len(), 1);
    assert_eq!(balance.get(helpers::currency("EUR")), Some(dec!(10)));
    Ok(())
}

#[tokio::test]
async fn delete_recalculates_and_drops_orphaned_sheaves() -> anyhow::Result<()> {
    let ledger = helpers::init_ledger().await?;
    let wallet = ledger
        .create_account("Wallet", AccountType::Account, None)
        .await?;
    let rub = ledger
        .create_entry(helpers::new_entry(wallet.id(), dec!(10), "RUB", helpers::date(2015, 4, 1)))
        .await?;
    let usd = ledger
        .create_entry(helpers::new_entry(wallet.id(), dec!(10), "USD", helpers::date(2015, 4, 1)))
        .await?;
    ledger
        .create_entry(helpers::new_entry(wallet.id(), dec!(-10), "RUB", helpers::date(2015, 4, 2)))
        .await?;

    ledger.delete_entry(usd.id()).await?;
    let balance = ledger.current_balance(wallet.id()).await?;
    assert_eq!(balance.len(), 1);
    assert_eq!(balance.get(helpers::currency("RUB")), Some(Decimal::ZERO));

    ledger.delete_entry(rub.id()).await?;
    let balance = ledger.current_balance(wallet.id()).await?;
    assert_eq!(balance.get(helpers::currency("RUB")), Some(dec!(-10)));

    let res = ledger.entries().delete(usd.id()).await;
    assert!(matches!(res, Err(EntryError::NotFound(_))));
    Ok(())
}

#[tokio::test]
async fn recalculate_summary_repairs_and_is_idempotent() -> anyhow::Result<()> {
    let ledger = helpers::init_ledger().await?;
    let wallet = ledger
        .create_account("Wallet", AccountType::Account, None)
        .await?;
    ledger
        .create_entry(helpers::new_entry(wallet.id(), dec!(42), "RUB", helpers::date(2015, 4, 1)))
        .await?;

    sqlx::query("UPDATE sheaves SET amount = '999'")
        .execute(ledger.pool())
        .await?;
    sqlx::query(
        "INSERT INTO sheaves (account_id, currency, amount, modified_at) \
         VALUES (?, 'GBP', '1', '2015-04-01T00:00:00Z')",
    )
    .bind(wallet.id())
    .execute(ledger.pool())
    .await?;
    assert_eq!(ledger.current_balance(wallet.id()).await?.len(), 2);

    let first = ledger.recalculate_summary(wallet.id()).await?;
    let after_first = ledger.current_balance(wallet.id()).await?;
    let second = ledger.recalculate_summary(wallet.id()).await?;
    let after_second = ledger.current_balance(wallet.id()).await?;

    assert_eq!(first, second);
    assert_eq!(after_first, after_second);
    assert_eq!(after_first, first);
    assert_eq!(after_first.len(), 1);
    assert_eq!(after_first.get(helpers::currency("RUB")), Some(dec!(42)));
    Ok(())
}

#[tokio::test]
async fn storage_enforces_one_sheaf_per_currency() -> anyhow::Result<()> {
    let ledger = helpers::init_ledger().await?;
    let wallet = ledger
        .create_account("Wallet", AccountType::Account, None)
        .await?;
    ledger
        .create_entry(helpers::new_entry(wallet.id(), dec!(1), "RUB", helpers::date(2015, 4, 1)))
        .await?;

    let res = sqlx::query(
        "INSERT INTO sheaves (account_id, currency, amount, modified_at) \
         VALUES (?, 'RUB', '1', '2015-04-01T00:00:00Z')",
    )
    .bind(wallet.id())
    .execute(ledger.pool())
    .await;
    match res {
        Err(sqlx::Error::Database(err)) => assert!(err.is_unique_violation()),
        other => panic!("expected a unique violation, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn list_entries_for_account() -> anyhow::Result<()> {
    let ledger = helpers::init_ledger().await?;
    let wallet = ledger
        .create_account("Wallet", AccountType::Account, None)
        .await?;
    for day in 1..=5 {
        ledger
            .create_entry(helpers::new_entry(
                wallet.id(),
                Decimal::from(day),
                "RUB",
                helpers::date(2015, 4, day),
            ))
            .await?;
    }

    let latest = ledger.entries().list_for_account(wallet.id(), Some(2)).await?;
    assert_eq!(
        latest.iter().map(|e| e.date()).collect::<Vec<_>>(),
        vec![helpers::date(2015, 4, 5), helpers::date(2015, 4, 4)]
    );
    let all = ledger.entries().list_for_account(wallet.id(), None).await?;
    assert_eq!(all.len(), 5);

    let found = ledger.entries().find_by_id(all[0].id()).await?;
    assert_eq!(found.amount(), dec!(5));
    assert_eq!(found.currency(), helpers::currency("RUB"));
    Ok(())
}

#[tokio::test]
async fn random_mutations_keep_cache_equal_to_log() -> anyhow::Result<()> {
    let ledger = helpers::init_ledger().await?;
    let mut rng = rand::rng();
    let currencies = ["RUB", "USD", "EUR"];

    let mut accounts = Vec::new();
    for _ in 0..3 {
        accounts.push(
            ledger
                .accounts()
                .create(helpers::test_account(AccountType::Account))
                .await?
                .id(),
        );
    }

    let mut entries: HashMap<EntryId, (AccountId, &str, Decimal, bool)> = HashMap::new();
    for _ in 0..80 {
        let roll = rng.random_range(0..10);
        if roll < 5 || entries.is_empty() {
            let account_id = accounts[rng.random_range(0..accounts.len())];
            let code = currencies[rng.random_range(0..currencies.len())];
            let amount = Decimal::new(rng.random_range(-100_000..100_000), 2);
            let approved = rng.random_bool(0.8);
            let entry = ledger
                .entries()
                .create(
                    NewEntry::builder()
                        .account_id(account_id)
                        .amount(amount)
                        .currency(code)
                        .date(helpers::date(2015, 4, 1))
                        .approved(approved)
                        .build()?,
                )
                .await?;
            entries.insert(entry.id(), (account_id, code, amount, approved));
        } else {
            let ids: Vec<_> = entries.keys().copied().collect();
            let id = ids[rng.random_range(0..ids.len())];
            if roll < 8 {
                let account_id = accounts[rng.random_range(0..accounts.len())];
                let code = currencies[rng.random_range(0..currencies.len())];
                let amount = Decimal::new(rng.random_range(-100_000..100_000), 2);
                let approved = rng.random_bool(0.8);
                let mut update = EntryUpdate::default();
                update
                    .account_id(account_id)
                    .currency(code)
                    .amount(amount)
                    .approved(approved);
                ledger.update_entry(id, update).await?;
                entries.insert(id, (account_id, code, amount, approved));
            } else {
                ledger.delete_entry(id).await?;
                entries.remove(&id);
            }
        }
    }

    for account_id in accounts {
        let mut expected: HashMap<Currency, Decimal> = HashMap::new();
        for (entry_account, code, amount, approved) in entries.values() {
            if *entry_account == account_id && *approved {
                *expected.entry(helpers::currency(code)).or_default() += *amount;
            }
        }
        let cached = ledger.current_balance(account_id).await?;
        assert_eq!(cached.len(), expected.len());
        for balance in cached.iter() {
            assert_eq!(Some(&balance.amount), expected.get(&balance.currency));
        }
        let recalculated = ledger.recalculate_summary(account_id).await?;
        assert_eq!(recalculated, cached);
    }
    Ok(())
}

#[tokio::test]
async fn recalculate_all_rebuilds_the_cache() -> anyhow::Result<()> {
    let ledger = helpers::init_ledger().await?;
    let cash = ledger
        .create_account("Cash", AccountType::Account, None)
        .await?;
    let card = ledger
        .create_account("Card", AccountType::Account, None)
        .await?;
    ledger
        .create_entry(helpers::new_entry(cash.id(), dec!(10), "RUB", helpers::date(2015, 4, 1)))
        .await?;
    ledger
        .create_entry(helpers::new_entry(card.id(), dec!(20), "USD", helpers::date(2015, 4, 1)))
        .await?;
    sqlx::query("DELETE FROM sheaves").execute(ledger.pool()).await?;
    assert!(ledger.current_balance(cash.id()).await?.is_empty());

    assert_eq!(ledger.balances().recalculate_all().await?, 2);
    assert_eq!(
        ledger.current_balance(cash.id()).await?.get(helpers::currency("RUB")),
        Some(dec!(10))
    );
    assert_eq!(
        ledger.current_balance(card.id()).await?.get(helpers::currency("USD")),
        Some(dec!(20))
    );
    Ok(())
}

#[tokio::test]
async fn create_entry_keeps_every_attribute() -> anyhow::Result<()> {
    let ledger = helpers::init_ledger().await?;
    let groceries = ledger
        .create_account("Groceries", AccountType::Expense, None)
        .await?;
    let invoice = ledger
        .create_invoice(invoice::NewInvoice::builder().comment("Receipt").build()?)
        .await?;

    let entry = ledger
        .create_entry(
            NewEntry::builder()
                .account_id(groceries.id())
                .amount(dec!(249.90))
                .currency("RUB")
                .date(helpers::date(2015, 4, 1))
                .approved(false)
                .invoice_id(invoice.id())
                .quantity(dec!(1.5))
                .unit("kg")
                .comment("Apples")
                .build()?,
        )
        .await?;

    let found = ledger.entries().find_by_id(entry.id()).await?;
    assert!(!found.is_approved());
    assert_eq!(found.invoice_id(), Some(invoice.id()));
    assert_eq!(found.values().quantity, Some(dec!(1.5)));
    assert_eq!(found.values().unit.as_deref(), Some("kg"));
    assert_eq!(found.values().comment, "Apples");
    assert_eq!(found.version(), 1);
    assert!(ledger.current_balance(groceries.id()).await?.is_empty());
    Ok(())
}
