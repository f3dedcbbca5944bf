pub mod config;
mod db;

use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use frekenbok_ledger::{
    balance::BalanceSummary, AccountId, FrekenbokLedger, FrekenbokLedgerConfig, InvoiceId,
};

use std::path::PathBuf;

use self::config::{Config, EnvOverride};

#[derive(Parser)]
#[clap(version, long_about = None)]
struct Cli {
    #[clap(short, long, env = "FREKENBOK_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,
    #[clap(long, env = "FREKENBOK_DB_URL")]
    db_url: Option<String>,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rebuild cached balances from the entry log
    Recalculate {
        /// Only this account instead of the whole ledger
        #[clap(long)]
        account: Option<AccountId>,
    },
    /// Balance of an account and its descendants
    Balance {
        account: AccountId,
        /// Recompute from the entry log up to this date (YYYY-MM-DD)
        #[clap(long)]
        as_of: Option<NaiveDate>,
    },
    /// Print the chart of accounts
    Tree,
    /// Report the per-currency imbalance of an invoice
    VerifyInvoice { invoice: InvoiceId },
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load_config(cli.config, EnvOverride { db_url: cli.db_url })?;

    run_cmd(config, cli.command).await
}

async fn run_cmd(config: Config, command: Command) -> anyhow::Result<()> {
    frekenbok_tracing::init_tracer(config.tracing)?;
    let ledger_config = FrekenbokLedgerConfig::builder()
        .db_url(config.db.db_url)
        .max_connections(config.db.max_connections)
        .exec_migrations(config.ledger.exec_migrations)
        .base_currency(config.ledger.base_currency)
        .build()?;
    let ledger = FrekenbokLedger::init(ledger_config).await?;

    match command {
        Command::Recalculate { account: Some(account_id) } => {
            let summary = ledger.recalculate_summary(account_id).await?;
            print_summary(&summary);
        }
        Command::Recalculate { account: None } => {
            let n_accounts = ledger.balances().recalculate_all().await?;
            println!("recalculated {n_accounts} accounts");
        }
        Command::Balance { account, as_of } => {
            let summary = ledger.subtree_balance(account, as_of).await?;
            print_summary(&summary);
        }
        Command::Tree => print_tree(&ledger).await?,
        Command::VerifyInvoice { invoice } => {
            let imbalance = ledger.verify_invoice(invoice).await?;
            if imbalance.is_empty() {
                println!("verified");
            }
            for net in imbalance {
                println!("{}\t{}", net.currency, net.amount);
            }
        }
    }
    Ok(())
}

async fn print_tree(ledger: &FrekenbokLedger) -> anyhow::Result<()> {
    let today = Utc::now().date_naive();
    for account in ledger.accounts().list_all().await? {
        let indent = "  ".repeat(account.position().depth as usize);
        let closed = if account.is_open_on(today) { "" } else { " (closed)" };
        println!(
            "{indent}{} [{}] {}{closed}",
            account.title(),
            account.account_type(),
            account.id()
        );
    }
    Ok(())
}

fn print_summary(summary: &BalanceSummary) {
    for balance in summary.iter() {
        println!("{}\t{}", balance.currency, balance.amount);
    }
}
