use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use log::*;

mod commands;
mod formatting;

#[derive(Parser, Debug)]
#[command(version, about = "Operations tool for the vendor marketplace ledger")]
pub struct Arguments {
    /// Overrides VMP_DATABASE_URL
    #[arg(short = 'd', long = "database")]
    database_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    #[clap(name = "migrate", about = "Create the database if needed and run all pending migrations")]
    Migrate,
    #[clap(name = "accounts", about = "List every ledger account and its balance")]
    Accounts,
    #[clap(name = "balance", about = "Show a vendor's account and balance")]
    Balance {
        /// The vendor's license id
        license_id: String,
    },
    #[clap(name = "reconcile", about = "Recompute a vendor's balance from the open payments and store it")]
    Reconcile {
        /// The vendor's license id
        license_id: String,
    },
    #[clap(name = "open-payments", about = "List payments that have not been paid out yet")]
    OpenPayments(OpenPaymentsParams),
    #[clap(name = "payout", about = "Pay a vendor out in cash for their open payments")]
    Payout(PayoutParams),
    #[clap(name = "verify", about = "Check a transaction with the gateway and settle its order")]
    Verify {
        /// The gateway's transaction id
        transaction_id: String,
    },
}

#[derive(Debug, Args)]
pub struct DateRange {
    /// Earliest payment date, as YYYY-MM-DD or RFC 3339
    #[arg(short = 'f', long = "from", value_parser = commands::parse_date)]
    pub from: Option<DateTime<Utc>>,
    /// Latest payment date, as YYYY-MM-DD (inclusive) or RFC 3339
    #[arg(short = 't', long = "to", value_parser = commands::parse_end_date)]
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Args)]
pub struct OpenPaymentsParams {
    /// Only list payments sent or received by this vendor
    #[arg(short = 'v', long = "vendor")]
    pub vendor: Option<String>,
    #[command(flatten)]
    pub range: DateRange,
}

#[derive(Debug, Args)]
pub struct PayoutParams {
    /// The vendor's license id
    pub license_id: String,
    /// Who authorized the payout
    #[arg(short = 'b', long = "by")]
    pub authorized_by: String,
    #[command(flatten)]
    pub range: DateRange,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::init();
    let cli = Arguments::parse();
    if let Err(e) = run(cli).await {
        error!("{e:#}");
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Arguments) -> Result<()> {
    let ctx = commands::Context::new(cli.database_url).await?;
    let output = match cli.command {
        Command::Migrate => commands::migrate(&ctx).await?,
        Command::Accounts => commands::accounts(&ctx).await?,
        Command::Balance { license_id } => commands::balance(&ctx, &license_id).await?,
        Command::Reconcile { license_id } => commands::reconcile(&ctx, &license_id).await?,
        Command::OpenPayments(params) => commands::open_payments(&ctx, params).await?,
        Command::Payout(params) => commands::payout(&ctx, params).await?,
        Command::Verify { transaction_id } => commands::verify(&ctx, &transaction_id).await?,
    };
    println!("{output}");
    ctx.close().await;
    Ok(())
}
