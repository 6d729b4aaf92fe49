use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use payment_predictor::config::{StoreConfig, DEFAULT_MODEL_PATH};
use payment_predictor::db::{count_accounts, insert_accounts, load_accounts_csv, open_database};
use payment_predictor::logging::init_logging;
use payment_predictor::training::{default_dataset, load_training_csv, train, DEFAULT_K};

#[derive(Parser)]
#[command(name = "payment-predictor", version, about = "Train the payment model and manage the account store")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Train the scoring model and write its artifact
    Train {
        /// Labelled history (valor,due_date,paid); built-in dataset if omitted
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Where to write the artifact
        #[arg(long, env = "MODEL_PATH", default_value = DEFAULT_MODEL_PATH)]
        output: PathBuf,

        /// Neighbours consulted per vote
        #[arg(long, default_value_t = DEFAULT_K)]
        k: usize,
    },

    /// Import accounts (name,value,due_date[,paid]) into the store
    Import {
        #[arg(long)]
        csv: PathBuf,

        #[command(flatten)]
        store: StoreConfig,
    },

    /// Create the store tables
    InitDb {
        #[command(flatten)]
        store: StoreConfig,
    },
}

fn main() -> Result<()> {
    init_logging()?;

    match Cli::parse().command {
        Command::Train { csv, output, k } => run_train(csv, output, k),
        Command::Import { csv, store } => run_import(csv, store),
        Command::InitDb { store } => run_init_db(store),
    }
}

fn run_train(csv: Option<PathBuf>, output: PathBuf, k: usize) -> Result<()> {
    println!("🧪 Training payment model");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let samples = match &csv {
        Some(path) => {
            println!("\n📂 Loading history from {:?}...", path);
            load_training_csv(path)?
        }
        None => {
            println!("\n📂 Using built-in history...");
            default_dataset()
        }
    };
    println!("✓ {} labelled samples", samples.len());

    let artifact = train(&samples, k)?;
    artifact
        .save(&output)
        .with_context(|| format!("Failed to write model to {:?}", output))?;

    println!("\n✅ Model written to {:?} (k = {})", output, k);
    Ok(())
}

fn run_import(csv: PathBuf, store: StoreConfig) -> Result<()> {
    println!("🗄️  Account import - CSV → SQLite");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    println!("\n📂 Loading CSV...");
    let accounts = load_accounts_csv(&csv)?;
    println!("✓ Loaded {} accounts from CSV", accounts.len());

    let conn = open_database(&store.database_url)?;

    println!("\n💾 Inserting accounts...");
    let inserted = insert_accounts(&conn, &accounts).context("Failed to insert accounts")?;

    let count = count_accounts(&conn)?;
    println!("✓ Inserted: {} accounts", inserted);
    println!("✓ Store now holds {} accounts", count);

    Ok(())
}

fn run_init_db(store: StoreConfig) -> Result<()> {
    open_database(&store.database_url)?;
    println!("✓ Tables ready in {}", store.database_url);
    Ok(())
}
