use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::book;

#[derive(Parser)]
#[command(name = "oms")]
#[command(about = "Brokerage OMS operator CLI", long_about = None)]
struct Cli {
    /// Attempts per balance-changing operation on optimistic-lock conflicts
    #[arg(long, global = true, default_value_t = 3)]
    max_retries: i32,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> local -> ...)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Customer accounts
    Customer {
        #[command(subcommand)]
        cmd: CustomerCmd,
    },

    /// Asset holdings
    Asset {
        #[command(subcommand)]
        cmd: AssetCmd,
    },

    /// Order settlement
    Order {
        #[command(subcommand)]
        cmd: OrderCmd,
    },

    /// Create the demo admin, demo customer and their holdings (idempotent)
    SeedDemo {
        /// Env var holding the password given to both demo accounts
        #[arg(long, default_value = "OMS_DEMO_PASSWORD")]
        password_env: String,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    Status,

    /// Apply SQL migrations.
    Migrate,
}

#[derive(Subcommand)]
enum CustomerCmd {
    /// Register a customer with a bcrypt-hashed password
    Add {
        #[arg(long)]
        email: String,

        /// ROLE_CUSTOMER | ROLE_ADMIN
        #[arg(long, default_value = "ROLE_CUSTOMER")]
        role: String,

        /// Env var holding the plaintext password
        #[arg(long, default_value = "OMS_CUSTOMER_PASSWORD")]
        password_env: String,
    },
}

#[derive(Subcommand)]
enum AssetCmd {
    /// Credit usable balance, creating the holding if needed
    Deposit {
        #[arg(long)]
        customer_id: String,

        #[arg(long)]
        asset: String,

        /// Decimal amount, at most 6 fraction digits
        #[arg(long)]
        amount: String,
    },
}

#[derive(Subcommand)]
enum OrderCmd {
    /// Settle a PENDING order (PENDING -> MATCHED)
    Match {
        #[arg(long)]
        order_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();
    let retries = cli.max_retries;

    match cli.cmd {
        Commands::Db { cmd } => {
            let pool = oms_db::connect_from_env().await?;
            match cmd {
                DbCmd::Status => {
                    let s = oms_db::status(&pool).await?;
                    println!("db_ok={} has_oms_schema={}", s.ok, s.has_oms_schema);
                }
                DbCmd::Migrate => {
                    oms_db::migrate(&pool).await?;
                    println!("migrations_applied=true");
                }
            }
        }

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = oms_config::load_layered_yaml(&path_refs)?;
            loaded.settings()?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Customer { cmd } => match cmd {
            CustomerCmd::Add {
                email,
                role,
                password_env,
            } => book::customer_add(&email, &role, &password_env).await?,
        },

        Commands::Asset { cmd } => match cmd {
            AssetCmd::Deposit {
                customer_id,
                asset,
                amount,
            } => book::asset_deposit(&customer_id, &asset, &amount, retries).await?,
        },

        Commands::Order { cmd } => match cmd {
            OrderCmd::Match { order_id } => book::order_match(&order_id, retries).await?,
        },

        Commands::SeedDemo { password_env } => book::seed_demo(&password_env, retries).await?,
    }

    Ok(())
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .init();
}
