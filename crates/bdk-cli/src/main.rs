use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "backdesk")]
#[command(about = "Backdesk admin CLI", long_about = None)]
struct Cli {
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
}

#[derive(Subcommand)]
enum DbCmd {
    /// Connectivity + schema presence.
    Status,

    /// Apply embedded SQL migrations.
    Migrate,

    /// Insert the demo product set (idempotent).
    SeedDemo,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Dev convenience; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Db { cmd } => match cmd {
            DbCmd::Status => {
                let pool = bdk_db::connect_from_env().await?;
                let st = bdk_db::status(&pool).await?;
                println!("ok={} has_orders_table={}", st.ok, st.has_orders_table);
            }
            DbCmd::Migrate => {
                let pool = bdk_db::connect_from_env().await?;
                bdk_db::migrate(&pool).await?;
                println!("migrations applied");
            }
            DbCmd::SeedDemo => {
                let pool = bdk_db::connect_from_env().await?;
                let inserted = bdk_db::seed_demo(&pool).await?;
                println!("seeded {inserted} demo products");
            }
        },
    }

    Ok(())
}
