use anyhow::{Context, Result};
use clap::Parser;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use notam_monitor::config::Config;
use notam_monitor::notam_repo::NotamRepo;
use notam_monitor::scheduler::Scheduler;
use notam_monitor::search_run_repo::SearchRunRepo;
use std::path::Path;
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Continuous NOTAM ingestion and classification service.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Run a single poll cycle and exit instead of looping.
    #[arg(long)]
    once: bool,

    /// Override the fetcher mode instead of deriving it from config.
    #[arg(long, value_parser = ["aerodrome", "search", "authenticated"])]
    mode: Option<String>,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("fatal: {err:#}");
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    if let Some(mode) = &args.mode {
        unsafe {
            std::env::set_var("NOTAM_MODE", mode);
        }
    }

    let config = Arc::new(Config::from_env().context("loading configuration")?);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!(version = %config.version, "notam-monitor starting");

    if let Some(parent) = Path::new(&config.database_path).parent() {
        std::fs::create_dir_all(parent).context("creating database directory")?;
    }

    let manager = ConnectionManager::<SqliteConnection>::new(&config.database_path);
    let pool = Pool::builder()
        .build(manager)
        .context("building sqlite connection pool")?;

    {
        let mut conn = pool.get().context("checking out connection for migrations")?;
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|err| anyhow::anyhow!("running migrations: {err}"))?;
    }

    let notam_repo = NotamRepo::new(pool.clone());
    let search_run_repo = SearchRunRepo::new(pool);

    let scheduler = Scheduler::new(Arc::clone(&config), notam_repo, search_run_repo)?;
    scheduler.run(args.once).await.context("scheduler loop")?;

    tracing::info!("notam-monitor exiting cleanly");
    Ok(())
}
