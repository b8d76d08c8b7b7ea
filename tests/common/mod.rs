//! Common test utilities for database-backed integration tests.
//!
//! Each test gets its own SQLite file under a fresh `tempfile::TempDir`,
//! giving the same per-test isolation the teacher gets from a disposable
//! Postgres database, without needing a running server.

use anyhow::{Context, Result};
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use notam_monitor::notam_repo::{NotamRepo, SqlitePool};
use notam_monitor::search_run_repo::SearchRunRepo;
use tempfile::TempDir;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Owns the `TempDir` so the backing file outlives the pool; dropped at the
/// end of each test along with its directory.
pub struct TestDatabase {
    _dir: TempDir,
    pool: SqlitePool,
}

impl TestDatabase {
    pub fn new() -> Result<Self> {
        let dir = TempDir::new().context("creating temp dir")?;
        let db_path = dir.path().join("notam-monitor-test.sqlite3");

        let manager = ConnectionManager::<SqliteConnection>::new(db_path.to_str().unwrap());
        let pool = Pool::builder()
            .max_size(4)
            .build(manager)
            .context("building sqlite pool")?;

        {
            let mut conn = pool.get().context("checkout connection for migrations")?;
            conn.run_pending_migrations(MIGRATIONS)
                .map_err(|err| anyhow::anyhow!("running migrations: {err}"))?;
        }

        Ok(Self { _dir: dir, pool })
    }

    pub fn pool(&self) -> SqlitePool {
        self.pool.clone()
    }

    pub fn notam_repo(&self) -> NotamRepo {
        NotamRepo::new(self.pool())
    }

    pub fn search_run_repo(&self) -> SearchRunRepo {
        SearchRunRepo::new(self.pool())
    }
}
