//! Repository for the `search_runs` audit relation: one immutable row per
//! poll cycle, plus retention.

use crate::notam_repo::SqlitePool;
use crate::schema::search_runs;
use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use diesel::prelude::*;

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = search_runs)]
pub struct NewSearchRun {
    pub mode: String,
    pub search_term: Option<String>,
    pub airport_codes: Option<String>,
    pub total_fetched: i32,
    pub new_inserted: i32,
    pub updated: i32,
}

pub struct SearchRunRepo {
    pool: SqlitePool,
}

impl SearchRunRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Logs one cycle's counters. `run_at` is assigned by the database clock.
    pub async fn log(&self, run: NewSearchRun) -> Result<i32> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<i32> {
            let mut conn = pool.get().context("checkout sqlite connection")?;
            let now = Utc::now().naive_utc();

            diesel::insert_into(search_runs::table)
                .values((
                    search_runs::mode.eq(run.mode),
                    search_runs::search_term.eq(run.search_term),
                    search_runs::airport_codes.eq(run.airport_codes),
                    search_runs::total_fetched.eq(run.total_fetched),
                    search_runs::new_inserted.eq(run.new_inserted),
                    search_runs::updated.eq(run.updated),
                    search_runs::run_at.eq(now),
                ))
                .execute(&mut conn)
                .context("insert search run")?;

            let id: i32 = search_runs::table
                .select(diesel::dsl::max(search_runs::id))
                .first::<Option<i32>>(&mut conn)
                .context("fetch last insert id")?
                .unwrap_or_default();
            Ok(id)
        })
        .await
        .context("join search run insert task")?
    }

    /// Deletes audit rows older than `keep_days` (default 90 per spec).
    pub async fn purge_old(&self, keep_days: i64) -> Result<usize> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<usize> {
            let mut conn = pool.get().context("checkout sqlite connection")?;
            let cutoff = Utc::now().naive_utc() - Duration::days(keep_days);
            let deleted = diesel::delete(search_runs::table.filter(search_runs::run_at.lt(cutoff)))
                .execute(&mut conn)
                .context("purge old search runs")?;
            Ok(deleted)
        })
        .await
        .context("join purge task")?
    }
}
