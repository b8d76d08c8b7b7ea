//! Repository for the `notams` relation: idempotent upsert, display queries,
//! retention purges and summary statistics.
//!
//! Follows the teacher's repository-over-pool idiom: the struct holds a
//! `SqlitePool`, each method opens a connection from the pool and runs the
//! blocking diesel call inside `spawn_blocking` so the async scheduler loop
//! never blocks on disk I/O.

use crate::notam::{Notam, NotamKind};
use crate::schema::notams;
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sqlite::SqliteConnection;

pub type SqlitePool = Pool<ConnectionManager<SqliteConnection>>;

#[derive(Queryable, Debug, Clone)]
pub struct NotamRow {
    pub id: i32,
    pub notam_id: String,
    pub series: String,
    pub number: Option<i32>,
    pub year: Option<i32>,
    pub kind: String,
    pub replaces_id: Option<String>,
    pub cancels_id: Option<String>,
    pub fir: Option<String>,
    pub q_code: Option<String>,
    pub q_subject: Option<String>,
    pub q_condition: Option<String>,
    pub traffic: Option<String>,
    pub purpose: Option<String>,
    pub scope: Option<String>,
    pub lower_limit: Option<i32>,
    pub upper_limit: Option<i32>,
    pub coordinates: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub radius_nm: Option<i32>,
    pub location: Option<String>,
    pub valid_from: Option<NaiveDateTime>,
    pub valid_to: Option<NaiveDateTime>,
    pub is_permanent: bool,
    pub schedule: Option<String>,
    pub body: Option<String>,
    pub lower_limit_text: Option<String>,
    pub upper_limit_text: Option<String>,
    pub airport_code: Option<String>,
    pub airport_name: Option<String>,
    pub issue_date: Option<NaiveDateTime>,
    pub source: Option<String>,
    pub source_type: Option<String>,
    pub transaction_id: Option<i64>,
    pub has_history: bool,
    pub raw_icao_message: Option<String>,
    pub is_closure: bool,
    pub is_drone_related: bool,
    pub is_restriction: bool,
    pub is_trigger: bool,
    pub search_term: Option<String>,
    pub priority_score: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = notams)]
struct NewNotam {
    notam_id: String,
    series: String,
    number: Option<i32>,
    year: Option<i32>,
    kind: String,
    replaces_id: Option<String>,
    cancels_id: Option<String>,
    fir: Option<String>,
    q_code: Option<String>,
    q_subject: Option<String>,
    q_condition: Option<String>,
    traffic: Option<String>,
    purpose: Option<String>,
    scope: Option<String>,
    lower_limit: Option<i32>,
    upper_limit: Option<i32>,
    coordinates: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    radius_nm: Option<i32>,
    location: Option<String>,
    valid_from: Option<NaiveDateTime>,
    valid_to: Option<NaiveDateTime>,
    is_permanent: bool,
    schedule: Option<String>,
    body: Option<String>,
    lower_limit_text: Option<String>,
    upper_limit_text: Option<String>,
    airport_code: Option<String>,
    airport_name: Option<String>,
    issue_date: Option<NaiveDateTime>,
    source: Option<String>,
    source_type: Option<String>,
    transaction_id: Option<i64>,
    has_history: bool,
    raw_icao_message: Option<String>,
    is_closure: bool,
    is_drone_related: bool,
    is_restriction: bool,
    is_trigger: bool,
    search_term: Option<String>,
    priority_score: i32,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

impl NewNotam {
    fn from_domain(notam: &Notam, now: NaiveDateTime, created_at: NaiveDateTime) -> Self {
        NewNotam {
            notam_id: notam.id.clone(),
            series: notam.series.clone(),
            number: notam.number,
            year: notam.year,
            kind: notam.kind.as_str().to_string(),
            replaces_id: notam.replaces_id.clone(),
            cancels_id: notam.cancels_id.clone(),
            fir: notam.fir.clone(),
            q_code: notam.q_code.clone(),
            q_subject: notam.q_subject.clone(),
            q_condition: notam.q_condition.clone(),
            traffic: notam.traffic.clone(),
            purpose: notam.purpose.clone(),
            scope: notam.scope.clone(),
            lower_limit: notam.lower_limit,
            upper_limit: notam.upper_limit,
            coordinates: notam.coordinates.clone(),
            latitude: notam.latitude,
            longitude: notam.longitude,
            radius_nm: notam.radius_nm,
            location: notam.location.clone(),
            valid_from: notam.valid_from.map(|d| d.naive_utc()),
            valid_to: notam.valid_to.map(|d| d.naive_utc()),
            is_permanent: notam.is_permanent,
            schedule: notam.schedule.clone(),
            body: notam.body.clone(),
            lower_limit_text: notam.lower_limit_text.clone(),
            upper_limit_text: notam.upper_limit_text.clone(),
            airport_code: notam.airport_code.clone(),
            airport_name: notam.airport_name.clone(),
            issue_date: notam.issue_date.map(|d| d.naive_utc()),
            source: notam.source.clone(),
            source_type: notam.source_type.clone(),
            transaction_id: notam.transaction_id,
            has_history: notam.has_history,
            raw_icao_message: notam.raw_icao_message.clone(),
            is_closure: notam.is_closure,
            is_drone_related: notam.is_drone_related,
            is_restriction: notam.is_restriction,
            is_trigger: notam.is_trigger,
            search_term: notam.search_term.clone(),
            priority_score: notam.priority_score,
            created_at,
            updated_at: now,
        }
    }
}

/// Summary counts used in the scheduler's per-cycle log line.
#[derive(Debug, Clone, Default)]
pub struct Statistics {
    pub total_notams: i64,
    pub active_notams: i64,
    pub closures: i64,
    pub active_closures: i64,
    pub drone_notams: i64,
    pub active_drone_notams: i64,
    pub high_priority: i64,
}

/// Whether an upsert created a new row or refreshed an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

pub struct NotamRepo {
    pool: SqlitePool,
}

impl NotamRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Idempotent upsert. Also applies the best-effort CANCEL side effect:
    /// when `notam.kind == Cancel` and `cancels_id` references an existing
    /// row, that row's kind is overwritten to CANCEL.
    pub async fn upsert(&self, notam: Notam) -> Result<UpsertOutcome> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<UpsertOutcome> {
            let mut conn = pool.get().context("checkout sqlite connection")?;

            let now = Utc::now().naive_utc();

            let existing_created_at: Option<NaiveDateTime> = notams::table
                .filter(notams::notam_id.eq(&notam.id))
                .select(notams::created_at)
                .first(&mut conn)
                .optional()
                .context("query existing notam")?;

            let outcome = match existing_created_at {
                Some(created_at) => {
                    let row = NewNotam::from_domain(&notam, now, created_at);
                    diesel::update(notams::table.filter(notams::notam_id.eq(&notam.id)))
                        .set(&row)
                        .execute(&mut conn)
                        .context("update existing notam")?;
                    UpsertOutcome::Updated
                }
                None => {
                    let row = NewNotam::from_domain(&notam, now, now);
                    diesel::insert_into(notams::table)
                        .values(&row)
                        .execute(&mut conn)
                        .context("insert new notam")?;
                    UpsertOutcome::Inserted
                }
            };

            if notam.kind == NotamKind::Cancel {
                if let Some(cancels_id) = &notam.cancels_id {
                    // Best-effort: failure here must not fail the primary upsert.
                    let _ = diesel::update(notams::table.filter(notams::notam_id.eq(cancels_id)))
                        .set((
                            notams::kind.eq(NotamKind::Cancel.as_str()),
                            notams::updated_at.eq(now),
                        ))
                        .execute(&mut conn);
                }
            }

            Ok(outcome)
        })
        .await
        .context("join upsert task")?
    }

    pub async fn active_notams(&self, min_score: i32) -> Result<Vec<NotamRow>> {
        self.query_active(min_score).await
    }

    pub async fn active_closures(&self) -> Result<Vec<NotamRow>> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<Vec<NotamRow>> {
            let mut conn = pool.get().context("checkout sqlite connection")?;
            let now = Utc::now().naive_utc();
            notams::table
                .filter(notams::is_closure.eq(true))
                .filter(notams::valid_to.is_null().or(notams::valid_to.gt(now)))
                .filter(notams::kind.ne(NotamKind::Cancel.as_str()))
                .order((notams::priority_score.desc(), notams::valid_from.desc()))
                .load(&mut conn)
                .context("query active closures")
        })
        .await
        .context("join query task")?
    }

    pub async fn active_drone_notams(&self) -> Result<Vec<NotamRow>> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<Vec<NotamRow>> {
            let mut conn = pool.get().context("checkout sqlite connection")?;
            let now = Utc::now().naive_utc();
            notams::table
                .filter(notams::is_drone_related.eq(true))
                .filter(notams::valid_to.is_null().or(notams::valid_to.gt(now)))
                .filter(notams::kind.ne(NotamKind::Cancel.as_str()))
                .order((notams::priority_score.desc(), notams::valid_from.desc()))
                .load(&mut conn)
                .context("query active drone notams")
        })
        .await
        .context("join query task")?
    }

    pub async fn by_search_term(&self, term: String, active_only: bool) -> Result<Vec<NotamRow>> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<Vec<NotamRow>> {
            let mut conn = pool.get().context("checkout sqlite connection")?;
            let now = Utc::now().naive_utc();
            let mut query = notams::table.filter(notams::search_term.eq(term)).into_boxed();
            if active_only {
                query = query
                    .filter(notams::valid_to.is_null().or(notams::valid_to.gt(now)))
                    .filter(notams::kind.ne(NotamKind::Cancel.as_str()));
            }
            query
                .order((notams::priority_score.desc(), notams::valid_from.desc()))
                .load(&mut conn)
                .context("query notams by search term")
        })
        .await
        .context("join query task")?
    }

    pub async fn by_airport(&self, airport_code: String, active_only: bool) -> Result<Vec<NotamRow>> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<Vec<NotamRow>> {
            let mut conn = pool.get().context("checkout sqlite connection")?;
            let now = Utc::now().naive_utc();
            let mut query = notams::table
                .filter(notams::airport_code.eq(airport_code))
                .into_boxed();
            if active_only {
                query = query
                    .filter(notams::valid_to.is_null().or(notams::valid_to.gt(now)))
                    .filter(notams::kind.ne(NotamKind::Cancel.as_str()));
            }
            query
                .order((notams::priority_score.desc(), notams::valid_from.desc()))
                .load(&mut conn)
                .context("query notams by airport")
        })
        .await
        .context("join query task")?
    }

    async fn query_active(&self, min_score: i32) -> Result<Vec<NotamRow>> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<Vec<NotamRow>> {
            let mut conn = pool.get().context("checkout sqlite connection")?;
            let now = Utc::now().naive_utc();
            notams::table
                .filter(notams::valid_to.is_null().or(notams::valid_to.gt(now)))
                .filter(notams::kind.ne(NotamKind::Cancel.as_str()))
                .filter(notams::priority_score.ge(min_score))
                .order((notams::priority_score.desc(), notams::valid_from.desc()))
                .load(&mut conn)
                .context("query active notams")
        })
        .await
        .context("join query task")?
    }

    pub async fn statistics(&self) -> Result<Statistics> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<Statistics> {
            let mut conn = pool.get().context("checkout sqlite connection")?;
            let now = Utc::now().naive_utc();

            let total_notams = notams::table.count().get_result(&mut conn)?;
            let active_notams = notams::table
                .filter(notams::valid_to.is_null().or(notams::valid_to.gt(now)))
                .filter(notams::kind.ne(NotamKind::Cancel.as_str()))
                .count()
                .get_result(&mut conn)?;
            let closures = notams::table
                .filter(notams::is_closure.eq(true))
                .count()
                .get_result(&mut conn)?;
            let active_closures = notams::table
                .filter(notams::is_closure.eq(true))
                .filter(notams::valid_to.is_null().or(notams::valid_to.gt(now)))
                .filter(notams::kind.ne(NotamKind::Cancel.as_str()))
                .count()
                .get_result(&mut conn)?;
            let drone_notams = notams::table
                .filter(notams::is_drone_related.eq(true))
                .count()
                .get_result(&mut conn)?;
            let active_drone_notams = notams::table
                .filter(notams::is_drone_related.eq(true))
                .filter(notams::valid_to.is_null().or(notams::valid_to.gt(now)))
                .filter(notams::kind.ne(NotamKind::Cancel.as_str()))
                .count()
                .get_result(&mut conn)?;
            let high_priority = notams::table
                .filter(notams::priority_score.ge(80))
                .count()
                .get_result(&mut conn)?;

            Ok(Statistics {
                total_notams,
                active_notams,
                closures,
                active_closures,
                drone_notams,
                active_drone_notams,
                high_priority,
            })
        })
        .await
        .context("join statistics task")?
    }

    pub async fn purge_expired(&self, after_days: i64) -> Result<usize> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<usize> {
            let mut conn = pool.get().context("checkout sqlite connection")?;
            let cutoff = Utc::now().naive_utc() - Duration::days(after_days);
            let deleted = diesel::delete(
                notams::table
                    .filter(notams::valid_to.is_not_null())
                    .filter(notams::valid_to.lt(cutoff)),
            )
            .execute(&mut conn)
            .context("purge expired notams")?;
            Ok(deleted)
        })
        .await
        .context("join purge task")?
    }

    pub async fn purge_cancelled(&self, after_days: i64) -> Result<usize> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<usize> {
            let mut conn = pool.get().context("checkout sqlite connection")?;
            let cutoff = Utc::now().naive_utc() - Duration::days(after_days);
            let deleted = diesel::delete(
                notams::table
                    .filter(notams::kind.eq(NotamKind::Cancel.as_str()))
                    .filter(notams::updated_at.lt(cutoff)),
            )
            .execute(&mut conn)
            .context("purge cancelled notams")?;
            Ok(deleted)
        })
        .await
        .context("join purge task")?
    }
}

/// Converts a stored row's naive-UTC timestamps into timezone-aware values.
pub fn as_utc(naive: NaiveDateTime) -> DateTime<Utc> {
    DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc)
}
