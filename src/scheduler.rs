//! Orchestrates one poll cycle: Fetch → Dedup → Parse → Classify+Score →
//! Upsert → Notifier, then a SearchRun audit row, Retention, and a
//! statistics log line.
//!
//! The original source has two near-identical monitor classes (airport mode,
//! search mode) that differ only in which fetcher strategy and which
//! SearchRun shape they use. Here both are expressed as one loop
//! parameterized by the configured [`FetchMode`].

use crate::config::{Config, FetchMode};
use crate::digest::Digester;
use crate::fetcher::Fetcher;
use crate::notam_repo::{NotamRepo, UpsertOutcome};
use crate::notifier::Notifier;
use crate::parser::parse_notam;
use crate::search_run_repo::{NewSearchRun, SearchRunRepo};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

pub struct Scheduler {
    config: Arc<Config>,
    fetcher: Fetcher,
    notam_repo: NotamRepo,
    search_run_repo: SearchRunRepo,
    notifier: Notifier,
    digester: Arc<Digester>,
}

impl Scheduler {
    pub fn new(
        config: Arc<Config>,
        notam_repo: NotamRepo,
        search_run_repo: SearchRunRepo,
    ) -> anyhow::Result<Self> {
        let fetcher = Fetcher::new((*config).clone())?;
        let notifier = Notifier::new(&config)?;
        let digester = Arc::new(Digester::new(&config)?);
        Ok(Self {
            config,
            fetcher,
            notam_repo,
            search_run_repo,
            notifier,
            digester,
        })
    }

    /// Runs cycles until `once` is true (single cycle) or a shutdown signal
    /// arrives. The digest timer task runs alongside the main loop and is
    /// flushed one final time before returning.
    pub async fn run(&self, once: bool) -> anyhow::Result<()> {
        let timer_handle = Arc::clone(&self.digester).spawn_timer();

        loop {
            // A started cycle always runs to completion: only the inter-cycle
            // sleep below races against the shutdown signal, so Ctrl+C never
            // drops an in-flight fetch/parse/upsert.
            if let Err(err) = self.run_cycle().await {
                error!(error = %err, "poll cycle failed");
            }

            if once {
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.update_interval) => {}
                _ = signal::ctrl_c() => {
                    info!("shutdown signal received during sleep");
                    break;
                }
            }
        }

        timer_handle.abort();
        if let Err(err) = self.digester.flush_now().await {
            error!(error = %err, "final digest flush failed");
        }

        Ok(())
    }

    async fn run_cycle(&self) -> anyhow::Result<()> {
        let started = std::time::Instant::now();
        let fetched = self.fetcher.fetch_all().await;
        let total_fetched = fetched.len() as i32;

        let mut new_inserted = 0;
        let mut updated = 0;

        for item in fetched {
            let Some(notam) = parse_notam(&self.config, &item.raw, item.search_term.as_deref())
            else {
                continue;
            };

            let id = notam.id.clone();
            let score = notam.priority_score;
            let to_notify = notam.clone();

            match self.notam_repo.upsert(notam).await {
                Ok(UpsertOutcome::Inserted) => new_inserted += 1,
                Ok(UpsertOutcome::Updated) => updated += 1,
                Err(err) => {
                    warn!(id = %id, error = %err, "failed to upsert notam, skipping record");
                    continue;
                }
            }

            self.notifier.send(&to_notify).await;
            self.digester.add(to_notify).await;
            let _ = score;
        }

        let mode = self.config.fetch_mode();
        let run = NewSearchRun {
            mode: mode_label(mode).to_string(),
            search_term: if mode == FetchMode::Search {
                Some(self.config.search_terms.join(","))
            } else {
                None
            },
            airport_codes: if mode != FetchMode::Search {
                Some(self.config.airports.join(","))
            } else {
                None
            },
            total_fetched,
            new_inserted,
            updated,
        };
        if let Err(err) = self.search_run_repo.log(run).await {
            warn!(error = %err, "failed to log search run");
        }

        if let Err(err) = self.notam_repo.purge_expired(self.config.purge_expired_after_days).await
        {
            warn!(error = %err, "purge_expired failed");
        }
        if let Err(err) = self
            .notam_repo
            .purge_cancelled(self.config.purge_cancelled_after_days)
            .await
        {
            warn!(error = %err, "purge_cancelled failed");
        }
        if let Err(err) = self.search_run_repo.purge_old(90).await {
            warn!(error = %err, "purge_old_search_runs failed");
        }

        match self.notam_repo.statistics().await {
            Ok(stats) => info!(
                total_fetched,
                new_inserted,
                updated,
                total_notams = stats.total_notams,
                active_notams = stats.active_notams,
                closures = stats.closures,
                active_closures = stats.active_closures,
                drone_notams = stats.drone_notams,
                high_priority = stats.high_priority,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "poll cycle complete"
            ),
            Err(err) => warn!(error = %err, "failed to compute statistics"),
        }

        Ok(())
    }
}

fn mode_label(mode: FetchMode) -> &'static str {
    match mode {
        FetchMode::Aerodrome => "aerodrome",
        FetchMode::Search => "search",
        FetchMode::Authenticated => "authenticated",
    }
}
