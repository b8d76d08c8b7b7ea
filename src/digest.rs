//! Batching digest notifier: accumulates high-priority NOTAMs under a mutex
//! and flushes them into one POST on a fixed interval, plus a forced flush
//! on shutdown.
//!
//! The accumulator is the only shared mutable state in the process. Critical
//! sections are kept short: the timer snapshots under the lock, releases it,
//! then sends — it never holds the mutex across the HTTP call.

use crate::config::Config;
use crate::notam::Notam;
use chrono::Utc;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

const SEND_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Default)]
struct Accumulator {
    notams: Vec<Notam>,
    total: u32,
    closures: u32,
    drone: u32,
    restrictions: u32,
    airports: std::collections::HashSet<String>,
}

pub struct Digester {
    client: Client,
    url: Option<String>,
    min_score: i32,
    max_items: usize,
    interval: Duration,
    accumulator: Arc<Mutex<Accumulator>>,
}

impl Digester {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(SEND_TIMEOUT).build()?;
        Ok(Self {
            client,
            url: config.ntfy_url.clone(),
            min_score: config.ntfy_min_score,
            max_items: config.ntfy_max_digest_items,
            interval: config.ntfy_digest_interval,
            accumulator: Arc::new(Mutex::new(Accumulator::default())),
        })
    }

    /// Appends `notam` to the accumulator iff its score clears the digest
    /// threshold and a push URL is configured.
    pub async fn add(&self, notam: Notam) {
        if self.url.is_none() {
            return;
        }
        if notam.priority_score < self.min_score {
            return;
        }

        let mut guard = self.accumulator.lock().await;
        guard.total += 1;
        if notam.is_closure {
            guard.closures += 1;
        }
        if notam.is_drone_related {
            guard.drone += 1;
        }
        if notam.is_restriction {
            guard.restrictions += 1;
        }
        if let Some(code) = &notam.airport_code {
            guard.airports.insert(code.clone());
        }
        let queue_len = guard.notams.len() + 1;
        guard.notams.push(notam);
        debug!(queue_len, "added notam to digest queue");
    }

    /// Spawns the background timer task that flushes every `interval`.
    /// Returns immediately; the task runs for the lifetime of the process.
    pub fn spawn_timer(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            if self.url.is_none() {
                return;
            }
            info!(
                interval_secs = self.interval.as_secs(),
                min_score = self.min_score,
                "digest timer started"
            );
            loop {
                tokio::time::sleep(self.interval).await;
                if let Err(err) = self.flush().await {
                    error!(error = %err, "error sending digest");
                }
            }
        })
    }

    /// Forces an out-of-band flush; used once on cooperative shutdown.
    pub async fn flush_now(&self) -> anyhow::Result<bool> {
        self.flush().await
    }

    async fn flush(&self) -> anyhow::Result<bool> {
        let Some(url) = &self.url else {
            return Ok(false);
        };

        let snapshot = {
            let mut guard = self.accumulator.lock().await;
            if guard.notams.is_empty() {
                debug!("no notams to digest");
                return Ok(false);
            }
            std::mem::take(&mut *guard)
        };

        let mut notams = snapshot.notams;
        notams.sort_by(|a, b| b.priority_score.cmp(&a.priority_score));

        let title = format!("NOTAM Digest: {} new high-priority items", snapshot.total);
        let body = build_digest_body(&snapshot, &notams, self.max_items, url);

        let result = self
            .client
            .post(url)
            .header("Title", sanitize_latin1(&title))
            .header("Priority", "default")
            .header("Tags", "bell")
            .body(body)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                info!(total = snapshot.total, "digest sent");
                Ok(true)
            }
            Ok(response) => {
                error!(status = %response.status(), "digest rejected");
                Ok(false)
            }
            Err(err) => {
                error!(error = %err, "failed to send digest");
                Ok(false)
            }
        }
    }
}

fn build_digest_body(snapshot: &Accumulator, sorted: &[Notam], max_items: usize, url: &str) -> String {
    let mut parts = vec![
        "Summary".to_string(),
        format!("- Total: {}", snapshot.total),
        format!("- Closures: {}", snapshot.closures),
        format!("- Drone-related: {}", snapshot.drone),
        format!("- Restrictions: {}", snapshot.restrictions),
        format!("- Airports affected: {}", snapshot.airports.len()),
        String::new(),
        format!("Period: {}", Utc::now().format("%Y-%m-%d %H:%M UTC")),
        String::new(),
    ];

    if !sorted.is_empty() {
        parts.push("Top Items".to_string());
        for (idx, notam) in sorted.iter().take(max_items).enumerate() {
            let airport = notam
                .airport_code
                .as_deref()
                .or(notam.location.as_deref())
                .unwrap_or("Unknown");
            let mut flags = Vec::new();
            if notam.is_closure {
                flags.push("CLOSURE");
            }
            if notam.is_drone_related {
                flags.push("DRONE");
            }
            if notam.is_restriction {
                flags.push("RESTRICTED");
            }
            let flag_str = if flags.is_empty() {
                String::new()
            } else {
                format!(" [{}]", flags.join(", "))
            };

            let mut preview = notam
                .body
                .as_deref()
                .unwrap_or("")
                .replace('\n', " ")
                .trim()
                .to_string();
            if preview.len() > 100 {
                preview.truncate(100);
                preview.push_str("...");
            }

            parts.push(format!(
                "\n{}. {} - {} (Score: {}){}\n   {}",
                idx + 1,
                notam.id,
                airport,
                notam.priority_score,
                flag_str,
                preview
            ));
        }
        if sorted.len() > max_items {
            parts.push(format!("\n... and {} more", sorted.len() - max_items));
        }
    }

    parts.push(format!("\n{}", url));
    parts.join("\n")
}

fn sanitize_latin1(input: &str) -> String {
    input.chars().filter(|c| (*c as u32) <= 0xFF).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn test_config(url: Option<&str>) -> Config {
        Config {
            log_level: "INFO".into(),
            version: "v1".into(),
            database_path: ":memory:".into(),
            notam_api_url: "https://example.test".into(),
            notam_api_key: "".into(),
            airports: vec!["EGLL".into()],
            search_terms: vec![],
            update_interval: Duration::from_secs(3600),
            min_request_delay: 2.0,
            max_request_delay: 5.0,
            drone_keywords: vec!["drone".into()],
            closure_score: 50,
            drone_score: 30,
            restriction_score: 20,
            ntfy_url: url.map(|s| s.to_string()),
            ntfy_digest_interval: Duration::from_secs(3600),
            ntfy_min_score: 80,
            ntfy_max_digest_items: 10,
            purge_expired_after_days: 30,
            purge_cancelled_after_days: 7,
        }
    }

    #[tokio::test]
    async fn add_without_url_is_a_noop() {
        let digester = Digester::new(&test_config(None)).unwrap();
        let notam = sample_notam(90);
        digester.add(notam).await;
        let guard = digester.accumulator.lock().await;
        assert_eq!(guard.total, 0);
    }

    #[tokio::test]
    async fn add_below_threshold_is_dropped() {
        let digester = Digester::new(&test_config(Some("https://ntfy.example/topic"))).unwrap();
        digester.add(sample_notam(10)).await;
        let guard = digester.accumulator.lock().await;
        assert_eq!(guard.total, 0);
    }

    #[tokio::test]
    async fn add_above_threshold_is_queued() {
        let digester = Digester::new(&test_config(Some("https://ntfy.example/topic"))).unwrap();
        digester.add(sample_notam(90)).await;
        let guard = digester.accumulator.lock().await;
        assert_eq!(guard.total, 1);
    }

    fn sample_notam(score: i32) -> Notam {
        use crate::notam::NotamKind;
        Notam {
            id: "A1/25".into(),
            series: "A".into(),
            number: Some(1),
            year: Some(25),
            kind: NotamKind::New,
            replaces_id: None,
            cancels_id: None,
            fir: None,
            q_code: None,
            q_subject: None,
            q_condition: None,
            traffic: None,
            purpose: None,
            scope: None,
            lower_limit: None,
            upper_limit: None,
            coordinates: None,
            latitude: None,
            longitude: None,
            radius_nm: None,
            location: None,
            valid_from: None,
            valid_to: None,
            is_permanent: false,
            schedule: None,
            body: Some("TEST".into()),
            lower_limit_text: None,
            upper_limit_text: None,
            airport_code: Some("EGLL".into()),
            airport_name: None,
            issue_date: None,
            source: None,
            source_type: None,
            transaction_id: None,
            has_history: false,
            raw_icao_message: None,
            is_closure: false,
            is_drone_related: false,
            is_restriction: false,
            is_trigger: false,
            search_term: None,
            priority_score: score,
        }
    }
}
