//! Immediate push-notification alerts via a configured ntfy-style endpoint.
//!
//! Active only when `NTFY_URL` is set. The digest accumulator lives in
//! [`crate::digest`]; this module is the single-notam alert path.

use crate::config::Config;
use crate::notam::{Notam, NotamKind};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error, info};

const SEND_TIMEOUT: Duration = Duration::from_secs(10);

pub struct Notifier {
    client: Client,
    url: Option<String>,
    min_score: i32,
}

impl Notifier {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(SEND_TIMEOUT).build()?;
        Ok(Self {
            client,
            url: config.ntfy_url.clone(),
            min_score: config.ntfy_min_score,
        })
    }

    /// True iff `score >= min_score`, excluding CANCEL kind below 80.
    pub fn should_alert(&self, notam: &Notam) -> bool {
        if self.url.is_none() {
            return false;
        }
        if notam.kind == NotamKind::Cancel && notam.priority_score < 80 {
            return false;
        }
        notam.priority_score >= self.min_score
    }

    /// Sends an immediate alert if `should_alert` passes. Transport errors
    /// are logged only; the caller never sees a failure propagate.
    pub async fn send(&self, notam: &Notam) {
        let Some(url) = &self.url else {
            return;
        };
        if !self.should_alert(notam) {
            debug!(
                id = %notam.id,
                score = notam.priority_score,
                "below alert threshold"
            );
            return;
        }

        let mut title = format!(
            "{} \u{2014} {}",
            notam.id,
            notam
                .airport_code
                .as_deref()
                .or(notam.location.as_deref())
                .unwrap_or("Unknown")
        );
        if let Some(name) = &notam.airport_name {
            title.push_str(&format!(" ({name})"));
        }
        let title = sanitize_latin1(&title);

        let body = notam.summary();
        let priority = priority_for(notam.priority_score);
        let tags = tags_for(notam).join(",");

        let result = self
            .client
            .post(url)
            .header("Title", title)
            .header("Priority", priority)
            .header("Tags", tags)
            .body(body)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                info!(id = %notam.id, score = notam.priority_score, "alert sent");
            }
            Ok(response) => {
                error!(id = %notam.id, status = %response.status(), "ntfy alert rejected");
            }
            Err(err) => {
                error!(id = %notam.id, error = %err, "failed to send ntfy alert");
            }
        }
    }
}

fn priority_for(score: i32) -> &'static str {
    if score >= 80 {
        "urgent"
    } else if score >= 60 {
        "high"
    } else if score >= 40 {
        "default"
    } else {
        "low"
    }
}

fn tags_for(notam: &Notam) -> Vec<&'static str> {
    let mut tags = Vec::new();
    if notam.is_closure {
        tags.push("warning");
    }
    if notam.is_drone_related {
        tags.push("airplane");
    }
    if notam.is_restriction {
        tags.push("no_entry");
    }
    if notam.is_permanent {
        tags.push("heavy_plus_sign");
    }
    tags
}

/// HTTP headers must be Latin-1; non-Latin-1 bytes are stripped rather than
/// causing the send to fail.
fn sanitize_latin1(input: &str) -> String {
    input.chars().filter(|c| (*c as u32) <= 0xFF).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_non_latin1() {
        assert_eq!(sanitize_latin1("A3097/25 \u{2014} EGLL"), "A3097/25  EGLL");
    }

    #[test]
    fn priority_buckets() {
        assert_eq!(priority_for(85), "urgent");
        assert_eq!(priority_for(65), "high");
        assert_eq!(priority_for(45), "default");
        assert_eq!(priority_for(10), "low");
    }
}
