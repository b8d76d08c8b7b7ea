//! Strategy-selected HTTP fetcher.
//!
//! Three variants rather than a class hierarchy: Aerodrome, Search
//! (free-text, paginated) and Authenticated. Rate limiting and cross-target
//! deduplication are shared helpers parameterized by the variant rather than
//! inherited behavior.

use crate::config::{Config, FetchMode};
use crate::parser::RawNotam;
use rand::RngExt;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// One raw record plus the search term that retrieved it, if any.
pub struct FetchedNotam {
    pub raw: RawNotam,
    pub search_term: Option<String>,
}

pub struct Fetcher {
    client: Client,
    config: Config,
}

impl Fetcher {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, config })
    }

    /// Fetches and deduplicates NOTAMs across every configured target for
    /// the resolved [`FetchMode`].
    pub async fn fetch_all(&self) -> Vec<FetchedNotam> {
        match self.config.fetch_mode() {
            FetchMode::Aerodrome => self.fetch_aerodrome_targets().await,
            FetchMode::Search => self.fetch_search_targets().await,
            FetchMode::Authenticated => self.fetch_authenticated().await,
        }
    }

    async fn fetch_aerodrome_targets(&self) -> Vec<FetchedNotam> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        let targets = &self.config.airports;
        let total = targets.len();

        info!(count = total, "fetching NOTAMs for aerodrome targets");

        for (idx, code) in targets.iter().enumerate() {
            info!(code = %code, "[{}/{}] fetching aerodrome NOTAMs", idx + 1, total);
            match self.fetch_aerodrome(code).await {
                Ok(records) => push_deduped(&mut out, &mut seen, records, None),
                Err(err) => warn!(code = %code, error = %err, "aerodrome fetch failed"),
            }
            if idx + 1 < total {
                self.jittered_sleep().await;
            }
        }

        out
    }

    async fn fetch_search_targets(&self) -> Vec<FetchedNotam> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        let terms: Vec<&String> = self
            .config
            .search_terms
            .iter()
            .filter(|t| !t.is_empty())
            .collect();
        let total = terms.len();

        info!(count = total, "searching free-text NOTAM terms");

        for (idx, term) in terms.iter().enumerate() {
            info!(term = %term, "[{}/{}] searching term", idx + 1, total);
            self.search_term_paginated(term, &mut seen, &mut out).await;
            if idx + 1 < total {
                self.jittered_sleep().await;
            }
        }

        out
    }

    async fn fetch_authenticated(&self) -> Vec<FetchedNotam> {
        // Placeholder per the original's fallback: issue one GET with bearer
        // auth, else fall back to the aerodrome strategy's logic.
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        let targets = &self.config.airports;

        for code in targets {
            match self.fetch_authenticated_one(code).await {
                Ok(records) => push_deduped(&mut out, &mut seen, records, None),
                Err(err) => warn!(code = %code, error = %err, "authenticated fetch failed"),
            }
        }

        out
    }

    async fn search_term_paginated(
        &self,
        term: &str,
        seen: &mut HashSet<String>,
        out: &mut Vec<FetchedNotam>,
    ) {
        let mut offset: i64 = 0;
        let mut page = 1;

        loop {
            debug!(term = %term, page, offset, "fetching search page");
            let page_result = self.fetch_search_page(term, offset).await;
            let (records, total_count, end_record_count) = match page_result {
                Ok(value) => value,
                Err(err) => {
                    warn!(term = %term, error = %err, "search pagination aborted");
                    break;
                }
            };

            let retrieved = records.len();
            push_deduped(out, seen, records, Some(term.to_string()));

            if end_record_count >= total_count || retrieved == 0 {
                break;
            }

            offset = end_record_count;
            page += 1;
            self.jittered_sleep().await;
        }
    }

    async fn fetch_aerodrome(&self, code: &str) -> anyhow::Result<Vec<RawNotam>> {
        let payload = [
            ("searchType", "0".to_string()),
            ("designatorsForLocation", code.to_string()),
            ("notamsOnly", "true".to_string()),
            ("latLong", "".to_string()),
            ("radius", "10".to_string()),
        ];
        let body = self.post_form(&payload).await?;
        Ok(parse_aerodrome_response(body))
    }

    async fn fetch_authenticated_one(&self, code: &str) -> anyhow::Result<Vec<RawNotam>> {
        // Same logical request shape as the aerodrome strategy; the bearer
        // token is the only thing that differs.
        let response = self
            .client
            .post(&self.config.notam_api_url)
            .bearer_auth(&self.config.notam_api_key)
            .form(&[
                ("searchType", "0"),
                ("designatorsForLocation", code),
                ("notamsOnly", "true"),
                ("latLong", ""),
                ("radius", "10"),
            ])
            .header("Accept", "application/json")
            .send()
            .await?;
        let body = classify_and_extract(response).await?;
        Ok(parse_aerodrome_response(body))
    }

    async fn fetch_search_page(
        &self,
        term: &str,
        offset: i64,
    ) -> anyhow::Result<(Vec<RawNotam>, i64, i64)> {
        let payload = [
            ("searchType", "4".to_string()),
            ("freeFormText", term.to_string()),
            ("notamsOnly", "false".to_string()),
            ("latLong", "".to_string()),
            ("radius", "10".to_string()),
            ("offset", offset.to_string()),
        ];
        let body = self.post_form(&payload).await?;

        let notam_list = body
            .get("notamList")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let total_count = body.get("totalNotamCount").and_then(Value::as_i64).unwrap_or(0);
        let end_record_count = body.get("endRecordCount").and_then(Value::as_i64).unwrap_or(0);

        let records = notam_list
            .into_iter()
            .filter_map(|v| serde_json::from_value::<RawNotam>(v).ok())
            .collect();

        Ok((records, total_count, end_record_count))
    }

    async fn post_form(&self, payload: &[(&str, String)]) -> anyhow::Result<Value> {
        let response = self
            .client
            .post(&self.config.notam_api_url)
            .header(
                "Content-Type",
                "application/x-www-form-urlencoded; charset=UTF-8",
            )
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/json, text/javascript, */*; q=0.01")
            .header("Accept-Language", "en-US,en;q=0.9")
            .header("X-Requested-With", "XMLHttpRequest")
            .form(payload)
            .send()
            .await?;
        classify_and_extract(response).await
    }

    async fn jittered_sleep(&self) {
        let delay = {
            let mut rng = rand::rng();
            rng.random_range(self.config.min_request_delay..=self.config.max_request_delay)
        };
        debug!(delay, "rate-limit sleep before next request");
        tokio::time::sleep(Duration::from_secs_f64(delay)).await;
    }
}

async fn classify_and_extract(response: reqwest::Response) -> anyhow::Result<Value> {
    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        anyhow::bail!("rate limited (429)");
    }
    if !status.is_success() {
        anyhow::bail!("unexpected status {status}");
    }
    let value = response.json::<Value>().await?;
    Ok(value)
}

fn parse_aerodrome_response(body: Value) -> Vec<RawNotam> {
    let list = match body {
        Value::Array(items) => items,
        Value::Object(mut map) => map
            .remove("items")
            .or_else(|| map.remove("data"))
            .and_then(|v| v.as_array().cloned())
            .unwrap_or_default(),
        _ => Vec::new(),
    };
    list.into_iter()
        .filter_map(|v| serde_json::from_value::<RawNotam>(v).ok())
        .collect()
}

fn push_deduped(
    out: &mut Vec<FetchedNotam>,
    seen: &mut HashSet<String>,
    records: Vec<RawNotam>,
    search_term: Option<String>,
) {
    for raw in records {
        if let Some(id) = raw.notam_number.clone() {
            if seen.insert(id) {
                out.push(FetchedNotam {
                    raw,
                    search_term: search_term.clone(),
                });
            }
        }
    }
}
