//! The `Notam` domain record: the central entity of the store.
//!
//! Classification flags are computed once, at parse time, and stored as
//! immutable fields rather than recomputed lazily — the scorer consumes the
//! materialized fields instead of re-deriving them.

use crate::config::Config;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotamKind {
    New,
    Replace,
    Cancel,
}

impl NotamKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotamKind::New => "NEW",
            NotamKind::Replace => "REPLACE",
            NotamKind::Cancel => "CANCEL",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "NEW" => Some(NotamKind::New),
            "REPLACE" => Some(NotamKind::Replace),
            "CANCEL" => Some(NotamKind::Cancel),
            _ => None,
        }
    }
}

impl fmt::Display for NotamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A parsed, classified, scored NOTAM.
#[derive(Debug, Clone)]
pub struct Notam {
    // Identity
    pub id: String,
    pub series: String,
    pub number: Option<i32>,
    pub year: Option<i32>,

    // Kind
    pub kind: NotamKind,
    pub replaces_id: Option<String>,
    pub cancels_id: Option<String>,

    // Q-line
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

    // Lettered fields
    pub location: Option<String>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_to: Option<DateTime<Utc>>,
    pub is_permanent: bool,
    pub schedule: Option<String>,
    pub body: Option<String>,
    pub lower_limit_text: Option<String>,
    pub upper_limit_text: Option<String>,

    // Source metadata
    pub airport_code: Option<String>,
    pub airport_name: Option<String>,
    pub issue_date: Option<DateTime<Utc>>,
    pub source: Option<String>,
    pub source_type: Option<String>,
    pub transaction_id: Option<i64>,
    pub has_history: bool,
    pub raw_icao_message: Option<String>,

    // Classification (materialized at parse time)
    pub is_closure: bool,
    pub is_drone_related: bool,
    pub is_restriction: bool,
    pub is_trigger: bool,

    // Derived
    pub search_term: Option<String>,
    pub priority_score: i32,
}

const CLOSURE_CONDITION_CODES: [&str; 4] = ["LC", "LI", "LN", "LV"];
const CLOSURE_KEYWORDS: [&str; 8] = [
    "closed",
    "clsd",
    "closure",
    "not avbl",
    "unavailable",
    "suspended",
    "ad clsd",
    "airport closed",
];
const CLOSURE_KEYWORDS_EXTRA: [&str; 2] = ["rwy closed", "runway closed"];
const RESTRICTION_SUBJECT_CODES: [&str; 6] = ["RD", "RP", "RR", "RT", "RA", "WU"];
const RESTRICTION_KEYWORDS: [&str; 5] = [
    "restricted area",
    "prohibited area",
    "danger area",
    "temporary restricted",
    "activated",
];

/// Computes `is_closure` from the Q-code condition letters and the body text.
pub fn classify_is_closure(q_code: Option<&str>, body: Option<&str>) -> bool {
    if let Some(code) = q_code {
        if code.len() >= 5 && CLOSURE_CONDITION_CODES.contains(&&code[3..5]) {
            return true;
        }
    }
    let Some(body) = body else { return false };
    let lower = body.to_lowercase();
    CLOSURE_KEYWORDS
        .iter()
        .chain(CLOSURE_KEYWORDS_EXTRA.iter())
        .any(|kw| lower.contains(kw))
}

/// Computes `is_drone_related` by matching `keywords` against the body with
/// word boundaries, so e.g. `uas` does not match inside `causality`.
pub fn classify_is_drone_related(body: Option<&str>, keywords: &[String]) -> bool {
    let Some(body) = body else { return false };
    let lower = body.to_lowercase();
    keywords.iter().any(|kw| word_boundary_match(&lower, kw))
}

/// Cache of one compiled `\bkeyword\b` regex per distinct keyword seen so
/// far, mirroring the original's `re.search(r'\bKEYWORD\b', ...)` check
/// (including its `_` as a word character) instead of a hand-rolled
/// alphanumeric boundary check.
static KEYWORD_BOUNDARY_RE: Lazy<Mutex<HashMap<String, Regex>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

fn word_boundary_match(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    let mut cache = KEYWORD_BOUNDARY_RE.lock().unwrap();
    let re = cache.entry(needle.to_string()).or_insert_with(|| {
        Regex::new(&format!(r"\b{}\b", regex::escape(needle))).expect("valid keyword regex")
    });
    re.is_match(haystack)
}

/// Computes `is_restriction` from the Q-code subject letters and the body text.
pub fn classify_is_restriction(q_code: Option<&str>, body: Option<&str>) -> bool {
    if let Some(code) = q_code {
        if code.len() >= 3 && RESTRICTION_SUBJECT_CODES.contains(&&code[1..3]) {
            return true;
        }
    }
    let Some(body) = body else { return false };
    let lower = body.to_lowercase();
    RESTRICTION_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

/// Computes `is_trigger`: true iff the body, trimmed and upper-cased, starts
/// with "TRIGGER NOTAM".
pub fn classify_is_trigger(body: Option<&str>) -> bool {
    body.map(|b| b.trim().to_uppercase().starts_with("TRIGGER NOTAM"))
        .unwrap_or(false)
}

/// Additive priority rubric, clamped to `max(0, sum)`.
pub fn score(
    config: &Config,
    kind: NotamKind,
    is_closure: bool,
    is_drone_related: bool,
    is_restriction: bool,
    is_trigger: bool,
    is_permanent: bool,
    scope: Option<&str>,
) -> i32 {
    let mut total: i32 = 0;

    if is_closure {
        total += config.closure_score;
    }
    if is_drone_related {
        total += config.drone_score;
    }
    match kind {
        NotamKind::New => total += 10,
        NotamKind::Replace => total += 5,
        NotamKind::Cancel => {}
    }
    if scope.map(|s| s.contains('A')).unwrap_or(false) {
        total += 10;
    }
    if is_permanent {
        total += 5;
    }
    if is_trigger {
        total -= 10;
    }
    if is_restriction && !is_closure {
        total += config.restriction_score;
    }

    total.max(0)
}

impl Notam {
    /// Human-readable multi-line summary suitable for a notifier alert body.
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();

        let mut header = format!(
            "{} | {}",
            self.id,
            self.airport_code
                .as_deref()
                .or(self.location.as_deref())
                .unwrap_or("Unknown")
        );
        if let Some(name) = &self.airport_name {
            header.push_str(&format!(" ({name})"));
        }
        lines.push(header.clone());
        lines.push("=".repeat(header.len()));

        let mut type_str = format!("Type: {}", self.kind);
        if let Some(r) = &self.replaces_id {
            type_str.push_str(&format!(" (replaces {r})"));
        }
        if let Some(c) = &self.cancels_id {
            type_str.push_str(&format!(" (cancels {c})"));
        }
        lines.push(type_str);

        let mut valid_str = "Valid: ".to_string();
        if let Some(from) = self.valid_from {
            valid_str.push_str(&from.format("%Y-%m-%d %H:%M UTC").to_string());
        }
        if let Some(to) = self.valid_to {
            valid_str.push_str(&format!(" \u{2192} {}", to.format("%Y-%m-%d %H:%M UTC")));
        } else if self.is_permanent {
            valid_str.push_str(" \u{2192} PERMANENT");
        }
        lines.push(valid_str);

        if let Some(schedule) = &self.schedule {
            lines.push(format!("Schedule: {schedule}"));
        }

        if self.q_subject.is_some() || self.q_condition.is_some() {
            let mut q_str = "Q-Code: ".to_string();
            if let Some(subject) = &self.q_subject {
                q_str.push_str(subject);
            }
            if let Some(condition) = &self.q_condition {
                q_str.push_str(&format!(" \u{2014} {condition}"));
            }
            lines.push(q_str);
        }

        if let Some(body) = &self.body {
            let mut preview = body.replace('\n', " ").trim().to_string();
            if preview.len() > 200 {
                preview.truncate(200);
                preview.push_str("...");
            }
            lines.push(format!("\n{preview}"));
        }

        lines.push(format!("\nPriority Score: {}", self.priority_score));
        if self.is_closure {
            lines.push("CLOSURE".to_string());
        }
        if self.is_drone_related {
            lines.push("DRONE ACTIVITY".to_string());
        }
        if self.is_restriction {
            lines.push("RESTRICTION".to_string());
        }

        lines.join("\n")
    }
}

impl fmt::Display for Notam {
    /// Compact single-line representation, analogous to the original's repr.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut flags = Vec::new();
        if self.is_closure {
            flags.push("CLS");
        }
        if self.is_drone_related {
            flags.push("DRN");
        }
        if self.is_restriction {
            flags.push("RST");
        }
        if self.is_permanent {
            flags.push("PERM");
        }
        let flag_str = if flags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", flags.join(","))
        };

        write!(
            f,
            "<Notam {} {} score={}{}>",
            self.id,
            self.airport_code
                .as_deref()
                .or(self.location.as_deref())
                .unwrap_or("N/A"),
            self.priority_score,
            flag_str
        )
    }
}
