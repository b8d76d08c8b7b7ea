//! Decodes one raw NOTAM envelope into a typed [`Notam`].
//!
//! The envelope arrives as an untyped JSON object from the fetcher. Parsing
//! is fallible only at the envelope level (a missing `notamNumber` drops the
//! record); every sub-field failure degrades to a null field rather than
//! aborting the parse.

use crate::config::Config;
use crate::notam::{
    classify_is_closure, classify_is_drone_related, classify_is_restriction,
    classify_is_trigger, score, Notam, NotamKind,
};
use crate::qcodes::{self, CONDITIONS, SUBJECTS};
use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

/// One raw NOTAM record as returned by the search endpoint.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawNotam {
    #[serde(rename = "notamNumber")]
    pub notam_number: Option<String>,
    #[serde(rename = "icaoMessage")]
    pub icao_message: Option<String>,
    #[serde(rename = "facilityDesignator")]
    pub facility_designator: Option<String>,
    #[serde(rename = "icaoId")]
    pub icao_id: Option<String>,
    #[serde(rename = "airportName")]
    pub airport_name: Option<String>,
    #[serde(rename = "issueDate")]
    pub issue_date: Option<String>,
    pub source: Option<String>,
    #[serde(rename = "sourceType")]
    pub source_type: Option<String>,
    #[serde(rename = "transactionID")]
    pub transaction_id: Option<i64>,
    #[serde(rename = "hasHistory")]
    #[serde(default)]
    pub has_history: bool,
    #[serde(rename = "cancelledOrExpired")]
    #[serde(default)]
    pub cancelled_or_expired: bool,
    #[serde(default)]
    pub status: Option<String>,
}

static REPLACES_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"NOTAMR\s+([A-Z]\d+/\d+)").unwrap());
static CANCELS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"NOTAMC\s+([A-Z]\d+/\d+)").unwrap());
static QLINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Q\)\s*([^)]+?)(?:\s+[A-Z]\)|\s*$)").unwrap());
static A_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"A\)\s*(\S+)").unwrap());
static B_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"B\)\s*(\d{10})").unwrap());
static C_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"C\)\s*(\d{10}|PERM)").unwrap());
static D_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"D\)\s*([^\n]+)").unwrap());
static E_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)E\)\s*(.*?)(?:\s*[FG]\)|$)").unwrap());
static F_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)F\)\s*(.*?)(?:\s+[G-Z]\)|$)").unwrap());
static G_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"G\)\s*([^\n]+)").unwrap());
static TZ_SUFFIX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*(EST|UTC|GMT)$").unwrap());

/// Parses one raw envelope into a [`Notam`], or `None` if it should be
/// skipped entirely (cancelled/expired, or missing identity).
pub fn parse_notam(config: &Config, raw: &RawNotam, search_term: Option<&str>) -> Option<Notam> {
    let is_expired_status = raw
        .status
        .as_deref()
        .map(|s| s.eq_ignore_ascii_case("expired"))
        .unwrap_or(false);
    if raw.cancelled_or_expired || is_expired_status {
        return None;
    }

    let notam_id = raw.notam_number.clone().filter(|s| !s.is_empty())?;
    let icao_message = raw.icao_message.clone().unwrap_or_default();

    let (series, number, year) = parse_identity(&notam_id);

    let first_line = icao_message.lines().next().unwrap_or("");
    let (kind, replaces_id, cancels_id) = if first_line.contains("NOTAMR") {
        let captured = REPLACES_RE
            .captures(first_line)
            .map(|c| c[1].to_string());
        (NotamKind::Replace, captured, None)
    } else if first_line.contains("NOTAMC") {
        let captured = CANCELS_RE.captures(first_line).map(|c| c[1].to_string());
        (NotamKind::Cancel, None, captured)
    } else {
        (NotamKind::New, None, None)
    };

    let mut fir = None;
    let mut q_code = None;
    let mut traffic = None;
    let mut purpose = None;
    let mut scope = None;
    let mut lower_limit = None;
    let mut upper_limit = None;
    let mut coordinates = None;
    let mut latitude = None;
    let mut longitude = None;
    let mut radius_nm = None;
    let mut q_subject = None;
    let mut q_condition = None;

    if let Some(captures) = QLINE_RE.captures(&icao_message) {
        let parts: Vec<&str> = captures[1].trim().split('/').collect();
        if parts.len() >= 8 {
            fir = non_empty(parts[0]);
            q_code = non_empty(parts[1]);
            traffic = non_empty(parts[2]);
            purpose = parts.get(3).and_then(|p| non_empty(p.trim()));
            scope = non_empty(parts[4]);
            lower_limit = parts[5].parse::<i32>().ok();
            upper_limit = parts[6].parse::<i32>().ok();
            coordinates = non_empty(parts[7]);

            if let Some(code) = &q_code {
                if code.len() >= 5 {
                    let subject_code = &code[1..3];
                    let condition_code = &code[3..5];
                    q_subject = Some(qcodes::decode(&SUBJECTS, subject_code));
                    q_condition = Some(qcodes::decode(&CONDITIONS, condition_code));
                }
            }

            if let Some(coord) = &coordinates {
                if coord.len() >= 11 {
                    if let Some(lat) = decode_lat(&coord[0..5]) {
                        latitude = Some(lat);
                    }
                    if let Some(lon) = decode_lon(&coord[5..11]) {
                        longitude = Some(lon);
                    }
                }
                if coord.len() >= 14 {
                    radius_nm = coord[11..14].parse::<i32>().ok();
                }
            }
        }
    }

    let location = A_RE.captures(&icao_message).map(|c| c[1].to_string());

    let valid_from = B_RE
        .captures(&icao_message)
        .and_then(|c| parse_icao_datetime(&c[1]));

    let (valid_to, is_permanent) = match C_RE.captures(&icao_message) {
        Some(c) if &c[1] == "PERM" => (None, true),
        Some(c) => match parse_icao_datetime(&c[1]) {
            Some(dt) => (Some(dt), false),
            None => (None, false),
        },
        None => (None, false),
    };

    let schedule = D_RE
        .captures(&icao_message)
        .map(|c| c[1].trim().to_string());

    let body = E_RE.captures(&icao_message).map(|c| {
        let raw_text = c[1].trim();
        html_unescape(raw_text)
    });

    let lower_limit_text = F_RE
        .captures(&icao_message)
        .map(|c| c[1].trim().to_string());
    let upper_limit_text = G_RE
        .captures(&icao_message)
        .map(|c| c[1].trim().to_string());

    let issue_date = raw
        .issue_date
        .as_deref()
        .and_then(parse_faa_date);

    let is_closure = classify_is_closure(q_code.as_deref(), body.as_deref());
    let is_drone_related = classify_is_drone_related(body.as_deref(), &config.drone_keywords);
    let is_restriction = classify_is_restriction(q_code.as_deref(), body.as_deref());
    let is_trigger = classify_is_trigger(body.as_deref());

    let priority_score = score(
        config,
        kind,
        is_closure,
        is_drone_related,
        is_restriction,
        is_trigger,
        is_permanent,
        scope.as_deref(),
    );

    Some(Notam {
        id: notam_id,
        series,
        number,
        year,
        kind,
        replaces_id,
        cancels_id,
        fir,
        q_code,
        q_subject,
        q_condition,
        traffic,
        purpose,
        scope,
        lower_limit,
        upper_limit,
        coordinates,
        latitude,
        longitude,
        radius_nm,
        location,
        valid_from,
        valid_to,
        is_permanent,
        schedule,
        body,
        lower_limit_text,
        upper_limit_text,
        airport_code: raw
            .facility_designator
            .clone()
            .or_else(|| raw.icao_id.clone()),
        airport_name: raw.airport_name.clone(),
        issue_date,
        source: raw.source.clone(),
        source_type: raw.source_type.clone(),
        transaction_id: raw.transaction_id,
        has_history: raw.has_history,
        raw_icao_message: Some(icao_message),
        is_closure,
        is_drone_related,
        is_restriction,
        is_trigger,
        search_term: search_term.map(|s| s.to_string()),
        priority_score,
    })
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

fn parse_identity(notam_id: &str) -> (String, Option<i32>, Option<i32>) {
    let series = notam_id
        .chars()
        .next()
        .map(|c| c.to_string())
        .unwrap_or_default();

    if let Some((num_part, year_part)) = notam_id.split_once('/') {
        let number = if num_part.len() > 1 {
            num_part[1..].parse::<i32>().ok()
        } else {
            None
        };
        let year = year_part.parse::<i32>().ok();
        let series = num_part.chars().next().map(|c| c.to_string()).unwrap_or(series);
        (series, number, year)
    } else {
        (series, None, None)
    }
}

/// Decodes a `YYMMDDHHMM` token into a UTC datetime; years < 50 -> 20xx, else 19xx.
fn parse_icao_datetime(digits: &str) -> Option<DateTime<Utc>> {
    if digits.len() != 10 {
        return None;
    }
    let yy: i32 = digits[0..2].parse().ok()?;
    let year = if yy < 50 { 2000 + yy } else { 1900 + yy };
    let month: u32 = digits[2..4].parse().ok()?;
    let day: u32 = digits[4..6].parse().ok()?;
    let hour: u32 = digits[6..8].parse().ok()?;
    let minute: u32 = digits[8..10].parse().ok()?;

    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    let naive = date.and_hms_opt(hour, minute, 0)?;
    Some(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
}

/// Decodes `DDMM[NS]` into decimal degrees.
fn decode_lat(token: &str) -> Option<f64> {
    if token.len() < 5 {
        return None;
    }
    let deg: f64 = token[0..2].parse().ok()?;
    let min: f64 = token[2..4].parse().ok()?;
    let dir = token.as_bytes()[4] as char;
    let mut value = deg + min / 60.0;
    if dir == 'S' || dir == 's' {
        value = -value;
    }
    Some(value)
}

/// Decodes `DDDMM[EW]` into decimal degrees.
fn decode_lon(token: &str) -> Option<f64> {
    if token.len() < 6 {
        return None;
    }
    let deg: f64 = token[0..3].parse().ok()?;
    let min: f64 = token[3..5].parse().ok()?;
    let dir = token.as_bytes()[5] as char;
    let mut value = deg + min / 60.0;
    if dir == 'W' || dir == 'w' {
        value = -value;
    }
    Some(value)
}

/// Parses the FAA envelope date format `MM/DD/YYYY HHMM`, optionally
/// suffixed by ` EST`/` UTC`/` GMT` (stripped — all NOTAM times are UTC).
fn parse_faa_date(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = TZ_SUFFIX_RE.replace(raw.trim(), "");
    let mut parts = trimmed.split_whitespace();
    let date_part = parts.next()?;
    let time_part = parts.next().unwrap_or("0000");

    let mut date_components = date_part.split('/');
    let month: u32 = date_components.next()?.parse().ok()?;
    let day: u32 = date_components.next()?.parse().ok()?;
    let year: i32 = date_components.next()?.parse().ok()?;

    let (hour, minute) = if time_part.len() >= 4 {
        (
            time_part[0..2].parse().ok()?,
            time_part[2..4].parse().ok()?,
        )
    } else {
        (0, 0)
    };

    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    let naive = date.and_hms_opt(hour, minute, 0)?;
    Some(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
}

/// Decodes the handful of HTML entities that show up in NOTAM free text.
fn html_unescape(input: &str) -> String {
    input
        .replace("&apos;", "'")
        .replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn test_config() -> Config {
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
            drone_keywords: vec!["drone".into(), "uas".into(), "unmanned".into(), "rpas".into()],
            closure_score: 50,
            drone_score: 30,
            restriction_score: 20,
            ntfy_url: None,
            ntfy_digest_interval: Duration::from_secs(3600),
            ntfy_min_score: 80,
            ntfy_max_digest_items: 10,
            purge_expired_after_days: 30,
            purge_cancelled_after_days: 7,
        }
    }

    #[test]
    fn cancelled_or_expired_yields_no_record() {
        let config = test_config();
        let raw = RawNotam {
            notam_number: Some("A1/25".into()),
            cancelled_or_expired: true,
            ..Default::default()
        };
        assert!(parse_notam(&config, &raw, None).is_none());

        let raw = RawNotam {
            notam_number: Some("A1/25".into()),
            status: Some("Expired".into()),
            ..Default::default()
        };
        assert!(parse_notam(&config, &raw, None).is_none());
    }

    #[test]
    fn missing_notam_number_drops_record() {
        let config = test_config();
        let raw = RawNotam::default();
        assert!(parse_notam(&config, &raw, None).is_none());
    }

    #[test]
    fn identity_equals_notam_number() {
        let config = test_config();
        let raw = RawNotam {
            notam_number: Some("A3097/25".into()),
            icao_message: Some("A3097/25 NOTAMN\nQ) EGTT/QMRLC/IV/NBO/A/000/999/5129N00028W005\nA) EGLL B) 2501010000 C) 2501312359\nE) RWY 09L/27R CLSD".into()),
            ..Default::default()
        };
        let notam = parse_notam(&config, &raw, None).unwrap();
        assert_eq!(notam.id, "A3097/25");
    }

    #[test]
    fn kind_detection_replace() {
        let config = test_config();
        let raw = RawNotam {
            notam_number: Some("R2198/25".into()),
            icao_message: Some("R2198/25 NOTAMR R1978/25\nQ) EGTT/QWULW/IV/NBO/W/000/999/\nE) TRIGGER NOTAM - DRONE ACTIVITY IN RESTRICTED AREAS".into()),
            ..Default::default()
        };
        let notam = parse_notam(&config, &raw, None).unwrap();
        assert_eq!(notam.kind, NotamKind::Replace);
        assert_eq!(notam.replaces_id.as_deref(), Some("R1978/25"));
        assert!(notam.is_trigger);
        assert!(notam.is_drone_related);
        assert!(notam.is_restriction);
        assert!(!notam.is_closure);
        assert_eq!(notam.priority_score, 45);
    }

    #[test]
    fn perm_sets_permanent_and_null_valid_to() {
        let config = test_config();
        let raw = RawNotam {
            notam_number: Some("A1/25".into()),
            icao_message: Some("A1/25 NOTAMN\nA) EGLL B) 2501010000 C) PERM\nE) SOMETHING PERMANENT".into()),
            ..Default::default()
        };
        let notam = parse_notam(&config, &raw, None).unwrap();
        assert!(notam.is_permanent);
        assert!(notam.valid_to.is_none());
    }

    #[test]
    fn html_entities_decoded_in_body() {
        let config = test_config();
        let raw = RawNotam {
            notam_number: Some("A1/25".into()),
            icao_message: Some("A1/25 NOTAMN\nE) PILOT&apos;S DISCRETION AT OWNER&amp;OPERATOR RISK".into()),
            ..Default::default()
        };
        let notam = parse_notam(&config, &raw, None).unwrap();
        let body = notam.body.unwrap();
        assert!(body.contains('\''));
        assert!(body.contains('&'));
    }

    #[test]
    fn qcode_subject_and_condition_independent() {
        let config = test_config();
        let raw = RawNotam {
            notam_number: Some("A1/25".into()),
            icao_message: Some("A1/25 NOTAMN\nQ) EGTT/QMRLC/IV/NBO/A/000/999/\nE) RWY CLOSED".into()),
            ..Default::default()
        };
        let notam = parse_notam(&config, &raw, None).unwrap();
        assert_eq!(notam.q_subject.as_deref(), Some("Runway"));
        assert_eq!(notam.q_condition.as_deref(), Some("Closed"));
    }

    #[test]
    fn coordinate_decode() {
        let lat = decode_lat("4904N").unwrap();
        let lon = decode_lon("00607E").unwrap();
        assert!((lat - 49.0667).abs() < 0.001);
        assert!((lon - 6.1167).abs() < 0.001);
    }
}
