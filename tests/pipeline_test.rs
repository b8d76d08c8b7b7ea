//! End-to-end tests driving Fetch→Parse→Classify+Score→Upsert against a
//! real (temporary) SQLite database, one scenario per raw-input → expected
//! row shape.

mod common;

use common::TestDatabase;
use notam_monitor::notam_repo::UpsertOutcome;
use notam_monitor::parser::{parse_notam, RawNotam};
use notam_monitor::Config;
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

fn raw(notam_number: &str, icao_message: &str) -> RawNotam {
    RawNotam {
        notam_number: Some(notam_number.to_string()),
        icao_message: Some(icao_message.to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn scenario_runway_closure_in_progress() {
    let config = test_config();
    let db = TestDatabase::new().unwrap();
    let repo = db.notam_repo();

    let input = raw(
        "A3097/25",
        "A3097/25 NOTAMN\nQ) EKDK/QMRLC/IV/NBO/A/000/999/\nA) EKDK B) 2501010000 C) 2501312359\nE) RWY 12/30 CLSD WIP",
    );
    let notam = parse_notam(&config, &input, None).expect("should parse");
    assert!(notam.is_closure);
    assert!(!notam.is_drone_related);
    assert_eq!(notam.priority_score, 60);

    let outcome = repo.upsert(notam).await.unwrap();
    assert_eq!(outcome, UpsertOutcome::Inserted);

    let stats = repo.statistics().await.unwrap();
    assert_eq!(stats.total_notams, 1);
    assert_eq!(stats.closures, 1);
}

#[tokio::test]
async fn scenario_drone_closure() {
    let config = test_config();
    let db = TestDatabase::new().unwrap();
    let repo = db.notam_repo();

    let input = raw(
        "A0001/25",
        "A0001/25 NOTAMN\nA) EGLL B) 2501010000 C) 2501312359\nE) AIRPORT CLOSED DUE TO UNAUTHORIZED DRONE ACTIVITY",
    );
    let notam = parse_notam(&config, &input, None).expect("should parse");
    assert!(notam.is_closure);
    assert!(notam.is_drone_related);
    assert_eq!(notam.priority_score, 90);

    repo.upsert(notam).await.unwrap();
    let stats = repo.statistics().await.unwrap();
    assert_eq!(stats.drone_notams, 1);
    assert_eq!(stats.closures, 1);
}

#[tokio::test]
async fn scenario_low_priority_unrelated_notam() {
    let config = test_config();
    let db = TestDatabase::new().unwrap();
    let repo = db.notam_repo();

    let input = raw(
        "A0002/25",
        "A0002/25 NOTAMN\nA) EGLL B) 2501010000 C) 2501312359\nE) TAXIWAY ALPHA LIGHTING UNSERVICEABLE",
    );
    let notam = parse_notam(&config, &input, None).expect("should parse");
    assert!(!notam.is_closure);
    assert_eq!(notam.priority_score, 10);

    let outcome = repo.upsert(notam).await.unwrap();
    assert_eq!(outcome, UpsertOutcome::Inserted);
}

#[tokio::test]
async fn scenario_reingesting_same_batch_is_idempotent() {
    let config = test_config();
    let db = TestDatabase::new().unwrap();
    let repo = db.notam_repo();

    let mut inputs = [
        raw(
            "A3097/25",
            "A3097/25 NOTAMN\nQ) EKDK/QMRLC/IV/NBO/A/000/999/\nA) EKDK B) 2501010000 C) 2501312359\nE) RWY 12/30 CLSD WIP",
        ),
        raw(
            "A0001/25",
            "A0001/25 NOTAMN\nA) EGLL B) 2501010000 C) 2501312359\nE) AIRPORT CLOSED DUE TO UNAUTHORIZED DRONE ACTIVITY",
        ),
        raw(
            "A0002/25",
            "A0002/25 NOTAMN\nA) EGLL B) 2501010000 C) 2501312359\nE) TAXIWAY ALPHA LIGHTING UNSERVICEABLE",
        ),
    ];
    // airport_code is populated from the RawNotam envelope's facility
    // designator, not parsed out of the A) field in the message body.
    inputs[1].facility_designator = Some("EGLL".into());
    inputs[2].facility_designator = Some("EGLL".into());

    for input in &inputs {
        let notam = parse_notam(&config, input, None).unwrap();
        let outcome = repo.upsert(notam).await.unwrap();
        assert_eq!(outcome, UpsertOutcome::Inserted);
    }

    tokio::time::sleep(Duration::from_millis(5)).await;

    for input in &inputs {
        let notam = parse_notam(&config, input, None).unwrap();
        let outcome = repo.upsert(notam).await.unwrap();
        assert_eq!(outcome, UpsertOutcome::Updated);
    }

    let stats = repo.statistics().await.unwrap();
    assert_eq!(stats.total_notams, 3);

    let rows = repo.by_airport("EGLL".into(), false).await.unwrap();
    assert_eq!(rows.len(), 2);
    for row in rows {
        assert!(row.updated_at > row.created_at);
    }
}

#[tokio::test]
async fn scenario_replace_trigger_notam_scores_forty_five() {
    let config = test_config();
    let db = TestDatabase::new().unwrap();
    let repo = db.notam_repo();

    let input = raw(
        "R2198/25",
        "R2198/25 NOTAMR R1978/25\nQ) EGTT/QWULW/IV/NBO/W/000/999/\nE) TRIGGER NOTAM - DRONE ACTIVITY IN RESTRICTED AREAS",
    );
    let notam = parse_notam(&config, &input, None).expect("should parse");
    assert_eq!(notam.replaces_id.as_deref(), Some("R1978/25"));
    assert!(notam.is_trigger);
    assert!(notam.is_drone_related);
    assert!(notam.is_restriction);
    assert!(!notam.is_closure);
    assert_eq!(notam.priority_score, 45);

    repo.upsert(notam).await.unwrap();
    let stats = repo.statistics().await.unwrap();
    assert_eq!(stats.total_notams, 1);
}

#[tokio::test]
async fn scenario_cancelled_or_expired_envelope_is_dropped() {
    let config = test_config();
    let db = TestDatabase::new().unwrap();
    let repo = db.notam_repo();

    let mut input = raw("A9999/25", "A9999/25 NOTAMN\nE) SOMETHING");
    input.cancelled_or_expired = true;

    assert!(parse_notam(&config, &input, None).is_none());

    let stats = repo.statistics().await.unwrap();
    assert_eq!(stats.total_notams, 0);
}

#[tokio::test]
async fn cancel_notam_mutates_referenced_row_kind() {
    let config = test_config();
    let db = TestDatabase::new().unwrap();
    let repo = db.notam_repo();

    let mut original = raw(
        "A3097/25",
        "A3097/25 NOTAMN\nA) EGLL B) 2501010000 C) 2501312359\nE) RWY 09L/27R CLSD",
    );
    original.facility_designator = Some("EGLL".into());
    let notam = parse_notam(&config, &original, None).unwrap();
    repo.upsert(notam).await.unwrap();

    let cancel = raw("A4000/25", "A4000/25 NOTAMC A3097/25\nE) CANCELLATION");
    let notam = parse_notam(&config, &cancel, None).unwrap();
    assert_eq!(notam.cancels_id.as_deref(), Some("A3097/25"));
    repo.upsert(notam).await.unwrap();

    let rows = repo.by_airport("EGLL".into(), false).await.unwrap();
    let original_row = rows.iter().find(|r| r.notam_id == "A3097/25").unwrap();
    assert_eq!(original_row.kind, "CANCEL");
}

#[tokio::test]
async fn purge_expired_removes_only_notams_past_retention() {
    use chrono::{Duration as ChronoDuration, Utc};

    let config = test_config();
    let db = TestDatabase::new().unwrap();
    let repo = db.notam_repo();

    let now = Utc::now();
    let icao_id = "2501010000".to_string();
    let _ = icao_id;

    let expired_date = (now - ChronoDuration::days(400)).format("%y%m%d%H%M").to_string();
    let active_date = (now + ChronoDuration::days(10)).format("%y%m%d%H%M").to_string();

    let expired = raw(
        "A0010/24",
        &format!("A0010/24 NOTAMN\nA) EGLL B) 2401010000 C) {expired_date}\nE) LONG EXPIRED CLOSURE"),
    );
    let active = raw(
        "A0011/25",
        &format!("A0011/25 NOTAMN\nA) EGLL B) 2501010000 C) {active_date}\nE) STILL ACTIVE CLOSURE"),
    );

    repo.upsert(parse_notam(&config, &expired, None).unwrap())
        .await
        .unwrap();
    repo.upsert(parse_notam(&config, &active, None).unwrap())
        .await
        .unwrap();

    let deleted = repo.purge_expired(30).await.unwrap();
    assert_eq!(deleted, 1);

    let stats = repo.statistics().await.unwrap();
    assert_eq!(stats.total_notams, 1);
}

#[tokio::test]
async fn active_notams_excludes_cancel_kind_and_expired_rows() {
    use chrono::{Duration as ChronoDuration, Utc};

    let config = test_config();
    let db = TestDatabase::new().unwrap();
    let repo = db.notam_repo();

    let now = Utc::now();
    let future = (now + ChronoDuration::days(10)).format("%y%m%d%H%M").to_string();
    let past = (now - ChronoDuration::days(10)).format("%y%m%d%H%M").to_string();

    let active = raw(
        "A0020/25",
        &format!("A0020/25 NOTAMN\nA) EGLL B) 2501010000 C) {future}\nE) RWY 09L/27R CLSD"),
    );
    let expired = raw(
        "A0021/25",
        &format!("A0021/25 NOTAMN\nA) EGLL B) 2401010000 C) {past}\nE) RWY 09R/27L CLSD"),
    );
    let original = raw(
        "A0022/25",
        &format!("A0022/25 NOTAMN\nA) EGLL B) 2501010000 C) {future}\nE) TAXIWAY BRAVO CLSD"),
    );
    let cancel = raw("A0023/25", "A0023/25 NOTAMC A0022/25\nE) CANCELLATION");

    for input in [&active, &expired, &original] {
        repo.upsert(parse_notam(&config, input, None).unwrap())
            .await
            .unwrap();
    }
    // Cancels A0022/25 in place, turning its kind to CANCEL.
    repo.upsert(parse_notam(&config, &cancel, None).unwrap())
        .await
        .unwrap();

    let rows = repo.active_notams(0).await.unwrap();
    let ids: Vec<&str> = rows.iter().map(|r| r.notam_id.as_str()).collect();
    assert!(ids.contains(&"A0020/25"));
    assert!(!ids.contains(&"A0021/25"), "expired row must be excluded");
    assert!(!ids.contains(&"A0022/25"), "cancelled row must be excluded");
}

#[tokio::test]
async fn active_closures_and_active_drone_notams_filter_by_classification() {
    use chrono::{Duration as ChronoDuration, Utc};

    let config = test_config();
    let db = TestDatabase::new().unwrap();
    let repo = db.notam_repo();

    let future = (Utc::now() + ChronoDuration::days(10))
        .format("%y%m%d%H%M")
        .to_string();

    let closure_only = raw(
        "A0030/25",
        &format!("A0030/25 NOTAMN\nA) EGLL B) 2501010000 C) {future}\nE) RWY 09L/27R CLSD WIP"),
    );
    let drone_only = raw(
        "A0031/25",
        &format!(
            "A0031/25 NOTAMN\nA) EGLL B) 2501010000 C) {future}\nE) UNAUTHORIZED DRONE ACTIVITY REPORTED NEAR AERODROME"
        ),
    );
    let neither = raw(
        "A0032/25",
        &format!("A0032/25 NOTAMN\nA) EGLL B) 2501010000 C) {future}\nE) TAXIWAY ALPHA LIGHTING UNSERVICEABLE"),
    );

    for input in [&closure_only, &drone_only, &neither] {
        let notam = parse_notam(&config, input, None).unwrap();
        assert!(!notam.is_closure || !notam.is_drone_related);
        repo.upsert(notam).await.unwrap();
    }

    let closures = repo.active_closures().await.unwrap();
    assert_eq!(closures.len(), 1);
    assert_eq!(closures[0].notam_id, "A0030/25");

    let drone_notams = repo.active_drone_notams().await.unwrap();
    assert_eq!(drone_notams.len(), 1);
    assert_eq!(drone_notams[0].notam_id, "A0031/25");
}

#[tokio::test]
async fn by_search_term_filters_on_term_and_active_only() {
    let config = test_config();
    let db = TestDatabase::new().unwrap();
    let repo = db.notam_repo();

    use chrono::{Duration as ChronoDuration, Utc};
    let now = Utc::now();
    let future = (now + ChronoDuration::days(10)).format("%y%m%d%H%M").to_string();
    let past = (now - ChronoDuration::days(10)).format("%y%m%d%H%M").to_string();

    let active_match = raw(
        "A0040/25",
        &format!("A0040/25 NOTAMN\nA) EGLL B) 2501010000 C) {future}\nE) DRONE ACTIVITY NEAR RUNWAY"),
    );
    let expired_match = raw(
        "A0041/25",
        &format!("A0041/25 NOTAMN\nA) EGLL B) 2401010000 C) {past}\nE) DRONE ACTIVITY NEAR RUNWAY"),
    );
    let other_term = raw(
        "A0042/25",
        "A0042/25 NOTAMN\nA) EGLL B) 2501010000 C) 2501312359\nE) BIRD STRIKE HAZARD",
    );

    for (input, term) in [
        (&active_match, "drone"),
        (&expired_match, "drone"),
        (&other_term, "wildlife"),
    ] {
        let notam = parse_notam(&config, input, Some(term)).unwrap();
        assert_eq!(notam.search_term.as_deref(), Some(term));
        repo.upsert(notam).await.unwrap();
    }

    let active_only = repo.by_search_term("drone".into(), true).await.unwrap();
    assert_eq!(active_only.len(), 1);
    assert_eq!(active_only[0].notam_id, "A0040/25");

    let all_matching = repo.by_search_term("drone".into(), false).await.unwrap();
    assert_eq!(all_matching.len(), 2);
}

#[tokio::test]
async fn purge_cancelled_removes_only_cancel_rows_past_retention() {
    use chrono::{Duration as ChronoDuration, Utc};

    let config = test_config();
    let db = TestDatabase::new().unwrap();
    let repo = db.notam_repo();

    let future = (Utc::now() + ChronoDuration::days(10))
        .format("%y%m%d%H%M")
        .to_string();

    let active = raw(
        "A0050/25",
        &format!("A0050/25 NOTAMN\nA) EGLL B) 2501010000 C) {future}\nE) STILL ACTIVE CLOSURE"),
    );
    let cancelled_target = raw(
        "A0051/25",
        &format!("A0051/25 NOTAMN\nA) EGLL B) 2501010000 C) {future}\nE) WILL BE CANCELLED"),
    );
    let cancel = raw("A0052/25", "A0052/25 NOTAMC A0051/25\nE) CANCELLATION");

    repo.upsert(parse_notam(&config, &active, None).unwrap())
        .await
        .unwrap();
    repo.upsert(parse_notam(&config, &cancelled_target, None).unwrap())
        .await
        .unwrap();
    // A0052/25 is itself inserted with kind CANCEL, and also flips A0051/25's
    // stored kind to CANCEL via the upsert side effect.
    repo.upsert(parse_notam(&config, &cancel, None).unwrap())
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(5)).await;

    let deleted = repo.purge_cancelled(0).await.unwrap();
    assert_eq!(deleted, 2);

    let stats = repo.statistics().await.unwrap();
    assert_eq!(stats.total_notams, 1);
    let remaining = repo.active_notams(0).await.unwrap();
    assert_eq!(remaining[0].notam_id, "A0050/25");
}

#[tokio::test]
async fn search_run_is_logged_and_purged() {
    use notam_monitor::search_run_repo::NewSearchRun;

    let db = TestDatabase::new().unwrap();
    let run_repo = db.search_run_repo();

    let id = run_repo
        .log(NewSearchRun {
            mode: "aerodrome".into(),
            search_term: None,
            airport_codes: Some("EGLL".into()),
            total_fetched: 3,
            new_inserted: 3,
            updated: 0,
        })
        .await
        .unwrap();
    assert!(id > 0);

    let deleted = run_repo.purge_old(0).await.unwrap();
    assert_eq!(deleted, 1);
}
