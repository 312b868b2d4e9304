use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Result, anyhow};
use chrono::{NaiveDate, TimeZone, Utc};

use f1_paddock::f1_fetch::{
    BodyFetcher, ErgastSource, F1Source, FetchOutcome, next_race_after,
    parse_driver_images_json, parse_driver_standings_json, parse_race_schedule_json,
};

const BASE: &str = "https://ergast.test/f1";
const IMAGES: &str = "https://openf1.test/v1/drivers?session_key=latest";

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

/// Serves canned bodies by URL; anything unknown is a transport error.
#[derive(Default)]
struct CannedFetcher {
    bodies: HashMap<String, String>,
    calls: Mutex<Vec<String>>,
}

impl CannedFetcher {
    fn with(mut self, url: &str, body: &str) -> Self {
        self.bodies.insert(url.to_string(), body.to_string());
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }
}

impl BodyFetcher for CannedFetcher {
    fn get(&self, url: &str) -> Result<String> {
        self.calls.lock().expect("calls lock").push(url.to_string());
        self.bodies
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow!("connection refused: {url}"))
    }
}

fn fixture_source() -> ErgastSource<CannedFetcher> {
    let fetcher = CannedFetcher::default()
        .with(
            &format!("{BASE}/current/driverStandings.json"),
            &read_fixture("ergast_standings.json"),
        )
        .with(
            &format!("{BASE}/current.json"),
            &read_fixture("ergast_schedule.json"),
        )
        .with(IMAGES, &read_fixture("openf1_drivers.json"));
    ErgastSource::with_fetcher(fetcher, BASE, IMAGES)
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

#[test]
fn parses_standings_fixture() {
    let standings =
        parse_driver_standings_json(&read_fixture("ergast_standings.json")).expect("fixture");
    assert_eq!(standings.len(), 4);

    let leader = &standings[0];
    assert_eq!(leader.position, "1");
    assert_eq!(leader.points, "437");
    assert_eq!(leader.driver.id, "max_verstappen");
    assert_eq!(leader.driver.code.as_deref(), Some("VER"));
    assert_eq!(leader.driver.permanent_number.as_deref(), Some("33"));
    assert_eq!(leader.driver.date_of_birth, date(1997, 9, 30));
    assert_eq!(leader.current_team(), Some("Red Bull"));

    let unclassified = &standings[3];
    assert_eq!(unclassified.position, "");
    assert_eq!(unclassified.position_text, "-");
    assert_eq!(unclassified.driver.permanent_number, None);
    assert_eq!(unclassified.current_team(), None);
}

#[test]
fn parses_schedule_fixture() {
    let races = parse_race_schedule_json(&read_fixture("ergast_schedule.json")).expect("fixture");
    assert_eq!(races.len(), 3);
    assert_eq!(races[1].name, "Monaco Grand Prix");
    assert_eq!(races[1].circuit.location.locality, "Monte-Carlo");
    assert_eq!(races[1].date, date(2024, 6, 1));
    assert_eq!(races[1].time.as_deref(), Some("13:00:00Z"));
    assert_eq!(races[2].time, None);
}

#[test]
fn parses_driver_images_fixture() {
    let images = parse_driver_images_json(&read_fixture("openf1_drivers.json")).expect("fixture");
    assert_eq!(images.len(), 2);
    assert!(images.get(1).is_some_and(|url| url.contains("maxver01")));
    assert!(images.get(43).is_none());
}

#[test]
fn empty_standings_list_is_fresh_and_empty() {
    let raw = r#"{"MRData": {"StandingsTable": {"season": "2025", "StandingsLists": []}}}"#;
    let fetcher = CannedFetcher::default().with(&format!("{BASE}/current/driverStandings.json"), raw);
    let source = ErgastSource::with_fetcher(fetcher, BASE, IMAGES);

    let outcome = source.driver_standings();
    assert!(!outcome.is_degraded());
    assert!(outcome.value().is_empty());
}

#[test]
fn transport_failure_degrades_to_empty() {
    let source = ErgastSource::with_fetcher(CannedFetcher::default(), BASE, IMAGES);

    let standings = source.driver_standings();
    assert!(standings.is_degraded());
    assert!(standings.value().is_empty());
    assert!(
        standings
            .reason()
            .is_some_and(|r| r.contains("connection refused"))
    );

    let schedule = source.race_schedule();
    assert!(schedule.is_degraded());
    assert!(schedule.value().is_empty());

    let images = source.driver_images();
    assert!(images.is_degraded());
    assert!(images.value().is_empty());

    let next = source.next_race();
    assert!(next.is_degraded());
    assert!(next.value().is_none());
}

#[test]
fn malformed_shape_degrades_to_empty() {
    let fetcher = CannedFetcher::default()
        .with(&format!("{BASE}/current/driverStandings.json"), r#"{"error": "rate limited"}"#)
        .with(&format!("{BASE}/current.json"), "<html>502</html>")
        .with(IMAGES, r#"{"detail": "not found"}"#);
    let source = ErgastSource::with_fetcher(fetcher, BASE, IMAGES);

    assert!(source.driver_standings().is_degraded());
    assert!(source.race_schedule().is_degraded());
    assert!(source.driver_images().is_degraded());
}

#[test]
fn missing_required_driver_field_degrades_whole_snapshot() {
    let raw = r#"{"MRData": {"StandingsTable": {"StandingsLists": [{"DriverStandings": [
        {"position": "1", "points": "10", "wins": "0",
         "Driver": {"driverId": "x", "givenName": "X", "familyName": "Y"}}
    ]}]}}}"#;
    let fetcher = CannedFetcher::default().with(&format!("{BASE}/current/driverStandings.json"), raw);
    let source = ErgastSource::with_fetcher(fetcher, BASE, IMAGES);

    let outcome = source.driver_standings();
    assert!(outcome.is_degraded());
    assert!(outcome.value().is_empty());
}

#[test]
fn standings_fetch_is_idempotent() {
    let source = fixture_source();
    let first = source.driver_standings();
    let second = source.driver_standings();
    assert!(matches!(first, FetchOutcome::Fresh(_)));
    assert_eq!(first, second);
    assert_eq!(
        source_calls(&source),
        vec![
            format!("{BASE}/current/driverStandings.json"),
            format!("{BASE}/current/driverStandings.json"),
        ]
    );
}

fn source_calls(source: &ErgastSource<CannedFetcher>) -> Vec<String> {
    // One GET per call, never retried.
    source.fetcher().calls()
}

#[test]
fn next_race_skips_past_dates() {
    let source = fixture_source();
    let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    let next = source.next_race_at(now).into_value().expect("a future race");
    assert_eq!(next.date, date(2024, 6, 1));
    assert_eq!(next.round, "2");
}

#[test]
fn next_race_absent_when_all_past() {
    let races = parse_race_schedule_json(&read_fixture("ergast_schedule.json")).expect("fixture");
    let now = Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap();
    assert!(next_race_after(&races, now).is_none());
    assert!(next_race_after(&[], now).is_none());
}

#[test]
fn next_race_requires_strictly_later_start() {
    let races = parse_race_schedule_json(&read_fixture("ergast_schedule.json")).expect("fixture");
    let midnight = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    let next = next_race_after(&races, midnight).expect("monza is still ahead");
    assert_eq!(next.round, "3");
}

#[test]
fn null_bodies_are_empty() {
    assert!(parse_driver_standings_json("null").expect("null").is_empty());
    assert!(parse_race_schedule_json("  ").expect("blank").is_empty());
    assert!(parse_driver_images_json("null").expect("null").is_empty());
}

#[test]
fn fixture_headshots_resolve_by_number_then_code() {
    use f1_paddock::presentation::resolve_driver_image;

    let source = fixture_source();
    let standings = source.driver_standings().into_value();
    let images = source.driver_images().into_value();

    // #33 has no headshot entry; the VER code finds maxver01 in the #1 URL.
    let verstappen = resolve_driver_image(&standings[0].driver, &images);
    assert!(verstappen.contains("maxver01"));

    let norris = resolve_driver_image(&standings[1].driver, &images);
    assert!(norris.contains("lannor01"));

    let unclassified = resolve_driver_image(&standings[3].driver, &images);
    assert!(unclassified.starts_with("https://ui-avatars.com/api/?name="));
}
