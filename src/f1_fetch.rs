use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::config::AppConfig;
use crate::http_client::{fetch_text, http_client};
use crate::state::{DriverImageMap, RaceRecord, StandingEntry};

/// Result of a read that never fails outward. `Degraded` holds the empty value the caller
/// renders plus the reason the fetch did not produce data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome<T> {
    Fresh(T),
    Degraded { value: T, reason: String },
}

impl<T> FetchOutcome<T> {
    pub fn value(&self) -> &T {
        match self {
            FetchOutcome::Fresh(value) => value,
            FetchOutcome::Degraded { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            FetchOutcome::Fresh(value) => value,
            FetchOutcome::Degraded { value, .. } => value,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, FetchOutcome::Degraded { .. })
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            FetchOutcome::Fresh(_) => None,
            FetchOutcome::Degraded { reason, .. } => Some(reason),
        }
    }

    pub fn into_parts(self) -> (T, Option<String>) {
        match self {
            FetchOutcome::Fresh(value) => (value, None),
            FetchOutcome::Degraded { value, reason } => (value, Some(reason)),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> FetchOutcome<U> {
        match self {
            FetchOutcome::Fresh(value) => FetchOutcome::Fresh(f(value)),
            FetchOutcome::Degraded { value, reason } => FetchOutcome::Degraded {
                value: f(value),
                reason,
            },
        }
    }

    /// Pairs two outcomes; the pair is degraded if either side is, with both reasons kept.
    pub fn zip<U>(self, other: FetchOutcome<U>) -> FetchOutcome<(T, U)> {
        let (a, reason_a) = self.into_parts();
        let (b, reason_b) = other.into_parts();
        let reason = match (reason_a, reason_b) {
            (None, None) => None,
            (Some(r), None) | (None, Some(r)) => Some(r),
            (Some(ra), Some(rb)) => Some(format!("{ra}; {rb}")),
        };
        match reason {
            None => FetchOutcome::Fresh((a, b)),
            Some(reason) => FetchOutcome::Degraded {
                value: (a, b),
                reason,
            },
        }
    }
}

impl<T: Default> FetchOutcome<T> {
    /// Logs and swallows the error, leaving the empty value.
    pub fn from_result(result: Result<T>, what: &str) -> Self {
        match result {
            Ok(value) => FetchOutcome::Fresh(value),
            Err(err) => {
                let reason = format!("{what}: {err:#}");
                log::warn!("Error fetching {reason}");
                FetchOutcome::Degraded {
                    value: T::default(),
                    reason,
                }
            }
        }
    }
}

/// Read-only view of the race, standings and headshot providers.
pub trait F1Source: Send + Sync {
    fn driver_standings(&self) -> FetchOutcome<Vec<StandingEntry>>;

    fn race_schedule(&self) -> FetchOutcome<Vec<RaceRecord>>;

    fn driver_images(&self) -> FetchOutcome<DriverImageMap>;

    fn next_race(&self) -> FetchOutcome<Option<RaceRecord>> {
        self.next_race_at(Utc::now())
    }

    fn next_race_at(&self, now: DateTime<Utc>) -> FetchOutcome<Option<RaceRecord>> {
        self.race_schedule()
            .map(|races| next_race_after(&races, now).cloned())
    }
}

/// Transport seam: one GET, body on 2xx.
pub trait BodyFetcher: Send + Sync {
    fn get(&self, url: &str) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl BodyFetcher for HttpFetcher {
    fn get(&self, url: &str) -> Result<String> {
        let client = http_client(self.timeout)?;
        fetch_text(client, url)
    }
}

/// Ergast-compatible standings/schedule API plus the OpenF1 drivers endpoint for headshots.
#[derive(Debug, Clone)]
pub struct ErgastSource<F = HttpFetcher> {
    fetcher: F,
    base_url: String,
    images_url: String,
}

impl ErgastSource<HttpFetcher> {
    pub fn from_config(config: &AppConfig) -> Self {
        Self::with_fetcher(
            HttpFetcher::new(config.http_timeout),
            &config.api_base_url,
            &config.driver_images_url,
        )
    }
}

impl<F: BodyFetcher> ErgastSource<F> {
    pub fn with_fetcher(fetcher: F, base_url: &str, images_url: &str) -> Self {
        Self {
            fetcher,
            base_url: base_url.trim_end_matches('/').to_string(),
            images_url: images_url.to_string(),
        }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn standings_url(&self) -> String {
        format!("{}/current/driverStandings.json", self.base_url)
    }

    pub fn schedule_url(&self) -> String {
        format!("{}/current.json", self.base_url)
    }

    fn fetch_standings(&self) -> Result<Vec<StandingEntry>> {
        let body = self.fetcher.get(&self.standings_url())?;
        parse_driver_standings_json(&body)
    }

    fn fetch_schedule(&self) -> Result<Vec<RaceRecord>> {
        let body = self.fetcher.get(&self.schedule_url())?;
        parse_race_schedule_json(&body)
    }

    fn fetch_images(&self) -> Result<DriverImageMap> {
        let body = self.fetcher.get(&self.images_url)?;
        parse_driver_images_json(&body)
    }
}

impl<F: BodyFetcher> F1Source for ErgastSource<F> {
    fn driver_standings(&self) -> FetchOutcome<Vec<StandingEntry>> {
        FetchOutcome::from_result(self.fetch_standings(), "driver standings")
    }

    fn race_schedule(&self) -> FetchOutcome<Vec<RaceRecord>> {
        FetchOutcome::from_result(self.fetch_schedule(), "race schedule")
    }

    fn driver_images(&self) -> FetchOutcome<DriverImageMap> {
        FetchOutcome::from_result(self.fetch_images(), "driver images")
    }
}

/// First race whose calendar day, taken as midnight UTC, lies strictly after `now`.
pub fn next_race_after(races: &[RaceRecord], now: DateTime<Utc>) -> Option<&RaceRecord> {
    races.iter().find(|race| {
        race.date
            .and_hms_opt(0, 0, 0)
            .is_some_and(|start| start.and_utc() > now)
    })
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(rename = "MRData")]
    data: T,
}

#[derive(Debug, Deserialize)]
struct StandingsData {
    #[serde(rename = "StandingsTable")]
    table: StandingsTable,
}

#[derive(Debug, Deserialize)]
struct StandingsTable {
    #[serde(rename = "StandingsLists", default)]
    lists: Vec<StandingsList>,
}

#[derive(Debug, Deserialize)]
struct StandingsList {
    #[serde(rename = "DriverStandings", default)]
    standings: Vec<StandingEntry>,
}

#[derive(Debug, Deserialize)]
struct ScheduleData {
    #[serde(rename = "RaceTable")]
    table: RaceTable,
}

#[derive(Debug, Deserialize)]
struct RaceTable {
    #[serde(rename = "Races", default)]
    races: Vec<RaceRecord>,
}

#[derive(Debug, Deserialize)]
struct OpenF1Driver {
    driver_number: u32,
    #[serde(default)]
    headshot_url: Option<String>,
}

pub fn parse_driver_standings_json(raw: &str) -> Result<Vec<StandingEntry>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let root: Envelope<StandingsData> =
        serde_json::from_str(trimmed).context("invalid standings json")?;
    Ok(root
        .data
        .table
        .lists
        .into_iter()
        .next()
        .map(|list| list.standings)
        .unwrap_or_default())
}

pub fn parse_race_schedule_json(raw: &str) -> Result<Vec<RaceRecord>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let root: Envelope<ScheduleData> =
        serde_json::from_str(trimmed).context("invalid schedule json")?;
    Ok(root.data.table.races)
}

pub fn parse_driver_images_json(raw: &str) -> Result<DriverImageMap> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(DriverImageMap::new());
    }
    let drivers: Vec<OpenF1Driver> =
        serde_json::from_str(trimmed).context("invalid drivers json")?;
    Ok(drivers
        .into_iter()
        .filter_map(|driver| {
            let url = driver.headshot_url?;
            let url = url.trim();
            if url.is_empty() {
                None
            } else {
                Some((driver.driver_number, url.to_string()))
            }
        })
        .collect())
}
