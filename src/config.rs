use std::time::Duration;

use log::LevelFilter;

pub const DEFAULT_API_BASE_URL: &str = "https://api.jolpi.ca/ergast/f1";
pub const DEFAULT_DRIVER_IMAGES_URL: &str = "https://api.openf1.org/v1/drivers?session_key=latest";

const MIN_POLL_SECS: u64 = 5;
const MAX_POLL_SECS: u64 = 86_400;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Live,
    Demo,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub source: SourceKind,
    pub api_base_url: String,
    pub driver_images_url: String,
    pub standings_poll: Duration,
    pub calendar_poll: Duration,
    pub profiles_poll: Duration,
    pub next_race_poll: Duration,
    pub http_timeout: Duration,
    pub fetch_parallelism: usize,
    pub log_level: LevelFilter,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl AppConfig {
    /// Loads `.env.local` then `.env` (first value wins) and reads the process environment.
    pub fn from_env() -> Self {
        let _ = dotenvy::from_filename(".env.local");
        let _ = dotenvy::from_filename(".env");
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let source = match lookup("F1_SOURCE")
            .map(|val| val.trim().to_ascii_lowercase())
            .as_deref()
        {
            Some("demo") | Some("offline") => SourceKind::Demo,
            _ => SourceKind::Live,
        };
        let api_base_url = non_empty(lookup("F1_API_BASE_URL"))
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        let driver_images_url = non_empty(lookup("F1_DRIVER_IMAGES_URL"))
            .unwrap_or_else(|| DEFAULT_DRIVER_IMAGES_URL.to_string());

        let poll = |key: &str, default: u64| {
            Duration::from_secs(
                lookup(key)
                    .and_then(|val| val.trim().parse::<u64>().ok())
                    .unwrap_or(default)
                    .clamp(MIN_POLL_SECS, MAX_POLL_SECS),
            )
        };

        let http_timeout = Duration::from_secs(
            lookup("HTTP_TIMEOUT_SECS")
                .and_then(|val| val.trim().parse::<u64>().ok())
                .unwrap_or(10)
                .clamp(1, 120),
        );
        let fetch_parallelism = lookup("FETCH_PARALLELISM")
            .and_then(|val| val.trim().parse::<usize>().ok())
            .unwrap_or(4)
            .clamp(2, 32);
        let log_level = lookup("F1_LOG_LEVEL")
            .and_then(|val| val.trim().parse::<LevelFilter>().ok())
            .unwrap_or(LevelFilter::Info);

        Self {
            source,
            api_base_url,
            driver_images_url,
            standings_poll: poll("STANDINGS_POLL_SECS", 30),
            calendar_poll: poll("CALENDAR_POLL_SECS", 60),
            profiles_poll: poll("PROFILES_POLL_SECS", 30),
            next_race_poll: poll("NEXT_RACE_POLL_SECS", 30),
            http_timeout,
            fetch_parallelism,
            log_level,
        }
    }
}

fn non_empty(val: Option<String>) -> Option<String> {
    val.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
