//! Display-only values derived from standings and race records. Everything here is pure:
//! the caller supplies "now".

use chrono::{Datelike, NaiveDate, NaiveDateTime};

use crate::state::{DriverImageMap, DriverRecord, StandingEntry};

const AVATAR_BASE_URL: &str = "https://ui-avatars.com/api/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionTier {
    Trophy,
    Silver,
    Bronze,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RaceStatus {
    Today,
    Upcoming,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverStats {
    pub age: i32,
    pub points: String,
    pub wins: String,
    pub position: String,
}

/// Exact string match; "01" or " 1" are not podium positions.
pub fn position_tier(position: &str) -> PositionTier {
    match position {
        "1" => PositionTier::Trophy,
        "2" => PositionTier::Silver,
        "3" => PositionTier::Bronze,
        _ => PositionTier::Neutral,
    }
}

/// Calendar-year difference only; birthdays later in the year are not subtracted.
pub fn driver_age(date_of_birth: NaiveDate, today: NaiveDate) -> i32 {
    today.year() - date_of_birth.year()
}

pub fn race_status(race_date: NaiveDate, now: NaiveDateTime) -> RaceStatus {
    if race_date == now.date() {
        return RaceStatus::Today;
    }
    let starts_after_now = race_date
        .and_hms_opt(0, 0, 0)
        .is_some_and(|start| start > now);
    if starts_after_now {
        RaceStatus::Upcoming
    } else {
        RaceStatus::Completed
    }
}

/// Number key, then driver code inside any URL, then a generated avatar.
pub fn resolve_driver_image(driver: &DriverRecord, images: &DriverImageMap) -> String {
    let by_number = driver
        .permanent_number
        .as_deref()
        .and_then(|raw| raw.trim().parse::<u32>().ok())
        .and_then(|number| images.get(number));
    if let Some(url) = by_number {
        return url.to_string();
    }

    let by_code = driver
        .code
        .as_deref()
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .and_then(|code| images.find_url_containing(code));
    if let Some(url) = by_code {
        return url.to_string();
    }

    placeholder_avatar_url(&driver.given_name, &driver.family_name)
}

pub fn placeholder_avatar_url(given_name: &str, family_name: &str) -> String {
    format!(
        "{AVATAR_BASE_URL}?name={}+{}&background=dc2626&color=ffffff&size=128&font-size=0.6",
        encode_name(given_name),
        encode_name(family_name)
    )
}

fn encode_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for part in raw.split_whitespace() {
        if !out.is_empty() {
            out.push('+');
        }
        for byte in part.bytes() {
            if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~') {
                out.push(byte as char);
            } else {
                out.push_str(&format!("%{byte:02X}"));
            }
        }
    }
    out
}

pub fn driver_stats(entry: &StandingEntry, today: NaiveDate) -> DriverStats {
    DriverStats {
        age: driver_age(entry.driver.date_of_birth, today),
        points: entry.points.clone(),
        wins: entry.wins.clone(),
        position: entry.position.clone(),
    }
}

pub fn wins_label(wins: &str) -> String {
    if wins == "1" {
        format!("{wins} win")
    } else {
        format!("{wins} wins")
    }
}

/// "March 1, 2024".
pub fn format_race_date(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

pub fn tier_label(tier: PositionTier) -> &'static str {
    match tier {
        PositionTier::Trophy => "TROPHY",
        PositionTier::Silver => "SILVER",
        PositionTier::Bronze => "BRONZE",
        PositionTier::Neutral => "",
    }
}

pub fn tier_glyph(tier: PositionTier) -> &'static str {
    match tier {
        PositionTier::Trophy => "🏆",
        PositionTier::Silver => "🥈",
        PositionTier::Bronze => "🥉",
        PositionTier::Neutral => "★",
    }
}

pub fn race_status_label(status: RaceStatus) -> &'static str {
    match status {
        RaceStatus::Today => "Race Day!",
        RaceStatus::Upcoming => "Upcoming",
        RaceStatus::Completed => "Completed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn driver(number: Option<&str>, code: Option<&str>) -> DriverRecord {
        DriverRecord {
            id: "max_verstappen".to_string(),
            code: code.map(str::to_string),
            profile_url: String::new(),
            given_name: "Max".to_string(),
            family_name: "Verstappen".to_string(),
            date_of_birth: date(1997, 9, 30),
            nationality: "Dutch".to_string(),
            permanent_number: number.map(str::to_string),
        }
    }

    #[test]
    fn podium_tiers_use_exact_strings() {
        assert_eq!(position_tier("1"), PositionTier::Trophy);
        assert_eq!(position_tier("2"), PositionTier::Silver);
        assert_eq!(position_tier("3"), PositionTier::Bronze);
        for other in ["4", "21", "DNS", "", "01", "1.0"] {
            assert_eq!(position_tier(other), PositionTier::Neutral, "{other}");
        }
    }

    #[test]
    fn age_ignores_month_and_day() {
        assert_eq!(driver_age(date(2000, 12, 31), date(2024, 1, 1)), 24);
        assert_eq!(driver_age(date(1997, 9, 30), date(2024, 9, 29)), 27);
    }

    #[test]
    fn race_status_today_wins_over_clock_time() {
        let now = date(2024, 3, 1).and_hms_opt(23, 59, 0).expect("valid time");
        let statuses: Vec<RaceStatus> = [date(2024, 3, 1), date(2024, 3, 10), date(2024, 2, 20)]
            .into_iter()
            .map(|d| race_status(d, now))
            .collect();
        assert_eq!(
            statuses,
            vec![RaceStatus::Today, RaceStatus::Upcoming, RaceStatus::Completed]
        );
    }

    #[test]
    fn number_match_beats_code_match() {
        let mut images = DriverImageMap::new();
        images.insert(44, "url/ham.png");
        let resolved = resolve_driver_image(&driver(Some("44"), Some("VER")), &images);
        assert_eq!(resolved, "url/ham.png");
    }

    #[test]
    fn code_matches_url_contents() {
        let mut images = DriverImageMap::new();
        images.insert(81, "https://img/oscpia01.png");
        images.insert(99, "https://img/maxver01.png");
        let resolved = resolve_driver_image(&driver(Some("33"), Some("VER")), &images);
        assert_eq!(resolved, "https://img/maxver01.png");
    }

    #[test]
    fn placeholder_when_nothing_matches() {
        let images = DriverImageMap::new();
        let resolved = resolve_driver_image(&driver(None, Some("")), &images);
        assert_eq!(
            resolved,
            "https://ui-avatars.com/api/?name=Max+Verstappen&background=dc2626&color=ffffff&size=128&font-size=0.6"
        );
    }

    #[test]
    fn placeholder_encodes_multi_word_names() {
        let url = placeholder_avatar_url("Andrea Kimi", "Antonelli");
        assert!(url.contains("name=Andrea+Kimi+Antonelli&"));
        let url = placeholder_avatar_url("Sergio", "Pérez");
        assert!(url.contains("name=Sergio+P%C3%A9rez&"));
    }

    #[test]
    fn labels() {
        assert_eq!(wins_label("1"), "1 win");
        assert_eq!(wins_label("0"), "0 wins");
        assert_eq!(wins_label("19"), "19 wins");
        assert_eq!(format_race_date(date(2024, 3, 1)), "March 1, 2024");
        assert_eq!(race_status_label(RaceStatus::Today), "Race Day!");
    }
}
