use chrono::{Datelike, Duration as ChronoDuration, Local, NaiveDate};

use crate::f1_fetch::{F1Source, FetchOutcome};
use crate::state::{
    Circuit, CircuitLocation, ConstructorRecord, DriverImageMap, DriverRecord, RaceRecord,
    StandingEntry,
};

/// Offline source with a fixed grid and a calendar laid around `today`, so every race status
/// shows up without network access.
#[derive(Debug, Clone)]
pub struct DemoSource {
    today: NaiveDate,
}

impl Default for DemoSource {
    fn default() -> Self {
        Self::new(Local::now().date_naive())
    }
}

impl DemoSource {
    pub fn new(today: NaiveDate) -> Self {
        Self { today }
    }
}

impl F1Source for DemoSource {
    fn driver_standings(&self) -> FetchOutcome<Vec<StandingEntry>> {
        FetchOutcome::Fresh(seed_standings())
    }

    fn race_schedule(&self) -> FetchOutcome<Vec<RaceRecord>> {
        FetchOutcome::Fresh(seed_schedule(self.today))
    }

    fn driver_images(&self) -> FetchOutcome<DriverImageMap> {
        FetchOutcome::Fresh(seed_images())
    }
}

fn seed_standings() -> Vec<StandingEntry> {
    let rows = [
        ("1", "437", "9", "max_verstappen", "VER", "1", "Max", "Verstappen", (1997, 9, 30), "Dutch", "red_bull", "Red Bull"),
        ("2", "374", "4", "norris", "NOR", "4", "Lando", "Norris", (1999, 11, 13), "British", "mclaren", "McLaren"),
        ("3", "356", "3", "leclerc", "LEC", "16", "Charles", "Leclerc", (1997, 10, 16), "Monegasque", "ferrari", "Ferrari"),
        ("4", "292", "2", "piastri", "PIA", "81", "Oscar", "Piastri", (2001, 4, 6), "Australian", "mclaren", "McLaren"),
        ("5", "290", "2", "sainz", "SAI", "55", "Carlos", "Sainz", (1994, 9, 1), "Spanish", "ferrari", "Ferrari"),
        ("6", "245", "1", "russell", "RUS", "63", "George", "Russell", (1998, 2, 15), "British", "mercedes", "Mercedes"),
        ("7", "223", "2", "hamilton", "HAM", "44", "Lewis", "Hamilton", (1985, 1, 7), "British", "mercedes", "Mercedes"),
        ("8", "152", "0", "perez", "PER", "11", "Sergio", "Pérez", (1990, 1, 26), "Mexican", "red_bull", "Red Bull"),
    ];

    rows.into_iter()
        .map(
            |(position, points, wins, id, code, number, given, family, dob, nationality, team_id, team)| {
                let (y, m, d) = dob;
                StandingEntry {
                    position: position.to_string(),
                    position_text: position.to_string(),
                    points: points.to_string(),
                    wins: wins.to_string(),
                    driver: DriverRecord {
                        id: id.to_string(),
                        code: Some(code.to_string()),
                        profile_url: format!("https://en.wikipedia.org/wiki/{given}_{family}"),
                        given_name: given.to_string(),
                        family_name: family.to_string(),
                        date_of_birth: NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default(),
                        nationality: nationality.to_string(),
                        permanent_number: Some(number.to_string()),
                    },
                    constructors: vec![ConstructorRecord {
                        id: team_id.to_string(),
                        name: team.to_string(),
                        nationality: String::new(),
                        url: String::new(),
                    }],
                }
            },
        )
        .collect()
}

fn seed_images() -> DriverImageMap {
    // Norris is left out so his row falls back to code matching, Pérez to the avatar.
    [
        (1, "https://demo.f1.invalid/headshots/maxver01.png"),
        (16, "https://demo.f1.invalid/headshots/chalec01.png"),
        (81, "https://demo.f1.invalid/headshots/oscpia01.png"),
        (55, "https://demo.f1.invalid/headshots/carsai01.png"),
        (63, "https://demo.f1.invalid/headshots/georus01.png"),
        (44, "https://demo.f1.invalid/headshots/lewham01.png"),
        (99, "https://demo.f1.invalid/headshots/lannor01.png"),
    ]
    .into_iter()
    .map(|(number, url)| (number, url.to_string()))
    .collect()
}

fn seed_schedule(today: NaiveDate) -> Vec<RaceRecord> {
    let races = [
        (-42, "Bahrain Grand Prix", "bahrain", "Bahrain International Circuit", "Sakhir", "Bahrain"),
        (-14, "Saudi Arabian Grand Prix", "jeddah", "Jeddah Corniche Circuit", "Jeddah", "Saudi Arabia"),
        (0, "Australian Grand Prix", "albert_park", "Albert Park Grand Prix Circuit", "Melbourne", "Australia"),
        (14, "Japanese Grand Prix", "suzuka", "Suzuka Circuit", "Suzuka", "Japan"),
        (28, "Chinese Grand Prix", "shanghai", "Shanghai International Circuit", "Shanghai", "China"),
        (49, "Miami Grand Prix", "miami", "Miami International Autodrome", "Miami", "USA"),
    ];

    races
        .into_iter()
        .enumerate()
        .map(|(idx, (offset, name, circuit_id, circuit, locality, country))| RaceRecord {
            season: today.year().to_string(),
            round: (idx + 1).to_string(),
            name: name.to_string(),
            url: String::new(),
            circuit: Circuit {
                id: circuit_id.to_string(),
                name: circuit.to_string(),
                url: String::new(),
                location: CircuitLocation {
                    locality: locality.to_string(),
                    country: country.to_string(),
                    ..CircuitLocation::default()
                },
            },
            date: today + ChronoDuration::days(offset),
            time: Some("05:00:00Z".to_string()),
        })
        .collect()
}
