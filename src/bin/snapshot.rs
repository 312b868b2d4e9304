use anyhow::Result;
use chrono::Local;

use f1_paddock::config::{AppConfig, SourceKind};
use f1_paddock::demo_source::DemoSource;
use f1_paddock::f1_fetch::{ErgastSource, F1Source};
use f1_paddock::presentation::{
    driver_age, format_race_date, position_tier, race_status, race_status_label,
    resolve_driver_image, tier_label, wins_label,
};

fn main() -> Result<()> {
    // Degraded fetches are reported through `log::warn!`.
    colog::init();
    let config = AppConfig::from_env();
    let source: Box<dyn F1Source> = match config.source {
        SourceKind::Live => Box::new(ErgastSource::from_config(&config)),
        SourceKind::Demo => Box::new(DemoSource::default()),
    };
    let now = Local::now().naive_local();

    let standings = source.driver_standings();
    let images = source.driver_images();
    let images = images.into_value();

    println!("Driver standings");
    for entry in standings.value() {
        let tier = position_tier(&entry.position);
        println!(
            "{:>3} {:<24} {:<4} {:<16} {:>6} pts  {:<8} age {:<3} {:<7} {}",
            entry.position,
            entry.driver.full_name(),
            entry.driver.code.as_deref().unwrap_or("-"),
            entry.current_team().unwrap_or("-"),
            entry.points,
            wins_label(&entry.wins),
            driver_age(entry.driver.date_of_birth, now.date()),
            tier_label(tier),
            resolve_driver_image(&entry.driver, &images)
        );
    }

    let schedule = source.race_schedule();
    println!();
    println!("Race calendar");
    for race in schedule.value() {
        println!(
            "{:>3} {:<28} {:<20} {:<10}",
            race.round,
            race.name,
            format_race_date(race.date),
            race_status_label(race_status(race.date, now))
        );
    }

    println!();
    match source.next_race().into_value() {
        Some(race) => println!(
            "Next race: {} at {} on {}",
            race.name,
            race.circuit.name,
            format_race_date(race.date)
        ),
        None => println!("Next race: TBD"),
    }
    Ok(())
}

