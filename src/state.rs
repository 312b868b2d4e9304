use std::collections::{BTreeMap, VecDeque};

use chrono::NaiveDate;
use serde::Deserialize;

const MAX_LOGS: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StandingEntry {
    // Unclassified drivers come back with only a positionText.
    #[serde(default)]
    pub position: String,
    #[serde(rename = "positionText", default)]
    pub position_text: String,
    pub points: String,
    pub wins: String,
    #[serde(rename = "Driver")]
    pub driver: DriverRecord,
    #[serde(rename = "Constructors", default)]
    pub constructors: Vec<ConstructorRecord>,
}

impl StandingEntry {
    pub fn current_team(&self) -> Option<&str> {
        self.constructors.first().map(|c| c.name.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DriverRecord {
    #[serde(rename = "driverId")]
    pub id: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(rename = "url", default)]
    pub profile_url: String,
    #[serde(rename = "givenName")]
    pub given_name: String,
    #[serde(rename = "familyName")]
    pub family_name: String,
    #[serde(rename = "dateOfBirth")]
    pub date_of_birth: NaiveDate,
    #[serde(default)]
    pub nationality: String,
    #[serde(rename = "permanentNumber", default)]
    pub permanent_number: Option<String>,
}

impl DriverRecord {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.given_name, self.family_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConstructorRecord {
    #[serde(rename = "constructorId")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub nationality: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RaceRecord {
    pub season: String,
    pub round: String,
    #[serde(rename = "raceName")]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(rename = "Circuit")]
    pub circuit: Circuit,
    pub date: NaiveDate,
    #[serde(default)]
    pub time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Circuit {
    #[serde(rename = "circuitId", default)]
    pub id: String,
    #[serde(rename = "circuitName")]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(rename = "Location", default)]
    pub location: CircuitLocation,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CircuitLocation {
    #[serde(default)]
    pub lat: String,
    #[serde(default)]
    pub long: String,
    #[serde(default)]
    pub locality: String,
    #[serde(default)]
    pub country: String,
}

/// Headshot URLs keyed by permanent driver number, iterated in ascending number order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriverImageMap(BTreeMap<u32, String>);

impl DriverImageMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, number: u32, url: impl Into<String>) {
        self.0.insert(number, url.into());
    }

    pub fn get(&self, number: u32) -> Option<&str> {
        self.0.get(&number).map(String::as_str)
    }

    /// First URL (by driver number) containing `needle`, ignoring ASCII case.
    pub fn find_url_containing(&self, needle: &str) -> Option<&str> {
        self.0
            .values()
            .find(|url| contains_ascii_ci(url, needle))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(u32, String)> for DriverImageMap {
    fn from_iter<I: IntoIterator<Item = (u32, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StandingsBoard {
    pub entries: Vec<StandingEntry>,
    pub images: DriverImageMap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
    Standings,
    Calendar,
    Profiles,
    NextRace,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewSnapshot {
    Standings(StandingsBoard),
    Calendar(Vec<RaceRecord>),
    Profiles(Vec<StandingEntry>),
    NextRace(Option<RaceRecord>),
}

impl ViewSnapshot {
    pub fn view(&self) -> ViewKind {
        match self {
            ViewSnapshot::Standings(_) => ViewKind::Standings,
            ViewSnapshot::Calendar(_) => ViewKind::Calendar,
            ViewSnapshot::Profiles(_) => ViewKind::Profiles,
            ViewSnapshot::NextRace(_) => ViewKind::NextRace,
        }
    }
}

/// Identifies one lifetime of a mounted view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MountId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPhase {
    Idle,
    Loading,
    Ready,
    TornDown,
}

#[derive(Debug, Clone)]
pub struct PollState<S> {
    pub snapshot: S,
    pub is_loading: bool,
    pub last_error: Option<String>,
    phase: PollPhase,
    mount: Option<MountId>,
}

impl<S: Default> Default for PollState<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Default> PollState<S> {
    pub fn new() -> Self {
        Self {
            snapshot: S::default(),
            is_loading: false,
            last_error: None,
            phase: PollPhase::Idle,
            mount: None,
        }
    }

    /// Starts a fresh lifetime; whatever the previous mount held is discarded.
    pub fn mount(&mut self, id: MountId) {
        *self = Self {
            snapshot: S::default(),
            is_loading: true,
            last_error: None,
            phase: PollPhase::Loading,
            mount: Some(id),
        };
    }

    pub fn tear_down(&mut self) {
        self.snapshot = S::default();
        self.is_loading = false;
        self.phase = PollPhase::TornDown;
        self.mount = None;
    }

    pub fn phase(&self) -> PollPhase {
        self.phase
    }

    pub fn is_live(&self, id: MountId) -> bool {
        self.mount == Some(id) && self.phase != PollPhase::TornDown
    }

    pub fn begin_tick(&mut self, id: MountId) -> bool {
        if !self.is_live(id) {
            return false;
        }
        self.is_loading = true;
        self.phase = PollPhase::Loading;
        true
    }

    /// Replaces the snapshot wholesale. Returns false (and writes nothing) for a stale mount.
    pub fn complete(&mut self, id: MountId, snapshot: S, degraded: Option<String>) -> bool {
        if !self.is_live(id) {
            return false;
        }
        self.snapshot = snapshot;
        self.is_loading = false;
        self.last_error = degraded;
        self.phase = PollPhase::Ready;
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Standings,
    Calendar,
    Profiles,
}

impl Screen {
    pub fn view(self) -> ViewKind {
        match self {
            Screen::Standings => ViewKind::Standings,
            Screen::Calendar => ViewKind::Calendar,
            Screen::Profiles => ViewKind::Profiles,
        }
    }

    pub fn next(self) -> Screen {
        match self {
            Screen::Standings => Screen::Calendar,
            Screen::Calendar => Screen::Profiles,
            Screen::Profiles => Screen::Standings,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Delta {
    PollStarted {
        view: ViewKind,
        mount: MountId,
    },
    PollFinished {
        mount: MountId,
        snapshot: ViewSnapshot,
        degraded: Option<String>,
    },
    Log(String),
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub screen: Screen,
    pub selected: usize,
    pub standings: PollState<StandingsBoard>,
    pub calendar: PollState<Vec<RaceRecord>>,
    pub profiles: PollState<Vec<StandingEntry>>,
    pub next_race: PollState<Option<RaceRecord>>,
    pub logs: VecDeque<String>,
    pub help_overlay: bool,
    next_mount: u64,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self {
            screen: Screen::Standings,
            selected: 0,
            standings: PollState::new(),
            calendar: PollState::new(),
            profiles: PollState::new(),
            next_race: PollState::new(),
            logs: VecDeque::new(),
            help_overlay: false,
            next_mount: 0,
        }
    }

    pub fn mount_view(&mut self, view: ViewKind) -> MountId {
        self.next_mount += 1;
        let id = MountId(self.next_mount);
        match view {
            ViewKind::Standings => self.standings.mount(id),
            ViewKind::Calendar => self.calendar.mount(id),
            ViewKind::Profiles => self.profiles.mount(id),
            ViewKind::NextRace => self.next_race.mount(id),
        }
        id
    }

    pub fn tear_down_view(&mut self, view: ViewKind) {
        match view {
            ViewKind::Standings => self.standings.tear_down(),
            ViewKind::Calendar => self.calendar.tear_down(),
            ViewKind::Profiles => self.profiles.tear_down(),
            ViewKind::NextRace => self.next_race.tear_down(),
        }
    }

    pub fn view_phase(&self, view: ViewKind) -> PollPhase {
        match view {
            ViewKind::Standings => self.standings.phase(),
            ViewKind::Calendar => self.calendar.phase(),
            ViewKind::Profiles => self.profiles.phase(),
            ViewKind::NextRace => self.next_race.phase(),
        }
    }

    pub fn view_is_loading(&self, view: ViewKind) -> bool {
        match view {
            ViewKind::Standings => self.standings.is_loading,
            ViewKind::Calendar => self.calendar.is_loading,
            ViewKind::Profiles => self.profiles.is_loading,
            ViewKind::NextRace => self.next_race.is_loading,
        }
    }

    pub fn view_error(&self, view: ViewKind) -> Option<&str> {
        match view {
            ViewKind::Standings => self.standings.last_error.as_deref(),
            ViewKind::Calendar => self.calendar.last_error.as_deref(),
            ViewKind::Profiles => self.profiles.last_error.as_deref(),
            ViewKind::NextRace => self.next_race.last_error.as_deref(),
        }
    }

    fn begin_tick(&mut self, view: ViewKind, mount: MountId) -> bool {
        match view {
            ViewKind::Standings => self.standings.begin_tick(mount),
            ViewKind::Calendar => self.calendar.begin_tick(mount),
            ViewKind::Profiles => self.profiles.begin_tick(mount),
            ViewKind::NextRace => self.next_race.begin_tick(mount),
        }
    }

    pub fn row_count(&self) -> usize {
        match self.screen {
            Screen::Standings => self.standings.snapshot.entries.len(),
            Screen::Calendar => self.calendar.snapshot.len(),
            Screen::Profiles => self.profiles.snapshot.len(),
        }
    }

    pub fn select_next(&mut self) {
        let total = self.row_count();
        if total == 0 {
            self.selected = 0;
            return;
        }
        self.selected = (self.selected + 1) % total;
    }

    pub fn select_prev(&mut self) {
        let total = self.row_count();
        if total == 0 {
            self.selected = 0;
            return;
        }
        self.selected = if self.selected == 0 {
            total - 1
        } else {
            self.selected - 1
        };
    }

    fn clamp_selection(&mut self) {
        let total = self.row_count();
        if total == 0 {
            self.selected = 0;
        } else if self.selected >= total {
            self.selected = total - 1;
        }
    }

    pub fn selected_standing(&self) -> Option<&StandingEntry> {
        match self.screen {
            Screen::Standings => self.standings.snapshot.entries.get(self.selected),
            Screen::Profiles => self.profiles.snapshot.get(self.selected),
            Screen::Calendar => None,
        }
    }

    pub fn selected_race(&self) -> Option<&RaceRecord> {
        match self.screen {
            Screen::Calendar => self.calendar.snapshot.get(self.selected),
            _ => None,
        }
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }
}

pub fn apply_delta(state: &mut AppState, delta: Delta) {
    match delta {
        Delta::PollStarted { view, mount } => {
            state.begin_tick(view, mount);
        }
        Delta::PollFinished {
            mount,
            snapshot,
            degraded,
        } => {
            let view = snapshot.view();
            let applied = match snapshot {
                ViewSnapshot::Standings(board) => state.standings.complete(mount, board, degraded),
                ViewSnapshot::Calendar(races) => state.calendar.complete(mount, races, degraded),
                ViewSnapshot::Profiles(entries) => {
                    state.profiles.complete(mount, entries, degraded)
                }
                ViewSnapshot::NextRace(race) => state.next_race.complete(mount, race, degraded),
            };
            if applied && view == state.screen.view() {
                state.clamp_selection();
            }
        }
        Delta::Log(msg) => state.push_log(msg),
    }
}

pub fn screen_label(screen: Screen) -> &'static str {
    match screen {
        Screen::Standings => "STANDINGS",
        Screen::Calendar => "CALENDAR",
        Screen::Profiles => "DRIVERS",
    }
}

pub fn view_label(view: ViewKind) -> &'static str {
    match view {
        ViewKind::Standings => "standings",
        ViewKind::Calendar => "calendar",
        ViewKind::Profiles => "profiles",
        ViewKind::NextRace => "next race",
    }
}

/// Case-insensitive ASCII substring search without allocating a lowercased copy.
fn contains_ascii_ci(haystack: &str, needle: &str) -> bool {
    let h = haystack.as_bytes();
    let n = needle.as_bytes();
    if n.len() > h.len() {
        return false;
    }
    if n.is_empty() {
        return true;
    }
    h.windows(n.len())
        .any(|window| window.iter().zip(n).all(|(a, b)| a.eq_ignore_ascii_case(b)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_state_lifecycle() {
        let mut poll: PollState<Vec<u32>> = PollState::new();
        assert_eq!(poll.phase(), PollPhase::Idle);
        assert!(!poll.is_loading);

        let id = MountId(7);
        poll.mount(id);
        assert_eq!(poll.phase(), PollPhase::Loading);
        assert!(poll.is_loading);
        assert!(poll.snapshot.is_empty());

        assert!(poll.complete(id, vec![1, 2], None));
        assert_eq!(poll.phase(), PollPhase::Ready);
        assert!(!poll.is_loading);

        assert!(poll.begin_tick(id));
        assert_eq!(poll.phase(), PollPhase::Loading);
        assert!(poll.complete(id, vec![3], Some("timeout".to_string())));
        assert_eq!(poll.snapshot, vec![3]);
        assert_eq!(poll.last_error.as_deref(), Some("timeout"));

        poll.tear_down();
        assert_eq!(poll.phase(), PollPhase::TornDown);
        assert!(!poll.begin_tick(id));
        assert!(!poll.complete(id, vec![9], None));
        assert!(poll.snapshot.is_empty());
    }

    #[test]
    fn stale_mount_cannot_write() {
        let mut poll: PollState<Vec<u32>> = PollState::new();
        poll.mount(MountId(1));
        poll.mount(MountId(2));
        assert!(!poll.complete(MountId(1), vec![1], None));
        assert!(poll.snapshot.is_empty());
        assert!(poll.is_loading);
    }

    #[test]
    fn image_lookup_by_substring_ignores_case() {
        let images: DriverImageMap = [
            (1, "https://img.example/MAXVER01.png".to_string()),
            (44, "https://img.example/lewham01.png".to_string()),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            images.find_url_containing("ver"),
            Some("https://img.example/MAXVER01.png")
        );
        assert_eq!(
            images.find_url_containing("HAM"),
            Some("https://img.example/lewham01.png")
        );
        assert_eq!(images.find_url_containing("lec"), None);
    }

    #[test]
    fn selection_wraps_over_current_screen_rows() {
        let mut state = AppState::new();
        state.screen = Screen::Calendar;
        state.select_next();
        assert_eq!(state.selected, 0);
        state.select_prev();
        assert_eq!(state.selected, 0);
    }
}
