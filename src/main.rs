use std::collections::HashMap;
use std::io;
use std::sync::{Arc, mpsc};
use std::time::{Duration, Instant};

use chrono::{Local, NaiveDateTime};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use f1_paddock::config::{AppConfig, SourceKind};
use f1_paddock::console_log::ConsoleLogger;
use f1_paddock::demo_source::DemoSource;
use f1_paddock::f1_fetch::{ErgastSource, F1Source};
use f1_paddock::feed::{self, PollHandle};
use f1_paddock::presentation::{
    self, PositionTier, RaceStatus, format_race_date, position_tier, race_status,
    resolve_driver_image, wins_label,
};
use f1_paddock::state::{
    AppState, Delta, PollPhase, RaceRecord, Screen, ViewKind, apply_delta, screen_label,
    view_label,
};

struct App {
    state: AppState,
    should_quit: bool,
    config: AppConfig,
    source: Arc<dyn F1Source>,
    delta_tx: mpsc::Sender<Delta>,
    pool: Option<Arc<rayon::ThreadPool>>,
    pollers: HashMap<ViewKind, PollHandle>,
}

impl App {
    fn new(config: AppConfig, source: Arc<dyn F1Source>, delta_tx: mpsc::Sender<Delta>) -> Self {
        let pool = feed::build_fetch_pool(config.fetch_parallelism);
        Self {
            state: AppState::new(),
            should_quit: false,
            config,
            source,
            delta_tx,
            pool,
            pollers: HashMap::new(),
        }
    }

    fn start(&mut self) {
        // The navigation banner lives for the whole session.
        self.mount(ViewKind::NextRace);
        self.mount(self.state.screen.view());
    }

    fn interval_for(&self, view: ViewKind) -> Duration {
        match view {
            ViewKind::Standings => self.config.standings_poll,
            ViewKind::Calendar => self.config.calendar_poll,
            ViewKind::Profiles => self.config.profiles_poll,
            ViewKind::NextRace => self.config.next_race_poll,
        }
    }

    fn mount(&mut self, view: ViewKind) {
        self.unmount(view);
        let mount = self.state.mount_view(view);
        let handle = feed::spawn_poller(
            view,
            mount,
            self.interval_for(view),
            feed::view_fetcher(view, self.source.clone()),
            self.delta_tx.clone(),
            self.pool.clone(),
        );
        self.pollers.insert(view, handle);
    }

    fn unmount(&mut self, view: ViewKind) {
        if let Some(handle) = self.pollers.remove(&view) {
            handle.cancel();
        }
        if self.state.view_phase(view) != PollPhase::Idle {
            self.state.tear_down_view(view);
        }
    }

    fn unmount_all(&mut self) {
        let views: Vec<ViewKind> = self.pollers.keys().copied().collect();
        for view in views {
            self.unmount(view);
        }
    }

    fn switch_screen(&mut self, screen: Screen) {
        if self.state.screen == screen {
            return;
        }
        self.unmount(self.state.screen.view());
        self.state.screen = screen;
        self.state.selected = 0;
        self.mount(screen.view());
    }

    fn on_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('1') => self.switch_screen(Screen::Standings),
            KeyCode::Char('2') => self.switch_screen(Screen::Calendar),
            KeyCode::Char('3') => self.switch_screen(Screen::Profiles),
            KeyCode::Tab => self.switch_screen(self.state.screen.next()),
            KeyCode::Char('j') | KeyCode::Down => self.state.select_next(),
            KeyCode::Char('k') | KeyCode::Up => self.state.select_prev(),
            KeyCode::Char('r') | KeyCode::Char('R') => {
                let view = self.state.screen.view();
                self.mount(view);
                self.state
                    .push_log(format!("[INFO] Refresh requested: {}", view_label(view)));
            }
            KeyCode::Char('?') => self.state.help_overlay = !self.state.help_overlay,
            KeyCode::Esc => self.state.help_overlay = false,
            _ => {}
        }
    }
}

fn main() -> io::Result<()> {
    let config = AppConfig::from_env();

    let (tx, rx) = mpsc::channel();
    if let Err(err) = ConsoleLogger::install(config.log_level, tx.clone()) {
        eprintln!("warning: {err:#}");
    }

    let source: Arc<dyn F1Source> = match config.source {
        SourceKind::Live => Arc::new(ErgastSource::from_config(&config)),
        SourceKind::Demo => Arc::new(DemoSource::default()),
    };

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let mut app = App::new(config, source, tx);
    app.start();
    let res = run_app(&mut terminal, &mut app, rx);
    app.unmount_all();

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: mpsc::Receiver<Delta>,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        while let Ok(delta) = rx.try_recv() {
            apply_delta(&mut app.state, delta);
        }

        terminal.draw(|f| ui(f, &app.state))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.on_key(key);
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, state: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(4),
            Constraint::Length(1),
        ])
        .split(frame.size());

    let header = Paragraph::new(header_text(state))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    let now = Local::now().naive_local();
    match state.screen {
        Screen::Standings => render_standings(frame, chunks[1], state),
        Screen::Calendar => render_calendar(frame, chunks[1], state, now),
        Screen::Profiles => render_profiles(frame, chunks[1], state, now),
    }

    let console = Paragraph::new(console_text(state))
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().title("Console").borders(Borders::TOP));
    frame.render_widget(console, chunks[2]);

    let footer = Paragraph::new(
        "1 Standings | 2 Calendar | 3 Drivers | Tab Next | j/k/↑/↓ Move | r Refresh | ? Help | q Quit",
    );
    frame.render_widget(footer, chunks[3]);

    if state.help_overlay {
        render_help_overlay(frame, frame.size());
    }
}

fn header_text(state: &AppState) -> String {
    let view = state.screen.view();
    let activity = if state.view_is_loading(view) {
        " | refreshing…"
    } else {
        ""
    };
    let line1 = format!(" F1 PADDOCK | {}{}", screen_label(state.screen), activity);
    let line2 = format!(" {}", next_race_banner(state.next_race.snapshot.as_ref()));
    format!("{line1}\n{line2}")
}

fn next_race_banner(race: Option<&RaceRecord>) -> String {
    let Some(race) = race else {
        return "Next race: TBD".to_string();
    };
    let location = &race.circuit.location;
    let time = race
        .time
        .as_deref()
        .map(|t| format!(" {}", t.trim_end_matches('Z')))
        .unwrap_or_default();
    format!(
        "Next race: R{} {} · {}, {} · {}{}",
        race.round,
        race.name,
        location.locality,
        location.country,
        format_race_date(race.date),
        time
    )
}

/// Placeholder rows while a view is loading with nothing to show yet.
fn render_placeholder(frame: &mut Frame, area: Rect, state: &AppState, view: ViewKind) -> bool {
    if state.row_count() > 0 {
        return false;
    }
    let text = if state.view_is_loading(view) {
        let mut rows = vec![format!("Loading {}…", view_label(view))];
        rows.extend((0..area.height.saturating_sub(1).min(6)).map(|_| "░".repeat(36)));
        rows.join("\n")
    } else {
        match state.view_error(view) {
            Some(err) => format!("No {} data ({err})", view_label(view)),
            None => format!("No {} data", view_label(view)),
        }
    };
    let empty = Paragraph::new(text).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(empty, area);
    true
}

fn render_standings(frame: &mut Frame, area: Rect, state: &AppState) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(2),
        ])
        .split(area);

    let widths = standings_columns();
    render_header_row(
        frame,
        sections[0],
        &widths,
        &["", "Pos", "Driver", "Code", "Team • Nationality", "Pts", "Wins"],
    );

    let list_area = sections[1];
    if render_placeholder(frame, list_area, state, ViewKind::Standings) {
        return;
    }

    let board = &state.standings.snapshot;
    let visible = list_area.height as usize;
    let (start, end) = visible_range(state.selected, board.entries.len(), visible);

    for (i, idx) in (start..end).enumerate() {
        let row_area = Rect {
            x: list_area.x,
            y: list_area.y + i as u16,
            width: list_area.width,
            height: 1,
        };
        let entry = &board.entries[idx];
        let tier = position_tier(&entry.position);
        let selected = idx == state.selected;
        let row_style = row_style(tier, selected);
        if selected {
            frame.render_widget(Block::default().style(row_style), row_area);
        }

        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(widths)
            .split(row_area);
        let team = format!(
            "{} • {}",
            entry.current_team().unwrap_or("-"),
            entry.driver.nationality
        );
        let position = if entry.position.is_empty() {
            entry.position_text.as_str()
        } else {
            entry.position.as_str()
        };

        render_cell_text(frame, cols[0], presentation::tier_glyph(tier), row_style);
        render_cell_text(frame, cols[1], position, row_style);
        render_cell_text(frame, cols[2], &entry.driver.full_name(), row_style);
        render_cell_text(
            frame,
            cols[3],
            entry.driver.code.as_deref().unwrap_or("-"),
            row_style,
        );
        render_cell_text(frame, cols[4], &team, row_style);
        render_cell_text(frame, cols[5], &entry.points, row_style);
        render_cell_text(frame, cols[6], &wins_label(&entry.wins), row_style);
    }

    if let Some(entry) = state.selected_standing() {
        let image = resolve_driver_image(&entry.driver, &board.images);
        let detail = Paragraph::new(format!("Headshot: {image}"))
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::TOP));
        frame.render_widget(detail, sections[2]);
    }
}

fn render_calendar(frame: &mut Frame, area: Rect, state: &AppState, now: NaiveDateTime) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(1)])
        .split(area);

    let widths = calendar_columns();
    render_header_row(
        frame,
        sections[0],
        &widths,
        &["Rd", "Race", "Circuit", "Location", "Date", "Time", "Status"],
    );

    let list_area = sections[1];
    if render_placeholder(frame, list_area, state, ViewKind::Calendar) {
        return;
    }

    let races = &state.calendar.snapshot;
    let visible = list_area.height as usize;
    let (start, end) = visible_range(state.selected, races.len(), visible);

    for (i, idx) in (start..end).enumerate() {
        let row_area = Rect {
            x: list_area.x,
            y: list_area.y + i as u16,
            width: list_area.width,
            height: 1,
        };
        let race = &races[idx];
        let status = race_status(race.date, now);
        let selected = idx == state.selected;
        let mut style = status_style(status);
        if selected {
            style = style.bg(Color::DarkGray);
            frame.render_widget(Block::default().style(style), row_area);
        }

        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(widths)
            .split(row_area);
        let location = format!(
            "{}, {}",
            race.circuit.location.locality, race.circuit.location.country
        );

        render_cell_text(frame, cols[0], &race.round, style);
        render_cell_text(frame, cols[1], &race.name, style);
        render_cell_text(frame, cols[2], &race.circuit.name, style);
        render_cell_text(frame, cols[3], &location, style);
        render_cell_text(frame, cols[4], &format_race_date(race.date), style);
        render_cell_text(frame, cols[5], race.time.as_deref().unwrap_or("TBD"), style);
        render_cell_text(frame, cols[6], presentation::race_status_label(status), style);
    }
}

fn render_profiles(frame: &mut Frame, area: Rect, state: &AppState, now: NaiveDateTime) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(30), Constraint::Min(20)])
        .split(area);

    let list_block = Block::default().title("Drivers").borders(Borders::ALL);
    let list_area = list_block.inner(cols[0]);
    frame.render_widget(list_block, cols[0]);

    if render_placeholder(frame, list_area, state, ViewKind::Profiles) {
        return;
    }

    let drivers = &state.profiles.snapshot;
    let visible = list_area.height as usize;
    let (start, end) = visible_range(state.selected, drivers.len(), visible);
    for (i, idx) in (start..end).enumerate() {
        let row_area = Rect {
            x: list_area.x,
            y: list_area.y + i as u16,
            width: list_area.width,
            height: 1,
        };
        let entry = &drivers[idx];
        let tier = position_tier(&entry.position);
        let style = row_style(tier, idx == state.selected);
        let label = format!(
            "{} {:>2} {}",
            presentation::tier_glyph(tier),
            entry.position,
            entry.driver.family_name
        );
        render_cell_text(frame, row_area, &label, style);
    }

    let detail = Paragraph::new(profile_text(state, now))
        .wrap(Wrap { trim: false })
        .block(Block::default().title("Profile").borders(Borders::ALL));
    frame.render_widget(detail, cols[1]);
}

fn profile_text(state: &AppState, now: NaiveDateTime) -> String {
    let Some(entry) = state.selected_standing() else {
        return "Select a driver".to_string();
    };
    let driver = &entry.driver;
    let stats = presentation::driver_stats(entry, now.date());
    let tier = position_tier(&stats.position);
    // The profiles view polls standings only; headshots come from the avatar generator.
    let image = presentation::placeholder_avatar_url(&driver.given_name, &driver.family_name);
    let badge = match presentation::tier_label(tier) {
        "" => String::new(),
        label => format!(" [{label}]"),
    };

    [
        format!("{}{}", driver.full_name(), badge),
        format!(
            "#{}  {}  {}",
            driver.permanent_number.as_deref().unwrap_or("-"),
            driver.code.as_deref().unwrap_or("-"),
            driver.nationality
        ),
        format!("Team: {}", entry.current_team().unwrap_or("-")),
        String::new(),
        format!("Age:      {}", stats.age),
        format!("Points:   {}", stats.points),
        format!("Wins:     {}", stats.wins),
        format!("Position: P{}", stats.position),
        String::new(),
        format!("Profile: {}", driver.profile_url),
        format!("Image:   {image}"),
    ]
    .join("\n")
}

fn row_style(tier: PositionTier, selected: bool) -> Style {
    let mut style = match tier {
        PositionTier::Trophy => Style::default().fg(Color::Yellow),
        PositionTier::Silver => Style::default().fg(Color::Gray),
        PositionTier::Bronze => Style::default().fg(Color::Rgb(205, 127, 50)),
        PositionTier::Neutral => Style::default(),
    };
    if selected {
        style = style.bg(Color::DarkGray).add_modifier(Modifier::BOLD);
    }
    style
}

fn status_style(status: RaceStatus) -> Style {
    match status {
        RaceStatus::Today => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        RaceStatus::Upcoming => Style::default().fg(Color::LightRed),
        RaceStatus::Completed => Style::default().fg(Color::DarkGray),
    }
}

fn standings_columns() -> [Constraint; 7] {
    [
        Constraint::Length(3),
        Constraint::Length(5),
        Constraint::Length(22),
        Constraint::Length(6),
        Constraint::Min(20),
        Constraint::Length(6),
        Constraint::Length(8),
    ]
}

fn calendar_columns() -> [Constraint; 7] {
    [
        Constraint::Length(4),
        Constraint::Length(26),
        Constraint::Min(20),
        Constraint::Length(24),
        Constraint::Length(20),
        Constraint::Length(10),
        Constraint::Length(10),
    ]
}

fn render_header_row(frame: &mut Frame, area: Rect, widths: &[Constraint], labels: &[&str]) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(widths)
        .split(area);
    let style = Style::default().add_modifier(Modifier::BOLD);
    for (col, label) in cols.iter().zip(labels) {
        render_cell_text(frame, *col, label, style);
    }
}

fn render_cell_text(frame: &mut Frame, area: Rect, text: &str, style: Style) {
    let text_area = Rect {
        x: area.x,
        y: area.y + (area.height / 2),
        width: area.width,
        height: 1,
    };
    let paragraph = Paragraph::new(text).style(style);
    frame.render_widget(paragraph, text_area);
}

fn visible_range(selected: usize, total: usize, visible: usize) -> (usize, usize) {
    if total == 0 || visible == 0 {
        return (0, 0);
    }
    if total <= visible {
        return (0, total);
    }

    let mut start = selected.saturating_sub(visible / 2);
    if start + visible > total {
        start = total - visible;
    }
    (start, start + visible)
}

fn console_text(state: &AppState) -> String {
    if state.logs.is_empty() {
        return "No alerts yet".to_string();
    }
    state
        .logs
        .iter()
        .rev()
        .take(3)
        .cloned()
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 60, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "F1 Paddock - Help",
        "",
        "Screens:",
        "  1            Driver standings",
        "  2            Race calendar",
        "  3            Driver profiles",
        "  Tab          Next screen",
        "",
        "Lists:",
        "  j/k or ↑/↓   Move selection",
        "  r            Refresh current screen",
        "",
        "  ?            Toggle help",
        "  q            Quit",
    ]
    .join("\n");

    let help = Paragraph::new(text)
        .block(Block::default().title("Help").borders(Borders::ALL))
        .style(Style::default());
    frame.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}
