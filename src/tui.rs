use std::{
    io::{self, Stdout},
    path::PathBuf,
    thread,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use crossterm::{
    event::{
        self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame, Terminal,
};

use crate::{
    api::{ApiResult, ManagerClient},
    config::AppConfig,
    connection::ConnectionSettings,
    creation::{TorrentCreationForm, TorrentCreationRequest},
    preferences::{self, AddTorrentsPreferences},
    settings_form::ConnectionSelector,
};

type Backend = ratatui::backend::CrosstermBackend<Stdout>;

pub fn run(config: AppConfig) -> Result<()> {
    let client =
        ManagerClient::new(config.api.clone()).context("failed to construct manager API client")?;
    let mut terminal = setup_terminal()?;
    let (event_tx, event_rx) = unbounded();
    let (api_tx, api_rx) = unbounded();

    let input_handle = spawn_input_thread(event_tx.clone());
    let worker_handle = spawn_api_worker(client, api_rx, event_tx.clone());

    let mut app = App::new(&config);

    let loop_result = run_loop(&mut terminal, &mut app, event_rx, api_tx.clone());

    drop(api_tx);
    drop(event_tx);

    restore_terminal(&mut terminal)?;
    input_handle.join().ok();
    worker_handle.join().ok();

    loop_result
}

fn run_loop(
    terminal: &mut Terminal<Backend>,
    app: &mut App,
    events: Receiver<AppEvent>,
    api_tx: Sender<ApiCommand>,
) -> Result<()> {
    terminal.draw(|f| app.render(f))?;
    loop {
        let event = match events.recv() {
            Ok(event) => event,
            Err(_) => break,
        };
        if app.process_event(event, &api_tx)? {
            break;
        }
        terminal.draw(|f| app.render(f))?;
        if app.should_quit {
            break;
        }
    }
    Ok(())
}

fn setup_terminal() -> Result<Terminal<Backend>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    Ok(Terminal::new(backend)?)
}

fn restore_terminal(terminal: &mut Terminal<Backend>) -> Result<()> {
    disable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, DisableBracketedPaste, LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn spawn_input_thread(tx: Sender<AppEvent>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let tick_rate = Duration::from_millis(250);
        loop {
            match event::poll(tick_rate) {
                Ok(true) => match event::read() {
                    Ok(evt) => {
                        if tx.send(AppEvent::Input(evt)).is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        let _ = tx.send(AppEvent::Status(StatusUpdate::error(format!(
                            "Input error: {err}"
                        ))));
                    }
                },
                Ok(false) | Err(_) => {
                    if tx.send(AppEvent::Tick).is_err() {
                        break;
                    }
                }
            }
        }
    })
}

fn spawn_api_worker(
    client: ManagerClient,
    rx: Receiver<ApiCommand>,
    tx: Sender<AppEvent>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        while let Ok(cmd) = rx.recv() {
            handle_command(&client, cmd, &tx);
        }
    })
}

fn handle_command(client: &ManagerClient, cmd: ApiCommand, tx: &Sender<AppEvent>) {
    match cmd {
        ApiCommand::CreateTorrent(request) => {
            let result = client.create_torrent(&request);
            let _ = tx.send(AppEvent::TorrentCreated(result));
        }
        ApiCommand::TestConnection(settings) => {
            let result = client.test_connection(&settings);
            let _ = tx.send(AppEvent::ConnectionTested { settings, result });
        }
    }
}

enum AppEvent {
    Input(Event),
    Tick,
    TorrentCreated(ApiResult<()>),
    ConnectionTested {
        settings: ConnectionSettings,
        result: ApiResult<bool>,
    },
    Status(StatusUpdate),
}

enum ApiCommand {
    CreateTorrent(TorrentCreationRequest),
    TestConnection(ConnectionSettings),
}

#[derive(Clone)]
struct StatusUpdate {
    text: String,
    level: StatusLevel,
}

impl StatusUpdate {
    fn info(message: impl Into<String>) -> Self {
        Self {
            text: message.into(),
            level: StatusLevel::Info,
        }
    }

    fn success(message: impl Into<String>) -> Self {
        Self {
            text: message.into(),
            level: StatusLevel::Success,
        }
    }

    fn warning(message: impl Into<String>) -> Self {
        Self {
            text: message.into(),
            level: StatusLevel::Warning,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            text: message.into(),
            level: StatusLevel::Error,
        }
    }
}

#[derive(Clone, Copy)]
enum StatusLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Clone)]
struct StatusMessage {
    text: String,
    level: StatusLevel,
    expires_at: Option<Instant>,
}

impl StatusMessage {
    fn from_update(update: StatusUpdate) -> Self {
        let duration = match update.level {
            StatusLevel::Info => Duration::from_secs(4),
            StatusLevel::Success => Duration::from_secs(5),
            StatusLevel::Warning => Duration::from_secs(6),
            StatusLevel::Error => Duration::from_secs(8),
        };
        Self {
            text: update.text,
            level: update.level,
            expires_at: Some(Instant::now() + duration),
        }
    }
}

enum Mode {
    Normal,
    Help,
    CreateTorrent(TorrentCreationForm),
    ConnectionSettings(ConnectionSelector),
}

struct App {
    connection_label: String,
    preferences: AddTorrentsPreferences,
    preferences_path: Option<PathBuf>,
    // Last settings the daemon verified, used to seed the wizard when
    // it is reopened.
    verified_settings: Option<ConnectionSettings>,
    status: Option<StatusMessage>,
    toast: Option<StatusMessage>,
    mode: Mode,
    should_quit: bool,
}

impl App {
    fn new(config: &AppConfig) -> Self {
        let preferences_path = config.preferences_path.clone();
        let preferences = preferences_path
            .as_deref()
            .map(preferences::load)
            .unwrap_or_default();
        Self {
            connection_label: config.api.base_url.clone(),
            preferences,
            preferences_path,
            verified_settings: None,
            status: None,
            toast: None,
            mode: Mode::Normal,
            should_quit: false,
        }
    }

    fn render(&mut self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(frame.size());
        self.render_header(frame, chunks[0]);
        self.render_body(frame, chunks[1]);
        self.render_footer(frame, chunks[2]);
        self.render_toast(frame);
        match &mut self.mode {
            Mode::CreateTorrent(form) => {
                let area = centered_rect(70, 60, frame.size());
                let block = Block::default()
                    .title(Span::raw(" Create torrent "))
                    .borders(Borders::ALL);
                let inner = block.inner(area);
                frame.render_widget(Clear, area);
                frame.render_widget(block, area);
                form.render(frame, inner);
            }
            Mode::ConnectionSettings(selector) => {
                let area = centered_rect(60, 40, frame.size());
                let block = Block::default()
                    .title(Span::raw(" Connection settings "))
                    .borders(Borders::ALL);
                let inner = block.inner(area);
                frame.render_widget(Clear, area);
                frame.render_widget(block, area);
                selector.render(frame, inner);
            }
            Mode::Help => {
                let area = centered_rect(70, 70, frame.size());
                let block = Block::default().title("Key Bindings").borders(Borders::ALL);
                let paragraph = Paragraph::new(help_lines())
                    .block(block)
                    .wrap(Wrap { trim: false });
                frame.render_widget(Clear, area);
                frame.render_widget(paragraph, area);
            }
            Mode::Normal => {}
        }
    }

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let mut lines = vec![Line::from(vec![
            Span::styled("Seedbox", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("  |  "),
            Span::raw(&self.connection_label),
        ])];
        if let Some(status) = &self.status {
            lines.push(Line::from(Span::styled(
                status.text.clone(),
                status_style(status.level),
            )));
        }
        let paragraph = Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .title(Span::raw(" Manager ")),
        );
        frame.render_widget(paragraph, area);
    }

    fn render_body(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(Span::raw(" Actions "));
        let mut lines = vec![
            Line::from("c: create a torrent"),
            Line::from("s: configure the download-engine connection"),
        ];
        if !self.preferences.destination.is_empty() {
            lines.push(Line::from(format!(
                "Last destination: {}",
                self.preferences.destination
            )));
        }
        let paragraph = Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: false });
        frame.render_widget(paragraph, area);
    }

    fn render_footer(&self, frame: &mut Frame, area: Rect) {
        let mode_label = match &self.mode {
            Mode::Normal => "NORMAL",
            Mode::Help => "HELP",
            Mode::CreateTorrent(form) if form.is_creating() => "SUBMITTING",
            Mode::CreateTorrent(_) => "CREATE",
            Mode::ConnectionSettings(_) => "SETTINGS",
        };
        let sections = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(0), Constraint::Length(14)])
            .split(area);
        let left = Paragraph::new(Line::from(format!("Mode {mode_label}")));
        frame.render_widget(left, sections[0]);
        let help_label =
            Paragraph::new(Line::from(Span::raw("Help [?]"))).alignment(Alignment::Right);
        frame.render_widget(help_label, sections[1]);
    }

    fn render_toast(&self, frame: &mut Frame) {
        let Some(toast) = &self.toast else {
            return;
        };
        let frame_area = frame.size();
        if frame_area.width < 20 || frame_area.height < 5 {
            return;
        }
        let padding = 2;
        let max_width = frame_area.width.saturating_sub(padding * 2);
        let width = max_width.clamp(20, 60);
        let height = 3;
        let x = frame_area
            .x
            .saturating_add(frame_area.width.saturating_sub(width + padding));
        let y = frame_area
            .y
            .saturating_add(frame_area.height.saturating_sub(height + padding));
        let area = Rect::new(x, y, width, height);
        let text = Line::from(Span::styled(toast.text.clone(), status_style(toast.level)));
        let paragraph = Paragraph::new(text).alignment(Alignment::Center).block(
            Block::default()
                .borders(Borders::ALL)
                .title(Span::raw(" Notice ")),
        );
        frame.render_widget(Clear, area);
        frame.render_widget(paragraph, area);
    }

    fn process_event(&mut self, event: AppEvent, api_tx: &Sender<ApiCommand>) -> Result<bool> {
        match event {
            AppEvent::Input(event) => self.handle_input(event, api_tx),
            AppEvent::Tick => {
                self.expire_status();
                Ok(false)
            }
            AppEvent::TorrentCreated(result) => {
                self.handle_torrent_created(result);
                Ok(false)
            }
            AppEvent::ConnectionTested { settings, result } => {
                self.handle_connection_tested(settings, result);
                Ok(false)
            }
            AppEvent::Status(update) => {
                self.set_status(update);
                Ok(false)
            }
        }
    }

    fn handle_input(&mut self, event: Event, api_tx: &Sender<ApiCommand>) -> Result<bool> {
        let Event::Key(key) = event else {
            return Ok(false);
        };
        if key.kind != KeyEventKind::Press {
            return Ok(false);
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return Ok(true);
        }
        match &mut self.mode {
            Mode::Normal => self.handle_normal_key(key),
            Mode::Help => {
                if matches!(
                    key.code,
                    KeyCode::Char('?') | KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q')
                ) {
                    self.mode = Mode::Normal;
                }
                Ok(false)
            }
            Mode::CreateTorrent(_) => self.handle_create_key(key, api_tx),
            Mode::ConnectionSettings(_) => self.handle_settings_key(key, api_tx),
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> Result<bool> {
        match key.code {
            KeyCode::Char('q') => {
                self.should_quit = true;
                Ok(true)
            }
            KeyCode::Char('c') => {
                self.mode = Mode::CreateTorrent(TorrentCreationForm::prefilled(&self.preferences));
                Ok(false)
            }
            KeyCode::Char('s') => {
                let selector = match &self.verified_settings {
                    Some(settings) => ConnectionSelector::prefilled(settings),
                    None => ConnectionSelector::new(),
                };
                self.mode = Mode::ConnectionSettings(selector);
                Ok(false)
            }
            KeyCode::Char('?') => {
                self.mode = Mode::Help;
                Ok(false)
            }
            _ => Ok(false),
        }
    }

    fn handle_create_key(&mut self, key: KeyEvent, api_tx: &Sender<ApiCommand>) -> Result<bool> {
        let Mode::CreateTorrent(form) = &mut self.mode else {
            return Ok(false);
        };
        match key.code {
            KeyCode::Esc => {
                self.mode = Mode::Normal;
                Ok(false)
            }
            KeyCode::Char('t') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                form.add_tracker_row();
                Ok(false)
            }
            KeyCode::Enter => {
                let data = form.form_data();
                match form.submit() {
                    Some(request) => {
                        self.set_status(StatusUpdate::info("Creating torrent…"));
                        if api_tx
                            .send(ApiCommand::CreateTorrent(request.clone()))
                            .is_err()
                        {
                            if let Mode::CreateTorrent(form) = &mut self.mode {
                                form.reset_creating();
                            }
                            self.set_status(StatusUpdate::error(
                                "Failed to queue torrent creation",
                            ));
                            return Ok(false);
                        }
                        // Saved right after dispatch, not gated on the
                        // creation action's outcome.
                        self.preferences = AddTorrentsPreferences {
                            start: data.start.unwrap_or(false),
                            destination: request.source_path.clone(),
                            tab: "by-creation".to_string(),
                        };
                        if let Some(path) = &self.preferences_path {
                            preferences::save(path, &self.preferences);
                        }
                    }
                    None => {
                        let message = form.validation_error().map(str::to_string);
                        if let Some(message) = message {
                            self.set_status(StatusUpdate::warning(message));
                        }
                    }
                }
                Ok(false)
            }
            _ => {
                form.handle_key(key);
                Ok(false)
            }
        }
    }

    fn handle_settings_key(&mut self, key: KeyEvent, api_tx: &Sender<ApiCommand>) -> Result<bool> {
        let Mode::ConnectionSettings(selector) = &mut self.mode else {
            return Ok(false);
        };
        match key.code {
            KeyCode::Esc => {
                self.mode = Mode::Normal;
                Ok(false)
            }
            KeyCode::Enter => {
                match selector.connection_settings() {
                    // Not mounted yet; try again once a render has run.
                    None => self.set_status(StatusUpdate::info("Settings not ready yet")),
                    Some(settings) => {
                        self.set_status(StatusUpdate::info("Testing connection…"));
                        if api_tx.send(ApiCommand::TestConnection(settings)).is_err() {
                            self.set_status(StatusUpdate::error(
                                "Failed to queue connection test",
                            ));
                        }
                    }
                }
                Ok(false)
            }
            _ => {
                selector.handle_key(key);
                Ok(false)
            }
        }
    }

    fn handle_torrent_created(&mut self, result: ApiResult<()>) {
        match result {
            Ok(()) => {
                if matches!(self.mode, Mode::CreateTorrent(_)) {
                    self.mode = Mode::Normal;
                }
                self.set_status(StatusUpdate::success("Torrent created"));
            }
            Err(err) => {
                if let Mode::CreateTorrent(form) = &mut self.mode {
                    form.reset_creating();
                }
                self.set_status(StatusUpdate::error(format!("Creation failed: {err}")));
            }
        }
    }

    fn handle_connection_tested(&mut self, settings: ConnectionSettings, result: ApiResult<bool>) {
        match result {
            Ok(true) => {
                self.verified_settings = Some(settings);
                if matches!(self.mode, Mode::ConnectionSettings(_)) {
                    self.mode = Mode::Normal;
                }
                self.set_status(StatusUpdate::success("Backend connection verified"));
            }
            Ok(false) => {
                self.set_status(StatusUpdate::warning("Backend did not respond"));
            }
            Err(err) => {
                self.set_status(StatusUpdate::error(format!("Connection test failed: {err}")));
            }
        }
    }

    fn expire_status(&mut self) {
        if let Some(status) = &self.status {
            if let Some(expiry) = status.expires_at {
                if Instant::now() >= expiry {
                    self.status = None;
                }
            }
        }
        if let Some(toast) = &self.toast {
            if let Some(expiry) = toast.expires_at {
                if Instant::now() >= expiry {
                    self.toast = None;
                }
            }
        }
    }

    fn set_status(&mut self, update: StatusUpdate) {
        let message = StatusMessage::from_update(update.clone());
        if matches!(update.level, StatusLevel::Warning | StatusLevel::Error) {
            self.toast = Some(message.clone());
        }
        self.status = Some(message);
    }
}

fn status_style(level: StatusLevel) -> Style {
    match level {
        StatusLevel::Info => Style::default().fg(Color::Blue),
        StatusLevel::Success => Style::default().fg(Color::Green),
        StatusLevel::Warning => Style::default().fg(Color::Yellow),
        StatusLevel::Error => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    let vertical = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1]);
    vertical[1]
}

fn help_lines() -> Vec<Line<'static>> {
    let heading = |text: &'static str| {
        Line::from(Span::styled(
            text,
            Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        ))
    };
    vec![
        heading("Actions"),
        Line::from("  c: create a torrent"),
        Line::from("  s: configure the engine connection"),
        Line::from("  ?: toggle this help"),
        Line::from("  q or Ctrl+c: quit"),
        Line::from(""),
        heading("Forms"),
        Line::from("  Tab / Shift+Tab: move between fields"),
        Line::from("  Left / Right: change the selected backend"),
        Line::from("  Space: toggle a checkbox or the rTorrent transport"),
        Line::from("  Ctrl+t: add a tracker row"),
        Line::from("  Enter: submit, Esc: close"),
    ]
}
