use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
    Frame,
};

use crate::{
    connection::{
        ClientKind, ConnectionSettings, RTorrentConnection, DEFAULT_CLIENT, SUPPORTED_CLIENTS,
    },
    messages,
};

pub const DEFAULT_QBITTORRENT_URL: &str = "http://localhost:8080";
pub const DEFAULT_TRANSMISSION_URL: &str = "http://localhost:9091/transmission/rpc";
pub const DEFAULT_RTORRENT_HOST: &str = "localhost";
pub const DEFAULT_RTORRENT_PORT: u16 = 5000;

/// One rendered form line: a label key, the current display value, and
/// whether the field holds focus.
pub struct FormRow {
    pub label_key: &'static str,
    pub value: String,
    pub focused: bool,
}

/// Capability every backend form variant provides. The selector only
/// ever talks to the mounted form through this trait.
pub trait SettingsForm {
    fn client_kind(&self) -> ClientKind;
    fn field_count(&self) -> usize;
    fn set_focus(&mut self, index: usize);
    fn handle_key(&mut self, key: KeyEvent);
    fn rows(&self) -> Vec<FormRow>;

    /// Reads current field values into this backend's settings variant.
    /// Always succeeds once mounted: blank fields take backend-defined
    /// defaults rather than producing a partial value.
    fn connection_settings(&self) -> ConnectionSettings;
}

fn mount_form(kind: ClientKind) -> Box<dyn SettingsForm> {
    match kind {
        ClientKind::QBittorrent => Box::new(QBittorrentForm::default()),
        ClientKind::RTorrent => Box::new(RTorrentForm::default()),
        ClientKind::Transmission => Box::new(TransmissionForm::default()),
    }
}

fn prefilled_form(settings: &ConnectionSettings) -> Box<dyn SettingsForm> {
    match settings {
        ConnectionSettings::QBittorrent {
            url,
            username,
            password,
        } => Box::new(QBittorrentForm {
            url: url.clone(),
            username: username.clone(),
            password: password.clone(),
            focus: 0,
        }),
        ConnectionSettings::RTorrent { connection } => Box::new(RTorrentForm::from_connection(connection)),
        ConnectionSettings::Transmission {
            url,
            username,
            password,
        } => Box::new(TransmissionForm {
            url: url.clone(),
            username: username.clone(),
            password: password.clone(),
            focus: 0,
        }),
    }
}

/// Owns "which backend is selected" and the mounted form variant.
/// Exactly one variant is mounted at a time; switching backends drops
/// the old variant wholesale, unsaved input included.
pub struct ConnectionSelector {
    selected: ClientKind,
    form: Option<Box<dyn SettingsForm>>,
    // 0 is the backend picker, 1.. are the mounted form's fields.
    focus: usize,
}

impl Default for ConnectionSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionSelector {
    pub fn new() -> Self {
        Self {
            selected: DEFAULT_CLIENT,
            form: None,
            focus: 0,
        }
    }

    /// Selector with the matching variant already mounted and seeded
    /// from an existing settings value.
    pub fn prefilled(settings: &ConnectionSettings) -> Self {
        Self {
            selected: settings.client_kind(),
            form: Some(prefilled_form(settings)),
            focus: 0,
        }
    }

    pub fn selected(&self) -> ClientKind {
        self.selected
    }

    pub fn mounted_kind(&self) -> Option<ClientKind> {
        self.form.as_ref().map(|form| form.client_kind())
    }

    pub fn pick_client(&mut self, kind: ClientKind) {
        self.selected = kind;
        self.form = Some(mount_form(kind));
        self.focus = 0;
    }

    fn pick_offset(&mut self, delta: isize) {
        let current = SUPPORTED_CLIENTS
            .iter()
            .position(|&kind| kind == self.selected)
            .unwrap_or(0) as isize;
        let len = SUPPORTED_CLIENTS.len() as isize;
        let next = (current + delta).rem_euclid(len) as usize;
        self.pick_client(SUPPORTED_CLIENTS[next]);
    }

    /// `None` until the first render has mounted a variant; callers
    /// treat that as "try again after render", not as a failure.
    pub fn connection_settings(&self) -> Option<ConnectionSettings> {
        self.form.as_ref().map(|form| form.connection_settings())
    }

    fn ensure_mounted(&mut self) {
        if self.form.is_none() {
            self.form = Some(mount_form(self.selected));
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        self.ensure_mounted();
        let field_count = self.form.as_ref().map_or(0, |form| form.field_count());
        let total = field_count + 1;
        match key.code {
            KeyCode::Tab | KeyCode::Down => {
                self.focus = (self.focus + 1) % total;
            }
            KeyCode::BackTab | KeyCode::Up => {
                self.focus = (self.focus + total - 1) % total;
            }
            KeyCode::Left if self.focus == 0 => self.pick_offset(-1),
            KeyCode::Right if self.focus == 0 => self.pick_offset(1),
            _ if self.focus > 0 => {
                let index = self.focus - 1;
                if let Some(form) = self.form.as_mut() {
                    form.set_focus(index);
                    form.handle_key(key);
                }
            }
            _ => {}
        }
    }

    pub fn render(&mut self, frame: &mut Frame, area: Rect) {
        self.ensure_mounted();
        let picker_focused = self.focus == 0;
        let mut lines = vec![picker_line(self.selected, picker_focused)];
        if let Some(form) = self.form.as_mut() {
            form.set_focus(self.focus.saturating_sub(1));
            for row in form.rows() {
                let focused = !picker_focused && row.focused;
                lines.push(field_line(row.label_key, &row.value, focused));
            }
        }
        let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false });
        frame.render_widget(paragraph, area);
    }
}

fn picker_line(selected: ClientKind, focused: bool) -> Line<'static> {
    let label = messages::lookup("connection.settings.client.select").to_string();
    let value = messages::lookup(selected.label_key()).to_string();
    let style = if focused {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    Line::from(vec![
        Span::raw(format!("{label}: ")),
        Span::styled(format!("◂ {value} ▸"), style),
    ])
}

fn field_line(label_key: &str, value: &str, focused: bool) -> Line<'static> {
    let label = messages::lookup(label_key).to_string();
    let style = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    Line::from(vec![
        Span::raw(format!("{label}: ")),
        Span::styled(value.to_string(), style),
    ])
}

fn edit_buffer(buffer: &mut String, key: KeyEvent) {
    match key.code {
        KeyCode::Backspace => {
            buffer.pop();
        }
        KeyCode::Char(c) => buffer.push(c),
        _ => {}
    }
}

fn default_if_blank(value: &str, default: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        default.to_string()
    } else {
        trimmed.to_string()
    }
}

fn mask(value: &str) -> String {
    "•".repeat(value.chars().count())
}

#[derive(Default)]
struct QBittorrentForm {
    url: String,
    username: String,
    password: String,
    focus: usize,
}

impl SettingsForm for QBittorrentForm {
    fn client_kind(&self) -> ClientKind {
        ClientKind::QBittorrent
    }

    fn field_count(&self) -> usize {
        3
    }

    fn set_focus(&mut self, index: usize) {
        self.focus = index.min(self.field_count() - 1);
    }

    fn handle_key(&mut self, key: KeyEvent) {
        let buffer = match self.focus {
            0 => &mut self.url,
            1 => &mut self.username,
            _ => &mut self.password,
        };
        edit_buffer(buffer, key);
    }

    fn rows(&self) -> Vec<FormRow> {
        vec![
            FormRow {
                label_key: "connection.settings.qbittorrent.url",
                value: self.url.clone(),
                focused: self.focus == 0,
            },
            FormRow {
                label_key: "connection.settings.qbittorrent.username",
                value: self.username.clone(),
                focused: self.focus == 1,
            },
            FormRow {
                label_key: "connection.settings.qbittorrent.password",
                value: mask(&self.password),
                focused: self.focus == 2,
            },
        ]
    }

    fn connection_settings(&self) -> ConnectionSettings {
        ConnectionSettings::QBittorrent {
            url: default_if_blank(&self.url, DEFAULT_QBITTORRENT_URL),
            username: self.username.clone(),
            password: self.password.clone(),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum RTorrentMode {
    Socket,
    Tcp,
}

struct RTorrentForm {
    mode: RTorrentMode,
    path: String,
    host: String,
    port: String,
    focus: usize,
}

impl Default for RTorrentForm {
    fn default() -> Self {
        Self {
            mode: RTorrentMode::Socket,
            path: String::new(),
            host: String::new(),
            port: String::new(),
            focus: 0,
        }
    }
}

impl RTorrentForm {
    fn from_connection(connection: &RTorrentConnection) -> Self {
        match connection {
            RTorrentConnection::Socket { path } => Self {
                mode: RTorrentMode::Socket,
                path: path.clone(),
                ..Self::default()
            },
            RTorrentConnection::Tcp { host, port } => Self {
                mode: RTorrentMode::Tcp,
                host: host.clone(),
                port: port.to_string(),
                ..Self::default()
            },
        }
    }

    fn mode_label(&self) -> &'static str {
        match self.mode {
            RTorrentMode::Socket => "connection.settings.rtorrent.type.socket",
            RTorrentMode::Tcp => "connection.settings.rtorrent.type.tcp",
        }
    }

    fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            RTorrentMode::Socket => RTorrentMode::Tcp,
            RTorrentMode::Tcp => RTorrentMode::Socket,
        };
    }
}

impl SettingsForm for RTorrentForm {
    fn client_kind(&self) -> ClientKind {
        ClientKind::RTorrent
    }

    fn field_count(&self) -> usize {
        match self.mode {
            RTorrentMode::Socket => 2,
            RTorrentMode::Tcp => 3,
        }
    }

    fn set_focus(&mut self, index: usize) {
        self.focus = index.min(self.field_count() - 1);
    }

    fn handle_key(&mut self, key: KeyEvent) {
        match (self.focus, self.mode) {
            (0, _) => {
                if matches!(
                    key.code,
                    KeyCode::Left | KeyCode::Right | KeyCode::Char(' ')
                ) {
                    self.toggle_mode();
                }
            }
            (1, RTorrentMode::Socket) => edit_buffer(&mut self.path, key),
            (1, RTorrentMode::Tcp) => edit_buffer(&mut self.host, key),
            (_, RTorrentMode::Tcp) => {
                // Port field only accepts digits.
                match key.code {
                    KeyCode::Backspace => {
                        self.port.pop();
                    }
                    KeyCode::Char(c) if c.is_ascii_digit() => self.port.push(c),
                    _ => {}
                }
            }
            _ => {}
        }
    }

    fn rows(&self) -> Vec<FormRow> {
        let mut rows = vec![FormRow {
            label_key: "connection.settings.rtorrent.type",
            value: messages::lookup(self.mode_label()).to_string(),
            focused: self.focus == 0,
        }];
        match self.mode {
            RTorrentMode::Socket => rows.push(FormRow {
                label_key: "connection.settings.rtorrent.socket",
                value: self.path.clone(),
                focused: self.focus == 1,
            }),
            RTorrentMode::Tcp => {
                rows.push(FormRow {
                    label_key: "connection.settings.rtorrent.host",
                    value: self.host.clone(),
                    focused: self.focus == 1,
                });
                rows.push(FormRow {
                    label_key: "connection.settings.rtorrent.port",
                    value: self.port.clone(),
                    focused: self.focus == 2,
                });
            }
        }
        rows
    }

    fn connection_settings(&self) -> ConnectionSettings {
        let connection = match self.mode {
            RTorrentMode::Socket => RTorrentConnection::Socket {
                path: self.path.trim().to_string(),
            },
            RTorrentMode::Tcp => RTorrentConnection::Tcp {
                host: default_if_blank(&self.host, DEFAULT_RTORRENT_HOST),
                port: self.port.trim().parse().unwrap_or(DEFAULT_RTORRENT_PORT),
            },
        };
        ConnectionSettings::RTorrent { connection }
    }
}

#[derive(Default)]
struct TransmissionForm {
    url: String,
    username: String,
    password: String,
    focus: usize,
}

impl SettingsForm for TransmissionForm {
    fn client_kind(&self) -> ClientKind {
        ClientKind::Transmission
    }

    fn field_count(&self) -> usize {
        3
    }

    fn set_focus(&mut self, index: usize) {
        self.focus = index.min(self.field_count() - 1);
    }

    fn handle_key(&mut self, key: KeyEvent) {
        let buffer = match self.focus {
            0 => &mut self.url,
            1 => &mut self.username,
            _ => &mut self.password,
        };
        edit_buffer(buffer, key);
    }

    fn rows(&self) -> Vec<FormRow> {
        vec![
            FormRow {
                label_key: "connection.settings.transmission.url",
                value: self.url.clone(),
                focused: self.focus == 0,
            },
            FormRow {
                label_key: "connection.settings.transmission.username",
                value: self.username.clone(),
                focused: self.focus == 1,
            },
            FormRow {
                label_key: "connection.settings.transmission.password",
                value: mask(&self.password),
                focused: self.focus == 2,
            },
        ]
    }

    fn connection_settings(&self) -> ConnectionSettings {
        ConnectionSettings::Transmission {
            url: default_if_blank(&self.url, DEFAULT_TRANSMISSION_URL),
            username: self.username.clone(),
            password: self.password.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(selector: &mut ConnectionSelector, text: &str) {
        for c in text.chars() {
            selector.handle_key(key(KeyCode::Char(c)));
        }
    }

    #[test]
    fn unmounted_selector_returns_none() {
        let selector = ConnectionSelector::new();
        assert_eq!(selector.connection_settings(), None);
        assert_eq!(selector.mounted_kind(), None);
    }

    #[test]
    fn default_selection_is_rtorrent() {
        let mut selector = ConnectionSelector::new();
        assert_eq!(selector.selected(), ClientKind::RTorrent);
        // Any interaction mounts the default variant.
        selector.handle_key(key(KeyCode::Tab));
        assert_eq!(selector.mounted_kind(), Some(ClientKind::RTorrent));
    }

    #[test]
    fn picked_backend_mounts_matching_variant() {
        for kind in SUPPORTED_CLIENTS {
            let mut selector = ConnectionSelector::new();
            selector.pick_client(kind);
            assert_eq!(selector.mounted_kind(), Some(kind));
            let settings = selector.connection_settings().unwrap();
            assert_eq!(settings.client_kind(), kind);
        }
    }

    #[test]
    fn switching_backends_discards_edits() {
        let mut selector = ConnectionSelector::new();
        selector.pick_client(ClientKind::RTorrent);
        // Move to the socket-path field and type into it.
        selector.handle_key(key(KeyCode::Tab));
        selector.handle_key(key(KeyCode::Tab));
        type_text(&mut selector, "/tmp/rtorrent.sock");
        assert_eq!(
            selector.connection_settings(),
            Some(ConnectionSettings::RTorrent {
                connection: RTorrentConnection::Socket {
                    path: "/tmp/rtorrent.sock".to_string(),
                },
            })
        );

        selector.pick_client(ClientKind::QBittorrent);
        selector.pick_client(ClientKind::RTorrent);
        assert_eq!(
            selector.connection_settings(),
            Some(ConnectionSettings::RTorrent {
                connection: RTorrentConnection::Socket {
                    path: String::new(),
                },
            })
        );
    }

    #[test]
    fn picker_cycles_through_supported_clients_in_order() {
        let mut selector = ConnectionSelector::new();
        selector.handle_key(key(KeyCode::Right));
        assert_eq!(selector.selected(), ClientKind::Transmission);
        selector.handle_key(key(KeyCode::Right));
        assert_eq!(selector.selected(), ClientKind::QBittorrent);
        selector.handle_key(key(KeyCode::Left));
        assert_eq!(selector.selected(), ClientKind::Transmission);
    }

    #[test]
    fn blank_fields_take_backend_defaults() {
        let mut selector = ConnectionSelector::new();
        selector.pick_client(ClientKind::QBittorrent);
        assert_eq!(
            selector.connection_settings(),
            Some(ConnectionSettings::QBittorrent {
                url: DEFAULT_QBITTORRENT_URL.to_string(),
                username: String::new(),
                password: String::new(),
            })
        );

        selector.pick_client(ClientKind::RTorrent);
        // Toggle to TCP and leave host and port blank.
        selector.handle_key(key(KeyCode::Tab));
        selector.handle_key(key(KeyCode::Char(' ')));
        assert_eq!(
            selector.connection_settings(),
            Some(ConnectionSettings::RTorrent {
                connection: RTorrentConnection::Tcp {
                    host: DEFAULT_RTORRENT_HOST.to_string(),
                    port: DEFAULT_RTORRENT_PORT,
                },
            })
        );
    }

    #[test]
    fn prefilled_extraction_round_trips() {
        let values = [
            ConnectionSettings::QBittorrent {
                url: "https://example.com:8080".to_string(),
                username: "admin".to_string(),
                password: "adminadmin".to_string(),
            },
            ConnectionSettings::RTorrent {
                connection: RTorrentConnection::Socket {
                    path: "/var/run/rtorrent.sock".to_string(),
                },
            },
            ConnectionSettings::RTorrent {
                connection: RTorrentConnection::Tcp {
                    host: "seedbox.local".to_string(),
                    port: 5050,
                },
            },
            ConnectionSettings::Transmission {
                url: "http://seedbox.local:9091/transmission/rpc".to_string(),
                username: "transmission".to_string(),
                password: "transmission".to_string(),
            },
        ];
        for value in values {
            let selector = ConnectionSelector::prefilled(&value);
            assert_eq!(selector.selected(), value.client_kind());
            assert_eq!(selector.connection_settings(), Some(value));
        }
    }
}
