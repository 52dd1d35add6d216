use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
    Frame,
};
use serde::Serialize;

use crate::{messages, preferences::AddTorrentsPreferences};

/// Payload for the daemon's torrent-creation endpoint. Built once per
/// submit; optional fields the user never touched are omitted from the
/// wire body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TorrentCreationRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub source_path: String,
    pub trackers: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info_source: Option<String>,
    pub is_private: bool,
    pub start: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// Snapshot of the form's fields. `None` means the user never touched
/// the field, which is distinct from "present but empty".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreationFormData {
    pub name: Option<String>,
    pub source_path: Option<String>,
    pub trackers: Vec<String>,
    pub comment: Option<String>,
    pub info_source: Option<String>,
    pub is_private: Option<bool>,
    pub start: Option<bool>,
    pub tags: Option<String>,
}

impl CreationFormData {
    /// Converts the partial snapshot into a request, applying the
    /// stated default for every optional field in one place. `None`
    /// when the required source path is absent.
    pub fn into_request(self) -> Option<TorrentCreationRequest> {
        let source_path = self.source_path?;
        Some(TorrentCreationRequest {
            name: self.name,
            source_path,
            trackers: self
                .trackers
                .into_iter()
                .map(|tracker| tracker.trim().to_string())
                .filter(|tracker| !tracker.is_empty())
                .collect(),
            comment: self.comment,
            info_source: self.info_source,
            is_private: self.is_private.unwrap_or(false),
            start: self.start.unwrap_or(false),
            tags: self
                .tags
                .map(|tags| tags.split(',').map(|tag| tag.trim().to_string()).collect()),
        })
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Field {
    SourcePath,
    Tracker(usize),
    Name,
    Comment,
    InfoSource,
    IsPrivate,
    Start,
    Tags,
}

/// Collects torrent-creation fields and produces the submit payload.
pub struct TorrentCreationForm {
    name: Option<String>,
    source_path: Option<String>,
    trackers: Vec<Option<String>>,
    comment: Option<String>,
    info_source: Option<String>,
    is_private: Option<bool>,
    start: Option<bool>,
    tags: Option<String>,
    focus: usize,
    is_creating: bool,
    validation_error: Option<String>,
}

impl Default for TorrentCreationForm {
    fn default() -> Self {
        Self::new()
    }
}

impl TorrentCreationForm {
    pub fn new() -> Self {
        Self {
            name: None,
            source_path: None,
            trackers: vec![None],
            comment: None,
            info_source: None,
            is_private: None,
            start: None,
            tags: None,
            focus: 0,
            is_creating: false,
            validation_error: None,
        }
    }

    /// Seeds the source path and start flag from the persisted
    /// add-torrents preferences.
    pub fn prefilled(preferences: &AddTorrentsPreferences) -> Self {
        let mut form = Self::new();
        if !preferences.destination.is_empty() {
            form.source_path = Some(preferences.destination.clone());
        }
        if preferences.start {
            form.start = Some(true);
        }
        form
    }

    pub fn is_creating(&self) -> bool {
        self.is_creating
    }

    pub fn reset_creating(&mut self) {
        self.is_creating = false;
    }

    pub fn validation_error(&self) -> Option<&str> {
        self.validation_error.as_deref()
    }

    fn fields(&self) -> Vec<Field> {
        let mut fields = vec![Field::SourcePath];
        for index in 0..self.trackers.len() {
            fields.push(Field::Tracker(index));
        }
        fields.extend([
            Field::Name,
            Field::Comment,
            Field::InfoSource,
            Field::IsPrivate,
            Field::Start,
            Field::Tags,
        ]);
        fields
    }

    fn focused_field(&self) -> Field {
        let fields = self.fields();
        fields[self.focus.min(fields.len() - 1)]
    }

    pub fn add_tracker_row(&mut self) {
        self.trackers.push(None);
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        let total = self.fields().len();
        match key.code {
            KeyCode::Tab | KeyCode::Down => {
                self.focus = (self.focus + 1) % total;
                return;
            }
            KeyCode::BackTab | KeyCode::Up => {
                self.focus = (self.focus + total - 1) % total;
                return;
            }
            _ => {}
        }
        match self.focused_field() {
            Field::SourcePath => edit_optional(&mut self.source_path, key),
            Field::Tracker(index) => {
                if let Some(tracker) = self.trackers.get_mut(index) {
                    edit_optional(tracker, key);
                }
            }
            Field::Name => edit_optional(&mut self.name, key),
            Field::Comment => edit_optional(&mut self.comment, key),
            Field::InfoSource => edit_optional(&mut self.info_source, key),
            Field::IsPrivate => toggle_optional(&mut self.is_private, key),
            Field::Start => toggle_optional(&mut self.start, key),
            Field::Tags => edit_optional(&mut self.tags, key),
        }
    }

    /// Snapshot of everything the user has touched.
    pub fn form_data(&self) -> CreationFormData {
        CreationFormData {
            name: self.name.clone(),
            source_path: self.source_path.clone(),
            trackers: self.trackers.iter().flatten().cloned().collect(),
            comment: self.comment.clone(),
            info_source: self.info_source.clone(),
            is_private: self.is_private,
            start: self.start,
            tags: self.tags.clone(),
        }
    }

    /// Submit-click handler. Sets the in-progress guard immediately so
    /// a second click cannot double-dispatch. When the source path is
    /// missing, the guard is reset and a validation message surfaces
    /// instead of leaving the form wedged in a submitting state.
    pub fn submit(&mut self) -> Option<TorrentCreationRequest> {
        if self.is_creating {
            return None;
        }
        self.is_creating = true;
        match self.form_data().into_request() {
            Some(request) => {
                self.validation_error = None;
                Some(request)
            }
            None => {
                self.is_creating = false;
                self.validation_error =
                    Some(messages::lookup("torrents.create.source.path.missing").to_string());
                None
            }
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let mut lines = Vec::new();
        let fields = self.fields();
        for (index, field) in fields.iter().enumerate() {
            let focused = index == self.focus;
            lines.push(match field {
                Field::SourcePath => text_line(
                    "torrents.create.source.path.label",
                    self.source_path.as_deref(),
                    focused,
                ),
                Field::Tracker(i) => text_line(
                    "torrents.create.trackers.label",
                    self.trackers.get(*i).and_then(Option::as_deref),
                    focused,
                ),
                Field::Name => {
                    text_line("torrents.create.base.name.label", self.name.as_deref(), focused)
                }
                Field::Comment => text_line(
                    "torrents.create.comment.label",
                    self.comment.as_deref(),
                    focused,
                ),
                Field::InfoSource => text_line(
                    "torrents.create.info.source.label",
                    self.info_source.as_deref(),
                    focused,
                ),
                Field::IsPrivate => checkbox_line(
                    "torrents.create.is.private.label",
                    self.is_private.unwrap_or(false),
                    focused,
                ),
                Field::Start => checkbox_line(
                    "torrents.create.start.label",
                    self.start.unwrap_or(false),
                    focused,
                ),
                Field::Tags => text_line("torrents.add.tags", self.tags.as_deref(), focused),
            });
        }
        if let Some(error) = &self.validation_error {
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            )));
        }
        if self.is_creating {
            lines.push(Line::from(Span::styled(
                "Creating…",
                Style::default().fg(Color::Blue),
            )));
        }
        let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false });
        frame.render_widget(paragraph, area);
    }
}

fn edit_optional(field: &mut Option<String>, key: KeyEvent) {
    match key.code {
        KeyCode::Backspace => {
            if let Some(buffer) = field.as_mut() {
                buffer.pop();
            }
        }
        KeyCode::Char(c) => field.get_or_insert_with(String::new).push(c),
        _ => {}
    }
}

fn toggle_optional(field: &mut Option<bool>, key: KeyEvent) {
    if matches!(key.code, KeyCode::Char(' ')) {
        let current = field.unwrap_or(false);
        *field = Some(!current);
    }
}

fn text_line(label_key: &str, value: Option<&str>, focused: bool) -> Line<'static> {
    let label = messages::lookup(label_key).to_string();
    let style = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    Line::from(vec![
        Span::raw(format!("{label}: ")),
        Span::styled(value.unwrap_or("").to_string(), style),
    ])
}

fn checkbox_line(label_key: &str, checked: bool, focused: bool) -> Line<'static> {
    let label = messages::lookup(label_key).to_string();
    let marker = if checked { "[x]" } else { "[ ]" };
    let style = if focused {
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    Line::from(Span::styled(format!("{marker} {label}"), style))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(form: &mut TorrentCreationForm, text: &str) {
        for c in text.chars() {
            form.handle_key(key(KeyCode::Char(c)));
        }
    }

    #[test]
    fn untouched_fields_are_absent_from_form_data() {
        let form = TorrentCreationForm::new();
        let data = form.form_data();
        assert_eq!(data, CreationFormData::default());
    }

    #[test]
    fn submit_applies_defaults_and_splits_tags() {
        let mut form = TorrentCreationForm::new();
        // Field order: source path, tracker, name, comment, info
        // source, private, start, tags.
        type_text(&mut form, "/downloads/foo");
        form.handle_key(key(KeyCode::Tab));
        type_text(&mut form, "udp://tracker:80");
        for _ in 0..6 {
            form.handle_key(key(KeyCode::Tab));
        }
        type_text(&mut form, "movies,2024");

        let request = form.submit().expect("request should dispatch");
        assert_eq!(request.source_path, "/downloads/foo");
        assert_eq!(request.trackers, vec!["udp://tracker:80".to_string()]);
        assert_eq!(
            request.tags,
            Some(vec!["movies".to_string(), "2024".to_string()])
        );
        assert!(!request.is_private);
        assert!(!request.start);
        assert_eq!(request.name, None);
        assert_eq!(request.comment, None);
        assert!(form.is_creating());
    }

    #[test]
    fn missing_source_path_resets_guard_and_surfaces_error() {
        let mut form = TorrentCreationForm::new();
        form.handle_key(key(KeyCode::Tab));
        type_text(&mut form, "udp://tracker:80");

        assert_eq!(form.submit(), None);
        assert!(!form.is_creating());
        assert!(form.validation_error().is_some());
    }

    #[test]
    fn second_submit_is_ignored_while_creating() {
        let mut form = TorrentCreationForm::new();
        type_text(&mut form, "/downloads/foo");
        assert!(form.submit().is_some());
        assert_eq!(form.submit(), None);
        assert!(form.is_creating());
    }

    #[test]
    fn blank_tracker_rows_are_dropped() {
        let mut form = TorrentCreationForm::new();
        type_text(&mut form, "/downloads/foo");
        form.add_tracker_row();
        form.add_tracker_row();
        let request = form.submit().unwrap();
        assert!(request.trackers.is_empty());
    }

    #[test]
    fn checkbox_toggles_through_space() {
        let mut form = TorrentCreationForm::new();
        type_text(&mut form, "/downloads/foo");
        // Source path, tracker, name, comment, info source → private.
        for _ in 0..5 {
            form.handle_key(key(KeyCode::Tab));
        }
        form.handle_key(key(KeyCode::Char(' ')));
        let request = form.submit().unwrap();
        assert!(request.is_private);
        assert!(!request.start);
    }

    #[test]
    fn request_serializes_camel_case_and_omits_untouched() {
        let request = TorrentCreationRequest {
            name: None,
            source_path: "/downloads/foo".to_string(),
            trackers: vec!["udp://tracker:80".to_string()],
            comment: None,
            info_source: None,
            is_private: false,
            start: true,
            tags: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "sourcePath": "/downloads/foo",
                "trackers": ["udp://tracker:80"],
                "isPrivate": false,
                "start": true,
            })
        );
    }

    #[test]
    fn prefill_seeds_destination_and_start() {
        let preferences = AddTorrentsPreferences {
            start: true,
            destination: "/downloads".to_string(),
            tab: "by-creation".to_string(),
        };
        let form = TorrentCreationForm::prefilled(&preferences);
        let data = form.form_data();
        assert_eq!(data.source_path.as_deref(), Some("/downloads"));
        assert_eq!(data.start, Some(true));
        assert_eq!(data.name, None);
    }
}
