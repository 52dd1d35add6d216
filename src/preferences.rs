use std::{
    fs,
    path::{Path, PathBuf},
};

use log::warn;
use serde::{Deserialize, Serialize};

/// Prefill preferences captured when the user submits the add-torrents
/// flow: which tab they used, where the content lives, and whether the
/// torrent should start immediately.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddTorrentsPreferences {
    #[serde(default)]
    pub start: bool,
    #[serde(default)]
    pub destination: String,
    #[serde(default)]
    pub tab: String,
}

pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("seedbox-tui").join("preferences.toml"))
}

/// Missing or unreadable files yield the defaults; preferences are a
/// convenience, never a hard requirement.
pub fn load(path: &Path) -> AddTorrentsPreferences {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(_) => return AddTorrentsPreferences::default(),
    };
    match toml::from_str(&contents) {
        Ok(preferences) => preferences,
        Err(err) => {
            warn!("ignoring malformed preferences at {}: {err}", path.display());
            AddTorrentsPreferences::default()
        }
    }
}

/// Fire-and-forget write; failures are logged and swallowed.
pub fn save(path: &Path, preferences: &AddTorrentsPreferences) {
    let serialized = match toml::to_string_pretty(preferences) {
        Ok(serialized) => serialized,
        Err(err) => {
            warn!("failed to serialize preferences: {err}");
            return;
        }
    };
    if let Some(parent) = path.parent() {
        if let Err(err) = fs::create_dir_all(parent) {
            warn!("failed to create {}: {err}", parent.display());
            return;
        }
    }
    if let Err(err) = fs::write(path, serialized) {
        warn!("failed to write preferences to {}: {err}", path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences.toml");
        assert_eq!(load(&path), AddTorrentsPreferences::default());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("preferences.toml");
        let preferences = AddTorrentsPreferences {
            start: true,
            destination: "/downloads/foo".to_string(),
            tab: "by-creation".to_string(),
        };
        save(&path, &preferences);
        assert_eq!(load(&path), preferences);
    }

    #[test]
    fn malformed_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences.toml");
        fs::write(&path, "start = \"definitely\"").unwrap();
        assert_eq!(load(&path), AddTorrentsPreferences::default());
    }
}
