//! Process-wide display preferences, loaded once and written through on change.

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::RwLock,
};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::PreferenceError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub dark_mode: bool,
}

pub trait PreferenceStore: Send + Sync {
    fn load(&self) -> Result<Option<Preferences>, PreferenceError>;
    fn save(&self, preferences: &Preferences) -> Result<(), PreferenceError>;
}

pub struct FilePreferenceStore {
    path: PathBuf,
}

impl FilePreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn load(&self) -> Result<Option<Preferences>, PreferenceError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(PreferenceError::Read {
                    path: self.path.display().to_string(),
                    source,
                })
            }
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn save(&self, preferences: &Preferences) -> Result<(), PreferenceError> {
        let write_err = |source| PreferenceError::Write {
            path: self.path.display().to_string(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let encoded = serde_json::to_string_pretty(preferences)?;
        fs::write(&self.path, encoded).map_err(write_err)
    }
}

/// Preferences held in memory for the life of the process.
pub struct AppSettings {
    store: Box<dyn PreferenceStore>,
    current: RwLock<Preferences>,
}

impl AppSettings {
    /// Reads the store once. A missing or unreadable file starts in light mode.
    pub fn load(store: Box<dyn PreferenceStore>) -> Self {
        let current = match store.load() {
            Ok(Some(preferences)) => preferences,
            Ok(None) => Preferences::default(),
            Err(err) => {
                warn!(error = %err, "preferences: load failed; using defaults");
                Preferences::default()
            }
        };
        Self {
            store,
            current: RwLock::new(current),
        }
    }

    pub fn get(&self) -> Preferences {
        match self.current.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    pub fn dark_mode(&self) -> bool {
        self.get().dark_mode
    }

    pub fn set_dark_mode(&self, enabled: bool) -> Result<(), PreferenceError> {
        let next = Preferences { dark_mode: enabled };
        self.store.save(&next)?;
        match self.current.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
        debug!(dark_mode = enabled, "preferences: updated");
        Ok(())
    }

    pub fn toggle_dark_mode(&self) -> Result<bool, PreferenceError> {
        let enabled = !self.dark_mode();
        self.set_dark_mode(enabled)?;
        Ok(enabled)
    }
}
