use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use tracing::warn;

pub const SETTINGS_FILE: &str = "swipe.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct CliSettings {
    pub server_url: String,
    pub client_id: Option<String>,
    pub offline: bool,
    pub preferences_path: PathBuf,
    pub bootstrap_path: Option<PathBuf>,
}

impl Default for CliSettings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8080".into(),
            client_id: None,
            offline: false,
            preferences_path: PathBuf::from(".swipe/preferences.json"),
            bootstrap_path: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    server_url: Option<String>,
    client_id: Option<String>,
    offline: Option<bool>,
    preferences_path: Option<PathBuf>,
    bootstrap_path: Option<PathBuf>,
}

/// Values given on the command line; they win over the file and the environment.
#[derive(Debug, Default, Clone)]
pub struct FlagOverrides {
    pub server_url: Option<String>,
    pub client_id: Option<String>,
    pub offline: bool,
}

pub fn load_cli_settings(config_path: Option<&Path>, flags: &FlagOverrides) -> CliSettings {
    let path = config_path.unwrap_or_else(|| Path::new(SETTINGS_FILE));
    load_cli_settings_with(path, |key| std::env::var(key).ok(), flags)
}

pub(crate) fn load_cli_settings_with(
    path: &Path,
    env: impl Fn(&str) -> Option<String>,
    flags: &FlagOverrides,
) -> CliSettings {
    let mut settings = CliSettings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match toml::from_str::<FileSettings>(&raw) {
            Ok(file_cfg) => {
                if let Some(v) = file_cfg.server_url {
                    settings.server_url = v;
                }
                if file_cfg.client_id.is_some() {
                    settings.client_id = file_cfg.client_id;
                }
                if let Some(v) = file_cfg.offline {
                    settings.offline = v;
                }
                if let Some(v) = file_cfg.preferences_path {
                    settings.preferences_path = v;
                }
                if file_cfg.bootstrap_path.is_some() {
                    settings.bootstrap_path = file_cfg.bootstrap_path;
                }
            }
            Err(error) => warn!(path = %path.display(), %error, "ignoring malformed settings file"),
        }
    }

    if let Some(v) = env("SWIPE_SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = env("SWIPE_OFFLINE") {
        settings.offline = matches!(v.trim(), "1" | "true" | "yes");
    }
    if let Some(v) = env("SWIPE_PREFERENCES") {
        settings.preferences_path = PathBuf::from(v);
    }
    if let Some(v) = env("SWIPE_BOOTSTRAP") {
        settings.bootstrap_path = Some(PathBuf::from(v));
    }

    if let Some(v) = &flags.server_url {
        settings.server_url = v.clone();
    }
    if flags.client_id.is_some() {
        settings.client_id = flags.client_id.clone();
    }
    if flags.offline {
        settings.offline = true;
    }

    settings
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
