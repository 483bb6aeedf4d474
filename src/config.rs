use std::env;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::TrackError;

const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: Option<PathBuf>,
    /// Seconds between intermediate saves while tracking. `0` disables them.
    pub checkpoint_secs: u64,
    pub refresh_millis: u64,
    pub targets: Targets,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: None,
            checkpoint_secs: 60,
            refresh_millis: 250,
            targets: Targets::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Targets {
    pub daily_hours: f64,
    pub weekly_hours: f64,
    pub monthly_hours: f64,
}

impl Default for Targets {
    fn default() -> Self {
        Self {
            daily_hours: 8.0,
            weekly_hours: 40.0,
            monthly_hours: 160.0,
        }
    }
}

impl Config {
    /// Loads the config file, falling back to defaults when it does not exist.
    pub fn load(cli_path: Option<PathBuf>) -> Result<Self, TrackError> {
        let Some(path) = config_path(cli_path) else {
            return Ok(Self::default());
        };
        Self::from_file(&path)
    }

    pub fn from_file(path: &Path) -> Result<Self, TrackError> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(err) => return Err(TrackError::io(path, err)),
        };

        toml::from_str(&raw).map_err(|source| TrackError::Config {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn config_path(cli_path: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(path) = cli_path {
        return Some(path);
    }

    if let Some(path) = env::var_os("TTRACK_CONFIG") {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return Some(path);
        }
    }

    dirs::config_dir().map(|dir| dir.join("ttrack").join(CONFIG_FILE))
}
