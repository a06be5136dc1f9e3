use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DroneConfig {
    pub channel: u8,
    pub note: u8,
    pub velocity: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    pub root_url: String,
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub bpm: f64,
    /// MIDI channel and velocity for composition notes.
    pub channel: u8,
    pub velocity: u8,
    pub drone: DroneConfig,
    /// Explicit serial device path; discovered when absent.
    pub serial_port: Option<String>,
    pub web: WebConfig,
    /// Seconds of silence before the quiet-window task plays again.
    pub max_quiet_secs: f64,
    /// Compositions played per quiet window.
    pub quiet_window_count: u32,
    /// Period of the companion-app restart task, in seconds.
    pub app_restart_secs: u64,
    pub companion_apps: Vec<String>,
    /// Host command bound to the fatal-fault signal. Without one, a
    /// fault only ends the process and restarting is the supervisor's
    /// job.
    pub restart_command: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bpm: 102.0,
            channel: 0,
            velocity: 63,
            drone: DroneConfig {
                channel: 1,
                note: 24,
                velocity: 60,
            },
            serial_port: None,
            web: WebConfig {
                root_url: "http://localhost:8080/".into(),
                connect_timeout_secs: 10,
                read_timeout_secs: 15,
            },
            max_quiet_secs: 5.0 * 60.0,
            quiet_window_count: 1,
            app_restart_secs: 2 * 60 * 60,
            companion_apps: vec!["OBS".into()],
            restart_command: None,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, Error> {
        let text = fs::read_to_string(path).map_err(|e| Error::Config {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        ron::from_str(&text).map_err(|e| Error::Config {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Missing file falls back to defaults; an unreadable or malformed
    /// file is still an error, a half-applied config being worse than
    /// none.
    pub fn load_or_default(path: &Path) -> Result<Self, Error> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_installation() {
        let config = Config::default();
        assert_eq!(config.bpm, 102.0);
        assert_eq!(config.drone.note, 24);
        assert_eq!(config.max_quiet_secs, 300.0);
        assert_eq!(config.quiet_window_count, 1);
    }

    #[test]
    fn round_trips_through_ron() {
        let config = Config::default();
        let text = ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::default()).unwrap();
        let back: Config = ron::from_str(&text).unwrap();
        assert_eq!(back.bpm, config.bpm);
        assert_eq!(back.companion_apps, config.companion_apps);
    }
}
