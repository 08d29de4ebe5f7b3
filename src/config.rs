use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use humantime::parse_duration;
use serde::Deserialize;
use stopwatch_core::zone::SYSTEM_ZONE;

const DEFAULT_ZONES: [&str; 5] = [
    SYSTEM_ZONE,
    "UTC",
    "America/New_York",
    "Europe/London",
    "Asia/Tokyo",
];

const MIN_FRAME_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub state_dir: PathBuf,
    pub export_dir: PathBuf,
    pub frame_interval: Duration,
    pub zones: Vec<String>,
    pub default_zone: String,
    pub clipboard_command: Option<Vec<String>>,
    pub log_filter: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    state_dir: Option<PathBuf>,
    export_dir: Option<PathBuf>,
    frame_interval: Option<String>,
    zones: Option<Vec<String>>,
    default_zone: Option<String>,
    clipboard_command: Option<Vec<String>>,
    log_filter: Option<String>,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;

        let parsed: FileConfig = toml::from_str(&raw)
            .with_context(|| format!("failed to parse TOML {}", path.display()))?;

        Self::from_raw(parsed)
    }

    fn from_raw(raw: FileConfig) -> Result<Self> {
        let defaults = Self::default();
        let frame_interval = match raw.frame_interval.as_deref() {
            Some(value) => parse_frame_interval(value)?,
            None => defaults.frame_interval,
        };

        let mut zones = raw.zones.unwrap_or(defaults.zones);
        if zones.iter().any(|z| z.trim().is_empty()) {
            bail!("zones must not contain empty names");
        }

        let default_zone = match raw.default_zone {
            Some(zone) if zone.trim().is_empty() => bail!("default_zone must not be empty"),
            Some(zone) => zone,
            None => zones.first().cloned().unwrap_or(defaults.default_zone),
        };
        if !zones.iter().any(|z| z == &default_zone) {
            zones.insert(0, default_zone.clone());
        }

        if let Some(command) = &raw.clipboard_command {
            if command.first().map_or(true, |program| program.trim().is_empty()) {
                bail!("clipboard_command must name a program");
            }
        }

        Ok(Self {
            state_dir: raw.state_dir.unwrap_or(defaults.state_dir),
            export_dir: raw.export_dir.unwrap_or(defaults.export_dir),
            frame_interval,
            zones,
            default_zone,
            clipboard_command: raw.clipboard_command,
            log_filter: raw.log_filter,
        })
    }

    /// Points the clock at `zone`, adding it to the rotation when needed.
    pub fn select_zone(&mut self, zone: &str) {
        if !self.zones.iter().any(|z| z == zone) {
            self.zones.insert(0, zone.to_string());
        }
        self.default_zone = zone.to_string();
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from(".stopwatch"),
            export_dir: PathBuf::from("."),
            frame_interval: Duration::from_millis(100),
            zones: DEFAULT_ZONES.iter().map(|z| z.to_string()).collect(),
            default_zone: SYSTEM_ZONE.to_string(),
            clipboard_command: None,
            log_filter: None,
        }
    }
}

/// The pump sleeps in whole milliseconds, so anything finer is refused.
fn parse_frame_interval(value: &str) -> Result<Duration> {
    let interval =
        parse_duration(value).with_context(|| format!("frame_interval {value:?} is not a duration"))?;
    if interval < MIN_FRAME_INTERVAL {
        bail!("frame_interval {value:?} is below 1ms");
    }
    Ok(interval)
}
