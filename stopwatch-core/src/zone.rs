//! Wall-clock sampling for the host zone or a named IANA zone.

use std::fmt;

use chrono::{DateTime, Local, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

/// Name that selects the host's own zone.
pub const SYSTEM_ZONE: &str = "system";

/// Civil time of day, as shown on the clock face.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ClockSample {
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
    pub milliseconds: u32,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ClockZone {
    Local,
    Named(Tz),
}

impl ClockZone {
    /// Resolves a zone selection. Unknown names fall back to the host zone
    /// with a warning rather than failing.
    pub fn resolve(name: &str) -> Self {
        let name = name.trim();
        if name.is_empty() || name.eq_ignore_ascii_case(SYSTEM_ZONE) {
            return ClockZone::Local;
        }
        match name.parse::<Tz>() {
            Ok(tz) => ClockZone::Named(tz),
            Err(e) => {
                log::warn!(
                    "Could not resolve timezone {:?} ({}), falling back to system time",
                    name,
                    e
                );
                ClockZone::Local
            }
        }
    }

    pub fn sample(&self) -> ClockSample {
        self.sample_at(Utc::now())
    }

    pub fn sample_at(&self, instant: DateTime<Utc>) -> ClockSample {
        // Sub-second part is the same in every zone.
        let milliseconds = instant.timestamp_subsec_millis().min(999);
        match self {
            ClockZone::Local => civil(&instant.with_timezone(&Local), milliseconds),
            ClockZone::Named(tz) => civil(&instant.with_timezone(tz), milliseconds),
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, ClockZone::Local)
    }
}

impl fmt::Display for ClockZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClockZone::Local => write!(f, "(Local)"),
            ClockZone::Named(tz) => write!(f, "{}", tz.name()),
        }
    }
}

fn civil<Z: TimeZone>(at: &DateTime<Z>, milliseconds: u32) -> ClockSample {
    ClockSample {
        hours: at.hour(),
        minutes: at.minute(),
        seconds: at.second(),
        milliseconds,
    }
}

/// One-shot sample for a zone name.
pub fn sample(zone: &str) -> ClockSample {
    ClockZone::resolve(zone).sample()
}
