//! Lap bookkeeping.
//!
//! Laps are kept in chronological order internally; the presentation order
//! (newest first) is a reversed view. Lap numbers are always `1..=len`.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Lap {
    #[serde(rename = "num")]
    pub number: u32,
    #[serde(rename = "totalMs", alias = "total")]
    pub total_ms: u64,
    #[serde(rename = "deltaMs")]
    pub delta_ms: i64,
}

/// Fastest and slowest lap by `delta_ms`.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct LapStats {
    pub best: Option<Lap>,
    pub worst: Option<Lap>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LapRecorder {
    laps: Vec<Lap>,
}

impl LapRecorder {
    pub fn new() -> Self {
        Self { laps: Vec::new() }
    }

    /// Rebuilds a recorder from laps listed newest first, as they are
    /// persisted. Returns `None` unless the numbers run `N..=1` with no gaps.
    pub fn from_newest_first(laps: Vec<Lap>) -> Option<Self> {
        let mut laps = laps;
        laps.reverse();
        let numbered = laps
            .iter()
            .enumerate()
            .all(|(i, lap)| lap.number as usize == i + 1);
        if !numbered {
            return None;
        }
        Some(Self { laps })
    }

    /// Appends a lap at `total_ms`, returning it.
    pub fn record(&mut self, total_ms: u64) -> Lap {
        let previous = self.latest().map(|lap| lap.total_ms).unwrap_or(0);
        let lap = Lap {
            number: self.laps.len() as u32 + 1,
            total_ms,
            delta_ms: total_ms as i64 - previous as i64,
        };
        self.laps.push(lap);
        lap
    }

    /// Records a fractional total, rounded to the nearest millisecond.
    pub fn record_rounded(&mut self, total_ms: f64) -> Option<Lap> {
        if !total_ms.is_finite() {
            return None;
        }
        Some(self.record(total_ms.max(0.0).round() as u64))
    }

    pub fn clear(&mut self) {
        self.laps.clear();
    }

    /// Best is the smallest delta, worst the largest. On ties the earliest
    /// lap wins.
    pub fn stats(&self) -> LapStats {
        let mut stats = LapStats::default();
        for lap in &self.laps {
            if stats.best.map_or(true, |best| lap.delta_ms < best.delta_ms) {
                stats.best = Some(*lap);
            }
            if stats.worst.map_or(true, |worst| lap.delta_ms > worst.delta_ms) {
                stats.worst = Some(*lap);
            }
        }
        stats
    }

    pub fn latest(&self) -> Option<&Lap> {
        self.laps.last()
    }

    pub fn get(&self, number: u32) -> Option<&Lap> {
        let index = (number as usize).checked_sub(1)?;
        self.laps.get(index)
    }

    pub fn chronological(&self) -> impl DoubleEndedIterator<Item = &Lap> + ExactSizeIterator {
        self.laps.iter()
    }

    pub fn newest_first(&self) -> impl Iterator<Item = &Lap> + ExactSizeIterator {
        self.laps.iter().rev()
    }

    pub fn len(&self) -> usize {
        self.laps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.laps.is_empty()
    }
}
