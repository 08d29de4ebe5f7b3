//! Pure stopwatch logic library with no terminal or filesystem dependencies.
//! Testable on host; the app crate supplies clocks, storage and rendering.

pub mod export;
pub mod face;
pub mod laps;
pub mod snapshot;
pub mod zone;

pub use export::{to_csv, to_json, ExportError, ExportFile, ExportFormat};
pub use face::{digital_readout, HandAngles};
pub use laps::{Lap, LapRecorder, LapStats};
pub use snapshot::{KeyValueStore, MemStore, PersistedState, Persistence, StoreError, STORAGE_KEY};
pub use zone::{ClockSample, ClockZone};

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum TimerState {
    Stopped,
    Running,
}

/// Elapsed-time accounting for a single stopwatch.
///
/// All timestamps are monotonic milliseconds supplied by the caller, so the
/// tracker never reads a clock itself.
#[derive(Clone, Debug)]
pub struct TimerCore {
    pub state: TimerState,
    accumulated_ms: u64,
    segment_start_ms: u64,
}

impl TimerCore {
    pub fn new() -> Self {
        Self {
            state: TimerState::Stopped,
            accumulated_ms: 0,
            segment_start_ms: 0,
        }
    }

    /// Seeds a stopped tracker with time carried over from a snapshot.
    pub fn restore(accumulated_ms: u64) -> Self {
        Self {
            state: TimerState::Stopped,
            accumulated_ms,
            segment_start_ms: 0,
        }
    }

    pub fn start(&mut self, now_ms: u64) {
        if self.state == TimerState::Running {
            return;
        }
        self.segment_start_ms = now_ms;
        self.state = TimerState::Running;
    }

    pub fn pause(&mut self, now_ms: u64) {
        if self.state != TimerState::Running {
            return;
        }
        self.accumulated_ms += now_ms.saturating_sub(self.segment_start_ms);
        self.segment_start_ms = 0;
        self.state = TimerState::Stopped;
    }

    pub fn toggle(&mut self, now_ms: u64) {
        match self.state {
            TimerState::Running => self.pause(now_ms),
            TimerState::Stopped => self.start(now_ms),
        }
    }

    /// Flushes any in-flight segment, then zeroes the accumulator.
    pub fn reset(&mut self, now_ms: u64) {
        self.pause(now_ms);
        self.accumulated_ms = 0;
    }

    pub fn elapsed_ms(&self, now_ms: u64) -> u64 {
        match self.state {
            TimerState::Running => {
                self.accumulated_ms + now_ms.saturating_sub(self.segment_start_ms)
            }
            TimerState::Stopped => self.accumulated_ms,
        }
    }

    pub fn accumulated_ms(&self) -> u64 {
        self.accumulated_ms
    }

    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    /// True once the tracker is running or holds any accumulated time.
    pub fn has_elapsed(&self) -> bool {
        self.is_running() || self.accumulated_ms > 0
    }
}

impl Default for TimerCore {
    fn default() -> Self {
        Self::new()
    }
}

/// Format milliseconds as "HH:MM:SS.mmm".
///
/// Negative input clamps to zero. Hours are not wrapped at 24.
pub fn format_hms_ms(ms: i64) -> String {
    let ms = ms.max(0) as u64;
    let total_secs = ms / 1000;
    let h = total_secs / 3600;
    let m = (total_secs % 3600) / 60;
    let s = total_secs % 60;
    format!("{:02}:{:02}:{:02}.{:03}", h, m, s, ms % 1000)
}

/// Like [`format_hms_ms`] for fractional input, which is floored first.
pub fn format_hms_ms_f64(ms: f64) -> String {
    if !ms.is_finite() || ms <= 0.0 {
        return format_hms_ms(0);
    }
    format_hms_ms(ms.floor().min(i64::MAX as f64) as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stopwatch_basic() {
        let mut sw = TimerCore::new();
        assert_eq!(sw.state, TimerState::Stopped);
        assert_eq!(sw.elapsed_ms(0), 0);

        sw.start(1000);
        assert_eq!(sw.state, TimerState::Running);
        assert_eq!(sw.elapsed_ms(1500), 500);
        assert_eq!(sw.elapsed_ms(2000), 1000);

        sw.pause(2000);
        assert_eq!(sw.state, TimerState::Stopped);
        assert_eq!(sw.elapsed_ms(5000), 1000); // Stays at 1000 when paused

        sw.start(5000);
        assert_eq!(sw.elapsed_ms(5500), 1500);

        sw.reset(6000);
        assert_eq!(sw.state, TimerState::Stopped);
        assert_eq!(sw.elapsed_ms(10000), 0);
    }

    #[test]
    fn test_start_and_pause_are_idempotent() {
        let mut sw = TimerCore::new();
        sw.pause(100);
        assert_eq!(sw.accumulated_ms(), 0);

        sw.start(1000);
        sw.start(1800); // ignored, segment keeps its original start
        assert_eq!(sw.elapsed_ms(2000), 1000);

        sw.pause(2000);
        sw.pause(9000);
        assert_eq!(sw.accumulated_ms(), 1000);
    }

    #[test]
    fn test_toggle() {
        let mut sw = TimerCore::new();
        sw.toggle(0);
        assert!(sw.is_running());
        sw.toggle(250);
        assert!(!sw.is_running());
        assert_eq!(sw.elapsed_ms(1000), 250);
    }

    #[test]
    fn test_total_monotonic_while_running_constant_while_stopped() {
        let mut sw = TimerCore::new();
        let events: [(u64, bool); 6] = [
            (100, true),
            (400, false),
            (900, true),
            (950, false),
            (2000, true),
            (3500, false),
        ];
        let mut last = 0;
        let mut now = 0;
        for (at, start) in events {
            while now < at {
                let total = sw.elapsed_ms(now);
                if sw.is_running() {
                    assert!(total >= last);
                } else {
                    assert_eq!(total, last);
                }
                last = total;
                now += 25;
            }
            if start {
                sw.start(at);
            } else {
                sw.pause(at);
            }
            last = sw.elapsed_ms(at);
        }
        assert_eq!(sw.elapsed_ms(10_000), 300 + 50 + 1500);
    }

    #[test]
    fn test_clock_going_backwards_never_underflows() {
        let mut sw = TimerCore::new();
        sw.start(5000);
        assert_eq!(sw.elapsed_ms(4000), 0);
        sw.pause(4000);
        assert_eq!(sw.accumulated_ms(), 0);
    }

    #[test]
    fn test_reset_while_running() {
        let mut sw = TimerCore::restore(700);
        sw.start(0);
        sw.reset(1234);
        assert!(!sw.is_running());
        assert!(!sw.has_elapsed());
        for now in [0, 1, 99_999] {
            assert_eq!(sw.elapsed_ms(now), 0);
        }
    }

    #[test]
    fn test_restore_starts_paused() {
        let sw = TimerCore::restore(42_000);
        assert_eq!(sw.state, TimerState::Stopped);
        assert!(sw.has_elapsed());
        assert_eq!(sw.elapsed_ms(1), 42_000);
    }

    #[test]
    fn test_format_hms_ms() {
        assert_eq!(format_hms_ms(0), "00:00:00.000");
        assert_eq!(format_hms_ms(999), "00:00:00.999");
        assert_eq!(format_hms_ms(1000), "00:00:01.000");
        assert_eq!(format_hms_ms(61_000), "00:01:01.000");
        assert_eq!(format_hms_ms(3_600_000), "01:00:00.000");
        assert_eq!(format_hms_ms(3_661_999), "01:01:01.999");
    }

    #[test]
    fn test_format_hms_ms_edges() {
        assert_eq!(format_hms_ms(-5), "00:00:00.000");
        // 100 hours does not wrap
        assert_eq!(format_hms_ms(360_000_000), "100:00:00.000");
        assert_eq!(format_hms_ms_f64(1999.9), "00:00:01.999");
        assert_eq!(format_hms_ms_f64(-0.5), "00:00:00.000");
        assert_eq!(format_hms_ms_f64(f64::NAN), "00:00:00.000");
    }
}
