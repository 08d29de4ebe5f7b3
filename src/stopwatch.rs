use chrono::{DateTime, Utc};
use stopwatch_core::{
    ExportError, ExportFile, ExportFormat, KeyValueStore, Lap, LapRecorder, LapStats,
    PersistedState, Persistence, TimerCore,
};

/// Stopwatch tracker plus laps. Every mutating call ends by saving a
/// snapshot through `persistence`.
pub struct StopwatchState<S: KeyValueStore> {
    pub timer: TimerCore,
    pub laps: LapRecorder,
    persistence: Persistence<S>,
}

impl<S: KeyValueStore> StopwatchState<S> {
    /// Restores the last snapshot if there is a usable one. The restored
    /// stopwatch is always paused.
    pub fn new(persistence: Persistence<S>) -> Self {
        let (timer, laps) = match persistence.load() {
            Some(state) => {
                log::info!(
                    "Restored {} ms and {} laps",
                    state.accumulated_ms,
                    state.laps.len()
                );
                (TimerCore::restore(state.accumulated_ms), state.laps)
            }
            None => (TimerCore::new(), LapRecorder::new()),
        };
        Self {
            timer,
            laps,
            persistence,
        }
    }

    pub fn start(&mut self, now_ms: u64) {
        self.timer.start(now_ms);
        self.save();
    }

    pub fn pause(&mut self, now_ms: u64) {
        self.timer.pause(now_ms);
        self.save();
    }

    pub fn toggle(&mut self, now_ms: u64) {
        self.timer.toggle(now_ms);
        self.save();
    }

    pub fn reset(&mut self, now_ms: u64) {
        self.timer.reset(now_ms);
        self.laps.clear();
        self.save();
    }

    /// Records a lap at the current total. Nothing is recorded while the
    /// stopwatch sits untouched at zero; a running stopwatch always records.
    pub fn record_lap(&mut self, now_ms: u64) -> Option<Lap> {
        if !self.timer.has_elapsed() {
            return None;
        }
        let lap = self.laps.record(self.timer.elapsed_ms(now_ms));
        self.save();
        Some(lap)
    }

    pub fn clear_laps(&mut self) {
        self.laps.clear();
        self.save();
    }

    pub fn total_ms(&self, now_ms: u64) -> u64 {
        self.timer.elapsed_ms(now_ms)
    }

    pub fn stats(&self) -> LapStats {
        self.laps.stats()
    }

    pub fn export(
        &self,
        format: ExportFormat,
        now: DateTime<Utc>,
    ) -> Result<Option<ExportFile>, ExportError> {
        ExportFile::render(format, &self.laps, now)
    }

    /// Saves with the in-flight segment folded in, for shutdown while
    /// running. The live tracker is left untouched.
    pub fn suspend(&self, now_ms: u64) {
        self.persistence.save(&PersistedState {
            accumulated_ms: self.timer.elapsed_ms(now_ms),
            laps: self.laps.clone(),
        });
    }

    fn save(&self) {
        self.persistence.save(&PersistedState {
            accumulated_ms: self.timer.accumulated_ms(),
            laps: self.laps.clone(),
        });
    }
}
