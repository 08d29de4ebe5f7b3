use std::fmt::Write as _;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use stopwatch_core::{
    digital_readout, format_hms_ms, ClockSample, ClockZone, HandAngles, KeyValueStore, LapStats,
};

use crate::stopwatch::StopwatchState;

const MAX_VISIBLE_LAPS: usize = 10;
const CLOCK_RADIUS: usize = 8;

// Terminal cells are roughly twice as tall as they are wide.
const X_ASPECT: f64 = 2.0;

/// Where finished frames go.
pub trait Surface {
    fn present(&mut self, frame: &str) -> io::Result<()>;
}

/// Repaints the whole terminal on every frame.
pub struct TerminalSurface<W> {
    out: Arc<Mutex<W>>,
}

impl<W: Write> TerminalSurface<W> {
    pub fn new(out: Arc<Mutex<W>>) -> Self {
        Self { out }
    }
}

impl<W: Write> Surface for TerminalSurface<W> {
    fn present(&mut self, frame: &str) -> io::Result<()> {
        let mut out = self
            .out
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "terminal lock poisoned"))?;
        out.write_all(b"\x1b[H\x1b[2J")?;
        for line in frame.lines() {
            out.write_all(line.as_bytes())?;
            out.write_all(b"\r\n")?;
        }
        out.flush()
    }
}

pub fn draw_stopwatch<S: KeyValueStore>(frame: &mut String, state: &StopwatchState<S>, now_ms: u64) {
    let run_label = if state.timer.is_running() { "RUNNING" } else { "PAUSED" };
    writeln!(frame, "STOPWATCH  [{}]", run_label).ok();
    writeln!(frame).ok();
    writeln!(frame, "    {}", format_hms_ms(state.total_ms(now_ms) as i64)).ok();
    writeln!(frame).ok();

    let stats = state.stats();
    writeln!(frame, "{}", stats_line(&stats)).ok();

    let total = state.laps.len();
    for (i, lap) in state.laps.newest_first().take(MAX_VISIBLE_LAPS).enumerate() {
        // The oldest lap has nothing before it to be "+" relative to.
        let sign = if i + 1 == total { " " } else { "+" };
        let tag = if stats.best.map(|l| l.number) == Some(lap.number) {
            "  best"
        } else if stats.worst.map(|l| l.number) == Some(lap.number) {
            "  worst"
        } else {
            ""
        };
        writeln!(
            frame,
            "  Lap {:>3}  {}  {}{}{}",
            lap.number,
            format_hms_ms(lap.total_ms as i64),
            sign,
            format_hms_ms(lap.delta_ms),
            tag
        )
        .ok();
    }
    if total > MAX_VISIBLE_LAPS {
        writeln!(frame, "  ... {} older laps", total - MAX_VISIBLE_LAPS).ok();
    }
}

pub fn stats_line(stats: &LapStats) -> String {
    match (stats.best, stats.worst) {
        (Some(best), Some(worst)) => format!(
            "Best: {}   Worst: {}",
            format_hms_ms(best.delta_ms),
            format_hms_ms(worst.delta_ms)
        ),
        _ => "Best: --   Worst: --".to_string(),
    }
}

pub fn draw_clock(frame: &mut String, sample: &ClockSample, zone: &ClockZone) {
    for row in clock_face(sample, CLOCK_RADIUS) {
        writeln!(frame, "  {}", row.trim_end()).ok();
    }
    writeln!(frame, "  {}", digital_readout(sample, zone)).ok();
}

/// Rasterizes an analog clock into rows of text.
pub fn clock_face(sample: &ClockSample, radius: usize) -> Vec<String> {
    let height = radius * 2 + 1;
    let width = (radius as f64 * X_ASPECT) as usize * 2 + 1;
    let cx = (width / 2) as f64;
    let cy = radius as f64;
    let r = radius as f64;
    let mut grid = vec![vec![' '; width]; height];

    let mut plot = |x: f64, y: f64, c: char| {
        let (col, row) = (x.round(), y.round());
        if col >= 0.0 && row >= 0.0 && (col as usize) < width && (row as usize) < height {
            grid[row as usize][col as usize] = c;
        }
    };

    for i in 0..12 {
        let angle = i as f64 / 12.0 * std::f64::consts::TAU;
        plot(cx + angle.cos() * r * X_ASPECT, cy + angle.sin() * r, '+');
    }

    let hands = HandAngles::from_sample(sample);
    // Longest first so shorter hands stay visible where they overlap.
    for (angle, length, c) in [
        (hands.second, 0.88, '.'),
        (hands.minute, 0.72, '*'),
        (hands.hour, 0.5, '#'),
    ] {
        let steps = (r * length * X_ASPECT * 2.0).ceil() as usize;
        for step in 1..=steps {
            let t = step as f64 / steps as f64 * r * length;
            plot(cx + angle.cos() * t * X_ASPECT, cy + angle.sin() * t, c);
        }
    }
    plot(cx, cy, 'O');

    grid.into_iter().map(|row| row.into_iter().collect()).collect()
}

pub fn draw_footer(frame: &mut String, status: Option<&str>) {
    writeln!(frame).ok();
    if let Some(status) = status {
        writeln!(frame, "{}", status).ok();
    }
    writeln!(
        frame,
        "ENTER/space=start/pause s=start p=pause l=lap r=reset c=clear e=csv j=json y=copy z=zone h=help q=quit"
    )
    .ok();
}

pub fn help_text() -> &'static str {
    "STOPWATCH HELP\n\n\
     Enter  Start/Pause\n\
     space  Start/Pause\n\
     s      Start\n\
     p      Pause\n\
     l      Record lap\n\
     r      Reset (clears laps)\n\
     c      Clear laps\n\
     e      Export laps as CSV\n\
     j      Export laps as JSON\n\
     y      Copy latest lap time\n\
     z      Next timezone\n\
     q      Quit\n\n\
     Press any key to close"
}

pub fn draw_help(frame: &mut String) {
    frame.push_str(help_text());
    frame.push('\n');
}

#[cfg(test)]
mod tests {
    use stopwatch_core::{LapRecorder, MemStore, Persistence};

    use super::*;

    fn t(hours: u32, minutes: u32, seconds: u32) -> ClockSample {
        ClockSample { hours, minutes, seconds, milliseconds: 0 }
    }

    fn cell(face: &[String], row: usize, col: usize) -> char {
        face[row].chars().nth(col).unwrap_or(' ')
    }

    #[test]
    fn test_clock_face_noon() {
        let face = clock_face(&t(12, 0, 0), 8);
        assert_eq!(face.len(), 17);
        let center = face[0].chars().count() / 2;
        assert_eq!(cell(&face, 8, center), 'O');
        // Every hand points straight up; the hour hand covers the rows
        // nearest the center.
        assert_eq!(cell(&face, 7, center), '#');
        assert_eq!(cell(&face, 0, center), '+');
    }

    #[test]
    fn test_clock_face_three_oclock() {
        let face = clock_face(&t(3, 0, 0), 8);
        let center = face[0].chars().count() / 2;
        assert_eq!(cell(&face, 8, center + 2), '#');
        // The minute hand still points up.
        assert_eq!(cell(&face, 3, center), '*');
    }

    #[test]
    fn test_stats_line() {
        assert_eq!(stats_line(&LapStats::default()), "Best: --   Worst: --");

        let mut laps = LapRecorder::new();
        laps.record(1000);
        laps.record(1500);
        assert_eq!(
            stats_line(&laps.stats()),
            "Best: 00:00:00.500   Worst: 00:00:01.000"
        );
    }

    #[test]
    fn test_draw_stopwatch_lists_newest_first() {
        let store = MemStore::new();
        let mut state = StopwatchState::new(Persistence::new(&store));
        state.start(0);
        state.record_lap(1000);
        state.record_lap(3000);

        let mut frame = String::new();
        draw_stopwatch(&mut frame, &state, 4000);
        assert!(frame.contains("00:00:04.000"));
        assert!(frame.contains("[RUNNING]"));

        let lap2 = frame.find("Lap   2").unwrap();
        let lap1 = frame.find("Lap   1").unwrap();
        assert!(lap2 < lap1);
        assert!(frame.contains("Lap   2  00:00:03.000  +00:00:02.000  worst"));
        assert!(frame.contains("Lap   1  00:00:01.000   00:00:01.000  best"));
    }

    #[test]
    fn test_terminal_surface_repaints() {
        let out = Arc::new(Mutex::new(Vec::new()));
        let mut surface = TerminalSurface::new(out.clone());
        surface.present("a\nb").unwrap();
        let written = String::from_utf8(out.lock().unwrap().clone()).unwrap();
        assert_eq!(written, "\x1b[H\x1b[2Ja\r\nb\r\n");
    }
}
