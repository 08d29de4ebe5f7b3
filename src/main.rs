mod clipboard;
mod config;
mod export;
mod logging;
mod stopwatch;
mod storage;
mod ui;

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use num_traits::FromPrimitive;
use stopwatch_core::{format_hms_ms, ClockZone, ExportFormat, Persistence};

use crate::clipboard::{Clipboard, CommandClipboard, FallbackClipboard, Osc52Clipboard};
use crate::config::AppConfig;
use crate::export::{DirSink, ExportSink};
use crate::logging::{init_logging, LoggingConfig};
use crate::stopwatch::StopwatchState;
use crate::storage::FileStore;
use crate::ui::{Surface, TerminalSurface};

const APP_NAME: &str = "Stopwatch";

#[derive(Debug, num_derive::FromPrimitive)]
enum AppOp {
    Redraw = 0,
    Rawkeys,
    Pump,
    Quit,
}

#[derive(Debug, num_derive::FromPrimitive)]
enum PumpOp {
    Start = 0,
    Stop,
    Quit,
}

/// Fixed-size message passed between the app threads.
#[derive(Debug, Clone, Copy)]
struct Scalar {
    id: usize,
    args: [usize; 4],
}

impl Scalar {
    fn new(id: usize, args: [usize; 4]) -> Self {
        Self { id, args }
    }

    fn op(id: usize) -> Self {
        Self::new(id, [0; 4])
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "stopwatch",
    version,
    about = "Stopwatch with laps, exports and a zoned analog clock"
)]
struct Cli {
    #[arg(long)]
    config: Option<PathBuf>,
    /// Overrides `state_dir` from the config file.
    #[arg(long)]
    state_dir: Option<PathBuf>,
    /// Clock timezone: "system" or an IANA name such as "Europe/Berlin".
    #[arg(long)]
    zone: Option<String>,
    #[arg(long, default_value_t = false)]
    validate_config: bool,
}

/// What a key press asks the app to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyAction {
    Toggle,
    Start,
    Pause,
    Lap,
    Reset,
    ClearLaps,
    Export(ExportFormat),
    CopyLap,
    NextZone,
    Help,
    Quit,
}

fn key_action(key: char) -> Option<KeyAction> {
    let action = match key.to_ascii_lowercase() {
        '\r' | '\n' | ' ' => KeyAction::Toggle,
        's' => KeyAction::Start,
        'p' => KeyAction::Pause,
        'l' => KeyAction::Lap,
        'r' => KeyAction::Reset,
        'c' => KeyAction::ClearLaps,
        'e' => KeyAction::Export(ExportFormat::Csv),
        'j' => KeyAction::Export(ExportFormat::Json),
        'y' => KeyAction::CopyLap,
        'z' => KeyAction::NextZone,
        'h' | '?' => KeyAction::Help,
        'q' => KeyAction::Quit,
        _ => return None,
    };
    Some(action)
}

struct StopwatchApp {
    stopwatch: StopwatchState<FileStore>,
    surface: Box<dyn Surface>,
    clipboard: FallbackClipboard,
    exports: DirSink,

    zones: Vec<String>,
    zone_cursor: usize,
    clock_zone: ClockZone,

    epoch: Instant,
    main_conn: Sender<Scalar>,
    pump_conn: Sender<Scalar>,
    pump_running: bool,
    frame_interval: Duration,

    help_visible: bool,
    status: Option<String>,
}

impl StopwatchApp {
    fn new(
        cfg: &AppConfig,
        surface: Box<dyn Surface>,
        clipboard: FallbackClipboard,
        main_conn: Sender<Scalar>,
        pump_conn: Sender<Scalar>,
    ) -> Self {
        let stopwatch = StopwatchState::new(Persistence::new(FileStore::new(&cfg.state_dir)));

        let zone_cursor = cfg
            .zones
            .iter()
            .position(|z| z == &cfg.default_zone)
            .unwrap_or(0);

        Self {
            stopwatch,
            surface,
            clipboard,
            exports: DirSink::new(&cfg.export_dir),
            clock_zone: ClockZone::resolve(&cfg.default_zone),
            zones: cfg.zones.clone(),
            zone_cursor,
            epoch: Instant::now(),
            main_conn,
            pump_conn,
            pump_running: false,
            frame_interval: cfg.frame_interval,
            help_visible: false,
            status: None,
        }
    }

    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    fn redraw(&mut self) {
        let mut frame = String::new();
        if self.help_visible {
            ui::draw_help(&mut frame);
        } else {
            let now = self.now_ms();
            ui::draw_stopwatch(&mut frame, &self.stopwatch, now);
            frame.push('\n');
            ui::draw_clock(&mut frame, &self.clock_zone.sample(), &self.clock_zone);
            ui::draw_footer(&mut frame, self.status.as_deref());
        }
        if let Err(e) = self.surface.present(&frame) {
            log::warn!("Failed to draw frame: {}", e);
        }
    }

    fn start_pump(&mut self) {
        if !self.pump_running {
            self.pump_running = true;
            let interval_ms = self.frame_interval.as_millis().max(1) as usize;
            self.pump_conn
                .send(Scalar::new(PumpOp::Start as usize, [interval_ms, 0, 0, 0]))
                .ok();
        }
    }

    fn stop_pump(&mut self) {
        if self.pump_running {
            self.pump_running = false;
            self.pump_conn.send(Scalar::op(PumpOp::Stop as usize)).ok();
        }
    }

    fn handle_pump(&mut self) {
        self.redraw();
    }

    fn handle_key(&mut self, key: char) {
        // If help screen is showing, any key dismisses it
        if self.help_visible {
            self.help_visible = false;
            self.redraw();
            return;
        }

        let Some(action) = key_action(key) else {
            return;
        };
        let now = self.now_ms();
        match action {
            KeyAction::Toggle => {
                self.stopwatch.toggle(now);
                self.status = None;
            }
            KeyAction::Start => self.stopwatch.start(now),
            KeyAction::Pause => self.stopwatch.pause(now),
            KeyAction::Lap => {
                if let Some(lap) = self.stopwatch.record_lap(now) {
                    log::debug!("lap {} at {} ms", lap.number, lap.total_ms);
                }
            }
            KeyAction::Reset => {
                self.stopwatch.reset(now);
                self.status = None;
            }
            KeyAction::ClearLaps => self.stopwatch.clear_laps(),
            KeyAction::Export(format) => self.export(format),
            KeyAction::CopyLap => self.copy_latest_lap(),
            KeyAction::NextZone => self.next_zone(),
            KeyAction::Help => self.help_visible = true,
            KeyAction::Quit => {
                self.main_conn.send(Scalar::op(AppOp::Quit as usize)).ok();
                return;
            }
        }
        self.redraw();
    }

    fn export(&mut self, format: ExportFormat) {
        match self.stopwatch.export(format, Utc::now()) {
            Ok(Some(file)) => {
                self.status = self
                    .exports
                    .deliver(&file)
                    .map(|path| format!("Exported {}", path.display()));
            }
            Ok(None) => {
                self.status = Some("No laps to export".to_string());
            }
            Err(e) => log::warn!("Export failed: {}", e),
        }
    }

    fn copy_latest_lap(&mut self) {
        let Some(lap) = self.stopwatch.laps.latest().copied() else {
            return;
        };
        let text = format_hms_ms(lap.total_ms as i64);
        if self.clipboard.copy(&text) {
            self.status = Some(format!("Copied lap {} ({})", lap.number, text));
        }
    }

    fn next_zone(&mut self) {
        if self.zones.is_empty() {
            return;
        }
        self.zone_cursor = (self.zone_cursor + 1) % self.zones.len();
        let name = &self.zones[self.zone_cursor];
        self.clock_zone = ClockZone::resolve(name);
        log::info!("Clock zone set to {}", self.clock_zone);
    }

    fn shutdown(&mut self) {
        self.stop_pump();
        self.pump_conn.send(Scalar::op(PumpOp::Quit as usize)).ok();
        self.stopwatch.suspend(self.now_ms());
    }
}

fn pump_thread(pump_rx: Receiver<Scalar>, main_conn: Sender<Scalar>) {
    let mut interval_ms = 100u64;
    let mut running = false;

    loop {
        if running {
            std::thread::sleep(Duration::from_millis(interval_ms));
            if main_conn.send(Scalar::op(AppOp::Pump as usize)).is_err() {
                break;
            }
        }

        // Non-blocking while ticking, block-wait while stopped
        let envelope = if running {
            match pump_rx.try_recv() {
                Ok(msg) => Some(msg),
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Disconnected) => break,
            }
        } else {
            match pump_rx.recv() {
                Ok(msg) => Some(msg),
                Err(_) => break,
            }
        };

        if let Some(msg) = envelope {
            match FromPrimitive::from_usize(msg.id) {
                Some(PumpOp::Start) => {
                    interval_ms = msg.args[0] as u64;
                    if interval_ms == 0 {
                        interval_ms = 100;
                    }
                    running = true;
                }
                Some(PumpOp::Stop) => running = false,
                Some(PumpOp::Quit) => break,
                None => log::error!("unknown pump opcode: {:?}", msg),
            }
        }
    }
}

/// Forwards terminal input as `Rawkeys` messages, up to four keys each.
/// An empty line counts as Enter; end of input quits.
fn key_thread(main_conn: Sender<Scalar>) {
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        let keys: Vec<char> = if line.is_empty() { vec!['\r'] } else { line.chars().collect() };
        for chunk in keys.chunks(4) {
            let mut args = [0usize; 4];
            for (slot, key) in args.iter_mut().zip(chunk) {
                *slot = *key as usize;
            }
            if main_conn.send(Scalar::new(AppOp::Rawkeys as usize, args)).is_err() {
                return;
            }
        }
    }
    main_conn.send(Scalar::op(AppOp::Quit as usize)).ok();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut cfg = match &cli.config {
        Some(path) => AppConfig::load(path).context("failed to load stopwatch config")?,
        None => AppConfig::default(),
    };
    if let Some(dir) = cli.state_dir {
        cfg.state_dir = dir;
    }
    if let Some(zone) = cli.zone.as_deref() {
        cfg.select_zone(zone);
    }

    init_logging(LoggingConfig {
        env_filter: cfg.log_filter.clone(),
    });
    log::info!("{} starting, state in {}", APP_NAME, cfg.state_dir.display());

    if cli.validate_config {
        let unknown: Vec<&String> = cfg
            .zones
            .iter()
            .filter(|name| {
                !name.eq_ignore_ascii_case(stopwatch_core::zone::SYSTEM_ZONE)
                    && ClockZone::resolve(name).is_local()
            })
            .collect();
        if unknown.is_empty() {
            log::info!("configuration ok ({} zones)", cfg.zones.len());
        } else {
            anyhow::bail!("unknown timezones in config: {:?}", unknown);
        }
        return Ok(());
    }

    let (main_conn, main_rx) = mpsc::channel::<Scalar>();
    let (pump_conn, pump_rx) = mpsc::channel::<Scalar>();

    let pump_main = main_conn.clone();
    let pump = std::thread::spawn(move || pump_thread(pump_rx, pump_main));
    let key_main = main_conn.clone();
    std::thread::spawn(move || key_thread(key_main));

    let stdout = Arc::new(Mutex::new(io::stdout()));
    let primary = cfg
        .clipboard_command
        .clone()
        .map(|argv| Box::new(CommandClipboard::new(argv)) as Box<dyn Clipboard>);
    let clipboard = FallbackClipboard::new(primary, Box::new(Osc52Clipboard::new(stdout.clone())));

    let mut app = StopwatchApp::new(
        &cfg,
        Box::new(TerminalSurface::new(stdout)),
        clipboard,
        main_conn.clone(),
        pump_conn,
    );
    app.start_pump();
    main_conn.send(Scalar::op(AppOp::Redraw as usize)).ok();

    while let Ok(msg) = main_rx.recv() {
        match FromPrimitive::from_usize(msg.id) {
            Some(AppOp::Redraw) => app.redraw(),
            Some(AppOp::Rawkeys) => {
                for arg in msg.args {
                    match char::from_u32(arg as u32) {
                        Some(key) if key != '\u{0000}' => app.handle_key(key),
                        _ => {}
                    }
                }
            }
            Some(AppOp::Pump) => app.handle_pump(),
            Some(AppOp::Quit) => break,
            None => log::error!("unknown opcode: {:?}", msg),
        }
    }

    // Clean up
    app.shutdown();
    if pump.join().is_err() {
        log::warn!("pump thread panicked");
    }
    log::info!("{} stopped", APP_NAME);
    Ok(())
}
