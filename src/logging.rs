use std::sync::Once;

use env_logger::{Builder, Target};
use log::LevelFilter;

/// Where the stopwatch takes its log filter from. `env_filter` comes from
/// the config file's `log_filter` and wins over `RUST_LOG`.
#[derive(Debug, Clone, Default)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
}

impl LoggingConfig {
    fn filter(&self) -> Option<String> {
        self.env_filter
            .clone()
            .or_else(|| std::env::var("RUST_LOG").ok())
    }
}

static INIT: Once = Once::new();

fn builder(config: &LoggingConfig) -> Builder {
    let mut builder = Builder::new();
    match config.filter() {
        Some(filter) => builder.parse_filters(&filter),
        None => builder.filter_level(LevelFilter::Info),
    };
    // stdout belongs to the terminal surface.
    builder.target(Target::Stderr);
    builder
}

/// Sets up `env_logger` for the app. Only the first call has any effect.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        if builder(&config).try_init().is_ok() {
            log::debug!("logging to stderr");
        }
    });
}
