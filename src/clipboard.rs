//! Copying text out of the app: an external command first, then an OSC 52
//! escape that most terminals forward to the system clipboard.

use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

#[derive(Debug, thiserror::Error)]
pub enum ClipboardError {
    #[error("clipboard command failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("clipboard command exited with {0}")]
    Status(std::process::ExitStatus),
    #[error("no clipboard mechanism configured")]
    Unavailable,
}

pub trait Clipboard {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError>;
}

/// Pipes the text into a program such as `wl-copy` or `pbcopy`.
pub struct CommandClipboard {
    argv: Vec<String>,
}

impl CommandClipboard {
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }
}

impl Clipboard for CommandClipboard {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        let (program, args) = self.argv.split_first().ok_or(ClipboardError::Unavailable)?;
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(text.as_bytes())?;
        }
        let status = child.wait()?;
        if !status.success() {
            return Err(ClipboardError::Status(status));
        }
        Ok(())
    }
}

/// Emits an OSC 52 "set clipboard" sequence on a shared writer.
pub struct Osc52Clipboard<W> {
    out: Arc<Mutex<W>>,
}

impl<W: Write> Osc52Clipboard<W> {
    pub fn new(out: Arc<Mutex<W>>) -> Self {
        Self { out }
    }
}

pub fn osc52_sequence(text: &str) -> String {
    format!("\x1b]52;c;{}\x07", STANDARD.encode(text))
}

impl<W: Write> Clipboard for Osc52Clipboard<W> {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        let mut out = self
            .out
            .lock()
            .map_err(|_| ClipboardError::Unavailable)?;
        out.write_all(osc52_sequence(text).as_bytes())?;
        out.flush()?;
        Ok(())
    }
}

/// Tries `primary`, then `secondary`. If both fail the copy is dropped.
pub struct FallbackClipboard {
    primary: Option<Box<dyn Clipboard>>,
    secondary: Box<dyn Clipboard>,
}

impl FallbackClipboard {
    pub fn new(primary: Option<Box<dyn Clipboard>>, secondary: Box<dyn Clipboard>) -> Self {
        Self { primary, secondary }
    }

    /// Returns whether any mechanism accepted the text.
    pub fn copy(&self, text: &str) -> bool {
        if let Some(primary) = &self.primary {
            match primary.write_text(text) {
                Ok(()) => return true,
                Err(e) => log::debug!("primary clipboard failed, trying fallback: {}", e),
            }
        }
        match self.secondary.write_text(text) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Copy to clipboard failed: {}", e);
                false
            }
        }
    }
}
