use std::fs;
use std::path::PathBuf;

use stopwatch_core::ExportFile;

/// Hands a rendered export to the user. Failures are logged, never raised.
pub trait ExportSink {
    fn deliver(&self, file: &ExportFile) -> Option<PathBuf>;
}

/// Drops exports into a directory.
pub struct DirSink {
    dir: PathBuf,
}

impl DirSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ExportSink for DirSink {
    fn deliver(&self, file: &ExportFile) -> Option<PathBuf> {
        let path = self.dir.join(&file.file_name);
        let result = fs::create_dir_all(&self.dir).and_then(|_| fs::write(&path, &file.contents));
        match result {
            Ok(()) => {
                log::info!("Exported laps to {}", path.display());
                Some(path)
            }
            Err(e) => {
                log::warn!("Failed to export {}: {}", path.display(), e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file() -> ExportFile {
        ExportFile {
            file_name: "laps_test.csv".to_string(),
            mime_type: "text/csv;charset=utf-8",
            contents: "Lap Number,Total Time,Lap Time (delta ms)".to_string(),
        }
    }

    #[test]
    fn test_writes_into_dir() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirSink::new(dir.path().join("exports"));
        let path = sink.deliver(&file()).unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), file().contents);
    }

    #[test]
    fn test_failure_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "x").unwrap();
        assert!(DirSink::new(&blocker).deliver(&file()).is_none());
    }
}
