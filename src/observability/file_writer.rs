//! Line-oriented file writer with size-based rotation.
//!
//! Trace files grow by one OTLP document per exported batch. Once the
//! active file passes [`MAX_FILE_SIZE_BYTES`] it is renamed with a unix
//! timestamp suffix and a fresh file is started; only the newest
//! [`MAX_BACKUP_FILES`] rotated files are kept.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Maximum file size before rotation (10 MB).
pub const MAX_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;

/// Number of rotated files to retain.
pub const MAX_BACKUP_FILES: usize = 3;

/// Thread-safe appending writer with rotation.
///
/// The file is opened lazily on the first write, so construction never
/// fails. Parent directories are created on demand.
pub struct RotatingFileWriter {
    path: PathBuf,
    max_bytes: u64,
    file: Mutex<Option<fs::File>>,
}

impl RotatingFileWriter {
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self::with_limit(path, MAX_FILE_SIZE_BYTES)
    }

    /// Creates a writer that rotates once the file exceeds `max_bytes`.
    #[must_use]
    pub const fn with_limit(path: PathBuf, max_bytes: u64) -> Self {
        Self { path, max_bytes, file: Mutex::new(None) }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `line` plus a newline and flushes.
    ///
    /// # Errors
    ///
    /// Fails if rotation, opening, writing or flushing fails, or if the
    /// internal lock was poisoned by a panicking writer.
    pub fn write_line(&self, line: &str) -> std::io::Result<()> {
        let mut guard = self
            .file
            .lock()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, format!("writer lock poisoned: {e}")))?;

        if fs::metadata(&self.path).is_ok_and(|m| m.len() > self.max_bytes) {
            *guard = None;
            self.rotate()?;
        }

        if guard.is_none() {
            if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            *guard = Some(OpenOptions::new().create(true).append(true).open(&self.path)?);
        }
        let file = guard
            .as_mut()
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "trace file not open"))?;

        writeln!(file, "{line}")?;
        file.flush()?;
        drop(guard);
        Ok(())
    }

    fn rotate(&self) -> std::io::Result<()> {
        let timestamp = chrono::Utc::now().timestamp_millis();
        let mut backup = self.path.clone().into_os_string();
        backup.push(format!(".{timestamp}"));

        if self.path.exists() {
            fs::rename(&self.path, PathBuf::from(backup))?;
            tracing::debug!(path = %self.path.display(), "rotated trace file");
        }
        self.prune_backups()
    }

    /// Deletes rotated files beyond the retention limit, newest kept.
    fn prune_backups(&self) -> std::io::Result<()> {
        let Some(file_name) = self.path.file_name().and_then(|n| n.to_str()) else {
            return Ok(());
        };
        let prefix = format!("{file_name}.");
        let dir = match self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(dir) => dir.to_path_buf(),
            None => PathBuf::from("."),
        };

        let mut backups: Vec<(u64, PathBuf)> = fs::read_dir(dir)?
            .filter_map(std::result::Result::ok)
            .filter_map(|entry| {
                let name = entry.file_name().into_string().ok()?;
                let stamp = name.strip_prefix(&prefix)?.parse().ok()?;
                Some((stamp, entry.path()))
            })
            .collect();

        backups.sort_by(|a, b| b.0.cmp(&a.0));
        for (_, old) in backups.iter().skip(MAX_BACKUP_FILES) {
            let _ = fs::remove_file(old);
        }
        Ok(())
    }
}

impl std::fmt::Debug for RotatingFileWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RotatingFileWriter")
            .field("path", &self.path)
            .field("max_bytes", &self.max_bytes)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_parent_directories_and_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("traces.jsonl");
        let writer = RotatingFileWriter::new(path.clone());

        writer.write_line("{\"a\":1}").unwrap();
        writer.write_line("{\"b\":2}").unwrap();

        assert_eq!(fs::read_to_string(path).unwrap(), "{\"a\":1}\n{\"b\":2}\n");
    }

    #[test]
    fn rotates_when_over_limit_and_keeps_few_backups() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("traces.jsonl");
        let writer = RotatingFileWriter::with_limit(path.clone(), 4);

        for _ in 0..(MAX_BACKUP_FILES + 3) {
            writer.write_line("0123456789").unwrap();
            std::thread::sleep(std::time::Duration::from_millis(2));
        }

        let backups = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().starts_with("traces.jsonl."))
            .count();
        assert!(backups <= MAX_BACKUP_FILES);
        assert_eq!(fs::read_to_string(path).unwrap(), "0123456789\n");
    }
}
