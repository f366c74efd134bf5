//! Size-bounded output file with numbered history
//!
//! Before each append the current file's size is checked. Once it exceeds
//! `max_bytes` the history shifts by one (`path.1` becomes `path.2`, ...),
//! the file at `path.<max_rolls>` is deleted, and the current file becomes
//! `path.1`. The next append creates a fresh `path`. Higher suffix means
//! older content.

use super::record::format_record;
use crate::core::error::{Result, StoreError};
use crate::core::log_entry::LogEntry;
use std::ffi::OsStr;
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[cfg(feature = "file")]
use fs2::FileExt;

/// Rolling output file, owned by exactly one writer
///
/// The file is opened in append mode for each batch and closed afterwards,
/// so a rename never races an open handle. With the `file` feature the
/// handle holds an exclusive advisory lock while appending.
///
/// # Examples
///
/// ```no_run
/// use diag_log_store::persistence::RollingFile;
///
/// // Keep diagnostics.log plus diagnostics.log.1 .. diagnostics.log.3
/// let file = RollingFile::new("logs/diagnostics.log", 1024 * 1024, 3).unwrap();
/// ```
#[derive(Debug)]
pub struct RollingFile {
    base_path: PathBuf,
    max_bytes: u64,
    max_rolls: usize,
    rolls: u64,
}

impl RollingFile {
    /// Create the parent directory if needed. The file itself is created lazily.
    ///
    /// # Errors
    ///
    /// Returns error if the parent directory cannot be created
    pub fn new(path: impl AsRef<Path>, max_bytes: u64, max_rolls: usize) -> Result<Self> {
        let base_path = path.as_ref().to_path_buf();

        if let Some(parent) = base_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    StoreError::io_operation(
                        "create log directory",
                        format!("Failed to create directory '{}'", parent.display()),
                        e,
                    )
                })?;
            }
        }

        Ok(Self {
            base_path,
            max_bytes,
            max_rolls: max_rolls.max(1),
            rolls: 0,
        })
    }

    /// Roll if needed, then append the whole batch. Returns bytes written.
    ///
    /// # Errors
    ///
    /// Returns error if the roll, open, lock or write fails. The batch may
    /// be partially written in that case.
    pub fn append_batch(&mut self, batch: &[Arc<LogEntry>]) -> Result<u64> {
        if batch.is_empty() {
            return Ok(0);
        }

        self.roll_if_needed()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.base_path)
            .map_err(|e| {
                StoreError::io_operation(
                    "appending batch",
                    format!("Failed to open '{}'", self.base_path.display()),
                    e,
                )
            })?;

        #[cfg(feature = "file")]
        file.lock_exclusive()
            .map_err(|_| StoreError::file_lock(self.base_path.display().to_string()))?;

        let mut writer = BufWriter::new(file);
        let mut written = 0u64;
        for entry in batch {
            let line = format_record(entry);
            writer.write_all(line.as_bytes()).map_err(|e| {
                StoreError::io_operation(
                    "appending batch",
                    format!("Failed to write to '{}'", self.base_path.display()),
                    e,
                )
            })?;
            written += line.len() as u64;
        }
        writer.flush().map_err(|e| {
            StoreError::io_operation(
                "appending batch",
                format!("Failed to flush '{}'", self.base_path.display()),
                e,
            )
        })?;

        // Dropping the handle releases the lock
        Ok(written)
    }

    /// Roll when the current file is larger than `max_bytes`. Returns whether it rolled.
    pub fn roll_if_needed(&mut self) -> Result<bool> {
        match fs::metadata(&self.base_path) {
            Ok(metadata) if metadata.len() > self.max_bytes => {
                self.roll()?;
                Ok(true)
            }
            Ok(_) => Ok(false),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::io_operation(
                "checking log size",
                format!("Cannot read metadata of '{}'", self.base_path.display()),
                e,
            )),
        }
    }

    /// Shift the history by one and move the current file to `path.1`.
    fn roll(&mut self) -> Result<()> {
        let oldest = self.backup_path(self.max_rolls);
        match fs::remove_file(&oldest) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(StoreError::file_rotation(
                    oldest.display().to_string(),
                    format!("Failed to remove oldest rolled file: {}", e),
                ))
            }
        }

        for i in (1..self.max_rolls).rev() {
            let old_path = self.backup_path(i);
            if !old_path.exists() {
                continue;
            }
            let new_path = self.backup_path(i + 1);
            if let Err(first) = fs::rename(&old_path, &new_path) {
                // Some platforms refuse to rename over an existing file
                if new_path.exists() {
                    let _ = fs::remove_file(&new_path);
                }
                fs::rename(&old_path, &new_path).map_err(|e| {
                    StoreError::file_rotation(
                        old_path.display().to_string(),
                        format!("Failed to shift rolled file ({}; retry: {})", first, e),
                    )
                })?;
            }
        }

        fs::rename(&self.base_path, self.backup_path(1)).map_err(|e| {
            StoreError::file_rotation(
                self.base_path.display().to_string(),
                format!("Failed to roll current log file: {}", e),
            )
        })?;

        self.rolls += 1;
        Ok(())
    }

    /// Path of the rolled file with the given index (`path.<index>`)
    pub fn backup_path(&self, index: usize) -> PathBuf {
        // Built on OsString so non-UTF-8 names keep their own history
        let mut name = self
            .base_path
            .file_name()
            .map(OsStr::to_os_string)
            .unwrap_or_default();
        name.push(format!(".{}", index));

        let mut path = self.base_path.clone();
        path.set_file_name(name);
        path
    }

    /// Existing files, newest first: `path`, `path.1`, ..., `path.<max_rolls>`
    pub fn rolled_paths(&self) -> Vec<PathBuf> {
        std::iter::once(self.base_path.clone())
            .chain((1..=self.max_rolls).map(|i| self.backup_path(i)))
            .filter(|p| p.exists())
            .collect()
    }

    /// Size of the current file, 0 if it does not exist yet
    pub fn current_size(&self) -> u64 {
        fs::metadata(&self.base_path).map(|m| m.len()).unwrap_or(0)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.base_path
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    pub fn max_rolls(&self) -> usize {
        self.max_rolls
    }

    /// Rolls performed by this instance
    pub fn rolls(&self) -> u64 {
        self.rolls
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{LogKind, LogLevel};
    use tempfile::tempdir;

    fn batch(size: usize) -> Vec<Arc<LogEntry>> {
        (0..size)
            .map(|i| {
                Arc::new(
                    LogEntry::new(LogLevel::Info, LogKind::App, "rolling")
                        .with_event_id(i as i32)
                        .with_message(format!("Test message number {}", i)),
                )
            })
            .collect()
    }

    #[test]
    fn test_creation_is_lazy() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("nested").join("test.log");

        let file = RollingFile::new(&log_path, 100, 2).unwrap();
        assert!(log_path.parent().unwrap().exists());
        assert!(!log_path.exists());
        assert_eq!(file.current_size(), 0);
        assert!(file.rolled_paths().is_empty());
    }

    #[test]
    fn test_append_writes_one_line_per_entry() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("append.log");
        let mut file = RollingFile::new(&log_path, 1_000_000, 2).unwrap();

        let written = file.append_batch(&batch(5)).unwrap();

        let content = fs::read_to_string(&log_path).unwrap();
        assert_eq!(content.lines().count(), 5);
        assert_eq!(written, content.len() as u64);
    }

    #[test]
    fn test_roll_keeps_at_most_max_rolls() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("rolling.log");
        let mut file = RollingFile::new(&log_path, 100, 2).unwrap();

        // Each batch is well over 100 bytes, so every later append rolls
        for _ in 0..4 {
            file.append_batch(&batch(3)).unwrap();
        }

        assert_eq!(file.rolls(), 3);
        assert!(log_path.exists());
        assert!(file.backup_path(1).exists());
        assert!(file.backup_path(2).exists());
        assert!(!file.backup_path(3).exists());
        assert_eq!(file.rolled_paths().len(), 3);
    }

    #[test]
    fn test_no_roll_below_threshold() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("small.log");
        let mut file = RollingFile::new(&log_path, 1_000_000, 2).unwrap();

        for _ in 0..10 {
            file.append_batch(&batch(2)).unwrap();
        }

        assert_eq!(file.rolls(), 0);
        assert!(!file.backup_path(1).exists());
    }

    #[test]
    fn test_higher_suffix_is_older() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("order.log");
        let mut file = RollingFile::new(&log_path, 10, 3).unwrap();

        for round in 0..3 {
            let entry = Arc::new(
                LogEntry::new(LogLevel::Info, LogKind::App, "order").with_event_id(round),
            );
            file.append_batch(&[entry]).unwrap();
        }

        let ids = |p: PathBuf| -> Vec<i32> {
            crate::persistence::read_records(p)
                .unwrap()
                .iter()
                .map(|e| e.event_id())
                .collect()
        };
        assert_eq!(ids(log_path.clone()), vec![2]);
        assert_eq!(ids(file.backup_path(1)), vec![1]);
        assert_eq!(ids(file.backup_path(2)), vec![0]);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_non_utf8_name_rolls_beside_itself() {
        use std::os::unix::ffi::OsStrExt;

        let dir = tempdir().unwrap();
        let log_path = dir.path().join(OsStr::from_bytes(b"app\xff.log"));
        let mut file = RollingFile::new(&log_path, 10, 2).unwrap();

        file.append_batch(&batch(1)).unwrap();
        file.append_batch(&batch(1)).unwrap();

        let rolled = dir.path().join(OsStr::from_bytes(b"app\xff.log.1"));
        assert_eq!(file.rolls(), 1);
        assert_eq!(file.backup_path(1), rolled);
        assert!(rolled.exists());
        assert_eq!(file.rolled_paths(), vec![log_path.clone(), rolled]);

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names.len(), 2);
    }

    #[test]
    fn test_empty_batch_creates_nothing() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("empty.log");
        let mut file = RollingFile::new(&log_path, 100, 1).unwrap();

        assert_eq!(file.append_batch(&[]).unwrap(), 0);
        assert!(!log_path.exists());
    }

    #[test]
    fn test_append_into_directory_fails() {
        let dir = tempdir().unwrap();
        let mut file = RollingFile::new(dir.path(), 1_000_000, 1).unwrap();

        assert!(file.append_batch(&batch(1)).is_err());
        assert!(dir.path().is_dir());
    }
}
