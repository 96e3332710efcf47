//! Snapshot backups.
//!
//! While snapshot mode is on, a [`SnapshotTimer`] ticks at the configured interval. The
//! coordinator polls it between commands and writes a backup of the active buffer, so a
//! backup never observes a document in the middle of an edit.

use crate::buffer::Buffer;
use crate::error::StoreError;
use crossbeam_channel::{Receiver, tick};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Periodic backup signal.
#[derive(Debug)]
pub struct SnapshotTimer {
    ticks: Receiver<Instant>,
    interval: Duration,
}

impl SnapshotTimer {
    /// Start ticking every `interval`.
    pub fn new(interval: Duration) -> Self {
        Self {
            ticks: tick(interval),
            interval,
        }
    }

    /// The tick interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Drain pending ticks. Returns `true` if at least one fired since the last call.
    pub fn due(&self) -> bool {
        self.ticks.try_iter().count() > 0
    }
}

/// Backup file name for `buffer`: its title plus the current time.
fn backup_file_name(buffer: &Buffer) -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    format!("{}@{secs}", buffer.title())
}

/// Write a backup of `buffer` into `dir`.
///
/// Nothing is written when the buffer is clean or unchanged since its last backup; a clean
/// buffer also loses its stale backup file. Returns the path written, if any.
pub fn write_backup(buffer: &mut Buffer, dir: &Path) -> Result<Option<PathBuf>, StoreError> {
    if !buffer.is_dirty() {
        if let Some(stale) = buffer.backup_path.take() {
            if let Err(err) = fs::remove_file(&stale) {
                log::warn!("could not remove backup '{}': {err}", stale.display());
            }
            buffer.backup_version = None;
        }
        return Ok(None);
    }
    let version = buffer.doc.version();
    if buffer.backup_version == Some(version) {
        return Ok(None);
    }

    fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;
    let path = match &buffer.backup_path {
        Some(existing) => existing.clone(),
        None => dir.join(backup_file_name(buffer)),
    };
    let bytes = buffer.encoding.encode(&buffer.doc.text());
    fs::write(&path, bytes).map_err(|e| StoreError::io(&path, e))?;
    buffer.backup_path = Some(path.clone());
    buffer.backup_version = Some(version);
    log::debug!("backed up {:?} to '{}'", buffer.id(), path.display());
    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::BufferId;
    use crate::document::Document;

    fn untitled(text: &str) -> Buffer {
        let mut doc = Document::new("");
        doc.replace(0, 0, text);
        Buffer::new(BufferId::new(1), None, "new 1".into(), doc)
    }

    #[test]
    fn backup_only_when_changed() {
        let dir = tempfile::tempdir().unwrap();
        let mut buffer = untitled("draft");
        let path = write_backup(&mut buffer, dir.path()).unwrap().unwrap();
        assert!(path.file_name().unwrap().to_string_lossy().starts_with("new 1@"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "draft");

        assert_eq!(write_backup(&mut buffer, dir.path()).unwrap(), None);

        buffer.doc.replace(5, 5, "!");
        assert_eq!(write_backup(&mut buffer, dir.path()).unwrap(), Some(path.clone()));
        assert_eq!(fs::read_to_string(&path).unwrap(), "draft!");
    }

    #[test]
    fn clean_buffer_drops_its_backup() {
        let dir = tempfile::tempdir().unwrap();
        let mut buffer = untitled("x");
        let path = write_backup(&mut buffer, dir.path()).unwrap().unwrap();
        buffer.doc.mark_saved();
        assert_eq!(write_backup(&mut buffer, dir.path()).unwrap(), None);
        assert!(!path.exists());
        assert!(buffer.backup_path().is_none());
    }

    #[test]
    fn missing_stale_backup_is_forgotten() {
        let dir = tempfile::tempdir().unwrap();
        let mut buffer = untitled("x");
        let path = write_backup(&mut buffer, dir.path()).unwrap().unwrap();
        fs::remove_file(&path).unwrap();
        buffer.doc.mark_saved();

        assert_eq!(write_backup(&mut buffer, dir.path()).unwrap(), None);
        assert!(buffer.backup_path().is_none());

        // The next edit starts a fresh backup.
        buffer.doc.replace(1, 1, "y");
        let fresh = write_backup(&mut buffer, dir.path()).unwrap().unwrap();
        assert_eq!(fs::read_to_string(&fresh).unwrap(), "xy");
    }

    #[test]
    fn timer_reports_ticks() {
        let timer = SnapshotTimer::new(Duration::from_millis(5));
        std::thread::sleep(Duration::from_millis(20));
        assert!(timer.due());
    }
}
