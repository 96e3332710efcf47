//! Session capture and restore.
//!
//! A [`Session`] lists, per view, the files shown in its tab strip with everything needed to
//! bring them back: language, encoding, read-only flag, cursor and scroll position, backup
//! file, bookmarks and collapsed folds. The records derive `serde` traits; the on-disk format
//! is up to the caller.

use crate::buffer::{Buffer, BufferId, DiskStatus, SavedPosition};
use crate::coordinator::DocumentCoordinator;
use crate::encoding::{Encoding, sniff_and_decode};
use crate::surface::SurfaceId;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use twinpad_lang::LangType;

/// One tab of a view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionFile {
    /// Absolute path; `None` for an untitled buffer restored from its backup.
    pub path: Option<PathBuf>,
    /// Tab title.
    pub title: String,
    /// Language name.
    pub lang: String,
    /// Encoding label.
    pub encoding: String,
    /// User read-only flag.
    pub read_only: bool,
    /// Cursor and scroll position in this view.
    pub position: SavedPosition,
    /// Snapshot backup holding unsaved content.
    pub backup_path: Option<PathBuf>,
    /// Last known modification time of the file, in seconds since the Unix epoch.
    pub last_modified: Option<u64>,
    /// Document-map scroll position.
    pub map_first_line: usize,
    /// Bookmarked lines.
    pub bookmarks: Vec<usize>,
    /// Collapsed fold headers.
    pub folds: Vec<usize>,
}

/// The tabs of one view.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ViewSession {
    /// Index of the current tab in `files`.
    pub active_index: usize,
    /// Tabs in strip order.
    pub files: Vec<SessionFile>,
}

/// Both views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Main view tabs.
    pub main: ViewSession,
    /// Secondary view tabs.
    pub secondary: ViewSession,
    /// The view that had focus.
    pub active_view: SurfaceId,
}

/// Result of [`DocumentCoordinator::restore_session`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    /// Buffers opened.
    pub restored: usize,
    /// Files that were neither on disk nor in a backup.
    pub missing: Vec<PathBuf>,
}

fn epoch_secs(time: SystemTime) -> Option<u64> {
    time.duration_since(UNIX_EPOCH).ok().map(|d| d.as_secs())
}

fn session_file(buffer: &Buffer, view: SurfaceId, current: bool) -> SessionFile {
    let doc = buffer.document();
    let position = match doc.view(view) {
        Some(state) if current => SavedPosition::from_view(state),
        _ => buffer.saved_position(view).cloned().unwrap_or_default(),
    };
    SessionFile {
        path: buffer.path().map(Path::to_path_buf),
        title: buffer.title().to_string(),
        lang: buffer.lang().name().to_string(),
        encoding: buffer.encoding().label().to_string(),
        read_only: buffer.is_user_read_only(),
        folds: position.collapsed.clone(),
        position,
        backup_path: buffer.backup_path().map(Path::to_path_buf),
        last_modified: buffer.last_modified().and_then(epoch_secs),
        map_first_line: buffer.map_first_line(),
        bookmarks: doc.bookmarked_lines(),
    }
}

impl DocumentCoordinator {
    /// Capture both views. Untitled buffers without a backup are left out.
    pub fn capture_session(&self) -> Session {
        let capture = |view: SurfaceId| {
            let mut session = ViewSession::default();
            let Some(slot) = self.view_slot(view) else {
                return session;
            };
            for id in slot.tabs() {
                let Some(buffer) = self.store.get(*id) else {
                    continue;
                };
                if buffer.is_untitled() && buffer.backup_path().is_none() {
                    continue;
                }
                if slot.current() == Some(*id) {
                    session.active_index = session.files.len();
                }
                session
                    .files
                    .push(session_file(buffer, view, slot.current() == Some(*id)));
            }
            session
        };
        Session {
            main: capture(SurfaceId::Main),
            secondary: capture(SurfaceId::Secondary),
            active_view: self.active_view(),
        }
    }

    /// Reopen the files of `session` in their views.
    ///
    /// Files missing on disk come back from their backup when one exists. Language, read-only
    /// state, encoding, position, bookmarks and folds are re-applied, then each view's recorded
    /// tab and the recorded active view are activated.
    pub fn restore_session(&mut self, session: &Session) -> RestoreReport {
        let mut report = RestoreReport::default();
        for (view, view_session) in [
            (SurfaceId::Main, &session.main),
            (SurfaceId::Secondary, &session.secondary),
        ] {
            let mut bound = Vec::new();
            for file in &view_session.files {
                match self.restore_file(file, view) {
                    Some(id) => {
                        report.restored += 1;
                        bound.push(Some(id));
                    }
                    None => {
                        if let Some(path) = &file.path {
                            report.missing.push(path.clone());
                        }
                        bound.push(None);
                    }
                }
            }
            let active = bound
                .get(view_session.active_index)
                .copied()
                .flatten()
                .or_else(|| bound.iter().flatten().next().copied());
            if let Some(id) = active {
                if !self.is_visible(view) {
                    self.show_view(view);
                }
                self.activate_buffer(id, view);
            }
        }
        if self.is_visible(session.active_view) {
            self.switch_active_view(session.active_view);
        }
        report
    }

    fn restore_file(&mut self, file: &SessionFile, view: SurfaceId) -> Option<BufferId> {
        let on_disk = file.path.as_deref().filter(|p| p.is_file());
        let id = match on_disk {
            Some(path) => match self.store.load(path) {
                Ok(id) => id,
                Err(err) => {
                    log::warn!("session: could not open '{}': {err}", path.display());
                    return None;
                }
            },
            None => self.restore_from_backup(file)?,
        };

        if let Some(encoding) = Encoding::from_label(&file.encoding) {
            let current = self.store.get(id).map(Buffer::encoding);
            if on_disk.is_some() && current != Some(encoding) {
                if let Err(err) = self.store.reload_with_encoding(id, encoding) {
                    log::debug!("session: keeping detected encoding: {err}");
                }
            } else if let Some(buffer) = self.store.get_mut(id) {
                buffer.encoding = encoding;
            }
        }

        let buffer = self.store.get_mut(id)?;
        if let Some(lang) = LangType::from_name(&file.lang) {
            buffer.lang = lang;
        }
        buffer.user_read_only = file.read_only;
        buffer.map_first_line = file.map_first_line;
        if buffer.backup_path.is_none() {
            buffer.backup_path = file.backup_path.clone();
        }
        if on_disk.is_none()
            && let Some(secs) = file.last_modified
        {
            buffer.last_modified = Some(UNIX_EPOCH + Duration::from_secs(secs));
        }
        let lines = buffer.doc.line_count();
        for line in file.bookmarks.iter().filter(|l| **l < lines) {
            buffer.doc.set_bookmark(*line, true);
        }
        let mut position = file.position.clone();
        position.collapsed = file.folds.clone();
        buffer.positions.insert(view, position);

        self.bind_buffer_to_view(id, view, true);
        Some(id)
    }

    /// Create a buffer from the backup of `file`, dirty, keeping its original path if any.
    fn restore_from_backup(&mut self, file: &SessionFile) -> Option<BufferId> {
        let backup = file.backup_path.as_deref()?;
        let bytes = fs::read(backup)
            .map_err(|err| log::warn!("session: backup '{}' unreadable: {err}", backup.display()))
            .ok()?;
        let (text, encoding) = sniff_and_decode(&bytes, usize::MAX, self.config.fallback_encoding());
        let id = self.store.new_with_content(file.title.clone(), &text);
        let buffer = self.store.get_mut(id)?;
        buffer.encoding = encoding;
        buffer.backup_path = Some(backup.to_path_buf());
        if let Some(path) = &file.path {
            buffer.set_path(path.clone());
            buffer.disk_status = DiskStatus::Deleted;
            if let Some(lang) = LangType::from_name(&file.lang) {
                buffer.lang = lang;
            }
        }
        log::info!("restored {:?} from backup '{}'", id, backup.display());
        Some(id)
    }
}
