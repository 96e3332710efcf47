//! Buffers: logical open documents and their metadata.

use crate::document::Document;
use crate::encoding::Encoding;
use crate::surface::{Selection, SurfaceId, ViewState};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use twinpad_lang::LangType;

/// Opaque buffer identifier, unique for the lifetime of a [`crate::BufferStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BufferId(u64);

impl BufferId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw value.
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Relation between a buffer and its file on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskStatus {
    /// Never saved.
    Untitled,
    /// In sync with disk as far as we know.
    Regular,
    /// The file disappeared.
    Deleted,
    /// The file changed on disk since it was loaded or saved.
    Modified,
}

/// Cursor, scroll and fold state of a buffer in one view, kept while the buffer is not the
/// current tab of that view.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SavedPosition {
    /// Selection anchor.
    pub anchor: usize,
    /// Selection caret.
    pub caret: usize,
    /// First visible line.
    pub first_visible_line: usize,
    /// Horizontal scroll offset.
    pub x_offset: usize,
    /// Collapsed fold headers.
    #[serde(default)]
    pub collapsed: Vec<usize>,
}

impl SavedPosition {
    pub(crate) fn from_view(view: &ViewState) -> Self {
        Self {
            anchor: view.selection.anchor,
            caret: view.selection.caret,
            first_visible_line: view.first_visible_line,
            x_offset: view.x_offset,
            collapsed: view.collapsed.iter().copied().collect(),
        }
    }

    pub(crate) fn apply_to(&self, doc: &mut Document, id: SurfaceId) {
        let anchor = doc.snap(self.anchor);
        let caret = doc.snap(self.caret);
        let lines = doc.line_count();
        doc.attach_view(id);
        if let Some(view) = doc.view_mut(id) {
            view.selection = Selection::new(anchor, caret);
            view.extra_selections.clear();
            view.rectangular = false;
            view.first_visible_line = self.first_visible_line.min(lines.saturating_sub(1));
            view.x_offset = self.x_offset;
            view.collapsed = self
                .collapsed
                .iter()
                .copied()
                .filter(|l| *l < lines)
                .collect::<BTreeSet<_>>();
        }
    }
}

/// A logical open document.
#[derive(Debug)]
pub struct Buffer {
    id: BufferId,
    path: Option<PathBuf>,
    title: String,
    pub(crate) doc: Document,
    pub(crate) user_read_only: bool,
    pub(crate) sys_read_only: bool,
    pub(crate) encoding: Encoding,
    pub(crate) lang: LangType,
    pub(crate) monitoring: bool,
    pub(crate) last_modified: Option<SystemTime>,
    pub(crate) disk_status: DiskStatus,
    pub(crate) needs_reload: bool,
    pub(crate) forced_dirty: bool,
    pub(crate) references: Vec<SurfaceId>,
    pub(crate) positions: HashMap<SurfaceId, SavedPosition>,
    pub(crate) backup_path: Option<PathBuf>,
    pub(crate) backup_version: Option<u64>,
    pub(crate) map_first_line: usize,
}

impl Buffer {
    pub(crate) fn new(id: BufferId, path: Option<PathBuf>, title: String, doc: Document) -> Self {
        let disk_status = if path.is_some() {
            DiskStatus::Regular
        } else {
            DiskStatus::Untitled
        };
        Self {
            id,
            path,
            title,
            doc,
            user_read_only: false,
            sys_read_only: false,
            encoding: Encoding::default(),
            lang: LangType::default(),
            monitoring: false,
            last_modified: None,
            disk_status,
            needs_reload: false,
            forced_dirty: false,
            references: Vec::new(),
            positions: HashMap::new(),
            backup_path: None,
            backup_version: None,
            map_first_line: 0,
        }
    }

    /// Identifier.
    pub fn id(&self) -> BufferId {
        self.id
    }

    /// Full path, `None` for untitled buffers.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub(crate) fn set_path(&mut self, path: PathBuf) {
        self.title = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.path = Some(path);
        if self.disk_status == DiskStatus::Untitled {
            self.disk_status = DiskStatus::Regular;
        }
    }

    /// Display name: the file name, or `new N` for untitled buffers.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns `true` if the buffer was never saved.
    pub fn is_untitled(&self) -> bool {
        self.path.is_none()
    }

    /// The shared document.
    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Returns `true` when the buffer has unsaved changes.
    pub fn is_dirty(&self) -> bool {
        self.forced_dirty || self.doc.is_modified()
    }

    /// Returns `true` for the clean untitled placeholder a view keeps instead of going empty.
    pub fn is_clean_untitled(&self) -> bool {
        self.is_untitled() && !self.is_dirty()
    }

    /// Read-only by user choice.
    pub fn is_user_read_only(&self) -> bool {
        self.user_read_only
    }

    /// Read-only because the file is not writable.
    pub fn is_sys_read_only(&self) -> bool {
        self.sys_read_only
    }

    /// Read-only for either reason.
    pub fn is_read_only(&self) -> bool {
        self.user_read_only || self.sys_read_only
    }

    /// Encoding used on disk.
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Language.
    pub fn lang(&self) -> LangType {
        self.lang
    }

    /// Returns `true` while the file is being monitored for external changes.
    pub fn is_monitoring(&self) -> bool {
        self.monitoring
    }

    /// Last known modification time of the file.
    pub fn last_modified(&self) -> Option<SystemTime> {
        self.last_modified
    }

    /// Relation to disk.
    pub fn disk_status(&self) -> DiskStatus {
        self.disk_status
    }

    /// Returns `true` when a reload was deferred until the buffer becomes active.
    pub fn needs_reload(&self) -> bool {
        self.needs_reload
    }

    /// Number of views displaying this buffer.
    pub fn reference_count(&self) -> usize {
        self.references.len()
    }

    /// Views displaying this buffer.
    pub fn references(&self) -> &[SurfaceId] {
        &self.references
    }

    /// Saved state for `view`.
    pub fn saved_position(&self, view: SurfaceId) -> Option<&SavedPosition> {
        self.positions.get(&view)
    }

    /// Path of the last snapshot backup.
    pub fn backup_path(&self) -> Option<&Path> {
        self.backup_path.as_deref()
    }

    /// Document-map scroll position.
    pub fn map_first_line(&self) -> usize {
        self.map_first_line
    }

    pub(crate) fn add_reference(&mut self, view: SurfaceId) {
        if !self.references.contains(&view) {
            self.references.push(view);
        }
    }

    pub(crate) fn remove_reference(&mut self, view: SurfaceId) {
        self.references.retain(|v| *v != view);
        self.positions.remove(&view);
    }

    /// Store the live state of `view` so it can be restored when the buffer comes back.
    pub(crate) fn save_position(&mut self, view: SurfaceId) {
        if let Some(state) = self.doc.view(view) {
            self.positions.insert(view, SavedPosition::from_view(state));
        }
    }

    /// Attach `view` to the document, restoring its saved state.
    pub(crate) fn restore_position(&mut self, view: SurfaceId) {
        match self.positions.get(&view) {
            Some(pos) => pos.clone().apply_to(&mut self.doc, view),
            None => self.doc.attach_view(view),
        }
    }
}
