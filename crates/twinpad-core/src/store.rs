//! The buffer store: the process-wide set of open buffers.

use crate::buffer::{Buffer, BufferId, DiskStatus};
use crate::document::Document;
use crate::encoding::{Encoding, sniff_and_decode};
use crate::error::StoreError;
use crate::surface::SurfaceId;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use twinpad_lang::LangType;

/// Settings applied to every buffer the store creates.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Tab width for new documents.
    pub tab_width: usize,
    /// Indent with tabs.
    pub use_tabs: bool,
    /// Largest input handed to the encoding detector.
    pub detection_cap: usize,
    /// Encoding used when detection is skipped.
    pub fallback: &'static encoding_rs::Encoding,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            tab_width: 4,
            use_tabs: true,
            detection_cap: 64 * 1024,
            fallback: encoding_rs::WINDOWS_1252,
        }
    }
}

/// What changed on disk since the last check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileCheck {
    /// The file no longer exists (first detection only).
    pub deleted: bool,
    /// The file reappeared after having been deleted.
    pub restored: bool,
    /// The modification time moved.
    pub modified: bool,
    /// New system read-only state, when it flipped.
    pub read_only_changed: Option<bool>,
}

impl FileCheck {
    /// Returns `true` if nothing changed.
    pub fn is_unchanged(&self) -> bool {
        *self == Self::default()
    }
}

/// Owns every open buffer.
#[derive(Debug)]
pub struct BufferStore {
    buffers: Vec<Buffer>,
    next_id: u64,
    options: StoreOptions,
}

impl BufferStore {
    /// Create an empty store.
    pub fn new(options: StoreOptions) -> Self {
        Self {
            buffers: Vec::new(),
            next_id: 1,
            options,
        }
    }

    fn allocate_id(&mut self) -> BufferId {
        let id = BufferId::new(self.next_id);
        self.next_id += 1;
        id
    }

    fn new_document(&self, text: &str) -> Document {
        let mut doc = Document::new(text);
        doc.set_indent_settings(self.options.tab_width, self.options.use_tabs);
        doc
    }

    /// Create an untitled buffer named `new N`, with the lowest `N` not in use.
    pub fn new_empty(&mut self) -> BufferId {
        let mut n = 1;
        while self.buffers.iter().any(|b| b.is_untitled() && b.title() == format!("new {n}")) {
            n += 1;
        }
        let id = self.allocate_id();
        let doc = self.new_document("");
        self.buffers
            .push(Buffer::new(id, None, format!("new {n}"), doc));
        log::debug!("created untitled buffer {:?} 'new {n}'", id);
        id
    }

    /// Create an untitled buffer with `title` and `text`; the text counts as unsaved.
    pub(crate) fn new_with_content(&mut self, title: String, text: &str) -> BufferId {
        let id = self.allocate_id();
        let mut doc = self.new_document("");
        doc.replace(0, 0, text);
        self.buffers.push(Buffer::new(id, None, title, doc));
        id
    }

    /// Load `path`. An already open path returns the existing buffer.
    pub fn load(&mut self, path: &Path) -> Result<BufferId, StoreError> {
        if let Some(id) = self.find_by_path(path) {
            return Ok(id);
        }
        let bytes = fs::read(path).map_err(|e| StoreError::io(path, e))?;
        let (text, encoding) =
            sniff_and_decode(&bytes, self.options.detection_cap, self.options.fallback);

        let id = self.allocate_id();
        let doc = self.new_document(&text);
        let first_line = text.lines().next().unwrap_or_default();
        let mut buffer = Buffer::new(id, None, String::new(), doc);
        buffer.set_path(absolute(path));
        buffer.encoding = encoding;
        buffer.lang = LangType::detect(path, first_line);
        self.refresh_metadata(&mut buffer, path);

        log::info!(
            "loaded '{}' as {:?} ({}, {})",
            path.display(),
            id,
            encoding.label(),
            buffer.lang.name()
        );
        self.buffers.push(buffer);
        Ok(id)
    }

    fn refresh_metadata(&self, buffer: &mut Buffer, path: &Path) {
        if let Ok(meta) = fs::metadata(path) {
            buffer.sys_read_only = meta.permissions().readonly();
            buffer.last_modified = meta.modified().ok();
        }
    }

    /// Write buffer `id` to `path`, or to its own path when `path` is `None`.
    pub fn save(&mut self, id: BufferId, path: Option<&Path>) -> Result<(), StoreError> {
        let target = match path {
            Some(p) => absolute(p),
            None => self
                .get(id)
                .ok_or(StoreError::BufferNotFound(id))?
                .path()
                .map(Path::to_path_buf)
                .ok_or(StoreError::Untitled)?,
        };
        if let Some(other) = self.find_by_path(&target)
            && other != id
        {
            return Err(StoreError::AlreadyOpen(target));
        }

        let buffer = self.get(id).ok_or(StoreError::BufferNotFound(id))?;
        let bytes = buffer.encoding.encode(&buffer.doc.text());
        fs::write(&target, bytes).map_err(|e| StoreError::io(&target, e))?;

        let mut buffer_meta = fs::metadata(&target).ok();
        let buffer = self.get_mut(id).ok_or(StoreError::BufferNotFound(id))?;
        if buffer.path() != Some(target.as_path()) {
            buffer.set_path(target.clone());
            if buffer.lang == LangType::Text {
                let first = buffer.doc.line_text(0);
                buffer.lang = LangType::detect(&target, &first);
            }
        }
        buffer.doc.mark_saved();
        buffer.forced_dirty = false;
        buffer.needs_reload = false;
        buffer.disk_status = DiskStatus::Regular;
        if let Some(meta) = buffer_meta.take() {
            buffer.last_modified = meta.modified().ok();
            buffer.sys_read_only = meta.permissions().readonly();
        }
        if let Some(backup) = buffer.backup_path.take() {
            if let Err(err) = fs::remove_file(&backup) {
                log::warn!("could not remove backup '{}': {err}", backup.display());
            }
            buffer.backup_version = None;
        }
        log::info!("saved {:?} to '{}'", id, target.display());
        Ok(())
    }

    /// Re-read buffer `id` from disk in its current encoding, discarding edits and undo.
    pub fn reload(&mut self, id: BufferId) -> Result<(), StoreError> {
        let encoding = self.get(id).ok_or(StoreError::BufferNotFound(id))?.encoding;
        self.reload_as(id, encoding, false)
    }

    /// Re-read buffer `id` from disk interpreting it as `encoding`.
    pub fn reload_with_encoding(
        &mut self,
        id: BufferId,
        encoding: Encoding,
    ) -> Result<(), StoreError> {
        self.reload_as(id, encoding, true)
    }

    fn reload_as(&mut self, id: BufferId, encoding: Encoding, strict: bool) -> Result<(), StoreError> {
        let path = self
            .get(id)
            .ok_or(StoreError::BufferNotFound(id))?
            .path()
            .map(Path::to_path_buf)
            .ok_or(StoreError::Untitled)?;
        let bytes = fs::read(&path).map_err(|e| StoreError::io(&path, e))?;
        let (text, encoding) = match encoding.decode(&bytes) {
            Some(text) => (text, encoding),
            None if strict => {
                return Err(StoreError::Decode {
                    path,
                    encoding: encoding.label().to_string(),
                });
            }
            None => sniff_and_decode(&bytes, self.options.detection_cap, self.options.fallback),
        };

        let mut buffer_meta = fs::metadata(&path).ok();
        let buffer = self.get_mut(id).ok_or(StoreError::BufferNotFound(id))?;
        buffer.doc.reset(&text);
        buffer.encoding = encoding;
        buffer.forced_dirty = false;
        buffer.needs_reload = false;
        buffer.disk_status = DiskStatus::Regular;
        if let Some(meta) = buffer_meta.take() {
            buffer.last_modified = meta.modified().ok();
            buffer.sys_read_only = meta.permissions().readonly();
        }
        log::info!("reloaded {:?} from '{}'", id, path.display());
        Ok(())
    }

    /// Remove buffer `id` from the store.
    pub fn close(&mut self, id: BufferId) -> Option<Buffer> {
        let index = self.index_of(id)?;
        let buffer = self.buffers.remove(index);
        log::debug!("closed buffer {:?} '{}'", id, buffer.title());
        Some(buffer)
    }

    /// Buffer by id.
    pub fn get(&self, id: BufferId) -> Option<&Buffer> {
        self.buffers.iter().find(|b| b.id() == id)
    }

    /// Mutable buffer by id.
    pub fn get_mut(&mut self, id: BufferId) -> Option<&mut Buffer> {
        self.buffers.iter_mut().find(|b| b.id() == id)
    }

    /// Buffer by position in opening order.
    pub fn get_by_index(&self, index: usize) -> Option<&Buffer> {
        self.buffers.get(index)
    }

    /// Position of `id` in opening order.
    pub fn index_of(&self, id: BufferId) -> Option<usize> {
        self.buffers.iter().position(|b| b.id() == id)
    }

    /// Buffer whose file is `path`.
    pub fn find_by_path(&self, path: &Path) -> Option<BufferId> {
        let wanted = absolute(path);
        self.buffers
            .iter()
            .find(|b| b.path().is_some_and(|p| same_file(p, &wanted)))
            .map(Buffer::id)
    }

    /// Number of open buffers.
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    /// Returns `true` if no buffer is open.
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Iterate in opening order.
    pub fn iter(&self) -> impl Iterator<Item = &Buffer> {
        self.buffers.iter()
    }

    /// Record that `view` displays buffer `id`. Returns the new reference count.
    pub fn add_reference(&mut self, id: BufferId, view: SurfaceId) -> usize {
        match self.get_mut(id) {
            Some(buffer) => {
                buffer.add_reference(view);
                buffer.reference_count()
            }
            None => 0,
        }
    }

    /// Record that `view` no longer displays buffer `id`. Returns the remaining count.
    pub fn remove_reference(&mut self, id: BufferId, view: SurfaceId) -> usize {
        match self.get_mut(id) {
            Some(buffer) => {
                buffer.remove_reference(view);
                buffer.reference_count()
            }
            None => 0,
        }
    }

    /// Compare buffer `id` against its file and record what changed.
    pub fn check_file(&mut self, id: BufferId) -> FileCheck {
        let Some(buffer) = self.get_mut(id) else {
            return FileCheck::default();
        };
        let Some(path) = buffer.path().map(Path::to_path_buf) else {
            return FileCheck::default();
        };

        let mut check = FileCheck::default();
        match fs::metadata(&path) {
            Err(_) => {
                if buffer.disk_status != DiskStatus::Deleted {
                    buffer.disk_status = DiskStatus::Deleted;
                    check.deleted = true;
                }
            }
            Ok(meta) => {
                if buffer.disk_status == DiskStatus::Deleted {
                    buffer.disk_status = DiskStatus::Regular;
                    check.restored = true;
                }
                let read_only = meta.permissions().readonly();
                if read_only != buffer.sys_read_only {
                    buffer.sys_read_only = read_only;
                    check.read_only_changed = Some(read_only);
                }
                let modified: Option<SystemTime> = meta.modified().ok();
                if modified.is_some() && modified != buffer.last_modified {
                    buffer.last_modified = modified;
                    if !check.restored {
                        buffer.disk_status = DiskStatus::Modified;
                    }
                    check.modified = true;
                }
            }
        }
        check
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn untitled_names_reuse_lowest_free_number() {
        let mut store = BufferStore::new(StoreOptions::default());
        let a = store.new_empty();
        let b = store.new_empty();
        assert_eq!(store.get(b).unwrap().title(), "new 2");
        store.close(a);
        let c = store.new_empty();
        assert_eq!(store.get(c).unwrap().title(), "new 1");
        assert_ne!(a, c);
    }

    #[test]
    fn load_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.rs");
        fs::File::create(&path)
            .unwrap()
            .write_all(b"fn main() {}\r\n")
            .unwrap();

        let mut store = BufferStore::new(StoreOptions::default());
        let id = store.load(&path).unwrap();
        assert_eq!(store.load(&path).unwrap(), id);
        let buffer = store.get(id).unwrap();
        assert_eq!(buffer.lang(), LangType::Rust);
        assert_eq!(buffer.title(), "hello.rs");
        assert_eq!(buffer.document().eol(), crate::LineEnding::Crlf);
        assert!(!buffer.is_dirty());

        store.get_mut(id).unwrap().doc.replace(0, 0, "// x\r\n");
        assert!(store.get(id).unwrap().is_dirty());
        store.save(id, None).unwrap();
        assert!(!store.get(id).unwrap().is_dirty());
        assert_eq!(fs::read_to_string(&path).unwrap(), "// x\r\nfn main() {}\r\n");
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let mut store = BufferStore::new(StoreOptions::default());
        let err = store.load(Path::new("/definitely/not/here.txt")).unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
    }

    #[test]
    fn untitled_save_needs_a_path() {
        let mut store = BufferStore::new(StoreOptions::default());
        let id = store.new_empty();
        assert!(matches!(store.save(id, None), Err(StoreError::Untitled)));
    }
}
