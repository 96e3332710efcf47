//! Command entry points against the active view.
//!
//! Each command resolves the current buffer of the active view, refuses to modify a read-only
//! buffer, and runs the matching transform through that view's surface. Results are the plain
//! `bool`/count/`Option` values of the transforms.

use crate::bookmarks;
use crate::braces;
use crate::buffer::{Buffer, BufferId};
use crate::comment::{self, CommentMode};
use crate::coordinator::DocumentCoordinator;
use crate::error::FindError;
use crate::events::RefreshScope;
use crate::guard::OperationGuard;
use crate::line_ending::LineEnding;
use crate::search::{self, CompiledSearch, FindOptions};
use crate::stats::{self, DocumentSummary};
use crate::surface::{SurfaceHandle, TextSurface};
use crate::whitespace::{self, Trim};
use twinpad_lang::LangType;

impl DocumentCoordinator {
    fn with_active<R>(&mut self, edit: impl FnOnce(&mut dyn TextSurface, LangType) -> R) -> Option<R> {
        let id = self.current_buffer()?;
        let view = self.active_view();
        let buffer = self.store.get_mut(id)?;
        let lang = buffer.lang();
        let mut surface = SurfaceHandle::new(&mut buffer.doc, view);
        Some(edit(&mut surface, lang))
    }

    /// Current buffer of the active view, unless it is read-only.
    fn writable_current(&self) -> Option<BufferId> {
        let id = self.current_buffer()?;
        if self.store.get(id).is_some_and(Buffer::is_read_only) {
            log::debug!("refusing to modify read-only {:?}", id);
            return None;
        }
        Some(id)
    }

    fn edit_active<R>(&mut self, edit: impl FnOnce(&mut dyn TextSurface, LangType) -> R) -> Option<R> {
        self.writable_current()?;
        let result = self.with_active(edit);
        self.refresh(RefreshScope::TabStrip(self.active_view()));
        result
    }

    /// Comment, uncomment or toggle the selected lines.
    pub fn comment_lines(&mut self, mode: CommentMode) -> bool {
        self.edit_active(|surface, lang| {
            comment::block_comment(surface, &lang.comment_config(), mode)
        })
        .unwrap_or(false)
    }

    /// Wrap the selection in the language's stream comment tokens.
    pub fn stream_comment(&mut self) -> bool {
        self.edit_active(|surface, lang| comment::stream_comment(surface, &lang.comment_config()))
            .unwrap_or(false)
    }

    /// Remove the stream comment around or inside the selection.
    pub fn stream_uncomment(&mut self) -> bool {
        self.edit_active(|surface, lang| {
            comment::stream_uncomment(surface, &lang.comment_config())
        })
        .unwrap_or(false)
    }

    /// Convert tabs to spaces in the current document.
    pub fn tabs_to_spaces(&mut self) -> bool {
        self.edit_active(|surface, _| whitespace::tabs_to_spaces(surface))
            .unwrap_or(false)
    }

    /// Convert spaces to tabs, everywhere or only in leading whitespace.
    pub fn spaces_to_tabs(&mut self, leading_only: bool) -> bool {
        self.edit_active(|surface, _| whitespace::spaces_to_tabs(surface, leading_only))
            .unwrap_or(false)
    }

    /// Convert every line break to `eol` and make it the document's line ending.
    pub fn convert_eol(&mut self, eol: LineEnding) -> bool {
        let Some(id) = self.writable_current() else {
            return false;
        };
        let changed = self
            .edit_active(|surface, _| whitespace::convert_eol(surface, eol))
            .unwrap_or(false);
        if let Some(buffer) = self.store.get_mut(id) {
            buffer.doc.set_eol(eol);
        }
        self.refresh(RefreshScope::StatusBar);
        changed
    }

    /// Trim blanks from the selected lines (or the whole document).
    pub fn trim_lines(&mut self, side: Trim) -> bool {
        self.edit_active(|surface, _| whitespace::trim_lines(surface, side))
            .unwrap_or(false)
    }

    /// Remove empty lines; with `include_blank`, also lines holding only blanks.
    pub fn remove_empty_lines(&mut self, include_blank: bool) -> bool {
        self.edit_active(|surface, _| whitespace::remove_empty_lines(surface, include_blank))
            .unwrap_or(false)
    }

    /// Remove lines equal to the line before them.
    pub fn remove_consecutive_duplicates(&mut self) -> bool {
        self.edit_active(|surface, _| whitespace::remove_consecutive_duplicates(surface))
            .unwrap_or(false)
    }

    /// Remove every repeated line, keeping the first occurrence.
    pub fn remove_duplicates(&mut self) -> bool {
        self.edit_active(|surface, _| whitespace::remove_duplicates(surface))
            .unwrap_or(false)
    }

    /// Re-indent after `ch` was typed, following the language's indentation style.
    pub fn maintain_indentation(&mut self, ch: char) {
        self.edit_active(|surface, lang| {
            braces::maintain_indentation(surface, ch, lang.indent_style())
        });
    }

    /// Move the caret to the brace matching the one at the caret.
    pub fn goto_matching_brace(&mut self) -> bool {
        self.with_active(|surface, _| braces::goto_matching_brace(surface))
            .unwrap_or(false)
    }

    /// Select through the brace matching the one at the caret.
    pub fn select_to_matching_brace(&mut self) -> bool {
        self.with_active(|surface, _| braces::select_to_matching_brace(surface))
            .unwrap_or(false)
    }

    /// Toggle the bookmark on the caret line.
    pub fn toggle_bookmark(&mut self) {
        self.with_active(|surface, _| {
            let line = surface.line_from_position(surface.selection().caret);
            bookmarks::toggle_bookmark(surface, line);
        });
    }

    /// Remove all bookmarks.
    pub fn clear_bookmarks(&mut self) {
        self.with_active(|surface, _| bookmarks::clear_bookmarks(surface));
    }

    /// Invert the bookmark of every line.
    pub fn invert_bookmarks(&mut self) {
        self.with_active(|surface, _| bookmarks::invert_bookmarks(surface));
    }

    /// Jump to the next (or previous) bookmark, wrapping around.
    pub fn goto_next_bookmark(&mut self, forward: bool) -> Option<usize> {
        self.with_active(|surface, _| bookmarks::goto_next_bookmark(surface, forward))
            .flatten()
    }

    /// Copy the bookmarked lines to the clipboard. Returns `false` if there are none or a
    /// bookmark operation is already running.
    pub fn copy_marked_lines(&mut self) -> bool {
        let guard = self.bookmark_guard.clone();
        let Some(_token) = guard.try_enter() else {
            return false;
        };
        let text = self
            .with_active(|surface, _| bookmarks::copy_marked_lines(surface))
            .unwrap_or_default();
        if text.is_empty() {
            return false;
        }
        self.clipboard.set_text(text);
        true
    }

    /// Move the bookmarked lines to the clipboard.
    pub fn cut_marked_lines(&mut self) -> bool {
        let guard = self.bookmark_guard.clone();
        let Some(_token) = guard.try_enter() else {
            return false;
        };
        let text = self
            .edit_active(|surface, _| bookmarks::cut_marked_lines(surface))
            .unwrap_or_default();
        if text.is_empty() {
            return false;
        }
        self.clipboard.set_text(text);
        true
    }

    /// Delete the bookmarked lines, or with `marked == false` every line without a bookmark.
    /// Returns the number of deleted lines.
    pub fn delete_lines(&mut self, marked: bool) -> usize {
        let guard = self.bookmark_guard.clone();
        let Some(_token) = guard.try_enter() else {
            return 0;
        };
        self.edit_active(|surface, _| bookmarks::delete_lines(surface, marked))
            .unwrap_or(0)
    }

    /// Replace the bookmarked lines with the clipboard lines. Returns the number replaced.
    pub fn paste_to_marked_lines(&mut self) -> usize {
        let guard = self.bookmark_guard.clone();
        let Some(_token) = guard.try_enter() else {
            return 0;
        };
        let Some(text) = self.clipboard.text() else {
            return 0;
        };
        self.edit_active(|surface, _| bookmarks::paste_to_marked_lines(surface, &text))
            .unwrap_or(0)
    }

    /// The guard serializing bookmark bulk operations.
    pub fn bookmark_guard(&self) -> &OperationGuard {
        &self.bookmark_guard
    }

    /// Bookmark every line of the current document holding a match.
    pub fn bookmark_matches(&mut self, options: &FindOptions) -> Result<usize, FindError> {
        let search = CompiledSearch::new(options)?;
        Ok(self
            .with_active(|surface, _| search.bookmark_matches(surface))
            .unwrap_or(0))
    }

    /// Select the next (or previous) match in the active view.
    pub fn find_next(
        &mut self,
        options: &FindOptions,
        forward: bool,
        wrap: bool,
    ) -> Result<Option<(usize, usize)>, FindError> {
        let search = CompiledSearch::new(options)?;
        Ok(self
            .with_active(|surface, _| search::find_next(surface, &search, forward, wrap))
            .flatten())
    }

    /// Replace the selected match and select the next one.
    pub fn replace_next(&mut self, options: &FindOptions, wrap: bool) -> Result<bool, FindError> {
        let search = CompiledSearch::new(options)?;
        Ok(self
            .edit_active(|surface, _| search::replace_next(surface, &search, wrap))
            .unwrap_or(false))
    }

    /// Count matches in the current document.
    pub fn count_matches(&mut self, options: &FindOptions) -> Result<usize, FindError> {
        let search = CompiledSearch::new(options)?;
        Ok(self
            .with_active(|surface, _| search.count(&surface.text()))
            .unwrap_or(0))
    }

    /// Replace every match in the current document, in one undo group.
    pub fn replace_all(&mut self, options: &FindOptions) -> Result<usize, FindError> {
        let search = CompiledSearch::new(options)?;
        Ok(self
            .edit_active(|surface, _| search.replace_all(surface))
            .unwrap_or(0))
    }

    /// Undo the last edit group of the current document.
    pub fn undo(&mut self) -> bool {
        let Some(id) = self.writable_current() else {
            return false;
        };
        self.store.get_mut(id).is_some_and(|b| b.doc.undo())
    }

    /// Redo the last undone edit group of the current document.
    pub fn redo(&mut self) -> bool {
        let Some(id) = self.writable_current() else {
            return false;
        };
        self.store.get_mut(id).is_some_and(|b| b.doc.redo())
    }

    /// Counts for the current document.
    pub fn summary(&self) -> DocumentSummary {
        self.current_buffer()
            .and_then(|id| self.store.get(id))
            .map(|b| stats::summarize(b.document(), self.config.parallel_count_threshold))
            .unwrap_or_default()
    }
}
