//! The document model.
//!
//! A [`Document`] owns the text (a `ropey` rope), one [`LineMarks`] entry per line, the undo
//! history and the per-surface [`ViewState`]s. Every edit funnels through
//! [`Document::replace`], which keeps the attached views, the line marks and the collapsed fold
//! headers consistent with the new text.
//!
//! Position shifting follows the usual editing-widget rules:
//!
//! - insertion at `p`: positions strictly after `p` move by the inserted length;
//! - deletion of `[s, e)`: positions inside collapse to `s`, positions after `e` move back.

use crate::line_ending::LineEnding;
use crate::surface::{Selection, SurfaceId, ViewState};
use bitflags::bitflags;
use ropey::Rope;
use std::collections::{BTreeMap, BTreeSet};

bitflags! {
    /// Per-line marker bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct LineMarks: u32 {
        /// User bookmark.
        const BOOKMARK = 1;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct TextEdit {
    start: usize,
    deleted: String,
    inserted: String,
}

#[derive(Debug, Clone, Default)]
struct UndoStep {
    edits: Vec<TextEdit>,
}

/// Linear undo/redo history with nested grouping and a save point.
#[derive(Debug)]
struct UndoHistory {
    undo_stack: Vec<UndoStep>,
    redo_stack: Vec<UndoStep>,
    max_undo: usize,
    /// Save point as an `undo_stack` length. `None` once the saved state became unreachable.
    clean_index: Option<usize>,
    group_depth: usize,
    group_open: bool,
}

impl UndoHistory {
    fn new(max_undo: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_undo,
            clean_index: Some(0),
            group_depth: 0,
            group_open: false,
        }
    }

    fn is_clean(&self) -> bool {
        self.clean_index == Some(self.undo_stack.len())
    }

    fn mark_clean(&mut self) {
        self.clean_index = Some(self.undo_stack.len());
        self.group_open = false;
    }

    fn begin_group(&mut self) {
        if self.group_depth == 0 {
            self.group_open = false;
        }
        self.group_depth += 1;
    }

    fn end_group(&mut self) {
        self.group_depth = self.group_depth.saturating_sub(1);
        if self.group_depth == 0 {
            self.group_open = false;
        }
    }

    fn clear_redo_and_adjust_clean(&mut self) {
        if self.redo_stack.is_empty() {
            return;
        }
        if let Some(clean_index) = self.clean_index
            && clean_index > self.undo_stack.len()
        {
            self.clean_index = None;
        }
        self.redo_stack.clear();
    }

    fn record(&mut self, edit: TextEdit) {
        self.clear_redo_and_adjust_clean();

        if self.group_depth > 0
            && self.group_open
            && let Some(step) = self.undo_stack.last_mut()
        {
            step.edits.push(edit);
            return;
        }

        if self.undo_stack.len() >= self.max_undo {
            self.undo_stack.remove(0);
            self.clean_index = match self.clean_index {
                Some(0) | None => None,
                Some(i) => Some(i - 1),
            };
        }
        self.undo_stack.push(UndoStep { edits: vec![edit] });
        self.group_open = self.group_depth > 0;
    }

    fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.clean_index = Some(0);
        self.group_open = false;
    }
}

/// Shared text of a buffer plus the state of every surface showing it.
#[derive(Debug)]
pub struct Document {
    text: Rope,
    marks: Vec<LineMarks>,
    history: UndoHistory,
    views: BTreeMap<SurfaceId, ViewState>,
    version: u64,
    tab_width: usize,
    use_tabs: bool,
    eol: LineEnding,
}

impl Default for Document {
    fn default() -> Self {
        Self::new("")
    }
}

impl Document {
    /// Create a document. The line ending is detected from `text`.
    pub fn new(text: &str) -> Self {
        let rope = Rope::from_str(text);
        let lines = rope.len_lines();
        Self {
            text: rope,
            marks: vec![LineMarks::empty(); lines],
            history: UndoHistory::new(1000),
            views: BTreeMap::new(),
            version: 0,
            tab_width: 4,
            use_tabs: true,
            eol: LineEnding::detect_in_text(text),
        }
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.text.len_bytes()
    }

    /// Returns `true` for an empty document.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whole text.
    pub fn text(&self) -> String {
        self.text.to_string()
    }

    /// Text of `[start, end)`, snapped to character boundaries.
    pub fn slice(&self, start: usize, end: usize) -> String {
        let start = self.snap(start);
        let end = self.snap(end).max(start);
        self.text
            .slice(self.text.byte_to_char(start)..self.text.byte_to_char(end))
            .to_string()
    }

    /// Raw byte at `pos`.
    pub fn byte_at(&self, pos: usize) -> Option<u8> {
        (pos < self.len()).then(|| self.text.byte(pos))
    }

    /// Clamp `pos` to the text and round it down to a character boundary.
    pub fn snap(&self, pos: usize) -> usize {
        let pos = pos.min(self.len());
        self.text.char_to_byte(self.text.byte_to_char(pos))
    }

    /// Edit counter, bumped on every change.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Number of lines.
    pub fn line_count(&self) -> usize {
        self.text.len_lines()
    }

    /// Line containing `pos`.
    pub fn line_from_position(&self, pos: usize) -> usize {
        self.text.byte_to_line(pos.min(self.len()))
    }

    /// First byte of `line`; `len()` past the last line.
    pub fn line_start(&self, line: usize) -> usize {
        if line >= self.line_count() {
            return self.len();
        }
        self.text.line_to_byte(line)
    }

    /// End of `line` excluding its line break.
    pub fn line_end(&self, line: usize) -> usize {
        if line + 1 >= self.line_count() {
            return self.len();
        }
        let next = self.text.line_to_byte(line + 1);
        let mut end = next;
        if end > 0 && self.text.byte(end - 1) == b'\n' {
            end -= 1;
        }
        if end > 0 && self.text.byte(end - 1) == b'\r' {
            end -= 1;
        }
        end
    }

    /// Text of `line` without its line break.
    pub fn line_text(&self, line: usize) -> String {
        self.slice(self.line_start(line), self.line_end(line))
    }

    /// Tab width.
    pub fn tab_width(&self) -> usize {
        self.tab_width
    }

    /// Whether indentation uses tabs.
    pub fn use_tabs(&self) -> bool {
        self.use_tabs
    }

    /// Update indentation settings.
    pub fn set_indent_settings(&mut self, tab_width: usize, use_tabs: bool) {
        self.tab_width = tab_width.max(1);
        self.use_tabs = use_tabs;
    }

    /// Line ending for new line breaks.
    pub fn eol(&self) -> LineEnding {
        self.eol
    }

    /// Change the line ending for new line breaks. Existing text is untouched.
    pub fn set_eol(&mut self, eol: LineEnding) {
        self.eol = eol;
    }

    /// Replace `[start, end)` with `text`, recording the edit for undo.
    pub fn replace(&mut self, start: usize, end: usize, text: &str) {
        let start = self.snap(start);
        let end = self.snap(end).max(start);
        if start == end && text.is_empty() {
            return;
        }
        let deleted = self.slice(start, end);
        if deleted == text {
            return;
        }
        self.apply(start, end, text);
        self.history.record(TextEdit {
            start,
            deleted,
            inserted: text.to_string(),
        });
    }

    /// Replace the whole text. Line marks and collapsed folds are cleared.
    pub fn set_text(&mut self, text: &str) {
        let len = self.len();
        self.replace(0, len, text);
        self.marks = vec![LineMarks::empty(); self.line_count()];
        for view in self.views.values_mut() {
            view.collapsed.clear();
        }
    }

    /// Replace the text without recording undo and mark the result as saved.
    pub fn reset(&mut self, text: &str) {
        let len = self.len();
        self.apply(0, len, text);
        self.marks = vec![LineMarks::empty(); self.line_count()];
        for view in self.views.values_mut() {
            view.collapsed.clear();
            view.selection = Selection::default();
            view.extra_selections.clear();
        }
        self.history.clear();
        self.eol = LineEnding::detect_in_text(text);
    }

    fn apply(&mut self, start: usize, end: usize, text: &str) {
        let start_line = self.line_from_position(start);
        let end_line = self.line_from_position(end);
        let pure_insert_at_line_start = start == end && start == self.line_start(start_line);

        let char_start = self.text.byte_to_char(start);
        let char_end = self.text.byte_to_char(end);
        self.text.remove(char_start..char_end);
        self.text.insert(char_start, text);
        self.version += 1;

        let deleted_len = end - start;
        let inserted_len = text.len();
        let removed_lines = end_line - start_line;
        let added_lines = self.line_from_position(start + inserted_len) - start_line;

        if pure_insert_at_line_start {
            self.marks.splice(
                start_line..start_line,
                std::iter::repeat_n(LineMarks::empty(), added_lines),
            );
        } else {
            let merged = self.marks[start_line..=end_line]
                .iter()
                .fold(LineMarks::empty(), |acc, m| acc | *m);
            self.marks
                .splice(start_line..=end_line, std::iter::once(merged));
            self.marks.splice(
                start_line + 1..start_line + 1,
                std::iter::repeat_n(LineMarks::empty(), added_lines),
            );
        }
        self.marks.resize(self.line_count(), LineMarks::empty());

        let shift_pos = |pos: usize| -> usize {
            let pos = if pos > start {
                if pos >= end { pos - deleted_len } else { start }
            } else {
                pos
            };
            if pos > start { pos + inserted_len } else { pos }
        };
        let shift_line = |line: usize| -> Option<usize> {
            if pure_insert_at_line_start {
                return Some(if line >= start_line { line + added_lines } else { line });
            }
            if line <= start_line {
                Some(line)
            } else if line <= end_line {
                None
            } else {
                Some(line - removed_lines + added_lines)
            }
        };

        for view in self.views.values_mut() {
            view.selection = Selection::new(
                shift_pos(view.selection.anchor),
                shift_pos(view.selection.caret),
            );
            for sel in &mut view.extra_selections {
                *sel = Selection::new(shift_pos(sel.anchor), shift_pos(sel.caret));
            }
            view.collapsed = view.collapsed.iter().filter_map(|l| shift_line(*l)).collect();
        }
    }

    /// Open an undo group.
    pub fn begin_undo_group(&mut self) {
        self.history.begin_group();
    }

    /// Close an undo group.
    pub fn end_undo_group(&mut self) {
        self.history.end_group();
    }

    /// Returns `true` if there is something to undo.
    pub fn can_undo(&self) -> bool {
        !self.history.undo_stack.is_empty()
    }

    /// Returns `true` if there is something to redo.
    pub fn can_redo(&self) -> bool {
        !self.history.redo_stack.is_empty()
    }

    /// Undo the last step. Returns `false` when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        self.history.group_open = false;
        let Some(step) = self.history.undo_stack.pop() else {
            return false;
        };
        for edit in step.edits.iter().rev() {
            self.apply(edit.start, edit.start + edit.inserted.len(), &edit.deleted);
        }
        self.history.redo_stack.push(step);
        true
    }

    /// Redo the last undone step.
    pub fn redo(&mut self) -> bool {
        self.history.group_open = false;
        let Some(step) = self.history.redo_stack.pop() else {
            return false;
        };
        for edit in &step.edits {
            self.apply(edit.start, edit.start + edit.deleted.len(), &edit.inserted);
        }
        self.history.undo_stack.push(step);
        true
    }

    /// Returns `true` if the text differs from the save point.
    pub fn is_modified(&self) -> bool {
        !self.history.is_clean()
    }

    /// Record the current state as saved.
    pub fn mark_saved(&mut self) {
        self.history.mark_clean();
    }

    /// Marks of `line`.
    pub fn marks(&self, line: usize) -> LineMarks {
        self.marks.get(line).copied().unwrap_or_default()
    }

    /// Returns `true` if `line` is bookmarked.
    pub fn is_bookmarked(&self, line: usize) -> bool {
        self.marks(line).contains(LineMarks::BOOKMARK)
    }

    /// Set or clear the bookmark on `line`.
    pub fn set_bookmark(&mut self, line: usize, on: bool) {
        if let Some(marks) = self.marks.get_mut(line) {
            marks.set(LineMarks::BOOKMARK, on);
        }
    }

    /// Bookmarked lines, ascending.
    pub fn bookmarked_lines(&self) -> Vec<usize> {
        self.marks
            .iter()
            .enumerate()
            .filter(|(_, m)| m.contains(LineMarks::BOOKMARK))
            .map(|(line, _)| line)
            .collect()
    }

    /// Attach a surface. Attaching twice keeps the existing state.
    pub fn attach_view(&mut self, id: SurfaceId) {
        self.views.entry(id).or_default();
    }

    /// Detach a surface, returning its last state.
    pub fn detach_view(&mut self, id: SurfaceId) -> Option<ViewState> {
        self.views.remove(&id)
    }

    /// State of surface `id`.
    pub fn view(&self, id: SurfaceId) -> Option<&ViewState> {
        self.views.get(&id)
    }

    /// Mutable state of surface `id`.
    pub fn view_mut(&mut self, id: SurfaceId) -> Option<&mut ViewState> {
        self.views.get_mut(&id)
    }

    /// Collapsed fold headers of surface `id`.
    pub fn collapsed_lines(&self, id: SurfaceId) -> BTreeSet<usize> {
        self.view(id).map(|v| v.collapsed.clone()).unwrap_or_default()
    }
}
