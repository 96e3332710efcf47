//! The text surface capability.
//!
//! A [`TextSurface`] is everything the text transforms and the coordinator need from an editing
//! widget: byte-offset text access, selections, line/offset translation, indentation, search in
//! a byte range, undo grouping, line markers and fold state, and the code page.
//!
//! Three surfaces exist per coordinator ([`SurfaceId`]). Each one is a *view* onto a shared
//! [`Document`]; a [`SurfaceHandle`] binds a document and a surface id together and implements
//! the trait, so two surfaces showing the same document (a clone) see each other's edits while
//! keeping independent selections and folds.

use crate::document::Document;
use crate::encoding::CodePage;
use crate::line_ending::LineEnding;
use bitflags::bitflags;
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Identifies one of the editing surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SurfaceId {
    /// The main (left/top) view.
    Main,
    /// The secondary (right/bottom) view.
    Secondary,
    /// The offscreen surface used for batch operations.
    Hidden,
}

impl SurfaceId {
    /// The opposite visible view. `Hidden` maps to itself.
    pub fn other(self) -> Self {
        match self {
            Self::Main => Self::Secondary,
            Self::Secondary => Self::Main,
            Self::Hidden => Self::Hidden,
        }
    }
}

/// An anchor/caret pair in byte offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Selection {
    /// Fixed end.
    pub anchor: usize,
    /// Moving end.
    pub caret: usize,
}

impl Selection {
    /// Create a selection.
    pub fn new(anchor: usize, caret: usize) -> Self {
        Self { anchor, caret }
    }

    /// An empty selection at `pos`.
    pub fn caret(pos: usize) -> Self {
        Self::new(pos, pos)
    }

    /// Lower bound.
    pub fn start(&self) -> usize {
        self.anchor.min(self.caret)
    }

    /// Upper bound.
    pub fn end(&self) -> usize {
        self.anchor.max(self.caret)
    }

    /// Returns `true` when anchor and caret coincide.
    pub fn is_empty(&self) -> bool {
        self.anchor == self.caret
    }

    /// Returns `true` when the caret sits at the lower bound of a non-empty selection.
    pub fn caret_at_start(&self) -> bool {
        self.caret < self.anchor
    }
}

/// Per-surface state of a document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ViewState {
    /// Main selection.
    pub selection: Selection,
    /// Additional selections (multi-caret or rectangular rows).
    pub extra_selections: Vec<Selection>,
    /// The selection is rectangular.
    pub rectangular: bool,
    /// First line shown at the top of the surface.
    pub first_visible_line: usize,
    /// Horizontal scroll offset in pixels.
    pub x_offset: usize,
    /// Fold header lines that are collapsed.
    pub collapsed: BTreeSet<usize>,
    /// How bytes are interpreted.
    pub code_page: CodePage,
}

bitflags! {
    /// Search flags for [`TextSurface::search_in_range`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SearchFlags: u8 {
        /// Case sensitive.
        const MATCH_CASE = 1;
        /// Match must start and end on word boundaries.
        const WHOLE_WORD = 1 << 1;
        /// Pattern is a regular expression.
        const REGEX = 1 << 2;
    }
}

/// Result of a ranged search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    /// A match at `[start, end)`.
    Found {
        /// Start byte offset.
        start: usize,
        /// End byte offset.
        end: usize,
    },
    /// Nothing matched.
    NotFound,
    /// The pattern failed to compile.
    Malformed,
}

impl SearchOutcome {
    /// The match range, if any.
    pub fn range(self) -> Option<(usize, usize)> {
        match self {
            Self::Found { start, end } => Some((start, end)),
            _ => None,
        }
    }
}

/// Capability offered by an editing surface.
///
/// Offsets are byte offsets into the UTF-8 text; lines are zero-based.
pub trait TextSurface {
    /// Length of the document in bytes.
    fn len(&self) -> usize;

    /// Returns `true` for an empty document.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Text of `[start, end)`.
    fn text_range(&self, start: usize, end: usize) -> String;

    /// Whole text.
    fn text(&self) -> String {
        self.text_range(0, self.len())
    }

    /// Raw byte at `pos`.
    fn byte_at(&self, pos: usize) -> Option<u8>;

    /// Replace `[start, end)` with `text`.
    fn replace_range(&mut self, start: usize, end: usize, text: &str);

    /// Insert `text` at `pos`.
    fn insert(&mut self, pos: usize, text: &str) {
        self.replace_range(pos, pos, text);
    }

    /// Delete `[start, end)`.
    fn delete(&mut self, start: usize, end: usize) {
        self.replace_range(start, end, "");
    }

    /// Replace the whole document. Line markers and folds are cleared.
    fn set_text(&mut self, text: &str);

    /// Main selection.
    fn selection(&self) -> Selection;

    /// Set the main selection and drop any extra selections.
    fn set_selection(&mut self, anchor: usize, caret: usize);

    /// All selections, main first.
    fn selections(&self) -> Vec<Selection>;

    /// Returns `true` when the selection is rectangular.
    fn is_rectangular(&self) -> bool;

    /// Number of lines (a trailing line break starts a final empty line).
    fn line_count(&self) -> usize;

    /// Line containing `pos`.
    fn line_from_position(&self, pos: usize) -> usize;

    /// Offset of the first byte of `line`.
    fn line_start(&self, line: usize) -> usize;

    /// Offset of the end of `line`, before its line break.
    fn line_end(&self, line: usize) -> usize;

    /// Offset after the leading spaces and tabs of `line`.
    fn line_indent_position(&self, line: usize) -> usize {
        let end = self.line_end(line);
        let mut pos = self.line_start(line);
        while pos < end && matches!(self.byte_at(pos), Some(b' ' | b'\t')) {
            pos += 1;
        }
        pos
    }

    /// Indentation width of `line` in columns.
    fn line_indentation(&self, line: usize) -> usize {
        let tab_width = self.tab_width().max(1);
        let mut column = 0;
        for pos in self.line_start(line)..self.line_indent_position(line) {
            match self.byte_at(pos) {
                Some(b'\t') => column = (column / tab_width + 1) * tab_width,
                _ => column += 1,
            }
        }
        column
    }

    /// Set the indentation of `line` to `indent` columns, keeping the selection on the same text.
    fn set_line_indentation(&mut self, line: usize, indent: usize) {
        let selection = self.selection();
        let start = self.line_start(line);
        let before = self.line_indent_position(line);
        let fill = indentation_string(indent, self.tab_width(), self.use_tabs());
        if self.text_range(start, before) == fill {
            return;
        }
        self.replace_range(start, before, &fill);
        let after = self.line_indent_position(line);

        let adjust = |pos: usize| -> usize {
            if after >= before {
                if pos >= before { pos + (after - before) } else { pos }
            } else if pos >= before {
                pos - (before - after)
            } else if pos >= after {
                after
            } else {
                pos
            }
        };
        self.set_selection(adjust(selection.anchor), adjust(selection.caret));
    }

    /// Tab width in columns.
    fn tab_width(&self) -> usize;

    /// Indent with tabs.
    fn use_tabs(&self) -> bool;

    /// Search `pattern` between `start` and `end`.
    ///
    /// When `start > end` the search runs backward and reports the last match lying entirely
    /// inside `[end, start)`.
    fn search_in_range(
        &self,
        pattern: &str,
        flags: SearchFlags,
        start: usize,
        end: usize,
    ) -> SearchOutcome {
        let (lo, hi) = (start.min(end), start.max(end).min(self.len()));
        if pattern.is_empty() || lo >= hi {
            return SearchOutcome::NotFound;
        }
        let source = if flags.contains(SearchFlags::REGEX) {
            pattern.to_string()
        } else {
            regex::escape(pattern)
        };
        let Ok(re) = RegexBuilder::new(&source)
            .case_insensitive(!flags.contains(SearchFlags::MATCH_CASE))
            .multi_line(true)
            .crlf(true)
            .build()
        else {
            return SearchOutcome::Malformed;
        };

        let haystack = self.text_range(lo, hi);
        let whole_word = flags.contains(SearchFlags::WHOLE_WORD);
        let accept = |s: usize, e: usize| {
            s < e && (!whole_word || is_word_bounded(&haystack, s, e))
        };
        let found = if start <= end {
            re.find_iter(&haystack).find(|m| accept(m.start(), m.end()))
        } else {
            re.find_iter(&haystack)
                .filter(|m| accept(m.start(), m.end()))
                .last()
        };
        match found {
            Some(m) => SearchOutcome::Found {
                start: lo + m.start(),
                end: lo + m.end(),
            },
            None => SearchOutcome::NotFound,
        }
    }

    /// Open an undo group. Groups nest; only the outermost one is recorded.
    fn begin_undo_group(&mut self);

    /// Close an undo group.
    fn end_undo_group(&mut self);

    /// Returns `true` if `line` carries a bookmark.
    fn is_bookmarked(&self, line: usize) -> bool;

    /// Set or clear the bookmark on `line`.
    fn set_bookmark(&mut self, line: usize, on: bool);

    /// Returns `true` if the fold whose header is `line` is collapsed.
    fn is_fold_collapsed(&self, line: usize) -> bool;

    /// Collapse or expand the fold whose header is `line`.
    fn set_fold_collapsed(&mut self, line: usize, collapsed: bool);

    /// Collapsed fold headers, ascending.
    fn collapsed_lines(&self) -> Vec<usize>;

    /// Current code page.
    fn code_page(&self) -> CodePage;

    /// Set the code page.
    fn set_code_page(&mut self, code_page: CodePage);

    /// Line ending used for new line breaks.
    fn eol(&self) -> LineEnding;

    /// First visible line.
    fn first_visible_line(&self) -> usize;

    /// Scroll so that `line` is the first visible line.
    fn set_first_visible_line(&mut self, line: usize);

    /// Horizontal scroll offset.
    fn x_offset(&self) -> usize;

    /// Set the horizontal scroll offset.
    fn set_x_offset(&mut self, offset: usize);
}

/// Build the whitespace for `indent` columns.
pub fn indentation_string(indent: usize, tab_width: usize, use_tabs: bool) -> String {
    let tab_width = tab_width.max(1);
    if use_tabs {
        let mut fill = "\t".repeat(indent / tab_width);
        fill.push_str(&" ".repeat(indent % tab_width));
        fill
    } else {
        " ".repeat(indent)
    }
}

fn is_word_byte(b: u8) -> bool {
    b == b'_' || b.is_ascii_alphanumeric() || b >= 0x80
}

pub(crate) fn is_word_bounded(text: &str, start: usize, end: usize) -> bool {
    let bytes = text.as_bytes();
    let before = start.checked_sub(1).and_then(|i| bytes.get(i)).copied();
    let after = bytes.get(end).copied();
    !before.is_some_and(is_word_byte) && !after.is_some_and(is_word_byte)
}

/// A [`TextSurface`] over one surface's view of a document.
pub struct SurfaceHandle<'a> {
    doc: &'a mut Document,
    id: SurfaceId,
}

impl<'a> SurfaceHandle<'a> {
    /// Bind `doc` to surface `id`, attaching the surface if it is not yet attached.
    pub fn new(doc: &'a mut Document, id: SurfaceId) -> Self {
        doc.attach_view(id);
        Self { doc, id }
    }

    /// The surface this handle addresses.
    pub fn id(&self) -> SurfaceId {
        self.id
    }

    /// The underlying document.
    pub fn document(&self) -> &Document {
        self.doc
    }

    fn view(&self) -> ViewState {
        self.doc.view(self.id).cloned().unwrap_or_default()
    }
}

impl TextSurface for SurfaceHandle<'_> {
    fn len(&self) -> usize {
        self.doc.len()
    }

    fn text_range(&self, start: usize, end: usize) -> String {
        self.doc.slice(start, end)
    }

    fn byte_at(&self, pos: usize) -> Option<u8> {
        self.doc.byte_at(pos)
    }

    fn replace_range(&mut self, start: usize, end: usize, text: &str) {
        self.doc.replace(start, end, text);
    }

    fn set_text(&mut self, text: &str) {
        self.doc.set_text(text);
    }

    fn selection(&self) -> Selection {
        self.doc
            .view(self.id)
            .map(|v| v.selection)
            .unwrap_or_default()
    }

    fn set_selection(&mut self, anchor: usize, caret: usize) {
        let anchor = self.doc.snap(anchor);
        let caret = self.doc.snap(caret);
        if let Some(view) = self.doc.view_mut(self.id) {
            view.selection = Selection::new(anchor, caret);
            view.extra_selections.clear();
            view.rectangular = false;
        }
    }

    fn selections(&self) -> Vec<Selection> {
        let view = self.view();
        std::iter::once(view.selection)
            .chain(view.extra_selections)
            .collect()
    }

    fn is_rectangular(&self) -> bool {
        self.doc.view(self.id).is_some_and(|v| v.rectangular)
    }

    fn line_count(&self) -> usize {
        self.doc.line_count()
    }

    fn line_from_position(&self, pos: usize) -> usize {
        self.doc.line_from_position(pos)
    }

    fn line_start(&self, line: usize) -> usize {
        self.doc.line_start(line)
    }

    fn line_end(&self, line: usize) -> usize {
        self.doc.line_end(line)
    }

    fn tab_width(&self) -> usize {
        self.doc.tab_width()
    }

    fn use_tabs(&self) -> bool {
        self.doc.use_tabs()
    }

    fn begin_undo_group(&mut self) {
        self.doc.begin_undo_group();
    }

    fn end_undo_group(&mut self) {
        self.doc.end_undo_group();
    }

    fn is_bookmarked(&self, line: usize) -> bool {
        self.doc.is_bookmarked(line)
    }

    fn set_bookmark(&mut self, line: usize, on: bool) {
        self.doc.set_bookmark(line, on);
    }

    fn is_fold_collapsed(&self, line: usize) -> bool {
        self.doc
            .view(self.id)
            .is_some_and(|v| v.collapsed.contains(&line))
    }

    fn set_fold_collapsed(&mut self, line: usize, collapsed: bool) {
        if line >= self.doc.line_count() {
            return;
        }
        if let Some(view) = self.doc.view_mut(self.id) {
            if collapsed {
                view.collapsed.insert(line);
            } else {
                view.collapsed.remove(&line);
            }
        }
    }

    fn collapsed_lines(&self) -> Vec<usize> {
        self.view().collapsed.into_iter().collect()
    }

    fn code_page(&self) -> CodePage {
        self.view().code_page
    }

    fn set_code_page(&mut self, code_page: CodePage) {
        if let Some(view) = self.doc.view_mut(self.id) {
            view.code_page = code_page;
        }
    }

    fn eol(&self) -> LineEnding {
        self.doc.eol()
    }

    fn first_visible_line(&self) -> usize {
        self.view().first_visible_line
    }

    fn set_first_visible_line(&mut self, line: usize) {
        let line = line.min(self.doc.line_count().saturating_sub(1));
        if let Some(view) = self.doc.view_mut(self.id) {
            view.first_visible_line = line;
        }
    }

    fn x_offset(&self) -> usize {
        self.view().x_offset
    }

    fn set_x_offset(&mut self, offset: usize) {
        if let Some(view) = self.doc.view_mut(self.id) {
            view.x_offset = offset;
        }
    }
}
