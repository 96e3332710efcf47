//! Bookmark line operations.

use crate::surface::TextSurface;

/// Toggle the bookmark on `line`.
pub fn toggle_bookmark(surface: &mut dyn TextSurface, line: usize) {
    if line < surface.line_count() {
        let on = surface.is_bookmarked(line);
        surface.set_bookmark(line, !on);
    }
}

/// Bookmarked lines, ascending.
pub fn bookmarked_lines(surface: &dyn TextSurface) -> Vec<usize> {
    (0..surface.line_count())
        .filter(|l| surface.is_bookmarked(*l))
        .collect()
}

/// Remove every bookmark.
pub fn clear_bookmarks(surface: &mut dyn TextSurface) {
    for line in bookmarked_lines(surface) {
        surface.set_bookmark(line, false);
    }
}

/// Bookmark every unmarked line and unmark every marked one.
pub fn invert_bookmarks(surface: &mut dyn TextSurface) {
    for line in 0..surface.line_count() {
        let on = surface.is_bookmarked(line);
        surface.set_bookmark(line, !on);
    }
}

fn line_with_break(surface: &dyn TextSurface, line: usize) -> (usize, usize) {
    let start = surface.line_start(line);
    let end = if line + 1 < surface.line_count() {
        surface.line_start(line + 1)
    } else {
        surface.len()
    };
    (start, end)
}

/// Text of all bookmarked lines, each terminated by a line break.
pub fn copy_marked_lines(surface: &dyn TextSurface) -> String {
    let eol = surface.eol().as_str();
    let mut out = String::new();
    for line in bookmarked_lines(surface) {
        let (start, end) = line_with_break(surface, line);
        out.push_str(&surface.text_range(start, end));
        if end == surface.line_end(line) {
            out.push_str(eol);
        }
    }
    out
}

/// Delete bookmarked lines (`marked == true`) or the lines without a bookmark.
///
/// Lines are removed from the bottom up so earlier line numbers stay valid. Removing the last
/// line also removes the line break before it. Returns the number of deleted lines.
pub fn delete_lines(surface: &mut dyn TextSurface, marked: bool) -> usize {
    let mut deleted = 0;
    surface.begin_undo_group();
    for line in (0..surface.line_count()).rev() {
        if surface.is_bookmarked(line) != marked {
            continue;
        }
        surface.set_bookmark(line, false);
        let (mut start, end) = line_with_break(surface, line);
        if end == surface.line_end(line) && line > 0 {
            start = surface.line_end(line - 1);
        }
        if start == end && line == 0 {
            continue;
        }
        surface.delete(start, end);
        deleted += 1;
    }
    surface.end_undo_group();
    deleted
}

/// Copy the bookmarked lines and delete them. Returns the copied text.
pub fn cut_marked_lines(surface: &mut dyn TextSurface) -> String {
    let text = copy_marked_lines(surface);
    delete_lines(surface, true);
    text
}

/// Replace the content of bookmarked lines, top to bottom, with the lines of `text`.
///
/// Line breaks of the document are kept. Stops when `text` runs out of lines. Returns the
/// number of replaced lines.
pub fn paste_to_marked_lines(surface: &mut dyn TextSurface, text: &str) -> usize {
    let mut replacements = split_lines(text).into_iter();
    let mut replaced = 0;
    surface.begin_undo_group();
    for line in bookmarked_lines(surface) {
        let Some(replacement) = replacements.next() else {
            break;
        };
        let start = surface.line_start(line);
        let end = surface.line_end(line);
        surface.replace_range(start, end, replacement);
        replaced += 1;
    }
    surface.end_undo_group();
    replaced
}

fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let bytes = text.as_bytes();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\r' => {
                lines.push(&text[start..i]);
                if bytes.get(i + 1) == Some(&b'\n') {
                    i += 1;
                }
                start = i + 1;
            }
            b'\n' => {
                lines.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    if start < text.len() {
        lines.push(&text[start..]);
    }
    lines
}

/// The next bookmarked line after `from` (or before it when `forward` is false), wrapping
/// around the document.
pub fn next_bookmark(surface: &dyn TextSurface, from: usize, forward: bool) -> Option<usize> {
    let marks = bookmarked_lines(surface);
    if forward {
        marks.iter().copied().find(|l| *l > from).or(marks.first().copied())
    } else {
        marks
            .iter()
            .rev()
            .copied()
            .find(|l| *l < from)
            .or(marks.last().copied())
    }
}

/// Move the caret to the next (or previous) bookmark. Returns the line jumped to.
pub fn goto_next_bookmark(surface: &mut dyn TextSurface, forward: bool) -> Option<usize> {
    let line = surface.line_from_position(surface.selection().caret);
    let target = next_bookmark(surface, line, forward)?;
    let pos = surface.line_start(target);
    surface.set_selection(pos, pos);
    Some(target)
}
