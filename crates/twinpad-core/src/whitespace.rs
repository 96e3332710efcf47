//! Whitespace and line transforms.
//!
//! Tab/space conversion rewrites the whole document in one pass and then restores the caret,
//! bookmarks and collapsed folds (whitespace-only rewrites never change the line count). The
//! line operations work on the selected lines, or the whole document without a multi-line
//! selection, and replace that region in a single undo group.

use crate::comment::selected_lines;
use crate::line_ending::LineEnding;
use crate::surface::TextSurface;
use std::collections::HashSet;

/// Output of a text rewrite together with the remapped caret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    /// The new text.
    pub text: String,
    /// Caret offset in the new text.
    pub caret: usize,
}

fn is_continuation(b: u8) -> bool {
    b & 0xC0 == 0x80
}

/// Expand every tab to spaces up to the next tab stop.
pub fn expand_tabs(source: &str, tab_width: usize, caret: usize) -> Rewrite {
    let tab_width = tab_width.max(1);
    let bytes = source.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut column = 0usize;
    let mut new_caret = None;

    for (i, &b) in bytes.iter().enumerate() {
        if i == caret {
            new_caret = Some(out.len());
        }
        match b {
            b'\t' => {
                let width = tab_width - column % tab_width;
                out.extend(std::iter::repeat_n(b' ', width));
                column += width;
            }
            b'\r' | b'\n' => {
                out.push(b);
                column = 0;
            }
            _ => {
                out.push(b);
                if !is_continuation(b) {
                    column += 1;
                }
            }
        }
    }

    Rewrite {
        caret: new_caret.unwrap_or(out.len()),
        text: String::from_utf8_lossy(&out).into_owned(),
    }
}

/// Collapse runs of spaces that reach a tab stop into tabs.
///
/// A run of two or more spaces ending on a tab stop becomes one tab. A single space on a stop
/// only becomes a tab when the next byte is a space or a tab. Spaces directly followed by a
/// tab are absorbed into it. With `leading_only`, a line is copied verbatim from its first
/// non-blank character on.
pub fn collapse_spaces(source: &str, tab_width: usize, leading_only: bool, caret: usize) -> Rewrite {
    let tab_width = tab_width.max(1);
    let bytes = source.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut column = 0usize;
    let mut tab_stop = tab_width;
    let mut run = 0usize;
    let mut run_out_start = 0usize;
    let mut caret_in_run: Option<usize> = None;
    let mut new_caret = None;
    let mut text_seen = false;

    let flush = |out: &mut Vec<u8>, run: &mut usize, caret_in_run: &mut Option<usize>, new_caret: &mut Option<usize>, start: usize| {
        if let Some(offset) = caret_in_run.take() {
            *new_caret = Some(start + offset);
        }
        out.extend(std::iter::repeat_n(b' ', *run));
        *run = 0;
    };

    for (i, &b) in bytes.iter().enumerate() {
        let active = !(leading_only && text_seen);
        if i == caret {
            if active && b == b' ' {
                caret_in_run = Some(run);
                if run == 0 {
                    run_out_start = out.len();
                }
            } else if run > 0 {
                caret_in_run = Some(run);
            } else {
                new_caret = Some(out.len());
            }
        }

        match b {
            b'\r' | b'\n' => {
                flush(&mut out, &mut run, &mut caret_in_run, &mut new_caret, run_out_start);
                out.push(b);
                column = 0;
                tab_stop = tab_width;
                text_seen = false;
            }
            b' ' if active => {
                if run == 0 {
                    run_out_start = out.len();
                }
                run += 1;
                column += 1;
                if column == tab_stop {
                    tab_stop += tab_width;
                    let next = bytes.get(i + 1).copied();
                    if run >= 2 || matches!(next, Some(b' ' | b'\t')) {
                        if caret_in_run.take().is_some() {
                            new_caret = Some(run_out_start);
                        }
                        out.push(b'\t');
                        run = 0;
                    } else {
                        flush(&mut out, &mut run, &mut caret_in_run, &mut new_caret, run_out_start);
                    }
                }
            }
            b'\t' if active => {
                if caret_in_run.take().is_some() {
                    new_caret = Some(run_out_start);
                }
                run = 0;
                out.push(b'\t');
                column = tab_stop;
                tab_stop += tab_width;
            }
            _ => {
                flush(&mut out, &mut run, &mut caret_in_run, &mut new_caret, run_out_start);
                out.push(b);
                if b == b'\t' {
                    column = tab_stop;
                    tab_stop += tab_width;
                } else if !is_continuation(b) {
                    column += 1;
                    if column == tab_stop {
                        tab_stop += tab_width;
                    }
                }
                if b != b' ' && b != b'\t' {
                    text_seen = true;
                }
            }
        }
    }
    flush(&mut out, &mut run, &mut caret_in_run, &mut new_caret, run_out_start);

    Rewrite {
        caret: new_caret.unwrap_or(out.len()),
        text: String::from_utf8_lossy(&out).into_owned(),
    }
}

/// Replace the whole document with `rewrite`, keeping bookmarks and collapsed folds.
fn apply_rewrite(surface: &mut dyn TextSurface, rewrite: Rewrite) {
    let bookmarks: Vec<usize> = (0..surface.line_count())
        .filter(|l| surface.is_bookmarked(*l))
        .collect();
    let folds = surface.collapsed_lines();
    let first_visible = surface.first_visible_line();

    surface.set_text(&rewrite.text);

    for line in bookmarks {
        surface.set_bookmark(line, true);
    }
    for line in folds {
        surface.set_fold_collapsed(line, true);
    }
    surface.set_selection(rewrite.caret, rewrite.caret);
    surface.set_first_visible_line(first_visible);
}

/// Convert all tabs to spaces. Returns `false` when the document has no tabs.
pub fn tabs_to_spaces(surface: &mut dyn TextSurface) -> bool {
    let source = surface.text();
    if !source.contains('\t') {
        return false;
    }
    let rewrite = expand_tabs(&source, surface.tab_width(), surface.selection().caret);
    apply_rewrite(surface, rewrite);
    true
}

/// Convert runs of spaces to tabs, on whole lines or only in leading whitespace.
pub fn spaces_to_tabs(surface: &mut dyn TextSurface, leading_only: bool) -> bool {
    let source = surface.text();
    let rewrite = collapse_spaces(
        &source,
        surface.tab_width(),
        leading_only,
        surface.selection().caret,
    );
    if rewrite.text == source {
        return false;
    }
    apply_rewrite(surface, rewrite);
    true
}

/// Rewrite every line break to `eol`. Returns `false` when nothing changed.
pub fn convert_eol(surface: &mut dyn TextSurface, eol: LineEnding) -> bool {
    let source = surface.text();
    let caret_line = surface.line_from_position(surface.selection().caret);
    let converted = eol.apply_to_text(&source);
    if converted == source {
        return false;
    }
    let rewrite = Rewrite {
        text: converted,
        caret: 0,
    };
    apply_rewrite(surface, rewrite);
    let caret = surface.line_start(caret_line);
    surface.set_selection(caret, caret);
    true
}

/// Which side of a line to trim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trim {
    /// Trailing blanks.
    Trailing,
    /// Leading blanks.
    Leading,
    /// Both sides.
    Both,
}

struct LineRecord {
    content: String,
    eol: String,
}

/// Lines affected by a line operation: the selected lines for a selection spanning lines,
/// otherwise the whole document. Returns the byte range including the last line's break.
fn target_region(surface: &dyn TextSurface) -> (usize, usize, Vec<LineRecord>) {
    let selection = surface.selection();
    let spans_lines =
        surface.line_from_position(selection.start()) != surface.line_from_position(selection.end());
    let (first, last) = if spans_lines {
        selected_lines(surface)
    } else {
        (0, surface.line_count().saturating_sub(1))
    };

    let records = (first..=last)
        .map(|line| {
            let end = surface.line_end(line);
            let next = if line + 1 < surface.line_count() {
                surface.line_start(line + 1)
            } else {
                surface.len()
            };
            LineRecord {
                content: surface.text_range(surface.line_start(line), end),
                eol: surface.text_range(end, next),
            }
        })
        .collect::<Vec<_>>();
    let start = surface.line_start(first);
    let end = if last + 1 < surface.line_count() {
        surface.line_start(last + 1)
    } else {
        surface.len()
    };
    (start, end, records)
}

fn replace_region(surface: &mut dyn TextSurface, start: usize, end: usize, records: &[LineRecord]) -> bool {
    let text: String = records
        .iter()
        .flat_map(|r| [r.content.as_str(), r.eol.as_str()])
        .collect();
    if surface.text_range(start, end) == text {
        return false;
    }
    surface.begin_undo_group();
    surface.replace_range(start, end, &text);
    surface.end_undo_group();
    surface.set_selection(start, start);
    true
}

/// Trim blanks (spaces and tabs) from lines.
pub fn trim_lines(surface: &mut dyn TextSurface, side: Trim) -> bool {
    let (start, end, mut records) = target_region(surface);
    let blank: &[char] = &[' ', '\t'];
    for record in &mut records {
        record.content = match side {
            Trim::Trailing => record.content.trim_end_matches(blank),
            Trim::Leading => record.content.trim_start_matches(blank),
            Trim::Both => record.content.trim_matches(blank),
        }
        .to_string();
    }
    replace_region(surface, start, end, &records)
}

/// Remove empty lines; with `include_blank`, also lines holding only spaces and tabs.
pub fn remove_empty_lines(surface: &mut dyn TextSurface, include_blank: bool) -> bool {
    let (start, end, records) = target_region(surface);
    let kept: Vec<LineRecord> = records
        .into_iter()
        .filter(|r| {
            if include_blank {
                !r.content.trim_matches([' ', '\t']).is_empty()
            } else {
                !r.content.is_empty()
            }
        })
        .collect();
    replace_region(surface, start, end, &kept)
}

fn keep_region_ending(records: &mut [LineRecord], ended_with_break: bool) {
    if !ended_with_break && let Some(last) = records.last_mut() {
        last.eol.clear();
    }
}

/// Remove lines equal to the line directly above them.
pub fn remove_consecutive_duplicates(surface: &mut dyn TextSurface) -> bool {
    let (start, end, records) = target_region(surface);
    let ended_with_break = records.last().is_some_and(|r| !r.eol.is_empty());
    let mut kept: Vec<LineRecord> = Vec::with_capacity(records.len());
    for record in records {
        if kept.last().is_some_and(|prev| prev.content == record.content) {
            continue;
        }
        kept.push(record);
    }
    keep_region_ending(&mut kept, ended_with_break);
    replace_region(surface, start, end, &kept)
}

/// Remove every repeated line, keeping the first occurrence.
pub fn remove_duplicates(surface: &mut dyn TextSurface) -> bool {
    let (start, end, records) = target_region(surface);
    let ended_with_break = records.last().is_some_and(|r| !r.eol.is_empty());
    let mut seen = HashSet::new();
    let mut kept: Vec<LineRecord> = records
        .into_iter()
        .filter(|r| seen.insert(r.content.clone()))
        .collect();
    keep_region_ending(&mut kept, ended_with_break);
    replace_region(surface, start, end, &kept)
}
