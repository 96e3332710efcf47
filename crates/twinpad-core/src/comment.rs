//! Comment toggling.
//!
//! Three strategies, chosen from the language's [`CommentConfig`]:
//!
//! - **block-line**: a line token (`//`, `#`) inserted at each selected line's indentation;
//! - **single-line stream**: languages without a line token get every line wrapped on its own
//!   with the stream tokens (`<!-- line -->`);
//! - **stream**: the whole selection wrapped once (`/* ... */`).
//!
//! All edits of one command are planned against the original text, applied back to front
//! inside a single undo group, and the selection is mapped through the plan only at the end.

use crate::surface::{SearchFlags, Selection, TextSurface};
use twinpad_lang::CommentConfig;

/// What a block-line command should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentMode {
    /// Uncomment if every non-blank line is commented, otherwise comment the rest.
    Toggle,
    /// Comment every line.
    Comment,
    /// Remove line comments.
    Uncomment,
}

#[derive(Debug, Clone)]
struct PlannedEdit {
    pos: usize,
    deleted: usize,
    inserted: String,
}

/// Non-overlapping edits expressed in the coordinates of the unedited text.
#[derive(Debug, Clone, Default)]
pub(crate) struct EditPlan {
    edits: Vec<PlannedEdit>,
}

impl EditPlan {
    pub(crate) fn insert(&mut self, pos: usize, text: impl Into<String>) {
        self.edits.push(PlannedEdit {
            pos,
            deleted: 0,
            inserted: text.into(),
        });
    }

    pub(crate) fn delete(&mut self, pos: usize, len: usize) {
        if len > 0 {
            self.edits.push(PlannedEdit {
                pos,
                deleted: len,
                inserted: String::new(),
            });
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Map an original offset to its post-edit value.
    ///
    /// With `stay_before`, an offset equal to an insertion point stays in front of the
    /// inserted text. Offsets inside a deleted range collapse to its start.
    pub(crate) fn map(&self, pos: usize, stay_before: bool) -> usize {
        let mut delta: isize = 0;
        for edit in &self.edits {
            let end = edit.pos + edit.deleted;
            if pos < edit.pos || (pos == edit.pos && (stay_before || edit.deleted > 0)) {
                break;
            }
            if pos < end {
                return edit.pos.saturating_add_signed(delta);
            }
            delta += edit.inserted.len() as isize - edit.deleted as isize;
        }
        pos.saturating_add_signed(delta)
    }

    /// Apply back to front inside one undo group.
    pub(crate) fn apply(&mut self, surface: &mut dyn TextSurface) {
        self.edits.sort_by_key(|e| e.pos);
        surface.begin_undo_group();
        for edit in self.edits.iter().rev() {
            surface.replace_range(edit.pos, edit.pos + edit.deleted, &edit.inserted);
        }
        surface.end_undo_group();
    }

    /// Apply and move `selection` through the plan, keeping the caret on its original side.
    pub(crate) fn apply_with_selection(&mut self, surface: &mut dyn TextSurface, selection: Selection) {
        self.apply(surface);
        let empty = selection.is_empty();
        let start = self.map(selection.start(), !empty);
        let end = self.map(selection.end(), false);
        if selection.caret_at_start() {
            surface.set_selection(end, start);
        } else {
            surface.set_selection(start, end);
        }
    }
}

struct LineSpan {
    indent: usize,
    insert_at: usize,
    end: usize,
    text: String,
}

impl LineSpan {
    fn is_blank(&self) -> bool {
        self.indent == self.end
    }
}

/// Lines covered by the main selection. A multi-line selection ending at column 0 does not
/// include that last line.
pub(crate) fn selected_lines(surface: &dyn TextSurface) -> (usize, usize) {
    let sel = surface.selection();
    let first = surface.line_from_position(sel.start());
    let mut last = surface.line_from_position(sel.end());
    if last > first && sel.end() == surface.line_start(last) {
        last -= 1;
    }
    (first, last)
}

fn starts_with_ignore_case(text: &str, token: &str) -> bool {
    text.len() >= token.len()
        && text.as_bytes()[..token.len()].eq_ignore_ascii_case(token.as_bytes())
}

enum LineStrategy<'a> {
    Line(&'a str),
    Wrapped(&'a str, &'a str),
}

impl LineStrategy<'_> {
    fn is_commented(&self, text: &str) -> bool {
        match self {
            Self::Line(token) => starts_with_ignore_case(text, token),
            Self::Wrapped(start, end) => {
                let body = text.trim_end();
                body.len() >= start.len() + end.len()
                    && body.starts_with(start)
                    && body.ends_with(end)
            }
        }
    }

    fn plan_comment(&self, plan: &mut EditPlan, span: &LineSpan, space: &str) {
        match self {
            Self::Line(token) => plan.insert(span.insert_at, format!("{token}{space}")),
            Self::Wrapped(start, end) => {
                plan.insert(span.insert_at, format!("{start}{space}"));
                plan.insert(span.end, format!("{space}{end}"));
            }
        }
    }

    fn plan_uncomment(&self, plan: &mut EditPlan, span: &LineSpan, space: bool) {
        let bytes = span.text.as_bytes();
        match self {
            Self::Line(token) => {
                let mut len = token.len();
                if space && bytes.get(len) == Some(&b' ') {
                    len += 1;
                }
                plan.delete(span.insert_at, len);
            }
            Self::Wrapped(start, end) => {
                let body_len = span.text.trim_end().len();
                let mut end_at = body_len - end.len();
                let mut end_len = end.len();
                if space && end_at > start.len() && bytes[end_at - 1] == b' ' {
                    end_at -= 1;
                    end_len += 1;
                }
                let mut start_len = start.len();
                if space && start_len < end_at && bytes[start_len] == b' ' {
                    start_len += 1;
                }
                plan.delete(span.insert_at, start_len);
                plan.delete(span.insert_at + end_at, end_len);
            }
        }
    }
}

/// Comment, uncomment or toggle the selected lines with the language's line comment token.
///
/// Languages without a line token fall back to wrapping each line in the stream tokens.
/// Returns `false` if the language has no comment tokens, or nothing was changed.
pub fn block_comment(
    surface: &mut dyn TextSurface,
    config: &CommentConfig,
    mode: CommentMode,
) -> bool {
    let strategy = if let Some(token) = config.line.as_deref().filter(|t| !t.is_empty()) {
        LineStrategy::Line(token)
    } else if let (Some(start), Some(end)) = (config.block_start.as_deref(), config.block_end.as_deref())
        && config.has_block()
    {
        LineStrategy::Wrapped(start, end)
    } else {
        log::debug!("block comment unsupported: no comment tokens");
        return false;
    };
    let space = if config.space_after_token { " " } else { "" };

    let selection = surface.selection();
    let (first, last) = selected_lines(surface);
    let spans: Vec<LineSpan> = (first..=last)
        .map(|line| {
            let start = surface.line_start(line);
            let indent = surface.line_indent_position(line);
            let end = surface.line_end(line);
            let insert_at = if config.at_indentation { indent } else { start };
            LineSpan {
                indent,
                insert_at,
                end,
                text: surface.text_range(insert_at, end),
            }
        })
        .collect();

    let uncomment = match mode {
        CommentMode::Uncomment => true,
        CommentMode::Comment => false,
        CommentMode::Toggle => {
            let mut non_blank = spans.iter().filter(|s| !s.is_blank()).peekable();
            non_blank.peek().is_some() && non_blank.all(|s| strategy.is_commented(&s.text))
        }
    };

    let mut plan = EditPlan::default();
    for span in &spans {
        if uncomment {
            if !span.is_blank() && strategy.is_commented(&span.text) {
                strategy.plan_uncomment(&mut plan, span, config.space_after_token);
            }
            continue;
        }
        if span.is_blank() && !config.comment_blank_lines {
            continue;
        }
        if mode == CommentMode::Toggle && strategy.is_commented(&span.text) {
            continue;
        }
        strategy.plan_comment(&mut plan, span, space);
    }

    if plan.is_empty() {
        if mode == CommentMode::Uncomment && config.has_block() {
            return stream_uncomment(surface, config);
        }
        return false;
    }
    plan.apply_with_selection(surface, selection);
    true
}

/// Wrap the selection in the stream comment tokens.
///
/// An empty selection wraps the current line from its indentation to its last non-blank
/// character. Languages without stream tokens fall back to commenting lines.
pub fn stream_comment(surface: &mut dyn TextSurface, config: &CommentConfig) -> bool {
    let (Some(open), Some(close)) = (config.block_start.as_deref(), config.block_end.as_deref())
    else {
        return config.has_line() && block_comment(surface, config, CommentMode::Comment);
    };
    if !config.has_block() {
        return config.has_line() && block_comment(surface, config, CommentMode::Comment);
    }
    if surface.selections().len() > 1 || surface.is_rectangular() {
        log::debug!("stream comment refused for multiple selections");
        return false;
    }

    let selection = surface.selection();
    let (start, end) = if selection.is_empty() {
        let line = surface.line_from_position(selection.caret);
        let start = surface.line_indent_position(line);
        let mut end = surface.line_end(line);
        while end > start && matches!(surface.byte_at(end - 1), Some(b' ' | b'\t')) {
            end -= 1;
        }
        (start, end)
    } else {
        (selection.start(), selection.end())
    };

    let space = if config.space_after_token { " " } else { "" };
    let mut plan = EditPlan::default();
    plan.insert(start, format!("{open}{space}"));
    plan.insert(end, format!("{space}{close}"));
    plan.apply(surface);

    let wrapped_end = end + open.len() + close.len() + 2 * space.len();
    if selection.is_empty() {
        surface.set_selection(wrapped_end, wrapped_end);
    } else if selection.caret_at_start() {
        surface.set_selection(wrapped_end, start);
    } else {
        surface.set_selection(start, wrapped_end);
    }
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StreamPair {
    open: usize,
    close: usize,
}

fn find(surface: &dyn TextSurface, token: &str, from: usize, to: usize) -> Option<usize> {
    surface
        .search_in_range(token, SearchFlags::MATCH_CASE, from, to)
        .range()
        .map(|(s, _)| s)
}

/// The stream pair enclosing `pos`: the nearest opening token at or before it, not closed
/// before `pos`, whose closing token ends at or after `pos`.
fn enclosing_pair(surface: &dyn TextSurface, open: &str, close: &str, pos: usize) -> Option<StreamPair> {
    let len = surface.len();
    let open_at = find(surface, open, (pos + open.len()).min(len), 0)?;
    if let Some(closed_at) = find(surface, close, pos, 0)
        && closed_at > open_at
    {
        return None;
    }
    let close_at = find(surface, close, open_at + open.len(), len)?;
    (close_at + close.len() >= pos).then_some(StreamPair {
        open: open_at,
        close: close_at,
    })
}

fn contained_pair(surface: &dyn TextSurface, open: &str, close: &str, start: usize, end: usize) -> Option<StreamPair> {
    let open_at = find(surface, open, start, end)?;
    let close_at = find(surface, close, open_at + open.len(), end)?;
    Some(StreamPair {
        open: open_at,
        close: close_at,
    })
}

/// Remove stream comment pairs around or inside the selection.
///
/// Each round removes one pair, chosen in priority order: the pair enclosing the selection
/// start, the pair enclosing the selection end, the first pair entirely inside the selection.
/// Rounds repeat until none applies. Returns `false` when the first round finds nothing.
pub fn stream_uncomment(surface: &mut dyn TextSurface, config: &CommentConfig) -> bool {
    let (Some(open), Some(close)) = (config.block_start.as_deref(), config.block_end.as_deref())
    else {
        return config.has_line() && block_comment(surface, config, CommentMode::Uncomment);
    };
    if !config.has_block() {
        return config.has_line() && block_comment(surface, config, CommentMode::Uncomment);
    }

    let original = surface.selection();
    let mut selection = original;
    let mut removed_any = false;
    surface.begin_undo_group();
    loop {
        let (start, end) = (selection.start(), selection.end());
        let view: &dyn TextSurface = surface;
        let pair = enclosing_pair(view, open, close, start)
            .or_else(|| {
                if end != start {
                    enclosing_pair(view, open, close, end)
                } else {
                    None
                }
            })
            .or_else(|| contained_pair(view, open, close, start, end));
        let Some(pair) = pair else {
            break;
        };

        let mut open_len = open.len();
        let mut close_at = pair.close;
        let mut close_len = close.len();
        if close_at > pair.open + open_len && surface.byte_at(close_at - 1) == Some(b' ') {
            close_at -= 1;
            close_len += 1;
        }
        if pair.open + open_len < close_at && surface.byte_at(pair.open + open_len) == Some(b' ') {
            open_len += 1;
        }

        let mut plan = EditPlan::default();
        plan.delete(pair.open, open_len);
        plan.delete(close_at, close_len);
        plan.apply(surface);
        selection = Selection::new(
            plan.map(selection.anchor, false),
            plan.map(selection.caret, false),
        );
        removed_any = true;
    }
    surface.end_undo_group();

    if removed_any {
        surface.set_selection(selection.anchor, selection.caret);
    }
    removed_any
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::surface::{SurfaceHandle, SurfaceId};
    use pretty_assertions::assert_eq;

    fn run(text: &str, sel: (usize, usize), f: impl FnOnce(&mut dyn TextSurface) -> bool) -> (String, Selection, bool) {
        let mut doc = Document::new(text);
        let mut surface = SurfaceHandle::new(&mut doc, SurfaceId::Main);
        surface.set_selection(sel.0, sel.1);
        let changed = f(&mut surface);
        (surface.text(), surface.selection(), changed)
    }

    #[test]
    fn plan_maps_offsets() {
        let mut plan = EditPlan::default();
        plan.insert(2, "ab");
        plan.delete(5, 3);
        assert_eq!(plan.map(1, false), 1);
        assert_eq!(plan.map(2, true), 2);
        assert_eq!(plan.map(2, false), 4);
        assert_eq!(plan.map(6, false), 7);
        assert_eq!(plan.map(9, false), 8);
    }

    #[test]
    fn toggle_comments_only_uncommented_lines() {
        let cfg = CommentConfig::line("//");
        let (text, _, changed) = run("a\n// b\n\n  c\n", (0, 11), |s| {
            block_comment(s, &cfg, CommentMode::Toggle)
        });
        assert!(changed);
        assert_eq!(text, "// a\n// b\n\n  // c\n");
    }

    #[test]
    fn selection_ending_at_column_zero_excludes_line() {
        let cfg = CommentConfig::line("#");
        let (text, sel, _) = run("x\ny\nz", (0, 4), |s| {
            block_comment(s, &cfg, CommentMode::Comment)
        });
        assert_eq!(text, "# x\n# y\nz");
        assert_eq!(sel, Selection::new(0, 8));
    }

    #[test]
    fn caret_side_is_preserved() {
        let cfg = CommentConfig::line("//");
        let (_, sel, _) = run("  one\n  two", (9, 3), |s| {
            block_comment(s, &cfg, CommentMode::Comment)
        });
        assert_eq!(sel, Selection::new(15, 6));
    }

    #[test]
    fn wrapped_lines_for_languages_without_line_token() {
        let cfg = CommentConfig::block("<!--", "-->");
        let (text, _, _) = run("<a/>\n<b/>", (0, 9), |s| {
            block_comment(s, &cfg, CommentMode::Toggle)
        });
        assert_eq!(text, "<!-- <a/> -->\n<!-- <b/> -->");
        let (text, _, _) = run(&text, (0, 27), |s| block_comment(s, &cfg, CommentMode::Toggle));
        assert_eq!(text, "<a/>\n<b/>");
    }

    #[test]
    fn stream_comment_wraps_trimmed_line() {
        let cfg = CommentConfig::line_and_block("//", "/*", "*/");
        let (text, sel, _) = run("  call();  \n", (4, 4), |s| stream_comment(s, &cfg));
        assert_eq!(text, "  /* call(); */  \n");
        assert_eq!(sel, Selection::caret(15));
    }

    #[test]
    fn stream_uncomment_removes_nearest_enclosing_pair() {
        let cfg = CommentConfig::line_and_block("//", "/*", "*/");
        let (text, _, changed) = run("a /* x */ b /* y */ c", (5, 6), |s| {
            stream_uncomment(s, &cfg)
        });
        assert!(changed);
        assert_eq!(text, "a x b /* y */ c");
    }

    #[test]
    fn stream_uncomment_reports_no_match() {
        let cfg = CommentConfig::block("/*", "*/");
        let (text, _, changed) = run("a */ b /* c", (4, 6), |s| stream_uncomment(s, &cfg));
        assert!(!changed);
        assert_eq!(text, "a */ b /* c");
    }

    #[test]
    fn uncomment_without_line_hits_falls_back_to_stream() {
        let cfg = CommentConfig::line_and_block("//", "/*", "*/");
        let (text, _, changed) = run("/* a */", (3, 3), |s| {
            block_comment(s, &cfg, CommentMode::Uncomment)
        });
        assert!(changed);
        assert_eq!(text, "a");
    }

    #[test]
    fn column_zero_tokens_without_space() {
        let cfg = twinpad_lang::LangType::BaanC.comment_config();
        let (text, _, _) = run("  x\n\ny", (0, 6), |s| {
            block_comment(s, &cfg, CommentMode::Toggle)
        });
        assert_eq!(text, "|  x\n|\n|y");
    }
}
