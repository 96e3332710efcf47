//! Brace matching and indentation maintenance.

use crate::line_ending::LineEnding;
use crate::surface::{SearchFlags, TextSurface};
use twinpad_lang::IndentStyle;

const CONDITION_EXPR: &str = r"((else[ \t]+)?if|for|while)[ \t]*[(].*[)][ \t]*|else[ \t]*";
const PYTHON_BLOCK_EXPR: &str = r":[ \t]*(#|$)";

fn partner(b: u8) -> Option<(u8, bool)> {
    match b {
        b'(' => Some((b')', true)),
        b'[' => Some((b']', true)),
        b'{' => Some((b'}', true)),
        b')' => Some((b'(', false)),
        b']' => Some((b'[', false)),
        b'}' => Some((b'{', false)),
        _ => None,
    }
}

/// Position of the brace matching the one at `pos`.
pub fn brace_match(surface: &dyn TextSurface, pos: usize) -> Option<usize> {
    let brace = surface.byte_at(pos)?;
    let (other, forward) = partner(brace)?;
    let mut depth = 0usize;
    if forward {
        for i in pos + 1..surface.len() {
            match surface.byte_at(i) {
                Some(b) if b == brace => depth += 1,
                Some(b) if b == other => {
                    if depth == 0 {
                        return Some(i);
                    }
                    depth -= 1;
                }
                _ => {}
            }
        }
    } else {
        for i in (0..pos).rev() {
            match surface.byte_at(i) {
                Some(b) if b == brace => depth += 1,
                Some(b) if b == other => {
                    if depth == 0 {
                        return Some(i);
                    }
                    depth -= 1;
                }
                _ => {}
            }
        }
    }
    None
}

/// The brace at the caret and its partner.
///
/// The character before the caret takes priority over the one after it.
pub fn find_matching_brace(surface: &dyn TextSurface) -> Option<(usize, usize)> {
    let caret = surface.selection().caret;
    let at_caret = [caret.checked_sub(1), Some(caret)]
        .into_iter()
        .flatten()
        .find(|p| surface.byte_at(*p).and_then(partner).is_some())?;
    let opposite = brace_match(surface, at_caret)?;
    Some((at_caret, opposite))
}

/// Move the caret onto the matching brace.
pub fn goto_matching_brace(surface: &mut dyn TextSurface) -> bool {
    let Some((_, opposite)) = find_matching_brace(surface) else {
        return false;
    };
    surface.set_selection(opposite, opposite);
    true
}

/// Select from the brace at the caret through its partner, both braces included.
pub fn select_to_matching_brace(surface: &mut dyn TextSurface) -> bool {
    let Some((brace, opposite)) = find_matching_brace(surface) else {
        return false;
    };
    surface.set_selection(brace.min(opposite), brace.max(opposite) + 1);
    true
}

fn line_is_empty(surface: &dyn TextSurface, line: usize) -> bool {
    surface.line_start(line) == surface.line_end(line)
}

/// Indentation of the closest non-empty line at or above `line`.
fn previous_indent(surface: &dyn TextSurface, line: Option<usize>) -> (Option<usize>, usize) {
    let mut line = line;
    while let Some(l) = line {
        if !line_is_empty(surface, l) {
            return (Some(l), surface.line_indentation(l));
        }
        line = l.checked_sub(1);
    }
    (None, 0)
}

fn matches_to_line_end(surface: &dyn TextSurface, line: usize, pattern: &str) -> bool {
    let end = surface.line_end(line);
    surface
        .search_in_range(
            pattern,
            SearchFlags::REGEX | SearchFlags::MATCH_CASE,
            surface.line_start(line),
            end,
        )
        .range()
        .is_some_and(|(_, e)| e == end)
}

fn is_condition_line(surface: &dyn TextSurface, line: usize) -> bool {
    matches_to_line_end(surface, line, CONDITION_EXPR)
}

/// Adjust indentation after `ch` was typed at the caret.
///
/// `ch` is the line-break character that ends a line for the document's EOL style (`'\n'`,
/// or `'\r'` for CR documents), `'{'` or `'}'`.
pub fn maintain_indentation(surface: &mut dyn TextSurface, ch: char, style: IndentStyle) {
    let eol = surface.eol();
    let newline = match eol {
        LineEnding::Cr => ch == '\r',
        _ => ch == '\n',
    };
    let caret = surface.selection().caret;
    let line = surface.line_from_position(caret);
    let prev_line = line.checked_sub(1);
    let tab_width = surface.tab_width();

    if newline && prev_line.is_some_and(|l| line_is_empty(surface, l)) {
        return;
    }

    match style {
        IndentStyle::CLike {
            single_line_control,
        } => {
            if newline {
                let (prev, indent) = previous_indent(surface, prev_line);
                let back = if eol == LineEnding::Crlf { 3 } else { 2 };
                let prev_char = caret.checked_sub(back).and_then(|p| surface.byte_at(p));
                let next_char = surface.byte_at(caret);

                if prev_char == Some(b'{') {
                    if next_char == Some(b'}') {
                        surface.insert(caret, eol.as_str());
                        surface.set_line_indentation(line + 1, indent);
                    }
                    surface.set_line_indentation(line, indent + tab_width);
                } else if next_char == Some(b'{') || !single_line_control {
                    surface.set_line_indentation(line, indent);
                } else if prev.is_some_and(|l| is_condition_line(surface, l)) {
                    surface.set_line_indentation(line, indent + tab_width);
                } else if indent > 0 {
                    let after_condition = prev
                        .and_then(|l| l.checked_sub(1))
                        .is_some_and(|l| is_condition_line(surface, l));
                    if after_condition {
                        surface.set_line_indentation(line, indent.saturating_sub(tab_width));
                    } else {
                        surface.set_line_indentation(line, indent);
                    }
                }
            } else if ch == '{' {
                let start = surface.line_start(line);
                let brace = caret.saturating_sub(1);
                let only_blanks_before =
                    (start..brace).all(|p| matches!(surface.byte_at(p), Some(b' ' | b'\t')));
                if !only_blanks_before {
                    return;
                }
                let (prev, mut indent) = previous_indent(surface, prev_line);
                if let Some(p) = prev
                    && surface
                        .text_range(surface.line_start(p), surface.line_end(p))
                        .contains('{')
                {
                    indent += tab_width;
                }
                surface.set_line_indentation(line, indent);
            } else if ch == '}' {
                let Some(open) = brace_match(surface, caret.saturating_sub(1)) else {
                    return;
                };
                let open_line = surface.line_from_position(open);
                if open_line == line {
                    return;
                }
                let indent = surface.line_indentation(open_line);
                surface.set_line_indentation(line, indent);
            }
        }
        IndentStyle::Python => {
            if newline {
                let (prev, indent) = previous_indent(surface, prev_line);
                let opens_block = prev.is_some_and(|l| {
                    surface
                        .search_in_range(
                            PYTHON_BLOCK_EXPR,
                            SearchFlags::REGEX | SearchFlags::MATCH_CASE,
                            surface.line_start(l),
                            surface.line_end(l),
                        )
                        .range()
                        .is_some()
                });
                if opens_block {
                    surface.set_line_indentation(line, indent + tab_width);
                } else if indent > 0 {
                    surface.set_line_indentation(line, indent);
                }
            }
        }
        IndentStyle::Basic => {
            if newline {
                let (_, indent) = previous_indent(surface, prev_line);
                if indent > 0 {
                    surface.set_line_indentation(line, indent);
                }
            }
        }
    }
}
