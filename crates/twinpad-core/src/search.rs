//! Find and replace over documents.
//!
//! A [`FindOptions`] block is compiled once into a [`CompiledSearch`] (so a malformed
//! expression is reported before any document is touched) and then run against surfaces.
//! Offsets are byte offsets. Three modes are supported:
//!
//! - normal: the pattern is a literal string
//! - extended: a literal string with backslash escapes (`\n`, `\t`, `\x41`, ...)
//! - regex: a regular expression; replacements may refer to groups as `$1` or `\1`

use crate::error::FindError;
use crate::surface::{TextSurface, is_word_bounded};
use regex::{Regex, RegexBuilder};
use std::path::{Path, PathBuf};

/// How the pattern is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    /// Literal text.
    #[default]
    Normal,
    /// Literal text with backslash escapes.
    Extended,
    /// Regular expression.
    Regex,
}

/// Parameters of one find or replace operation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FindOptions {
    /// What to look for.
    pub pattern: String,
    /// Replacement text.
    pub replacement: String,
    /// Pattern interpretation.
    pub mode: SearchMode,
    /// Case-sensitive matching.
    pub match_case: bool,
    /// Only matches delimited by non-word characters.
    pub whole_word: bool,
    /// In regex mode, `.` also matches line breaks.
    pub dot_matches_newline: bool,
}

impl FindOptions {
    /// Literal, case-sensitive search for `pattern`.
    pub fn literal(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            match_case: true,
            ..Self::default()
        }
    }

    /// Regex search for `pattern`.
    pub fn regex(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            mode: SearchMode::Regex,
            match_case: true,
            ..Self::default()
        }
    }

    /// Set the replacement text.
    pub fn with_replacement(mut self, replacement: impl Into<String>) -> Self {
        self.replacement = replacement.into();
        self
    }
}

/// One match found while collecting results, located by line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRecord {
    /// File the match belongs to (`None` for untitled buffers).
    pub path: Option<PathBuf>,
    /// One-based line number.
    pub line: usize,
    /// Text of the line, without its line break.
    pub line_text: String,
    /// Byte range of the match within `line_text` (clipped at the line end).
    pub range: std::ops::Range<usize>,
}

/// Expand extended-mode escapes: `\n \r \t \0 \\ \xHH \oOOO \dDDD \bBBBBBBBB \uHHHH`.
///
/// Unknown or malformed escapes are kept verbatim.
pub fn expand_escapes(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.char_indices().peekable();
    while let Some((i, ch)) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        let Some(&(_, code)) = chars.peek() else {
            out.push('\\');
            break;
        };
        let simple = match code {
            'n' => Some('\n'),
            'r' => Some('\r'),
            't' => Some('\t'),
            '0' => Some('\0'),
            '\\' => Some('\\'),
            _ => None,
        };
        if let Some(c) = simple {
            chars.next();
            out.push(c);
            continue;
        }
        let numeric = match code {
            'x' => Some((16, 2)),
            'o' => Some((8, 3)),
            'd' => Some((10, 3)),
            'b' => Some((2, 8)),
            'u' => Some((16, 4)),
            _ => None,
        };
        let digits_start = i + 2;
        let parsed = numeric.and_then(|(radix, width)| {
            let digits = input.get(digits_start..digits_start + width)?;
            let value = u32::from_str_radix(digits, radix).ok()?;
            let c = if code == 'u' {
                char::from_u32(value)?
            } else {
                char::from(u8::try_from(value).ok()?)
            };
            Some((c, width))
        });
        match parsed {
            Some((c, width)) => {
                chars.next();
                for _ in 0..width {
                    chars.next();
                }
                out.push(c);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Turn `\N` group references into `${N}` and expand `\n`, `\r`, `\t`, `\\`.
fn regex_replacement(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.peek().copied() {
            Some(d) if d.is_ascii_digit() => {
                chars.next();
                out.push_str(&format!("${{{d}}}"));
            }
            Some('n') => {
                chars.next();
                out.push('\n');
            }
            Some('r') => {
                chars.next();
                out.push('\r');
            }
            Some('t') => {
                chars.next();
                out.push('\t');
            }
            Some('\\') => {
                chars.next();
                out.push('\\');
            }
            _ => out.push('\\'),
        }
    }
    out
}

/// A validated search ready to run against any number of documents.
#[derive(Debug, Clone)]
pub struct CompiledSearch {
    regex: Regex,
    replacement: String,
    expand_groups: bool,
    whole_word: bool,
}

impl CompiledSearch {
    /// Compile `options`. An empty pattern or an invalid expression is rejected.
    pub fn new(options: &FindOptions) -> Result<Self, FindError> {
        if options.pattern.is_empty() {
            return Err(FindError::MalformedPattern("empty pattern".to_string()));
        }
        let (source, replacement, expand_groups) = match options.mode {
            SearchMode::Normal => (
                regex::escape(&options.pattern),
                options.replacement.clone(),
                false,
            ),
            SearchMode::Extended => (
                regex::escape(&expand_escapes(&options.pattern)),
                expand_escapes(&options.replacement),
                false,
            ),
            SearchMode::Regex => (
                options.pattern.clone(),
                regex_replacement(&options.replacement),
                true,
            ),
        };
        let regex = RegexBuilder::new(&source)
            .case_insensitive(!options.match_case)
            .multi_line(true)
            .crlf(true)
            .dot_matches_new_line(options.dot_matches_newline)
            .build()
            .map_err(|e| FindError::MalformedPattern(e.to_string()))?;
        Ok(Self {
            regex,
            replacement,
            expand_groups,
            whole_word: options.whole_word,
        })
    }

    /// All non-empty matches in `text`.
    pub fn find_all(&self, text: &str) -> Vec<(usize, usize)> {
        self.regex
            .find_iter(text)
            .map(|m| (m.start(), m.end()))
            .filter(|(s, e)| s < e && (!self.whole_word || is_word_bounded(text, *s, *e)))
            .collect()
    }

    /// Number of matches in `text`.
    pub fn count(&self, text: &str) -> usize {
        self.find_all(text).len()
    }

    /// First match starting at or after `from`.
    pub fn find_forward(&self, text: &str, from: usize) -> Option<(usize, usize)> {
        self.find_all(text).into_iter().find(|(s, _)| *s >= from)
    }

    /// Last match ending at or before `before`.
    pub fn find_backward(&self, text: &str, before: usize) -> Option<(usize, usize)> {
        self.find_all(text).into_iter().rev().find(|(_, e)| *e <= before)
    }

    fn replacement_for(&self, text: &str, start: usize) -> String {
        if !self.expand_groups {
            return self.replacement.clone();
        }
        let mut out = String::new();
        if let Some(caps) = self.regex.captures_at(text, start) {
            caps.expand(&self.replacement, &mut out);
        }
        out
    }

    /// Replace every match on `surface` inside one undo group. Returns the number replaced.
    pub fn replace_all(&self, surface: &mut dyn TextSurface) -> usize {
        let text = surface.text();
        let matches = self.find_all(&text);
        if matches.is_empty() {
            return 0;
        }
        surface.begin_undo_group();
        for (start, end) in matches.iter().rev() {
            let replacement = self.replacement_for(&text, *start);
            surface.replace_range(*start, *end, &replacement);
        }
        surface.end_undo_group();
        matches.len()
    }

    /// Locate every match on `surface` as line records.
    pub fn collect(&self, surface: &dyn TextSurface, path: Option<&Path>) -> Vec<MatchRecord> {
        let text = surface.text();
        self.find_all(&text)
            .into_iter()
            .map(|(start, end)| {
                let line = surface.line_from_position(start);
                let line_start = surface.line_start(line);
                let line_end = surface.line_end(line);
                MatchRecord {
                    path: path.map(Path::to_path_buf),
                    line: line + 1,
                    line_text: surface.text_range(line_start, line_end),
                    range: start - line_start..end.min(line_end).max(start) - line_start,
                }
            })
            .collect()
    }

    /// Bookmark every line holding a match. Returns the number of lines newly marked.
    pub fn bookmark_matches(&self, surface: &mut dyn TextSurface) -> usize {
        let text = surface.text();
        let mut marked = 0;
        for (start, _) in self.find_all(&text) {
            let line = surface.line_from_position(start);
            if !surface.is_bookmarked(line) {
                surface.set_bookmark(line, true);
                marked += 1;
            }
        }
        marked
    }
}

/// Find the next match after the selection (or before it when `forward` is false) and
/// select it. With `wrap`, the search continues from the other end of the document.
pub fn find_next(
    surface: &mut dyn TextSurface,
    search: &CompiledSearch,
    forward: bool,
    wrap: bool,
) -> Option<(usize, usize)> {
    let text = surface.text();
    let selection = surface.selection();
    let found = if forward {
        search
            .find_forward(&text, selection.end())
            .or_else(|| wrap.then(|| search.find_forward(&text, 0)).flatten())
    } else {
        search
            .find_backward(&text, selection.start())
            .or_else(|| wrap.then(|| search.find_backward(&text, text.len())).flatten())
    };
    let (start, end) = found?;
    surface.set_selection(start, end);
    Some((start, end))
}

/// Replace the current match if the selection is one, then move to the next match.
///
/// Returns `true` if a replacement happened.
pub fn replace_next(surface: &mut dyn TextSurface, search: &CompiledSearch, wrap: bool) -> bool {
    let text = surface.text();
    let selection = surface.selection();
    let is_match = search
        .find_all(&text)
        .contains(&(selection.start(), selection.end()));
    if is_match {
        let replacement = search.replacement_for(&text, selection.start());
        surface.replace_range(selection.start(), selection.end(), &replacement);
        let caret = selection.start() + replacement.len();
        surface.set_selection(caret, caret);
    }
    find_next(surface, search, true, wrap);
    is_match
}
