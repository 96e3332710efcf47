//! Line ending helpers.
//!
//! Documents keep their line breaks exactly as loaded. The buffer's [`LineEnding`] is the style
//! used for newly typed line breaks and the target of explicit EOL conversion.

use serde::{Deserialize, Serialize};

/// A newline sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LineEnding {
    /// Windows-style CRLF (`"\r\n"`).
    Crlf,
    /// Unix-style LF (`'\n'`).
    #[default]
    Lf,
    /// Classic Mac CR (`'\r'`).
    Cr,
}

impl LineEnding {
    /// The newline sequence as a string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Crlf => "\r\n",
            Self::Lf => "\n",
            Self::Cr => "\r",
        }
    }

    /// Detect the dominant line ending from a source text.
    ///
    /// Policy: the first line break found decides; a text without line breaks is
    /// [`LineEnding::Lf`].
    pub fn detect_in_text(text: &str) -> Self {
        let bytes = text.as_bytes();
        match first_line_break(bytes) {
            Some(i) if bytes[i] == b'\n' => Self::Lf,
            Some(i) if bytes.get(i + 1) == Some(&b'\n') => Self::Crlf,
            Some(_) => Self::Cr,
            None => Self::Lf,
        }
    }

    /// Rewrite every line break in `text` to this line ending.
    pub fn apply_to_text(self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut chars = text.chars().peekable();
        while let Some(ch) = chars.next() {
            match ch {
                '\r' => {
                    if chars.peek() == Some(&'\n') {
                        chars.next();
                    }
                    out.push_str(self.as_str());
                }
                '\n' => out.push_str(self.as_str()),
                _ => out.push(ch),
            }
        }
        out
    }
}

fn first_line_break(bytes: &[u8]) -> Option<usize> {
    bytes.iter().position(|b| *b == b'\n' || *b == b'\r')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_uses_first_break() {
        assert_eq!(LineEnding::detect_in_text("a\r\nb\nc"), LineEnding::Crlf);
        assert_eq!(LineEnding::detect_in_text("a\nb\r\n"), LineEnding::Lf);
        assert_eq!(LineEnding::detect_in_text("a\rb"), LineEnding::Cr);
        assert_eq!(LineEnding::detect_in_text("abc"), LineEnding::Lf);
    }

    #[test]
    fn apply_normalizes_mixed_breaks() {
        assert_eq!(LineEnding::Crlf.apply_to_text("a\nb\rc\r\nd"), "a\r\nb\r\nc\r\nd");
        assert_eq!(LineEnding::Lf.apply_to_text("a\r\nb\r"), "a\nb\n");
        assert_eq!(LineEnding::Cr.apply_to_text("a\nb"), "a\rb");
    }
}
