//! File encodings.
//!
//! Documents are always held as UTF-8 in memory; the buffer remembers the encoding it was
//! loaded with so it can be written back the same way. Sniffing follows this order:
//! byte-order mark, strict UTF-8 validation, then `chardetng` for inputs no larger than the
//! configured detection cap. Inputs above the cap skip sniffing and use the fallback code page.

use std::borrow::Cow;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const UTF16LE_BOM: &[u8] = &[0xFF, 0xFE];
const UTF16BE_BOM: &[u8] = &[0xFE, 0xFF];

/// The on-disk encoding of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    /// UTF-8 without BOM.
    #[default]
    Utf8,
    /// UTF-8 with a leading BOM.
    Utf8Bom,
    /// UTF-16 little endian with BOM.
    Utf16Le,
    /// UTF-16 big endian with BOM.
    Utf16Be,
    /// A single or multi-byte legacy code page.
    CodePage(&'static encoding_rs::Encoding),
}

/// How a text surface interprets document bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CodePage {
    /// Multi-byte UTF-8 aware.
    #[default]
    Utf8,
    /// Legacy single/double byte code page.
    Ansi,
}

impl Encoding {
    /// Stable label, used in session files.
    pub fn label(self) -> &'static str {
        match self {
            Self::Utf8 => "UTF-8",
            Self::Utf8Bom => "UTF-8-BOM",
            Self::Utf16Le => "UTF-16LE",
            Self::Utf16Be => "UTF-16BE",
            Self::CodePage(enc) => enc.name(),
        }
    }

    /// Parse a label produced by [`Encoding::label`] or any WHATWG encoding label.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.to_ascii_uppercase().as_str() {
            "UTF-8" | "UTF8" => return Some(Self::Utf8),
            "UTF-8-BOM" => return Some(Self::Utf8Bom),
            "UTF-16LE" => return Some(Self::Utf16Le),
            "UTF-16BE" => return Some(Self::Utf16Be),
            _ => {}
        }
        let enc = encoding_rs::Encoding::for_label(label.as_bytes())?;
        Some(Self::from_rs(enc))
    }

    fn from_rs(enc: &'static encoding_rs::Encoding) -> Self {
        if enc == encoding_rs::UTF_8 {
            Self::Utf8
        } else if enc == encoding_rs::UTF_16LE {
            Self::Utf16Le
        } else if enc == encoding_rs::UTF_16BE {
            Self::Utf16Be
        } else {
            Self::CodePage(enc)
        }
    }

    /// The code page a surface should use to display this encoding.
    pub fn code_page(self) -> CodePage {
        match self {
            Self::CodePage(_) => CodePage::Ansi,
            _ => CodePage::Utf8,
        }
    }

    /// Returns `true` for the Unicode encodings.
    pub fn is_unicode(self) -> bool {
        !matches!(self, Self::CodePage(_))
    }

    /// Encode UTF-8 `text` for writing to disk.
    pub fn encode(self, text: &str) -> Vec<u8> {
        match self {
            Self::Utf8 => text.as_bytes().to_vec(),
            Self::Utf8Bom => {
                let mut out = Vec::with_capacity(text.len() + UTF8_BOM.len());
                out.extend_from_slice(UTF8_BOM);
                out.extend_from_slice(text.as_bytes());
                out
            }
            Self::Utf16Le => {
                let mut out = Vec::with_capacity(text.len() * 2 + 2);
                out.extend_from_slice(UTF16LE_BOM);
                for unit in text.encode_utf16() {
                    out.extend_from_slice(&unit.to_le_bytes());
                }
                out
            }
            Self::Utf16Be => {
                let mut out = Vec::with_capacity(text.len() * 2 + 2);
                out.extend_from_slice(UTF16BE_BOM);
                for unit in text.encode_utf16() {
                    out.extend_from_slice(&unit.to_be_bytes());
                }
                out
            }
            Self::CodePage(enc) => {
                let (bytes, _, _) = enc.encode(text);
                bytes.into_owned()
            }
        }
    }

    /// Decode `bytes` that are known to be in this encoding.
    ///
    /// Returns `None` when the input contains malformed sequences.
    pub fn decode(self, bytes: &[u8]) -> Option<String> {
        let (enc, body) = match self {
            Self::Utf8 => (encoding_rs::UTF_8, bytes),
            Self::Utf8Bom => (
                encoding_rs::UTF_8,
                bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes),
            ),
            Self::Utf16Le => (
                encoding_rs::UTF_16LE,
                bytes.strip_prefix(UTF16LE_BOM).unwrap_or(bytes),
            ),
            Self::Utf16Be => (
                encoding_rs::UTF_16BE,
                bytes.strip_prefix(UTF16BE_BOM).unwrap_or(bytes),
            ),
            Self::CodePage(enc) => (enc, bytes),
        };
        let (text, had_errors) = enc.decode_without_bom_handling(body);
        if had_errors {
            return None;
        }
        Some(text.into_owned())
    }
}

/// Sniff the encoding of `bytes` and decode them.
///
/// `detection_cap` bounds how many bytes may be handed to the statistical detector; larger
/// inputs that are not valid UTF-8 are decoded with `fallback` instead.
pub fn sniff_and_decode(
    bytes: &[u8],
    detection_cap: usize,
    fallback: &'static encoding_rs::Encoding,
) -> (String, Encoding) {
    if let Some(body) = bytes.strip_prefix(UTF8_BOM) {
        return (
            String::from_utf8_lossy(body).into_owned(),
            Encoding::Utf8Bom,
        );
    }
    if bytes.starts_with(UTF16LE_BOM) || bytes.starts_with(UTF16BE_BOM) {
        let (enc, body) = if bytes.starts_with(UTF16LE_BOM) {
            (Encoding::Utf16Le, &bytes[2..])
        } else {
            (Encoding::Utf16Be, &bytes[2..])
        };
        let rs = if enc == Encoding::Utf16Le {
            encoding_rs::UTF_16LE
        } else {
            encoding_rs::UTF_16BE
        };
        let (text, _) = rs.decode_without_bom_handling(body);
        return (text.into_owned(), enc);
    }

    if let Ok(text) = std::str::from_utf8(bytes) {
        return (text.to_string(), Encoding::Utf8);
    }

    let guessed = if bytes.len() <= detection_cap {
        let mut detector = chardetng::EncodingDetector::new();
        detector.feed(bytes, true);
        detector.guess(None, true)
    } else {
        log::debug!(
            "skipping encoding detection for {} bytes (cap {})",
            bytes.len(),
            detection_cap
        );
        fallback
    };

    let (text, _): (Cow<'_, str>, bool) = guessed.decode_without_bom_handling(bytes);
    (text.into_owned(), Encoding::from_rs(guessed))
}
