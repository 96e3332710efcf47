#![warn(missing_docs)]
//! `twinpad-lang` - data-driven language tables for `twinpad-core`.
//!
//! This crate intentionally stays lightweight and has no dependencies. It answers three
//! questions the kernel asks about a document's language:
//!
//! - which comment tokens exist, and how they are inserted ([`CommentConfig`])
//! - how indentation is maintained while typing ([`IndentStyle`])
//! - which language a file path (or its first line) belongs to ([`LangType::detect`])

use std::path::Path;

/// Comment tokens/config for a given language.
///
/// The kernel uses this to implement block-line, single-line-stream and stream comment
/// toggling without knowing anything else about the language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentConfig {
    /// Line comment token (e.g. `//`, `#`).
    pub line: Option<String>,
    /// Stream comment start token (e.g. `/*`).
    pub block_start: Option<String>,
    /// Stream comment end token (e.g. `*/`).
    pub block_end: Option<String>,
    /// Insert a single space after the token when commenting.
    pub space_after_token: bool,
    /// Insert the token after leading whitespace (`true`) or at column 0 (`false`).
    pub at_indentation: bool,
    /// Comment lines that are empty or whitespace-only.
    pub comment_blank_lines: bool,
}

impl Default for CommentConfig {
    fn default() -> Self {
        Self {
            line: None,
            block_start: None,
            block_end: None,
            space_after_token: true,
            at_indentation: true,
            comment_blank_lines: false,
        }
    }
}

impl CommentConfig {
    /// Create a config that supports only line comments.
    pub fn line(token: impl Into<String>) -> Self {
        Self {
            line: Some(token.into()),
            ..Self::default()
        }
    }

    /// Create a config that supports only stream comments.
    pub fn block(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            block_start: Some(start.into()),
            block_end: Some(end.into()),
            ..Self::default()
        }
    }

    /// Create a config that supports both line and stream comments.
    pub fn line_and_block(
        line: impl Into<String>,
        block_start: impl Into<String>,
        block_end: impl Into<String>,
    ) -> Self {
        Self {
            line: Some(line.into()),
            block_start: Some(block_start.into()),
            block_end: Some(block_end.into()),
            ..Self::default()
        }
    }

    /// Disable the space normally inserted after a comment token.
    pub fn without_space(mut self) -> Self {
        self.space_after_token = false;
        self
    }

    /// Place comment tokens at column 0 instead of after the indentation.
    pub fn at_line_start(mut self) -> Self {
        self.at_indentation = false;
        self
    }

    /// Also comment empty and whitespace-only lines.
    pub fn with_blank_lines(mut self) -> Self {
        self.comment_blank_lines = true;
        self
    }

    /// Returns `true` if a line comment token is configured.
    pub fn has_line(&self) -> bool {
        self.line.as_deref().is_some_and(|s| !s.is_empty())
    }

    /// Returns `true` if both stream comment tokens are configured.
    pub fn has_block(&self) -> bool {
        self.block_start.as_deref().is_some_and(|s| !s.is_empty())
            && self.block_end.as_deref().is_some_and(|s| !s.is_empty())
    }
}

/// How indentation is maintained when a newline or brace is typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndentStyle {
    /// Copy the previous non-empty line's indentation on newline.
    Basic,
    /// Brace-aware indentation for C-family languages.
    CLike {
        /// Whether `if (..)`/`for (..)`/`while (..)`/`else` lines without braces indent
        /// the following line.
        single_line_control: bool,
    },
    /// Indent after a line ending with `:`.
    Python,
}

macro_rules! languages {
    ($($variant:ident => $name:literal),* $(,)?) => {
        /// A language known to the editor.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub enum LangType {
            /// Plain text (no comment tokens).
            #[default]
            Text,
            $(
                #[doc = $name]
                $variant,
            )*
        }

        impl LangType {
            /// All languages, plain text first.
            pub const ALL: &'static [LangType] = &[LangType::Text, $(LangType::$variant),*];

            /// Stable display name, also used in session files.
            pub fn name(self) -> &'static str {
                match self {
                    LangType::Text => "Normal text",
                    $(LangType::$variant => $name,)*
                }
            }
        }
    };
}

languages! {
    C => "C",
    Cpp => "C++",
    CSharp => "C#",
    Java => "Java",
    ObjC => "Objective-C",
    JavaScript => "JavaScript",
    TypeScript => "TypeScript",
    Php => "PHP",
    Css => "CSS",
    Html => "HTML",
    Xml => "XML",
    Json => "JSON",
    Rust => "Rust",
    Go => "Go",
    Perl => "Perl",
    PowerShell => "PowerShell",
    Python => "Python",
    Ruby => "Ruby",
    Lua => "Lua",
    Sql => "SQL",
    Bash => "Shell",
    Batch => "Batch",
    Ini => "INI",
    Makefile => "Makefile",
    Yaml => "YAML",
    Toml => "TOML",
    Haskell => "Haskell",
    Pascal => "Pascal",
    VisualBasic => "Visual Basic",
    Fortran77 => "Fortran (fixed form)",
    BaanC => "BaanC",
    Latex => "LaTeX",
    Matlab => "Matlab",
    Asm => "Assembly",
}

impl LangType {
    /// Look up a language by its [`LangType::name`] (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|lang| lang.name().eq_ignore_ascii_case(name))
    }

    /// Map a file extension (without the dot, any case) to a language.
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_ascii_lowercase();
        let lang = match ext.as_str() {
            "c" => LangType::C,
            "cpp" | "cxx" | "cc" | "h" | "hpp" | "hxx" | "hh" | "ino" => LangType::Cpp,
            "cs" => LangType::CSharp,
            "java" => LangType::Java,
            "m" | "mm" => LangType::ObjC,
            "js" | "mjs" | "cjs" | "jsx" => LangType::JavaScript,
            "ts" | "tsx" => LangType::TypeScript,
            "php" | "php3" | "php4" | "php5" | "phtml" => LangType::Php,
            "css" => LangType::Css,
            "html" | "htm" | "shtml" | "xhtml" => LangType::Html,
            "xml" | "xsl" | "xsd" | "svg" | "xaml" | "vcxproj" | "csproj" => LangType::Xml,
            "json" => LangType::Json,
            "rs" => LangType::Rust,
            "go" => LangType::Go,
            "pl" | "pm" | "plx" => LangType::Perl,
            "ps1" | "psm1" | "psd1" => LangType::PowerShell,
            "py" | "pyw" => LangType::Python,
            "rb" | "rbw" => LangType::Ruby,
            "lua" => LangType::Lua,
            "sql" => LangType::Sql,
            "sh" | "bash" | "zsh" | "ksh" => LangType::Bash,
            "bat" | "cmd" | "nt" => LangType::Batch,
            "ini" | "inf" | "reg" | "url" | "cfg" => LangType::Ini,
            "mak" | "mk" => LangType::Makefile,
            "yml" | "yaml" => LangType::Yaml,
            "toml" => LangType::Toml,
            "hs" | "lhs" => LangType::Haskell,
            "pas" | "pp" | "dpr" | "dpk" => LangType::Pascal,
            "vb" | "vbs" | "bas" | "frm" => LangType::VisualBasic,
            "f" | "for" | "f77" => LangType::Fortran77,
            "bc" | "cln" => LangType::BaanC,
            "tex" | "sty" => LangType::Latex,
            "asm" | "s" => LangType::Asm,
            _ => return None,
        };
        Some(lang)
    }

    /// Detect a language from a shebang (`#!...`) first line.
    pub fn from_shebang(first_line: &str) -> Option<Self> {
        let rest = first_line.strip_prefix("#!")?;
        let mut words = rest.split_whitespace();
        let program = words.next()?;
        let program = match program.rsplit('/').next() {
            Some("env") => words.next()?,
            Some(name) => name,
            None => program,
        };
        let program = program.trim_end_matches(|c: char| c.is_ascii_digit() || c == '.');
        match program {
            "sh" | "bash" | "zsh" | "ksh" | "dash" => Some(LangType::Bash),
            "python" => Some(LangType::Python),
            "perl" => Some(LangType::Perl),
            "ruby" => Some(LangType::Ruby),
            "lua" => Some(LangType::Lua),
            "node" => Some(LangType::JavaScript),
            "pwsh" => Some(LangType::PowerShell),
            "php" => Some(LangType::Php),
            _ => None,
        }
    }

    /// Detect a language from a path's file name/extension, falling back to the first line.
    pub fn detect(path: &Path, first_line: &str) -> Self {
        let by_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| match name.to_ascii_lowercase().as_str() {
                "makefile" | "gnumakefile" => Some(LangType::Makefile),
                _ => None,
            });

        by_name
            .or_else(|| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .and_then(Self::from_extension)
            })
            .or_else(|| Self::from_shebang(first_line))
            .unwrap_or_default()
    }

    /// Comment tokens and flags for this language.
    pub fn comment_config(self) -> CommentConfig {
        use LangType::*;
        match self {
            Text => CommentConfig::default(),
            C | Cpp | CSharp | Java | ObjC | JavaScript | TypeScript | Php | Rust | Go => {
                CommentConfig::line_and_block("//", "/*", "*/")
            }
            Css => CommentConfig::block("/*", "*/"),
            Html | Xml => CommentConfig::block("<!--", "-->"),
            Json => CommentConfig::default(),
            Perl | Python | Bash | Makefile | Yaml | Toml => CommentConfig::line("#"),
            PowerShell => CommentConfig::line_and_block("#", "<#", "#>"),
            Ruby => CommentConfig::line_and_block("#", "=begin", "=end"),
            Lua => CommentConfig::line_and_block("--", "--[[", "]]"),
            Sql => CommentConfig::line_and_block("--", "/*", "*/"),
            Batch => CommentConfig::line("REM"),
            Ini => CommentConfig::line(";"),
            Haskell => CommentConfig::line_and_block("--", "{-", "-}"),
            Pascal => CommentConfig::line_and_block("//", "{", "}"),
            VisualBasic => CommentConfig::line("'"),
            Fortran77 => CommentConfig::line("C").at_line_start(),
            BaanC => CommentConfig::line_and_block("|", "DllUsage", "EndDllUsage")
                .without_space()
                .at_line_start()
                .with_blank_lines(),
            Latex => CommentConfig::line("%"),
            Matlab => CommentConfig::line_and_block("%", "%{", "%}"),
            Asm => CommentConfig::line(";"),
        }
    }

    /// Indentation maintenance style for this language.
    pub fn indent_style(self) -> IndentStyle {
        use LangType::*;
        match self {
            C | Cpp | CSharp | Java | ObjC | JavaScript | TypeScript | Php | Css | Go => {
                IndentStyle::CLike {
                    single_line_control: true,
                }
            }
            Perl | Rust | PowerShell | Json => IndentStyle::CLike {
                single_line_control: false,
            },
            Python => IndentStyle::Python,
            _ => IndentStyle::Basic,
        }
    }
}
