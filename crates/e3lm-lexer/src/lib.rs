//! 3lm Lexer
//!
//! Tokenizes `.3lm` source files into a stream of tokens.
//! Handles imports, class blocks closed by `end`, attribute expressions,
//! quoted strings and literal body blocks delimited by `---` markers.
//!
//! The work is split into stages that pull tokens from one another:
//! [`preprocess`] inlines imports, [`line_index`] records per-line metadata,
//! [`scanner`] runs the mode-based state machine, [`strings`] assembles
//! string literals and [`post`] filters the stream and enforces adjacency.
//!
//! # Example
//!
//! ```
//! use e3lm_lexer::{tokenize, TokenKind};
//!
//! let tokens = tokenize("Foo\n  x = 1\nend\n", "<string>").unwrap();
//! let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
//! assert_eq!(
//!     kinds,
//!     [TokenKind::Class, TokenKind::Attr, TokenKind::NumInt, TokenKind::End, TokenKind::Eof]
//! );
//! ```

pub mod body;
pub mod config;
pub mod indent;
pub mod lexer;
pub mod line_index;
pub mod post;
pub mod preprocess;
pub mod rules;
pub mod scanner;
pub mod source;
pub mod strings;
pub mod token;

pub use config::LexerConfig;
pub use lexer::{tokenize, tokenize_file, Lexer};
pub use source::Source;
pub use token::{BodyValue, Category, Span, Token, TokenKind, TokenValue};

use std::fmt;

/// Path reported for text that did not come from a file.
pub const STRING_ORIGIN: &str = "<string>";

/// Error classification, mirroring the families a caller can react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No rule matched at the cursor.
    Lex,
    /// Structural or syntax violation: missing `end`, unterminated literal,
    /// bracket underflow, forbidden adjacency, reserved keyword misuse.
    Syntax,
    /// Attribute or `end` indentation disagrees with its block.
    Indentation,
    /// An import target could not be read.
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorKind::Lex => "LexError",
            ErrorKind::Syntax => "SyntaxError",
            ErrorKind::Indentation => "IndentationError",
            ErrorKind::Io => "IOError",
        })
    }
}

/// Extra structured information attached to some errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorDetail {
    Indentation { required: usize, actual: usize },
    Adjacency { previous: TokenKind, next: TokenKind },
}

/// Lexer error with position information.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind} in {path} at line {line}, column {column}: {message}")]
pub struct LexError {
    pub kind: ErrorKind,
    pub message: String,
    pub path: String,
    pub line: usize,
    pub column: usize,
    pub detail: Option<ErrorDetail>,
}

impl LexError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            kind,
            message: message.into(),
            path: STRING_ORIGIN.to_string(),
            line,
            column,
            detail: None,
        }
    }

    pub fn syntax(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self::new(ErrorKind::Syntax, message, line, column)
    }

    pub fn indentation(required: usize, actual: usize, line: usize, column: usize) -> Self {
        Self::new(
            ErrorKind::Indentation,
            format!("Expected {required} indents, got {actual}."),
            line,
            column,
        )
        .with_detail(ErrorDetail::Indentation { required, actual })
    }

    pub fn with_detail(mut self, detail: ErrorDetail) -> Self {
        self.detail = Some(detail);
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }
}
