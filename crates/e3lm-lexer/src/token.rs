use serde::{Serialize, Serializer};
use std::fmt;

/// A position in source text, tracking line and column for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(start: usize, end: usize, line: usize, column: usize) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }

    /// Length of the spanned text in bytes.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Token classification for 3lm source.
///
/// The set is closed. `Ws` and `Newline` only exist between pipeline stages
/// and never reach the caller; `Eof` terminates every successful stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Structure
    Class,
    Name,
    Attr,
    End,
    Body,

    // Expression operators
    Plus,
    Minus,
    Times,
    Divide,
    And,
    Or,
    Not,
    Colon,
    Dot,
    Comma,
    LParen,
    RParen,
    LArray,
    RArray,
    LDict,
    RDict,

    // Literals
    Bool,
    None,
    NumInt,
    NumFloat,
    NumHex,
    NumOct,
    NumBin,
    NumImag,
    String,

    // Identifiers
    Id,

    // Filtered before leaving the lexer
    Ws,
    Newline,

    // End of input
    Eof,
}

/// Coarse grouping of token kinds, used by the adjacency rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Structural,
    Expression,
    Literal,
    Identifier,
    Filtered,
}

impl TokenKind {
    /// The canonical uppercase name, as seen by downstream consumers.
    pub fn as_str(self) -> &'static str {
        match self {
            TokenKind::Class => "CLASS",
            TokenKind::Name => "NAME",
            TokenKind::Attr => "ATTR",
            TokenKind::End => "END",
            TokenKind::Body => "BODY",
            TokenKind::Plus => "PLUS",
            TokenKind::Minus => "MINUS",
            TokenKind::Times => "TIMES",
            TokenKind::Divide => "DIVIDE",
            TokenKind::And => "AND",
            TokenKind::Or => "OR",
            TokenKind::Not => "NOT",
            TokenKind::Colon => "COLON",
            TokenKind::Dot => "DOT",
            TokenKind::Comma => "COMMA",
            TokenKind::LParen => "LPAREN",
            TokenKind::RParen => "RPAREN",
            TokenKind::LArray => "LARRAY",
            TokenKind::RArray => "RARRAY",
            TokenKind::LDict => "LDICT",
            TokenKind::RDict => "RDICT",
            TokenKind::Bool => "BOOL",
            TokenKind::None => "NONE",
            TokenKind::NumInt => "NUM_INT",
            TokenKind::NumFloat => "NUM_FLOAT",
            TokenKind::NumHex => "NUM_HEX",
            TokenKind::NumOct => "NUM_OCT",
            TokenKind::NumBin => "NUM_BIN",
            TokenKind::NumImag => "NUM_IMAG",
            TokenKind::String => "STRING",
            TokenKind::Id => "ID",
            TokenKind::Ws => "WS",
            TokenKind::Newline => "NEWLINE",
            TokenKind::Eof => "EOF",
        }
    }

    pub fn category(self) -> Category {
        match self {
            TokenKind::Class
            | TokenKind::Name
            | TokenKind::Attr
            | TokenKind::End
            | TokenKind::Body
            | TokenKind::Eof => Category::Structural,
            TokenKind::Bool
            | TokenKind::None
            | TokenKind::NumInt
            | TokenKind::NumFloat
            | TokenKind::NumHex
            | TokenKind::NumOct
            | TokenKind::NumBin
            | TokenKind::NumImag
            | TokenKind::String => Category::Literal,
            TokenKind::Id => Category::Identifier,
            TokenKind::Ws | TokenKind::Newline => Category::Filtered,
            _ => Category::Expression,
        }
    }

    pub fn is_filtered(self) -> bool {
        self.category() == Category::Filtered
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for TokenKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Literal multi-line text captured between body markers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BodyValue {
    pub start_line: usize,
    pub text: String,
    pub names: Vec<String>,
}

/// The value carried by a token.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TokenValue {
    None,
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Complex { re: f64, im: f64 },
    Body(BodyValue),
}

impl TokenValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            TokenValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for TokenValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenValue::None => Ok(()),
            TokenValue::Str(s) => write!(f, "{s:?}"),
            TokenValue::Int(n) => write!(f, "{n}"),
            TokenValue::Float(n) => write!(f, "{n:?}"),
            TokenValue::Bool(b) => write!(f, "{b}"),
            TokenValue::Complex { re, im } => write!(f, "({re:?}+{im:?}j)"),
            TokenValue::Body(body) => {
                write!(f, "{:?}", body.text)?;
                if !body.names.is_empty() {
                    write!(f, " [{}]", body.names.join(", "))?;
                }
                Ok(())
            }
        }
    }
}

/// A token produced by the 3lm lexer. Immutable once emitted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub value: TokenValue,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, value: TokenValue, span: Span) -> Self {
        Self { kind, value, span }
    }

    pub fn line(&self) -> usize {
        self.span.line
    }

    pub fn column(&self) -> usize {
        self.span.column
    }
}

/// Reserved words, matched case-insensitively.
pub const RESERVED: &[&str] = &["end", "true", "false", "none"];

/// Check if an identifier is a reserved word.
pub fn is_reserved(ident: &str) -> bool {
    RESERVED.iter().any(|word| word.eq_ignore_ascii_case(ident))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_match_stream_contract() {
        assert_eq!(TokenKind::NumInt.as_str(), "NUM_INT");
        assert_eq!(TokenKind::LParen.as_str(), "LPAREN");
        assert_eq!(TokenKind::None.to_string(), "NONE");
    }

    #[test]
    fn test_categories() {
        assert_eq!(TokenKind::String.category(), Category::Literal);
        assert_eq!(TokenKind::NumImag.category(), Category::Literal);
        assert_eq!(TokenKind::Id.category(), Category::Identifier);
        assert_eq!(TokenKind::Comma.category(), Category::Expression);
        assert_eq!(TokenKind::Body.category(), Category::Structural);
        assert!(TokenKind::Ws.is_filtered());
        assert!(TokenKind::Newline.is_filtered());
        assert!(!TokenKind::Eof.is_filtered());
    }

    #[test]
    fn test_reserved_words_ignore_case() {
        assert!(is_reserved("End"));
        assert!(is_reserved("TRUE"));
        assert!(is_reserved("None"));
        assert!(!is_reserved("ending"));
    }

    #[test]
    fn test_span_len() {
        let span = Span::new(4, 9, 2, 3);
        assert_eq!(span.len(), 5);
        assert!(!span.is_empty());
    }

    #[test]
    fn test_json_uses_kind_names_and_bare_values() {
        let token = Token::new(TokenKind::NumInt, TokenValue::Int(1), Span::new(0, 1, 1, 1));
        assert_eq!(
            serde_json::to_value(&token).unwrap(),
            serde_json::json!({
                "kind": "NUM_INT",
                "value": 1,
                "span": { "start": 0, "end": 1, "line": 1, "column": 1 }
            })
        );

        let token = Token::new(TokenKind::End, TokenValue::None, Span::new(8, 11, 3, 1));
        let json = serde_json::to_value(&token).unwrap();
        assert_eq!(json["kind"], "END");
        assert!(json["value"].is_null());
    }

    #[test]
    fn test_json_body_value() {
        let body = BodyValue {
            start_line: 3,
            text: "q <= d;".into(),
            names: vec!["rtl".into()],
        };
        let token = Token::new(TokenKind::Body, TokenValue::Body(body), Span::new(10, 25, 3, 1));
        let json = serde_json::to_value(&token).unwrap();
        assert_eq!(json["kind"], "BODY");
        assert_eq!(
            json["value"],
            serde_json::json!({ "start_line": 3, "text": "q <= d;", "names": ["rtl"] })
        );
    }
}
