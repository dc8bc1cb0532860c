//! String literal assembly.
//!
//! The scanner reports a string as an opening piece, any number of text
//! pieces and a closing piece. This stage joins them into one STRING token
//! and applies the prefix letter.

use crate::scanner::{QuoteStyle, RawKind, RawToken, Scanner};
use crate::token::{Span, Token, TokenKind, TokenValue};
use crate::LexError;
use tracing::trace;

pub struct StringAssembler<'a> {
    scanner: Scanner<'a>,
    done: bool,
}

impl<'a> StringAssembler<'a> {
    pub fn new(scanner: Scanner<'a>) -> Self {
        Self {
            scanner,
            done: false,
        }
    }

    pub fn scanner(&self) -> &Scanner<'a> {
        &self.scanner
    }

    pub fn scanner_mut(&mut self) -> &mut Scanner<'a> {
        &mut self.scanner
    }

    fn assemble(&mut self, start: RawToken, style: QuoteStyle) -> Result<Token, LexError> {
        let mut text = String::new();
        let mut strip_next = false;

        let end = loop {
            let piece = match self.scanner.next() {
                Some(piece) => piece?,
                None => return Err(unterminated(&start)),
            };
            match piece.kind {
                RawKind::StringContinue => {
                    let chunk = piece.value.as_str().unwrap_or_default();
                    if strip_next {
                        text.push_str(chunk.trim_start_matches([' ', '\t']));
                        strip_next = false;
                    } else {
                        text.push_str(chunk);
                    }
                }
                // Only source whitespace is stripped after a continuation.
                RawKind::StringEscape => {
                    text.push_str(piece.value.as_str().unwrap_or_default());
                    strip_next = false;
                }
                RawKind::StringContinueNewline => strip_next = true,
                RawKind::StringEnd => break piece,
                _ => return Err(unterminated(&start)),
            }
        };

        let prefix = start.value.as_str().unwrap_or_default();
        let value = match prefix.to_ascii_lowercase().as_str() {
            "" | "r" | "b" => text,
            "u" => decode_code_point(&text, &start)?,
            _ => {
                return Err(LexError::syntax(
                    format!("Unknown string quote type: {prefix:?}"),
                    start.span.line,
                    start.span.column,
                ))
            }
        };

        // Single-quoted strings report the line they end on.
        let line = if style.is_triple() {
            start.span.line
        } else {
            end.span.line
        };
        trace!(target: "e3lm::lexer", line, len = value.len(), "string");

        Ok(Token::new(
            TokenKind::String,
            TokenValue::Str(value),
            Span::new(start.span.start, end.span.end, line, start.span.column),
        ))
    }
}

fn unterminated(start: &RawToken) -> LexError {
    LexError::syntax(
        "EOF while scanning a string",
        start.span.line,
        start.span.column,
    )
}

/// `u"263A"`: the payload is a hexadecimal code point.
fn decode_code_point(text: &str, start: &RawToken) -> Result<String, LexError> {
    u32::from_str_radix(text.trim(), 16)
        .ok()
        .and_then(char::from_u32)
        .map(String::from)
        .ok_or_else(|| {
            LexError::syntax(
                format!("Invalid code point in u-string: {text:?}"),
                start.span.line,
                start.span.column,
            )
        })
}

impl<'a> Iterator for StringAssembler<'a> {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let raw = match self.scanner.next()? {
            Ok(raw) => raw,
            Err(err) => return Some(Err(err)),
        };

        let item = match raw.kind {
            RawKind::Token(kind) => Ok(Token::new(kind, raw.value, raw.span)),
            RawKind::StringStart { style, .. } => self.assemble(raw, style),
            RawKind::StringContinue
            | RawKind::StringEscape
            | RawKind::StringContinueNewline
            | RawKind::StringEnd => {
                Err(LexError::syntax(
                    "String fragment outside a string",
                    raw.span.line,
                    raw.span.column,
                ))
            }
        };
        self.done = item.is_err();
        Some(item)
    }
}
