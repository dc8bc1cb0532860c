//! Final pipeline stage.
//!
//! Drops whitespace and newline tokens, validates the indentation of every
//! attribute against its block, and rejects literals and identifiers that
//! follow one another directly.

use crate::line_index::LineIndex;
use crate::strings::StringAssembler;
use crate::token::{Category, Token, TokenKind};
use crate::{ErrorDetail, LexError};

pub struct PostProcessor<'a> {
    inner: StringAssembler<'a>,
    lines: &'a LineIndex,
    previous: Option<TokenKind>,
    done: bool,
}

impl<'a> PostProcessor<'a> {
    pub fn new(inner: StringAssembler<'a>) -> Self {
        let lines = inner.scanner().lines();
        Self {
            inner,
            lines,
            previous: None,
            done: false,
        }
    }

    pub fn strings(&self) -> &StringAssembler<'a> {
        &self.inner
    }

    fn check(&mut self, token: &Token) -> Result<(), LexError> {
        if let Some(previous) = self.previous {
            if let Some(message) = adjacency(previous, token.kind) {
                return Err(LexError::syntax(message, token.line(), token.column()).with_detail(
                    ErrorDetail::Adjacency {
                        previous,
                        next: token.kind,
                    },
                ));
            }
        }

        if token.kind == TokenKind::Attr {
            let indent = self.lines.indent_of(token.line());
            self.inner
                .scanner_mut()
                .stack_mut()
                .check_member(indent, token.line(), token.column())?;
        }
        Ok(())
    }
}

/// Message for a forbidden pair, if `previous` may not precede `next`.
fn adjacency(previous: TokenKind, next: TokenKind) -> Option<&'static str> {
    match (previous.category(), next.category()) {
        (Category::Literal, Category::Literal) => Some("Literals cannot be followed by other literals."),
        (Category::Identifier, Category::Identifier) => Some("IDs cannot be followed by other IDs."),
        (Category::Identifier, Category::Literal) => Some("IDs cannot be followed by a literal."),
        (Category::Literal, Category::Identifier) => Some("Literals cannot be followed by an ID."),
        _ => None,
    }
}

impl<'a> Iterator for PostProcessor<'a> {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let token = match self.inner.next()? {
                Ok(token) => token,
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            };
            if token.kind.is_filtered() {
                continue;
            }
            if let Err(err) = self.check(&token) {
                self.done = true;
                return Some(Err(err));
            }
            self.previous = Some(token.kind);
            return Some(Ok(token));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::Scanner;
    use crate::{ErrorKind, Source, STRING_ORIGIN};
    use pretty_assertions::assert_eq;

    fn run(source: &str) -> Result<Vec<Token>, LexError> {
        let source = Source::new(source, STRING_ORIGIN).unwrap();
        PostProcessor::new(StringAssembler::new(Scanner::new(&source))).collect()
    }

    fn kinds(source: &str) -> Vec<TokenKind> {
        run(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_whitespace_and_newlines_filtered() {
        assert_eq!(
            kinds("\n\nFoo   \n\n  x  =  1  \n\nend\n\n"),
            vec![
                TokenKind::Class,
                TokenKind::Attr,
                TokenKind::NumInt,
                TokenKind::End,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_adjacent_literals_rejected() {
        let err = run("Foo\n  x = 1 2\nend\n").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Syntax);
        assert_eq!(err.message, "Literals cannot be followed by other literals.");
        assert_eq!((err.line, err.column), (2, 9));
        assert_eq!(
            err.detail,
            Some(ErrorDetail::Adjacency {
                previous: TokenKind::NumInt,
                next: TokenKind::NumInt
            })
        );
    }

    #[test]
    fn test_adjacent_identifiers_rejected() {
        let err = run("Foo\n  x = a b\nend\n").unwrap_err();
        assert_eq!(err.message, "IDs cannot be followed by other IDs.");
        let err = run("Foo\n  x = a 'b'\nend\n").unwrap_err();
        assert_eq!(err.message, "IDs cannot be followed by a literal.");
        let err = run("Foo\n  x = true a\nend\n").unwrap_err();
        assert_eq!(err.message, "Literals cannot be followed by an ID.");
    }

    #[test]
    fn test_operators_separate_operands() {
        assert_eq!(
            kinds("Foo\n  x = a + 1, b\nend\n"),
            vec![
                TokenKind::Class,
                TokenKind::Attr,
                TokenKind::Id,
                TokenKind::Plus,
                TokenKind::NumInt,
                TokenKind::Comma,
                TokenKind::Id,
                TokenKind::End,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_attribute_after_literal_on_next_line_is_allowed() {
        assert_eq!(
            kinds("Foo\n  x = 1\n  y = 2\nend\n"),
            vec![
                TokenKind::Class,
                TokenKind::Attr,
                TokenKind::NumInt,
                TokenKind::Attr,
                TokenKind::NumInt,
                TokenKind::End,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_misaligned_attribute() {
        let err = run("Foo\n    a = 1\n  b = 2\nend\n").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Indentation);
        assert_eq!(err.line, 3);
        assert_eq!(
            err.detail,
            Some(ErrorDetail::Indentation {
                required: 4,
                actual: 2
            })
        );
    }
}
