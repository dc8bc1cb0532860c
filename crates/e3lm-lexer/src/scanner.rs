use crate::body::BodyExtractor;
use crate::indent::IndentStack;
use crate::line_index::LineIndex;
use crate::rules::{self, Mode};
use crate::source::Source;
use crate::token::{Span, TokenKind, TokenValue};
use crate::{ErrorKind, LexError};
use tracing::trace;

/// Quote style of an open string literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteStyle {
    /// `'`
    Single1,
    /// `"`
    Single2,
    /// `'''`
    Triple1,
    /// `"""`
    Triple2,
}

impl QuoteStyle {
    pub fn is_triple(self) -> bool {
        matches!(self, QuoteStyle::Triple1 | QuoteStyle::Triple2)
    }

    fn mode(self) -> Mode {
        match self {
            QuoteStyle::Single1 => Mode::SingleQuote1,
            QuoteStyle::Single2 => Mode::SingleQuote2,
            QuoteStyle::Triple1 => Mode::TripleQuote1,
            QuoteStyle::Triple2 => Mode::TripleQuote2,
        }
    }
}

/// Open bracket counts of one attribute expression.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Brackets {
    pub paren: usize,
    pub array: usize,
    pub dict: usize,
}

impl Brackets {
    pub fn is_balanced(&self) -> bool {
        self.paren == 0 && self.array == 0 && self.dict == 0
    }
}

/// One entry of the mode stack. An empty stack is the default mode.
#[derive(Debug, Clone, PartialEq)]
pub enum Activation {
    Block,
    Expr(Brackets),
    Body(BodyExtractor),
    Quote {
        style: QuoteStyle,
        raw: bool,
        line: usize,
        column: usize,
    },
}

impl Activation {
    fn mode(&self) -> Mode {
        match self {
            Activation::Block => Mode::Block,
            Activation::Expr(_) => Mode::Expr,
            Activation::Body(_) => Mode::Body,
            Activation::Quote { style, .. } => style.mode(),
        }
    }
}

/// Scanner output. String literals arrive in pieces and are joined by the
/// next stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawKind {
    Token(TokenKind),
    /// Opening quote; the value holds the prefix letter, possibly empty.
    StringStart { style: QuoteStyle, raw: bool },
    StringContinue,
    /// An escape sequence, already decoded unless the string is raw.
    StringEscape,
    /// Backslash-newline inside a non-raw string.
    StringContinueNewline,
    StringEnd,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawToken {
    pub kind: RawKind,
    pub value: TokenValue,
    pub span: Span,
}

/// 3lm source scanner.
///
/// Runs the mode-dependent rule tables from [`rules`] over the flattened
/// source and yields one raw token at a time. Blocks, attribute
/// expressions, bodies and strings each push a mode; the indentation
/// stack travels alongside.
pub struct Scanner<'a> {
    source: &'a str,
    lines: &'a LineIndex,
    tab_width: usize,
    pos: usize,
    line: usize,
    column: usize,
    modes: Vec<Activation>,
    stack: IndentStack,
    last: Option<TokenKind>,
    last_line: usize,
    after_body: bool,
    done: bool,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a Source) -> Self {
        Self {
            source: source.text(),
            lines: source.lines(),
            tab_width: source.tab_width(),
            pos: 0,
            line: 1,
            column: 1,
            modes: Vec::new(),
            stack: IndentStack::new(),
            last: None,
            last_line: 0,
            after_body: false,
            done: false,
        }
    }

    pub fn mode(&self) -> Mode {
        self.modes.last().map_or(Mode::Default, Activation::mode)
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn column(&self) -> usize {
        self.column
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    pub fn lines(&self) -> &'a LineIndex {
        self.lines
    }

    pub fn tab_width(&self) -> usize {
        self.tab_width
    }

    /// Indentation of the line under the cursor.
    pub fn indent_here(&self) -> usize {
        self.lines.indent_of(self.line)
    }

    pub fn indent_stack(&self) -> &IndentStack {
        &self.stack
    }

    pub fn stack_mut(&mut self) -> &mut IndentStack {
        &mut self.stack
    }

    pub fn top(&self) -> Option<&Activation> {
        self.modes.last()
    }

    /// Bracket counts of the innermost mode, if it is an expression.
    pub fn brackets_mut(&mut self) -> Option<&mut Brackets> {
        match self.modes.last_mut() {
            Some(Activation::Expr(brackets)) => Some(brackets),
            _ => None,
        }
    }

    pub fn push(&mut self, activation: Activation) {
        trace!(target: "e3lm::lexer", from = ?self.mode(), to = ?activation.mode(), line = self.line, "push mode");
        self.modes.push(activation);
    }

    pub fn pop(&mut self) -> Option<Activation> {
        let popped = self.modes.pop();
        trace!(target: "e3lm::lexer", to = ?self.mode(), line = self.line, "pop mode");
        popped
    }

    /// Whether the cursor is still on the header line of a class that has
    /// emitted nothing but its CLASS (and possibly NAME) token.
    pub fn follows_class_header(&self) -> bool {
        matches!(self.last, Some(TokenKind::Class | TokenKind::Name)) && self.last_line == self.line
    }

    /// Whether the next identifier is the instance name of a class header.
    pub fn expects_name(&self) -> bool {
        self.last == Some(TokenKind::Class) && self.last_line == self.line
    }

    /// Consume the "a body was just emitted" flag.
    pub fn take_after_body(&mut self) -> bool {
        std::mem::take(&mut self.after_body)
    }

    /// Span of the match bytes `rel_start..rel_end`, relative to the cursor.
    pub fn span(&self, rel_start: usize, rel_end: usize) -> Span {
        let lead = self.source[self.pos..self.pos + rel_start].chars().count();
        Span::new(
            self.pos + rel_start,
            self.pos + rel_end,
            self.line,
            self.column + lead,
        )
    }

    pub fn token(&self, kind: TokenKind, value: TokenValue, rel_start: usize, rel_end: usize) -> RawToken {
        self.raw_token(RawKind::Token(kind), value, rel_start, rel_end)
    }

    pub fn raw_token(&self, kind: RawKind, value: TokenValue, rel_start: usize, rel_end: usize) -> RawToken {
        RawToken {
            kind,
            value,
            span: self.span(rel_start, rel_end),
        }
    }

    /// Token at absolute offsets, for matches that began on earlier lines.
    pub fn token_at(
        &self,
        kind: TokenKind,
        value: TokenValue,
        start: usize,
        end: usize,
        line: usize,
        column: usize,
    ) -> RawToken {
        RawToken {
            kind: RawKind::Token(kind),
            value,
            span: Span::new(start, end, line, column),
        }
    }

    fn advance(&mut self, len: usize) {
        for ch in self.source[self.pos..self.pos + len].chars() {
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.pos += len;
    }

    fn note(&mut self, token: &RawToken) {
        let kind = match token.kind {
            RawKind::Token(kind) if kind.is_filtered() => return,
            RawKind::Token(kind) => kind,
            RawKind::StringEnd => TokenKind::String,
            _ => return,
        };
        self.last = Some(kind);
        self.last_line = token.span.line;
        self.after_body = kind == TokenKind::Body;
    }

    fn error(&self, kind: ErrorKind, message: impl Into<String>) -> LexError {
        LexError::new(kind, message, self.line, self.column)
    }

    /// Error for a cursor position no rule of the current mode accepts.
    fn unmatched(&self) -> LexError {
        let ch = self.source[self.pos..].chars().next().unwrap_or('\0');
        match self.top() {
            Some(Activation::Quote { style, .. }) if ch == '\n' && !style.is_triple() => {
                self.error(ErrorKind::Syntax, "EOL while scanning a string")
            }
            _ => self.error(ErrorKind::Lex, format!("Illegal character {ch:?}")),
        }
    }

    /// End of input: every mode must have unwound.
    fn finish(&self) -> Result<RawToken, LexError> {
        match self.top() {
            None => Ok(self.token(TokenKind::Eof, TokenValue::None, 0, 0)),
            Some(Activation::Quote { line, column, .. }) => Err(LexError::syntax(
                "EOF while scanning a string",
                *line,
                *column,
            )),
            Some(Activation::Body(body)) => Err(LexError::syntax(
                "EOF while scanning a body",
                body.start_line() - 1,
                1,
            )),
            Some(Activation::Expr(brackets)) if !brackets.is_balanced() => Err(self.eof_error(
                "EOF while scanning an expression: unclosed bracket",
            )),
            Some(_) => {
                let owner = self
                    .stack
                    .top()
                    .map(|frame| format!(" for '{}' opened at line {}", frame.owner, frame.line))
                    .unwrap_or_default();
                Err(self.eof_error(format!("Insufficient Ends{owner}")))
            }
        }
    }

    /// Errors at end of input point at the last line.
    fn eof_error(&self, message: impl Into<String>) -> LexError {
        let line = self.lines.len().max(1);
        let column = self.lines.get(line).map_or(1, |record| {
            self.source[record.start..record.end].chars().count() + 1
        });
        LexError::syntax(message, line, column)
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<RawToken, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            if self.pos >= self.source.len() {
                self.done = true;
                return Some(self.finish());
            }

            let source = self.source;
            let rest = &source[self.pos..];
            let mode = self.mode();
            let matched = rules::rules_for(mode).iter().find_map(|rule| {
                rule.pattern
                    .captures(rest)
                    .filter(|caps| caps.get(0).is_some_and(|m| !m.is_empty()))
                    .map(|caps| (rule, caps))
            });

            let Some((rule, caps)) = matched else {
                self.done = true;
                return Some(Err(self.unmatched()));
            };

            trace!(
                target: "e3lm::lexer",
                rule = rule.name,
                mode = ?mode,
                line = self.line,
                column = self.column,
                "match"
            );

            let len = caps.get(0).map_or(0, |m| m.end());
            let result = (rule.handler)(self, &caps);
            self.advance(len);

            match result {
                Ok(Some(token)) => {
                    self.note(&token);
                    return Some(Ok(token));
                }
                Ok(None) => continue,
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            }
        }
    }
}
