//! Ordered rule tables, one per scanner mode.
//!
//! Rules of the active mode are tried in declaration order and the first
//! match wins; there is no longest-match guarantee, so the order below is
//! part of the language. A handler may emit at most one token, change the
//! mode stack and touch the indentation stack.

use crate::body::BodyExtractor;
use crate::indent::Frame;
use crate::scanner::{Activation, QuoteStyle, RawKind, RawToken, Scanner};
use crate::token::{is_reserved, TokenKind, TokenValue};
use crate::{ErrorKind, LexError};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Scanner mode, selecting the rule table in effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Default,
    Block,
    Expr,
    Body,
    SingleQuote1,
    SingleQuote2,
    TripleQuote1,
    TripleQuote2,
}

pub type Handler = fn(&mut Scanner<'_>, &Captures<'_>) -> Result<Option<RawToken>, LexError>;

pub struct Rule {
    pub name: &'static str,
    pub pattern: Regex,
    pub handler: Handler,
}

fn rule(name: &'static str, pattern: &str, handler: Handler) -> Rule {
    Rule {
        name,
        pattern: Regex::new(&format!("^(?:{pattern})")).expect("valid rule pattern"),
        handler,
    }
}

const IMPORT: &str = r"[ \t]*(?i:import)[ \t]+[^ \t;\n=]+[ \t]*(?:;[^\n]*)?";
const COMMENT: &str = r"[ \t]*;[^\n]*";
const CLASS: &str = r"[A-Z][_A-Za-z0-9]*";
const IDENT: &str = r"[_A-Za-z][_A-Za-z0-9]*";
const END: &str = r"(?i:end)\b([^;\n]*)";
const DIGITS: &str = r"[0-9](?:_?[0-9])*";

static POINT_FLOAT: Lazy<String> = Lazy::new(|| {
    format!(r"(?:{DIGITS}\.(?:{DIGITS})?|\.{DIGITS})(?:[eE][-+]?{DIGITS})?")
});
static EXP_FLOAT: Lazy<String> = Lazy::new(|| format!(r"{DIGITS}[eE][-+]?{DIGITS}"));
static FLOAT: Lazy<String> = Lazy::new(|| format!("(?:{}|{})", *POINT_FLOAT, *EXP_FLOAT));
static IMAG: Lazy<String> = Lazy::new(|| format!("(?:{DIGITS}|{})[jJ]", *FLOAT));

static DEFAULT: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        rule("import", IMPORT, skip),
        rule("comment", COMMENT, skip),
        rule("ws", r"[ \t]+", whitespace),
        rule("newline", r"\n", newline),
        rule("stray_end", r"(?i:end)\b", stray_end),
        rule("class", CLASS, class_header),
    ]
});

static BLOCK: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        rule("import", IMPORT, skip),
        rule("comment", COMMENT, skip),
        rule("end", END, block_end),
        rule("attr", &format!(r"({IDENT})[ \t]*=[ \t]*"), attribute),
        rule("body_marker", r"---[^\n;]*", body_marker),
        rule("ws", r"[ \t]+", whitespace),
        rule("class", CLASS, class_header),
        rule("name", IDENT, class_name),
        rule("newline", r"\n", block_newline),
    ]
});

static EXPR: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        rule("comment", COMMENT, skip),
        rule("continuation", r"\\\n", skip),
        rule("string_triple_q1", r"([A-Za-z]?)'''", open_triple_q1),
        rule("string_triple_q2", r#"([A-Za-z]?)""""#, open_triple_q2),
        rule("string_single_q1", r"([A-Za-z]?)'", open_single_q1),
        rule("string_single_q2", r#"([A-Za-z]?)""#, open_single_q2),
        rule("imaginary", &IMAG, imaginary),
        rule("float", &FLOAT, float),
        rule("hex", r"0[xX][0-9a-fA-F]+", hex),
        rule("octal", r"0[oO][0-7]+", octal),
        rule("binary", r"0[bB][01]+", binary),
        rule("integer", r"[0-9]+", integer),
        rule("identifier", IDENT, identifier),
        rule("bracket", r"[()\[\]{}]", bracket),
        rule("newline", r"\n", expr_newline),
        rule("ws", r"[ \t]+", whitespace),
        rule("operator", r"[-+*/&|!:.,]", operator),
    ]
});

static BODY: Lazy<Vec<Rule>> = Lazy::new(|| vec![rule("body_line", r"[^\n]*\n", body_line)]);

static SINGLE_Q1: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        rule("escape", r"\\(?s:.)", string_escape),
        rule("end", "'", string_end),
        rule("text", r"[^'\\\n]+", string_text),
    ]
});

static SINGLE_Q2: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        rule("escape", r"\\(?s:.)", string_escape),
        rule("end", "\"", string_end),
        rule("text", r#"[^"\\\n]+"#, string_text),
    ]
});

static TRIPLE_Q1: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        rule("escape", r"\\(?s:.)", string_escape),
        rule("end", "'''", string_end),
        rule("text", r"[^'\\]+", string_text),
        rule("lone_quote", "'", string_text),
    ]
});

static TRIPLE_Q2: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        rule("escape", r"\\(?s:.)", string_escape),
        rule("end", "\"\"\"", string_end),
        rule("text", r#"[^"\\]+"#, string_text),
        rule("lone_quote", "\"", string_text),
    ]
});

/// The ordered rules of `mode`.
pub fn rules_for(mode: Mode) -> &'static [Rule] {
    match mode {
        Mode::Default => &DEFAULT,
        Mode::Block => &BLOCK,
        Mode::Expr => &EXPR,
        Mode::Body => &BODY,
        Mode::SingleQuote1 => &SINGLE_Q1,
        Mode::SingleQuote2 => &SINGLE_Q2,
        Mode::TripleQuote1 => &TRIPLE_Q1,
        Mode::TripleQuote2 => &TRIPLE_Q2,
    }
}

// --- Shared ---

fn skip(_: &mut Scanner<'_>, _: &Captures<'_>) -> Result<Option<RawToken>, LexError> {
    Ok(None)
}

fn whitespace(sc: &mut Scanner<'_>, caps: &Captures<'_>) -> Result<Option<RawToken>, LexError> {
    Ok(Some(sc.token(TokenKind::Ws, TokenValue::None, 0, caps[0].len())))
}

fn newline(sc: &mut Scanner<'_>, _: &Captures<'_>) -> Result<Option<RawToken>, LexError> {
    Ok(Some(sc.token(TokenKind::Newline, TokenValue::None, 0, 1)))
}

// --- Default and Block ---

fn stray_end(sc: &mut Scanner<'_>, _: &Captures<'_>) -> Result<Option<RawToken>, LexError> {
    Err(LexError::syntax(
        "Unexpected end without an open block",
        sc.line(),
        sc.column(),
    ))
}

/// Class header, or the instance name following one on its header line.
fn class_header(sc: &mut Scanner<'_>, caps: &Captures<'_>) -> Result<Option<RawToken>, LexError> {
    let ident = &caps[0];
    if sc.follows_class_header() {
        return class_name(sc, caps);
    }

    let indent = sc.indent_here();
    if sc.mode() == Mode::Block {
        let (line, column) = (sc.line(), sc.column());
        sc.stack_mut().check_member(indent, line, column)?;
    }
    let line = sc.line();
    sc.stack_mut().push(Frame::new(ident, line, indent));
    sc.push(Activation::Block);
    Ok(Some(sc.token(TokenKind::Class, TokenValue::Str(ident.into()), 0, ident.len())))
}

fn class_name(sc: &mut Scanner<'_>, caps: &Captures<'_>) -> Result<Option<RawToken>, LexError> {
    let ident = &caps[0];
    if !sc.expects_name() {
        return Err(LexError::syntax(
            format!("Unexpected identifier '{ident}'"),
            sc.line(),
            sc.column(),
        ));
    }
    Ok(Some(sc.token(TokenKind::Name, TokenValue::Str(ident.into()), 0, ident.len())))
}

fn block_end(sc: &mut Scanner<'_>, caps: &Captures<'_>) -> Result<Option<RawToken>, LexError> {
    let (line, column) = (sc.line(), sc.column());
    if caps[1].trim_start().starts_with('=') {
        return Err(LexError::syntax(
            "Encountered reserved keyword 'end'",
            line,
            column,
        ));
    }

    let indent = sc.indent_here();
    sc.stack_mut().pop(indent, line, column)?;
    sc.pop();
    Ok(Some(sc.token(TokenKind::End, TokenValue::None, 0, 3)))
}

fn attribute(sc: &mut Scanner<'_>, caps: &Captures<'_>) -> Result<Option<RawToken>, LexError> {
    let name = &caps[1];
    if is_reserved(name) {
        return Err(LexError::syntax(
            format!("Encountered reserved keyword '{name}'"),
            sc.line(),
            sc.column(),
        ));
    }
    sc.push(Activation::Expr(Default::default()));
    Ok(Some(sc.token(TokenKind::Attr, TokenValue::Str(name.into()), 0, name.len())))
}

fn body_marker(sc: &mut Scanner<'_>, _: &Captures<'_>) -> Result<Option<RawToken>, LexError> {
    // Closing marker of the body just emitted.
    if sc.take_after_body() {
        return Ok(None);
    }

    let lines = sc.lines();
    let Some(marker) = lines.get(sc.line()) else {
        return Ok(None);
    };
    let body = BodyExtractor::open(marker, lines, sc.tab_width());
    sc.push(Activation::Body(body));
    Ok(None)
}

fn block_newline(sc: &mut Scanner<'_>, _: &Captures<'_>) -> Result<Option<RawToken>, LexError> {
    if sc.follows_class_header() {
        let next = sc
            .lines()
            .next_content_after(sc.line())
            .map(|line| (line.indent, line.is_end()));
        sc.stack_mut().expect_members(next);
    }
    Ok(Some(sc.token(TokenKind::Newline, TokenValue::None, 0, 1)))
}

fn body_line(sc: &mut Scanner<'_>, _: &Captures<'_>) -> Result<Option<RawToken>, LexError> {
    let Some(Activation::Body(body)) = sc.top() else {
        return Ok(None);
    };
    let Some(closed) = body.step(sc.line(), sc.lines(), sc.source()) else {
        return Ok(None);
    };

    sc.pop();
    let line = closed.value.start_line;
    Ok(Some(sc.token_at(
        TokenKind::Body,
        TokenValue::Body(closed.value),
        closed.start,
        closed.end,
        line,
        1,
    )))
}

// --- Expr ---

fn open_string(
    sc: &mut Scanner<'_>,
    caps: &Captures<'_>,
    style: QuoteStyle,
) -> Result<Option<RawToken>, LexError> {
    let prefix = &caps[1];
    let raw = matches!(prefix, "r" | "R" | "b" | "B");
    let (line, column) = (sc.line(), sc.column());
    sc.push(Activation::Quote {
        style,
        raw,
        line,
        column,
    });
    Ok(Some(sc.raw_token(
        RawKind::StringStart { style, raw },
        TokenValue::Str(prefix.into()),
        0,
        caps[0].len(),
    )))
}

fn open_triple_q1(sc: &mut Scanner<'_>, caps: &Captures<'_>) -> Result<Option<RawToken>, LexError> {
    open_string(sc, caps, QuoteStyle::Triple1)
}

fn open_triple_q2(sc: &mut Scanner<'_>, caps: &Captures<'_>) -> Result<Option<RawToken>, LexError> {
    open_string(sc, caps, QuoteStyle::Triple2)
}

fn open_single_q1(sc: &mut Scanner<'_>, caps: &Captures<'_>) -> Result<Option<RawToken>, LexError> {
    open_string(sc, caps, QuoteStyle::Single1)
}

fn open_single_q2(sc: &mut Scanner<'_>, caps: &Captures<'_>) -> Result<Option<RawToken>, LexError> {
    open_string(sc, caps, QuoteStyle::Single2)
}

fn number_error(sc: &Scanner<'_>, text: &str) -> LexError {
    LexError::syntax(format!("Invalid number: '{text}'"), sc.line(), sc.column())
}

fn imaginary(sc: &mut Scanner<'_>, caps: &Captures<'_>) -> Result<Option<RawToken>, LexError> {
    let text = &caps[0];
    let im: f64 = text[..text.len() - 1]
        .replace('_', "")
        .parse()
        .map_err(|_| number_error(sc, text))?;
    Ok(Some(sc.token(
        TokenKind::NumImag,
        TokenValue::Complex { re: 0.0, im },
        0,
        text.len(),
    )))
}

fn float(sc: &mut Scanner<'_>, caps: &Captures<'_>) -> Result<Option<RawToken>, LexError> {
    let text = &caps[0];
    let value: f64 = text
        .replace('_', "")
        .parse()
        .map_err(|_| number_error(sc, text))?;
    Ok(Some(sc.token(TokenKind::NumFloat, TokenValue::Float(value), 0, text.len())))
}

fn radix_integer(
    sc: &mut Scanner<'_>,
    caps: &Captures<'_>,
    kind: TokenKind,
    radix: u32,
) -> Result<Option<RawToken>, LexError> {
    let text = &caps[0];
    let digits = if radix == 10 { text } else { &text[2..] };
    let value = i64::from_str_radix(digits, radix).map_err(|_| {
        LexError::syntax(
            format!("Integer literal out of range: '{text}'"),
            sc.line(),
            sc.column(),
        )
    })?;
    Ok(Some(sc.token(kind, TokenValue::Int(value), 0, text.len())))
}

fn hex(sc: &mut Scanner<'_>, caps: &Captures<'_>) -> Result<Option<RawToken>, LexError> {
    radix_integer(sc, caps, TokenKind::NumHex, 16)
}

fn octal(sc: &mut Scanner<'_>, caps: &Captures<'_>) -> Result<Option<RawToken>, LexError> {
    radix_integer(sc, caps, TokenKind::NumOct, 8)
}

fn binary(sc: &mut Scanner<'_>, caps: &Captures<'_>) -> Result<Option<RawToken>, LexError> {
    radix_integer(sc, caps, TokenKind::NumBin, 2)
}

fn integer(sc: &mut Scanner<'_>, caps: &Captures<'_>) -> Result<Option<RawToken>, LexError> {
    radix_integer(sc, caps, TokenKind::NumInt, 10)
}

fn identifier(sc: &mut Scanner<'_>, caps: &Captures<'_>) -> Result<Option<RawToken>, LexError> {
    let ident = &caps[0];
    let (kind, value) = match ident.to_ascii_lowercase().as_str() {
        "true" => (TokenKind::Bool, TokenValue::Bool(true)),
        "false" => (TokenKind::Bool, TokenValue::Bool(false)),
        "none" => (TokenKind::None, TokenValue::None),
        "end" => {
            return Err(LexError::syntax(
                "Encountered reserved keyword 'end' inside an expression",
                sc.line(),
                sc.column(),
            ))
        }
        _ => (TokenKind::Id, TokenValue::Str(ident.into())),
    };
    Ok(Some(sc.token(kind, value, 0, ident.len())))
}

fn bracket(sc: &mut Scanner<'_>, caps: &Captures<'_>) -> Result<Option<RawToken>, LexError> {
    let (line, column) = (sc.line(), sc.column());
    let Some(brackets) = sc.brackets_mut() else {
        return Err(LexError::new(ErrorKind::Lex, "Bracket outside an expression", line, column));
    };
    let kind = match &caps[0] {
        "(" => {
            brackets.paren += 1;
            TokenKind::LParen
        }
        "[" => {
            brackets.array += 1;
            TokenKind::LArray
        }
        "{" => {
            brackets.dict += 1;
            TokenKind::LDict
        }
        closing => {
            let (depth, kind) = match closing {
                ")" => (&mut brackets.paren, TokenKind::RParen),
                "]" => (&mut brackets.array, TokenKind::RArray),
                _ => (&mut brackets.dict, TokenKind::RDict),
            };
            *depth = depth
                .checked_sub(1)
                .ok_or_else(|| LexError::syntax("Closing bracket error", line, column))?;
            kind
        }
    };
    Ok(Some(sc.token(kind, TokenValue::None, 0, 1)))
}

fn expr_newline(sc: &mut Scanner<'_>, _: &Captures<'_>) -> Result<Option<RawToken>, LexError> {
    if sc.brackets_mut().is_some_and(|b| b.is_balanced()) {
        sc.pop();
    }
    Ok(Some(sc.token(TokenKind::Newline, TokenValue::None, 0, 1)))
}

fn operator(sc: &mut Scanner<'_>, caps: &Captures<'_>) -> Result<Option<RawToken>, LexError> {
    let kind = match &caps[0] {
        "+" => TokenKind::Plus,
        "-" => TokenKind::Minus,
        "*" => TokenKind::Times,
        "/" => TokenKind::Divide,
        "&" => TokenKind::And,
        "|" => TokenKind::Or,
        "!" => TokenKind::Not,
        ":" => TokenKind::Colon,
        "." => TokenKind::Dot,
        _ => TokenKind::Comma,
    };
    Ok(Some(sc.token(kind, TokenValue::None, 0, 1)))
}

// --- Quotes ---

fn string_escape(sc: &mut Scanner<'_>, caps: &Captures<'_>) -> Result<Option<RawToken>, LexError> {
    let text = &caps[0];
    let raw = matches!(sc.top(), Some(Activation::Quote { raw: true, .. }));
    let (kind, value) = if raw {
        (RawKind::StringEscape, text.to_string())
    } else {
        match &text[1..] {
            "\n" => (RawKind::StringContinueNewline, String::new()),
            "n" => (RawKind::StringEscape, "\n".into()),
            "t" => (RawKind::StringEscape, "\t".into()),
            "r" => (RawKind::StringEscape, "\r".into()),
            "0" => (RawKind::StringEscape, "\0".into()),
            "\\" | "'" | "\"" => (RawKind::StringEscape, text[1..].to_string()),
            _ => (RawKind::StringEscape, text.to_string()),
        }
    };
    Ok(Some(sc.raw_token(kind, TokenValue::Str(value), 0, text.len())))
}

fn string_text(sc: &mut Scanner<'_>, caps: &Captures<'_>) -> Result<Option<RawToken>, LexError> {
    let text = &caps[0];
    Ok(Some(sc.raw_token(
        RawKind::StringContinue,
        TokenValue::Str(text.into()),
        0,
        text.len(),
    )))
}

fn string_end(sc: &mut Scanner<'_>, caps: &Captures<'_>) -> Result<Option<RawToken>, LexError> {
    sc.pop();
    Ok(Some(sc.raw_token(RawKind::StringEnd, TokenValue::None, 0, caps[0].len())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_rule(mode: Mode, text: &str) -> Option<&'static str> {
        rules_for(mode)
            .iter()
            .find(|rule| rule.pattern.is_match(text))
            .map(|rule| rule.name)
    }

    #[test]
    fn test_numeric_rules_in_priority_order() {
        assert_eq!(first_rule(Mode::Expr, "3j"), Some("imaginary"));
        assert_eq!(first_rule(Mode::Expr, "3.14e-10j"), Some("imaginary"));
        assert_eq!(first_rule(Mode::Expr, "0.5"), Some("float"));
        assert_eq!(first_rule(Mode::Expr, ".5"), Some("float"));
        assert_eq!(first_rule(Mode::Expr, "1e5"), Some("float"));
        assert_eq!(first_rule(Mode::Expr, "0x1F"), Some("hex"));
        assert_eq!(first_rule(Mode::Expr, "0o17"), Some("octal"));
        assert_eq!(first_rule(Mode::Expr, "0b101"), Some("binary"));
        assert_eq!(first_rule(Mode::Expr, "42"), Some("integer"));
    }

    #[test]
    fn test_string_openers_win_over_identifiers() {
        assert_eq!(first_rule(Mode::Expr, "r'x'"), Some("string_single_q1"));
        assert_eq!(first_rule(Mode::Expr, "\"\"\"x\"\"\""), Some("string_triple_q2"));
        assert_eq!(first_rule(Mode::Expr, "rx"), Some("identifier"));
    }

    #[test]
    fn test_block_rule_order() {
        assert_eq!(first_rule(Mode::Block, "End\n"), Some("end"));
        assert_eq!(first_rule(Mode::Block, "ending = 1\n"), Some("attr"));
        assert_eq!(first_rule(Mode::Block, "Ending dummy\n"), Some("class"));
        assert_eq!(first_rule(Mode::Block, "---rtl\n"), Some("body_marker"));
        assert_eq!(first_rule(Mode::Block, "  ; note\n"), Some("comment"));
        assert_eq!(first_rule(Mode::Block, "dummy\n"), Some("name"));
        assert_eq!(first_rule(Mode::Block, "import = 5\n"), Some("attr"));
        assert_eq!(first_rule(Mode::Block, "import shared\n"), Some("import"));
    }

    #[test]
    fn test_default_rules_suppress_imports() {
        assert_eq!(first_rule(Mode::Default, "import lib ; x\n"), Some("import"));
        assert_eq!(first_rule(Mode::Default, "Important x\n"), Some("class"));
        assert_eq!(first_rule(Mode::Default, "end\n"), Some("stray_end"));
    }

    #[test]
    fn test_triple_quote_terminator_before_lone_quote() {
        assert_eq!(first_rule(Mode::TripleQuote1, "'''"), Some("end"));
        assert_eq!(first_rule(Mode::TripleQuote1, "'a"), Some("lone_quote"));
        assert_eq!(first_rule(Mode::SingleQuote2, "\\\n"), Some("escape"));
        assert_eq!(first_rule(Mode::SingleQuote2, "\n"), None);
    }
}
