use crate::config::LexerConfig;
use crate::post::PostProcessor;
use crate::scanner::Scanner;
use crate::source::Source;
use crate::strings::StringAssembler;
use crate::token::Token;
use crate::LexError;
use std::path::Path;
use tracing::debug;

/// Pull-based 3lm lexer over a prepared [`Source`].
///
/// Yields tokens one at a time, ending with an EOF token. The first error
/// ends the stream; errors are reported against the file and line they
/// came from, not the flattened buffer.
pub struct Lexer<'a> {
    source: &'a Source,
    inner: PostProcessor<'a>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a Source) -> Self {
        debug!(
            target: "e3lm::lexer",
            path = source.path(),
            lines = source.lines().len(),
            "start lexing"
        );
        Self {
            source,
            inner: PostProcessor::new(StringAssembler::new(Scanner::new(source))),
        }
    }

    /// Start over on `source`, dropping all position, mode and block state.
    pub fn reset(&mut self, source: &'a Source) {
        *self = Self::new(source);
    }

    pub fn source(&self) -> &'a Source {
        self.source
    }

    /// Number of class blocks currently open.
    pub fn open_blocks(&self) -> usize {
        self.inner.strings().scanner().indent_stack().len()
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        let source = self.source;
        self.inner.next().map(|item| item.map_err(|err| source.locate(err)))
    }
}

/// Tokenize `text` read from `origin` (a path, or [`crate::STRING_ORIGIN`]).
pub fn tokenize(text: &str, origin: &str) -> Result<Vec<Token>, LexError> {
    let source = Source::new(text, origin)?;
    Lexer::new(&source).collect()
}

/// Read and tokenize a file.
pub fn tokenize_file(path: impl AsRef<Path>, config: &LexerConfig) -> Result<Vec<Token>, LexError> {
    let source = Source::open(path, config)?;
    Lexer::new(&source).collect()
}
