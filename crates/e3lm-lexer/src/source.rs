use crate::config::LexerConfig;
use crate::line_index::LineIndex;
use crate::preprocess::{LineOrigin, Preprocessor};
use crate::{ErrorKind, LexError};
use std::path::Path;

/// Flattened, import-free source text prepared for one lex session.
///
/// Owns the text and its [`LineIndex`]; every stage of the lexer borrows
/// them read-only.
#[derive(Debug, Clone)]
pub struct Source {
    path: String,
    text: String,
    lines: LineIndex,
    origins: Vec<LineOrigin>,
    tab_width: usize,
}

impl Source {
    /// Prepare `text` read from `origin` with the default configuration.
    /// Pass [`crate::STRING_ORIGIN`] for text without a file.
    pub fn new(text: &str, origin: &str) -> Result<Self, LexError> {
        Self::with_config(text, origin, &LexerConfig::default())
    }

    pub fn with_config(text: &str, origin: &str, config: &LexerConfig) -> Result<Self, LexError> {
        let expanded = Preprocessor::new(config).run(text, origin)?;
        let lines = LineIndex::build(&expanded.text, config.tab_width);
        Ok(Self {
            path: origin.to_string(),
            text: expanded.text,
            lines,
            origins: expanded.origins,
            tab_width: config.tab_width,
        })
    }

    /// Read and prepare a file.
    pub fn open(path: impl AsRef<Path>, config: &LexerConfig) -> Result<Self, LexError> {
        let path = path.as_ref();
        let display = path.to_string_lossy();
        let text = std::fs::read_to_string(path).map_err(|e| {
            LexError::new(ErrorKind::Io, format!("Cannot read '{display}': {e}"), 0, 0)
                .with_path(display.as_ref())
        })?;
        Self::with_config(&text, &display, config)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn lines(&self) -> &LineIndex {
        &self.lines
    }

    pub fn tab_width(&self) -> usize {
        self.tab_width
    }

    /// Re-attribute an error raised against the flattened buffer to the
    /// file and line it originally came from.
    pub fn locate(&self, err: LexError) -> LexError {
        let origin = err
            .line
            .checked_sub(1)
            .and_then(|i| self.origins.get(i));
        match origin {
            Some(origin) => LexError {
                path: origin.path.to_string(),
                line: origin.line,
                column: err.column.saturating_sub(origin.shift).max(1),
                ..err
            },
            None => err.with_path(self.path.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::STRING_ORIGIN;
    use std::fs;

    #[test]
    fn test_source_builds_line_index() {
        let source = Source::new("Foo\r\n  x = 1\r\nend", STRING_ORIGIN).unwrap();
        assert_eq!(source.text(), "Foo\n  x = 1\nend\n");
        assert_eq!(source.lines().len(), 3);
        assert_eq!(source.lines().indent_of(2), 2);
        assert_eq!(source.path(), STRING_ORIGIN);
    }

    #[test]
    fn test_locate_maps_imported_lines_back() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("part.3lm"), "Inner\n  y = 2\n").unwrap();
        let main = dir.path().join("main.3lm");
        fs::write(&main, "Outer\n  import part\nend\n").unwrap();

        let source = Source::open(&main, &LexerConfig::default()).unwrap();
        let err = source.locate(LexError::syntax("boom", 3, 7));
        assert!(err.path.ends_with("part.3lm"));
        assert_eq!(err.line, 2);
        assert_eq!(err.column, 5);

        let err = source.locate(LexError::syntax("boom", 4, 1));
        assert!(err.path.ends_with("main.3lm"));
        assert_eq!(err.line, 3);
    }

    #[test]
    fn test_open_missing_file() {
        let err = Source::open("/nonexistent/dir/file.3lm", &LexerConfig::default()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Io);
    }
}
