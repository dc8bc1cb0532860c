/// Canonical extension of 3lm source files, without the leading dot.
pub const DEFAULT_EXTENSION: &str = "3lm";

/// Knobs shared by the preprocessor and the line index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexerConfig {
    /// Extension appended to import paths that have none.
    pub extension: String,
    /// Indentation width of a tab character.
    pub tab_width: usize,
    /// Inline `import` lines before scanning. When off, the scanner skips them.
    pub follow_imports: bool,
    /// Maximum nesting of imports inside imports.
    pub max_import_depth: usize,
}

impl Default for LexerConfig {
    fn default() -> Self {
        Self {
            extension: DEFAULT_EXTENSION.to_string(),
            tab_width: 4,
            follow_imports: true,
            max_import_depth: 64,
        }
    }
}

impl LexerConfig {
    pub fn with_tab_width(mut self, tab_width: usize) -> Self {
        self.tab_width = tab_width;
        self
    }

    pub fn without_imports(mut self) -> Self {
        self.follow_imports = false;
        self
    }
}
