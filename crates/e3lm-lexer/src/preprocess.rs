//! Import inlining.
//!
//! Runs entirely before scanning: every `import <path>` line is replaced by
//! the target file's content, re-indented by the directive's own
//! indentation. Imports resolve relative to the importing file; text that
//! has no file of its own resolves against the working directory.
//! Lines inside a `---` body are text, never directives.

use crate::config::LexerConfig;
use crate::line_index::LineIndex;
use crate::{ErrorKind, LexError, STRING_ORIGIN};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

static IMPORT_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([ \t]*)(?i:import)[ \t]+([^ \t;\n=]+)[ \t]*(?:;.*)?$")
        .expect("valid import pattern")
});

/// Where a line of the flattened buffer came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineOrigin {
    pub path: Arc<str>,
    pub line: usize,
    /// Bytes of indentation added in front of the original line.
    pub shift: usize,
}

/// A flattened buffer plus the origin of each of its lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expanded {
    pub text: String,
    pub origins: Vec<LineOrigin>,
}

/// Convert `\r\n` and lone `\r` to `\n` and terminate the last line.
pub fn normalize_newlines(text: &str) -> String {
    let mut out = text.replace("\r\n", "\n").replace('\r', "\n");
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    out
}

/// Recursive import expander.
pub struct Preprocessor<'c> {
    config: &'c LexerConfig,
    /// Canonical paths of the files currently being expanded.
    chain: Vec<PathBuf>,
}

impl<'c> Preprocessor<'c> {
    pub fn new(config: &'c LexerConfig) -> Self {
        Self {
            config,
            chain: Vec::new(),
        }
    }

    /// Expand `text` that was read from `origin`.
    pub fn run(&mut self, text: &str, origin: &str) -> Result<Expanded, LexError> {
        let dir = if origin == STRING_ORIGIN {
            PathBuf::from(".")
        } else {
            if let Ok(canonical) = Path::new(origin).canonicalize() {
                self.chain.push(canonical);
            }
            Path::new(origin)
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."))
        };

        let path: Arc<str> = Arc::from(origin);
        let result = self.expand(&normalize_newlines(text), &path, &dir, 0);
        self.chain.clear();
        result
    }

    fn expand(
        &mut self,
        text: &str,
        path: &Arc<str>,
        dir: &Path,
        depth: usize,
    ) -> Result<Expanded, LexError> {
        let mut out = Expanded {
            text: String::with_capacity(text.len()),
            origins: Vec::new(),
        };

        let records = LineIndex::build(text, self.config.tab_width);
        // Indentation of the body being passed over, if any.
        let mut body: Option<usize> = None;

        for (line, record) in text.lines().zip(records.iter()) {
            let number = record.number;
            let in_body = match body {
                Some(_) if record.is_marker() => {
                    body = None;
                    true
                }
                Some(indent) if record.is_blank() || record.indent >= indent => true,
                _ if record.is_marker() => {
                    body = Some(records.body_indent(number));
                    false
                }
                _ => {
                    body = None;
                    false
                }
            };

            let directive = if self.config.follow_imports && !in_body {
                IMPORT_LINE.captures(line)
            } else {
                None
            };

            let Some(caps) = directive else {
                out.text.push_str(line);
                out.text.push('\n');
                out.origins.push(LineOrigin {
                    path: Arc::clone(path),
                    line: number,
                    shift: 0,
                });
                continue;
            };

            let indent = &caps[1];
            let target = self.resolve(dir, &caps[2]);
            let fail = |kind: ErrorKind, message: String| {
                LexError::new(kind, message, number, indent.chars().count() + 1)
                    .with_path(path.as_ref())
            };

            if depth >= self.config.max_import_depth {
                return Err(fail(
                    ErrorKind::Syntax,
                    format!(
                        "Imports nested deeper than {} levels",
                        self.config.max_import_depth
                    ),
                ));
            }

            let content = std::fs::read_to_string(&target).map_err(|e| {
                fail(
                    ErrorKind::Io,
                    format!("Cannot read import '{}': {e}", target.display()),
                )
            })?;
            let canonical = target.canonicalize().unwrap_or_else(|_| target.clone());
            if self.chain.contains(&canonical) {
                return Err(fail(
                    ErrorKind::Syntax,
                    format!("Circular import of '{}'", target.display()),
                ));
            }

            debug!(
                target: "e3lm::preprocess",
                import = %target.display(),
                from = %path,
                line = number,
                "inlining import"
            );

            let inner_dir = target
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            let inner_path: Arc<str> = Arc::from(target.to_string_lossy().as_ref());

            self.chain.push(canonical);
            let inner = self.expand(
                &normalize_newlines(&content),
                &inner_path,
                &inner_dir,
                depth + 1,
            )?;
            self.chain.pop();

            for (inner_line, mut origin) in inner.text.lines().zip(inner.origins) {
                if !inner_line.is_empty() {
                    out.text.push_str(indent);
                    origin.shift += indent.len();
                }
                out.text.push_str(inner_line);
                out.text.push('\n');
                out.origins.push(origin);
            }
        }

        Ok(out)
    }

    /// Resolve an import target against the importing file's directory,
    /// defaulting the extension.
    fn resolve(&self, dir: &Path, target: &str) -> PathBuf {
        let mut path = PathBuf::from(target);
        if path.extension().is_none() {
            path = PathBuf::from(format!("{target}.{}", self.config.extension));
        }
        dir.join(path)
    }
}
