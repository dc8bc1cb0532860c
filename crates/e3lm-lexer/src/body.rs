//! Literal body blocks.
//!
//! A body opens at a `---` marker inside a block and captures the following
//! lines verbatim until a closing marker or a dedent below the body's
//! starting indentation. Names listed after the opening marker
//! (`---rtl, notes`) are kept with the body.

use crate::line_index::{LineIndex, LineRecord, BODY_MARKER};
use crate::token::BodyValue;
use tracing::debug;

/// A finished body and the byte offset where its text ends.
#[derive(Debug, Clone, PartialEq)]
pub struct ClosedBody {
    pub value: BodyValue,
    pub start: usize,
    pub end: usize,
}

/// State of one open body, created at its opening marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyExtractor {
    marker_line: usize,
    start_line: usize,
    start: usize,
    indent: usize,
    tab_width: usize,
    names: Vec<String>,
}

impl BodyExtractor {
    /// Open a body at `marker`. The text starts on the line after the
    /// marker; its indentation comes from the first non-blank line there.
    pub fn open(marker: &LineRecord, lines: &LineIndex, tab_width: usize) -> Self {
        let start_line = marker.number + 1;
        let start = lines.get(start_line).map_or(marker.end + 1, |line| line.start);
        let indent = lines.body_indent(marker.number);
        let names = marker
            .text
            .strip_prefix(BODY_MARKER)
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(String::from)
            .collect();

        Self {
            marker_line: marker.number,
            start_line,
            start,
            indent,
            tab_width,
            names,
        }
    }

    pub fn start_line(&self) -> usize {
        self.start_line
    }

    /// Evaluate the boundary after line `current` has been consumed.
    /// Returns the finished body once the lookahead line ends it.
    pub fn step(&self, current: usize, lines: &LineIndex, source: &str) -> Option<ClosedBody> {
        let ahead = lines.get(current + 1);

        if ahead.is_some_and(LineRecord::is_marker) {
            // Marker right after the opening marker: empty body.
            let last = (current > self.marker_line).then_some(current);
            return Some(self.close(last, lines, source));
        }

        let dedent = ahead.is_some_and(|line| !line.is_blank() && line.indent < self.indent);
        if dedent {
            let mut last = current;
            while last > self.marker_line && lines.get(last).is_some_and(LineRecord::is_blank) {
                last -= 1;
            }
            let last = (last > self.marker_line).then_some(last);
            return Some(self.close(last, lines, source));
        }

        None
    }

    fn close(&self, last: Option<usize>, lines: &LineIndex, source: &str) -> ClosedBody {
        let end = last
            .and_then(|number| lines.get(number))
            .map_or(self.start, |line| line.end);
        let text = normalize(&source[self.start..end], self.indent, self.tab_width);

        debug!(
            target: "e3lm::lexer",
            start_line = self.start_line,
            end_line = last.unwrap_or(self.marker_line),
            indent = self.indent,
            "close body"
        );

        ClosedBody {
            value: BodyValue {
                start_line: self.start_line,
                text,
                names: self.names.clone(),
            },
            start: self.start,
            end,
        }
    }
}

/// Strip up to `indent` columns of leading whitespace from every line,
/// stopping early at the first non-whitespace character.
pub fn normalize(text: &str, indent: usize, tab_width: usize) -> String {
    text.split('\n')
        .map(|line| {
            let mut width = 0;
            let mut cut = 0;
            for ch in line.chars() {
                if width >= indent {
                    break;
                }
                match ch {
                    ' ' => width += 1,
                    '\t' => width += tab_width,
                    _ => break,
                }
                cut += 1;
            }
            &line[cut..]
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Open at line `marker` and step until the body closes.
    fn extract(source: &str, marker: usize) -> Option<ClosedBody> {
        let lines = LineIndex::build(source, 4);
        let body = BodyExtractor::open(lines.get(marker).unwrap(), &lines, 4);
        (marker..=lines.len()).find_map(|current| body.step(current, &lines, source))
    }

    #[test]
    fn test_body_closed_by_marker() {
        let source = "  ---\n    one\n      two\n  ---\n";
        let body = extract(source, 1).unwrap();
        assert_eq!(body.value.text, "one\n  two");
        assert_eq!(body.value.start_line, 2);
        assert!(body.value.names.is_empty());
    }

    #[test]
    fn test_adjacent_markers_give_empty_body() {
        let body = extract("  ---\n  ---\n", 1).unwrap();
        assert_eq!(body.value.text, "");
        assert_eq!(body.start, body.end);
    }

    #[test]
    fn test_names_after_marker() {
        let source = "---rtl, notes ; tagged\ntext\n---\n";
        let body = extract(source, 1).unwrap();
        assert_eq!(body.value.names, vec!["rtl", "notes"]);
        assert_eq!(body.value.text, "text");
    }

    #[test]
    fn test_dedent_includes_last_content_line() {
        let source = "  ---\n    alpha\n    beta\nend\n";
        let body = extract(source, 1).unwrap();
        assert_eq!(body.value.text, "alpha\nbeta");
        assert_eq!(&source[body.end..body.end + 1], "\n");
    }

    #[test]
    fn test_dedent_after_blank_line_backs_up_to_content() {
        let source = "  ---\n    alpha\n\nend\n";
        let body = extract(source, 1).unwrap();
        assert_eq!(body.value.text, "alpha");
    }

    #[test]
    fn test_blank_lines_inside_body_are_kept() {
        let source = "---\n  a\n\n  b\n---\n";
        let body = extract(source, 1).unwrap();
        assert_eq!(body.value.text, "a\n\nb");
    }

    #[test]
    fn test_unterminated_body_never_closes() {
        assert!(extract("---\n  a\n  b\n", 1).is_none());
    }

    #[test]
    fn test_normalize_never_over_trims() {
        assert_eq!(normalize("    a\n  b\n      c", 4, 4), "a\nb\n  c");
        assert_eq!(normalize("\tx", 4, 4), "x");
        assert_eq!(normalize("  ", 4, 4), "");
    }

    #[test]
    fn test_reindent_round_trip() {
        let source = "---\n    first\n      second\n    third\n---\n";
        let body = extract(source, 1).unwrap();
        let reindented: Vec<String> = body
            .value
            .text
            .lines()
            .map(|line| format!("{}{line}", " ".repeat(4)))
            .collect();
        assert_eq!(reindented.join("\n"), source[body.start..body.end]);
    }
}
