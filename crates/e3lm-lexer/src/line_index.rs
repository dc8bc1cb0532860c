//! Per-line metadata for one lex session.
//!
//! Built in a single pass before scanning starts. Body boundary detection
//! and block indentation both look ahead of the scanner's cursor, so every
//! line has to be classified up front.

/// Body marker opening and closing a literal body block.
pub const BODY_MARKER: &str = "---";

/// Metadata for one physical line. Line numbers start at 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRecord {
    pub number: usize,
    /// Width of the leading whitespace, tabs expanded.
    pub indent: usize,
    /// Content without indentation and trailing comment.
    pub text: String,
    /// Comment text after `;`, if any.
    pub comment: Option<String>,
    pub has_content: bool,
    /// Byte offset of the first character of the line.
    pub start: usize,
    /// Byte offset of the line terminator (exclusive end of the line).
    pub end: usize,
}

impl LineRecord {
    /// A line with neither content nor comment.
    pub fn is_blank(&self) -> bool {
        !self.has_content && self.comment.is_none()
    }

    pub fn is_marker(&self) -> bool {
        self.text.starts_with(BODY_MARKER)
    }

    /// Whether the line starts with the `end` keyword.
    pub fn is_end(&self) -> bool {
        let bytes = self.text.as_bytes();
        self.text
            .get(..3)
            .is_some_and(|head| head.eq_ignore_ascii_case("end"))
            && !matches!(bytes.get(3), Some(b) if b.is_ascii_alphanumeric() || *b == b'_')
    }
}

/// Read-only table of [`LineRecord`]s for a flattened source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineIndex {
    lines: Vec<LineRecord>,
}

impl LineIndex {
    /// Classify every line of `text`.
    pub fn build(text: &str, tab_width: usize) -> Self {
        let mut lines = Vec::new();
        let mut start = 0;

        for (i, raw) in text.split_inclusive('\n').enumerate() {
            let line = raw.strip_suffix('\n').unwrap_or(raw);
            lines.push(Self::classify(i + 1, line, start, tab_width));
            start += raw.len();
        }

        Self { lines }
    }

    fn classify(number: usize, line: &str, start: usize, tab_width: usize) -> LineRecord {
        let mut indent = 0;
        let mut indent_bytes = 0;
        for ch in line.chars() {
            match ch {
                ' ' => indent += 1,
                '\t' => indent += tab_width,
                _ => break,
            }
            indent_bytes += 1;
        }

        let rest = &line[indent_bytes..];
        let (content, comment) = match rest.find(';') {
            Some(at) => (&rest[..at], Some(rest[at + 1..].to_string())),
            None => (rest, None),
        };
        let text = content.trim_end().to_string();

        LineRecord {
            number,
            indent,
            has_content: !text.is_empty(),
            text,
            comment,
            start,
            end: start + line.len(),
        }
    }

    /// Look up a line by its 1-based number.
    pub fn get(&self, number: usize) -> Option<&LineRecord> {
        number.checked_sub(1).and_then(|i| self.lines.get(i))
    }

    /// The first line after `number` that carries content.
    pub fn next_content_after(&self, number: usize) -> Option<&LineRecord> {
        self.lines.iter().skip(number).find(|line| line.has_content)
    }

    /// Indentation of a body opened by the marker on line `marker`: that of
    /// the first non-blank line after it.
    pub fn body_indent(&self, marker: usize) -> usize {
        self.lines
            .iter()
            .skip(marker)
            .find(|line| !line.is_blank())
            .map_or(0, |line| line.indent)
    }

    pub fn indent_of(&self, number: usize) -> usize {
        self.get(number).map_or(0, |line| line.indent)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LineRecord> {
        self.lines.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_classifies_content_blank_and_comment_lines() {
        let index = LineIndex::build("Foo\n\n  ; note\n  x = 1 ; one\n", 4);
        assert_eq!(index.len(), 4);

        let header = index.get(1).unwrap();
        assert_eq!(header.text, "Foo");
        assert!(header.has_content);
        assert_eq!(header.comment, None);

        let blank = index.get(2).unwrap();
        assert!(blank.is_blank());
        assert_eq!(blank.indent, 0);

        let comment = index.get(3).unwrap();
        assert!(!comment.has_content);
        assert!(!comment.is_blank());
        assert_eq!(comment.comment.as_deref(), Some(" note"));

        let attr = index.get(4).unwrap();
        assert_eq!(attr.indent, 2);
        assert_eq!(attr.text, "x = 1");
        assert_eq!(attr.comment.as_deref(), Some(" one"));
    }

    #[test]
    fn test_tabs_expand_to_tab_width() {
        let index = LineIndex::build("\t x\n", 4);
        assert_eq!(index.get(1).unwrap().indent, 5);
        let index = LineIndex::build("\tx\n", 2);
        assert_eq!(index.get(1).unwrap().indent, 2);
    }

    #[test]
    fn test_offsets_cover_each_line() {
        let text = "ab\n  cd\n";
        let index = LineIndex::build(text, 4);
        let second = index.get(2).unwrap();
        assert_eq!(&text[second.start..second.end], "  cd");
    }

    #[test]
    fn test_out_of_range_lines() {
        let index = LineIndex::build("a\n", 4);
        assert!(index.get(0).is_none());
        assert!(index.get(2).is_none());
        assert_eq!(index.indent_of(7), 0);
    }

    #[test]
    fn test_markers_and_end_lines() {
        let index = LineIndex::build("---rtl\nEnd\nending = 1\nend ; done\n", 4);
        assert!(index.get(1).unwrap().is_marker());
        assert!(index.get(2).unwrap().is_end());
        assert!(!index.get(3).unwrap().is_end());
        assert!(index.get(4).unwrap().is_end());
    }

    #[test]
    fn test_next_content_skips_blank_and_comment_lines() {
        let index = LineIndex::build("Foo\n\n; c\n    x = 1\n", 4);
        let next = index.next_content_after(1).unwrap();
        assert_eq!(next.number, 4);
        assert_eq!(next.indent, 4);
        assert!(index.next_content_after(4).is_none());
    }
}
