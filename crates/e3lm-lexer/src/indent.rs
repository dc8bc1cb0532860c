//! Block indentation tracking.
//!
//! One [`Frame`] per open class block. The first member line of a block
//! (attribute or nested class header) fixes the indentation every later
//! member must repeat exactly; `end` must line up with the block's header.

use crate::LexError;
use tracing::debug;

/// How the next member of a frame is compared against its header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Unset,
    /// Members may not sit left of the header.
    EqualOrGreater,
}

/// One block activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Class name of the block header.
    pub owner: String,
    /// Line of the block header.
    pub line: usize,
    /// Indentation of the header line.
    pub header_indent: usize,
    /// Indentation members must use, once fixed.
    pub required: Option<usize>,
    pub comparison: Comparison,
}

impl Frame {
    pub fn new(owner: impl Into<String>, line: usize, header_indent: usize) -> Self {
        Self {
            owner: owner.into(),
            line,
            header_indent,
            required: None,
            comparison: Comparison::Unset,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndentStack {
    frames: Vec<Frame>,
}

impl IndentStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: Frame) {
        debug!(
            target: "e3lm::lexer",
            owner = %frame.owner,
            line = frame.line,
            depth = self.frames.len() + 1,
            "open block"
        );
        self.frames.push(frame);
    }

    pub fn top(&self) -> Option<&Frame> {
        self.frames.last()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Called at the newline ending a bare block header: fix the member
    /// indentation from the next content line, unless that line closes the
    /// block straight away.
    pub fn expect_members(&mut self, next: Option<(usize, bool)>) {
        if let Some(frame) = self.frames.last_mut() {
            if frame.required.is_some() {
                return;
            }
            frame.comparison = Comparison::EqualOrGreater;
            if let Some((indent, false)) = next {
                frame.required = Some(indent);
            }
        }
    }

    /// Validate a member line (attribute or nested header) of the innermost
    /// block. The first member fixes the requirement if nothing did yet.
    pub fn check_member(&mut self, actual: usize, line: usize, column: usize) -> Result<(), LexError> {
        let Some(frame) = self.frames.last_mut() else {
            return Ok(());
        };

        if frame.comparison == Comparison::EqualOrGreater && actual < frame.header_indent {
            return Err(LexError::indentation(frame.header_indent, actual, line, column));
        }

        match frame.required {
            None => {
                frame.required = Some(actual);
                Ok(())
            }
            Some(required) if required != actual => {
                Err(LexError::indentation(required, actual, line, column))
            }
            Some(_) => Ok(()),
        }
    }

    /// Close the innermost block at an `end` line indented by `actual`.
    pub fn pop(&mut self, actual: usize, line: usize, column: usize) -> Result<Frame, LexError> {
        let Some(frame) = self.frames.pop() else {
            return Err(LexError::syntax("Unexpected end without an open block", line, column));
        };

        if actual != frame.header_indent {
            return Err(LexError::indentation(frame.header_indent, actual, line, column));
        }

        debug!(
            target: "e3lm::lexer",
            owner = %frame.owner,
            line,
            depth = self.frames.len(),
            "close block"
        );
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ErrorDetail, ErrorKind};

    fn stack_with_block(header_indent: usize) -> IndentStack {
        let mut stack = IndentStack::new();
        stack.push(Frame::new("Foo", 1, header_indent));
        stack
    }

    #[test]
    fn test_first_member_fixes_requirement() {
        let mut stack = stack_with_block(0);
        stack.check_member(4, 2, 5).unwrap();
        assert_eq!(stack.top().unwrap().required, Some(4));
        stack.check_member(4, 3, 5).unwrap();
    }

    #[test]
    fn test_mismatched_member_reports_required_and_actual() {
        let mut stack = stack_with_block(0);
        stack.check_member(4, 2, 5).unwrap();
        let err = stack.check_member(2, 3, 3).unwrap_err();
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

    #[test]
    fn test_expect_members_uses_lookahead() {
        let mut stack = stack_with_block(8);
        stack.expect_members(Some((4, false)));
        let frame = stack.top().unwrap();
        assert_eq!(frame.required, Some(4));
        assert_eq!(frame.comparison, Comparison::EqualOrGreater);

        // The member the lookahead saw sits left of its header.
        let err = stack.check_member(4, 4, 5).unwrap_err();
        assert_eq!(
            err.detail,
            Some(ErrorDetail::Indentation {
                required: 8,
                actual: 4
            })
        );
    }

    #[test]
    fn test_expect_members_ignores_immediate_end() {
        let mut stack = stack_with_block(0);
        stack.expect_members(Some((0, true)));
        assert_eq!(stack.top().unwrap().required, None);
        let frame = stack.pop(0, 2, 1).unwrap();
        assert_eq!(frame.comparison, Comparison::EqualOrGreater);
        assert_eq!(frame.required, None);
        assert!(stack.is_empty());
    }

    #[test]
    fn test_end_must_align_with_header() {
        let mut stack = stack_with_block(2);
        stack.check_member(4, 2, 5).unwrap();
        let err = stack.pop(4, 3, 5).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Indentation);
        assert_eq!(
            err.detail,
            Some(ErrorDetail::Indentation {
                required: 2,
                actual: 4
            })
        );
    }

    #[test]
    fn test_frames_are_independent() {
        let mut stack = stack_with_block(0);
        stack.check_member(4, 2, 5).unwrap();
        stack.push(Frame::new("Bar", 2, 4));
        stack.check_member(8, 3, 9).unwrap();
        stack.pop(4, 4, 5).unwrap();
        stack.check_member(4, 5, 5).unwrap();
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn test_pop_on_empty_stack() {
        let mut stack = IndentStack::new();
        assert!(stack.pop(0, 1, 1).is_err());
    }
}
