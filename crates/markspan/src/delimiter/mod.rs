//! Custom inline delimiters.
//!
//! A [`DelimiterProcessor`] claims an opening and a closing token (for example
//! `webm(` and `)`). After the base grammar has produced inline nodes, the
//! matcher scans every text node for those tokens, pairs openers with closers
//! and asks the processor to wrap the enclosed siblings in a custom node.
//!
//! # Example
//!
//! ```
//! use markspan::delimiter::{DelimiterProcessor, DelimiterRun, DelimiterSpec, FixedDelimiterProcessor};
//! use markspan::CustomKind;
//!
//! let processor = FixedDelimiterProcessor::new(DelimiterSpec::new("webm(", ")", 6), CustomKind::Video);
//!
//! let short = DelimiterRun { character: 'w', length: 5, position: 0 };
//! let full = DelimiterRun { character: 'w', length: 6, position: 0 };
//! assert_eq!(processor.decide_usable_length(&short, &full), 0);
//! assert_eq!(processor.decide_usable_length(&full, &full), 6);
//! ```

mod matcher;

pub(crate) use matcher::process_inlines;

use crate::node::{CustomKind, CustomNode, Node};

/// Characters the base grammar interprets inline; delimiters may not start or
/// end with them.
pub const RESERVED_CHARACTERS: &[char] = &['*', '_', '`', '[', ']', '<', '!', '\\', '&', '~'];

/// Opening and closing tokens of a custom delimiter plus the run length needed
/// to activate it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DelimiterSpec {
    opening: String,
    closing: String,
    min_length: usize,
}

impl DelimiterSpec {
    /// Create a specification. Validity is checked when the pipeline is assembled.
    #[must_use]
    pub fn new(opening: impl Into<String>, closing: impl Into<String>, min_length: usize) -> Self {
        Self {
            opening: opening.into(),
            closing: closing.into(),
            min_length,
        }
    }

    /// Opening token.
    #[must_use]
    pub fn opening(&self) -> &str {
        &self.opening
    }

    /// Closing token.
    #[must_use]
    pub fn closing(&self) -> &str {
        &self.closing
    }

    /// First character of the opening token.
    ///
    /// Returns `'\0'` for an empty token, which validation rejects.
    #[must_use]
    pub fn opening_character(&self) -> char {
        self.opening.chars().next().unwrap_or('\0')
    }

    /// First character of the closing token.
    #[must_use]
    pub fn closing_character(&self) -> char {
        self.closing.chars().next().unwrap_or('\0')
    }

    /// Minimum run length needed to activate the delimiter.
    #[must_use]
    pub fn min_length(&self) -> usize {
        self.min_length
    }

    /// Whether the same token opens and closes.
    #[must_use]
    pub fn is_symmetric(&self) -> bool {
        self.opening == self.closing
    }

    /// Characters in the opening and closing tokens together.
    #[must_use]
    pub fn width(&self) -> usize {
        self.opening.chars().count() + self.closing.chars().count()
    }

    /// Check the specification's invariants.
    ///
    /// Returns a description of the first violated invariant. Reserved
    /// characters are reported separately through [`reserved_character`](Self::reserved_character).
    pub fn validate(&self) -> Result<(), String> {
        if self.opening.is_empty() || self.closing.is_empty() {
            return Err("opening and closing tokens must not be empty".to_owned());
        }
        if self.min_length == 0 {
            return Err("minimum length must be at least 1".to_owned());
        }
        if self.min_length > self.width() {
            return Err(format!(
                "minimum length {} exceeds delimiter width {}",
                self.min_length,
                self.width()
            ));
        }
        Ok(())
    }

    /// First reserved character found at either end of the tokens, if any.
    #[must_use]
    pub fn reserved_character(&self) -> Option<char> {
        [&self.opening, &self.closing]
            .into_iter()
            .flat_map(|token| [token.chars().next(), token.chars().last()])
            .flatten()
            .find(|c| RESERVED_CHARACTERS.contains(c))
    }
}

/// A delimiter occurrence found while scanning inline text.
///
/// `length` counts the delimiter characters available to the pair this run
/// can form, that is the opening token plus the closing token, in characters.
/// `position` is the character offset of the run within its text node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DelimiterRun {
    /// First character of the run.
    pub character: char,
    /// Delimiter characters available to the pair.
    pub length: usize,
    /// Character offset within the scanned text.
    pub position: usize,
}

/// Hook for custom inline syntax delimited by an opening and a closing token.
pub trait DelimiterProcessor: Send + Sync {
    /// Delimiter configuration.
    fn spec(&self) -> &DelimiterSpec;

    /// Kind of node built from a matched pair.
    fn node_kind(&self) -> CustomKind;

    /// Character that starts an opening run.
    fn opening_character(&self) -> char {
        self.spec().opening_character()
    }

    /// Character that starts a closing run.
    fn closing_character(&self) -> char {
        self.spec().closing_character()
    }

    /// Minimum run length. Always at least 1 in an assembled pipeline.
    fn min_length(&self) -> usize {
        self.spec().min_length()
    }

    /// Decide how many delimiter characters a matched pair consumes.
    ///
    /// Returns 0 to reject the pair. Delimiters are fixed width: an accepted
    /// pair always consumes exactly [`min_length`](Self::min_length).
    ///
    /// The matcher only hands over runs of complete tokens, each carrying the
    /// full pair width ([`DelimiterSpec::width`]), and assembly checks that the
    /// spec's minimum fits that width. Shorter text never becomes a run. The
    /// default therefore rejects nothing for a plain [`FixedDelimiterProcessor`];
    /// the rejection branch is reached by processors whose `min_length` or own
    /// `decide_usable_length` asks for more than the token pair provides.
    fn decide_usable_length(&self, opener: &DelimiterRun, closer: &DelimiterRun) -> usize {
        let min = self.min_length();
        if opener.length < min || closer.length < min {
            return 0;
        }
        min
    }

    /// Build the node replacing a matched span.
    ///
    /// `children` are the siblings that were between opener and closer, with
    /// the delimiter text already removed. It may be empty.
    fn build(
        &self,
        _opener: &DelimiterRun,
        _closer: &DelimiterRun,
        _used_length: usize,
        children: Vec<Node>,
    ) -> Node {
        let spec = self.spec();
        Node::custom(
            CustomNode::new(self.node_kind(), spec.opening(), spec.closing()),
            children,
        )
    }
}

/// Delimiter processor for fixed-width token pairs such as `webm(...)`.
#[derive(Clone, Debug)]
pub struct FixedDelimiterProcessor {
    spec: DelimiterSpec,
    kind: CustomKind,
}

impl FixedDelimiterProcessor {
    #[must_use]
    pub fn new(spec: DelimiterSpec, kind: CustomKind) -> Self {
        Self { spec, kind }
    }
}

impl DelimiterProcessor for FixedDelimiterProcessor {
    fn spec(&self) -> &DelimiterSpec {
        &self.spec
    }

    fn node_kind(&self) -> CustomKind {
        self.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeKind;

    fn webm() -> FixedDelimiterProcessor {
        FixedDelimiterProcessor::new(DelimiterSpec::new("webm(", ")", 6), CustomKind::Video)
    }

    fn run(length: usize) -> DelimiterRun {
        DelimiterRun {
            character: 'w',
            length,
            position: 0,
        }
    }

    #[test]
    fn test_accessors() {
        let processor = webm();
        assert_eq!(processor.opening_character(), 'w');
        assert_eq!(processor.closing_character(), ')');
        assert_eq!(processor.min_length(), 6);
        assert_eq!(processor.spec().width(), 6);
        assert!(!processor.spec().is_symmetric());
    }

    #[test]
    fn test_run_below_minimum_rejected() {
        let processor = webm();
        assert_eq!(processor.decide_usable_length(&run(5), &run(6)), 0);
        assert_eq!(processor.decide_usable_length(&run(6), &run(5)), 0);
    }

    #[test]
    fn test_usable_length_is_fixed() {
        let processor = webm();
        assert_eq!(processor.decide_usable_length(&run(6), &run(6)), 6);
        assert_eq!(processor.decide_usable_length(&run(9), &run(12)), 6);
    }

    #[test]
    fn test_build_with_no_children() {
        let processor = webm();
        let node = processor.build(&run(6), &run(6), 6, Vec::new());
        assert!(node.children.is_empty());
        assert_eq!(
            node.kind,
            NodeKind::Custom(CustomNode::new(CustomKind::Video, "webm(", ")"))
        );
    }

    #[test]
    fn test_validate() {
        assert!(DelimiterSpec::new("webm(", ")", 6).validate().is_ok());
        assert!(DelimiterSpec::new("", ")", 1).validate().is_err());
        assert!(DelimiterSpec::new("webm(", ")", 0).validate().is_err());
        assert!(DelimiterSpec::new("webm(", ")", 7).validate().is_err());
    }

    #[test]
    fn test_reserved_character() {
        assert_eq!(DelimiterSpec::new("webm(", ")", 6).reserved_character(), None);
        assert_eq!(DelimiterSpec::new("~!", "!~", 4).reserved_character(), Some('~'));
        assert_eq!(DelimiterSpec::new("img(", "]", 5).reserved_character(), Some(']'));
    }

    #[test]
    fn test_symmetric_spec() {
        let spec = DelimiterSpec::new("==", "==", 4);
        assert!(spec.is_symmetric());
        assert_eq!(spec.opening_character(), spec.closing_character());
    }
}
