//! Line-oriented text buffer shared by the plain text and rich text writers.

/// Flattened output with block separation and list bookkeeping.
///
/// Positions are counted in characters so that rich text spans index the
/// string the same way a display layer does.
#[derive(Debug, Default)]
pub(crate) struct FlatBuffer {
    text: String,
    chars: usize,
    lists: Vec<Option<u64>>,
    /// Byte length right after the last list item prefix.
    item_start: Option<usize>,
}

impl FlatBuffer {
    pub(crate) fn push_str(&mut self, text: &str) {
        self.text.push_str(text);
        self.chars += text.chars().count();
    }

    fn push(&mut self, c: char) {
        self.text.push(c);
        self.chars += 1;
    }

    /// Current length in characters.
    pub(crate) fn position(&self) -> usize {
        self.chars
    }

    fn at_item_start(&self) -> bool {
        self.item_start == Some(self.text.len())
    }

    /// Start a new line unless already at the start of one.
    pub(crate) fn ensure_line(&mut self) {
        if self.text.is_empty() || self.text.ends_with('\n') || self.at_item_start() {
            return;
        }
        self.push('\n');
    }

    /// Separate the next block from previous output.
    ///
    /// Blocks are separated by a blank line, or by a single line break inside
    /// lists.
    pub(crate) fn ensure_block(&mut self) {
        if self.text.is_empty() || self.at_item_start() {
            return;
        }
        if !self.lists.is_empty() {
            self.ensure_line();
            return;
        }
        while !self.text.ends_with("\n\n") {
            self.push('\n');
        }
    }

    pub(crate) fn start_list(&mut self, start: Option<u64>) {
        self.ensure_block();
        self.lists.push(start);
    }

    pub(crate) fn end_list(&mut self) {
        self.lists.pop();
    }

    /// Nesting depth of the innermost list, starting at 1.
    pub(crate) fn list_depth(&self) -> usize {
        self.lists.len()
    }

    /// Begin a list item and return its ordinal when the list is ordered.
    pub(crate) fn start_item(&mut self) -> Option<u64> {
        self.ensure_line();
        self.lists.last_mut().and_then(|next| {
            let current = *next;
            if let Some(n) = next {
                *n += 1;
            }
            current
        })
    }

    /// Mark the end of an item prefix; block separation is suppressed until
    /// more content arrives.
    pub(crate) fn mark_item_start(&mut self) {
        self.item_start = Some(self.text.len());
    }

    /// Finished text, without trailing line breaks.
    pub(crate) fn finish(mut self) -> String {
        let trimmed = self.text.trim_end_matches('\n').len();
        self.text.truncate(trimmed);
        self.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_blocks_separated_by_blank_line() {
        let mut buf = FlatBuffer::default();
        buf.ensure_block();
        buf.push_str("a");
        buf.ensure_block();
        buf.push_str("b");
        buf.ensure_block();
        assert_eq!(buf.finish(), "a\n\nb");
    }

    #[test]
    fn test_ordered_items_count_up() {
        let mut buf = FlatBuffer::default();
        buf.start_list(Some(9));
        assert_eq!(buf.start_item(), Some(9));
        assert_eq!(buf.start_item(), Some(10));
        buf.end_list();
        buf.start_list(None);
        assert_eq!(buf.start_item(), None);
    }

    #[test]
    fn test_item_prefix_suppresses_separation() {
        let mut buf = FlatBuffer::default();
        buf.start_list(None);
        buf.start_item();
        buf.push_str("- ");
        buf.mark_item_start();
        buf.ensure_block();
        buf.push_str("x");
        assert_eq!(buf.finish(), "- x");
    }

    #[test]
    fn test_position_counts_characters() {
        let mut buf = FlatBuffer::default();
        buf.push_str("héllo");
        assert_eq!(buf.position(), 5);
    }
}
