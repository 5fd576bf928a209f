//! Rich text writer.
//!
//! Produces flattened text plus style spans over character ranges, the shape
//! a display layer consumes. Layout runs in two passes: ordered lists are
//! measured first so every item of a list shares the same leading margin,
//! then the tree is flattened.

use std::collections::HashMap;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use markspan_config::RichTextConfig;

use super::RendererTable;
use super::flat::FlatBuffer;
use crate::error::RenderError;
use crate::node::{AlertKind, Node, NodeKind};

/// Measures the display width of a string.
pub trait TextMeasurer: Send + Sync {
    fn measure(&self, text: &str) -> u32;
}

/// Fixed advance per character.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MonospaceMeasurer {
    pub char_width: u32,
}

impl TextMeasurer for MonospaceMeasurer {
    fn measure(&self, text: &str) -> u32 {
        u32::try_from(text.chars().count())
            .unwrap_or(u32::MAX)
            .saturating_mul(self.char_width)
    }
}

/// Layout parameters for rich text output.
#[derive(Clone)]
pub struct RichTextLayout {
    /// Available width; no margin exceeds it.
    pub display_width: u32,
    /// Default leading margin of list items.
    pub block_margin: u32,
    pub measurer: Arc<dyn TextMeasurer>,
}

impl RichTextLayout {
    /// Space between an ordered list marker and the item content.
    const MARKER_GAP: &'static str = " ";

    fn ordered_margin(&self, first: u64, count: usize) -> u32 {
        let count = u64::try_from(count).unwrap_or(u64::MAX);
        let widest = (0..count)
            .map(|offset| {
                let marker = format!("{}.{}", first.saturating_add(offset), Self::MARKER_GAP);
                self.measurer.measure(&marker)
            })
            .max()
            .unwrap_or(0);
        widest.max(self.block_margin).min(self.display_width)
    }
}

impl Default for RichTextLayout {
    fn default() -> Self {
        Self::from(&RichTextConfig::default())
    }
}

impl From<&RichTextConfig> for RichTextLayout {
    fn from(config: &RichTextConfig) -> Self {
        Self {
            display_width: config.display_width,
            block_margin: config.block_margin,
            measurer: Arc::new(MonospaceMeasurer {
                char_width: config.char_width,
            }),
        }
    }
}

impl fmt::Debug for RichTextLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RichTextLayout")
            .field("display_width", &self.display_width)
            .field("block_margin", &self.block_margin)
            .finish_non_exhaustive()
    }
}

/// Style attached to a span of rich text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Style {
    Strong,
    Emphasis,
    Strikethrough,
    Superscript,
    Subscript,
    Code,
    CodeBlock { language: Option<String> },
    Heading(u8),
    BlockQuote(Option<AlertKind>),
    Link { destination: String },
    Image { destination: String },
    BulletItem { level: usize, margin: u32 },
    OrderedItem { number: u64, margin: u32 },
    TaskMarker { checked: bool },
    Rule,
    Html,
    AlignCenter,
    Video { source: String },
    Youtube { id: String },
}

impl Style {
    /// Opaque tag identifying the style to a display layer.
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Strong => "strong",
            Self::Emphasis => "emphasis",
            Self::Strikethrough => "strikethrough",
            Self::Superscript => "superscript",
            Self::Subscript => "subscript",
            Self::Code => "code",
            Self::CodeBlock { .. } => "code-block",
            Self::Heading(_) => "heading",
            Self::BlockQuote(_) => "block-quote",
            Self::Link { .. } => "link",
            Self::Image { .. } => "image",
            Self::BulletItem { .. } => "bullet-item",
            Self::OrderedItem { .. } => "ordered-item",
            Self::TaskMarker { .. } => "task-marker",
            Self::Rule => "rule",
            Self::Html => "html",
            Self::AlignCenter => "align-center",
            Self::Video { .. } => "video",
            Self::Youtube { .. } => "youtube",
        }
    }
}

/// Style over a character range.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Span {
    pub range: Range<usize>,
    pub style: Style,
}

/// Flattened text with style spans.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RichText {
    pub text: String,
    /// Ordered by start, outer spans before the spans they contain.
    pub spans: Vec<Span>,
}

impl RichText {
    /// Text covered by `span`.
    #[must_use]
    pub fn slice(&self, span: &Span) -> &str {
        let byte = |chars: usize| {
            self.text
                .char_indices()
                .nth(chars)
                .map_or(self.text.len(), |(index, _)| index)
        };
        &self.text[byte(span.range.start)..byte(span.range.end)]
    }

    /// Spans whose style has the given tag.
    pub fn spans_tagged<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Span> + 'a {
        self.spans.iter().filter(move |span| span.style.tag() == tag)
    }
}

/// Writer for the rich text target.
pub struct RichTextWriter {
    buffer: FlatBuffer,
    spans: Vec<Span>,
    renderers: Arc<RendererTable>,
    layout: RichTextLayout,
    /// Measured margin of each ordered list, keyed by node address.
    margins: HashMap<usize, u32>,
    /// Margin of the innermost ordered list being written.
    list_margins: Vec<u32>,
}

impl RichTextWriter {
    pub(crate) fn new(renderers: Arc<RendererTable>, layout: RichTextLayout) -> Self {
        Self {
            buffer: FlatBuffer::default(),
            spans: Vec::new(),
            renderers,
            layout,
            margins: HashMap::new(),
            list_margins: Vec::new(),
        }
    }

    /// Measure pass: compute the leading margin of every ordered list.
    pub(crate) fn measure(&mut self, blocks: &[Node]) {
        for node in blocks.iter().flat_map(Node::descendants) {
            if let NodeKind::List { start: Some(first) } = node.kind {
                let margin = self.layout.ordered_margin(first, node.children.len());
                self.margins.insert(std::ptr::from_ref(node).addr(), margin);
            }
        }
    }

    /// Layout parameters in use.
    #[must_use]
    pub fn layout(&self) -> &RichTextLayout {
        &self.layout
    }

    /// Current length of the flattened text, in characters.
    #[must_use]
    pub fn position(&self) -> usize {
        self.buffer.position()
    }

    /// Append text.
    pub fn push_str(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    /// Separate upcoming block content from what was written before.
    pub fn ensure_block(&mut self) {
        self.buffer.ensure_block();
    }

    /// Style everything written since `start`. Empty ranges are ignored.
    pub fn push_span(&mut self, start: usize, style: Style) {
        let end = self.buffer.position();
        if start < end {
            self.spans.push(Span {
                range: start..end,
                style,
            });
        }
    }

    /// Render a sibling list.
    ///
    /// # Errors
    ///
    /// Returns the first [`RenderError`] raised by a custom node renderer.
    pub fn render_nodes(&mut self, nodes: &[Node]) -> Result<(), RenderError> {
        nodes.iter().try_for_each(|node| self.render_node(node))
    }

    /// Render one node and its subtree.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError`] when a custom node in the subtree has no usable
    /// rich text renderer.
    pub fn render_node(&mut self, node: &Node) -> Result<(), RenderError> {
        match &node.kind {
            NodeKind::Paragraph | NodeKind::Table(_) | NodeKind::DefinitionList => {
                self.buffer.ensure_block();
                self.render_nodes(&node.children)?;
            }
            NodeKind::Heading(level) => {
                self.block_styled(&node.children, Style::Heading(*level))?;
            }
            NodeKind::BlockQuote(alert) => {
                self.block_styled(&node.children, Style::BlockQuote(*alert))?;
            }
            NodeKind::CodeBlock { language, literal } => {
                self.buffer.ensure_block();
                let start = self.position();
                self.buffer.push_str(literal.trim_end_matches('\n'));
                self.push_span(
                    start,
                    Style::CodeBlock {
                        language: language.clone(),
                    },
                );
            }
            NodeKind::HtmlBlock(html) => {
                self.buffer.ensure_block();
                let start = self.position();
                self.buffer.push_str(html.trim_end_matches('\n'));
                self.push_span(start, Style::Html);
            }
            NodeKind::InlineHtml(html) => {
                let start = self.position();
                self.buffer.push_str(html);
                self.push_span(start, Style::Html);
            }
            NodeKind::List { start } => {
                let margin = start.map(|_| {
                    self.margins
                        .get(&std::ptr::from_ref(node).addr())
                        .copied()
                        .unwrap_or(self.layout.block_margin)
                });
                if let Some(margin) = margin {
                    self.list_margins.push(margin);
                }
                self.buffer.start_list(*start);
                self.render_nodes(&node.children)?;
                self.buffer.end_list();
                if margin.is_some() {
                    self.list_margins.pop();
                }
            }
            NodeKind::Item => {
                let number = self.buffer.start_item();
                self.buffer.mark_item_start();
                let start = self.position();
                self.render_nodes(&node.children)?;
                let style = match number {
                    Some(number) => Style::OrderedItem {
                        number,
                        margin: self
                            .list_margins
                            .last()
                            .copied()
                            .unwrap_or(self.layout.block_margin),
                    },
                    None => Style::BulletItem {
                        level: self.buffer.list_depth(),
                        margin: self.layout.block_margin,
                    },
                };
                self.push_span(start, style);
            }
            NodeKind::TaskMarker(checked) => {
                let start = self.position();
                self.buffer.push_str(if *checked { "[x] " } else { "[ ] " });
                self.push_span(start, Style::TaskMarker { checked: *checked });
            }
            NodeKind::Rule => {
                self.buffer.ensure_block();
                let start = self.position();
                self.buffer.push_str("---");
                self.push_span(start, Style::Rule);
            }
            NodeKind::TableHead | NodeKind::TableRow => {
                self.buffer.ensure_line();
                let head_start = self.position();
                for (index, cell) in node.children.iter().enumerate() {
                    if index > 0 {
                        self.buffer.push_str(" | ");
                    }
                    self.render_nodes(&cell.children)?;
                }
                if node.kind == NodeKind::TableHead {
                    self.push_span(head_start, Style::Strong);
                }
            }
            NodeKind::DefinitionTitle => {
                self.buffer.ensure_line();
                let start = self.position();
                self.render_nodes(&node.children)?;
                self.push_span(start, Style::Strong);
            }
            NodeKind::DefinitionDetails => {
                self.buffer.ensure_line();
                self.render_nodes(&node.children)?;
            }
            NodeKind::TableCell => self.render_nodes(&node.children)?,
            NodeKind::Text(text) => self.buffer.push_str(text),
            NodeKind::Code(code) => {
                let start = self.position();
                self.buffer.push_str(code);
                self.push_span(start, Style::Code);
            }
            NodeKind::Emphasis => self.styled(&node.children, Style::Emphasis)?,
            NodeKind::Strong => self.styled(&node.children, Style::Strong)?,
            NodeKind::Strikethrough => self.styled(&node.children, Style::Strikethrough)?,
            NodeKind::Superscript => self.styled(&node.children, Style::Superscript)?,
            NodeKind::Subscript => self.styled(&node.children, Style::Subscript)?,
            NodeKind::Link { destination, .. } => {
                let style = Style::Link {
                    destination: destination.clone(),
                };
                self.styled(&node.children, style)?;
            }
            NodeKind::Image { destination, .. } => {
                let style = Style::Image {
                    destination: destination.clone(),
                };
                self.styled(&node.children, style)?;
            }
            NodeKind::SoftBreak | NodeKind::HardBreak => self.buffer.push_str("\n"),
            NodeKind::Custom(custom) => {
                let renderer = self.renderers.rich_text(custom.kind)?;
                renderer.render(custom, &node.children, self)?;
            }
        }
        Ok(())
    }

    fn styled(&mut self, children: &[Node], style: Style) -> Result<(), RenderError> {
        let start = self.position();
        self.render_nodes(children)?;
        self.push_span(start, style);
        Ok(())
    }

    fn block_styled(&mut self, children: &[Node], style: Style) -> Result<(), RenderError> {
        self.buffer.ensure_block();
        self.styled(children, style)
    }

    pub(crate) fn finish(self) -> RichText {
        let text = self.buffer.finish();
        let len = text.chars().count();
        // Spans close innermost first, so among equal ranges a later push is
        // the outer one.
        let mut spans: Vec<(usize, Span)> = self
            .spans
            .into_iter()
            .enumerate()
            .filter_map(|(order, mut span)| {
                span.range.end = span.range.end.min(len);
                (span.range.start < span.range.end).then_some((order, span))
            })
            .collect();
        spans.sort_by(|(a_order, a), (b_order, b)| {
            a.range
                .start
                .cmp(&b.range.start)
                .then(b.range.end.cmp(&a.range.end))
                .then(b_order.cmp(a_order))
        });
        RichText {
            text,
            spans: spans.into_iter().map(|(_, span)| span).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn writer(layout: RichTextLayout) -> RichTextWriter {
        RichTextWriter::new(Arc::new(RendererTable::default()), layout)
    }

    fn render(nodes: &[Node], layout: RichTextLayout) -> RichText {
        let mut writer = writer(layout);
        writer.measure(nodes);
        writer.render_nodes(nodes).unwrap();
        writer.finish()
    }

    fn ordered_list(start: u64, count: usize) -> Node {
        let items = (0..count)
            .map(|i| Node::with_children(NodeKind::Item, vec![Node::text(format!("item {i}"))]))
            .collect();
        Node::with_children(NodeKind::List { start: Some(start) }, items)
    }

    fn item_margins(rich: &RichText) -> Vec<u32> {
        rich.spans
            .iter()
            .filter_map(|span| match span.style {
                Style::OrderedItem { margin, .. } => Some(margin),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_inline_spans() {
        let nodes = [Node::with_children(
            NodeKind::Paragraph,
            vec![
                Node::text("a "),
                Node::with_children(NodeKind::Strong, vec![Node::text("bold")]),
            ],
        )];
        let rich = render(&nodes, RichTextLayout::default());
        assert_eq!(rich.text, "a bold");
        assert_eq!(
            rich.spans,
            vec![Span {
                range: 2..6,
                style: Style::Strong
            }]
        );
        assert_eq!(rich.slice(&rich.spans[0]), "bold");
    }

    #[test]
    fn test_ordered_list_margin_is_uniform() {
        // "10. " is four characters: 32 at 8 per character.
        let rich = render(&[ordered_list(8, 3)], RichTextLayout::default());
        assert_eq!(item_margins(&rich), vec![32, 32, 32]);
    }

    #[test]
    fn test_short_markers_use_block_margin() {
        let rich = render(&[ordered_list(1, 2)], RichTextLayout::default());
        assert_eq!(item_margins(&rich), vec![24, 24]);
    }

    #[test]
    fn test_margin_capped_at_display_width() {
        let layout = RichTextLayout {
            display_width: 20,
            ..RichTextLayout::default()
        };
        let rich = render(&[ordered_list(98, 3)], layout);
        assert_eq!(item_margins(&rich), vec![20, 20, 20]);
    }

    #[test]
    fn test_custom_measurer() {
        struct Wide;
        impl TextMeasurer for Wide {
            fn measure(&self, text: &str) -> u32 {
                u32::try_from(text.len()).unwrap() * 100
            }
        }
        let layout = RichTextLayout {
            display_width: 10_000,
            block_margin: 0,
            measurer: Arc::new(Wide),
        };
        let rich = render(&[ordered_list(1, 1)], layout);
        assert_eq!(item_margins(&rich), vec![300]);
    }

    #[test]
    fn test_multibyte_ranges_are_characters() {
        let nodes = [Node::with_children(
            NodeKind::Paragraph,
            vec![
                Node::text("né "),
                Node::with_children(NodeKind::Emphasis, vec![Node::text("ü")]),
            ],
        )];
        let rich = render(&nodes, RichTextLayout::default());
        assert_eq!(rich.spans[0].range, 3..4);
        assert_eq!(rich.slice(&rich.spans[0]), "ü");
    }

    #[test]
    fn test_outer_span_sorted_first() {
        let nodes = [Node::with_children(
            NodeKind::Paragraph,
            vec![Node::with_children(
                NodeKind::Strong,
                vec![Node::with_children(NodeKind::Emphasis, vec![Node::text("x")])],
            )],
        )];
        let rich = render(&nodes, RichTextLayout::default());
        let tags: Vec<_> = rich.spans.iter().map(|span| span.style.tag()).collect();
        assert_eq!(tags, vec!["strong", "emphasis"]);
        assert_eq!(rich.spans_tagged("emphasis").count(), 1);
    }

    #[test]
    fn test_equal_ranges_keep_nesting_order() {
        let nodes = [Node::with_children(
            NodeKind::Paragraph,
            vec![Node::with_children(
                NodeKind::Emphasis,
                vec![Node::with_children(
                    NodeKind::Strong,
                    vec![Node::with_children(
                        NodeKind::Strikethrough,
                        vec![Node::text("deep")],
                    )],
                )],
            )],
        )];
        let rich = render(&nodes, RichTextLayout::default());
        let tags: Vec<_> = rich.spans.iter().map(|span| span.style.tag()).collect();
        assert_eq!(tags, vec!["emphasis", "strong", "strikethrough"]);
        assert!(rich.spans.iter().all(|span| span.range == (0..4)));
    }
}
