//! Owned document tree.
//!
//! The tree is a strict forest: every node is owned by its parent's child
//! list and nothing is shared. It is built once by the pipeline and only
//! read afterwards, so a [`Document`] can be rendered from several threads.

use std::fmt;

use pulldown_cmark::{Alignment, BlockQuoteKind};

/// GitHub alert kind for blockquotes (`> [!NOTE]`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AlertKind {
    Note,
    Tip,
    Important,
    Warning,
    Caution,
}

impl From<BlockQuoteKind> for AlertKind {
    fn from(kind: BlockQuoteKind) -> Self {
        match kind {
            BlockQuoteKind::Note => Self::Note,
            BlockQuoteKind::Tip => Self::Tip,
            BlockQuoteKind::Important => Self::Important,
            BlockQuoteKind::Warning => Self::Warning,
            BlockQuoteKind::Caution => Self::Caution,
        }
    }
}

/// Kinds of custom nodes contributed by extensions.
///
/// The set is closed: adding a kind means adding a renderer for it at every
/// target, which the pipeline checks when it is assembled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CustomKind {
    /// Center-aligned content (`~~~...~~~`).
    Center,
    /// Embedded video reference (`webm(...)`).
    Video,
    /// Embedded YouTube reference (`youtube(...)`).
    Youtube,
}

impl CustomKind {
    /// Stable name used in errors and style tags.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Center => "center",
            Self::Video => "video",
            Self::Youtube => "youtube",
        }
    }
}

impl fmt::Display for CustomKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Data carried by a custom node.
///
/// The enclosed content lives in the owning [`Node`]'s children.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CustomNode {
    /// Node kind tag.
    pub kind: CustomKind,
    /// Opening delimiter as written in the source (e.g. `webm(`).
    pub opening_delimiter: String,
    /// Closing delimiter as written in the source (e.g. `)`).
    pub closing_delimiter: String,
}

impl CustomNode {
    #[must_use]
    pub fn new(
        kind: CustomKind,
        opening_delimiter: impl Into<String>,
        closing_delimiter: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            opening_delimiter: opening_delimiter.into(),
            closing_delimiter: closing_delimiter.into(),
        }
    }
}

/// Node kind, covering the base grammar and custom nodes.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    Paragraph,
    Heading(u8),
    BlockQuote(Option<AlertKind>),
    CodeBlock {
        language: Option<String>,
        literal: String,
    },
    HtmlBlock(String),
    List {
        start: Option<u64>,
    },
    Item,
    TaskMarker(bool),
    Rule,
    Table(Vec<Alignment>),
    TableHead,
    TableRow,
    TableCell,
    DefinitionList,
    DefinitionTitle,
    DefinitionDetails,
    Text(String),
    Code(String),
    InlineHtml(String),
    Emphasis,
    Strong,
    Strikethrough,
    Superscript,
    Subscript,
    Link {
        destination: String,
        title: String,
    },
    Image {
        destination: String,
        title: String,
    },
    SoftBreak,
    HardBreak,
    Custom(CustomNode),
}

/// A node of the document tree.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub children: Vec<Node>,
}

impl Node {
    /// Create a node without children.
    #[must_use]
    pub fn leaf(kind: NodeKind) -> Self {
        Self {
            kind,
            children: Vec::new(),
        }
    }

    /// Create a node with children.
    #[must_use]
    pub fn with_children(kind: NodeKind, children: Vec<Node>) -> Self {
        Self { kind, children }
    }

    /// Create a text node.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::leaf(NodeKind::Text(text.into()))
    }

    /// Create a custom node wrapping `children`.
    #[must_use]
    pub fn custom(custom: CustomNode, children: Vec<Node>) -> Self {
        Self::with_children(NodeKind::Custom(custom), children)
    }

    /// Custom node data, if this is a custom node.
    #[must_use]
    pub fn as_custom(&self) -> Option<&CustomNode> {
        match &self.kind {
            NodeKind::Custom(custom) => Some(custom),
            _ => None,
        }
    }

    /// Text of a text node.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Whether the node occupies a block of its own.
    ///
    /// Custom nodes are blocks when they wrap at least one block.
    #[must_use]
    pub fn is_block(&self) -> bool {
        match &self.kind {
            NodeKind::Paragraph
            | NodeKind::Heading(_)
            | NodeKind::BlockQuote(_)
            | NodeKind::CodeBlock { .. }
            | NodeKind::HtmlBlock(_)
            | NodeKind::List { .. }
            | NodeKind::Item
            | NodeKind::Rule
            | NodeKind::Table(_)
            | NodeKind::TableHead
            | NodeKind::TableRow
            | NodeKind::TableCell
            | NodeKind::DefinitionList
            | NodeKind::DefinitionTitle
            | NodeKind::DefinitionDetails => true,
            NodeKind::Custom(_) => self.children.iter().any(Node::is_block),
            _ => false,
        }
    }

    /// Flatten the node's textual content.
    ///
    /// Breaks become newlines; markup and HTML are left out.
    #[must_use]
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match &self.kind {
            NodeKind::Text(text) | NodeKind::Code(text) => out.push_str(text),
            NodeKind::CodeBlock { literal, .. } => out.push_str(literal),
            NodeKind::SoftBreak | NodeKind::HardBreak => out.push('\n'),
            _ => {
                for child in &self.children {
                    child.collect_text(out);
                }
            }
        }
    }

    /// Inline content written back as markdown.
    ///
    /// Used where the literal source matters more than its formatting, such as
    /// a URL the base grammar read as emphasis. The grammar does not record
    /// which marker was used, so emphasis always comes back as `*`.
    #[must_use]
    pub fn inline_source(&self) -> String {
        let mut out = String::new();
        self.collect_source(&mut out);
        out
    }

    fn collect_source(&self, out: &mut String) {
        let wrap = |out: &mut String, marker: &str, node: &Self| {
            out.push_str(marker);
            node.children.iter().for_each(|child| child.collect_source(out));
            out.push_str(marker);
        };
        match &self.kind {
            NodeKind::Text(text) | NodeKind::InlineHtml(text) => out.push_str(text),
            NodeKind::Code(code) => {
                let fence = if code.contains('`') { "``" } else { "`" };
                out.push_str(fence);
                out.push_str(code);
                out.push_str(fence);
            }
            NodeKind::Emphasis => wrap(out, "*", self),
            NodeKind::Strong => wrap(out, "**", self),
            NodeKind::Strikethrough => wrap(out, "~~", self),
            NodeKind::Superscript => wrap(out, "^", self),
            NodeKind::Subscript => wrap(out, "~", self),
            NodeKind::Link { destination, .. } | NodeKind::Image { destination, .. } => {
                if matches!(self.kind, NodeKind::Image { .. }) {
                    out.push('!');
                }
                out.push('[');
                self.children.iter().for_each(|child| child.collect_source(out));
                out.push_str("](");
                out.push_str(destination);
                out.push(')');
            }
            NodeKind::Custom(custom) => {
                out.push_str(&custom.opening_delimiter);
                self.children.iter().for_each(|child| child.collect_source(out));
                out.push_str(&custom.closing_delimiter);
            }
            NodeKind::SoftBreak | NodeKind::HardBreak => out.push('\n'),
            NodeKind::CodeBlock { literal, .. } => out.push_str(literal),
            _ => self.children.iter().for_each(|child| child.collect_source(out)),
        }
    }

    /// Iterate over this node and all its descendants, depth-first, pre-order.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }
}

/// Pre-order iterator over a subtree. See [`Node::descendants`].
pub struct Descendants<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// Parsed document: an ordered list of top-level blocks.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Document {
    blocks: Vec<Node>,
}

impl Document {
    #[must_use]
    pub fn new(blocks: Vec<Node>) -> Self {
        Self { blocks }
    }

    /// Top-level blocks.
    #[must_use]
    pub fn blocks(&self) -> &[Node] {
        &self.blocks
    }

    /// Iterate over every node of the document, depth-first, pre-order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.blocks.iter().flat_map(Node::descendants)
    }

    /// Iterate over custom nodes together with the nodes that own them.
    pub fn custom_nodes(&self) -> impl Iterator<Item = (&CustomNode, &Node)> {
        self.nodes()
            .filter_map(|node| node.as_custom().map(|custom| (custom, node)))
    }

    /// Flatten the document's textual content, one block per line.
    #[must_use]
    pub fn text_content(&self) -> String {
        self.blocks
            .iter()
            .map(Node::text_content)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
