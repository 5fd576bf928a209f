//! Builds the owned node tree from pulldown-cmark events.
//!
//! Besides mirroring the base grammar, the builder lifts pseudo-tag pairs
//! emitted by text plugins into custom nodes:
//!
//! - an inline `<tag>...</tag>` pair within one sibling list becomes a custom
//!   node wrapping the siblings between the tags;
//! - an HTML block that starts with the opening tag becomes a custom node over
//!   the content up to the matching closing tag, parsed again as markdown;
//! - a pair whose content spans a blank line would be torn apart by block
//!   parsing, so the source is split around it before parsing and each part is
//!   parsed on its own.
//!
//! A paragraph holding nothing but a lifted node is hoisted so the custom node
//! wraps the paragraph instead. A fenced code block opened with a pseudo-tag's
//! fence character and never closed is an unterminated marker of that syntax,
//! so it is parsed again as text.

use std::mem;
use std::ops::Range;

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag};

use crate::node::{AlertKind, CustomNode, Node, NodeKind};
use crate::plugin::PseudoTag;

struct Frame {
    kind: FrameKind,
    children: Vec<Node>,
}

enum FrameKind {
    Node(NodeKind),
    CodeBlock {
        language: Option<String>,
        literal: String,
    },
    HtmlBlock(String),
    /// Unclosed fence, escaped and parsed again when the block ends.
    Literal(String),
    /// Content is spliced into the parent.
    Transparent,
}

/// Pseudo-tag pair located in raw source.
struct SourcePair<'t> {
    tag: &'t PseudoTag,
    open: Range<usize>,
    close: Range<usize>,
}

pub(crate) struct TreeBuilder<'a> {
    options: Options,
    pseudo_tags: &'a [&'a PseudoTag],
    stack: Vec<Frame>,
    root: Vec<Node>,
}

impl<'a> TreeBuilder<'a> {
    pub(crate) fn new(options: Options, pseudo_tags: &'a [&'a PseudoTag]) -> Self {
        Self {
            options,
            pseudo_tags,
            stack: Vec::new(),
            root: Vec::new(),
        }
    }

    /// Parse `source` into top-level blocks.
    pub(crate) fn parse(self, source: &str) -> Vec<Node> {
        if let Some(pair) = self.find_spanning_pair(source) {
            return self.parse_around(source, &pair);
        }
        let parser = Parser::new_ext(source, self.options).into_offset_iter();
        self.build(source, parser)
    }

    fn nested(&self) -> TreeBuilder<'a> {
        TreeBuilder::new(self.options, self.pseudo_tags)
    }

    /// First pseudo-tag pair outside code whose content holds a blank line.
    fn find_spanning_pair(&self, source: &str) -> Option<SourcePair<'a>> {
        if self.pseudo_tags.is_empty() {
            return None;
        }
        let lower = source.to_ascii_lowercase();
        let mut code: Option<Vec<Range<usize>>> = None;
        for &tag in self.pseudo_tags {
            let open = tag.open.to_ascii_lowercase();
            let close = tag.close.to_ascii_lowercase();
            let mut from = 0;
            while let Some(offset) = lower[from..].find(&open) {
                let start = from + offset;
                let content = start + open.len();
                let Some(end) = matching_close(&lower, content, &open, &close) else {
                    break;
                };
                if has_blank_line(&source[content..end]) {
                    let code = code.get_or_insert_with(|| code_ranges(source, self.options));
                    if !code.iter().any(|range| range.contains(&start)) {
                        return Some(SourcePair {
                            tag,
                            open: start..content,
                            close: end..end + close.len(),
                        });
                    }
                }
                from = content;
            }
        }
        None
    }

    /// Parse the text before, inside and after `pair` separately.
    fn parse_around(&self, source: &str, pair: &SourcePair<'_>) -> Vec<Node> {
        let mut blocks = self.nested().parse(&source[..pair.open.start]);
        let inner = self.nested().parse(&source[pair.open.end..pair.close.start]);
        blocks.push(Node::custom(
            CustomNode::new(pair.tag.kind, &*pair.tag.open, &*pair.tag.close),
            inner,
        ));
        blocks.extend(self.nested().parse(&source[pair.close.end..]));
        blocks
    }

    fn build<'e>(
        mut self,
        source: &str,
        events: impl Iterator<Item = (Event<'e>, Range<usize>)>,
    ) -> Vec<Node> {
        for (event, range) in events {
            self.event(event, source, range);
        }
        while let Some(frame) = self.stack.pop() {
            self.finish(frame);
        }
        let root = mem::take(&mut self.root);
        lift_inline(root, self.pseudo_tags)
    }

    fn event(&mut self, event: Event<'_>, source: &str, range: Range<usize>) {
        match event {
            Event::Start(tag) => self.start(tag, source, range),
            Event::End(_) => {
                if let Some(frame) = self.stack.pop() {
                    self.finish(frame);
                }
            }
            Event::Text(text) => self.text(&text),
            Event::Code(code) => self.push(Node::leaf(NodeKind::Code(code.into_string()))),
            Event::Html(html) => {
                if let Some(FrameKind::HtmlBlock(buffer)) = self.current_kind() {
                    buffer.push_str(&html);
                } else {
                    self.push(Node::leaf(NodeKind::HtmlBlock(html.into_string())));
                }
            }
            Event::InlineHtml(html) => {
                self.push(Node::leaf(NodeKind::InlineHtml(html.into_string())));
            }
            // Not rendered natively; kept as their source text.
            Event::InlineMath(math) => self.text(&format!("${math}$")),
            Event::DisplayMath(math) => self.text(&format!("$${math}$$")),
            Event::FootnoteReference(label) => self.text(&format!("[^{label}]")),
            Event::SoftBreak => self.push(Node::leaf(NodeKind::SoftBreak)),
            Event::HardBreak => self.push(Node::leaf(NodeKind::HardBreak)),
            Event::Rule => self.push(Node::leaf(NodeKind::Rule)),
            Event::TaskListMarker(checked) => self.push(Node::leaf(NodeKind::TaskMarker(checked))),
        }
    }

    fn start(&mut self, tag: Tag<'_>, source: &str, range: Range<usize>) {
        let kind = match tag {
            Tag::CodeBlock(CodeBlockKind::Fenced(_)) if self.is_unclosed_fence(source, &range) => {
                FrameKind::Literal(escape_fence(&source[range]))
            }
            Tag::Paragraph => FrameKind::Node(NodeKind::Paragraph),
            Tag::Heading { level, .. } => FrameKind::Node(NodeKind::Heading(heading_level(level))),
            Tag::BlockQuote(kind) => FrameKind::Node(NodeKind::BlockQuote(kind.map(AlertKind::from))),
            Tag::CodeBlock(kind) => FrameKind::CodeBlock {
                language: match kind {
                    CodeBlockKind::Fenced(info) => info.split_whitespace().next().map(str::to_owned),
                    CodeBlockKind::Indented => None,
                },
                literal: String::new(),
            },
            Tag::HtmlBlock => FrameKind::HtmlBlock(String::new()),
            Tag::List(start) => FrameKind::Node(NodeKind::List { start }),
            Tag::Item => FrameKind::Node(NodeKind::Item),
            Tag::FootnoteDefinition(_) | Tag::MetadataBlock(_) => FrameKind::Transparent,
            Tag::DefinitionList => FrameKind::Node(NodeKind::DefinitionList),
            Tag::DefinitionListTitle => FrameKind::Node(NodeKind::DefinitionTitle),
            Tag::DefinitionListDefinition => FrameKind::Node(NodeKind::DefinitionDetails),
            Tag::Table(alignments) => FrameKind::Node(NodeKind::Table(alignments)),
            Tag::TableHead => FrameKind::Node(NodeKind::TableHead),
            Tag::TableRow => FrameKind::Node(NodeKind::TableRow),
            Tag::TableCell => FrameKind::Node(NodeKind::TableCell),
            Tag::Emphasis => FrameKind::Node(NodeKind::Emphasis),
            Tag::Strong => FrameKind::Node(NodeKind::Strong),
            Tag::Strikethrough => FrameKind::Node(NodeKind::Strikethrough),
            Tag::Superscript => FrameKind::Node(NodeKind::Superscript),
            Tag::Subscript => FrameKind::Node(NodeKind::Subscript),
            Tag::Link {
                dest_url, title, ..
            } => FrameKind::Node(NodeKind::Link {
                destination: dest_url.into_string(),
                title: title.into_string(),
            }),
            Tag::Image {
                dest_url, title, ..
            } => FrameKind::Node(NodeKind::Image {
                destination: dest_url.into_string(),
                title: title.into_string(),
            }),
        };
        self.stack.push(Frame {
            kind,
            children: Vec::new(),
        });
    }

    fn finish(&mut self, frame: Frame) {
        let children = lift_inline(frame.children, self.pseudo_tags);
        match frame.kind {
            FrameKind::Node(kind) => self.push(Node::with_children(kind, children)),
            FrameKind::CodeBlock { language, literal } => {
                self.push(Node::leaf(NodeKind::CodeBlock { language, literal }));
            }
            FrameKind::HtmlBlock(html) => {
                for node in self.lift_block(html) {
                    self.push(node);
                }
            }
            FrameKind::Literal(source) => {
                for node in self.nested().parse(&source) {
                    self.push(node);
                }
            }
            FrameKind::Transparent => {
                for child in children {
                    self.push(child);
                }
            }
        }
    }

    fn current_kind(&mut self) -> Option<&mut FrameKind> {
        self.stack.last_mut().map(|frame| &mut frame.kind)
    }

    fn text(&mut self, text: &str) {
        match self.current_kind() {
            Some(FrameKind::CodeBlock { literal, .. }) => literal.push_str(text),
            Some(FrameKind::HtmlBlock(buffer)) => buffer.push_str(text),
            Some(FrameKind::Literal(_)) => {}
            _ => self.push(Node::text(text)),
        }
    }

    fn push(&mut self, node: Node) {
        match self.stack.last_mut() {
            Some(frame) => frame.children.push(node),
            None => self.root.push(node),
        }
    }

    /// Turn a pseudo-tag HTML block into a custom node over its parsed content.
    ///
    /// Text after the closing tag is parsed as markdown of its own.
    fn lift_block(&self, html: String) -> Vec<Node> {
        let trimmed = html.trim_start();
        let lower = trimmed.to_ascii_lowercase();
        for &tag in self.pseudo_tags {
            let open = tag.open.to_ascii_lowercase();
            if !lower.starts_with(&open) {
                continue;
            }
            let close = tag.close.to_ascii_lowercase();
            let Some(end) = matching_close(&lower, open.len(), &open, &close) else {
                continue;
            };
            let inner = self.nested().parse(&trimmed[open.len()..end]);
            let mut nodes = vec![Node::custom(
                CustomNode::new(tag.kind, &*tag.open, &*tag.close),
                inner,
            )];
            let rest = &trimmed[end + close.len()..];
            if !rest.trim().is_empty() {
                nodes.extend(self.nested().parse(rest));
            }
            return nodes;
        }
        vec![Node::leaf(NodeKind::HtmlBlock(html))]
    }

    /// Whether the fenced block at `range` uses a pseudo-tag fence and has no
    /// closing fence.
    fn is_unclosed_fence(&self, source: &str, range: &Range<usize>) -> bool {
        let Some(block) = source.get(range.clone()) else {
            return false;
        };
        let opening = block.trim_start();
        let Some(fence) = opening.chars().next() else {
            return false;
        };
        if !self.pseudo_tags.iter().any(|tag| tag.fence == Some(fence)) {
            return false;
        }
        let width = opening.chars().take_while(|&c| c == fence).count();
        let closed = block.trim_end().lines().skip(1).last().is_some_and(|line| {
            let line = line.trim();
            line.len() >= width && line.chars().all(|c| c == fence)
        });
        !closed
    }
}

/// Backslash-escape the opening fence so the block reads as text.
fn escape_fence(block: &str) -> String {
    let indent = block.len() - block.trim_start().len();
    let mut escaped = String::with_capacity(block.len() + 1);
    escaped.push_str(&block[..indent]);
    escaped.push('\\');
    escaped.push_str(&block[indent..]);
    escaped
}

/// Byte offset of the `close` matching an already opened `open`, scanning
/// `lower` from `from`. Both tags must be lowercase.
fn matching_close(lower: &str, from: usize, open: &str, close: &str) -> Option<usize> {
    let mut depth = 1usize;
    let mut position = from;
    loop {
        let next_close = position + lower[position..].find(close)?;
        match lower[position..].find(open).map(|offset| position + offset) {
            Some(next_open) if next_open < next_close => {
                depth += 1;
                position = next_open + open.len();
            }
            _ => {
                depth -= 1;
                if depth == 0 {
                    return Some(next_close);
                }
                position = next_close + close.len();
            }
        }
    }
}

/// Whether some line strictly inside `text` is blank.
fn has_blank_line(text: &str) -> bool {
    let lines: Vec<&str> = text.split('\n').collect();
    lines.len() > 2 && lines[1..lines.len() - 1].iter().any(|line| line.trim().is_empty())
}

/// Source ranges of code blocks and code spans.
fn code_ranges(source: &str, options: Options) -> Vec<Range<usize>> {
    Parser::new_ext(source, options)
        .into_offset_iter()
        .filter_map(|(event, range)| match event {
            Event::Start(Tag::CodeBlock(_)) | Event::Code(_) => Some(range),
            _ => None,
        })
        .collect()
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn matches_tag(html: &str, tag: &str) -> bool {
    html.trim().eq_ignore_ascii_case(tag)
}

/// Lift inline pseudo-tag pairs of one sibling list, then hoist paragraphs.
fn lift_inline(nodes: Vec<Node>, tags: &[&PseudoTag]) -> Vec<Node> {
    let has_inline_html = nodes
        .iter()
        .any(|node| matches!(node.kind, NodeKind::InlineHtml(_)));
    if tags.is_empty() || !has_inline_html {
        return hoist_paragraphs(nodes);
    }

    let mut out: Vec<Node> = Vec::with_capacity(nodes.len());
    // (index into `out`, index into `tags`)
    let mut open: Vec<(usize, usize)> = Vec::new();

    for node in nodes {
        if let NodeKind::InlineHtml(html) = &node.kind {
            if let Some(index) = tags.iter().position(|tag| matches_tag(html, &tag.open)) {
                open.push((out.len(), index));
                out.push(node);
                continue;
            }
            let closer = open
                .iter()
                .rposition(|&(_, index)| matches_tag(html, &tags[index].close));
            if let Some(stack_index) = closer {
                let (start, index) = open[stack_index];
                open.truncate(stack_index);
                let children = trim_breaks(out.drain(start..).skip(1).collect());
                let tag = tags[index];
                out.push(Node::custom(
                    CustomNode::new(tag.kind, &*tag.open, &*tag.close),
                    children,
                ));
                continue;
            }
        }
        out.push(node);
    }

    hoist_paragraphs(out)
}

fn trim_breaks(mut nodes: Vec<Node>) -> Vec<Node> {
    let is_break = |node: &Node| matches!(node.kind, NodeKind::SoftBreak | NodeKind::HardBreak);
    while nodes.last().is_some_and(is_break) {
        nodes.pop();
    }
    let leading = nodes.iter().take_while(|node| is_break(*node)).count();
    nodes.drain(..leading);
    nodes
}

/// `Paragraph[Custom[..]]` becomes `Custom[Paragraph[..]]`.
fn hoist_paragraphs(nodes: Vec<Node>) -> Vec<Node> {
    nodes
        .into_iter()
        .map(|mut node| {
            let lone_custom = node.kind == NodeKind::Paragraph
                && node.children.len() == 1
                && node.children[0].as_custom().is_some();
            if !lone_custom {
                return node;
            }
            let Some(mut custom) = node.children.pop() else {
                return node;
            };
            let inner = mem::take(&mut custom.children);
            custom.children = vec![Node::with_children(NodeKind::Paragraph, inner)];
            custom
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::CustomKind;
    use pretty_assertions::assert_eq;

    fn center_tag() -> PseudoTag {
        PseudoTag::new("<align center>", "</align>", CustomKind::Center).with_fence('~')
    }

    fn parse(source: &str) -> Vec<Node> {
        let tag = center_tag();
        let tags = [&tag];
        TreeBuilder::new(Options::ENABLE_TABLES | Options::ENABLE_TASKLISTS, &tags).parse(source)
    }

    fn paragraph(children: Vec<Node>) -> Node {
        Node::with_children(NodeKind::Paragraph, children)
    }

    fn center(children: Vec<Node>) -> Node {
        Node::custom(
            CustomNode::new(CustomKind::Center, "<align center>", "</align>"),
            children,
        )
    }

    #[test]
    fn test_paragraph_and_heading() {
        assert_eq!(
            parse("# Title\n\nSome *text*"),
            vec![
                Node::with_children(NodeKind::Heading(1), vec![Node::text("Title")]),
                paragraph(vec![
                    Node::text("Some "),
                    Node::with_children(NodeKind::Emphasis, vec![Node::text("text")]),
                ]),
            ]
        );
    }

    #[test]
    fn test_fenced_code_block() {
        assert_eq!(
            parse("```rust title=x\nfn main() {}\n```"),
            vec![Node::leaf(NodeKind::CodeBlock {
                language: Some("rust".to_owned()),
                literal: "fn main() {}\n".to_owned(),
            })]
        );
    }

    #[test]
    fn test_inline_pseudo_tag_is_hoisted() {
        assert_eq!(
            parse("<align center>hello</align>"),
            vec![center(vec![paragraph(vec![Node::text("hello")])])]
        );
    }

    #[test]
    fn test_inline_pseudo_tag_within_text() {
        assert_eq!(
            parse("a <align center>b</align> c"),
            vec![paragraph(vec![
                Node::text("a "),
                center(vec![Node::text("b")]),
                Node::text(" c"),
            ])]
        );
    }

    #[test]
    fn test_block_pseudo_tag_parses_content() {
        assert_eq!(
            parse("<align center>\nline *one*\n</align>"),
            vec![center(vec![paragraph(vec![
                Node::text("line "),
                Node::with_children(NodeKind::Emphasis, vec![Node::text("one")]),
            ])])]
        );
    }

    #[test]
    fn test_unpaired_open_tag_stays_html() {
        assert_eq!(
            parse("x <align center> y"),
            vec![paragraph(vec![
                Node::text("x "),
                Node::leaf(NodeKind::InlineHtml("<align center>".to_owned())),
                Node::text(" y"),
            ])]
        );
    }

    #[test]
    fn test_other_html_block_untouched() {
        assert_eq!(
            parse("<div>\nx\n</div>\n"),
            vec![Node::leaf(NodeKind::HtmlBlock("<div>\nx\n</div>\n".to_owned()))]
        );
    }

    #[test]
    fn test_task_list() {
        let blocks = parse("- [x] done");
        let item = &blocks[0].children[0];
        assert_eq!(item.children[0], Node::leaf(NodeKind::TaskMarker(true)));
    }

    #[test]
    fn test_block_pseudo_tag_followed_by_text() {
        assert_eq!(
            parse("<align center>
x
</align>
after"),
            vec![
                center(vec![paragraph(vec![Node::text("x")])]),
                paragraph(vec![Node::text("after")]),
            ]
        );
    }

    #[test]
    fn test_pair_across_blank_line() {
        assert_eq!(
            parse("<align center>
para one

para two
</align>"),
            vec![center(vec![
                paragraph(vec![Node::text("para one")]),
                paragraph(vec![Node::text("para two")]),
            ])]
        );
    }

    #[test]
    fn test_pair_across_blank_line_mid_paragraph() {
        assert_eq!(
            parse("text <align center>a\n\nb</align> tail"),
            vec![
                paragraph(vec![Node::text("text")]),
                center(vec![
                    paragraph(vec![Node::text("a")]),
                    paragraph(vec![Node::text("b")]),
                ]),
                paragraph(vec![Node::text("tail")]),
            ]
        );
    }

    #[test]
    fn test_pair_inside_code_is_not_split() {
        let source = "```\n<align center>\na\n\nb\n</align>\n```";
        assert_eq!(
            parse(source),
            vec![Node::leaf(NodeKind::CodeBlock {
                language: None,
                literal: "<align center>\na\n\nb\n</align>\n".to_owned(),
            })]
        );
    }

    #[test]
    fn test_unclosed_fence_is_text() {
        let blocks = parse("~~~unterminated");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].kind, NodeKind::Paragraph);
        assert_eq!(blocks[0].text_content(), "~~~unterminated");
    }

    #[test]
    fn test_closed_fence_stays_code() {
        assert_eq!(
            parse("~~~\ncode\n~~~"),
            vec![Node::leaf(NodeKind::CodeBlock {
                language: None,
                literal: "code\n".to_owned(),
            })]
        );
    }

    #[test]
    fn test_unclosed_backtick_fence_stays_code() {
        assert_eq!(
            parse("```text\nbody\n"),
            vec![Node::leaf(NodeKind::CodeBlock {
                language: Some("text".to_owned()),
                literal: "body\n".to_owned(),
            })]
        );
    }

    #[test]
    fn test_matching_close_skips_nested_pairs() {
        let text = "<a>x<a>y</a>z</a>";
        assert_eq!(matching_close(text, 3, "<a>", "</a>"), Some(13));
        assert_eq!(matching_close("<a>x", 3, "<a>", "</a>"), None);
    }

    #[test]
    fn test_has_blank_line() {
        assert!(has_blank_line("a\n\nb"));
        assert!(has_blank_line("\na\n  \nb\n"));
        assert!(!has_blank_line("\na\nb\n"));
        assert!(!has_blank_line("a\n"));
    }

    #[test]
    fn test_trim_breaks() {
        let nodes = vec![
            Node::leaf(NodeKind::SoftBreak),
            Node::text("x"),
            Node::leaf(NodeKind::SoftBreak),
        ];
        assert_eq!(trim_breaks(nodes), vec![Node::text("x")]);
    }
}
