//! Plain text writer.

use std::sync::Arc;

use super::RendererTable;
use super::flat::FlatBuffer;
use crate::error::RenderError;
use crate::node::{Node, NodeKind};

/// Writer for the plain text target.
///
/// Formatting is dropped; block structure survives as line breaks and list
/// markers.
pub struct TextWriter {
    buffer: FlatBuffer,
    renderers: Arc<RendererTable>,
}

impl TextWriter {
    pub(crate) fn new(renderers: Arc<RendererTable>) -> Self {
        Self {
            buffer: FlatBuffer::default(),
            renderers,
        }
    }

    /// Append text.
    pub fn push_str(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    /// Separate upcoming block content from what was written before.
    pub fn ensure_block(&mut self) {
        self.buffer.ensure_block();
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
    /// plain text renderer.
    pub fn render_node(&mut self, node: &Node) -> Result<(), RenderError> {
        match &node.kind {
            NodeKind::Paragraph | NodeKind::Heading(_) | NodeKind::BlockQuote(_) => {
                self.buffer.ensure_block();
                self.render_nodes(&node.children)?;
            }
            NodeKind::CodeBlock { literal, .. } => {
                self.buffer.ensure_block();
                self.buffer.push_str(literal.trim_end_matches('\n'));
            }
            NodeKind::HtmlBlock(html) => {
                self.buffer.ensure_block();
                self.buffer.push_str(html.trim_end_matches('\n'));
            }
            NodeKind::InlineHtml(html) => self.buffer.push_str(html),
            NodeKind::List { start } => {
                self.buffer.start_list(*start);
                self.render_nodes(&node.children)?;
                self.buffer.end_list();
            }
            NodeKind::Item => {
                let number = self.buffer.start_item();
                let indent = "  ".repeat(self.buffer.list_depth().saturating_sub(1));
                self.buffer.push_str(&indent);
                match number {
                    Some(n) => self.buffer.push_str(&format!("{n}. ")),
                    None => self.buffer.push_str("- "),
                }
                self.buffer.mark_item_start();
                self.render_nodes(&node.children)?;
            }
            NodeKind::TaskMarker(checked) => {
                self.buffer.push_str(if *checked { "[x] " } else { "[ ] " });
            }
            NodeKind::Rule => {
                self.buffer.ensure_block();
                self.buffer.push_str("---");
            }
            NodeKind::Table(_) | NodeKind::DefinitionList => {
                self.buffer.ensure_block();
                self.render_nodes(&node.children)?;
            }
            NodeKind::TableHead | NodeKind::TableRow => {
                self.buffer.ensure_line();
                for (index, cell) in node.children.iter().enumerate() {
                    if index > 0 {
                        self.buffer.push_str(" | ");
                    }
                    self.render_nodes(&cell.children)?;
                }
            }
            NodeKind::DefinitionTitle | NodeKind::DefinitionDetails => {
                self.buffer.ensure_line();
                self.render_nodes(&node.children)?;
            }
            NodeKind::Text(text) | NodeKind::Code(text) => self.buffer.push_str(text),
            NodeKind::TableCell
            | NodeKind::Emphasis
            | NodeKind::Strong
            | NodeKind::Strikethrough
            | NodeKind::Superscript
            | NodeKind::Subscript
            | NodeKind::Link { .. }
            | NodeKind::Image { .. } => self.render_nodes(&node.children)?,
            NodeKind::SoftBreak | NodeKind::HardBreak => self.buffer.push_str("\n"),
            NodeKind::Custom(custom) => {
                let renderer = self.renderers.plain_text(custom.kind)?;
                renderer.render(custom, &node.children, self)?;
            }
        }
        Ok(())
    }

    pub(crate) fn finish(self) -> String {
        self.buffer.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn render(nodes: &[Node]) -> String {
        let mut writer = TextWriter::new(Arc::new(RendererTable::default()));
        writer.render_nodes(nodes).unwrap();
        writer.finish()
    }

    fn paragraph(text: &str) -> Node {
        Node::with_children(NodeKind::Paragraph, vec![Node::text(text)])
    }

    fn item(children: Vec<Node>) -> Node {
        Node::with_children(NodeKind::Item, children)
    }

    #[test]
    fn test_formatting_is_dropped() {
        let nodes = [Node::with_children(
            NodeKind::Paragraph,
            vec![
                Node::text("a "),
                Node::with_children(NodeKind::Strong, vec![Node::text("b")]),
                Node::leaf(NodeKind::Code(" c".to_owned())),
            ],
        )];
        assert_eq!(render(&nodes), "a b c");
    }

    #[test]
    fn test_paragraphs_separated() {
        assert_eq!(render(&[paragraph("one"), paragraph("two")]), "one\n\ntwo");
    }

    #[test]
    fn test_ordered_list() {
        let nodes = [Node::with_children(
            NodeKind::List { start: Some(1) },
            vec![item(vec![Node::text("a")]), item(vec![Node::text("b")])],
        )];
        assert_eq!(render(&nodes), "1. a\n2. b");
    }

    #[test]
    fn test_loose_nested_list() {
        let inner = Node::with_children(
            NodeKind::List { start: None },
            vec![item(vec![paragraph("inner")])],
        );
        let nodes = [
            paragraph("intro"),
            Node::with_children(
                NodeKind::List { start: None },
                vec![item(vec![paragraph("outer"), inner])],
            ),
        ];
        assert_eq!(render(&nodes), "intro\n\n- outer\n  - inner");
    }

    #[test]
    fn test_task_marker() {
        let nodes = [Node::with_children(
            NodeKind::List { start: None },
            vec![item(vec![
                Node::leaf(NodeKind::TaskMarker(true)),
                Node::text("done"),
            ])],
        )];
        assert_eq!(render(&nodes), "- [x] done");
    }
}
