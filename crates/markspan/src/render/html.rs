//! HTML writer.
//!
//! Produces semantic HTML5 fragments.

use std::fmt::Write;
use std::sync::Arc;

use pulldown_cmark::Alignment;

use super::RendererTable;
use crate::error::RenderError;
use crate::node::{AlertKind, Node, NodeKind};

/// Escape text for use in HTML content and attribute values.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn alignment_style(alignment: Alignment) -> &'static str {
    match alignment {
        Alignment::None => "",
        Alignment::Left => r#" style="text-align: left""#,
        Alignment::Center => r#" style="text-align: center""#,
        Alignment::Right => r#" style="text-align: right""#,
    }
}

/// Writer for the HTML target.
pub struct HtmlWriter {
    output: String,
    renderers: Arc<RendererTable>,
}

impl HtmlWriter {
    pub(crate) fn new(renderers: Arc<RendererTable>) -> Self {
        Self {
            output: String::new(),
            renderers,
        }
    }

    /// Append raw HTML.
    pub fn push_str(&mut self, html: &str) {
        self.output.push_str(html);
    }

    /// Append text, escaping it.
    pub fn push_escaped(&mut self, text: &str) {
        self.output.push_str(&escape_html(text));
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
    /// HTML renderer.
    pub fn render_node(&mut self, node: &Node) -> Result<(), RenderError> {
        match &node.kind {
            NodeKind::Paragraph => self.wrap("p", &node.children)?,
            NodeKind::Heading(level) => {
                write!(self.output, "<h{level}>").unwrap();
                self.render_nodes(&node.children)?;
                write!(self.output, "</h{level}>").unwrap();
            }
            NodeKind::BlockQuote(None) => self.wrap("blockquote", &node.children)?,
            NodeKind::BlockQuote(Some(kind)) => {
                self.alert_start(*kind);
                self.render_nodes(&node.children)?;
                self.output.push_str("</div></div>");
            }
            NodeKind::CodeBlock { language, literal } => {
                self.code_block(language.as_deref(), literal);
            }
            NodeKind::HtmlBlock(html) | NodeKind::InlineHtml(html) => self.output.push_str(html),
            NodeKind::List { start } => {
                match start {
                    None => self.output.push_str("<ul>"),
                    Some(1) => self.output.push_str("<ol>"),
                    Some(n) => write!(self.output, r#"<ol start="{n}">"#).unwrap(),
                }
                self.render_nodes(&node.children)?;
                self.output
                    .push_str(if start.is_some() { "</ol>" } else { "</ul>" });
            }
            NodeKind::Item => self.wrap("li", &node.children)?,
            NodeKind::TaskMarker(checked) => {
                self.output.push_str(if *checked {
                    r#"<input type="checkbox" checked disabled> "#
                } else {
                    r#"<input type="checkbox" disabled> "#
                });
            }
            NodeKind::Rule => self.output.push_str("<hr>"),
            NodeKind::Table(alignments) => self.table(alignments, &node.children)?,
            NodeKind::TableHead => {
                self.output.push_str("<thead><tr>");
                self.render_nodes(&node.children)?;
                self.output.push_str("</tr></thead>");
            }
            NodeKind::TableRow => self.wrap("tr", &node.children)?,
            NodeKind::TableCell => self.wrap("td", &node.children)?,
            NodeKind::DefinitionList => self.wrap("dl", &node.children)?,
            NodeKind::DefinitionTitle => self.wrap("dt", &node.children)?,
            NodeKind::DefinitionDetails => self.wrap("dd", &node.children)?,
            NodeKind::Text(text) => self.push_escaped(text),
            NodeKind::Code(code) => {
                write!(self.output, "<code>{}</code>", escape_html(code)).unwrap();
            }
            NodeKind::Emphasis => self.wrap("em", &node.children)?,
            NodeKind::Strong => self.wrap("strong", &node.children)?,
            NodeKind::Strikethrough => self.wrap("s", &node.children)?,
            NodeKind::Superscript => self.wrap("sup", &node.children)?,
            NodeKind::Subscript => self.wrap("sub", &node.children)?,
            NodeKind::Link { destination, title } => {
                write!(self.output, r#"<a href="{}""#, escape_html(destination)).unwrap();
                if !title.is_empty() {
                    write!(self.output, r#" title="{}""#, escape_html(title)).unwrap();
                }
                self.output.push('>');
                self.render_nodes(&node.children)?;
                self.output.push_str("</a>");
            }
            NodeKind::Image { destination, title } => {
                self.image(destination, &node.text_content(), title);
            }
            NodeKind::SoftBreak => self.output.push('\n'),
            NodeKind::HardBreak => self.output.push_str("<br>"),
            NodeKind::Custom(custom) => {
                let renderer = self.renderers.html(custom.kind)?;
                renderer.render(custom, &node.children, self)?;
            }
        }
        Ok(())
    }

    pub(crate) fn finish(self) -> String {
        self.output
    }

    fn wrap(&mut self, tag: &str, children: &[Node]) -> Result<(), RenderError> {
        write!(self.output, "<{tag}>").unwrap();
        self.render_nodes(children)?;
        write!(self.output, "</{tag}>").unwrap();
        Ok(())
    }

    fn code_block(&mut self, language: Option<&str>, literal: &str) {
        if let Some(language) = language {
            write!(
                self.output,
                r#"<pre><code class="language-{}">{}</code></pre>"#,
                escape_html(language),
                escape_html(literal)
            )
            .unwrap();
        } else {
            write!(self.output, "<pre><code>{}</code></pre>", escape_html(literal)).unwrap();
        }
    }

    fn alert_start(&mut self, kind: AlertKind) {
        let (class, title) = match kind {
            AlertKind::Note => ("note", "Note"),
            AlertKind::Tip => ("tip", "Tip"),
            AlertKind::Important => ("important", "Important"),
            AlertKind::Warning => ("warning", "Warning"),
            AlertKind::Caution => ("caution", "Caution"),
        };
        write!(
            self.output,
            r#"<div class="alert alert-{class}"><div class="alert-title">{title}</div><div class="alert-content">"#
        )
        .unwrap();
    }

    fn image(&mut self, src: &str, alt: &str, title: &str) {
        let title_attr = if title.is_empty() {
            String::new()
        } else {
            format!(r#" title="{}""#, escape_html(title))
        };
        write!(
            self.output,
            r#"<img src="{}"{title_attr} alt="{}">"#,
            escape_html(src),
            escape_html(alt)
        )
        .unwrap();
    }

    fn table(&mut self, alignments: &[Alignment], rows: &[Node]) -> Result<(), RenderError> {
        self.output.push_str("<table>");
        let mut body_open = false;
        for row in rows {
            let in_head = row.kind == NodeKind::TableHead;
            if in_head {
                self.output.push_str("<thead><tr>");
            } else {
                if !body_open {
                    self.output.push_str("<tbody>");
                    body_open = true;
                }
                self.output.push_str("<tr>");
            }

            let tag = if in_head { "th" } else { "td" };
            for (index, cell) in row.children.iter().enumerate() {
                let align = alignments
                    .get(index)
                    .copied()
                    .map_or("", alignment_style);
                write!(self.output, "<{tag}{align}>").unwrap();
                self.render_nodes(&cell.children)?;
                write!(self.output, "</{tag}>").unwrap();
            }

            self.output
                .push_str(if in_head { "</tr></thead>" } else { "</tr>" });
        }
        if body_open {
            self.output.push_str("</tbody>");
        }
        self.output.push_str("</table>");
        Ok(())
    }
}
