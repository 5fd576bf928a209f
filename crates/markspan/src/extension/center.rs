//! `~~~content~~~` centers its content.
//!
//! The syntax clashes with fenced code blocks, so it is rewritten before
//! parsing into a `<markspan-align center>` pseudo-tag that the tree builder
//! lifts into a [`CustomKind::Center`] node. The element name is private to
//! the rewrite: handwritten `<align center>` stays plain HTML. A `~~~` left
//! without a partner stays literal text, even at the start of a line.

use std::sync::LazyLock;

use super::Extension;
use crate::error::RenderError;
use crate::node::{CustomKind, CustomNode, Node};
use crate::plugin::{PseudoTag, RegexPlugin, RegexRule};
use crate::render::{HtmlWriter, NodeRenderer, RichTextWriter, Style, TextWriter};

/// Opening pseudo-tag emitted by the rewrite.
const OPEN_TAG: &str = "<markspan-align center>";

/// Closing pseudo-tag emitted by the rewrite.
const CLOSE_TAG: &str = "</markspan-align>";

/// Shortest `~~~...~~~` span, across lines.
const CENTER_PATTERN: &str = r"~~~([\s\S]*?)~~~";

static CENTER_PLUGIN: LazyLock<RegexPlugin> = LazyLock::new(|| {
    RegexPlugin::new(RegexRule::new(
        CENTER_PATTERN,
        1,
        format!("{OPEN_TAG}{{content}}{CLOSE_TAG}"),
    ))
    .unwrap()
});

/// Tag pair lifted into center nodes.
pub static CENTER_PSEUDO_TAG: LazyLock<PseudoTag> =
    LazyLock::new(|| PseudoTag::new(OPEN_TAG, CLOSE_TAG, CustomKind::Center).with_fence('~'));

/// Factory for the `center` extension.
pub struct CenterExtension;

impl CenterExtension {
    /// Text plugin plus renderers for every target.
    #[must_use]
    pub fn create() -> Extension {
        let plugin = CENTER_PLUGIN.clone().with_pseudo_tag(CENTER_PSEUDO_TAG.clone());
        Extension::new("center")
            .with_text_plugin(plugin)
            .with_html_renderer(CenterRenderer)
            .with_plain_text_renderer(CenterRenderer)
            .with_rich_text_renderer(CenterRenderer)
    }
}

struct CenterRenderer;

fn wraps_blocks(children: &[Node]) -> bool {
    children.iter().any(Node::is_block)
}

impl NodeRenderer<HtmlWriter> for CenterRenderer {
    fn render(
        &self,
        _node: &CustomNode,
        children: &[Node],
        out: &mut HtmlWriter,
    ) -> Result<(), RenderError> {
        let tag = if wraps_blocks(children) { "div" } else { "span" };
        out.push_str(&format!(r#"<{tag} style="text-align: center">"#));
        out.render_nodes(children)?;
        out.push_str(&format!("</{tag}>"));
        Ok(())
    }
}

impl NodeRenderer<TextWriter> for CenterRenderer {
    fn render(
        &self,
        _node: &CustomNode,
        children: &[Node],
        out: &mut TextWriter,
    ) -> Result<(), RenderError> {
        if wraps_blocks(children) {
            out.ensure_block();
        }
        out.render_nodes(children)
    }
}

impl NodeRenderer<RichTextWriter> for CenterRenderer {
    fn render(
        &self,
        _node: &CustomNode,
        children: &[Node],
        out: &mut RichTextWriter,
    ) -> Result<(), RenderError> {
        if wraps_blocks(children) {
            out.ensure_block();
        }
        let start = out.position();
        out.render_nodes(children)?;
        out.push_span(start, Style::AlignCenter);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::TextPlugin;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_rewrite_single_line() {
        assert_eq!(
            CENTER_PLUGIN.transform("~~~hello~~~"),
            "<markspan-align center>hello</markspan-align>"
        );
    }

    #[test]
    fn test_rewrite_is_lazy() {
        assert_eq!(
            CENTER_PLUGIN.transform("~~~a~~~ and ~~~b~~~"),
            "<markspan-align center>a</markspan-align> and <markspan-align center>b</markspan-align>"
        );
    }

    #[test]
    fn test_rewrite_spans_lines() {
        assert_eq!(
            CENTER_PLUGIN.transform("~~~\nline one\nline two\n~~~"),
            "<markspan-align center>\nline one\nline two\n</markspan-align>"
        );
    }

    #[test]
    fn test_unterminated_is_unchanged() {
        assert_eq!(CENTER_PLUGIN.transform("~~~open"), "~~~open");
    }

    #[test]
    fn test_extension_produces_center_nodes() {
        let extension = CenterExtension::create();
        assert_eq!(extension.name(), "center");
        assert_eq!(extension.node_kinds(), vec![CustomKind::Center]);
        assert!(extension.delimiter().is_none());
    }
}
