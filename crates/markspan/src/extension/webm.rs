//! `webm(source)` embeds a video.

use super::Extension;
use crate::delimiter::{DelimiterSpec, FixedDelimiterProcessor};
use crate::error::RenderError;
use crate::node::{CustomKind, CustomNode, Node};
use crate::render::{HtmlWriter, NodeRenderer, RichTextWriter, Style, TextWriter, escape_html};

const OPENING: &str = "webm(";
const CLOSING: &str = ")";

/// `webm(` plus `)`.
const MINIMUM_LENGTH: usize = 6;

/// Factory for the `webm` extension.
pub struct WebmExtension;

impl WebmExtension {
    /// Delimiter plus renderers for every target.
    #[must_use]
    pub fn create() -> Extension {
        Extension::new("webm")
            .with_delimiter(FixedDelimiterProcessor::new(
                DelimiterSpec::new(OPENING, CLOSING, MINIMUM_LENGTH),
                CustomKind::Video,
            ))
            .with_html_renderer(VideoRenderer)
            .with_plain_text_renderer(VideoRenderer)
            .with_rich_text_renderer(VideoRenderer)
    }
}

struct VideoRenderer;

fn source(children: &[Node]) -> String {
    children
        .iter()
        .map(Node::inline_source)
        .collect::<String>()
        .trim()
        .to_owned()
}

impl NodeRenderer<HtmlWriter> for VideoRenderer {
    fn render(
        &self,
        _node: &CustomNode,
        children: &[Node],
        out: &mut HtmlWriter,
    ) -> Result<(), RenderError> {
        let src = escape_html(&source(children));
        out.push_str(&format!(
            r#"<video src="{src}" controls><a href="{src}">{src}</a></video>"#
        ));
        Ok(())
    }
}

impl NodeRenderer<TextWriter> for VideoRenderer {
    fn render(
        &self,
        _node: &CustomNode,
        children: &[Node],
        out: &mut TextWriter,
    ) -> Result<(), RenderError> {
        out.push_str(&format!("[video: {}]", source(children)));
        Ok(())
    }
}

impl NodeRenderer<RichTextWriter> for VideoRenderer {
    fn render(
        &self,
        _node: &CustomNode,
        children: &[Node],
        out: &mut RichTextWriter,
    ) -> Result<(), RenderError> {
        let source = source(children);
        let start = out.position();
        out.push_str(&source);
        out.push_span(start, Style::Video { source });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extension::Capability;
    use crate::node::NodeKind;

    #[test]
    fn test_delimiter_spec() {
        let extension = WebmExtension::create();
        let Some(Capability::Provided(processor)) = extension.delimiter() else {
            panic!("webm provides a delimiter");
        };
        assert_eq!(processor.spec().opening(), "webm(");
        assert_eq!(processor.spec().closing(), ")");
        assert_eq!(processor.min_length(), 6);
        assert!(processor.spec().validate().is_ok());
    }

    #[test]
    fn test_source_is_trimmed_text() {
        let children = vec![Node::text(" clip.webm ")];
        assert_eq!(source(&children), "clip.webm");
    }

    #[test]
    fn test_source_keeps_markup_characters() {
        let children = vec![
            Node::text("https://x.com/a"),
            Node::with_children(NodeKind::Emphasis, vec![Node::text("b")]),
            Node::text("c.webm"),
        ];
        assert_eq!(source(&children), "https://x.com/a*b*c.webm");
    }
}
