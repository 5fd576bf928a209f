//! `youtube(id)` embeds a YouTube player.

use super::Extension;
use crate::delimiter::{DelimiterSpec, FixedDelimiterProcessor};
use crate::error::RenderError;
use crate::node::{CustomKind, CustomNode, Node};
use crate::render::{HtmlWriter, NodeRenderer, RichTextWriter, Style, TextWriter, escape_html};

const OPENING: &str = "youtube(";
const CLOSING: &str = ")";
const MINIMUM_LENGTH: usize = 9;

const EMBED_URL: &str = "https://www.youtube.com/embed/";

/// Factory for the `youtube` extension.
pub struct YoutubeExtension;

impl YoutubeExtension {
    #[must_use]
    pub fn create() -> Extension {
        Extension::new("youtube")
            .with_delimiter(FixedDelimiterProcessor::new(
                DelimiterSpec::new(OPENING, CLOSING, MINIMUM_LENGTH),
                CustomKind::Youtube,
            ))
            .with_html_renderer(YoutubeRenderer)
            .with_plain_text_renderer(YoutubeRenderer)
            .with_rich_text_renderer(YoutubeRenderer)
    }
}

struct YoutubeRenderer;

fn video_id(children: &[Node]) -> String {
    children
        .iter()
        .map(Node::inline_source)
        .collect::<String>()
        .trim()
        .to_owned()
}

impl NodeRenderer<HtmlWriter> for YoutubeRenderer {
    fn render(
        &self,
        _node: &CustomNode,
        children: &[Node],
        out: &mut HtmlWriter,
    ) -> Result<(), RenderError> {
        let id = escape_html(&video_id(children));
        out.push_str(&format!(
            r#"<iframe class="youtube" src="{EMBED_URL}{id}" allowfullscreen></iframe>"#
        ));
        Ok(())
    }
}

impl NodeRenderer<TextWriter> for YoutubeRenderer {
    fn render(
        &self,
        _node: &CustomNode,
        children: &[Node],
        out: &mut TextWriter,
    ) -> Result<(), RenderError> {
        out.push_str(&format!("[youtube: {}]", video_id(children)));
        Ok(())
    }
}

impl NodeRenderer<RichTextWriter> for YoutubeRenderer {
    fn render(
        &self,
        _node: &CustomNode,
        children: &[Node],
        out: &mut RichTextWriter,
    ) -> Result<(), RenderError> {
        let id = video_id(children);
        let start = out.position();
        out.push_str(&id);
        out.push_span(start, Style::Youtube { id });
        Ok(())
    }
}
