//! Multi-target rendering.
//!
//! Each [`RenderTarget`] has a writer that walks the document depth-first.
//! Base node kinds are handled by the writer itself with an exhaustive match;
//! custom nodes are dispatched through the [`RendererTable`] built when the
//! pipeline is assembled. A missing or unimplemented renderer is an error,
//! never empty output.

mod flat;
mod html;
mod rich;
mod text;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use markspan_config::TargetName;

use crate::error::RenderError;
use crate::extension::Capability;
use crate::node::{CustomKind, CustomNode, Node};

pub use html::{HtmlWriter, escape_html};
pub use rich::{
    MonospaceMeasurer, RichText, RichTextLayout, RichTextWriter, Span, Style, TextMeasurer,
};
pub use text::TextWriter;

/// Output representation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RenderTarget {
    /// HTML fragments.
    Html,
    /// Plain text with formatting stripped.
    PlainText,
    /// Flattened text with style spans.
    RichText,
}

impl RenderTarget {
    /// Every target, in declaration order.
    pub const ALL: [Self; 3] = [Self::Html, Self::PlainText, Self::RichText];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::PlainText => "plain_text",
            Self::RichText => "rich_text",
        }
    }
}

impl fmt::Display for RenderTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<TargetName> for RenderTarget {
    fn from(name: TargetName) -> Self {
        match name {
            TargetName::Html => Self::Html,
            TargetName::PlainText => Self::PlainText,
            TargetName::RichText => Self::RichText,
        }
    }
}

/// A rendered document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Rendered {
    Html(String),
    PlainText(String),
    RichText(RichText),
}

impl Rendered {
    /// Target this representation was rendered for.
    #[must_use]
    pub fn target(&self) -> RenderTarget {
        match self {
            Self::Html(_) => RenderTarget::Html,
            Self::PlainText(_) => RenderTarget::PlainText,
            Self::RichText(_) => RenderTarget::RichText,
        }
    }

    /// The textual output: HTML, plain text, or the flattened rich text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Html(s) | Self::PlainText(s) => s,
            Self::RichText(rich) => &rich.text,
        }
    }
}

/// Renders one custom node kind for the writer `W`.
///
/// Implementations receive the custom node data and the node's children and
/// render children back through the writer when they need to.
pub trait NodeRenderer<W>: Send + Sync {
    fn render(&self, node: &CustomNode, children: &[Node], out: &mut W) -> Result<(), RenderError>;
}

type Slot<W> = Capability<Arc<dyn NodeRenderer<W>>>;

/// Custom node renderers keyed by (node kind, target).
#[derive(Default)]
pub struct RendererTable {
    html: HashMap<CustomKind, Slot<HtmlWriter>>,
    plain_text: HashMap<CustomKind, Slot<TextWriter>>,
    rich_text: HashMap<CustomKind, Slot<RichTextWriter>>,
}

impl RendererTable {
    pub(crate) fn insert_html(&mut self, kind: CustomKind, slot: Slot<HtmlWriter>) {
        self.html.insert(kind, slot);
    }

    pub(crate) fn insert_plain_text(&mut self, kind: CustomKind, slot: Slot<TextWriter>) {
        self.plain_text.insert(kind, slot);
    }

    pub(crate) fn insert_rich_text(&mut self, kind: CustomKind, slot: Slot<RichTextWriter>) {
        self.rich_text.insert(kind, slot);
    }

    /// Whether (kind, target) resolves to an implemented renderer.
    #[must_use]
    pub fn supports(&self, kind: CustomKind, target: RenderTarget) -> bool {
        match target {
            RenderTarget::Html => self.html.get(&kind).is_some_and(Capability::is_provided),
            RenderTarget::PlainText => self
                .plain_text
                .get(&kind)
                .is_some_and(Capability::is_provided),
            RenderTarget::RichText => self
                .rich_text
                .get(&kind)
                .is_some_and(Capability::is_provided),
        }
    }

    pub(crate) fn html(
        &self,
        kind: CustomKind,
    ) -> Result<Arc<dyn NodeRenderer<HtmlWriter>>, RenderError> {
        lookup(&self.html, kind, RenderTarget::Html)
    }

    pub(crate) fn plain_text(
        &self,
        kind: CustomKind,
    ) -> Result<Arc<dyn NodeRenderer<TextWriter>>, RenderError> {
        lookup(&self.plain_text, kind, RenderTarget::PlainText)
    }

    pub(crate) fn rich_text(
        &self,
        kind: CustomKind,
    ) -> Result<Arc<dyn NodeRenderer<RichTextWriter>>, RenderError> {
        lookup(&self.rich_text, kind, RenderTarget::RichText)
    }
}

fn lookup<W>(
    slots: &HashMap<CustomKind, Slot<W>>,
    kind: CustomKind,
    target: RenderTarget,
) -> Result<Arc<dyn NodeRenderer<W>>, RenderError> {
    match slots.get(&kind) {
        Some(Capability::Provided(renderer)) => Ok(Arc::clone(renderer)),
        Some(Capability::Unimplemented) => {
            Err(RenderError::UnimplementedCapability { kind, target })
        }
        None => Err(RenderError::NoRenderer { kind, target }),
    }
}

impl fmt::Debug for RendererTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kinds = |slots: Vec<&CustomKind>| {
            let mut kinds: Vec<_> = slots.into_iter().copied().collect();
            kinds.sort();
            kinds
        };
        f.debug_struct("RendererTable")
            .field("html", &kinds(self.html.keys().collect()))
            .field("plain_text", &kinds(self.plain_text.keys().collect()))
            .field("rich_text", &kinds(self.rich_text.keys().collect()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    impl NodeRenderer<HtmlWriter> for Noop {
        fn render(
            &self,
            _node: &CustomNode,
            _children: &[Node],
            _out: &mut HtmlWriter,
        ) -> Result<(), RenderError> {
            Ok(())
        }
    }

    #[test]
    fn test_lookup_missing() {
        let table = RendererTable::default();
        let err = table.html(CustomKind::Video).err();
        assert_eq!(
            err,
            Some(RenderError::NoRenderer {
                kind: CustomKind::Video,
                target: RenderTarget::Html,
            })
        );
    }

    #[test]
    fn test_lookup_unimplemented() {
        let mut table = RendererTable::default();
        table.insert_html(CustomKind::Video, Capability::Unimplemented);
        let err = table.html(CustomKind::Video).err();
        assert_eq!(
            err,
            Some(RenderError::UnimplementedCapability {
                kind: CustomKind::Video,
                target: RenderTarget::Html,
            })
        );
        assert!(!table.supports(CustomKind::Video, RenderTarget::Html));
    }

    #[test]
    fn test_lookup_provided() {
        let mut table = RendererTable::default();
        table.insert_html(CustomKind::Video, Capability::Provided(Arc::new(Noop)));
        assert!(table.html(CustomKind::Video).is_ok());
        assert!(table.supports(CustomKind::Video, RenderTarget::Html));
        assert!(!table.supports(CustomKind::Video, RenderTarget::PlainText));
    }

    #[test]
    fn test_target_from_config_name() {
        assert_eq!(RenderTarget::from(TargetName::Html), RenderTarget::Html);
        assert_eq!(
            RenderTarget::from(TargetName::PlainText),
            RenderTarget::PlainText
        );
        assert_eq!(
            RenderTarget::from(TargetName::RichText),
            RenderTarget::RichText
        );
    }

    #[test]
    fn test_rendered_accessors() {
        let rendered = Rendered::PlainText("hi".to_owned());
        assert_eq!(rendered.target(), RenderTarget::PlainText);
        assert_eq!(rendered.as_str(), "hi");
    }
}
