//! Extensions: bundles of parser and renderer hooks.
//!
//! An [`Extension`] contributes any subset of a delimiter processor, a text
//! plugin and per-target node renderers. Each slot is either absent, provided,
//! or explicitly declared [`Capability::Unimplemented`]. Declared but
//! unimplemented hooks are rejected when the pipeline is assembled, never
//! silently skipped.
//!
//! # Example
//!
//! ```
//! use markspan::extension::{self, HookKind};
//! use markspan::{CustomKind, RenderTarget};
//!
//! let center = extension::builtin("center").unwrap();
//! assert_eq!(center.node_kinds(), vec![CustomKind::Center]);
//!
//! let partial = extension::WebmExtension::create()
//!     .with_unimplemented(HookKind::Renderer(RenderTarget::RichText));
//! assert!(partial.rich_text_renderer().is_some());
//! ```

mod center;
mod webm;
mod youtube;

use std::fmt;
use std::sync::Arc;

pub use center::{CENTER_PSEUDO_TAG, CenterExtension};
pub use webm::WebmExtension;
pub use youtube::YoutubeExtension;

use crate::delimiter::DelimiterProcessor;
use crate::node::CustomKind;
use crate::plugin::TextPlugin;
use crate::render::{HtmlWriter, NodeRenderer, RenderTarget, RichTextWriter, TextWriter};

/// Names accepted by [`builtin`].
pub const BUILTIN_NAMES: &[&str] = &["center", "webm", "youtube"];

/// A hook slot that is either implemented or explicitly declared missing.
#[derive(Clone, Debug)]
pub enum Capability<T> {
    Provided(T),
    Unimplemented,
}

impl<T> Capability<T> {
    #[must_use]
    pub fn is_provided(&self) -> bool {
        matches!(self, Self::Provided(_))
    }

    /// The implementation, if provided.
    #[must_use]
    pub fn provided(&self) -> Option<&T> {
        match self {
            Self::Provided(value) => Some(value),
            Self::Unimplemented => None,
        }
    }
}

/// Identifies one hook of an extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HookKind {
    Delimiter,
    TextPlugin,
    Renderer(RenderTarget),
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delimiter => f.write_str("delimiter"),
            Self::TextPlugin => f.write_str("text plugin"),
            Self::Renderer(target) => write!(f, "{target} renderer"),
        }
    }
}

type Slot<T> = Option<Capability<Arc<T>>>;

/// A named bundle of hooks.
#[derive(Clone)]
pub struct Extension {
    name: String,
    delimiter: Slot<dyn DelimiterProcessor>,
    text_plugin: Slot<dyn TextPlugin>,
    html: Slot<dyn NodeRenderer<HtmlWriter>>,
    plain_text: Slot<dyn NodeRenderer<TextWriter>>,
    rich_text: Slot<dyn NodeRenderer<RichTextWriter>>,
}

impl Extension {
    /// An extension with no hooks.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            delimiter: None,
            text_plugin: None,
            html: None,
            plain_text: None,
            rich_text: None,
        }
    }

    #[must_use]
    pub fn with_delimiter(mut self, processor: impl DelimiterProcessor + 'static) -> Self {
        self.delimiter = Some(Capability::Provided(Arc::new(processor)));
        self
    }

    #[must_use]
    pub fn with_text_plugin(mut self, plugin: impl TextPlugin + 'static) -> Self {
        self.text_plugin = Some(Capability::Provided(Arc::new(plugin)));
        self
    }

    #[must_use]
    pub fn with_html_renderer(mut self, renderer: impl NodeRenderer<HtmlWriter> + 'static) -> Self {
        self.html = Some(Capability::Provided(Arc::new(renderer)));
        self
    }

    #[must_use]
    pub fn with_plain_text_renderer(
        mut self,
        renderer: impl NodeRenderer<TextWriter> + 'static,
    ) -> Self {
        self.plain_text = Some(Capability::Provided(Arc::new(renderer)));
        self
    }

    #[must_use]
    pub fn with_rich_text_renderer(
        mut self,
        renderer: impl NodeRenderer<RichTextWriter> + 'static,
    ) -> Self {
        self.rich_text = Some(Capability::Provided(Arc::new(renderer)));
        self
    }

    /// Declare `hook` as intentionally unimplemented, replacing any
    /// implementation already set.
    #[must_use]
    pub fn with_unimplemented(mut self, hook: HookKind) -> Self {
        match hook {
            HookKind::Delimiter => self.delimiter = Some(Capability::Unimplemented),
            HookKind::TextPlugin => self.text_plugin = Some(Capability::Unimplemented),
            HookKind::Renderer(RenderTarget::Html) => self.html = Some(Capability::Unimplemented),
            HookKind::Renderer(RenderTarget::PlainText) => {
                self.plain_text = Some(Capability::Unimplemented);
            }
            HookKind::Renderer(RenderTarget::RichText) => {
                self.rich_text = Some(Capability::Unimplemented);
            }
        }
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn delimiter(&self) -> Option<&Capability<Arc<dyn DelimiterProcessor>>> {
        self.delimiter.as_ref()
    }

    #[must_use]
    pub fn text_plugin(&self) -> Option<&Capability<Arc<dyn TextPlugin>>> {
        self.text_plugin.as_ref()
    }

    #[must_use]
    pub fn html_renderer(&self) -> Option<&Capability<Arc<dyn NodeRenderer<HtmlWriter>>>> {
        self.html.as_ref()
    }

    #[must_use]
    pub fn plain_text_renderer(&self) -> Option<&Capability<Arc<dyn NodeRenderer<TextWriter>>>> {
        self.plain_text.as_ref()
    }

    #[must_use]
    pub fn rich_text_renderer(
        &self,
    ) -> Option<&Capability<Arc<dyn NodeRenderer<RichTextWriter>>>> {
        self.rich_text.as_ref()
    }

    /// Whether a renderer slot (provided or unimplemented) exists for `target`.
    #[must_use]
    pub fn declares_renderer(&self, target: RenderTarget) -> bool {
        match target {
            RenderTarget::Html => self.html.is_some(),
            RenderTarget::PlainText => self.plain_text.is_some(),
            RenderTarget::RichText => self.rich_text.is_some(),
        }
    }

    /// Hooks declared unimplemented, in slot order.
    #[must_use]
    pub fn unimplemented_hooks(&self) -> Vec<HookKind> {
        let slots = [
            (HookKind::Delimiter, is_unimplemented(&self.delimiter)),
            (HookKind::TextPlugin, is_unimplemented(&self.text_plugin)),
            (
                HookKind::Renderer(RenderTarget::Html),
                is_unimplemented(&self.html),
            ),
            (
                HookKind::Renderer(RenderTarget::PlainText),
                is_unimplemented(&self.plain_text),
            ),
            (
                HookKind::Renderer(RenderTarget::RichText),
                is_unimplemented(&self.rich_text),
            ),
        ];
        slots
            .into_iter()
            .filter_map(|(hook, unimplemented)| unimplemented.then_some(hook))
            .collect()
    }

    /// Custom node kinds this extension produces: its delimiter's kind and the
    /// kind of its text plugin's pseudo-tag.
    #[must_use]
    pub fn node_kinds(&self) -> Vec<CustomKind> {
        let from_delimiter = self
            .delimiter
            .as_ref()
            .and_then(Capability::provided)
            .map(|processor| processor.node_kind());
        let from_plugin = self
            .text_plugin
            .as_ref()
            .and_then(Capability::provided)
            .and_then(|plugin| plugin.pseudo_tag().map(|tag| tag.kind));

        let mut kinds: Vec<CustomKind> = from_delimiter.into_iter().chain(from_plugin).collect();
        kinds.dedup();
        kinds
    }
}

fn is_unimplemented<T: ?Sized>(slot: &Slot<T>) -> bool {
    matches!(slot, Some(Capability::Unimplemented))
}

impl fmt::Debug for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn state<T: ?Sized>(slot: &Slot<T>) -> &'static str {
            match slot {
                None => "absent",
                Some(Capability::Provided(_)) => "provided",
                Some(Capability::Unimplemented) => "unimplemented",
            }
        }
        f.debug_struct("Extension")
            .field("name", &self.name)
            .field("delimiter", &state(&self.delimiter))
            .field("text_plugin", &state(&self.text_plugin))
            .field("html", &state(&self.html))
            .field("plain_text", &state(&self.plain_text))
            .field("rich_text", &state(&self.rich_text))
            .finish()
    }
}

/// Look up a built-in extension by name.
#[must_use]
pub fn builtin(name: &str) -> Option<Extension> {
    match name {
        "center" => Some(CenterExtension::create()),
        "webm" => Some(WebmExtension::create()),
        "youtube" => Some(YoutubeExtension::create()),
        _ => None,
    }
}
