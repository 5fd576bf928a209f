//! Extensible markdown pipeline with custom syntax and multi-target rendering.
//!
//! A [`Pipeline`] wraps a CommonMark parser with extensions that add custom
//! syntax and renders the resulting tree as HTML, plain text, or rich text
//! (flattened text with style spans).
//!
//! # Architecture
//!
//! Processing runs in a fixed order:
//! 1. Text plugins rewrite the raw source (e.g. `~~~centered~~~` becomes an
//!    `<markspan-align center>` pseudo-tag).
//! 2. The base grammar parses the rewritten source into a [`Document`];
//!    pseudo-tags are lifted into custom nodes.
//! 3. Delimiter processors scan inline text for their tokens (e.g.
//!    `webm(...)`) and wrap matched spans in custom nodes.
//! 4. A writer per [`RenderTarget`] walks the tree; custom nodes are dispatched
//!    to the renderer their extension registered for that target.
//!
//! Extensions are validated when the pipeline is assembled: conflicting
//! delimiters, duplicate node kinds, and missing renderers for declared
//! targets are [`ConfigurationError`]s.
//!
//! # Example
//!
//! ```
//! use markspan::{CustomKind, Pipeline, RenderTarget};
//!
//! let pipeline = Pipeline::default();
//! let document = pipeline.parse("~~~Intro~~~\n\nwebm(clip.webm)");
//!
//! let kinds: Vec<_> = document.custom_nodes().map(|(custom, _)| custom.kind).collect();
//! assert_eq!(kinds, [CustomKind::Center, CustomKind::Video]);
//!
//! let text = pipeline.render_plain_text(&document).unwrap();
//! assert_eq!(text, "Intro\n\n[video: clip.webm]");
//!
//! let html = pipeline.render(&document, RenderTarget::Html).unwrap();
//! assert!(html.as_str().contains(r#"<video src="clip.webm""#));
//! ```

pub mod delimiter;
mod error;
pub mod extension;
mod node;
mod pipeline;
pub mod plugin;
pub mod render;
mod tree;

pub use error::{ConfigurationError, RenderError};
pub use extension::{Capability, Extension, HookKind};
pub use node::{AlertKind, CustomKind, CustomNode, Descendants, Document, Node, NodeKind};
pub use pipeline::{Pipeline, PipelineBuilder};
pub use render::{RenderTarget, Rendered, RichText, RichTextLayout};
