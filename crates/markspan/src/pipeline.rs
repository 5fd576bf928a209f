//! Pipeline assembly and the parse/render entry points.
//!
//! Assembly walks the registered extensions in order, attaching text plugins
//! to the pre-processing phase and delimiter processors to the inline phase,
//! and fills the renderer table. Conflicts and unimplemented hooks for
//! declared targets are rejected here, so an assembled [`Pipeline`] can only
//! fail per render call.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use markspan_config::Config;
use pulldown_cmark::Options;

use crate::delimiter::{self, DelimiterProcessor};
use crate::error::{ConfigurationError, RenderError};
use crate::extension::{self, CenterExtension, Capability, Extension, HookKind, WebmExtension};
use crate::node::{CustomKind, Document};
use crate::plugin::{PseudoTag, TextPlugin};
use crate::render::{
    HtmlWriter, RenderTarget, Rendered, RendererTable, RichText, RichTextLayout, RichTextWriter,
    TextWriter,
};
use crate::tree::TreeBuilder;

/// Builder for [`Pipeline`].
#[derive(Debug)]
pub struct PipelineBuilder {
    extensions: Vec<Extension>,
    targets: Vec<RenderTarget>,
    gfm: bool,
    layout: RichTextLayout,
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self {
            extensions: Vec::new(),
            targets: RenderTarget::ALL.to_vec(),
            gfm: true,
            layout: RichTextLayout::default(),
        }
    }
}

impl PipelineBuilder {
    /// Register an extension. Registration order is the order text plugins run in.
    #[must_use]
    pub fn with_extension(mut self, extension: Extension) -> Self {
        self.extensions.push(extension);
        self
    }

    #[must_use]
    pub fn with_extensions(mut self, extensions: impl IntoIterator<Item = Extension>) -> Self {
        self.extensions.extend(extensions);
        self
    }

    /// Declare the targets the application renders to. Defaults to all of them.
    #[must_use]
    pub fn with_targets(mut self, targets: impl IntoIterator<Item = RenderTarget>) -> Self {
        self.targets.clear();
        for target in targets {
            if !self.targets.contains(&target) {
                self.targets.push(target);
            }
        }
        self
    }

    /// Enable or disable GitHub Flavored Markdown features.
    ///
    /// GFM is enabled by default. When enabled, the parser supports:
    /// - Tables
    /// - Strikethrough (`~~text~~`)
    /// - Task lists (`- [ ] item`)
    /// - Alerts (`> [!NOTE]`)
    #[must_use]
    pub fn with_gfm(mut self, enabled: bool) -> Self {
        self.gfm = enabled;
        self
    }

    /// Layout used by [`Pipeline::render`] for the rich text target.
    #[must_use]
    pub fn with_rich_text_layout(mut self, layout: RichTextLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Assemble the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] when two extensions conflict, a delimiter
    /// is invalid, or a parser hook or declared target is left without an
    /// implementation.
    pub fn build(self) -> Result<Pipeline, ConfigurationError> {
        let mut processors: Vec<Arc<dyn DelimiterProcessor>> = Vec::new();
        let mut text_plugins: Vec<(String, Arc<dyn TextPlugin>)> = Vec::new();
        let mut renderers = RendererTable::default();
        let mut openers: HashMap<char, &str> = HashMap::new();
        let mut kinds: HashMap<CustomKind, &str> = HashMap::new();

        for extension in &self.extensions {
            let name = extension.name();

            match extension.delimiter() {
                Some(Capability::Provided(processor)) => {
                    check_delimiter(name, processor.as_ref())?;
                    let character = processor.opening_character();
                    if let Some(first) = openers.insert(character, name) {
                        return Err(ConfigurationError::DelimiterConflict {
                            character,
                            first: first.to_owned(),
                            second: name.to_owned(),
                        });
                    }
                    processors.push(Arc::clone(processor));
                }
                Some(Capability::Unimplemented) => {
                    return Err(unimplemented(name, HookKind::Delimiter));
                }
                None => {}
            }

            match extension.text_plugin() {
                Some(Capability::Provided(plugin)) => {
                    text_plugins.push((name.to_owned(), Arc::clone(plugin)));
                }
                Some(Capability::Unimplemented) => {
                    return Err(unimplemented(name, HookKind::TextPlugin));
                }
                None => {}
            }

            for kind in extension.node_kinds() {
                if let Some(first) = kinds.insert(kind, name) {
                    return Err(ConfigurationError::NodeKindConflict {
                        kind,
                        first: first.to_owned(),
                        second: name.to_owned(),
                    });
                }
                for &target in &self.targets {
                    check_renderer(extension, kind, target)?;
                }
                register_renderers(&mut renderers, extension, kind);
            }

            tracing::debug!(
                extension = name,
                delimiter = extension.delimiter().is_some(),
                text_plugin = extension.text_plugin().is_some(),
                "Attached extension"
            );
        }

        tracing::info!(
            extension_count = self.extensions.len(),
            targets = ?self.targets,
            "Assembled pipeline"
        );

        Ok(Pipeline {
            extensions: self.extensions,
            targets: self.targets,
            gfm: self.gfm,
            layout: self.layout,
            processors,
            text_plugins,
            renderers: Arc::new(renderers),
        })
    }
}

fn unimplemented(extension: &str, hook: HookKind) -> ConfigurationError {
    ConfigurationError::UnimplementedCapability {
        extension: extension.to_owned(),
        hook,
    }
}

fn check_delimiter(
    extension: &str,
    processor: &dyn DelimiterProcessor,
) -> Result<(), ConfigurationError> {
    let spec = processor.spec();
    spec.validate()
        .map_err(|reason| ConfigurationError::InvalidDelimiter {
            extension: extension.to_owned(),
            reason,
        })?;
    if let Some(character) = spec.reserved_character() {
        return Err(ConfigurationError::ReservedCharacter {
            extension: extension.to_owned(),
            character,
        });
    }
    Ok(())
}

fn check_renderer(
    extension: &Extension,
    kind: CustomKind,
    target: RenderTarget,
) -> Result<(), ConfigurationError> {
    let provided = match target {
        RenderTarget::Html => extension.html_renderer().map(Capability::is_provided),
        RenderTarget::PlainText => extension.plain_text_renderer().map(Capability::is_provided),
        RenderTarget::RichText => extension.rich_text_renderer().map(Capability::is_provided),
    };
    match provided {
        Some(true) => Ok(()),
        Some(false) => Err(unimplemented(
            extension.name(),
            HookKind::Renderer(target),
        )),
        None => Err(ConfigurationError::MissingRenderer {
            extension: extension.name().to_owned(),
            kind,
            target,
        }),
    }
}

fn register_renderers(table: &mut RendererTable, extension: &Extension, kind: CustomKind) {
    if let Some(slot) = extension.html_renderer() {
        table.insert_html(kind, slot.clone());
    }
    if let Some(slot) = extension.plain_text_renderer() {
        table.insert_plain_text(kind, slot.clone());
    }
    if let Some(slot) = extension.rich_text_renderer() {
        table.insert_rich_text(kind, slot.clone());
    }
}

/// An assembled, immutable parse and render pipeline.
///
/// A pipeline can be shared between threads and used for any number of
/// documents.
pub struct Pipeline {
    extensions: Vec<Extension>,
    targets: Vec<RenderTarget>,
    gfm: bool,
    layout: RichTextLayout,
    processors: Vec<Arc<dyn DelimiterProcessor>>,
    text_plugins: Vec<(String, Arc<dyn TextPlugin>)>,
    renderers: Arc<RendererTable>,
}

impl Default for Pipeline {
    /// Center and webm extensions, every target.
    fn default() -> Self {
        Self::builder()
            .with_extension(CenterExtension::create())
            .with_extension(WebmExtension::create())
            .build()
            .expect("built-in extensions assemble")
    }
}

impl Pipeline {
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// Assemble `extensions` for the `targets` the application renders to.
    ///
    /// # Errors
    ///
    /// See [`PipelineBuilder::build`].
    pub fn assemble(
        extensions: impl IntoIterator<Item = Extension>,
        targets: &[RenderTarget],
    ) -> Result<Self, ConfigurationError> {
        Self::builder()
            .with_extensions(extensions)
            .with_targets(targets.iter().copied())
            .build()
    }

    /// Assemble from configuration, resolving extension names to built-ins.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::UnknownExtension`] for a name that is not
    /// a built-in extension, or any assembly error.
    pub fn from_config(config: &Config) -> Result<Self, ConfigurationError> {
        let extensions = config
            .extensions
            .enabled
            .iter()
            .map(|name| {
                extension::builtin(name)
                    .ok_or_else(|| ConfigurationError::UnknownExtension(name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::builder()
            .with_extensions(extensions)
            .with_targets(config.render.targets.iter().copied().map(RenderTarget::from))
            .with_gfm(config.parser.gfm)
            .with_rich_text_layout(RichTextLayout::from(&config.rich_text))
            .build()
    }

    /// Registered extensions, in registration order.
    #[must_use]
    pub fn extensions(&self) -> &[Extension] {
        &self.extensions
    }

    /// Declared render targets.
    #[must_use]
    pub fn targets(&self) -> &[RenderTarget] {
        &self.targets
    }

    /// Custom node renderers resolved at assembly.
    #[must_use]
    pub fn renderers(&self) -> &RendererTable {
        &self.renderers
    }

    /// Layout used for the rich text target by [`render`](Self::render).
    #[must_use]
    pub fn rich_text_layout(&self) -> &RichTextLayout {
        &self.layout
    }

    /// Get parser options based on GFM configuration.
    #[must_use]
    pub fn parser_options(&self) -> Options {
        if self.gfm {
            Options::ENABLE_TABLES
                | Options::ENABLE_STRIKETHROUGH
                | Options::ENABLE_TASKLISTS
                | Options::ENABLE_GFM
        } else {
            Options::empty()
        }
    }

    /// Apply every text plugin to raw source, in registration order.
    pub fn preprocess<'a>(&self, source: &'a str) -> Cow<'a, str> {
        let mut text = Cow::Borrowed(source);
        for (extension, plugin) in &self.text_plugins {
            text = match text {
                Cow::Borrowed(source) => plugin.transform(source),
                Cow::Owned(source) => {
                    let changed = match plugin.transform(&source) {
                        Cow::Owned(changed) => Some(changed),
                        Cow::Borrowed(_) => None,
                    };
                    Cow::Owned(changed.unwrap_or(source))
                }
            };
            tracing::debug!(
                extension = %extension,
                rewritten = matches!(text, Cow::Owned(_)),
                "Applied text plugin"
            );
        }
        text
    }

    /// Parse markdown into a document.
    ///
    /// Never fails: unmatched custom syntax stays literal text.
    #[must_use]
    pub fn parse(&self, source: &str) -> Document {
        let text = self.preprocess(source);
        let pseudo_tags: Vec<&PseudoTag> = self
            .text_plugins
            .iter()
            .filter_map(|(_, plugin)| plugin.pseudo_tag())
            .collect();
        let blocks = TreeBuilder::new(self.parser_options(), &pseudo_tags).parse(&text);
        Document::new(delimiter::process_inlines(blocks, &self.processors))
    }

    /// Render `document` for `target`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError`] when a custom node has no usable renderer for
    /// `target`. Only this call fails; the pipeline stays usable.
    pub fn render(
        &self,
        document: &Document,
        target: RenderTarget,
    ) -> Result<Rendered, RenderError> {
        match target {
            RenderTarget::Html => self.render_html(document).map(Rendered::Html),
            RenderTarget::PlainText => self.render_plain_text(document).map(Rendered::PlainText),
            RenderTarget::RichText => self
                .render_rich_text(document, &self.layout)
                .map(Rendered::RichText),
        }
    }

    /// Render `document` as HTML.
    ///
    /// # Errors
    ///
    /// See [`render`](Self::render).
    pub fn render_html(&self, document: &Document) -> Result<String, RenderError> {
        let mut writer = HtmlWriter::new(Arc::clone(&self.renderers));
        log_failure(writer.render_nodes(document.blocks()))?;
        Ok(writer.finish())
    }

    /// Render `document` as plain text.
    ///
    /// # Errors
    ///
    /// See [`render`](Self::render).
    pub fn render_plain_text(&self, document: &Document) -> Result<String, RenderError> {
        let mut writer = TextWriter::new(Arc::clone(&self.renderers));
        log_failure(writer.render_nodes(document.blocks()))?;
        Ok(writer.finish())
    }

    /// Render `document` as rich text laid out with `layout`.
    ///
    /// # Errors
    ///
    /// See [`render`](Self::render).
    pub fn render_rich_text(
        &self,
        document: &Document,
        layout: &RichTextLayout,
    ) -> Result<RichText, RenderError> {
        let mut writer = RichTextWriter::new(Arc::clone(&self.renderers), layout.clone());
        writer.measure(document.blocks());
        log_failure(writer.render_nodes(document.blocks()))?;
        Ok(writer.finish())
    }
}

fn log_failure(result: Result<(), RenderError>) -> Result<(), RenderError> {
    if let Err(error @ RenderError::UnimplementedCapability { .. }) = &result {
        tracing::warn!(error = %error, "Render failed");
    }
    result
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.extensions.iter().map(Extension::name).collect();
        f.debug_struct("Pipeline")
            .field("extensions", &names)
            .field("targets", &self.targets)
            .field("gfm", &self.gfm)
            .field("renderers", &self.renderers)
            .finish_non_exhaustive()
    }
}
