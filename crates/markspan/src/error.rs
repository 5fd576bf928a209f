//! Error types for pipeline assembly and rendering.

use crate::extension::HookKind;
use crate::node::CustomKind;
use crate::render::RenderTarget;

/// Error raised while assembling a pipeline.
///
/// A pipeline that fails to assemble is never usable, so configuration
/// problems surface at setup instead of in the middle of a render.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigurationError {
    /// Two extensions claim the same opening character.
    #[error("extensions `{first}` and `{second}` both claim opening character {character:?}")]
    DelimiterConflict {
        /// Contested character.
        character: char,
        /// Extension registered first.
        first: String,
        /// Extension registered second.
        second: String,
    },

    /// Two extensions produce the same custom node kind.
    #[error("extensions `{first}` and `{second}` both produce `{kind}` nodes")]
    NodeKindConflict {
        /// Contested node kind.
        kind: CustomKind,
        /// Extension registered first.
        first: String,
        /// Extension registered second.
        second: String,
    },

    /// A delimiter uses a character reserved by the base grammar.
    #[error("extension `{extension}` uses reserved character {character:?} as a delimiter")]
    ReservedCharacter {
        /// Offending extension.
        extension: String,
        /// Reserved character.
        character: char,
    },

    /// A delimiter specification is unusable.
    #[error("extension `{extension}` has an invalid delimiter: {reason}")]
    InvalidDelimiter {
        /// Offending extension.
        extension: String,
        /// What is wrong with it.
        reason: String,
    },

    /// No renderer for a node kind at a declared target.
    #[error("extension `{extension}` has no {target} renderer for `{kind}` nodes")]
    MissingRenderer {
        /// Extension producing the node kind.
        extension: String,
        /// Node kind without a renderer.
        kind: CustomKind,
        /// Declared target.
        target: RenderTarget,
    },

    /// A hook is declared but intentionally left unimplemented.
    #[error("extension `{extension}` declares an unimplemented {hook} hook")]
    UnimplementedCapability {
        /// Offending extension.
        extension: String,
        /// Unimplemented hook.
        hook: HookKind,
    },

    /// Configuration names an extension that does not exist.
    #[error("unknown extension `{0}`")]
    UnknownExtension(String),

    /// A text plugin pattern failed to compile.
    #[error("invalid pattern")]
    InvalidPattern(#[from] regex::Error),

    /// A rewrite rule does not fit its pattern.
    #[error("invalid rewrite rule for pattern `{pattern}`: {reason}")]
    InvalidRule {
        /// Pattern source.
        pattern: String,
        /// What is wrong with the rule.
        reason: String,
    },
}

/// Error raised by a single render call.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RenderError {
    /// The renderer for this pair was declared but not implemented.
    #[error("{target} rendering of `{kind}` nodes is not implemented")]
    UnimplementedCapability {
        /// Node kind being rendered.
        kind: CustomKind,
        /// Requested target.
        target: RenderTarget,
    },

    /// No extension registered a renderer for this pair.
    #[error("no renderer for ({kind}, {target})")]
    NoRenderer {
        /// Node kind being rendered.
        kind: CustomKind,
        /// Requested target.
        target: RenderTarget,
    },
}
