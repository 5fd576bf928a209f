//! Text plugins: raw-text transforms applied before parsing.
//!
//! Syntax that is easier to express as a pattern substitution than as a
//! delimiter pair is rewritten into an intermediate pseudo-HTML tag. The base
//! grammar passes the tag through as HTML and the tree builder lifts tag pairs
//! into custom nodes (see [`PseudoTag`]).

use std::borrow::Cow;

use regex::{Captures, Regex, RegexBuilder};

use crate::error::ConfigurationError;
use crate::node::CustomKind;

/// Placeholder replaced by the preserved content in a rewrite template.
pub const CONTENT_PLACEHOLDER: &str = "{content}";

/// Intermediate tag pair emitted by a text plugin and lifted into a custom node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PseudoTag {
    /// Opening tag, e.g. `<markspan-align center>`.
    pub open: String,
    /// Closing tag, e.g. `</markspan-align>`.
    pub close: String,
    /// Kind of node the tag pair becomes.
    pub kind: CustomKind,
    /// Fence character of the source syntax, when it can also open a fenced
    /// code block. An unclosed fence of this character is kept as text.
    pub fence: Option<char>,
}

impl PseudoTag {
    #[must_use]
    pub fn new(open: impl Into<String>, close: impl Into<String>, kind: CustomKind) -> Self {
        Self {
            open: open.into(),
            close: close.into(),
            kind,
            fence: None,
        }
    }

    /// Treat unclosed `fence` code blocks as unterminated markers.
    #[must_use]
    pub fn with_fence(mut self, fence: char) -> Self {
        self.fence = Some(fence);
        self
    }
}

/// Hook for rewriting raw markdown before the base grammar sees it.
pub trait TextPlugin: Send + Sync {
    /// Rewrite `source`. Must be pure; returns borrowed input when nothing changed.
    fn transform<'a>(&self, source: &'a str) -> Cow<'a, str>;

    /// Tag pair the rewrite produces, if it should become a custom node.
    fn pseudo_tag(&self) -> Option<&PseudoTag> {
        None
    }
}

/// Pattern substitution rule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegexRule {
    /// Pattern source. Compiled case-insensitively.
    pub pattern: String,
    /// Capture group holding the content to preserve.
    pub content_group: usize,
    /// Replacement for the whole match; [`CONTENT_PLACEHOLDER`] marks the content.
    pub template: String,
}

impl RegexRule {
    #[must_use]
    pub fn new(pattern: impl Into<String>, content_group: usize, template: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            content_group,
            template: template.into(),
        }
    }

    /// Render the template for one match's content.
    #[must_use]
    pub fn rewrite(&self, content: &str) -> String {
        self.template.replace(CONTENT_PLACEHOLDER, content)
    }
}

/// Text plugin driven by a [`RegexRule`].
///
/// All matches are found against the original input in one pass and replaced
/// independently, so a replacement never feeds another match.
#[derive(Clone, Debug)]
pub struct RegexPlugin {
    rule: RegexRule,
    regex: Regex,
    pseudo_tag: Option<PseudoTag>,
}

impl RegexPlugin {
    /// Compile a rule.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidPattern`] if the pattern does not
    /// compile and [`ConfigurationError::InvalidRule`] if the content group does
    /// not exist or the template does not preserve the content.
    pub fn new(rule: RegexRule) -> Result<Self, ConfigurationError> {
        let regex = RegexBuilder::new(&rule.pattern)
            .case_insensitive(true)
            .build()?;
        Self::from_regex(rule, regex)
    }

    /// Use an already compiled regex for `rule`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidRule`] if the content group does not
    /// exist or the template does not preserve the content.
    pub fn from_regex(rule: RegexRule, regex: Regex) -> Result<Self, ConfigurationError> {
        if rule.content_group >= regex.captures_len() {
            return Err(ConfigurationError::InvalidRule {
                pattern: rule.pattern,
                reason: format!("capture group {} does not exist", rule.content_group),
            });
        }
        if !rule.template.contains(CONTENT_PLACEHOLDER) {
            return Err(ConfigurationError::InvalidRule {
                pattern: rule.pattern,
                reason: format!("template does not contain {CONTENT_PLACEHOLDER}"),
            });
        }
        Ok(Self {
            rule,
            regex,
            pseudo_tag: None,
        })
    }

    /// Lift the rewrite's tag pair into custom nodes of `tag.kind`.
    #[must_use]
    pub fn with_pseudo_tag(mut self, tag: PseudoTag) -> Self {
        self.pseudo_tag = Some(tag);
        self
    }

    /// The rule this plugin applies.
    #[must_use]
    pub fn rule(&self) -> &RegexRule {
        &self.rule
    }
}

impl TextPlugin for RegexPlugin {
    fn transform<'a>(&self, source: &'a str) -> Cow<'a, str> {
        self.regex.replace_all(source, |caps: &Captures<'_>| {
            let content = caps
                .get(self.rule.content_group)
                .map_or("", |m| m.as_str());
            self.rule.rewrite(content)
        })
    }

    fn pseudo_tag(&self) -> Option<&PseudoTag> {
        self.pseudo_tag.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn bracket_plugin() -> RegexPlugin {
        RegexPlugin::new(RegexRule::new(r"\[\[(.*?)\]\]", 1, "<b>{content}</b>")).unwrap()
    }

    #[test]
    fn test_transform_replaces_each_match() {
        let plugin = bracket_plugin();
        assert_eq!(
            plugin.transform("[[a]] and [[b]]"),
            "<b>a</b> and <b>b</b>"
        );
    }

    #[test]
    fn test_transform_borrows_when_unchanged() {
        let plugin = bracket_plugin();
        assert!(matches!(plugin.transform("plain"), Cow::Borrowed("plain")));
    }

    #[test]
    fn test_identical_matches_replaced_independently() {
        let plugin = bracket_plugin();
        assert_eq!(plugin.transform("[[x]][[x]]"), "<b>x</b><b>x</b>");
    }

    #[test]
    fn test_replacement_is_not_rematched() {
        let plugin =
            RegexPlugin::new(RegexRule::new(r"@@(\w+)@@", 1, "@@@@{content}@@@@")).unwrap();
        assert_eq!(plugin.transform("@@a@@"), "@@@@a@@@@");
    }

    #[test]
    fn test_case_insensitive() {
        let plugin =
            RegexPlugin::new(RegexRule::new(r"<center>(.*?)</center>", 1, "[{content}]")).unwrap();
        assert_eq!(plugin.transform("<CENTER>x</Center>"), "[x]");
    }

    #[test]
    fn test_invalid_pattern() {
        let result = RegexPlugin::new(RegexRule::new(r"(unclosed", 1, "{content}"));
        assert!(matches!(result, Err(ConfigurationError::InvalidPattern(_))));
    }

    #[test]
    fn test_missing_group() {
        let result = RegexPlugin::new(RegexRule::new(r"~~~", 1, "{content}"));
        assert!(matches!(result, Err(ConfigurationError::InvalidRule { .. })));
    }

    #[test]
    fn test_template_without_placeholder() {
        let result = RegexPlugin::new(RegexRule::new(r"~(.*)~", 1, "<hr>"));
        assert!(matches!(result, Err(ConfigurationError::InvalidRule { .. })));
    }

    #[test]
    fn test_pseudo_tag() {
        let plugin = bracket_plugin().with_pseudo_tag(PseudoTag::new("<b>", "</b>", CustomKind::Center));
        assert_eq!(plugin.pseudo_tag().map(|tag| tag.kind), Some(CustomKind::Center));
        assert!(bracket_plugin().pseudo_tag().is_none());
    }
}
