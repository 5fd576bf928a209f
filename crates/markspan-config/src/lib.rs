//! Configuration management for markspan.
//!
//! Parses `markspan.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! ```toml
//! [parser]
//! gfm = true
//!
//! [extensions]
//! enabled = ["center", "webm"]
//!
//! [render]
//! targets = ["html", "plain_text", "rich_text"]
//!
//! [rich_text]
//! display_width = 480
//! block_margin = 24
//! char_width = 8
//! ```

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "markspan.toml";

/// Pipeline configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base grammar configuration.
    pub parser: ParserConfig,
    /// Extensions to register, in registration order.
    pub extensions: ExtensionsConfig,
    /// Render targets the embedding application intends to use.
    pub render: RenderConfig,
    /// Rich-text layout configuration.
    pub rich_text: RichTextConfig,

    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// Base grammar configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Enable GitHub Flavored Markdown (tables, strikethrough, task lists, alerts).
    pub gfm: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self { gfm: true }
    }
}

/// Extension selection.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ExtensionsConfig {
    /// Built-in extension names, in registration order.
    pub enabled: Vec<String>,
}

impl Default for ExtensionsConfig {
    fn default() -> Self {
        Self {
            enabled: vec!["center".to_owned(), "webm".to_owned()],
        }
    }
}

/// Output representation named in configuration.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TargetName {
    /// HTML fragments.
    Html,
    /// Plain text with formatting stripped.
    PlainText,
    /// Flattened text with style spans.
    RichText,
}

impl fmt::Display for TargetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Html => "html",
            Self::PlainText => "plain_text",
            Self::RichText => "rich_text",
        })
    }
}

/// Render configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Declared targets. Every custom node kind must be renderable to each of them.
    pub targets: Vec<TargetName>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            targets: vec![TargetName::Html, TargetName::PlainText, TargetName::RichText],
        }
    }
}

/// Rich-text layout configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RichTextConfig {
    /// Width of the display container, in measurement units.
    pub display_width: u32,
    /// Minimum leading margin of list items.
    pub block_margin: u32,
    /// Advance width of one character for the monospace measurer.
    pub char_width: u32,
}

impl Default for RichTextConfig {
    fn default() -> Self {
        Self {
            display_width: 480,
            block_margin: 24,
            char_width: 8,
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
}

impl Config {
    /// Load configuration.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `markspan.toml` in the current directory and parents,
    /// falling back to defaults when none is found.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails
    /// or validation fails.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            return Self::load_from_file(path);
        }

        let discovered = std::env::current_dir()
            .ok()
            .and_then(|cwd| Self::discover_from(&cwd));
        match discovered {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// Search for a config file in `start` and its parents.
    #[must_use]
    pub fn discover_from(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Parse and validate configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns error if parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&content)?;
        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after parsing.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_extensions()?;
        self.validate_rich_text()?;
        Ok(())
    }

    fn validate_extensions(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for name in &self.extensions.enabled {
            if name.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "extensions.enabled cannot contain empty names".into(),
                ));
            }
            if !seen.insert(name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "extension `{name}` is enabled more than once"
                )));
            }
        }
        Ok(())
    }

    fn validate_rich_text(&self) -> Result<(), ConfigError> {
        let rich = &self.rich_text;
        if rich.display_width == 0 {
            return Err(ConfigError::Validation(
                "rich_text.display_width must be positive".into(),
            ));
        }
        if rich.char_width == 0 {
            return Err(ConfigError::Validation(
                "rich_text.char_width must be positive".into(),
            ));
        }
        if rich.block_margin >= rich.display_width {
            return Err(ConfigError::Validation(
                "rich_text.block_margin must be smaller than rich_text.display_width".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.parser.gfm);
        assert_eq!(config.extensions.enabled, vec!["center", "webm"]);
        assert_eq!(
            config.render.targets,
            vec![TargetName::Html, TargetName::PlainText, TargetName::RichText]
        );
        assert_eq!(config.rich_text.display_width, 480);
        assert!(config.config_path.is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[parser]
gfm = false

[extensions]
enabled = ["webm", "youtube"]

[render]
targets = ["html", "rich_text"]

[rich_text]
display_width = 320
block_margin = 16
char_width = 10
"#;
        let config = Config::from_toml_str(toml).unwrap();

        assert!(!config.parser.gfm);
        assert_eq!(config.extensions.enabled, vec!["webm", "youtube"]);
        assert_eq!(
            config.render.targets,
            vec![TargetName::Html, TargetName::RichText]
        );
        assert_eq!(config.rich_text.display_width, 320);
        assert_eq!(config.rich_text.block_margin, 16);
        assert_eq!(config.rich_text.char_width, 10);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = Config::from_toml_str("[parser]\ngfm = false\n").unwrap();
        assert!(!config.parser.gfm);
        assert_eq!(config.extensions.enabled, vec!["center", "webm"]);
        assert_eq!(config.rich_text.char_width, 8);
    }

    #[test]
    fn test_empty_targets_allowed() {
        let config = Config::from_toml_str("[render]\ntargets = []\n").unwrap();
        assert!(config.render.targets.is_empty());
    }

    #[test]
    fn test_unknown_target_rejected() {
        let result = Config::from_toml_str("[render]\ntargets = [\"pdf\"]\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_duplicate_extension_rejected() {
        let result = Config::from_toml_str("[extensions]\nenabled = [\"webm\", \"webm\"]\n");
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_empty_extension_name_rejected() {
        let result = Config::from_toml_str("[extensions]\nenabled = [\" \"]\n");
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_zero_display_width_rejected() {
        let result = Config::from_toml_str("[rich_text]\ndisplay_width = 0\n");
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_margin_wider_than_display_rejected() {
        let toml = "[rich_text]\ndisplay_width = 100\nblock_margin = 100\n";
        let result = Config::from_toml_str(toml);
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_load_explicit_path_not_found() {
        let result = Config::load(Some(Path::new("/nonexistent/markspan.toml")));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_explicit_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("custom.toml");
        std::fs::write(&path, "[extensions]\nenabled = [\"youtube\"]\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();

        assert_eq!(config.extensions.enabled, vec!["youtube"]);
        assert_eq!(config.config_path, Some(path));
    }

    #[test]
    fn test_discover_from_parent_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        let nested = temp_dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(temp_dir.path().join(CONFIG_FILENAME), "").unwrap();

        let discovered = Config::discover_from(&nested).unwrap();

        assert_eq!(discovered, temp_dir.path().join(CONFIG_FILENAME));
    }

    #[test]
    fn test_discover_prefers_nearest() {
        let temp_dir = tempfile::tempdir().unwrap();
        let nested = temp_dir.path().join("docs");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(temp_dir.path().join(CONFIG_FILENAME), "").unwrap();
        std::fs::write(nested.join(CONFIG_FILENAME), "").unwrap();

        let discovered = Config::discover_from(&nested).unwrap();

        assert_eq!(discovered, nested.join(CONFIG_FILENAME));
    }

    #[test]
    fn test_invalid_toml() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "[parser\ngfm = ").unwrap();

        let result = Config::load(Some(&path));
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_target_name_display() {
        assert_eq!(TargetName::Html.to_string(), "html");
        assert_eq!(TargetName::PlainText.to_string(), "plain_text");
        assert_eq!(TargetName::RichText.to_string(), "rich_text");
    }
}
