//! Configuration structures for par-annotate.
//!
//! Maps to `~/.config/par-annotate/config.yaml`. Every field carries a serde
//! default so a partial (or empty) file is always a valid configuration.
//!
//! Sub-modules:
//! - [`persistence`]: load/save, path helpers, validation

mod persistence;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::defaults;
use crate::types::LogLevel;

/// Top-level configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Log level for the debug log file.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Built-in annotator settings.
    #[serde(default)]
    pub annotators: AnnotatorsConfig,

    /// Client asset (provider script) settings.
    #[serde(default)]
    pub assets: AssetsConfig,

    /// Debounce delay for config hot reload, in milliseconds.
    #[serde(default = "defaults::watcher_debounce_ms")]
    pub reload_debounce_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            annotators: AnnotatorsConfig::default(),
            assets: AssetsConfig::default(),
            reload_debounce_ms: defaults::watcher_debounce_ms(),
        }
    }
}

/// Per-annotator toggles (lives under `annotators:`).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotatorsConfig {
    /// Keyword highlighting.
    #[serde(default)]
    pub keywords: KeywordsConfig,
    /// URL hyperlinking.
    #[serde(default)]
    pub links: Toggle,
    /// Exception / stack frame styling.
    #[serde(default)]
    pub stack_traces: Toggle,
    /// Run preamble styling (`Started by ...`).
    #[serde(default)]
    pub preamble: Toggle,
    /// `#123` build reference links.
    #[serde(default)]
    pub build_refs: Toggle,
}

/// Simple enabled flag for annotators without further settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toggle {
    #[serde(default = "defaults::bool_true")]
    pub enabled: bool,
}

impl Default for Toggle {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Keyword highlighting settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KeywordsConfig {
    #[serde(default = "defaults::bool_true")]
    pub enabled: bool,

    /// Words to highlight. Matching is case-sensitive and whole-word.
    #[serde(default = "defaults::keyword_rules")]
    pub rules: Vec<KeywordRule>,
}

impl Default for KeywordsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rules: defaults::keyword_rules(),
        }
    }
}

/// A single keyword → style mapping.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordRule {
    /// The word to match.
    pub word: String,
    /// Style class attached to the span (e.g. `error`).
    #[serde(default = "default_keyword_class")]
    pub class: String,
    /// Foreground color [r, g, b].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<[u8; 3]>,
    #[serde(default)]
    pub bold: bool,
}

fn default_keyword_class() -> String {
    "keyword".to_string()
}

impl KeywordRule {
    pub fn new(word: &str, class: &str, color: [u8; 3], bold: bool) -> Self {
        Self {
            word: word.to_string(),
            class: class.to_string(),
            color: Some(color),
            bold,
        }
    }
}

/// Provider script lookup settings (lives under `assets:`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetsConfig {
    /// Optional directory searched for `<provider path>/script.js` before the
    /// scripts bundled with the built-in providers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,

    /// Cache lifetime advertised when serving a script, in seconds.
    #[serde(default = "defaults::asset_max_age_secs")]
    pub max_age_secs: u64,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            dir: None,
            max_age_secs: defaults::asset_max_age_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_yaml_is_default() {
        let config: Config = serde_yaml_ng::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
        assert!(config.annotators.keywords.enabled);
        assert_eq!(config.assets.max_age_secs, 86_400);
    }

    #[test]
    fn test_partial_annotator_section() {
        let yaml = r#"
annotators:
  links:
    enabled: false
  keywords:
    rules:
      - word: BOOM
        color: [1, 2, 3]
"#;
        let config: Config = serde_yaml_ng::from_str(yaml).unwrap();
        assert!(!config.annotators.links.enabled);
        assert!(config.annotators.stack_traces.enabled);
        assert!(config.annotators.keywords.enabled);
        assert_eq!(config.annotators.keywords.rules.len(), 1);
        let rule = &config.annotators.keywords.rules[0];
        assert_eq!(rule.word, "BOOM");
        assert_eq!(rule.class, "keyword");
        assert_eq!(rule.color, Some([1, 2, 3]));
        assert!(!rule.bold);
    }

    #[test]
    fn test_default_keywords_cover_error() {
        let config = Config::default();
        assert!(
            config
                .annotators
                .keywords
                .rules
                .iter()
                .any(|r| r.word == "ERROR" && r.class == "error")
        );
    }
}
