//! Default value functions referenced by `#[serde(default = "...")]`.

use crate::config::KeywordRule;

pub fn bool_true() -> bool {
    true
}

/// One day, the cache lifetime advertised for provider scripts.
pub fn asset_max_age_secs() -> u64 {
    86_400
}

pub fn watcher_debounce_ms() -> u64 {
    100
}

/// Built-in keyword highlighting rules.
///
/// Colors follow the Catppuccin Mocha-inspired palette used for rendered output.
pub fn keyword_rules() -> Vec<KeywordRule> {
    vec![
        KeywordRule::new("ERROR", "error", [243, 139, 168], true),
        KeywordRule::new("FATAL", "error", [243, 139, 168], true),
        KeywordRule::new("FAILURE", "error", [243, 139, 168], true),
        KeywordRule::new("WARNING", "warning", [249, 226, 175], false),
        KeywordRule::new("WARN", "warning", [249, 226, 175], false),
        KeywordRule::new("SUCCESS", "success", [166, 227, 161], true),
    ]
}
