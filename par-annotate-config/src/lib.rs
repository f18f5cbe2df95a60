//! Configuration system for the par-annotate console annotator.
//!
//! This crate provides configuration loading, saving, and default values
//! for the annotation host. It includes:
//!
//! - Per-annotator toggles and keyword highlighting rules
//! - Client asset lookup settings
//! - Log level selection
//! - Configuration file watching

pub mod config;
pub mod defaults;
pub mod error;
mod types;
#[cfg(feature = "watcher")]
pub mod watcher;

pub use config::{AnnotatorsConfig, AssetsConfig, Config, KeywordRule, KeywordsConfig, Toggle};
pub use error::ConfigError;
pub use types::LogLevel;
#[cfg(feature = "watcher")]
pub use watcher::{ConfigReloadEvent, ConfigWatcher};
