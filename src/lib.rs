// Library exports for the par-annotate binary, integration tests and hosts
// embedding the annotation core.
//
// # Lock Usage Policy
//
//   - `arc_swap::ArcSwap`     : read-mostly shared state swapped wholesale
//                               (the provider list). Readers never block.
//   - `parking_lot::RwLock`   : small sync-only caches (asset presence).
//   - `std::sync::OnceLock`  : per-registration values computed once
//                               (bound types) and static regexes.
//
// Sessions themselves hold no locks: an `AnnotationChain` is owned by one
// task and driven through `&mut self`.

/// Application version (root crate version, for use by sub-crates).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[macro_use]
pub mod debug;

pub mod annotation;
pub mod cli;
pub mod config_bridge;
pub mod host;
pub mod providers;
pub mod render;

pub use annotation::{
    AnnotationChain, AnnotatorProvider, AssetExchange, LineAnnotator, Markup, Owner,
    ProviderRegistry,
};
