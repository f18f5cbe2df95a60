//! Built-in annotator providers.
//!
//! | Provider | Applies to |
//! |----------|------------|
//! | [`KeywordProvider`] | every owner |
//! | [`LinkProvider`] | every owner |
//! | [`StackTraceProvider`] | every owner |
//! | [`PreambleProvider`] | owners that are runs (`dyn Run`) |
//! | [`BuildReferenceProvider`] | [`crate::annotation::Build`] |

pub mod build_refs;
pub mod keyword;
pub mod links;
pub mod preamble;
pub mod stack_trace;

pub use build_refs::{BuildReferenceProvider, BuildReferences};
pub use keyword::KeywordProvider;
pub use links::LinkProvider;
pub use preamble::PreambleProvider;
pub use stack_trace::StackTraceProvider;

/// Client scripts bundled with the built-in providers, by provider name.
pub fn builtin_assets() -> Vec<(&'static str, &'static [u8])> {
    vec![(LinkProvider::NAME, links::SCRIPT)]
}
