//! Console annotation: per-session annotator chains over streamed log lines.
//!
//! A host holds a [`ProviderRegistry`] of [`AnnotatorProvider`]s. When a
//! client starts viewing the console of some [`Owner`], the host calls
//! [`ProviderRegistry::start_session`], which selects the providers whose
//! bound type admits the owner and asks each for a stateful
//! [`LineAnnotator`]. The resulting [`AnnotationChain`] is then fed lines and
//! returns [`Markup`] for each.
//!
//! ```text
//! owner ──► start_session ──► AnnotationChain ──annotate(line)──► Markup
//!               ▲
//!     ProviderSnapshot (registration order = layer order)
//! ```
//!
//! Providers may also ship a client script, located and served by the
//! [`AssetExchange`].
//!
//! Sub-modules:
//! - [`owner`]: `Owner` trait, `TypeKey`, built-in owners
//! - [`binding`]: `BoundType` resolution and the `TypedProvider` adapter
//! - [`registry`]: `ProviderRegistry` and `ProviderSnapshot`
//! - [`session`]: `SessionResolver`
//! - [`chain`]: `AnnotationChain`
//! - [`assets`]: `AssetExchange` and asset sources

pub mod assets;
pub mod binding;
pub mod chain;
pub mod owner;
pub mod registry;
pub mod session;
pub mod traits;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use assets::{Asset, AssetError, AssetExchange, AssetSource, DirAssetSource, StaticAssetSource};
pub use binding::{BoundType, OwnerFactory, TypedProvider};
pub use chain::{AnnotationChain, RetireReason, Retired};
pub use owner::{Build, LogFile, Owner, Run, TypeKey};
pub use registry::{ProviderInfo, ProviderRegistry, ProviderSnapshot, RegisteredProvider};
pub use session::SessionResolver;
pub use traits::{AnnotateError, AnnotatorProvider, BindError, LineAnnotator};
pub use types::{
    ConsoleLine, Continuation, Contribution, Decoration, Markup, MarkupSpan, ProviderId, Segment,
    Span, SpanStyle,
};
