//! Annotation chain: the per-session list of live annotators.
//!
//! `AnnotationChain` is built once by the session resolver and then driven
//! line by line by the host. It only ever shrinks: annotators that stop or
//! fail are retired and never called again.
//!
//! Sub-modules:
//! - [`entry`]: `ChainEntry` and retirement bookkeeping
//! - [`chain_impl`]: `AnnotationChain` struct and all methods

mod chain_impl;
mod entry;


pub use chain_impl::AnnotationChain;
pub(crate) use entry::ChainEntry;
pub use entry::{RetireReason, Retired};
