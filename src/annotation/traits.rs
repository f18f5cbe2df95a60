//! Core traits for console annotation.

use super::binding::BoundType;
use super::owner::Owner;
use super::types::{ConsoleLine, Contribution};

/// Errors raised by providers and annotators.
///
/// None of these are fatal to a session: the offending provider or
/// annotator is dropped and the rest of the chain carries on.
#[derive(Debug, thiserror::Error)]
pub enum AnnotateError {
    /// A provider could not build an annotator for this owner.
    #[error("provider failed to create annotator: {0}")]
    CreateFailed(String),
    /// An annotator failed on a line.
    #[error("annotation failed on line {line}: {reason}")]
    LineFailed { line: usize, reason: String },
    /// An owner was handed to a provider bound to a different type.
    #[error("owner type mismatch: expected {expected}, got {actual}")]
    OwnerMismatch {
        expected: &'static str,
        actual: &'static str,
    },
}

/// A provider's bound-type declaration could not be resolved.
#[derive(Debug, thiserror::Error)]
#[error("cannot resolve bound type for {provider}: {reason}")]
pub struct BindError {
    pub provider: String,
    pub reason: String,
}

/// Factory for stateful per-session annotators.
///
/// One provider instance is shared by every session; all methods take
/// `&self` and may be called concurrently.
pub trait AnnotatorProvider: Send + Sync {
    /// Fully-qualified name (`crate::module::Type`). Used in logs and to
    /// derive the provider's asset path.
    fn name(&self) -> &str;

    /// Owner type this provider applies to. Defaults to every owner.
    fn bound_type(&self) -> Result<BoundType, BindError> {
        Ok(BoundType::Any)
    }

    /// Create the annotator for one viewing session of `owner`.
    ///
    /// Only called with owners admitted by [`Self::bound_type`]. Return
    /// `Ok(None)` to stay out of this session.
    fn create_annotator(
        &self,
        owner: &dyn Owner,
    ) -> Result<Option<Box<dyn LineAnnotator>>, AnnotateError>;
}

/// Stateful per-session line annotator.
///
/// The first line an annotator sees may be any line of the stream; whatever
/// it needs from earlier lines has to live in its own state or be given up
/// on. Once it returns [`super::Continuation::Stop`] or an error it is never
/// called again.
pub trait LineAnnotator: Send {
    fn annotate(&mut self, line: &ConsoleLine<'_>) -> Result<Contribution, AnnotateError>;
}
