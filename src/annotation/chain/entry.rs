//! Chain entries and retirement records.

use std::fmt;

use crate::annotation::traits::LineAnnotator;
use crate::annotation::types::ProviderId;

/// One live annotator in a chain.
pub(crate) struct ChainEntry {
    pub(crate) provider: ProviderId,
    pub(crate) name: String,
    /// Position in the chain at construction; stays fixed as the chain
    /// shrinks.
    pub(crate) layer: usize,
    pub(crate) annotator: Box<dyn LineAnnotator>,
}

impl ChainEntry {
    pub(crate) fn new(
        provider: ProviderId,
        name: impl Into<String>,
        layer: usize,
        annotator: Box<dyn LineAnnotator>,
    ) -> Self {
        Self {
            provider,
            name: name.into(),
            layer,
            annotator,
        }
    }

    pub(crate) fn retire(self, line: usize, reason: RetireReason) -> Retired {
        Retired {
            provider: self.provider,
            name: self.name,
            line,
            reason,
        }
    }
}

impl fmt::Debug for ChainEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainEntry")
            .field("provider", &self.provider)
            .field("name", &self.name)
            .field("layer", &self.layer)
            .finish_non_exhaustive()
    }
}

/// Why an annotator left its chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetireReason {
    /// Returned `Continuation::Stop`.
    Finished,
    /// Returned an error.
    Failed(String),
    /// Panicked.
    Panicked(String),
}

impl fmt::Display for RetireReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetireReason::Finished => f.write_str("finished"),
            RetireReason::Failed(reason) => write!(f, "failed: {reason}"),
            RetireReason::Panicked(reason) => write!(f, "panicked: {reason}"),
        }
    }
}

/// A retired annotator, kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retired {
    pub provider: ProviderId,
    pub name: String,
    /// Line on which it retired.
    pub line: usize,
    pub reason: RetireReason,
}
