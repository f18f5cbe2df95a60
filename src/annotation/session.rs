//! Session resolution: from an owner and a provider snapshot to a chain.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};

use super::chain::{AnnotationChain, ChainEntry};
use super::owner::Owner;
use super::registry::ProviderSnapshot;

/// Builds the annotator chain for one viewing session.
///
/// Resolution only reads shared state: the snapshot and the owner. Nothing
/// it does is visible to other sessions.
pub struct SessionResolver;

impl SessionResolver {
    /// Resolve the chain for `owner`.
    ///
    /// 1. Keep registrations whose bound type admits the owner.
    /// 2. Ask each, in snapshot order, for an annotator.
    /// 3. Skip providers that decline, fail or panic.
    ///
    /// The chain's layer order is the snapshot order. An empty chain is a
    /// valid result.
    pub fn resolve(owner: &dyn Owner, snapshot: &ProviderSnapshot) -> AnnotationChain {
        let mut entries = Vec::new();
        let mut candidates = 0usize;

        for registered in snapshot.iter() {
            if !registered.admits(owner) {
                crate::debug_trace!(
                    "SESSION",
                    "{} ({}) does not apply to {}",
                    registered.name(),
                    registered.bound_type(),
                    owner.display_name()
                );
                continue;
            }
            candidates += 1;

            let created =
                catch_unwind(AssertUnwindSafe(|| registered.provider().create_annotator(owner)));
            match created {
                Ok(Ok(Some(annotator))) => {
                    let layer = entries.len();
                    entries.push(ChainEntry::new(
                        registered.id(),
                        registered.name(),
                        layer,
                        annotator,
                    ));
                }
                Ok(Ok(None)) => {
                    crate::debug_trace!(
                        "SESSION",
                        "{} declined {}",
                        registered.name(),
                        owner.display_name()
                    );
                }
                Ok(Err(e)) => {
                    log::warn!(
                        "Provider {} failed for {}: {}",
                        registered.name(),
                        owner.display_name(),
                        e
                    );
                }
                Err(payload) => {
                    log::warn!(
                        "Provider {} panicked for {}: {}",
                        registered.name(),
                        owner.display_name(),
                        panic_message(payload.as_ref())
                    );
                }
            }
        }

        crate::debug_log!(
            "SESSION",
            "session for {}: {} registered, {} applicable, {} annotators",
            owner.display_name(),
            snapshot.len(),
            candidates,
            entries.len()
        );

        AnnotationChain::from_entries(entries)
    }
}

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}
