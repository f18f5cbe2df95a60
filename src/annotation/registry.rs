//! Provider registry.
//!
//! `ProviderRegistry` is owned by the host. It holds provider registrations
//! in registration order and hands out immutable [`ProviderSnapshot`]s.
//! Registering or unregistering replaces the list (copy-on-write), so a
//! snapshot, and any chain built from it, is unaffected by later changes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use arc_swap::ArcSwap;

use super::binding::{BoundType, resolve_bound_type};
use super::chain::AnnotationChain;
use super::owner::Owner;
use super::session::SessionResolver;
use super::traits::AnnotatorProvider;
use super::types::ProviderId;

/// One registration of a provider.
pub struct RegisteredProvider {
    id: ProviderId,
    provider: Arc<dyn AnnotatorProvider>,
    /// Resolved on first use.
    bound: OnceLock<BoundType>,
}

impl RegisteredProvider {
    fn new(id: ProviderId, provider: Arc<dyn AnnotatorProvider>) -> Self {
        Self {
            id,
            provider,
            bound: OnceLock::new(),
        }
    }

    pub fn id(&self) -> ProviderId {
        self.id
    }

    pub fn name(&self) -> &str {
        self.provider.name()
    }

    pub fn provider(&self) -> &dyn AnnotatorProvider {
        self.provider.as_ref()
    }

    /// Bound type, resolved once per registration.
    pub fn bound_type(&self) -> BoundType {
        *self
            .bound
            .get_or_init(|| resolve_bound_type(self.provider.as_ref()))
    }

    /// Whether this registration applies to `owner`.
    pub fn admits(&self, owner: &dyn Owner) -> bool {
        self.bound_type().admits(owner)
    }
}

impl std::fmt::Debug for RegisteredProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredProvider")
            .field("id", &self.id)
            .field("name", &self.name())
            .field("bound", &self.bound.get())
            .finish()
    }
}

/// Point-in-time, immutable view of the registered providers.
#[derive(Clone, Default)]
pub struct ProviderSnapshot {
    providers: Arc<Vec<Arc<RegisteredProvider>>>,
}

impl ProviderSnapshot {
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Registrations in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<RegisteredProvider>> {
        self.providers.iter()
    }

    pub fn get(&self, id: ProviderId) -> Option<&Arc<RegisteredProvider>> {
        self.providers.iter().find(|p| p.id == id)
    }

    /// First registration with this name.
    pub fn find_by_name(&self, name: &str) -> Option<&Arc<RegisteredProvider>> {
        self.providers.iter().find(|p| p.name() == name)
    }
}

impl std::fmt::Debug for ProviderSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.providers.iter()).finish()
    }
}

/// Summary row returned by [`ProviderRegistry::list_providers`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderInfo {
    pub id: ProviderId,
    pub name: String,
    pub bound: BoundType,
}

/// Ordered, thread-safe provider registry.
pub struct ProviderRegistry {
    providers: ArcSwap<Vec<Arc<RegisteredProvider>>>,
    next_id: AtomicU64,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            providers: ArcSwap::from_pointee(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Append a provider. Later registrations draw on top of earlier ones.
    pub fn register(&self, provider: Arc<dyn AnnotatorProvider>) -> ProviderId {
        let id = ProviderId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let entry = Arc::new(RegisteredProvider::new(id, provider));
        crate::debug_info!("SESSION", "registered provider {} as {}", entry.name(), id);
        self.providers.rcu(|current| {
            let mut next = Vec::with_capacity(current.len() + 1);
            next.extend(current.iter().cloned());
            next.push(Arc::clone(&entry));
            next
        });
        id
    }

    /// Remove a registration. Returns false when `id` is not registered.
    pub fn unregister(&self, id: ProviderId) -> bool {
        let previous = self.providers.rcu(|current| {
            current
                .iter()
                .filter(|p| p.id != id)
                .cloned()
                .collect::<Vec<_>>()
        });
        let removed = previous.iter().any(|p| p.id == id);
        if removed {
            crate::debug_info!("SESSION", "unregistered provider {}", id);
        }
        removed
    }

    /// Replace every registration with `providers`, in order, as one change.
    ///
    /// Concurrent snapshots see either the old list or the new one, never a
    /// partial list.
    pub fn replace_all<I>(&self, providers: I) -> Vec<ProviderId>
    where
        I: IntoIterator<Item = Arc<dyn AnnotatorProvider>>,
    {
        let next: Vec<Arc<RegisteredProvider>> = providers
            .into_iter()
            .map(|provider| {
                let id = ProviderId(self.next_id.fetch_add(1, Ordering::Relaxed));
                Arc::new(RegisteredProvider::new(id, provider))
            })
            .collect();
        let ids = next.iter().map(|p| p.id).collect();
        crate::debug_info!("SESSION", "replaced registry with {} providers", next.len());
        self.providers.store(Arc::new(next));
        ids
    }

    /// Drop every registration.
    pub fn clear(&self) {
        self.providers.store(Arc::new(Vec::new()));
    }

    pub fn len(&self) -> usize {
        self.providers.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.load().is_empty()
    }

    /// Current registrations. Lock-free; later changes do not affect it.
    pub fn snapshot(&self) -> ProviderSnapshot {
        ProviderSnapshot {
            providers: self.providers.load_full(),
        }
    }

    /// Registrations with their resolved bound types, in order.
    pub fn list_providers(&self) -> Vec<ProviderInfo> {
        self.snapshot()
            .iter()
            .map(|p| ProviderInfo {
                id: p.id(),
                name: p.name().to_string(),
                bound: p.bound_type(),
            })
            .collect()
    }

    /// Build the annotation chain for a new viewing session of `owner`.
    pub fn start_session(&self, owner: &dyn Owner) -> AnnotationChain {
        SessionResolver::resolve(owner, &self.snapshot())
    }
}
