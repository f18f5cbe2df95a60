//! Bound-type resolution: which owners a provider applies to.
//!
//! Providers declare their owner type explicitly through
//! [`AnnotatorProvider::bound_type`]. A provider that declares nothing, or
//! whose declaration cannot be resolved, applies to every owner. The
//! registry resolves each registration once and caches the result.

use std::fmt;
use std::marker::PhantomData;
use std::panic::{AssertUnwindSafe, catch_unwind};

use super::owner::{Owner, TypeKey};
use super::traits::{AnnotateError, AnnotatorProvider, BindError, LineAnnotator};

/// Owner type a provider is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoundType {
    /// The universal top type; admits every owner.
    Any,
    /// Admits owners whose runtime type is this type or who declare it
    /// among their supertypes.
    Exactly(TypeKey),
}

impl BoundType {
    pub fn of<T: ?Sized + 'static>() -> Self {
        BoundType::Exactly(TypeKey::of::<T>())
    }

    pub fn is_universal(&self) -> bool {
        matches!(self, BoundType::Any)
    }

    /// Whether `owner` is assignable to this type. Nominal only: the owner
    /// must be the type or declare it.
    pub fn admits(&self, owner: &dyn Owner) -> bool {
        match self {
            BoundType::Any => true,
            BoundType::Exactly(key) => {
                owner.runtime_type() == *key || owner.supertypes().contains(key)
            }
        }
    }
}

impl fmt::Display for BoundType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundType::Any => f.write_str("*"),
            BoundType::Exactly(key) => write!(f, "{key}"),
        }
    }
}

/// Resolve a provider's declaration, falling back to [`BoundType::Any`]
/// when it errors or panics.
pub fn resolve_bound_type(provider: &dyn AnnotatorProvider) -> BoundType {
    match catch_unwind(AssertUnwindSafe(|| provider.bound_type())) {
        Ok(Ok(bound)) => bound,
        Ok(Err(e)) => {
            log::warn!("{e}; binding {} to every owner", provider.name());
            BoundType::Any
        }
        Err(_) => {
            log::warn!(
                "bound_type() panicked for {}; binding to every owner",
                provider.name()
            );
            BoundType::Any
        }
    }
}

/// Factory written against one concrete owner type.
///
/// Wrap it in a [`TypedProvider`] to register it; the adapter declares the
/// bound type and performs the downcast.
pub trait OwnerFactory<T: Owner>: Send + Sync {
    fn name(&self) -> &str;

    fn create(&self, owner: &T) -> Result<Option<Box<dyn LineAnnotator>>, AnnotateError>;
}

/// Adapts an [`OwnerFactory<T>`] into an [`AnnotatorProvider`] bound to `T`.
pub struct TypedProvider<T, F> {
    factory: F,
    _owner: PhantomData<fn(&T)>,
}

impl<T: Owner, F: OwnerFactory<T>> TypedProvider<T, F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            _owner: PhantomData,
        }
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }
}

impl<T: Owner, F: OwnerFactory<T>> AnnotatorProvider for TypedProvider<T, F> {
    fn name(&self) -> &str {
        self.factory.name()
    }

    fn bound_type(&self) -> Result<BoundType, BindError> {
        Ok(BoundType::of::<T>())
    }

    fn create_annotator(
        &self,
        owner: &dyn Owner,
    ) -> Result<Option<Box<dyn LineAnnotator>>, AnnotateError> {
        // An owner may name `T` as a supertype without being a `T`.
        let typed = owner
            .downcast_ref::<T>()
            .ok_or_else(|| AnnotateError::OwnerMismatch {
                expected: std::any::type_name::<T>(),
                actual: owner.runtime_type().name(),
            })?;
        self.factory.create(typed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::owner::{Build, LogFile, Run};
    use crate::annotation::testing::{NeverAnnotator, StaticProvider};

    struct BuildOnly;

    impl OwnerFactory<Build> for BuildOnly {
        fn name(&self) -> &str {
            "tests::BuildOnly"
        }
        fn create(&self, build: &Build) -> Result<Option<Box<dyn LineAnnotator>>, AnnotateError> {
            if build.number == 0 {
                return Ok(None);
            }
            Ok(Some(Box::new(NeverAnnotator)))
        }
    }

    /// Pretends to be a subtype of `Build` without being one.
    struct FakeBuild;
    impl Owner for FakeBuild {
        fn supertypes(&self) -> Vec<TypeKey> {
            vec![TypeKey::of::<Build>()]
        }
    }

    #[test]
    fn test_any_admits_everything() {
        assert!(BoundType::Any.admits(&Build::new("a", 1)));
        assert!(BoundType::Any.admits(&LogFile::new("x.log")));
        assert_eq!(BoundType::Any.to_string(), "*");
    }

    #[test]
    fn test_exact_and_supertype_match() {
        let build = Build::new("a", 1);
        let log = LogFile::new("x.log");
        assert!(BoundType::of::<Build>().admits(&build));
        assert!(!BoundType::of::<Build>().admits(&log));
        assert!(BoundType::of::<dyn Run>().admits(&build));
        assert!(!BoundType::of::<dyn Run>().admits(&log));
    }

    #[test]
    fn test_undeclared_provider_binds_to_any() {
        let provider = StaticProvider::new("tests::Plain");
        assert_eq!(resolve_bound_type(&provider), BoundType::Any);
    }

    #[test]
    fn test_failed_declaration_falls_back_to_any() {
        let provider = StaticProvider::new("tests::Broken").with_bind_error();
        assert_eq!(resolve_bound_type(&provider), BoundType::Any);
    }

    #[test]
    fn test_panicking_declaration_falls_back_to_any() {
        let provider = StaticProvider::new("tests::Panicky").with_bind_panic();
        assert_eq!(resolve_bound_type(&provider), BoundType::Any);
    }

    #[test]
    fn test_typed_provider_declares_and_downcasts() {
        let provider = TypedProvider::new(BuildOnly);
        assert_eq!(resolve_bound_type(&provider), BoundType::of::<Build>());
        assert_eq!(provider.name(), "tests::BuildOnly");

        assert!(provider.create_annotator(&Build::new("a", 3)).unwrap().is_some());
        assert!(provider.create_annotator(&Build::new("a", 0)).unwrap().is_none());
    }

    #[test]
    fn test_typed_provider_rejects_declared_but_foreign_owner() {
        let provider = TypedProvider::new(BuildOnly);
        assert!(BoundType::of::<Build>().admits(&FakeBuild));
        let err = provider.create_annotator(&FakeBuild).err().unwrap();
        assert!(matches!(err, AnnotateError::OwnerMismatch { .. }));
    }
}
