//! Owners: the domain objects whose console output is being viewed.
//!
//! The annotation core never inspects an owner beyond its runtime type and
//! the supertypes it declares. Providers that need more downcast to the
//! concrete type they are bound to (see [`super::binding::TypedProvider`]).

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;

/// Identifies a runtime type. Equality and hashing use the `TypeId` only;
/// the name is kept for logs and listings.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    /// Key for `T`. Trait-object types (`dyn Run`) are valid keys and act as
    /// interfaces that owners opt into via [`Owner::supertypes`].
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn type_id(&self) -> TypeId {
        self.id
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A domain object that owns a console stream.
///
/// Implementations must be `Send + Sync`: one owner may back many concurrent
/// viewing sessions.
pub trait Owner: Any + Send + Sync {
    /// The owner's runtime type.
    fn runtime_type(&self) -> TypeKey {
        TypeKey::of::<Self>()
    }

    /// Additional types this owner is assignable to (interfaces, parent
    /// kinds). The runtime type itself is implied.
    fn supertypes(&self) -> Vec<TypeKey> {
        Vec::new()
    }

    /// Short human-readable label used in logs.
    fn display_name(&self) -> String {
        self.runtime_type().name().to_string()
    }
}

impl dyn Owner {
    /// Downcast to a concrete owner type.
    pub fn downcast_ref<T: Owner>(&self) -> Option<&T> {
        let any: &dyn Any = self;
        any.downcast_ref::<T>()
    }
}

/// Marker interface for owners that represent a job run (anything that prints
/// a run preamble such as `Started by user ...`).
pub trait Run {}

/// A build of a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Build {
    /// Job name.
    pub job: String,
    /// Build number.
    pub number: u64,
    /// Base URL of the job (e.g. `https://ci.example.com/job/app`), when known.
    pub job_url: Option<String>,
}

impl Build {
    pub fn new(job: impl Into<String>, number: u64) -> Self {
        Self {
            job: job.into(),
            number,
            job_url: None,
        }
    }

    pub fn with_job_url(mut self, url: impl Into<String>) -> Self {
        self.job_url = Some(url.into());
        self
    }
}

impl Run for Build {}

impl Owner for Build {
    fn supertypes(&self) -> Vec<TypeKey> {
        vec![TypeKey::of::<dyn Run>()]
    }

    fn display_name(&self) -> String {
        format!("{}#{}", self.job, self.number)
    }
}

/// A plain log file with no run semantics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFile {
    pub path: PathBuf,
}

impl LogFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Owner for LogFile {
    fn display_name(&self) -> String {
        self.path.display().to_string()
    }
}
