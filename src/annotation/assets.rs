//! Per-provider client assets.
//!
//! A provider may ship one client-side script. Nothing on the provider says
//! so; presence is discovered by convention: the provider's name, with `::`,
//! `.` and `$` turned into `/`, names a directory holding `script.js`.
//! Assets are served under `/annotators/` with a one-day cache lifetime.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use super::registry::ProviderSnapshot;
use super::traits::AnnotatorProvider;

/// File name every provider asset uses.
pub const ASSET_FILE: &str = "script.js";

/// Request prefix assets are served under.
pub const REQUEST_PREFIX: &str = "/annotators/";

pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(86_400);

const CONTENT_TYPE: &str = "application/javascript";

/// Asset path for a provider name, relative to an asset root.
///
/// `par_annotate::providers::links::LinkProvider` becomes
/// `par_annotate/providers/links/LinkProvider/script.js`.
pub fn asset_path(provider_name: &str) -> String {
    let mut path = provider_name.replace("::", "/").replace(['.', '$'], "/");
    path.push('/');
    path.push_str(ASSET_FILE);
    path
}

/// Request path a host serves a provider's asset at.
pub fn request_path(provider_name: &str) -> String {
    format!("{REQUEST_PREFIX}{}", asset_path(provider_name))
}

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    /// No source holds the asset. A normal outcome, not a fault.
    #[error("asset not found: {0}")]
    NotFound(String),
    #[error("failed to read asset {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Raw asset content as returned by a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetContent {
    pub bytes: Vec<u8>,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Where asset files come from.
pub trait AssetSource: Send + Sync {
    /// Short description for logs.
    fn describe(&self) -> String;

    fn contains(&self, path: &str) -> bool;

    /// Load `path`; `Ok(None)` when this source does not hold it.
    fn load(&self, path: &str) -> Result<Option<AssetContent>, AssetError>;
}

/// Assets stored under a directory on disk.
#[derive(Debug, Clone)]
pub struct DirAssetSource {
    root: PathBuf,
}

impl DirAssetSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn file_for(&self, path: &str) -> PathBuf {
        path.split('/')
            .filter(|part| !part.is_empty())
            .fold(self.root.clone(), |acc, part| acc.join(part))
    }
}

impl AssetSource for DirAssetSource {
    fn describe(&self) -> String {
        format!("dir:{}", self.root.display())
    }

    fn contains(&self, path: &str) -> bool {
        self.file_for(path).is_file()
    }

    fn load(&self, path: &str) -> Result<Option<AssetContent>, AssetError> {
        let file = self.file_for(path);
        let bytes = match fs::read(&file) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(AssetError::Io { path: file, source }),
        };
        let last_modified = fs::metadata(&file)
            .and_then(|m| m.modified())
            .ok()
            .map(DateTime::<Utc>::from);
        Ok(Some(AssetContent {
            bytes,
            last_modified,
        }))
    }
}

/// Assets compiled into the binary.
#[derive(Debug, Clone)]
pub struct StaticAssetSource {
    files: HashMap<String, &'static [u8]>,
    /// Reported as the last-modified time of every file.
    loaded_at: DateTime<Utc>,
}

impl Default for StaticAssetSource {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticAssetSource {
    pub fn new() -> Self {
        Self {
            files: HashMap::new(),
            loaded_at: Utc::now(),
        }
    }

    /// Scripts shipped with the built-in providers.
    pub fn builtin() -> Self {
        crate::providers::builtin_assets()
            .into_iter()
            .fold(Self::new(), |source, (name, bytes)| {
                source.with_provider_asset(name, bytes)
            })
    }

    /// Add a file at an explicit asset path.
    pub fn with_file(mut self, path: impl Into<String>, bytes: &'static [u8]) -> Self {
        self.files.insert(path.into(), bytes);
        self
    }

    /// Add the asset for the provider called `provider_name`.
    pub fn with_provider_asset(self, provider_name: &str, bytes: &'static [u8]) -> Self {
        self.with_file(asset_path(provider_name), bytes)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl AssetSource for StaticAssetSource {
    fn describe(&self) -> String {
        format!("static:{} files", self.files.len())
    }

    fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    fn load(&self, path: &str) -> Result<Option<AssetContent>, AssetError> {
        Ok(self.files.get(path).map(|bytes| AssetContent {
            bytes: bytes.to_vec(),
            last_modified: Some(self.loaded_at),
        }))
    }
}

/// A resolved asset, ready to be served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    /// Asset path relative to the asset root.
    pub path: String,
    pub bytes: Vec<u8>,
    pub last_modified: Option<DateTime<Utc>>,
    pub content_type: &'static str,
    pub max_age: Duration,
}

impl Asset {
    /// `Cache-Control` header value.
    pub fn cache_control(&self) -> String {
        format!("public, max-age={}", self.max_age.as_secs())
    }

    /// `Last-Modified` header value (RFC 2822).
    pub fn last_modified_header(&self) -> Option<String> {
        self.last_modified.map(|t| t.to_rfc2822())
    }
}

/// Looks up, caches and serves provider assets.
pub struct AssetExchange {
    sources: Vec<Box<dyn AssetSource>>,
    /// Presence by asset path. Filled on first query.
    presence: RwLock<HashMap<String, bool>>,
    max_age: Duration,
}

impl Default for AssetExchange {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetExchange {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            presence: RwLock::new(HashMap::new()),
            max_age: DEFAULT_MAX_AGE,
        }
    }

    /// Append a source. Sources are consulted in the order added.
    pub fn with_source(mut self, source: impl AssetSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Whether `provider` ships an asset. Cached per asset path.
    pub fn has_asset(&self, provider: &dyn AnnotatorProvider) -> bool {
        let path = asset_path(provider.name());
        if let Some(present) = self.presence.read().get(&path) {
            return *present;
        }
        let present = self.sources.iter().any(|s| s.contains(&path));
        crate::debug_log!(
            "ASSETS",
            "{} asset for {}: {}",
            if present { "found" } else { "no" },
            provider.name(),
            path
        );
        self.presence.write().insert(path, present);
        present
    }

    /// Request path of the provider's asset, when it has one.
    pub fn asset_location(&self, provider: &dyn AnnotatorProvider) -> Option<String> {
        self.has_asset(provider)
            .then(|| request_path(provider.name()))
    }

    /// Load the provider's asset from the first source holding it.
    pub fn resolve_asset(&self, provider: &dyn AnnotatorProvider) -> Result<Asset, AssetError> {
        let path = asset_path(provider.name());
        for source in &self.sources {
            if let Some(content) = source.load(&path)? {
                crate::debug_trace!(
                    "ASSETS",
                    "resolved {} from {} ({} bytes)",
                    path,
                    source.describe(),
                    content.bytes.len()
                );
                return Ok(Asset {
                    path,
                    bytes: content.bytes,
                    last_modified: content.last_modified,
                    content_type: CONTENT_TYPE,
                    max_age: self.max_age,
                });
            }
        }
        Err(AssetError::NotFound(path))
    }

    /// Serve a request path such as `/annotators/a/b/C/script.js`.
    ///
    /// Only assets of providers in `snapshot` are served.
    pub fn serve(&self, request: &str, snapshot: &ProviderSnapshot) -> Result<Asset, AssetError> {
        let not_found = || AssetError::NotFound(request.to_string());
        let path = request.strip_prefix(REQUEST_PREFIX).ok_or_else(not_found)?;
        let provider = snapshot
            .iter()
            .find(|p| asset_path(p.name()) == path)
            .ok_or_else(not_found)?;
        self.resolve_asset(provider.provider())
    }

    /// Forget cached presence, e.g. after the asset directory changed.
    pub fn invalidate(&self) {
        self.presence.write().clear();
    }
}

impl std::fmt::Debug for AssetExchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetExchange")
            .field(
                "sources",
                &self.sources.iter().map(|s| s.describe()).collect::<Vec<_>>(),
            )
            .field("max_age", &self.max_age)
            .finish_non_exhaustive()
    }
}
