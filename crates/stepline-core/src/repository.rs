use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

// ─── SourceName ───────────────────────────────────────────────────────────

/// Name under which an artifact is registered (e.g. `"source"`, `"build-output"`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceName(String);

impl SourceName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourceName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for SourceName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ─── Artifact ─────────────────────────────────────────────────────────────

/// Something an action produced and left on disk for later actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    path: PathBuf,
}

impl Artifact {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

// ─── ArtifactRepository ───────────────────────────────────────────────────

/// Shared store of named artifacts for one pipeline step.
///
/// Cloning yields another handle to the same store; use
/// [`ArtifactRepository::ptr_eq`] to tell handles apart. Registrations are
/// visible to every holder of the handle immediately.
///
/// A [`scoped_repository`](Self::scoped_repository) sees everything its
/// parent has, while its own registrations stay local to it.
#[derive(Clone, Default)]
pub struct ArtifactRepository {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    sources: RwLock<BTreeMap<SourceName, Artifact>>,
    parent: Option<ArtifactRepository>,
}

impl ArtifactRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_source(&self, name: impl Into<SourceName>, artifact: Artifact) {
        self.inner
            .sources
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), artifact);
    }

    /// Look `name` up here, then in each parent in turn.
    pub fn source_for(&self, name: &SourceName) -> Option<Artifact> {
        let local = self
            .inner
            .sources
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned();
        match local {
            Some(artifact) => Some(artifact),
            None => self.inner.parent.as_ref()?.source_for(name),
        }
    }

    /// Every visible artifact; local entries shadow the parent's.
    pub fn as_map(&self) -> BTreeMap<SourceName, Artifact> {
        let mut map = match &self.inner.parent {
            Some(parent) => parent.as_map(),
            None => BTreeMap::new(),
        };
        let sources = self
            .inner
            .sources
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        map.extend(sources.iter().map(|(k, v)| (k.clone(), v.clone())));
        map
    }

    pub fn names(&self) -> Vec<SourceName> {
        self.as_map().into_keys().collect()
    }

    pub fn scoped_repository(&self) -> ArtifactRepository {
        ArtifactRepository {
            inner: Arc::new(Inner {
                sources: RwLock::default(),
                parent: Some(self.clone()),
            }),
        }
    }

    /// `true` when both handles point at the same store.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }
}

impl fmt::Debug for ArtifactRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArtifactRepository")
            .field("sources", &self.as_map())
            .finish()
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────
