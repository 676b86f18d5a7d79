//! Type-state wrapper recording what has been proven about a path.
use crate::{ConfinedFsError, Result};
use soft_canonicalize::soft_canonicalize;
use std::ffi::OsStr;
use std::ops::Deref;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Raw;
#[derive(Debug, Clone)]
pub struct Canonicalized;
#[derive(Debug, Clone)]
pub struct Exists;
#[derive(Debug, Clone)]
pub struct Admitted;

#[derive(Debug, Clone)]
pub struct PathHistory<History> {
    inner: PathBuf,
    _marker: std::marker::PhantomData<History>,
}

impl<H> AsRef<Path> for PathHistory<H> {
    #[inline]
    fn as_ref(&self) -> &Path {
        &self.inner
    }
}

impl<H> Deref for PathHistory<H> {
    type Target = Path;
    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl PathHistory<Raw> {
    #[inline]
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        PathHistory {
            inner: path.into(),
            _marker: std::marker::PhantomData,
        }
    }
}

impl<H> PathHistory<H> {
    #[inline]
    pub fn into_inner(self) -> PathBuf {
        self.inner
    }

    #[inline]
    fn retag<N>(self) -> PathHistory<N> {
        PathHistory {
            inner: self.inner,
            _marker: std::marker::PhantomData,
        }
    }

    /// Anchors a relative path at `anchor` (absolute paths are kept as-is), then canonicalizes.
    ///
    /// The process working directory is never consulted: `anchor` must be absolute.
    pub fn resolve_against(self, anchor: &Path) -> Result<PathHistory<(H, Canonicalized)>> {
        let target = if self.inner.is_absolute() {
            self.inner
        } else {
            anchor.join(&self.inner)
        };
        PathHistory::<H> {
            inner: target,
            _marker: std::marker::PhantomData,
        }
        .canonicalize()
    }

    pub fn canonicalize(self) -> Result<PathHistory<(H, Canonicalized)>> {
        let canon = soft_canonicalize(&self.inner)
            .map_err(|e| ConfinedFsError::path_resolution(self.inner.clone(), e))?;
        Ok(PathHistory {
            inner: canon,
            _marker: std::marker::PhantomData,
        })
    }

    pub fn verify_exists(self) -> Option<PathHistory<(H, Exists)>> {
        if self.inner.exists() {
            Some(self.retag())
        } else {
            None
        }
    }

    /// Joins a single directory-entry name without resolving it.
    ///
    /// Returns `None` unless `name` is exactly one normal component, so the result stays a
    /// direct child of this path. The history describes the parent; the final name itself is
    /// never followed.
    pub fn entry(&self, name: &OsStr) -> Option<Self> {
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Some(PathHistory {
                inner: self.inner.join(name),
                _marker: std::marker::PhantomData,
            }),
            _ => None,
        }
    }
}

impl<H> PathHistory<(H, Canonicalized)> {
    /// Admits the path if it equals or descends from `root`.
    #[inline]
    pub fn boundary_check(
        self,
        root: &PathHistory<((Raw, Canonicalized), Exists)>,
    ) -> Result<PathHistory<((H, Canonicalized), Admitted)>> {
        if !self.starts_with(root) {
            return Err(ConfinedFsError::path_escapes_root(
                self.into_inner(),
                root.to_path_buf(),
            ));
        }
        Ok(self.retag())
    }

    /// Admits the path without a boundary check (trusted execution mode).
    #[inline]
    pub fn trust(self) -> PathHistory<((H, Canonicalized), Admitted)> {
        self.retag()
    }
}
