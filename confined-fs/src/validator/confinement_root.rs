use crate::path::confined_path::ConfinedPath;
use crate::validator::caller_context::{CallerContext, ExecutionMode};
use crate::validator::path_history::*;
use crate::{ConfinedFsError, Result};

use std::io::{Error as IoError, ErrorKind};
use std::path::Path;
use std::sync::Arc;

/// SUMMARY:
/// The canonical directory outside of which sandboxed callers may not read or write.
///
/// DETAILS:
/// Built once at process start (usually from [`crate::SandboxConfig`]) and immutable
/// afterwards. Cloning shares the same canonical path. Every [`ConfinedPath`] handed out by
/// [`ConfinementRoot::admit`] carries the root it was admitted against so children
/// discovered later are re-checked against the same boundary.
///
/// EXAMPLE:
/// ```rust
/// # use confined_fs::{CallerContext, ConfinementRoot};
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let td = tempfile::tempdir()?;
/// let root = ConfinementRoot::try_new(td.path())?;
/// let ctx = CallerContext::sandboxed(td.path())?;
/// assert!(root.admit("notes/today.txt", &ctx).is_ok());
/// assert!(root.admit("../escape.txt", &ctx).is_err());
/// # Ok(()) }
/// ```
pub struct ConfinementRoot {
    path: Arc<PathHistory<((Raw, Canonicalized), Exists)>>,
}

impl Clone for ConfinementRoot {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
        }
    }
}

impl PartialEq for ConfinementRoot {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.path() == other.path()
    }
}

impl Eq for ConfinementRoot {}

impl PartialEq<Path> for ConfinementRoot {
    #[inline]
    fn eq(&self, other: &Path) -> bool {
        self.path() == other
    }
}

impl ConfinementRoot {
    /// SUMMARY:
    /// Create a root anchored at an existing directory.
    ///
    /// ERRORS:
    /// - `ConfinedFsError::InvalidRoot`: The directory is missing, not a directory, or cannot be canonicalized.
    pub fn try_new<P: AsRef<Path>>(root_dir: P) -> Result<Self> {
        let root_dir = root_dir.as_ref();
        let canonicalized = PathHistory::<Raw>::new(root_dir)
            .canonicalize()
            .map_err(|err| match err {
                ConfinedFsError::PathResolution { source, .. } => {
                    ConfinedFsError::invalid_root(root_dir.to_path_buf(), source)
                }
                other => other,
            })?;

        let verified_exists = match canonicalized.verify_exists() {
            Some(path) => path,
            None => {
                let io = IoError::new(
                    ErrorKind::NotFound,
                    "The specified confinement root does not exist.",
                );
                return Err(ConfinedFsError::invalid_root(root_dir.to_path_buf(), io));
            }
        };

        if !verified_exists.is_dir() {
            let io = IoError::new(
                ErrorKind::InvalidInput,
                "The specified confinement root exists but is not a directory.",
            );
            return Err(ConfinedFsError::invalid_root(root_dir.to_path_buf(), io));
        }

        tracing::info!(root = %verified_exists.display(), "confinement root established");
        Ok(Self {
            path: Arc::new(verified_exists),
        })
    }

    /// SUMMARY:
    /// Create the directory if missing, then construct the root.
    pub fn try_new_create<P: AsRef<Path>>(root_dir: P) -> Result<Self> {
        let root_dir = root_dir.as_ref();
        if !root_dir.exists() {
            std::fs::create_dir_all(root_dir)
                .map_err(|e| ConfinedFsError::invalid_root(root_dir.to_path_buf(), e))?;
        }
        Self::try_new(root_dir)
    }

    /// SUMMARY:
    /// Resolve `raw_path` against the caller context and admit it through [`Self::check`].
    ///
    /// ERRORS:
    /// - `ConfinedFsError::PathResolution`: canonicalization failed (I/O class).
    /// - `ConfinedFsError::PathEscapesRoot`: sandboxed caller named a path outside the root.
    pub fn admit<P: AsRef<Path>>(&self, raw_path: P, ctx: &CallerContext) -> Result<ConfinedPath> {
        let resolved = ctx.resolve(raw_path)?;
        self.check(resolved, ctx.mode())
    }

    /// SUMMARY:
    /// Admit `raw_path` as a directory entry: the parent is resolved, the final component is not.
    ///
    /// DETAILS:
    /// Used where the named entry itself must be acted on. A symlink argument stays the link,
    /// and its location (canonical parent plus name) is what gets checked against the root.
    /// Paths without a plain final name (`""`, `.`, `..`) fall back to [`Self::admit`].
    ///
    /// ERRORS:
    /// - `ConfinedFsError::PathResolution`: the parent could not be canonicalized.
    /// - `ConfinedFsError::PathEscapesRoot`: sandboxed and the entry lies outside the root.
    pub fn admit_entry<P: AsRef<Path>>(
        &self,
        raw_path: P,
        ctx: &CallerContext,
    ) -> Result<ConfinedPath> {
        let raw_path = raw_path.as_ref();
        let (Some(parent), Some(name)) = (raw_path.parent(), raw_path.file_name()) else {
            return self.admit(raw_path, ctx);
        };
        match ctx.resolve(parent)?.entry(name) {
            Some(location) => self.check(location, ctx.mode()),
            None => self.admit(raw_path, ctx),
        }
    }

    /// SUMMARY:
    /// Decide whether a canonical path may be touched under `mode`.
    ///
    /// DETAILS:
    /// Trusted mode always admits. Sandboxed mode admits iff the path equals or descends
    /// from the root.
    pub fn check(
        &self,
        resolved: PathHistory<(Raw, Canonicalized)>,
        mode: ExecutionMode,
    ) -> Result<ConfinedPath> {
        let admitted = match mode {
            ExecutionMode::Trusted => resolved.trust(),
            ExecutionMode::Sandboxed => resolved.boundary_check(&self.path)?,
        };
        Ok(ConfinedPath::new(self.clone(), admitted, mode))
    }

    /// Returns `true` if `path` equals or descends from the root (component-wise).
    #[inline]
    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(self.path())
    }

    #[inline]
    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// SUMMARY:
    /// Return the root directory as `&OsStr` for third-party `AsRef<Path>` interop.
    #[inline]
    pub fn interop_path(&self) -> &std::ffi::OsStr {
        self.path.as_os_str()
    }

    /// Returns a Display wrapper that shows the canonical root path.
    #[inline]
    pub fn root_display(&self) -> std::path::Display<'_> {
        self.path().display()
    }
}

impl AsRef<Path> for ConfinementRoot {
    #[inline]
    fn as_ref(&self) -> &Path {
        self.path()
    }
}

impl std::fmt::Debug for ConfinementRoot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfinementRoot")
            .field("path", &self.path())
            .finish()
    }
}

impl std::str::FromStr for ConfinementRoot {
    type Err = ConfinedFsError;

    /// Parse a root from a string path, creating the directory if it does not exist.
    #[inline]
    fn from_str(path: &str) -> std::result::Result<Self, Self::Err> {
        Self::try_new_create(path)
    }
}
