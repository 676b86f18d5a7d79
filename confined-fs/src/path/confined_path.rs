use crate::validator::caller_context::ExecutionMode;
use crate::validator::confinement_root::ConfinementRoot;
use crate::validator::path_history::{Admitted, Canonicalized, PathHistory, Raw};
use crate::{ConfinedFsError, Result};
use std::cmp::Ordering;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::fs::{File, Metadata, OpenOptions};
use std::hash::{Hash, Hasher};
use std::io;
use std::path::{Path, PathBuf};

/// SUMMARY:
/// Hold a canonical filesystem path that has been admitted against a [`ConfinementRoot`].
///
/// DETAILS:
/// Only [`ConfinementRoot::admit`]/[`ConfinementRoot::check`] construct one. Paths derived
/// from it (`join`, `entry`, `parent`) are re-admitted against the same root and under the
/// same [`ExecutionMode`], so recursive operations never step outside the boundary without
/// an error. Equality is canonical path equality.
#[derive(Clone)]
pub struct ConfinedPath {
    path: PathHistory<((Raw, Canonicalized), Admitted)>,
    root: ConfinementRoot,
    mode: ExecutionMode,
}

impl ConfinedPath {
    pub(crate) fn new(
        root: ConfinementRoot,
        admitted: PathHistory<((Raw, Canonicalized), Admitted)>,
        mode: ExecutionMode,
    ) -> Self {
        Self {
            path: admitted,
            root,
            mode,
        }
    }

    #[inline]
    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the root this path was admitted against.
    #[inline]
    pub fn root(&self) -> &ConfinementRoot {
        &self.root
    }

    #[inline]
    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// SUMMARY:
    /// Return a lossy `String` view of the canonical path.
    #[inline]
    pub fn confinedpath_to_string_lossy(&self) -> std::borrow::Cow<'_, str> {
        self.path.to_string_lossy()
    }

    /// SUMMARY:
    /// Return the canonical path as `&OsStr` for unavoidable third-party `AsRef<Path>` interop.
    #[inline]
    pub fn interop_path(&self) -> &OsStr {
        self.path.as_os_str()
    }

    /// Returns a `Display` wrapper that shows the canonical path.
    #[inline]
    pub fn confinedpath_display(&self) -> std::path::Display<'_> {
        self.path.display()
    }

    /// Consume and return the inner `PathBuf` (escape hatch).
    #[inline]
    pub fn unconfine(self) -> PathBuf {
        self.path.into_inner()
    }

    /// Returns the final component, if any.
    #[inline]
    pub fn file_name(&self) -> Option<&OsStr> {
        self.path.file_name()
    }

    /// Returns `true` if this path equals or lies below `ancestor`.
    #[inline]
    pub fn starts_with(&self, ancestor: &ConfinedPath) -> bool {
        self.path.starts_with(ancestor.path())
    }

    /// SUMMARY:
    /// Join a segment, canonicalize the result and re-admit it against the root.
    ///
    /// DETAILS:
    /// Symlinks in the joined path are resolved, so a link pointing outside the root is
    /// rejected in sandboxed mode.
    ///
    /// ERRORS:
    /// - `ConfinedFsError::PathResolution`, `ConfinedFsError::PathEscapesRoot`.
    pub fn join<P: AsRef<Path>>(&self, segment: P) -> Result<Self> {
        let resolved = PathHistory::<Raw>::new(self.path.join(segment)).canonicalize()?;
        self.root.check(resolved, self.mode)
    }

    /// SUMMARY:
    /// Address a direct directory entry by name without following it.
    ///
    /// DETAILS:
    /// Used by traversals that must act on an entry itself (a symlink is removed, not its
    /// target). The location is still re-checked against the root in sandboxed mode.
    ///
    /// ERRORS:
    /// - `ConfinedFsError::Io` (`InvalidInput`): `name` is not a single normal component.
    /// - `ConfinedFsError::PathEscapesRoot`: the location is outside the root.
    pub fn entry(&self, name: &OsStr) -> Result<Self> {
        let Some(location) = self.path.entry(name) else {
            let io = io::Error::new(io::ErrorKind::InvalidInput, "not a plain entry name");
            return Err(ConfinedFsError::io(
                "address entry",
                self.path.join(name),
                io,
            ));
        };
        if self.mode == ExecutionMode::Sandboxed && !self.root.contains(&location) {
            return Err(ConfinedFsError::path_escapes_root(
                location.into_inner(),
                self.root.path().to_path_buf(),
            ));
        }
        Ok(Self::new(self.root.clone(), location, self.mode))
    }

    /// SUMMARY:
    /// Return the parent as a new `ConfinedPath`, or `None` at the filesystem root.
    ///
    /// ERRORS:
    /// - `ConfinedFsError::PathEscapesRoot`: sandboxed and this path is the confinement root.
    pub fn parent(&self) -> Result<Option<Self>> {
        match self.path.parent() {
            Some(parent) => {
                let resolved = PathHistory::<Raw>::new(parent).canonicalize()?;
                self.root.check(resolved, self.mode).map(Some)
            }
            None => Ok(None),
        }
    }

    /// Returns `true` if the parent directory exists. The confinement root always counts as existing.
    pub fn parent_exists(&self) -> bool {
        match self.path.parent() {
            Some(parent) => self.path() == self.root.path() || parent.is_dir(),
            None => true,
        }
    }

    /// Returns `true` if something exists at this path (symlinks are followed).
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn is_file(&self) -> bool {
        self.path.is_file()
    }

    pub fn is_dir(&self) -> bool {
        self.path.is_dir()
    }

    pub fn metadata(&self) -> io::Result<Metadata> {
        std::fs::metadata(&self.path)
    }

    /// Metadata of the entry itself; symlinks are not followed.
    pub fn symlink_metadata(&self) -> io::Result<Metadata> {
        std::fs::symlink_metadata(&self.path)
    }

    /// SUMMARY:
    /// Read directory entries (discovery). Re-admit names through `join`/`entry` before I/O.
    pub fn read_dir(&self) -> io::Result<std::fs::ReadDir> {
        std::fs::read_dir(&self.path)
    }

    /// SUMMARY:
    /// Collect the names of all directory entries in lexicographic order.
    pub fn entry_names(&self) -> io::Result<Vec<OsString>> {
        let mut names = self
            .read_dir()?
            .map(|entry| entry.map(|e| e.file_name()))
            .collect::<io::Result<Vec<_>>>()?;
        names.sort();
        Ok(names)
    }

    /// Returns `true` if this is a directory with at least one entry.
    pub fn is_non_empty_dir(&self) -> io::Result<bool> {
        if !self.is_dir() {
            return Ok(false);
        }
        Ok(self.read_dir()?.next().is_some())
    }

    pub fn open_with(&self, options: &OpenOptions) -> io::Result<File> {
        options.open(&self.path)
    }

    /// Creates the directory (non-recursive, like `std::fs::create_dir`).
    pub fn create_dir(&self) -> io::Result<()> {
        std::fs::create_dir(&self.path)
    }

    /// Creates all missing directories on the way to this path.
    pub fn create_dir_all(&self) -> io::Result<()> {
        std::fs::create_dir_all(&self.path)
    }

    /// SUMMARY:
    /// Recursively create all missing directories up to the immediate parent. `Ok(())` at the root.
    pub fn create_parent_dir_all(&self) -> io::Result<()> {
        match self.parent() {
            Ok(Some(parent)) => parent.create_dir_all(),
            Ok(None) => Ok(()),
            Err(ConfinedFsError::PathEscapesRoot { .. }) => Ok(()),
            Err(e) => Err(io::Error::new(io::ErrorKind::Other, e)),
        }
    }

    /// SUMMARY:
    /// Copy file bytes onto `dest`, replacing any existing file. Returns bytes copied.
    pub fn copy_file_to(&self, dest: &ConfinedPath) -> io::Result<u64> {
        std::fs::copy(&self.path, dest.path())
    }

    pub fn remove_file(&self) -> io::Result<()> {
        std::fs::remove_file(&self.path)
    }

    /// Removes an empty directory.
    pub fn remove_dir(&self) -> io::Result<()> {
        std::fs::remove_dir(&self.path)
    }
}

impl fmt::Debug for ConfinedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfinedPath")
            .field("path", &self.path)
            .field("root", &self.root.path())
            .field("mode", &self.mode)
            .finish()
    }
}

impl PartialEq for ConfinedPath {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.path() == other.path()
    }
}

impl Eq for ConfinedPath {}

impl Hash for ConfinedPath {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path().hash(state);
    }
}

impl PartialOrd for ConfinedPath {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ConfinedPath {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.path().cmp(other.path())
    }
}

impl PartialEq<Path> for ConfinedPath {
    #[inline]
    fn eq(&self, other: &Path) -> bool {
        self.path() == other
    }
}
