use crate::validator::path_history::{Canonicalized, PathHistory, Raw};
use crate::{ConfinedFsError, Result};
use std::io::{Error as IoError, ErrorKind};
use std::path::{Path, PathBuf};

/// SUMMARY:
/// Select whether admitted paths are checked against the confinement root.
///
/// DETAILS:
/// `Trusted` mirrors an interactive/command-line host where the operator owns the machine;
/// every path is admitted after canonicalization. `Sandboxed` is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ExecutionMode {
    #[default]
    Sandboxed,
    Trusted,
}

/// SUMMARY:
/// Per-call context supplied by the host: the anchor for relative paths and the execution mode.
///
/// DETAILS:
/// The anchor is the directory of the invoking script. Relative caller paths are resolved
/// against it, never against the process working directory, so the anchor must be absolute.
///
/// EXAMPLE:
/// ```rust
/// # use confined_fs::{CallerContext, ExecutionMode};
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let td = tempfile::tempdir()?;
/// let ctx = CallerContext::new(td.path(), ExecutionMode::Sandboxed)?;
/// let resolved = ctx.resolve("scripts/../data.txt")?;
/// assert!(resolved.ends_with("data.txt"));
/// # Ok(()) }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerContext {
    anchor: PathBuf,
    mode: ExecutionMode,
}

impl CallerContext {
    /// SUMMARY:
    /// Create a context anchored at `anchor_dir`.
    ///
    /// ERRORS:
    /// - `ConfinedFsError::PathResolution`: `anchor_dir` is relative or cannot be canonicalized.
    pub fn new<P: AsRef<Path>>(anchor_dir: P, mode: ExecutionMode) -> Result<Self> {
        let anchor_dir = anchor_dir.as_ref();
        if !anchor_dir.is_absolute() {
            let io = IoError::new(
                ErrorKind::InvalidInput,
                "The caller anchor directory must be an absolute path.",
            );
            return Err(ConfinedFsError::path_resolution(
                anchor_dir.to_path_buf(),
                io,
            ));
        }
        let anchor = PathHistory::<Raw>::new(anchor_dir).canonicalize()?;
        Ok(Self {
            anchor: anchor.into_inner(),
            mode,
        })
    }

    /// SUMMARY:
    /// Create a context anchored at the directory containing the invoking script file.
    pub fn from_script_file<P: AsRef<Path>>(script_file: P, mode: ExecutionMode) -> Result<Self> {
        let script_file = script_file.as_ref();
        match script_file.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => Self::new(dir, mode),
            _ => {
                let io = IoError::new(
                    ErrorKind::InvalidInput,
                    "The script file has no parent directory to anchor at.",
                );
                Err(ConfinedFsError::path_resolution(
                    script_file.to_path_buf(),
                    io,
                ))
            }
        }
    }

    /// Shorthand for a sandboxed context.
    #[inline]
    pub fn sandboxed<P: AsRef<Path>>(anchor_dir: P) -> Result<Self> {
        Self::new(anchor_dir, ExecutionMode::Sandboxed)
    }

    /// Shorthand for a trusted context.
    #[inline]
    pub fn trusted<P: AsRef<Path>>(anchor_dir: P) -> Result<Self> {
        Self::new(anchor_dir, ExecutionMode::Trusted)
    }

    #[inline]
    pub fn anchor(&self) -> &Path {
        &self.anchor
    }

    #[inline]
    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// SUMMARY:
    /// Resolve a caller-supplied path into its canonical form.
    ///
    /// DETAILS:
    /// Relative inputs are joined onto the anchor; absolute inputs are taken as-is. The result
    /// is canonicalized (symlinks and `..` resolved, missing tails kept) but not yet checked
    /// against any confinement root.
    ///
    /// ERRORS:
    /// - `ConfinedFsError::PathResolution`: an existing ancestor cannot be accessed.
    pub fn resolve<P: AsRef<Path>>(
        &self,
        raw_path: P,
    ) -> Result<PathHistory<(Raw, Canonicalized)>> {
        PathHistory::<Raw>::new(raw_path.as_ref()).resolve_against(&self.anchor)
    }
}
