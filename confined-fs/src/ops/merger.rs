//! Recursive copy that merges into existing destination directories.
use crate::path::confined_path::ConfinedPath;
use crate::{ConfinedFsError, Result};
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Chain of canonical source directories from the copy root down to a pending entry.
struct Ancestry {
    dir: PathBuf,
    parent: Option<Rc<Ancestry>>,
}

impl Ancestry {
    fn contains(&self, dir: &Path) -> bool {
        let mut node = Some(self);
        while let Some(current) = node {
            if current.dir == dir {
                return true;
            }
            node = current.parent.as_deref();
        }
        false
    }
}

struct Pending {
    from: ConfinedPath,
    to: ConfinedPath,
    ancestry: Option<Rc<Ancestry>>,
}

/// SUMMARY:
/// Copy a file or directory tree into a destination, merging with what is already there.
///
/// DETAILS:
/// Directories are never replaced as a unit: their entries are unioned recursively, and
/// destination entries absent from the source are left untouched. Only file leaves are
/// subject to the overwrite policy. Copying directory `A` (holding `f`) to `B` yields
/// `B/f`, not `B/A/f`.
///
/// The walk is depth-first over an explicit work stack, visiting entries in sorted name
/// order. It is fail-fast: the first error aborts the remaining work and entries copied
/// before it stay copied. Every discovered entry is canonicalized and re-admitted against
/// the confinement root, on both the source and the destination side.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectoryMerger {
    overwrite: bool,
}

impl DirectoryMerger {
    pub fn new(overwrite: bool) -> Self {
        Self { overwrite }
    }

    /// SUMMARY:
    /// Copy `from` onto `to`.
    ///
    /// ERRORS:
    /// - `ConfinedFsError::NotFound`: `from` is missing, or `to`'s parent is missing and
    ///   `create_target_dirs` is false.
    /// - `ConfinedFsError::Io` (`InvalidInput`): `from` and `to` are the same path, or `to`
    ///   lies inside the directory `from`.
    /// - `ConfinedFsError::AlreadyExists`: a file leaf exists and overwriting is not allowed.
    /// - `ConfinedFsError::PathEscapesRoot`: a discovered entry resolves outside the root.
    /// - `ConfinedFsError::Io`: any filesystem call failed.
    pub fn copy(
        &self,
        from: &ConfinedPath,
        to: &ConfinedPath,
        create_target_dirs: bool,
    ) -> Result<()> {
        if !from.exists() {
            return Err(ConfinedFsError::not_found(
                from.path(),
                "File or directory at 'fromPath'",
            ));
        }
        check_overlap(from, from, to)?;

        if !to.parent_exists() {
            let parent = to.path().parent().unwrap_or(to.path()).to_path_buf();
            if !create_target_dirs {
                return Err(ConfinedFsError::not_found(parent, "Target directory"));
            }
            to.create_parent_dir_all()
                .map_err(|e| ConfinedFsError::io("create directory", parent, e))?;
        }

        tracing::debug!(
            from = %from.confinedpath_display(),
            to = %to.confinedpath_display(),
            overwrite = self.overwrite,
            "copying"
        );

        let source_root = from;
        let mut stack = vec![Pending {
            from: from.clone(),
            to: to.clone(),
            ancestry: None,
        }];
        while let Some(Pending { from, to, ancestry }) = stack.pop() {
            // A destination link may resolve back into the source tree.
            check_overlap(source_root, &from, &to)?;
            if from.is_dir() {
                self.ensure_dir(&to)?;
                let ancestry = Rc::new(Ancestry {
                    dir: from.path().to_path_buf(),
                    parent: ancestry,
                });
                let names = from
                    .entry_names()
                    .map_err(|e| ConfinedFsError::io("list directory", from.path(), e))?;
                // Reverse push so entries pop in sorted order.
                for name in names.into_iter().rev() {
                    let child_from = from.join(&name)?;
                    if child_from.is_dir() && ancestry.contains(child_from.path()) {
                        let loop_err = io::Error::new(
                            io::ErrorKind::InvalidInput,
                            "directory link loops back to one of its ancestors",
                        );
                        return Err(ConfinedFsError::io(
                            "copy",
                            from.path().join(&name),
                            loop_err,
                        ));
                    }
                    let child_to = to.join(&name)?;
                    stack.push(Pending {
                        from: child_from,
                        to: child_to,
                        ancestry: Some(ancestry.clone()),
                    });
                }
            } else if from.is_file() {
                self.copy_file(&from, &to)?;
            } else {
                let gone =
                    io::Error::new(io::ErrorKind::NotFound, "entry vanished or dangling link");
                return Err(ConfinedFsError::io("copy", from.path(), gone));
            }
        }
        Ok(())
    }

    fn ensure_dir(&self, to: &ConfinedPath) -> Result<()> {
        if to.is_dir() {
            return Ok(());
        }
        if to.exists() {
            let clash = io::Error::new(
                io::ErrorKind::AlreadyExists,
                "a file is in the way of the directory",
            );
            return Err(ConfinedFsError::io("create directory", to.path(), clash));
        }
        to.create_dir()
            .map_err(|e| ConfinedFsError::io("create directory", to.path(), e))?;
        tracing::trace!(path = %to.confinedpath_display(), "created directory");
        Ok(())
    }

    fn copy_file(&self, from: &ConfinedPath, to: &ConfinedPath) -> Result<()> {
        if to.is_dir() {
            let clash = io::Error::new(
                io::ErrorKind::AlreadyExists,
                "a directory is in the way of the file",
            );
            return Err(ConfinedFsError::io("copy file to", to.path(), clash));
        }
        if !self.overwrite && to.exists() {
            return Err(ConfinedFsError::already_exists(
                to.path(),
                "Cannot overwrite existing file (overwrite parameter is false)",
            ));
        }
        let bytes = from
            .copy_file_to(to)
            .map_err(|e| ConfinedFsError::io("copy file to", to.path(), e))?;
        tracing::trace!(
            from = %from.confinedpath_display(),
            to = %to.confinedpath_display(),
            bytes,
            "copied file"
        );
        Ok(())
    }
}

/// Rejects a destination that is the source itself, or that lies inside the source tree
/// rooted at `source_root`.
fn check_overlap(source_root: &ConfinedPath, from: &ConfinedPath, to: &ConfinedPath) -> Result<()> {
    if from == to {
        return Err(invalid_input(
            "copy file or directory onto itself",
            from.path(),
        ));
    }
    if source_root.is_dir() && to.starts_with(source_root) {
        return Err(invalid_input(
            "copy a directory into its own subtree",
            to.path(),
        ));
    }
    Ok(())
}

fn invalid_input(action: &'static str, path: &Path) -> ConfinedFsError {
    let io = io::Error::new(
        io::ErrorKind::InvalidInput,
        "source and destination overlap",
    );
    ConfinedFsError::io(action, path, io)
}
