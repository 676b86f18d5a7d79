//! Best-effort recursive deletion.
use crate::path::confined_path::ConfinedPath;
use crate::{ConfinedFsError, Result};
use std::fs::FileType;
use std::io;
use std::path::PathBuf;

/// SUMMARY:
/// Remove a single entry from disk.
///
/// DETAILS:
/// The seam between the deletion policy and the filesystem. `remove_dir` is only called on
/// directories the deleter believes are already empty.
pub trait EntryRemover {
    fn remove_file(&self, path: &ConfinedPath) -> io::Result<()>;
    fn remove_dir(&self, path: &ConfinedPath) -> io::Result<()>;
}

impl<T: EntryRemover + ?Sized> EntryRemover for &T {
    fn remove_file(&self, path: &ConfinedPath) -> io::Result<()> {
        (**self).remove_file(path)
    }

    fn remove_dir(&self, path: &ConfinedPath) -> io::Result<()> {
        (**self).remove_dir(path)
    }
}

/// Removes entries with `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsRemover;

impl EntryRemover for FsRemover {
    fn remove_file(&self, path: &ConfinedPath) -> io::Result<()> {
        path.remove_file()
    }

    fn remove_dir(&self, path: &ConfinedPath) -> io::Result<()> {
        path.remove_dir()
    }
}

/// SUMMARY:
/// Delete a file or directory tree, removing as much as possible even when some entries fail.
///
/// DETAILS:
/// Children are always attempted before their directory, regardless of sibling failures.
/// A directory is only removed once all of its children are gone. Nothing is rolled back:
/// whatever was removed stays removed, and the call reports `DeleteIncomplete` listing each
/// entry whose own removal failed.
///
/// Symlinks are never followed. A link is removed as a leaf and its location is re-checked
/// against the confinement root like every other discovered entry. The walk recurses once
/// per directory level.
#[derive(Debug, Clone, Default)]
pub struct RecursiveDeleter<R = FsRemover> {
    remover: R,
}

impl RecursiveDeleter<FsRemover> {
    pub fn new() -> Self {
        Self { remover: FsRemover }
    }
}

impl<R: EntryRemover> RecursiveDeleter<R> {
    pub fn with_remover(remover: R) -> Self {
        Self { remover }
    }

    /// SUMMARY:
    /// Delete `target`.
    ///
    /// ERRORS:
    /// - `ConfinedFsError::NotFound`: nothing exists at `target`.
    /// - `ConfinedFsError::AlreadyExists`: `target` is a non-empty directory and
    ///   `allow_non_empty_dir` is false. Nothing is deleted.
    /// - `ConfinedFsError::DeleteIncomplete`: at least one entry could not be removed.
    /// - `ConfinedFsError::Io`: `target`'s metadata could not be read.
    pub fn delete(&self, target: &ConfinedPath, allow_non_empty_dir: bool) -> Result<()> {
        let metadata = match target.symlink_metadata() {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ConfinedFsError::not_found(target.path(), "The given file"));
            }
            Err(e) => return Err(ConfinedFsError::io("inspect", target.path(), e)),
        };

        if metadata.is_dir() && !allow_non_empty_dir {
            let non_empty = target
                .is_non_empty_dir()
                .map_err(|e| ConfinedFsError::io("list directory", target.path(), e))?;
            if non_empty {
                return Err(ConfinedFsError::already_exists(
                    target.path(),
                    "The given file is a non-empty directory and removing its content is not allowed",
                ));
            }
        }

        tracing::debug!(
            path = %target.confinedpath_display(),
            allow_non_empty_dir,
            "deleting"
        );

        let mut failed = Vec::new();
        if self.remove_tree(target, metadata.file_type(), &mut failed) {
            Ok(())
        } else {
            Err(ConfinedFsError::DeleteIncomplete {
                path: target.path().to_path_buf(),
                failed,
            })
        }
    }

    // Returns true if `target` is gone. Failed entries are appended to `failed`.
    fn remove_tree(
        &self,
        target: &ConfinedPath,
        file_type: FileType,
        failed: &mut Vec<PathBuf>,
    ) -> bool {
        if !file_type.is_dir() {
            return self.record(target, self.remove_leaf(target, file_type), failed);
        }

        let names = match target.entry_names() {
            Ok(names) => names,
            Err(e) => return self.record(target, Err(e), failed),
        };

        let mut all_removed = true;
        for name in names {
            let child = match target.entry(&name) {
                Ok(child) => child,
                Err(e) => {
                    tracing::warn!(
                        dir = %target.confinedpath_display(),
                        ?name,
                        error = %e,
                        "skipping entry"
                    );
                    failed.push(target.path().join(&name));
                    all_removed = false;
                    continue;
                }
            };
            let removed = match child.symlink_metadata() {
                Ok(metadata) => self.remove_tree(&child, metadata.file_type(), failed),
                // Already gone counts as removed.
                Err(e) if e.kind() == io::ErrorKind::NotFound => true,
                Err(e) => self.record(&child, Err(e), failed),
            };
            all_removed &= removed;
        }

        if !all_removed {
            return false;
        }
        self.record(target, self.remover.remove_dir(target), failed)
    }

    fn remove_leaf(&self, target: &ConfinedPath, file_type: FileType) -> io::Result<()> {
        match self.remover.remove_file(target) {
            // Windows directory symlinks are removed like directories.
            Err(e) if file_type.is_symlink() && cfg!(windows) => {
                self.remover.remove_dir(target).map_err(|_| e)
            }
            other => other,
        }
    }

    fn record(
        &self,
        target: &ConfinedPath,
        outcome: io::Result<()>,
        failed: &mut Vec<PathBuf>,
    ) -> bool {
        match outcome {
            Ok(()) => {
                tracing::trace!(path = %target.confinedpath_display(), "removed");
                true
            }
            Err(e) => {
                tracing::warn!(
                    path = %target.confinedpath_display(),
                    error = %e,
                    "could not remove entry"
                );
                failed.push(target.path().to_path_buf());
                false
            }
        }
    }
}
