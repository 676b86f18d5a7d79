//! SUMMARY:
//! Host-facing file operations, each admitted through the confinement root before touching disk.
//!
//! DETAILS:
//! Every operation resolves its path arguments against the caller context, checks them
//! against the root (sandboxed mode), and only then runs. Operations are synchronous and
//! hold no shared mutable state, so a host may run each call on its own worker thread.
//! Calls touching overlapping paths are not serialized against each other.
pub mod deleter;
pub mod merger;
pub mod writer;

use crate::config::SandboxConfig;
use crate::path::confined_path::ConfinedPath;
use crate::validator::caller_context::CallerContext;
use crate::validator::confinement_root::ConfinementRoot;
use crate::{ConfinedFsError, Result};
use deleter::RecursiveDeleter;
use merger::DirectoryMerger;
use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use writer::{ContentWriter, WriteMode};

/// SUMMARY:
/// The operation surface exposed to an embedding host.
///
/// EXAMPLE:
/// ```rust
/// # use confined_fs::{CallerContext, ConfinementRoot, Sandbox};
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let td = tempfile::tempdir()?;
/// let sandbox = Sandbox::new(ConfinementRoot::try_new(td.path())?);
/// let ctx = CallerContext::sandboxed(td.path())?;
///
/// sandbox.write(&ctx, "logs/app.log", "started\n", None)?;
/// sandbox.write(&ctx, "logs/app.log", "ready\n", Some("append"))?;
/// assert_eq!(sandbox.directory_list(&ctx, "logs")?, vec!["app.log".to_string()]);
///
/// assert!(sandbox.file_exists(&ctx, "../outside.txt").is_err());
/// # Ok(()) }
/// ```
#[derive(Debug, Clone)]
pub struct Sandbox {
    root: ConfinementRoot,
}

impl Sandbox {
    pub fn new(root: ConfinementRoot) -> Self {
        Self { root }
    }

    /// SUMMARY:
    /// Build the sandbox from loaded preferences.
    pub fn from_config(config: &SandboxConfig) -> Result<Self> {
        config.build_root().map(Self::new)
    }

    #[inline]
    pub fn root(&self) -> &ConfinementRoot {
        &self.root
    }

    /// Resolve and admit one caller path argument.
    pub fn admit<P: AsRef<Path>>(&self, ctx: &CallerContext, path: P) -> Result<ConfinedPath> {
        let admitted = self.root.admit(path, ctx)?;
        tracing::debug!(path = %admitted.confinedpath_display(), mode = ?ctx.mode(), "admitted");
        Ok(admitted)
    }

    /// SUMMARY:
    /// List the entry names of a directory, sorted.
    ///
    /// ERRORS:
    /// - `NotFound` if nothing exists there, `Io` if it is not a directory.
    pub fn directory_list<P: AsRef<Path>>(
        &self,
        ctx: &CallerContext,
        path: P,
    ) -> Result<Vec<String>> {
        let dir = self.admit(ctx, path)?;
        if !dir.exists() {
            return Err(ConfinedFsError::not_found(
                dir.path(),
                "Directory at location",
            ));
        }
        if !dir.is_dir() {
            let io = io::Error::new(io::ErrorKind::InvalidInput, "not a directory");
            return Err(ConfinedFsError::io("list directory", dir.path(), io));
        }
        let names = dir
            .entry_names()
            .map_err(|e| ConfinedFsError::io("list directory", dir.path(), e))?;
        Ok(names
            .into_iter()
            .map(|name| name.to_string_lossy().into_owned())
            .collect())
    }

    /// Returns whether a file or directory exists at `path`.
    pub fn file_exists<P: AsRef<Path>>(&self, ctx: &CallerContext, path: P) -> Result<bool> {
        Ok(self.admit(ctx, path)?.exists())
    }

    /// Returns whether `path` is a directory.
    pub fn is_directory<P: AsRef<Path>>(&self, ctx: &CallerContext, path: P) -> Result<bool> {
        Ok(self.admit(ctx, path)?.is_dir())
    }

    /// SUMMARY:
    /// Copy a file or directory tree, merging into existing directories.
    ///
    /// DETAILS:
    /// `to` names the copy itself, not the directory to place it in. See [`DirectoryMerger`].
    pub fn copy<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        ctx: &CallerContext,
        from: P,
        to: Q,
        allow_overwrite: bool,
        create_required_dirs: bool,
    ) -> Result<()> {
        let from = self.admit(ctx, from)?;
        let to = self.admit(ctx, to)?;
        DirectoryMerger::new(allow_overwrite).copy(&from, &to, create_required_dirs)
    }

    /// SUMMARY:
    /// Delete a file or directory. See [`RecursiveDeleter`].
    ///
    /// DETAILS:
    /// The final component is not followed: deleting a symlink removes the link, not its target.
    pub fn delete<P: AsRef<Path>>(
        &self,
        ctx: &CallerContext,
        path: P,
        allow_remove_dir_content: bool,
    ) -> Result<()> {
        let target = self.root.admit_entry(path, ctx)?;
        tracing::debug!(
            path = %target.confinedpath_display(),
            mode = ?ctx.mode(),
            "admitted entry"
        );
        RecursiveDeleter::new().delete(&target, allow_remove_dir_content)
    }

    /// SUMMARY:
    /// Create an empty file.
    ///
    /// ERRORS:
    /// - `AlreadyExists` if anything exists at `path`.
    /// - `NotFound` if the parent is missing and `create_required_dirs` is false.
    pub fn create_file<P: AsRef<Path>>(
        &self,
        ctx: &CallerContext,
        path: P,
        create_required_dirs: bool,
    ) -> Result<()> {
        let target = self.admit(ctx, path)?;
        if target.symlink_metadata().is_ok() {
            return Err(ConfinedFsError::already_exists(
                target.path(),
                "The given file already exists",
            ));
        }
        ensure_parent(
            &target,
            create_required_dirs,
            "The directory in which the file would be created",
        )?;

        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        target.open_with(&options).map_err(|e| match e.kind() {
            io::ErrorKind::AlreadyExists => {
                ConfinedFsError::already_exists(target.path(), "The given file already exists")
            }
            _ => ConfinedFsError::io("create file at", target.path(), e),
        })?;
        Ok(())
    }

    /// SUMMARY:
    /// Create a directory. An existing directory is left as is.
    ///
    /// ERRORS:
    /// - `AlreadyExists` if a non-directory entry has that name.
    /// - `NotFound` if the parent is missing and `create_required_dirs` is false.
    pub fn create_directory<P: AsRef<Path>>(
        &self,
        ctx: &CallerContext,
        path: P,
        create_required_dirs: bool,
    ) -> Result<()> {
        let target = self.admit(ctx, path)?;
        if target.is_dir() {
            return Ok(());
        }
        if target.symlink_metadata().is_ok() {
            return Err(ConfinedFsError::already_exists(
                target.path(),
                "Cannot create directory with the same name as a file",
            ));
        }
        ensure_parent(
            &target,
            create_required_dirs,
            "The directory in which the directory would be created",
        )?;
        target
            .create_dir()
            .map_err(|e| ConfinedFsError::io("create directory at", target.path(), e))
    }

    /// SUMMARY:
    /// Write text. `option` is `None` (create, fail if exists), `"APPEND"` or `"OVERWRITE"`.
    ///
    /// ERRORS:
    /// - `InvalidToken` for any other option; checked after the path is admitted and before
    ///   any mutation.
    pub fn write<P: AsRef<Path>>(
        &self,
        ctx: &CallerContext,
        path: P,
        content: &str,
        option: Option<&str>,
    ) -> Result<()> {
        let target = self.admit(ctx, path)?;
        let mode = WriteMode::from_token(option)?;
        ContentWriter::plain().write(&target, content.as_bytes(), mode)
    }

    /// SUMMARY:
    /// Write raw bytes; `overwrite` false refuses an existing target.
    pub fn write_binary<P: AsRef<Path>>(
        &self,
        ctx: &CallerContext,
        path: P,
        content: &[u8],
        overwrite: bool,
    ) -> Result<()> {
        let target = self.admit(ctx, path)?;
        ContentWriter::plain().write(&target, content, WriteMode::from_overwrite(overwrite))
    }

    /// SUMMARY:
    /// Gzip and write bytes; `overwrite` false refuses an existing target.
    pub fn write_gzip_binary<P: AsRef<Path>>(
        &self,
        ctx: &CallerContext,
        path: P,
        content: &[u8],
        overwrite: bool,
    ) -> Result<()> {
        let target = self.admit(ctx, path)?;
        ContentWriter::gzip().write(&target, content, WriteMode::from_overwrite(overwrite))
    }
}

fn ensure_parent(
    target: &ConfinedPath,
    create_required_dirs: bool,
    what: &'static str,
) -> Result<()> {
    if target.parent_exists() {
        return Ok(());
    }
    if !create_required_dirs {
        return Err(ConfinedFsError::not_found(target.path(), what));
    }
    target
        .create_parent_dir_all()
        .map_err(|e| ConfinedFsError::io("create parent directories of", target.path(), e))
}

#[cfg(test)]
mod tests;
