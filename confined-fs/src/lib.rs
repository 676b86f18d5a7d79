//! # confined-fs
//!
//! Path-based file operations for an embedding host (a scripting engine, a plugin runtime),
//! confined to one canonical base directory.
//!
//! Every operation follows the same pipeline:
//!
//! 1. **Resolve** the caller's path against its [`CallerContext`] (the invoking script's
//!    directory, never the process working directory) and canonicalize it. [`Sandbox::delete`]
//!    canonicalizes only the parent, so a symlink argument is removed rather than its target.
//! 2. **Admit** the canonical path through the [`ConfinementRoot`]. In
//!    [`ExecutionMode::Sandboxed`] it must equal or descend from the root; in
//!    [`ExecutionMode::Trusted`] every path is admitted.
//! 3. **Run** the operation on the resulting [`ConfinedPath`]. Recursive operations re-admit
//!    every entry they discover, so a symlink inside the tree cannot carry a copy outside.
//!
//! ## Quick start
//!
//! ```rust
//! use confined_fs::{CallerContext, ConfinementRoot, ErrorKind, Sandbox};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let td = tempfile::tempdir()?;
//! let sandbox = Sandbox::new(ConfinementRoot::try_new(td.path())?);
//! let ctx = CallerContext::sandboxed(td.path())?;
//!
//! sandbox.create_directory(&ctx, "src_dir", false)?;
//! sandbox.write(&ctx, "src_dir/a.txt", "alpha", None)?;
//! sandbox.copy(&ctx, "src_dir", "backup/src_dir", false, true)?;
//! assert!(sandbox.file_exists(&ctx, "backup/src_dir/a.txt")?);
//!
//! // A second create-only write is refused and leaves the first content in place.
//! let err = sandbox.write(&ctx, "src_dir/a.txt", "beta", None).unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::AlreadyExists);
//!
//! // Anything outside the root is refused before touching disk.
//! let err = sandbox.delete(&ctx, "../elsewhere", true).unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::Security);
//! # Ok(()) }
//! ```
//!
//! ## Operations
//!
//! | Operation | Returns | Notes |
//! |-----------|---------|-------|
//! | [`Sandbox::directory_list`] | sorted names | `NotFound` if missing |
//! | [`Sandbox::file_exists`] / [`Sandbox::is_directory`] | `bool` | |
//! | [`Sandbox::create_file`] / [`Sandbox::create_directory`] | `()` | optional parent creation |
//! | [`Sandbox::copy`] | `()` | merge semantics, fail-fast, see [`DirectoryMerger`] |
//! | [`Sandbox::delete`] | `()` | best-effort, see [`RecursiveDeleter`] |
//! | [`Sandbox::write`] | `()` | `None`/`"APPEND"`/`"OVERWRITE"` |
//! | [`Sandbox::write_binary`] / [`Sandbox::write_gzip_binary`] | `()` | `overwrite` flag |
//!
//! ## Errors
//!
//! All failures are [`ConfinedFsError`]; [`ConfinedFsError::kind`] collapses them into the
//! host taxonomy: `NotFound`, `AlreadyExists`, `Security`, `Format`, `Io`.
//!
//! ## Concurrency
//!
//! Operations are blocking and share no mutable state. [`Sandbox`] is `Send + Sync`, so a
//! host may dispatch calls onto worker threads. Overlapping calls race at the OS level; no
//! locking, cancellation or timeout is provided.
//!
//! ## Logging
//!
//! Events are emitted through `tracing` (admission and per-operation at `debug`, per-entry
//! at `trace`, failed deletions at `warn`). Install a subscriber in the host to see them.
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod ops;
pub mod path;
pub mod validator;

// Public exports
pub use config::SandboxConfig;
pub use error::{ConfinedFsError, ErrorKind};
pub use ops::deleter::{EntryRemover, FsRemover, RecursiveDeleter};
pub use ops::merger::DirectoryMerger;
pub use ops::writer::{ContentCodec, ContentWriter, GzipCodec, PlainCodec, WriteMode};
pub use ops::Sandbox;
pub use path::confined_path::ConfinedPath;
pub use validator::caller_context::{CallerContext, ExecutionMode};
pub use validator::confinement_root::ConfinementRoot;

/// Result type alias for this crate's operations.
pub type Result<T> = std::result::Result<T, ConfinedFsError>;
