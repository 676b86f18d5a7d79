//! SUMMARY:
//! Define the crate-wide error type for path admission and confined file operations.
//!
//! OVERVIEW:
//! `ConfinedFsError` captures root setup failures, path resolution errors, confinement
//! escapes, policy refusals (missing targets, clobbering), bad mode tokens and raw I/O
//! failures. Hosts that only care about the coarse taxonomy call [`ConfinedFsError::kind`].
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

const MAX_ERROR_PATH_LEN: usize = 256;

// Internal helper: render error-friendly path display (truncate long values).
pub(crate) fn truncate_path_display(path: &Path, max_len: usize) -> String {
    let path_str = path.to_string_lossy();
    let char_count = path_str.chars().count();
    if char_count <= max_len {
        return path_str.into_owned();
    }
    let keep = max_len.saturating_sub(5) / 2;
    let start: String = path_str.chars().take(keep).collect();
    let mut tail_chars: Vec<char> = path_str.chars().rev().take(keep).collect();
    tail_chars.reverse();
    let end: String = tail_chars.into_iter().collect();
    format!("{start}...{end}")
}

fn shown(path: &Path) -> String {
    truncate_path_display(path, MAX_ERROR_PATH_LEN)
}

/// SUMMARY:
/// Coarse failure class reported to the embedding host.
///
/// DETAILS:
/// Every [`ConfinedFsError`] maps onto exactly one of these. `AlreadyExists` and `Security`
/// are both security-class refusals; the former is a policy refusal inside the root, the
/// latter a confinement violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    Security,
    Format,
    Io,
}

/// SUMMARY:
/// Represent errors produced while admitting paths and running confined operations.
///
/// DETAILS:
/// Each variant carries the offending absolute path (or the offending token) so the host
/// can surface an actionable message. Long paths are truncated in `Display` output.
///
/// VARIANTS:
/// - `NotFound`: A required source or parent directory is missing.
/// - `AlreadyExists`: The operation would clobber a file or remove a non-empty directory.
/// - `PathEscapesRoot`: A sandboxed caller named a path outside the confinement root.
/// - `InvalidToken`: A mode/flag token is outside the recognized set.
/// - `Io`: An underlying filesystem call failed.
/// - `PathResolution`: Canonicalization of a caller path failed.
/// - `InvalidRoot`: The confinement root is missing, not a directory, or unreadable.
/// - `DeleteIncomplete`: A best-effort delete left some entries behind.
/// - `Config` / `ConfigParse`: The preferences could not be loaded.
#[derive(Debug, Error)]
pub enum ConfinedFsError {
    #[error("{what} does not exist: '{}'", shown(.path))]
    NotFound { path: PathBuf, what: &'static str },

    #[error("{reason}: '{}'", shown(.path))]
    AlreadyExists { path: PathBuf, reason: &'static str },

    #[error(
        "Path '{}' escapes confinement root '{}'",
        shown(.attempted_path),
        shown(.confinement_root)
    )]
    PathEscapesRoot {
        attempted_path: PathBuf,
        confinement_root: PathBuf,
    },

    #[error("{argument} has to be one of {expected}, got '{token}'")]
    InvalidToken {
        argument: &'static str,
        token: String,
        expected: &'static str,
    },

    #[error("Could not {action} '{}': {source}", shown(.path))]
    Io {
        action: &'static str,
        path: PathBuf,
        source: io::Error,
    },

    #[error("Cannot resolve path: {}", shown(.path))]
    PathResolution { path: PathBuf, source: io::Error },

    #[error("Invalid confinement root: {}", shown(.root))]
    InvalidRoot { root: PathBuf, source: io::Error },

    #[error(
        "Could not delete {} of the entries under '{}'",
        .failed.len(),
        shown(.path)
    )]
    DeleteIncomplete { path: PathBuf, failed: Vec<PathBuf> },

    #[error("Invalid configuration: {message}")]
    Config { message: String },

    #[error("Invalid configuration file")]
    ConfigParse(#[from] toml::de::Error),
}

impl ConfinedFsError {
    #[inline]
    pub(crate) fn not_found(path: impl Into<PathBuf>, what: &'static str) -> Self {
        Self::NotFound {
            path: path.into(),
            what,
        }
    }

    #[inline]
    pub(crate) fn already_exists(path: impl Into<PathBuf>, reason: &'static str) -> Self {
        Self::AlreadyExists {
            path: path.into(),
            reason,
        }
    }

    #[inline]
    pub(crate) fn path_escapes_root(attempted_path: PathBuf, confinement_root: PathBuf) -> Self {
        Self::PathEscapesRoot {
            attempted_path,
            confinement_root,
        }
    }

    #[inline]
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }

    #[inline]
    pub(crate) fn path_resolution(path: PathBuf, source: io::Error) -> Self {
        Self::PathResolution { path, source }
    }

    #[inline]
    pub(crate) fn invalid_root(root: PathBuf, source: io::Error) -> Self {
        Self::InvalidRoot { root, source }
    }

    /// SUMMARY:
    /// Collapse this error into the host-visible failure class.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            Self::PathEscapesRoot { .. } => ErrorKind::Security,
            Self::InvalidToken { .. } => ErrorKind::Format,
            Self::Io { .. }
            | Self::PathResolution { .. }
            | Self::InvalidRoot { .. }
            | Self::DeleteIncomplete { .. }
            | Self::Config { .. }
            | Self::ConfigParse(_) => ErrorKind::Io,
        }
    }

    /// Returns the absolute path this error is about, if it names one.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::NotFound { path, .. }
            | Self::AlreadyExists { path, .. }
            | Self::Io { path, .. }
            | Self::PathResolution { path, .. }
            | Self::DeleteIncomplete { path, .. } => Some(path),
            Self::PathEscapesRoot { attempted_path, .. } => Some(attempted_path),
            Self::InvalidRoot { root, .. } => Some(root),
            Self::InvalidToken { .. } | Self::Config { .. } | Self::ConfigParse(_) => None,
        }
    }
}
