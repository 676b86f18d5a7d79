//! Preferences: where the confinement root lives.
//!
//! Loaded once at process start from a TOML file or the environment:
//!
//! ```toml
//! base_dir = "data"          # relative to the preferences file
//! create_base_dir = true     # optional, defaults to false
//! ```
use crate::validator::confinement_root::ConfinementRoot;
use crate::{ConfinedFsError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable naming the confinement root.
pub const BASE_DIR_ENV: &str = "CONFINED_FS_BASE_DIR";
/// Environment variable enabling creation of a missing root (`true`/`1`).
pub const CREATE_BASE_DIR_ENV: &str = "CONFINED_FS_CREATE_BASE_DIR";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SandboxConfig {
    /// Directory outside of which sandboxed callers may not read or write.
    pub base_dir: PathBuf,
    /// Create `base_dir` if it does not exist yet.
    #[serde(default)]
    pub create_base_dir: bool,
}

impl SandboxConfig {
    pub fn new<P: Into<PathBuf>>(base_dir: P) -> Self {
        Self {
            base_dir: base_dir.into(),
            create_base_dir: false,
        }
    }

    /// Load from a TOML file. A relative `base_dir` is taken relative to the file's directory.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfinedFsError::io("read configuration file", path, e))?;
        let mut config = Self::from_toml(&content)?;
        if config.base_dir.is_relative() {
            if let Some(dir) = path.parent() {
                config.base_dir = dir.join(&config.base_dir);
            }
        }
        Ok(config)
    }

    /// Parse from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `CONFINED_FS_BASE_DIR` / `CONFINED_FS_CREATE_BASE_DIR`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_dir = lookup(BASE_DIR_ENV).ok_or_else(|| ConfinedFsError::Config {
            message: format!("{BASE_DIR_ENV} is not set"),
        })?;
        let create_base_dir = match lookup(CREATE_BASE_DIR_ENV) {
            None => false,
            Some(raw) => parse_flag(&raw).ok_or_else(|| ConfinedFsError::Config {
                message: format!("{CREATE_BASE_DIR_ENV} must be true/false or 1/0, got '{raw}'"),
            })?,
        };
        let config = Self {
            base_dir: PathBuf::from(base_dir),
            create_base_dir,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.base_dir.as_os_str().is_empty() {
            return Err(ConfinedFsError::Config {
                message: "base_dir must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Build the immutable confinement root this configuration describes.
    pub fn build_root(&self) -> Result<ConfinementRoot> {
        if self.create_base_dir {
            ConfinementRoot::try_new_create(&self.base_dir)
        } else {
            ConfinementRoot::try_new(&self.base_dir)
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim() {
        "1" => Some(true),
        "0" => Some(false),
        other if other.eq_ignore_ascii_case("true") => Some(true),
        other if other.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}
