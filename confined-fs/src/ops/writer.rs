//! Mode-aware content writing with a pluggable byte codec.
//!
//! Known limitation: a failure in the middle of a write leaves the target contents
//! undefined. No temp-file-and-rename or rollback is attempted.
use crate::path::confined_path::ConfinedPath;
use crate::{ConfinedFsError, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::str::FromStr;

/// SUMMARY:
/// How a write treats an existing target.
///
/// VARIANTS:
/// - `CreateExclusive`: fail with `AlreadyExists` if the target exists.
/// - `Append`: create if absent, append otherwise.
/// - `OverwriteTruncate`: create if absent, replace the full contents otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WriteMode {
    #[default]
    CreateExclusive,
    Append,
    OverwriteTruncate,
}

impl WriteMode {
    /// SUMMARY:
    /// Interpret an optional host token. Absence means `CreateExclusive`.
    ///
    /// ERRORS:
    /// - `ConfinedFsError::InvalidToken`: token is not `APPEND`/`OVERWRITE` (case-insensitive).
    pub fn from_token(token: Option<&str>) -> Result<Self> {
        match token {
            None => Ok(Self::CreateExclusive),
            Some(token) => token.parse(),
        }
    }

    /// Maps the boolean `overwrite` flag of the binary writers.
    #[inline]
    pub fn from_overwrite(overwrite: bool) -> Self {
        if overwrite {
            Self::OverwriteTruncate
        } else {
            Self::CreateExclusive
        }
    }

    fn open_options(self) -> OpenOptions {
        let mut options = OpenOptions::new();
        options.write(true);
        match self {
            Self::CreateExclusive => options.create_new(true),
            Self::Append => options.create(true).append(true),
            Self::OverwriteTruncate => options.create(true).truncate(true),
        };
        options
    }
}

impl FromStr for WriteMode {
    type Err = ConfinedFsError;

    fn from_str(token: &str) -> std::result::Result<Self, Self::Err> {
        if token.eq_ignore_ascii_case("APPEND") {
            Ok(Self::Append)
        } else if token.eq_ignore_ascii_case("OVERWRITE") {
            Ok(Self::OverwriteTruncate)
        } else {
            Err(ConfinedFsError::InvalidToken {
                argument: "write option",
                token: token.to_owned(),
                expected: "'OVERWRITE' or 'APPEND'",
            })
        }
    }
}

/// SUMMARY:
/// Encode raw content into an output stream.
///
/// DETAILS:
/// The writer owns opening and mode handling; a codec only decides which bytes reach the
/// file. Implementations must flush any framing (trailers, footers) before returning.
pub trait ContentCodec {
    fn encode(&self, content: &[u8], sink: &mut dyn Write) -> io::Result<()>;
}

/// Writes content unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainCodec;

impl ContentCodec for PlainCodec {
    fn encode(&self, content: &[u8], sink: &mut dyn Write) -> io::Result<()> {
        sink.write_all(content)
    }
}

/// Writes content as one gzip member. Appending yields a valid multi-member gzip stream.
#[derive(Debug, Clone, Copy)]
pub struct GzipCodec {
    level: Compression,
}

impl GzipCodec {
    pub fn new(level: u32) -> Self {
        Self {
            level: Compression::new(level),
        }
    }
}

impl Default for GzipCodec {
    fn default() -> Self {
        Self {
            level: Compression::default(),
        }
    }
}

impl ContentCodec for GzipCodec {
    fn encode(&self, content: &[u8], sink: &mut dyn Write) -> io::Result<()> {
        let mut encoder = GzEncoder::new(sink, self.level);
        encoder.write_all(content)?;
        encoder.finish()?;
        Ok(())
    }
}

/// SUMMARY:
/// Write bytes to an admitted path under a [`WriteMode`] through a [`ContentCodec`].
#[derive(Debug, Clone, Default)]
pub struct ContentWriter<C = PlainCodec> {
    codec: C,
}

impl ContentWriter<PlainCodec> {
    pub fn plain() -> Self {
        Self { codec: PlainCodec }
    }
}

impl ContentWriter<GzipCodec> {
    pub fn gzip() -> Self {
        Self {
            codec: GzipCodec::default(),
        }
    }
}

impl<C: ContentCodec> ContentWriter<C> {
    pub fn with_codec(codec: C) -> Self {
        Self { codec }
    }

    /// SUMMARY:
    /// Write `content` to `target`.
    ///
    /// DETAILS:
    /// Parent directories are created first regardless of mode. `CreateExclusive` checks for
    /// an existing target before opening so the refusal is a distinguishable `AlreadyExists`;
    /// losing a creation race to another writer is reported the same way.
    ///
    /// ERRORS:
    /// - `ConfinedFsError::AlreadyExists`: `CreateExclusive` and the target exists.
    /// - `ConfinedFsError::Io`: parent creation, open, encode or flush failed.
    pub fn write(&self, target: &ConfinedPath, content: &[u8], mode: WriteMode) -> Result<()> {
        target
            .create_parent_dir_all()
            .map_err(|e| ConfinedFsError::io("create parent directories of", target.path(), e))?;

        if mode == WriteMode::CreateExclusive && target.symlink_metadata().is_ok() {
            return Err(exists_refusal(target));
        }

        let file = target
            .open_with(&mode.open_options())
            .map_err(|e| match e.kind() {
                io::ErrorKind::AlreadyExists => exists_refusal(target),
                _ => ConfinedFsError::io("open file for writing", target.path(), e),
            })?;

        let mut sink = BufWriter::new(file);
        self.codec
            .encode(content, &mut sink)
            .and_then(|()| sink.flush())
            .map_err(|e| ConfinedFsError::io("write to file", target.path(), e))?;

        tracing::debug!(
            path = %target.confinedpath_display(),
            bytes = content.len(),
            ?mode,
            "content written"
        );
        Ok(())
    }
}

fn exists_refusal(target: &ConfinedPath) -> ConfinedFsError {
    ConfinedFsError::already_exists(
        target.path(),
        "The file already exists and no overwrite option has been given",
    )
}
