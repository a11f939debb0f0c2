//! Construction parameters for [`BlockFile`](crate::BlockFile).
//!
//! # Invariants
//! - `block_size > 0`; a zero block size would end every scan immediately.
//! - `offset` is signed: negative values count back from end of file.
//! - `length == 0` means "to the end of the file".
//!
//! # Design Notes
//! - Range values are *requests*. They are normalized against the real file
//!   size when the file is opened, and out-of-range values are clamped rather
//!   than rejected.
//! - A `swap_width` that does not divide `block_size` is allowed but logged;
//!   see [`crate::util::swap`] for the resulting tail behavior.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Default primary block size (bytes).
///
/// Large enough to keep the number of reads low, small enough to bound the
/// memory handed to the matcher per block.
pub const DEFAULT_BLOCK_SIZE: usize = 1024 * 1024;

/// Default trailing peek size (bytes).
///
/// Most headers are far smaller than this. Some reference structures well past
/// the header itself; handing the matcher the whole remaining file would make
/// per-block cost unbounded, so lookahead is capped here instead.
pub const DEFAULT_PEEK_SIZE: usize = 8 * 1024;

/// How the backing file is opened.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OpenMode {
    /// Open an existing file for reading.
    #[default]
    Read,
    /// Create or truncate a file for writing.
    Write,
    /// Open an existing file for reading and writing.
    ReadWrite,
}

impl OpenMode {
    pub fn can_read(self) -> bool {
        matches!(self, Self::Read | Self::ReadWrite)
    }

    pub fn can_write(self) -> bool {
        matches!(self, Self::Write | Self::ReadWrite)
    }
}

/// Error returned when parsing a mode string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseModeError(String);

impl fmt::Display for ParseModeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported open mode '{}'", self.0)
    }
}

impl std::error::Error for ParseModeError {}

impl FromStr for OpenMode {
    type Err = ParseModeError;

    /// Parses `"r"`, `"w"`, `"r+"` and `"w+"`. A binary flag (`b`) is
    /// accepted anywhere and ignored; every file is binary here.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stripped: String = s.chars().filter(|&c| c != 'b').collect();
        match stripped.as_str() {
            "r" => Ok(Self::Read),
            "w" => Ok(Self::Write),
            "r+" | "w+" | "+r" | "+w" => Ok(Self::ReadWrite),
            _ => Err(ParseModeError(s.to_owned())),
        }
    }
}

/// Validation error returned by [`BlockFileConfig::validate`].
///
/// Callers should treat this as a configuration bug, not bad input data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    BlockSizeZero,
    /// The requested length does not fit the signed offset space.
    LengthTooLarge { length: u64 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::BlockSizeZero => write!(f, "block_size must be > 0"),
            ConfigError::LengthTooLarge { length } => {
                write!(f, "length {length} exceeds i64::MAX")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Parameters for opening a [`BlockFile`](crate::BlockFile).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockFileConfig {
    /// Access mode for the backing file.
    pub mode: OpenMode,
    /// Logical byte count to expose; 0 means the rest of the file.
    pub length: u64,
    /// Start of the logical range; negative counts back from end of file.
    pub offset: i64,
    /// Primary bytes per block.
    pub block_size: usize,
    /// Lookahead bytes appended to each block without being consumed.
    pub peek_size: usize,
    /// Byte-group width for swapping; 0 disables.
    pub swap_width: usize,
}

impl Default for BlockFileConfig {
    fn default() -> Self {
        Self {
            mode: OpenMode::Read,
            length: 0,
            offset: 0,
            block_size: DEFAULT_BLOCK_SIZE,
            peek_size: DEFAULT_PEEK_SIZE,
            swap_width: 0,
        }
    }
}

impl BlockFileConfig {
    pub fn with_mode(mut self, mode: OpenMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the requested logical range.
    pub fn with_range(mut self, offset: i64, length: u64) -> Self {
        self.offset = offset;
        self.length = length;
        self
    }

    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn with_peek_size(mut self, peek_size: usize) -> Self {
        self.peek_size = peek_size;
        self
    }

    pub fn with_swap_width(mut self, swap_width: usize) -> Self {
        self.swap_width = swap_width;
        self
    }

    /// Validate field invariants. Call once before opening.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.block_size == 0 {
            return Err(ConfigError::BlockSizeZero);
        }
        if self.length > i64::MAX as u64 {
            return Err(ConfigError::LengthTooLarge {
                length: self.length,
            });
        }
        Ok(())
    }
}
