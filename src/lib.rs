//! Windowed block reading for signature scanners.
//!
//! ## Scope
//! This crate gives a scanner bounded, sequential access to an arbitrarily
//! large file while still letting it match patterns that straddle block
//! boundaries. It also evaluates the small arithmetic expressions that
//! signature definitions use for symbolic sizes and offsets.
//!
//! ## Key invariants
//! - A [`BlockFile`] never returns bytes outside its logical range
//!   `[offset, offset + length)`, and that range never extends past the file.
//! - Each [`Block`] is a primary segment plus a trailing lookahead segment.
//!   Only the primary segment advances the reader; lookahead is seen again in
//!   the next block.
//! - Reads and writes are full: short transfers from the OS are looped over,
//!   and interruptions are surfaced immediately rather than retried.
//! - [`evaluate`] can only do arithmetic over literals. Anything else yields
//!   `None`.
//!
//! ## Scan flow
//! `Path -> BlockFile -> Block (primary + lookahead) -> matcher`
//!
//! ```no_run
//! use blockscan::{BlockFile, BlockFileConfig};
//!
//! # fn main() -> blockscan::Result<()> {
//! let config = BlockFileConfig::default().with_range(-4096, 0);
//! let mut file = BlockFile::open("firmware.bin", &config)?;
//! for block in file.blocks() {
//!     let block = block?;
//!     // Match against `block.data()`, account progress with `block.primary_len()`.
//!     let _ = (block.offset(), block.data(), block.primary_len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Notable entry points
//! - `BlockFile` / `BlockFileConfig` / `Block`: windowed reading.
//! - `evaluate` / `MathExpression`: restricted arithmetic.
//! - `file_size`, `file_checksum`, `unique_file_name`: path helpers.
//! - `strings`: printable-run extraction built on `BlockFile`.

pub mod block_file;
pub mod config;
pub mod errors;
pub mod file_info;
pub mod math_expr;
pub mod strings;
pub mod util;

pub use block_file::{resolve_range, Block, BlockFile, Blocks};
pub use config::{
    BlockFileConfig, ConfigError, OpenMode, ParseModeError, DEFAULT_BLOCK_SIZE, DEFAULT_PEEK_SIZE,
};
pub use errors::{Error, Result};
pub use file_info::{file_checksum, file_size, unique_file_name, CHECKSUM_CHUNK_SIZE};
pub use math_expr::{
    evaluate, BinOp, Expr, ExprError, MathExpression, Number, MAX_DEPTH, MAX_OPERATORS,
};
pub use strings::{is_printable, strings, FoundString, Strings, DEFAULT_MIN_STRING_LEN};
pub use util::{get_quoted_strings, strip_quoted_strings, swap_groups};
