//! Windowed sequential reader with trailing lookahead.
//!
//! A [`BlockFile`] exposes a logical byte range `[offset, offset + length)` of
//! an owned handle and hands it out in blocks. Each [`Block`] holds a primary
//! segment, which advances the reader, followed by up to `peek_size` bytes of
//! lookahead that do not. A matcher can therefore see a signature that starts
//! near the end of one primary segment in full, while the next block still
//! starts right after the primary bytes, so nothing is skipped.
//!
//! ```text
//!  file:   |----------- offset -----------|======== length ========|---|
//!  block0:                                [primary 0][peek]
//!  block1:                                           [primary 1][peek]
//! ```
//!
//! # Invariants
//! - `offset + length <= size`; both are normalized once at open time.
//! - `cursor <= length`. Every read returns at most `length - cursor` bytes.
//! - `peek` leaves `cursor` and the handle position as they were, including
//!   when the underlying read fails.
//! - The swap transform is applied to bytes returned by reads only.
//!
//! # Range normalization
//! - A negative `offset` counts back from end of file. When no explicit
//!   length is given, the length becomes `|offset|`. An explicit length is
//!   kept (then clamped), never overridden by `|offset|`.
//! - `length == 0` means "to the end of file".
//! - Values past either end are clamped. Clamping is not an error.
//!
//! # Concurrency
//! A reader owns its handle exclusively. `peek` saves and restores the single
//! handle position, so every positional operation takes `&mut self`.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};

use tracing::{debug, trace, warn};

use crate::config::{BlockFileConfig, ConfigError, OpenMode};
use crate::errors::{Error, Result};
use crate::util::{is_swap_aligned, read_up_to, swap_groups, write_full};

/// One block: primary bytes followed by trailing lookahead.
///
/// Only the first [`primary_len`](Block::primary_len) bytes count as consumed.
/// Offsets of matches found in the trailing segment will be seen again, as
/// primary bytes, in the next block.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Block {
    offset: u64,
    data: Vec<u8>,
    primary_len: usize,
}

impl Block {
    /// Creates an empty block, useful as a reusable buffer for
    /// [`BlockFile::read_block_into`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Absolute file offset of the first byte in [`data`](Block::data).
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Primary bytes followed by the trailing lookahead.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The consumed portion of the block.
    pub fn primary(&self) -> &[u8] {
        &self.data[..self.primary_len]
    }

    /// The lookahead portion of the block.
    pub fn trailing(&self) -> &[u8] {
        &self.data[self.primary_len..]
    }

    pub fn primary_len(&self) -> usize {
        self.primary_len
    }

    /// Total bytes, primary plus trailing.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True when no primary bytes remain; a scan loop stops here.
    pub fn is_empty(&self) -> bool {
        self.primary_len == 0
    }

    /// Splits into `(combined_bytes, primary_len)`.
    pub fn into_parts(self) -> (Vec<u8>, usize) {
        (self.data, self.primary_len)
    }

    fn clear(&mut self, offset: u64) {
        self.offset = offset;
        self.data.clear();
        self.primary_len = 0;
    }
}

/// Resolves a requested `(offset, length)` against a file of `size` bytes.
///
/// Returns the effective absolute offset and logical length, satisfying
/// `offset + length <= size`.
pub fn resolve_range(size: u64, offset: i64, length: u64) -> (u64, u64) {
    let size_i = i128::from(size);
    let start = if offset < 0 {
        size_i + i128::from(offset)
    } else {
        i128::from(offset)
    };
    let start = start.clamp(0, size_i) as u64;

    let requested = if length != 0 {
        i128::from(length)
    } else if offset < 0 {
        i128::from(offset).abs()
    } else {
        size_i - i128::from(offset)
    };
    let available = size - start;
    let length = (requested.clamp(0, size_i) as u64).min(available);

    (start, length)
}

/// Sequential block reader over a logical range of an owned handle.
#[derive(Debug)]
pub struct BlockFile<F = File> {
    handle: F,
    path: Option<PathBuf>,
    mode: OpenMode,
    size: u64,
    offset: u64,
    length: u64,
    cursor: u64,
    block_size: usize,
    peek_size: usize,
    base_block_size: usize,
    base_peek_size: usize,
    swap_width: usize,
}

impl BlockFile<File> {
    /// Opens `path` and positions the reader at the start of the configured
    /// range.
    ///
    /// The file size is measured by seeking to the end of the opened handle,
    /// which also works for block devices.
    pub fn open(path: impl AsRef<Path>, config: &BlockFileConfig) -> Result<Self> {
        let path = path.as_ref();
        config.validate()?;

        let mut options = OpenOptions::new();
        match config.mode {
            OpenMode::Read => options.read(true),
            OpenMode::Write => options.write(true).create(true).truncate(true),
            OpenMode::ReadWrite => options.read(true).write(true),
        };
        let mut handle = options.open(path).map_err(|err| Error::file(path, err))?;
        let size = handle
            .seek(SeekFrom::End(0))
            .map_err(|err| Error::size_query(path, err))?;

        let file = Self::init(handle, size, Some(path.to_path_buf()), config)?;
        debug!(
            path = %path.display(),
            mode = ?config.mode,
            size,
            offset = file.offset,
            length = file.length,
            "opened block file"
        );
        Ok(file)
    }
}

impl<F: Seek> BlockFile<F> {
    /// Wraps an already-open handle. The size is measured by seeking to the
    /// end; the handle's current position is ignored.
    pub fn from_handle(mut handle: F, config: &BlockFileConfig) -> Result<Self> {
        config.validate()?;
        let size = handle.seek(SeekFrom::End(0)).map_err(Error::io)?;
        Self::init(handle, size, None, config)
    }

    fn init(
        mut handle: F,
        size: u64,
        path: Option<PathBuf>,
        config: &BlockFileConfig,
    ) -> Result<Self> {
        let (offset, length) = resolve_range(size, config.offset, config.length);
        let clamped = i128::from(offset) != i128::from(config.offset)
            || (config.length != 0 && length != config.length);
        if clamped {
            debug!(
                path = ?path,
                size,
                requested_offset = config.offset,
                requested_length = config.length,
                offset,
                length,
                "normalized block file range"
            );
        }
        if !is_swap_aligned(config.block_size, config.swap_width) {
            warn!(
                path = ?path,
                block_size = config.block_size,
                swap_width = config.swap_width,
                "block size is not a multiple of the swap width; block tails will not swap cleanly"
            );
        }

        handle.seek(SeekFrom::Start(offset)).map_err(|err| match &path {
            Some(p) => Error::file(p, err),
            None => Error::io(err),
        })?;

        Ok(Self {
            handle,
            path,
            mode: config.mode,
            size,
            offset,
            length,
            cursor: 0,
            block_size: config.block_size,
            peek_size: config.peek_size,
            base_block_size: config.block_size,
            base_peek_size: config.peek_size,
            swap_width: config.swap_width,
        })
    }

    fn io_err(&self, err: io::Error) -> Error {
        match &self.path {
            Some(path) => Error::file(path, err),
            None => Error::io(err),
        }
    }

    /// Repositions within the logical range and returns the new absolute
    /// position.
    ///
    /// `Start` is absolute, `Current` is relative to the logical position and
    /// `End` is relative to the end of the underlying file. The target is
    /// clamped into `[offset, offset + length]`.
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        let target = match pos {
            SeekFrom::Start(abs) => i128::from(abs),
            SeekFrom::Current(delta) => i128::from(self.position()) + i128::from(delta),
            SeekFrom::End(delta) => i128::from(self.size) + i128::from(delta),
        };
        let lo = i128::from(self.offset);
        let hi = i128::from(self.offset + self.length);
        let target = target.clamp(lo, hi) as u64;

        self.handle
            .seek(SeekFrom::Start(target))
            .map_err(|err| self.io_err(err))?;
        self.cursor = target - self.offset;
        Ok(target)
    }

    /// Restores the construction-time block sizes and rewinds to `offset`.
    pub fn reset(&mut self) -> Result<()> {
        self.block_size = self.base_block_size;
        self.peek_size = self.base_peek_size;
        self.seek(SeekFrom::Start(self.offset))?;
        Ok(())
    }

    /// Unwraps the reader, returning the handle at its current position.
    pub fn into_inner(self) -> F {
        self.handle
    }
}

impl<F> BlockFile<F> {
    /// Size of the underlying file when it was opened.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Absolute start of the logical range.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Length of the logical range.
    pub fn length(&self) -> u64 {
        self.length
    }

    /// Bytes consumed relative to [`offset`](BlockFile::offset).
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Logical bytes not yet consumed.
    pub fn remaining(&self) -> u64 {
        self.length - self.cursor
    }

    /// Absolute position of the next byte to be consumed.
    pub fn position(&self) -> u64 {
        self.offset + self.cursor
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn peek_size(&self) -> usize {
        self.peek_size
    }

    pub fn swap_width(&self) -> usize {
        self.swap_width
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    /// Path the reader was opened from, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get_ref(&self) -> &F {
        &self.handle
    }

    /// Changes the primary and/or peek size for subsequent blocks.
    ///
    /// `None` leaves that size unchanged. A scanner may, for example, shrink
    /// the block size near the end of a range.
    pub fn set_block_sizes(&mut self, block: Option<usize>, peek: Option<usize>) -> Result<()> {
        if block == Some(0) {
            return Err(ConfigError::BlockSizeZero.into());
        }
        if let Some(block) = block {
            self.block_size = block;
        }
        if let Some(peek) = peek {
            self.peek_size = peek;
        }
        Ok(())
    }
}

impl<F: Read + Seek> BlockFile<F> {
    /// Reads up to `n` logical bytes, advancing the cursor.
    ///
    /// Returns fewer than `n` bytes at the end of the range or file, and an
    /// empty vector once the range is exhausted.
    pub fn read(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.read_into(n, &mut out)?;
        Ok(out)
    }

    /// Reads everything left in the logical range.
    pub fn read_remaining(&mut self) -> Result<Vec<u8>> {
        let n = usize::try_from(self.remaining()).unwrap_or(usize::MAX);
        self.read(n)
    }

    /// Like [`read`](BlockFile::read), but leaves the cursor and handle
    /// position unchanged.
    pub fn peek(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.peek_into(n, &mut out)?;
        Ok(out)
    }

    /// Reads the next block: up to `block_size` primary bytes followed by up
    /// to `peek_size` lookahead bytes.
    pub fn read_block(&mut self) -> Result<Block> {
        let mut block = Block::new();
        self.read_block_into(&mut block)?;
        Ok(block)
    }

    /// Reads the next block into `block`, reusing its allocation.
    pub fn read_block_into(&mut self, block: &mut Block) -> Result<()> {
        block.clear(self.position());

        let primary_len = self.read_into(self.block_size, &mut block.data)?;
        block.primary_len = primary_len;
        let trailing_len = self.peek_into(self.peek_size, &mut block.data)?;

        trace!(
            offset = block.offset,
            primary_len,
            trailing_len,
            remaining = self.remaining(),
            "read block"
        );
        Ok(())
    }

    /// Iterates over blocks until the logical range is exhausted.
    pub fn blocks(&mut self) -> Blocks<'_, F> {
        Blocks {
            file: self,
            done: false,
        }
    }

    /// Appends up to `n` logical bytes to `out`, returning the count.
    fn read_into(&mut self, n: usize, out: &mut Vec<u8>) -> Result<usize> {
        if !self.mode.can_read() {
            return Err(Error::AccessDenied { op: "read" });
        }
        let remaining = self.remaining();
        if remaining == 0 || n == 0 {
            return Ok(0);
        }
        let want = usize::try_from(remaining).map_or(n, |r| r.min(n));

        let start = out.len();
        let got = read_up_to(&mut self.handle, want, out).map_err(|err| self.io_err(err))?;
        swap_groups(&mut out[start..], self.swap_width);
        self.cursor += got as u64;
        Ok(got)
    }

    fn peek_into(&mut self, n: usize, out: &mut Vec<u8>) -> Result<usize> {
        let mut guard = PositionGuard::new(self)?;
        let got = guard.read_into(n, out)?;
        guard.restore()?;
        Ok(got)
    }
}

impl<F: Write + Seek> BlockFile<F> {
    /// Writes all of `data` at the current handle position.
    ///
    /// Writes are not bounded by the logical range. The cursor advances with
    /// the written bytes but never past `length`.
    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        if !self.mode.can_write() {
            return Err(Error::AccessDenied { op: "write" });
        }
        let written = write_full(&mut self.handle, data).map_err(|err| self.io_err(err))?;
        self.cursor = self.cursor.saturating_add(written as u64).min(self.length);
        Ok(written)
    }

    /// Flushes the underlying handle.
    pub fn flush(&mut self) -> Result<()> {
        self.handle.flush().map_err(|err| self.io_err(err))
    }
}

/// Saves the handle position and cursor; restores both when dropped or on
/// [`restore`](PositionGuard::restore).
///
/// Dropping without `restore` (an early `?` return) restores on a best-effort
/// basis, since `Drop` cannot report a failing seek.
struct PositionGuard<'a, F: Seek> {
    file: &'a mut BlockFile<F>,
    pos: u64,
    cursor: u64,
    armed: bool,
}

impl<'a, F: Seek> PositionGuard<'a, F> {
    fn new(file: &'a mut BlockFile<F>) -> Result<Self> {
        let pos = file
            .handle
            .stream_position()
            .map_err(|err| file.io_err(err))?;
        let cursor = file.cursor;
        Ok(Self {
            file,
            pos,
            cursor,
            armed: true,
        })
    }

    fn restore(mut self) -> Result<()> {
        self.armed = false;
        self.file.cursor = self.cursor;
        self.file
            .handle
            .seek(SeekFrom::Start(self.pos))
            .map_err(|err| self.file.io_err(err))?;
        Ok(())
    }
}

impl<F: Seek> Deref for PositionGuard<'_, F> {
    type Target = BlockFile<F>;

    fn deref(&self) -> &Self::Target {
        self.file
    }
}

impl<F: Seek> DerefMut for PositionGuard<'_, F> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.file
    }
}

impl<F: Seek> Drop for PositionGuard<'_, F> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        self.file.cursor = self.cursor;
        if let Err(err) = self.file.handle.seek(SeekFrom::Start(self.pos)) {
            warn!(pos = self.pos, %err, "failed to restore position after peek");
        }
    }
}

/// Iterator over the blocks of a [`BlockFile`]. See [`BlockFile::blocks`].
///
/// Stops after the first block with an empty primary segment or after the
/// first error.
pub struct Blocks<'a, F> {
    file: &'a mut BlockFile<F>,
    done: bool,
}

impl<F: Read + Seek> Iterator for Blocks<'_, F> {
    type Item = Result<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.file.read_block() {
            Ok(block) if block.is_empty() => {
                self.done = true;
                None
            }
            Ok(block) => Some(Ok(block)),
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}
