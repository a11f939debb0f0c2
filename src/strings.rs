//! Printable-string extraction in the manner of `strings(1)`.
//!
//! Walks a [`BlockFile`] block by block and yields every run of printable
//! ASCII (letters, digits, punctuation, space, and `\t \n \r \x0b \x0c`) at
//! least `minimum` bytes long. Only primary segments are consumed, so a run
//! that crosses a block boundary is stitched together rather than reported
//! twice. A run that reaches the end of the range is reported as well.

use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use crate::block_file::{Block, BlockFile};
use crate::config::BlockFileConfig;
use crate::errors::Result;

/// Default minimum run length.
pub const DEFAULT_MIN_STRING_LEN: usize = 4;

/// A printable run and the absolute offset of its first byte.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FoundString {
    pub offset: u64,
    pub text: String,
}

/// Returns true for bytes `strings` treats as printable.
#[inline]
pub fn is_printable(b: u8) -> bool {
    matches!(b, 0x20..=0x7e | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c)
}

/// Opens `path` and iterates over its printable runs.
pub fn strings(path: impl AsRef<Path>, minimum: usize) -> Result<Strings<File>> {
    let config = BlockFileConfig::default().with_peek_size(0);
    let file = BlockFile::open(path, &config)?;
    Ok(Strings::new(file, minimum))
}

/// Iterator over printable runs. See [`strings`].
pub struct Strings<F> {
    file: BlockFile<F>,
    block: Block,
    pos: usize,
    run: Vec<u8>,
    run_start: u64,
    minimum: usize,
    done: bool,
}

impl<F: Read + Seek> Strings<F> {
    /// Wraps an open reader. A `minimum` of 0 is treated as 1.
    pub fn new(file: BlockFile<F>, minimum: usize) -> Self {
        Self {
            file,
            block: Block::new(),
            pos: 0,
            run: Vec::new(),
            run_start: 0,
            minimum: minimum.max(1),
            done: false,
        }
    }

    fn take_run(&mut self) -> FoundString {
        let bytes = std::mem::take(&mut self.run);
        // Printable bytes are all ASCII.
        let text = bytes.into_iter().map(char::from).collect();
        FoundString {
            offset: self.run_start,
            text,
        }
    }
}

impl<F: Read + Seek> Iterator for Strings<F> {
    type Item = Result<FoundString>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            if self.pos >= self.block.primary_len() {
                if let Err(err) = self.file.read_block_into(&mut self.block) {
                    self.done = true;
                    return Some(Err(err));
                }
                self.pos = 0;
                if self.block.is_empty() {
                    self.done = true;
                    if self.run.len() >= self.minimum {
                        return Some(Ok(self.take_run()));
                    }
                    return None;
                }
            }

            let primary = self.block.primary();
            while self.pos < primary.len() {
                let b = primary[self.pos];
                let at = self.block.offset() + self.pos as u64;
                self.pos += 1;

                if is_printable(b) {
                    if self.run.is_empty() {
                        self.run_start = at;
                    }
                    self.run.push(b);
                } else if self.run.len() >= self.minimum {
                    return Some(Ok(self.take_run()));
                } else {
                    self.run.clear();
                }
            }
        }
        None
    }
}
