//! Standalone path helpers used for deduplication and reporting.
//!
//! None of these touch an open [`BlockFile`]'s state; each opens its own
//! handle and releases it before returning.

use std::ffi::OsString;
use std::fs::File;
use std::io::{Seek, SeekFrom};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::block_file::{Block, BlockFile};
use crate::config::BlockFileConfig;
use crate::errors::{Error, Result};

/// Bytes hashed per read in [`file_checksum`].
pub const CHECKSUM_CHUNK_SIZE: usize = 128 * 1024;

/// Returns the size of `path` in bytes.
///
/// Seeks to the end of a read-only handle instead of reading metadata, so
/// block devices report their real capacity.
pub fn file_size(path: impl AsRef<Path>) -> Result<u64> {
    let path = path.as_ref();
    let mut handle = File::open(path).map_err(|err| Error::size_query(path, err))?;
    handle
        .seek(SeekFrom::End(0))
        .map_err(|err| Error::size_query(path, err))
}

/// Returns the BLAKE3 digest of the contents of `path` as lowercase hex.
pub fn file_checksum(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let config = BlockFileConfig::default()
        .with_block_size(CHECKSUM_CHUNK_SIZE)
        .with_peek_size(0);
    let mut file = BlockFile::open(path, &config)?;

    let mut hasher = blake3::Hasher::new();
    let mut block = Block::new();
    loop {
        file.read_block_into(&mut block)?;
        if block.is_empty() {
            break;
        }
        hasher.update(block.primary());
    }

    let digest = hasher.finalize().to_hex().to_string();
    debug!(path = %path.display(), bytes = file.length(), %digest, "checksummed file");
    Ok(digest)
}

/// Returns the first path in `base.ext`, `base-0.ext`, `base-1.ext`, ...
/// that does not exist yet.
///
/// A leading `.` is added to a non-empty `extension` that lacks one. The check
/// is not atomic; create the file with `create_new` if that matters.
pub fn unique_file_name(base: impl AsRef<Path>, extension: &str) -> PathBuf {
    let base = base.as_ref();
    let extension = if extension.is_empty() || extension.starts_with('.') {
        extension.to_owned()
    } else {
        format!(".{extension}")
    };

    let with_suffix = |suffix: &str| {
        let mut name = OsString::from(base.as_os_str());
        name.push(suffix);
        name.push(&extension);
        PathBuf::from(name)
    };

    let mut candidate = with_suffix("");
    let mut id = 0u64;
    while candidate.exists() {
        candidate = with_suffix(&format!("-{id}"));
        id += 1;
    }
    candidate
}
