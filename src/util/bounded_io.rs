//! Full-transfer read and write loops over partial-transfer handles.
//!
//! `Read::read` and `Write::write` may move fewer bytes than asked. These
//! helpers loop until the request is satisfied (writes) or the source reports
//! end of data (reads).
//!
//! # Invariants
//! - `write_full` returns only after every byte was accepted, or with an error.
//! - `read_up_to` never appends more than `n` bytes to `out`; on error `out`
//!   is restored to its original length.
//! - `ErrorKind::Interrupted` is returned to the caller immediately. Unlike
//!   `Read::read_exact`, nothing here retries an interrupted call.

use std::io::{self, Read, Write};

/// Reads up to `n` bytes from `reader`, appending them to `out`.
///
/// Loops over short reads until `n` bytes were collected or the reader
/// returns `Ok(0)`. Returns the number of bytes appended, which may be less
/// than `n` (including zero) at end of data.
pub fn read_up_to<R: Read + ?Sized>(
    reader: &mut R,
    n: usize,
    out: &mut Vec<u8>,
) -> io::Result<usize> {
    let start = out.len();
    out.resize(start + n, 0);

    let mut filled = 0usize;
    while filled < n {
        match reader.read(&mut out[start + filled..start + n]) {
            Ok(0) => break,
            Ok(read) => {
                debug_assert!(read <= n - filled);
                filled += read;
            }
            Err(err) => {
                out.truncate(start);
                return Err(err);
            }
        }
    }

    out.truncate(start + filled);
    Ok(filled)
}

/// Writes all of `data` to `writer`, returning `data.len()`.
///
/// A writer that accepts zero bytes for a non-empty buffer is reported as
/// `ErrorKind::WriteZero` rather than spinning.
pub fn write_full<W: Write + ?Sized>(writer: &mut W, data: &[u8]) -> io::Result<usize> {
    let mut written = 0usize;
    while written < data.len() {
        let n = writer.write(&data[written..])?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                "underlying handle accepted no bytes",
            ));
        }
        written += n;
    }
    Ok(written)
}
