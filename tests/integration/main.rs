//! Integration tests for blockscan.
//!
//! Run with: `cargo test --test integration`

mod block_file_io;
mod cli;
