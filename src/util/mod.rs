//! Low-level byte and text helpers behind the block reader.

pub mod bounded_io;
pub mod quoted;
pub mod swap;

pub use bounded_io::{read_up_to, write_full};
pub use quoted::{get_quoted_strings, strip_quoted_strings};
pub use swap::{is_swap_aligned, swap_groups};
