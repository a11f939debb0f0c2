//! Group-wise byte reversal for word-swapped images.
//!
//! Flash dumps taken through a 16- or 32-bit bus often store every word in
//! the opposite byte order. `swap_groups` undoes that by reversing each
//! consecutive `width`-byte group in place.
//!
//! # Edge cases
//! - `width == 0` and `width == 1` leave the block untouched.
//! - When `block.len()` is not a multiple of `width`, the final short group is
//!   reversed on its own. Swapping is then still self-inverse for that block,
//!   but bytes will not line up with a neighboring block that was cut at a
//!   different boundary. Readers should keep block sizes multiples of `width`.

/// Reverses every `width`-byte group of `block` in place.
#[inline]
pub fn swap_groups(block: &mut [u8], width: usize) {
    if width <= 1 {
        return;
    }
    for group in block.chunks_mut(width) {
        group.reverse();
    }
}

/// Returns true when blocks of `len` bytes swap without a short tail group.
#[inline]
pub fn is_swap_aligned(len: usize, width: usize) -> bool {
    width <= 1 || len % width == 0
}
