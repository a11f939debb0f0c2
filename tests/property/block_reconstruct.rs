//! Property tests for `BlockFile` range handling.
//!
//! However a range is requested and however blocks are sized, the primary
//! segments must tile the resolved range exactly and each block's lookahead
//! must equal the bytes that follow it, cut off at the range end.

use std::io::{Cursor, SeekFrom};

use proptest::prelude::*;

use blockscan::{resolve_range, swap_groups, BlockFile, BlockFileConfig};

fn data_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..600)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn resolved_range_stays_inside_file(
        size in 0u64..10_000,
        offset in -20_000i64..20_000,
        length in 0u64..20_000,
    ) {
        let (start, len) = resolve_range(size, offset, length);
        prop_assert!(start <= size);
        prop_assert!(start + len <= size);
        if length != 0 {
            prop_assert!(len <= length);
        }
    }

    #[test]
    fn primary_segments_tile_the_range(
        data in data_strategy(),
        offset in -700i64..700,
        length in 0u64..700,
        block_size in 1usize..97,
        peek_size in 0usize..40,
    ) {
        let config = BlockFileConfig::default()
            .with_range(offset, length)
            .with_block_size(block_size)
            .with_peek_size(peek_size);
        let mut file = BlockFile::from_handle(Cursor::new(data.clone()), &config).unwrap();
        let start = file.offset() as usize;
        let end = start + file.length() as usize;
        let expected = &data[start..end];

        let mut rebuilt = Vec::new();
        let mut next_offset = file.offset();
        for block in file.blocks() {
            let block = block.unwrap();
            prop_assert_eq!(block.offset(), next_offset);
            prop_assert!(block.primary_len() <= block_size);
            prop_assert!(block.trailing().len() <= peek_size);

            let at = block.offset() as usize;
            let tail_end = (at + block.primary_len() + peek_size).min(end);
            prop_assert_eq!(block.data(), &data[at..tail_end]);

            rebuilt.extend_from_slice(block.primary());
            next_offset += block.primary_len() as u64;
        }
        prop_assert_eq!(rebuilt.as_slice(), expected);
    }

    #[test]
    fn swapped_reads_match_swapped_source(
        data in data_strategy(),
        width in 1usize..9,
        groups in 1usize..20,
    ) {
        let block_size = width * groups;
        let config = BlockFileConfig::default()
            .with_block_size(block_size)
            .with_peek_size(0)
            .with_swap_width(width);
        let mut file = BlockFile::from_handle(Cursor::new(data.clone()), &config).unwrap();
        let mut got = Vec::new();
        for block in file.blocks() {
            got.extend_from_slice(block.unwrap().primary());
        }

        let mut expected = Vec::new();
        for chunk in data.chunks(block_size) {
            let mut chunk = chunk.to_vec();
            swap_groups(&mut chunk, width);
            expected.extend_from_slice(&chunk);
        }
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn seek_never_leaves_the_range(
        data in data_strategy(),
        offset in -700i64..700,
        length in 0u64..700,
        target in -2_000i64..2_000,
        kind in 0u8..3,
    ) {
        let config = BlockFileConfig::default().with_range(offset, length);
        let mut file = BlockFile::from_handle(Cursor::new(data), &config).unwrap();
        let pos = match kind {
            0 => SeekFrom::Start(target.unsigned_abs()),
            1 => SeekFrom::Current(target),
            _ => SeekFrom::End(target),
        };
        let at = file.seek(pos).unwrap();
        prop_assert!(at >= file.offset());
        prop_assert!(at <= file.offset() + file.length());
        prop_assert_eq!(at, file.position());
        prop_assert_eq!(file.remaining(), file.offset() + file.length() - at);
    }
}
