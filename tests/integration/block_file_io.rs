use std::fs;
use std::io::SeekFrom;

use blockscan::{Block, BlockFile, BlockFileConfig, Error, OpenMode};

fn firmware_image() -> Vec<u8> {
    let mut data: Vec<u8> = (0..8192u32).map(|i| (i % 241) as u8).collect();
    // Straddles the 4 KiB block boundary.
    data[4094..4100].copy_from_slice(b"UBI#\x01\x00");
    data
}

fn write_fixture(dir: &tempfile::TempDir, name: &str, data: &[u8]) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, data).expect("write fixture");
    path
}

/// Returns absolute offsets of `needle` that start inside a primary segment.
fn scan_for(file: &mut BlockFile, needle: &[u8]) -> Vec<u64> {
    let mut hits = Vec::new();
    for block in file.blocks() {
        let block = block.expect("read block");
        let data = block.data();
        for start in 0..block.primary_len() {
            if data[start..].starts_with(needle) {
                hits.push(block.offset() + start as u64);
            }
        }
    }
    hits
}

#[test]
fn signature_across_block_boundary_is_found_once() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let path = write_fixture(&tmp, "fw.bin", &firmware_image());

    let config = BlockFileConfig::default()
        .with_block_size(4096)
        .with_peek_size(16);
    let mut file = BlockFile::open(&path, &config).expect("open");
    assert_eq!(scan_for(&mut file, b"UBI#"), vec![4094]);

    // Without lookahead the straddling signature is invisible.
    let config = config.with_peek_size(0);
    let mut file = BlockFile::open(&path, &config).expect("open");
    assert!(scan_for(&mut file, b"UBI#").is_empty());
}

#[test]
fn negative_offset_reads_file_tail() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let data = firmware_image();
    let path = write_fixture(&tmp, "fw.bin", &data);

    let config = BlockFileConfig::default().with_range(-100, 0);
    let mut file = BlockFile::open(&path, &config).expect("open");
    assert_eq!(file.size(), data.len() as u64);
    assert_eq!(file.offset(), data.len() as u64 - 100);
    assert_eq!(file.length(), 100);
    assert_eq!(file.read_remaining().expect("read"), &data[data.len() - 100..]);
    assert!(file.read(1).expect("read at end").is_empty());
}

#[test]
fn oversized_range_is_clamped_to_file() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let path = write_fixture(&tmp, "small.bin", b"0123456789");

    let config = BlockFileConfig::default().with_range(6, 1_000_000);
    let mut file = BlockFile::open(&path, &config).expect("open");
    assert_eq!((file.offset(), file.length()), (6, 4));
    assert_eq!(file.read(100).expect("read"), b"6789");

    let config = BlockFileConfig::default().with_range(50, 0);
    let mut file = BlockFile::open(&path, &config).expect("open");
    assert_eq!((file.offset(), file.length()), (10, 0));
    assert!(file.read_block().expect("read block").is_empty());
}

#[test]
fn reset_replays_identical_blocks() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let path = write_fixture(&tmp, "fw.bin", &firmware_image());

    let config = BlockFileConfig::default()
        .with_range(1000, 5000)
        .with_block_size(1500)
        .with_peek_size(64);
    let mut file = BlockFile::open(&path, &config).expect("open");

    let first: Vec<Block> = file.blocks().map(|b| b.expect("block")).collect();
    file.set_block_sizes(Some(7), Some(0)).expect("resize");
    file.reset().expect("reset");
    assert_eq!((file.block_size(), file.peek_size()), (1500, 64));
    let second: Vec<Block> = file.blocks().map(|b| b.expect("block")).collect();

    assert_eq!(first.len(), 4);
    for (a, b) in first.iter().zip(&second) {
        assert_eq!(a.offset(), b.offset());
        assert_eq!(a.data(), b.data());
        assert_eq!(a.primary_len(), b.primary_len());
    }
    // Lookahead never reaches past the logical range.
    let last = first.last().expect("last block");
    assert_eq!(last.offset() + last.len() as u64, 6000);
}

#[test]
fn swap_width_applies_to_file_reads() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let path = write_fixture(&tmp, "be.bin", &[0x12, 0x34, 0x56, 0x78, 0x9a, 0xbc, 0xde, 0xf0]);

    let config = BlockFileConfig::default()
        .with_block_size(4)
        .with_peek_size(4)
        .with_swap_width(4);
    let mut file = BlockFile::open(&path, &config).expect("open");
    let block = file.read_block().expect("read block");
    assert_eq!(block.primary(), &[0x78, 0x56, 0x34, 0x12]);
    assert_eq!(block.trailing(), &[0xf0, 0xde, 0xbc, 0x9a]);
}

#[test]
fn read_write_mode_patches_in_place() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let path = write_fixture(&tmp, "patch.bin", b"AAAAAAAAAA");

    let config = BlockFileConfig::default().with_mode(OpenMode::ReadWrite);
    let mut file = BlockFile::open(&path, &config).expect("open");
    assert_eq!(file.seek(SeekFrom::Start(3)).expect("seek"), 3);
    assert_eq!(file.write(b"xyz").expect("write"), 3);
    assert_eq!(file.cursor(), 6);
    file.flush().expect("flush");
    file.reset().expect("reset");
    assert_eq!(file.read_remaining().expect("read"), b"AAAxyzAAAA");
    drop(file);

    assert_eq!(fs::read(&path).expect("read back"), b"AAAxyzAAAA");
}

#[test]
fn write_mode_creates_and_truncates() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let path = write_fixture(&tmp, "out.bin", b"stale contents");

    let config = BlockFileConfig::default().with_mode(OpenMode::Write);
    let mut file = BlockFile::open(&path, &config).expect("open");
    assert_eq!((file.size(), file.length()), (0, 0));
    assert_eq!(file.write(b"fresh").expect("write"), 5);
    assert_eq!(file.cursor(), 0);
    assert!(matches!(file.read(1), Err(Error::AccessDenied { op: "read" })));
    file.flush().expect("flush");
    drop(file);

    assert_eq!(fs::read(&path).expect("read back"), b"fresh");
}

#[test]
fn read_mode_rejects_writes() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let path = write_fixture(&tmp, "ro.bin", b"data");

    let mut file = BlockFile::open(&path, &BlockFileConfig::default()).expect("open");
    assert!(matches!(file.write(b"x"), Err(Error::AccessDenied { op: "write" })));
    assert_eq!(fs::read(&path).expect("read back"), b"data");
}

#[test]
fn open_failure_names_path() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let path = tmp.path().join("missing.bin");

    let err = match BlockFile::open(&path, &BlockFileConfig::default()) {
        Ok(_) => panic!("opening a missing file should fail"),
        Err(err) => err,
    };
    match &err {
        Error::File { path: p, source } => {
            assert_eq!(p, &path);
            assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.to_string().contains("missing.bin"));
}

#[test]
fn invalid_config_is_rejected_before_open() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let path = tmp.path().join("never-created.bin");

    let config = BlockFileConfig::default()
        .with_mode(OpenMode::Write)
        .with_block_size(0);
    assert!(matches!(
        BlockFile::open(&path, &config),
        Err(Error::InvalidConfig(_))
    ));
    assert!(!path.exists());
}
