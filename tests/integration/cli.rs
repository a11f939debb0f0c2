use std::fs;
use std::process::{Command, Output};

fn blockscan(args: &[&str]) -> Output {
    let binary = env!("CARGO_BIN_EXE_blockscan");
    Command::new(binary)
        .args(args)
        .output()
        .expect("run blockscan")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn eval_prints_value() {
    let output = blockscan(&["eval", "4+4*2"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), "12");

    let output = blockscan(&["eval", "0x10", "/", "4"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), "4.0");

    let output = blockscan(&["eval", "0xffffffffffffffff"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), "18446744073709551615");
}

#[test]
fn eval_without_value_fails() {
    let output = blockscan(&["eval", "foo()"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).is_empty());
}

#[test]
fn blocks_reports_layout() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let path = tmp.path().join("fw.bin");
    fs::write(&path, vec![0u8; 10_000]).expect("write fixture");
    let path = path.to_str().expect("utf-8 temp path");

    let output = blockscan(&["blocks", path, "--block=0x1000", "--peek=16", "--offset=-9000"]);
    assert!(
        output.status.success(),
        "blocks failed: stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );
    let out = stdout(&output);
    let lines: Vec<&str> = out.lines().collect();
    assert!(lines[0].ends_with("size=10000 offset=1000 length=9000"), "{out}");
    assert_eq!(
        &lines[1..],
        &[
            "0x000003E8 primary=4096 trailing=16",
            "0x000013E8 primary=4096 trailing=16",
            "0x000023E8 primary=808 trailing=0",
        ]
    );
}

#[test]
fn sum_and_size_report_each_path() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let path = tmp.path().join("data.bin");
    fs::write(&path, b"squashfs").expect("write fixture");
    let path = path.to_str().expect("utf-8 temp path");

    let output = blockscan(&["size", path]);
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), format!("8  {path}"));

    let output = blockscan(&["sum", path]);
    assert!(output.status.success());
    let expected = blake3::hash(b"squashfs").to_hex().to_string();
    assert_eq!(stdout(&output).trim(), format!("{expected}  {path}"));
}

#[test]
fn bad_arguments_exit_with_usage() {
    assert_eq!(blockscan(&[]).status.code(), Some(2));
    assert_eq!(blockscan(&["frobnicate"]).status.code(), Some(2));
    assert_eq!(blockscan(&["blocks", "x", "--bogus=1"]).status.code(), Some(2));
    assert_eq!(blockscan(&["strings", "x", "--min=-3"]).status.code(), Some(2));
}
