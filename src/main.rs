//! blockscan CLI
//!
//! Small front end over the library for inspecting files the way a scanner
//! sees them.
//!
//! # Usage
//!
//! ```text
//! blockscan blocks <path> [--offset=N] [--length=N] [--block=N] [--peek=N] [--swap=N]
//! blockscan strings <path> [--min=N]
//! blockscan sum <path>...
//! blockscan size <path>...
//! blockscan eval <expression>
//! ```
//!
//! Numeric flags accept plain integers (including negative offsets) or any
//! expression `eval` understands, e.g. `--block=0x400*4`.
//!
//! Logging goes to stderr and is controlled by `RUST_LOG`.
//!
//! # Exit Codes
//!
//! - `0`: Success
//! - `1`: An operation failed, or `eval` produced no value
//! - `2`: Invalid arguments

use std::env;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;

use blockscan::{
    evaluate, file_checksum, file_size, strings, BlockFile, BlockFileConfig,
    DEFAULT_MIN_STRING_LEN,
};
use tracing_subscriber::EnvFilter;

fn print_usage(exe: &std::ffi::OsStr) {
    eprintln!(
        "usage: {0} <COMMAND> [ARGS]

COMMANDS:
    blocks <path>        Show how a file is split into blocks
        --offset=<N>     Start of range; negative counts from end (default: 0)
        --length=<N>     Bytes in range; 0 means rest of file (default: 0)
        --block=<N>      Primary bytes per block (default: 1 MiB)
        --peek=<N>       Lookahead bytes per block (default: 8 KiB)
        --swap=<N>       Reverse every N-byte group (default: 0, off)
    strings <path>       Print printable runs with their offsets
        --min=<N>        Minimum run length (default: {1})
    sum <path>...        Print BLAKE3 checksums
    size <path>...       Print file sizes
    eval <expression>    Evaluate an arithmetic expression
    --help, -h           Show this help message",
        exe.to_string_lossy(),
        DEFAULT_MIN_STRING_LEN
    );
}

fn usage_error(exe: &std::ffi::OsStr, msg: &str) -> ExitCode {
    eprintln!("error: {msg}");
    eprintln!();
    print_usage(exe);
    ExitCode::from(2)
}

/// Parses an integer flag value, falling back to the expression evaluator.
fn parse_int(value: &str) -> Option<i64> {
    if let Ok(n) = value.parse::<i64>() {
        return Some(n);
    }
    evaluate(value)?.as_i64()
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let mut args = env::args_os();
    let exe = args.next().unwrap_or_else(|| "blockscan".into());
    let Some(command) = args.next() else {
        print_usage(&exe);
        return ExitCode::from(2);
    };
    let rest: Vec<OsString> = args.collect();

    match command.to_string_lossy().as_ref() {
        "--help" | "-h" => {
            print_usage(&exe);
            ExitCode::SUCCESS
        }
        "blocks" => cmd_blocks(&exe, rest),
        "strings" => cmd_strings(&exe, rest),
        "sum" => cmd_sum(&exe, rest),
        "size" => cmd_size(&exe, rest),
        "eval" => cmd_eval(&exe, rest),
        other => usage_error(&exe, &format!("unknown command '{other}'")),
    }
}

/// Splits arguments into `--key=value` flags and positional paths.
fn split_args(
    exe: &std::ffi::OsStr,
    args: Vec<OsString>,
    known: &[&str],
) -> Result<(Vec<(String, i64)>, Vec<PathBuf>), ExitCode> {
    let mut flags = Vec::new();
    let mut paths = Vec::new();
    for arg in args {
        let Some(flag) = arg.to_str().and_then(|s| s.strip_prefix("--")) else {
            paths.push(PathBuf::from(arg));
            continue;
        };
        let Some((key, value)) = flag.split_once('=') else {
            return Err(usage_error(exe, &format!("expected --{flag}=<N>")));
        };
        if !known.contains(&key) {
            return Err(usage_error(exe, &format!("unknown flag --{key}")));
        }
        let Some(n) = parse_int(value) else {
            return Err(usage_error(exe, &format!("invalid --{key} value: {value}")));
        };
        flags.push((key.to_owned(), n));
    }
    Ok((flags, paths))
}

fn single_path(exe: &std::ffi::OsStr, mut paths: Vec<PathBuf>) -> Result<PathBuf, ExitCode> {
    if paths.len() != 1 {
        return Err(usage_error(exe, "expected exactly one path"));
    }
    Ok(paths.remove(0))
}

fn non_negative(exe: &std::ffi::OsStr, key: &str, n: i64) -> Result<usize, ExitCode> {
    usize::try_from(n).map_err(|_| usage_error(exe, &format!("--{key} must be >= 0")))
}

fn cmd_blocks(exe: &std::ffi::OsStr, args: Vec<OsString>) -> ExitCode {
    let (flags, paths) = match split_args(exe, args, &["offset", "length", "block", "peek", "swap"])
    {
        Ok(parsed) => parsed,
        Err(code) => return code,
    };
    let path = match single_path(exe, paths) {
        Ok(path) => path,
        Err(code) => return code,
    };

    let mut config = BlockFileConfig::default();
    for (key, n) in flags {
        let applied = match key.as_str() {
            "offset" => {
                config.offset = n;
                Ok(())
            }
            "length" => non_negative(exe, &key, n).map(|v| config.length = v as u64),
            "block" => non_negative(exe, &key, n).map(|v| config.block_size = v),
            "peek" => non_negative(exe, &key, n).map(|v| config.peek_size = v),
            "swap" => non_negative(exe, &key, n).map(|v| config.swap_width = v),
            _ => Ok(()),
        };
        if let Err(code) = applied {
            return code;
        }
    }

    let mut file = match BlockFile::open(&path, &config) {
        Ok(file) => file,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };
    println!(
        "file={} size={} offset={} length={}",
        path.display(),
        file.size(),
        file.offset(),
        file.length()
    );

    let mut blocks = 0u64;
    let mut bytes = 0u64;
    for block in file.blocks() {
        let block = match block {
            Ok(block) => block,
            Err(err) => {
                eprintln!("{err}");
                return ExitCode::FAILURE;
            }
        };
        println!(
            "0x{:08X} primary={} trailing={}",
            block.offset(),
            block.primary_len(),
            block.trailing().len()
        );
        blocks += 1;
        bytes += block.primary_len() as u64;
    }
    eprintln!("blocks={blocks} bytes={bytes}");
    ExitCode::SUCCESS
}

fn cmd_strings(exe: &std::ffi::OsStr, args: Vec<OsString>) -> ExitCode {
    let (flags, paths) = match split_args(exe, args, &["min"]) {
        Ok(parsed) => parsed,
        Err(code) => return code,
    };
    let path = match single_path(exe, paths) {
        Ok(path) => path,
        Err(code) => return code,
    };
    let mut minimum = DEFAULT_MIN_STRING_LEN;
    for (key, n) in flags {
        match non_negative(exe, &key, n) {
            Ok(v) => minimum = v,
            Err(code) => return code,
        }
    }

    let found = match strings(&path, minimum) {
        Ok(found) => found,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };
    for item in found {
        match item {
            Ok(s) => println!("0x{:08X} {}", s.offset, s.text.escape_debug()),
            Err(err) => {
                eprintln!("{err}");
                return ExitCode::FAILURE;
            }
        }
    }
    ExitCode::SUCCESS
}

fn cmd_sum(exe: &std::ffi::OsStr, args: Vec<OsString>) -> ExitCode {
    if args.is_empty() {
        return usage_error(exe, "expected at least one path");
    }
    let mut status = ExitCode::SUCCESS;
    for arg in args {
        let path = PathBuf::from(arg);
        match file_checksum(&path) {
            Ok(digest) => println!("{digest}  {}", path.display()),
            Err(err) if err.is_interrupted() => {
                eprintln!("{err}");
                return ExitCode::FAILURE;
            }
            Err(err) => {
                eprintln!("{err}");
                status = ExitCode::FAILURE;
            }
        }
    }
    status
}

fn cmd_size(exe: &std::ffi::OsStr, args: Vec<OsString>) -> ExitCode {
    if args.is_empty() {
        return usage_error(exe, "expected at least one path");
    }
    let mut status = ExitCode::SUCCESS;
    for arg in args {
        let path = PathBuf::from(arg);
        match file_size(&path) {
            Ok(size) => println!("{size}  {}", path.display()),
            Err(err) if err.is_interrupted() => {
                eprintln!("{err}");
                return ExitCode::FAILURE;
            }
            Err(err) => {
                eprintln!("{err}");
                status = ExitCode::FAILURE;
            }
        }
    }
    status
}

fn cmd_eval(exe: &std::ffi::OsStr, args: Vec<OsString>) -> ExitCode {
    if args.is_empty() {
        return usage_error(exe, "expected an expression");
    }
    let text = args
        .iter()
        .map(|a| a.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ");
    match evaluate(&text) {
        Some(value) => {
            println!("{value}");
            ExitCode::SUCCESS
        }
        None => {
            eprintln!("no value for '{text}'");
            ExitCode::FAILURE
        }
    }
}
