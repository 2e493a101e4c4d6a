#![cfg(feature = "cli")]
//! Integration tests for the `ibpage` command line and report.

use byteorder::{BigEndian, ByteOrder};
use clap::{CommandFactory, Parser};
use std::io::Write;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tempfile::NamedTempFile;

use ibpage::cli::app::{Cli, ColorMode};
use ibpage::cli::report::{execute, ReportOptions};
use ibpage::innodb::constants::*;

const PS: usize = UNIV_PAGE_SIZE;

fn build_page(page_num: u32, page_type: u16) -> Vec<u8> {
    let mut page = vec![0u8; PS];
    BigEndian::write_u32(&mut page[FIL_PAGE_OFFSET..], page_num);
    BigEndian::write_u16(&mut page[FIL_PAGE_TYPE..], page_type);
    page
}

fn write_tablespace(pages: &[Vec<u8>]) -> NamedTempFile {
    let mut tmp = NamedTempFile::new().expect("create temp file");
    for page in pages {
        tmp.write_all(page).expect("write page");
    }
    tmp.flush().expect("flush");
    tmp
}

fn report(file: &str, verbose: bool) -> String {
    let opts = ReportOptions {
        file: file.to_string(),
        verbose,
        json: false,
        threads: 0,
        mmap: false,
        skip_corrupt: false,
        stop: Arc::new(AtomicBool::new(false)),
    };
    let mut out = Vec::new();
    execute(&opts, &mut out).expect("report should succeed");
    String::from_utf8(out).expect("report should be valid UTF-8")
}

#[test]
fn test_parse_all_options() {
    let cli = Cli::try_parse_from([
        "ibpage",
        "-v",
        "-o",
        "out.txt",
        "-t",
        "4",
        "--json",
        "--mmap",
        "--skip-corrupt",
        "--color",
        "never",
        "t1.ibd",
    ])
    .unwrap();
    assert_eq!(cli.file, "t1.ibd");
    assert!(cli.verbose);
    assert_eq!(cli.output.as_deref(), Some("out.txt"));
    assert_eq!(cli.threads, 4);
    assert!(cli.json && cli.mmap && cli.skip_corrupt);
    assert!(matches!(cli.color, ColorMode::Never));
}

#[test]
fn test_parse_defaults() {
    let cli = Cli::try_parse_from(["ibpage", "ibdata1"]).unwrap();
    assert!(!cli.verbose);
    assert_eq!(cli.threads, 0);
    assert!(cli.output.is_none());
    assert!(matches!(cli.color, ColorMode::Auto));
}

#[test]
fn test_file_is_required() {
    assert!(Cli::try_parse_from(["ibpage"]).is_err());
    assert!(Cli::try_parse_from(["ibpage", "--threads", "many", "t1.ibd"]).is_err());
}

#[test]
fn test_report_counts_pages_per_type() {
    let tmp = write_tablespace(&[
        build_page(0, 8),
        build_page(1, 5),
        build_page(2, 3),
        build_page(3, FIL_PAGE_INDEX),
        build_page(4, FIL_PAGE_INDEX),
        build_page(5, 0),
    ]);
    let out = report(tmp.path().to_str().unwrap(), false);

    assert_eq!(
        out,
        "Total number of page: 6:\n\
         File Space Header: 1\n\
         Insert Buffer Bitmap: 1\n\
         File Segment inode: 1\n\
         B-tree Node: 2\n\
         Freshly Allocated Page: 1\n"
    );
}

#[test]
fn test_report_verbose_lists_every_page() {
    let tmp = write_tablespace(&[build_page(0, 8), build_page(1, FIL_PAGE_INDEX)]);
    let out = report(tmp.path().to_str().unwrap(), true);
    let lines: Vec<&str> = out.lines().collect();

    assert_eq!(lines[0], "page offset 0, page type <File Space Header>");
    assert_eq!(
        lines[1],
        "page offset 1, page type <B-tree Node>, page level <0> - heap top: 0; heap records: 0; records: 0; compact: false"
    );
    assert_eq!(lines[2], "Total number of page: 2:");
}

#[test]
fn test_report_empty_file() {
    let tmp = write_tablespace(&[]);
    let out = report(tmp.path().to_str().unwrap(), false);
    assert_eq!(out, "Total number of page: 0:\n");
}

#[test]
fn test_shell_completions() {
    for shell in [
        clap_complete::Shell::Bash,
        clap_complete::Shell::Zsh,
        clap_complete::Shell::Fish,
    ] {
        let mut cmd = Cli::command();
        let mut buf = Vec::new();
        clap_complete::generate(shell, &mut cmd, "ibpage", &mut buf);
        let output = String::from_utf8(buf).expect("completions should be valid UTF-8");
        assert!(output.contains("ibpage"));
        assert!(output.contains("skip-corrupt"));
    }
}
