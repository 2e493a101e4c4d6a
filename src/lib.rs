//! InnoDB tablespace page inspector.
//!
//! The `innodb-page-info` crate (library name `ibpage`) decodes the on-disk
//! page format of InnoDB tablespace files (`.ibd`, `ibdata1`) without linking
//! against MySQL. It reads the fixed-offset FIL header and INDEX page header of
//! every 16 KiB page and walks the singly-linked chain of row records stored
//! on B-tree pages. Column values are never interpreted; only header metadata
//! and record linkage are.
//!
//! The decoder is read-only and built to survive damaged input: truncated
//! files, out-of-range record links and cyclic record chains are reported as
//! errors instead of panicking or looping.
//!
//! # CLI Reference
//!
//! ```text
//! ibpage [OPTIONS] <FILE>
//! ```
//!
//! | Option | Purpose |
//! |--------|---------|
//! | `-v, --verbose` | Print one line per page and one line per record |
//! | `-o, --output <FILE>` | Write the report to a file instead of stdout |
//! | `-t, --threads <N>` | Decode pages on `N` worker threads |
//! | `--json` | Emit page summaries as JSON |
//! | `--mmap` | Read the tablespace through a memory map |
//! | `--skip-corrupt` | Skip pages with a corrupt record chain instead of aborting |
//! | `--color <WHEN>` | Control colored output (`auto`, `always`, `never`) |
//!
//! Set `RUST_LOG=ibpage=debug` to log file and page decoding details on stderr.
//!
//! # Library API
//!
//! ```no_run
//! use ibpage::innodb::constants::FIL_PAGE_INDEX;
//! use ibpage::innodb::page_types::page_type_name;
//! use ibpage::innodb::tablespace::TablespaceFile;
//!
//! let ts = TablespaceFile::open("table.ibd");
//! for page in ts.pages().unwrap() {
//!     let page = page.unwrap();
//!     let name = page_type_name(page.get_type()).unwrap_or("unknown");
//!     println!("page {} <{}>", page.get_offset(), name);
//!     if page.get_type() == FIL_PAGE_INDEX {
//!         for record in page.records() {
//!             let record = record.unwrap();
//!             println!("  record at {} next {}", record.offset(), record.header().next);
//!         }
//!     }
//! }
//! ```
//!
//! ## Module overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`innodb::constants`] | Byte offsets, widths and sizes of the page layout |
//! | [`innodb::page_types`] | Page type and insert direction lookup tables |
//! | [`innodb::page`] | FIL header and page header decoders, the [`Page`](innodb::page::Page) aggregate |
//! | [`innodb::record`] | Record header decoder and the record chain walker |
//! | [`innodb::tablespace`] | Lazy page stream over a tablespace file |
//!
//! ## Feature flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli` | on | Builds the `ibpage` binary and enables memory-mapped reads. |

#[cfg(feature = "cli")]
pub mod cli;
pub mod innodb;
pub mod util;

use thiserror::Error;

/// Errors returned by `ibpage` operations.
#[derive(Error, Debug)]
pub enum IbError {
    /// An I/O error occurred (file open, stat, seek or read failure).
    #[error("I/O error: {0}")]
    Io(String),

    /// The tablespace file does not exist.
    #[error("File not found: {0}")]
    NotFound(String),

    /// Fewer bytes are available than a header requires.
    #[error("Truncated {what}: need {needed} bytes, have {available}")]
    Truncated {
        what: &'static str,
        needed: usize,
        available: usize,
    },

    /// A record header window falls outside the page buffer.
    #[error("Record header of {width} bytes ending at offset {offset} is outside a {len}-byte page")]
    OutOfBounds {
        offset: i64,
        width: usize,
        len: usize,
    },

    /// The page's record chain is damaged (bad tag, bad link or a cycle).
    #[error("Corrupt page {page_number}: {reason}")]
    CorruptPage { page_number: u32, reason: String },

    /// A page type or insert direction code is not in the lookup tables.
    #[error("Unknown {kind} code 0x{code:04X}")]
    UnknownCode { kind: &'static str, code: u16 },

    /// An invalid argument was supplied (wrong buffer length, bad option, etc.).
    #[error("Invalid argument: {0}")]
    Argument(String),

    /// A decode failure on one page of a tablespace, with its location.
    #[error("Page {page_num} at byte {file_offset}: {source}")]
    Page {
        page_num: u64,
        file_offset: u64,
        #[source]
        source: Box<IbError>,
    },
}

impl IbError {
    /// Returns true if the error only affects a single page, so a consumer may
    /// skip that page and keep reading the rest of the tablespace.
    pub fn is_page_local(&self) -> bool {
        match self {
            IbError::Truncated { .. }
            | IbError::OutOfBounds { .. }
            | IbError::CorruptPage { .. }
            | IbError::UnknownCode { .. } => true,
            IbError::Page { source, .. } => source.is_page_local(),
            IbError::Io(_) | IbError::NotFound(_) | IbError::Argument(_) => false,
        }
    }
}
