//! Command-line layer for the `ibpage` binary.
//!
//! Argument parsing uses clap derive macros. The [`app::Cli`] struct is
//! defined in [`app`] and shared between `main.rs` and `build.rs` (for man
//! page and completion generation) via `include!()`.
//!
//! The report itself lives in [`report`]: a [`report::ReportOptions`] struct
//! holding the parsed arguments and a
//! `pub fn execute(opts, writer) -> Result<(), IbError>` entry point. The
//! `writer: &mut dyn Write` parameter lets tests capture the output and the
//! `--output` flag redirect it to a file.
//!
//! A progress bar (via [`indicatif`]) is drawn on stderr for plain text runs.
//! The `wprintln!` and `wprint!` macros wrap `writeln!`/`write!` to convert
//! `io::Error` into `IbError`.

pub mod app;
pub mod report;

/// Write a line to the given writer, converting io::Error to IbError.
macro_rules! wprintln {
    ($w:expr) => {
        writeln!($w).map_err(|e| $crate::IbError::Io(e.to_string()))
    };
    ($w:expr, $($arg:tt)*) => {
        writeln!($w, $($arg)*).map_err(|e| $crate::IbError::Io(e.to_string()))
    };
}

/// Write (without newline) to the given writer, converting io::Error to IbError.
macro_rules! wprint {
    ($w:expr, $($arg:tt)*) => {
        write!($w, $($arg)*).map_err(|e| $crate::IbError::Io(e.to_string()))
    };
}

pub(crate) use wprint;
pub(crate) use wprintln;

use indicatif::{ProgressBar, ProgressStyle};

/// Create a styled progress bar for iterating over pages.
pub(crate) fn create_progress_bar(count: u64, unit: &str) -> ProgressBar {
    let pb = ProgressBar::new(count);
    if let Ok(style) = ProgressStyle::default_bar().template(&format!(
        "{{spinner:.green}} [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {} ({{eta}})",
        unit
    )) {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}
