#[cfg(not(feature = "cli"))]
compile_error!("The `ibpage` binary requires the `cli` feature. Build with `--features cli`.");

use clap::Parser;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ibpage::cli::app::{Cli, ColorMode};
use ibpage::cli::report::{self, ReportOptions};
use ibpage::IbError;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    // Configure rayon thread pool if --threads was specified
    if cli.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(cli.threads)
            .build_global()
            .ok(); // Ignore if already initialized
    }

    match cli.color {
        ColorMode::Always => colored::control::set_override(true),
        ColorMode::Never => colored::control::set_override(false),
        ColorMode::Auto => {} // colored auto-detects tty
    }

    let writer_result: Result<Box<dyn Write>, IbError> = match &cli.output {
        Some(path) => File::create(path)
            .map(|f| Box::new(BufWriter::new(f)) as Box<dyn Write>)
            .map_err(|e| IbError::Io(format!("Cannot create {}: {}", path, e))),
        None => Ok(Box::new(std::io::stdout()) as Box<dyn Write>),
    };

    let mut writer = match writer_result {
        Ok(w) => w,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    // Ctrl+C stops the page loop; the summary of pages read so far is still printed
    let stop = Arc::new(AtomicBool::new(false));
    let s = stop.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        s.store(true, Ordering::SeqCst);
    }) {
        log::warn!("Cannot set Ctrl+C handler: {}", e);
    }

    let result = report::execute(
        &ReportOptions {
            file: cli.file,
            verbose: cli.verbose,
            json: cli.json,
            threads: cli.threads,
            mmap: cli.mmap,
            skip_corrupt: cli.skip_corrupt,
            stop,
        },
        &mut writer,
    )
    .and_then(|_| {
        writer
            .flush()
            .map_err(|e| IbError::Io(format!("Cannot flush output: {}", e)))
    });

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
