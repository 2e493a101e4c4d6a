use clap::{Parser, ValueEnum};

#[derive(Parser)]
#[command(name = "ibpage")]
#[command(about = "Show the page types and record chains of an InnoDB tablespace file")]
#[command(version)]
pub struct Cli {
    /// Path to InnoDB tablespace file (.ibd, ibdata1)
    pub file: String,

    /// Print every page and every record on B-tree pages
    #[arg(short, long)]
    pub verbose: bool,

    /// Write output to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<String>,

    /// Number of threads for parallel page decoding (0 = sequential)
    #[arg(short, long, default_value = "0")]
    pub threads: usize,

    /// Output page summaries in JSON format
    #[arg(long)]
    pub json: bool,

    /// Use memory-mapped I/O for file access
    #[arg(long)]
    pub mmap: bool,

    /// Log and skip pages with a corrupt record chain instead of aborting
    #[arg(long = "skip-corrupt")]
    pub skip_corrupt: bool,

    /// Control colored output
    #[arg(long, default_value = "auto")]
    pub color: ColorMode,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ColorMode {
    Auto,
    Always,
    Never,
}
