use std::collections::HashMap;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use colored::Colorize;
use log::{debug, warn};
use rayon::prelude::*;
use serde::Serialize;

use crate::cli::{create_progress_bar, wprint, wprintln};
use crate::innodb::constants::UNIV_PAGE_SIZE;
use crate::innodb::page::Page;
use crate::innodb::page_types::{direction_name, page_type_name};
use crate::innodb::record::RecordType;
use crate::innodb::tablespace::{ReadMode, TablespaceFile, TablespaceOptions};
use crate::util::hex::{format_bytes, format_offset};
use crate::IbError;

/// Options for the page report.
pub struct ReportOptions {
    pub file: String,
    pub verbose: bool,
    pub json: bool,
    /// Decode pages on the rayon pool when greater than 1.
    pub threads: usize,
    pub mmap: bool,
    pub skip_corrupt: bool,
    /// Set from the Ctrl+C handler; the page loop stops once it is true.
    pub stop: Arc<AtomicBool>,
}

/// Summary of one page, as printed in verbose mode and emitted with `--json`.
#[derive(Debug, Serialize)]
pub struct PageReport {
    /// Position of the page in the file.
    pub page_number: u64,
    /// Page number stored in the FIL header.
    pub page_offset: u32,
    pub page_type: u16,
    pub page_type_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<IndexReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub records: Vec<RecordReport>,
    /// Reason the record chain could not be walked, when skipped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corrupt: Option<String>,
}

/// B-tree page header fields shown for INDEX pages.
#[derive(Debug, Serialize)]
pub struct IndexReport {
    pub level: u16,
    pub heap_top: u16,
    pub n_heap: u16,
    pub n_recs: u16,
    pub compact: bool,
    pub direction: String,
    pub index_id: u64,
}

/// One user record on an INDEX page.
#[derive(Debug, Serialize)]
pub struct RecordReport {
    pub offset: usize,
    pub next: i16,
    pub heap_no: u16,
    pub n_owned: u8,
    pub delete_mark: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_type: Option<RecordType>,
    /// Raw extra bytes preceding the record origin, hex encoded.
    pub header_bytes: String,
}

type ReportIter = Box<dyn Iterator<Item = Result<PageReport, IbError>>>;

/// Page type display name, falling back to the raw code for unknown types.
pub fn type_display(code: u16) -> String {
    match page_type_name(code) {
        Ok(name) => name.to_string(),
        Err(_) => format!("Unknown (0x{:04X})", code),
    }
}

/// Page counts per type code, kept in the order types were first seen.
#[derive(Debug, Default)]
struct TypeTally {
    order: Vec<u16>,
    counts: HashMap<u16, u64>,
}

impl TypeTally {
    fn add(&mut self, code: u16) {
        let count = self.counts.entry(code).or_insert(0);
        if *count == 0 {
            self.order.push(code);
        }
        *count += 1;
    }

    fn iter(&self) -> impl Iterator<Item = (u16, u64)> + '_ {
        self.order
            .iter()
            .map(move |code| (*code, self.counts.get(code).copied().unwrap_or(0)))
    }
}

/// Build the report for one page, walking its record chain when `walk` is set.
///
/// A damaged chain is returned as an error wrapped with the page location,
/// unless `skip_corrupt` is set; then the records read before the damage are
/// kept and the reason is stored in [`PageReport::corrupt`].
fn summarize(
    page: &Page,
    page_number: u64,
    walk: bool,
    skip_corrupt: bool,
) -> Result<PageReport, IbError> {
    let code = page.get_type();
    let mut report = PageReport {
        page_number,
        page_offset: page.get_offset(),
        page_type: code,
        page_type_name: type_display(code),
        index: None,
        records: Vec::new(),
        corrupt: None,
    };

    if !page.is_index() {
        return Ok(report);
    }

    let hdr = page.page_header();
    report.index = Some(IndexReport {
        level: page.get_level(),
        heap_top: hdr.heap_top,
        n_heap: hdr.n_heap(),
        n_recs: hdr.n_recs,
        compact: page.is_compact(),
        direction: match direction_name(hdr.direction) {
            Ok(name) => name.to_string(),
            Err(_) => format!("Unknown (0x{:04X})", hdr.direction),
        },
        index_id: hdr.index_id,
    });

    if !walk {
        return Ok(report);
    }

    let extra = page.row_format().extra_bytes();
    for record in page.records() {
        let record = match record {
            Ok(r) => r,
            Err(e) if skip_corrupt && e.is_page_local() => {
                warn!("page {}: skipping record chain: {}", page_number, e);
                report.corrupt = Some(e.to_string());
                break;
            }
            Err(e) => {
                return Err(IbError::Page {
                    page_num: page_number,
                    file_offset: page_number * UNIV_PAGE_SIZE as u64,
                    source: Box::new(e),
                })
            }
        };
        let h = record.header();
        let origin = record.offset();
        report.records.push(RecordReport {
            offset: origin,
            next: h.next,
            heap_no: h.heap_no(),
            n_owned: h.n_owned(),
            delete_mark: h.delete_mark(),
            record_type: h.status(),
            header_bytes: format_bytes(&record.page_data()[origin - extra..origin]),
        });
    }

    Ok(report)
}

/// Decode every page on the rayon pool, returning reports in file order.
fn summarize_parallel(
    ts: &TablespaceFile,
    walk: bool,
    skip_corrupt: bool,
) -> Result<Vec<Result<PageReport, IbError>>, IbError> {
    let all_data = ts.read_all()?;
    debug!(
        "decoding {} pages in parallel on {} threads",
        all_data.len() / UNIV_PAGE_SIZE,
        rayon::current_num_threads()
    );

    Ok(all_data
        .par_chunks(UNIV_PAGE_SIZE)
        .enumerate()
        .map(|(i, chunk)| {
            let page_number = i as u64;
            let page = Page::from_slice(chunk).map_err(|e| IbError::Page {
                page_num: page_number,
                file_offset: page_number * UNIV_PAGE_SIZE as u64,
                source: Box::new(e),
            })?;
            summarize(&page, page_number, walk, skip_corrupt)
        })
        .collect())
}

fn print_page(writer: &mut dyn Write, report: &PageReport) -> Result<(), IbError> {
    match &report.index {
        Some(idx) => wprintln!(
            writer,
            "page offset {}, page type <{}>, page level <{}> - heap top: {}; heap records: {}; records: {}; compact: {}",
            report.page_offset,
            report.page_type_name,
            idx.level,
            idx.heap_top,
            idx.n_heap,
            idx.n_recs,
            idx.compact
        )?,
        None => wprintln!(
            writer,
            "page offset {}, page type <{}>",
            report.page_offset,
            report.page_type_name
        )?,
    }

    for rec in &report.records {
        wprint!(
            writer,
            "  record at {}, next {}, heap no {}, n_owned {}",
            format_offset(rec.offset as u64),
            rec.next,
            rec.heap_no,
            rec.n_owned
        )?;
        if let Some(rt) = rec.record_type {
            wprint!(writer, ", {}", rt.name())?;
        }
        if rec.delete_mark {
            wprint!(writer, ", {}", "deleted".yellow())?;
        }
        wprintln!(writer, ", header {}", rec.header_bytes)?;
    }

    if let Some(reason) = &report.corrupt {
        wprintln!(
            writer,
            "  {}",
            format!("corrupt record chain: {}", reason).red()
        )?;
    }
    Ok(())
}

/// Print the page type of every page in a tablespace, followed by a count of
/// pages per type.
///
/// Pages are read in file order through [`TablespaceFile::pages`]. With
/// `--verbose`, each page gets one line, and B-tree pages additionally show
/// their header fields and one line per record in key order. With `--json`,
/// an array of [`PageReport`] values is printed instead of text. With
/// `--threads N` (N > 1) the whole file is read up front and pages are decoded
/// in parallel; output order is unchanged.
///
/// A corrupt record chain aborts the report unless `--skip-corrupt` is given,
/// in which case the page is still counted and the damage is logged. When
/// `opts.stop` is raised (Ctrl+C) the loop ends early and the summary covers
/// the pages read so far.
pub fn execute(opts: &ReportOptions, writer: &mut dyn Write) -> Result<(), IbError> {
    let read_mode = if opts.mmap {
        ReadMode::Mmap
    } else {
        ReadMode::Buffered
    };
    let ts = TablespaceFile::with_options(&opts.file, TablespaceOptions { read_mode });
    let walk = opts.verbose || opts.json;
    let skip_corrupt = opts.skip_corrupt;

    let (total, reports): (u64, ReportIter) = if opts.threads > 1 {
        let results = summarize_parallel(&ts, walk, skip_corrupt)?;
        (results.len() as u64, Box::new(results.into_iter()) as ReportIter)
    } else {
        let pages = ts.pages()?;
        let total = pages.page_count();
        let iter = pages
            .zip(0u64..)
            .map(move |(page, n)| page.and_then(|p| summarize(&p, n, walk, skip_corrupt)));
        (total, Box::new(iter) as ReportIter)
    };

    let pb = if !opts.verbose && !opts.json && total > 1 {
        Some(create_progress_bar(total, "pages"))
    } else {
        None
    };

    let mut tally = TypeTally::default();
    let mut json_pages = Vec::new();
    let mut nb_pages = 0u64;
    let mut skipped = 0u64;
    let mut interrupted = false;

    for result in reports {
        if opts.stop.load(Ordering::SeqCst) {
            interrupted = true;
            break;
        }
        if let Some(ref pb) = pb {
            pb.inc(1);
        }

        let report = match result {
            Ok(r) => r,
            Err(e) if skip_corrupt && e.is_page_local() => {
                warn!("skipping unreadable page: {}", e);
                skipped += 1;
                continue;
            }
            Err(e) => {
                if let Some(ref pb) = pb {
                    pb.finish_and_clear();
                }
                return Err(e);
            }
        };

        nb_pages += 1;
        tally.add(report.page_type);

        if opts.json {
            json_pages.push(report);
        } else if opts.verbose {
            print_page(writer, &report)?;
        }
    }

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    if interrupted {
        warn!("interrupted after {} of {} pages", nb_pages, total);
    }

    if opts.json {
        let json = serde_json::to_string_pretty(&json_pages)
            .map_err(|e| IbError::Argument(format!("JSON serialization error: {}", e)))?;
        wprintln!(writer, "{}", json)?;
        return Ok(());
    }

    if interrupted {
        wprintln!(
            writer,
            "{}",
            format!("Interrupted: summary covers {} of {} pages", nb_pages, total).yellow()
        )?;
    }
    if skipped > 0 {
        wprintln!(
            writer,
            "{}",
            format!("Skipped {} unreadable pages", skipped).yellow()
        )?;
    }

    wprintln!(writer, "Total number of page: {}:", nb_pages)?;
    for (code, count) in tally.iter() {
        wprintln!(writer, "{}: {}", type_display(code), count)?;
    }

    Ok(())
}
