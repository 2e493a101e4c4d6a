//! Tablespace file I/O.
//!
//! Provides [`TablespaceFile`], a handle to an `.ibd` (or `ibdata`) path, and
//! [`Pages`], the lazy stream of decoded pages it produces. Pages are read in
//! file order, one [`UNIV_PAGE_SIZE`] slice at a time, so memory use does not
//! grow with the file. A trailing partial page is ignored.
//!
//! The file is opened when [`TablespaceFile::pages`] is called and closed when
//! the returned [`Pages`] is dropped, whether the stream was consumed to the
//! end, abandoned early, or stopped on an error.

use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use log::debug;

use crate::innodb::constants::UNIV_PAGE_SIZE;
use crate::innodb::page::Page;
use crate::IbError;

/// A memory-mapped file reader implementing `Read`.
///
/// The mapped data is not copied up front; it remains backed by the OS page
/// cache and only faults in pages as they are read.
#[cfg(feature = "cli")]
struct MmapReader {
    mmap: memmap2::Mmap,
    position: usize,
}

#[cfg(feature = "cli")]
impl MmapReader {
    fn new(mmap: memmap2::Mmap) -> Self {
        Self { mmap, position: 0 }
    }
}

#[cfg(feature = "cli")]
impl Read for MmapReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let len = self.mmap.len();
        if self.position >= len {
            return Ok(0);
        }
        let to_read = buf.len().min(len - self.position);
        let start = self.position;
        buf[..to_read].copy_from_slice(&self.mmap[start..start + to_read]);
        self.position += to_read;
        Ok(to_read)
    }
}

/// How [`Pages`] pulls bytes from disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReadMode {
    /// Sequential reads through a `BufReader<File>`.
    #[default]
    Buffered,
    /// Reads through a read-only memory map of the whole file.
    #[cfg(feature = "cli")]
    Mmap,
}

/// Options controlling how a [`TablespaceFile`] is read.
#[derive(Debug, Clone, Copy, Default)]
pub struct TablespaceOptions {
    pub read_mode: ReadMode,
}

/// Handle to a tablespace file on disk.
///
/// Holds no decoded state; every call to [`pages`](Self::pages) opens the
/// file again and starts from page 0.
#[derive(Debug, Clone)]
pub struct TablespaceFile {
    path: PathBuf,
    options: TablespaceOptions,
}

impl TablespaceFile {
    /// Create a handle using buffered reads. No I/O happens until pages are requested.
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        Self::with_options(path, TablespaceOptions::default())
    }

    pub fn with_options<P: AsRef<Path>>(path: P, options: TablespaceOptions) -> Self {
        TablespaceFile {
            path: path.as_ref().to_path_buf(),
            options,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn options(&self) -> &TablespaceOptions {
        &self.options
    }

    fn open_file(&self) -> Result<(File, u64), IbError> {
        let file = File::open(&self.path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                IbError::NotFound(self.path.display().to_string())
            } else {
                IbError::Io(format!("Cannot open {}: {}", self.path.display(), e))
            }
        })?;

        let file_size = file
            .metadata()
            .map_err(|e| IbError::Io(format!("Cannot stat {}: {}", self.path.display(), e)))?
            .len();

        Ok((file, file_size))
    }

    /// Size of the file in bytes.
    pub fn file_size(&self) -> Result<u64, IbError> {
        let (_, file_size) = self.open_file()?;
        Ok(file_size)
    }

    /// Number of whole pages in the file.
    pub fn page_count(&self) -> Result<u64, IbError> {
        Ok(self.file_size()? / UNIV_PAGE_SIZE as u64)
    }

    /// Open the file and return a lazy stream over all of its pages.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use ibpage::innodb::tablespace::TablespaceFile;
    ///
    /// let ts = TablespaceFile::open("table.ibd");
    /// for page in ts.pages().unwrap() {
    ///     let page = page.unwrap();
    ///     println!("page {} type 0x{:04X}", page.get_offset(), page.get_type());
    /// }
    /// ```
    pub fn pages(&self) -> Result<Pages, IbError> {
        let (file, file_size) = self.open_file()?;
        debug!(
            "opened {} ({} bytes, {:?} reads)",
            self.path.display(),
            file_size,
            self.options.read_mode
        );

        let reader: Box<dyn Read + Send> = match self.options.read_mode {
            ReadMode::Buffered => Box::new(BufReader::with_capacity(4 * UNIV_PAGE_SIZE, file)),
            #[cfg(feature = "cli")]
            ReadMode::Mmap => {
                // The file must not be modified while mapped; tablespaces are
                // only read here and should not be open in a running server.
                let mmap = unsafe {
                    memmap2::Mmap::map(&file).map_err(|e| {
                        IbError::Io(format!("Cannot mmap {}: {}", self.path.display(), e))
                    })?
                };
                Box::new(MmapReader::new(mmap))
            }
        };

        Ok(Pages::from_reader(reader, file_size))
    }

    /// Read and decode a single page by page number.
    pub fn read_page(&self, page_num: u64) -> Result<Page, IbError> {
        let (mut file, file_size) = self.open_file()?;
        let page_count = file_size / UNIV_PAGE_SIZE as u64;
        if page_num >= page_count {
            return Err(IbError::Argument(format!(
                "Page {} out of range (tablespace has {} pages)",
                page_num, page_count
            )));
        }

        let offset = page_num * UNIV_PAGE_SIZE as u64;
        let mut buf = vec![0u8; UNIV_PAGE_SIZE];
        file.seek(SeekFrom::Start(offset))
            .map_err(|e| IbError::Io(format!("Cannot seek to page {}: {}", page_num, e)))?;
        file.read_exact(&mut buf)
            .map_err(|e| IbError::Io(format!("Cannot read page {}: {}", page_num, e)))?;

        Page::from_bytes(buf).map_err(|e| IbError::Page {
            page_num,
            file_offset: offset,
            source: Box::new(e),
        })
    }

    /// Read every whole page into one contiguous buffer.
    ///
    /// Page N starts at `N * UNIV_PAGE_SIZE`. Used to decode pages in
    /// parallel, since [`Pages`] hands them out one at a time.
    pub fn read_all(&self) -> Result<Vec<u8>, IbError> {
        let (file, file_size) = self.open_file()?;
        let aligned = (file_size / UNIV_PAGE_SIZE as u64) * UNIV_PAGE_SIZE as u64;
        let mut data = vec![0u8; aligned as usize];
        file.take(aligned)
            .read_exact(&mut data)
            .map_err(|e| {
                IbError::Io(format!(
                    "Cannot read tablespace data from {}: {}",
                    self.path.display(),
                    e
                ))
            })?;
        Ok(data)
    }
}

/// Lazy stream of [`Page`] values in ascending file order.
///
/// Yields exactly `file_size / UNIV_PAGE_SIZE` items. After an I/O error the
/// stream ends. Decode errors are wrapped in [`IbError::Page`] with the page
/// number and byte offset, and the stream continues with the next page.
pub struct Pages {
    reader: Box<dyn Read + Send>,
    file_size: u64,
    page_count: u64,
    next_page: u64,
}

impl Pages {
    fn from_reader(reader: Box<dyn Read + Send>, file_size: u64) -> Self {
        let page_count = file_size / UNIV_PAGE_SIZE as u64;
        let trailing = file_size % UNIV_PAGE_SIZE as u64;
        if trailing != 0 {
            debug!(
                "ignoring {} trailing bytes after page {}",
                trailing, page_count
            );
        }
        Pages {
            reader,
            file_size,
            page_count,
            next_page: 0,
        }
    }

    /// Stream the pages of an in-memory tablespace image.
    ///
    /// # Examples
    ///
    /// ```
    /// use ibpage::innodb::tablespace::Pages;
    /// use ibpage::innodb::constants::UNIV_PAGE_SIZE;
    ///
    /// let pages = Pages::from_bytes(vec![0u8; 2 * UNIV_PAGE_SIZE + 7]);
    /// assert_eq!(pages.page_count(), 2);
    /// assert_eq!(pages.count(), 2);
    /// ```
    pub fn from_bytes(data: Vec<u8>) -> Self {
        let file_size = data.len() as u64;
        Self::from_reader(Box::new(Cursor::new(data)), file_size)
    }

    /// Total number of pages the stream yields.
    pub fn page_count(&self) -> u64 {
        self.page_count
    }

    /// Size of the underlying file in bytes.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }
}

impl Iterator for Pages {
    type Item = Result<Page, IbError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_page >= self.page_count {
            return None;
        }
        let page_num = self.next_page;
        let file_offset = page_num * UNIV_PAGE_SIZE as u64;
        self.next_page += 1;

        let mut buf = vec![0u8; UNIV_PAGE_SIZE];
        if let Err(e) = self.reader.read_exact(&mut buf) {
            self.next_page = self.page_count;
            return Some(Err(IbError::Io(format!(
                "Cannot read page {} at byte {}: {}",
                page_num, file_offset, e
            ))));
        }

        Some(Page::from_bytes(buf).map_err(|e| IbError::Page {
            page_num,
            file_offset,
            source: Box::new(e),
        }))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.page_count - self.next_page) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Pages {}

impl std::iter::FusedIterator for Pages {}
