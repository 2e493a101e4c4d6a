//! Page header decoding and the [`Page`] aggregate.
//!
//! Every InnoDB page begins with a 38-byte FIL header ([`FileHeader`])
//! containing the space id, page number, prev/next sibling pointers, LSN,
//! page type, flush LSN and archive log number. On B-tree pages the INDEX
//! page header ([`PageHeader`]) follows immediately at byte 38: record
//! counts, heap bookkeeping, the B-tree level and the index id, then two
//! 10-byte file segment headers.
//!
//! [`Page`] owns one page buffer together with both decoded headers and
//! hands out the record walk via [`Page::records`].

use byteorder::{BigEndian, ByteOrder};
use log::debug;
use serde::Serialize;

use crate::innodb::constants::*;
use crate::innodb::page_types::PageType;
use crate::innodb::record::{Record, RecordWalker, RowFormat};
use crate::IbError;

/// Decoded FIL header (38 bytes, present at the start of every InnoDB page).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FileHeader {
    /// Space id in old formats, checksum in newer ones. Bytes 0-3.
    pub space_id: u32,
    /// Page number within the tablespace. Bytes 4-7.
    pub page_offset: u32,
    /// Previous page in the doubly-linked list, FIL_NULL if none. Bytes 8-11.
    pub prev_page: u32,
    /// Next page in the doubly-linked list, FIL_NULL if none. Bytes 12-15.
    pub next_page: u32,
    /// LSN of newest modification to this page. Bytes 16-23.
    pub lsn: u64,
    /// Raw page type code. Bytes 24-25.
    pub page_type: u16,
    /// Flush LSN (only meaningful for page 0 of the system tablespace). Bytes 26-33.
    pub flush_lsn: u64,
    /// Archive log number in old formats, space id in newer ones. Bytes 34-37.
    pub arch_log_no: u32,
}

impl FileHeader {
    /// Returns true if the page has a previous sibling.
    pub fn has_prev(&self) -> bool {
        self.prev_page != FIL_NULL
    }

    /// Returns true if the page has a next sibling.
    pub fn has_next(&self) -> bool {
        self.next_page != FIL_NULL
    }
}

/// Decode the FIL header from the start of `data`.
///
/// # Examples
///
/// ```
/// use ibpage::innodb::page::decode_file_header;
/// use ibpage::innodb::constants::*;
/// use byteorder::{BigEndian, ByteOrder};
///
/// let mut buf = vec![0u8; SIZE_FIL_HEAD];
/// BigEndian::write_u32(&mut buf[FIL_PAGE_OFFSET..], 3);
/// BigEndian::write_u16(&mut buf[FIL_PAGE_TYPE..], FIL_PAGE_INDEX);
///
/// let hdr = decode_file_header(&buf).unwrap();
/// assert_eq!(hdr.page_offset, 3);
/// assert_eq!(hdr.page_type, 0x45BF);
/// assert!(decode_file_header(&buf[..20]).is_err());
/// ```
pub fn decode_file_header(data: &[u8]) -> Result<FileHeader, IbError> {
    if data.len() < SIZE_FIL_HEAD {
        return Err(IbError::Truncated {
            what: "file header",
            needed: SIZE_FIL_HEAD,
            available: data.len(),
        });
    }

    Ok(FileHeader {
        space_id: BigEndian::read_u32(&data[FIL_PAGE_SPACE..]),
        page_offset: BigEndian::read_u32(&data[FIL_PAGE_OFFSET..]),
        prev_page: BigEndian::read_u32(&data[FIL_PAGE_PREV..]),
        next_page: BigEndian::read_u32(&data[FIL_PAGE_NEXT..]),
        lsn: BigEndian::read_u64(&data[FIL_PAGE_LSN..]),
        page_type: BigEndian::read_u16(&data[FIL_PAGE_TYPE..]),
        flush_lsn: BigEndian::read_u64(&data[FIL_PAGE_FILE_FLUSH_LSN..]),
        arch_log_no: BigEndian::read_u32(&data[FIL_PAGE_ARCH_LOG_NO..]),
    })
}

/// Decoded INDEX page header (56 bytes at PAGE_HEADER, including both FSEG headers).
///
/// The header is decoded on every page; its fields only carry meaning on
/// B-tree pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageHeader {
    /// Number of directory slots in the page directory.
    pub n_dir_slots: u16,
    /// Pointer to record heap top.
    pub heap_top: u16,
    /// Number of records in the heap. Bit 15 is the compact format flag.
    pub n_heap_raw: u16,
    /// Pointer to start of free record list (0 if none).
    pub free: u16,
    /// Number of bytes in deleted records.
    pub garbage: u16,
    /// Pointer to the last inserted record (0 if reset).
    pub last_insert: u16,
    /// Last insert direction.
    pub direction: u16,
    /// Number of consecutive inserts in the same direction.
    pub n_direction: u16,
    /// Number of user records on the page.
    pub n_recs: u16,
    /// Highest trx id that may have modified a record (secondary indexes only).
    pub max_trx_id: u64,
    /// Level in the B+Tree (0 = leaf).
    pub level: u16,
    /// Index id the page belongs to.
    pub index_id: u64,
    /// File segment header of the leaf segment (root page only).
    pub btr_seg_leaf: [u8; FSEG_HEADER_SIZE],
    /// File segment header of the non-leaf segment (root page only).
    pub btr_seg_top: [u8; FSEG_HEADER_SIZE],
}

impl PageHeader {
    /// Number of records in the heap, without the compact flag.
    pub fn n_heap(&self) -> u16 {
        self.n_heap_raw & !PAGE_N_HEAP_COMPACT_FLAG
    }

    /// Returns true if the page uses the compact row format.
    pub fn is_compact(&self) -> bool {
        self.n_heap_raw & PAGE_N_HEAP_COMPACT_FLAG != 0
    }

    /// Returns true if this is a leaf-level page.
    pub fn is_leaf(&self) -> bool {
        self.level == 0
    }
}

/// Decode the INDEX page header that follows the FIL header.
pub fn decode_page_header(data: &[u8]) -> Result<PageHeader, IbError> {
    let end = PAGE_HEADER + PAGE_HEADER_SIZE;
    if data.len() < end {
        return Err(IbError::Truncated {
            what: "page header",
            needed: end,
            available: data.len(),
        });
    }
    let d = &data[PAGE_HEADER..end];

    let mut btr_seg_leaf = [0u8; FSEG_HEADER_SIZE];
    btr_seg_leaf.copy_from_slice(&d[PAGE_BTR_SEG_LEAF..PAGE_BTR_SEG_LEAF + FSEG_HEADER_SIZE]);
    let mut btr_seg_top = [0u8; FSEG_HEADER_SIZE];
    btr_seg_top.copy_from_slice(&d[PAGE_BTR_SEG_TOP..PAGE_BTR_SEG_TOP + FSEG_HEADER_SIZE]);

    Ok(PageHeader {
        n_dir_slots: BigEndian::read_u16(&d[PAGE_N_DIR_SLOTS..]),
        heap_top: BigEndian::read_u16(&d[PAGE_HEAP_TOP..]),
        n_heap_raw: BigEndian::read_u16(&d[PAGE_N_HEAP..]),
        free: BigEndian::read_u16(&d[PAGE_FREE..]),
        garbage: BigEndian::read_u16(&d[PAGE_GARBAGE..]),
        last_insert: BigEndian::read_u16(&d[PAGE_LAST_INSERT..]),
        direction: BigEndian::read_u16(&d[PAGE_DIRECTION..]),
        n_direction: BigEndian::read_u16(&d[PAGE_N_DIRECTION..]),
        n_recs: BigEndian::read_u16(&d[PAGE_N_RECS..]),
        max_trx_id: BigEndian::read_u64(&d[PAGE_MAX_TRX_ID..]),
        level: BigEndian::read_u16(&d[PAGE_LEVEL..]),
        index_id: BigEndian::read_u64(&d[PAGE_INDEX_ID..]),
        btr_seg_leaf,
        btr_seg_top,
    })
}

/// One decoded 16 KiB page.
///
/// Owns the raw buffer and both decoded headers. Immutable after
/// construction, so pages can be decoded and walked on any thread.
#[derive(Debug, Clone)]
pub struct Page {
    data: Vec<u8>,
    fil_header: FileHeader,
    page_header: PageHeader,
}

impl Page {
    /// Decode a page from a buffer of exactly [`UNIV_PAGE_SIZE`] bytes.
    ///
    /// # Examples
    ///
    /// ```
    /// use ibpage::innodb::page::Page;
    /// use ibpage::innodb::constants::UNIV_PAGE_SIZE;
    ///
    /// let page = Page::from_bytes(vec![0u8; UNIV_PAGE_SIZE]).unwrap();
    /// assert_eq!(page.get_type(), 0);
    /// assert_eq!(page.records().count(), 0);
    ///
    /// assert!(Page::from_bytes(vec![0u8; 100]).is_err());
    /// ```
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, IbError> {
        if data.len() < UNIV_PAGE_SIZE {
            return Err(IbError::Truncated {
                what: "page",
                needed: UNIV_PAGE_SIZE,
                available: data.len(),
            });
        }
        if data.len() > UNIV_PAGE_SIZE {
            return Err(IbError::Argument(format!(
                "page buffer is {} bytes, expected {}",
                data.len(),
                UNIV_PAGE_SIZE
            )));
        }

        let fil_header = decode_file_header(&data)?;
        let page_header = decode_page_header(&data)?;
        debug!(
            "decoded page {} type 0x{:04X} n_recs {}",
            fil_header.page_offset, fil_header.page_type, page_header.n_recs
        );

        Ok(Page {
            data,
            fil_header,
            page_header,
        })
    }

    /// Decode a page from a borrowed slice, copying it.
    pub fn from_slice(data: &[u8]) -> Result<Self, IbError> {
        Self::from_bytes(data.to_vec())
    }

    /// The raw page bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The decoded FIL header.
    pub fn fil_header(&self) -> &FileHeader {
        &self.fil_header
    }

    /// The decoded INDEX page header.
    pub fn page_header(&self) -> &PageHeader {
        &self.page_header
    }

    /// Page number recorded in the FIL header.
    pub fn get_offset(&self) -> u32 {
        self.fil_header.page_offset
    }

    /// Raw page type code.
    pub fn get_type(&self) -> u16 {
        self.fil_header.page_type
    }

    /// B-tree level (meaningful on INDEX pages only).
    pub fn get_level(&self) -> u16 {
        self.page_header.level
    }

    /// Page type, if the code is a known one.
    pub fn page_type(&self) -> Option<PageType> {
        PageType::from_u16(self.get_type())
    }

    /// Returns true for B-tree node pages.
    pub fn is_index(&self) -> bool {
        self.get_type() == FIL_PAGE_INDEX
    }

    pub fn is_compact(&self) -> bool {
        self.page_header.is_compact()
    }

    pub fn row_format(&self) -> RowFormat {
        if self.is_compact() {
            RowFormat::Compact
        } else {
            RowFormat::Redundant
        }
    }

    /// Origin of the infimum record for this page's row format.
    pub fn infimum_offset(&self) -> usize {
        self.row_format().infimum_offset()
    }

    /// Walk the page's user records in key order.
    ///
    /// Each call starts a fresh traversal from the infimum.
    pub fn records(&self) -> RecordWalker<'_> {
        RecordWalker::new(
            &self.data,
            self.row_format(),
            self.page_header.n_recs,
            self.fil_header.page_offset,
        )
    }

    /// Walk the whole record chain, stopping at the first error.
    pub fn collect_records(&self) -> Result<Vec<Record<'_>>, IbError> {
        self.records().collect()
    }
}
