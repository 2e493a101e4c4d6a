//! Record headers and the record chain walker.
//!
//! Every record on an INDEX page is preceded by a small header of "extra
//! bytes": 5 in the compact row format (MySQL 5.0+), 6 in the older redundant
//! format. The last two of those bytes link the record to its successor in key
//! order. Records are addressed by their *origin*, the offset where the record
//! data starts, so the header always sits immediately before the origin.
//!
//! [`RecordWalker`] follows those links from the infimum pseudo-record until
//! it reaches the supremum, checking every hop so that a damaged page ends in
//! [`IbError::CorruptPage`] rather than an out-of-bounds read or an endless
//! loop.

use std::collections::HashSet;

use byteorder::{BigEndian, ByteOrder};
use log::trace;
use serde::Serialize;

use crate::innodb::constants::*;
use crate::IbError;

/// Row format of a page, selected by bit 15 of `PAGE_N_HEAP`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RowFormat {
    /// New-style compact format: 5 extra bytes, relative next pointers.
    Compact,
    /// Old-style redundant format: 6 extra bytes, absolute next pointers.
    Redundant,
}

impl RowFormat {
    /// Number of header bytes preceding each record origin.
    pub fn extra_bytes(self) -> usize {
        match self {
            RowFormat::Compact => REC_N_NEW_EXTRA_BYTES,
            RowFormat::Redundant => REC_N_OLD_EXTRA_BYTES,
        }
    }

    /// Origin of the infimum pseudo-record.
    pub fn infimum_offset(self) -> usize {
        match self {
            RowFormat::Compact => PAGE_NEW_INFIMUM,
            RowFormat::Redundant => PAGE_OLD_INFIMUM,
        }
    }

    /// Origin of the supremum pseudo-record.
    pub fn supremum_offset(self) -> usize {
        match self {
            RowFormat::Compact => PAGE_NEW_SUPREMUM,
            RowFormat::Redundant => PAGE_OLD_SUPREMUM,
        }
    }

    /// Resolve a record's next pointer into the successor's origin.
    ///
    /// Compact records store a signed offset relative to their own origin;
    /// redundant records store the successor's absolute page offset.
    ///
    /// # Examples
    ///
    /// ```
    /// use ibpage::innodb::record::RowFormat;
    ///
    /// assert_eq!(RowFormat::Compact.resolve_next(200, -1), 199);
    /// assert_eq!(RowFormat::Compact.resolve_next(99, 13), 112);
    /// assert_eq!(RowFormat::Redundant.resolve_next(101, 116), 116);
    /// ```
    pub fn resolve_next(self, origin: usize, next: i16) -> i64 {
        match self {
            RowFormat::Compact => origin as i64 + next as i64,
            RowFormat::Redundant => (next as u16) as i64,
        }
    }
}

/// Record status from the low 3 bits of a compact header's heap-number field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RecordType {
    /// Ordinary user record (leaf page).
    Ordinary,
    /// Node pointer record (non-leaf page).
    NodePtr,
    /// Infimum system record.
    Infimum,
    /// Supremum system record.
    Supremum,
}

impl RecordType {
    /// Convert a 3-bit status value to a `RecordType`.
    ///
    /// Only the lowest 3 bits of `val` are used; the unassigned values 4-7
    /// map to `Ordinary`.
    pub fn from_u8(val: u8) -> Self {
        match val & 0x07 {
            1 => RecordType::NodePtr,
            2 => RecordType::Infimum,
            3 => RecordType::Supremum,
            _ => RecordType::Ordinary,
        }
    }

    /// Returns the MySQL source-style name for this record type.
    pub fn name(&self) -> &'static str {
        match self {
            RecordType::Ordinary => "REC_STATUS_ORDINARY",
            RecordType::NodePtr => "REC_STATUS_NODE_PTR",
            RecordType::Infimum => "REC_STATUS_INFIMUM",
            RecordType::Supremum => "REC_STATUS_SUPREMUM",
        }
    }
}

/// Decoded record header.
///
/// `info` keeps the header bytes in front of the next pointer as one
/// big-endian integer: 24 bits for compact records, 32 bits for redundant
/// ones. The accessor methods pick the individual fields out of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RecordHeader {
    /// Row format the header was decoded with.
    pub format: RowFormat,
    /// Raw info bytes (info bits, n_owned, heap number, ...).
    pub info: u32,
    /// Next-record pointer (signed; relative in compact format).
    pub next: i16,
}

impl RecordHeader {
    fn first_byte(&self) -> u8 {
        match self.format {
            RowFormat::Compact => (self.info >> 16) as u8,
            RowFormat::Redundant => (self.info >> 24) as u8,
        }
    }

    /// The 4 info bits (upper nibble of the first header byte).
    pub fn info_bits(&self) -> u8 {
        self.first_byte() >> 4
    }

    /// Delete-mark flag.
    pub fn delete_mark(&self) -> bool {
        self.first_byte() & 0x20 != 0
    }

    /// Min-rec flag (leftmost record on a non-leaf level).
    pub fn min_rec(&self) -> bool {
        self.first_byte() & 0x10 != 0
    }

    /// Number of records owned by this record in the page directory.
    pub fn n_owned(&self) -> u8 {
        self.first_byte() & 0x0F
    }

    /// Record's position in the heap.
    pub fn heap_no(&self) -> u16 {
        match self.format {
            RowFormat::Compact => ((self.info & 0xFFFF) >> 3) as u16 & 0x1FFF,
            RowFormat::Redundant => ((self.info & 0x00FF_FFFF) >> 11) as u16 & 0x1FFF,
        }
    }

    /// Record status; only compact headers carry one.
    pub fn status(&self) -> Option<RecordType> {
        match self.format {
            RowFormat::Compact => Some(RecordType::from_u8((self.info & 0x07) as u8)),
            RowFormat::Redundant => None,
        }
    }

    /// Number of fields; only redundant headers carry one.
    pub fn n_fields(&self) -> Option<u16> {
        match self.format {
            RowFormat::Compact => None,
            RowFormat::Redundant => Some(((self.info >> 1) & 0x3FF) as u16),
        }
    }
}

/// Decode the record header that ends at `data_start`.
///
/// The window is `format.extra_bytes()` wide; its last two bytes are the
/// big-endian two's-complement next pointer.
///
/// # Examples
///
/// ```
/// use ibpage::innodb::record::{decode_record_header, RecordType, RowFormat};
///
/// let mut page = vec![0u8; 64];
/// // origin 40: header occupies bytes 35..40
/// page[35] = 0x22;                     // delete mark + n_owned = 2
/// page[36..38].copy_from_slice(&(7u16 << 3).to_be_bytes()); // heap_no 7, ordinary
/// page[38..40].copy_from_slice(&(-1i16).to_be_bytes());
///
/// let hdr = decode_record_header(&page, 40, RowFormat::Compact).unwrap();
/// assert_eq!(hdr.next, -1);
/// assert_eq!(hdr.heap_no(), 7);
/// assert_eq!(hdr.n_owned(), 2);
/// assert!(hdr.delete_mark());
/// assert_eq!(hdr.status(), Some(RecordType::Ordinary));
/// ```
pub fn decode_record_header(
    data: &[u8],
    data_start: usize,
    format: RowFormat,
) -> Result<RecordHeader, IbError> {
    let width = format.extra_bytes();
    if data_start < width || data_start > data.len() {
        return Err(IbError::OutOfBounds {
            offset: data_start as i64,
            width,
            len: data.len(),
        });
    }
    let window = &data[data_start - width..data_start];

    let info = match format {
        RowFormat::Compact => BigEndian::read_u24(&window[..3]),
        RowFormat::Redundant => BigEndian::read_u32(&window[..4]),
    };
    let next = BigEndian::read_i16(&window[width - 2..]);

    Ok(RecordHeader { format, info, next })
}

/// A record on a page: its origin and decoded header.
///
/// A `Record` borrows the page buffer; it never owns page bytes.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    page: &'a [u8],
    offset: usize,
    header: RecordHeader,
}

impl<'a> Record<'a> {
    /// Decode the record whose data starts at `offset`.
    pub fn new(page: &'a [u8], offset: usize, format: RowFormat) -> Result<Self, IbError> {
        let header = decode_record_header(page, offset, format)?;
        Ok(Record {
            page,
            offset,
            header,
        })
    }

    /// Absolute offset of the record origin within the page.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Decoded record header.
    pub fn header(&self) -> &RecordHeader {
        &self.header
    }

    /// The page buffer this record lives in.
    pub fn page_data(&self) -> &'a [u8] {
        self.page
    }

    fn has_tag(&self, tag: &[u8]) -> bool {
        self.page.get(self.offset..self.offset + tag.len()) == Some(tag)
    }

    /// True if the bytes at the origin spell `infimum`.
    pub fn is_infimum(&self) -> bool {
        self.has_tag(INFIMUM_TAG)
    }

    /// True if the bytes at the origin spell `supremum`.
    pub fn is_supremum(&self) -> bool {
        self.has_tag(SUPREMUM_TAG)
    }
}

/// Traversal state of a [`RecordWalker`].
#[derive(Debug)]
enum WalkState<'a> {
    /// Positioned on the infimum; nothing yielded yet.
    Infimum(Record<'a>),
    /// Positioned on the last yielded user record.
    LiveRecord(Record<'a>),
    /// Chain ended normally.
    Supremum,
    /// Chain is damaged; holds the error until it has been reported once.
    Corrupt(Option<IbError>),
}

/// Iterator over the user records of one page, in key order.
///
/// Yields `Ok(Record)` for each live record. On a damaged chain it yields a
/// single `Err(IbError::CorruptPage)` (or `OutOfBounds`) and then stops.
/// The walk never takes more than `n_recs + 2` hops, never yields more than
/// `n_recs` records and never visits the same origin twice.
#[derive(Debug)]
pub struct RecordWalker<'a> {
    page: &'a [u8],
    format: RowFormat,
    page_number: u32,
    n_recs: usize,
    max_steps: usize,
    steps: usize,
    yielded: usize,
    visited: HashSet<usize>,
    state: WalkState<'a>,
}

impl<'a> RecordWalker<'a> {
    /// Start a walk over `page`.
    ///
    /// `n_recs` is the page header's user record count and `page_number` is
    /// only used to label errors. A zero `n_recs` produces an empty walk
    /// without touching the record area.
    pub fn new(page: &'a [u8], format: RowFormat, n_recs: u16, page_number: u32) -> Self {
        let n_recs = n_recs as usize;
        let mut walker = RecordWalker {
            page,
            format,
            page_number,
            n_recs,
            max_steps: n_recs + 2,
            steps: 0,
            yielded: 0,
            visited: HashSet::new(),
            state: WalkState::Supremum,
        };
        if n_recs > 0 {
            walker.state = walker.start();
        }
        walker
    }

    fn start(&mut self) -> WalkState<'a> {
        let origin = self.format.infimum_offset();
        let infimum = match Record::new(self.page, origin, self.format) {
            Ok(rec) => rec,
            Err(e) => return WalkState::Corrupt(Some(e)),
        };
        if !infimum.is_infimum() {
            return WalkState::Corrupt(Some(
                self.corrupt(format!("no infimum tag at offset {}", origin)),
            ));
        }
        self.visited.insert(origin);
        WalkState::Infimum(infimum)
    }

    fn corrupt(&self, reason: String) -> IbError {
        IbError::CorruptPage {
            page_number: self.page_number,
            reason,
        }
    }

    /// Follow one link from `current`. `Ok(None)` means the chain ended.
    fn advance(&mut self, current: Record<'a>) -> Result<Option<Record<'a>>, IbError> {
        let next = current.header.next;
        if next == 0 {
            return Ok(None);
        }

        self.steps += 1;
        if self.steps > self.max_steps {
            return Err(self.corrupt(format!(
                "record chain longer than {} steps",
                self.max_steps
            )));
        }

        let target = self.format.resolve_next(current.offset, next);
        if target < 0 || target >= self.page.len() as i64 {
            return Err(self.corrupt(format!(
                "record at {} links to {} outside the page",
                current.offset, target
            )));
        }
        let target = target as usize;
        let record = Record::new(self.page, target, self.format)?;

        if record.is_supremum() {
            return Ok(None);
        }
        if !self.visited.insert(target) {
            return Err(self.corrupt(format!(
                "record at {} links back to {}",
                current.offset, target
            )));
        }
        if self.yielded >= self.n_recs {
            return Err(self.corrupt(format!(
                "record chain holds more than {} records",
                self.n_recs
            )));
        }

        trace!(
            "page {}: record {} -> {} (next {})",
            self.page_number,
            current.offset,
            target,
            next
        );
        self.yielded += 1;
        Ok(Some(record))
    }
}

impl<'a> Iterator for RecordWalker<'a> {
    type Item = Result<Record<'a>, IbError>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = match &mut self.state {
            WalkState::Infimum(rec) | WalkState::LiveRecord(rec) => *rec,
            WalkState::Supremum => return None,
            WalkState::Corrupt(err) => return err.take().map(Err),
        };

        match self.advance(current) {
            Ok(Some(record)) => {
                self.state = WalkState::LiveRecord(record);
                Some(Ok(record))
            }
            Ok(None) => {
                self.state = WalkState::Supremum;
                None
            }
            Err(e) => {
                self.state = WalkState::Corrupt(None);
                Some(Err(e))
            }
        }
    }
}

impl std::iter::FusedIterator for RecordWalker<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    /// Write a compact record header in front of `origin`.
    fn put_compact(page: &mut [u8], origin: usize, heap_no: u16, status: u8, next: i16) {
        let hdr = origin - REC_N_NEW_EXTRA_BYTES;
        page[hdr] = 0x01;
        BigEndian::write_u16(&mut page[hdr + 1..], (heap_no << 3) | status as u16);
        BigEndian::write_i16(&mut page[hdr + 3..], next);
    }

    /// Compact page area with infimum/supremum and user records at `origins`.
    fn compact_chain(origins: &[usize]) -> Vec<u8> {
        let mut page = vec![0u8; UNIV_PAGE_SIZE];
        page[PAGE_NEW_INFIMUM..PAGE_NEW_INFIMUM + 8].copy_from_slice(b"infimum\0");
        page[PAGE_NEW_SUPREMUM..PAGE_NEW_SUPREMUM + 8].copy_from_slice(b"supremum");

        let mut chain = vec![PAGE_NEW_INFIMUM];
        chain.extend_from_slice(origins);
        chain.push(PAGE_NEW_SUPREMUM);
        for (i, pair) in chain.windows(2).enumerate() {
            let status = if i == 0 { 2 } else { 0 };
            put_compact(&mut page, pair[0], i as u16, status, (pair[1] as i64 - pair[0] as i64) as i16);
        }
        put_compact(&mut page, PAGE_NEW_SUPREMUM, 1, 3, 0);
        page
    }

    fn offsets(walker: RecordWalker<'_>) -> Vec<usize> {
        walker.map(|r| r.unwrap().offset()).collect()
    }

    #[test]
    fn test_record_type_from_u8() {
        assert_eq!(RecordType::from_u8(0), RecordType::Ordinary);
        assert_eq!(RecordType::from_u8(1), RecordType::NodePtr);
        assert_eq!(RecordType::from_u8(2), RecordType::Infimum);
        assert_eq!(RecordType::from_u8(3), RecordType::Supremum);
        assert_eq!(RecordType::from_u8(0x0B), RecordType::Supremum);
    }

    #[test]
    fn test_compact_header_fields() {
        let mut data = vec![0u8; 16];
        data[5] = 0x22; // delete_mark=1, n_owned=2
        BigEndian::write_u16(&mut data[6..8], (10 << 3) | 1); // heap_no=10, node ptr
        BigEndian::write_i16(&mut data[8..10], -50);

        let hdr = decode_record_header(&data, 10, RowFormat::Compact).unwrap();
        assert_eq!(hdr.n_owned(), 2);
        assert!(hdr.delete_mark());
        assert!(!hdr.min_rec());
        assert_eq!(hdr.info_bits(), 0x2);
        assert_eq!(hdr.heap_no(), 10);
        assert_eq!(hdr.status(), Some(RecordType::NodePtr));
        assert_eq!(hdr.n_fields(), None);
        assert_eq!(hdr.next, -50);
    }

    #[test]
    fn test_redundant_header_fields() {
        let mut data = vec![0u8; 16];
        // origin 10: header occupies bytes 4..10
        data[4] = 0x11; // min_rec + n_owned=1
        let packed: u32 = (9 << 11) | (4 << 1) | 1; // heap_no=9, n_fields=4, 1-byte offsets
        data[5] = (packed >> 16) as u8;
        data[6] = (packed >> 8) as u8;
        data[7] = packed as u8;
        BigEndian::write_u16(&mut data[8..10], 0x0074);

        let hdr = decode_record_header(&data, 10, RowFormat::Redundant).unwrap();
        assert!(hdr.min_rec());
        assert_eq!(hdr.n_owned(), 1);
        assert_eq!(hdr.heap_no(), 9);
        assert_eq!(hdr.n_fields(), Some(4));
        assert_eq!(hdr.status(), None);
        assert_eq!(hdr.next, 0x74);
    }

    #[test]
    fn test_next_is_sign_extended() {
        let mut data = vec![0u8; 8];
        data[6] = 0xFF;
        data[7] = 0xFF;
        let hdr = decode_record_header(&data, 8, RowFormat::Compact).unwrap();
        assert_eq!(hdr.next, -1);
        assert_eq!(RowFormat::Compact.resolve_next(8, hdr.next), 7);
    }

    #[test]
    fn test_header_out_of_bounds() {
        let data = vec![0u8; 32];
        assert!(matches!(
            decode_record_header(&data, 4, RowFormat::Compact),
            Err(IbError::OutOfBounds { offset: 4, width: 5, len: 32 })
        ));
        assert!(matches!(
            decode_record_header(&data, 5, RowFormat::Redundant),
            Err(IbError::OutOfBounds { .. })
        ));
        assert!(matches!(
            decode_record_header(&data, 33, RowFormat::Compact),
            Err(IbError::OutOfBounds { .. })
        ));
        assert!(decode_record_header(&data, 5, RowFormat::Compact).is_ok());
    }

    #[test]
    fn test_walk_in_chain_order() {
        let page = compact_chain(&[300, 200, 400]);
        let walker = RecordWalker::new(&page, RowFormat::Compact, 3, 7);
        assert_eq!(offsets(walker), vec![300, 200, 400]);
    }

    #[test]
    fn test_walk_is_restartable() {
        let page = compact_chain(&[150, 180]);
        let first = offsets(RecordWalker::new(&page, RowFormat::Compact, 2, 1));
        let second = offsets(RecordWalker::new(&page, RowFormat::Compact, 2, 1));
        assert_eq!(first, second);
    }

    #[test]
    fn test_zero_records_skips_traversal() {
        // No infimum tag at all: with n_recs = 0 the area is never inspected.
        let page = vec![0u8; UNIV_PAGE_SIZE];
        let mut walker = RecordWalker::new(&page, RowFormat::Compact, 0, 1);
        assert!(walker.next().is_none());
    }

    #[test]
    fn test_supremum_is_never_yielded() {
        // Infimum links straight to supremum although n_recs claims one record.
        let page = compact_chain(&[]);
        let walker = RecordWalker::new(&page, RowFormat::Compact, 1, 1);
        assert!(offsets(walker).is_empty());
    }

    #[test]
    fn test_missing_infimum_tag() {
        let mut page = compact_chain(&[200]);
        page[PAGE_NEW_INFIMUM] = b'X';
        let mut walker = RecordWalker::new(&page, RowFormat::Compact, 1, 9);
        match walker.next() {
            Some(Err(IbError::CorruptPage { page_number, .. })) => assert_eq!(page_number, 9),
            other => panic!("expected CorruptPage, got {:?}", other),
        }
        assert!(walker.next().is_none());
    }

    #[test]
    fn test_cycle_is_detected() {
        let mut page = compact_chain(&[200, 300]);
        // 300 -> 200 instead of 300 -> supremum
        put_compact(&mut page, 300, 3, 0, -100);
        let results: Vec<_> = RecordWalker::new(&page, RowFormat::Compact, 2, 4).collect();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().offset(), 200);
        assert_eq!(results[1].as_ref().unwrap().offset(), 300);
        assert!(matches!(results[2], Err(IbError::CorruptPage { .. })));
    }

    #[test]
    fn test_cycle_with_generous_n_recs_never_revisits() {
        let mut page = compact_chain(&[200, 300]);
        put_compact(&mut page, 300, 3, 0, -100);
        let results: Vec<_> = RecordWalker::new(&page, RowFormat::Compact, 50, 4).collect();
        let seen: Vec<usize> = results
            .iter()
            .filter_map(|r| r.as_ref().ok().map(|rec| rec.offset()))
            .collect();
        assert_eq!(seen, vec![200, 300]);
        assert!(matches!(results.last(), Some(Err(IbError::CorruptPage { .. }))));
    }

    #[test]
    fn test_link_past_page_end() {
        let mut page = compact_chain(&[200]);
        put_compact(&mut page, 200, 2, 0, 0x7FFF);
        let results: Vec<_> = RecordWalker::new(&page, RowFormat::Compact, 1, 4).collect();
        assert_eq!(results.len(), 2);
        assert!(matches!(results[1], Err(IbError::CorruptPage { .. })));
    }

    #[test]
    fn test_more_records_than_header_claims() {
        let page = compact_chain(&[200, 300, 400]);
        let results: Vec<_> = RecordWalker::new(&page, RowFormat::Compact, 2, 4).collect();
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(results[1].is_ok());
        assert!(matches!(results[2], Err(IbError::CorruptPage { .. })));
    }

    #[test]
    fn test_link_before_page_start() {
        let mut page = compact_chain(&[200]);
        put_compact(&mut page, 200, 2, 0, -300);
        let results: Vec<_> = RecordWalker::new(&page, RowFormat::Compact, 1, 4).collect();
        assert_eq!(results.len(), 2);
        assert!(matches!(results[1], Err(IbError::CorruptPage { .. })));
    }

    #[test]
    fn test_link_into_header_area_is_out_of_bounds() {
        let mut page = compact_chain(&[200]);
        put_compact(&mut page, 200, 2, 0, -198); // origin 2 < 5 extra bytes
        let results: Vec<_> = RecordWalker::new(&page, RowFormat::Compact, 1, 4).collect();
        assert!(matches!(results[1], Err(IbError::OutOfBounds { offset: 2, .. })));
    }

    #[test]
    fn test_explicit_terminator_ends_walk() {
        let mut page = compact_chain(&[200, 300]);
        put_compact(&mut page, 200, 2, 0, 0);
        let walker = RecordWalker::new(&page, RowFormat::Compact, 2, 4);
        assert_eq!(offsets(walker), vec![200]);
    }

    #[test]
    fn test_redundant_walk_uses_absolute_links() {
        let mut page = vec![0u8; UNIV_PAGE_SIZE];
        page[PAGE_OLD_INFIMUM..PAGE_OLD_INFIMUM + 8].copy_from_slice(b"infimum\0");
        page[PAGE_OLD_SUPREMUM..PAGE_OLD_SUPREMUM + 9].copy_from_slice(b"supremum\0");
        let link = |page: &mut Vec<u8>, origin: usize, next: u16| {
            BigEndian::write_u16(&mut page[origin - 2..], next);
        };
        link(&mut page, PAGE_OLD_INFIMUM, 250);
        link(&mut page, 250, 180);
        link(&mut page, 180, PAGE_OLD_SUPREMUM as u16);
        link(&mut page, PAGE_OLD_SUPREMUM, 0);

        let walker = RecordWalker::new(&page, RowFormat::Redundant, 2, 3);
        assert_eq!(offsets(walker), vec![250, 180]);
    }
}
