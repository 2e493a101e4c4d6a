/// InnoDB page layout constants.
///
/// These values are derived from the MySQL/InnoDB source code headers:
/// - fil0fil.h (FIL header)
/// - page0types.h / page0page.h (page header, system records)
/// - rem0rec.h (record extra bytes)
// Page size (uncompressed 16K pages)
pub const UNIV_PAGE_SIZE: usize = 16384;

// FIL Header (38 bytes total)
pub const SIZE_FIL_HEAD: usize = 38;
pub const FIL_PAGE_SPACE: usize = 0; // 4 bytes - space id (checksum on newer formats)
pub const FIL_PAGE_OFFSET: usize = 4; // 4 bytes - page number
pub const FIL_PAGE_PREV: usize = 8; // 4 bytes - previous page
pub const FIL_PAGE_NEXT: usize = 12; // 4 bytes - next page
pub const FIL_PAGE_LSN: usize = 16; // 8 bytes - LSN of newest modification
pub const FIL_PAGE_TYPE: usize = 24; // 2 bytes - page type
pub const FIL_PAGE_FILE_FLUSH_LSN: usize = 26; // 8 bytes - flush LSN (only page 0 of system tablespace)
pub const FIL_PAGE_ARCH_LOG_NO: usize = 34; // 4 bytes - archive log number (space id on newer formats)

// Start of page data (immediately after FIL header)
pub const FIL_PAGE_DATA: usize = 38;

// Special page number values
pub const FIL_NULL: u32 = 0xFFFFFFFF; // "null" page reference

// B-tree node page type
pub const FIL_PAGE_INDEX: u16 = 0x45BF;

// Page Header (INDEX page specific, starts at PAGE_HEADER = offset 38)
pub const PAGE_HEADER: usize = FIL_PAGE_DATA;
pub const PAGE_N_DIR_SLOTS: usize = 0; // 2 bytes - number of directory slots
pub const PAGE_HEAP_TOP: usize = 2; // 2 bytes - pointer to record heap top
pub const PAGE_N_HEAP: usize = 4; // 2 bytes - number of records in heap (bit 15 = compact flag)
pub const PAGE_FREE: usize = 6; // 2 bytes - pointer to start of free record list
pub const PAGE_GARBAGE: usize = 8; // 2 bytes - bytes in deleted records
pub const PAGE_LAST_INSERT: usize = 10; // 2 bytes - pointer to last inserted record
pub const PAGE_DIRECTION: usize = 12; // 2 bytes - last insert direction
pub const PAGE_N_DIRECTION: usize = 14; // 2 bytes - consecutive inserts in same direction
pub const PAGE_N_RECS: usize = 16; // 2 bytes - number of user records
pub const PAGE_MAX_TRX_ID: usize = 18; // 8 bytes - max trx id (secondary indexes only)
pub const PAGE_LEVEL: usize = 26; // 2 bytes - level in B+tree (0 = leaf)
pub const PAGE_INDEX_ID: usize = 28; // 8 bytes - index id
pub const PAGE_BTR_SEG_LEAF: usize = 36; // 10 bytes - leaf segment header
pub const PAGE_BTR_SEG_TOP: usize = 46; // 10 bytes - non-leaf segment header
pub const PAGE_HEADER_SIZE: usize = 56; // index page header including both FSEG headers

// Bit 15 of PAGE_N_HEAP selects the row format
pub const PAGE_N_HEAP_COMPACT_FLAG: u16 = 0x8000;

// FSEG Header size
pub const FSEG_HEADER_SIZE: usize = 10;

// Start of the record area: PAGE_HEADER + 36 + 2 * FSEG_HEADER_SIZE
pub const PAGE_DATA: usize = PAGE_HEADER + 36 + 2 * FSEG_HEADER_SIZE; // 94

// Record extra bytes
pub const REC_N_OLD_EXTRA_BYTES: usize = 6;
pub const REC_N_NEW_EXTRA_BYTES: usize = 5;

// System record origins
pub const PAGE_NEW_INFIMUM: usize = PAGE_DATA + REC_N_NEW_EXTRA_BYTES; // 99
pub const PAGE_NEW_SUPREMUM: usize = PAGE_DATA + 2 * REC_N_NEW_EXTRA_BYTES + 8; // 112
pub const PAGE_OLD_INFIMUM: usize = PAGE_DATA + 1 + REC_N_OLD_EXTRA_BYTES; // 101
pub const PAGE_OLD_SUPREMUM: usize = PAGE_DATA + 2 + 2 * REC_N_OLD_EXTRA_BYTES + 8; // 116

// System record tags stored at the record origin
pub const INFIMUM_TAG: &[u8] = b"infimum";
pub const SUPREMUM_TAG: &[u8] = b"supremum";

// Insert direction values
pub const PAGE_LEFT: u16 = 1;
pub const PAGE_RIGHT: u16 = 2;
pub const PAGE_SAME_REC: u16 = 3;
pub const PAGE_SAME_PAGE: u16 = 4;
pub const PAGE_NO_DIRECTION: u16 = 5;
