//! Page type and insert direction lookup tables.
//!
//! Maps the 2-byte page type field (bytes 24-25 of the FIL header) to a
//! [`PageType`] and the `PAGE_DIRECTION` field of the INDEX page header to a
//! [`PageDirection`]. Each variant carries a display name and, for page types,
//! its MySQL source constant.
//!
//! Tablespaces written by newer servers can carry codes these tables do not
//! know. Lookups therefore return `Option` (typed API) or
//! [`IbError::UnknownCode`] (name API) instead of panicking, and the page
//! decoders never consult these tables at all.

use serde::Serialize;
use std::fmt;

use crate::innodb::constants::*;
use crate::IbError;

/// Known InnoDB page types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PageType {
    /// Freshly allocated, type field not initialized (FIL_PAGE_TYPE_ALLOCATED = 0)
    Allocated,
    /// Unused page type marker (FIL_PAGE_TYPE_UNUSED = 1)
    Unused,
    /// Undo log page (FIL_PAGE_UNDO_LOG = 2)
    UndoLog,
    /// File segment inode (FIL_PAGE_INODE = 3)
    Inode,
    /// Insert buffer free list (FIL_PAGE_IBUF_FREE_LIST = 4)
    IbufFreeList,
    /// Insert buffer bitmap (FIL_PAGE_IBUF_BITMAP = 5)
    IbufBitmap,
    /// System internal page (FIL_PAGE_TYPE_SYS = 6)
    Sys,
    /// Transaction system header (FIL_PAGE_TYPE_TRX_SYS = 7)
    TrxSys,
    /// File space header, page 0 of each tablespace (FIL_PAGE_TYPE_FSP_HDR = 8)
    FspHdr,
    /// Extent descriptor (FIL_PAGE_TYPE_XDES = 9)
    Xdes,
    /// Uncompressed BLOB page (FIL_PAGE_TYPE_BLOB = 10)
    Blob,
    /// First compressed BLOB page (FIL_PAGE_TYPE_ZBLOB = 11)
    ZBlob,
    /// Subsequent compressed BLOB page (FIL_PAGE_TYPE_ZBLOB2 = 12)
    ZBlob2,
    /// Compressed page (FIL_PAGE_COMPRESSED = 14)
    Compressed,
    /// Encrypted page (FIL_PAGE_ENCRYPTED = 15)
    Encrypted,
    /// Compressed and encrypted page (FIL_PAGE_COMPRESSED_AND_ENCRYPTED = 16)
    CompressedEncrypted,
    /// Encrypted R-tree page (FIL_PAGE_ENCRYPTED_RTREE = 17)
    EncryptedRtree,
    /// Uncompressed SDI BLOB page (FIL_PAGE_SDI_BLOB = 18)
    SdiBlob,
    /// Compressed SDI BLOB page (FIL_PAGE_SDI_ZBLOB = 19)
    SdiZblob,
    /// Legacy doublewrite buffer page (FIL_PAGE_TYPE_LEGACY_DBLWR = 20)
    LegacyDblwr,
    /// Rollback segment array page (FIL_PAGE_TYPE_RSEG_ARRAY = 21)
    RsegArray,
    /// LOB index page (FIL_PAGE_TYPE_LOB_INDEX = 22)
    LobIndex,
    /// LOB data page (FIL_PAGE_TYPE_LOB_DATA = 23)
    LobData,
    /// LOB first page (FIL_PAGE_TYPE_LOB_FIRST = 24)
    LobFirst,
    /// First page of compressed LOB (FIL_PAGE_TYPE_ZLOB_FIRST = 25)
    ZlobFirst,
    /// Data pages of compressed LOB (FIL_PAGE_TYPE_ZLOB_DATA = 26)
    ZlobData,
    /// Index pages of compressed LOB (FIL_PAGE_TYPE_ZLOB_INDEX = 27)
    ZlobIndex,
    /// Fragment pages of compressed LOB (FIL_PAGE_TYPE_ZLOB_FRAG = 28)
    ZlobFrag,
    /// Index of fragment pages for compressed LOB (FIL_PAGE_TYPE_ZLOB_FRAG_ENTRY = 29)
    ZlobFragEntry,
    /// SDI index page (FIL_PAGE_SDI = 17853)
    Sdi,
    /// R-tree index page for spatial indexes (FIL_PAGE_RTREE = 17854)
    Rtree,
    /// B+Tree node page (FIL_PAGE_INDEX = 17855)
    Index,
}

/// Every known page type, in code order.
const ALL_PAGE_TYPES: [PageType; 32] = [
    PageType::Allocated,
    PageType::Unused,
    PageType::UndoLog,
    PageType::Inode,
    PageType::IbufFreeList,
    PageType::IbufBitmap,
    PageType::Sys,
    PageType::TrxSys,
    PageType::FspHdr,
    PageType::Xdes,
    PageType::Blob,
    PageType::ZBlob,
    PageType::ZBlob2,
    PageType::Compressed,
    PageType::Encrypted,
    PageType::CompressedEncrypted,
    PageType::EncryptedRtree,
    PageType::SdiBlob,
    PageType::SdiZblob,
    PageType::LegacyDblwr,
    PageType::RsegArray,
    PageType::LobIndex,
    PageType::LobData,
    PageType::LobFirst,
    PageType::ZlobFirst,
    PageType::ZlobData,
    PageType::ZlobIndex,
    PageType::ZlobFrag,
    PageType::ZlobFragEntry,
    PageType::Sdi,
    PageType::Rtree,
    PageType::Index,
];

impl PageType {
    /// Look up a page type by the raw code from the FIL header.
    ///
    /// # Examples
    ///
    /// ```
    /// use ibpage::innodb::page_types::PageType;
    ///
    /// assert_eq!(PageType::from_u16(0x45BF), Some(PageType::Index));
    /// assert_eq!(PageType::from_u16(8), Some(PageType::FspHdr));
    /// assert_eq!(PageType::from_u16(9999), None);
    /// ```
    pub fn from_u16(value: u16) -> Option<Self> {
        ALL_PAGE_TYPES.iter().copied().find(|pt| pt.as_u16() == value)
    }

    /// Returns the raw on-disk code.
    pub fn as_u16(self) -> u16 {
        match self {
            PageType::Allocated => 0,
            PageType::Unused => 1,
            PageType::UndoLog => 2,
            PageType::Inode => 3,
            PageType::IbufFreeList => 4,
            PageType::IbufBitmap => 5,
            PageType::Sys => 6,
            PageType::TrxSys => 7,
            PageType::FspHdr => 8,
            PageType::Xdes => 9,
            PageType::Blob => 10,
            PageType::ZBlob => 11,
            PageType::ZBlob2 => 12,
            PageType::Compressed => 14,
            PageType::Encrypted => 15,
            PageType::CompressedEncrypted => 16,
            PageType::EncryptedRtree => 17,
            PageType::SdiBlob => 18,
            PageType::SdiZblob => 19,
            PageType::LegacyDblwr => 20,
            PageType::RsegArray => 21,
            PageType::LobIndex => 22,
            PageType::LobData => 23,
            PageType::LobFirst => 24,
            PageType::ZlobFirst => 25,
            PageType::ZlobData => 26,
            PageType::ZlobIndex => 27,
            PageType::ZlobFrag => 28,
            PageType::ZlobFragEntry => 29,
            PageType::Sdi => 17853,
            PageType::Rtree => 17854,
            PageType::Index => FIL_PAGE_INDEX,
        }
    }

    /// (display name, MySQL source constant)
    fn metadata(self) -> (&'static str, &'static str) {
        match self {
            PageType::Allocated => ("Freshly Allocated Page", "FIL_PAGE_TYPE_ALLOCATED"),
            PageType::Unused => ("Unused Page", "FIL_PAGE_TYPE_UNUSED"),
            PageType::UndoLog => ("Undo Log Page", "FIL_PAGE_UNDO_LOG"),
            PageType::Inode => ("File Segment inode", "FIL_PAGE_INODE"),
            PageType::IbufFreeList => ("Insert Buffer Free List", "FIL_PAGE_IBUF_FREE_LIST"),
            PageType::IbufBitmap => ("Insert Buffer Bitmap", "FIL_PAGE_IBUF_BITMAP"),
            PageType::Sys => ("System Page", "FIL_PAGE_TYPE_SYS"),
            PageType::TrxSys => ("Transaction system Page", "FIL_PAGE_TYPE_TRX_SYS"),
            PageType::FspHdr => ("File Space Header", "FIL_PAGE_TYPE_FSP_HDR"),
            PageType::Xdes => ("extend description page", "FIL_PAGE_TYPE_XDES"),
            PageType::Blob => ("Uncompressed BLOB Page", "FIL_PAGE_TYPE_BLOB"),
            PageType::ZBlob => ("1st compressed BLOB Page", "FIL_PAGE_TYPE_ZBLOB"),
            PageType::ZBlob2 => ("Subsequent compressed BLOB Page", "FIL_PAGE_TYPE_ZBLOB2"),
            PageType::Compressed => ("Compressed Page", "FIL_PAGE_COMPRESSED"),
            PageType::Encrypted => ("Encrypted Page", "FIL_PAGE_ENCRYPTED"),
            PageType::CompressedEncrypted => (
                "Compressed and Encrypted Page",
                "FIL_PAGE_COMPRESSED_AND_ENCRYPTED",
            ),
            PageType::EncryptedRtree => ("Encrypted R-tree Page", "FIL_PAGE_ENCRYPTED_RTREE"),
            PageType::SdiBlob => ("Uncompressed SDI BLOB Page", "FIL_PAGE_SDI_BLOB"),
            PageType::SdiZblob => ("Compressed SDI BLOB Page", "FIL_PAGE_SDI_ZBLOB"),
            PageType::LegacyDblwr => ("Legacy Doublewrite Page", "FIL_PAGE_TYPE_LEGACY_DBLWR"),
            PageType::RsegArray => ("Rollback Segment Array", "FIL_PAGE_TYPE_RSEG_ARRAY"),
            PageType::LobIndex => ("LOB Index Page", "FIL_PAGE_TYPE_LOB_INDEX"),
            PageType::LobData => ("LOB Data Page", "FIL_PAGE_TYPE_LOB_DATA"),
            PageType::LobFirst => ("LOB First Page", "FIL_PAGE_TYPE_LOB_FIRST"),
            PageType::ZlobFirst => ("1st compressed LOB Page", "FIL_PAGE_TYPE_ZLOB_FIRST"),
            PageType::ZlobData => ("Compressed LOB Data Page", "FIL_PAGE_TYPE_ZLOB_DATA"),
            PageType::ZlobIndex => ("Compressed LOB Index Page", "FIL_PAGE_TYPE_ZLOB_INDEX"),
            PageType::ZlobFrag => ("Compressed LOB Fragment Page", "FIL_PAGE_TYPE_ZLOB_FRAG"),
            PageType::ZlobFragEntry => (
                "Compressed LOB Fragment Index Page",
                "FIL_PAGE_TYPE_ZLOB_FRAG_ENTRY",
            ),
            PageType::Sdi => ("SDI Index Page", "FIL_PAGE_SDI"),
            PageType::Rtree => ("R-tree Node", "FIL_PAGE_RTREE"),
            PageType::Index => ("B-tree Node", "FIL_PAGE_INDEX"),
        }
    }

    /// Returns the display name (e.g. `"B-tree Node"`).
    pub fn name(self) -> &'static str {
        self.metadata().0
    }

    /// Returns the MySQL source constant (e.g. `"FIL_PAGE_INDEX"`).
    pub fn source_name(self) -> &'static str {
        self.metadata().1
    }
}

impl fmt::Display for PageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Last insert direction stored in `PAGE_DIRECTION`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PageDirection {
    /// Never set (0).
    NotSet,
    Left,
    Right,
    SameRec,
    SamePage,
    NoDirection,
    /// All bits set (0xFFFF), seen on pages that were never used for inserts.
    Unset,
}

impl PageDirection {
    /// Look up an insert direction by its raw code.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            0 => Some(PageDirection::NotSet),
            PAGE_LEFT => Some(PageDirection::Left),
            PAGE_RIGHT => Some(PageDirection::Right),
            PAGE_SAME_REC => Some(PageDirection::SameRec),
            PAGE_SAME_PAGE => Some(PageDirection::SamePage),
            PAGE_NO_DIRECTION => Some(PageDirection::NoDirection),
            0xFFFF => Some(PageDirection::Unset),
            _ => None,
        }
    }

    /// Returns the display name (e.g. `"Page Right"`).
    pub fn name(self) -> &'static str {
        match self {
            PageDirection::NotSet => "Unknown(0x0000)",
            PageDirection::Left => "Page Left",
            PageDirection::Right => "Page Right",
            PageDirection::SameRec => "Page Same Rec",
            PageDirection::SamePage => "Page Same Page",
            PageDirection::NoDirection => "Page No Direction",
            PageDirection::Unset => "Unknown(0xFFFF)",
        }
    }
}

impl fmt::Display for PageDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Resolve a page type code to its display name.
///
/// # Examples
///
/// ```
/// use ibpage::innodb::page_types::page_type_name;
///
/// assert_eq!(page_type_name(0x45BF).unwrap(), "B-tree Node");
/// assert!(page_type_name(0x7777).is_err());
/// ```
pub fn page_type_name(code: u16) -> Result<&'static str, IbError> {
    PageType::from_u16(code)
        .map(PageType::name)
        .ok_or(IbError::UnknownCode {
            kind: "page type",
            code,
        })
}

/// Resolve an insert direction code to its display name.
pub fn direction_name(code: u16) -> Result<&'static str, IbError> {
    PageDirection::from_u16(code)
        .map(PageDirection::name)
        .ok_or(IbError::UnknownCode {
            kind: "direction",
            code,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_page_type_names() {
        let expected = [
            (0x0000, "Freshly Allocated Page"),
            (0x0002, "Undo Log Page"),
            (0x0003, "File Segment inode"),
            (0x0004, "Insert Buffer Free List"),
            (0x0005, "Insert Buffer Bitmap"),
            (0x0006, "System Page"),
            (0x0007, "Transaction system Page"),
            (0x0008, "File Space Header"),
            (0x0009, "extend description page"),
            (0x000A, "Uncompressed BLOB Page"),
            (0x000B, "1st compressed BLOB Page"),
            (0x000C, "Subsequent compressed BLOB Page"),
            (0x45BF, "B-tree Node"),
        ];
        for (code, name) in expected {
            assert_eq!(page_type_name(code).unwrap(), name, "code 0x{:04X}", code);
        }
    }

    #[test]
    fn test_page_type_roundtrip() {
        for pt in ALL_PAGE_TYPES {
            assert_eq!(PageType::from_u16(pt.as_u16()), Some(pt));
        }
    }

    #[test]
    fn test_page_type_codes_unique() {
        let mut codes: Vec<u16> = ALL_PAGE_TYPES.iter().map(|pt| pt.as_u16()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), ALL_PAGE_TYPES.len());
    }

    #[test]
    fn test_unknown_page_type() {
        assert_eq!(PageType::from_u16(13), None);
        match page_type_name(13) {
            Err(IbError::UnknownCode { kind, code }) => {
                assert_eq!(kind, "page type");
                assert_eq!(code, 13);
            }
            other => panic!("expected UnknownCode, got {:?}", other),
        }
    }

    #[test]
    fn test_source_names() {
        assert_eq!(PageType::Index.source_name(), "FIL_PAGE_INDEX");
        assert_eq!(PageType::FspHdr.source_name(), "FIL_PAGE_TYPE_FSP_HDR");
        assert_eq!(format!("{}", PageType::Sdi), "SDI Index Page");
    }

    #[test]
    fn test_direction_names() {
        assert_eq!(direction_name(0).unwrap(), "Unknown(0x0000)");
        assert_eq!(direction_name(PAGE_LEFT).unwrap(), "Page Left");
        assert_eq!(direction_name(PAGE_RIGHT).unwrap(), "Page Right");
        assert_eq!(direction_name(PAGE_SAME_REC).unwrap(), "Page Same Rec");
        assert_eq!(direction_name(PAGE_SAME_PAGE).unwrap(), "Page Same Page");
        assert_eq!(direction_name(PAGE_NO_DIRECTION).unwrap(), "Page No Direction");
        assert_eq!(direction_name(0xFFFF).unwrap(), "Unknown(0xFFFF)");
        assert!(matches!(
            direction_name(6),
            Err(IbError::UnknownCode { kind: "direction", code: 6 })
        ));
    }
}
