//! InnoDB page format decoding.
//!
//! This module contains the layout constants, header decoders and record
//! chain walker for the uncompressed 16 KiB pages of an InnoDB tablespace.
//!
//! Start with [`tablespace::TablespaceFile`] to stream the pages of an `.ibd`
//! file, then use [`page::Page::records`] to walk the records of B-tree pages.

pub mod constants;
pub mod page;
pub mod page_types;
pub mod record;
pub mod tablespace;
