//! Shared utilities (offset and byte formatting for reports).

pub mod hex;
