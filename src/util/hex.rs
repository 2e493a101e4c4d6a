//! Hex formatting utilities.
//!
//! Helpers for printing byte offsets and raw header bytes in reports.

/// Format a byte offset as "decimal (0xhex)".
pub fn format_offset(offset: u64) -> String {
    format!("{} (0x{:x})", offset, offset)
}

/// Format bytes as a compact hex string (e.g., "4a2f00ff").
pub fn format_bytes(data: &[u8]) -> String {
    data.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_offset() {
        assert_eq!(format_offset(0), "0 (0x0)");
        assert_eq!(format_offset(125), "125 (0x7d)");
        assert_eq!(format_offset(16384), "16384 (0x4000)");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(&[0x4a, 0x2f, 0x00, 0xff]), "4a2f00ff");
        assert_eq!(format_bytes(&[]), "");
        assert_eq!(format_bytes(&[0x00]), "00");
    }
}
