//! Chip-level device facts and the integer parser used for catalog fields.

/// Frame geometry and identification of one device.
///
/// Derived on demand from the [`DeviceCatalog`](crate::catalog::DeviceCatalog);
/// the catalog is already in memory so this is never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChipInfo {
    /// Family name, e.g. `ECP5`.
    pub family: String,
    /// Device name, e.g. `LFE5U-25F`.
    pub name: String,
    /// Number of configuration frames.
    pub num_frames: usize,
    /// Number of bits in each frame, excluding padding.
    pub bits_per_frame: usize,
    /// Padding bits emitted before each frame.
    pub pad_bits_before_frame: usize,
    /// Padding bits emitted after each frame.
    pub pad_bits_after_frame: usize,
    /// The JTAG IDCODE.
    pub idcode: u32,
    /// Largest tile row index.
    pub max_row: i32,
    /// Largest tile column index.
    pub max_col: i32,
    /// Column bias applied when mapping tile names to grid columns.
    pub col_bias: i32,
}

/// Parses an unsigned 32-bit integer written in decimal or `0x` hexadecimal.
///
/// JSON has no hexadecimal literals, so IDCODEs are stored as strings such as
/// `"0x41111043"`. Surrounding whitespace is ignored. Signs, empty input, and
/// values that do not fit in 32 bits yield `None`.
pub fn parse_uint32(s: &str) -> Option<u32> {
    let s = s.trim();
    let (digits, radix) = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => (hex, 16),
        None => (s, 10),
    };
    // from_str_radix tolerates a leading '+', so check the digits ourselves
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    u32::from_str_radix(digits, radix).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_and_decimal_agree() {
        assert_eq!(parse_uint32("0x1234"), Some(4660));
        assert_eq!(parse_uint32("4660"), Some(4660));
    }

    #[test]
    fn uppercase_prefix() {
        assert_eq!(parse_uint32("0X41111043"), Some(0x4111_1043));
    }

    #[test]
    fn full_width_values() {
        assert_eq!(parse_uint32("0xFFFFFFFF"), Some(u32::MAX));
        assert_eq!(parse_uint32("4294967295"), Some(u32::MAX));
    }

    #[test]
    fn whitespace_is_trimmed() {
        assert_eq!(parse_uint32("  0x10 "), Some(16));
    }

    #[test]
    fn rejects_overflow() {
        assert_eq!(parse_uint32("0x100000000"), None);
        assert_eq!(parse_uint32("4294967296"), None);
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_uint32(""), None);
        assert_eq!(parse_uint32("0x"), None);
        assert_eq!(parse_uint32("+16"), None);
        assert_eq!(parse_uint32("-1"), None);
        assert_eq!(parse_uint32("0xZZ"), None);
        assert_eq!(parse_uint32("12ab"), None);
    }
}
