//! # Utility Functions and Types
//!
//! Common helpers shared by the codec parsers and the transport stream layer:
//!
//! - Bit-level reading of codec headers
//! - MPEG-2 CRC-32 calculation and validation
//! - Byte-pattern search used for start codes and delimiters
//!
//! ## CRC Calculation
//!
//! ```rust
//! use tsmux::utils::Crc32Mpeg2;
//!
//! let crc = Crc32Mpeg2::calculate(b"Hello, world!");
//! println!("CRC32: {:08x}", crc);
//! ```

/// Bit manipulation and bitstream reading utilities
pub mod bits;

/// CRC calculation implementations
pub mod crc;

pub use bits::BitReader;
pub use crc::Crc32Mpeg2;

/// Returns the offset of the first occurrence of `needle` in `haystack`.
///
/// Needles here are start codes and delimiters of at most a few bytes, so the
/// scan is linear in `haystack`.
pub fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    if needle.len() > haystack.len() {
        return None;
    }
    let first = needle[0];
    let last_start = haystack.len() - needle.len();
    let mut pos = 0;
    while pos <= last_start {
        let candidate = haystack[pos..=last_start].iter().position(|&b| b == first)?;
        let start = pos + candidate;
        if &haystack[start..start + needle.len()] == needle {
            return Some(start);
        }
        pos = start + 1;
    }
    None
}
