//! # H.265/HEVC NAL Unit Handling
//!
//! HEVC counterpart of the H.264 module. NAL headers are two bytes wide and
//! the unit type sits in bits 1..=6 of the first byte.
//!
//! - VCL units (types 0..=31) carry pictures
//! - IRAP units (types 16..=21) are random access points
//! - VPS/SPS/PPS (types 32..=34) let a decoder start
//!
//! ## Example Usage
//!
//! ```rust
//! use tsmux::codec::h265::{H265Parser, NALUnitType};
//!
//! let idr = [0x26, 0x01, 0xAF];
//! let nal_type = NALUnitType::from_u8((idr[0] >> 1) & 0x3F);
//! assert_eq!(nal_type, NALUnitType::IdrWRadl);
//! assert!(nal_type.is_irap());
//! assert!(H265Parser::frame_type(&idr).is_keyframe());
//! ```

/// Parser implementation for H.265/HEVC streams
pub mod parser;

/// Type definitions and structures for H.265/HEVC codec
pub mod types;

pub use parser::H265Parser;
pub use types::{NALUnit, NALUnitType};

/// Access unit delimiter NAL (`pic_type` = I, P or B), start code included.
pub const ACCESS_UNIT_DELIMITER: [u8; 7] = [0x00, 0x00, 0x00, 0x01, 0x46, 0x01, 0x50];

/// NAL unit type of the first H.265 header byte.
pub fn nal_type(header: u8) -> u8 {
    (header >> 1) & 0x3F
}
