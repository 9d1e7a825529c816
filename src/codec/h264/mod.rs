//! # H.264/AVC NAL Unit Handling
//!
//! Only what the multiplexer needs to cut an Annex-B stream into PES frames:
//!
//! - NAL unit type extraction from the header byte
//! - Slice type detection (I/P/B) from the start of a slice header
//! - Recognition of the units a decoder can start from (SPS, PPS, IDR)
//!
//! ## Example
//!
//! ```rust
//! use tsmux::av::FrameType;
//! use tsmux::codec::h264::{H264Parser, NALUnitType};
//!
//! // IDR slice: first_mb_in_slice = 0, slice_type = 7 (I, all slices)
//! let idr = [0x65, 0x88, 0x84];
//! assert_eq!(NALUnitType::from(idr[0] & 0x1F), NALUnitType::CodedSliceIDR);
//! assert_eq!(H264Parser::frame_type(&idr), FrameType::I);
//! ```

/// Slice header inspection and emulation prevention removal
pub mod parser;
/// NAL unit types and headers
pub mod types;

#[doc(inline)]
pub use parser::*;
#[doc(inline)]
pub use types::*;

/// Access unit delimiter NAL (`primary_pic_type` = any), start code included.
pub const ACCESS_UNIT_DELIMITER: [u8; 6] = [0x00, 0x00, 0x00, 0x01, 0x09, 0xF0];

/// NAL unit type of an H.264 header byte.
pub fn nal_type(header: u8) -> u8 {
    header & 0x1F
}
