use crate::av::FrameType;
use crate::utils::BitReader;
use crate::Result;

use super::types::NALUnitType;

/// Bytes of slice header needed to reach `slice_type`. Two ue(v) values of
/// at most 32 bits each fit comfortably.
const SLICE_HEADER_PREFIX: usize = 16;

/// Classifies H.264 NAL units for the segmenter.
///
/// The parser holds no state: a NAL unit is classified from its own header
/// bytes only.
#[derive(Debug, Default, Clone, Copy)]
pub struct H264Parser;

impl H264Parser {
    /// Strips `00 00 03` emulation prevention bytes.
    pub fn remove_emulation_prevention(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(data.len());
        let mut zeros = 0;
        for &byte in data {
            if zeros >= 2 && byte == 0x03 {
                zeros = 0;
                continue;
            }
            zeros = if byte == 0x00 { zeros + 1 } else { 0 };
            out.push(byte);
        }
        out
    }

    /// Reads `slice_type` from a slice NAL unit starting at its header byte.
    pub fn slice_type(nal: &[u8]) -> Result<u32> {
        let end = nal.len().min(1 + SLICE_HEADER_PREFIX);
        let rbsp = Self::remove_emulation_prevention(nal.get(1..end).unwrap_or_default());
        let mut reader = BitReader::new(&rbsp);
        reader.read_golomb()?; // first_mb_in_slice
        reader.read_golomb()
    }

    /// Picture type of a NAL unit starting at its header byte.
    ///
    /// IDR slices are always I. For other slices `slice_type % 5` maps
    /// P/SP to P, B to B and I/SI to I. Units that carry no picture, or
    /// slices whose header cannot be read, report `NonSlice`/`P`.
    pub fn frame_type(nal: &[u8]) -> FrameType {
        let Some(&header) = nal.first() else {
            return FrameType::NonSlice;
        };
        match NALUnitType::from(header & 0x1F) {
            NALUnitType::CodedSliceIDR => FrameType::I,
            NALUnitType::CodedSliceNonIDR => match Self::slice_type(nal) {
                Ok(slice_type) => match slice_type % 5 {
                    1 => FrameType::B,
                    2 | 4 => FrameType::I,
                    _ => FrameType::P,
                },
                Err(e) => {
                    log::warn!("unreadable H.264 slice header: {}", e);
                    FrameType::P
                }
            },
            _ => FrameType::NonSlice,
        }
    }
}
