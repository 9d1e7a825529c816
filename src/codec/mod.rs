//! Codec-level helpers used by the frame segmenter.
//!
//! Nothing here decodes media. The H.264/H.265 modules only look at NAL
//! headers (and the first bits of a slice header) to find frame boundaries,
//! and the AAC module only parses ADTS headers to split frames.

pub mod aac;
pub mod h264;
pub mod h265;

use crate::format::ts::types::{STREAM_TYPE_H264, STREAM_TYPE_H265};
use crate::av::FrameType;

/// Annex-B start code prefix (three-byte form).
pub const START_CODE_3: [u8; 3] = [0x00, 0x00, 0x01];
/// Annex-B start code prefix (four-byte form).
pub const START_CODE_4: [u8; 4] = [0x00, 0x00, 0x00, 0x01];

/// One NAL unit located inside an Annex-B byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NalUnit<'a> {
    /// Offset of the start code within the scanned buffer
    pub offset: usize,
    /// Length of the start code (3 or 4, 0 when the buffer had none)
    pub start_code_len: usize,
    /// The unit including its start code
    pub data: &'a [u8],
}

impl<'a> NalUnit<'a> {
    /// The unit without its start code.
    pub fn payload(&self) -> &'a [u8] {
        &self.data[self.start_code_len..]
    }

    /// First byte after the start code, if any.
    pub fn header_byte(&self) -> Option<u8> {
        self.payload().first().copied()
    }
}

/// Splits an Annex-B buffer into NAL units.
///
/// Both `00 00 01` and `00 00 00 01` prefixes are recognised. Bytes before the
/// first start code are returned as a unit with `start_code_len == 0`, so a
/// buffer without any start code comes back as a single unit.
pub fn nal_units(data: &[u8]) -> Vec<NalUnit<'_>> {
    let mut starts = Vec::new();
    let mut pos = 0;
    while let Some(found) = crate::utils::find_subsequence(&data[pos..], &START_CODE_3) {
        let at = pos + found;
        // A zero right before `00 00 01` widens it to the four-byte form,
        // unless that zero already belongs to the previous start code.
        if at > pos && data[at - 1] == 0x00 {
            starts.push((at - 1, 4));
        } else {
            starts.push((at, 3));
        }
        pos = at + START_CODE_3.len();
    }

    let mut units = Vec::with_capacity(starts.len() + 1);
    let first_start = starts.first().map_or(data.len(), |&(s, _)| s);
    if first_start > 0 {
        units.push(NalUnit {
            offset: 0,
            start_code_len: 0,
            data: &data[..first_start],
        });
    }
    for (i, &(start, len)) in starts.iter().enumerate() {
        let end = starts.get(i + 1).map_or(data.len(), |&(next, _)| next);
        units.push(NalUnit {
            offset: start,
            start_code_len: len,
            data: &data[start..end],
        });
    }
    units
}

/// Per-codec behaviour the packetizer and segmenter need.
pub trait CodecProfile {
    /// PMT `stream_type` for this codec.
    fn stream_type(&self) -> u8;

    /// NAL unit type extracted from the first header byte.
    fn nal_type(&self, nal_header: u8) -> u8;

    /// Whether the unit carries picture data (a VCL slice).
    fn is_frame_boundary(&self, nal_header: u8) -> bool;

    /// Whether a decoder can start from this unit (parameter sets or IDR/IRAP).
    fn is_sync_point(&self, nal_header: u8) -> bool;

    /// Picture type of a unit (payload starting at the NAL header).
    fn frame_type(&self, nal: &[u8]) -> FrameType;

    /// Whether the unit is an access unit delimiter.
    fn is_access_unit_delimiter(&self, nal_header: u8) -> bool;

    /// Complete access unit delimiter NAL, start code included.
    fn access_unit_delimiter(&self) -> &'static [u8];
}

/// Video codecs the multiplexer can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VideoCodec {
    /// H.264 / AVC
    #[default]
    H264,
    /// H.265 / HEVC
    H265,
}

impl CodecProfile for VideoCodec {
    fn stream_type(&self) -> u8 {
        match self {
            VideoCodec::H264 => STREAM_TYPE_H264,
            VideoCodec::H265 => STREAM_TYPE_H265,
        }
    }

    fn nal_type(&self, nal_header: u8) -> u8 {
        match self {
            VideoCodec::H264 => h264::nal_type(nal_header),
            VideoCodec::H265 => h265::nal_type(nal_header),
        }
    }

    fn is_frame_boundary(&self, nal_header: u8) -> bool {
        match self {
            VideoCodec::H264 => h264::NALUnitType::from(h264::nal_type(nal_header)).is_slice(),
            VideoCodec::H265 => h265::NALUnitType::from(h265::nal_type(nal_header)).is_vcl(),
        }
    }

    fn is_sync_point(&self, nal_header: u8) -> bool {
        match self {
            VideoCodec::H264 => h264::NALUnitType::from(h264::nal_type(nal_header)).is_sync_point(),
            VideoCodec::H265 => h265::NALUnitType::from(h265::nal_type(nal_header)).is_sync_point(),
        }
    }

    fn frame_type(&self, nal: &[u8]) -> FrameType {
        match self {
            VideoCodec::H264 => h264::H264Parser::frame_type(nal),
            VideoCodec::H265 => h265::H265Parser::frame_type(nal),
        }
    }

    fn is_access_unit_delimiter(&self, nal_header: u8) -> bool {
        match self {
            VideoCodec::H264 => {
                h264::NALUnitType::from(h264::nal_type(nal_header))
                    == h264::NALUnitType::AccessUnitDelimiter
            }
            VideoCodec::H265 => {
                h265::NALUnitType::from(h265::nal_type(nal_header)) == h265::NALUnitType::Aud
            }
        }
    }

    fn access_unit_delimiter(&self) -> &'static [u8] {
        match self {
            VideoCodec::H264 => &h264::ACCESS_UNIT_DELIMITER,
            VideoCodec::H265 => &h265::ACCESS_UNIT_DELIMITER,
        }
    }
}

impl std::str::FromStr for VideoCodec {
    type Err = crate::TsError;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "h264" | "avc" => Ok(VideoCodec::H264),
            "h265" | "hevc" => Ok(VideoCodec::H265),
            other => Err(crate::TsError::InvalidConfig(format!(
                "unknown video codec: {}",
                other
            ))),
        }
    }
}
