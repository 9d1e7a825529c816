use crate::av::FrameType;

use super::types::{NALUnit, NALUnitType};

/// Classifies H.265/HEVC NAL units for the segmenter.
///
/// HEVC slice headers depend on PPS fields before `slice_type`, so pictures
/// are classified by NAL unit type alone: IRAP pictures are I, every other
/// VCL unit is reported as P.
#[derive(Debug, Default, Clone, Copy)]
pub struct H265Parser;

impl H265Parser {
    /// Determines the picture type of a NAL unit
    ///
    /// # Arguments
    ///
    /// * `nal` - NAL unit bytes starting at the first header byte
    ///
    /// # Returns
    ///
    /// `FrameType::NonSlice` for parameter sets, SEI and other non-VCL units
    pub fn frame_type(nal: &[u8]) -> FrameType {
        let Some(&header) = nal.first() else {
            return FrameType::NonSlice;
        };
        let nal_type = NALUnitType::from_u8(super::nal_type(header));
        if nal_type.is_irap() {
            FrameType::I
        } else if nal_type.is_vcl() {
            FrameType::P
        } else {
            FrameType::NonSlice
        }
    }

    /// Checks if a NAL unit is a random access point (BLA, IDR or CRA)
    ///
    /// # Arguments
    ///
    /// * `nalu` - NAL unit to check
    pub fn is_keyframe(nalu: &NALUnit) -> bool {
        nalu.nal_type.is_irap()
    }
}
