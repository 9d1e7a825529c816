use bytes::Bytes;

/// An H.264 NAL unit without its start code.
#[derive(Debug, Clone)]
pub struct NALUnit {
    pub nal_type: u8,
    pub nal_ref_idc: u8,
    pub data: Bytes,
}

impl NALUnit {
    /// Wraps `data`, which must start at the NAL header byte. Returns `None`
    /// for an empty buffer.
    pub fn new(data: Bytes) -> Option<Self> {
        let header = *data.first()?;
        Some(Self {
            nal_type: header & 0x1F,
            nal_ref_idc: (header >> 5) & 0x03,
            data,
        })
    }

    pub fn unit_type(&self) -> NALUnitType {
        NALUnitType::from(self.nal_type)
    }

    pub fn is_keyframe(&self) -> bool {
        self.unit_type().is_sync_point()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NALUnitType {
    Unspecified,
    CodedSliceNonIDR,
    CodedSliceDataPartitionA,
    CodedSliceDataPartitionB,
    CodedSliceDataPartitionC,
    CodedSliceIDR,
    SEI,
    SPS,
    PPS,
    AccessUnitDelimiter,
    EndOfSequence,
    EndOfStream,
    FillerData,
    Other(u8),
}

impl NALUnitType {
    /// Coded picture slices that start a new PES frame with PTS and DTS.
    pub fn is_slice(&self) -> bool {
        matches!(self, NALUnitType::CodedSliceNonIDR | NALUnitType::CodedSliceIDR)
    }

    /// Units a decoder can start from.
    pub fn is_sync_point(&self) -> bool {
        matches!(
            self,
            NALUnitType::CodedSliceIDR | NALUnitType::SPS | NALUnitType::PPS
        )
    }
}

impl From<u8> for NALUnitType {
    fn from(value: u8) -> Self {
        match value {
            0 => NALUnitType::Unspecified,
            1 => NALUnitType::CodedSliceNonIDR,
            2 => NALUnitType::CodedSliceDataPartitionA,
            3 => NALUnitType::CodedSliceDataPartitionB,
            4 => NALUnitType::CodedSliceDataPartitionC,
            5 => NALUnitType::CodedSliceIDR,
            6 => NALUnitType::SEI,
            7 => NALUnitType::SPS,
            8 => NALUnitType::PPS,
            9 => NALUnitType::AccessUnitDelimiter,
            10 => NALUnitType::EndOfSequence,
            11 => NALUnitType::EndOfStream,
            12 => NALUnitType::FillerData,
            other => NALUnitType::Other(other),
        }
    }
}
