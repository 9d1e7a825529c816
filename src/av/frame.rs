use bytes::Bytes;

use super::StreamKind;

/// Picture type of a video frame.
///
/// Audio frames are always `I`: every AAC frame can be decoded on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    I,
    P,
    B,
    /// Parameter sets, SEI and other units without picture data
    NonSlice,
}

impl FrameType {
    pub fn is_keyframe(&self) -> bool {
        matches!(self, FrameType::I)
    }
}

/// One elementary stream unit ready to be wrapped in a PES packet.
///
/// Timestamps are in 90 kHz ticks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: StreamKind,
    pub data: Bytes,
    pub pts: u64,
    pub dts: Option<u64>,
    pub frame_type: FrameType,
    /// First unit of an access unit; video frames marked this way get an
    /// access unit delimiter when they lack one.
    pub access_unit_start: bool,
}

impl Frame {
    pub fn video(data: impl Into<Bytes>, pts: u64) -> Self {
        Self {
            kind: StreamKind::Video,
            data: data.into(),
            pts,
            dts: None,
            frame_type: FrameType::P,
            access_unit_start: true,
        }
    }

    pub fn audio(data: impl Into<Bytes>, pts: u64) -> Self {
        Self {
            kind: StreamKind::Audio,
            data: data.into(),
            pts,
            dts: None,
            frame_type: FrameType::I,
            access_unit_start: true,
        }
    }

    pub fn with_dts(mut self, dts: u64) -> Self {
        self.dts = Some(dts);
        self
    }

    pub fn with_frame_type(mut self, frame_type: FrameType) -> Self {
        self.frame_type = frame_type;
        self
    }

    pub fn with_access_unit_start(mut self, access_unit_start: bool) -> Self {
        self.access_unit_start = access_unit_start;
        self
    }

    pub fn is_video(&self) -> bool {
        self.kind == StreamKind::Video
    }

    /// Picture or audio data, as opposed to parameter sets and SEI.
    ///
    /// Such frames carry a DTS and a PCR in their first packet.
    pub fn is_frame(&self) -> bool {
        self.frame_type != FrameType::NonSlice
    }

    pub fn is_keyframe(&self) -> bool {
        self.frame_type.is_keyframe()
    }

    /// Decode timestamp, falling back to the PTS.
    pub fn decode_ts(&self) -> u64 {
        self.dts.unwrap_or(self.pts)
    }
}
