//! Stream and frame types shared by the muxer and demuxer.

mod frame;
pub use frame::*;

use crate::format::ts::types::{
    PID_AUDIO, PID_VIDEO, STREAM_ID_AUDIO, STREAM_ID_VIDEO, STREAM_TYPE_AAC, STREAM_TYPE_H264,
    STREAM_TYPE_H265,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodecType {
    H264,
    H265,
    AAC,
}

impl CodecType {
    /// Maps a PMT `stream_type` to a codec this crate understands.
    pub fn from_stream_type(stream_type: u8) -> Option<Self> {
        match stream_type {
            STREAM_TYPE_H264 => Some(CodecType::H264),
            STREAM_TYPE_H265 => Some(CodecType::H265),
            STREAM_TYPE_AAC => Some(CodecType::AAC),
            _ => None,
        }
    }

    pub fn stream_type(&self) -> u8 {
        match self {
            CodecType::H264 => STREAM_TYPE_H264,
            CodecType::H265 => STREAM_TYPE_H265,
            CodecType::AAC => STREAM_TYPE_AAC,
        }
    }

    pub fn is_video(&self) -> bool {
        matches!(self, CodecType::H264 | CodecType::H265)
    }
}

/// The two elementary streams a program can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Video,
    Audio,
}

impl StreamKind {
    /// Elementary stream PID.
    pub fn pid(&self) -> u16 {
        match self {
            StreamKind::Video => PID_VIDEO,
            StreamKind::Audio => PID_AUDIO,
        }
    }

    /// PES `stream_id`.
    pub fn stream_id(&self) -> u8 {
        match self {
            StreamKind::Video => STREAM_ID_VIDEO,
            StreamKind::Audio => STREAM_ID_AUDIO,
        }
    }
}
