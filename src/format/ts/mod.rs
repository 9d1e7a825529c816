//! # MPEG Transport Stream (TS) Implementation
//!
//! Muxing of H.264/H.265 and AAC into 188-byte TS packets, and demuxing of
//! such streams back into elementary-stream frames. It covers:
//!
//! - TS packet generation and parsing
//! - Program Specific Information (PAT/PMT) with CRC-32
//! - Packetized Elementary Stream (PES) headers with PTS/DTS
//! - PCR insertion and random access flags
//! - A/V interleaving by presentation timestamp
//!
//! ## Example Usage
//!
//! ### Muxing
//!
//! ```rust
//! use tsmux::codec::VideoCodec;
//! use tsmux::config::MuxConfig;
//! use tsmux::format::ts::{PacketCollector, TSMuxer, TS_PACKET_SIZE};
//!
//! # fn main() -> tsmux::Result<()> {
//! let mut muxer = TSMuxer::initialize(MuxConfig::video_only(VideoCodec::H264, 30))?;
//! let mut out = PacketCollector::new();
//!
//! // SPS, PPS and an IDR slice from one encoder callback
//! let access_unit = [
//!     0, 0, 0, 1, 0x67, 0x42, //
//!     0, 0, 0, 1, 0x68, 0xCE, //
//!     0, 0, 0, 1, 0x65, 0x88, 0x84,
//! ];
//! muxer.write_nalu_into(&access_unit, 0, &mut out)?;
//!
//! // PAT, PMT and one packet per NAL unit
//! assert_eq!(out.packet_count(), 5);
//! assert_eq!(out.len() % TS_PACKET_SIZE, 0);
//! # Ok(())
//! # }
//! ```
//!
//! ### Demuxing
//!
//! ```rust
//! use tsmux::format::ts::{DemuxedFrame, TSDemuxer};
//!
//! let mut demuxer = TSDemuxer::new();
//! let mut frames: Vec<DemuxedFrame> = Vec::new();
//! # let bytes_from_network: Vec<u8> = Vec::new();
//! demuxer.read_packet_into(&bytes_from_network, &mut frames);
//! demuxer.flush_into(&mut frames);
//! for frame in &frames {
//!     println!("pid {} pts {:?}: {} bytes", frame.pid, frame.pts, frame.data.len());
//! }
//! ```

/// Continuity counters for the writer and per-PID tracking for the reader
pub mod continuity;

/// TS demuxer implementation for extracting elementary streams
pub mod demuxer;

/// Ordering of audio and video frames before packetization
pub mod interleaver;

/// TS muxer implementation for creating MPEG-TS packets
pub mod muxer;

/// Packet scratch buffer and packet sinks
pub mod packet;

/// Frame to TS packet conversion
pub mod packetizer;

/// Low-level TS packet parsing utilities
pub mod parser;

/// PES header handling
pub mod pes;

/// PAT/PMT generation
pub mod psi;

pub mod segmenter;

/// Async reader/writer adaptors
pub mod stream;

/// Core TS types and constants
pub mod types;

// Re-export commonly used types and constants
pub use demuxer::{DemuxStats, DemuxedFrame, FrameListener, TSDemuxer};
pub use muxer::{SharedMuxer, TSMuxer};
pub use packet::{NullListener, PacketBuffer, PacketCollector, PacketListener};
pub use pes::PESHeader;
pub use psi::Profile;
pub use stream::{frame_stream, TsReader, TsWriter};
pub use types::{
    TSHeader,
    PID_AUDIO,
    PID_PAT,
    PID_PMT,
    PID_VIDEO,
    STREAM_TYPE_AAC,
    STREAM_TYPE_H264,
    STREAM_TYPE_H265,
    TS_PACKET_SIZE,
};
