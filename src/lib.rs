#![doc(html_root_url = "https://docs.rs/tsmux/0.1.0")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(rustdoc::missing_crate_level_docs)]

//! # tsmux - MPEG-2 Transport Stream muxer and demuxer
//!
//! `tsmux` packs live encoder output into MPEG-TS for delivery over RTSP,
//! SRT, UDP or HTTP, and unpacks such streams again.
//!
//! ## Features
//!
//! ### Codec Support
//! - H.264/AVC NAL unit splitting and slice classification
//! - H.265/HEVC NAL unit splitting and IRAP detection
//! - AAC in ADTS framing, or raw AAC-LC wrapped on the way in
//!
//! ### Transport Stream
//! - PAT/PMT generation on a configurable interval
//! - PES packetization with PTS/DTS, PCR and random access flags
//! - A/V interleaving by presentation timestamp
//! - Demuxing with resync, CRC checks and continuity tracking
//! - Tokio reader/writer adaptors
//!
//! ## Quick Start
//!
//! ```rust
//! use tsmux::config::MuxConfig;
//! use tsmux::format::ts::{TSDemuxer, TSMuxer, DemuxedFrame};
//! use std::sync::{Arc, Mutex};
//!
//! # fn main() -> tsmux::Result<()> {
//! let out = Arc::new(Mutex::new(Vec::new()));
//! let sink = Arc::clone(&out);
//!
//! let mut muxer = TSMuxer::initialize(MuxConfig::audio_only(44_100, 2))?;
//! muxer.set_packet_listener(move |packet: &[u8]| {
//!     sink.lock().unwrap().extend_from_slice(packet);
//! });
//! muxer.write_aac(&[0x21, 0x10, 0x04], 0)?;
//!
//! let mut demuxer = TSDemuxer::new();
//! let mut frames: Vec<DemuxedFrame> = Vec::new();
//! demuxer.read_packet_into(&out.lock().unwrap(), &mut frames);
//! assert_eq!(frames.len(), 1);
//! assert_eq!(frames[0].pts, Some(0));
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! - `av`: stream kinds and the frame type passed between layers
//! - `codec`: H.264, H.265 and AAC parsing
//! - `config`: muxer configuration, including environment loading
//! - `format`: the transport stream muxer and demuxer and async traits
//! - `error`: error type and `Result` alias
//! - `utils`: bit reader, CRC-32 and byte search

/// Audio/Video base types
pub mod av;

/// Codec implementations for video and audio formats
pub mod codec;

/// Muxer configuration
pub mod config;

/// Error types and utilities
pub mod error;

/// Container format implementations
pub mod format;

/// Common utilities and helper functions
pub mod utils;

pub use config::MuxConfig;
pub use error::{Result, TsError};
pub use format::ts::{DemuxedFrame, SharedMuxer, TSDemuxer, TSMuxer};
