//! # AAC/ADTS Handling
//!
//! AAC is carried in the transport stream as ADTS frames, one frame per PES
//! packet. This module parses ADTS headers to split a buffer into frames and
//! builds headers for raw AAC access units.

/// ADTS header parsing and frame splitting
pub mod parser;
/// ADTS header and configuration types
pub mod types;

pub use parser::AACParser;
pub use types::{AACConfig, ADTSHeader, ProfileType};

/// Samples per AAC access unit.
pub const SAMPLES_PER_FRAME: u64 = 1024;

/// Size of an ADTS header without CRC.
pub const ADTS_HEADER_SIZE: usize = 7;
