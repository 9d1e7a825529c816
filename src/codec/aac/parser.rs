use std::ops::Range;

use super::types::{AACConfig, ADTSHeader, ProfileType};
use super::ADTS_HEADER_SIZE;
use crate::utils::BitReader;
use crate::{Result, TsError};

/// ADTS header parser.
#[derive(Debug, Default, Clone, Copy)]
pub struct AACParser;

impl AACParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse_adts_header(&self, data: &[u8]) -> Result<ADTSHeader> {
        if data.len() < ADTS_HEADER_SIZE {
            return Err(TsError::Truncated {
                what: "ADTS header",
                needed: ADTS_HEADER_SIZE,
                available: data.len(),
            });
        }

        let mut reader = BitReader::new(data);

        let sync_word = reader.read_bits(12)?;
        if sync_word != 0xFFF {
            return Err(TsError::Codec("invalid ADTS sync word".into()));
        }

        let id = reader.read_bits(1)? as u8;
        let layer = reader.read_bits(2)? as u8;
        let protection_absent = reader.read_bits(1)? == 1;

        let profile = ProfileType::from(reader.read_bits(2)? as u8);

        let sample_rate_index = reader.read_bits(4)? as u8;
        let private_bit = reader.read_bits(1)? == 1;
        let channel_configuration = reader.read_bits(3)? as u8;
        let original_copy = reader.read_bits(1)? == 1;
        let home = reader.read_bits(1)? == 1;

        reader.skip_bits(2)?; // copyright identification bit/start
        let frame_length = reader.read_bits(13)? as u16;
        let buffer_fullness = reader.read_bits(11)? as u16;
        let number_of_raw_blocks = reader.read_bits(2)? as u8;

        let header = ADTSHeader {
            sync_word,
            id,
            layer,
            protection_absent,
            profile,
            sample_rate_index,
            private_bit,
            channel_configuration,
            original_copy,
            home,
            frame_length,
            buffer_fullness,
            number_of_raw_blocks,
        };
        if (header.frame_length as usize) < header.header_len() {
            return Err(TsError::Codec(format!(
                "ADTS frame length {} shorter than its header",
                header.frame_length
            )));
        }
        Ok(header)
    }

    /// Splits a buffer of concatenated ADTS frames into per-frame ranges.
    ///
    /// Bytes that do not start with a valid header, or a final frame whose
    /// declared length runs past the buffer, are returned as one trailing
    /// range so no input is lost.
    pub fn split_frames(&self, data: &[u8]) -> Vec<Range<usize>> {
        let mut frames = Vec::new();
        let mut pos = 0;
        while pos < data.len() {
            match self.parse_adts_header(&data[pos..]) {
                Ok(header) if pos + header.frame_length as usize <= data.len() => {
                    let end = pos + header.frame_length as usize;
                    frames.push(pos..end);
                    pos = end;
                }
                Ok(header) => {
                    log::warn!(
                        "ADTS frame declares {} bytes, only {} available",
                        header.frame_length,
                        data.len() - pos
                    );
                    frames.push(pos..data.len());
                    break;
                }
                Err(e) => {
                    log::warn!("unparseable ADTS data at offset {}: {}", pos, e);
                    frames.push(pos..data.len());
                    break;
                }
            }
        }
        frames
    }

}
