use crate::{Result, TsError};

use super::ADTS_HEADER_SIZE;

/// Sampling frequencies indexed by `sampling_frequency_index`.
pub const SAMPLE_RATES: [u32; 13] = [
    96000, 88200, 64000, 48000, 44100, 32000, 24000, 22050, 16000, 12000, 11025, 8000, 7350,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileType {
    Main = 0,
    LC = 1,
    SSR = 2,
    LTP = 3,
}

impl From<u8> for ProfileType {
    fn from(value: u8) -> Self {
        match value & 0x03 {
            0 => ProfileType::Main,
            1 => ProfileType::LC,
            2 => ProfileType::SSR,
            _ => ProfileType::LTP,
        }
    }
}

/// Stream parameters needed to build ADTS headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AACConfig {
    pub profile: ProfileType,
    pub sample_rate_index: u8,
    pub channel_configuration: u8,
}

impl Default for AACConfig {
    fn default() -> Self {
        Self {
            profile: ProfileType::LC,
            sample_rate_index: 4, // 44100 Hz
            channel_configuration: 2, // Stereo
        }
    }
}

impl AACConfig {
    /// AAC-LC configuration for a sample rate and channel count.
    pub fn lc(sample_rate: u32, channels: u8) -> Result<Self> {
        let sample_rate_index = SAMPLE_RATES
            .iter()
            .position(|&rate| rate == sample_rate)
            .ok_or_else(|| {
                TsError::InvalidConfig(format!("unsupported AAC sample rate: {}", sample_rate))
            })? as u8;
        if channels == 0 || channels > 7 {
            return Err(TsError::InvalidConfig(format!(
                "unsupported AAC channel count: {}",
                channels
            )));
        }
        Ok(Self {
            profile: ProfileType::LC,
            sample_rate_index,
            channel_configuration: channels,
        })
    }

    pub fn sample_rate(&self) -> Option<u32> {
        SAMPLE_RATES.get(self.sample_rate_index as usize).copied()
    }

    /// ADTS header (no CRC) for a raw access unit of `payload_len` bytes.
    pub fn adts_header(&self, payload_len: usize) -> Result<[u8; ADTS_HEADER_SIZE]> {
        let frame_length = payload_len + ADTS_HEADER_SIZE;
        if frame_length > 0x1FFF {
            return Err(TsError::Codec(format!(
                "AAC frame too large for ADTS: {} bytes",
                frame_length
            )));
        }
        let profile = self.profile as u8;
        let sri = self.sample_rate_index & 0x0F;
        let channels = self.channel_configuration & 0x07;
        Ok([
            0xFF,
            0xF1, // MPEG-4, layer 0, no CRC
            (profile << 6) | (sri << 2) | (channels >> 2),
            ((channels & 0x03) << 6) | ((frame_length >> 11) & 0x03) as u8,
            ((frame_length >> 3) & 0xFF) as u8,
            (((frame_length & 0x07) << 5) as u8) | 0x1F, // buffer fullness 0x7FF
            0xFC,
        ])
    }
}

#[derive(Debug)]
pub struct ADTSHeader {
    pub sync_word: u32,          // 12 bits
    pub id: u8,                  // 1 bit, 0=MPEG-4, 1=MPEG-2
    pub layer: u8,               // 2 bits
    pub protection_absent: bool,  // 1 bit
    pub profile: ProfileType,    // 2 bits
    pub sample_rate_index: u8,   // 4 bits
    pub private_bit: bool,       // 1 bit
    pub channel_configuration: u8,// 3 bits
    pub original_copy: bool,     // 1 bit
    pub home: bool,              // 1 bit
    pub frame_length: u16,       // 13 bits, header included
    pub buffer_fullness: u16,    // 11 bits
    pub number_of_raw_blocks: u8,// 2 bits
}

impl ADTSHeader {
    pub fn sync_word_valid(&self) -> bool {
        self.sync_word == 0xFFF
    }

    pub fn sample_rate(&self) -> Option<u32> {
        SAMPLE_RATES.get(self.sample_rate_index as usize).copied()
    }

    /// Header size, including the CRC when present.
    pub fn header_len(&self) -> usize {
        if self.protection_absent {
            ADTS_HEADER_SIZE
        } else {
            ADTS_HEADER_SIZE + 2
        }
    }
}
