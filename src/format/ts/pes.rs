use bytes::BufMut;

use super::types::TIMESTAMP_MASK;
use crate::{Result, TsError};

/// Fixed part of a PES header up to and including `PES_header_data_length`.
pub const PES_FIXED_HEADER_SIZE: usize = 9;
/// Bytes before the optional header: start code, stream id and length.
pub const PES_START_SIZE: usize = 6;
/// Encoded size of a PTS or DTS field.
pub const TIMESTAMP_SIZE: usize = 5;

const PTS_DTS_PTS_ONLY: u8 = 0x80;
const PTS_DTS_BOTH: u8 = 0xC0;

/// Streams whose PES packets have no optional header; the payload starts
/// right after the packet length.
pub fn has_optional_header(stream_id: u8) -> bool {
    !matches!(
        stream_id,
        0xBC // program_stream_map
            | 0xBE // padding_stream
            | 0xBF // private_stream_2
            | 0xF0 // ECM
            | 0xF1 // EMM
            | 0xF2 // DSMCC
            | 0xF8 // H.222.1 type E
            | 0xFF // program_stream_directory
    )
}

/// Packetized Elementary Stream (PES) header structure
///
/// Only the fields this crate reads or writes are kept: stream id, length,
/// the alignment flag and the timestamps. Timestamps are 33-bit 90 kHz
/// values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PESHeader {
    /// Stream identifier indicating content type (video/audio/etc.)
    pub stream_id: u8,
    /// Bytes following the length field; 0 means unbounded (video only)
    pub packet_length: u16,
    /// Data alignment indicator
    pub data_alignment: bool,
    /// Length of the header data following `header_data_length`
    pub header_data_length: u8,
    /// Presentation Time Stamp
    pub pts: Option<u64>,
    /// Decoding Time Stamp
    pub dts: Option<u64>,
}

impl PESHeader {
    /// Creates a new PES header with a specific stream ID.
    pub fn new(stream_id: u8) -> Self {
        Self {
            stream_id,
            ..Default::default()
        }
    }

    /// Sets the Presentation Time Stamp (PTS) in 90 kHz ticks.
    pub fn with_pts(mut self, pts: u64) -> Self {
        self.pts = Some(pts & TIMESTAMP_MASK);
        self.header_data_length = self.timestamps_len();
        self
    }

    /// Sets the Decoding Time Stamp (DTS) in 90 kHz ticks. Only written
    /// together with a PTS.
    pub fn with_dts(mut self, dts: u64) -> Self {
        self.dts = Some(dts & TIMESTAMP_MASK);
        self.header_data_length = self.timestamps_len();
        self
    }

    /// Sets `PES_packet_length` for a payload of `payload_len` bytes, or 0
    /// when the packet would not fit the 16-bit field.
    pub fn with_payload_len(mut self, payload_len: usize) -> Self {
        let length = 3 + self.header_data_length as usize + payload_len;
        self.packet_length = u16::try_from(length).unwrap_or(0);
        self
    }

    fn timestamps_len(&self) -> u8 {
        match (self.pts, self.dts) {
            (Some(_), Some(_)) => (2 * TIMESTAMP_SIZE) as u8,
            (Some(_), None) => TIMESTAMP_SIZE as u8,
            _ => 0,
        }
    }

    /// Total encoded size.
    pub fn encoded_len(&self) -> usize {
        if has_optional_header(self.stream_id) {
            PES_FIXED_HEADER_SIZE + self.header_data_length as usize
        } else {
            PES_START_SIZE
        }
    }

    /// Payload size announced by `packet_length`, if bounded.
    pub fn payload_len(&self) -> Option<usize> {
        if self.packet_length == 0 {
            return None;
        }
        Some(
            (self.packet_length as usize)
                .saturating_sub(self.encoded_len() - PES_START_SIZE),
        )
    }

    /// Writes the PES header.
    pub fn write_to(&self, buf: &mut impl BufMut) {
        buf.put_slice(&[0x00, 0x00, 0x01]);
        buf.put_u8(self.stream_id);
        buf.put_u16(self.packet_length);

        if !has_optional_header(self.stream_id) {
            return;
        }

        // '10' marker, no scrambling, priority, copyright or original flags
        let mut flags = 0x80;
        if self.data_alignment {
            flags |= 0x04;
        }
        buf.put_u8(flags);

        let pts_dts_flags = match (self.pts, self.dts) {
            (Some(_), Some(_)) => PTS_DTS_BOTH,
            (Some(_), None) => PTS_DTS_PTS_ONLY,
            _ => 0x00,
        };
        buf.put_u8(pts_dts_flags);

        buf.put_u8(self.header_data_length);
        let written = match (self.pts, self.dts) {
            (Some(pts), Some(dts)) => {
                buf.put_slice(&encode_timestamp(0x30, pts));
                buf.put_slice(&encode_timestamp(0x10, dts));
                2 * TIMESTAMP_SIZE
            }
            (Some(pts), None) => {
                buf.put_slice(&encode_timestamp(0x20, pts));
                TIMESTAMP_SIZE
            }
            _ => 0,
        };
        for _ in written..self.header_data_length as usize {
            buf.put_u8(0xFF);
        }
    }

    /// Parses a PES header at the start of `data`.
    ///
    /// Returns the header and the offset of the first payload byte.
    pub fn parse(data: &[u8]) -> Result<(PESHeader, usize)> {
        if data.len() < PES_START_SIZE {
            return Err(TsError::Truncated {
                what: "PES header",
                needed: PES_START_SIZE,
                available: data.len(),
            });
        }
        let prefix = u32::from_be_bytes([0, data[0], data[1], data[2]]);
        if prefix != 0x000001 {
            return Err(TsError::PesStartCode(prefix));
        }

        let mut header = PESHeader::new(data[3]);
        header.packet_length = u16::from_be_bytes([data[4], data[5]]);

        if !has_optional_header(header.stream_id) {
            return Ok((header, PES_START_SIZE));
        }

        if data.len() < PES_FIXED_HEADER_SIZE {
            return Err(TsError::Truncated {
                what: "PES header",
                needed: PES_FIXED_HEADER_SIZE,
                available: data.len(),
            });
        }
        if data[6] & 0xC0 != 0x80 {
            return Err(TsError::PesHeader(format!(
                "bad optional header marker 0x{:02x}",
                data[6]
            )));
        }
        header.data_alignment = data[6] & 0x04 != 0;
        header.header_data_length = data[8];

        let payload_offset = PES_FIXED_HEADER_SIZE + header.header_data_length as usize;
        if data.len() < payload_offset {
            return Err(TsError::Truncated {
                what: "PES optional header",
                needed: payload_offset,
                available: data.len(),
            });
        }

        let fields = &data[PES_FIXED_HEADER_SIZE..payload_offset];
        match data[7] & 0xC0 {
            PTS_DTS_PTS_ONLY => {
                header.pts = Some(decode_timestamp(timestamp_field(fields, 0)?));
            }
            PTS_DTS_BOTH => {
                header.pts = Some(decode_timestamp(timestamp_field(fields, 0)?));
                header.dts = Some(decode_timestamp(timestamp_field(fields, TIMESTAMP_SIZE)?));
            }
            0x00 => {}
            _ => return Err(TsError::PesHeader("forbidden PTS_DTS_flags value '01'".into())),
        }

        Ok((header, payload_offset))
    }
}

fn timestamp_field(fields: &[u8], offset: usize) -> Result<&[u8; TIMESTAMP_SIZE]> {
    fields
        .get(offset..offset + TIMESTAMP_SIZE)
        .and_then(|f| f.try_into().ok())
        .ok_or(TsError::Truncated {
            what: "PES timestamp",
            needed: offset + TIMESTAMP_SIZE,
            available: fields.len(),
        })
}

/// Encodes a 33-bit timestamp behind a 4-bit guard (`0x20`, `0x30` or `0x10`).
pub fn encode_timestamp(guard: u8, ts: u64) -> [u8; TIMESTAMP_SIZE] {
    let ts = ts & TIMESTAMP_MASK;
    let mid = (((ts >> 14) & 0xFFFE) | 0x01) as u16;
    let low = (((ts << 1) & 0xFFFE) | 0x01) as u16;
    [
        guard | ((ts >> 29) & 0x0E) as u8 | 0x01,
        (mid >> 8) as u8,
        mid as u8,
        (low >> 8) as u8,
        low as u8,
    ]
}

/// Decodes a 5-byte PTS/DTS field, ignoring guard and marker bits.
pub fn decode_timestamp(data: &[u8; TIMESTAMP_SIZE]) -> u64 {
    (((data[0] as u64) & 0x0E) << 29)
        | ((data[1] as u64) << 22)
        | (((data[2] as u64) & 0xFE) << 14)
        | ((data[3] as u64) << 7)
        | ((data[4] as u64) >> 1)
}
