use bytes::BufMut;
use std::time::Duration;

// Packet layout
pub const SYNC_BYTE: u8 = 0x47;
pub const TS_PACKET_SIZE: usize = 188;
pub const TS_HEADER_SIZE: usize = 4;
pub const TS_PAYLOAD_SIZE: usize = TS_PACKET_SIZE - TS_HEADER_SIZE;
/// Adaptation field length byte, flags byte and a PCR.
pub const PCR_ADAPTATION_SIZE: usize = 8;

// PIDs
pub const PID_PAT: u16 = 0x0000;
pub const PID_PMT: u16 = 0x1000;
pub const PID_VIDEO: u16 = 0x0100;
pub const PID_AUDIO: u16 = 0x0101;
pub const PID_NULL: u16 = 0x1FFF;
/// PIDs 0x0001..=0x001F are reserved for other tables (CAT, NIT, SDT...).
pub const PID_RESERVED_MAX: u16 = 0x001F;

// Stream IDs
pub const STREAM_ID_VIDEO: u8 = 0xE0;
pub const STREAM_ID_AUDIO: u8 = 0xC0;

// Table IDs
pub const TABLE_ID_PAT: u8 = 0x00;
pub const TABLE_ID_PMT: u8 = 0x02;
pub const PROGRAM_NUMBER: u16 = 1;
pub const TRANSPORT_STREAM_ID: u16 = 1;

// Elementary Stream Types
pub const STREAM_TYPE_H264: u8 = 0x1B;
pub const STREAM_TYPE_H265: u8 = 0x24;
pub const STREAM_TYPE_AAC: u8 = 0x0F;

// Clocks
pub const PTS_HZ: u64 = 90_000;
pub const PCR_HZ: u64 = 27_000_000;
/// PTS/DTS and PCR base are 33-bit counters.
pub const TIMESTAMP_MASK: u64 = (1 << 33) - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PATEntry {
    pub program_number: u16,
    /// Network PID when `program_number` is 0, PMT PID otherwise
    pub pid: u16,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PAT {
    pub transport_stream_id: u16,
    pub entries: Vec<PATEntry>,
}

impl PAT {
    pub fn new(transport_stream_id: u16) -> Self {
        Self {
            transport_stream_id,
            entries: Vec::new(),
        }
    }

    /// Length of the program loop.
    pub fn len(&self) -> usize {
        self.entries.len() * 4
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// PMT PIDs and their program numbers, skipping the network entry.
    pub fn programs(&self) -> impl Iterator<Item = &PATEntry> {
        self.entries.iter().filter(|e| e.program_number != 0)
    }

    /// Writes the program loop.
    pub fn write_to(&self, buf: &mut impl BufMut) {
        for entry in &self.entries {
            buf.put_u16(entry.program_number);
            buf.put_u16(entry.pid & 0x1FFF | 7 << 13);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementaryStreamInfo {
    pub stream_type: u8,
    pub elementary_pid: u16,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PMT {
    pub program_number: u16,
    pub pcr_pid: u16,
    pub elementary_stream_infos: Vec<ElementaryStreamInfo>,
}

impl PMT {
    pub fn new(program_number: u16, pcr_pid: u16) -> Self {
        Self {
            program_number,
            pcr_pid,
            elementary_stream_infos: Vec::new(),
        }
    }

    pub fn with_stream(mut self, stream_type: u8, elementary_pid: u16) -> Self {
        self.elementary_stream_infos.push(ElementaryStreamInfo {
            stream_type,
            elementary_pid,
        });
        self
    }

    /// Length of everything after the section header's table extension
    /// fields: PCR PID, program info length and the stream loop.
    pub fn len(&self) -> usize {
        4 + self.elementary_stream_infos.len() * 5
    }

    pub fn is_empty(&self) -> bool {
        self.elementary_stream_infos.is_empty()
    }

    pub fn stream_type(&self, pid: u16) -> Option<u8> {
        self.elementary_stream_infos
            .iter()
            .find(|info| info.elementary_pid == pid)
            .map(|info| info.stream_type)
    }

    pub fn write_to(&self, buf: &mut impl BufMut) {
        buf.put_u16(self.pcr_pid & 0x1FFF | 7 << 13);
        // no program descriptors
        buf.put_u16(0xF000);

        for info in &self.elementary_stream_infos {
            buf.put_u8(info.stream_type);
            buf.put_u16(info.elementary_pid & 0x1FFF | 7 << 13);
            buf.put_u16(0xF000);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdaptationField {
    pub length: usize,
    pub discontinuity: bool,
    pub random_access: bool,
    pub es_priority: bool,
    pub pcr_flag: bool,
    pub opcr_flag: bool,
    pub splicing_point_flag: bool,
    pub private_data_flag: bool,
    pub extension_flag: bool,
    /// In 27 MHz units
    pub pcr: Option<u64>,
    /// In 27 MHz units
    pub opcr: Option<u64>,
    pub splice_countdown: Option<i8>,
    pub private_data: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TSHeader {
    pub sync_byte: u8, // Always 0x47
    pub transport_error: bool,
    pub payload_unit_start: bool,
    pub transport_priority: bool,
    pub pid: u16,
    pub scrambling_control: u8,
    pub adaptation_field_exists: bool,
    pub contains_payload: bool,
    pub continuity_counter: u8,
}

impl Default for TSHeader {
    fn default() -> Self {
        Self {
            sync_byte: SYNC_BYTE,
            transport_error: false,
            payload_unit_start: false,
            transport_priority: false,
            pid: 0,
            scrambling_control: 0,
            adaptation_field_exists: false,
            contains_payload: true,
            continuity_counter: 0,
        }
    }
}

impl TSHeader {
    pub fn new(pid: u16, continuity_counter: u8) -> Self {
        Self {
            pid,
            continuity_counter,
            ..Default::default()
        }
    }

    pub fn with_payload_start(mut self, start: bool) -> Self {
        self.payload_unit_start = start;
        self
    }

    pub fn with_adaptation_field(mut self, exists: bool) -> Self {
        self.adaptation_field_exists = exists;
        self
    }

    pub fn encode(&self) -> [u8; TS_HEADER_SIZE] {
        let mut b1 = 0u8;
        if self.transport_error {
            b1 |= 0x80;
        }
        if self.payload_unit_start {
            b1 |= 0x40;
        }
        if self.transport_priority {
            b1 |= 0x20;
        }
        b1 |= ((self.pid >> 8) & 0x1F) as u8;

        let mut b3 = self.scrambling_control << 6;
        if self.adaptation_field_exists {
            b3 |= 0x20;
        }
        if self.contains_payload {
            b3 |= 0x10;
        }
        b3 |= self.continuity_counter & 0x0F;

        [self.sync_byte, b1, (self.pid & 0xFF) as u8, b3]
    }

    pub fn write_to(&self, buf: &mut impl BufMut) {
        buf.put_slice(&self.encode());
    }
}

/// Encodes a PCR derived from a 90 kHz timestamp.
///
/// 33-bit base, six reserved bits set to one, 9-bit extension of zero.
pub fn encode_pcr(pts: u64) -> [u8; 6] {
    let base = pts & TIMESTAMP_MASK;
    [
        (base >> 25) as u8,
        (base >> 17) as u8,
        (base >> 9) as u8,
        (base >> 1) as u8,
        (((base & 0x01) << 7) as u8) | 0x7E,
        0x00,
    ]
}

/// Decodes a 6-byte PCR field into 27 MHz units (`base * 300 + ext`).
pub fn decode_pcr(data: &[u8; 6]) -> u64 {
    let base = ((data[0] as u64) << 25)
        | ((data[1] as u64) << 17)
        | ((data[2] as u64) << 9)
        | ((data[3] as u64) << 1)
        | ((data[4] as u64) >> 7);
    let ext = (((data[4] & 0x01) as u64) << 8) | data[5] as u64;
    base * 300 + ext
}

/// Converts a duration to 90 kHz ticks, saturating at `u64::MAX`.
pub fn time_to_pts(time: Duration) -> u64 {
    u64::try_from(time.as_nanos() * u128::from(PTS_HZ) / 1_000_000_000).unwrap_or(u64::MAX)
}

/// Converts microseconds to 90 kHz ticks.
pub fn micros_to_pts(micros: u64) -> u64 {
    u64::try_from(u128::from(micros) * 90 / 1000).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_ts_header_encode() {
        let header = TSHeader::new(PID_VIDEO, 0x1A)
            .with_payload_start(true)
            .with_adaptation_field(true);
        // continuity counter is masked to 4 bits
        assert_eq!(header.encode(), [0x47, 0x41, 0x00, 0x3A]);

        let mut buf = BytesMut::new();
        TSHeader::new(PID_PAT, 3).write_to(&mut buf);
        assert_eq!(&buf[..], &[0x47, 0x00, 0x00, 0x13]);
    }

    #[test]
    fn test_pcr_encoding() {
        let pcr = encode_pcr(0);
        assert_eq!(pcr, [0x00, 0x00, 0x00, 0x00, 0x7E, 0x00]);

        let pcr = encode_pcr(90_000);
        assert_eq!(decode_pcr(&pcr), 90_000 * 300);

        let pcr = encode_pcr(TIMESTAMP_MASK);
        assert_eq!(pcr, [0xFF, 0xFF, 0xFF, 0xFF, 0xFE, 0x00]);
        assert_eq!(decode_pcr(&pcr), TIMESTAMP_MASK * 300);

        // wraps at 33 bits
        assert_eq!(decode_pcr(&encode_pcr(TIMESTAMP_MASK + 2)), 300);
    }

    #[test]
    fn test_time_conversions() {
        assert_eq!(time_to_pts(Duration::from_secs(2)), 180_000);
        assert_eq!(time_to_pts(Duration::from_micros(500)), 45);
        assert_eq!(time_to_pts(Duration::MAX), u64::MAX);
        assert_eq!(micros_to_pts(1_000_000), 90_000);
        assert_eq!(micros_to_pts(33_333), 2_999);
        assert_eq!(micros_to_pts(u64::MAX), 1_660_206_966_633_859_645);
    }

    #[test]
    fn test_pmt_body() {
        let pmt = PMT::new(PROGRAM_NUMBER, PID_VIDEO)
            .with_stream(STREAM_TYPE_H264, PID_VIDEO)
            .with_stream(STREAM_TYPE_AAC, PID_AUDIO);
        let mut buf = BytesMut::new();
        pmt.write_to(&mut buf);
        assert_eq!(buf.len(), pmt.len());
        assert_eq!(
            &buf[..],
            &[
                0xE1, 0x00, 0xF0, 0x00, // PCR PID, program info length
                0x1B, 0xE1, 0x00, 0xF0, 0x00, // video
                0x0F, 0xE1, 0x01, 0xF0, 0x00, // audio
            ]
        );
        assert_eq!(pmt.stream_type(PID_AUDIO), Some(STREAM_TYPE_AAC));
        assert_eq!(pmt.stream_type(0x200), None);
    }
}
