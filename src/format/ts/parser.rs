use super::types::*;
use crate::utils::Crc32Mpeg2;
use crate::{Result, TsError};

/// Section bytes before `section_length` ends: table id and the length field.
const SECTION_HEADER_SIZE: usize = 3;
/// Bytes from `table_id` through `last_section_number`.
const SECTION_SYNTAX_SIZE: usize = 8;
const CRC_SIZE: usize = 4;

/// Stateless parser for the pieces of a TS packet: header, adaptation field
/// and PSI sections.
#[derive(Debug, Default, Clone, Copy)]
pub struct TSPacketParser;

impl TSPacketParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse_header(&self, data: &[u8]) -> Result<TSHeader> {
        if data.len() < TS_HEADER_SIZE {
            return Err(TsError::Truncated {
                what: "TS header",
                needed: TS_HEADER_SIZE,
                available: data.len(),
            });
        }

        if data[0] != SYNC_BYTE {
            return Err(TsError::SyncByte(data[0]));
        }

        Ok(TSHeader {
            sync_byte: data[0],
            transport_error: (data[1] & 0x80) != 0,
            payload_unit_start: (data[1] & 0x40) != 0,
            transport_priority: (data[1] & 0x20) != 0,
            pid: (((data[1] & 0x1F) as u16) << 8) | data[2] as u16,
            scrambling_control: (data[3] >> 6) & 0x03,
            adaptation_field_exists: (data[3] & 0x20) != 0,
            contains_payload: (data[3] & 0x10) != 0,
            continuity_counter: data[3] & 0x0F,
        })
    }

    /// Parses the adaptation field of a whole packet. A zero-length field
    /// (a single stuffing byte) yields `None`.
    pub fn parse_adaptation_field(&self, packet: &[u8]) -> Result<Option<AdaptationField>> {
        let offset = TS_HEADER_SIZE;
        if packet.len() <= offset || (packet[3] & 0x20) == 0 {
            return Ok(None);
        }

        let length = packet[offset] as usize;
        if length == 0 {
            return Ok(None);
        }
        if packet.len() < offset + 1 + length {
            return Err(TsError::Truncated {
                what: "adaptation field",
                needed: offset + 1 + length,
                available: packet.len(),
            });
        }

        let field_data = &packet[offset + 1..offset + 1 + length];
        let flags = field_data[0];
        let mut field = AdaptationField {
            length,
            discontinuity: (flags & 0x80) != 0,
            random_access: (flags & 0x40) != 0,
            es_priority: (flags & 0x20) != 0,
            pcr_flag: (flags & 0x10) != 0,
            opcr_flag: (flags & 0x08) != 0,
            splicing_point_flag: (flags & 0x04) != 0,
            private_data_flag: (flags & 0x02) != 0,
            extension_flag: (flags & 0x01) != 0,
            ..Default::default()
        };

        let mut pos = 1;
        if field.pcr_flag {
            field.pcr = Some(decode_pcr(clock_field(field_data, pos, "PCR")?));
            pos += 6;
        }
        if field.opcr_flag {
            field.opcr = Some(decode_pcr(clock_field(field_data, pos, "OPCR")?));
            pos += 6;
        }
        if field.splicing_point_flag {
            let countdown = *field_data.get(pos).ok_or(TsError::Truncated {
                what: "splice countdown",
                needed: pos + 1,
                available: field_data.len(),
            })?;
            field.splice_countdown = Some(countdown as i8);
            pos += 1;
        }
        if field.private_data_flag {
            let private_len = *field_data.get(pos).ok_or(TsError::Truncated {
                what: "private data length",
                needed: pos + 1,
                available: field_data.len(),
            })? as usize;
            pos += 1;
            let private = field_data.get(pos..pos + private_len).ok_or(TsError::Truncated {
                what: "private data",
                needed: pos + private_len,
                available: field_data.len(),
            })?;
            field.private_data = Some(private.to_vec());
        }

        Ok(Some(field))
    }

    /// Offset of the payload inside `packet`, or `None` when the packet
    /// carries no payload bytes.
    pub fn payload_offset(&self, packet: &[u8], header: &TSHeader) -> Option<usize> {
        if !header.contains_payload {
            return None;
        }
        let offset = if header.adaptation_field_exists {
            TS_HEADER_SIZE + 1 + *packet.get(TS_HEADER_SIZE)? as usize
        } else {
            TS_HEADER_SIZE
        };
        (offset < packet.len()).then_some(offset)
    }

    /// Locates the PSI section that starts in a PUSI payload, honouring
    /// `pointer_field`, and checks its CRC.
    pub fn read_section<'a>(&self, payload: &'a [u8]) -> Result<&'a [u8]> {
        let pointer = *payload.first().ok_or(TsError::Truncated {
            what: "pointer field",
            needed: 1,
            available: 0,
        })? as usize;
        let start = 1 + pointer;
        let header = payload
            .get(start..start + SECTION_HEADER_SIZE)
            .ok_or(TsError::Truncated {
                what: "section header",
                needed: start + SECTION_HEADER_SIZE,
                available: payload.len(),
            })?;

        let section_length = (((header[1] & 0x0F) as usize) << 8) | header[2] as usize;
        let end = start + SECTION_HEADER_SIZE + section_length;
        let section = payload.get(start..end).ok_or(TsError::Truncated {
            what: "PSI section",
            needed: end,
            available: payload.len(),
        })?;
        if section.len() < SECTION_SYNTAX_SIZE + CRC_SIZE {
            return Err(TsError::InvalidData(format!(
                "section_length {} too short",
                section_length
            )));
        }

        if !Crc32Mpeg2::verify(section) {
            let (body, crc) = section.split_at(section.len() - CRC_SIZE);
            return Err(TsError::CrcMismatch {
                table_id: section[0],
                expected: u32::from_be_bytes([crc[0], crc[1], crc[2], crc[3]]),
                actual: Crc32Mpeg2::calculate(body),
            });
        }
        Ok(section)
    }

    /// Parses a complete PAT section as returned by [`read_section`](Self::read_section).
    pub fn parse_pat(&self, section: &[u8]) -> Result<PAT> {
        let body = section_body(section, TABLE_ID_PAT)?;
        let mut pat = PAT::new(u16::from_be_bytes([section[3], section[4]]));

        for entry in body.chunks_exact(4) {
            pat.entries.push(PATEntry {
                program_number: u16::from_be_bytes([entry[0], entry[1]]),
                pid: u16::from_be_bytes([entry[2], entry[3]]) & 0x1FFF,
            });
        }
        Ok(pat)
    }

    /// Parses a complete PMT section. Descriptors are skipped.
    pub fn parse_pmt(&self, section: &[u8]) -> Result<PMT> {
        let body = section_body(section, TABLE_ID_PMT)?;
        if body.len() < 4 {
            return Err(TsError::Truncated {
                what: "PMT",
                needed: 4,
                available: body.len(),
            });
        }

        let program_number = u16::from_be_bytes([section[3], section[4]]);
        let pcr_pid = u16::from_be_bytes([body[0], body[1]]) & 0x1FFF;
        let mut pmt = PMT::new(program_number, pcr_pid);

        let program_info_length = (u16::from_be_bytes([body[2], body[3]]) & 0x0FFF) as usize;
        let mut pos = 4 + program_info_length;
        if pos > body.len() {
            return Err(TsError::InvalidData("program info overruns PMT".into()));
        }

        while pos + 5 <= body.len() {
            let stream_type = body[pos];
            let elementary_pid = u16::from_be_bytes([body[pos + 1], body[pos + 2]]) & 0x1FFF;
            let es_info_length =
                (u16::from_be_bytes([body[pos + 3], body[pos + 4]]) & 0x0FFF) as usize;
            pos += 5 + es_info_length;
            if pos > body.len() {
                return Err(TsError::InvalidData("ES info overruns PMT".into()));
            }
            pmt = pmt.with_stream(stream_type, elementary_pid);
        }

        Ok(pmt)
    }
}

/// Bytes between the section syntax header and the CRC.
fn section_body(section: &[u8], table_id: u8) -> Result<&[u8]> {
    if section.len() < SECTION_SYNTAX_SIZE + CRC_SIZE {
        return Err(TsError::Truncated {
            what: "PSI section",
            needed: SECTION_SYNTAX_SIZE + CRC_SIZE,
            available: section.len(),
        });
    }
    if section[0] != table_id {
        return Err(TsError::InvalidData(format!(
            "expected table 0x{:02x}, found 0x{:02x}",
            table_id, section[0]
        )));
    }
    Ok(&section[SECTION_SYNTAX_SIZE..section.len() - CRC_SIZE])
}

fn clock_field<'a>(data: &'a [u8], pos: usize, what: &'static str) -> Result<&'a [u8; 6]> {
    data.get(pos..pos + 6)
        .and_then(|f| f.try_into().ok())
        .ok_or(TsError::Truncated {
            what,
            needed: pos + 6,
            available: data.len(),
        })
}
