//! PAT and PMT generation.

use bytes::{BufMut, BytesMut};

use super::continuity::ContinuityCounter;
use super::packet::{PacketBuffer, PacketListener};
use super::types::{
    PATEntry, TSHeader, PAT, PID_AUDIO, PID_PAT, PID_PMT, PID_VIDEO, PMT, PROGRAM_NUMBER,
    STREAM_TYPE_AAC, TABLE_ID_PAT, TABLE_ID_PMT, TRANSPORT_STREAM_ID,
};
use crate::codec::{CodecProfile, VideoCodec};
use crate::utils::Crc32Mpeg2;
use crate::Result;

/// Which elementary streams the single program carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Video,
    Audio,
    Mixed,
}

impl Profile {
    pub fn has_video(&self) -> bool {
        matches!(self, Profile::Video | Profile::Mixed)
    }

    pub fn has_audio(&self) -> bool {
        matches!(self, Profile::Audio | Profile::Mixed)
    }

    /// Video carries the clock whenever it is present.
    pub fn pcr_pid(&self) -> u16 {
        if self.has_video() {
            PID_VIDEO
        } else {
            PID_AUDIO
        }
    }
}

/// Emits PAT and PMT packets with their own continuity counters.
#[derive(Debug, Clone)]
pub struct PsiWriter {
    video: VideoCodec,
    pat_cc: ContinuityCounter,
    pmt_cc: ContinuityCounter,
}

impl PsiWriter {
    pub fn new(video: VideoCodec) -> Self {
        Self {
            video,
            pat_cc: ContinuityCounter::new(),
            pmt_cc: ContinuityCounter::new(),
        }
    }

    pub fn reset(&mut self) {
        self.pat_cc.reset();
        self.pmt_cc.reset();
    }

    pub fn pat(&self) -> PAT {
        let mut pat = PAT::new(TRANSPORT_STREAM_ID);
        pat.entries.push(PATEntry {
            program_number: PROGRAM_NUMBER,
            pid: PID_PMT,
        });
        pat
    }

    pub fn pmt(&self, profile: Profile) -> PMT {
        let mut pmt = PMT::new(PROGRAM_NUMBER, profile.pcr_pid());
        if profile.has_video() {
            pmt = pmt.with_stream(self.video.stream_type(), PID_VIDEO);
        }
        if profile.has_audio() {
            pmt = pmt.with_stream(STREAM_TYPE_AAC, PID_AUDIO);
        }
        pmt
    }

    /// Complete PAT section, CRC included.
    pub fn pat_section(&self) -> BytesMut {
        let pat = self.pat();
        build_section(TABLE_ID_PAT, pat.transport_stream_id, pat.len(), |buf| {
            pat.write_to(buf)
        })
    }

    /// Complete PMT section, CRC included.
    pub fn pmt_section(&self, profile: Profile) -> BytesMut {
        let pmt = self.pmt(profile);
        build_section(TABLE_ID_PMT, pmt.program_number, pmt.len(), |buf| {
            pmt.write_to(buf)
        })
    }

    pub fn write_pat(&mut self, buf: &mut PacketBuffer, sink: &mut dyn PacketListener) -> Result<()> {
        let section = self.pat_section();
        let cc = self.pat_cc.next();
        write_section_packet(PID_PAT, cc, &section, buf, sink)?;
        log::debug!("wrote PAT, cc={}", cc);
        Ok(())
    }

    pub fn write_pmt(
        &mut self,
        profile: Profile,
        buf: &mut PacketBuffer,
        sink: &mut dyn PacketListener,
    ) -> Result<()> {
        let section = self.pmt_section(profile);
        let cc = self.pmt_cc.next();
        write_section_packet(PID_PMT, cc, &section, buf, sink)?;
        log::debug!("wrote PMT for {:?}, cc={}", profile, cc);
        Ok(())
    }
}

/// Wraps a table body in the long section syntax and appends the CRC.
fn build_section<F>(table_id: u8, table_id_extension: u16, body_len: usize, body: F) -> BytesMut
where
    F: FnOnce(&mut BytesMut),
{
    // table_id_extension .. last_section_number, body, CRC
    let section_length = 5 + body_len + 4;
    let mut section = BytesMut::with_capacity(3 + section_length);
    section.put_u8(table_id);
    section.put_u16(0xB000 | (section_length as u16 & 0x03FF));
    section.put_u16(table_id_extension);
    section.put_u8(0xC1); // version 0, current_next_indicator
    section.put_u8(0x00); // section_number
    section.put_u8(0x00); // last_section_number
    body(&mut section);
    let crc = Crc32Mpeg2::calculate(&section);
    section.put_u32(crc);
    section
}

fn write_section_packet(
    pid: u16,
    cc: u8,
    section: &[u8],
    buf: &mut PacketBuffer,
    sink: &mut dyn PacketListener,
) -> Result<()> {
    buf.reset();
    buf.put_slice(&TSHeader::new(pid, cc).with_payload_start(true).encode())?;
    buf.put_u8(0x00)?; // pointer_field
    buf.put_slice(section)?;
    sink.on_packet(buf.as_bytes());
    Ok(())
}
