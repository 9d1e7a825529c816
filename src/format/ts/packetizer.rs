//! Splits one frame into 188-byte TS packets.
//!
//! The first packet of a frame always has an adaptation field carrying the
//! random access flag and, for picture and audio frames, a PCR. Following
//! packets only get an adaptation field when the remaining data is too short
//! to fill them, in which case it holds the stuffing.

use bytes::BytesMut;

use super::continuity::ContinuityCounter;
use super::packet::{PacketBuffer, PacketListener};
use super::pes::PESHeader;
use super::psi::Profile;
use super::types::{encode_pcr, TSHeader, TS_PAYLOAD_SIZE};
use crate::av::{Frame, StreamKind};
use crate::codec::{nal_units, CodecProfile, VideoCodec};
use crate::{Result, TsError};

const AF_RANDOM_ACCESS: u8 = 0x40;
const AF_PCR: u8 = 0x10;

/// PES packetizer with one continuity counter per elementary stream.
#[derive(Debug, Clone)]
pub struct Packetizer {
    video: VideoCodec,
    video_cc: ContinuityCounter,
    audio_cc: ContinuityCounter,
}

impl Packetizer {
    pub fn new(video: VideoCodec) -> Self {
        Self {
            video,
            video_cc: ContinuityCounter::new(),
            audio_cc: ContinuityCounter::new(),
        }
    }

    pub fn reset(&mut self) {
        self.video_cc.reset();
        self.audio_cc.reset();
    }

    /// Writes `frame` as one PES packet spread over as many TS packets as
    /// needed, then calls `on_flush`. Returns the number of packets written.
    ///
    /// `first_pes` marks the first frame since the muxer started and forces
    /// the random access flag.
    pub fn packetize(
        &mut self,
        profile: Profile,
        first_pes: bool,
        frame: &Frame,
        buf: &mut PacketBuffer,
        sink: &mut dyn PacketListener,
    ) -> Result<usize> {
        let carried = match frame.kind {
            StreamKind::Video => profile.has_video(),
            StreamKind::Audio => profile.has_audio(),
        };
        if !carried {
            return Err(TsError::InvalidData(format!(
                "{:?} frame in {:?} profile",
                frame.kind, profile
            )));
        }

        let lead = self.pes_lead(frame);
        let data = &frame.data[..];
        let total = lead.len() + data.len();
        let pid = frame.kind.pid();
        let random_access = first_pes || frame.is_keyframe();
        let pcr = frame.is_frame().then(|| encode_pcr(frame.pts));
        let counter = match frame.kind {
            StreamKind::Video => &mut self.video_cc,
            StreamKind::Audio => &mut self.audio_cc,
        };

        let mut written = 0;
        let mut packets = 0;
        loop {
            let first = packets == 0;
            let remaining = total - written;

            // adaptation field contents before stuffing
            let mut body = [0u8; 7];
            let mut body_len = 0;
            let has_af = if first {
                let mut flags = 0;
                if random_access {
                    flags |= AF_RANDOM_ACCESS;
                }
                body_len = 1;
                if let Some(pcr) = &pcr {
                    flags |= AF_PCR;
                    body[1..7].copy_from_slice(pcr);
                    body_len = 7;
                }
                body[0] = flags;
                true
            } else {
                remaining < TS_PAYLOAD_SIZE
            };

            let mut stuffing = 0;
            if has_af {
                let capacity = TS_PAYLOAD_SIZE - 1 - body_len;
                if remaining < capacity {
                    stuffing = capacity - remaining;
                    if body_len == 0 {
                        // stuffing needs the flags byte in front of it
                        body_len = 1;
                        stuffing -= 1;
                    }
                }
            }

            buf.reset();
            let header = TSHeader::new(pid, counter.next())
                .with_payload_start(first)
                .with_adaptation_field(has_af);
            buf.put_slice(&header.encode())?;
            if has_af {
                buf.put_u8((body_len + stuffing) as u8)?;
                buf.put_slice(&body[..body_len])?;
                buf.put_bytes(0xFF, stuffing)?;
            }

            let take = remaining.min(buf.remaining());
            let end = written + take;
            let mut pos = written;
            if pos < lead.len() {
                let upto = end.min(lead.len());
                buf.put_slice(&lead[pos..upto])?;
                pos = upto;
            }
            if pos < end {
                buf.put_slice(&data[pos - lead.len()..end - lead.len()])?;
            }

            sink.on_packet(buf.as_bytes());
            written = end;
            packets += 1;
            if written >= total {
                break;
            }
        }
        sink.on_flush();

        log::trace!(
            "{:?} frame pts={} len={} -> {} packets",
            frame.kind,
            frame.pts,
            data.len(),
            packets
        );
        Ok(packets)
    }

    /// PES header followed by an access unit delimiter when the frame
    /// starts an access unit without one.
    fn pes_lead(&self, frame: &Frame) -> BytesMut {
        let mut header = PESHeader::new(frame.kind.stream_id()).with_pts(frame.pts);
        if frame.is_frame() {
            header = header.with_dts(frame.decode_ts());
        }

        let delimiter = self.video.access_unit_delimiter();
        let needs_delimiter = frame.is_video()
            && frame.access_unit_start
            && !self.has_delimiter(&frame.data);

        if frame.kind == StreamKind::Audio {
            header = header.with_payload_len(frame.data.len());
        }

        let mut lead = BytesMut::with_capacity(header.encoded_len() + delimiter.len());
        header.write_to(&mut lead);
        if needs_delimiter {
            lead.extend_from_slice(delimiter);
        }
        lead
    }

    fn has_delimiter(&self, data: &[u8]) -> bool {
        nal_units(data).iter().any(|unit| {
            unit.start_code_len > 0
                && unit
                    .header_byte()
                    .map_or(false, |header| self.video.is_access_unit_delimiter(header))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::av::FrameType;
    use crate::format::ts::packet::PacketCollector;
    use crate::format::ts::types::TS_PACKET_SIZE;
    use pretty_assertions::assert_eq;

    const H264_AUD: [u8; 6] = [0x00, 0x00, 0x00, 0x01, 0x09, 0xF0];

    /// Payload bytes of a packet, past the adaptation field.
    fn payload(packet: &[u8]) -> &[u8] {
        if packet[3] & 0x20 != 0 {
            &packet[5 + packet[4] as usize..]
        } else {
            &packet[4..]
        }
    }

    fn run(profile: Profile, first_pes: bool, frame: &Frame) -> PacketCollector {
        let mut packetizer = Packetizer::new(VideoCodec::H264);
        let mut buf = PacketBuffer::new();
        let mut out = PacketCollector::new();
        packetizer
            .packetize(profile, first_pes, frame, &mut buf, &mut out)
            .unwrap();
        out
    }

    #[test]
    fn test_small_parameter_set_frame() {
        let frame = Frame::video(vec![0x00, 0x00, 0x00, 0x01, 0x67, 0x42], 3000)
            .with_frame_type(FrameType::NonSlice);
        let out = run(Profile::Video, true, &frame);
        assert_eq!(out.packet_count(), 1);
        assert_eq!(out.flushes(), 1);

        let packet = out.as_bytes();
        assert_eq!(&packet[..4], &[0x47, 0x41, 0x00, 0x30]);
        // PES header 14 + AUD 6 + data 6 leaves 182 - 26 bytes of stuffing
        assert_eq!(packet[4] as usize, 1 + 156);
        assert_eq!(packet[5], AF_RANDOM_ACCESS);
        assert!(packet[6..6 + 156].iter().all(|&b| b == 0xFF));

        let payload = payload(packet);
        assert_eq!(payload.len(), 26);
        assert_eq!(&payload[..9], &[0x00, 0x00, 0x01, 0xE0, 0x00, 0x00, 0x80, 0x80, 0x05]);
        assert_eq!(&payload[14..20], &H264_AUD);
        assert_eq!(&payload[20..], &frame.data[..]);
    }

    #[test]
    fn test_slice_carries_pcr_and_dts() {
        let frame = Frame::video(vec![0x00, 0x00, 0x00, 0x01, 0x41, 0x9A], 90_000)
            .with_frame_type(FrameType::P);
        let out = run(Profile::Video, false, &frame);
        let packet = out.as_bytes();
        assert_eq!(packet[5], AF_PCR);
        assert_eq!(&packet[6..12], &encode_pcr(90_000));

        let payload = payload(packet);
        assert_eq!(&payload[6..9], &[0x80, 0xC0, 0x0A]);
        assert_eq!(payload[9] & 0xF0, 0x30);
        assert_eq!(payload[14] & 0xF0, 0x10);
    }

    #[test]
    fn test_keyframe_sets_random_access() {
        let frame = Frame::video(vec![0x00, 0x00, 0x00, 0x01, 0x65, 0x88], 0)
            .with_frame_type(FrameType::I);
        let out = run(Profile::Mixed, false, &frame);
        assert_eq!(out.as_bytes()[5], AF_RANDOM_ACCESS | AF_PCR);
    }

    #[test]
    fn test_existing_delimiter_is_not_duplicated() {
        let mut data = H264_AUD.to_vec();
        data.extend_from_slice(&[0x00, 0x00, 0x00, 0x01, 0x41, 0x9A]);
        let frame = Frame::video(data.clone(), 0);
        let out = run(Profile::Video, false, &frame);
        assert_eq!(&payload(out.as_bytes())[19..], &data[..]);

        // any primary_pic_type counts as a delimiter
        let mut data = vec![0x00, 0x00, 0x00, 0x01, 0x09, 0x10];
        data.extend_from_slice(&[0x00, 0x00, 0x00, 0x01, 0x41, 0x9A]);
        let out = run(Profile::Video, false, &Frame::video(data.clone(), 0));
        assert_eq!(&payload(out.as_bytes())[19..], &data[..]);

        // later units of an access unit get no delimiter either
        let frame = Frame::video(vec![0x00, 0x00, 0x01, 0x41, 0x9A], 0).with_access_unit_start(false);
        let out = run(Profile::Video, false, &frame);
        assert_eq!(payload(out.as_bytes()).len(), 19 + 5);
    }

    #[test]
    fn test_hevc_delimiter() {
        let mut packetizer = Packetizer::new(VideoCodec::H265);
        let mut buf = PacketBuffer::new();
        let mut out = PacketCollector::new();
        let frame = Frame::video(vec![0x00, 0x00, 0x00, 0x01, 0x02, 0x01], 0);
        packetizer
            .packetize(Profile::Video, false, &frame, &mut buf, &mut out)
            .unwrap();
        let payload = payload(out.as_bytes());
        assert_eq!(&payload[19..26], &[0x00, 0x00, 0x00, 0x01, 0x46, 0x01, 0x50]);
    }

    #[test]
    fn test_audio_length_and_no_delimiter() {
        let frame = Frame::audio(vec![0xAA; 50], 1800);
        let out = run(Profile::Audio, false, &frame);
        let payload = payload(out.as_bytes());
        assert_eq!(&payload[..6], &[0x00, 0x00, 0x01, 0xC0, 0x00, 3 + 10 + 50]);
        assert_eq!(&payload[19..], &[0xAA; 50][..]);
        assert_eq!(out.as_bytes()[1] & 0x1F, 0x01);
        assert_eq!(out.as_bytes()[2], 0x01);
    }

    #[test]
    fn test_continuation_with_183_remaining() {
        // 19 header bytes + 340 = 176 in the first packet, 183 left
        let frame = Frame::audio(vec![0x11; 340], 0);
        let out = run(Profile::Audio, false, &frame);
        let packets: Vec<&[u8]> = out.packets().collect();
        assert_eq!(packets.len(), 2);
        assert_eq!(packets[1][3] & 0x30, 0x30);
        assert_eq!(packets[1][4], 0);
        assert_eq!(payload(packets[1]).len(), 183);
    }

    #[test]
    fn test_continuation_with_182_remaining() {
        let frame = Frame::audio(vec![0x11; 339], 0);
        let out = run(Profile::Audio, false, &frame);
        let packets: Vec<&[u8]> = out.packets().collect();
        assert_eq!(packets.len(), 2);
        assert_eq!(&packets[1][4..6], &[0x01, 0x00]);
        assert_eq!(payload(packets[1]).len(), 182);
    }

    #[test]
    fn test_continuation_without_adaptation_field() {
        let frame = Frame::audio(vec![0x22; 176 - 19 + 184 + 10], 0);
        let out = run(Profile::Audio, false, &frame);
        let packets: Vec<&[u8]> = out.packets().collect();
        assert_eq!(packets.len(), 3);
        assert_eq!(packets[1][3] & 0x30, 0x10);
        assert_eq!(packets[1][1] & 0x40, 0);
        assert_eq!(packets[2][4] as usize, 184 - 10 - 1);
    }

    #[test]
    fn test_packet_counts_and_payload_integrity() {
        let mut packetizer = Packetizer::new(VideoCodec::H264);
        let mut buf = PacketBuffer::new();
        let mut expected_cc = 0u8;

        for len in (0..=10 * 184).step_by(7) {
            let data: Vec<u8> = (0..len).map(|i| (i % 200) as u8 + 1).collect();
            let frame = Frame::video(data.clone(), 0)
                .with_frame_type(FrameType::P)
                .with_access_unit_start(false);
            let mut out = PacketCollector::new();
            let count = packetizer
                .packetize(Profile::Video, false, &frame, &mut buf, &mut out)
                .unwrap();

            // 19 byte PES header, 176 bytes fit next to the PCR
            let total = 19 + len;
            let expected = if total <= 176 { 1 } else { 1 + (total - 176 + 183) / 184 };
            assert_eq!(count, expected, "frame length {}", len);
            assert_eq!(out.len(), count * TS_PACKET_SIZE);

            let mut joined = Vec::new();
            for packet in out.packets() {
                assert_eq!(packet[0], 0x47);
                assert_eq!(packet[3] & 0x0F, expected_cc);
                expected_cc = (expected_cc + 1) & 0x0F;
                joined.extend_from_slice(payload(packet));
            }
            assert_eq!(&joined[19..], &data[..], "frame length {}", len);
        }
    }

    #[test]
    fn test_empty_frame_still_emits_packet() {
        let frame = Frame::audio(Vec::new(), 0);
        let out = run(Profile::Mixed, false, &frame);
        assert_eq!(out.packet_count(), 1);
        assert_eq!(payload(out.as_bytes()).len(), 19);
    }

    #[test]
    fn test_rejects_stream_outside_profile() {
        let mut packetizer = Packetizer::new(VideoCodec::H264);
        let mut buf = PacketBuffer::new();
        let mut out = PacketCollector::new();
        let frame = Frame::video(vec![0x65], 0);
        assert!(packetizer
            .packetize(Profile::Audio, false, &frame, &mut buf, &mut out)
            .is_err());
        assert!(out.is_empty());
    }
}
