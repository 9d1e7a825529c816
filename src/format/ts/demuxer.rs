use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;

use bytes::{Buf, Bytes, BytesMut};

use super::continuity::{Continuity, ContinuityState};
use super::parser::TSPacketParser;
use super::pes::PESHeader;
use super::types::*;
use crate::av::CodecType;
use crate::utils::find_subsequence;

/// PES stream id of padding packets, which carry no elementary data.
const STREAM_ID_PADDING: u8 = 0xBE;

/// One reassembled PES payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemuxedFrame {
    pub pid: u16,
    pub stream_id: u8,
    /// `stream_type` from the PMT entry of `pid`.
    pub stream_type: u8,
    pub codec: Option<CodecType>,
    /// 90 kHz presentation timestamp.
    pub pts: Option<u64>,
    pub dts: Option<u64>,
    pub data: Bytes,
}

impl DemuxedFrame {
    pub fn is_video(&self) -> bool {
        match self.codec {
            Some(codec) => codec.is_video(),
            None => self.stream_id & 0xF0 == STREAM_ID_VIDEO,
        }
    }
}

/// Receives frames as the demuxer completes them.
pub trait FrameListener {
    fn on_frame(&mut self, frame: DemuxedFrame);
}

impl<F> FrameListener for F
where
    F: FnMut(DemuxedFrame),
{
    fn on_frame(&mut self, frame: DemuxedFrame) {
        self(frame)
    }
}

impl FrameListener for Vec<DemuxedFrame> {
    fn on_frame(&mut self, frame: DemuxedFrame) {
        self.push(frame);
    }
}

impl FrameListener for VecDeque<DemuxedFrame> {
    fn on_frame(&mut self, frame: DemuxedFrame) {
        self.push_back(frame);
    }
}

/// Counters for input the demuxer had to drop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DemuxStats {
    pub packets: u64,
    pub skipped_bytes: u64,
    pub continuity_errors: u64,
    pub psi_errors: u64,
    pub pes_errors: u64,
    pub dropped_frames: u64,
}

/// Per-PID receive state.
#[derive(Debug, Default)]
struct StreamInfo {
    /// From the PMT; `None` until the PID is listed in one.
    stream_type: Option<u8>,
    continuity: ContinuityState,
    last_pcr: Option<u64>,
    /// Incomplete PES packet being assembled
    pes_buffer: Option<PESBuilder>,
}

/// Helper for assembling PES packets from TS packets.
#[derive(Debug)]
struct PESBuilder {
    header: PESHeader,
    /// Payload size announced by the PES header, if bounded.
    size: Option<usize>,
    data: BytesMut,
}

impl PESBuilder {
    fn new(header: PESHeader, first: &[u8]) -> Self {
        let size = header.payload_len();
        let mut builder = Self {
            header,
            size,
            data: BytesMut::with_capacity(size.unwrap_or(TS_PAYLOAD_SIZE)),
        };
        builder.push_data(first);
        builder
    }

    fn push_data(&mut self, data: &[u8]) {
        self.data.extend_from_slice(data);
    }

    fn is_complete(&self) -> bool {
        self.size.map_or(false, |size| self.data.len() >= size)
    }
}

/// MPEG Transport Stream demuxer.
///
/// Push-driven: feed arbitrary chunks of a transport stream to
/// [`read_packet`](TSDemuxer::read_packet) and complete PES payloads come
/// out through a [`FrameListener`]. It supports:
/// - resynchronisation on the `0x47` sync byte, confirmed by the next packet
///   boundary when the data is there
/// - PAT/PMT parsing with CRC verification
/// - per-PID PES reassembly, with frames that saw a continuity gap dropped
/// - PCR tracking per PID
///
/// Malformed input is logged and skipped; nothing here returns an error.
pub struct TSDemuxer {
    parser: TSPacketParser,
    pending: BytesMut,
    /// Cleared on a bad sync byte until a confirmed packet start is found.
    synced: bool,
    /// PMT PID to program number, from the latest PAT.
    pmt_pids: HashMap<u16, u16>,
    programs: BTreeMap<u16, PMT>,
    streams: BTreeMap<u16, StreamInfo>,
    stats: DemuxStats,
    listener: Option<Box<dyn FrameListener + Send>>,
}

impl fmt::Debug for TSDemuxer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TSDemuxer")
            .field("pending", &self.pending.len())
            .field("pmt_pids", &self.pmt_pids)
            .field("programs", &self.programs)
            .field("stats", &self.stats)
            .field("has_listener", &self.listener.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for TSDemuxer {
    fn default() -> Self {
        Self::new()
    }
}

impl TSDemuxer {
    pub fn new() -> Self {
        Self {
            parser: TSPacketParser::new(),
            pending: BytesMut::with_capacity(TS_PACKET_SIZE * 8),
            synced: true,
            pmt_pids: HashMap::new(),
            programs: BTreeMap::new(),
            streams: BTreeMap::new(),
            stats: DemuxStats::default(),
            listener: None,
        }
    }

    /// Installs the sink used by [`read_packet`](Self::read_packet) and
    /// [`flush`](Self::flush).
    pub fn set_frame_listener<L>(&mut self, listener: L)
    where
        L: FrameListener + Send + 'static,
    {
        self.listener = Some(Box::new(listener));
    }

    pub fn take_frame_listener(&mut self) -> Option<Box<dyn FrameListener + Send>> {
        self.listener.take()
    }

    pub fn stats(&self) -> DemuxStats {
        self.stats
    }

    /// PCR (27 MHz) of the last adaptation field seen on `pid`.
    pub fn last_pcr(&self, pid: u16) -> Option<u64> {
        self.streams.get(&pid).and_then(|s| s.last_pcr)
    }

    /// `stream_type` the PMT assigned to `pid`.
    pub fn stream_type(&self, pid: u16) -> Option<u8> {
        self.streams.get(&pid).and_then(|s| s.stream_type)
    }

    /// Program maps parsed so far, by program number.
    pub fn programs(&self) -> impl Iterator<Item = &PMT> {
        self.programs.values()
    }

    /// Drops all tables, partial packets and partial frames.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.synced = true;
        self.pmt_pids.clear();
        self.programs.clear();
        self.streams.clear();
        self.stats = DemuxStats::default();
    }

    /// Feeds a chunk of transport stream. Chunks need not be packet aligned.
    pub fn read_packet(&mut self, data: &[u8]) {
        let mut listener = self.listener.take();
        match listener.as_mut() {
            Some(sink) => self.read_packet_into(data, sink.as_mut()),
            None => self.read_packet_into(data, &mut |_: DemuxedFrame| {}),
        }
        if self.listener.is_none() {
            self.listener = listener;
        }
    }

    pub fn read_packet_into(&mut self, data: &[u8], sink: &mut dyn FrameListener) {
        self.pending.extend_from_slice(data);

        loop {
            if !self.synced || self.pending.first().map_or(false, |&b| b != SYNC_BYTE) {
                if self.synced {
                    log::warn!("sync lost on byte 0x{:02x}", self.pending[0]);
                    self.synced = false;
                }
                match sync_offset(&self.pending) {
                    Some(offset) => {
                        if offset > 0 {
                            log::warn!("resynced after skipping {} bytes", offset);
                            self.stats.skipped_bytes += offset as u64;
                            self.pending.advance(offset);
                        }
                        self.synced = true;
                    }
                    None => {
                        // earlier offsets were checked against a full packet
                        let skip = self.pending.len().saturating_sub(TS_PACKET_SIZE - 1);
                        self.stats.skipped_bytes += skip as u64;
                        self.pending.advance(skip);
                        break;
                    }
                }
            }
            if self.pending.len() < TS_PACKET_SIZE {
                break;
            }
            let packet = self.pending.split_to(TS_PACKET_SIZE).freeze();
            self.handle_packet(&packet, sink);
        }
    }

    /// Emits every frame still being assembled, in PID order. Call at end of
    /// stream.
    pub fn flush(&mut self) {
        let mut listener = self.listener.take();
        match listener.as_mut() {
            Some(sink) => self.flush_into(sink.as_mut()),
            None => self.flush_into(&mut |_: DemuxedFrame| {}),
        }
        if self.listener.is_none() {
            self.listener = listener;
        }
    }

    pub fn flush_into(&mut self, sink: &mut dyn FrameListener) {
        if !self.pending.is_empty() {
            log::debug!("dropping {} bytes of partial packet at flush", self.pending.len());
            self.pending.clear();
        }
        let pids: Vec<u16> = self.streams.keys().copied().collect();
        for pid in pids {
            self.emit(pid, sink);
        }
    }

    fn handle_packet(&mut self, packet: &[u8], sink: &mut dyn FrameListener) {
        self.stats.packets += 1;
        let header = match self.parser.parse_header(packet) {
            Ok(header) => header,
            Err(e) => {
                log::warn!("dropping packet: {}", e);
                return;
            }
        };
        log::trace!(
            "packet pid=0x{:04x} cc={} pusi={} af={}",
            header.pid,
            header.continuity_counter,
            header.payload_unit_start,
            header.adaptation_field_exists
        );

        if header.transport_error {
            log::warn!("dropping packet with transport error on pid 0x{:04x}", header.pid);
            return;
        }
        if header.pid == PID_NULL {
            return;
        }

        match self.parser.parse_adaptation_field(packet) {
            Ok(Some(field)) => {
                if let Some(pcr) = field.pcr {
                    self.streams.entry(header.pid).or_default().last_pcr = Some(pcr);
                }
            }
            Ok(None) => {}
            Err(e) => {
                log::warn!("dropping packet on pid 0x{:04x}: {}", header.pid, e);
                return;
            }
        }

        let Some(offset) = self.parser.payload_offset(packet, &header) else {
            return;
        };
        let stream = self.streams.entry(header.pid).or_default();
        let last = stream.continuity.last();
        match stream.continuity.check(header.continuity_counter) {
            Continuity::Continuous => {}
            Continuity::Duplicate => {
                log::trace!("duplicate packet on pid 0x{:04x}", header.pid);
                return;
            }
            Continuity::Gap => {
                log::warn!(
                    "continuity gap on pid 0x{:04x}: got {} after {:?}",
                    header.pid,
                    header.continuity_counter,
                    last
                );
                self.stats.continuity_errors += 1;
            }
        }

        let payload = &packet[offset..];
        if header.pid == PID_PAT {
            if header.payload_unit_start {
                self.handle_pat(payload, sink);
            }
        } else if self.pmt_pids.contains_key(&header.pid) {
            if header.payload_unit_start {
                self.handle_pmt(payload, sink);
            }
        } else if header.pid > PID_RESERVED_MAX {
            self.handle_pes(header.pid, header.payload_unit_start, payload, sink);
        }
    }

    fn handle_pat(&mut self, payload: &[u8], sink: &mut dyn FrameListener) {
        let pat = match self
            .parser
            .read_section(payload)
            .and_then(|section| self.parser.parse_pat(section))
        {
            Ok(pat) => pat,
            Err(e) => {
                log::warn!("discarding PAT: {}", e);
                self.stats.psi_errors += 1;
                return;
            }
        };

        let pmt_pids: HashMap<u16, u16> = pat
            .programs()
            .map(|entry| (entry.pid, entry.program_number))
            .collect();
        if pmt_pids != self.pmt_pids {
            log::debug!("PAT: PMT pids {:?}", pmt_pids);
            self.pmt_pids = pmt_pids;
            // elementary pids come back with the new PMTs
            self.programs.clear();
            let pids: Vec<u16> = self.streams.keys().copied().collect();
            for pid in pids {
                self.retire(pid, sink);
            }
        }
    }

    fn handle_pmt(&mut self, payload: &[u8], sink: &mut dyn FrameListener) {
        let pmt = match self
            .parser
            .read_section(payload)
            .and_then(|section| self.parser.parse_pmt(section))
        {
            Ok(pmt) => pmt,
            Err(e) => {
                log::warn!("discarding PMT: {}", e);
                self.stats.psi_errors += 1;
                return;
            }
        };

        let removed: Vec<u16> = self
            .programs
            .get(&pmt.program_number)
            .map(|previous| {
                previous
                    .elementary_stream_infos
                    .iter()
                    .map(|info| info.elementary_pid)
                    .filter(|&pid| {
                        !pmt.elementary_stream_infos
                            .iter()
                            .any(|info| info.elementary_pid == pid)
                    })
                    .collect()
            })
            .unwrap_or_default();
        for pid in removed {
            log::debug!("PMT: pid 0x{:04x} removed", pid);
            self.retire(pid, sink);
        }

        for info in &pmt.elementary_stream_infos {
            let pid = info.elementary_pid;
            if pid <= PID_RESERVED_MAX || pid == PID_NULL || self.pmt_pids.contains_key(&pid) {
                log::warn!("PMT lists unusable elementary pid 0x{:04x}", pid);
                continue;
            }
            let stream = self.streams.entry(pid).or_default();
            if stream.stream_type != Some(info.stream_type) {
                log::debug!(
                    "PMT: pid 0x{:04x} stream_type 0x{:02x}",
                    pid,
                    info.stream_type
                );
                stream.stream_type = Some(info.stream_type);
            }
        }
        self.programs.insert(pmt.program_number, pmt);
    }

    fn handle_pes(&mut self, pid: u16, unit_start: bool, payload: &[u8], sink: &mut dyn FrameListener) {
        let Some(stream) = self.streams.get_mut(&pid) else {
            return;
        };
        if stream.stream_type.is_none() {
            log::trace!("ignoring pid 0x{:04x} not listed in a PMT", pid);
            return;
        }

        if unit_start {
            // a gap flagged on this packet belongs to the frame it ends
            self.emit(pid, sink);
            let Some(stream) = self.streams.get_mut(&pid) else {
                return;
            };
            stream.continuity.clear_error();

            match PESHeader::parse(payload) {
                Ok((header, _)) if header.stream_id == STREAM_ID_PADDING => {}
                Ok((header, offset)) => {
                    stream.pes_buffer = Some(PESBuilder::new(header, &payload[offset..]));
                }
                Err(e) => {
                    log::warn!("dropping PES on pid 0x{:04x}: {}", pid, e);
                    self.stats.pes_errors += 1;
                }
            }
        } else {
            match stream.pes_buffer.as_mut() {
                Some(pes) => pes.push_data(payload),
                None => {
                    log::trace!("pid 0x{:04x}: waiting for payload unit start", pid);
                    return;
                }
            }
        }

        let complete = self
            .streams
            .get(&pid)
            .and_then(|s| s.pes_buffer.as_ref())
            .map_or(false, PESBuilder::is_complete);
        if complete {
            self.emit(pid, sink);
        }
    }

    /// Emits what `pid` has buffered and stops demuxing it until a PMT
    /// lists it again.
    fn retire(&mut self, pid: u16, sink: &mut dyn FrameListener) {
        self.emit(pid, sink);
        if let Some(stream) = self.streams.get_mut(&pid) {
            stream.stream_type = None;
        }
    }

    fn emit(&mut self, pid: u16, sink: &mut dyn FrameListener) {
        let Some(stream) = self.streams.get_mut(&pid) else {
            return;
        };
        let Some(pes) = stream.pes_buffer.take() else {
            return;
        };
        if stream.continuity.has_error() {
            log::warn!("dropping PES on pid 0x{:04x} after continuity error", pid);
            self.stats.dropped_frames += 1;
            return;
        }

        let mut data = pes.data;
        if let Some(size) = pes.size {
            if data.len() < size {
                log::warn!(
                    "dropping PES on pid 0x{:04x}: ended after {} of {} bytes",
                    pid,
                    data.len(),
                    size
                );
                self.stats.dropped_frames += 1;
                return;
            }
            data.truncate(size);
        }
        if data.is_empty() {
            return;
        }

        let stream_type = stream.stream_type.unwrap_or_default();
        sink.on_frame(DemuxedFrame {
            pid,
            stream_id: pes.header.stream_id,
            stream_type,
            codec: CodecType::from_stream_type(stream_type),
            pts: pes.header.pts,
            dts: pes.header.dts,
            data: data.freeze(),
        });
    }
}

/// First offset that looks like a packet start: a sync byte followed by
/// another one a packet later, or by the end of the data exactly a packet
/// later.
fn sync_offset(data: &[u8]) -> Option<usize> {
    let mut pos = 0;
    while let Some(found) = find_subsequence(&data[pos..], &[SYNC_BYTE]) {
        let candidate = pos + found;
        let next = candidate + TS_PACKET_SIZE;
        if data.get(next) == Some(&SYNC_BYTE) || data.len() == next {
            return Some(candidate);
        }
        pos = candidate + 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::av::Frame;
    use crate::codec::VideoCodec;
    use crate::format::ts::packet::{PacketBuffer, PacketCollector};
    use crate::format::ts::packetizer::Packetizer;
    use crate::format::ts::psi::{Profile, PsiWriter};
    use pretty_assertions::assert_eq;

    const IDR: [u8; 8] = [0x00, 0x00, 0x00, 0x01, 0x65, 0x88, 0x84, 0x21];
    const AUD: [u8; 6] = [0x00, 0x00, 0x00, 0x01, 0x09, 0xF0];

    struct Stream {
        psi: PsiWriter,
        packetizer: Packetizer,
        buffer: PacketBuffer,
        out: PacketCollector,
    }

    impl Stream {
        fn new() -> Self {
            Self {
                psi: PsiWriter::new(VideoCodec::H264),
                packetizer: Packetizer::new(VideoCodec::H264),
                buffer: PacketBuffer::new(),
                out: PacketCollector::new(),
            }
        }

        fn psi(&mut self) -> &mut Self {
            self.psi.write_pat(&mut self.buffer, &mut self.out).unwrap();
            self.psi
                .write_pmt(Profile::Mixed, &mut self.buffer, &mut self.out)
                .unwrap();
            self
        }

        fn frame(&mut self, frame: Frame) -> &mut Self {
            self.packetizer
                .packetize(Profile::Mixed, false, &frame, &mut self.buffer, &mut self.out)
                .unwrap();
            self
        }

        fn bytes(&mut self) -> Vec<u8> {
            self.out.take().to_vec()
        }
    }

    fn demux(data: &[u8]) -> (TSDemuxer, Vec<DemuxedFrame>) {
        let mut demuxer = TSDemuxer::new();
        let mut frames = Vec::new();
        demuxer.read_packet_into(data, &mut frames);
        demuxer.flush_into(&mut frames);
        (demuxer, frames)
    }

    #[test]
    fn test_video_frame_round_trip() {
        let data = Stream::new()
            .psi()
            .frame(Frame::video(IDR.to_vec(), 3000).with_frame_type(crate::av::FrameType::I))
            .bytes();
        let (demuxer, frames) = demux(&data);

        assert_eq!(frames.len(), 1);
        let frame = &frames[0];
        assert_eq!(frame.pid, PID_VIDEO);
        assert_eq!(frame.stream_id, STREAM_ID_VIDEO);
        assert_eq!(frame.stream_type, STREAM_TYPE_H264);
        assert_eq!(frame.codec, Some(CodecType::H264));
        assert_eq!(frame.pts, Some(3000));
        assert_eq!(frame.dts, Some(3000));
        assert!(frame.is_video());
        assert_eq!(frame.data.to_vec(), [&AUD[..], &IDR[..]].concat());

        assert_eq!(demuxer.last_pcr(PID_VIDEO), Some(3000 * 300));
        assert_eq!(demuxer.stream_type(PID_AUDIO), Some(STREAM_TYPE_AAC));
        assert_eq!(demuxer.programs().count(), 1);
        assert_eq!(demuxer.stats().packets, 3);
    }

    #[test]
    fn test_bounded_audio_emitted_without_flush() {
        let adts = vec![0xFF, 0xF1, 0x50, 0x80, 0x01, 0x7F, 0xFC, 1, 2, 3];
        let data = Stream::new()
            .psi()
            .frame(Frame::audio(adts.clone(), 1920))
            .bytes();

        let mut demuxer = TSDemuxer::new();
        let mut frames = Vec::new();
        demuxer.read_packet_into(&data, &mut frames);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].codec, Some(CodecType::AAC));
        assert_eq!(frames[0].pts, Some(1920));
        assert_eq!(frames[0].data.to_vec(), adts);
    }

    #[test]
    fn test_pes_before_pmt_is_ignored() {
        let mut stream = Stream::new();
        let frame = stream.frame(Frame::video(IDR.to_vec(), 0)).bytes();
        let psi = stream.psi().bytes();

        let (_, frames) = demux(&frame);
        assert!(frames.is_empty());

        let data = [psi, frame].concat();
        let (_, frames) = demux(&data);
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn test_frames_split_across_chunks() {
        let payload: Vec<u8> = (0..1000u32).map(|i| (i % 251) as u8).collect();
        let mut stream = Stream::new();
        let data = stream
            .psi()
            .frame(Frame::video(payload.clone(), 0))
            .frame(Frame::video(payload.clone(), 3000))
            .bytes();

        let mut demuxer = TSDemuxer::new();
        let mut frames = Vec::new();
        for chunk in data.chunks(100) {
            demuxer.read_packet_into(chunk, &mut frames);
        }
        // the second frame is still open until flush
        assert_eq!(frames.len(), 1);
        demuxer.flush_into(&mut frames);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].pts, Some(3000));
        assert_eq!(&frames[1].data[AUD.len()..], &payload[..]);
    }

    #[test]
    fn test_continuity_gap_drops_frame() {
        let payload = vec![0x11; 500];
        let mut stream = Stream::new();
        stream.psi();
        let psi_len = stream.out.len();
        let mut data = stream
            .frame(Frame::video(payload.clone(), 0))
            .frame(Frame::video(payload.clone(), 3000))
            .bytes();

        // drop the second packet of the first frame
        data.drain(psi_len + TS_PACKET_SIZE..psi_len + 2 * TS_PACKET_SIZE);
        let (demuxer, frames) = demux(&data);

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].pts, Some(3000));
        assert_eq!(demuxer.stats().continuity_errors, 1);
        assert_eq!(demuxer.stats().dropped_frames, 1);
    }

    #[test]
    fn test_truncated_audio_is_dropped() {
        let mut stream = Stream::new();
        stream.psi();
        let psi_len = stream.out.len();
        let mut data = stream.frame(Frame::audio(vec![0x5A; 400], 0)).bytes();
        assert_eq!(data.len() - psi_len, 3 * TS_PACKET_SIZE);

        // the tail packet never arrives
        data.truncate(data.len() - TS_PACKET_SIZE);
        let (demuxer, frames) = demux(&data);
        assert!(frames.is_empty());
        assert_eq!(demuxer.stats().dropped_frames, 1);
        assert_eq!(demuxer.stats().continuity_errors, 0);
    }

    #[test]
    fn test_duplicate_packet_is_skipped() {
        let payload = vec![0x22; 500];
        let mut stream = Stream::new();
        stream.psi();
        let psi_len = stream.out.len();
        let clean = stream
            .frame(Frame::video(payload.clone(), 0))
            .frame(Frame::video(payload.clone(), 3000))
            .bytes();

        // repeat the second packet of the first frame
        let end = psi_len + 2 * TS_PACKET_SIZE;
        let data = [&clean[..end], &clean[end - TS_PACKET_SIZE..]].concat();

        let (demuxer, frames) = demux(&data);
        let (_, expected) = demux(&clean);
        assert_eq!(frames, expected);
        assert_eq!(frames.len(), 2);
        assert_eq!(demuxer.stats().continuity_errors, 0);
        assert_eq!(demuxer.stats().dropped_frames, 0);
    }

    #[test]
    fn test_pid_removed_from_pmt_is_ignored() {
        let mut stream = Stream::new();
        stream.psi();
        stream
            .psi
            .write_pmt(Profile::Video, &mut stream.buffer, &mut stream.out)
            .unwrap();
        let data = stream
            .frame(Frame::audio(vec![0xFF, 0xF1, 0x50, 0x80, 0x01, 0x7F, 0xFC], 0))
            .frame(Frame::video(IDR.to_vec(), 0))
            .bytes();

        let (demuxer, frames) = demux(&data);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].pid, PID_VIDEO);
        assert_eq!(demuxer.stream_type(PID_AUDIO), None);
        assert_eq!(demuxer.stream_type(PID_VIDEO), Some(STREAM_TYPE_H264));
    }

    #[test]
    fn test_bad_crc_ignores_pat() {
        let mut data = Stream::new()
            .psi()
            .frame(Frame::video(IDR.to_vec(), 0))
            .bytes();
        // flip a bit in the PAT's program entry
        data[14] ^= 0x01;
        let (demuxer, frames) = demux(&data);
        assert!(frames.is_empty());
        assert_eq!(demuxer.stats().psi_errors, 1);
        assert_eq!(demuxer.stream_type(PID_VIDEO), None);
    }

    #[test]
    fn test_resync_after_garbage() {
        let mut stream = Stream::new();
        let psi = stream.psi().bytes();
        let first = stream.frame(Frame::video(IDR.to_vec(), 0)).bytes();
        let second = stream.frame(Frame::video(IDR.to_vec(), 3000)).bytes();

        let data = [psi, vec![0x00, 0x47, 0x12], first, second].concat();
        let (demuxer, frames) = demux(&data);
        assert_eq!(frames.len(), 2);
        assert_eq!(demuxer.stats().skipped_bytes, 3);
    }

    #[test]
    fn test_sync_offset() {
        let mut data = vec![0u8; 2 * TS_PACKET_SIZE + 2];
        data[0] = 0x47;
        data[2] = 0x47;
        data[2 + TS_PACKET_SIZE] = 0x47;
        // offset 0 is not confirmed by the byte a packet later
        assert_eq!(sync_offset(&data), Some(2));
        // a candidate ending the data exactly a packet later counts
        assert_eq!(sync_offset(&data[1..TS_PACKET_SIZE + 2]), Some(1));
        assert_eq!(sync_offset(&[0x00, 0x47]), None);
        assert_eq!(sync_offset(&[0x00; 10]), None);
    }

    #[test]
    fn test_stored_listener() {
        let data = Stream::new()
            .psi()
            .frame(Frame::video(IDR.to_vec(), 0))
            .bytes();
        let seen = std::sync::Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = std::sync::Arc::clone(&seen);

        let mut demuxer = TSDemuxer::new();
        demuxer.set_frame_listener(move |frame: DemuxedFrame| sink.lock().push(frame.pid));
        demuxer.read_packet(&data);
        demuxer.flush();
        assert_eq!(*seen.lock(), vec![PID_VIDEO]);
        assert!(demuxer.take_frame_listener().is_some());

        demuxer.reset();
        assert_eq!(demuxer.programs().count(), 0);
    }
}
