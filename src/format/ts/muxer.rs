use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::{Mutex, MutexGuard};

use super::interleaver::Interleaver;
use super::packet::{NullListener, PacketBuffer, PacketListener};
use super::packetizer::Packetizer;
use super::psi::{Profile, PsiWriter};
use super::segmenter::{AudioSegmenter, PtsAnchor, VideoSegmenter};
use super::types::time_to_pts;
use crate::av::Frame;
use crate::codec::aac::AACConfig;
use crate::config::MuxConfig;
use crate::{Result, TsError};

/// MPEG-TS multiplexer for one program with up to one video and one audio
/// stream.
///
/// Encoder output goes in through [`write_nalu`](TSMuxer::write_nalu) and
/// [`write_adts`](TSMuxer::write_adts); finished 188-byte packets come out
/// through a [`PacketListener`]. PAT and PMT are written before the first
/// frame and then every `psi_interval` of stream time.
pub struct TSMuxer {
    config: MuxConfig,
    profile: Profile,
    psi: PsiWriter,
    packetizer: Packetizer,
    buffer: PacketBuffer,
    anchor: PtsAnchor,
    video: Option<VideoSegmenter>,
    audio: Option<AudioSegmenter>,
    interleaver: Interleaver,
    psi_interval: u64,
    last_psi_pts: Option<u64>,
    psi_requested: bool,
    first_pes: bool,
    listener: Option<Box<dyn PacketListener + Send>>,
}

impl fmt::Debug for TSMuxer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TSMuxer")
            .field("profile", &self.profile)
            .field("config", &self.config)
            .field("last_psi_pts", &self.last_psi_pts)
            .field("queued", &self.interleaver.len())
            .field("has_listener", &self.listener.is_some())
            .finish_non_exhaustive()
    }
}

impl TSMuxer {
    /// Validates `config` and builds a muxer for it.
    pub fn initialize(config: MuxConfig) -> Result<Self> {
        config.validate()?;
        let profile = config.profile()?;
        let codec = config.video_codec();

        log::info!(
            "initializing TS muxer: profile={:?} video={:?} audio={:?}",
            profile,
            config.video,
            config.audio
        );

        Ok(Self {
            profile,
            psi: PsiWriter::new(codec),
            packetizer: Packetizer::new(codec),
            buffer: PacketBuffer::new(),
            anchor: PtsAnchor::new(),
            video: config.video.map(|v| VideoSegmenter::new(v.codec, v.fps)),
            audio: config.audio.map(|a| AudioSegmenter::new(a.sample_rate)),
            interleaver: Interleaver::default(),
            psi_interval: time_to_pts(config.psi_interval),
            last_psi_pts: None,
            psi_requested: false,
            first_pes: true,
            listener: None,
            config,
        })
    }

    pub fn profile(&self) -> Profile {
        self.profile
    }

    pub fn config(&self) -> &MuxConfig {
        &self.config
    }

    /// Installs the sink used by the non-`_into` write methods.
    pub fn set_packet_listener<L>(&mut self, listener: L)
    where
        L: PacketListener + Send + 'static,
    {
        self.listener = Some(Box::new(listener));
    }

    pub fn take_packet_listener(&mut self) -> Option<Box<dyn PacketListener + Send>> {
        self.listener.take()
    }

    /// Writes PAT and PMT before the next frame regardless of the interval.
    pub fn force_psi(&mut self) {
        self.psi_requested = true;
    }

    /// Frames waiting in the interleaver.
    pub fn queued_frames(&self) -> usize {
        self.interleaver.len()
    }

    /// Starts a new stream: counters, clocks and queues go back to their
    /// initial state and PSI is repeated before the next frame.
    pub fn reset(&mut self) {
        log::info!("resetting TS muxer, dropping {} queued frames", self.interleaver.len());
        self.psi.reset();
        self.packetizer.reset();
        self.anchor.reset();
        if let Some(video) = &mut self.video {
            video.reset();
        }
        if let Some(audio) = &mut self.audio {
            audio.reset();
        }
        self.interleaver.clear();
        self.last_psi_pts = None;
        self.psi_requested = false;
        self.first_pes = true;
    }

    /// Writes one encoder output buffer of Annex-B NAL units.
    pub fn write_nalu(&mut self, data: &[u8], timestamp_us: u64) -> Result<()> {
        self.with_listener(|muxer, sink| muxer.write_nalu_into(data, timestamp_us, sink))
    }

    pub fn write_nalu_into(
        &mut self,
        data: &[u8],
        timestamp_us: u64,
        sink: &mut dyn PacketListener,
    ) -> Result<()> {
        let segmenter = self
            .video
            .as_mut()
            .ok_or_else(|| TsError::InvalidConfig("video stream not configured".into()))?;
        let frames = segmenter.segment(&Bytes::copy_from_slice(data), timestamp_us, &mut self.anchor);
        self.push_frames(frames, sink)
    }

    /// Writes one or more concatenated ADTS frames.
    pub fn write_adts(&mut self, data: &[u8], timestamp_us: u64) -> Result<()> {
        self.with_listener(|muxer, sink| muxer.write_adts_into(data, timestamp_us, sink))
    }

    pub fn write_adts_into(
        &mut self,
        data: &[u8],
        timestamp_us: u64,
        sink: &mut dyn PacketListener,
    ) -> Result<()> {
        let segmenter = self
            .audio
            .as_mut()
            .ok_or_else(|| TsError::InvalidConfig("audio stream not configured".into()))?;
        let frames = segmenter.segment(&Bytes::copy_from_slice(data), timestamp_us, &mut self.anchor);
        self.push_frames(frames, sink)
    }

    /// Writes one raw AAC-LC access unit, adding the ADTS header.
    pub fn write_aac(&mut self, data: &[u8], timestamp_us: u64) -> Result<()> {
        self.with_listener(|muxer, sink| muxer.write_aac_into(data, timestamp_us, sink))
    }

    pub fn write_aac_into(
        &mut self,
        data: &[u8],
        timestamp_us: u64,
        sink: &mut dyn PacketListener,
    ) -> Result<()> {
        let audio = self
            .config
            .audio
            .ok_or_else(|| TsError::InvalidConfig("audio stream not configured".into()))?;
        let channels = u8::try_from(audio.channels).map_err(|_| {
            TsError::InvalidConfig(format!("unsupported AAC channel count: {}", audio.channels))
        })?;
        let header = AACConfig::lc(audio.sample_rate, channels)?.adts_header(data.len())?;

        let mut frame = Vec::with_capacity(header.len() + data.len());
        frame.extend_from_slice(&header);
        frame.extend_from_slice(data);
        self.write_adts_into(&frame, timestamp_us, sink)
    }

    /// Queues an already segmented frame.
    pub fn write_frame_into(&mut self, frame: Frame, sink: &mut dyn PacketListener) -> Result<()> {
        self.push_frames(vec![frame], sink)
    }

    /// Emits every frame still held by the interleaver.
    pub fn flush(&mut self) -> Result<()> {
        self.with_listener(|muxer, sink| muxer.flush_into(sink))
    }

    pub fn flush_into(&mut self, sink: &mut dyn PacketListener) -> Result<()> {
        while let Some(frame) = self.interleaver.pop_any() {
            self.emit(&frame, sink)?;
        }
        Ok(())
    }

    fn with_listener<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut Self, &mut dyn PacketListener) -> Result<()>,
    {
        let mut listener = self.listener.take();
        let result = match listener.as_mut() {
            Some(sink) => f(self, sink.as_mut()),
            None => {
                log::trace!("no packet listener installed, discarding output");
                f(self, &mut NullListener)
            }
        };
        // a listener installed by `f` wins over the one taken out
        if self.listener.is_none() {
            self.listener = listener;
        }
        result
    }

    fn push_frames(&mut self, frames: Vec<Frame>, sink: &mut dyn PacketListener) -> Result<()> {
        if self.profile != Profile::Mixed {
            for frame in &frames {
                self.emit(frame, sink)?;
            }
            return Ok(());
        }

        for frame in frames {
            self.interleaver.push(frame);
        }
        while let Some(frame) = self.interleaver.pop_ready() {
            self.emit(&frame, sink)?;
        }
        Ok(())
    }

    fn psi_due(&self, pts: u64) -> bool {
        self.psi_requested
            || self
                .last_psi_pts
                .map_or(true, |last| pts.abs_diff(last) >= self.psi_interval)
    }

    fn emit(&mut self, frame: &Frame, sink: &mut dyn PacketListener) -> Result<()> {
        if self.psi_due(frame.pts) {
            self.psi.write_pat(&mut self.buffer, sink)?;
            self.psi.write_pmt(self.profile, &mut self.buffer, sink)?;
            self.last_psi_pts = Some(frame.pts);
            self.psi_requested = false;
        }
        let first_pes = std::mem::replace(&mut self.first_pes, false);
        self.packetizer
            .packetize(self.profile, first_pes, frame, &mut self.buffer, sink)?;
        Ok(())
    }
}

/// A [`TSMuxer`] shared between encoder callback threads.
#[derive(Debug, Clone)]
pub struct SharedMuxer {
    inner: Arc<Mutex<TSMuxer>>,
}

impl SharedMuxer {
    pub fn new(muxer: TSMuxer) -> Self {
        Self {
            inner: Arc::new(Mutex::new(muxer)),
        }
    }

    pub fn initialize(config: MuxConfig) -> Result<Self> {
        TSMuxer::initialize(config).map(Self::new)
    }

    pub fn write_nalu(&self, data: &[u8], timestamp_us: u64) -> Result<()> {
        self.inner.lock().write_nalu(data, timestamp_us)
    }

    pub fn write_adts(&self, data: &[u8], timestamp_us: u64) -> Result<()> {
        self.inner.lock().write_adts(data, timestamp_us)
    }

    pub fn write_aac(&self, data: &[u8], timestamp_us: u64) -> Result<()> {
        self.inner.lock().write_aac(data, timestamp_us)
    }

    pub fn flush(&self) -> Result<()> {
        self.inner.lock().flush()
    }

    pub fn force_psi(&self) {
        self.inner.lock().force_psi()
    }

    pub fn reset(&self) {
        self.inner.lock().reset()
    }

    /// Locks the muxer for calls not mirrored here.
    pub fn lock(&self) -> MutexGuard<'_, TSMuxer> {
        self.inner.lock()
    }
}
