//! Turns encoder output into timestamped frames.
//!
//! Video buffers are split at Annex-B start codes, one frame per NAL unit.
//! Audio buffers are split at ADTS frame boundaries. Timestamps come from a
//! per-stream counter anchored to the first timestamp either stream saw.

use bytes::Bytes;

use super::types::micros_to_pts;
use crate::av::{Frame, FrameType};
use crate::codec::aac::{AACParser, SAMPLES_PER_FRAME};
use crate::codec::{nal_units, CodecProfile, VideoCodec};
use crate::format::ts::types::PTS_HZ;

/// Wall-clock start time shared by the audio and video clocks.
#[derive(Debug, Clone, Copy, Default)]
pub struct PtsAnchor {
    start_us: Option<u64>,
}

impl PtsAnchor {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn start_us(&self) -> Option<u64> {
        self.start_us
    }

    pub fn reset(&mut self) {
        self.start_us = None;
    }

    /// 90 kHz offset of `timestamp_us` from the anchor, anchoring on first use.
    /// Timestamps before the anchor map to 0.
    pub fn offset(&mut self, timestamp_us: u64) -> u64 {
        let start = *self.start_us.get_or_insert(timestamp_us);
        micros_to_pts(timestamp_us.saturating_sub(start))
    }
}

/// Presentation clock advancing by `num / den` ticks per frame.
///
/// The position is kept as a frame count so fractional increments such as
/// 1024 samples at 44.1 kHz do not drift.
#[derive(Debug, Clone)]
pub struct PtsClock {
    num: u64,
    den: u64,
    base: Option<u64>,
    frames: u64,
}

impl PtsClock {
    pub fn new(num: u64, den: u64) -> Self {
        Self {
            num,
            den: den.max(1),
            base: None,
            frames: 0,
        }
    }

    /// Clock for a video stream at `fps` frames per second.
    pub fn video(fps: u32) -> Self {
        Self::new(PTS_HZ, u64::from(fps))
    }

    /// Clock for AAC at `sample_rate`, 1024 samples per frame.
    pub fn audio(sample_rate: u32) -> Self {
        Self::new(SAMPLES_PER_FRAME * PTS_HZ, u64::from(sample_rate))
    }

    /// Timestamp of the current frame. The first call fixes the base from
    /// the anchor.
    pub fn current(&mut self, anchor: &mut PtsAnchor, timestamp_us: u64) -> u64 {
        let base = *self.base.get_or_insert_with(|| anchor.offset(timestamp_us));
        base + self.frames * self.num / self.den
    }

    pub fn advance(&mut self) {
        self.frames += 1;
    }

    pub fn reset(&mut self) {
        self.base = None;
        self.frames = 0;
    }
}

/// Splits Annex-B buffers into one frame per NAL unit.
///
/// Nothing is emitted until a unit a decoder can start from (parameter set or
/// IDR/IRAP picture) has been seen.
#[derive(Debug, Clone)]
pub struct VideoSegmenter {
    codec: VideoCodec,
    clock: PtsClock,
    synced: bool,
}

impl VideoSegmenter {
    pub fn new(codec: VideoCodec, fps: u32) -> Self {
        Self {
            codec,
            clock: PtsClock::video(fps),
            synced: false,
        }
    }

    #[cfg(test)]
    pub fn is_synced(&self) -> bool {
        self.synced
    }

    pub fn reset(&mut self) {
        self.clock.reset();
        self.synced = false;
    }

    /// Frames for one encoder output buffer. All units share one PTS; the
    /// clock advances once if any of them carried a picture.
    pub fn segment(&mut self, data: &Bytes, timestamp_us: u64, anchor: &mut PtsAnchor) -> Vec<Frame> {
        let mut kept = Vec::new();
        for unit in nal_units(data) {
            let Some(header) = unit.header_byte() else {
                continue;
            };
            if !self.synced {
                if !self.codec.is_sync_point(header) {
                    log::debug!(
                        "dropping NAL type {} before first sync point",
                        self.codec.nal_type(header)
                    );
                    continue;
                }
                log::debug!("video synced on NAL type {}", self.codec.nal_type(header));
                self.synced = true;
            }
            let range = unit.offset..unit.offset + unit.data.len();
            let frame_type = if self.codec.is_frame_boundary(header) {
                self.codec.frame_type(unit.payload())
            } else {
                FrameType::NonSlice
            };
            kept.push((range, frame_type));
        }
        if kept.is_empty() {
            return Vec::new();
        }

        let pts = self.clock.current(anchor, timestamp_us);
        let frames: Vec<Frame> = kept
            .into_iter()
            .enumerate()
            .map(|(i, (range, frame_type))| {
                Frame::video(data.slice(range), pts)
                    .with_frame_type(frame_type)
                    .with_access_unit_start(i == 0)
            })
            .collect();
        if frames.iter().any(Frame::is_frame) {
            self.clock.advance();
        }
        frames
    }
}

/// Splits ADTS buffers into one frame per ADTS frame.
#[derive(Debug)]
pub struct AudioSegmenter {
    parser: AACParser,
    clock: PtsClock,
}

impl AudioSegmenter {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            parser: AACParser::new(),
            clock: PtsClock::audio(sample_rate),
        }
    }

    pub fn reset(&mut self) {
        self.clock.reset();
    }

    pub fn segment(&mut self, data: &Bytes, timestamp_us: u64, anchor: &mut PtsAnchor) -> Vec<Frame> {
        self.parser
            .split_frames(data)
            .into_iter()
            .map(|range| {
                let pts = self.clock.current(anchor, timestamp_us);
                self.clock.advance();
                Frame::audio(data.slice(range), pts)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::aac::AACConfig;
    use pretty_assertions::assert_eq;

    const SPS: [u8; 6] = [0x00, 0x00, 0x00, 0x01, 0x67, 0x42];
    const PPS: [u8; 6] = [0x00, 0x00, 0x00, 0x01, 0x68, 0xCE];
    const IDR: [u8; 7] = [0x00, 0x00, 0x00, 0x01, 0x65, 0x88, 0x84];
    const P_SLICE: [u8; 6] = [0x00, 0x00, 0x00, 0x01, 0x41, 0xC0];

    fn concat(parts: &[&[u8]]) -> Bytes {
        Bytes::from(parts.concat())
    }

    fn adts(count: usize) -> Bytes {
        let config = AACConfig::default();
        let mut out = Vec::new();
        for i in 0..count {
            out.extend_from_slice(&config.adts_header(4).unwrap());
            out.extend_from_slice(&[i as u8; 4]);
        }
        Bytes::from(out)
    }

    #[test]
    fn test_anchor() {
        let mut anchor = PtsAnchor::new();
        assert_eq!(anchor.offset(1_000_000), 0);
        assert_eq!(anchor.offset(2_000_000), 90_000);
        assert_eq!(anchor.offset(500_000), 0);
        assert_eq!(anchor.start_us(), Some(1_000_000));
        anchor.reset();
        assert_eq!(anchor.start_us(), None);
    }

    #[test]
    fn test_clock_increments() {
        let mut anchor = PtsAnchor::new();
        let mut clock = PtsClock::video(30);
        assert_eq!(clock.current(&mut anchor, 0), 0);
        clock.advance();
        assert_eq!(clock.current(&mut anchor, 999_999), 3000);

        let mut clock = PtsClock::audio(44_100);
        clock.current(&mut anchor, 0);
        clock.advance();
        assert_eq!(clock.current(&mut anchor, 0), 2089);
        for _ in 1..441 {
            clock.advance();
        }
        // 441 frames of 1024 samples at 44.1 kHz are exactly 10.24 s
        assert_eq!(clock.current(&mut anchor, 0), 921_600);
    }

    #[test]
    fn test_video_gating_and_shared_pts() {
        let mut anchor = PtsAnchor::new();
        let mut segmenter = VideoSegmenter::new(VideoCodec::H264, 30);

        // P slice before any sync point is dropped and does not anchor
        assert!(segmenter.segment(&concat(&[&P_SLICE]), 5_000, &mut anchor).is_empty());
        assert_eq!(anchor.start_us(), None);

        let frames = segmenter.segment(&concat(&[&SPS, &PPS, &IDR]), 10_000, &mut anchor);
        assert_eq!(frames.len(), 3);
        assert!(frames.iter().all(|f| f.pts == 0));
        assert_eq!(frames[0].frame_type, FrameType::NonSlice);
        assert_eq!(frames[2].frame_type, FrameType::I);
        assert!(frames[0].access_unit_start);
        assert!(!frames[1].access_unit_start);
        assert_eq!(&frames[2].data[..], &IDR[..]);

        let frames = segmenter.segment(&concat(&[&P_SLICE]), 43_333, &mut anchor);
        assert_eq!(frames[0].pts, 3000);
        assert_eq!(frames[0].frame_type, FrameType::P);
    }

    #[test]
    fn test_parameter_sets_alone_do_not_advance_clock() {
        let mut anchor = PtsAnchor::new();
        let mut segmenter = VideoSegmenter::new(VideoCodec::H264, 25);
        let frames = segmenter.segment(&concat(&[&SPS, &PPS]), 0, &mut anchor);
        assert_eq!(frames.len(), 2);
        let frames = segmenter.segment(&concat(&[&IDR]), 40_000, &mut anchor);
        assert_eq!(frames[0].pts, 0);
        let frames = segmenter.segment(&concat(&[&P_SLICE]), 80_000, &mut anchor);
        assert_eq!(frames[0].pts, 3600);
    }

    #[test]
    fn test_non_picture_units_do_not_advance_clock() {
        let mut anchor = PtsAnchor::new();
        let mut segmenter = VideoSegmenter::new(VideoCodec::H264, 30);
        let aud = [0x00, 0x00, 0x00, 0x01, 0x09, 0x10];
        let sei = [0x00, 0x00, 0x00, 0x01, 0x06, 0x05, 0x01];

        segmenter.segment(&concat(&[&SPS, &PPS, &IDR]), 0, &mut anchor);
        let frames = segmenter.segment(&concat(&[&aud, &sei]), 10_000, &mut anchor);
        assert_eq!(frames.len(), 2);
        assert!(frames.iter().all(|f| f.frame_type == FrameType::NonSlice));
        assert!(frames.iter().all(|f| f.pts == 3000));

        let frames = segmenter.segment(&concat(&[&P_SLICE]), 33_333, &mut anchor);
        assert_eq!(frames[0].pts, 3000);
        assert_eq!(frames[0].frame_type, FrameType::P);
    }

    #[test]
    fn test_hevc_gating() {
        let mut anchor = PtsAnchor::new();
        let mut segmenter = VideoSegmenter::new(VideoCodec::H265, 30);
        let trail = [0x00, 0x00, 0x00, 0x01, 0x02, 0x01, 0xAA];
        let cra = [0x00, 0x00, 0x00, 0x01, 0x2A, 0x01, 0xAA];
        assert!(segmenter.segment(&Bytes::copy_from_slice(&trail), 0, &mut anchor).is_empty());
        assert!(!segmenter.is_synced());
        let frames = segmenter.segment(&Bytes::copy_from_slice(&cra), 0, &mut anchor);
        assert_eq!(frames[0].frame_type, FrameType::I);
        assert!(segmenter.is_synced());
    }

    #[test]
    fn test_audio_frames_and_anchor_sharing() {
        let mut anchor = PtsAnchor::new();
        let mut video = VideoSegmenter::new(VideoCodec::H264, 30);
        let mut audio = AudioSegmenter::new(48_000);

        video.segment(&concat(&[&IDR]), 1_000_000, &mut anchor);
        let frames = audio.segment(&adts(3), 1_500_000, &mut anchor);
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].pts, 45_000);
        assert_eq!(frames[1].pts, 45_000 + 1920);
        assert_eq!(frames[2].pts, 45_000 + 3840);
        assert_eq!(frames[1].data.len(), 11);
        assert!(frames.iter().all(|f| f.is_keyframe()));

        audio.reset();
        let frames = audio.segment(&adts(1), 2_000_000, &mut anchor);
        assert_eq!(frames[0].pts, 90_000);
    }
}
