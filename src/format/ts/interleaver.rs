//! Orders audio and video frames by PTS before packetization.

use std::collections::VecDeque;

use crate::av::{Frame, StreamKind};

/// Frames held per stream before the oldest is released even though the
/// other stream has nothing queued.
pub const DEFAULT_MAX_QUEUED: usize = 512;

/// Two-queue merge of audio and video frames.
///
/// A frame is released only when both queues are non-empty, so its order
/// relative to the other stream is known. Ties go to video.
#[derive(Debug)]
pub struct Interleaver {
    video: VecDeque<Frame>,
    audio: VecDeque<Frame>,
    max_queued: usize,
}

impl Default for Interleaver {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_QUEUED)
    }
}

impl Interleaver {
    pub fn new(max_queued: usize) -> Self {
        Self {
            video: VecDeque::new(),
            audio: VecDeque::new(),
            max_queued: max_queued.max(1),
        }
    }

    pub fn push(&mut self, frame: Frame) {
        match frame.kind {
            StreamKind::Video => self.video.push_back(frame),
            StreamKind::Audio => self.audio.push_back(frame),
        }
    }

    /// Next frame that can be released in PTS order.
    pub fn pop_ready(&mut self) -> Option<Frame> {
        match (self.video.front(), self.audio.front()) {
            (Some(video), Some(audio)) => {
                if video.pts <= audio.pts {
                    self.video.pop_front()
                } else {
                    self.audio.pop_front()
                }
            }
            (Some(_), None) if self.video.len() > self.max_queued => {
                log::warn!("no audio for {} video frames, releasing", self.video.len());
                self.video.pop_front()
            }
            (None, Some(_)) if self.audio.len() > self.max_queued => {
                log::warn!("no video for {} audio frames, releasing", self.audio.len());
                self.audio.pop_front()
            }
            _ => None,
        }
    }

    /// Releases everything left, still in PTS order.
    pub fn pop_any(&mut self) -> Option<Frame> {
        match (self.video.front(), self.audio.front()) {
            (Some(_), Some(_)) => self.pop_ready(),
            (Some(_), None) => self.video.pop_front(),
            (None, Some(_)) => self.audio.pop_front(),
            (None, None) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.video.len() + self.audio.len()
    }

    pub fn is_empty(&self) -> bool {
        self.video.is_empty() && self.audio.is_empty()
    }

    pub fn clear(&mut self) {
        self.video.clear();
        self.audio.clear();
    }
}
