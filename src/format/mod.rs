use crate::format::ts::DemuxedFrame;
use crate::Result;

pub mod ts;

/// Common trait for format demuxers
#[async_trait::async_trait]
pub trait Demuxer: Send {
    /// Read the next frame, or `None` at end of stream
    async fn read_frame(&mut self) -> Result<Option<DemuxedFrame>>;
}

/// Common trait for format muxers
#[async_trait::async_trait]
pub trait Muxer: Send {
    /// Write one buffer of Annex-B NAL units captured at `timestamp_us`
    async fn write_video(&mut self, data: &[u8], timestamp_us: u64) -> Result<()>;

    /// Write one or more ADTS frames captured at `timestamp_us`
    async fn write_audio(&mut self, data: &[u8], timestamp_us: u64) -> Result<()>;

    /// Flush any buffered packets
    async fn flush(&mut self) -> Result<()>;

    /// Emit every queued frame and flush; call once at end of stream
    async fn finish(&mut self) -> Result<()>;
}

pub use self::ts::{TSDemuxer, TSMuxer, TsReader, TsWriter};
