//! Tokio adaptors around the push-driven muxer and demuxer.

use std::collections::VecDeque;

use bytes::Bytes;
use futures::stream::{self, Stream};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;

use super::demuxer::{DemuxedFrame, TSDemuxer};
use super::muxer::TSMuxer;
use super::packet::PacketCollector;
use super::types::TS_PACKET_SIZE;
use crate::config::MuxConfig;
use crate::format::{Demuxer, Muxer};
use crate::Result;

/// Bytes requested per read: seven packets, one UDP datagram's worth.
pub const READ_CHUNK_SIZE: usize = 7 * TS_PACKET_SIZE;

/// Writes muxed packets to an [`AsyncWrite`].
///
/// ```no_run
/// use tsmux::config::MuxConfig;
/// use tsmux::format::Muxer;
/// use tsmux::format::ts::TsWriter;
///
/// # async fn run(nalu: &[u8]) -> tsmux::Result<()> {
/// let file = tokio::fs::File::create("out.ts").await?;
/// let mut writer = TsWriter::new(file, MuxConfig::default())?;
/// writer.write_video(nalu, 0).await?;
/// writer.finish().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct TsWriter<W: AsyncWrite + Unpin + Send> {
    muxer: TSMuxer,
    writer: BufWriter<W>,
    packets: PacketCollector,
}

impl<W: AsyncWrite + Unpin + Send> TsWriter<W> {
    pub fn new(writer: W, config: MuxConfig) -> Result<Self> {
        Ok(Self {
            muxer: TSMuxer::initialize(config)?,
            writer: BufWriter::new(writer),
            packets: PacketCollector::new(),
        })
    }

    pub fn muxer(&self) -> &TSMuxer {
        &self.muxer
    }

    pub fn muxer_mut(&mut self) -> &mut TSMuxer {
        &mut self.muxer
    }

    /// Writes one raw AAC access unit; see [`TSMuxer::write_aac`].
    pub async fn write_aac(&mut self, data: &[u8], timestamp_us: u64) -> Result<()> {
        self.muxer
            .write_aac_into(data, timestamp_us, &mut self.packets)?;
        self.drain().await
    }

    /// Returns the underlying writer. Buffered bytes not yet flushed are lost.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    async fn drain(&mut self) -> Result<()> {
        if !self.packets.is_empty() {
            let bytes = self.packets.take();
            self.writer.write_all(&bytes).await?;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl<W: AsyncWrite + Unpin + Send> Muxer for TsWriter<W> {
    async fn write_video(&mut self, data: &[u8], timestamp_us: u64) -> Result<()> {
        self.muxer
            .write_nalu_into(data, timestamp_us, &mut self.packets)?;
        self.drain().await
    }

    async fn write_audio(&mut self, data: &[u8], timestamp_us: u64) -> Result<()> {
        self.muxer
            .write_adts_into(data, timestamp_us, &mut self.packets)?;
        self.drain().await
    }

    async fn flush(&mut self) -> Result<()> {
        self.drain().await?;
        self.writer.flush().await?;
        Ok(())
    }

    async fn finish(&mut self) -> Result<()> {
        self.muxer.flush_into(&mut self.packets)?;
        self.drain().await?;
        self.writer.flush().await?;
        log::debug!("TS writer finished");
        Ok(())
    }
}

/// Reads demuxed frames from an [`AsyncRead`].
#[derive(Debug)]
pub struct TsReader<R: AsyncRead + Unpin + Send> {
    reader: R,
    demuxer: TSDemuxer,
    frames: VecDeque<DemuxedFrame>,
    buf: Vec<u8>,
    eof: bool,
}

impl<R: AsyncRead + Unpin + Send> TsReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            demuxer: TSDemuxer::new(),
            frames: VecDeque::new(),
            buf: vec![0; READ_CHUNK_SIZE],
            eof: false,
        }
    }

    pub fn demuxer(&self) -> &TSDemuxer {
        &self.demuxer
    }
}

#[async_trait::async_trait]
impl<R: AsyncRead + Unpin + Send> Demuxer for TsReader<R> {
    async fn read_frame(&mut self) -> Result<Option<DemuxedFrame>> {
        loop {
            if let Some(frame) = self.frames.pop_front() {
                return Ok(Some(frame));
            }
            if self.eof {
                return Ok(None);
            }

            let n = self.reader.read(&mut self.buf).await?;
            if n == 0 {
                self.eof = true;
                self.demuxer.flush_into(&mut self.frames);
            } else {
                self.demuxer
                    .read_packet_into(&self.buf[..n], &mut self.frames);
            }
        }
    }
}

/// Demuxes chunks from a single-writer channel into a stream of frames.
///
/// Frames still being assembled are emitted once every sender is dropped.
pub fn frame_stream(rx: mpsc::Receiver<Bytes>) -> impl Stream<Item = DemuxedFrame> {
    struct State {
        rx: mpsc::Receiver<Bytes>,
        demuxer: TSDemuxer,
        frames: VecDeque<DemuxedFrame>,
        closed: bool,
    }

    let state = State {
        rx,
        demuxer: TSDemuxer::new(),
        frames: VecDeque::new(),
        closed: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(frame) = state.frames.pop_front() {
                return Some((frame, state));
            }
            if state.closed {
                return None;
            }
            match state.rx.recv().await {
                Some(chunk) => state.demuxer.read_packet_into(&chunk, &mut state.frames),
                None => {
                    state.closed = true;
                    state.demuxer.flush_into(&mut state.frames);
                }
            }
        }
    })
}
