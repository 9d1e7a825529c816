//! Packet scratch buffer and the sinks packets are delivered to.

use bytes::BytesMut;

use super::types::{TS_PACKET_SIZE, SYNC_BYTE};
use crate::{Result, TsError};

/// Fixed 188-byte scratch buffer a packet is assembled in.
///
/// The owner passes it to every writer, so one allocation serves the whole
/// stream.
#[derive(Debug, Clone)]
pub struct PacketBuffer {
    data: [u8; TS_PACKET_SIZE],
    pos: usize,
}

impl Default for PacketBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketBuffer {
    pub fn new() -> Self {
        Self {
            data: [0xFF; TS_PACKET_SIZE],
            pos: 0,
        }
    }

    /// Rewinds to offset 0 and fills the packet with stuffing bytes.
    pub fn reset(&mut self) {
        self.data = [0xFF; TS_PACKET_SIZE];
        self.pos = 0;
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        TS_PACKET_SIZE - self.pos
    }

    fn reserve(&self, needed: usize) -> Result<()> {
        if needed > self.remaining() {
            return Err(TsError::Truncated {
                what: "TS packet",
                needed,
                available: self.remaining(),
            });
        }
        Ok(())
    }

    pub fn put_u8(&mut self, value: u8) -> Result<()> {
        self.reserve(1)?;
        self.data[self.pos] = value;
        self.pos += 1;
        Ok(())
    }

    pub fn put_u16(&mut self, value: u16) -> Result<()> {
        self.put_slice(&value.to_be_bytes())
    }

    pub fn put_slice(&mut self, src: &[u8]) -> Result<()> {
        self.reserve(src.len())?;
        self.data[self.pos..self.pos + src.len()].copy_from_slice(src);
        self.pos += src.len();
        Ok(())
    }

    /// Writes `value` `count` times.
    pub fn put_bytes(&mut self, value: u8, count: usize) -> Result<()> {
        self.reserve(count)?;
        self.data[self.pos..self.pos + count].fill(value);
        self.pos += count;
        Ok(())
    }

    pub fn as_bytes(&self) -> &[u8; TS_PACKET_SIZE] {
        &self.data
    }
}

/// Receives every finished 188-byte packet.
///
/// `on_flush` is called after the last packet of each frame, which lets a
/// sink batch writes per frame.
pub trait PacketListener {
    fn on_packet(&mut self, packet: &[u8]);

    fn on_flush(&mut self) {}
}

impl<F> PacketListener for F
where
    F: FnMut(&[u8]),
{
    fn on_packet(&mut self, packet: &[u8]) {
        self(packet)
    }
}

/// Accumulates packets in memory.
#[derive(Debug, Default, Clone)]
pub struct PacketCollector {
    buf: BytesMut,
    flushes: usize,
}

impl PacketCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn packet_count(&self) -> usize {
        self.buf.len() / TS_PACKET_SIZE
    }

    /// Number of frame boundaries seen.
    pub fn flushes(&self) -> usize {
        self.flushes
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Iterates over the collected packets.
    pub fn packets(&self) -> impl Iterator<Item = &[u8]> {
        self.buf.chunks(TS_PACKET_SIZE)
    }

    /// Hands out everything collected so far.
    pub fn take(&mut self) -> BytesMut {
        self.buf.split()
    }
}

impl PacketListener for PacketCollector {
    fn on_packet(&mut self, packet: &[u8]) {
        debug_assert_eq!(packet.first(), Some(&SYNC_BYTE));
        self.buf.extend_from_slice(packet);
    }

    fn on_flush(&mut self) {
        self.flushes += 1;
    }
}

/// Drops every packet.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullListener;

impl PacketListener for NullListener {
    fn on_packet(&mut self, _packet: &[u8]) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_buffer_writes() {
        let mut buf = PacketBuffer::new();
        buf.put_u8(0x47).unwrap();
        buf.put_u16(0x4100).unwrap();
        buf.put_slice(&[0x30]).unwrap();
        assert_eq!(buf.position(), 4);
        assert_eq!(&buf.as_bytes()[..4], &[0x47, 0x41, 0x00, 0x30]);

        buf.put_bytes(0xAB, 184).unwrap();
        assert_eq!(buf.remaining(), 0);
        assert!(buf.put_u8(0).is_err());
        assert_eq!(buf.as_bytes()[187], 0xAB);

        buf.reset();
        assert_eq!(buf.position(), 0);
        assert!(buf.as_bytes().iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn test_oversized_write_is_rejected() {
        let mut buf = PacketBuffer::new();
        buf.put_bytes(0, 180).unwrap();
        match buf.put_slice(&[0; 10]) {
            Err(TsError::Truncated { needed, available, .. }) => {
                assert_eq!(needed, 10);
                assert_eq!(available, 8);
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(buf.position(), 180);
    }

    #[test]
    fn test_listeners() {
        let packet = [SYNC_BYTE; TS_PACKET_SIZE];

        let mut collector = PacketCollector::new();
        collector.on_packet(&packet);
        collector.on_packet(&packet);
        collector.on_flush();
        assert_eq!(collector.packet_count(), 2);
        assert_eq!(collector.flushes(), 1);
        assert_eq!(collector.packets().count(), 2);
        assert_eq!(collector.take().len(), 2 * TS_PACKET_SIZE);
        assert!(collector.is_empty());

        let mut seen = 0;
        let mut counter = |p: &[u8]| seen += p.len();
        counter.on_packet(&packet);
        counter.on_flush();
        assert_eq!(seen, TS_PACKET_SIZE);
    }
}
