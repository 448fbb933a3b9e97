//! Transport framing.
//!
//! Stream transports (TCP, serial) delimit each payload with a direction
//! byte and a little-endian length:
//!
//! ```text
//! +-------+--------+--------+-------------------+
//! | delim | len_lo | len_hi | data[0..len]      |
//! +-------+--------+--------+-------------------+
//! ```
//!
//! `<` marks host-to-device frames and `>` device-to-host frames. Datagram
//! transports (BLE notifications) deliver one payload per chunk and need no
//! framing at all.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use log::trace;
use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::ProtocolError;

/// Turns transport chunks into payloads and back.
pub trait Framer: Send {
    /// Feed one chunk as delivered by the transport and return every payload
    /// completed by it, in order.
    fn ingest(&mut self, chunk: &[u8]) -> Vec<Bytes>;

    /// Wrap an outbound payload for the transport.
    fn wrap(&self, payload: &[u8]) -> Result<Bytes, ProtocolError>;

    /// Bytes held back waiting for the rest of a frame.
    fn buffered_len(&self) -> usize;

    /// Drop any partial frame, e.g. after a reconnect.
    fn reset(&mut self);
}

/// Which framing a transport needs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framing {
    /// Length-delimited byte stream.
    #[default]
    Stream,
    /// One payload per delivery.
    Datagram,
}

impl Framing {
    /// Framer for the host end of the link.
    pub fn host_framer(self) -> Box<dyn Framer> {
        match self {
            Framing::Stream => Box::new(StreamFramer::host()),
            Framing::Datagram => Box::new(DatagramFramer),
        }
    }

    /// Framer for the device end of the link.
    pub fn device_framer(self) -> Box<dyn Framer> {
        match self {
            Framing::Stream => Box::new(StreamFramer::device()),
            Framing::Datagram => Box::new(DatagramFramer),
        }
    }
}

/// Reassembles length-delimited frames from an arbitrarily chunked stream.
///
/// A leading byte other than the expected delimiter is not skipped: the
/// framer keeps waiting, so a corrupted stream stalls until [`reset`].
///
/// [`reset`]: Framer::reset
#[derive(Debug)]
pub struct StreamFramer {
    buffer: BytesMut,
    inbound_delim: u8,
    outbound_delim: u8,
}

impl StreamFramer {
    /// Reads `>` frames and writes `<` frames.
    pub fn host() -> Self {
        Self::with_delimiters(FRAME_DELIM_INBOUND, FRAME_DELIM_OUTBOUND)
    }

    /// Reads `<` frames and writes `>` frames.
    pub fn device() -> Self {
        Self::with_delimiters(FRAME_DELIM_OUTBOUND, FRAME_DELIM_INBOUND)
    }

    fn with_delimiters(inbound_delim: u8, outbound_delim: u8) -> Self {
        StreamFramer {
            buffer: BytesMut::with_capacity(FRAME_HEADER_SIZE + MAX_FRAME_SIZE),
            inbound_delim,
            outbound_delim,
        }
    }

    fn next_frame(&mut self) -> Option<Bytes> {
        if self.buffer.len() < FRAME_HEADER_SIZE || self.buffer[0] != self.inbound_delim {
            return None;
        }

        let len = u16::from_le_bytes([self.buffer[1], self.buffer[2]]) as usize;
        if self.buffer.len() < FRAME_HEADER_SIZE + len {
            return None;
        }

        self.buffer.advance(FRAME_HEADER_SIZE);
        Some(self.buffer.split_to(len).freeze())
    }
}

impl Framer for StreamFramer {
    fn ingest(&mut self, chunk: &[u8]) -> Vec<Bytes> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(frame) = self.next_frame() {
            frames.push(frame);
        }

        trace!(
            "stream framer: {} byte chunk, {} frame(s), {} byte(s) pending",
            chunk.len(),
            frames.len(),
            self.buffer.len()
        );
        frames
    }

    fn wrap(&self, payload: &[u8]) -> Result<Bytes, ProtocolError> {
        let len = u16::try_from(payload.len()).map_err(|_| ProtocolError::PayloadTooLarge(payload.len()))?;
        let mut buf = BytesMut::with_capacity(FRAME_HEADER_SIZE + payload.len());
        buf.put_u8(self.outbound_delim);
        buf.put_u16_le(len);
        buf.put_slice(payload);
        Ok(buf.freeze())
    }

    fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    fn reset(&mut self) {
        self.buffer.clear();
    }
}

/// Pass-through framing for transports that deliver whole frames.
#[derive(Debug, Default, Clone, Copy)]
pub struct DatagramFramer;

impl Framer for DatagramFramer {
    fn ingest(&mut self, chunk: &[u8]) -> Vec<Bytes> {
        vec![Bytes::copy_from_slice(chunk)]
    }

    fn wrap(&self, payload: &[u8]) -> Result<Bytes, ProtocolError> {
        Ok(Bytes::copy_from_slice(payload))
    }

    fn buffered_len(&self) -> usize {
        0
    }

    fn reset(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device_bytes(payload: &[u8]) -> Bytes {
        StreamFramer::device().wrap(payload).unwrap()
    }

    #[test]
    fn test_wrap_layout() {
        let wrapped = StreamFramer::host().wrap(b"Hello, World!").unwrap();
        assert_eq!(wrapped.len(), 3 + 13);
        assert_eq!(wrapped[0], b'<');
        assert_eq!(wrapped[1], 13);
        assert_eq!(wrapped[2], 0);
        assert_eq!(&wrapped[3..], b"Hello, World!");
    }

    #[test]
    fn test_empty_payload_is_three_bytes() {
        let wrapped = device_bytes(&[]);
        assert_eq!(&wrapped[..], &[b'>', 0, 0]);

        let mut framer = StreamFramer::host();
        let frames = framer.ingest(&wrapped);
        assert_eq!(frames.len(), 1);
        assert!(frames[0].is_empty());
        assert_eq!(framer.buffered_len(), 0);
    }

    #[test]
    fn test_every_split_point() {
        let payload: Vec<u8> = (0..40).collect();
        let wire = device_bytes(&payload);

        for split in 0..=wire.len() {
            let mut framer = StreamFramer::host();
            let mut frames = framer.ingest(&wire[..split]);
            frames.extend(framer.ingest(&wire[split..]));
            assert_eq!(frames.len(), 1, "split at {}", split);
            assert_eq!(&frames[0][..], &payload[..]);
        }
    }

    #[test]
    fn test_byte_at_a_time() {
        let wire = device_bytes(b"Test data");
        let mut framer = StreamFramer::host();
        let mut frames = Vec::new();
        for byte in wire.iter() {
            frames.extend(framer.ingest(&[*byte]));
        }
        assert_eq!(frames, vec![Bytes::from_static(b"Test data")]);
    }

    #[test]
    fn test_two_frames_in_one_chunk() {
        let mut wire = device_bytes(b"First").to_vec();
        wire.extend_from_slice(&device_bytes(b"Second"));
        wire.extend_from_slice(&device_bytes(b"Thi")[..4]);

        let mut framer = StreamFramer::host();
        let frames = framer.ingest(&wire);
        assert_eq!(frames.len(), 2);
        assert_eq!(&frames[0][..], b"First");
        assert_eq!(&frames[1][..], b"Second");
        assert_eq!(framer.buffered_len(), 4);
    }

    #[test]
    fn test_wrong_delimiter_waits() {
        let mut framer = StreamFramer::host();
        // A host-direction frame is not recognized on the host side.
        let frames = framer.ingest(&StreamFramer::host().wrap(b"abc").unwrap());
        assert!(frames.is_empty());
        assert_eq!(framer.buffered_len(), 6);

        // A valid frame behind the bad byte stays stuck until reset.
        assert!(framer.ingest(&device_bytes(b"ok")).is_empty());
        framer.reset();
        assert_eq!(framer.ingest(&device_bytes(b"ok")).len(), 1);
    }

    #[test]
    fn test_payload_too_large() {
        let big = vec![0u8; u16::MAX as usize + 1];
        assert_eq!(
            StreamFramer::host().wrap(&big),
            Err(ProtocolError::PayloadTooLarge(big.len()))
        );
    }

    #[test]
    fn test_framing_names() {
        let framing: Framing = serde_yaml::from_str("datagram").unwrap();
        assert_eq!(framing, Framing::Datagram);
        assert_eq!(serde_yaml::to_string(&Framing::Stream).unwrap().trim(), "stream");
    }

    #[test]
    fn test_datagram_pass_through() {
        let mut framer = Framing::Datagram.host_framer();
        let frames = framer.ingest(&[0x05, 1, 2]);
        assert_eq!(frames, vec![Bytes::from_static(&[0x05, 1, 2])]);
        assert_eq!(&framer.wrap(&[0x16]).unwrap()[..], &[0x16]);
        assert_eq!(framer.buffered_len(), 0);
    }
}
