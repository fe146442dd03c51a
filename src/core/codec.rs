//! Tokio codec for framing the protocol over a byte stream.
//!
//! ```text
//! [Length u32] [Opcode u16] [Payload (Length - 2)]
//! ```
//!
//! The length counts the opcode and the payload. Frames whose length exceeds
//! the configured maximum are rejected before any allocation happens.

use crate::config::MAX_FRAME_SIZE;
use crate::core::frame::{RawFrame, LENGTH_PREFIX_LEN, OPCODE_LEN};
use crate::error::{constants, ProtocolError, Result};
use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

#[derive(Debug, Clone, Copy)]
pub struct FrameCodec {
    max_frame_size: usize,
}

impl FrameCodec {
    pub fn new(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new(MAX_FRAME_SIZE)
    }
}

impl Decoder for FrameCodec {
    type Item = RawFrame;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<RawFrame>> {
        if src.len() < LENGTH_PREFIX_LEN {
            return Ok(None);
        }

        let mut header = [0u8; LENGTH_PREFIX_LEN];
        header.copy_from_slice(&src[..LENGTH_PREFIX_LEN]);
        let length = u32::from_be_bytes(header) as usize;

        if length < OPCODE_LEN {
            return Err(ProtocolError::InvalidFrame(
                constants::ERR_FRAME_TOO_SHORT.to_string(),
            ));
        }
        if length > self.max_frame_size {
            return Err(ProtocolError::OversizedFrame(length));
        }

        if src.len() < LENGTH_PREFIX_LEN + length {
            src.reserve(LENGTH_PREFIX_LEN + length - src.len());
            return Ok(None);
        }

        src.advance(LENGTH_PREFIX_LEN);
        let opcode = src.get_u16();
        let payload = src.split_to(length - OPCODE_LEN).freeze();

        Ok(Some(RawFrame { opcode, payload }))
    }
}

impl Encoder<RawFrame> for FrameCodec {
    type Error = ProtocolError;

    fn encode(&mut self, frame: RawFrame, dst: &mut BytesMut) -> Result<()> {
        let length = OPCODE_LEN + frame.payload.len();
        if length > self.max_frame_size {
            return Err(ProtocolError::OversizedFrame(length));
        }

        dst.reserve(LENGTH_PREFIX_LEN + length);
        dst.put_u32(length as u32);
        dst.put_u16(frame.opcode);
        dst.extend_from_slice(&frame.payload);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    #[test]
    fn test_partial_frame_waits_for_more_bytes() {
        let mut codec = FrameCodec::default();
        let mut buf = BytesMut::new();
        codec.encode(RawFrame::new(7, vec![1, 2, 3]), &mut buf).unwrap();

        let mut partial = buf.split_to(5);
        assert!(codec.decode(&mut partial).unwrap().is_none());
        partial.unsplit(buf);
        let frame = codec.decode(&mut partial).unwrap().unwrap();
        assert_eq!(frame.opcode, 7);
        assert_eq!(&frame.payload[..], &[1, 2, 3]);
        assert!(partial.is_empty());
    }

    #[test]
    fn test_back_to_back_frames_decode_in_order() {
        let mut codec = FrameCodec::default();
        let mut buf = BytesMut::new();
        for opcode in 1..=3u16 {
            codec.encode(RawFrame::new(opcode, vec![opcode as u8]), &mut buf).unwrap();
        }
        let opcodes: Vec<u16> = std::iter::from_fn(|| codec.decode(&mut buf).unwrap())
            .map(|f| f.opcode)
            .collect();
        assert_eq!(opcodes, vec![1, 2, 3]);
    }

    #[test]
    fn test_oversized_frame_rejected_before_payload_arrives() {
        let mut codec = FrameCodec::new(16);
        let mut buf = BytesMut::new();
        buf.put_u32(1024);
        assert!(matches!(codec.decode(&mut buf), Err(ProtocolError::OversizedFrame(1024))));
    }

    #[test]
    fn test_length_shorter_than_opcode_is_invalid() {
        let mut codec = FrameCodec::default();
        let mut buf = BytesMut::new();
        buf.put_u32(1);
        buf.put_u8(0);
        assert!(matches!(codec.decode(&mut buf), Err(ProtocolError::InvalidFrame(_))));
    }
}
