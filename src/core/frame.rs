//! Raw frames as they travel on the wire.

use crate::protocol::identifier::Direction;
use bytes::Bytes;

/// Size of the length prefix in bytes.
pub const LENGTH_PREFIX_LEN: usize = 4;

/// Size of the opcode field in bytes.
pub const OPCODE_LEN: usize = 2;

/// One undecoded protocol message: `[length u32][opcode u16][payload]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub opcode: u16,
    pub payload: Bytes,
}

impl RawFrame {
    pub fn new(opcode: u16, payload: impl Into<Bytes>) -> Self {
        Self {
            opcode,
            payload: payload.into(),
        }
    }

    /// Total size on the wire, including the length prefix.
    pub fn wire_len(&self) -> usize {
        LENGTH_PREFIX_LEN + OPCODE_LEN + self.payload.len()
    }
}

/// A frame the pipeline wants written to one side of the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relay {
    /// `Outgoing` frames go to the server, `Incoming` frames to the client.
    pub direction: Direction,
    pub frame: RawFrame,
}
