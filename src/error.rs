//! # Error Types
//!
//! Error handling for the interception core.
//!
//! This module defines every failure that can surface while decoding frames,
//! resolving identifiers, sending messages or awaiting replies.
//!
//! ## Error Categories
//! - **Decode Errors**: buffer underruns, malformed strings and lengths
//! - **Dialect Errors**: messages or identifiers the active client does not support
//! - **Connection Errors**: timeouts and closed connections
//! - **Configuration Errors**: invalid or unreadable configuration
//!
//! A decode error is fatal to one decode attempt only. The pipeline logs it,
//! skips typed dispatch for that frame and still relays the raw bytes.
//!
//! ## Example Usage
//! ```rust
//! use room_intercept::core::buffer::PacketReader;
//! use room_intercept::error::ProtocolError;
//! use room_intercept::protocol::client::ClientType;
//!
//! let bytes = [0u8, 1];
//! let mut reader = PacketReader::new(ClientType::Flash, &bytes);
//! match reader.read_i32() {
//!     Err(ProtocolError::BufferUnderrun { needed, remaining }) => {
//!         assert_eq!((needed, remaining), (4, 2));
//!     }
//!     other => panic!("unexpected: {other:?}"),
//! }
//! ```

use crate::protocol::client::ClientType;
use crate::protocol::identifier::Identifier;
use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
pub mod constants {
    pub const ERR_NO_SESSION: &str = "No active session";

    /// Frame errors
    pub const ERR_FRAME_TOO_SHORT: &str = "Frame length shorter than opcode header";
}

/// ProtocolError is the primary error type for all interception operations
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Buffer underrun: needed {needed} bytes, {remaining} remaining")]
    BufferUnderrun { needed: usize, remaining: usize },

    #[error("String is not valid UTF-8")]
    InvalidString,

    #[error("Invalid array length: {0}")]
    InvalidLength(i64),

    #[error("Frame too large: {0} bytes")]
    OversizedFrame(usize),

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("{message} is not supported on the {client} client")]
    UnsupportedVariant {
        message: &'static str,
        client: ClientType,
    },

    #[error("{identifier} has no opcode on the {client} client")]
    NotSupportedByRegistry {
        identifier: Identifier,
        client: ClientType,
    },

    #[error("Timed out waiting for a reply")]
    TimedOut,

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ProtocolError {
    /// Whether this error is a decode failure confined to a single frame.
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            ProtocolError::BufferUnderrun { .. }
                | ProtocolError::InvalidString
                | ProtocolError::InvalidLength(_)
        )
    }
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;
