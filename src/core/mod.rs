//! # Core Protocol Components
//!
//! Low-level frame handling and binary field encoding.
//!
//! ## Components
//! - **Buffer**: typed reads and writes over a frame payload
//! - **Frame**: raw frames and relay instructions
//! - **Codec**: Tokio codec for framing over byte streams
//!
//! ## Wire Format
//! ```text
//! [Length(4)] [Opcode(2)] [Payload(Length - 2)]
//! ```
//!
//! ## Limits
//! - Maximum frame size: 1MB by default (prevents memory exhaustion)
//! - Length validation before allocation

pub mod buffer;
pub mod codec;
pub mod frame;
