//! # Protocol Layer
//!
//! Everything between raw frames and the code that reacts to them.
//!
//! ## Components
//! - **Client / Identifier**: client variants and symbolic message names
//! - **Dialect**: per-client opcode tables
//! - **Message**: the typed message contract and the built-in messages
//! - **Dispatcher**: the interception pipeline
//! - **Correlator**: request/response pairing over the pipeline

pub mod client;
pub mod correlator;
pub mod dialect;
pub mod dispatcher;
pub mod identifier;
pub mod message;
pub mod messages;

pub use client::{ClientSet, ClientType};
pub use dialect::DialectRegistry;
pub use dispatcher::{Intercept, Interceptor, Session, SessionEvent};
pub use identifier::{Direction, Identifier, In, Out};
pub use message::{Message, Packet};
