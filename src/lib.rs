//! # room-intercept
//!
//! Interception core for a virtual-world client protocol spoken by several
//! client builds (Flash, Unity and the Shockwave "Origins" client).
//!
//! The crate sits between a game client and its server and offers:
//! - a binary codec for the `[length][opcode][payload]` wire format
//! - per-client opcode tables keyed by stable symbolic identifiers
//! - typed messages with lazy decoding
//! - an ordered interception pipeline that can observe, rewrite, block and
//!   inject frames
//! - request/response correlation with deadlines
//! - a room and avatar state tracker
//! - behavior controllers, with a mimic controller as the built-in one
//!
//! ## Example
//! ```rust,no_run
//! use room_intercept::config::InterceptorConfig;
//! use room_intercept::game::RoomTracker;
//! use room_intercept::protocol::{DialectRegistry, Interceptor};
//! use room_intercept::service::Mimic;
//! use std::sync::Arc;
//!
//! # async fn run() -> room_intercept::error::Result<()> {
//! let config = InterceptorConfig::default();
//! let interceptor =
//!     Interceptor::with_timeout(DialectRegistry::builtin(), config.correlator.default_timeout);
//! let tracker = Arc::new(RoomTracker::new(&interceptor));
//! let mimic = Mimic::new(interceptor.clone(), tracker, config.mimic);
//! mimic.start();
//!
//! room_intercept::transport::listen(config.proxy, interceptor).await
//! # }
//! ```

#![warn(clippy::unwrap_used, clippy::expect_used)]

pub mod config;
pub mod core;
pub mod error;
pub mod game;
pub mod protocol;
pub mod service;
pub mod transport;
pub mod utils;

pub use error::{ProtocolError, Result};
