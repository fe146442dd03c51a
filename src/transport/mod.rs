//! # Transport Layer
//!
//! TCP relay between the game client and the server.

pub mod proxy;

pub use proxy::{listen, listen_with_shutdown, run_session, serve};
