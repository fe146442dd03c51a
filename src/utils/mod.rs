//! # Utility Modules
//!
//! Supporting utilities used throughout the interception core.
//!
//! ## Components
//! - **Logging**: Structured logging configuration
//! - **Metrics**: Lock-free observability counters
//! - **Subscription**: Drop guards for handler and listener registrations
//! - **Timeout**: Deadline constants and async timeout wrappers

pub mod logging;
pub mod metrics;
pub mod subscription;
pub mod timeout;

pub use metrics::{Metrics, MetricsSnapshot};
pub use subscription::Subscription;
