//! Transport handlers: queue request dispatch and HTTP health checks.

pub mod http;
pub mod queue;

pub use http::{health, ready};
pub use queue::dispatch;
