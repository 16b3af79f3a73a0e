//! Per-task event fan-out (spec §4.5/§4.6): a non-blocking publish/
//! subscribe bus plus a keep-alive wrapper for long-lived SSE consumers.

mod bus;
mod error;
mod keepalive;

pub use bus::{EventBus, EventSubscription};
pub use error::BusError;
pub use keepalive::KeepAliveStream;
