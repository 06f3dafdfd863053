//! Built-in providers
//!
//! Collection of providers for common operations

mod debug;
mod http;
mod time;
mod transform;

pub use http::{HttpDefaults, HttpRequest, RequestInput, Response};
pub use time::{Delay, DelayInput, Delayed, IntervalInput, OnInterval, Tick};
use relayruntime::Registry;

/// Register all built-in providers with a registry
pub fn register_all(registry: &mut Registry) -> relaycore::Result<()> {
    debug::register(registry)?;
    http::register(registry)?;
    time::register(registry)?;
    transform::register(registry)?;
    Ok(())
}
