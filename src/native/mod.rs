//! Native bridge
//!
//! Lets scripts call native functions by address and read or write raw
//! process memory:
//!
//! - [`bridge`]: the unsafe primitives (symbol resolution, 8-slot calls,
//!   byte and word access)
//! - [`functions`]: their script-facing wrappers, registered through
//!   [`BRIDGE_FUNCTIONS`]
//!
//! Numbers double as addresses. There is no sandboxing.

pub mod bridge;
pub mod functions;

pub use functions::BRIDGE_FUNCTIONS;
