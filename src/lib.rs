//! Change-coalescing and stream-dispatch layer for cluster resource views.
//!
//! Raw add/update/delete notifications from a [`SynchronizedReplica`] are
//! turned into a bounded-rate set of List, Detail and YAML payloads published
//! on named streams:
//!
//! ```text
//! replica change ─▶ ResourceController ─▶ EventCoalescer ─▶ producer ─▶ StreamRegistry ─▶ SSE
//!                   (derives stream keys)  (one run per key    (reads       (fan-out per key)
//!                                           per window)         replica)
//! ```
mod cache;
mod config;
mod core;
mod errors;
mod metrics;
mod network;
mod node;
mod projection;
mod publisher;
mod replica;
pub mod constants;
pub mod utils;

pub use core::*;

pub use cache::*;
pub use config::*;
pub use errors::*;
pub use metrics::*;
pub use network::*;
pub use node::*;
pub use projection::*;
pub use publisher::*;
pub use replica::*;
pub use utils::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;
