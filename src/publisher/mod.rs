//! Stream registry and publisher
//!
//! A set of named, many-subscriber channels. Producers push payloads by
//! stream key; every subscriber currently attached to that key receives them
//! in publish order.
//!
//! ```text
//! producer ──publish(key, payload)──▶ DashMap<StreamKey, Vec<Subscriber>>
//!                                          │ try_send (never blocks)
//!                                          ▼
//!                                  per-subscriber mpsc (bounded)
//!                                          │
//!                                          ▼
//!                                  SSE connection task
//! ```
//!
//! # Backpressure
//!
//! - A full subscriber buffer drops the payload for that subscriber only
//! - A closed subscriber is pruned on the next publish to its key
//! - Publishing to a key nobody subscribes to is a silent discard
//!
//! Subscriptions unregister themselves when dropped, so a disconnected HTTP
//! stream releases its slot without any explicit call.

mod stream_registry;
pub use stream_registry::*;

#[cfg(test)]
mod stream_registry_test;
