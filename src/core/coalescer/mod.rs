//! Change coalescer
//!
//! Collapses bursts of "something changed" signals into at most one producer
//! invocation per key per window. Triggers arriving while a key is pending
//! are merged into the already-armed invocation, which reads whatever state
//! exists when it fires.

mod event_coalescer;
pub use event_coalescer::*;
