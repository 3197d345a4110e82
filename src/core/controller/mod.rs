//! Resource stream controller
//!
//! One controller per tracked kind per connection. It binds a synchronized
//! replica to the coalescer and the stream registry:
//!
//! ```text
//! replica change ──▶ ChangeHandler ──▶ EventCoalescer ──▶ producer
//!                     (derive keys)     (one per window)    │ reads replica
//!                                                           ▼
//!                                                     StreamRegistry
//! ```

mod change_handler;
mod resource_controller;
mod stream_key;
pub use resource_controller::*;
pub use stream_key::*;
