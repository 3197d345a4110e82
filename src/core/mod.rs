mod coalescer;
mod controller;

pub use coalescer::*;
pub use controller::*;
