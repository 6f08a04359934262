//! Flight Module
//!
//! Request coalescing for cache misses.

mod coalescer;

pub use coalescer::RequestCoalescer;
